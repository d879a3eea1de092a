use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnRole {
    User,
    Assistant,
    System,
    Error,
    Info,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
            TurnRole::Error => "error",
            TurnRole::Info => "info",
        }
    }

    /// Role used when replaying the turn to a stateless backend. Error and
    /// info turns are local-only and never transmitted.
    pub fn to_api_role(self) -> Option<&'static str> {
        match self {
            TurnRole::User => Some("user"),
            TurnRole::Assistant => Some("assistant"),
            TurnRole::System => Some("system"),
            TurnRole::Error | TurnRole::Info => None,
        }
    }

    pub fn is_exported(self) -> bool {
        matches!(self, TurnRole::User | TurnRole::Assistant)
    }
}

impl AsRef<str> for TurnRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

pub type TurnId = u64;

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: TurnId,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_streaming: bool,
}

impl Turn {
    pub fn new(id: TurnId, role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            created_at: Utc::now(),
            is_streaming: false,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == TurnRole::Assistant
    }
}
