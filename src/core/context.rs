//! Uploaded document contexts and the request block built from them.

pub type ContextId = u64;

/// Text extracted from a file, before it is owned by a [`ContextStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub name: String,
    pub mime_type: String,
    pub content: String,
}

/// One uploaded file's extracted text. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    id: ContextId,
    name: String,
    mime_type: String,
    content: String,
}

impl DocumentContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Short type label: `PDF TEXT` for PDFs, otherwise the MIME subtype.
    pub fn type_label(&self) -> String {
        if self.mime_type == "application/pdf" {
            return "PDF TEXT".to_string();
        }
        self.mime_type
            .split('/')
            .nth(1)
            .filter(|subtype| !subtype.is_empty())
            .unwrap_or("txt")
            .to_ascii_uppercase()
    }

    /// Size rounded to whole kilobytes of text.
    pub fn size_label(&self) -> String {
        let kb = (self.content.len() as f64 / 1024.0).round() as u64;
        format!("{kb}KB")
    }
}

#[derive(Debug, Default)]
pub struct ContextStore {
    items: Vec<DocumentContext>,
    next_id: ContextId,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, document: ExtractedDocument) -> &DocumentContext {
        self.next_id += 1;
        self.items.push(DocumentContext {
            id: self.next_id,
            name: document.name,
            mime_type: document.mime_type,
            content: document.content.trim().to_string(),
        });
        &self.items[self.items.len() - 1]
    }

    pub fn remove(&mut self, id: ContextId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn find(&self, id: ContextId) -> Option<&DocumentContext> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn latest(&self) -> Option<&DocumentContext> {
        self.items.last()
    }

    pub fn as_slice(&self) -> &[DocumentContext] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

const CONTEXT_HEADER: &str = "[CONTEXT FILES LOADED]";
const QUERY_LABEL: &str = "[USER QUERY]";

/// Build the outgoing text for one turn. Without contexts the message is
/// returned untouched; otherwise every context is inlined in insertion order
/// ahead of the user's literal message.
pub fn compose_message(contexts: &[DocumentContext], message: &str) -> String {
    if contexts.is_empty() {
        return message.to_string();
    }

    let mut composed = String::new();
    composed.push_str(CONTEXT_HEADER);
    composed.push('\n');
    for context in contexts {
        composed.push_str(&format!("--- FILE: {} ---\n", context.name));
        composed.push_str(&context.content);
        composed.push_str("\n--- END FILE ---\n");
    }
    composed.push('\n');
    composed.push_str(QUERY_LABEL);
    composed.push('\n');
    composed.push_str(message);
    composed
}
