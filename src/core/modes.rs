//! Mode presets: each maps to a description and a system instruction.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Chat,
    Code,
    Explain,
    Doc,
    Design,
}

pub struct ModeSpec {
    pub mode: Mode,
    pub id: &'static str,
    pub description: &'static str,
    pub instruction: &'static str,
}

const CHAT_INSTRUCTION: &str = "You are a highly capable AI assistant interacting via a minimal CLI.
1. Use Markdown.
2. Be concise, direct, and helpful.
3. Use code blocks for code.
4. Adopt a modern, clean, professional tone.";

const CODE_INSTRUCTION: &str = "You are an expert software engineer working inside a terminal.
1. Answer with working, idiomatic code first and keep prose short.
2. Always put code in fenced blocks tagged with the language.
3. When asked for a UI, page, widget or graphic, return a single self-contained ```html (or ```svg) block that renders on its own, with inline CSS and JS.
4. Point out edge cases and pitfalls briefly after the code.";

const EXPLAIN_INSTRUCTION: &str = "You are a patient teacher.
1. Explain concepts step by step, from first principles.
2. Use analogies and small concrete examples.
3. Define jargon the first time it appears.
4. Finish with a one-paragraph summary.";

const DOC_INSTRUCTION: &str = "You are a document analyst.
1. Ground every answer in the provided context files; quote the relevant passage when possible.
2. Say plainly when the documents do not contain the answer.
3. Prefer structured output: headings, bullet lists and tables.
4. Keep summaries faithful; never invent facts that are not in the documents.";

const DESIGN_INSTRUCTION: &str = "You are a senior product and systems designer.
1. Clarify goals, constraints and trade-offs before proposing a design.
2. Present options with their pros and cons, then recommend one.
3. Use diagrams in text form (ASCII or Mermaid) where they help.
4. Keep recommendations actionable.";

const MODES: &[ModeSpec] = &[
    ModeSpec {
        mode: Mode::Chat,
        id: "chat",
        description: "General-purpose assistant (default).",
        instruction: CHAT_INSTRUCTION,
    },
    ModeSpec {
        mode: Mode::Code,
        id: "code",
        description: "Code-first answers; html/svg blocks open in the live preview.",
        instruction: CODE_INSTRUCTION,
    },
    ModeSpec {
        mode: Mode::Explain,
        id: "explain",
        description: "Step-by-step explanations for learning.",
        instruction: EXPLAIN_INSTRUCTION,
    },
    ModeSpec {
        mode: Mode::Doc,
        id: "doc",
        description: "Answers grounded in the uploaded documents.",
        instruction: DOC_INSTRUCTION,
    },
    ModeSpec {
        mode: Mode::Design,
        id: "design",
        description: "Architecture and product design discussions.",
        instruction: DESIGN_INSTRUCTION,
    },
];

pub fn all_modes() -> &'static [ModeSpec] {
    MODES
}

pub fn find_mode(name: &str) -> Option<&'static ModeSpec> {
    all_modes()
        .iter()
        .find(|spec| spec.id.eq_ignore_ascii_case(name))
}

impl Mode {
    pub fn spec(self) -> &'static ModeSpec {
        // The table holds every variant.
        MODES
            .iter()
            .find(|spec| spec.mode == self)
            .unwrap_or(&MODES[0])
    }

    pub fn id(self) -> &'static str {
        self.spec().id
    }

    pub fn description(self) -> &'static str {
        self.spec().description
    }

    pub fn instruction(self) -> &'static str {
        self.spec().instruction
    }
}
