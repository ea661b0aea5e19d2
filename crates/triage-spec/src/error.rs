use thiserror::Error;

/// Static configuration problems. These are build-time bugs in a form
/// definition, never runtime conditions.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("failed to parse form: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("form '{0}' has no steps")]
    NoSteps(String),
    #[error("step {step} ('{name}') has no questions")]
    EmptyStep { step: usize, name: String },
    #[error("question key '{0}' is declared more than once")]
    DuplicateKey(String),
    #[error("default answer of '{key}' does not match its {kind} type")]
    DefaultMismatch { key: String, kind: &'static str },
    #[error("question '{question}' references unknown question '{missing}'")]
    UnknownReference { question: String, missing: String },
    #[error("stop-flow rule on step {step} references unknown question '{missing}'")]
    UnknownRuleReference { step: usize, missing: String },
    #[error("step {step} continues to step {target}, which is not a later step of 1..={last}")]
    ContinueOutOfRange {
        step: usize,
        target: usize,
        last: usize,
    },
}
