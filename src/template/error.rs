use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("unclosed template tag starting at byte {offset} (missing '%>')")]
    UnclosedTag { offset: usize },

    #[error("invalid template expression '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("failed to evaluate template expression '{expression}': {message}")]
    Evaluation { expression: String, message: String },
}
