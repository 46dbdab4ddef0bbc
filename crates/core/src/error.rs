use std::fmt;

/// Typed failures of the recommendation pipeline. Carried inside `anyhow`
/// and downcast at the HTTP boundary to pick a status code.
#[derive(Debug, Clone)]
pub enum GenerationError {
    /// Bad caller input (e.g. weight value outside 0..=10).
    Validation { detail: String },

    /// Model credential missing or rejected. Never retried.
    Authentication { detail: String },

    /// The model call exceeded the configured timeout.
    Timeout { detail: String },

    /// Non-2xx or malformed envelope from the model service.
    Upstream {
        status: Option<u16>,
        detail: String,
        raw_output: Option<String>,
    },

    /// No strategy name/description could be located in the model output.
    Unparsable { detail: String, raw_output: String },

    /// No activities to rank; calling the model would be pointless.
    EmptyInput,

    /// A generation for the same session is already in flight.
    Busy { requested_by: String },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { detail } => write!(f, "validation failed: {detail}"),
            Self::Authentication { detail } => write!(f, "authentication failed: {detail}"),
            Self::Timeout { detail } => write!(f, "model request timed out: {detail}"),
            Self::Upstream { status, detail, .. } => match status {
                Some(code) => write!(f, "model service error (status={code}): {detail}"),
                None => write!(f, "model service error: {detail}"),
            },
            Self::Unparsable { detail, .. } => write!(f, "unparsable model output: {detail}"),
            Self::EmptyInput => write!(f, "no promotional activities to rank"),
            Self::Busy { requested_by } => {
                write!(f, "generation already in flight for session {requested_by}")
            }
        }
    }
}

impl std::error::Error for GenerationError {}
