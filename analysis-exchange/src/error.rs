use thiserror::Error;

/// Fixed message shown to the user for any analysis failure that is not a
/// local input problem. The taxonomy below stays distinguishable in logs.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred during analysis. Please try again.";

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A local precondition failed; no external call was dispatched.
    #[error("invalid input: {0}")]
    Input(String),

    /// The model service (or its transport) could not be reached.
    #[error("model service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The model answered, but the completion was not parseable as the
    /// declared shape.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// The model produced no completion at all.
    #[error("model declined to produce a completion")]
    ModelDeclined,

    /// The parsed response does not match the required report shape.
    #[error("response failed validation at `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// Required external-service credentials are absent. A deployment
    /// defect, not a transient condition; raised before any network I/O.
    #[error("missing configuration: {0}")]
    Configuration(String),

    /// Report persistence failed. Logged only, never user-blocking.
    #[error("report store failure: {0}")]
    Storage(String),

    /// A chat submission arrived while a reply was still outstanding.
    #[error("chat session is already awaiting a reply")]
    SessionBusy,
}

impl AnalysisError {
    /// The single user-facing message category for this failure.
    ///
    /// Input errors carry their concrete message; configuration errors get
    /// an explicit diagnostic; everything else collapses into the generic
    /// retry-able apology.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Input(msg) => msg.clone(),
            AnalysisError::Configuration(what) => {
                format!("Service misconfigured: {what}. Contact the operator.")
            }
            AnalysisError::SessionBusy => {
                "Please wait for the current reply before sending another message.".to_string()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
