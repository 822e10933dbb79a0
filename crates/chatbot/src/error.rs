/// The main error type for the chatbot [`crate`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Represents errors that occur during IO operations, including writes to a
    /// display surface.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),

    /// A streamed event was not valid UTF-8.
    #[error(transparent)]
    Utf8Error(#[from] std::str::Utf8Error),

    /// The error type for operations interacting with environment variables.
    /// Possibly returned from [`std::env::var()`].
    #[error("Environment variable error: {0} {1}")]
    EnvVarError(String, std::env::VarError),

    /// An environment file exists but could not be read or parsed.
    #[error(transparent)]
    DotenvError(#[from] dotenvy::Error),

    /// The API credential is unset or empty.
    #[error("API key not found. Please set {0} in your .env file.")]
    MissingCredential(String),

    #[error("Invalid header value for {0}: {1}")]
    InvalidHeaderValue(String, reqwest::header::InvalidHeaderValue),

    /// The completion service answered with an error, either as a non-success
    /// status or as an error object inside the event stream.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// Represents [`crate::chat::CompletionRequestBuilder`] errors.
    #[error(transparent)]
    CompletionRequestBuilderError(#[from] crate::chat::CompletionRequestBuilderError),

    /// Catches any other error types that don't fit into the above categories.
    /// Uses a boxed trait object to support a wide range of error types.
    #[error("OtherError: {0}")]
    OtherError(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Whether this error comes from startup configuration rather than from a
    /// request to the completion service.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::MissingCredential(_) | Error::EnvVarError(..) | Error::DotenvError(_)
        )
    }
}

/// A specialized [`Result`] type for this chatbot [`crate`].
///
/// This type is broadly used across the chatbot [`crate`] for any operation which
/// may produce an error.
///
/// # Examples
///
/// ```
/// fn answer() -> chatbot::Result<()> {
///     // run some code that may produce an error from the chatbot crate
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
