use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of body bytes carried by API error messages
pub const MAX_ERROR_BODY_LENGTH: usize = 1200;

/// Flavour of a non-2xx answer received from the API server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 5xx responses
    Server,
    /// 401 and 403 responses
    Authentication,
    /// Every other 4xx response
    Request,
}

impl ApiErrorKind {
    /// Classify an HTTP status code, `None` for non-error statuses
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            500..=u16::MAX => Some(Self::Server),
            401 | 403 => Some(Self::Authentication),
            400..=499 => Some(Self::Request),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed JSON/YAML input; a flavour of configuration error
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{}", format_api_message(.kind, .code, .message))]
    ApiServer {
        kind: ApiErrorKind,
        code: u16,
        message: String,
    },

    #[error("Transport error ({code}): {message}")]
    Transport { code: u16, message: String },

    #[error("Logic error: {0}")]
    Logic(String),

    #[error("Missing items: {0}")]
    MissingItems(String),

    #[error("Continue token expired ({code}): {message}")]
    TimeExceeded { code: u16, message: String },

    #[error("No client methods exist with the name: {0}")]
    NoSuchRepository(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    /// Build an API server error from a status code and a raw body
    pub fn api(code: u16, body: &str) -> Self {
        Error::ApiServer {
            kind: ApiErrorKind::from_status(code).unwrap_or(ApiErrorKind::Request),
            code,
            message: cap_body(body).to_string(),
        }
    }

    /// The numeric code carried by API, transport and continuation errors
    pub fn code(&self) -> Option<u16> {
        match self {
            Error::ApiServer { code, .. }
            | Error::Transport { code, .. }
            | Error::TimeExceeded { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for configuration errors, parse errors included
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::Parse(_))
    }
}

fn format_api_message(kind: &ApiErrorKind, code: &u16, message: &str) -> String {
    match kind {
        ApiErrorKind::Server => format!("Server responded with {} Error: {}", code, message),
        ApiErrorKind::Authentication => format!("Authentication Exception: {}", message),
        ApiErrorKind::Request => message.to_string(),
    }
}

/// Truncate a response body to [`MAX_ERROR_BODY_LENGTH`] bytes without splitting a character
pub fn cap_body(body: &str) -> &str {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body;
    }

    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
