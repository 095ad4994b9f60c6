use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum RemoteError {
    #[error("Not found: {message}")]
    #[diagnostic(code(hdx_remote::not_found))]
    NotFound { action: String, message: String },

    #[error("Validation error in {action}: {message}")]
    #[diagnostic(
        code(hdx_remote::validation),
        help("The metadata sent was rejected by the server")
    )]
    Validation { action: String, message: String },

    #[error("Not authorized to call {action}: {message}")]
    #[diagnostic(
        code(hdx_remote::not_authorized),
        help("Check that your API key has permission for this operation")
    )]
    NotAuthorized { action: String, message: String },

    #[error("{kind} in {action}: {message}")]
    #[diagnostic(code(hdx_remote::ckan))]
    Ckan {
        action: String,
        kind: String,
        message: String,
    },

    #[error("Invalid URL: {url}")]
    #[diagnostic(code(hdx_remote::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    #[diagnostic(
        code(hdx_remote::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(hdx_remote::http_error))]
    HttpError { status: u16, url: String },

    #[error("Invalid response from server: {url}")]
    #[diagnostic(code(hdx_remote::invalid_response))]
    InvalidResponse { url: String },

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(hdx_remote::io))]
    Io {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] hdx_config::error::ConfigError),

    #[error(transparent)]
    #[diagnostic(code(hdx_remote::json))]
    Json(#[from] serde_json::Error),
}

impl From<ureq::Error> for RemoteError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

impl RemoteError {
    /// Whether the server reported that the requested object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::HttpError { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = RemoteError::HttpError {
            status: 502,
            url: "https://data.humdata.org/api/3/action/package_show".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("HTTP 502"));
        assert!(msg.contains("package_show"));
    }

    #[test]
    fn test_not_found() {
        let err = RemoteError::NotFound {
            action: "package_show".into(),
            message: "Dataset not found".into(),
        };
        assert!(err.is_not_found());
        assert!(RemoteError::HttpError {
            status: 404,
            url: "x".into()
        }
        .is_not_found());
        assert!(!RemoteError::InvalidResponse { url: "x".into() }.is_not_found());
    }

    #[test]
    fn test_ckan_error_display() {
        let err = RemoteError::Ckan {
            action: "package_search".into(),
            kind: "Search Query Error".into(),
            message: "bad query".into(),
        };
        assert_eq!(err.to_string(), "Search Query Error in package_search: bad query");
    }

    #[test]
    fn test_from_ureq_error() {
        let err: RemoteError = ureq::Error::ConnectionFailed.into();
        assert!(matches!(err, RemoteError::Network(_)));
    }
}
