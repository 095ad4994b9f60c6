//! Error types for hdx-core.

use hdx_config::error::ConfigError;
use hdx_remote::error::RemoteError;
use hdx_utils::error::{HashError, MergeError, PathError, UtilsError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum HdxError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    #[diagnostic(code(hdx::utils))]
    Utils(#[from] UtilsError),

    #[error("Failed when trying to read: {field}={value}! (POST)")]
    #[diagnostic(code(hdx::read))]
    Read {
        field: String,
        value: String,
        #[source]
        source: RemoteError,
    },

    #[error("Failed when trying to {action}{}! (POST)", id_suffix(.id))]
    #[diagnostic(code(hdx::write))]
    Write {
        action: String,
        id: Option<String>,
        #[source]
        source: RemoteError,
    },

    #[error("Field {field} is missing in {object_type}!")]
    #[diagnostic(
        code(hdx::missing_field),
        help("Set the field before creating or updating")
    )]
    MissingField { field: String, object_type: String },

    #[error("Field {field} is empty in {object_type}!")]
    #[diagnostic(code(hdx::empty_field))]
    EmptyField { field: String, object_type: String },

    #[error("No data in {0}!")]
    #[diagnostic(code(hdx::no_data))]
    NoData(String),

    #[error("No {id_field} field (mandatory) in {object_type}!")]
    #[diagnostic(code(hdx::no_id_field))]
    NoIdField {
        id_field: String,
        object_type: String,
    },

    #[error("No existing {object_type} to {operation}!")]
    #[diagnostic(code(hdx::no_existing))]
    NoExisting {
        object_type: String,
        operation: String,
    },

    #[error("{object_type} has no {action} action!")]
    #[diagnostic(code(hdx::unsupported_action))]
    UnsupportedAction {
        object_type: String,
        action: String,
    },

    #[error("{0}")]
    #[diagnostic(code(hdx::not_requestable))]
    NotRequestable(String),

    #[error("Chained rules for tags detected!")]
    #[diagnostic(
        code(hdx::chain_rule),
        help("A tag mapped by one rule must not be the key of another rule")
    )]
    ChainRule,

    #[error("{0}")]
    #[diagnostic(code(hdx::permission))]
    Permission(String),

    #[error("{0}")]
    #[diagnostic(code(hdx::invalid))]
    Invalid(String),

    #[error("Could not parse date: {0}")]
    #[diagnostic(
        code(hdx::date),
        help("Use YYYY-MM-DD or an ISO 8601 date-time")
    )]
    Date(String),

    #[error("Error while {action}")]
    #[diagnostic(code(hdx::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(hdx::csv))]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    #[diagnostic(code(hdx::json))]
    Json(#[from] serde_json::Error),
}

fn id_suffix(id: &Option<String>) -> String {
    id.as_deref().map(|id| format!(" {id}")).unwrap_or_default()
}

impl HdxError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

impl From<MergeError> for HdxError {
    fn from(err: MergeError) -> Self {
        Self::Utils(UtilsError::Merge(err))
    }
}

impl From<HashError> for HdxError {
    fn from(err: HashError) -> Self {
        Self::Utils(UtilsError::Hash(err))
    }
}

impl From<PathError> for HdxError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T, HdxError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T, HdxError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            HdxError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_message() {
        let err = HdxError::Write {
            action: "update".into(),
            id: Some("abc".into()),
            source: RemoteError::InvalidResponse { url: "x".into() },
        };
        assert_eq!(err.to_string(), "Failed when trying to update abc! (POST)");

        let err = HdxError::Write {
            action: "autocomplete".into(),
            id: None,
            source: RemoteError::InvalidResponse { url: "x".into() },
        };
        assert_eq!(err.to_string(), "Failed when trying to autocomplete! (POST)");
    }

    #[test]
    fn test_field_errors() {
        let err = HdxError::MissingField {
            field: "name".into(),
            object_type: "dataset".into(),
        };
        assert_eq!(err.to_string(), "Field name is missing in dataset!");
        let err = HdxError::NoIdField {
            id_field: "id".into(),
            object_type: "resource".into(),
        };
        assert_eq!(err.to_string(), "No id field (mandatory) in resource!");
    }

    #[test]
    fn test_io_context() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result.with_context(|| "reading tags".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "Error while reading tags");
    }
}
