use std::{error::Error, fmt, path::PathBuf};

#[derive(Debug)]
pub enum MergeError {
    NonObjectIntoObject { from: String, into: String },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::NonObjectIntoObject { from, into } => {
                write!(f, "Cannot merge non-dict `{from}` into dict `{into}`")
            }
        }
    }
}

impl Error for MergeError {}

#[derive(Debug)]
pub enum HashError {
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    WorkbookFailed {
        path: PathBuf,
        reason: String,
    },
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashError::ReadFailed { path, source } => {
                write!(f, "Failed to read file `{}`: {source}", path.display())
            }
            HashError::WorkbookFailed { path, reason } => {
                write!(f, "Failed to read workbook `{}`: {reason}", path.display())
            }
        }
    }
}

impl Error for HashError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HashError::ReadFailed { source, .. } => Some(source),
            HashError::WorkbookFailed { .. } => None,
        }
    }
}

#[derive(Debug)]
pub enum PathError {
    CurrentDir { source: std::io::Error },

    Empty,

    MissingEnvVar { var: String, input: String },

    UnclosedVariable { input: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "Path is empty"),
            PathError::CurrentDir { source } => {
                write!(f, "Failed to get current directory: {source}")
            }
            PathError::UnclosedVariable { input } => {
                write!(f, "Unclosed variable expression starting at `{input}`")
            }
            PathError::MissingEnvVar { var, input } => {
                write!(f, "Environment variable `{var}` not set in `{input}`")
            }
        }
    }
}

impl Error for PathError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PathError::CurrentDir { source } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum UtilsError {
    Merge(MergeError),
    Hash(HashError),
    Path(PathError),
}

impl fmt::Display for UtilsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UtilsError::Merge(err) => write!(f, "{err}"),
            UtilsError::Hash(err) => write!(f, "{err}"),
            UtilsError::Path(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UtilsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            UtilsError::Merge(err) => Some(err),
            UtilsError::Hash(err) => Some(err),
            UtilsError::Path(err) => Some(err),
        }
    }
}

impl From<MergeError> for UtilsError {
    fn from(err: MergeError) -> Self {
        UtilsError::Merge(err)
    }
}

impl From<HashError> for UtilsError {
    fn from(err: HashError) -> Self {
        UtilsError::Hash(err)
    }
}

impl From<PathError> for UtilsError {
    fn from(err: PathError) -> Self {
        UtilsError::Path(err)
    }
}

pub type HashResult<T> = std::result::Result<T, HashError>;
pub type MergeResult<T> = std::result::Result<T, MergeError>;
pub type PathResult<T> = std::result::Result<T, PathError>;

pub type UtilsResult<T> = std::result::Result<T, UtilsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_merge_error_display() {
        let error = MergeError::NonObjectIntoObject {
            from: "1".to_string(),
            into: "{}".to_string(),
        };
        assert_eq!(error.to_string(), "Cannot merge non-dict `1` into dict `{}`");
    }

    #[test]
    fn test_hash_error_source() {
        let error = HashError::ReadFailed {
            path: PathBuf::from("/missing"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert!(error.source().is_some());
        assert_eq!(
            error.to_string(),
            "Failed to read file `/missing`: not found"
        );
    }

    #[test]
    fn test_utils_error_wraps_path_error() {
        let error: UtilsError = PathError::Empty.into();
        assert_eq!(error.to_string(), "Path is empty");
        assert!(error.source().is_some());
    }
}
