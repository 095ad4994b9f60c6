use std::path::PathBuf;

use hdx_utils::error::{MergeError, PathError, UtilsError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("More than one HDX base configuration given!")]
    #[diagnostic(
        code(hdx_config::multiple_base_configs),
        help("Pass only one of the base configuration dict, JSON or YAML options")
    )]
    MultipleBaseConfigs,

    #[error("More than one HDX configuration given!")]
    #[diagnostic(
        code(hdx_config::multiple_hdx_configs),
        help("Pass only one of the HDX configuration dict, JSON or YAML options")
    )]
    MultipleHdxConfigs,

    #[error("More than one project configuration given!")]
    #[diagnostic(
        code(hdx_config::multiple_project_configs),
        help("Pass only one of the project configuration dict, JSON or YAML options")
    )]
    MultipleProjectConfigs,

    #[error("{0} not defined in configuration!")]
    #[diagnostic(
        code(hdx_config::site_not_defined),
        help("Use one of prod, demo, stage, feature or dev, or supply hdx_url")
    )]
    SiteNotDefined(String),

    #[error("No HDX API key supplied as a parameter or in configuration!")]
    #[diagnostic(
        code(hdx_config::missing_api_key),
        help("Set HDX_KEY, pass hdx_key, or enable read only access")
    )]
    MissingApiKey,

    #[error("No user agent supplied as a parameter or in configuration!")]
    #[diagnostic(
        code(hdx_config::missing_user_agent),
        help("Pass user_agent or full_agent, or add user_agent to your configuration")
    )]
    MissingUserAgent,

    #[error("Configuration already created!")]
    #[diagnostic(
        code(hdx_config::already_created),
        help("Call Configuration::delete first or use Configuration::setup to replace it")
    )]
    AlreadyCreated,

    #[error("There is no HDX configuration! Use Configuration::create")]
    #[diagnostic(code(hdx_config::not_created))]
    NotCreated,

    #[error("Configuration at {0} is not a mapping")]
    #[diagnostic(
        code(hdx_config::not_a_mapping),
        help("The top level of a configuration file must be key/value pairs")
    )]
    NotAMapping(String),

    #[error("Failed to parse YAML in {path}: {source}")]
    #[diagnostic(
        code(hdx_config::yaml),
        help("Check the YAML syntax of the file")
    )]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to parse JSON in {path}: {source}")]
    #[diagnostic(
        code(hdx_config::json),
        help("Check the JSON syntax of the file")
    )]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid site credentials: {0}")]
    #[diagnostic(
        code(hdx_config::credentials),
        help("username and password in the site block must be base64 encoded")
    )]
    InvalidCredentials(String),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(hdx_config::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(hdx_config::utils))]
    Utils(#[from] UtilsError),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

impl From<MergeError> for ConfigError {
    fn from(err: MergeError) -> Self {
        Self::Utils(UtilsError::Merge(err))
    }
}

pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            ConfigError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
