use std::{
    env,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use hdx_utils::{dict::merge_two_dictionaries, path::home_dir};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    error::{ConfigError, Result},
    loader::{load_json, load_yaml, load_yaml_str},
};

/// Prefix placed in front of every user agent sent to HDX.
pub const USER_AGENT_PREFIX: &str = concat!("HDXRustLibrary/", env!("CARGO_PKG_VERSION"));

/// File name of the per-user HDX configuration looked up in the home directory.
pub const DEFAULT_HDX_CONFIG_FILE: &str = ".hdx_configuration.yaml";

const BASE_CONFIGURATION: &str = include_str!("hdx_base_configuration.yaml");

static CONFIGURATION: LazyLock<RwLock<Option<Arc<Configuration>>>> =
    LazyLock::new(|| RwLock::new(None));

/// Options for building a [`Configuration`].
///
/// Each configuration layer (base, HDX and project) can be given as an
/// in-memory mapping, a JSON file or a YAML file, but only one of the three.
#[derive(Clone, Debug, Default)]
pub struct ConfigurationOptions {
    /// Script identifier appended to [`USER_AGENT_PREFIX`].
    pub user_agent: Option<String>,
    /// Complete user agent, used as is.
    pub full_agent: Option<String>,
    /// HDX url to use. Overrides `hdx_site`.
    pub hdx_url: Option<String>,
    /// HDX site to use, eg. prod or stage.
    pub hdx_site: Option<String>,
    pub hdx_read_only: Option<bool>,
    pub hdx_key: Option<String>,

    pub hdx_base_config_dict: Option<Map<String, Value>>,
    pub hdx_base_config_json: Option<PathBuf>,
    pub hdx_base_config_yaml: Option<PathBuf>,

    pub hdx_config_dict: Option<Map<String, Value>>,
    pub hdx_config_json: Option<PathBuf>,
    pub hdx_config_yaml: Option<PathBuf>,

    pub project_config_dict: Option<Map<String, Value>>,
    pub project_config_json: Option<PathBuf>,
    pub project_config_yaml: Option<PathBuf>,
}

impl ConfigurationOptions {
    /// Overrides options with `HDX_KEY`, `HDX_URL` and `HDX_SITE`. `HDX_SITE`
    /// is only read when `HDX_URL` is unset.
    pub fn with_env(mut self) -> Self {
        if let Ok(key) = env::var("HDX_KEY") {
            self.hdx_key = Some(key);
        }
        match env::var("HDX_URL") {
            Ok(url) => self.hdx_url = Some(url),
            Err(_) => {
                if let Ok(site) = env::var("HDX_SITE") {
                    self.hdx_site = Some(site);
                }
            }
        }
        self
    }
}

/// Connection details of an HDX site block such as `hdx_prod_site`.
#[derive(Clone, Debug, Deserialize)]
pub struct SiteConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Configuration {
    data: Map<String, Value>,
    hdx_site: String,
    site: SiteConfig,
    hdx_read_only: bool,
    hdx_key: Option<String>,
    user_agent: String,
}

fn select_layer(
    dict: Option<Map<String, Value>>,
    json: Option<&Path>,
    yaml: Option<&Path>,
    name: &str,
    multiple: fn() -> ConfigError,
) -> Result<Option<Map<String, Value>>> {
    let mut found = None;
    if let Some(dict) = dict {
        info!("Loading {name} from dictionary");
        found = Some(dict);
    }
    if let Some(json) = json {
        if found.is_some() {
            return Err(multiple());
        }
        info!("Loading {name} from: {}", json.display());
        found = Some(load_json(json)?);
    }
    if let Some(yaml) = yaml {
        if found.is_some() {
            return Err(multiple());
        }
        info!("Loading {name} from: {}", yaml.display());
        found = Some(load_yaml(yaml)?);
    }
    Ok(found)
}

fn string_option(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl Configuration {
    /// Builds a configuration from layered sources.
    ///
    /// The base configuration (embedded unless replaced) is merged with the HDX
    /// configuration, which defaults to `~/.hdx_configuration.yaml` when that
    /// file exists, and then with the project configuration. Explicit options
    /// take precedence over values read from the layers.
    pub fn new(options: ConfigurationOptions) -> Result<Self> {
        let base = select_layer(
            options.hdx_base_config_dict.filter(|d| !d.is_empty()),
            options.hdx_base_config_json.as_deref(),
            options.hdx_base_config_yaml.as_deref(),
            "HDX base configuration",
            || ConfigError::MultipleBaseConfigs,
        )?;
        let mut data = match base {
            Some(base) => base,
            None => {
                info!("No HDX base configuration parameter. Using internal base configuration.");
                load_yaml_str(BASE_CONFIGURATION, Path::new("hdx_base_configuration.yaml"))?
            }
        };

        let hdx_config = select_layer(
            options.hdx_config_dict.filter(|d| !d.is_empty()),
            options.hdx_config_json.as_deref(),
            options.hdx_config_yaml.as_deref(),
            "HDX configuration",
            || ConfigError::MultipleHdxConfigs,
        )?;
        let hdx_config = match hdx_config {
            Some(config) => config,
            None => {
                let default_path = home_dir().join(DEFAULT_HDX_CONFIG_FILE);
                if default_path.is_file() {
                    info!(
                        "No HDX configuration parameter. Using default configuration file: {}.",
                        default_path.display()
                    );
                    load_yaml(&default_path)?
                } else {
                    info!(
                        "No HDX configuration parameter and no configuration file at default path: {}.",
                        default_path.display()
                    );
                    Map::new()
                }
            }
        };
        merge_two_dictionaries(&mut data, hdx_config)?;

        let project_config = select_layer(
            options.project_config_dict,
            options.project_config_json.as_deref(),
            options.project_config_yaml.as_deref(),
            "project configuration",
            || ConfigError::MultipleProjectConfigs,
        )?;
        if let Some(project_config) = project_config {
            merge_two_dictionaries(&mut data, project_config)?;
        }

        let user_agent = match options.full_agent {
            Some(full_agent) => full_agent,
            None => {
                let user_agent = options
                    .user_agent
                    .or_else(|| string_option(&data, "user_agent"))
                    .ok_or(ConfigError::MissingUserAgent)?;
                format!("{USER_AGENT_PREFIX}-{user_agent}")
            }
        };

        let (site_name, hdx_site) = match options
            .hdx_url
            .or_else(|| string_option(&data, "hdx_url"))
        {
            Some(hdx_url) => {
                let hdx_site = "hdx_custom_site".to_string();
                let mut site = Map::new();
                site.insert(
                    "url".into(),
                    Value::String(hdx_url.trim_end_matches('/').to_string()),
                );
                data.insert(hdx_site.clone(), Value::Object(site));
                ("custom".to_string(), hdx_site)
            }
            None => {
                let site_name = options
                    .hdx_site
                    .or_else(|| string_option(&data, "hdx_site"))
                    .unwrap_or_else(|| "stage".to_string());
                let hdx_site = format!("hdx_{site_name}_site");
                if !data.contains_key(&hdx_site) {
                    return Err(ConfigError::SiteNotDefined(hdx_site));
                }
                (site_name, hdx_site)
            }
        };
        let site: SiteConfig = data
            .get(&hdx_site)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .ok_or_else(|| ConfigError::SiteNotDefined(hdx_site.clone()))?;

        let hdx_read_only = options
            .hdx_read_only
            .or_else(|| data.get("hdx_read_only").and_then(Value::as_bool))
            .unwrap_or(false);
        info!("Read only access to HDX: {hdx_read_only}");

        let hdx_key = string_option(&data, &format!("hdx_key_{site_name}"))
            .or(options.hdx_key.filter(|k| !k.is_empty()))
            .or_else(|| string_option(&data, "hdx_key"));
        if hdx_key.is_none() && !hdx_read_only {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(Self {
            data,
            hdx_site,
            site,
            hdx_read_only,
            hdx_key,
            user_agent,
        })
    }

    /// Value of a top level configuration key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// String value of a top level configuration key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Name of the selected site block, eg. `hdx_prod_site`.
    pub fn hdx_site(&self) -> &str {
        &self.hdx_site
    }

    pub fn is_read_only(&self) -> bool {
        self.hdx_read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.hdx_read_only = read_only;
    }

    /// The configured API key regardless of read only mode.
    pub fn hdx_key(&self) -> Option<&str> {
        self.hdx_key.as_deref()
    }

    pub fn set_api_key(&mut self, apikey: impl Into<String>) {
        self.hdx_key = Some(apikey.into());
    }

    /// API key to send with requests. Read only configurations never send one.
    pub fn get_api_key(&self) -> Option<&str> {
        if self.hdx_read_only {
            return None;
        }
        self.hdx_key.as_deref()
    }

    pub fn get_user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn get_hdx_site_url(&self) -> &str {
        &self.site.url
    }

    pub fn get_dataset_url(&self, name: &str) -> String {
        format!("{}/dataset/{name}", self.site.url)
    }

    /// Decoded basic auth credentials of the selected site, if it has any.
    pub fn get_credentials(&self) -> Result<Option<(String, String)>> {
        let Some(username) = &self.site.username else {
            return Ok(None);
        };
        let decode = |encoded: &str| {
            STANDARD
                .decode(encoded)
                .map_err(|err| ConfigError::InvalidCredentials(err.to_string()))
                .and_then(|bytes| {
                    String::from_utf8(bytes)
                        .map_err(|err| ConfigError::InvalidCredentials(err.to_string()))
                })
        };
        let password = self.site.password.as_deref().unwrap_or_default();
        Ok(Some((decode(username)?, decode(password)?)))
    }

    /// Required fields configured for an object type such as `dataset` or
    /// `resource view`.
    pub fn required_fields(&self, object_type: &str) -> Vec<String> {
        self.data
            .get(object_type)
            .and_then(|section| section.get("required_fields"))
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Field that is not required when updating an object type.
    pub fn ignore_on_update(&self, object_type: &str) -> Option<&str> {
        self.data
            .get(object_type)
            .and_then(|section| section.get("ignore_on_update"))
            .and_then(Value::as_str)
    }

    /// Creates the global configuration, reading `HDX_KEY`, `HDX_URL` and
    /// `HDX_SITE` from the environment. Returns the site url.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::AlreadyCreated`] if a global configuration exists
    pub fn create(options: ConfigurationOptions) -> Result<String> {
        let mut global = CONFIGURATION.write().unwrap_or_else(PoisonError::into_inner);
        if global.is_some() {
            return Err(ConfigError::AlreadyCreated);
        }
        let configuration = Configuration::new(options.with_env())?;
        let url = configuration.get_hdx_site_url().to_string();
        *global = Some(Arc::new(configuration));
        Ok(url)
    }

    /// Replaces the global configuration.
    pub fn setup(configuration: Configuration) -> Arc<Configuration> {
        let configuration = Arc::new(configuration);
        let mut global = CONFIGURATION.write().unwrap_or_else(PoisonError::into_inner);
        *global = Some(configuration.clone());
        configuration
    }

    /// Returns the global configuration.
    pub fn read() -> Result<Arc<Configuration>> {
        CONFIGURATION
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ConfigError::NotCreated)
    }

    pub fn delete() {
        let mut global = CONFIGURATION.write().unwrap_or_else(PoisonError::into_inner);
        *global = None;
    }
}
