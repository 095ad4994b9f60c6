use std::{
    fmt,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

use hdx_config::{Configuration, ConfigurationOptions};
use hdx_remote::{FileUpload, HttpCkan, RemoteCkan};
use serde_json::{Map, Value};

use crate::{
    locations::Location, resource::FormatsMappings, vocabulary::TagsMappings, HdxResult,
};

static HDX: LazyLock<RwLock<Option<Hdx>>> = LazyLock::new(|| RwLock::new(None));

/// Lookups downloaded once and shared by every object using the same [`Hdx`].
#[derive(Default)]
pub struct Caches {
    pub(crate) approved_vocabulary: RwLock<Option<Map<String, Value>>>,
    pub(crate) tags_mappings: RwLock<Option<Arc<TagsMappings>>>,
    pub(crate) formats: RwLock<Option<Arc<FormatsMappings>>>,
    pub(crate) locations: RwLock<Option<Arc<Vec<Location>>>>,
}

/// Reads a cached value, ignoring lock poisoning.
pub(crate) fn cached<T: Clone>(lock: &RwLock<Option<T>>) -> Option<T> {
    lock.read().unwrap_or_else(PoisonError::into_inner).clone()
}

pub(crate) fn store<T>(lock: &RwLock<Option<T>>, value: Option<T>) {
    *lock.write().unwrap_or_else(PoisonError::into_inner) = value;
}

struct HdxInner {
    configuration: Arc<Configuration>,
    remote: Arc<dyn RemoteCkan>,
    caches: Caches,
}

/// Handle to an HDX site: its configuration, the CKAN transport and the
/// lookup caches. Cloning is cheap and clones share caches.
#[derive(Clone)]
pub struct Hdx {
    inner: Arc<HdxInner>,
}

impl fmt::Debug for Hdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hdx")
            .field("site", &self.inner.configuration.get_hdx_site_url())
            .finish()
    }
}

impl Hdx {
    pub fn new(configuration: Arc<Configuration>, remote: Arc<dyn RemoteCkan>) -> Self {
        Self {
            inner: Arc::new(HdxInner {
                configuration,
                remote,
                caches: Caches::default(),
            }),
        }
    }

    /// Connects to the configured site over HTTP.
    pub fn connect(configuration: Arc<Configuration>) -> HdxResult<Self> {
        let remote = HttpCkan::from_configuration(&configuration)?;
        Ok(Self::new(configuration, Arc::new(remote)))
    }

    /// Creates the global configuration and the global handle. Returns the
    /// site url.
    pub fn create(options: ConfigurationOptions) -> HdxResult<String> {
        let url = Configuration::create(options)?;
        let hdx = Self::connect(Configuration::read()?)?;
        Self::setup(hdx);
        Ok(url)
    }

    /// Replaces the global handle.
    pub fn setup(hdx: Hdx) {
        store(&HDX, Some(hdx));
    }

    /// Returns the global handle, connecting with the global configuration on
    /// first use.
    pub fn read() -> HdxResult<Self> {
        if let Some(hdx) = cached(&HDX) {
            return Ok(hdx);
        }
        let hdx = Self::connect(Configuration::read()?)?;
        Self::setup(hdx.clone());
        Ok(hdx)
    }

    pub fn delete() {
        store(&HDX, None);
    }

    pub fn configuration(&self) -> &Configuration {
        &self.inner.configuration
    }

    pub fn remote(&self) -> &dyn RemoteCkan {
        self.inner.remote.as_ref()
    }

    pub(crate) fn caches(&self) -> &Caches {
        &self.inner.caches
    }

    pub fn call_action(
        &self,
        action: &str,
        data: &Value,
        files: &[FileUpload],
    ) -> hdx_remote::error::Result<Value> {
        self.inner.remote.call_action(action, data, files)
    }
}
