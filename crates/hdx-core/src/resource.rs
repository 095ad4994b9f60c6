//! HDX resources: files or urls belonging to a dataset.

use std::{
    borrow::Borrow,
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use hdx_remote::FileUpload;
use hdx_utils::uuid::is_valid_uuid;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::{
    context::{cached, store, Hdx},
    dataset::Dataset,
    date_helper::{get_hdx_date, get_hdx_time_period, get_time_period_info, now_utc, DateInput, TimePeriodInfo},
    error::HdxError,
    filestore::TEMPORARY_URL,
    object::{into_list, into_object, read_from_remote, HdxObject, ObjectState, UpdateOptions},
    resource_view::ResourceView,
    HdxResult,
};

/// File format aliases (lowercase) mapped to HDX formats.
pub type FormatsMappings = HashMap<String, String>;

#[derive(Clone, Debug)]
pub struct Resource {
    state: ObjectState,
    file_to_upload: Option<PathBuf>,
    data_updated: bool,
}

impl HdxObject for Resource {
    const OBJECT_TYPE: &'static str = "resource";
    const ACTIONS: &'static [(&'static str, &'static str)] = &[
        ("show", "resource_show"),
        ("update", "resource_update"),
        ("create", "resource_create"),
        ("patch", "resource_patch"),
        ("delete", "resource_delete"),
        ("search", "resource_search"),
        ("broken", "hdx_mark_broken_link_in_resource"),
        ("datastore_delete", "datastore_delete"),
        ("datastore_search", "datastore_search"),
    ];

    fn from_state(state: ObjectState) -> Self {
        Self {
            state,
            file_to_upload: None,
            data_updated: false,
        }
    }

    fn state(&self) -> &ObjectState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ObjectState {
        &mut self.state
    }

    /// Applies the url and upload rules, then checks the configured fields.
    fn check_required_fields(&mut self, ignore_fields: &[String]) -> HdxResult<()> {
        self.check_url_filetoupload()?;
        self.check_required_fields_for(Self::OBJECT_TYPE, ignore_fields)
    }
}

impl Borrow<Map<String, Value>> for Resource {
    fn borrow(&self) -> &Map<String, Value> {
        self.data()
    }
}

impl Resource {
    /// Reads a resource by id, which must be a uuid.
    pub fn read_from_hdx(hdx: &Hdx, identifier: &str) -> HdxResult<Option<Self>> {
        if !is_valid_uuid(identifier) {
            return Err(HdxError::invalid(format!(
                "{identifier} is not a valid resource id!"
            )));
        }
        Self::read_by_identifier(hdx, identifier)
    }

    fn require_id(&self) -> HdxResult<String> {
        self.get_str("id").map(String::from).ok_or_else(|| {
            HdxError::NoIdField {
                id_field: Self::ID_FIELD.to_string(),
                object_type: Self::OBJECT_TYPE.to_string(),
            }
        })
    }

    pub fn get_time_period(
        &self,
        date_format: Option<&str>,
        today: Option<DateTime<Utc>>,
    ) -> HdxResult<Option<TimePeriodInfo>> {
        get_time_period_info(
            self.get_str("daterange_for_data").unwrap_or_default(),
            date_format,
            today.unwrap_or_else(now_utc),
        )
    }

    pub fn set_time_period(
        &mut self,
        startdate: &DateInput,
        enddate: Option<&DateInput>,
        ignore_timeinfo: bool,
    ) {
        let period = get_hdx_time_period(startdate, enddate, false, ignore_timeinfo);
        self.set("daterange_for_data", period);
    }

    /// Downloads the formats mapping once per handle. `url` defaults to the
    /// configured `formats_mapping_url`.
    pub fn read_formats_mappings(hdx: &Hdx, url: Option<&str>) -> HdxResult<Arc<FormatsMappings>> {
        if let Some(mappings) = cached(&hdx.caches().formats) {
            return Ok(mappings);
        }
        let url = match url {
            Some(url) => url.to_string(),
            None => {
                hdx.configuration()
                    .get_str("formats_mapping_url")
                    .ok_or_else(|| HdxError::invalid("No formats_mapping_url configured!"))?
                    .to_string()
            }
        };
        let rows: Vec<Value> = serde_json::from_str(&hdx.remote().fetch_text(&url)?)?;
        let mut mappings = FormatsMappings::new();
        for row in &rows {
            let Some(hdx_format) = row.get(0).and_then(Value::as_str) else {
                continue;
            };
            let hdx_format = hdx_format.to_lowercase();
            if hdx_format == "_comment" {
                continue;
            }
            let aliases = row.get(3).map(|a| into_list(a.clone())).unwrap_or_default();
            for alias in aliases.iter().filter_map(Value::as_str) {
                mappings.insert(alias.to_lowercase(), hdx_format.clone());
            }
            mappings.insert(hdx_format.clone(), hdx_format);
        }
        let mappings = Arc::new(mappings);
        store(&hdx.caches().formats, Some(mappings.clone()));
        Ok(mappings)
    }

    pub fn set_formats_mappings(hdx: &Hdx, mappings: FormatsMappings) {
        store(&hdx.caches().formats, Some(Arc::new(mappings)));
    }

    /// Maps a file format to an HDX format, retrying with a leading dot added
    /// or removed.
    pub fn get_mapped_format(hdx: &Hdx, format: &str) -> HdxResult<Option<String>> {
        if format.is_empty() {
            return Ok(None);
        }
        let format = format.to_lowercase();
        let mappings = Self::read_formats_mappings(hdx, None)?;
        if let Some(mapped) = mappings.get(&format) {
            return Ok(Some(mapped.clone()));
        }
        let toggled = match format.strip_prefix('.') {
            Some(stripped) => stripped.to_string(),
            None => format!(".{format}"),
        };
        Ok(mappings.get(&toggled).cloned())
    }

    pub fn get_format(&self) -> Option<String> {
        self.get_str("format").map(str::to_lowercase)
    }

    /// Sets the format after mapping it to an HDX format.
    pub fn set_format(&mut self, format: &str) -> HdxResult<String> {
        let mapped = Self::get_mapped_format(self.hdx(), format)?.ok_or_else(|| {
            HdxError::invalid(format!(
                "Supplied file type {format} is invalid and could not be mapped to a known type!"
            ))
        })?;
        self.set("format", mapped.as_str());
        Ok(mapped)
    }

    pub fn clean_format(&mut self) -> HdxResult<String> {
        let format = self.get_str("format").unwrap_or_default().to_string();
        self.set_format(&format)
    }

    /// The file that will be uploaded on the next create or update.
    pub fn file_to_upload(&self) -> Option<&Path> {
        self.file_to_upload.as_deref()
    }

    /// Sets a local file to upload in place of a url. Returns the format when
    /// guessed from the file suffix.
    pub fn set_file_to_upload(
        &mut self,
        path: impl Into<PathBuf>,
        guess_format_from_suffix: bool,
    ) -> HdxResult<Option<String>> {
        self.remove("url");
        let path = path.into();
        let suffix = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        self.file_to_upload = Some(path);
        if guess_format_from_suffix {
            return self.set_format(&suffix).map(Some);
        }
        Ok(None)
    }

    /// A resource needs a url or a file to upload, not both. Defaults
    /// `resource_type` and `url_type` to match, then cleans the format.
    pub fn check_url_filetoupload(&mut self) -> HdxResult<()> {
        let has_url = self.contains_key("url");
        let (resource_type, url_type) = if self.file_to_upload.is_none() {
            if !has_url {
                return Err(HdxError::invalid(
                    "Either a url or a file to upload must be supplied!",
                ));
            }
            ("api", "api")
        } else {
            if has_url && self.get_str("url") != Some(TEMPORARY_URL) {
                return Err(HdxError::invalid(
                    "Either a url or a file to upload must be supplied not both!",
                ));
            }
            self.remove("tracking_summary");
            ("file.upload", "upload")
        };
        if !self.contains_key("resource_type") {
            self.set("resource_type", resource_type);
        }
        if !self.contains_key("url_type") {
            self.set("url_type", url_type);
        }
        self.clean_format()?;
        Ok(())
    }

    fn files(&self) -> Vec<FileUpload> {
        self.file_to_upload
            .iter()
            .map(|path| FileUpload::new("upload", path.clone()))
            .collect()
    }

    /// Merges and saves, uploading the file if there is one. A file is only
    /// uploaded once.
    fn resource_merge_hdx_update(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        if self.data_updated && self.file_to_upload.is_none() {
            let now = get_hdx_date(&now_utc().into(), false, true, false);
            if let Some(old_data) = self.state.old_data.as_mut() {
                old_data.insert("last_modified".into(), Value::String(now));
            }
            self.data_updated = false;
        }
        let files = self.files();
        let file = self.file_to_upload.take();
        let result = self.merge_hdx_update(&files, Self::FORCE_ACTIVE, options);
        if result.is_err() {
            self.file_to_upload = file;
        }
        result
    }

    pub fn update_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        self.check_load_existing_object("update")?;
        if self.file_to_upload.is_some() {
            self.remove("url");
        }
        self.resource_merge_hdx_update(options)
    }

    pub fn create_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        if !options.ignore_check {
            self.check_required_fields(&[])?;
        }
        if let Some(id) = self.get_str("id").map(String::from) {
            if self.load_from_hdx(&id)? {
                warn!("resource exists. Updating {id}");
                if self.file_to_upload.is_some() {
                    self.remove("url");
                }
                return self.resource_merge_hdx_update(options);
            }
        }
        let files = self.files();
        let file = self.file_to_upload.take();
        let result = self.save_to_hdx("create", Self::NAME_FIELD, &files, Self::FORCE_ACTIVE);
        if result.is_err() {
            self.file_to_upload = file;
        }
        result
    }

    pub fn delete_from_hdx(&mut self) -> HdxResult<()> {
        self.delete_object()
    }

    /// The dataset holding this resource.
    pub fn get_dataset(&self) -> HdxResult<Option<Dataset>> {
        let package_id = self
            .get_str("package_id")
            .ok_or_else(|| HdxError::invalid("Resource has no package id!"))?;
        Dataset::read_from_hdx(self.hdx(), package_id)
    }

    /// Searches resource metadata (not dataset metadata). `extra` may hold
    /// `order_by`, `offset` and `limit`.
    pub fn search_in_hdx(hdx: &Hdx, query: &str, extra: Map<String, Value>) -> HdxResult<Vec<Self>> {
        let result = Self::empty(hdx).read_remote(query, "query", Some(Self::action("search")?), extra)?;
        let Some(result) = result else {
            return Ok(Vec::new());
        };
        let count = result.get("count").and_then(Value::as_u64).unwrap_or(0);
        if count == 0 {
            return Ok(Vec::new());
        }
        into_list(result.get("results").cloned().unwrap_or(Value::Null))
            .into_iter()
            .map(|resource| Ok(Self::new(hdx, into_object(resource, "resource_search")?)))
            .collect()
    }

    /// Downloads the resource into `folder`, or the temporary directory.
    /// The file is named after the resource with its format as extension.
    /// Returns the url and the path written.
    pub fn download(&self, folder: Option<&Path>) -> HdxResult<(String, PathBuf)> {
        let url = match self.get_str("url") {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return Err(HdxError::invalid("No URL to download!")),
        };
        debug!("Downloading {url}");
        let mut filename = self.get_str("name").unwrap_or_default().to_string();
        let extension = format!(".{}", self.get_format().unwrap_or_default());
        if !filename.ends_with(&extension) {
            filename.push_str(&extension);
        }
        let folder = folder.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
        let path = folder.join(filename);
        self.hdx().remote().download(&url, &path)?;
        Ok((url, path))
    }

    /// Ids of every resource with a datastore table.
    pub fn get_all_resource_ids_in_datastore(hdx: &Hdx) -> HdxResult<Vec<String>> {
        let mut extra = Map::new();
        extra.insert("limit".into(), json!(10000));
        let result = read_from_remote(
            hdx,
            "datastore",
            Self::action("datastore_search")?,
            "resource_id",
            "_table_metadata",
            extra,
        )?;
        let Some(result) = result else {
            return Ok(Vec::new());
        };
        Ok(into_list(result.get("records").cloned().unwrap_or(Value::Null))
            .iter()
            .filter_map(|record| record.get("name").and_then(Value::as_str))
            .map(String::from)
            .collect())
    }

    pub fn has_datastore(&self) -> HdxResult<bool> {
        let id = self.require_id()?;
        let result = read_from_remote(
            self.hdx(),
            "datastore",
            Self::action("datastore_search")?,
            "resource_id",
            &id,
            Map::new(),
        )?;
        Ok(result.is_some_and(|result| !result.is_null()))
    }

    pub fn delete_datastore(&self) -> HdxResult<()> {
        let id = self.require_id()?;
        let mut extra = Map::new();
        extra.insert("force".into(), json!(true));
        read_from_remote(
            self.hdx(),
            "datastore",
            Self::action("datastore_delete")?,
            "resource_id",
            &id,
            extra,
        )?;
        Ok(())
    }

    pub fn get_resource_views(&self) -> HdxResult<Vec<ResourceView>> {
        ResourceView::get_all_for_resource(self.hdx(), &self.require_id()?)
    }

    /// Creates the view, or updates an existing one with the same id or
    /// title.
    pub fn add_update_resource_view(&self, resource_view: &mut ResourceView) -> HdxResult<()> {
        resource_view.create_in_hdx(&UpdateOptions::default())
    }

    pub fn add_update_resource_views(&self, resource_views: &mut [ResourceView]) -> HdxResult<()> {
        for resource_view in resource_views {
            self.add_update_resource_view(resource_view)?;
        }
        Ok(())
    }

    /// Orders the resource's views by the given view ids.
    pub fn reorder_resource_views<S: AsRef<str>>(&self, resource_view_ids: &[S]) -> HdxResult<()> {
        let mut order = Vec::with_capacity(resource_view_ids.len());
        for id in resource_view_ids {
            let id = id.as_ref();
            if !is_valid_uuid(id) {
                return Err(HdxError::invalid(format!(
                    "{id} is not a valid resource view id!"
                )));
            }
            order.push(Value::String(id.to_string()));
        }
        let mut extra = Map::new();
        extra.insert("order".into(), Value::Array(order));
        read_from_remote(
            self.hdx(),
            ResourceView::OBJECT_TYPE,
            ResourceView::action("reorder")?,
            "id",
            &self.require_id()?,
            extra,
        )?;
        Ok(())
    }

    pub fn delete_resource_view_by_id(&self, resource_view_id: &str) -> HdxResult<()> {
        if !is_valid_uuid(resource_view_id) {
            return Err(HdxError::invalid(format!(
                "{resource_view_id} is not a valid resource view id!"
            )));
        }
        let mut data = Map::new();
        data.insert("id".into(), json!(resource_view_id));
        ResourceView::new(self.hdx(), data).delete_from_hdx()
    }

    /// Deletes a view. A view without an id is looked up by title among the
    /// resource's views.
    pub fn delete_resource_view(&self, mut resource_view: ResourceView) -> HdxResult<()> {
        if !resource_view.contains_key("id") {
            let title = resource_view.get("title").cloned();
            resource_view = self
                .get_resource_views()?
                .into_iter()
                .find(|view| view.get("title") == title.as_ref())
                .ok_or_else(|| {
                    let title = title.as_ref().map(crate::object::value_to_string).unwrap_or_default();
                    HdxError::invalid(format!(
                        "No resource views have title {title} in this resource!"
                    ))
                })?;
        }
        resource_view.delete_from_hdx()
    }

    pub fn enable_dataset_preview(&mut self) {
        self.set("dataset_preview_enabled", "True");
    }

    pub fn disable_dataset_preview(&mut self) {
        self.set("dataset_preview_enabled", "False");
    }

    pub fn is_broken(&self) -> bool {
        self.get("broken_link").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Flags the resource's link as broken in HDX without regrouping or
    /// validating the dataset.
    pub fn mark_broken(&mut self) -> HdxResult<()> {
        let id = self.require_id()?;
        let mut extra = Map::new();
        extra.insert("batch_mode".into(), json!("KEEP_OLD"));
        extra.insert("skip_validation".into(), json!(true));
        if let Some(result) = self.read_remote(&id, "id", Some(Self::action("broken")?), extra)? {
            *self.data_mut() = into_object(result, "hdx_mark_broken_link_in_resource")?;
        }
        Ok(())
    }

    pub fn is_marked_data_updated(&self) -> bool {
        self.data_updated
    }

    /// Marks the url's data as updated so that `last_modified` is set to now
    /// on the next save.
    pub fn mark_data_updated(&mut self) {
        self.data_updated = true;
    }

    pub(crate) fn set_data_updated(&mut self, data_updated: bool) {
        self.data_updated = data_updated;
    }

    pub fn get_date_data_updated(&self) -> HdxResult<Option<DateTime<Utc>>> {
        self.get_str("last_modified")
            .map(|date| DateInput::parse(date).map(|date| date.to_utc()))
            .transpose()
    }

    pub fn set_date_data_updated(&mut self, date: &DateInput, ignore_timeinfo: bool) {
        self.set("last_modified", get_hdx_date(date, ignore_timeinfo, true, false));
    }

    pub fn get_hdx_url(&self) -> Option<String> {
        let id = self.get_str("id").filter(|id| !id.is_empty())?;
        let dataset_id = self.get_str("package_id").filter(|id| !id.is_empty())?;
        Some(format!(
            "{}/dataset/{dataset_id}/resource/{id}",
            self.hdx().configuration().get_hdx_site_url()
        ))
    }

    pub fn get_api_url(&self) -> Option<String> {
        let id = self.get_str("id").filter(|id| !id.is_empty())?;
        Some(format!(
            "{}/api/3/action/resource_show?id={id}",
            self.hdx().configuration().get_hdx_site_url()
        ))
    }
}
