//! HDX datasets and the resources they hold.
//!
//! Resources are kept apart from the dataset metadata while the dataset is
//! being edited and folded back into the `resources` key when it is saved.
//! Saving goes through `package_revise` so that files can be uploaded in the
//! same request.

use std::{
    collections::{BTreeMap, HashSet},
    path::PathBuf,
};

use chrono::{DateTime, Utc};
use hdx_remote::FileUpload;
use hdx_utils::{dict::merge_two_dictionaries, uuid::is_valid_uuid};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::{
    context::Hdx,
    date_helper::{get_hdx_time_period, get_hdx_time_period_from_years, get_time_period_info, now_utc, DateInput, TimePeriodInfo},
    error::HdxError,
    filestore::{
        check_filestore_resource, dataset_update_filestore_resource, resource_check_required_fields,
        FilestoreResources, FilestoreStatus, TEMPORARY_URL,
    },
    locations::Locations,
    object::{into_list, into_object, read_from_remote, value_to_string, HdxObject, ObjectState, UpdateOptions},
    organization::Organization,
    quickcharts::{hxl_preview_config, load_template, QuickChartOptions},
    resource::Resource,
    resource_matcher::{match_resource_list, match_resource_lists},
    resource_view::ResourceView,
    showcase::Showcase,
    title_helper::{describe, get_dates_from_title, DateRange},
    user::User,
    vocabulary::Vocabulary,
    HdxResult,
};

const MAX_ATTEMPTS: usize = 5;
const DEFAULT_PAGE_SIZE: usize = 1000;
const SORT_BY_CREATION: &str = "metadata_created asc";
const SORT_BY_RELEVANCE: &str = "relevance asc, metadata_modified desc";
/// Resource field holding the errors a pipeline hit processing it.
pub const HAPI_ERROR_FIELD: &str = "hapi_error";

/// Update frequency codes with their labels, followed by the accepted
/// aliases mapped to codes.
pub const UPDATE_FREQUENCIES: &[(&str, &str)] = &[
    ("-2", "As needed"),
    ("-1", "Never"),
    ("0", "Live"),
    ("1", "Every day"),
    ("7", "Every week"),
    ("14", "Every two weeks"),
    ("30", "Every month"),
    ("90", "Every three months"),
    ("180", "Every six months"),
    ("365", "Every year"),
    ("as needed", "-2"),
    ("adhoc", "-2"),
    ("never", "-1"),
    ("live", "0"),
    ("every day", "1"),
    ("every week", "7"),
    ("every two weeks", "14"),
    ("every month", "30"),
    ("every three months", "90"),
    ("every quarter", "90"),
    ("every six months", "180"),
    ("every year", "365"),
    ("daily", "1"),
    ("weekly", "7"),
    ("fortnightly", "14"),
    ("every other week", "14"),
    ("monthly", "30"),
    ("quarterly", "90"),
    ("semiannually", "180"),
    ("semiyearly", "180"),
    ("annually", "365"),
    ("yearly", "365"),
];

/// Parameters for [`Dataset::search_in_hdx`].
#[derive(Clone, Debug)]
pub struct SearchOptions {
    /// Total number of datasets wanted. Unlimited when `None`.
    pub rows: Option<usize>,
    pub start: Option<usize>,
    pub sort: Option<String>,
    /// Solr filter query.
    pub fq: Option<String>,
    /// Datasets requested per call.
    pub page_size: usize,
    /// Further `package_search` parameters, eg. `facet`.
    pub extra: Map<String, Value>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            rows: None,
            start: None,
            sort: None,
            fq: None,
            page_size: DEFAULT_PAGE_SIZE,
            extra: Map::new(),
        }
    }
}

/// Options for [`Dataset::update_in_hdx`] and [`Dataset::create_in_hdx`].
#[derive(Clone, Debug)]
pub struct DatasetUpdateOptions {
    pub update: UpdateOptions,
    /// Allow creating a dataset without resources.
    pub allow_no_resources: bool,
    /// Merge the local resources into those in HDX.
    pub update_resources: bool,
    /// Pair resources by id, name and format rather than by position.
    pub match_resources_by_metadata: bool,
    /// Top level keys to remove from the dataset in HDX.
    pub keys_to_delete: Vec<String>,
    /// Delete resources in HDX that have no local counterpart.
    pub remove_additional_resources: bool,
    /// Reorder the resources in HDX to follow the local order.
    pub match_resource_order: bool,
    pub create_default_views: bool,
    pub hxl_update: bool,
    /// Script name stamped into `updated_by_script`. Defaults to the user
    /// agent.
    pub updated_by_script: Option<String>,
    /// Batch uuid grouping several dataset updates.
    pub batch: Option<String>,
    /// Build the revise request without sending it.
    pub test: bool,
}

impl Default for DatasetUpdateOptions {
    fn default() -> Self {
        Self {
            update: UpdateOptions::default(),
            allow_no_resources: false,
            update_resources: true,
            match_resources_by_metadata: true,
            keys_to_delete: Vec::new(),
            remove_additional_resources: false,
            match_resource_order: false,
            create_default_views: true,
            hxl_update: true,
            updated_by_script: None,
            batch: None,
            test: false,
        }
    }
}

/// What a save sent, or would send, to `package_revise`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RevisePayload {
    pub filter: Vec<String>,
    pub update: Map<String, Value>,
    /// Multipart field name to local file.
    pub files_to_upload: BTreeMap<String, PathBuf>,
}

/// Picks a resource by position, or by id or name.
#[derive(Clone, Copy, Debug)]
pub enum ResourceSelector<'a> {
    Index(usize),
    IdOrName(&'a str),
}

fn resources_from_value(hdx: &Hdx, value: Value) -> Vec<Resource> {
    into_list(value)
        .into_iter()
        .filter_map(|resource| {
            match resource {
                Value::Object(data) => Some(Resource::new(hdx, data)),
                _ => None,
            }
        })
        .collect()
}

fn resource_order_key(resource: &Resource) -> (String, String) {
    (
        resource.get_str("name").unwrap_or_default().to_string(),
        resource.get_format().unwrap_or_default(),
    )
}

fn merge_resource(existing: &mut Resource, resource: &Resource) -> HdxResult<()> {
    merge_two_dictionaries(existing.data_mut(), resource.data().clone())?;
    if let Some(path) = resource.file_to_upload() {
        existing.set_file_to_upload(path, false)?;
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct Dataset {
    state: ObjectState,
    resources: Vec<Resource>,
    /// Local resources set aside while the dataset is reloaded from HDX.
    old_resources: Option<Vec<Resource>>,
    /// QuickCharts view waiting for its resource to get an id.
    preview_resourceview: Option<ResourceView>,
}

impl HdxObject for Dataset {
    const OBJECT_TYPE: &'static str = "dataset";
    const ACTIONS: &'static [(&'static str, &'static str)] = &[
        ("show", "package_show"),
        ("update", "package_update"),
        ("create", "package_create"),
        ("patch", "package_patch"),
        ("revise", "package_revise"),
        ("delete", "hdx_dataset_purge"),
        ("search", "package_search"),
        ("reorder", "package_resource_reorder"),
        ("list", "package_list"),
        ("autocomplete", "package_autocomplete"),
        ("hxl", "package_hxl_update"),
        ("create_default_views", "package_create_default_resource_views"),
    ];

    fn from_state(mut state: ObjectState) -> Self {
        let resources = match state.data.remove("resources") {
            Some(resources) => resources_from_value(&state.hdx, resources),
            None => Vec::new(),
        };
        Self {
            state,
            resources,
            old_resources: None,
            preview_resourceview: None,
        }
    }

    fn state(&self) -> &ObjectState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ObjectState {
        &mut self.state
    }

    fn check_required_fields(&mut self, ignore_fields: &[String]) -> HdxResult<()> {
        self.check_dataset_fields(ignore_fields, false)
    }
}

impl Dataset {
    pub fn read_from_hdx(hdx: &Hdx, identifier: &str) -> HdxResult<Option<Self>> {
        let mut dataset = Self::empty(hdx);
        if dataset.dataset_load_from_hdx(identifier)? {
            Ok(Some(dataset))
        } else {
            Ok(None)
        }
    }

    fn dataset_load_from_hdx(&mut self, id_or_name: &str) -> HdxResult<bool> {
        if !self.load_from_hdx(id_or_name)? {
            return Ok(false);
        }
        if self.contains_key("resources") {
            self.old_resources = Some(std::mem::take(&mut self.resources));
            self.separate_resources()?;
        }
        Ok(true)
    }

    fn require_id(&self) -> HdxResult<String> {
        self.get_str("id")
            .filter(|id| !id.is_empty())
            .map(String::from)
            .ok_or_else(|| {
                HdxError::invalid("Dataset has no id! It must be read, created or updated first.")
            })
    }

    /// Moves the `resources` key into the resource list, merging entries
    /// with the same name.
    pub fn separate_resources(&mut self) -> HdxResult<()> {
        let Some(resources) = self.remove("resources") else {
            return Ok(());
        };
        for resource in resources_from_value(self.hdx(), resources) {
            let name = resource.get("name").cloned();
            let existing = self
                .resources
                .iter_mut()
                .find(|existing| name.is_some() && existing.get("name") == name.as_ref());
            match existing {
                Some(existing) => merge_two_dictionaries(existing.data_mut(), resource.data().clone())?,
                None => self.resources.push(resource),
            }
        }
        Ok(())
    }

    fn resources_value(&self) -> Value {
        Value::Array(
            self.resources
                .iter()
                .map(|resource| Value::Object(resource.data().clone()))
                .collect(),
        )
    }

    /// Merges static metadata from YAML, including any resources.
    pub fn update_from_yaml<P: AsRef<std::path::Path>>(&mut self, path: P) -> HdxResult<()> {
        HdxObject::update_from_yaml(self, path)?;
        self.separate_resources()
    }

    pub fn update_from_json<P: AsRef<std::path::Path>>(&mut self, path: P) -> HdxResult<()> {
        HdxObject::update_from_json(self, path)?;
        self.separate_resources()
    }

    fn check_no_dataset_id(resource: &Resource, ignore_datasetid: bool) -> HdxResult<()> {
        if resource.contains_key("package_id") && !ignore_datasetid {
            return Err(HdxError::invalid(format!(
                "Resource {} being added already has a dataset id!",
                resource.get_str("name").unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Adds a resource, merging it into an existing resource that matches
    /// by id or by name (and format for duplicated names).
    pub fn add_update_resource(&mut self, mut resource: Resource, ignore_datasetid: bool) -> HdxResult<()> {
        Self::check_no_dataset_id(&resource, ignore_datasetid)?;
        resource.check_url_filetoupload()?;
        match match_resource_list(&self.resources, resource.data()) {
            Some(index) => merge_resource(&mut self.resources[index], &resource),
            None => {
                self.resources.push(resource);
                Ok(())
            }
        }
    }

    /// Reads a resource by id and adds it.
    pub fn add_update_resource_by_id(&mut self, identifier: &str, ignore_datasetid: bool) -> HdxResult<()> {
        let resource = Resource::read_from_hdx(self.hdx(), identifier)?.ok_or_else(|| {
            HdxError::invalid(format!("{identifier} cannot be added as a resource!"))
        })?;
        self.add_update_resource(resource, ignore_datasetid)
    }

    pub fn add_update_resources(&mut self, mut resources: Vec<Resource>, ignore_datasetid: bool) -> HdxResult<()> {
        for resource in &resources {
            Self::check_no_dataset_id(resource, ignore_datasetid)?;
        }
        let matches = match_resource_lists(&self.resources, &resources);
        for (&index, &new_index) in matches.index1_matches.iter().zip(&matches.index2_matches) {
            let resource = &mut resources[new_index];
            resource.check_url_filetoupload()?;
            merge_resource(&mut self.resources[index], resource)?;
        }
        for &new_index in &matches.index2_nomatches {
            let mut resource = resources[new_index].clone();
            resource.check_url_filetoupload()?;
            self.resources.push(resource);
        }
        Ok(())
    }

    /// Removes the resource with the given id, also deleting it in HDX when
    /// `delete` is set. Returns false if the dataset has no such resource.
    pub fn delete_resource(&mut self, identifier: &str, delete: bool) -> HdxResult<bool> {
        if !is_valid_uuid(identifier) {
            return Err(HdxError::invalid(format!(
                "{identifier} is not a valid resource id!"
            )));
        }
        let Some(index) = self
            .resources
            .iter()
            .position(|resource| resource.get_str("id") == Some(identifier))
        else {
            return Ok(false);
        };
        let mut resource = self.resources.remove(index);
        if delete {
            resource.delete_from_hdx()?;
        }
        Ok(true)
    }

    pub fn get_resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn get_resources_mut(&mut self) -> &mut [Resource] {
        &mut self.resources
    }

    pub fn get_resource(&self, index: usize) -> Option<&Resource> {
        self.resources.get(index)
    }

    pub fn number_of_resources(&self) -> usize {
        self.resources.len()
    }

    /// Sets the order of the resources in HDX and locally.
    pub fn reorder_resources<S: AsRef<str>>(&mut self, resource_ids: &[S], hxl_update: bool) -> HdxResult<()> {
        let id = self.require_id()?;
        let order: Vec<&str> = resource_ids.iter().map(AsRef::as_ref).collect();
        let result = self.write_to_hdx("reorder", &json!({"id": id, "order": order}), Some("id"), &[])?;
        let ordered_ids = result.get("order").cloned().map(into_list).unwrap_or_default();
        let mut resources = std::mem::take(&mut self.resources);
        for resource_id in ordered_ids.iter().filter_map(Value::as_str) {
            if let Some(index) = resources
                .iter()
                .position(|resource| resource.get_str("id") == Some(resource_id))
            {
                self.resources.push(resources.remove(index));
            }
        }
        self.resources.extend(resources);
        if hxl_update {
            self.hxl_update()?;
        }
        Ok(())
    }

    /// Checks the dataset's required fields and then each resource's.
    /// Ignore fields prefixed with `resource:` apply to resources only.
    pub fn check_dataset_fields(&mut self, ignore_fields: &[String], allow_no_resources: bool) -> HdxResult<()> {
        let dataset_ignore_fields: Vec<String> = ignore_fields
            .iter()
            .filter(|field| !field.starts_with("resource:"))
            .cloned()
            .collect();
        if self.is_requestable() {
            return self.check_required_fields_for("dataset-requestable", &dataset_ignore_fields);
        }
        self.check_required_fields_for(Self::OBJECT_TYPE, &dataset_ignore_fields)?;
        if self.resources.is_empty() && !allow_no_resources {
            return Err(HdxError::invalid(
                "There are no resources! Please add at least one resource!",
            ));
        }
        let options = UpdateOptions {
            ignore_fields: ignore_fields.to_vec(),
            ..Default::default()
        };
        for resource in &mut self.resources {
            resource_check_required_fields(resource, false, &options)?;
        }
        Ok(())
    }

    /// Sends `package_revise`. `match`, `filter` and `update` are sent as
    /// compact JSON strings.
    pub fn revise(
        hdx: &Hdx,
        match_dict: &Value,
        filter: &[String],
        update: &Map<String, Value>,
        files_to_upload: &BTreeMap<String, PathBuf>,
    ) -> HdxResult<Self> {
        let mut data = Map::new();
        data.insert("match".into(), Value::String(serde_json::to_string(match_dict)?));
        if !filter.is_empty() {
            data.insert("filter".into(), Value::String(serde_json::to_string(filter)?));
        }
        if !update.is_empty() {
            data.insert("update".into(), Value::String(serde_json::to_string(update)?));
        }
        let files: Vec<FileUpload> = files_to_upload
            .iter()
            .map(|(field, path)| FileUpload::new(field.as_str(), path.clone()))
            .collect();
        let result = Self::empty(hdx).write_to_hdx("revise", &Value::Object(data), Some("match"), &files)?;
        let package = match result {
            Value::Object(mut result) => result.remove("package").unwrap_or(Value::Null),
            other => other,
        };
        Ok(Self::new(hdx, into_object(package, "package_revise")?))
    }

    fn stamp_updated_by_script(&mut self, options: &DatasetUpdateOptions) {
        let script = options
            .updated_by_script
            .clone()
            .unwrap_or_else(|| self.hdx().configuration().get_user_agent().to_string());
        let now = now_utc().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f");
        self.set("updated_by_script", format!("{script} ({now})"));
    }

    /// Saves the dataset with its resources, uploading queued files through
    /// `package_revise`.
    #[allow(clippy::too_many_arguments)]
    fn save_dataset(
        &mut self,
        default_operation: &str,
        id_field: &str,
        resources_to_delete: &[usize],
        new_resource_order: Option<Vec<(String, String)>>,
        mut filestore_resources: FilestoreResources,
        options: &DatasetUpdateOptions,
        create_default_views: bool,
    ) -> HdxResult<Option<RevisePayload>> {
        if !self.resources.is_empty() {
            let resources = self.resources_value();
            self.set("resources", resources);
        }
        self.clean_tags(true)?;
        self.stamp_updated_by_script(options);

        let mut update_options = options.update.clone();
        if let Some(batch) = &options.batch {
            if !is_valid_uuid(batch) {
                return Err(HdxError::invalid(format!("{batch} is not a valid UUID!")));
            }
            self.set("batch", batch.as_str());
            if update_options.batch_mode.is_none() {
                update_options.batch_mode = Some("DONT_GROUP".to_string());
            }
        }
        let operation = update_options
            .operation
            .clone()
            .unwrap_or_else(|| default_operation.to_string());
        update_options.operation = Some(operation.clone());

        let mut revise = true;
        if operation == "create" {
            update_options.ignore_check = true;
            self.apply_update_options(&update_options);
            self.save_to_hdx("create", id_field, &[], true)?;
            if filestore_resources.is_empty() && options.keys_to_delete.is_empty() {
                revise = false;
                self.resources.clear();
                self.separate_resources()?;
            }
        }

        let mut payload = None;
        if revise {
            self.state.old_data = Some(self.state.data.clone());
            self.check_fields(&update_options)?;
            self.apply_update_options(&update_options);
            self.set("state", "active");
            let mut filter = Vec::new();
            for key in &options.keys_to_delete {
                filter.push(format!("-{key}"));
                self.remove(key);
            }
            let mut files_to_upload = BTreeMap::new();
            if !self.is_requestable() {
                if let Some(Value::Array(resources)) = self.data_mut().get_mut("resources") {
                    for &index in resources_to_delete {
                        if index < resources.len() {
                            resources.remove(index);
                        }
                        if index == resources.len() {
                            filter.push(format!("-resources__{index}"));
                        }
                        filestore_resources = filestore_resources
                            .into_iter()
                            .map(|(i, path)| if i > index { (i - 1, path) } else { (i, path) })
                            .collect();
                    }
                }
                for (index, path) in &filestore_resources {
                    files_to_upload.insert(format!("update__resources__{index}__upload"), path.clone());
                }
            }
            let revise_payload = RevisePayload {
                filter,
                update: self.data().clone(),
                files_to_upload,
            };
            if options.test {
                return Ok(Some(revise_payload));
            }
            let match_dict = json!({"id": self.get("id").cloned().unwrap_or(Value::Null)});
            let revised = Self::revise(
                self.hdx(),
                &match_dict,
                &revise_payload.filter,
                &revise_payload.update,
                &revise_payload.files_to_upload,
            )?;
            self.state.data = revised.state.data;
            self.resources = revised.resources;
            payload = Some(revise_payload);
        }

        if let Some(order) = new_resource_order {
            let existing: Vec<(String, String)> = self.resources.iter().map(resource_order_key).collect();
            if existing != order {
                let mut sorted: Vec<&Resource> = self.resources.iter().collect();
                sorted.sort_by_key(|resource| {
                    let key = resource_order_key(resource);
                    order.iter().position(|wanted| *wanted == key).unwrap_or(usize::MAX)
                });
                let ids: Vec<String> = sorted
                    .iter()
                    .filter_map(|resource| resource.get_str("id").map(String::from))
                    .collect();
                self.reorder_resources(&ids, false)?;
            }
        }
        if create_default_views {
            self.create_default_views(false)?;
        }
        self.create_preview_resourceview()?;
        if options.hxl_update {
            self.hxl_update()?;
        }
        Ok(payload)
    }

    /// Merges a local resource into the matching resource read from HDX,
    /// queueing its file unless the size and hash are unchanged.
    fn merge_filestore_resource(
        &mut self,
        index: usize,
        updated: &mut Resource,
        filestore_resources: &mut FilestoreResources,
        options: &UpdateOptions,
    ) -> HdxResult<()> {
        let status = dataset_update_filestore_resource(&self.resources[index], updated, filestore_resources, index)?;
        debug!("Resource {index} filestore status {}", status.code());
        let resource = &mut self.resources[index];
        merge_two_dictionaries(resource.data_mut(), updated.data().clone())?;
        if status == FilestoreStatus::Uploaded {
            if let Some(path) = updated.file_to_upload() {
                resource.set_file_to_upload(path, false)?;
            }
        }
        resource_check_required_fields(resource, true, options)?;
        if resource.file_to_upload().is_some() {
            resource.set("url", TEMPORARY_URL);
        }
        Ok(())
    }

    fn add_filestore_resource(
        &mut self,
        mut resource: Resource,
        filestore_resources: &mut FilestoreResources,
        options: &UpdateOptions,
    ) -> HdxResult<()> {
        check_filestore_resource(&mut resource, filestore_resources, self.resources.len(), options)?;
        self.resources.push(resource);
        Ok(())
    }

    fn dataset_merge_hdx_update(&mut self, options: &DatasetUpdateOptions) -> HdxResult<Option<RevisePayload>> {
        self.merge_old_data()?;
        self.remove("resources");
        let mut updated_resources = self.old_resources.take().unwrap_or_default();
        let mut resources_to_delete = Vec::new();
        let mut filestore_resources = FilestoreResources::new();
        let new_resource_order = (options.match_resource_order && !updated_resources.is_empty())
            .then(|| updated_resources.iter().map(resource_order_key).collect());

        if options.update_resources && !updated_resources.is_empty() {
            if options.match_resources_by_metadata {
                let matches = match_resource_lists(&self.resources, &updated_resources);
                for (&index, &updated_index) in matches.index1_matches.iter().zip(&matches.index2_matches) {
                    warn!(
                        "Resource exists. Updating {}",
                        self.resources[index].get_str("name").unwrap_or_default()
                    );
                    self.merge_filestore_resource(
                        index,
                        &mut updated_resources[updated_index],
                        &mut filestore_resources,
                        &options.update,
                    )?;
                }
                for &updated_index in &matches.index2_nomatches {
                    let resource = updated_resources[updated_index].clone();
                    self.add_filestore_resource(resource, &mut filestore_resources, &options.update)?;
                }
                if options.remove_additional_resources {
                    for &index in &matches.index1_nomatches {
                        warn!(
                            "Removing additional resource {}!",
                            self.resources[index].get_str("name").unwrap_or_default()
                        );
                        resources_to_delete.push(index);
                    }
                }
            } else {
                let existing = self.resources.len();
                for (index, updated) in updated_resources.iter_mut().enumerate() {
                    if index < existing {
                        let resource_name = self.resources[index].get_str("name").unwrap_or_default();
                        warn!("Resource exists. Updating {resource_name}");
                        let updated_name = updated.get_str("name").unwrap_or_default();
                        if resource_name != updated_name {
                            warn!("Changing resource name to: {updated_name}");
                        }
                        self.merge_filestore_resource(index, updated, &mut filestore_resources, &options.update)?;
                    } else {
                        self.add_filestore_resource(updated.clone(), &mut filestore_resources, &options.update)?;
                    }
                }
                if options.remove_additional_resources {
                    for index in updated_resources.len()..self.resources.len() {
                        warn!(
                            "Removing additional resource {}!",
                            self.resources[index].get_str("name").unwrap_or_default()
                        );
                        resources_to_delete.push(index);
                    }
                }
            }
        }
        resources_to_delete.sort_unstable_by(|a, b| b.cmp(a));
        self.save_dataset(
            "update",
            "id",
            &resources_to_delete,
            new_resource_order,
            filestore_resources,
            options,
            options.create_default_views,
        )
    }

    /// Updates the dataset in HDX, loading it by id and then by name.
    /// Returns what was sent to `package_revise`.
    pub fn update_in_hdx(&mut self, options: &DatasetUpdateOptions) -> HdxResult<Option<RevisePayload>> {
        let mut loaded = false;
        if let Some(id) = self.get(Self::ID_FIELD).map(value_to_string) {
            self.check_existing_object()?;
            if self.dataset_load_from_hdx(&id)? {
                loaded = true;
            } else {
                warn!("Failed to load dataset with id {id}");
            }
        }
        if !loaded {
            if self.data().is_empty() {
                return Err(HdxError::NoData(Self::OBJECT_TYPE.to_string()));
            }
            let name = self.get_str("name").map(String::from).ok_or_else(|| {
                HdxError::NoIdField {
                    id_field: "name".to_string(),
                    object_type: Self::OBJECT_TYPE.to_string(),
                }
            })?;
            if !self.dataset_load_from_hdx(&name)? {
                return Err(HdxError::NoExisting {
                    object_type: Self::OBJECT_TYPE.to_string(),
                    operation: "update".to_string(),
                });
            }
        }
        let payload = self.dataset_merge_hdx_update(options)?;
        info!("Updated {}", self.get_hdx_url().unwrap_or_default());
        Ok(payload)
    }

    /// Creates the dataset, or updates it if it already exists by id or name.
    pub fn create_in_hdx(&mut self, options: &DatasetUpdateOptions) -> HdxResult<Option<RevisePayload>> {
        if !options.update.ignore_check {
            self.check_dataset_fields(&options.update.ignore_fields, options.allow_no_resources)?;
        }
        let mut loaded = false;
        if let Some(id) = self.get(Self::ID_FIELD).map(value_to_string) {
            if self.dataset_load_from_hdx(&id)? {
                loaded = true;
            } else {
                warn!("Failed to load dataset with id {id}");
            }
        }
        if !loaded {
            if let Some(name) = self.get_str("name").map(String::from) {
                loaded = self.dataset_load_from_hdx(&name)?;
            }
        }
        if loaded {
            let payload = self.dataset_merge_hdx_update(options)?;
            info!("Updated {}", self.get_hdx_url().unwrap_or_default());
            return Ok(payload);
        }

        let mut filestore_resources = FilestoreResources::new();
        for (index, resource) in self.resources.iter_mut().enumerate() {
            check_filestore_resource(resource, &mut filestore_resources, index, &options.update)?;
        }
        let payload = self.save_dataset("create", "name", &[], None, filestore_resources, options, false)?;
        info!("Created {}", self.get_hdx_url().unwrap_or_default());
        Ok(payload)
    }

    /// Purges the dataset.
    pub fn delete_from_hdx(&mut self) -> HdxResult<()> {
        self.delete_object()
    }

    /// Asks HDX to refresh the dataset's HXL metadata.
    pub fn hxl_update(&self) -> HdxResult<()> {
        let id = self.require_id()?;
        self.read_remote(&id, "id", Some(Self::action("hxl")?), Map::new())?;
        Ok(())
    }

    pub fn create_default_views(&self, create_datastore_views: bool) -> HdxResult<()> {
        let mut package = self.data().clone();
        if !self.resources.is_empty() {
            package.insert("resources".into(), self.resources_value());
        }
        let data = json!({"package": package, "create_datastore_views": create_datastore_views});
        self.write_to_hdx("create_default_views", &data, None, &[])?;
        Ok(())
    }

    /// Searches datasets with a Solr query, requesting pages of
    /// `page_size`. A search whose counts change between pages, or that
    /// returns a dataset twice, is retried.
    pub fn search_in_hdx(hdx: &Hdx, query: &str, options: &SearchOptions) -> HdxResult<Vec<Self>> {
        let page_size = options.page_size.max(1);
        let total_rows = options.rows.unwrap_or(usize::MAX);
        let sort = options.sort.clone().unwrap_or_else(|| {
            if total_rows > page_size {
                SORT_BY_CREATION.to_string()
            } else {
                SORT_BY_RELEVANCE.to_string()
            }
        });
        let start = options.start.unwrap_or(0);
        let action = Self::action("search")?;

        for attempt in 1..=MAX_ATTEMPTS {
            let mut all_datasets: Vec<Self> = Vec::new();
            let mut counts = HashSet::new();
            for page in 0..=(total_rows / page_size) {
                let offset = page * page_size;
                let rows = (total_rows - offset).min(page_size);
                if rows == 0 {
                    break;
                }
                let mut extra = options.extra.clone();
                if let Some(fq) = &options.fq {
                    extra.insert("fq".into(), json!(fq));
                }
                extra.insert("sort".into(), json!(sort));
                extra.insert("start".into(), json!(start.saturating_add(offset)));
                extra.insert("rows".into(), json!(rows));
                let Some(result) = read_from_remote(hdx, Self::OBJECT_TYPE, action, "q", query, extra)? else {
                    debug!("No result searching for {query} from {offset}");
                    // Skipped pages only make sense towards a requested row count.
                    if options.rows.is_none() && counts.is_empty() {
                        break;
                    }
                    continue;
                };
                let count = result.get("count").and_then(Value::as_u64).unwrap_or(0);
                if count == 0 {
                    break;
                }
                counts.insert(count);
                let results = result.get("results").cloned().map(into_list).unwrap_or_default();
                let no_results = results.len();
                for datasetdict in results {
                    all_datasets.push(Self::new(hdx, into_object(datasetdict, action)?));
                }
                if no_results < rows {
                    break;
                }
            }
            if sort != SORT_BY_CREATION && !all_datasets.is_empty() && counts.len() != 1 {
                debug!("Counts differ on attempt {attempt}: {counts:?}");
                continue;
            }
            let ids: HashSet<&str> = all_datasets.iter().filter_map(|dataset| dataset.get_str("id")).collect();
            if ids.len() != all_datasets.len() {
                debug!("Repeated datasets on attempt {attempt}");
                continue;
            }
            return Ok(all_datasets);
        }
        Err(HdxError::invalid(
            "Maximum attempts reached for searching for datasets!",
        ))
    }

    /// Names of all datasets, optionally limited to `rows` from `start`.
    pub fn get_all_dataset_names(hdx: &Hdx, rows: Option<usize>, start: Option<usize>) -> HdxResult<Vec<String>> {
        let mut data = Map::new();
        if let Some(rows) = rows {
            data.insert("limit".into(), json!(rows));
        }
        if let Some(start) = start {
            data.insert("offset".into(), json!(start));
        }
        let result = Self::empty(hdx).write_to_hdx("list", &Value::Object(data), None, &[])?;
        Ok(into_list(result)
            .into_iter()
            .filter_map(|name| name.as_str().map(String::from))
            .collect())
    }

    /// Every dataset, oldest first unless another sort is given.
    pub fn get_all_datasets(hdx: &Hdx, options: &SearchOptions) -> HdxResult<Vec<Self>> {
        let mut options = options.clone();
        if options.sort.is_none() {
            options.sort = Some(SORT_BY_CREATION.to_string());
        }
        Self::search_in_hdx(hdx, "*:*", &options)
    }

    pub fn get_all_resources(datasets: &[Self]) -> Vec<Resource> {
        datasets
            .iter()
            .flat_map(|dataset| dataset.resources.iter().cloned())
            .collect()
    }

    pub fn autocomplete(hdx: &Hdx, name: &str, limit: usize) -> HdxResult<Vec<Value>> {
        Self::autocomplete_with(hdx, name, limit, Map::new())
    }

    pub fn get_time_period(
        &self,
        date_format: Option<&str>,
        today: Option<DateTime<Utc>>,
    ) -> HdxResult<Option<TimePeriodInfo>> {
        get_time_period_info(
            self.get_str("dataset_date").unwrap_or_default(),
            date_format,
            today.unwrap_or_else(now_utc),
        )
    }

    pub fn set_time_period(
        &mut self,
        startdate: &DateInput,
        enddate: Option<&DateInput>,
        ongoing: bool,
        ignore_timeinfo: bool,
    ) {
        let period = get_hdx_time_period(startdate, enddate, ongoing, ignore_timeinfo);
        self.set("dataset_date", period);
    }

    /// Sets the time period to span whole years. Returns the sorted years.
    pub fn set_time_period_year_range<I>(&mut self, years: I) -> HdxResult<Vec<i32>>
    where
        I: IntoIterator<Item = i32>,
    {
        let (period, years) = get_hdx_time_period_from_years(years)?;
        self.set("dataset_date", period);
        Ok(years)
    }

    /// Finds the dates in the title, optionally removing them and setting the
    /// time period from the earliest range. Returns the sorted ranges.
    pub fn remove_dates_from_title(&mut self, change_title: bool, set_time_period: bool) -> HdxResult<Vec<DateRange>> {
        let title = self
            .get_str("title")
            .ok_or_else(|| HdxError::invalid("Dataset has no title!"))?;
        let (newtitle, ranges) = get_dates_from_title(title);
        if change_title {
            self.set("title", newtitle);
        }
        if let (true, Some((start, end))) = (set_time_period, ranges.first()) {
            debug!("Setting time period {} from title", describe(&(*start, *end)));
            self.set_time_period(&(*start).into(), Some(&(*end).into()), false, true);
        }
        Ok(ranges)
    }

    pub fn list_valid_update_frequencies() -> Vec<&'static str> {
        UPDATE_FREQUENCIES.iter().map(|(key, _)| *key).collect()
    }

    /// Converts between an update frequency code and its label. Aliases map
    /// to codes.
    pub fn transform_update_frequency(frequency: &str) -> Option<String> {
        let frequency = frequency.to_lowercase();
        UPDATE_FREQUENCIES
            .iter()
            .find(|(key, _)| key.to_lowercase() == frequency)
            .map(|(_, value)| value.to_string())
    }

    /// The label of the dataset's update frequency.
    pub fn get_expected_update_frequency(&self) -> Option<String> {
        let days = self.get("data_update_frequency").map(value_to_string)?;
        if days.is_empty() {
            return None;
        }
        Self::transform_update_frequency(&days)
    }

    /// Sets the update frequency from a code, label or alias.
    pub fn set_expected_update_frequency(&mut self, update_frequency: &str) -> HdxResult<()> {
        let code = if update_frequency.trim().parse::<i64>().is_ok() {
            Some(update_frequency.trim().to_string())
        } else {
            Self::transform_update_frequency(update_frequency)
        };
        match code {
            Some(code) if UPDATE_FREQUENCIES.iter().any(|(key, _)| *key == code) => {
                self.set("data_update_frequency", code);
                Ok(())
            }
            _ => Err(HdxError::invalid("Invalid update frequency supplied!")),
        }
    }

    pub fn add_tag(&mut self, tag: &str, log_deleted: bool) -> HdxResult<(Vec<String>, Vec<String>)> {
        Vocabulary::add_mapped_tag(self, tag, log_deleted)
    }

    pub fn add_tags<S: AsRef<str>>(
        &mut self,
        tags: &[S],
        log_deleted: bool,
    ) -> HdxResult<(Vec<String>, Vec<String>)> {
        Vocabulary::add_mapped_tags(self, tags, log_deleted)
    }

    pub fn clean_tags(&mut self, log_deleted: bool) -> HdxResult<(Vec<String>, Vec<String>)> {
        Vocabulary::clean_tags(self, log_deleted)
    }

    pub fn is_subnational(&self) -> bool {
        self.get_str("subnational") == Some("1")
    }

    pub fn set_subnational(&mut self, subnational: bool) {
        self.set("subnational", if subnational { "1" } else { "0" });
    }

    fn group_names(&self) -> Vec<String> {
        self.get("groups")
            .and_then(Value::as_array)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(|group| group.get("name").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_location_iso3s(&self) -> Vec<String> {
        self.group_names()
    }

    /// Location titles for the dataset's location codes.
    pub fn get_location_names(&self) -> HdxResult<Vec<String>> {
        let locations = Locations::valid_locations(self.hdx())?;
        Ok(self
            .group_names()
            .iter()
            .filter_map(|code| Locations::get_location_from_hdx_code(&locations, code))
            .collect())
    }

    /// Adds a country given by name or iso3 code. The name may match
    /// partially.
    pub fn add_country_location(&mut self, country: &str, exact: bool) -> HdxResult<bool> {
        let locations = Locations::valid_locations(self.hdx())?;
        let (Some(iso3), _) = Locations::get_hdx_code_from_location_partial(&locations, country) else {
            return Err(HdxError::invalid(format!(
                "Country: {country} - cannot find iso3 code!"
            )));
        };
        let alterror = format!("Country: {country} with iso3: {iso3} could not be found in HDX list!");
        self.add_other_location(&iso3, exact, Some(&alterror))
    }

    /// Adds countries, returning false if any was already present.
    pub fn add_country_locations<S: AsRef<str>>(&mut self, countries: &[S]) -> HdxResult<bool> {
        let mut all_added = true;
        for country in countries {
            if !self.add_country_location(country.as_ref(), true)? {
                all_added = false;
            }
        }
        Ok(all_added)
    }

    /// Adds a location known to HDX. With `exact` a partial match is an
    /// error. Returns false if the location was already present.
    pub fn add_other_location(&mut self, location: &str, exact: bool, alterror: Option<&str>) -> HdxResult<bool> {
        let locations = Locations::valid_locations(self.hdx())?;
        let (code, matched) = Locations::get_hdx_code_from_location_partial(&locations, location);
        let code = match code {
            Some(code) if matched || !exact => code.to_lowercase(),
            _ => {
                return Err(HdxError::invalid(match alterror {
                    Some(alterror) => alterror.to_string(),
                    None => format!("Location: {location} - cannot find in HDX!"),
                }))
            }
        };
        if self.group_names().contains(&code) {
            return Ok(false);
        }
        match self.data_mut().get_mut("groups") {
            Some(Value::Array(groups)) => groups.push(json!({"name": code})),
            _ => self.set("groups", json!([{"name": code}])),
        }
        Ok(true)
    }

    pub fn remove_location(&mut self, location: &str) -> bool {
        self.remove_hdxobject("groups", location, "name")
            || self.remove_hdxobject("groups", &location.to_uppercase(), "name")
            || self.remove_hdxobject("groups", &location.to_lowercase(), "name")
    }

    pub fn get_maintainer(&self) -> HdxResult<Option<User>> {
        match self.get_str("maintainer") {
            Some(maintainer) => User::read_from_hdx(self.hdx(), maintainer),
            None => Ok(None),
        }
    }

    /// Sets the maintainer by user id.
    pub fn set_maintainer(&mut self, maintainer: &str) -> HdxResult<()> {
        if !is_valid_uuid(maintainer) {
            return Err(HdxError::invalid(format!(
                "{maintainer} is not a valid user id for a maintainer!"
            )));
        }
        self.set("maintainer", maintainer);
        Ok(())
    }

    /// Sets the maintainer from a user, reading it by name if it has no id.
    pub fn set_maintainer_user(&mut self, user: &User) -> HdxResult<()> {
        let id = match user.get_str("id") {
            Some(id) => id.to_string(),
            None => {
                let name = user.get_str("name").unwrap_or_default();
                User::read_from_hdx(self.hdx(), name)?
                    .and_then(|user| user.get_str("id").map(String::from))
                    .ok_or_else(|| HdxError::invalid(format!("{name} cannot be added as a maintainer!")))?
            }
        };
        self.set_maintainer(&id)
    }

    pub fn get_organization(&self) -> HdxResult<Option<Organization>> {
        match self.get_str("owner_org") {
            Some(owner_org) => Organization::read_from_hdx(self.hdx(), owner_org),
            None => Ok(None),
        }
    }

    /// Sets the owning organization by id. `hdx` is also accepted.
    pub fn set_organization(&mut self, organization: &str) -> HdxResult<()> {
        if !is_valid_uuid(organization) && organization != "hdx" {
            return Err(HdxError::invalid(format!(
                "{organization} is not a valid organization id!"
            )));
        }
        self.set("owner_org", organization);
        Ok(())
    }

    pub fn set_organization_from(&mut self, organization: &Organization) -> HdxResult<()> {
        let id = match organization.get_str("id") {
            Some(id) => id.to_string(),
            None => {
                let name = organization.get_str("name").unwrap_or_default();
                Organization::read_from_hdx(self.hdx(), name)?
                    .and_then(|organization| organization.get_str("id").map(String::from))
                    .ok_or_else(|| HdxError::invalid(format!("{name} cannot be added as an organization!")))?
            }
        };
        self.set_organization(&id)
    }

    pub fn get_showcases(&self) -> HdxResult<Vec<Showcase>> {
        let id = self.require_id()?;
        let result = self.read_remote(&id, "package_id", Some(Showcase::action("list_showcases")?), Map::new())?;
        result
            .map(into_list)
            .unwrap_or_default()
            .into_iter()
            .map(|showcase| Ok(Showcase::new(self.hdx(), into_object(showcase, "list_showcases")?)))
            .collect()
    }

    fn dataset_showcase_dict(&self, showcase_id: &str) -> HdxResult<Value> {
        if !is_valid_uuid(showcase_id) {
            return Err(HdxError::invalid(format!(
                "{showcase_id} is not a valid showcase id!"
            )));
        }
        Ok(json!({"package_id": self.require_id()?, "showcase_id": showcase_id}))
    }

    /// Links a showcase by id unless it is among `showcases_to_check`, which
    /// defaults to the dataset's current showcases.
    pub fn add_showcase(&self, showcase_id: &str, showcases_to_check: Option<&[Showcase]>) -> HdxResult<bool> {
        let data = self.dataset_showcase_dict(showcase_id)?;
        let existing;
        let showcases_to_check = match showcases_to_check {
            Some(showcases) => showcases,
            None => {
                existing = self.get_showcases()?;
                &existing
            }
        };
        if showcases_to_check
            .iter()
            .any(|showcase| showcase.get_str("id") == Some(showcase_id))
        {
            return Ok(false);
        }
        Showcase::empty(self.hdx()).write_to_hdx("associate", &data, Some("package_id"), &[])?;
        Ok(true)
    }

    pub fn add_showcases<S: AsRef<str>>(
        &self,
        showcase_ids: &[S],
        showcases_to_check: Option<&[Showcase]>,
    ) -> HdxResult<bool> {
        let existing;
        let showcases_to_check = match showcases_to_check {
            Some(showcases) => showcases,
            None => {
                existing = self.get_showcases()?;
                &existing
            }
        };
        let mut all_added = true;
        for showcase_id in showcase_ids {
            if !self.add_showcase(showcase_id.as_ref(), Some(showcases_to_check))? {
                all_added = false;
            }
        }
        Ok(all_added)
    }

    pub fn remove_showcase(&self, showcase_id: &str) -> HdxResult<()> {
        let data = self.dataset_showcase_dict(showcase_id)?;
        Showcase::empty(self.hdx()).write_to_hdx("disassociate", &data, Some("package_id"), &[])?;
        Ok(())
    }

    pub fn is_requestable(&self) -> bool {
        self.get("is_requestdata_type")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Requestable datasets are always public.
    pub fn set_requestable(&mut self, requestable: bool) {
        self.set("is_requestdata_type", requestable);
        if requestable {
            self.set("private", false);
        }
    }

    fn require_requestable(&self, operation: &str) -> HdxResult<()> {
        if self.is_requestable() {
            return Ok(());
        }
        Err(HdxError::NotRequestable(format!(
            "{operation} is only applicable to requestable datasets!"
        )))
    }

    pub fn get_fieldnames(&self) -> HdxResult<Vec<String>> {
        self.require_requestable("get_fieldnames")?;
        Ok(self.get_stringlist_from_commastring("field_names"))
    }

    pub fn add_fieldname(&mut self, fieldname: &str) -> HdxResult<bool> {
        self.require_requestable("add_fieldname")?;
        Ok(self.add_string_to_commastring("field_names", fieldname))
    }

    pub fn add_fieldnames<S: AsRef<str>>(&mut self, fieldnames: &[S]) -> HdxResult<bool> {
        self.require_requestable("add_fieldnames")?;
        Ok(self.add_strings_to_commastring("field_names", fieldnames))
    }

    pub fn remove_fieldname(&mut self, fieldname: &str) -> HdxResult<bool> {
        self.require_requestable("remove_fieldname")?;
        Ok(self.remove_string_from_commastring("field_names", fieldname))
    }

    /// File types of a requestable dataset, or the formats of the resources
    /// otherwise.
    pub fn get_filetypes(&self) -> Vec<String> {
        if !self.is_requestable() {
            return self.resources.iter().filter_map(Resource::get_format).collect();
        }
        self.get_stringlist_from_commastring("file_types")
    }

    pub fn add_filetype(&mut self, filetype: &str) -> HdxResult<bool> {
        self.require_requestable("add_filetype")?;
        Ok(self.add_string_to_commastring("file_types", filetype))
    }

    pub fn add_filetypes<S: AsRef<str>>(&mut self, filetypes: &[S]) -> HdxResult<bool> {
        self.require_requestable("add_filetypes")?;
        Ok(self.add_strings_to_commastring("file_types", filetypes))
    }

    pub fn remove_filetype(&mut self, filetype: &str) -> HdxResult<bool> {
        self.require_requestable("remove_filetype")?;
        Ok(self.remove_string_from_commastring("file_types", filetype))
    }

    pub fn preview_off(&mut self) {
        self.set("dataset_preview", "no_preview");
        for resource in &mut self.resources {
            resource.disable_dataset_preview();
        }
    }

    pub fn preview_resource(&mut self) {
        self.set("dataset_preview", "resource_id");
    }

    /// Enables the preview on one resource and disables it on the rest.
    /// Returns the index of the previewed resource.
    pub fn set_quickchart_resource(&mut self, selector: ResourceSelector<'_>) -> HdxResult<Option<usize>> {
        let key = match selector {
            ResourceSelector::Index(index) => {
                let resource = self.resources.get(index).ok_or_else(|| {
                    HdxError::invalid(format!("Dataset has no resource at index {index}!"))
                })?;
                resource
                    .get_str("id")
                    .or_else(|| resource.get_str("name"))
                    .unwrap_or_default()
                    .to_string()
            }
            ResourceSelector::IdOrName(key) => key.to_string(),
        };
        let search = if is_valid_uuid(&key) { "id" } else { "name" };
        let mut preview = None;
        for (index, resource) in self.resources.iter_mut().enumerate() {
            if preview.is_none() && resource.get_str(search) == Some(key.as_str()) {
                resource.enable_dataset_preview();
                preview = Some(index);
            } else {
                resource.disable_dataset_preview();
            }
        }
        if preview.is_some() {
            self.preview_resource();
        }
        Ok(preview)
    }

    /// Creates the QuickCharts view for the previewed resource, or queues it
    /// until the next save when the resource has no id yet. Turns the preview
    /// off when no view results.
    pub fn generate_resource_view(
        &mut self,
        selector: ResourceSelector<'_>,
        options: &QuickChartOptions,
    ) -> HdxResult<Option<ResourceView>> {
        let view = self.build_resource_view(selector, options)?;
        if view.is_none() {
            self.preview_off();
        }
        Ok(view)
    }

    fn build_resource_view(
        &mut self,
        selector: ResourceSelector<'_>,
        options: &QuickChartOptions,
    ) -> HdxResult<Option<ResourceView>> {
        let bites_disabled = options.bites_disabled.unwrap_or_default();
        if bites_disabled == [true; 3] {
            return Ok(None);
        }
        let Some(index) = self.set_quickchart_resource(selector)? else {
            return Ok(None);
        };
        let resource = &self.resources[index];
        let mut data = Map::new();
        match resource.get_str("id") {
            Some(id) => data.insert("resource_id".into(), id.into()),
            None => data.insert("resource_name".into(), resource.get_str("name").unwrap_or_default().into()),
        };
        let mut view = ResourceView::new(self.hdx(), data);
        load_template(&mut view, options.path.as_deref(), options.indicators.is_some())?;
        let template = view
            .get_str("hxl_preview_config")
            .ok_or_else(|| {
                HdxError::MissingField {
                    field: "hxl_preview_config".to_string(),
                    object_type: ResourceView::OBJECT_TYPE.to_string(),
                }
            })?
            .to_string();
        let Some(config) = hxl_preview_config(
            &template,
            bites_disabled,
            options.indicators.as_deref(),
            &options.findreplace,
        )?
        else {
            return Ok(None);
        };
        view.set("hxl_preview_config", config);

        if view.contains_key("resource_id") {
            view.create_in_hdx(&UpdateOptions::default())?;
            self.preview_resourceview = None;
        } else {
            debug!("Delaying QuickCharts view until resource has an id");
            self.preview_resourceview = Some(view.clone());
        }
        Ok(Some(view))
    }

    /// Creates the queued QuickCharts view once its resource has an id.
    fn create_preview_resourceview(&mut self) -> HdxResult<()> {
        let Some(mut view) = self.preview_resourceview.take() else {
            return Ok(());
        };
        let name = view.get_str("resource_name").map(String::from);
        let resource_id = self
            .resources
            .iter()
            .find(|resource| name.is_some() && resource.get_str("name") == name.as_deref())
            .and_then(|resource| resource.get_str("id"))
            .map(String::from);
        match resource_id {
            Some(resource_id) => {
                view.remove("resource_name");
                view.set("resource_id", resource_id);
                view.create_in_hdx(&UpdateOptions::default())?;
            }
            None => self.preview_resourceview = Some(view),
        }
        Ok(())
    }

    /// Records a pipeline error on one resource with `resource_patch`. Returns
    /// false without calling HDX when the resource already has that message.
    pub fn add_hapi_error(&mut self, error_message: &str, selector: ResourceSelector<'_>) -> HdxResult<bool> {
        let index = match selector {
            ResourceSelector::Index(index) => (index < self.resources.len()).then_some(index),
            ResourceSelector::IdOrName(key) => {
                let field = if is_valid_uuid(key) { "id" } else { "name" };
                self.resources
                    .iter()
                    .position(|resource| resource.get_str(field) == Some(key))
            }
        };
        let resource = index
            .and_then(|index| self.resources.get_mut(index))
            .ok_or_else(|| HdxError::invalid("No matching resource to add error to!"))?;
        if resource.get_str(HAPI_ERROR_FIELD) == Some(error_message) {
            return Ok(false);
        }
        let id = resource
            .get_str("id")
            .map(String::from)
            .ok_or_else(|| HdxError::invalid("Resource has no id! It must be created first."))?;
        let mut data = Map::new();
        data.insert("id".into(), id.into());
        data.insert(HAPI_ERROR_FIELD.into(), error_message.into());
        resource.write_to_hdx("patch", &Value::Object(data), Some("id"), &[])?;
        resource.set(HAPI_ERROR_FIELD, error_message);
        Ok(true)
    }

    /// Moves the first resource named `QuickCharts-...` to the end.
    pub fn quickcharts_resource_last(&mut self) -> bool {
        let Some(index) = self.resources.iter().position(|resource| {
            resource
                .get_str("name")
                .is_some_and(|name| name.starts_with("QuickCharts-"))
        }) else {
            return false;
        };
        let resource = self.resources.remove(index);
        self.resources.push(resource);
        true
    }

    pub fn get_hdx_url(&self) -> Option<String> {
        let name = self.get_str("name").filter(|name| !name.is_empty())?;
        Some(self.hdx().configuration().get_dataset_url(name))
    }
}
