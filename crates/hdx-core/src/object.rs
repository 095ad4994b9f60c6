//! Behaviour shared by every HDX object.
//!
//! An object is a metadata mapping mirroring the CKAN schema, plus the
//! previous mapping kept after a load or save so that user supplied values can
//! be merged over what HDX returned.

use std::path::Path;

use hdx_config::loader::{load_json_into_existing, load_yaml_into_existing};
use hdx_remote::FileUpload;
use hdx_utils::{
    dict::{is_empty_value, merge_two_dictionaries},
    string::{add_to_commastring, remove_from_commastring, split_commastring},
};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::{context::Hdx, error::HdxError, HdxResult};

/// Metadata and connection state held by every object.
#[derive(Clone, Debug)]
pub struct ObjectState {
    pub(crate) hdx: Hdx,
    pub(crate) data: Map<String, Value>,
    pub(crate) old_data: Option<Map<String, Value>>,
}

impl ObjectState {
    pub fn new(hdx: Hdx, data: Map<String, Value>) -> Self {
        Self {
            hdx,
            data,
            old_data: None,
        }
    }
}

/// Options common to update and create operations.
#[derive(Clone, Debug, Default)]
pub struct UpdateOptions {
    /// CKAN operation to use, eg. `patch`. Defaults to `update`.
    pub operation: Option<String>,
    /// Skip the required field check.
    pub ignore_check: bool,
    /// Fields to leave out of the required field check.
    pub ignore_fields: Vec<String>,
    pub ignore_field: Option<String>,
    /// Whether CKAN should change groupings of datasets on the datasets page.
    pub batch_mode: Option<String>,
    /// Whether CKAN should skip its validation steps.
    pub skip_validation: Option<bool>,
}

/// String form of a JSON value as used in messages and identifiers.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn into_object(value: Value, action: &str) -> HdxResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => {
            Err(HdxError::invalid(format!(
                "Unexpected result from {action}: {other}"
            )))
        }
    }
}

pub(crate) fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(list) => list,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Calls a show action with `{fieldname: value, ..extra}`.
///
/// A not found response gives `None`. An empty field name or any other
/// failure is an error.
pub fn read_from_remote(
    hdx: &Hdx,
    object_type: &str,
    action: &str,
    fieldname: &str,
    value: &str,
    extra: Map<String, Value>,
) -> HdxResult<Option<Value>> {
    if fieldname.is_empty() {
        return Err(HdxError::invalid(format!("Empty {object_type} field name!")));
    }
    let mut data = Map::new();
    data.insert(fieldname.to_string(), Value::String(value.to_string()));
    data.extend(extra);
    match hdx.call_action(action, &Value::Object(data), &[]) {
        Ok(result) => Ok(Some(result)),
        Err(err) if err.is_not_found() => {
            debug!("{fieldname}={value}: not found!");
            Ok(None)
        }
        Err(source) => {
            Err(HdxError::Read {
                field: fieldname.to_string(),
                value: value.to_string(),
                source,
            })
        }
    }
}

/// Removes the entry whose `matchon` field equals `id` from a list of
/// mappings. Returns the removed entry.
pub fn remove_matching(
    list: &mut Vec<Map<String, Value>>,
    id: &str,
    matchon: &str,
) -> Option<Map<String, Value>> {
    if id.is_empty() {
        return None;
    }
    let index = list
        .iter()
        .position(|item| item.get(matchon).and_then(Value::as_str) == Some(id))?;
    Some(list.remove(index))
}

pub trait HdxObject: Sized {
    /// Name used in messages and as the configuration section holding the
    /// required fields.
    const OBJECT_TYPE: &'static str;
    /// Map of operation names (`show`, `update`, ...) to CKAN actions.
    const ACTIONS: &'static [(&'static str, &'static str)];
    const ID_FIELD: &'static str = "id";
    /// Field reported when a create fails.
    const NAME_FIELD: &'static str = "name";
    /// Whether `update_in_hdx` and `create_in_hdx` set `state` to `active`.
    const FORCE_ACTIVE: bool = true;

    fn from_state(state: ObjectState) -> Self;
    fn state(&self) -> &ObjectState;
    fn state_mut(&mut self) -> &mut ObjectState;

    /// Checks that the configured required fields are present and not empty.
    /// Types may normalise their metadata first.
    fn check_required_fields(&mut self, ignore_fields: &[String]) -> HdxResult<()> {
        self.check_required_fields_for(Self::OBJECT_TYPE, ignore_fields)
    }

    fn new(hdx: &Hdx, data: Map<String, Value>) -> Self {
        Self::from_state(ObjectState::new(hdx.clone(), data))
    }

    fn empty(hdx: &Hdx) -> Self {
        Self::new(hdx, Map::new())
    }

    fn action(key: &str) -> HdxResult<&'static str> {
        Self::ACTIONS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, action)| *action)
            .ok_or_else(|| {
                HdxError::UnsupportedAction {
                    object_type: Self::OBJECT_TYPE.to_string(),
                    action: key.to_string(),
                }
            })
    }

    fn hdx(&self) -> &Hdx {
        &self.state().hdx
    }

    fn data(&self) -> &Map<String, Value> {
        &self.state().data
    }

    fn data_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state_mut().data
    }

    /// Metadata held before the last load or save.
    fn old_data(&self) -> Option<&Map<String, Value>> {
        self.state().old_data.as_ref()
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.data().get(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.data().get(key).and_then(Value::as_str)
    }

    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.data_mut().insert(key.to_string(), value.into());
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        self.data_mut().remove(key)
    }

    fn contains_key(&self, key: &str) -> bool {
        self.data().contains_key(key)
    }

    /// Merges static metadata from a YAML file. A missing `.yaml` path is
    /// retried as `.yml`.
    fn update_from_yaml<P: AsRef<Path>>(&mut self, path: P) -> HdxResult<()> {
        load_yaml_into_existing(self.data_mut(), path)?;
        Ok(())
    }

    fn update_from_json<P: AsRef<Path>>(&mut self, path: P) -> HdxResult<()> {
        load_json_into_existing(self.data_mut(), path)?;
        Ok(())
    }

    /// Reads `{fieldname: value}` with the show action, or `action` if given.
    fn read_remote(
        &self,
        value: &str,
        fieldname: &str,
        action: Option<&str>,
        extra: Map<String, Value>,
    ) -> HdxResult<Option<Value>> {
        let action = match action {
            Some(action) => action,
            None => Self::action("show")?,
        };
        read_from_remote(
            self.hdx(),
            Self::OBJECT_TYPE,
            action,
            fieldname,
            value,
            extra,
        )
    }

    /// Loads the object with the given identifier, keeping the current
    /// metadata as the old data. Returns false if it does not exist.
    fn load_from_hdx(&mut self, identifier: &str) -> HdxResult<bool> {
        match self.read_remote(identifier, "id", None, Map::new())? {
            Some(result) => {
                let result = into_object(result, Self::action("show")?)?;
                let state = self.state_mut();
                state.old_data = Some(std::mem::replace(&mut state.data, result));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reads an object from HDX, giving `None` if it does not exist.
    fn read_by_identifier(hdx: &Hdx, identifier: &str) -> HdxResult<Option<Self>> {
        let mut object = Self::empty(hdx);
        if object.load_from_hdx(identifier)? {
            Ok(Some(object))
        } else {
            Ok(None)
        }
    }

    fn check_existing_object(&self) -> HdxResult<()> {
        if self.data().is_empty() {
            return Err(HdxError::NoData(Self::OBJECT_TYPE.to_string()));
        }
        if !self.contains_key(Self::ID_FIELD) {
            return Err(HdxError::NoIdField {
                id_field: Self::ID_FIELD.to_string(),
                object_type: Self::OBJECT_TYPE.to_string(),
            });
        }
        Ok(())
    }

    /// Checks the object has an identifier and reloads it from HDX.
    fn check_load_existing_object(&mut self, operation: &str) -> HdxResult<()> {
        self.check_existing_object()?;
        let identifier = self
            .get(Self::ID_FIELD)
            .map(value_to_string)
            .unwrap_or_default();
        if !self.load_from_hdx(&identifier)? {
            return Err(HdxError::NoExisting {
                object_type: Self::OBJECT_TYPE.to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Checks the required fields configured for `object_type`.
    ///
    /// `false` is a valid value; null, empty strings, lists, mappings and zero
    /// count as empty.
    fn check_required_fields_for(
        &self,
        object_type: &str,
        ignore_fields: &[String],
    ) -> HdxResult<()> {
        let required = self.hdx().configuration().required_fields(object_type);
        for field in required {
            if ignore_fields.contains(&field) {
                continue;
            }
            match self.get(&field) {
                None => {
                    return Err(HdxError::MissingField {
                        field,
                        object_type: object_type.to_string(),
                    })
                }
                Some(value) if is_empty_value(value) => {
                    return Err(HdxError::EmptyField {
                        field,
                        object_type: object_type.to_string(),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Runs the required field check unless `ignore_check` is set, also
    /// ignoring the configured `ignore_on_update` field.
    fn check_fields(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        if options.ignore_check {
            return Ok(());
        }
        let mut ignore_fields = options.ignore_fields.clone();
        let configured = self
            .hdx()
            .configuration()
            .ignore_on_update(Self::OBJECT_TYPE)
            .map(String::from);
        for field in [configured, options.ignore_field.clone()].into_iter().flatten() {
            if !ignore_fields.contains(&field) {
                ignore_fields.push(field);
            }
        }
        self.check_required_fields(&ignore_fields)
    }

    fn apply_update_options(&mut self, options: &UpdateOptions) {
        if let Some(batch_mode) = &options.batch_mode {
            self.set("batch_mode", batch_mode.as_str());
        }
        if let Some(skip_validation) = options.skip_validation {
            self.set("skip_validation", skip_validation);
        }
    }

    /// Calls the CKAN action registered for `action`.
    fn write_to_hdx(
        &self,
        action: &str,
        data: &Value,
        id_field: Option<&str>,
        files: &[FileUpload],
    ) -> HdxResult<Value> {
        let ckan_action = Self::action(action)?;
        self.hdx()
            .call_action(ckan_action, data, files)
            .map_err(|source| {
                HdxError::Write {
                    action: action.to_string(),
                    id: id_field
                        .and_then(|field| data.get(field))
                        .map(value_to_string),
                    source,
                }
            })
    }

    /// Writes the object and replaces its metadata with the result.
    fn save_to_hdx(
        &mut self,
        action: &str,
        id_field: &str,
        files: &[FileUpload],
        force_active: bool,
    ) -> HdxResult<()> {
        if force_active {
            self.set("state", "active");
        }
        let data = Value::Object(self.data().clone());
        let result = self.write_to_hdx(action, &data, Some(id_field), files)?;
        let result = into_object(result, action)?;
        let state = self.state_mut();
        state.old_data = Some(std::mem::replace(&mut state.data, result));
        Ok(())
    }

    /// Saves with the requested operation and then checks the fields of the
    /// returned metadata.
    fn hdx_update(
        &mut self,
        files: &[FileUpload],
        force_active: bool,
        options: &UpdateOptions,
    ) -> HdxResult<()> {
        self.apply_update_options(options);
        let operation = options.operation.as_deref().unwrap_or("update");
        self.save_to_hdx(operation, Self::ID_FIELD, files, force_active)?;
        self.check_fields(options)
    }

    /// Merges the user supplied metadata (the old data) over what was loaded
    /// from HDX and saves.
    fn merge_hdx_update(
        &mut self,
        files: &[FileUpload],
        force_active: bool,
        options: &UpdateOptions,
    ) -> HdxResult<()> {
        self.merge_old_data()?;
        self.hdx_update(files, force_active, options)
    }

    /// Merges the old data over the current data, consuming it.
    fn merge_old_data(&mut self) -> HdxResult<()> {
        let state = self.state_mut();
        if let Some(old_data) = state.old_data.take() {
            merge_two_dictionaries(&mut state.data, old_data)?;
        }
        Ok(())
    }

    /// Reloads the object by identifier and merges the local metadata over it.
    fn update_object(&mut self, files: &[FileUpload], options: &UpdateOptions) -> HdxResult<()> {
        self.check_load_existing_object("update")?;
        self.merge_hdx_update(files, Self::FORCE_ACTIVE, options)
    }

    /// Updates the object if its identifier exists in HDX, otherwise creates
    /// it.
    fn create_object(&mut self, files: &[FileUpload], options: &UpdateOptions) -> HdxResult<()> {
        let identifier = self.get(Self::ID_FIELD).map(value_to_string);
        if let Some(identifier) = identifier {
            if self.load_from_hdx(&identifier)? {
                warn!("{} exists. Updating {identifier}", Self::OBJECT_TYPE);
                return self.merge_hdx_update(files, Self::FORCE_ACTIVE, options);
            }
        }
        if !options.ignore_check {
            self.check_required_fields(&[])?;
        }
        self.save_to_hdx("create", Self::NAME_FIELD, files, Self::FORCE_ACTIVE)
    }

    fn delete_object(&mut self) -> HdxResult<()> {
        if !self.contains_key(Self::ID_FIELD) {
            return Err(HdxError::NoIdField {
                id_field: Self::ID_FIELD.to_string(),
                object_type: Self::OBJECT_TYPE.to_string(),
            });
        }
        self.save_to_hdx("delete", Self::ID_FIELD, &[], false)
    }

    /// Autocompletes a name with the object's autocomplete action.
    fn autocomplete_with(
        hdx: &Hdx,
        name: &str,
        limit: usize,
        extra: Map<String, Value>,
    ) -> HdxResult<Vec<Value>> {
        let mut data = Map::new();
        data.insert("q".into(), json!(name));
        data.insert("limit".into(), json!(limit));
        data.extend(extra);
        let result = Self::empty(hdx).write_to_hdx("autocomplete", &Value::Object(data), None, &[])?;
        Ok(into_list(result))
    }

    /// Merges `new` into the entry of the `key` list with the same `id_field`
    /// value, or appends it.
    fn addupdate_hdxobject(
        &mut self,
        key: &str,
        id_field: &str,
        new: Map<String, Value>,
    ) -> HdxResult<()> {
        let entry = self
            .data_mut()
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        let Value::Array(list) = entry else {
            return Ok(());
        };
        let wanted = new.get(id_field).cloned();
        let existing = list.iter_mut().find_map(|item| {
            match item {
                Value::Object(item) if wanted.is_some() && item.get(id_field) == wanted.as_ref() => {
                    Some(item)
                }
                _ => None,
            }
        });
        match existing {
            Some(existing) => merge_two_dictionaries(existing, new)?,
            None => list.push(Value::Object(new)),
        }
        Ok(())
    }

    /// Removes the entry of the `key` list whose `matchon` field equals `id`.
    fn remove_hdxobject(&mut self, key: &str, id: &str, matchon: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        let Some(Value::Array(list)) = self.data_mut().get_mut(key) else {
            return false;
        };
        match list
            .iter()
            .position(|item| item.get(matchon).and_then(Value::as_str) == Some(id))
        {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    fn get_tags(&self) -> Vec<String> {
        self.get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|tag| tag.get("name").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Adds a lowercased tag unless it is already present.
    fn insert_tag(&mut self, tag: &str, vocabulary_id: Option<&str>) -> bool {
        let tag = tag.to_lowercase();
        if self.get_tags().contains(&tag) {
            return false;
        }
        let mut tagdict = Map::new();
        tagdict.insert("name".into(), Value::String(tag));
        if let Some(vocabulary_id) = vocabulary_id {
            tagdict.insert("vocabulary_id".into(), json!(vocabulary_id));
        }
        match self.data_mut().get_mut("tags") {
            Some(Value::Array(tags)) => tags.push(Value::Object(tagdict)),
            _ => self.set("tags", vec![Value::Object(tagdict)]),
        }
        true
    }

    /// Adds tags, returning those that were not already present.
    fn insert_tags<S: AsRef<str>>(&mut self, tags: &[S], vocabulary_id: Option<&str>) -> Vec<String> {
        tags.iter()
            .filter(|tag| self.insert_tag(tag.as_ref(), vocabulary_id))
            .map(|tag| tag.as_ref().to_string())
            .collect()
    }

    fn remove_tag(&mut self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        match self.data_mut().get_mut("tags") {
            Some(Value::Array(tags)) => {
                let index = tags
                    .iter()
                    .position(|t| t.get("name").and_then(Value::as_str) == Some(tag.as_str()));
                match index {
                    Some(index) => {
                        tags.remove(index);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }

    fn get_stringlist_from_commastring(&self, field: &str) -> Vec<String> {
        split_commastring(self.get_str(field).unwrap_or_default())
    }

    fn add_string_to_commastring(&mut self, field: &str, string: &str) -> bool {
        let current = self.get_str(field).unwrap_or_default().to_string();
        match add_to_commastring(&current, string) {
            Some(updated) => {
                self.set(field, updated);
                true
            }
            None => false,
        }
    }

    /// Adds every string, returning false if any was already present.
    fn add_strings_to_commastring<S: AsRef<str>>(&mut self, field: &str, strings: &[S]) -> bool {
        let mut all_added = true;
        for string in strings {
            if !self.add_string_to_commastring(field, string.as_ref()) {
                all_added = false;
            }
        }
        all_added
    }

    fn remove_string_from_commastring(&mut self, field: &str, string: &str) -> bool {
        let current = self.get_str(field).unwrap_or_default().to_string();
        match remove_from_commastring(&current, string) {
            Some(updated) => {
                self.set(field, updated);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{
        organization::Organization,
        test_utils::{map, mock_hdx},
    };

    #[test]
    fn test_read_not_found() {
        let (hdx, mock) = mock_hdx();
        mock.on_not_found("organization_show");
        assert!(Organization::read_by_identifier(&hdx, "missing").unwrap().is_none());
        assert_eq!(mock.calls()[0].data, json!({"id": "missing"}));
    }

    #[test]
    fn test_read_failure() {
        let (hdx, mock) = mock_hdx();
        mock.on_failure("organization_show", "boom");
        let err = Organization::read_by_identifier(&hdx, "TEST1").unwrap_err();
        assert_eq!(err.to_string(), "Failed when trying to read: id=TEST1! (POST)");
    }

    #[test]
    fn test_empty_field_name() {
        let (hdx, _) = mock_hdx();
        let organization = Organization::empty(&hdx);
        let err = organization
            .read_remote("x", "", None, Map::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Empty organization field name!");
    }

    #[test]
    fn test_check_required_fields() {
        let (hdx, _) = mock_hdx();
        let mut organization = Organization::new(&hdx, map(json!({"name": "org", "title": ""})));
        let err = organization.check_required_fields(&[]).unwrap_err();
        assert_eq!(err.to_string(), "Field title is empty in organization!");

        organization.set("title", "Org");
        let err = organization.check_required_fields(&[]).unwrap_err();
        assert_eq!(err.to_string(), "Field description is missing in organization!");
        organization
            .check_required_fields(&["description".to_string()])
            .unwrap();
    }

    #[test]
    fn test_update_merges_user_data() {
        let (hdx, mock) = mock_hdx();
        mock.on_result(
            "organization_show",
            json!({"id": "abc", "name": "org", "title": "Old", "description": "d"}),
        );
        mock.on("organization_update", |data| Ok(data.clone()));

        let mut organization =
            Organization::new(&hdx, map(json!({"id": "abc", "title": "New"})));
        organization.update_in_hdx(&UpdateOptions::default()).unwrap();

        let sent = &mock.calls_for("organization_update")[0].data;
        assert_eq!(sent["title"], json!("New"));
        assert_eq!(sent["name"], json!("org"));
        assert_eq!(sent["state"], json!("active"));
        assert_eq!(organization.get_str("title"), Some("New"));
    }

    #[test]
    fn test_update_requires_existing() {
        let (hdx, mock) = mock_hdx();
        mock.on_not_found("organization_show");
        let mut organization = Organization::new(&hdx, map(json!({"id": "abc"})));
        let err = organization.update_in_hdx(&UpdateOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "No existing organization to update!");

        let mut organization = Organization::new(&hdx, map(json!({"name": "abc"})));
        let err = organization.update_in_hdx(&UpdateOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "No id field (mandatory) in organization!");

        let mut organization = Organization::empty(&hdx);
        let err = organization.update_in_hdx(&UpdateOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "No data in organization!");
    }

    #[test]
    fn test_write_failure_message() {
        let (hdx, mock) = mock_hdx();
        mock.on_failure("organization_create", "bad");
        let mut organization = Organization::new(
            &hdx,
            map(json!({"name": "MyOrg", "title": "t", "description": "d"})),
        );
        let err = organization.create_in_hdx(&UpdateOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Failed when trying to create MyOrg! (POST)");
    }

    #[test]
    fn test_tags() {
        let (hdx, _) = mock_hdx();
        let mut organization = Organization::empty(&hdx);
        assert!(organization.insert_tag("Health", None));
        assert!(!organization.insert_tag("health", None));
        let added = organization.insert_tags(&["education", "health"], Some("1234"));
        assert_eq!(added, vec!["education"]);
        assert_eq!(organization.get_tags(), vec!["health", "education"]);
        assert_eq!(
            organization.get("tags").unwrap()[1],
            json!({"name": "education", "vocabulary_id": "1234"})
        );
        assert!(organization.remove_tag("HEALTH"));
        assert!(!organization.remove_tag("health"));
        assert_eq!(organization.get_tags(), vec!["education"]);
    }

    #[test]
    fn test_commastrings() {
        let (hdx, _) = mock_hdx();
        let mut organization = Organization::empty(&hdx);
        assert!(organization.add_string_to_commastring("field_names", "a"));
        assert!(!organization.add_strings_to_commastring("field_names", &["b", "a"]));
        assert_eq!(
            organization.get_stringlist_from_commastring("field_names"),
            vec!["a", "b"]
        );
        assert!(organization.remove_string_from_commastring("field_names", "b"));
        assert!(!organization.remove_string_from_commastring("field_names", "z"));
        assert_eq!(organization.get_str("field_names"), Some("a,"));
    }

    #[test]
    fn test_update_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static.yml");
        std::fs::write(&path, "title: Static title\ndescription: Static\n").unwrap();

        let (hdx, _) = mock_hdx();
        let mut organization = Organization::new(&hdx, map(json!({"name": "org"})));
        organization
            .update_from_yaml(dir.path().join("static.yaml"))
            .unwrap();
        assert_eq!(organization.get_str("title"), Some("Static title"));
        assert_eq!(organization.get_str("name"), Some("org"));
    }

    #[test]
    fn test_remove_matching() {
        let mut list = vec![map(json!({"id": "a"})), map(json!({"id": "b"}))];
        assert!(remove_matching(&mut list, "c", "id").is_none());
        assert!(remove_matching(&mut list, "", "id").is_none());
        assert_eq!(remove_matching(&mut list, "a", "id"), Some(map(json!({"id": "a"}))));
        assert_eq!(list.len(), 1);
    }
}
