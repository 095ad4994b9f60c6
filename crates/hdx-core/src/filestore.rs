//! Uploads of resource files while saving a dataset.

use std::{collections::BTreeMap, path::PathBuf};

use hdx_utils::hash::get_size_and_hash;
use serde_json::{json, Value};

use crate::{
    date_helper::{get_hdx_date, now_utc},
    object::{HdxObject, UpdateOptions},
    resource::Resource,
    HdxResult,
};

/// Placeholder url sent for resources whose file is uploaded in the same
/// request.
pub const TEMPORARY_URL: &str = "updated_by_file_upload_step";

/// Files to upload keyed by resource index.
pub type FilestoreResources = BTreeMap<usize, PathBuf>;

/// What happened to a resource while preparing a dataset save.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FilestoreStatus {
    /// No file; `last_modified` set to now.
    LastModifiedSet = 0,
    /// No file and the data was not marked updated.
    Unchanged = 1,
    /// File queued for upload.
    Uploaded = 2,
    /// File skipped as its size and hash are unchanged.
    UploadSkipped = 3,
    /// As [`FilestoreStatus::UploadSkipped`], with the supplied
    /// `last_modified` dropped.
    UploadSkippedLastModifiedIgnored = 4,
}

impl FilestoreStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Checks a resource's required fields unless `ignore_check` is set.
///
/// Only ignore fields prefixed with `resource:` apply, and `package_id` is
/// always ignored as it is set when the dataset is saved.
pub fn resource_check_required_fields(
    resource: &mut Resource,
    check_upload: bool,
    options: &UpdateOptions,
) -> HdxResult<()> {
    if options.ignore_check {
        return Ok(());
    }
    if check_upload && resource.file_to_upload().is_some() {
        resource.remove("url");
    }
    let mut ignore_fields: Vec<String> = options
        .ignore_fields
        .iter()
        .filter_map(|field| field.strip_prefix("resource:"))
        .map(|field| field.trim().to_string())
        .collect();
    if !ignore_fields.iter().any(|field| field == "package_id") {
        ignore_fields.push("package_id".to_string());
    }
    resource.check_required_fields(&ignore_fields)
}

fn queue_upload(
    resource: &mut Resource,
    path: PathBuf,
    size: u64,
    hash: String,
    filestore_resources: &mut FilestoreResources,
    index: usize,
) {
    filestore_resources.insert(index, path);
    resource.set("url", TEMPORARY_URL);
    resource.set("size", size);
    resource.set("hash", hash);
}

/// Prepares a new resource, queueing its file if it has one.
pub fn check_filestore_resource(
    resource: &mut Resource,
    filestore_resources: &mut FilestoreResources,
    index: usize,
    options: &UpdateOptions,
) -> HdxResult<FilestoreStatus> {
    resource_check_required_fields(resource, false, options)?;
    let Some(path) = resource.file_to_upload().map(PathBuf::from) else {
        return Ok(FilestoreStatus::LastModifiedSet);
    };
    let (size, hash) = get_size_and_hash(&path, &resource.get_format().unwrap_or_default())?;
    queue_upload(resource, path, size, hash, filestore_resources, index);
    Ok(FilestoreStatus::Uploaded)
}

/// Prepares an update of an existing resource.
///
/// A file whose size and hash match the original resource is not uploaded
/// again. xlsx workbooks are compared on their cell values.
pub fn dataset_update_filestore_resource(
    original: &Resource,
    resource: &mut Resource,
    filestore_resources: &mut FilestoreResources,
    index: usize,
) -> HdxResult<FilestoreStatus> {
    if let Some(path) = resource.file_to_upload().map(PathBuf::from) {
        let format = resource.get_format().unwrap_or_default();
        let (size, hash) = get_size_and_hash(&path, &format)?;
        if original.get("size") == Some(&json!(size))
            && original.get("hash") == Some(&Value::String(hash.clone()))
        {
            if resource.remove("last_modified").is_some() {
                return Ok(FilestoreStatus::UploadSkippedLastModifiedIgnored);
            }
            return Ok(FilestoreStatus::UploadSkipped);
        }
        queue_upload(resource, path, size, hash, filestore_resources, index);
        return Ok(FilestoreStatus::Uploaded);
    }
    if resource.is_marked_data_updated() {
        resource.set(
            "last_modified",
            get_hdx_date(&now_utc().into(), false, true, false),
        );
        resource.set_data_updated(false);
        return Ok(FilestoreStatus::LastModifiedSet);
    }
    Ok(FilestoreStatus::Unchanged)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        resource::FormatsMappings,
        test_utils::{map, mock_hdx, write_xlsx},
    };

    fn resource_with_file(hdx: &crate::context::Hdx, path: &std::path::Path) -> Resource {
        let mut resource = Resource::new(
            hdx,
            map(json!({
                "name": "data.csv",
                "description": "Data",
                "format": "csv",
            })),
        );
        resource.set_file_to_upload(path, false).unwrap();
        resource
    }

    #[test]
    fn test_check_filestore_resource() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();

        let (hdx, _) = mock_hdx();
        Resource::set_formats_mappings(&hdx, FormatsMappings::from([("csv".into(), "csv".into())]));
        let mut resource = resource_with_file(&hdx, &path);
        let mut filestore = FilestoreResources::new();
        let status =
            check_filestore_resource(&mut resource, &mut filestore, 3, &UpdateOptions::default())
                .unwrap();
        assert_eq!(status.code(), 2);
        assert_eq!(filestore.get(&3), Some(&path));
        assert_eq!(resource.get_str("url"), Some(TEMPORARY_URL));
        assert_eq!(resource.get("size"), Some(&json!(8)));
        assert_eq!(resource.get_str("url_type"), Some("upload"));

        let mut resource = Resource::new(&hdx, map(json!({"name": "x"})));
        let err = check_filestore_resource(
            &mut resource,
            &mut filestore,
            0,
            &UpdateOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Either a url or a file to upload must be supplied!");
    }

    #[test]
    fn test_dataset_update_filestore_resource() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();
        let (size, hash) = get_size_and_hash(&path, "csv").unwrap();

        let (hdx, _) = mock_hdx();
        let original = Resource::new(&hdx, map(json!({"size": size, "hash": hash})));
        let mut filestore = FilestoreResources::new();

        let mut resource = resource_with_file(&hdx, &path);
        let status =
            dataset_update_filestore_resource(&original, &mut resource, &mut filestore, 0).unwrap();
        assert_eq!(status, FilestoreStatus::UploadSkipped);
        assert!(filestore.is_empty());

        resource.set("last_modified", "2024-01-01T00:00:00");
        let status =
            dataset_update_filestore_resource(&original, &mut resource, &mut filestore, 0).unwrap();
        assert_eq!(status.code(), 4);
        assert!(resource.get("last_modified").is_none());

        let changed = Resource::new(&hdx, map(json!({"size": 1, "hash": hash})));
        let status =
            dataset_update_filestore_resource(&changed, &mut resource, &mut filestore, 1).unwrap();
        assert_eq!(status, FilestoreStatus::Uploaded);
        assert_eq!(filestore.get(&1), Some(&path));

        let mut url_resource = Resource::new(&hdx, map(json!({"url": "http://lala"})));
        let status =
            dataset_update_filestore_resource(&original, &mut url_resource, &mut filestore, 2)
                .unwrap();
        assert_eq!(status, FilestoreStatus::Unchanged);

        url_resource.mark_data_updated();
        let status =
            dataset_update_filestore_resource(&original, &mut url_resource, &mut filestore, 2)
                .unwrap();
        assert_eq!(status.code(), 0);
        assert!(!url_resource.is_marked_data_updated());
        let last_modified = url_resource.get_str("last_modified").unwrap();
        assert_eq!(last_modified.len(), 26);
    }

    #[test]
    fn test_resaved_workbook_is_not_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        let rows = [["country", "value"], ["AFG", "12"], ["SDN", "7"]];
        let first = dir.path().join("first.xlsx");
        let second = dir.path().join("second.xlsx");
        write_xlsx(&first, &rows, false);
        write_xlsx(&second, &rows, true);
        assert_ne!(fs::read(&first).unwrap(), fs::read(&second).unwrap());

        let (hdx, _) = mock_hdx();
        Resource::set_formats_mappings(
            &hdx,
            FormatsMappings::from([("xlsx".into(), "xlsx".into())]),
        );
        let (_, hash) = get_size_and_hash(&first, "xlsx").unwrap();
        let size = fs::metadata(&second).unwrap().len();
        let original = Resource::new(&hdx, map(json!({"size": size, "hash": hash})));

        let mut resource = Resource::new(
            &hdx,
            map(json!({"name": "data.xlsx", "description": "Data", "format": "xlsx"})),
        );
        resource.set_file_to_upload(&second, false).unwrap();
        let mut filestore = FilestoreResources::new();
        let status =
            dataset_update_filestore_resource(&original, &mut resource, &mut filestore, 0).unwrap();
        assert_eq!(status, FilestoreStatus::UploadSkipped);
        assert!(filestore.is_empty());

        let (_, csv_hash) = get_size_and_hash(&second, "csv").unwrap();
        assert_ne!(csv_hash, hash);
    }

    #[test]
    fn test_resource_ignore_fields() {
        let (hdx, _) = mock_hdx();
        Resource::set_formats_mappings(&hdx, FormatsMappings::from([("csv".into(), "csv".into())]));
        let mut resource = Resource::new(
            &hdx,
            map(json!({"name": "r", "format": "csv", "url": "http://lala"})),
        );
        let options = UpdateOptions {
            ignore_fields: vec!["description".into()],
            ..Default::default()
        };
        let err = resource_check_required_fields(&mut resource, false, &options).unwrap_err();
        assert_eq!(err.to_string(), "Field description is missing in resource!");

        let options = UpdateOptions {
            ignore_fields: vec!["resource: description".into()],
            ..Default::default()
        };
        resource_check_required_fields(&mut resource, false, &options).unwrap();
    }
}
