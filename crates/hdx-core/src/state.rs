//! Pipeline state kept in the first resource of an HDX dataset.

use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    context::Hdx,
    dataset::Dataset,
    error::HdxError,
    object::{HdxObject, UpdateOptions},
    resource::Resource,
    HdxResult,
};

/// State read from a dataset's first resource on creation and uploaded back
/// to it by [`HdxState::write`]. `write_fn` turns the state into the text
/// that is uploaded.
pub struct HdxState<T, W> {
    dataset_name_or_id: String,
    folder: PathBuf,
    resource: Resource,
    state: T,
    write_fn: W,
}

impl<T, W> HdxState<T, W>
where
    T: Debug,
    W: Fn(&T) -> String,
{
    /// Downloads the state file into `folder` and parses it with `read_fn`.
    pub fn new<R>(
        hdx: &Hdx,
        dataset_name_or_id: &str,
        folder: impl Into<PathBuf>,
        read_fn: R,
        write_fn: W,
    ) -> HdxResult<Self>
    where
        R: FnOnce(&str) -> HdxResult<T>,
    {
        let folder = folder.into();
        let dataset = Dataset::read_from_hdx(hdx, dataset_name_or_id)?
            .ok_or_else(|| HdxError::invalid(format!("Dataset {dataset_name_or_id} not found!")))?;
        let resource = dataset
            .get_resource(0)
            .cloned()
            .ok_or_else(|| HdxError::invalid(format!("Dataset {dataset_name_or_id} has no state resource!")))?;
        let (_, path) = resource.download(Some(&folder))?;
        let text = fs::read_to_string(&path).map_err(|source| {
            HdxError::IoError {
                action: format!("reading state from {}", path.display()),
                source,
            }
        })?;
        let state = read_fn(&text)?;
        info!("State read from {dataset_name_or_id} = {state:?}");
        Ok(Self {
            dataset_name_or_id: dataset_name_or_id.to_string(),
            folder,
            resource,
            state,
            write_fn,
        })
    }

    pub fn get(&self) -> &T {
        &self.state
    }

    pub fn set(&mut self, state: T) {
        self.state = state;
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Saves the state under the resource's name and uploads it to the
    /// resource.
    pub fn write(&mut self) -> HdxResult<()> {
        info!("State written to {} = {:?}", self.dataset_name_or_id, self.state);
        let filename = self.resource.get_str("name").unwrap_or("state").to_string();
        let path = self.folder.join(filename);
        fs::write(&path, (self.write_fn)(&self.state)).map_err(|source| {
            HdxError::IoError {
                action: format!("writing state to {}", path.display()),
                source,
            }
        })?;
        self.resource.set_file_to_upload(path, false)?;
        self.resource.update_in_hdx(&UpdateOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use hdx_remote::FileUpload;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        resource::FormatsMappings,
        test_utils::{mock_hdx, MockCkan},
    };

    const RESOURCE_ID: &str = "de6549d8-268b-4dfe-adaf-a4ae5c8510d5";
    const STATE_URL: &str = "https://test/last_build_date.txt";

    fn state_resource() -> Value {
        json!({
            "id": RESOURCE_ID,
            "package_id": "6f36a41c-f126-4b18-aaaf-6c2ddfbc5d4d",
            "name": "last_build_date.txt",
            "description": "Last build date",
            "format": "txt",
            "url": STATE_URL,
            "url_type": "upload",
            "resource_type": "file.upload",
        })
    }

    fn setup(hdx: &Hdx, mock: &MockCkan) {
        Resource::set_formats_mappings(hdx, FormatsMappings::from([("txt".into(), "txt".into())]));
        mock.on_result(
            "package_show",
            json!({"name": "state-dataset", "resources": [state_resource()]}),
        );
        mock.on_result("resource_show", state_resource());
        mock.on("resource_update", |data| {
            let mut data = data.clone();
            data["url"] = json!(STATE_URL);
            Ok(data)
        });
        mock.on_text(STATE_URL, "2020-09-23");
    }

    fn parse_date(text: &str) -> HdxResult<NaiveDate> {
        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|err| HdxError::Date(err.to_string()))
    }

    #[test]
    fn test_state_read_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let (hdx, mock) = mock_hdx();
        setup(&hdx, &mock);

        let mut state = HdxState::new(&hdx, "state-dataset", dir.path(), parse_date, |date: &NaiveDate| {
            date.format("%Y-%m-%d").to_string()
        })
        .unwrap();
        assert_eq!(*state.get(), NaiveDate::from_ymd_opt(2020, 9, 23).unwrap());

        state.set(NaiveDate::from_ymd_opt(2022, 5, 12).unwrap());
        state.write().unwrap();
        let path = dir.path().join("last_build_date.txt");
        assert_eq!(fs::read_to_string(&path).unwrap(), "2022-05-12");
        let update = &mock.calls_for("resource_update")[0];
        assert_eq!(update.files, vec![FileUpload::new("upload", path)]);
        assert_eq!(update.data["id"], json!(RESOURCE_ID));
    }

    #[test]
    fn test_state_text_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (hdx, mock) = mock_hdx();
        setup(&hdx, &mock);
        let state = HdxState::new(
            &hdx,
            "state-dataset",
            dir.path(),
            |text| Ok(text.to_string()),
            |text: &String| text.clone(),
        )
        .unwrap();
        assert_eq!(state.get(), "2020-09-23");
        assert_eq!(state.folder(), dir.path());

        mock.on_text(STATE_URL, "not a date");
        let err = HdxState::new(&hdx, "state-dataset", dir.path(), parse_date, |date: &NaiveDate| {
            date.to_string()
        })
        .err()
        .unwrap();
        assert!(matches!(err, HdxError::Date(_)));

        mock.on_not_found("package_show");
        assert!(HdxState::new(
            &hdx,
            "missing",
            dir.path(),
            |text| Ok(text.to_string()),
            |text: &String| text.clone(),
        )
        .is_err());
    }
}
