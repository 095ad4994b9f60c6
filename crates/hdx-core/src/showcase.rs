use hdx_utils::uuid::is_valid_uuid;
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::{
    context::Hdx,
    dataset::{Dataset, SearchOptions},
    error::HdxError,
    object::{into_list, into_object, HdxObject, ObjectState, UpdateOptions},
    vocabulary::Vocabulary,
    HdxResult,
};

/// A showcase: a visualisation or article linked to datasets.
#[derive(Clone, Debug)]
pub struct Showcase {
    state: ObjectState,
}

impl HdxObject for Showcase {
    const OBJECT_TYPE: &'static str = "showcase";
    const ACTIONS: &'static [(&'static str, &'static str)] = &[
        ("show", "ckanext_showcase_show"),
        ("update", "ckanext_showcase_update"),
        ("create", "ckanext_showcase_create"),
        ("delete", "ckanext_showcase_delete"),
        ("list", "ckanext_showcase_list"),
        ("associate", "ckanext_showcase_package_association_create"),
        ("disassociate", "ckanext_showcase_package_association_delete"),
        ("list_datasets", "ckanext_showcase_package_list"),
        ("list_showcases", "ckanext_package_showcase_list"),
    ];
    const ID_FIELD: &'static str = "name";
    const NAME_FIELD: &'static str = "title";

    fn from_state(state: ObjectState) -> Self {
        Self { state }
    }

    fn state(&self) -> &ObjectState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ObjectState {
        &mut self.state
    }
}

impl Showcase {
    pub fn read_from_hdx(hdx: &Hdx, identifier: &str) -> HdxResult<Option<Self>> {
        Self::read_by_identifier(hdx, identifier)
    }

    fn require_id(&self) -> HdxResult<&str> {
        self.get_str("id").ok_or_else(|| {
            HdxError::NoIdField {
                id_field: "id".to_string(),
                object_type: Self::OBJECT_TYPE.to_string(),
            }
        })
    }

    fn merge_clean_update(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        self.merge_old_data()?;
        self.clean_tags(true)?;
        self.hdx_update(&[], Self::FORCE_ACTIVE, options)
    }

    pub fn update_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        self.check_load_existing_object("update")?;
        self.merge_clean_update(options)
    }

    pub fn create_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        if !options.ignore_check {
            self.check_required_fields(&[])?;
        }
        if let Some(name) = self.get_str("name").map(String::from) {
            if self.load_from_hdx(&name)? {
                warn!("{} exists. Updating {name}", Self::OBJECT_TYPE);
                return self.merge_clean_update(options);
            }
        }
        self.clean_tags(true)?;
        self.save_to_hdx("create", Self::NAME_FIELD, &[], Self::FORCE_ACTIVE)
    }

    /// Deletes by id rather than name.
    pub fn delete_from_hdx(&mut self) -> HdxResult<()> {
        self.require_id()?;
        self.save_to_hdx("delete", "id", &[], false)
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

    /// Datasets linked to the showcase.
    pub fn get_datasets(&self) -> HdxResult<Vec<Dataset>> {
        let result = self.read_remote(
            self.require_id()?,
            "showcase_id",
            Some(Self::action("list_datasets")?),
            Map::new(),
        )?;
        result
            .map(into_list)
            .unwrap_or_default()
            .into_iter()
            .map(|dataset| Ok(Dataset::new(self.hdx(), into_object(dataset, "list_datasets")?)))
            .collect()
    }

    fn showcase_dataset_dict(&self, dataset_id: &str) -> HdxResult<Value> {
        if !is_valid_uuid(dataset_id) {
            return Err(HdxError::invalid(format!(
                "{dataset_id} is not a valid dataset id!"
            )));
        }
        Ok(json!({"showcase_id": self.require_id()?, "package_id": dataset_id}))
    }

    /// Links a dataset by id unless it is already among `datasets_to_check`,
    /// which defaults to the showcase's current datasets. Returns whether the
    /// dataset was added.
    pub fn add_dataset(&self, dataset_id: &str, datasets_to_check: Option<&[Dataset]>) -> HdxResult<bool> {
        let data = self.showcase_dataset_dict(dataset_id)?;
        let existing;
        let datasets_to_check = match datasets_to_check {
            Some(datasets) => datasets,
            None => {
                existing = self.get_datasets()?;
                &existing
            }
        };
        if datasets_to_check
            .iter()
            .any(|dataset| dataset.get_str("id") == Some(dataset_id))
        {
            return Ok(false);
        }
        self.write_to_hdx("associate", &data, Some("package_id"), &[])?;
        Ok(true)
    }

    /// Links several datasets. Returns false if any was already linked.
    pub fn add_datasets<S: AsRef<str>>(
        &self,
        dataset_ids: &[S],
        datasets_to_check: Option<&[Dataset]>,
    ) -> HdxResult<bool> {
        let existing;
        let datasets_to_check = match datasets_to_check {
            Some(datasets) => datasets,
            None => {
                existing = self.get_datasets()?;
                &existing
            }
        };
        let mut all_added = true;
        for dataset_id in dataset_ids {
            if !self.add_dataset(dataset_id.as_ref(), Some(datasets_to_check))? {
                all_added = false;
            }
        }
        Ok(all_added)
    }

    pub fn remove_dataset(&self, dataset_id: &str) -> HdxResult<()> {
        let data = self.showcase_dataset_dict(dataset_id)?;
        self.write_to_hdx("disassociate", &data, Some("package_id"), &[])?;
        Ok(())
    }

    /// Searches showcases, which are stored as datasets of type `showcase`.
    pub fn search_in_hdx(hdx: &Hdx, query: &str, options: &SearchOptions) -> HdxResult<Vec<Self>> {
        let mut options = options.clone();
        options.fq = Some(match options.fq.take() {
            Some(fq) if !fq.is_empty() => format!("dataset_type:showcase AND {fq}"),
            _ => "dataset_type:showcase".to_string(),
        });
        Ok(Dataset::search_in_hdx(hdx, query, &options)?
            .into_iter()
            .map(|dataset| Self::new(hdx, dataset.data().clone()))
            .collect())
    }

    pub fn get_all_showcases(hdx: &Hdx, options: &SearchOptions) -> HdxResult<Vec<Self>> {
        Self::search_in_hdx(hdx, "*:*", options)
    }
}
