use hdx_utils::uuid::is_valid_uuid;
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    context::Hdx,
    error::HdxError,
    object::{into_list, into_object, HdxObject, ObjectState, UpdateOptions},
    HdxResult,
};

/// A view (preview, map, chart) attached to a resource.
#[derive(Clone, Debug)]
pub struct ResourceView {
    state: ObjectState,
}

impl HdxObject for ResourceView {
    const OBJECT_TYPE: &'static str = "resource view";
    const ACTIONS: &'static [(&'static str, &'static str)] = &[
        ("show", "resource_view_show"),
        ("update", "resource_view_update"),
        ("create", "resource_view_create"),
        ("delete", "resource_view_delete"),
        ("list", "resource_view_list"),
        ("reorder", "resource_view_reorder"),
    ];
    const NAME_FIELD: &'static str = "title";
    const FORCE_ACTIVE: bool = false;

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

impl ResourceView {
    pub fn read_from_hdx(hdx: &Hdx, identifier: &str) -> HdxResult<Option<Self>> {
        Self::read_by_identifier(hdx, identifier)
    }

    /// All views of the resource with the given id. A missing resource gives
    /// an empty list.
    pub fn get_all_for_resource(hdx: &Hdx, resource_id: &str) -> HdxResult<Vec<Self>> {
        let result = Self::empty(hdx).read_remote(
            resource_id,
            "id",
            Some(Self::action("list")?),
            Map::new(),
        )?;
        let Some(result) = result else {
            return Ok(Vec::new());
        };
        into_list(result)
            .into_iter()
            .map(|view| Ok(Self::new(hdx, into_object(view, "resource_view_list")?)))
            .collect()
    }

    /// Loads the existing view by id or, failing that, by title among the
    /// resource's views, then merges this view's metadata over it.
    fn update_resource_view(&mut self, log: bool, options: &UpdateOptions) -> HdxResult<bool> {
        let mut found = false;
        if let Some(id) = self.get_str("id").map(String::from) {
            found = self.load_from_hdx(&id)?;
        }
        if !found {
            if let Some(resource_id) = self.get_str("resource_id").map(String::from) {
                let title = self.get("title").cloned();
                let existing = Self::get_all_for_resource(self.hdx(), &resource_id)?
                    .into_iter()
                    .find(|view| view.get("title") == title.as_ref());
                if let Some(existing) = existing {
                    let state = self.state_mut();
                    state.old_data = Some(std::mem::replace(&mut state.data, existing.state.data));
                    found = true;
                }
            }
        }
        if found {
            if log {
                warn!(
                    "resource view exists. Updating {}",
                    self.get_str("id").unwrap_or_default()
                );
            }
            self.merge_hdx_update(&[], Self::FORCE_ACTIVE, options)?;
        }
        Ok(found)
    }

    pub fn update_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        if !self.update_resource_view(false, options)? {
            return Err(HdxError::NoExisting {
                object_type: Self::OBJECT_TYPE.to_string(),
                operation: "update".to_string(),
            });
        }
        Ok(())
    }

    pub fn create_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        if !options.ignore_check {
            self.check_required_fields(&[])?;
        }
        if !self.update_resource_view(true, options)? {
            self.save_to_hdx("create", Self::NAME_FIELD, &[], false)?;
        }
        Ok(())
    }

    pub fn delete_from_hdx(&mut self) -> HdxResult<()> {
        self.delete_object()
    }

    /// Copies every field of `other` except its id, resource id and dataset id.
    pub fn copy(&mut self, other: &Map<String, Value>) {
        for (key, value) in other {
            if !matches!(key.as_str(), "id" | "resource_id" | "package_id") {
                self.set(key, value.clone());
            }
        }
    }

    /// Reads the view with the given id from HDX and copies it.
    pub fn copy_from_hdx(&mut self, identifier: &str) -> HdxResult<()> {
        if !is_valid_uuid(identifier) {
            return Err(HdxError::invalid(format!(
                "{identifier} is not a valid resource view id!"
            )));
        }
        let other = Self::read_from_hdx(self.hdx(), identifier)?.ok_or_else(|| {
            HdxError::invalid(format!("{identifier} is not a valid resource view!"))
        })?;
        self.copy(other.data());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::test_utils::{map, mock_hdx};

    const VIEW_ID: &str = "d80301b5-4abd-49bd-bf94-fa4af7b6e7a4";
    const RESOURCE_ID: &str = "25982d1c-f45a-45e1-b14e-87d367413045";

    fn view_data() -> Value {
        json!({
            "id": VIEW_ID,
            "resource_id": RESOURCE_ID,
            "package_id": "6f36a41c-f126-4b18-aaaf-6c2ddfbc5d4d",
            "title": "Quick Charts",
            "view_type": "hdx_hxl_preview",
            "description": "",
        })
    }

    #[test]
    fn test_get_all_for_resource() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("resource_view_list", json!([view_data()]));
        let views = ResourceView::get_all_for_resource(&hdx, RESOURCE_ID).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].get_str("title"), Some("Quick Charts"));
        assert_eq!(mock.calls()[0].data, json!({"id": RESOURCE_ID}));

        mock.on_not_found("resource_view_list");
        assert!(ResourceView::get_all_for_resource(&hdx, RESOURCE_ID)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_create_updates_view_with_same_title() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("resource_view_list", json!([view_data()]));
        mock.on("resource_view_update", |data| Ok(data.clone()));

        let mut view = ResourceView::new(
            &hdx,
            map(json!({
                "resource_id": RESOURCE_ID,
                "title": "Quick Charts",
                "view_type": "hdx_hxl_preview",
                "description": "new description",
            })),
        );
        view.create_in_hdx(&UpdateOptions::default()).unwrap();

        let sent = &mock.calls_for("resource_view_update")[0].data;
        assert_eq!(sent["id"], json!(VIEW_ID));
        assert_eq!(sent["description"], json!("new description"));
        assert!(sent.get("state").is_none());
        assert!(mock.calls_for("resource_view_create").is_empty());
    }

    #[test]
    fn test_create_new_view() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("resource_view_list", json!([]));
        mock.on("resource_view_create", |data| {
            let mut data = data.clone();
            data["id"] = json!(VIEW_ID);
            Ok(data)
        });
        let mut view = ResourceView::new(
            &hdx,
            map(json!({
                "resource_id": RESOURCE_ID,
                "title": "Map",
                "view_type": "hdx_geo_preview",
            })),
        );
        view.create_in_hdx(&UpdateOptions::default()).unwrap();
        assert_eq!(view.get_str("id"), Some(VIEW_ID));
    }

    #[test]
    fn test_update_missing_view() {
        let (hdx, mock) = mock_hdx();
        mock.on_not_found("resource_view_show");
        mock.on_result("resource_view_list", json!([]));
        let mut view = ResourceView::new(
            &hdx,
            map(json!({"id": VIEW_ID, "resource_id": RESOURCE_ID, "title": "x"})),
        );
        let err = view.update_in_hdx(&UpdateOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "No existing resource view to update!");
    }

    #[test]
    fn test_required_fields() {
        let (hdx, _) = mock_hdx();
        let mut view =
            ResourceView::new(&hdx, map(json!({"resource_id": RESOURCE_ID, "title": "t"})));
        let err = view.check_required_fields(&[]).unwrap_err();
        assert_eq!(err.to_string(), "Field view_type is missing in resource view!");
    }

    #[test]
    fn test_copy() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("resource_view_show", view_data());
        let mut view = ResourceView::new(&hdx, map(json!({"resource_id": "other"})));
        view.copy_from_hdx(VIEW_ID).unwrap();
        assert_eq!(view.get_str("resource_id"), Some("other"));
        assert_eq!(view.get_str("title"), Some("Quick Charts"));
        assert!(view.get("id").is_none());
        assert!(view.get("package_id").is_none());

        let err = view.copy_from_hdx("123").unwrap_err();
        assert_eq!(err.to_string(), "123 is not a valid resource view id!");
    }
}
