use serde_json::{Map, Value};

use crate::{
    context::Hdx,
    dataset::{Dataset, SearchOptions},
    error::HdxError,
    object::{into_list, HdxObject, ObjectState, UpdateOptions},
    user::User,
    HdxResult,
};

#[derive(Clone, Debug)]
pub struct Organization {
    state: ObjectState,
}

impl HdxObject for Organization {
    const OBJECT_TYPE: &'static str = "organization";
    const ACTIONS: &'static [(&'static str, &'static str)] = &[
        ("show", "organization_show"),
        ("update", "organization_update"),
        ("create", "organization_create"),
        ("delete", "organization_delete"),
        ("list", "organization_list"),
        ("autocomplete", "organization_autocomplete"),
    ];

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

impl Organization {
    pub fn read_from_hdx(hdx: &Hdx, identifier: &str) -> HdxResult<Option<Self>> {
        Self::read_by_identifier(hdx, identifier)
    }

    pub fn update_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        self.update_object(&[], options)
    }

    pub fn create_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        self.create_object(&[], options)
    }

    pub fn delete_from_hdx(&mut self) -> HdxResult<()> {
        self.delete_object()
    }

    /// Reads the organization's users from HDX, optionally only those with
    /// the given capacity, eg. `admin`. Each user keeps its capacity.
    pub fn get_users(&self, capacity: Option<&str>) -> HdxResult<Vec<User>> {
        let Some(users) = self.get("users").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };
        let mut result = Vec::new();
        for userdata in users {
            let user_capacity = userdata.get("capacity").cloned().unwrap_or(Value::Null);
            if capacity.is_some_and(|capacity| user_capacity.as_str() != Some(capacity)) {
                continue;
            }
            let Some(id) = userdata
                .get("id")
                .or_else(|| userdata.get("name"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if let Some(mut user) = User::read_from_hdx(self.hdx(), id)? {
                user.set("capacity", user_capacity);
                result.push(user);
            }
        }
        Ok(result)
    }

    /// Adds a user, or updates the user with the same name. `capacity`
    /// overrides any capacity set on the user.
    pub fn add_update_user(&mut self, user: &User, capacity: Option<&str>) -> HdxResult<()> {
        let mut userdata = user.data().clone();
        if let Some(capacity) = capacity {
            userdata.insert("capacity".into(), Value::String(capacity.to_string()));
        }
        self.addupdate_hdxobject("users", "name", userdata)
    }

    /// Reads a user by id or name and adds it.
    pub fn add_update_user_by_id(&mut self, identifier: &str, capacity: Option<&str>) -> HdxResult<()> {
        let user = User::read_from_hdx(self.hdx(), identifier)?.ok_or_else(|| {
            HdxError::invalid(format!("{identifier} cannot be added as a user!"))
        })?;
        self.add_update_user(&user, capacity)
    }

    pub fn add_update_users(&mut self, users: &[User], capacity: Option<&str>) -> HdxResult<()> {
        for user in users {
            self.add_update_user(user, capacity)?;
        }
        Ok(())
    }

    /// Removes a user given by id or name. Returns false if not present.
    pub fn remove_user(&mut self, user: &str) -> bool {
        self.remove_hdxobject("users", user, "id") || self.remove_hdxobject("users", user, "name")
    }

    /// Datasets in the organization matching `query` (Solr syntax, `*:*` for
    /// all).
    pub fn get_datasets(&self, query: &str, mut options: SearchOptions) -> HdxResult<Vec<Dataset>> {
        let name = self.get_str("name").ok_or_else(|| {
            HdxError::MissingField {
                field: "name".to_string(),
                object_type: Self::OBJECT_TYPE.to_string(),
            }
        })?;
        options.fq = Some(format!("organization:{name}"));
        Dataset::search_in_hdx(self.hdx(), query, &options)
    }

    /// Names of every organization. `extra` may hold `sort`, `organizations`
    /// and the `all_fields`/`include_*` flags.
    pub fn get_all_organization_names(hdx: &Hdx, extra: Map<String, Value>) -> HdxResult<Vec<String>> {
        let result = Self::empty(hdx).write_to_hdx("list", &Value::Object(extra), None, &[])?;
        Ok(into_list(result)
            .iter()
            .filter_map(|entry| {
                entry
                    .as_str()
                    .or_else(|| entry.get("name").and_then(Value::as_str))
                    .map(String::from)
            })
            .collect())
    }

    pub fn autocomplete(hdx: &Hdx, name: &str, limit: usize) -> HdxResult<Vec<Value>> {
        Self::autocomplete_with(hdx, name, limit, Map::new())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::test_utils::{map, mock_hdx};

    fn organization_data() -> Value {
        json!({
            "id": "b67e6c74-c185-4f43-b561-0e114a736f19",
            "name": "acled",
            "title": "ACLED",
            "description": "Armed conflict data",
            "users": [
                {"id": "u1", "name": "MyUser1", "capacity": "admin"},
                {"id": "u2", "name": "MyUser2", "capacity": "editor"},
            ],
        })
    }

    #[test]
    fn test_create_existing_updates() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("organization_show", organization_data());
        mock.on("organization_update", |data| Ok(data.clone()));
        let mut organization = Organization::new(
            &hdx,
            map(json!({"id": "b67e6c74-c185-4f43-b561-0e114a736f19", "title": "New title"})),
        );
        organization.create_in_hdx(&UpdateOptions::default()).unwrap();
        assert_eq!(mock.calls_for("organization_update").len(), 1);
        assert!(mock.calls_for("organization_create").is_empty());
        assert_eq!(organization.get_str("title"), Some("New title"));
        assert_eq!(organization.get_str("name"), Some("acled"));
    }

    #[test]
    fn test_get_users() {
        let (hdx, mock) = mock_hdx();
        mock.on("user_show", |data| {
            Ok(json!({"id": data["id"], "name": format!("name-{}", data["id"].as_str().unwrap())}))
        });
        let organization = Organization::new(&hdx, map(organization_data()));
        let users = organization.get_users(None).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].get_str("capacity"), Some("editor"));

        let admins = organization.get_users(Some("admin")).unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].get_str("name"), Some("name-u1"));
    }

    #[test]
    fn test_add_update_and_remove_users() {
        let (hdx, _) = mock_hdx();
        let mut organization = Organization::new(&hdx, map(organization_data()));
        let user = User::new(&hdx, map(json!({"name": "MyUser1", "fullname": "Full"})));
        organization.add_update_user(&user, Some("member")).unwrap();
        let new_user = User::new(&hdx, map(json!({"name": "MyUser3", "capacity": "admin"})));
        organization.add_update_users(&[new_user], None).unwrap();

        let users = organization.get("users").unwrap().as_array().unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(
            users[0],
            json!({"id": "u1", "name": "MyUser1", "capacity": "member", "fullname": "Full"})
        );
        assert_eq!(users[2]["capacity"], json!("admin"));

        assert!(organization.remove_user("u2"));
        assert!(organization.remove_user("MyUser3"));
        assert!(!organization.remove_user("nobody"));
        assert_eq!(organization.get("users").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_get_all_organization_names() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("organization_list", json!(["acled", "hdx"]));
        let names = Organization::get_all_organization_names(&hdx, Map::new()).unwrap();
        assert_eq!(names, vec!["acled", "hdx"]);
    }

    #[test]
    fn test_autocomplete() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("organization_autocomplete", json!([{"name": "acled"}]));
        let matches = Organization::autocomplete(&hdx, "acl", 20).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(mock.calls()[0].data, json!({"q": "acl", "limit": 20}));
    }

    #[test]
    fn test_get_datasets() {
        let (hdx, mock) = mock_hdx();
        mock.on("package_search", |data| {
            assert_eq!(data["fq"], json!("organization:acled"));
            Ok(json!({"count": 1, "results": [{"id": "d1", "name": "dataset1", "resources": []}]}))
        });
        let organization = Organization::new(&hdx, map(organization_data()));
        let datasets = organization
            .get_datasets("*:*", SearchOptions::default())
            .unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].get_str("name"), Some("dataset1"));
    }
}
