use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::{
    context::Hdx,
    error::HdxError,
    object::{into_list, into_object, HdxObject, ObjectState, UpdateOptions},
    organization::Organization,
    HdxResult,
};

#[derive(Clone, Debug)]
pub struct User {
    state: ObjectState,
}

impl HdxObject for User {
    const OBJECT_TYPE: &'static str = "user";
    const ACTIONS: &'static [(&'static str, &'static str)] = &[
        ("show", "user_show"),
        ("update", "user_update"),
        ("create", "user_create"),
        ("delete", "user_delete"),
        ("list", "user_list"),
        ("listorgs", "organization_list_for_user"),
        ("token_list", "api_token_list"),
        ("autocomplete", "user_autocomplete"),
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

fn organization_matches(organization_dict: &Value, organization: &str) -> bool {
    ["id", "name"]
        .iter()
        .any(|key| organization_dict.get(key).and_then(Value::as_str) == Some(organization))
}

fn read_organizations(hdx: &Hdx, organization_dicts: &[Value]) -> HdxResult<Vec<Organization>> {
    let mut organizations = Vec::new();
    for organization_dict in organization_dicts {
        let Some(id) = organization_dict.get("id").and_then(Value::as_str) else {
            continue;
        };
        if let Some(organization) = Organization::read_from_hdx(hdx, id)? {
            organizations.push(organization);
        }
    }
    Ok(organizations)
}

impl User {
    pub fn read_from_hdx(hdx: &Hdx, identifier: &str) -> HdxResult<Option<Self>> {
        Self::read_by_identifier(hdx, identifier)
    }

    /// Runs `operation` without the `capacity` field, which only has meaning
    /// inside an organization's user list.
    fn without_capacity<F>(&mut self, operation: F) -> HdxResult<()>
    where
        F: FnOnce(&mut Self) -> HdxResult<()>,
    {
        let capacity = self.remove("capacity");
        let result = operation(self);
        if let Some(capacity) = capacity {
            self.set("capacity", capacity);
        }
        result
    }

    pub fn update_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        self.without_capacity(|user| user.update_object(&[], options))
    }

    pub fn create_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        self.without_capacity(|user| user.create_object(&[], options))
    }

    pub fn delete_from_hdx(&mut self) -> HdxResult<()> {
        self.delete_object()
    }

    /// The user the API token belongs to.
    pub fn get_current_user(hdx: &Hdx) -> HdxResult<Self> {
        let mut user = Self::empty(hdx);
        user.save_to_hdx("show", Self::ID_FIELD, &[], false)?;
        Ok(user)
    }

    /// Lists users. `extra` may hold `q` and `order_by`.
    pub fn get_all_users(hdx: &Hdx, extra: Map<String, Value>) -> HdxResult<Vec<Self>> {
        let result = Self::empty(hdx).write_to_hdx("list", &Value::Object(extra), None, &[])?;
        into_list(result)
            .into_iter()
            .map(|user| Ok(Self::new(hdx, into_object(user, "user_list")?)))
            .collect()
    }

    fn name(&self) -> HdxResult<String> {
        self.get_str("name")
            .map(String::from)
            .ok_or_else(|| HdxError::MissingField {
                field: "name".to_string(),
                object_type: Self::OBJECT_TYPE.to_string(),
            })
    }

    /// Organizations the user has `permission` on, as returned by HDX.
    pub fn get_organization_dicts(&self, permission: &str) -> HdxResult<Vec<Value>> {
        let mut extra = Map::new();
        extra.insert("permission".into(), json!(permission));
        let result =
            self.read_remote(&self.name()?, "id", Some(Self::action("listorgs")?), extra)?;
        Ok(result.map(into_list).unwrap_or_default())
    }

    pub fn get_organizations(&self, permission: &str) -> HdxResult<Vec<Organization>> {
        read_organizations(self.hdx(), &self.get_organization_dicts(permission)?)
    }

    /// Whether the user has `permission` on the organization with the given
    /// id or name.
    pub fn check_organization_access(&self, organization: &str, permission: &str) -> HdxResult<bool> {
        Ok(self
            .get_organization_dicts(permission)?
            .iter()
            .any(|dict| organization_matches(dict, organization)))
    }

    /// Organizations the token's user has `permission` on. Failures give an
    /// empty list.
    pub fn get_current_user_organization_dicts(hdx: &Hdx, permission: &str) -> Vec<Value> {
        let action = match Self::action("listorgs") {
            Ok(action) => action,
            Err(_) => return Vec::new(),
        };
        match hdx.call_action(action, &json!({"permission": permission}), &[]) {
            Ok(result) => into_list(result),
            Err(err) => {
                debug!("{err}");
                Vec::new()
            }
        }
    }

    pub fn get_current_user_organizations(hdx: &Hdx, permission: &str) -> HdxResult<Vec<Organization>> {
        read_organizations(hdx, &Self::get_current_user_organization_dicts(hdx, permission))
    }

    pub fn check_current_user_organization_access(
        hdx: &Hdx,
        organization: &str,
        permission: &str,
    ) -> bool {
        Self::get_current_user_organization_dicts(hdx, permission)
            .iter()
            .any(|dict| organization_matches(dict, organization))
    }

    /// Checks the token's user has `permission`, eg. `create_dataset`, on an
    /// organization. Returns the user's name.
    pub fn check_current_user_write_access(
        hdx: &Hdx,
        organization: &str,
        permission: &str,
    ) -> HdxResult<String> {
        let hdx_key = hdx.configuration().hdx_key().unwrap_or_default();
        if hdx_key.is_empty() {
            return Err(HdxError::Permission(
                "There is no logged in user. API token is missing or blank!".to_string(),
            ));
        }
        info!("API token is {} characters long", hdx_key.len());
        let current_user = Self::get_current_user(hdx).map_err(|_| {
            HdxError::Permission(
                "There appears to be no logged in user. API token may be invalid!".to_string(),
            )
        })?;
        let username = current_user.get_str("name").unwrap_or_default().to_string();
        info!("Current user is \"{username}\"");
        if !Self::check_current_user_organization_access(hdx, organization, permission) {
            return Err(HdxError::Permission(format!(
                "Current user does not have \"{permission}\" access to \"{organization}\" organization!"
            )));
        }
        info!("Current user has \"{permission}\" access to \"{organization}\" organization");
        Ok(username)
    }

    pub fn get_token_list(&self) -> HdxResult<Vec<Value>> {
        let result = self.read_remote(
            &self.name()?,
            "user_id",
            Some(Self::action("token_list")?),
            Map::new(),
        )?;
        Ok(result.map(into_list).unwrap_or_default())
    }

    pub fn autocomplete(hdx: &Hdx, name: &str, limit: usize) -> HdxResult<Vec<Value>> {
        Self::autocomplete_with(hdx, name, limit, Map::new())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::{map, mock_hdx, mock_hdx_with};

    fn user_data() -> Value {
        json!({
            "id": "9f3e9973-7dbe-4c65-8820-f48578e3ffea",
            "name": "MyUser1",
            "fullname": "xxx",
            "email": "xxx@yyy.com",
            "about": "Data Scientist",
        })
    }

    #[test]
    fn test_update_strips_capacity() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("user_show", user_data());
        mock.on("user_update", |data| Ok(data.clone()));
        let mut user = User::new(
            &hdx,
            map(json!({"id": "9f3e9973-7dbe-4c65-8820-f48578e3ffea", "about": "Hero", "capacity": "admin"})),
        );
        user.update_in_hdx(&UpdateOptions::default()).unwrap();
        let sent = &mock.calls_for("user_update")[0].data;
        assert!(sent.get("capacity").is_none());
        assert_eq!(sent["about"], json!("Hero"));
        assert_eq!(user.get_str("capacity"), Some("admin"));
    }

    #[test]
    fn test_create_ignores_password_on_update_check() {
        let (hdx, mock) = mock_hdx();
        mock.on_not_found("user_show");
        mock.on("user_create", |data| {
            let mut data = data.clone();
            data.as_object_mut().unwrap().remove("password");
            Ok(data)
        });
        let mut user = User::new(&hdx, map(user_data()));
        user.set("password", "secret");
        user.create_in_hdx(&UpdateOptions::default()).unwrap();
        assert_eq!(mock.calls_for("user_create").len(), 1);
        assert!(user.get("password").is_none());
    }

    #[test]
    fn test_get_current_user_and_all_users() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("user_show", user_data());
        let user = User::get_current_user(&hdx).unwrap();
        assert_eq!(user.get_str("name"), Some("MyUser1"));
        assert_eq!(mock.calls()[0].data, json!({}));

        mock.on_result("user_list", json!([user_data(), {"name": "other"}]));
        let users = User::get_all_users(&hdx, map(json!({"q": "My"}))).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(mock.calls_for("user_list")[0].data, json!({"q": "My"}));
    }

    #[test]
    fn test_organization_access() {
        let (hdx, mock) = mock_hdx();
        mock.on_result(
            "organization_list_for_user",
            json!([{"id": "b67e6c74-c185-4f43-b561-0e114a736f19", "name": "acled"}]),
        );
        let user = User::new(&hdx, map(user_data()));
        assert!(user.check_organization_access("acled", "read").unwrap());
        assert!(user
            .check_organization_access("b67e6c74-c185-4f43-b561-0e114a736f19", "read")
            .unwrap());
        assert!(!user.check_organization_access("other", "read").unwrap());
        assert_eq!(
            mock.calls()[0].data,
            json!({"id": "MyUser1", "permission": "read"})
        );

        assert!(User::check_current_user_organization_access(&hdx, "acled", "admin"));
        assert_eq!(
            mock.calls().last().unwrap().data,
            json!({"permission": "admin"})
        );
    }

    #[test]
    fn test_check_current_user_write_access() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("user_show", user_data());
        mock.on_result(
            "organization_list_for_user",
            json!([{"id": "1", "name": "acled"}]),
        );
        let username = User::check_current_user_write_access(&hdx, "acled", "create_dataset").unwrap();
        assert_eq!(username, "MyUser1");

        let err = User::check_current_user_write_access(&hdx, "other", "create_dataset").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Current user does not have \"create_dataset\" access to \"other\" organization!"
        );

        mock.on_failure("user_show", "Not authorized");
        let err = User::check_current_user_write_access(&hdx, "acled", "create_dataset").unwrap_err();
        assert_eq!(
            err.to_string(),
            "There appears to be no logged in user. API token may be invalid!"
        );

        let (hdx, _) = mock_hdx_with(json!({"hdx_key": "", "hdx_read_only": true}));
        let err = User::check_current_user_write_access(&hdx, "acled", "create_dataset").unwrap_err();
        assert_eq!(
            err.to_string(),
            "There is no logged in user. API token is missing or blank!"
        );
    }

    #[test]
    fn test_token_list() {
        let (hdx, mock) = mock_hdx();
        mock.on_result("api_token_list", json!([{"id": "1", "name": "token"}]));
        let user = User::new(&hdx, map(user_data()));
        assert_eq!(user.get_token_list().unwrap().len(), 1);
        assert_eq!(mock.calls()[0].data, json!({"user_id": "MyUser1"}));
    }
}
