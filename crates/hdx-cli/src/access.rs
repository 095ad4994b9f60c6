use hdx_core::{organization::Organization, user::User, Hdx, HdxResult};
use nu_ansi_term::Color::{Cyan, Green};
use serde_json::{json, Map};
use tracing::info;

use crate::utils::Colored;

pub fn check_access(hdx: &Hdx, organization: &str, permission: &str, json: bool) -> HdxResult<()> {
    let username = User::check_current_user_write_access(hdx, organization, permission)?;
    if json {
        let result = json!({
            "user": username,
            "organization": organization,
            "permission": permission,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        info!(
            "{} can {} in {}",
            Colored(Green, &username),
            permission,
            Colored(Cyan, organization)
        );
    }
    Ok(())
}

pub fn list_organizations(hdx: &Hdx, json: bool) -> HdxResult<()> {
    let names = Organization::get_all_organization_names(hdx, Map::new())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }
    for name in &names {
        println!("{name}");
    }
    info!("{} organizations", Colored(Green, names.len()));
    Ok(())
}
