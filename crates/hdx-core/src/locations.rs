//! Locations (countries and other groups) known to HDX.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    context::{cached, store, Hdx},
    HdxResult,
};

/// An HDX location group: `name` is the code, eg. `afg`, and `title` the
/// display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub title: String,
}

impl Location {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
        }
    }
}

pub struct Locations;

impl Locations {
    /// Valid locations, read once with `group_list` and cached.
    pub fn valid_locations(hdx: &Hdx) -> HdxResult<Arc<Vec<Location>>> {
        if let Some(locations) = cached(&hdx.caches().locations) {
            return Ok(locations);
        }
        let result = hdx.call_action("group_list", &json!({"all_fields": true}), &[])?;
        let locations: Arc<Vec<Location>> = Arc::new(serde_json::from_value(result)?);
        store(&hdx.caches().locations, Some(locations.clone()));
        Ok(locations)
    }

    /// Replaces the cached valid locations.
    pub fn set_valid_locations(hdx: &Hdx, locations: Vec<Location>) {
        store(&hdx.caches().locations, Some(Arc::new(locations)));
    }

    /// Title of the location with the given code, compared case-insensitively.
    pub fn get_location_from_hdx_code(locations: &[Location], code: &str) -> Option<String> {
        let code = code.to_uppercase();
        locations
            .iter()
            .find(|location| location.name.to_uppercase() == code)
            .map(|location| location.title.clone())
    }

    /// Uppercase code of a location given as a code or an exact title.
    pub fn get_hdx_code_from_location(locations: &[Location], location: &str) -> Option<String> {
        let location = location.to_uppercase();
        locations
            .iter()
            .find(|l| l.name.to_uppercase() == location)
            .or_else(|| locations.iter().find(|l| l.title.to_uppercase() == location))
            .map(|l| l.name.to_uppercase())
    }

    /// Like [`Locations::get_hdx_code_from_location`] but falls back to a
    /// title containing, or contained in, `location`. The flag is true for an
    /// exact match.
    pub fn get_hdx_code_from_location_partial(
        locations: &[Location],
        location: &str,
    ) -> (Option<String>, bool) {
        if let Some(code) = Self::get_hdx_code_from_location(locations, location) {
            return (Some(code), true);
        }
        let location = location.to_uppercase();
        let partial = locations.iter().find(|l| {
            let title = l.title.to_uppercase();
            title.contains(&location) || location.contains(&title)
        });
        (partial.map(|l| l.name.to_uppercase()), false)
    }
}
