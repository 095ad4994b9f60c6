use hdx_core::{
    locations::{Location, Locations},
    vocabulary::Vocabulary,
    Hdx, HdxResult,
};
use nu_ansi_term::Color::{Green, Red, Yellow};
use serde_json::json;
use tabled::{builder::Builder, settings::Style};

use crate::utils::Colored;

pub struct LocationMatch {
    pub input: String,
    pub code: Option<String>,
    pub title: Option<String>,
    pub exact: bool,
}

pub fn resolve(locations: &[Location], inputs: &[String]) -> Vec<LocationMatch> {
    inputs
        .iter()
        .map(|input| {
            let (code, exact) = Locations::get_hdx_code_from_location_partial(locations, input);
            let title = code
                .as_deref()
                .and_then(|code| Locations::get_location_from_hdx_code(locations, code));
            LocationMatch {
                input: input.clone(),
                code,
                title,
                exact,
            }
        })
        .collect()
}

pub fn resolve_locations(hdx: &Hdx, inputs: &[String], json: bool) -> HdxResult<()> {
    let locations = Locations::valid_locations(hdx)?;
    let matches = resolve(&locations, inputs);

    if json {
        let entries: Vec<_> = matches
            .iter()
            .map(|m| json!({"input": m.input, "code": m.code, "title": m.title, "exact": m.exact}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut builder = Builder::new();
    builder.push_record(["Input", "Code", "Title", "Match"]);
    for m in &matches {
        let kind = match (&m.code, m.exact) {
            (None, _) => format!("{}", Colored(Red, "none")),
            (Some(_), true) => format!("{}", Colored(Green, "exact")),
            (Some(_), false) => format!("{}", Colored(Yellow, "partial")),
        };
        builder.push_record([
            m.input.clone(),
            m.code.clone().unwrap_or_default(),
            m.title.clone().unwrap_or_default(),
            kind,
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    Ok(())
}

pub fn map_tags(hdx: &Hdx, tags: &[String], json: bool) -> HdxResult<()> {
    let mut rows = Vec::with_capacity(tags.len());
    for tag in tags {
        let (mapped, deleted) = Vocabulary::get_mapped_tag(hdx, tag, !json)?;
        rows.push((tag, mapped, deleted));
    }

    if json {
        let entries: Vec<_> = rows
            .iter()
            .map(|(tag, mapped, deleted)| json!({"tag": tag, "tags": mapped, "deleted": deleted}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut builder = Builder::new();
    builder.push_record(["Tag", "Maps to", "Deleted"]);
    for (tag, mapped, deleted) in rows {
        builder.push_record([
            tag.clone(),
            format!("{}", Colored(Green, mapped.join(", "))),
            format!("{}", Colored(Red, deleted.join(", "))),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_resolve() {
        let locations = vec![
            Location::new("afg", "Afghanistan"),
            Location::new("cod", "Democratic Republic of the Congo"),
        ];
        let inputs = vec!["afg".to_string(), "Congo".to_string(), "Narnia".to_string()];
        let matches = resolve(&locations, &inputs);

        assert_eq!(matches[0].code.as_deref(), Some("AFG"));
        assert_eq!(matches[0].title.as_deref(), Some("Afghanistan"));
        assert!(matches[0].exact);
        assert_eq!(matches[1].code.as_deref(), Some("COD"));
        assert!(!matches[1].exact);
        assert_eq!(matches[2].code, None);
        assert_eq!(matches[2].title, None);
    }
}
