//! Tag vocabularies, the approved tags vocabulary and tag mappings.

use std::{collections::HashMap, sync::Arc};

use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::{
    context::{cached, store, Hdx},
    error::HdxError,
    object::{into_list, into_object, HdxObject, ObjectState, UpdateOptions},
    HdxResult,
};

const ACTION_COLUMN: &str = "Action to Take";
const NEW_TAGS_COLUMN: &str = "New Tag(s)";

/// What to do with a tag found in the tag mappings sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRule {
    /// `ok`, `delete`, `merge` or `other`.
    pub action: String,
    /// Replacement tags separated by `;`.
    pub new_tags: Option<String>,
}

impl TagRule {
    pub fn new(action: impl Into<String>, new_tags: Option<&str>) -> Self {
        Self {
            action: action.into(),
            new_tags: new_tags.map(String::from),
        }
    }

    fn final_tags(&self) -> Vec<&str> {
        self.new_tags
            .as_deref()
            .map(|tags| tags.split(';').collect())
            .unwrap_or_default()
    }
}

pub type TagsMappings = HashMap<String, TagRule>;

/// Parses the tag mappings CSV. `keycolumn` is the 1-based column holding
/// the tag.
pub fn parse_tags_mappings(text: &str, keycolumn: usize) -> HdxResult<TagsMappings> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let key_index = keycolumn.saturating_sub(1);
    let column = |name: &str| headers.iter().position(|header| header.trim() == name);
    let (Some(action_index), new_tags_index) = (column(ACTION_COLUMN), column(NEW_TAGS_COLUMN))
    else {
        return Err(HdxError::invalid(format!(
            "Tags mappings have no {ACTION_COLUMN} column!"
        )));
    };

    let mut mappings = TagsMappings::new();
    for record in reader.records() {
        let record = record?;
        let Some(tag) = record.get(key_index).filter(|tag| !tag.is_empty()) else {
            continue;
        };
        let action = record.get(action_index).unwrap_or_default().trim();
        let new_tags = new_tags_index
            .and_then(|index| record.get(index))
            .map(str::trim)
            .filter(|tags| !tags.is_empty());
        mappings.insert(tag.to_string(), TagRule::new(action, new_tags));
    }
    Ok(mappings)
}

/// Whether a rule maps to a tag that is itself remapped elsewhere.
fn find_chained_rules(mappings: &TagsMappings, log: bool) -> bool {
    let mut chained = false;
    for (tag, rule) in mappings {
        for final_tag in rule.final_tags() {
            if final_tag == tag {
                continue;
            }
            let Some(rule2) = mappings.get(final_tag) else {
                continue;
            };
            if rule2.action == "ok" || rule2.action == "other" {
                continue;
            }
            if !rule2.final_tags().contains(&final_tag) {
                chained = true;
                if log {
                    error!(
                        "Chained rules: {} ({tag} -> {}) | {} ({final_tag} -> {})",
                        rule.action,
                        rule.new_tags.as_deref().unwrap_or_default(),
                        rule2.action,
                        rule2.new_tags.as_deref().unwrap_or_default(),
                    );
                }
            }
        }
    }
    chained
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !result.contains(&item) {
            result.push(item);
        }
    }
    result
}

#[derive(Clone, Debug)]
pub struct Vocabulary {
    state: ObjectState,
}

impl HdxObject for Vocabulary {
    const OBJECT_TYPE: &'static str = "vocabulary";
    const ACTIONS: &'static [(&'static str, &'static str)] = &[
        ("show", "vocabulary_show"),
        ("update", "vocabulary_update"),
        ("create", "vocabulary_create"),
        ("delete", "vocabulary_delete"),
        ("list", "vocabulary_list"),
        ("autocomplete", "tag_autocomplete"),
    ];
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

impl Vocabulary {
    /// A vocabulary with the given name and tags.
    pub fn with_tags<S: AsRef<str>>(hdx: &Hdx, name: &str, tags: &[S]) -> Self {
        let mut data = Map::new();
        data.insert("name".into(), json!(name));
        let mut vocabulary = Self::new(hdx, data);
        vocabulary.add_tags(tags);
        vocabulary
    }

    pub fn read_from_hdx(hdx: &Hdx, identifier: &str) -> HdxResult<Option<Self>> {
        Self::read_by_identifier(hdx, identifier)
    }

    pub fn get_all_vocabularies(hdx: &Hdx) -> HdxResult<Vec<Self>> {
        let result = Self::empty(hdx).write_to_hdx("list", &json!({}), None, &[])?;
        into_list(result)
            .into_iter()
            .map(|vocabulary| Ok(Self::new(hdx, into_object(vocabulary, "vocabulary_list")?)))
            .collect()
    }

    pub fn update_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        self.update_object(&[], options)
    }

    pub fn create_in_hdx(&mut self, options: &UpdateOptions) -> HdxResult<()> {
        self.create_object(&[], options)
    }

    /// Deletes the vocabulary. CKAN refuses to delete a vocabulary with tags,
    /// so with `empty` the tags are removed first.
    pub fn delete_from_hdx(&mut self, empty: bool) -> HdxResult<()> {
        let has_tags = self
            .get("tags")
            .and_then(Value::as_array)
            .is_some_and(|tags| !tags.is_empty());
        if empty && has_tags {
            self.set("tags", Vec::<Value>::new());
            let options = UpdateOptions {
                ignore_field: Some("tags".to_string()),
                ..Default::default()
            };
            self.update_object(&[], &options)?;
        }
        self.delete_object()
    }

    pub fn add_tag(&mut self, tag: &str) -> bool {
        self.insert_tag(tag, None)
    }

    pub fn add_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> Vec<String> {
        self.insert_tags(tags, None)
    }

    pub fn autocomplete(hdx: &Hdx, name: &str, limit: usize, extra: Map<String, Value>) -> HdxResult<Vec<Value>> {
        Self::autocomplete_with(hdx, name, limit, extra)
    }

    fn approved_vocabulary_name(hdx: &Hdx) -> HdxResult<String> {
        hdx.configuration()
            .get_str("approved_tags_vocabulary")
            .map(String::from)
            .ok_or_else(|| HdxError::invalid("No approved_tags_vocabulary configured!"))
    }

    /// The vocabulary of approved tags, read once per handle.
    pub fn get_approved_vocabulary(hdx: &Hdx) -> HdxResult<Self> {
        if let Some(data) = cached(&hdx.caches().approved_vocabulary) {
            return Ok(Self::new(hdx, data));
        }
        let name = Self::approved_vocabulary_name(hdx)?;
        let vocabulary = Self::read_from_hdx(hdx, &name)?.ok_or_else(|| {
            HdxError::NoExisting {
                object_type: format!("{} {name}", Self::OBJECT_TYPE),
                operation: "read".to_string(),
            }
        })?;
        store(
            &hdx.caches().approved_vocabulary,
            Some(vocabulary.data().clone()),
        );
        Ok(vocabulary)
    }

    /// Approved tags from the tags list, in order and without duplicates.
    fn read_approved_tags(hdx: &Hdx, url: Option<&str>) -> HdxResult<Vec<String>> {
        let url = match url {
            Some(url) => url.to_string(),
            None => {
                hdx.configuration()
                    .get_str("tags_list_url")
                    .ok_or_else(|| HdxError::invalid("No tags_list_url configured!"))?
                    .to_string()
            }
        };
        let text = hdx.remote().fetch_text(&url)?.replace('"', "");
        Ok(dedup(text.lines().map(String::from).collect()))
    }

    pub fn create_approved_vocabulary(hdx: &Hdx, url: Option<&str>) -> HdxResult<Self> {
        let name = Self::approved_vocabulary_name(hdx)?;
        let tags = Self::read_approved_tags(hdx, url)?;
        let mut vocabulary = Self::with_tags(hdx, &name, &tags);
        vocabulary.create_in_hdx(&UpdateOptions::default())?;
        store(
            &hdx.caches().approved_vocabulary,
            Some(vocabulary.data().clone()),
        );
        Ok(vocabulary)
    }

    /// Adds the tags list to the approved vocabulary, first removing its
    /// existing tags when `replace` is set.
    pub fn update_approved_vocabulary(hdx: &Hdx, url: Option<&str>, replace: bool) -> HdxResult<Self> {
        let mut vocabulary = Self::get_approved_vocabulary(hdx)?;
        if replace {
            vocabulary.set("tags", Vec::<Value>::new());
        }
        vocabulary.add_tags(&Self::read_approved_tags(hdx, url)?);
        vocabulary.update_in_hdx(&UpdateOptions::default())?;
        store(
            &hdx.caches().approved_vocabulary,
            Some(vocabulary.data().clone()),
        );
        Ok(vocabulary)
    }

    pub fn delete_approved_vocabulary(hdx: &Hdx) -> HdxResult<()> {
        let mut vocabulary = Self::get_approved_vocabulary(hdx)?;
        vocabulary.delete_from_hdx(true)?;
        store(&hdx.caches().approved_vocabulary, None);
        Ok(())
    }

    pub fn approved_tags(hdx: &Hdx) -> HdxResult<Vec<String>> {
        Ok(Self::get_approved_vocabulary(hdx)?.get_tags())
    }

    pub fn is_approved(hdx: &Hdx, tag: &str) -> HdxResult<bool> {
        Ok(Self::approved_tags(hdx)?.contains(&tag.to_lowercase()))
    }

    /// Downloads and parses the tag mappings once per handle. `url` defaults
    /// to the configured `tags_mapping_url`. With `failchained`, chained rules
    /// are logged and rejected.
    pub fn read_tags_mappings(
        hdx: &Hdx,
        url: Option<&str>,
        keycolumn: usize,
        failchained: bool,
    ) -> HdxResult<Arc<TagsMappings>> {
        if let Some(mappings) = cached(&hdx.caches().tags_mappings) {
            return Ok(mappings);
        }
        let url = match url {
            Some(url) => url.to_string(),
            None => {
                hdx.configuration()
                    .get_str("tags_mapping_url")
                    .ok_or_else(|| HdxError::invalid("No tags_mapping_url configured!"))?
                    .to_string()
            }
        };
        let mappings = parse_tags_mappings(&hdx.remote().fetch_text(&url)?, keycolumn)?;
        if find_chained_rules(&mappings, failchained) && failchained {
            return Err(HdxError::ChainRule);
        }
        let mappings = Arc::new(mappings);
        store(&hdx.caches().tags_mappings, Some(mappings.clone()));
        Ok(mappings)
    }

    pub fn set_tags_mappings(hdx: &Hdx, mappings: TagsMappings) {
        store(&hdx.caches().tags_mappings, Some(Arc::new(mappings)));
    }

    /// Maps a tag to approved tags. Returns the tags to use and the tags
    /// dropped.
    pub fn get_mapped_tag(hdx: &Hdx, tag: &str, log_deleted: bool) -> HdxResult<(Vec<String>, Vec<String>)> {
        let tag = tag.to_lowercase();
        let mappings = Self::read_tags_mappings(hdx, None, 1, true)?;
        let tags_list_url = hdx
            .configuration()
            .get_str("tags_list_url")
            .unwrap_or_default()
            .to_string();
        let mut tags = Vec::new();
        let mut deleted_tags = Vec::new();
        match mappings.get(&tag) {
            None => {
                if Self::is_approved(hdx, &tag)? {
                    tags.push(tag);
                } else {
                    error!(
                        "Unapproved tag {tag} not in tags mappings! For a list of approved tags see: {tags_list_url}"
                    );
                    deleted_tags.push(tag);
                }
            }
            Some(rule) => {
                match rule.action.as_str() {
                    "ok" => {
                        if Self::is_approved(hdx, &tag)? {
                            tags.push(tag);
                        } else {
                            error!(
                                "Tag {tag} is not in CKAN approved tags but is in tags mappings! For a list of approved tags see: {tags_list_url}"
                            );
                        }
                    }
                    "delete" => {
                        if log_deleted {
                            info!(
                                "Tag {tag} is invalid and won't be added! For a list of approved tags see: {tags_list_url}"
                            );
                        }
                        deleted_tags.push(tag);
                    }
                    "merge" => {
                        for final_tag in rule.final_tags() {
                            if Self::is_approved(hdx, final_tag)? {
                                tags.push(final_tag.to_string());
                            } else {
                                error!(
                                    "Mapped tag {final_tag} is not in CKAN approved tags but is in tags mappings! For a list of approved tags see: {tags_list_url}"
                                );
                            }
                        }
                    }
                    action => error!("Invalid action {action}!"),
                }
            }
        }
        Ok((tags, deleted_tags))
    }

    /// Maps every tag, keeping the first occurrence of each result.
    pub fn get_mapped_tags<S: AsRef<str>>(
        hdx: &Hdx,
        tags: &[S],
        log_deleted: bool,
    ) -> HdxResult<(Vec<String>, Vec<String>)> {
        let mut new_tags = Vec::new();
        let mut deleted_tags = Vec::new();
        for tag in tags {
            let (mapped, deleted) = Self::get_mapped_tag(hdx, tag.as_ref(), log_deleted)?;
            new_tags.extend(mapped);
            deleted_tags.extend(deleted);
        }
        Ok((dedup(new_tags), dedup(deleted_tags)))
    }

    pub fn add_mapped_tag<O: HdxObject>(
        object: &mut O,
        tag: &str,
        log_deleted: bool,
    ) -> HdxResult<(Vec<String>, Vec<String>)> {
        Self::add_mapped_tags(object, &[tag], log_deleted)
    }

    /// Adds the mapped forms of `tags` to an object under the approved
    /// vocabulary. Returns the tags added and those not added.
    pub fn add_mapped_tags<O: HdxObject, S: AsRef<str>>(
        object: &mut O,
        tags: &[S],
        log_deleted: bool,
    ) -> HdxResult<(Vec<String>, Vec<String>)> {
        let hdx = object.hdx().clone();
        let (new_tags, deleted_tags) = Self::get_mapped_tags(&hdx, tags, log_deleted)?;
        let vocabulary = Self::get_approved_vocabulary(&hdx)?;
        let vocabulary_id = vocabulary.get_str("id").map(String::from);
        let added = object.insert_tags(&new_tags, vocabulary_id.as_deref());
        let mut unadded: Vec<String> = new_tags
            .into_iter()
            .filter(|tag| !added.contains(tag))
            .collect();
        unadded.extend(deleted_tags);
        Ok((added, unadded))
    }

    /// Replaces an object's tags with their mapped forms.
    pub fn clean_tags<O: HdxObject>(object: &mut O, log_deleted: bool) -> HdxResult<(Vec<String>, Vec<String>)> {
        let tags = object.get_tags();
        object.set("tags", Vec::<Value>::new());
        Self::add_mapped_tags(object, &tags, log_deleted)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::{map, mock_hdx};

    pub(crate) const VOCABULARY_ID: &str = "4381925f-0ae9-44a3-b30d-cae35598757b";

    const MAPPINGS_CSV: &str = "\
Current Tag,Action to Take,New Tag(s),Notes
health,ok,,
education,ok,,
nutrition,ok,,
pointless,delete,,
wash,merge,water sanitation and hygiene-wash,
food,merge,food security;nutrition,
hlth,merge,health,
";

    /// Approved tags and mappings set up on a handle without remote calls.
    pub(crate) fn setup_tags(hdx: &Hdx) {
        let mut data = map(json!({"id": VOCABULARY_ID, "name": "Topics"}));
        data.insert(
            "tags".into(),
            json!([
                {"name": "health"},
                {"name": "education"},
                {"name": "food security"},
                {"name": "nutrition"},
                {"name": "water sanitation and hygiene-wash"},
            ]),
        );
        store(&hdx.caches().approved_vocabulary, Some(data));
        Vocabulary::set_tags_mappings(hdx, parse_tags_mappings(MAPPINGS_CSV, 1).unwrap());
    }

    #[test]
    fn test_parse_tags_mappings() {
        let mappings = parse_tags_mappings(MAPPINGS_CSV, 1).unwrap();
        assert_eq!(mappings.len(), 7);
        assert_eq!(mappings["health"], TagRule::new("ok", None));
        assert_eq!(
            mappings["wash"],
            TagRule::new("merge", Some("water sanitation and hygiene-wash"))
        );
        assert!(!find_chained_rules(&mappings, false));
    }

    #[test]
    fn test_chained_rules() {
        let (hdx, mock) = mock_hdx();
        let url = hdx.configuration().get_str("tags_mapping_url").unwrap().to_string();
        mock.on_text(
            &url,
            "Current Tag,Action to Take,New Tag(s)\na,merge,b\nb,merge,c\nc,ok,\n",
        );
        let err = Vocabulary::read_tags_mappings(&hdx, None, 1, true).unwrap_err();
        assert_eq!(err.to_string(), "Chained rules for tags detected!");

        let mappings = Vocabulary::read_tags_mappings(&hdx, None, 1, false).unwrap();
        assert_eq!(mappings["a"].new_tags.as_deref(), Some("b"));
    }

    #[test]
    fn test_get_mapped_tags() {
        let (hdx, _) = mock_hdx();
        setup_tags(&hdx);
        assert_eq!(
            Vocabulary::get_mapped_tag(&hdx, "HEALTH", true).unwrap(),
            (vec!["health".to_string()], vec![])
        );
        assert_eq!(
            Vocabulary::get_mapped_tag(&hdx, "pointless", true).unwrap(),
            (vec![], vec!["pointless".to_string()])
        );
        assert_eq!(
            Vocabulary::get_mapped_tag(&hdx, "unknown", true).unwrap(),
            (vec![], vec!["unknown".to_string()])
        );
        assert_eq!(
            Vocabulary::get_mapped_tag(&hdx, "food", true).unwrap(),
            (vec!["food security".to_string(), "nutrition".to_string()], vec![])
        );
        let (tags, deleted) =
            Vocabulary::get_mapped_tags(&hdx, &["hlth", "health", "nutrition", "food", "pointless"], false)
                .unwrap();
        assert_eq!(tags, vec!["health", "nutrition", "food security"]);
        assert_eq!(deleted, vec!["pointless"]);
    }

    #[test]
    fn test_clean_tags() {
        let (hdx, _) = mock_hdx();
        setup_tags(&hdx);
        let mut vocabulary = Vocabulary::with_tags(&hdx, "v", &["wash", "pointless", "health"]);
        let (added, unadded) = Vocabulary::clean_tags(&mut vocabulary, true).unwrap();
        assert_eq!(added, vec!["water sanitation and hygiene-wash", "health"]);
        assert_eq!(unadded, vec!["pointless"]);
        assert_eq!(
            vocabulary.get("tags").unwrap()[0],
            json!({"name": "water sanitation and hygiene-wash", "vocabulary_id": VOCABULARY_ID})
        );
    }

    #[test]
    fn test_approved_vocabulary() {
        let (hdx, mock) = mock_hdx();
        mock.on_result(
            "vocabulary_show",
            json!({"id": VOCABULARY_ID, "name": "Topics", "tags": [{"name": "health"}]}),
        );
        assert_eq!(Vocabulary::approved_tags(&hdx).unwrap(), vec!["health"]);
        assert!(Vocabulary::is_approved(&hdx, "Health").unwrap());
        assert!(!Vocabulary::is_approved(&hdx, "crisis").unwrap());
        assert_eq!(mock.calls_for("vocabulary_show").len(), 1);
        assert_eq!(mock.calls()[0].data, json!({"id": "Topics"}));

        let url = hdx.configuration().get_str("tags_list_url").unwrap().to_string();
        mock.on_text(&url, "\"health\"\neducation\nhealth\n");
        mock.on("vocabulary_update", |data| Ok(data.clone()));
        let vocabulary = Vocabulary::update_approved_vocabulary(&hdx, None, true).unwrap();
        assert_eq!(vocabulary.get_tags(), vec!["health", "education"]);
        assert_eq!(
            Vocabulary::approved_tags(&hdx).unwrap(),
            vec!["health", "education"]
        );
        let sent = &mock.calls_for("vocabulary_update")[0].data;
        assert!(sent.get("state").is_none());
    }

    #[test]
    fn test_delete_empties_tags_first() {
        let (hdx, mock) = mock_hdx();
        mock.on_result(
            "vocabulary_show",
            json!({"id": VOCABULARY_ID, "name": "v", "tags": [{"name": "a"}]}),
        );
        mock.on("vocabulary_update", |data| Ok(data.clone()));
        mock.on("vocabulary_delete", |data| Ok(data.clone()));
        let mut vocabulary = Vocabulary::new(
            &hdx,
            map(json!({"id": VOCABULARY_ID, "name": "v", "tags": [{"name": "a"}]})),
        );
        vocabulary.delete_from_hdx(true).unwrap();
        assert_eq!(
            mock.calls_for("vocabulary_update")[0].data["tags"],
            json!([])
        );
        assert_eq!(mock.calls_for("vocabulary_delete").len(), 1);
    }
}
