//! Matching resources between two lists by id, name, grouping and format.

use std::{
    borrow::Borrow,
    collections::{HashMap, HashSet},
};

use serde_json::{Map, Value};

type Metadata = Map<String, Value>;

fn field<'a>(resource: &'a Metadata, key: &str) -> Option<&'a str> {
    resource.get(key).and_then(Value::as_str)
}

fn name_key(resource: &Metadata) -> (Option<&str>, Option<&str>) {
    (field(resource, "name"), field(resource, "grouping"))
}

fn format_of(resource: &Metadata) -> String {
    field(resource, "format").unwrap_or_default().to_lowercase()
}

fn duplicate_names<R: Borrow<Metadata>>(resources: &[R]) -> HashSet<Option<&str>> {
    let mut counts: HashMap<Option<&str>, usize> = HashMap::new();
    for resource in resources {
        *counts.entry(field(<R as Borrow<Metadata>>::borrow(resource), "name")).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect()
}

/// Finds the index in `resources` matching `resource`.
///
/// An id and grouping match wins. Otherwise the last entry with the same name
/// and grouping is taken, also requiring the same format when that name and
/// grouping occurs more than once in `resources`.
pub fn match_resource_list<R: Borrow<Metadata>>(
    resources: &[R],
    resource: &Metadata,
) -> Option<usize> {
    let resources: Vec<&Metadata> = resources.iter().map(<R as Borrow<Metadata>>::borrow).collect();
    let grouping = field(resource, "grouping");
    if let Some(id) = field(resource, "id") {
        let found = resources
            .iter()
            .position(|r| field(r, "id") == Some(id) && field(r, "grouping") == grouping);
        if found.is_some() {
            return found;
        }
    }

    let mut counts: HashMap<(Option<&str>, Option<&str>), usize> = HashMap::new();
    for r in &resources {
        *counts.entry(name_key(r)).or_default() += 1;
    }
    let wanted = name_key(resource);
    let format = format_of(resource);
    resources
        .iter()
        .enumerate()
        .filter(|(_, r)| name_key(r) == wanted)
        .filter(|(_, r)| counts.get(&name_key(r)).copied().unwrap_or(0) <= 1 || format_of(r) == format)
        .map(|(i, _)| i)
        .last()
}

/// Result of pairing two resource lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceMatches {
    pub index1_matches: Vec<usize>,
    pub index2_matches: Vec<usize>,
    pub index1_nomatches: Vec<usize>,
    pub index2_nomatches: Vec<usize>,
}

/// Pairs resources in two lists, first by id and grouping and then by name
/// and grouping. Names duplicated in either list must also match on format.
pub fn match_resource_lists<R1, R2>(resources1: &[R1], resources2: &[R2]) -> ResourceMatches
where
    R1: Borrow<Metadata>,
    R2: Borrow<Metadata>,
{
    let mut matches = ResourceMatches::default();
    let dupnames: HashSet<Option<&str>> = duplicate_names(resources1)
        .into_iter()
        .chain(duplicate_names(resources2))
        .collect();
    let resources1: Vec<&Metadata> = resources1.iter().map(<R1 as Borrow<Metadata>>::borrow).collect();
    let resources2: Vec<&Metadata> = resources2.iter().map(<R2 as Borrow<Metadata>>::borrow).collect();

    for (i, r1) in resources1.iter().enumerate() {
        let Some(id1) = field(r1, "id") else { continue };
        for (j, r2) in resources2.iter().enumerate() {
            if field(r2, "id") == Some(id1) && field(r1, "grouping") == field(r2, "grouping") {
                matches.index1_matches.push(i);
                matches.index2_matches.push(j);
            }
        }
    }

    for (i, r1) in resources1.iter().enumerate() {
        if matches.index1_matches.contains(&i) {
            continue;
        }
        let name1 = field(r1, "name");
        for (j, r2) in resources2.iter().enumerate() {
            if matches.index2_matches.contains(&j) {
                continue;
            }
            if name1 != field(r2, "name") {
                continue;
            }
            if dupnames.contains(&name1) && format_of(r1) != format_of(r2) {
                continue;
            }
            if field(r1, "grouping") == field(r2, "grouping") {
                matches.index1_matches.push(i);
                matches.index2_matches.push(j);
            }
        }
    }

    matches.index1_nomatches = (0..resources1.len())
        .filter(|i| !matches.index1_matches.contains(i))
        .collect();
    matches.index2_nomatches = (0..resources2.len())
        .filter(|j| !matches.index2_matches.contains(j))
        .collect();
    matches
}
