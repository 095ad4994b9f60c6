/// Splits a comma separated string into its parts. An empty string gives an
/// empty list.
pub fn split_commastring(commastring: &str) -> Vec<String> {
    if commastring.is_empty() {
        return Vec::new();
    }
    commastring.split(',').map(String::from).collect()
}

/// Appends `item` to a comma separated string unless it is already one of its
/// parts. Returns the new string, or `None` when nothing was added.
pub fn add_to_commastring(commastring: &str, item: &str) -> Option<String> {
    if split_commastring(commastring).iter().any(|s| s == item) {
        return None;
    }
    if commastring.is_empty() {
        Some(item.to_string())
    } else {
        Some(format!("{commastring},{item}"))
    }
}

/// Removes every occurrence of `item` from a comma separated string. Returns
/// `None` if `item` does not occur.
///
/// This is plain substring removal, so separators are left as they are.
pub fn remove_from_commastring(commastring: &str, item: &str) -> Option<String> {
    if item.is_empty() || !commastring.contains(item) {
        return None;
    }
    Some(commastring.replace(item, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_commastring() {
        assert_eq!(split_commastring("a,b,c"), vec!["a", "b", "c"]);
        assert!(split_commastring("").is_empty());
    }

    #[test]
    fn test_add_to_commastring() {
        assert_eq!(add_to_commastring("", "csv").as_deref(), Some("csv"));
        assert_eq!(add_to_commastring("csv", "xlsx").as_deref(), Some("csv,xlsx"));
        assert_eq!(add_to_commastring("csv,xlsx", "csv"), None);
    }

    #[test]
    fn test_remove_from_commastring() {
        assert_eq!(remove_from_commastring("csv,xlsx", "xlsx").as_deref(), Some("csv,"));
        assert_eq!(remove_from_commastring("csv", "json"), None);
    }
}
