use std::collections::{HashMap, hash_map::Entry};

use crate::error::AppError::{self, MalformedRequest};

/// Query-string parameters of one request. A key given more than once keeps its first value.
#[derive(Debug, Default, Clone)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Presence flag, as sent by a checked checkbox. The value is ignored.
    pub fn flag(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn required(&self, name: &str, missing: &str, wrong_format: &str) -> Result<&str, AppError> {
        match self.get(name) {
            None => Err(MalformedRequest(missing.to_string())),
            Some("") => Err(MalformedRequest(wrong_format.to_string())),
            Some(value) => Ok(value),
        }
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut values = HashMap::new();

        for (key, value) in pairs {
            if let Entry::Vacant(slot) = values.entry(key) {
                slot.insert(value);
            }
        }

        Self { values }
    }
}

/// Escapes LIKE wildcards so a value matches literally inside `%...%`.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_first_occurrence_wins() {
        let p = params(&[("className", "CS144"), ("className", "CS145")]);
        assert_eq!(p.get("className"), Some("CS144"));
    }

    #[test]
    fn test_required() {
        let p = params(&[("className", "CS144"), ("problemID", "")]);

        assert_eq!(p.required("className", "missing", "wrong").unwrap(), "CS144");
        assert!(matches!(
            p.required("problemID", "missing", "wrong"),
            Err(MalformedRequest(reason)) if reason == "wrong"
        ));
        assert!(matches!(
            p.required("qID", "missing", "wrong"),
            Err(MalformedRequest(reason)) if reason == "missing"
        ));
    }

    #[test]
    fn test_flag_ignores_value() {
        assert!(params(&[("csv", "")]).flag("csv"));
        assert!(params(&[("csv", "off")]).flag("csv"));
        assert!(!params(&[]).flag("csv"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("CS144"), "CS144");
        assert_eq!(escape_like("100%_sure"), "100\\%\\_sure");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("O'Brien"), "O'Brien");
    }
}
