use std::collections::HashMap;
use std::fmt;
use url::form_urlencoded;

/// Raw request parameters, from a GET query string or a POST body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParameters {
    pub params: HashMap<String, String>,
}

impl FormParameters {
    pub const fn new_from_pairs(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Parses an `application/x-www-form-urlencoded` string. Later
    /// occurrences of a key win.
    pub fn outcome_from_query(query: &str) -> Self {
        let params = form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self::new_from_pairs(params)
    }

    /// Value of `key`, if present and non-blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

impl fmt::Display for FormParameters {
    /// Re-encodes the parameters, sorted by key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.params.keys().collect();
        keys.sort();
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for key in keys {
            serializer.append_pair(key, &self.params[key]);
        }
        write!(f, "{}", serializer.finish())
    }
}
