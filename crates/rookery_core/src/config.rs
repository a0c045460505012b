use std::collections::HashMap;

pub const PROPERTY_BUCKET_NAME: &str = "repository.bucket";
pub const PROPERTY_CREDENTIALS_LOCATION: &str = "repository.credentials.location";
pub const PROPERTY_CACHE_CONTROL_FETCH: &str = "repository.cache-control.fetch";
pub const PROPERTY_CACHE_CONTROL_LIST: &str = "repository.cache-control.list";
pub const PROPERTY_UNIQUE_ARTIFACT: &str = "repository.unique.artifact";

pub const DEFAULT_CREDENTIALS_LOCATION: &str = "users.txt";

/// Named runtime properties of a deployment.
///
/// Routes that take their cache policy from a property look it up here when the
/// router is built; an unset property means "no header".
#[derive(Clone, Debug, Default)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
