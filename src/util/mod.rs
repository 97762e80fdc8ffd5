use std::collections::HashMap;

pub mod identifier;
pub mod on_conflict;
pub mod schema;

#[must_use]
pub fn remove_prefix_from_hashmap_keys<V>(
    hashmap: HashMap<String, V>,
    prefix: &str,
) -> HashMap<String, V> {
    hashmap
        .into_iter()
        .map(|(key, value)| match key.strip_prefix(prefix) {
            Some(stripped) => (stripped.to_string(), value),
            None => (key, value),
        })
        .collect()
}
