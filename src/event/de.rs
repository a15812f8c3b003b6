//! Custom deserializers for fields of the persisted event document.

use serde::{Deserialize, Deserializer};

/// Deserialize an optional string, treating an empty string the same as a missing value. Older
/// documents store unset rewards as `""`.
pub fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.trim().is_empty()))
}
