//! Three-state patch field: absent (leave unchanged), explicit null (clear),
//! or a value (replace). A plain `Option` collapses the first two states, so
//! partial updates use this instead.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// Key not present in the patch — keep the current value.
    Absent,
    /// Key present as JSON null — clear the current value.
    Null,
    /// Key present with a value — replace the current value.
    Value(T),
}

// Manual impl: `Absent` is the default regardless of whether T implements
// Default, which the derive would require.
impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    /// Apply the patch semantics against the current value.
    pub fn resolve(self, current: Option<T>) -> Option<T> {
        match self {
            Field::Absent => current,
            Field::Null => None,
            Field::Value(v) => Some(v),
        }
    }

    /// The new value, if this patch sets one.
    pub fn set_value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }
}

// Deserialization only distinguishes null from a value; the Absent state
// comes from `#[serde(default)]` on the containing struct's field.
impl<'de, T> Deserialize<'de> for Field<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Field::Value(v),
            None => Field::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default)]
        assignee: Field<String>,
    }

    #[test]
    fn absent_null_and_value_are_distinct() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.assignee, Field::Absent);

        let null: Patch = serde_json::from_str(r#"{"assignee": null}"#).unwrap();
        assert_eq!(null.assignee, Field::Null);

        let value: Patch = serde_json::from_str(r#"{"assignee": "u2"}"#).unwrap();
        assert_eq!(value.assignee, Field::Value("u2".to_string()));
    }

    #[test]
    fn resolve_applies_patch_semantics() {
        let current = Some("u1".to_string());
        assert_eq!(
            Field::Absent.resolve(current.clone()),
            Some("u1".to_string())
        );
        assert_eq!(Field::<String>::Null.resolve(current.clone()), None);
        assert_eq!(
            Field::Value("u2".to_string()).resolve(current),
            Some("u2".to_string())
        );
    }
}
