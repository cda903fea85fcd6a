use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A library category.
///
/// Only the id is interpreted client-side; every other field the backend
/// sends is carried through untouched so updates round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Category {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// First naming-like field present, for display
    pub fn display_name(&self) -> &str {
        ["categoryName", "name", "title"]
            .iter()
            .find_map(|key| self.fields.get(*key).and_then(Value::as_str))
            .unwrap_or("(unnamed)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_round_trip() {
        let raw = json!({"id": 4, "categoryName": "Museums", "categoryAlias": "museum", "createUser": 1});
        let category: Category = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(category.id, Some(4));
        assert_eq!(category.display_name(), "Museums");
        assert_eq!(serde_json::to_value(&category).unwrap(), raw);
    }

    #[test]
    fn test_new_category_omits_id() {
        let category = Category::new().with_field("categoryName", "Parks");
        assert_eq!(serde_json::to_value(&category).unwrap(), json!({"categoryName": "Parks"}));
        assert_eq!(Category::new().display_name(), "(unnamed)");
    }
}
