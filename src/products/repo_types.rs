use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

/// Product record in the database. `tags` and `image` are JSONB lists.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: i32,
    pub product_name: String,
    pub price: f64,
    pub description: Option<String>,
    pub tags: Option<Value>,
    pub product_category: Option<String>,
    pub image: Option<Value>,
    pub likes: Option<i32>,
}

/// Product as returned to clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub product_name: String,
    pub price: f64,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub product_category: Option<String>,
    pub image: Vec<String>,
    pub likes: i32,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            product_name: r.product_name,
            price: r.price,
            description: r.description,
            tags: string_list(r.tags),
            product_category: r.product_category,
            image: string_list(r.image),
            likes: r.likes.unwrap_or(0).max(0),
        }
    }
}

/// Reads an embedded list column. Anything that is not a list of strings
/// (including rows written as JSON text) degrades to what can be salvaged, else `[]`.
pub fn string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(inner @ Value::Array(_)) => string_list(Some(inner)),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_list_normalizes_shapes() {
        assert_eq!(string_list(Some(json!(["a", "b"]))), vec!["a", "b"]);
        assert_eq!(string_list(Some(json!(["a", 1, null]))), vec!["a"]);
        assert_eq!(string_list(Some(json!("[\"x\"]"))), vec!["x"]);
        assert!(string_list(Some(json!("not json"))).is_empty());
        assert!(string_list(Some(json!({"a": 1}))).is_empty());
        assert!(string_list(Some(json!(3))).is_empty());
        assert!(string_list(None).is_empty());
    }

    #[test]
    fn product_view_defaults_likes_and_uses_camel_case() {
        let row = ProductRow {
            id: 1,
            product_name: "Lamp".into(),
            price: 19.5,
            description: None,
            tags: Some(json!({"broken": true})),
            product_category: Some("home".into()),
            image: None,
            likes: None,
        };
        let v = serde_json::to_value(Product::from(row)).unwrap();
        assert_eq!(v["productName"], "Lamp");
        assert_eq!(v["productCategory"], "home");
        assert_eq!(v["likes"], 0);
        assert_eq!(v["tags"], json!([]));
        assert_eq!(v["image"], json!([]));
    }
}
