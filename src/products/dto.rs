use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::repo_types::Product;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub page: i64,
    pub limit: i64,
    pub total_products: i64,
    pub total_pages: i64,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub message: String,
    pub product: Product,
}

/// Body of `PUT /products/:id/likes`. Ids arrive as numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LikeRequest {
    pub userid: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub message: String,
    pub liked: bool,
    pub likes: i32,
}

/// Integer coercion for ids: presence matters, not truthiness, so `0` is kept.
pub fn coerce_id(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}
