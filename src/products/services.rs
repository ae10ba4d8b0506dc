use anyhow::Context;
use tracing::{info, warn};

use super::repo::{self, NewProduct};
use super::repo_types::Product;
use crate::{
    db,
    error::{ApiError, ApiResult},
    images::services::{discard_images, save_images, UploadItem},
    state::AppState,
    storage::PRODUCTS_PREFIX,
};

/// Multipart input of `POST /products`, already validated field by field.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub product_name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub product_category: Option<String>,
    pub images: Vec<UploadItem>,
}

/// Tags arrive as a JSON-encoded array of strings. Blank means no tags.
pub fn parse_tags(raw: &str) -> ApiResult<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|_| ApiError::bad_request("tags must be a JSON array of strings"))
}

pub fn parse_price(raw: &str) -> ApiResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .ok_or_else(|| ApiError::bad_request("price must be a number"))
}

pub async fn create_product(st: &AppState, form: ProductForm) -> ApiResult<Product> {
    let (product_name, price) = match (form.product_name, form.price) {
        (Some(name), Some(price)) => (name, price),
        _ => return Err(ApiError::bad_request("productName and price are required")),
    };

    let filenames = save_images(st, PRODUCTS_PREFIX, form.images).await?;

    let new = NewProduct {
        product_name: &product_name,
        price,
        description: form.description.as_deref(),
        tags: &form.tags,
        product_category: form.product_category.as_deref(),
        image: &filenames,
    };
    match repo::insert_product(&st.db, &new).await {
        Ok(row) => {
            info!(product_id = row.id, images = filenames.len(), "product created");
            Ok(row.into())
        }
        Err(e) => {
            warn!(error = %e, "product insert failed; removing uploaded images");
            discard_images(st, PRODUCTS_PREFIX, &filenames).await;
            Err(e.into())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: i32,
}

/// Flips whether `user_id` likes `product_id` and keeps the counter in step,
/// all in one transaction holding the product row lock.
pub async fn toggle_like(st: &AppState, user_id: i32, product_id: i32) -> ApiResult<LikeOutcome> {
    let mut tx = db::begin(&st.db).await?;

    if !repo::lock_product(&mut tx, product_id).await? {
        return Err(ApiError::not_found("Product not found"));
    }

    let outcome = if repo::remove_like(&mut tx, user_id, product_id).await? {
        let likes = repo::adjust_likes(&mut tx, product_id, -1).await?;
        LikeOutcome { liked: false, likes }
    } else {
        repo::insert_like(&mut tx, user_id, product_id).await?;
        let likes = repo::adjust_likes(&mut tx, product_id, 1).await?;
        LikeOutcome { liked: true, likes }
    };

    tx.commit().await.context("commit like toggle")?;
    info!(user_id, product_id, liked = outcome.liked, likes = outcome.likes, "like toggled");
    Ok(outcome)
}
