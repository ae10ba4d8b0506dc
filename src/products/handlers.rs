use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{coerce_id, LikeRequest, LikeResponse, ProductPage, ProductResponse},
    repo,
    repo_types::Product,
    services::{create_product as create, parse_price, parse_tags, toggle_like, ProductForm},
};
use crate::{
    error::{ApiError, ApiResult},
    extract::{required, AppJson},
    images::services::{UploadItem, UPLOAD_BODY_LIMIT},
    pagination::PageQuery,
    state::AppState,
};

const DEFAULT_PRODUCT_LIMIT: i64 = 10;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/addproduct", get(list_products))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            post(create_product).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/products/:id/likes", put(like_product))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<ProductPage>> {
    let page = q.resolve(DEFAULT_PRODUCT_LIMIT);
    let rows = repo::list_page(&state.db, page.limit, page.offset()).await?;
    let total_products = repo::count(&state.db).await?;

    Ok(Json(ProductPage {
        page: page.page,
        limit: page.limit,
        total_products,
        total_pages: page.total_pages(total_products),
        products: rows.into_iter().map(Product::from).collect(),
    }))
}

/// POST /products (multipart)
/// Files under `images` (repeatable), text fields productName, price,
/// description, tags (JSON array), productCategory.
#[instrument(skip(state, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    let mut form = ProductForm::default();
    while let Some(field) = mp.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" | "images[]" | "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                if file_name.is_empty() {
                    continue;
                }
                let content_type = field.content_type().map(str::to_string);
                let checked = UploadItem::new(&file_name, content_type.as_deref(), Default::default())?;
                let body = field.bytes().await?;
                form.images.push(UploadItem { body, ..checked });
            }
            "productName" => form.product_name = required(Some(field.text().await?)),
            "price" => form.price = Some(parse_price(&field.text().await?)?),
            "description" => form.description = required(Some(field.text().await?)),
            "tags" => form.tags = parse_tags(&field.text().await?)?,
            "productCategory" => form.product_category = required(Some(field.text().await?)),
            other => warn!(field = other, "ignoring unknown product field"),
        }
    }

    let product = create(&state, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product added successfully".into(),
            product,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn like_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<LikeRequest>,
) -> ApiResult<Json<LikeResponse>> {
    let product_id = id.trim().parse::<i32>().ok();
    let user_id = payload.userid.as_ref().and_then(coerce_id);
    let (Some(product_id), Some(user_id)) = (product_id, user_id) else {
        return Err(ApiError::bad_request("Product id and user id are required"));
    };

    let outcome = toggle_like(&state, user_id, product_id).await?;
    let message = if outcome.liked {
        "Product liked"
    } else {
        "Product unliked"
    };
    Ok(Json(LikeResponse {
        message: message.into(),
        liked: outcome.liked,
        likes: outcome.likes,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::state::MemoryStorage;

    const BOUNDARY: &str = "X-PRODUCT-BOUNDARY";

    fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, file, value) in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match file {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    name, f
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));
        Request::post("/products")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn app(storage: Arc<MemoryStorage>) -> Router {
        Router::new()
            .merge(read_routes())
            .merge(write_routes())
            .with_state(AppState::fake_with_storage(storage))
    }

    async fn message(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        v["message"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn gif_upload_is_rejected_before_anything_is_written() {
        let storage = Arc::new(MemoryStorage::default());
        let req = multipart(&[
            ("productName", None, "Lamp"),
            ("price", None, "12"),
            ("images", Some("ok.png"), "PNGDATA"),
            ("images", Some("anim.gif"), "GIF89a"),
        ]);
        let resp = app(storage.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            message(resp).await,
            crate::images::services::ALLOWED_EXTENSIONS_MESSAGE
        );
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn malformed_tags_is_400() {
        let storage = Arc::new(MemoryStorage::default());
        let req = multipart(&[
            ("productName", None, "Lamp"),
            ("price", None, "12"),
            ("tags", None, "red, blue"),
        ]);
        let resp = app(storage.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn non_numeric_price_is_400() {
        let req = multipart(&[("productName", None, "Lamp"), ("price", None, "cheap")]);
        let resp = app(Arc::default()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(message(resp).await, "price must be a number");
    }

    #[tokio::test]
    async fn like_without_userid_is_400() {
        let req = Request::put("/products/3/likes")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let resp = app(Arc::default()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(message(resp).await, "Product id and user id are required");
    }

    #[tokio::test]
    async fn like_with_non_numeric_product_id_is_400() {
        let req = Request::put("/products/abc/likes")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"userid":1}"#))
            .unwrap();
        let resp = app(Arc::default()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
