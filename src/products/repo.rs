use sqlx::{types::Json, PgPool};

use super::repo_types::ProductRow;
use crate::db::Tx;

macro_rules! product_columns {
    () => {
        "id, product_name, price, description, tags, product_category, image, likes"
    };
}

pub struct NewProduct<'a> {
    pub product_name: &'a str,
    pub price: f64,
    pub description: Option<&'a str>,
    pub tags: &'a [String],
    pub product_category: Option<&'a str>,
    pub image: &'a [String],
}

pub async fn insert_product(db: &PgPool, p: &NewProduct<'_>) -> Result<ProductRow, sqlx::Error> {
    sqlx::query_as::<_, ProductRow>(concat!(
        r#"
        INSERT INTO products (product_name, price, description, tags, product_category, image, likes)
        VALUES ($1, $2, $3, $4, $5, $6, 0)
        RETURNING "#,
        product_columns!()
    ))
    .bind(p.product_name)
    .bind(p.price)
    .bind(p.description)
    .bind(Json(p.tags))
    .bind(p.product_category)
    .bind(Json(p.image))
    .fetch_one(db)
    .await
}

pub async fn list_page(db: &PgPool, limit: i64, offset: i64) -> Result<Vec<ProductRow>, sqlx::Error> {
    sqlx::query_as::<_, ProductRow>(concat!(
        "SELECT ",
        product_columns!(),
        " FROM products ORDER BY id LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn count(db: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(db)
        .await
}

// ---- like toggle, all inside one transaction ----

/// Row lock on the product; serializes concurrent toggles on it.
pub async fn lock_product(tx: &mut Tx, product_id: i32) -> Result<bool, sqlx::Error> {
    let row = sqlx::query_scalar::<_, i32>("SELECT id FROM products WHERE id = $1 FOR UPDATE")
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

/// Deletes the junction row; `true` if there was one.
pub async fn remove_like(tx: &mut Tx, user_id: i32, product_id: i32) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM addlikes WHERE userid = $1 AND productid = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn insert_like(tx: &mut Tx, user_id: i32, product_id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO addlikes (userid, productid) VALUES ($1, $2)")
        .bind(user_id)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Applies `delta` to the counter, treating NULL as 0 and never going below 0.
pub async fn adjust_likes(tx: &mut Tx, product_id: i32, delta: i32) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE products
           SET likes = GREATEST(COALESCE(likes, 0) + $2, 0)
         WHERE id = $1
        RETURNING likes
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .fetch_one(&mut **tx)
    .await
}
