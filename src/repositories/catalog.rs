use sqlx::PgPool;

use crate::db::models::{Category, CategoryModule, Video};

const CATEGORY_COLUMNS: &str = "\
    id, title, description, price_cents, requires_sequential, is_modular, created_at, updated_at";
const MODULE_COLUMNS: &str = "id, category_id, title, order_index, price_cents";
const VIDEO_COLUMNS: &str =
    "id, category_id, module_id, title, description, order_index, view_count, created_at";

pub(crate) async fn find_category(
    pool: &PgPool,
    category_id: &str,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
    ))
    .bind(category_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_categories_by_ids(
    pool: &PgPool,
    category_ids: &[String],
) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ANY($1)"
    ))
    .bind(category_ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_module(
    pool: &PgPool,
    category_id: &str,
    module_id: &str,
) -> Result<Option<CategoryModule>, sqlx::Error> {
    sqlx::query_as::<_, CategoryModule>(&format!(
        "SELECT {MODULE_COLUMNS} FROM category_modules WHERE category_id = $1 AND id = $2"
    ))
    .bind(category_id)
    .bind(module_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_modules(
    pool: &PgPool,
    category_id: &str,
) -> Result<Vec<CategoryModule>, sqlx::Error> {
    sqlx::query_as::<_, CategoryModule>(&format!(
        "SELECT {MODULE_COLUMNS} FROM category_modules WHERE category_id = $1 ORDER BY order_index"
    ))
    .bind(category_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_video(pool: &PgPool, video_id: &str) -> Result<Option<Video>, sqlx::Error> {
    sqlx::query_as::<_, Video>(&format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1"))
        .bind(video_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_videos_for_categories(
    pool: &PgPool,
    category_ids: &[String],
) -> Result<Vec<Video>, sqlx::Error> {
    sqlx::query_as::<_, Video>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE category_id = ANY($1) ORDER BY category_id, order_index"
    ))
    .bind(category_ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_videos_by_ids(
    pool: &PgPool,
    video_ids: &[String],
) -> Result<Vec<Video>, sqlx::Error> {
    sqlx::query_as::<_, Video>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ANY($1) ORDER BY order_index"
    ))
    .bind(video_ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn increment_view_count(pool: &PgPool, video_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE videos SET view_count = view_count + 1 WHERE id = $1")
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// (task_id, video_id) pairs for every task touching the given categories.
pub(crate) async fn list_task_links_for_categories(
    pool: &PgPool,
    category_ids: &[String],
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>(
        "SELECT tv.task_id, tv.video_id
         FROM task_videos tv
         WHERE tv.task_id IN (
            SELECT inner_tv.task_id
            FROM task_videos inner_tv
            JOIN videos v ON v.id = inner_tv.video_id
            WHERE v.category_id = ANY($1)
         )",
    )
    .bind(category_ids)
    .fetch_all(pool)
    .await
}
