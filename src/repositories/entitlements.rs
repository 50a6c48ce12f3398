use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::EntitlementRow;
use crate::db::types::GrantSource;
use crate::services::entitlements::Entitlement;

const COLUMNS: &str = "\
    id, user_id, category_id, module_id, source, amount_cents, expires_at, granted_by, created_at";

fn normalize(rows: Vec<EntitlementRow>) -> Result<Vec<Entitlement>, sqlx::Error> {
    rows.into_iter()
        .map(|row| Entitlement::try_from(row).map_err(|err| sqlx::Error::Decode(Box::new(err))))
        .collect()
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<Entitlement>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EntitlementRow>(&format!(
        "SELECT {COLUMNS} FROM entitlements WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    normalize(rows)
}

pub(crate) async fn list_for_user_categories(
    pool: &PgPool,
    user_id: &str,
    category_ids: &[String],
) -> Result<Vec<Entitlement>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EntitlementRow>(&format!(
        "SELECT {COLUMNS} FROM entitlements WHERE user_id = $1 AND category_id = ANY($2)"
    ))
    .bind(user_id)
    .bind(category_ids)
    .fetch_all(pool)
    .await?;

    normalize(rows)
}

pub(crate) struct CreatePayment<'a> {
    pub(crate) user_id: &'a str,
    pub(crate) category_id: &'a str,
    pub(crate) module_id: Option<&'a str>,
    pub(crate) amount_cents: i64,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) recorded_by: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create_payment(
    pool: &PgPool,
    params: CreatePayment<'_>,
) -> Result<Entitlement, sqlx::Error> {
    let row = sqlx::query_as::<_, EntitlementRow>(&format!(
        "INSERT INTO entitlements (
            id, user_id, category_id, module_id, source, amount_cents, expires_at, granted_by, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(params.user_id)
    .bind(params.category_id)
    .bind(params.module_id)
    .bind(GrantSource::Payment)
    .bind(params.amount_cents)
    .bind(params.expires_at)
    .bind(params.recorded_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await?;

    normalize(vec![row])?.pop().ok_or(sqlx::Error::RowNotFound)
}

pub(crate) struct GrantGift<'a> {
    pub(crate) user_id: &'a str,
    pub(crate) category_id: &'a str,
    pub(crate) module_id: Option<&'a str>,
    pub(crate) granted_by: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Get-or-create. Returns the gift and whether this call created it.
pub(crate) async fn grant_gift(
    pool: &PgPool,
    params: GrantGift<'_>,
) -> Result<(Entitlement, bool), sqlx::Error> {
    let inserted = sqlx::query_as::<_, EntitlementRow>(&format!(
        "INSERT INTO entitlements (
            id, user_id, category_id, module_id, source, granted_by, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         ON CONFLICT (user_id, category_id, (COALESCE(module_id, ''))) WHERE source = 'gift'
         DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(params.user_id)
    .bind(params.category_id)
    .bind(params.module_id)
    .bind(GrantSource::Gift)
    .bind(params.granted_by)
    .bind(params.created_at)
    .fetch_optional(pool)
    .await?;

    let (row, created) = match inserted {
        Some(row) => (row, true),
        None => {
            let existing = sqlx::query_as::<_, EntitlementRow>(&format!(
                "SELECT {COLUMNS} FROM entitlements
                 WHERE user_id = $1 AND category_id = $2
                   AND COALESCE(module_id, '') = COALESCE($3, '')
                   AND source = $4"
            ))
            .bind(params.user_id)
            .bind(params.category_id)
            .bind(params.module_id)
            .bind(GrantSource::Gift)
            .fetch_one(pool)
            .await?;
            (existing, false)
        }
    };

    let entitlement = normalize(vec![row])?.pop().ok_or(sqlx::Error::RowNotFound)?;
    Ok((entitlement, created))
}
