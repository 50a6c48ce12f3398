use serde::{Deserialize, Deserializer, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use validator::Validate;

use crate::services::entitlements::Entitlement;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PaymentCreate {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub(crate) user_id: String,
    #[validate(length(min = 1, message = "category_id must not be empty"))]
    pub(crate) category_id: String,
    #[serde(default)]
    pub(crate) module_id: Option<String>,
    #[validate(range(min = 0, message = "amount_cents must be non-negative"))]
    pub(crate) amount_cents: i64,
    #[serde(deserialize_with = "deserialize_expiry")]
    pub(crate) expires_at: OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GiftCreate {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub(crate) user_id: String,
    #[validate(length(min = 1, message = "category_id must not be empty"))]
    pub(crate) category_id: String,
    #[serde(default)]
    pub(crate) module_id: Option<String>,
}

fn parse_expiry(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }
    // Date-time without offset is taken as UTC.
    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        return OffsetDateTime::parse(&format!("{raw}Z"), &Rfc3339).ok();
    }
    None
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_expiry(&raw).ok_or_else(|| serde::de::Error::custom("expires_at must be an RFC 3339 timestamp"))
}

#[derive(Debug, Serialize)]
pub(crate) struct EntitlementResponse {
    #[serde(flatten)]
    pub(crate) entitlement: Entitlement,
    pub(crate) is_effective: bool,
}

impl EntitlementResponse {
    pub(crate) fn new(entitlement: Entitlement, now: time::PrimitiveDateTime) -> Self {
        let is_effective = entitlement.grant.is_effective(now);
        Self { entitlement, is_effective }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GiftResponse {
    #[serde(flatten)]
    pub(crate) entitlement: EntitlementResponse,
    pub(crate) created: bool,
}
