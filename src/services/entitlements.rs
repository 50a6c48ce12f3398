use serde::Serialize;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::EntitlementRow;
use crate::db::types::GrantSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum EntitlementScope {
    Category { category_id: String },
    Module { category_id: String, module_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Grant {
    Payment {
        amount_cents: i64,
        #[serde(serialize_with = "serialize_timestamp")]
        expires_at: PrimitiveDateTime,
    },
    Gift,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Entitlement {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) scope: EntitlementScope,
    pub(crate) grant: Grant,
    #[serde(serialize_with = "serialize_timestamp")]
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Error)]
pub(crate) enum EntitlementShapeError {
    #[error("payment entitlement {0} has no expiry")]
    PaymentWithoutExpiry(String),
    #[error("payment entitlement {0} has no amount")]
    PaymentWithoutAmount(String),
}

/// What the learner is asking to reach.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AccessTarget<'a> {
    pub(crate) category_id: &'a str,
    pub(crate) module_id: Option<&'a str>,
    pub(crate) category_is_modular: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum AccessStatus {
    Owned,
    Expired,
    NeverPurchased,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = EntitlementShapeError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        let scope = match row.module_id {
            Some(module_id) => {
                EntitlementScope::Module { category_id: row.category_id, module_id }
            }
            None => EntitlementScope::Category { category_id: row.category_id },
        };

        let grant = match row.source {
            GrantSource::Gift => Grant::Gift,
            GrantSource::Payment => Grant::Payment {
                amount_cents: row
                    .amount_cents
                    .ok_or_else(|| EntitlementShapeError::PaymentWithoutAmount(row.id.clone()))?,
                expires_at: row
                    .expires_at
                    .ok_or_else(|| EntitlementShapeError::PaymentWithoutExpiry(row.id.clone()))?,
            },
        };

        Ok(Self { id: row.id, user_id: row.user_id, scope, grant, created_at: row.created_at })
    }
}

impl Grant {
    /// Payments stay effective strictly before `expires_at`.
    pub(crate) fn is_effective(&self, now: PrimitiveDateTime) -> bool {
        match self {
            Grant::Gift => true,
            Grant::Payment { expires_at, .. } => now < *expires_at,
        }
    }
}

impl EntitlementScope {
    pub(crate) fn category_id(&self) -> &str {
        match self {
            EntitlementScope::Category { category_id }
            | EntitlementScope::Module { category_id, .. } => category_id,
        }
    }

    fn covers(&self, target: &AccessTarget<'_>) -> bool {
        match self {
            EntitlementScope::Category { category_id } => category_id == target.category_id,
            EntitlementScope::Module { category_id, module_id } => {
                target.category_is_modular
                    && category_id == target.category_id
                    && target.module_id == Some(module_id.as_str())
            }
        }
    }
}

pub(crate) fn access_status(
    entitlements: &[Entitlement],
    target: AccessTarget<'_>,
    now: PrimitiveDateTime,
) -> AccessStatus {
    let mut covering = entitlements.iter().filter(|item| item.scope.covers(&target)).peekable();

    if covering.peek().is_none() {
        return AccessStatus::NeverPurchased;
    }

    if covering.any(|item| item.grant.is_effective(now)) {
        AccessStatus::Owned
    } else {
        AccessStatus::Expired
    }
}

pub(crate) fn has_access(
    entitlements: &[Entitlement],
    target: AccessTarget<'_>,
    now: PrimitiveDateTime,
) -> bool {
    access_status(entitlements, target, now) == AccessStatus::Owned
}

fn serialize_timestamp<S>(value: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&crate::core::time::format_primitive(*value))
}
