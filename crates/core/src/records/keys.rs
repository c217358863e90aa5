//! Sort key construction.
//!
//! Every sort key starts with `Provider#<provider>#<EntityType>#<providerAccountId>`
//! so that all records of one type for one linked account form a contiguous range.
//! Records addressing an external object append `#EntityID#<entityId>`.

use super::records_model::EntityType;

/// Prefix shared by every sort key in a user's partition.
pub const SORT_KEY_ROOT: &str = "Provider#";

const ENTITY_ID_SEGMENT: &str = "EntityID";

/// Builds the full sort key of a record.
pub fn sort_key(
    provider: &str,
    entity_type: EntityType,
    provider_account_id: &str,
    entity_id: Option<&str>,
) -> String {
    let base = format!(
        "Provider#{}#{}#{}",
        provider, entity_type, provider_account_id
    );
    match entity_id {
        Some(id) => format!("{}#{}#{}", base, ENTITY_ID_SEGMENT, id),
        None => base,
    }
}

/// Prefix matching every record of `entity_type` that carries an entity id
/// under one provider account.
///
/// The trailing separator keeps `tok_1` from matching records of `tok_10`.
pub fn entity_prefix(provider: &str, entity_type: EntityType, provider_account_id: &str) -> String {
    format!(
        "Provider#{}#{}#{}#{}#",
        provider, entity_type, provider_account_id, ENTITY_ID_SEGMENT
    )
}
