use serde::{Deserialize, Serialize};
use serde_json::json;

use super::*;
use crate::errors::{Error, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    id: String,
    amount: String,
}

impl EntityPayload for Payload {
    const ENTITY_TYPE: EntityType = EntityType::Transaction;
}

fn payload_entity() -> Entity<Payload> {
    Entity::new(
        "user-1",
        "Teller",
        "token_abc",
        Some("txn_1".to_string()),
        Payload {
            id: "txn_1".to_string(),
            amount: "-12.50".to_string(),
        },
    )
}

#[test]
fn test_sort_key_layout() {
    assert_eq!(
        sort_key("Teller", EntityType::Account, "token_abc", Some("acc_1")),
        "Provider#Teller#Account#token_abc#EntityID#acc_1"
    );
    assert_eq!(
        sort_key("Teller", EntityType::AccountLink, "token_abc", None),
        "Provider#Teller#AccountLink#token_abc"
    );
}

#[test]
fn test_entity_prefix_does_not_match_sibling_accounts() {
    let prefix = entity_prefix("Teller", EntityType::Balance, "tok_1");
    let own = sort_key("Teller", EntityType::Balance, "tok_1", Some("acc"));
    let sibling = sort_key("Teller", EntityType::Balance, "tok_10", Some("acc"));
    assert!(own.starts_with(&prefix));
    assert!(!sibling.starts_with(&prefix));
}

#[test]
fn test_entity_type_string_forms() {
    for entity_type in [
        EntityType::AccountLink,
        EntityType::Account,
        EntityType::Balance,
        EntityType::Transaction,
        EntityType::Sync,
    ] {
        assert_eq!(entity_type.as_str().parse::<EntityType>().unwrap(), entity_type);
    }
    assert!("Holding".parse::<EntityType>().is_err());
}

#[test]
fn test_record_serializes_with_envelope_field_names() {
    let record = payload_entity().to_record().unwrap();
    let value = serde_json::to_value(&record).unwrap();

    assert_eq!(value["PartitionKey"], "user-1");
    assert_eq!(value["ProviderAccountID"], "token_abc");
    assert_eq!(value["EntityType"], "Transaction");
    assert_eq!(value["EntityID"], "txn_1");
    assert_eq!(value["EntityData"]["amount"], "-12.50");
    assert!(value.get("Metadata").is_none());
}

#[test]
fn test_entity_round_trips_through_record() {
    let entity = payload_entity();
    let decoded = Entity::<Payload>::from_record(entity.to_record().unwrap()).unwrap();
    assert_eq!(decoded, entity);
}

#[test]
fn test_from_record_rejects_wrong_entity_type() {
    let mut record = payload_entity().to_record().unwrap();
    record.entity_type = EntityType::Balance;

    let err = Entity::<Payload>::from_record(record).unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::CorruptRecord { .. })));
}

#[test]
fn test_from_record_rejects_malformed_payload() {
    let mut record = payload_entity().to_record().unwrap();
    record.entity_data = json!({ "id": "txn_1" });

    let err = Entity::<Payload>::from_record(record).unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::CorruptRecord { .. })));
}

#[test]
fn test_from_record_rejects_mismatched_sort_key() {
    let mut record = payload_entity().to_record().unwrap();
    record.sort_key = "Provider#Teller#Transaction#other#EntityID#txn_1".to_string();

    assert!(Entity::<Payload>::from_record(record).is_err());
}

#[test]
fn test_apply_deltas_updates_only_named_fields() {
    let mut record = payload_entity().to_record().unwrap();
    record.entity_data = json!({
        "id": "txn_1",
        "amount": "-12.50",
        "details": { "processing_status": "pending", "category": "dining" }
    });

    record
        .apply_deltas(&[
            FieldDelta::data(&["details", "processing_status"], "complete"),
            FieldDelta::Timestamp(42),
        ])
        .unwrap();

    assert_eq!(record.entity_data["details"]["processing_status"], "complete");
    assert_eq!(record.entity_data["details"]["category"], "dining");
    assert_eq!(record.entity_data["amount"], "-12.50");
    assert_eq!(record.timestamp, 42);
}

#[test]
fn test_apply_deltas_creates_missing_parents() {
    let mut record = payload_entity().to_record().unwrap();
    record
        .apply_deltas(&[FieldDelta::data(&["details", "processing_status"], "complete")])
        .unwrap();
    assert_eq!(record.entity_data["details"]["processing_status"], "complete");
}

#[test]
fn test_apply_deltas_rejects_path_through_scalar() {
    let mut record = payload_entity().to_record().unwrap();
    let err = record
        .apply_deltas(&[FieldDelta::data(&["amount", "value"], "1")])
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::CorruptRecord { .. })));
}

#[test]
fn test_field_delta_names() {
    assert_eq!(
        FieldDelta::data(&["details", "processing_status"], "x").field_name(),
        "EntityData.details.processing_status"
    );
    assert_eq!(FieldDelta::Timestamp(1).field_name(), "Timestamp");
}
