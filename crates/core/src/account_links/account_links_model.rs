use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Error, Result, ValidationError};
use crate::records::{Entity, EntityPayload, EntityType};

/// `EntityData` of an `AccountLink` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLinkData {
    /// Provider enrollment the linked credential grants access to.
    pub enrollment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_name: Option<String>,
}

impl EntityPayload for AccountLinkData {
    const ENTITY_TYPE: EntityType = EntityType::AccountLink;
}

/// A persisted account link. `provider_account_id` holds the access credential.
pub type AccountLink = Entity<AccountLinkData>;

/// Request to link an external enrollment to the calling user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccountLink {
    pub provider: String,
    /// Access credential issued by the provider for this enrollment.
    pub provider_id: String,
    #[serde(default)]
    pub entity_data: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl NewAccountLink {
    pub fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "provider".to_string(),
            )));
        }
        if self.provider_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "provider_id".to_string(),
            )));
        }
        // '#' is the sort key separator.
        if self.provider.contains('#') || self.provider_id.contains('#') {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "provider and provider_id must not contain '#'".to_string(),
            )));
        }
        match self.entity_data.get("enrollment_id") {
            Some(id) if !id.trim().is_empty() => Ok(()),
            _ => Err(Error::Validation(ValidationError::MissingField(
                "entity_data.enrollment_id".to_string(),
            ))),
        }
    }

    /// Builds the link record owned by `user_id`. Call [`validate`](Self::validate) first.
    pub fn into_account_link(self, user_id: &str) -> AccountLink {
        let data = AccountLinkData {
            enrollment_id: self
                .entity_data
                .get("enrollment_id")
                .cloned()
                .unwrap_or_default(),
            institution_id: self.entity_data.get("institution_id").cloned(),
            institution_name: self.entity_data.get("institution_name").cloned(),
        };
        let mut link = AccountLink::new(user_id, self.provider, self.provider_id, None, data);
        link.metadata = self.metadata;
        link
    }
}
