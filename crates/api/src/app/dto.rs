use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use referral_core::{AggregateRoot, Entity, UserId};
use referral_graph::{Referral, ReferralEdge, User};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

/// Wire description of a referral participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescriptor {
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub is_bot: bool,
}

impl UserDescriptor {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            language_code: String::new(),
            is_bot: false,
        }
    }

    /// Identifiers are assigned upstream and are always positive.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.user_id <= 0 {
            return Err(ApiError::validation(format!(
                "user_id must be positive, got {}",
                self.user_id
            )));
        }
        Ok(())
    }

    pub fn into_user(self) -> Result<User, ApiError> {
        self.validate()?;
        Ok(User::new(UserId::new(self.user_id))
            .with_username(self.username)
            .with_name(self.first_name, self.last_name)
            .with_language_code(self.language_code)
            .with_bot(self.is_bot))
    }
}

impl From<&User> for UserDescriptor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id_typed().get(),
            username: user.username().to_string(),
            first_name: user.first_name().to_string(),
            last_name: user.last_name().to_string(),
            language_code: user.language_code().to_string(),
            is_bot: user.is_bot(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptReferralRequest {
    pub from: UserDescriptor,
    pub to: UserDescriptor,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsureReferralRecordResponse {
    pub success: bool,
    /// Whether this request created the record (false when it already existed).
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptReferralResponse {
    pub bonus_granted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralEdgeRecord {
    pub edge_id: String,
    pub from: UserDescriptor,
    pub to: UserDescriptor,
    pub created_at: DateTime<Utc>,
}

impl From<&ReferralEdge> for ReferralEdgeRecord {
    fn from(edge: &ReferralEdge) -> Self {
        Self {
            edge_id: edge.id().to_string(),
            from: UserDescriptor::from(edge.from()),
            to: UserDescriptor::from(edge.to()),
            created_at: edge.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralRecord {
    pub owner: i64,
    pub version: u64,
    pub edges: Vec<ReferralEdgeRecord>,
}

impl From<&Referral> for ReferralRecord {
    fn from(referral: &Referral) -> Self {
        Self {
            owner: referral.owner().get(),
            version: referral.version(),
            edges: referral.edges().iter().map(ReferralEdgeRecord::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use referral_core::EdgeId;

    #[test]
    fn descriptor_requires_only_user_id() {
        let descriptor: UserDescriptor = serde_json::from_str(r#"{"user_id": 100}"#).unwrap();
        assert_eq!(descriptor, UserDescriptor::new(100));

        let missing = serde_json::from_str::<UserDescriptor>(r#"{"username": "x"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn descriptor_converts_to_user_and_back() {
        let descriptor = UserDescriptor {
            user_id: 42,
            username: "neo".to_string(),
            first_name: "Thomas".to_string(),
            last_name: "Anderson".to_string(),
            language_code: "en".to_string(),
            is_bot: false,
        };

        let user = descriptor.clone().into_user().unwrap();
        assert_eq!(user.id_typed(), UserId::new(42));
        assert_eq!(UserDescriptor::from(&user), descriptor);
    }

    #[test]
    fn non_positive_ids_are_rejected() {
        let err = UserDescriptor::new(0).into_user().unwrap_err();
        assert_eq!(err.code(), "validation");
        assert!(UserDescriptor::new(-5).validate().is_err());
    }

    #[test]
    fn record_serializes_edges_in_order() {
        let mut referral = Referral::new(UserId::new(100));
        for to in [200, 300] {
            referral
                .record_edge(
                    EdgeId::new(),
                    User::new(UserId::new(100)),
                    User::new(UserId::new(to)),
                    Utc::now(),
                )
                .unwrap();
        }

        let record = ReferralRecord::from(&referral);
        assert_eq!(record.owner, 100);
        assert_eq!(record.version, 2);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["edges"][0]["to"]["user_id"], 200);
        assert_eq!(json["edges"][1]["to"]["user_id"], 300);
        assert!(json["edges"][0]["created_at"].is_string());
    }
}
