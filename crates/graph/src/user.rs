//! Referral participant identity.

use serde::{Deserialize, Serialize};

use referral_core::{Entity, UserId};

/// A user taking part in a referral, as described by the upstream identity provider.
///
/// Immutable once constructed. Referral edges compare users by [`UserId`] only;
/// the display fields are carried along for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    #[serde(default)]
    username: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    is_bot: bool,
}

impl User {
    /// A user with only an identifier; display fields are empty.
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            username: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            language_code: String::new(),
            is_bot: false,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }

    pub fn with_bot(mut self, is_bot: bool) -> Self {
        self.is_bot = is_bot;
        self
    }

    pub fn id_typed(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn is_bot(&self) -> bool {
        self.is_bot
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
