use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::identity::Account;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Blank profile carrying only the account id and email.
    pub fn provisioned(account: &Account) -> Self {
        let now = Utc::now();
        Self {
            id: account.id,
            email: account.email.clone(),
            full_name: String::new(),
            phone: String::new(),
            address: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The fields a member can edit on their account page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl ProfileUpdate {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.full_name.trim().is_empty() {
            anyhow::bail!("full name is required");
        }
        Ok(())
    }

    /// Writes the trimmed fields into `profile` and bumps `updated_at`.
    pub fn apply(&self, profile: &mut Profile) {
        profile.full_name = self.full_name.trim().to_string();
        profile.phone = self.phone.trim().to_string();
        profile.address = self.address.trim().to_string();
        profile.updated_at = Utc::now();
    }
}
