use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated account as asserted by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
}

/// Who a cart belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    Guest { session: Uuid },
    Member(Account),
}

/// Hashable key for an identity; a member is keyed by account id only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Guest(Uuid),
    Member(Uuid),
}

impl Identity {
    pub fn guest(session: Uuid) -> Self {
        Identity::Guest { session }
    }

    pub fn member(id: Uuid, email: impl Into<String>) -> Self {
        Identity::Member(Account {
            id,
            email: email.into(),
        })
    }

    pub fn account(&self) -> Option<&Account> {
        match self {
            Identity::Member(account) => Some(account),
            Identity::Guest { .. } => None,
        }
    }

    pub fn key(&self) -> IdentityKey {
        match self {
            Identity::Guest { session } => IdentityKey::Guest(*session),
            Identity::Member(account) => IdentityKey::Member(account.id),
        }
    }
}
