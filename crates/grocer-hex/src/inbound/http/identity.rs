//! Shopper identity taken from headers set by the upstream identity provider.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use grocer_types::domain::identity::{Account, Identity};
use uuid::Uuid;

use crate::errors::AppError;

pub const ACCOUNT_ID_HEADER: &str = "x-account-id";
pub const ACCOUNT_EMAIL_HEADER: &str = "x-account-email";
pub const GUEST_SESSION_HEADER: &str = "x-guest-session";

/// Whatever identity headers the request carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shopper {
    pub member: Option<Account>,
    pub guest_session: Option<Uuid>,
}

impl Shopper {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let account_id = header(headers, ACCOUNT_ID_HEADER)?;
        let email = header(headers, ACCOUNT_EMAIL_HEADER)?;
        let member = match (account_id, email) {
            (Some(id), Some(email)) => Some(Account {
                id: parse_uuid(ACCOUNT_ID_HEADER, &id)?,
                email,
            }),
            (None, None) => None,
            _ => {
                return Err(AppError::BadRequest(format!(
                    "{ACCOUNT_ID_HEADER} and {ACCOUNT_EMAIL_HEADER} must be sent together"
                )))
            }
        };
        let guest_session = header(headers, GUEST_SESSION_HEADER)?
            .map(|s| parse_uuid(GUEST_SESSION_HEADER, &s))
            .transpose()?;
        Ok(Self {
            member,
            guest_session,
        })
    }

    /// The member when signed in, else the guest session.
    pub fn identity(&self) -> Result<Identity, AppError> {
        match (&self.member, self.guest_session) {
            (Some(account), _) => Ok(Identity::Member(account.clone())),
            (None, Some(session)) => Ok(Identity::guest(session)),
            (None, None) => Err(AppError::Unauthorized(format!(
                "send {GUEST_SESSION_HEADER} or the account headers"
            ))),
        }
    }

    pub fn account(&self) -> Result<&Account, AppError> {
        self.member
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized("not authenticated".into()))
    }
}

impl<S> FromRequestParts<S> for Shopper
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Shopper::from_headers(&parts.headers)
    }
}

fn header(headers: &HeaderMap, name: &str) -> Result<Option<String>, AppError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AppError::BadRequest(format!("{name} is not valid text")))?
                .trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
    }
}

fn parse_uuid(name: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|e| AppError::BadRequest(format!("{name}: {e}")))
}
