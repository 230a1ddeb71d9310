//! Credential expiry checks.
//!
//! Consulted before any adapter issues a network call, so an expired token
//! never costs a round trip.

use chrono::{DateTime, Utc};

use crate::accounts::SocialAccount;

/// Returns true when `expires_at` is present and strictly before `now`.
///
/// A missing expiry means the credential does not expire.
pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(expires_at, Some(expiry) if expiry < now)
}

/// Convenience wrapper over [`is_expired`] for an account.
pub fn account_expired(account: &SocialAccount, now: DateTime<Utc>) -> bool {
    is_expired(account.expires_at, now)
}
