use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::datasource::{StoreError, TokenRepository};
use crate::models::{OneTimeToken, TokenPurpose};

pub const TOKEN_TTL_MINUTES: i64 = 15;
const ISSUE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token has expired")]
    Expired,
    #[error("Email does not match token")]
    EmailMismatch,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A random six digit code, zero padded.
pub fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{value:06}")
}

/// Issues a fresh code for `email`, replacing any outstanding code for the same purpose.
#[instrument(skip(store))]
pub async fn issue<S>(
    store: &S,
    purpose: TokenPurpose,
    email: &str,
    now: DateTime<Utc>,
) -> Result<OneTimeToken, StoreError>
where
    S: TokenRepository + ?Sized,
{
    let mut attempt = 1;
    loop {
        let token = OneTimeToken {
            id: Uuid::new_v4(),
            purpose,
            email: email.to_owned(),
            code: generate_code(),
            expires_at: now + Duration::minutes(TOKEN_TTL_MINUTES),
        };
        match store.replace_token(&token).await {
            Ok(()) => return Ok(token),
            // another email holds the same code for this purpose
            Err(StoreError::Conflict) if attempt < ISSUE_ATTEMPTS => {
                debug!("code collision, drawing a new one");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Consumes a code and returns the email it was issued to.
///
/// Expiry is checked before the email, a stale code reports
/// [`TokenError::Expired`] even when the email is wrong as well.
#[instrument(skip(store, code))]
pub async fn validate<S>(
    store: &S,
    purpose: TokenPurpose,
    code: &str,
    email: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, TokenError>
where
    S: TokenRepository + ?Sized,
{
    let token = store
        .token_by_code(purpose, code.trim())
        .await?
        .ok_or(TokenError::InvalidToken)?;
    if token.expires_at <= now {
        return Err(TokenError::Expired);
    }
    if let Some(email) = email {
        if !token.email.eq_ignore_ascii_case(email.trim()) {
            return Err(TokenError::EmailMismatch);
        }
    }
    store.delete_token(token.id).await?;
    Ok(token.email)
}

#[instrument(skip(store))]
pub async fn sweep_expired<S>(store: &S, now: DateTime<Utc>) -> Result<u64, StoreError>
where
    S: TokenRepository + ?Sized,
{
    let removed = store.delete_expired_tokens(now).await?;
    debug!("removed {removed} expired tokens");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryStore;

    #[test]
    fn test_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_issue_replaces_previous_code() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = issue(&store, TokenPurpose::Verification, "a@example.com", now)
            .await
            .unwrap();
        let second = issue(&store, TokenPurpose::Verification, "a@example.com", now)
            .await
            .unwrap();
        assert_eq!(second.expires_at, now + Duration::minutes(15));
        if first.code != second.code {
            let stale =
                validate(&store, TokenPurpose::Verification, &first.code, None, now).await;
            assert!(matches!(stale, Err(TokenError::InvalidToken)));
        }
        let email = validate(&store, TokenPurpose::Verification, &second.code, None, now)
            .await
            .unwrap();
        assert_eq!(email, "a@example.com");
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let token = issue(&store, TokenPurpose::PasswordReset, "a@example.com", now)
            .await
            .unwrap();
        validate(&store, TokenPurpose::PasswordReset, &token.code, None, now)
            .await
            .unwrap();
        let again = validate(&store, TokenPurpose::PasswordReset, &token.code, None, now).await;
        assert!(matches!(again, Err(TokenError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_expiry_is_checked_before_email() {
        let store = MemoryStore::new();
        let issued = Utc::now();
        let token = issue(&store, TokenPurpose::Verification, "a@example.com", issued)
            .await
            .unwrap();
        let later = issued + Duration::minutes(16);
        let result = validate(
            &store,
            TokenPurpose::Verification,
            &token.code,
            Some("b@example.com"),
            later,
        )
        .await;
        assert_eq!(result.unwrap_err().to_string(), "Token has expired");
    }

    #[tokio::test]
    async fn test_expires_exactly_at_deadline() {
        let store = MemoryStore::new();
        let issued = Utc::now();
        let token = issue(&store, TokenPurpose::TwoFactor, "a@example.com", issued)
            .await
            .unwrap();
        let result = validate(
            &store,
            TokenPurpose::TwoFactor,
            &token.code,
            None,
            token.expires_at,
        )
        .await;
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[tokio::test]
    async fn test_email_mismatch() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let token = issue(&store, TokenPurpose::Verification, "a@example.com", now)
            .await
            .unwrap();
        let result = validate(
            &store,
            TokenPurpose::Verification,
            &token.code,
            Some("b@example.com"),
            now,
        )
        .await;
        assert!(matches!(result, Err(TokenError::EmailMismatch)));
        // a mismatch does not burn the code
        let ok = validate(
            &store,
            TokenPurpose::Verification,
            &token.code,
            Some("A@example.com"),
            now,
        )
        .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_purposes_are_separate() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let token = issue(&store, TokenPurpose::Verification, "a@example.com", now)
            .await
            .unwrap();
        let result = validate(&store, TokenPurpose::PasswordReset, &token.code, None, now).await;
        assert!(matches!(result, Err(TokenError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old = issue(
            &store,
            TokenPurpose::Verification,
            "old@example.com",
            now - Duration::hours(1),
        )
        .await
        .unwrap();
        let fresh = issue(&store, TokenPurpose::Verification, "new@example.com", now)
            .await
            .unwrap();
        assert_eq!(sweep_expired(&store, now).await.unwrap(), 1);
        assert!(store
            .token_by_code(TokenPurpose::Verification, &old.code)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .token_by_code(TokenPurpose::Verification, &fresh.code)
            .await
            .unwrap()
            .is_some());
    }
}
