use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::datasource::{StoreError, TokenRepository, UserRepository};
use crate::errors::Error;
use crate::mailer::{Email, Mailer};
use crate::models::{Role, TokenPurpose, User};
use crate::retry::{with_backoff, Backoff};
use crate::services::tokens;
use crate::session::{Session, SessionKeys};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmailInput {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyEmailInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TwoFactorCodeInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordInput {
    #[validate(length(equal = 6))]
    pub code: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LoginOutcome {
    Session { token: String, user: User },
    TwoFactorRequired { two_factor: bool },
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> Error {
    Error::Unauthorized("Invalid credentials".to_owned())
}

pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

async fn deliver(mailer: &dyn Mailer, email: Email) -> Result<(), Error> {
    let email = &email;
    with_backoff(Backoff::default(), move || mailer.send(email)).await?;
    Ok(())
}

async fn send_code<S>(
    store: &S,
    mailer: &dyn Mailer,
    purpose: TokenPurpose,
    email: &str,
    now: DateTime<Utc>,
) -> Result<(), Error>
where
    S: TokenRepository + ?Sized,
{
    let token = tokens::issue(store, purpose, email, now).await?;
    let message = match purpose {
        TokenPurpose::Verification => Email::verification(email, &token.code),
        TokenPurpose::PasswordReset => Email::password_reset(email, &token.code),
        TokenPurpose::TwoFactor => Email::two_factor(email, &token.code),
    };
    deliver(mailer, message).await
}

#[instrument(skip_all, fields(email = %input.email))]
pub async fn register<S>(
    store: &S,
    mailer: &dyn Mailer,
    input: RegisterInput,
    now: DateTime<Utc>,
) -> Result<User, Error>
where
    S: UserRepository + TokenRepository + ?Sized,
{
    input.validate()?;
    let email = normalize_email(&input.email);
    if store.user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict("Email already in use".to_owned()));
    }
    let user = User {
        id: Uuid::new_v4(),
        email,
        name: input.name.trim().to_owned(),
        password_hash: hash_password(&input.password)?,
        role: Role::User,
        email_verified_at: None,
        two_factor_enabled: false,
        created_at: now,
    };
    let user = match store.insert_user(&user).await {
        Ok(user) => user,
        Err(StoreError::Conflict) => {
            return Err(Error::Conflict("Email already in use".to_owned()));
        }
        Err(err) => return Err(err.into()),
    };
    send_code(store, mailer, TokenPurpose::Verification, &user.email, now).await?;
    info!(id = %user.id, "registered user");
    Ok(user)
}

/// Password check, then the email verification gate, then the two-factor gate.
///
/// A two-factor account only gets a session when a confirmation written by
/// [`confirm_two_factor`] is waiting; the login consumes it.
#[instrument(skip_all, fields(email = %input.email))]
pub async fn login<S>(
    store: &S,
    mailer: &dyn Mailer,
    keys: &SessionKeys,
    input: LoginInput,
    now: DateTime<Utc>,
) -> Result<LoginOutcome, Error>
where
    S: UserRepository + TokenRepository + ?Sized,
{
    input.validate()?;
    let email = normalize_email(&input.email);
    let user = store
        .user_by_email(&email)
        .await?
        .ok_or_else(invalid_credentials)?;
    if !verify_password(&input.password, &user.password_hash) {
        return Err(invalid_credentials());
    }
    if user.email_verified_at.is_none() {
        send_code(store, mailer, TokenPurpose::Verification, &user.email, now).await?;
        return Err(Error::Unauthorized(
            "Email not verified, confirmation email sent".to_owned(),
        ));
    }
    if user.two_factor_enabled && !store.take_two_factor_confirmation(user.id).await? {
        send_code(store, mailer, TokenPurpose::TwoFactor, &user.email, now).await?;
        debug!("two-factor code sent");
        return Ok(LoginOutcome::TwoFactorRequired { two_factor: true });
    }
    let token = keys
        .issue(&user, now)
        .map_err(|err| anyhow!("failed to sign session: {err}"))?;
    info!(id = %user.id, "user logged in");
    Ok(LoginOutcome::Session { token, user })
}

/// Validates an emailed two-factor code and records the confirmation the
/// next login consumes.
#[instrument(skip_all, fields(email = %input.email))]
pub async fn confirm_two_factor<S>(
    store: &S,
    input: TwoFactorCodeInput,
    now: DateTime<Utc>,
) -> Result<(), Error>
where
    S: UserRepository + TokenRepository + ?Sized,
{
    input.validate()?;
    let email = normalize_email(&input.email);
    let email =
        tokens::validate(store, TokenPurpose::TwoFactor, &input.code, Some(&email), now).await?;
    let user = store
        .user_by_email(&email)
        .await?
        .ok_or_else(|| Error::not_found("User"))?;
    store.upsert_two_factor_confirmation(user.id, now).await?;
    info!(id = %user.id, "two-factor code confirmed");
    Ok(())
}

/// Silent for unknown or already verified addresses.
#[instrument(skip_all, fields(email = %input.email))]
pub async fn request_verification<S>(
    store: &S,
    mailer: &dyn Mailer,
    input: EmailInput,
    now: DateTime<Utc>,
) -> Result<(), Error>
where
    S: UserRepository + TokenRepository + ?Sized,
{
    input.validate()?;
    let email = normalize_email(&input.email);
    match store.user_by_email(&email).await? {
        Some(user) if user.email_verified_at.is_none() => {
            send_code(store, mailer, TokenPurpose::Verification, &user.email, now).await
        }
        _ => Ok(()),
    }
}

#[instrument(skip_all, fields(email = %input.email))]
pub async fn verify_email<S>(store: &S, input: VerifyEmailInput, now: DateTime<Utc>) -> Result<(), Error>
where
    S: UserRepository + TokenRepository + ?Sized,
{
    input.validate()?;
    let email = normalize_email(&input.email);
    let email = tokens::validate(store, TokenPurpose::Verification, &input.code, Some(&email), now)
        .await?;
    if !store.mark_email_verified(&email, now).await? {
        return Err(Error::not_found("User"));
    }
    info!("email verified");
    Ok(())
}

/// Silent for unknown addresses.
#[instrument(skip_all, fields(email = %input.email))]
pub async fn request_password_reset<S>(
    store: &S,
    mailer: &dyn Mailer,
    input: EmailInput,
    now: DateTime<Utc>,
) -> Result<(), Error>
where
    S: UserRepository + TokenRepository + ?Sized,
{
    input.validate()?;
    let email = normalize_email(&input.email);
    match store.user_by_email(&email).await? {
        Some(user) => {
            send_code(store, mailer, TokenPurpose::PasswordReset, &user.email, now).await
        }
        None => Ok(()),
    }
}

#[instrument(skip_all)]
pub async fn reset_password<S>(
    store: &S,
    input: ResetPasswordInput,
    now: DateTime<Utc>,
) -> Result<(), Error>
where
    S: UserRepository + TokenRepository + ?Sized,
{
    input.validate()?;
    let email = tokens::validate(store, TokenPurpose::PasswordReset, &input.code, None, now).await?;
    let hash = hash_password(&input.password)?;
    if !store.update_password_hash(&email, &hash).await? {
        return Err(Error::not_found("User"));
    }
    info!("password reset");
    Ok(())
}

#[instrument(skip(store), fields(user = %session.user_id))]
pub async fn set_two_factor<S>(store: &S, session: &Session, enabled: bool) -> Result<User, Error>
where
    S: UserRepository + ?Sized,
{
    if !store.set_two_factor(session.user_id, enabled).await? {
        return Err(Error::not_found("User"));
    }
    store
        .user_by_id(session.user_id)
        .await?
        .ok_or_else(|| Error::not_found("User"))
}
