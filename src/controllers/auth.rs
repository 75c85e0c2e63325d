use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::controllers::{created, data, message, ApiResult, Created, Message};
use crate::models::User;
use crate::services::accounts::{
    self, EmailInput, LoginInput, LoginOutcome, RegisterInput, ResetPasswordInput,
    TwoFactorCodeInput, VerifyEmailInput,
};
use crate::session::{Session, SessionKeys};
use crate::state::{SharedMailer, SharedStore};

pub async fn register(
    State(store): State<SharedStore>,
    State(mailer): State<SharedMailer>,
    Json(input): Json<RegisterInput>,
) -> Created<User> {
    let user = accounts::register(&*store, &*mailer, input, Utc::now()).await?;
    Ok(created(user))
}

pub async fn login(
    State(store): State<SharedStore>,
    State(mailer): State<SharedMailer>,
    State(keys): State<SessionKeys>,
    Json(input): Json<LoginInput>,
) -> ApiResult<LoginOutcome> {
    let outcome = accounts::login(&*store, &*mailer, &keys, input, Utc::now()).await?;
    Ok(data(outcome))
}

pub async fn request_verification(
    State(store): State<SharedStore>,
    State(mailer): State<SharedMailer>,
    Json(input): Json<EmailInput>,
) -> ApiResult<Message> {
    accounts::request_verification(&*store, &*mailer, input, Utc::now()).await?;
    Ok(message("If the account exists a confirmation email was sent"))
}

pub async fn verify_email(
    State(store): State<SharedStore>,
    Json(input): Json<VerifyEmailInput>,
) -> ApiResult<Message> {
    accounts::verify_email(&*store, input, Utc::now()).await?;
    Ok(message("Email verified"))
}

pub async fn confirm_two_factor(
    State(store): State<SharedStore>,
    Json(input): Json<TwoFactorCodeInput>,
) -> ApiResult<Message> {
    accounts::confirm_two_factor(&*store, input, Utc::now()).await?;
    Ok(message("Two-factor code confirmed"))
}

pub async fn request_password_reset(
    State(store): State<SharedStore>,
    State(mailer): State<SharedMailer>,
    Json(input): Json<EmailInput>,
) -> ApiResult<Message> {
    accounts::request_password_reset(&*store, &*mailer, input, Utc::now()).await?;
    Ok(message("If the account exists a reset email was sent"))
}

pub async fn reset_password(
    State(store): State<SharedStore>,
    Json(input): Json<ResetPasswordInput>,
) -> ApiResult<Message> {
    accounts::reset_password(&*store, input, Utc::now()).await?;
    Ok(message("Password updated"))
}

#[derive(Debug, Deserialize)]
pub struct TwoFactorToggle {
    pub enabled: bool,
}

pub async fn set_two_factor(
    session: Session,
    State(store): State<SharedStore>,
    Json(input): Json<TwoFactorToggle>,
) -> ApiResult<User> {
    let user = accounts::set_two_factor(&*store, &session, input.enabled).await?;
    Ok(data(user))
}
