//! Authentication service
//!
//! Password accounts, session tokens, Telegram widget login and linking,
//! and single-use tokens shared with the Telegram bot.

use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    AuthResponse, BotLinkRequest, BotLoginTokenResponse, LinkCodeResponse, LoginRequest,
    OneTimeToken, RegisterRequest, SetPasswordRequest, TokenPurpose, User, UserResponse,
    UserRole, WidgetAuthData,
};
use crate::store::{collections, DocumentStore, Filter, StoreError, Update};

use super::crypto::{random_code, random_token, verify_payload_signature, verify_widget_signature};
use super::jwt::{generate_token, verify_token, JwtError};
use super::password::{hash_password, verify_password};

/// Widget payloads older than this are refused
const WIDGET_MAX_AGE_SECONDS: i64 = 86_400;

const LINK_CODE_LENGTH: usize = 8;
const TOKEN_INSERT_ATTEMPTS: usize = 3;

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Invalid session")]
    InvalidSession,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Role cannot be self-assigned")]
    RoleNotAllowed,

    #[error("User not found")]
    UserNotFound,

    #[error("Telegram authentication is not configured")]
    TelegramNotConfigured,

    #[error("Invalid Telegram signature")]
    InvalidSignature,

    #[error("Telegram authentication data is too old")]
    WidgetAuthExpired,

    #[error("This Telegram account is already linked to another user")]
    TelegramAlreadyLinked,

    #[error("No Telegram account linked")]
    TelegramNotLinked,

    #[error("Cannot unlink: no password set. Set a password first.")]
    PasswordRequired,

    #[error("Invalid or already used token")]
    OneTimeTokenNotFound,

    #[error("Token expired")]
    OneTimeTokenExpired,
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::TokenExpired => AuthError::SessionExpired,
            JwtError::InvalidToken(_) => AuthError::InvalidSession,
            JwtError::EncodingFailed(reason) => AuthError::Token(reason),
        }
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AuthError::Hashing(e.to_string())
    }
}

/// Secrets and lifetimes the service runs with
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub telegram_bot_token: Option<String>,
    pub bot_token_ttl: Duration,
    pub link_code_ttl: Duration,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            jwt_algorithm: Algorithm::from_str(&config.jwt_algorithm).unwrap_or(Algorithm::HS256),
            telegram_bot_token: config.telegram_bot_token.clone(),
            bot_token_ttl: Duration::seconds(config.bot_token_ttl_seconds),
            link_code_ttl: Duration::seconds(config.link_code_ttl_seconds),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn DocumentStore>,
    settings: AuthSettings,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(store: Arc<dyn DocumentStore>, settings: AuthSettings) -> Self {
        Self { store, settings }
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn issue_session_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        Ok(generate_token(
            user_id,
            &self.settings.jwt_secret,
            self.settings.jwt_algorithm,
        )?)
    }

    pub fn verify_session_token(&self, token: &str) -> Result<Uuid, AuthError> {
        Ok(verify_token(
            token,
            &self.settings.jwt_secret,
            self.settings.jwt_algorithm,
        )?)
    }

    /// Resolve a bearer token to the current user record
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let user_id = self.verify_session_token(token)?;
        self.find_user(user_id)
            .await?
            .ok_or(AuthError::InvalidSession)
    }

    fn session_for(&self, user: User) -> Result<AuthResponse, AuthError> {
        let token = self.issue_session_token(user.id)?;
        Ok(AuthResponse::bearer(token, UserResponse::from(user)))
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self
            .store
            .find_record(collections::USERS, &Filter::by_id(user_id))
            .await?)
    }

    async fn find_user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>, AuthError> {
        Ok(self
            .store
            .find_record(
                collections::USERS,
                &Filter::new().eq("telegram_id", telegram_id),
            )
            .await?)
    }

    // ------------------------------------------------------------------
    // Password accounts
    // ------------------------------------------------------------------

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let role = request.role.unwrap_or(UserRole::Buyer);
        if role == UserRole::Admin {
            return Err(AuthError::RoleNotAllowed);
        }

        let email = request.email.trim().to_lowercase();
        let existing: Option<User> = self
            .store
            .find_record(collections::USERS, &Filter::new().eq("email", &email))
            .await?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4(),
            email: Some(email),
            password_hash: Some(hash_password(&request.password)?),
            full_name: request.full_name.trim().to_string(),
            role,
            avatar: None,
            balance: 0.0,
            telegram_id: None,
            telegram_username: None,
            created_at: Utc::now(),
        };

        match self.store.insert_record(collections::USERS, &user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
        self.session_for(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();
        let user: User = self
            .store
            .find_record(collections::USERS, &Filter::new().eq("email", email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let verified = user
            .password_hash
            .as_deref()
            .map(|hash| verify_password(&request.password, hash))
            .unwrap_or(false);
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        self.session_for(user)
    }

    /// Set a password, or change it when one exists
    pub async fn set_password(
        &self,
        user: &User,
        request: SetPasswordRequest,
    ) -> Result<User, AuthError> {
        if let Some(hash) = &user.password_hash {
            let current = request.current_password.as_deref().unwrap_or_default();
            if !verify_password(current, hash) {
                return Err(AuthError::WrongPassword);
            }
        }

        let hashed = hash_password(&request.new_password)?;
        self.store
            .find_record_and_update(
                collections::USERS,
                &Filter::by_id(user.id),
                &Update::new().set("password_hash", hashed),
            )
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // ------------------------------------------------------------------
    // Telegram widget
    // ------------------------------------------------------------------

    fn bot_token(&self) -> Result<&str, AuthError> {
        self.settings
            .telegram_bot_token
            .as_deref()
            .ok_or(AuthError::TelegramNotConfigured)
    }

    fn verify_widget(&self, data: &WidgetAuthData) -> Result<(), AuthError> {
        let bot_token = self.bot_token()?;

        let mut fields = data.signed_fields();
        fields.insert("hash".to_string(), data.hash.clone());
        if !verify_widget_signature(&fields, bot_token) {
            return Err(AuthError::InvalidSignature);
        }

        if Utc::now().timestamp() - data.auth_date > WIDGET_MAX_AGE_SECONDS {
            return Err(AuthError::WidgetAuthExpired);
        }

        Ok(())
    }

    /// Log in with the widget, creating a password-less account on first use
    pub async fn telegram_login(&self, data: WidgetAuthData) -> Result<AuthResponse, AuthError> {
        self.verify_widget(&data)?;

        if let Some(user) = self.find_user_by_telegram_id(data.id).await? {
            let user = self.refresh_telegram_username(user, data.username.clone()).await?;
            return self.session_for(user);
        }

        let mut user = User {
            id: Uuid::new_v4(),
            email: Some(format!("tg_{}@telegram.user", data.id)),
            password_hash: None,
            full_name: data.display_name(),
            role: UserRole::Buyer,
            avatar: data.photo_url.clone(),
            balance: 0.0,
            telegram_id: Some(data.id),
            telegram_username: data.username.clone(),
            created_at: Utc::now(),
        };

        match self.store.insert_record(collections::USERS, &user).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                // A concurrent first login created the account
                if let Some(existing) = self.find_user_by_telegram_id(data.id).await? {
                    return self.session_for(existing);
                }
                // The placeholder email belongs to an account that has since unlinked this id
                user.email = Some(format!(
                    "tg_{}_{}@telegram.user",
                    data.id,
                    &user.id.simple().to_string()[..8]
                ));
                match self.store.insert_record(collections::USERS, &user).await {
                    Ok(()) => {}
                    Err(StoreError::Duplicate(_)) => {
                        let existing = self
                            .find_user_by_telegram_id(data.id)
                            .await?
                            .ok_or(AuthError::UserNotFound)?;
                        return self.session_for(existing);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %user.id, telegram_id = data.id, "User created via Telegram");
        self.session_for(user)
    }

    async fn refresh_telegram_username(
        &self,
        user: User,
        username: Option<String>,
    ) -> Result<User, AuthError> {
        if username.is_none() || user.telegram_username == username {
            return Ok(user);
        }

        let updated = self
            .store
            .find_record_and_update(
                collections::USERS,
                &Filter::by_id(user.id),
                &Update::new().set("telegram_username", &username),
            )
            .await?;
        Ok(updated.unwrap_or(user))
    }

    /// Bind a Telegram identity to an existing account
    pub async fn link_telegram(
        &self,
        user: &User,
        data: WidgetAuthData,
    ) -> Result<User, AuthError> {
        self.verify_widget(&data)?;
        self.bind_telegram(user.id, data.id, data.username).await
    }

    async fn bind_telegram(
        &self,
        user_id: Uuid,
        telegram_id: i64,
        username: Option<String>,
    ) -> Result<User, AuthError> {
        if let Some(owner) = self.find_user_by_telegram_id(telegram_id).await? {
            if owner.id != user_id {
                return Err(AuthError::TelegramAlreadyLinked);
            }
        }

        let mut update = Update::new().set("telegram_id", telegram_id);
        update = match username {
            Some(username) => update.set("telegram_username", username),
            None => update.unset("telegram_username"),
        };

        match self
            .store
            .find_record_and_update(collections::USERS, &Filter::by_id(user_id), &update)
            .await
        {
            Ok(Some(user)) => {
                tracing::info!(user_id = %user_id, telegram_id, "Telegram account linked");
                Ok(user)
            }
            Ok(None) => Err(AuthError::UserNotFound),
            Err(StoreError::Duplicate(_)) => Err(AuthError::TelegramAlreadyLinked),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the Telegram binding. The account must keep a password login.
    pub async fn unlink_telegram(&self, user: &User) -> Result<User, AuthError> {
        let filter = Filter::by_id(user.id)
            .ne("telegram_id", Value::Null)
            .ne("password_hash", Value::Null);
        let update = Update::new().unset("telegram_id").unset("telegram_username");

        if let Some(updated) = self
            .store
            .find_record_and_update(collections::USERS, &filter, &update)
            .await?
        {
            tracing::info!(user_id = %user.id, "Telegram account unlinked");
            return Ok(updated);
        }

        let current = self.find_user(user.id).await?.ok_or(AuthError::UserNotFound)?;
        if current.telegram_id.is_none() {
            Err(AuthError::TelegramNotLinked)
        } else {
            Err(AuthError::PasswordRequired)
        }
    }

    // ------------------------------------------------------------------
    // One-time tokens
    // ------------------------------------------------------------------

    pub async fn issue_one_time_token(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<OneTimeToken, AuthError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();
            let token = OneTimeToken {
                id: Uuid::new_v4(),
                token: match purpose {
                    TokenPurpose::BotLogin => random_token(),
                    TokenPurpose::TelegramLink => random_code(LINK_CODE_LENGTH),
                },
                user_id,
                purpose,
                created_at: now,
                expires_at: now + ttl,
                used: false,
                used_at: None,
            };

            match self.store.insert_record(collections::TOKENS, &token).await {
                Ok(()) => return Ok(token),
                Err(StoreError::Duplicate(_)) if attempt < TOKEN_INSERT_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Mark the token used and return its owner. At most one caller ever succeeds.
    pub async fn redeem_one_time_token(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<Uuid, AuthError> {
        let now = Utc::now();
        let redeemed: OneTimeToken = self
            .store
            .find_record_and_update(
                collections::TOKENS,
                &Filter::new()
                    .eq("token", token)
                    .eq("purpose", purpose)
                    .eq("used", false),
                &Update::new().set("used", true).set("used_at", now),
            )
            .await?
            .ok_or(AuthError::OneTimeTokenNotFound)?;

        if redeemed.expires_at < now {
            return Err(AuthError::OneTimeTokenExpired);
        }

        Ok(redeemed.user_id)
    }

    /// Exchange a bot-issued token for a session
    pub async fn login_with_bot_token(&self, token: &str) -> Result<AuthResponse, AuthError> {
        let user_id = self
            .redeem_one_time_token(token, TokenPurpose::BotLogin)
            .await?;
        let user = self.find_user(user_id).await?.ok_or(AuthError::UserNotFound)?;
        self.session_for(user)
    }

    /// Bot side: issue a login token for the account bound to `telegram_id`
    pub async fn issue_bot_login_token(
        &self,
        telegram_id: i64,
    ) -> Result<BotLoginTokenResponse, AuthError> {
        let user = self
            .find_user_by_telegram_id(telegram_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let token = self
            .issue_one_time_token(user.id, TokenPurpose::BotLogin, self.settings.bot_token_ttl)
            .await?;

        Ok(BotLoginTokenResponse {
            token: token.token,
            expires_at: token.expires_at,
        })
    }

    /// Web side: issue a code the user sends to the bot to link their account
    pub async fn create_link_code(&self, user: &User) -> Result<LinkCodeResponse, AuthError> {
        let token = self
            .issue_one_time_token(
                user.id,
                TokenPurpose::TelegramLink,
                self.settings.link_code_ttl,
            )
            .await?;

        Ok(LinkCodeResponse {
            code: token.token,
            expires_at: token.expires_at,
        })
    }

    /// Bot side: redeem a link code for the Telegram user who sent it
    pub async fn redeem_link_code(&self, request: BotLinkRequest) -> Result<User, AuthError> {
        let code = request.code.trim().to_uppercase();
        let user_id = self
            .redeem_one_time_token(&code, TokenPurpose::TelegramLink)
            .await?;
        self.bind_telegram(user_id, request.telegram_id, request.username)
            .await
    }

    /// Check the `X-Bot-Signature` of a bot request body
    pub fn verify_bot_request(&self, body: &[u8], signature: Option<&str>) -> Result<(), AuthError> {
        let bot_token = self.bot_token()?;
        match signature {
            Some(signature) if verify_payload_signature(body, signature, bot_token) => Ok(()),
            _ => Err(AuthError::InvalidSignature),
        }
    }
}
