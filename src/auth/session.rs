//! # Session Controller
//!
//! Sign-up, sign-in, refresh and logout. Session state lives entirely in the
//! client's cookie pair, so it is derived on demand:
//!
//! ```text
//! Anonymous --sign_in--> Authenticated --(access expires)--> Refreshable
//!     ^                                                          |
//!     +------- logout / refresh invalid <----- refresh ----------+
//!                                           (back to Authenticated)
//! ```

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::cookies::{CookiePolicy, SessionCookies};
use crate::auth::jwt::{TokenError, TokenKind, TokenService};
use crate::auth::models::{SignInRequest, SignUpRequest};
use crate::auth::password::PasswordService;
use crate::auth::store::CredentialStore;
use crate::database::models::{Account, AccountProjection};
use crate::error::{AuthError, AuthResult};

pub const MIN_PASSWORD_LEN: usize = 8;

const REFRESH_FAILED: &str = "could not refresh access token";
const ACCOUNT_GONE: &str = "the user belonging to this token no longer exists";

/// Where a client stands, judged from the tokens it presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// Access token valid.
    Authenticated { account_id: Uuid },
    /// Access token absent or expired, refresh token still valid.
    Refreshable { account_id: Uuid },
}

/// Result of a successful sign-in: Anonymous -> Authenticated.
#[derive(Debug)]
pub struct SignedIn {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AccountProjection,
    pub cookies: SessionCookies,
}

/// Result of a successful refresh: Refreshable -> Authenticated.
#[derive(Debug)]
pub struct Refreshed {
    pub account_id: Uuid,
    pub access_token: String,
    pub cookies: SessionCookies,
}

/// Result of logout: any state -> Anonymous.
#[derive(Debug)]
pub struct LoggedOut {
    pub cookies: SessionCookies,
}

impl SignedIn {
    pub fn state(&self) -> SessionState {
        SessionState::Authenticated { account_id: self.user.id }
    }
}

impl Refreshed {
    pub fn state(&self) -> SessionState {
        SessionState::Authenticated { account_id: self.account_id }
    }
}

impl LoggedOut {
    pub fn state(&self) -> SessionState {
        SessionState::Anonymous
    }
}

#[derive(Clone)]
pub struct SessionController {
    store: Arc<dyn CredentialStore>,
    passwords: PasswordService,
    tokens: Arc<TokenService>,
    cookies: CookiePolicy,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        passwords: PasswordService,
        tokens: Arc<TokenService>,
        cookies: CookiePolicy,
    ) -> Self {
        Self {
            store,
            passwords,
            tokens,
            cookies,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Classify a presented token pair.
    pub fn state(&self, access: Option<&str>, refresh: Option<&str>) -> SessionState {
        if let Some(account_id) = access.and_then(|t| self.tokens.validate(t, TokenKind::Access).ok()) {
            return SessionState::Authenticated { account_id };
        }
        match refresh.and_then(|t| self.tokens.validate(t, TokenKind::Refresh).ok()) {
            Some(account_id) => SessionState::Refreshable { account_id },
            None => SessionState::Anonymous,
        }
    }

    /// Register a new active, standard-role account.
    pub async fn sign_up(&self, payload: SignUpRequest) -> AuthResult<AccountProjection> {
        validate_sign_up(&payload)?;

        let password_hash = self.passwords.hash_blocking(payload.password).await?;
        let account = Account::new(Uuid::new_v4(), &payload.name, &payload.email, password_hash);

        let created = self.store.create_account(account).await?;
        tracing::info!(account_id = %created.id, "account created");
        Ok(created.projection())
    }

    /// Unknown email and wrong password fail identically.
    pub async fn sign_in(&self, payload: SignInRequest) -> AuthResult<SignedIn> {
        if payload.email.trim().is_empty() || payload.password.is_empty() {
            return Err(AuthError::validation("Email and password are required"));
        }

        let Some(account) = self.store.find_active_account_by_email(&payload.email).await? else {
            self.passwords.verify_unknown_blocking(payload.password).await;
            tracing::warn!("sign-in rejected: no usable account for email");
            return Err(AuthError::InvalidCredentials);
        };

        let matched = self
            .passwords
            .verify_blocking(payload.password, account.password_hash.clone())
            .await;
        if !matched {
            tracing::warn!(account_id = %account.id, "sign-in rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let access = self
            .tokens
            .issue(TokenKind::Access, account.id)
            .map_err(AuthError::Signing)?;
        let refresh = self
            .tokens
            .issue(TokenKind::Refresh, account.id)
            .map_err(AuthError::Signing)?;

        let cookies = SessionCookies::new([
            self.cookies.access(&access.token),
            self.cookies.refresh(&refresh.token),
            self.cookies.logged_in(),
        ]);

        tracing::info!(account_id = %account.id, "signed in");
        Ok(SignedIn {
            access_token: access.token,
            refresh_token: refresh.token,
            user: account.projection(),
            cookies,
        })
    }

    /// Mint a new access token from a refresh token. The refresh token is not rotated.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> AuthResult<Refreshed> {
        let Some(refresh_token) = refresh_token.filter(|t| !t.trim().is_empty()) else {
            return Err(AuthError::forbidden(REFRESH_FAILED));
        };

        let account_id = self
            .tokens
            .validate(refresh_token, TokenKind::Refresh)
            .map_err(|e: TokenError| {
                tracing::warn!(reason = ?e, "refresh token rejected");
                AuthError::forbidden(e.to_string())
            })?;

        let account = self
            .store
            .find_account_by_id(account_id)
            .await?
            .filter(|account| account.status.is_usable())
            .ok_or_else(|| AuthError::forbidden(ACCOUNT_GONE))?;

        let access = self
            .tokens
            .issue(TokenKind::Access, account.id)
            .map_err(AuthError::Signing)?;

        Ok(Refreshed {
            account_id: account.id,
            cookies: SessionCookies::new([self.cookies.access(&access.token), self.cookies.logged_in()]),
            access_token: access.token,
        })
    }

    /// Always succeeds. Issued tokens stay valid until they expire.
    pub fn logout(&self) -> LoggedOut {
        LoggedOut {
            cookies: SessionCookies::new(self.cookies.cleared()),
        }
    }

    /// Resolve the account behind a valid access token.
    pub async fn current_account(&self, access_token: &str) -> AuthResult<Account> {
        let account_id = self
            .tokens
            .validate(access_token, TokenKind::Access)
            .map_err(|e| AuthError::Unauthorized(e.to_string()))?;

        self.store
            .find_account_by_id(account_id)
            .await?
            .filter(|account| account.status.is_usable())
            .ok_or_else(|| AuthError::forbidden(ACCOUNT_GONE))
    }
}

fn validate_sign_up(payload: &SignUpRequest) -> AuthResult<()> {
    if payload.name.trim().is_empty() {
        return Err(AuthError::validation("Name is required"));
    }
    let email = payload.email.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !well_formed {
        return Err(AuthError::validation("A valid email is required"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if payload.password != payload.password_confirmation {
        return Err(AuthError::validation("Passwords do not match"));
    }
    Ok(())
}
