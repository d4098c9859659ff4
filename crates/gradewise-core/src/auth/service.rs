//! Auth gateway
//!
//! Exchanges credentials with the identity provider and pairs the resulting
//! account with its backend profile. Framework-independent and testable
//! through the [`IdentityProvider`] and [`ProfileDirectory`] traits.

use super::directory::ProfileDirectory;
use super::identity::IdentityProvider;
use super::types::{validate_email, AuthError, AuthSession, SignupError, SignupRequest};
use crate::error::{Error, Result};
use crate::models::{CreateUserProfile, UserProfile};
use crate::session::SessionStore;
use crate::storage::KeyValueStore;

/// Login, signup and logout against the identity provider and the backend
pub struct AuthGateway<I: IdentityProvider, P: ProfileDirectory> {
    identity: I,
    profiles: P,
}

impl<I: IdentityProvider, P: ProfileDirectory> AuthGateway<I, P> {
    pub fn new(identity: I, profiles: P) -> Self {
        Self { identity, profiles }
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn profiles(&self) -> &P {
        &self.profiles
    }

    /// Password login followed by a backend profile lookup
    pub async fn login(&self, email: &str, password: &str) -> std::result::Result<AuthSession, AuthError> {
        validate_email(email).map_err(AuthError::Validation)?;
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        let identity = self
            .identity
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(map_sign_in_error)?;

        let token = identity
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let auth_user_id = identity.user.id;

        let user = match self.profiles.find_by_auth_user_id(&token, &auth_user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                log::warn!("[auth] Login succeeded but no profile exists for {}", auth_user_id);
                return Err(AuthError::ProfileNotFound { auth_user_id });
            }
            Err(e) => return Err(AuthError::ProfileLookup(e.to_string())),
        };

        log::info!("[auth] Logged in {} as {}", user.email, user.role);
        Ok(AuthSession {
            token,
            auth_user_id,
            user,
        })
    }

    /// Create the identity account, then its backend profile
    ///
    /// There is no rollback: if profile creation fails the identity account
    /// stays behind and the error says so.
    pub async fn signup(&self, request: SignupRequest) -> std::result::Result<AuthSession, SignupError> {
        request.validate()?;
        let email = request.email.trim().to_string();

        let metadata = serde_json::json!({
            "full_name": request.full_name.trim(),
            "role": request.role,
        });
        let identity = self
            .identity
            .sign_up(&email, &request.password, &metadata)
            .await
            .map_err(|e| SignupError::Identity(identity_message(&e)))?;
        let auth_user_id = identity.user.id.clone();

        // Providers that require email confirmation return no token on signup
        let token = match identity.access_token.filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => self.sign_in_after_signup(&email, &request.password, &auth_user_id).await?,
        };

        let profile = CreateUserProfile {
            auth_user_id: auth_user_id.clone(),
            full_name: request.full_name.trim().to_string(),
            email,
            role: request.role,
            metadata: None,
        };
        let user = self
            .profiles
            .create_profile(&token, &profile)
            .await
            .map_err(|e| {
                log::warn!(
                    "[auth] Identity account {} created but profile creation failed: {}",
                    auth_user_id,
                    e
                );
                SignupError::ProfileCreation {
                    auth_user_id: auth_user_id.clone(),
                    message: e.to_string(),
                }
            })?;

        log::info!("[auth] Signed up {} as {}", user.email, user.role);
        Ok(AuthSession {
            token,
            auth_user_id,
            user,
        })
    }

    /// Password grant for a fresh account that came back without a token
    ///
    /// A refused grant (or a grant with no token) means the account awaits
    /// email confirmation. Any other failure is reported as it is.
    async fn sign_in_after_signup(
        &self,
        email: &str,
        password: &str,
        auth_user_id: &str,
    ) -> std::result::Result<String, SignupError> {
        let awaiting_confirmation = || SignupError::ProfileCreation {
            auth_user_id: auth_user_id.to_string(),
            message: "confirm your email address, then log in".to_string(),
        };

        match self.identity.sign_in_with_password(email, password).await {
            Ok(session) => session
                .access_token
                .filter(|t| !t.is_empty())
                .ok_or_else(awaiting_confirmation),
            Err(Error::Identity {
                status: Some(400..=499),
                ..
            }) => Err(awaiting_confirmation()),
            Err(e) => {
                log::warn!(
                    "[auth] Identity account {} created but sign-in failed: {}",
                    auth_user_id,
                    e
                );
                Err(SignupError::ProfileCreation {
                    auth_user_id: auth_user_id.to_string(),
                    message: format!("could not sign in to the new account: {}", identity_message(&e)),
                })
            }
        }
    }

    /// Best-effort sign-out; the local session is cleared whatever the network says
    pub async fn logout<S: KeyValueStore>(&self, session: &mut SessionStore<S>) -> Result<()> {
        if let Some(token) = session.token().map(str::to_string) {
            if let Err(e) = self.identity.sign_out(&token).await {
                log::warn!("[auth] Remote sign-out failed, clearing local session anyway: {}", e);
            }
        }
        session.clear_session()?;
        log::info!("[auth] Logged out");
        Ok(())
    }

    /// [`login`](Self::login) and store the result
    pub async fn login_into<'s, S: KeyValueStore>(
        &self,
        session: &'s mut SessionStore<S>,
        email: &str,
        password: &str,
    ) -> Result<&'s UserProfile> {
        let auth = self.login(email, password).await?;
        session.set_session(auth.token, auth.auth_user_id, auth.user)?;
        session.require_user()
    }

    /// [`signup`](Self::signup) and store the result
    pub async fn signup_into<'s, S: KeyValueStore>(
        &self,
        session: &'s mut SessionStore<S>,
        request: SignupRequest,
    ) -> Result<&'s UserProfile> {
        let auth = self.signup(request).await?;
        session.set_session(auth.token, auth.auth_user_id, auth.user)?;
        session.require_user()
    }

    /// Confirm the stored token is still accepted and reload the profile
    ///
    /// A token the identity provider rejects ends the local session.
    pub async fn refresh_profile<S: KeyValueStore>(
        &self,
        session: &mut SessionStore<S>,
    ) -> Result<UserProfile> {
        let token = session.token().ok_or(Error::NotAuthenticated)?.to_string();

        let identity_user = match self.identity.get_user(&token).await {
            Ok(user) => user,
            Err(Error::Identity {
                status: Some(401 | 403),
                ..
            }) => {
                log::info!("[auth] Stored token rejected, clearing session");
                session.clear_session()?;
                return Err(Error::NotAuthenticated);
            }
            Err(e) => return Err(e),
        };

        let user = self
            .profiles
            .find_by_auth_user_id(&token, &identity_user.id)
            .await?
            .ok_or_else(|| {
                Error::from(AuthError::ProfileNotFound {
                    auth_user_id: identity_user.id.clone(),
                })
            })?;

        session.set_user(user.clone())?;
        Ok(user)
    }
}

/// Identity 4xx on a password grant means the credentials were refused
fn map_sign_in_error(err: Error) -> AuthError {
    match err {
        Error::Identity {
            status: Some(400 | 401 | 403 | 422),
            message,
        } => AuthError::InvalidCredentials(message),
        other => AuthError::Identity(identity_message(&other)),
    }
}

fn identity_message(err: &Error) -> String {
    match err {
        Error::Identity { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
