//! Session store
//!
//! Holds the authenticated user and bearer token for the lifetime of the
//! front end, mirrored into a [`KeyValueStore`] so it survives restarts.
//!
//! The store is an explicit object owned by whatever composes the front end;
//! there is no process-wide session.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Role, UserProfile};
use crate::storage::KeyValueStore;

/// Storage key of the opaque bearer token
pub const TOKEN_KEY: &str = "gradewise.auth.token";
/// Storage key of the JSON-serialized user profile
pub const USER_KEY: &str = "gradewise.auth.user";

/// Snapshot of the current authentication state
///
/// Authenticated iff a non-empty token and a user profile are both present;
/// the flag is derived so it can never disagree with the fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    token: Option<String>,
    auth_user_id: Option<String>,
    user: Option<UserProfile>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty()) && self.user.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn auth_user_id(&self) -> Option<&str> {
        self.auth_user_id.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}

/// Session state plus its durable mirror
pub struct SessionStore<S: KeyValueStore> {
    storage: S,
    session: Session,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Create an empty session; call [`restore_session`](Self::restore_session) to load persisted state
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.session.user()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persist and activate a session after login or signup
    ///
    /// The token format is not checked, but an empty token is refused.
    /// If persisting fails the in-memory session is left untouched.
    pub fn set_session(
        &mut self,
        token: impl Into<String>,
        auth_user_id: impl Into<String>,
        user: UserProfile,
    ) -> Result<()> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::validation("Session token must not be empty"));
        }

        let user_json = serde_json::to_string(&user)?;
        self.storage.set(TOKEN_KEY, &token)?;
        self.storage.set(USER_KEY, &user_json)?;

        log::debug!("[session] Session set for {}", user.email);
        self.session = Session {
            token: Some(token),
            auth_user_id: Some(auth_user_id.into()),
            user: Some(user),
        };
        Ok(())
    }

    /// Replace the profile after an edit, keeping the token
    pub fn set_user(&mut self, user: UserProfile) -> Result<()> {
        if !self.session.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }

        self.storage.set(USER_KEY, &serde_json::to_string(&user)?)?;
        self.session.user = Some(user);
        Ok(())
    }

    /// Forget the session in memory and in storage
    ///
    /// Memory is reset first, so a storage failure still leaves the process
    /// logged out; the failure is returned to the caller.
    pub fn clear_session(&mut self) -> Result<()> {
        self.session = Session::default();
        let token_result = self.storage.remove(TOKEN_KEY);
        let user_result = self.storage.remove(USER_KEY);
        token_result.and(user_result)
    }

    /// Load the persisted session, falling back to an empty one on any problem
    ///
    /// Returns whether an authenticated session was restored.
    pub fn restore_session(&mut self) -> bool {
        match self.load() {
            Ok(Some((token, user))) => {
                log::debug!("[session] Restored session for {}", user.email);
                self.session = Session {
                    token: Some(token),
                    auth_user_id: Some(user.auth_user_id.clone()),
                    user: Some(user),
                };
                true
            }
            Ok(None) => {
                self.session = Session::default();
                false
            }
            Err(e) => {
                log::warn!("[session] Discarding stored session: {}", e);
                if let Err(clear_err) = self.clear_session() {
                    log::error!("[session] Failed to clear stored session: {}", clear_err);
                }
                false
            }
        }
    }

    fn load(&self) -> Result<Option<(String, UserProfile)>> {
        let token = self.storage.get(TOKEN_KEY)?;
        let user_json = self.storage.get(USER_KEY)?;

        let (token, user_json) = match (token, user_json) {
            (None, None) => return Ok(None),
            (Some(token), Some(user_json)) => (token, user_json),
            (Some(_), None) => return Err(Error::storage("token stored without a user")),
            (None, Some(_)) => return Err(Error::storage("user stored without a token")),
        };

        if token.trim().is_empty() {
            return Err(Error::storage("stored token is empty"));
        }

        // Parseable JSON is not enough: it has to be a usable profile
        let user: UserProfile = serde_json::from_str(&user_json)?;
        if user.id.trim().is_empty() || user.auth_user_id.trim().is_empty() {
            return Err(Error::storage("stored user has no id"));
        }

        Ok(Some((token, user)))
    }

    /// The current user, or `NotAuthenticated`
    pub fn require_user(&self) -> Result<&UserProfile> {
        match self.session.user() {
            Some(user) if self.session.is_authenticated() => Ok(user),
            _ => Err(Error::NotAuthenticated),
        }
    }

    /// The current user if they hold `role`
    pub fn require_role(&self, role: Role) -> Result<&UserProfile> {
        let user = self.require_user()?;
        if user.role != role {
            return Err(Error::forbidden(format!(
                "this action requires the {} role",
                role
            )));
        }
        Ok(user)
    }
}
