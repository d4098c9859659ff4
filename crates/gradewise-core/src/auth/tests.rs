//! Auth module tests
//!
//! Unit tests using mock collaborators for testability.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::directory::ProfileDirectory;
use super::identity::IdentityProvider;
use super::service::AuthGateway;
use super::types::{AuthError, IdentitySession, IdentityUser, SignupError, SignupRequest};
use crate::error::{Error, Result};
use crate::models::{CreateUserProfile, Role, UserProfile};
use crate::session::{SessionStore, TOKEN_KEY};
use crate::storage::{KeyValueStore, MemoryStore};

// ============================================================================
// Mock Identity Provider
// ============================================================================

/// Mock identity provider keyed by email
pub struct MockIdentityProvider {
    accounts: Mutex<HashMap<String, (String, String)>>,
    issue_token_on_signup: bool,
    fail_sign_out: bool,
    unreachable: bool,
    sign_in_outage: bool,
    signed_out: Mutex<Vec<String>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            issue_token_on_signup: true,
            fail_sign_out: false,
            unreachable: false,
            sign_in_outage: false,
            signed_out: Mutex::new(Vec::new()),
        }
    }

    /// Add an account to the mock provider
    pub fn with_account(self, email: &str, password: &str, auth_user_id: &str) -> Self {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            (auth_user_id.to_string(), password.to_string()),
        );
        self
    }

    pub fn requiring_confirmation(mut self) -> Self {
        self.issue_token_on_signup = false;
        self
    }

    pub fn with_failing_sign_out(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Signup still works but password grants answer 503
    pub fn with_sign_in_outage(mut self) -> Self {
        self.sign_in_outage = true;
        self
    }

    fn token_for(auth_user_id: &str) -> String {
        format!("token-{}", auth_user_id)
    }

    fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: &serde_json::Value,
    ) -> Result<IdentitySession> {
        if self.unreachable {
            return Err(Error::identity(Some(503), "Service unavailable"));
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(Error::identity(Some(422), "User already registered"));
        }
        let auth_user_id = format!("auth-{}", uuid::Uuid::new_v4());
        accounts.insert(
            email.to_string(),
            (auth_user_id.clone(), password.to_string()),
        );
        Ok(IdentitySession {
            access_token: self
                .issue_token_on_signup
                .then(|| Self::token_for(&auth_user_id)),
            refresh_token: None,
            expires_in: Some(3600),
            user: IdentityUser {
                id: auth_user_id,
                email: Some(email.to_string()),
            },
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentitySession> {
        if self.unreachable || self.sign_in_outage {
            return Err(Error::identity(Some(503), "Service unavailable"));
        }
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((id, pw)) if pw == password => {
                if !self.issue_token_on_signup {
                    return Err(Error::identity(Some(400), "Email not confirmed"));
                }
                Ok(IdentitySession {
                    access_token: Some(Self::token_for(id)),
                    refresh_token: Some("refresh".to_string()),
                    expires_in: Some(3600),
                    user: IdentityUser {
                        id: id.clone(),
                        email: Some(email.to_string()),
                    },
                })
            }
            _ => Err(Error::identity(Some(400), "Invalid login credentials")),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.signed_out.lock().unwrap().push(access_token.to_string());
        if self.fail_sign_out {
            return Err(Error::identity(None, "connection reset"));
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<IdentityUser> {
        let accounts = self.accounts.lock().unwrap();
        accounts
            .iter()
            .find(|(_, (id, _))| Self::token_for(id) == access_token)
            .map(|(email, (id, _))| IdentityUser {
                id: id.clone(),
                email: Some(email.clone()),
            })
            .ok_or_else(|| Error::identity(Some(401), "invalid JWT"))
    }
}

// ============================================================================
// Mock Profile Directory
// ============================================================================

/// Mock backend profiles keyed by auth user id
pub struct MockProfileDirectory {
    profiles: Mutex<HashMap<String, UserProfile>>,
    fail_create: bool,
    fail_lookup: bool,
}

impl MockProfileDirectory {
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            fail_create: false,
            fail_lookup: false,
        }
    }

    pub fn with_profile(self, profile: UserProfile) -> Self {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.auth_user_id.clone(), profile);
        self
    }

    pub fn with_failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn with_failing_lookup(mut self) -> Self {
        self.fail_lookup = true;
        self
    }

    fn profile_count(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }
}

#[async_trait]
impl ProfileDirectory for MockProfileDirectory {
    async fn find_by_auth_user_id(
        &self,
        _access_token: &str,
        auth_user_id: &str,
    ) -> Result<Option<UserProfile>> {
        if self.fail_lookup {
            return Err(Error::api(Some(500), "database unavailable"));
        }
        Ok(self.profiles.lock().unwrap().get(auth_user_id).cloned())
    }

    async fn create_profile(
        &self,
        access_token: &str,
        profile: &CreateUserProfile,
    ) -> Result<UserProfile> {
        assert!(!access_token.is_empty(), "profile creation needs a token");
        if self.fail_create {
            return Err(Error::api(Some(500), "could not save profile"));
        }
        let user = UserProfile {
            id: format!("user-{}", profile.auth_user_id),
            auth_user_id: profile.auth_user_id.clone(),
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            role: profile.role,
            metadata: serde_json::Value::Null,
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(user.auth_user_id.clone(), user.clone());
        Ok(user)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn teacher_profile(auth_user_id: &str) -> UserProfile {
    UserProfile {
        id: "user-1".to_string(),
        auth_user_id: auth_user_id.to_string(),
        full_name: "Ms. Frizzle".to_string(),
        email: "frizzle@school.test".to_string(),
        role: Role::Teacher,
        metadata: serde_json::Value::Null,
    }
}

fn signup_request(email: &str) -> SignupRequest {
    SignupRequest {
        email: email.to_string(),
        password: "magic-bus".to_string(),
        confirm_password: Some("magic-bus".to_string()),
        full_name: "Arnold Perlstein".to_string(),
        role: Role::Student,
    }
}

fn gateway_with_teacher() -> AuthGateway<MockIdentityProvider, MockProfileDirectory> {
    AuthGateway::new(
        MockIdentityProvider::new().with_account("frizzle@school.test", "magic-bus", "auth-1"),
        MockProfileDirectory::new().with_profile(teacher_profile("auth-1")),
    )
}

// ============================================================================
// Login Tests
// ============================================================================

#[tokio::test]
async fn test_login_success() {
    let gateway = gateway_with_teacher();
    let session = gateway.login("frizzle@school.test", "magic-bus").await.unwrap();

    assert_eq!(session.token, "token-auth-1");
    assert_eq!(session.auth_user_id, "auth-1");
    assert_eq!(session.user.role, Role::Teacher);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let gateway = gateway_with_teacher();
    let err = gateway.login("frizzle@school.test", "wrong").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials(_)));
}

#[tokio::test]
async fn test_login_unknown_email() {
    let gateway = gateway_with_teacher();
    let err = gateway.login("nobody@school.test", "magic-bus").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials(_)));
}

#[tokio::test]
async fn test_login_without_profile_is_profile_not_found() {
    let gateway = AuthGateway::new(
        MockIdentityProvider::new().with_account("orphan@school.test", "magic-bus", "auth-9"),
        MockProfileDirectory::new(),
    );

    let err = gateway.login("orphan@school.test", "magic-bus").await.unwrap_err();
    assert_eq!(
        err,
        AuthError::ProfileNotFound {
            auth_user_id: "auth-9".to_string()
        }
    );
}

#[tokio::test]
async fn test_login_profile_lookup_failure() {
    let gateway = AuthGateway::new(
        MockIdentityProvider::new().with_account("frizzle@school.test", "magic-bus", "auth-1"),
        MockProfileDirectory::new().with_failing_lookup(),
    );
    let err = gateway.login("frizzle@school.test", "magic-bus").await.unwrap_err();
    assert!(matches!(err, AuthError::ProfileLookup(_)));
}

#[tokio::test]
async fn test_login_provider_outage_is_not_invalid_credentials() {
    let gateway = AuthGateway::new(
        MockIdentityProvider::new().unreachable(),
        MockProfileDirectory::new(),
    );
    let err = gateway.login("frizzle@school.test", "magic-bus").await.unwrap_err();
    assert!(matches!(err, AuthError::Identity(_)));
}

#[tokio::test]
async fn test_login_validates_locally() {
    let gateway = gateway_with_teacher();
    assert!(matches!(
        gateway.login("not-an-email", "x").await,
        Err(AuthError::Validation(_))
    ));
    assert!(matches!(
        gateway.login("frizzle@school.test", "").await,
        Err(AuthError::Validation(_))
    ));
}

#[tokio::test]
async fn test_login_into_sets_session() {
    let gateway = gateway_with_teacher();
    let mut store = SessionStore::new(MemoryStore::new());

    let user = gateway
        .login_into(&mut store, "frizzle@school.test", "magic-bus")
        .await
        .unwrap();
    assert_eq!(user.full_name, "Ms. Frizzle");
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn test_failed_login_into_leaves_session_empty() {
    let gateway = AuthGateway::new(
        MockIdentityProvider::new().with_account("orphan@school.test", "magic-bus", "auth-9"),
        MockProfileDirectory::new(),
    );
    let mut store = SessionStore::new(MemoryStore::new());

    let err = gateway
        .login_into(&mut store, "orphan@school.test", "magic-bus")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::ProfileNotFound { .. })));
    assert!(!store.is_authenticated());
    assert!(store.storage().is_empty());
}

// ============================================================================
// Signup Tests
// ============================================================================

#[tokio::test]
async fn test_signup_success_creates_profile() {
    let gateway = AuthGateway::new(MockIdentityProvider::new(), MockProfileDirectory::new());
    let session = gateway.signup(signup_request("arnold@school.test")).await.unwrap();

    assert_eq!(session.user.role, Role::Student);
    assert_eq!(session.user.auth_user_id, session.auth_user_id);
    assert_eq!(gateway.profiles().profile_count(), 1);
}

#[tokio::test]
async fn test_signup_validation_happens_before_network() {
    let gateway = AuthGateway::new(MockIdentityProvider::new(), MockProfileDirectory::new());
    let mut request = signup_request("arnold@school.test");
    request.confirm_password = Some("different".to_string());

    let err = gateway.signup(request).await.unwrap_err();
    assert!(matches!(err, SignupError::Validation(_)));
    assert_eq!(gateway.identity().account_count(), 0);
}

#[tokio::test]
async fn test_signup_duplicate_account() {
    let gateway = AuthGateway::new(
        MockIdentityProvider::new().with_account("arnold@school.test", "x", "auth-2"),
        MockProfileDirectory::new(),
    );
    let err = gateway.signup(signup_request("arnold@school.test")).await.unwrap_err();
    assert_eq!(err, SignupError::Identity("User already registered".to_string()));
}

#[tokio::test]
async fn test_signup_profile_failure_establishes_no_session() {
    let gateway = AuthGateway::new(
        MockIdentityProvider::new(),
        MockProfileDirectory::new().with_failing_create(),
    );
    let mut store = SessionStore::new(MemoryStore::new());

    let err = gateway
        .signup_into(&mut store, signup_request("arnold@school.test"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Signup(SignupError::ProfileCreation { .. })
    ));
    assert!(!store.is_authenticated());
    assert!(store.storage().is_empty());
    // The identity account is left behind
    assert_eq!(gateway.identity().account_count(), 1);
}

#[tokio::test]
async fn test_signup_awaiting_confirmation() {
    let gateway = AuthGateway::new(
        MockIdentityProvider::new().requiring_confirmation(),
        MockProfileDirectory::new(),
    );
    let err = gateway.signup(signup_request("arnold@school.test")).await.unwrap_err();
    match err {
        SignupError::ProfileCreation { message, .. } => assert!(message.contains("confirm")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(gateway.profiles().profile_count(), 0);
}

#[tokio::test]
async fn test_signup_sign_in_outage_is_not_reported_as_confirmation() {
    let gateway = AuthGateway::new(
        MockIdentityProvider::new()
            .requiring_confirmation()
            .with_sign_in_outage(),
        MockProfileDirectory::new(),
    );
    let err = gateway.signup(signup_request("arnold@school.test")).await.unwrap_err();
    match err {
        SignupError::ProfileCreation { message, .. } => {
            assert!(!message.contains("confirm"), "got: {message}");
            assert!(message.contains("Service unavailable"), "got: {message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(gateway.identity().account_count(), 1);
    assert_eq!(gateway.profiles().profile_count(), 0);
}

// ============================================================================
// Logout / refresh Tests
// ============================================================================

#[tokio::test]
async fn test_logout_clears_session_and_signs_out() {
    let gateway = gateway_with_teacher();
    let mut store = SessionStore::new(MemoryStore::new());
    gateway
        .login_into(&mut store, "frizzle@school.test", "magic-bus")
        .await
        .unwrap();

    gateway.logout(&mut store).await.unwrap();
    assert!(!store.is_authenticated());
    assert_eq!(store.storage().get(TOKEN_KEY).unwrap(), None);
    assert_eq!(
        gateway.identity().signed_out.lock().unwrap().as_slice(),
        ["token-auth-1".to_string()]
    );
}

#[tokio::test]
async fn test_logout_clears_even_when_remote_fails() {
    let gateway = AuthGateway::new(
        MockIdentityProvider::new()
            .with_account("frizzle@school.test", "magic-bus", "auth-1")
            .with_failing_sign_out(),
        MockProfileDirectory::new().with_profile(teacher_profile("auth-1")),
    );
    let mut store = SessionStore::new(MemoryStore::new());
    gateway
        .login_into(&mut store, "frizzle@school.test", "magic-bus")
        .await
        .unwrap();

    gateway.logout(&mut store).await.unwrap();
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn test_logout_without_session_is_noop() {
    let gateway = gateway_with_teacher();
    let mut store = SessionStore::new(MemoryStore::new());
    gateway.logout(&mut store).await.unwrap();
    assert!(gateway.identity().signed_out.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_refresh_profile_picks_up_edits() {
    let gateway = gateway_with_teacher();
    let mut store = SessionStore::new(MemoryStore::new());
    gateway
        .login_into(&mut store, "frizzle@school.test", "magic-bus")
        .await
        .unwrap();

    let mut edited = teacher_profile("auth-1");
    edited.full_name = "Valerie Frizzle".to_string();
    gateway
        .profiles()
        .profiles
        .lock()
        .unwrap()
        .insert("auth-1".to_string(), edited);

    let user = gateway.refresh_profile(&mut store).await.unwrap();
    assert_eq!(user.full_name, "Valerie Frizzle");
    assert_eq!(store.user().unwrap().full_name, "Valerie Frizzle");
}

#[tokio::test]
async fn test_refresh_profile_with_rejected_token_clears_session() {
    let gateway = gateway_with_teacher();
    let mut store = SessionStore::new(MemoryStore::new());
    store
        .set_session("stale-token", "auth-1", teacher_profile("auth-1"))
        .unwrap();

    let err = gateway.refresh_profile(&mut store).await.unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
    assert!(!store.is_authenticated());
}
