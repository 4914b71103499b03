use std::sync::{Arc, RwLock};

use tracing::{debug, error, info, instrument, warn};

use super::{FullReload, SessionPersistence, LOGIN_PATH};
use crate::auth::dto::RegisterRequest;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::repo_types::{NewUser, Principal, Role, User};
use crate::auth::validation::validate_registration;
use crate::error::AuthError;
use crate::store::UserStore;

/// Owns the single process-local session and every operation that changes it.
///
/// The session is a snapshot of the user record taken at login. It is never
/// refreshed from the store, so a role change elsewhere shows up only after the
/// next login. There is no expiry; only `sign_out` (directly or through
/// `update_password`) ends a session.
///
/// Operations are not serialized against each other. Two concurrent logins
/// race on the durable snapshot and the last write wins.
pub struct SessionManager {
    users: Arc<dyn UserStore>,
    persistence: Arc<dyn SessionPersistence>,
    current: RwLock<Option<Principal>>,
    password_reset_enabled: bool,
}

impl SessionManager {
    /// Starts unauthenticated without reading durable state.
    pub fn new(
        users: Arc<dyn UserStore>,
        persistence: Arc<dyn SessionPersistence>,
        password_reset_enabled: bool,
    ) -> Self {
        Self {
            users,
            persistence,
            current: RwLock::new(None),
            password_reset_enabled,
        }
    }

    /// Rebuilds the session from durable state. An unreadable snapshot starts
    /// the process unauthenticated.
    pub async fn restore(
        users: Arc<dyn UserStore>,
        persistence: Arc<dyn SessionPersistence>,
        password_reset_enabled: bool,
    ) -> Self {
        let restored = match persistence.load().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored session unreadable; starting signed out");
                None
            }
        };
        match &restored {
            Some(p) => info!(user_id = %p.id, role = %p.role, "session restored"),
            None => debug!("no stored session"),
        }
        let manager = Self::new(users, persistence, password_reset_enabled);
        manager.replace(restored);
        manager
    }

    fn replace(&self, next: Option<Principal>) {
        match self.current.write() {
            Ok(mut slot) => *slot = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// The current principal, if any.
    pub fn current(&self) -> Option<Principal> {
        match self.current.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Authenticates and replaces any existing session. On failure the prior
    /// session, if any, is left exactly as it was.
    #[instrument(skip(self, plain))]
    pub async fn login(&self, email: &str, plain: &str) -> Result<User, AuthError> {
        let user = match self.users.find_user_by_email(email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(email = %email, "login unknown email");
                return Err(AuthError::NotFound);
            }
            Err(e) => {
                error!(error = %e, "find_user_by_email failed");
                return Err(AuthError::Store(e));
            }
        };

        if !verify_password_blocking(plain.to_owned(), user.password_hash.clone()).await {
            warn!(email = %email, user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let principal = Principal::from(&user);
        self.persistence.save(&principal).await.map_err(|e| {
            error!(error = %e, "persist session failed");
            AuthError::Persistence(e)
        })?;
        self.replace(Some(principal));

        info!(user_id = %user.id, email = %user.email, role = %user.role, "user logged in");
        Ok(user)
    }

    /// Ends the session. Safe to call when already signed out.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<FullReload, AuthError> {
        self.persistence.clear().await.map_err(|e| {
            error!(error = %e, "clear session failed");
            AuthError::Persistence(e)
        })?;
        let previous = self.current();
        self.replace(None);
        match previous {
            Some(p) => info!(user_id = %p.id, "user signed out"),
            None => debug!("sign out without session"),
        }
        Ok(FullReload { to: LOGIN_PATH })
    }

    /// Overwrites the password of whichever account holds `email`.
    ///
    /// There is no proof of ownership here: no emailed token, no OTP. Anyone who
    /// knows an address can replace that account's password. The behaviour is
    /// kept for parity and can be switched off with `PASSWORD_RESET_ENABLED=false`.
    #[instrument(skip(self, new_plain))]
    pub async fn request_password_reset(
        &self,
        email: &str,
        new_plain: &str,
    ) -> Result<(), AuthError> {
        if !self.password_reset_enabled {
            warn!(email = %email, "password reset requested while disabled");
            return Err(AuthError::Forbidden("Password reset is disabled".into()));
        }
        if email.trim().is_empty() || new_plain.is_empty() {
            return Err(AuthError::validation("Please fill all the fields"));
        }
        warn!(email = %email, "unverified password reset: overwriting hash by email");

        let hash = hash_password_blocking(new_plain.to_owned())
            .await
            .map_err(AuthError::Internal)?;
        let updated = self
            .users
            .update_password_by_email(email, &hash)
            .await
            .map_err(|e| {
                error!(error = %e, "update_password_by_email failed");
                AuthError::Store(e)
            })?;
        if updated == 0 {
            warn!(email = %email, "password reset matched no account");
            return Err(AuthError::Store(anyhow::anyhow!("no account updated")));
        }
        info!(email = %email, "password reset");
        Ok(())
    }

    /// Changes the signed-in user's password, then forces a sign-out.
    #[instrument(skip(self, new_plain))]
    pub async fn update_password(&self, new_plain: &str) -> Result<FullReload, AuthError> {
        let principal = self.current().ok_or(AuthError::NoSession)?;
        if new_plain.is_empty() {
            return Err(AuthError::validation("Please fill all the fields"));
        }

        let hash = hash_password_blocking(new_plain.to_owned())
            .await
            .map_err(AuthError::Internal)?;
        let updated = self
            .users
            .update_password_by_id(principal.id, &hash)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %principal.id, "update_password_by_id failed");
                AuthError::Store(e)
            })?;
        if updated == 0 {
            return Err(AuthError::Store(anyhow::anyhow!(
                "no account updated for {}",
                principal.id
            )));
        }
        info!(user_id = %principal.id, "password updated");
        self.sign_out().await
    }

    /// Creates an account and signs it in.
    ///
    /// The insert is not undone if the sign-in step fails afterwards: the
    /// account exists, the error is logged and the new user is returned with
    /// the session left as it was. Callers check `current()` to tell the two
    /// outcomes apart.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AuthError> {
        validate_registration(&req)?;

        let role = req.role.unwrap_or_default();
        let (first_name, last_name) = match role {
            Role::User => (req.first_name, req.last_name),
            Role::Admin | Role::Doctor => (None, None),
        };
        let hash = hash_password_blocking(req.password.clone())
            .await
            .map_err(AuthError::Internal)?;
        let user = self
            .users
            .insert_user(NewUser {
                email: req.email.clone(),
                password_hash: hash,
                role,
                first_name,
                last_name,
            })
            .await
            .map_err(|e| {
                error!(error = %e, "insert_user failed");
                AuthError::Store(e)
            })?;
        info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");

        match self.login(&req.email, &req.password).await {
            Ok(signed_in) => Ok(signed_in),
            Err(e) => {
                error!(error = %e, user_id = %user.id, "registered but sign-in failed");
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{persistence::FileSessionStore, MemorySessionStore};
    use crate::store::MemoryStore;

    fn patient_form(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            role: None,
            first_name: Some("Pat".into()),
            last_name: Some("Lee".into()),
        }
    }

    fn clinician_form(email: &str, password: &str, role: Role) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            role: Some(role),
            first_name: Some("ignored".into()),
            last_name: None,
        }
    }

    fn manager(store: Arc<MemoryStore>) -> SessionManager {
        SessionManager::new(store, Arc::new(MemorySessionStore::new()), true)
    }

    #[tokio::test]
    async fn login_unknown_email_is_not_found_and_keeps_state() {
        let mgr = manager(Arc::new(MemoryStore::new()));
        let err = mgr.login("ghost@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
        assert!(!mgr.is_authenticated());
    }

    #[tokio::test]
    async fn failed_login_leaves_prior_session_untouched() {
        let store = Arc::new(MemoryStore::new());
        let mgr = manager(store);
        mgr.register(patient_form("pat@example.com", "pw-1")).await.unwrap();
        let before = mgr.current().unwrap();

        let err = mgr.login("pat@example.com", "nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let err = mgr.login("ghost@example.com", "pw-1").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound));

        assert_eq!(mgr.current(), Some(before));
    }

    #[tokio::test]
    async fn failed_login_leaves_durable_snapshot_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Arc::new(FileSessionStore::new(dir.path()));
        let mgr = SessionManager::new(Arc::new(MemoryStore::new()), persistence.clone(), true);
        mgr.register(patient_form("pat@example.com", "pw-1")).await.unwrap();
        let before = mgr.current().unwrap();

        mgr.login("pat@example.com", "nope").await.unwrap_err();
        mgr.login("ghost@example.com", "pw-1").await.unwrap_err();

        assert_eq!(mgr.current(), Some(before.clone()));
        assert_eq!(persistence.load().await.unwrap(), Some(before));
    }

    /// Accepts clears but refuses every save.
    struct ReadOnlySessions;

    #[async_trait::async_trait]
    impl SessionPersistence for ReadOnlySessions {
        async fn load(&self) -> anyhow::Result<Option<Principal>> {
            Ok(None)
        }
        async fn save(&self, _: &Principal) -> anyhow::Result<()> {
            anyhow::bail!("read-only session dir")
        }
        async fn clear(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn registration_survives_failed_sign_in() {
        let store = Arc::new(MemoryStore::new());
        let mgr = SessionManager::new(store.clone(), Arc::new(ReadOnlySessions), true);

        let user = mgr
            .register(patient_form("pat@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(user.email, "pat@example.com");
        assert!(!mgr.is_authenticated());

        let stored = store.find_user_by_email("pat@example.com").await.unwrap();
        assert_eq!(stored.map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn login_persists_and_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let persistence = Arc::new(FileSessionStore::new(dir.path()));

        let mgr = SessionManager::new(store.clone(), persistence.clone(), true);
        mgr.register(patient_form("pat@example.com", "pw")).await.unwrap();
        mgr.sign_out().await.unwrap();

        let user = mgr.login("pat@example.com", "pw").await.unwrap();
        assert_eq!(user.email, "pat@example.com");
        assert!(mgr.is_authenticated());
        assert!(persistence.path().exists());

        let restarted =
            SessionManager::restore(store, Arc::new(FileSessionStore::new(dir.path())), true)
                .await;
        assert_eq!(restarted.current(), Some(Principal::from(&user)));
    }

    #[tokio::test]
    async fn restore_without_snapshot_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = SessionManager::restore(
            Arc::new(MemoryStore::new()),
            Arc::new(FileSessionStore::new(dir.path())),
            true,
        )
        .await;
        assert!(!mgr.is_authenticated());
    }

    #[tokio::test]
    async fn restore_with_corrupt_snapshot_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FileSessionStore::new(dir.path());
        tokio::fs::write(persistence.path(), b"garbage").await.unwrap();
        let mgr =
            SessionManager::restore(Arc::new(MemoryStore::new()), Arc::new(persistence), true)
                .await;
        assert!(!mgr.is_authenticated());
    }

    #[tokio::test]
    async fn sign_out_clears_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Arc::new(FileSessionStore::new(dir.path()));
        let mgr = SessionManager::new(Arc::new(MemoryStore::new()), persistence.clone(), true);
        mgr.register(patient_form("pat@example.com", "pw")).await.unwrap();
        assert!(persistence.path().exists());

        let reload = mgr.sign_out().await.unwrap();
        assert_eq!(reload.to, LOGIN_PATH);
        assert!(!mgr.is_authenticated());
        assert!(!persistence.path().exists());

        assert_eq!(mgr.sign_out().await.unwrap().to, LOGIN_PATH);
        assert!(!mgr.is_authenticated());
    }

    #[tokio::test]
    async fn relogin_replaces_session() {
        let mgr = manager(Arc::new(MemoryStore::new()));
        mgr.register(patient_form("pat@example.com", "pw")).await.unwrap();
        mgr.register(clinician_form("doc@example.com", "pw", Role::Doctor))
            .await
            .unwrap();
        assert_eq!(mgr.current().unwrap().email, "doc@example.com");

        mgr.login("pat@example.com", "pw").await.unwrap();
        let current = mgr.current().unwrap();
        assert_eq!(current.email, "pat@example.com");
        assert_eq!(current.role, Role::User);
    }

    #[tokio::test]
    async fn update_password_requires_session() {
        let mgr = manager(Arc::new(MemoryStore::new()));
        let err = mgr.update_password("new").await.unwrap_err();
        assert!(matches!(err, AuthError::NoSession));
    }

    #[tokio::test]
    async fn update_password_signs_out_and_rotates_credentials() {
        let mgr = manager(Arc::new(MemoryStore::new()));
        mgr.register(patient_form("pat@example.com", "old-pw")).await.unwrap();

        let reload = mgr.update_password("new-pw").await.unwrap();
        assert_eq!(reload.to, LOGIN_PATH);
        assert!(!mgr.is_authenticated());

        let err = mgr.login("pat@example.com", "old-pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        mgr.login("pat@example.com", "new-pw").await.unwrap();
        assert!(mgr.is_authenticated());
    }

    #[tokio::test]
    async fn session_is_a_snapshot_not_live() {
        let store = Arc::new(MemoryStore::new());
        let mgr = manager(store.clone());
        let user = mgr
            .register(patient_form("pat@example.com", "pw"))
            .await
            .unwrap();

        store.set_role(user.id, Role::Doctor).unwrap();
        assert_eq!(mgr.current().unwrap().role, Role::User);

        mgr.login("pat@example.com", "pw").await.unwrap();
        assert_eq!(mgr.current().unwrap().role, Role::Doctor);
    }

    #[tokio::test]
    async fn password_reset_overwrites_by_email() {
        let mgr = manager(Arc::new(MemoryStore::new()));
        mgr.register(patient_form("pat@example.com", "old")).await.unwrap();
        mgr.sign_out().await.unwrap();

        mgr.request_password_reset("pat@example.com", "fresh")
            .await
            .unwrap();
        assert!(mgr.login("pat@example.com", "old").await.is_err());
        mgr.login("pat@example.com", "fresh").await.unwrap();
    }

    #[tokio::test]
    async fn password_reset_for_unknown_email_is_store_error() {
        let mgr = manager(Arc::new(MemoryStore::new()));
        let err = mgr
            .request_password_reset("ghost@example.com", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn password_reset_can_be_disabled() {
        let store = Arc::new(MemoryStore::new());
        let mgr = SessionManager::new(store.clone(), Arc::new(MemorySessionStore::new()), false);
        let err = mgr
            .request_password_reset("pat@example.com", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn patient_registration_without_names_never_reaches_store() {
        let store = Arc::new(MemoryStore::new());
        let mgr = manager(store.clone());
        let mut form = patient_form("pat@example.com", "pw");
        form.first_name = Some(String::new());
        form.last_name = None;

        let err = mgr.register(form).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(store.calls(), 0);
        assert!(!mgr.is_authenticated());
    }

    #[tokio::test]
    async fn clinician_registration_drops_names() {
        let mgr = manager(Arc::new(MemoryStore::new()));
        let user = mgr
            .register(clinician_form("admin@example.com", "pw", Role::Admin))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.first_name, None);
    }

    #[tokio::test]
    async fn duplicate_email_is_store_error() {
        let mgr = manager(Arc::new(MemoryStore::new()));
        mgr.register(patient_form("pat@example.com", "pw")).await.unwrap();
        let err = mgr
            .register(patient_form("pat@example.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn email_match_is_case_sensitive() {
        let mgr = manager(Arc::new(MemoryStore::new()));
        mgr.register(patient_form("Pat@example.com", "pw")).await.unwrap();
        mgr.sign_out().await.unwrap();
        let err = mgr.login("pat@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
    }
}
