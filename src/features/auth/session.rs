use super::store::{SessionStore, StoreError, STORAGE_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub token: String,
    pub expires_at: String,
}

impl Session {
    /// Unparseable expiry timestamps count as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires_at) => now >= expires_at.with_timezone(&Utc),
            Err(e) => {
                warn!(expires_at = %self.expires_at, error = %e, "invalid session expiry");
                true
            }
        }
    }
}

/// The slice of auth state that survives restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAuth {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub is_authenticated: bool,
}

/// Explicit owner of the signed-in user and session, passed to the
/// handlers that need it.
pub struct AuthContext {
    user: Option<User>,
    session: Option<Session>,
    is_authenticated: bool,
    is_loading: bool,
    error: Option<String>,
    store: Box<dyn SessionStore>,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("user", &self.user)
            .field("is_authenticated", &self.is_authenticated)
            .field("is_loading", &self.is_loading)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl AuthContext {
    /// Restore from the store and validate the session against `now`.
    /// A missing or unreadable snapshot starts signed out.
    pub fn init(store: Box<dyn SessionStore>, now: DateTime<Utc>) -> Self {
        let restored = match store.get(STORAGE_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<PersistedAuth>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable auth snapshot");
                PersistedAuth::default()
            }),
            Ok(None) => PersistedAuth::default(),
            Err(e) => {
                error!(error = %e, "failed to read auth snapshot");
                PersistedAuth::default()
            }
        };

        let mut ctx = Self {
            user: restored.user,
            session: restored.session,
            is_authenticated: restored.is_authenticated,
            is_loading: false,
            error: None,
            store,
        };
        if let Err(e) = ctx.check_status(now) {
            error!(error = %e, "failed to persist auth status");
        }
        ctx
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn login(&mut self, user: User, session: Session) -> Result<(), StoreError> {
        debug!(user = %user.email, "login");
        self.user = Some(user);
        self.session = Some(session);
        self.is_authenticated = true;
        self.error = None;
        self.persist()
    }

    pub fn logout(&mut self) -> Result<(), StoreError> {
        debug!("logout");
        self.user = None;
        self.session = None;
        self.is_authenticated = false;
        self.error = None;
        self.persist()
    }

    /// Returns whether the user is still authenticated at `now`.
    pub fn check_status(&mut self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let expired = match self.session.as_ref().map(|s| s.is_expired(now)) {
            None => {
                self.is_authenticated = false;
                self.user = None;
                self.persist()?;
                return Ok(false);
            }
            Some(expired) => expired,
        };
        if expired {
            self.logout()?;
            return Ok(false);
        }
        self.is_authenticated = true;
        Ok(true)
    }

    pub fn snapshot(&self) -> PersistedAuth {
        PersistedAuth {
            user: self.user.clone(),
            session: self.session.clone(),
            is_authenticated: self.is_authenticated,
        }
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".into());
        self.store.set(STORAGE_KEY, &raw)
    }

    /// Flush and release the store.
    pub fn teardown(mut self) -> Result<(), StoreError> {
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::store::SqliteStore;
    use chrono::TimeZone;

    pub(crate) fn user() -> User {
        User {
            id: "u1".into(),
            email: "ana@example.org".into(),
            name: "Ana".into(),
            email_verified: true,
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    pub(crate) fn session(expires_at: &str) -> Session {
        Session {
            id: "s1".into(),
            token: "tok".into(),
            expires_at: expires_at.into(),
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn store_with(value: Option<&str>) -> Box<dyn SessionStore> {
        let mut store = SqliteStore::in_memory().unwrap();
        if let Some(v) = value {
            store.set(STORAGE_KEY, v).unwrap();
        }
        Box::new(store)
    }

    #[test]
    fn empty_store_starts_signed_out() {
        let ctx = AuthContext::init(store_with(None), at(2025, 6, 1));
        assert!(!ctx.is_authenticated());
        assert!(ctx.user().is_none());
    }

    #[test]
    fn valid_session_is_restored() {
        let snap = PersistedAuth {
            user: Some(user()),
            session: Some(session("2030-01-01T00:00:00Z")),
            is_authenticated: true,
        };
        let raw = serde_json::to_string(&snap).unwrap();
        let ctx = AuthContext::init(store_with(Some(&raw)), at(2025, 6, 1));
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.user().map(|u| u.name.as_str()), Some("Ana"));
    }

    #[test]
    fn expired_session_logs_out_and_persists() {
        let snap = PersistedAuth {
            user: Some(user()),
            session: Some(session("2025-01-01T00:00:00.000Z")),
            is_authenticated: true,
        };
        let raw = serde_json::to_string(&snap).unwrap();
        let ctx = AuthContext::init(store_with(Some(&raw)), at(2025, 6, 1));
        assert!(!ctx.is_authenticated());
        assert!(ctx.session().is_none());
        assert_eq!(ctx.snapshot(), PersistedAuth::default());
    }

    #[test]
    fn expiry_boundary_counts_as_expired() {
        let s = session("2025-06-01T12:00:00Z");
        assert!(s.is_expired(at(2025, 6, 1)));
        assert!(!s.is_expired(at(2025, 5, 31)));
        assert!(session("tomorrow").is_expired(at(2025, 5, 31)));
    }

    #[test]
    fn corrupt_snapshot_is_discarded() {
        let ctx = AuthContext::init(store_with(Some("{not json")), at(2025, 6, 1));
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn login_then_logout_round_trips_through_store() {
        let mut ctx = AuthContext::init(store_with(None), at(2025, 6, 1));
        ctx.set_error(Some("old".into()));
        ctx.login(user(), session("2030-01-01T00:00:00Z")).unwrap();
        assert!(ctx.is_authenticated());
        assert!(ctx.error().is_none());

        let raw = ctx.store.get(STORAGE_KEY).unwrap().unwrap();
        let persisted: PersistedAuth = serde_json::from_str(&raw).unwrap();
        assert!(persisted.is_authenticated);
        assert_eq!(persisted.user.unwrap().email, "ana@example.org");

        ctx.logout().unwrap();
        let raw = ctx.store.get(STORAGE_KEY).unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<PersistedAuth>(&raw).unwrap(),
            PersistedAuth::default()
        );
    }

    #[test]
    fn wire_names_are_camel_case() {
        let snap = PersistedAuth {
            user: Some(user()),
            session: Some(session("2030-01-01T00:00:00Z")),
            is_authenticated: true,
        };
        let v = serde_json::to_value(&snap).unwrap();
        assert_eq!(v["isAuthenticated"], true);
        assert_eq!(v["session"]["expiresAt"], "2030-01-01T00:00:00Z");
        assert_eq!(v["user"]["emailVerified"], true);
    }
}
