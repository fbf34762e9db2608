use chrono::{DateTime, Utc};
use moka::sync::Cache;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{CompanyProfiles, Workbook};

const MAX_SESSIONS: u64 = 1_000;

/// Everything one logged-in user works with. The workbook and the profiles
/// built from it are fixed for the lifetime of the session.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub workbook: Arc<Workbook>,
    pub profiles: Arc<CompanyProfiles>,
    crm_token: RwLock<Option<String>>,
}

impl Session {
    pub fn new(workbook: Workbook) -> Self {
        let profiles = CompanyProfiles::build(&workbook);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            workbook: Arc::new(workbook),
            profiles: Arc::new(profiles),
            crm_token: RwLock::new(None),
        }
    }

    pub fn set_crm_token(&self, token: String) {
        *self.crm_token.write() = Some(token);
    }

    pub fn crm_token(&self) -> Option<String> {
        self.crm_token.read().clone()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<Uuid, Arc<Session>>,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_idle(idle_timeout)
            .build();
        Self { sessions }
    }

    pub fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        self.sessions.insert(session.id, session.clone());
        info!(
            "Session {} opened at {} with {} companies",
            session.id,
            session.created_at.to_rfc3339(),
            session.profiles.len()
        );
        session
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.get(id);
        if session.is_none() {
            debug!("Unknown or expired session {}", id);
        }
        session
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            info!("Session {} closed", id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawColumn, RawTable};

    fn workbook() -> Workbook {
        Workbook {
            products: RawTable::new(
                "Products",
                vec![RawColumn::new("Electronics", vec![Some("Acme Corp".into())])],
            ),
            sectors: RawTable::empty("Sectors"),
            countries: RawTable::empty("Countries"),
        }
    }

    #[test]
    fn session_builds_profiles_from_workbook() {
        let session = Session::new(workbook());
        assert_eq!(session.profiles.len(), 1);
        assert!(session.profiles.get("Acme Corp").is_some());
        assert_eq!(session.crm_token(), None);

        session.set_crm_token("token".to_string());
        assert_eq!(session.crm_token().as_deref(), Some("token"));
    }

    #[test]
    fn sessions_are_independent() {
        let store = SessionStore::new(Duration::from_secs(60));
        let first = store.insert(Session::new(workbook()));
        let second = store.insert(Session::new(workbook()));

        assert_ne!(first.id, second.id);
        first.set_crm_token("first".to_string());
        assert_eq!(second.crm_token(), None);
        assert!(!Arc::ptr_eq(&first.profiles, &second.profiles));
    }

    #[test]
    fn removed_session_is_gone() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session = store.insert(Session::new(workbook()));

        assert!(store.get(&session.id).is_some());
        assert!(store.remove(&session.id));
        assert!(store.get(&session.id).is_none());
        assert!(!store.remove(&session.id));
        assert!(store.get(&Uuid::new_v4()).is_none());
    }
}
