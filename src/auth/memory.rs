//! In-memory implementations of the user and session stores. Used by
//! `AppState::fake()` and the service tests; also usable as a real backend
//! for single-process deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::repo::{NewUser, User, UserStore};
use crate::auth::session::{generate_token, Session, SessionStore};
use crate::error::Error;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, Error> {
        let mut users = self.users.lock().expect("user store lock");
        let email_taken = users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&new_user.email));
        if email_taken {
            return Err(Error::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let users = self.users.lock().expect("user store lock");
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, Error> {
        let users = self.users.lock().expect("user store lock");
        Ok(users.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, Error> {
        let mut users = self.users.lock().expect("user store lock");
        Ok(users.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<Session, Error> {
        let now = OffsetDateTime::now_utc();
        let session = Session {
            token: generate_token(),
            user_id,
            expires_at: now + ttl,
            created_at: now,
        };
        let mut sessions = self.sessions.lock().expect("session store lock");
        sessions.insert(session.token.clone(), session.clone());
        Ok(session)
    }

    async fn resolve(&self, token: &str) -> Result<Option<Session>, Error> {
        let mut sessions = self.sessions.lock().expect("session store lock");
        let session = sessions.get(token).cloned();
        match session {
            Some(s) if s.is_expired(OffsetDateTime::now_utc()) => {
                sessions.remove(token);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn destroy(&self, token: &str) -> Result<(), Error> {
        let mut sessions = self.sessions.lock().expect("session store lock");
        sessions.remove(token);
        Ok(())
    }

    async fn destroy_all_for_user(&self, user_id: Uuid) -> Result<(), Error> {
        let mut sessions = self.sessions.lock().expect("session store lock");
        sessions.retain(|_, s| s.user_id != user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_regardless_of_case() {
        let store = InMemoryUserStore::default();
        store
            .create(NewUser {
                email: "a@x.com".into(),
                password_hash: "hash".into(),
                first_name: "A".into(),
                last_name: None,
            })
            .await
            .expect("first create");
        let err = store
            .create(NewUser {
                email: "A@X.COM".into(),
                password_hash: "hash".into(),
                first_name: "A".into(),
                last_name: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict));
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let store = InMemorySessionStore::default();
        let session = store
            .issue(Uuid::new_v4(), Duration::seconds(-1))
            .await
            .expect("issue");
        let resolved = store.resolve(&session.token).await.expect("resolve");
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn destroy_all_removes_every_session_of_the_user() {
        let store = InMemorySessionStore::default();
        let user_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let s1 = store.issue(user_id, Duration::days(7)).await.expect("issue");
        let s2 = store.issue(user_id, Duration::days(7)).await.expect("issue");
        let s3 = store.issue(other, Duration::days(7)).await.expect("issue");

        store.destroy_all_for_user(user_id).await.expect("destroy all");

        assert!(store.resolve(&s1.token).await.expect("resolve").is_none());
        assert!(store.resolve(&s2.token).await.expect("resolve").is_none());
        assert!(store.resolve(&s3.token).await.expect("resolve").is_some());
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let store = InMemorySessionStore::default();
        let session = store
            .issue(Uuid::new_v4(), Duration::days(7))
            .await
            .expect("issue");
        store.destroy(&session.token).await.expect("first destroy");
        store.destroy(&session.token).await.expect("second destroy");
    }
}
