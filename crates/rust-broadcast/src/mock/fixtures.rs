//! Session fixtures.

use std::time::SystemTime;

use crate::types::{NewSession, Session, SessionId, SessionType};

/// A local active session with the given ID and name.
#[must_use]
pub fn session(id: u64, name: &str) -> Session {
    NewSession::new(name, SessionType::Local).into_session(SessionId::new(id), SystemTime::now())
}

/// A local active session description carrying `tags`.
#[must_use]
pub fn tagged(name: &str, tags: &[&str]) -> NewSession {
    tags.iter()
        .fold(NewSession::new(name, SessionType::Local), |s, t| s.tag(*t))
}

/// Two `dev` sessions and one `prod` session, in that order.
#[must_use]
pub fn dev_prod_fleet() -> Vec<NewSession> {
    vec![
        tagged("dev-A", &["dev"]),
        tagged("dev-B", &["dev"]),
        tagged("prod-X", &["prod"]),
    ]
}
