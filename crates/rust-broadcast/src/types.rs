//! Common types for rust-broadcast.
//!
//! This module defines identifiers and the session record shared by the
//! registries, the filter evaluator and the broadcast executor.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::BroadcastError;

/// Unique identifier of a registered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a session ID from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the inner value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Unique identifier of a session group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u64);

impl GroupId {
    /// Create a group ID from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the inner value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// Identifier of one broadcast.
///
/// Group broadcasts reuse the group's ID; ad-hoc broadcasts get a generated
/// `broadcast-<n>` ID unless the caller supplies one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BroadcastId(String);

impl BroadcastId {
    /// Create a broadcast ID from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the number out of an ID shaped like `{prefix}-{n}`.
    #[must_use]
    pub fn sequence(&self, prefix: &str) -> Option<u64> {
        self.0.strip_prefix(prefix)?.strip_prefix('-')?.parse().ok()
    }
}

impl From<GroupId> for BroadcastId {
    fn from(id: GroupId) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for BroadcastId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of endpoint a session represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// A local shell.
    #[default]
    Local,
    /// A remote host (e.g. over SSH).
    Remote,
    /// A container.
    Container,
    /// A virtual machine.
    Vm,
}

impl SessionType {
    /// Get the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Container => "container",
            Self::Vm => "vm",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = BroadcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "container" => Ok(Self::Container),
            "vm" => Ok(Self::Vm),
            other => Err(BroadcastError::config(format!("unknown session type: {other}"))),
        }
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Ready to accept commands. Only active sessions are broadcast to.
    #[default]
    Active,
    /// Registered but idle.
    Inactive,
    /// In an error state.
    Error,
    /// Connection was lost.
    Disconnected,
}

impl SessionStatus {
    /// Get the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Error => "error",
            Self::Disconnected => "disconnected",
        }
    }

    /// Check if this status accepts broadcasts.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = BroadcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "error" => Ok(Self::Error),
            "disconnected" => Ok(Self::Disconnected),
            other => Err(BroadcastError::config(format!(
                "unknown session status: {other}"
            ))),
        }
    }
}

/// How to reach a non-local session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Host name or address.
    pub host: Option<String>,
    /// Port number.
    pub port: Option<u16>,
    /// User to connect as.
    pub user: Option<String>,
}

/// A registered command-execution endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Registry-assigned ID, immutable after creation.
    pub id: SessionId,
    /// Human-readable name.
    pub name: String,
    /// Endpoint kind.
    pub session_type: SessionType,
    /// Current status.
    pub status: SessionStatus,
    /// Free-form tags.
    pub tags: BTreeSet<String>,
    /// Environment variables visible to the session.
    pub environment: BTreeMap<String, String>,
    /// Working directory.
    pub working_directory: PathBuf,
    /// Connection details for remote endpoints.
    pub connection_info: Option<ConnectionInfo>,
    /// When the session was registered.
    pub created_at: SystemTime,
    /// When the session was last registered or updated.
    pub last_activity: SystemTime,
}

impl Session {
    /// Check if the session has the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Check if the session accepts broadcasts.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Fields for registering a new session.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    /// Human-readable name.
    pub name: String,
    /// Endpoint kind.
    pub session_type: SessionType,
    /// Initial status.
    pub status: SessionStatus,
    /// Tags.
    pub tags: BTreeSet<String>,
    /// Environment variables.
    pub environment: BTreeMap<String, String>,
    /// Working directory.
    pub working_directory: PathBuf,
    /// Connection details.
    pub connection_info: Option<ConnectionInfo>,
}

impl NewSession {
    /// Create a new active session description.
    #[must_use]
    pub fn new(name: impl Into<String>, session_type: SessionType) -> Self {
        Self {
            name: name.into(),
            session_type,
            working_directory: PathBuf::from("."),
            ..Default::default()
        }
    }

    /// Set the initial status.
    #[must_use]
    pub const fn status(mut self, status: SessionStatus) -> Self {
        self.status = status;
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = path.into();
        self
    }

    /// Set connection details.
    #[must_use]
    pub fn connection(mut self, info: ConnectionInfo) -> Self {
        self.connection_info = Some(info);
        self
    }

    pub(crate) fn into_session(self, id: SessionId, now: SystemTime) -> Session {
        Session {
            id,
            name: self.name,
            session_type: self.session_type,
            status: self.status,
            tags: self.tags,
            environment: self.environment,
            working_directory: self.working_directory,
            connection_info: self.connection_info,
            created_at: now,
            last_activity: now,
        }
    }
}

/// A partial update merged into an existing session.
///
/// Fields left as `None` are untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    /// New name.
    pub name: Option<String>,
    /// New endpoint kind.
    pub session_type: Option<SessionType>,
    /// New status.
    pub status: Option<SessionStatus>,
    /// Replacement tag set.
    pub tags: Option<BTreeSet<String>>,
    /// Replacement environment.
    pub environment: Option<BTreeMap<String, String>>,
    /// New working directory.
    pub working_directory: Option<PathBuf>,
    /// New connection details.
    pub connection_info: Option<ConnectionInfo>,
}

impl SessionUpdate {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the session type.
    #[must_use]
    pub const fn session_type(mut self, session_type: SessionType) -> Self {
        self.session_type = Some(session_type);
        self
    }

    /// Replace the tag set.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the environment.
    #[must_use]
    pub fn environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Set connection details.
    #[must_use]
    pub fn connection(mut self, info: ConnectionInfo) -> Self {
        self.connection_info = Some(info);
        self
    }

    pub(crate) fn apply(self, session: &mut Session, now: SystemTime) {
        if let Some(name) = self.name {
            session.name = name;
        }
        if let Some(session_type) = self.session_type {
            session.session_type = session_type;
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(tags) = self.tags {
            session.tags = tags;
        }
        if let Some(environment) = self.environment {
            session.environment = environment;
        }
        if let Some(dir) = self.working_directory {
            session.working_directory = dir;
        }
        if let Some(info) = self.connection_info {
            session.connection_info = Some(info);
        }
        session.last_activity = now;
    }
}
