//! Common type definitions shared by the identity and storage clients.
//!
//! This module defines:
//! - [`Credentials`]: tenant/user/password triple exchanged for a token
//! - [`AuthToken`]: the opaque bearer token returned by the identity endpoint
//! - [`StoredObject`]: what an upload hands back to the caller
//! - [`ObjectDescriptor`]: what a download needs from the caller
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Password credentials scoped to a tenant.
///
/// The password is redacted from `Debug` output so credentials can travel through
/// `#[instrument]`ed functions without ending up in logs. Not serializable; the only wire form is
/// the identity request body built in [`crate::identity`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(tenant_id: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A bearer token issued by the identity endpoint.
///
/// Tokens are fetched per operation and never cached, so the expiry is informational only.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    id: String,
    expires: Option<String>,
}

impl AuthToken {
    pub fn new(id: impl Into<String>, expires: Option<String>) -> Self {
        Self { id: id.into(), expires }
    }

    /// The raw token value, sent as `X-Auth-Token`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expires(&self) -> Option<&str> {
        self.expires.as_deref()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("id", &"<redacted>")
            .field("expires", &self.expires)
            .finish()
    }
}

/// An object that was written to the object store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredObject {
    pub name: String,
    pub address: Url,
}

/// Everything needed to fetch an object back: its local file name and remote address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObjectDescriptor {
    pub name: String,
    pub address: Url,
}

impl ObjectDescriptor {
    pub fn new(name: impl Into<String>, address: Url) -> Self {
        Self { name: name.into(), address }
    }
}

impl From<StoredObject> for ObjectDescriptor {
    fn from(object: StoredObject) -> Self {
        Self {
            name: object.name,
            address: object.address,
        }
    }
}
