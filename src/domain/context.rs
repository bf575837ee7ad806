//! Per-request inspection context.
//!
//! The context bundles the identifiers a single inspection call can be
//! correlated on. It is owned by the caller, passed by reference into the
//! engine, and lives for exactly one inspection.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Kind of identifier an inspection can be correlated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentifierKind {
    /// Client IP address
    Ip,
    /// Authenticated user id
    User,
    /// Session id
    Session,
}

impl IdentifierKind {
    /// String name of this identifier kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Ip => "ip",
            IdentifierKind::User => "user",
            IdentifierKind::Session => "session",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-mostly bundle of request identifiers for one inspection call.
#[derive(Debug, Clone, Default)]
pub struct InspectionContext {
    /// Client IP address, if known
    pub ip: Option<IpAddr>,
    /// Authenticated user id, if any
    pub user_id: Option<String>,
    /// Session id, if any
    pub session_id: Option<String>,
    /// Matched route name or path
    pub route: Option<String>,
    /// HTTP method
    pub method: Option<String>,
    /// Free-form metadata carried alongside the request
    pub metadata: BTreeMap<String, String>,
}

impl InspectionContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the client IP.
    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Set the user id.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the route name or path.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// All identifiers present on this context, in (kind, value) form.
    ///
    /// Used by the correlation tracker and progressive enforcement to key
    /// their per-identifier state.
    pub fn identifiers(&self) -> Vec<(IdentifierKind, String)> {
        let mut out = Vec::with_capacity(3);
        if let Some(ip) = &self.ip {
            out.push((IdentifierKind::Ip, ip.to_string()));
        }
        if let Some(user) = &self.user_id {
            out.push((IdentifierKind::User, user.clone()));
        }
        if let Some(session) = &self.session_id {
            out.push((IdentifierKind::Session, session.clone()));
        }
        out
    }
}
