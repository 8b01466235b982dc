//! Connection identifiers.

use std::fmt;

use uuid::Uuid;

/// Opaque key for one live transport connection, `conn_<uuid v7>`.
///
/// Minted by the registry; never reused while the process runs.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub(crate) fn new() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }

    /// Borrow the id text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
