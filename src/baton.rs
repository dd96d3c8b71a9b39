//! Session baton handed out by the pipeline gateway.

/// Opaque session token. Sending it back with the next request keeps the
/// gateway-side SQL session (current database, open transaction) alive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Baton(pub String);

impl Baton {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
