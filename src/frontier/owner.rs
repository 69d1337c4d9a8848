use std::fmt;
use uuid::Uuid;

/// Identity written into `locked_by` for every record a claim reserves
///
/// Generated tokens combine the host name, the process id and a random
/// nonce, so two claim attempts never share one, even inside one process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerToken(String);

impl OwnerToken {
    /// Generates a fresh token for one claim attempt
    pub fn generate() -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "unknown-host".to_string());

        Self(format!("{}:{}:{}", host, std::process::id(), Uuid::new_v4()))
    }

    /// Wraps an existing token, e.g. one read back from storage
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
