//! Instance identity token.
//!
//! Each running copy of the application generates one [`InstanceId`] at
//! startup.  It names the heartbeat descriptor file and lets an instance
//! recognize (and ignore) its own published state during discovery, so a
//! process never reports itself as a peer.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique token identifying one running instance of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generates a fresh random identity.  Called once per process.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_distinct_ids() {
        assert_ne!(InstanceId::generate(), InstanceId::generate());
    }

    #[test]
    fn test_display_parse_round_trip() {
        let id = InstanceId::generate();
        let parsed: InstanceId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("not-a-uuid".parse::<InstanceId>().is_err());
    }
}
