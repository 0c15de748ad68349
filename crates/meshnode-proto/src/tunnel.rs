//! Tunnel record types

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transport kind of a configured tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelKind {
    /// Legacy VTun link
    Vtun,
    /// WireGuard link
    Wireguard,
}

/// A configured point-to-point link to another mesh node.
///
/// Records are owned by the repository; the lifecycle manager and the
/// config generators only ever hold transient copies and never write back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tunnel {
    /// Stable unique identifier
    pub id: Uuid,
    /// Remote node hostname (may carry a `:port` suffix)
    pub hostname: String,
    /// IPv4 network base address of the /30 this tunnel occupies,
    /// stored as text and parsed on use
    pub ip: String,
    /// Pre-shared credential material
    pub password: String,
    /// Role: true when this node initiates the link, false when it accepts
    pub client: bool,
    /// Transport kind
    pub kind: TunnelKind,
    /// Timestamp when this record was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Tunnel {
    /// Parse the tunnel's network base address.
    ///
    /// Returns None when the stored text is not a valid IPv4 address;
    /// consumers decide whether that is fatal (config rendering) or
    /// skippable (diagnostics).
    pub fn subnet(&self) -> Option<Ipv4Addr> {
        self.ip.parse().ok()
    }

    /// The subnet with `.` replaced by `-`, used to form unique
    /// per-tunnel config filenames.
    pub fn dashed_subnet(&self) -> String {
        self.ip.replace('.', "-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunnel(ip: &str) -> Tunnel {
        Tunnel {
            id: Uuid::new_v4(),
            hostname: "node-a.mesh".to_string(),
            ip: ip.to_string(),
            password: "secret".to_string(),
            client: true,
            kind: TunnelKind::Wireguard,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_subnet_parses_valid_ipv4() {
        let t = tunnel("10.1.2.0");
        assert_eq!(t.subnet(), Some(Ipv4Addr::new(10, 1, 2, 0)));
    }

    #[test]
    fn test_subnet_rejects_garbage() {
        assert!(tunnel("not-an-ip").subnet().is_none());
        assert!(tunnel("10.1.2").subnet().is_none());
    }

    #[test]
    fn test_dashed_subnet() {
        assert_eq!(tunnel("10.1.2.0").dashed_subnet(), "10-1-2-0");
    }

    #[test]
    fn test_kind_serde_roundtrip() {
        let t = tunnel("10.1.2.0");
        let json = serde_json::to_string(&t).unwrap();
        let back: Tunnel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
