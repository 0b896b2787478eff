//! Relay descriptors: what the relay service hands back and what the
//! transport is configured with.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a relay allocation owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationId(pub String);

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection parameters the transport needs to reach a relay server.
///
/// Opaque to Lobbyforge: it is produced by the relay service and passed
/// unchanged to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayServerData {
    pub allocation_id: AllocationId,
    pub endpoint: String,
    pub connection_data: Vec<u8>,
    pub key: Vec<u8>,
    /// Secure transport protocol name, e.g. `"dtls"`.
    pub protocol: String,
}

/// A fresh host-side allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAllocation {
    pub allocation_id: AllocationId,
    pub server: RelayServerData,
}

/// A relay region the host may pin its allocation to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub description: String,
}
