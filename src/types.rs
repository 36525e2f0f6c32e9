//! Shared data types for the bridge/MSTP adapter
//!
//! MAC address handling, per-tree port states and roles, and the typed
//! status/config records exchanged with control front-ends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Octets in a MAC address
pub const ETH_ALEN: usize = 6;

/// Highest valid bridge-relative port number (12-bit per IEEE 802.1Q)
pub const MAX_PORT_NUMBER: u16 = 4095;

/// Number of VID and FID table entries
pub const VID_TABLE_SIZE: usize = 4096;

/// A six-octet IEEE 802 MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; ETH_ALEN]);

impl MacAddr {
    /// Construct from a byte slice.
    ///
    /// # Panics
    /// Panics if `data` is not six octets long.
    pub fn from_bytes(data: &[u8]) -> MacAddr {
        let mut bytes = [0; ETH_ALEN];
        bytes.copy_from_slice(data);
        MacAddr(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// An 8-octet bridge identifier (priority + system ID extension + MAC)
pub type BridgeIdentifier = [u8; 8];

/// Forwarding state of a port within one spanning tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortState {
    Disabled,
    Listening,
    Learning,
    Forwarding,
    Blocking,
}

impl PortState {
    /// Decode a kernel/driver state code (BR_STATE_*). Unknown codes map to None.
    pub fn from_raw(raw: u8) -> Option<PortState> {
        match raw {
            0 => Some(PortState::Disabled),
            1 => Some(PortState::Listening),
            2 => Some(PortState::Learning),
            3 => Some(PortState::Forwarding),
            4 => Some(PortState::Blocking),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PortState::Disabled => "disabled",
            PortState::Listening => "listening",
            PortState::Learning => "learning",
            PortState::Forwarding => "forwarding",
            PortState::Blocking => "blocking",
        }
    }
}

/// Role of a port within one spanning tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortRole {
    Disabled,
    Alternate,
    Backup,
    Root,
    Designated,
    Master,
}

/// Spanning-tree protocol variant the bridge speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersion {
    Stp,
    Rstp,
    Mstp,
}

/// MST configuration identifier (802.1Q 13.7)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MstConfigId {
    /// Configuration name, at most 32 bytes
    pub name: String,
    /// Revision level
    pub revision: u16,
    /// HMAC-MD5 digest over the FID-to-MSTID mapping
    pub digest: [u8; 16],
}

impl Default for MstConfigId {
    fn default() -> Self {
        Self {
            name: String::new(),
            revision: 0,
            digest: [0; 16],
        }
    }
}

/// CIST-wide bridge status as reported by the protocol engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CistBridgeStatus {
    /// This bridge's identifier
    pub bridge_id: BridgeIdentifier,
    /// Identifier of the CIST root bridge
    pub designated_root: BridgeIdentifier,
    /// Identifier of the regional root bridge
    pub regional_root: BridgeIdentifier,
    /// External path cost to the CIST root
    pub root_path_cost: u32,
    /// Internal path cost to the regional root
    pub internal_path_cost: u32,
    /// Port identifier of the current root port (0 if this bridge is root)
    pub root_port_id: u16,
    /// Operational max age, seconds
    pub max_age: u32,
    /// Operational hello time, seconds
    pub hello_time: u32,
    /// Operational forward delay, seconds
    pub forward_delay: u32,
    /// Remaining-hops limit
    pub max_hops: u8,
    /// Whether a topology change is in progress
    pub topology_change: bool,
    /// Number of topology changes seen
    pub topology_change_count: u32,
    /// Seconds since the last topology change
    pub time_since_topology_change: u32,
    /// Whether the protocol is running on this bridge
    pub enabled: bool,
}

/// CIST-wide bridge configuration; only set fields are applied
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CistBridgeConfig {
    pub bridge_forward_delay: Option<u32>,
    pub bridge_max_age: Option<u32>,
    pub bridge_hello_time: Option<u32>,
    pub max_hops: Option<u8>,
    pub tx_hold_count: Option<u8>,
    pub protocol_version: Option<ProtocolVersion>,
}

/// Per-MSTI bridge status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MstiBridgeStatus {
    pub bridge_id: BridgeIdentifier,
    pub regional_root: BridgeIdentifier,
    pub internal_path_cost: u32,
    pub root_port_id: u16,
}

/// CIST port status as reported by the protocol engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CistPortStatus {
    /// Port identifier (priority nibble + port number)
    pub port_id: u16,
    pub state: PortState,
    pub role: PortRole,
    pub external_port_path_cost: u32,
    pub internal_port_path_cost: u32,
    pub designated_bridge: BridgeIdentifier,
    pub designated_port: u16,
    /// Operational edge-port status
    pub oper_edge_port: bool,
    /// Operational point-to-point status
    pub oper_p2p: bool,
    /// Whether the port has detected a legacy STP neighbor
    pub sends_stp: bool,
}

/// CIST port configuration; only set fields are applied
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CistPortConfig {
    pub admin_external_port_path_cost: Option<u32>,
    pub admin_internal_port_path_cost: Option<u32>,
    pub port_priority: Option<u8>,
    pub admin_edge_port: Option<bool>,
    pub auto_edge_port: Option<bool>,
    pub admin_p2p: Option<bool>,
    pub restricted_role: Option<bool>,
    pub restricted_tcn: Option<bool>,
}

/// Per-MSTI port status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MstiPortStatus {
    pub port_id: u16,
    pub state: PortState,
    pub role: PortRole,
    pub internal_port_path_cost: u32,
    pub designated_bridge: BridgeIdentifier,
    pub designated_port: u16,
    pub disputed: bool,
}

/// Per-MSTI port configuration; only set fields are applied
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MstiPortConfig {
    pub admin_internal_port_path_cost: Option<u32>,
    pub port_priority: Option<u8>,
}
