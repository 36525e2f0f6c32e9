//! libmstpbridge - MSTP bridge tracking and I/O adapter
//!
//! Connects an MSTP protocol engine (IEEE 802.1Q-2005, clause 13) to the
//! Linux bridging subsystem:
//! - Bridge/port lifecycle tracking driven by kernel link notifications
//! - BPDU receive validation and transmit framing (802.1D LLC)
//! - Per-second protocol tick
//! - Control-plane API for CIST/MSTI bridge and port parameters
//!
//! The protocol engine, the netlink listener, the packet socket and the
//! sysfs/ethtool plumbing all sit behind traits ([`MstpEngine`],
//! [`SysOps`]); this crate owns the registry, the event translation and
//! the wire framing between them.

pub mod error;
pub mod types;
pub mod bridge;
pub mod engine;
pub mod sys;
pub mod bpdu;
pub mod tracker;
pub mod ctl;
pub mod dispatch;

// Re-export commonly used types
pub use error::{MstpError, MstpResult};
pub use types::{
    BridgeIdentifier, CistBridgeConfig, CistBridgeStatus, CistPortConfig, CistPortStatus,
    MacAddr, MstConfigId, MstiBridgeStatus, MstiPortConfig, MstiPortStatus, PortRole, PortState,
    ProtocolVersion, ETH_ALEN, MAX_PORT_NUMBER, VID_TABLE_SIZE,
};
pub use bridge::{Bridge, PerTreePort, Port, Tree};
pub use engine::{EngineAction, MstpEngine};
pub use sys::{SysOps, STP_STATE_USER};
pub use bpdu::{
    BRIDGE_GROUP_ADDRESS, ETH_DATA_LEN, ETH_HLEN, LLC_FRAME_HLEN, LLC_PDU_LEN_U, LLC_PDU_TYPE_U,
    LLC_SAP_BSPAN,
};
pub use tracker::BridgeTracker;
pub use ctl::{CONFIG_NAME_MAX, MAX_MSTID};
pub use dispatch::{BridgeEvent, EventDispatcher};
