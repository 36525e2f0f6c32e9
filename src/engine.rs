//! Protocol engine interface
//!
//! The MSTP state machines live outside this crate, behind [`MstpEngine`].
//! The tracker feeds it lifecycle, link-state and data-plane input; the
//! engine's side effects come back as [`EngineAction`] values which the
//! tracker applies after the call returns, so the engine can never re-enter
//! the registry mid-operation.
//!
//! Bridges are identified by their OS interface index, ports by
//! `(bridge index, port interface index)`, and trees by host-order MSTID.

use crate::error::MstpResult;
use crate::types::{
    CistBridgeConfig, CistBridgeStatus, CistPortConfig, CistPortStatus, MacAddr, MstConfigId,
    MstiBridgeStatus, MstiPortConfig, MstiPortStatus, VID_TABLE_SIZE,
};

/// A side effect requested by the protocol engine.
///
/// These correspond to the engine's downstream calls into the bridging
/// subsystem: forwarding-state changes, FDB flushes, ageing-time updates and
/// BPDU transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAction {
    /// Commit a new forwarding state for a port within one tree. `state` is
    /// a raw driver code (BR_STATE_*); unknown values are coerced to
    /// Disabled by the tracker.
    SetPortState { if_index: i32, mstid: u16, state: u8 },
    /// Flush all filtering entries for the port in every FID mapped to the
    /// tree. Completion is reported back via
    /// [`MstpEngine::all_fids_flushed`].
    FlushAllFids { if_index: i32, mstid: u16 },
    /// Program the bridge ageing time, seconds. Negative means the driver
    /// default.
    SetAgeingTime { br_index: i32, ageing_time: i32 },
    /// Transmit a BPDU on the port. The payload excludes all framing.
    TxBpdu { if_index: i32, payload: Vec<u8> },
}

/// The MSTP protocol engine consumed by the tracker.
///
/// Every mutating call may return follow-up [`EngineAction`]s. Creation
/// calls are fallible; on error the tracker rolls back and nothing is
/// registered. Deletions are not fallible: the entity is going away
/// regardless of what the engine thinks of it.
pub trait MstpEngine: Send + Sync {
    /// Initialize protocol state for a new bridge. Returns the initial MST
    /// configuration identifier.
    fn bridge_create(&mut self, br_index: i32, mac: MacAddr) -> MstpResult<MstConfigId>;

    /// Tear down protocol state for a bridge and all its ports.
    fn bridge_delete(&mut self, br_index: i32) -> Vec<EngineAction>;

    /// Initialize protocol state for a new port and attach it to every tree
    /// of the bridge. Returns the CIST port identifier.
    fn port_create(
        &mut self,
        br_index: i32,
        if_index: i32,
        portno: u16,
        mac: MacAddr,
    ) -> MstpResult<u16>;

    /// Tear down protocol state for a port.
    fn port_delete(&mut self, br_index: i32, if_index: i32) -> Vec<EngineAction>;

    /// The bridge MAC address changed.
    fn set_bridge_address(&mut self, br_index: i32, mac: MacAddr) -> Vec<EngineAction>;

    /// Start or stop the protocol on the bridge.
    fn set_bridge_enable(&mut self, br_index: i32, enabled: bool) -> Vec<EngineAction>;

    /// Port operational change: up/down, speed (Mbps) and duplex (0 = half).
    fn set_port_enable(
        &mut self,
        br_index: i32,
        if_index: i32,
        up: bool,
        speed: u32,
        duplex: u8,
    ) -> Vec<EngineAction>;

    /// A validated BPDU arrived on the port. The payload excludes framing.
    fn rx_bpdu(&mut self, br_index: i32, if_index: i32, payload: &[u8]) -> Vec<EngineAction>;

    /// Per-second protocol tick for one bridge.
    fn one_second(&mut self, br_index: i32) -> Vec<EngineAction>;

    /// Completion signal for an earlier [`EngineAction::FlushAllFids`].
    fn all_fids_flushed(&mut self, br_index: i32, if_index: i32, mstid: u16)
        -> Vec<EngineAction>;

    /// Force a protocol-migration check on the port.
    fn port_mcheck(&mut self, br_index: i32, if_index: i32) -> MstpResult<Vec<EngineAction>>;

    /// Create protocol state for a new MSTI.
    fn create_msti(&mut self, br_index: i32, mstid: u16) -> MstpResult<()>;

    /// Delete protocol state for an MSTI.
    fn delete_msti(&mut self, br_index: i32, mstid: u16) -> MstpResult<Vec<EngineAction>>;

    /// Set the MST configuration name and revision. Returns the full
    /// updated identifier including the recomputed digest.
    fn set_mst_config_id(
        &mut self,
        br_index: i32,
        revision: u16,
        name: &str,
    ) -> MstpResult<MstConfigId>;

    fn get_cist_bridge_status(&self, br_index: i32) -> MstpResult<CistBridgeStatus>;

    fn set_cist_bridge_config(
        &mut self,
        br_index: i32,
        cfg: &CistBridgeConfig,
    ) -> MstpResult<Vec<EngineAction>>;

    fn get_msti_bridge_status(&self, br_index: i32, mstid: u16) -> MstpResult<MstiBridgeStatus>;

    fn set_msti_bridge_config(
        &mut self,
        br_index: i32,
        mstid: u16,
        bridge_priority: u8,
    ) -> MstpResult<Vec<EngineAction>>;

    fn get_cist_port_status(&self, br_index: i32, if_index: i32) -> MstpResult<CistPortStatus>;

    fn set_cist_port_config(
        &mut self,
        br_index: i32,
        if_index: i32,
        cfg: &CistPortConfig,
    ) -> MstpResult<Vec<EngineAction>>;

    fn get_msti_port_status(
        &self,
        br_index: i32,
        if_index: i32,
        mstid: u16,
    ) -> MstpResult<MstiPortStatus>;

    fn set_msti_port_config(
        &mut self,
        br_index: i32,
        if_index: i32,
        mstid: u16,
        cfg: &MstiPortConfig,
    ) -> MstpResult<Vec<EngineAction>>;

    /// Remap one VID to a FID.
    fn set_vid_to_fid(&mut self, br_index: i32, vid: u16, fid: u16)
        -> MstpResult<Vec<EngineAction>>;

    /// Remap one FID to an MSTID.
    fn set_fid_to_mstid(
        &mut self,
        br_index: i32,
        fid: u16,
        mstid: u16,
    ) -> MstpResult<Vec<EngineAction>>;

    /// Replace the whole VID-to-FID table. Entries are host order.
    fn set_all_vids_to_fids(
        &mut self,
        br_index: i32,
        table: &[u16; VID_TABLE_SIZE],
    ) -> MstpResult<Vec<EngineAction>>;

    /// Replace the whole FID-to-MSTID table. Entries are host order.
    fn set_all_fids_to_mstids(
        &mut self,
        br_index: i32,
        table: &[u16; VID_TABLE_SIZE],
    ) -> MstpResult<Vec<EngineAction>>;
}
