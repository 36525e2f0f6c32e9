//! Bridge and port lifecycle tracking
//!
//! [`BridgeTracker`] owns the registry of tracked bridges and translates
//! kernel link notifications into protocol-engine calls. It also carries the
//! data plane: BPDU receive validation and dispatch, BPDU transmit framing,
//! and the per-second protocol tick.
//!
//! The kernel's link stream can drop or reorder events; the translator is
//! written so any single missed event is recoverable from the next one. In
//! particular a port observed under a new master is first evicted from
//! whichever bridge still holds it.

use crate::bpdu;
use crate::bridge::Bridge;
use crate::engine::{EngineAction, MstpEngine};
use crate::error::{MstpError, MstpResult};
use crate::sys::{SysOps, STP_STATE_USER};
use crate::types::{MacAddr, PortState, MAX_PORT_NUMBER};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing::level_filters::LevelFilter;

/// Tracks the local bridges and adapts between the OS bridging subsystem
/// and the MSTP protocol engine.
///
/// All entry points take `&mut self`; embedders share the tracker behind
/// `Arc<tokio::sync::RwLock<_>>` so data-plane events and control requests
/// serialize against each other.
pub struct BridgeTracker {
    pub(crate) bridges: Vec<Bridge>,
    pub(crate) engine: Box<dyn MstpEngine>,
    pub(crate) sys: Arc<dyn SysOps>,
    pub(crate) log_level: LevelFilter,
}

impl BridgeTracker {
    pub fn new(engine: Box<dyn MstpEngine>, sys: Arc<dyn SysOps>) -> Self {
        Self {
            bridges: Vec::new(),
            engine,
            sys,
            log_level: LevelFilter::INFO,
        }
    }

    /// Number of tracked bridges.
    pub fn bridge_count(&self) -> usize {
        self.bridges.len()
    }

    /// Look up a tracked bridge by its OS interface index.
    pub fn find_bridge(&self, if_index: i32) -> Option<&Bridge> {
        self.bridges.iter().find(|b| b.if_index == if_index)
    }

    /// Tracked bridges in insertion order.
    pub fn iter_bridges(&self) -> std::slice::Iter<'_, Bridge> {
        self.bridges.iter()
    }

    fn bridge_pos(&self, if_index: i32) -> Option<usize> {
        self.bridges.iter().position(|b| b.if_index == if_index)
    }

    /// `(bridge, port)` positions of the port with this interface index,
    /// wherever it lives.
    fn locate_port(&self, if_index: i32) -> Option<(usize, usize)> {
        for (bi, br) in self.bridges.iter().enumerate() {
            if let Some(pi) = br.ports.iter().position(|p| p.if_index == if_index) {
                return Some((bi, pi));
            }
        }
        None
    }

    async fn create_bridge(&mut self, if_index: i32) -> MstpResult<usize> {
        let name = self.sys.if_index_to_name(if_index).await?;
        let mac = self.sys.hwaddr(&name).await?;
        info!("Add bridge {}", name);
        let mst_config_id = self.engine.bridge_create(if_index, mac)?;
        self.bridges.push(Bridge::new(if_index, name, mac, mst_config_id));
        Ok(self.bridges.len() - 1)
    }

    async fn delete_bridge(&mut self, if_index: i32) -> bool {
        let Some(pos) = self.bridge_pos(if_index) else {
            return false;
        };
        let br = self.bridges.remove(pos);
        info!("Remove bridge {}", br.name);
        let actions = self.engine.bridge_delete(if_index);
        self.apply_actions(actions).await;
        true
    }

    async fn create_port(&mut self, br_pos: usize, if_index: i32) -> MstpResult<()> {
        let name = self.sys.if_index_to_name(if_index).await?;
        let mac = self.sys.hwaddr(&name).await?;
        let portno = match self.sys.bridge_portno(&name).await {
            Ok(n) => n,
            Err(e) => {
                error!("Couldn't get port number for {}: {}", name, e);
                return Err(e);
            }
        };
        if portno <= 0 || portno > MAX_PORT_NUMBER as i32 {
            error!("Port number for {} is invalid ({})", name, portno);
            return Err(MstpError::InvalidParameter(format!(
                "port number {} out of range",
                portno
            )));
        }
        let br_index = self.bridges[br_pos].if_index;
        info!(
            "Add iface {} as port#{} to bridge {}",
            name, portno, self.bridges[br_pos].name
        );
        let cist_port_id = self
            .engine
            .port_create(br_index, if_index, portno as u16, mac)?;
        self.bridges[br_pos].attach_port(if_index, name, mac, portno as u16, cist_port_id);
        Ok(())
    }

    async fn delete_port(&mut self, br_pos: usize, if_index: i32) -> bool {
        let br_index = self.bridges[br_pos].if_index;
        let Some(port) = self.bridges[br_pos].detach_port(if_index) else {
            return false;
        };
        info!("Remove port {} from bridge {}", port.name, self.bridges[br_pos].name);
        let actions = self.engine.port_delete(br_index, if_index);
        self.apply_actions(actions).await;
        true
    }

    /// Process one kernel link notification.
    ///
    /// `br_index == if_index` means the interface is a bridge master;
    /// `br_index >= 0 && br_index != if_index` a slave under that master;
    /// `br_index < 0` an event for an interface with no master.
    pub async fn link_notify(
        &mut self,
        br_index: i32,
        if_index: i32,
        newlink: bool,
        up: bool,
    ) -> MstpResult<()> {
        debug!(
            "link notify: br_index {}, if_index {}, newlink {}, up {}",
            br_index, if_index, newlink, up
        );

        if br_index >= 0 && br_index != if_index {
            return self.slave_notify(br_index, if_index, newlink, up).await;
        }

        if !newlink {
            // DELLINK without a master means the interface unregistered.
            // Clean up either a removed bridge or a removed bridge slave.
            if !self.delete_bridge(if_index).await {
                if let Some((br_pos, _)) = self.locate_port(if_index) {
                    self.delete_port(br_pos, if_index).await;
                }
            }
            return Ok(());
        }

        if br_index == if_index {
            let br_pos = match self.bridge_pos(br_index) {
                Some(pos) => pos,
                None => match self.create_bridge(br_index).await {
                    Ok(pos) => pos,
                    Err(e) => {
                        error!("Couldn't create state for bridge interface {}: {}", br_index, e);
                        return Err(e);
                    }
                },
            };
            self.set_bridge_up(br_pos, up).await;
        }
        Ok(())
    }

    async fn slave_notify(
        &mut self,
        br_index: i32,
        if_index: i32,
        newlink: bool,
        up: bool,
    ) -> MstpResult<()> {
        let br_pos = match self.bridge_pos(br_index) {
            Some(pos) => pos,
            None => match self.create_bridge(br_index).await {
                Ok(pos) => pos,
                Err(e) => {
                    error!("Couldn't create state for bridge interface {}: {}", br_index, e);
                    return Err(e);
                }
            },
        };

        // The slave notification may be the first sign of life from the
        // bridge itself; refresh its link state before touching the port.
        let br_name = self.bridges[br_pos].name.clone();
        match self.sys.ethtool_link(&br_name).await {
            Ok(link) => self.set_bridge_up(br_pos, link).await,
            Err(e) => debug!("Couldn't read link state for {}: {}", br_name, e),
        }

        if self.bridges[br_pos].find_port(if_index).is_none() {
            if !newlink {
                warn!(
                    "Got DELLINK for unknown port {} on bridge {}",
                    if_index, br_index
                );
                return Err(MstpError::PortNotFound {
                    bridge: br_index,
                    port: if_index,
                });
            }
            // The interface may still be registered under another bridge if
            // we missed the notification that moved it away.
            if let Some((other_pos, _)) = self.locate_port(if_index) {
                let other_index = self.bridges[other_pos].if_index;
                self.delete_port(other_pos, if_index).await;
                info!(
                    "Device {} has come to bridge {}. Missed notify for deletion from bridge {}",
                    if_index, br_index, other_index
                );
            }
            if let Err(e) = self.create_port(br_pos, if_index).await {
                error!(
                    "Couldn't create state for interface {} (master {}): {}",
                    if_index, br_index, e
                );
                return Err(e);
            }
        }

        if !newlink {
            self.delete_port(br_pos, if_index).await;
            return Ok(());
        }
        self.set_port_up(br_pos, if_index, up).await;
        Ok(())
    }

    /// Re-read the interface MAC of a bridge; on change store the new value.
    async fn check_bridge_mac(&mut self, br_pos: usize) -> Option<MacAddr> {
        let (name, old) = {
            let br = &self.bridges[br_pos];
            (br.name.clone(), br.mac)
        };
        match self.sys.hwaddr(&name).await {
            Ok(mac) if mac != old => {
                self.bridges[br_pos].mac = mac;
                Some(mac)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Error getting hw address for {}: {}", name, e);
                None
            }
        }
    }

    /// Apply an admin up/down observation to a bridge, re-reading its STP
    /// mode and MAC along the way.
    async fn set_bridge_up(&mut self, br_pos: usize, up: bool) {
        let (br_index, name) = {
            let br = &self.bridges[br_pos];
            (br.if_index, br.name.clone())
        };
        let stp_state = match self.sys.bridge_stp_state(&name).await {
            Ok(v) => v,
            Err(e) => {
                error!("Can't read STP state for {}: {}", name, e);
                0
            }
        };
        let stp_up = stp_state == STP_STATE_USER;

        let (changed, enabled) = {
            let br = &mut self.bridges[br_pos];
            let mut changed = false;
            if br.admin_up != up {
                br.admin_up = up;
                changed = true;
            }
            if br.stp_up != stp_up {
                br.stp_up = stp_up;
                changed = true;
            }
            (changed, br.admin_up && br.stp_up)
        };
        if changed {
            info!(
                "Set bridge {} {} stp {}",
                name,
                if up { "up" } else { "down" },
                if stp_up { "on" } else { "off" }
            );
        }

        // Address change goes out before the enable update so the engine
        // never runs enabled on a stale address.
        if let Some(mac) = self.check_bridge_mac(br_pos).await {
            info!("Bridge {} address changed to {}", name, mac);
            let actions = self.engine.set_bridge_address(br_index, mac);
            self.apply_actions(actions).await;
        }

        if changed {
            let actions = self.engine.set_bridge_enable(br_index, enabled);
            self.apply_actions(actions).await;
        }
    }

    /// Apply a link up/down observation to a port, refreshing MAC and, on
    /// up, speed and duplex.
    async fn set_port_up(&mut self, br_pos: usize, if_index: i32, up: bool) {
        let Some(port_pos) = self.bridges[br_pos]
            .ports
            .iter()
            .position(|p| p.if_index == if_index)
        else {
            return;
        };
        let (br_index, name, old_mac) = {
            let port = &self.bridges[br_pos].ports[port_pos];
            (port.bridge_index, port.name.clone(), port.mac)
        };
        debug!("Port {}: {}", name, if up { "up" } else { "down" });

        match self.sys.hwaddr(&name).await {
            Ok(mac) if mac != old_mac => {
                self.bridges[br_pos].ports[port_pos].mac = mac;
                // The bridge auto-selects its address from its ports, so a
                // port MAC change may move the bridge address too.
                if let Some(br_mac) = self.check_bridge_mac(br_pos).await {
                    let actions = self.engine.set_bridge_address(br_index, br_mac);
                    self.apply_actions(actions).await;
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Error getting hw address for {}: {}", name, e),
        }

        let mut changed = false;
        if !up {
            let port = &mut self.bridges[br_pos].ports[port_pos];
            if port.up {
                port.up = false;
                changed = true;
            }
        } else {
            let (mut speed, mut duplex) = match self.sys.ethtool_speed_duplex(&name).await {
                Ok(v) => v,
                Err(e) => {
                    warn!("Couldn't read speed/duplex for {}: {}", name, e);
                    (-1, -1)
                }
            };
            if speed < 0 {
                speed = 10;
            }
            if duplex < 0 {
                duplex = 0; // assume half duplex
            }
            let port = &mut self.bridges[br_pos].ports[port_pos];
            if port.speed != speed as u32 {
                port.speed = speed as u32;
                changed = true;
            }
            if port.duplex != duplex as u8 {
                port.duplex = duplex as u8;
                changed = true;
            }
            if !port.up {
                port.up = true;
                changed = true;
            }
        }

        if changed {
            let (up, speed, duplex) = {
                let port = &self.bridges[br_pos].ports[port_pos];
                (port.up, port.speed, port.duplex)
            };
            let actions = self.engine.set_port_enable(br_index, if_index, up, speed, duplex);
            self.apply_actions(actions).await;
        }
    }

    /// Validate a received Ethernet+LLC frame and hand its BPDU to the
    /// engine. Frames for unknown or inactive ports are dropped.
    pub async fn rx_frame(&mut self, if_index: i32, frame: &[u8]) {
        debug!("frame rx: ifindex {}, len {}", if_index, frame.len());
        let Some((br_pos, port_pos)) = self.locate_port(if_index) else {
            return;
        };
        {
            let br = &self.bridges[br_pos];
            let port = &br.ports[port_pos];
            if !port.up || !br.stp_up {
                return;
            }
        }
        let Some(payload) = bpdu::validate_frame(frame) else {
            debug!("Dropping invalid BPDU frame on ifindex {}", if_index);
            return;
        };
        let br_index = self.bridges[br_pos].if_index;
        debug!(
            "received {} BPDU on port {}",
            bpdu::bpdu_kind(payload),
            self.bridges[br_pos].ports[port_pos].name
        );
        let actions = self.engine.rx_bpdu(br_index, if_index, payload);
        self.apply_actions(actions).await;
    }

    /// Per-second tick for every tracked bridge, in insertion order.
    pub async fn one_second(&mut self) {
        let indices: Vec<i32> = self.bridges.iter().map(|b| b.if_index).collect();
        for br_index in indices {
            let actions = self.engine.one_second(br_index);
            self.apply_actions(actions).await;
        }
    }

    /// Delete every tracked bridge, notifying the engine for each.
    pub async fn shutdown(&mut self) {
        while let Some(br) = self.bridges.first() {
            let if_index = br.if_index;
            self.delete_bridge(if_index).await;
        }
    }

    /// Apply engine-requested side effects, including any follow-ups
    /// produced while applying them.
    pub(crate) async fn apply_actions(&mut self, actions: Vec<EngineAction>) {
        let mut queue: VecDeque<EngineAction> = actions.into();
        while let Some(action) = queue.pop_front() {
            match action {
                EngineAction::SetPortState { if_index, mstid, state } => {
                    self.commit_port_state(if_index, mstid, state);
                }
                EngineAction::FlushAllFids { if_index, mstid } => {
                    // TODO: drive a real FDB flush through the bridge
                    // driver and complete asynchronously
                    let Some((br_pos, _)) = self.locate_port(if_index) else {
                        debug!("FID flush for unknown port {}", if_index);
                        continue;
                    };
                    let br_index = self.bridges[br_pos].if_index;
                    let more = self.engine.all_fids_flushed(br_index, if_index, mstid);
                    queue.extend(more);
                }
                EngineAction::SetAgeingTime { br_index, ageing_time } => {
                    // TODO: program the ageing time into the bridge driver
                    debug!("Set ageing time on bridge {} to {}", br_index, ageing_time);
                }
                EngineAction::TxBpdu { if_index, payload } => {
                    self.tx_bpdu(if_index, &payload).await;
                }
            }
        }
    }

    /// Record a new forwarding state for `(port, tree)`. Equal states are a
    /// no-op; unknown raw codes fall back to Disabled.
    fn commit_port_state(&mut self, if_index: i32, mstid: u16, raw: u8) {
        let Some((br_pos, port_pos)) = self.locate_port(if_index) else {
            debug!("State change for unknown port {}", if_index);
            return;
        };
        let state = match PortState::from_raw(raw) {
            Some(state) => state,
            None => {
                error!(
                    "Attempt to set invalid state {} on port {} mstid {}",
                    raw, if_index, mstid
                );
                PortState::Disabled
            }
        };
        let port = &mut self.bridges[br_pos].ports[port_pos];
        let name = port.name.clone();
        let Some(ptp) = port.find_tree_mut(mstid.to_be()) else {
            debug!("State change for unknown mstid {} on port {}", mstid, name);
            return;
        };
        if ptp.state == state {
            return;
        }
        // TODO: command the driver to put the br:port:tree into the new state
        ptp.state = state;
        info!("Port {} mstid {} entering {} state", name, mstid, state.as_str());
    }

    /// Frame a BPDU with its LLC header and send it on the port's
    /// interface. Send failures are logged, never retried; the engine owns
    /// retransmission timing.
    async fn tx_bpdu(&mut self, if_index: i32, payload: &[u8]) {
        let Some((br_pos, port_pos)) = self.locate_port(if_index) else {
            debug!("BPDU tx for unknown port {}", if_index);
            return;
        };
        let (mac, name) = {
            let port = &self.bridges[br_pos].ports[port_pos];
            (port.mac, port.name.clone())
        };
        debug!("sending {} BPDU on port {}", bpdu::bpdu_kind(payload), name);
        let header = bpdu::llc_header(mac, payload.len());
        if let Err(e) = self.sys.packet_send(if_index, &[&header[..], payload]).await {
            warn!("Couldn't send BPDU on port {}: {}", name, e);
        }
    }
}
