//! Shared test fixtures: a scriptable fake of the platform layer and a
//! recording fake of the protocol engine.
#![allow(dead_code)]

use async_trait::async_trait;
use libmstpbridge::engine::{EngineAction, MstpEngine};
use libmstpbridge::error::{MstpError, MstpResult};
use libmstpbridge::sys::SysOps;
use libmstpbridge::tracker::BridgeTracker;
use libmstpbridge::types::{
    CistBridgeConfig, CistBridgeStatus, CistPortConfig, CistPortStatus, MacAddr, MstConfigId,
    MstiBridgeStatus, MstiPortConfig, MstiPortStatus, PortRole, PortState, VID_TABLE_SIZE,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn mac(last: u8) -> MacAddr {
    MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, last])
}

// ---------------------------------------------------------------------------
// Fake platform layer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SysState {
    names: HashMap<i32, String>,
    macs: HashMap<String, MacAddr>,
    links: HashMap<String, bool>,
    speed_duplex: HashMap<String, Option<(i32, i32)>>,
    stp_states: HashMap<String, i32>,
    portnos: HashMap<String, i32>,
    sent: Vec<(i32, Vec<u8>)>,
}

/// In-memory stand-in for sysfs/ethtool/packet-socket access. Interfaces
/// are registered up front; unknown names fail the way a vanished interface
/// would.
#[derive(Default)]
pub struct FakeSys {
    state: Mutex<SysState>,
}

impl FakeSys {
    pub fn new() -> Arc<FakeSys> {
        Arc::new(FakeSys::default())
    }

    /// Register an interface with a name and MAC, link down, 100/full,
    /// STP state 2 (user-space STP) and port number 1.
    pub fn add_iface(&self, if_index: i32, name: &str, mac: MacAddr) {
        let mut s = self.state.lock().unwrap();
        s.names.insert(if_index, name.to_string());
        s.macs.insert(name.to_string(), mac);
        s.links.insert(name.to_string(), false);
        s.speed_duplex.insert(name.to_string(), Some((100, 1)));
        s.stp_states.insert(name.to_string(), 2);
        s.portnos.insert(name.to_string(), 1);
    }

    pub fn remove_iface(&self, if_index: i32) {
        let mut s = self.state.lock().unwrap();
        if let Some(name) = s.names.remove(&if_index) {
            s.macs.remove(&name);
            s.links.remove(&name);
            s.speed_duplex.remove(&name);
            s.stp_states.remove(&name);
            s.portnos.remove(&name);
        }
    }

    pub fn set_mac(&self, name: &str, mac: MacAddr) {
        self.state.lock().unwrap().macs.insert(name.to_string(), mac);
    }

    pub fn set_link(&self, name: &str, up: bool) {
        self.state.lock().unwrap().links.insert(name.to_string(), up);
    }

    pub fn set_speed_duplex(&self, name: &str, speed: i32, duplex: i32) {
        self.state
            .lock()
            .unwrap()
            .speed_duplex
            .insert(name.to_string(), Some((speed, duplex)));
    }

    /// Make ethtool speed/duplex reads fail for the interface.
    pub fn fail_speed_duplex(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .speed_duplex
            .insert(name.to_string(), None);
    }

    pub fn set_stp_state(&self, name: &str, value: i32) {
        self.state
            .lock()
            .unwrap()
            .stp_states
            .insert(name.to_string(), value);
    }

    pub fn set_portno(&self, name: &str, portno: i32) {
        self.state
            .lock()
            .unwrap()
            .portnos
            .insert(name.to_string(), portno);
    }

    /// Frames handed to the packet socket, segments concatenated.
    pub fn sent_frames(&self) -> Vec<(i32, Vec<u8>)> {
        self.state.lock().unwrap().sent.clone()
    }
}

fn query_err(what: &str, name: &str) -> MstpError {
    MstpError::SysQuery {
        what: what.to_string(),
        reason: format!("no such interface: {}", name),
    }
}

#[async_trait]
impl SysOps for FakeSys {
    async fn if_index_to_name(&self, if_index: i32) -> MstpResult<String> {
        self.state
            .lock()
            .unwrap()
            .names
            .get(&if_index)
            .cloned()
            .ok_or_else(|| query_err("if_indextoname", &if_index.to_string()))
    }

    async fn hwaddr(&self, name: &str) -> MstpResult<MacAddr> {
        self.state
            .lock()
            .unwrap()
            .macs
            .get(name)
            .copied()
            .ok_or_else(|| query_err("hwaddr", name))
    }

    async fn ethtool_link(&self, name: &str) -> MstpResult<bool> {
        self.state
            .lock()
            .unwrap()
            .links
            .get(name)
            .copied()
            .ok_or_else(|| query_err("ethtool_link", name))
    }

    async fn ethtool_speed_duplex(&self, name: &str) -> MstpResult<(i32, i32)> {
        self.state
            .lock()
            .unwrap()
            .speed_duplex
            .get(name)
            .copied()
            .flatten()
            .ok_or_else(|| query_err("ethtool_speed_duplex", name))
    }

    async fn bridge_stp_state(&self, name: &str) -> MstpResult<i32> {
        self.state
            .lock()
            .unwrap()
            .stp_states
            .get(name)
            .copied()
            .ok_or_else(|| query_err("stp_state", name))
    }

    async fn bridge_portno(&self, name: &str) -> MstpResult<i32> {
        self.state
            .lock()
            .unwrap()
            .portnos
            .get(name)
            .copied()
            .ok_or_else(|| query_err("bridge_portno", name))
    }

    async fn packet_send(&self, if_index: i32, segments: &[&[u8]]) -> MstpResult<()> {
        let frame: Vec<u8> = segments.concat();
        self.state.lock().unwrap().sent.push((if_index, frame));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording protocol engine
// ---------------------------------------------------------------------------

/// One call observed by the fake engine, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    BridgeCreate { br_index: i32, mac: MacAddr },
    BridgeDelete { br_index: i32 },
    PortCreate { br_index: i32, if_index: i32, portno: u16 },
    PortDelete { br_index: i32, if_index: i32 },
    SetBridgeAddress { br_index: i32, mac: MacAddr },
    SetBridgeEnable { br_index: i32, enabled: bool },
    SetPortEnable { br_index: i32, if_index: i32, up: bool, speed: u32, duplex: u8 },
    RxBpdu { br_index: i32, if_index: i32, payload: Vec<u8> },
    OneSecond { br_index: i32 },
    AllFidsFlushed { br_index: i32, if_index: i32, mstid: u16 },
    PortMcheck { br_index: i32, if_index: i32 },
    CreateMsti { br_index: i32, mstid: u16 },
    DeleteMsti { br_index: i32, mstid: u16 },
    SetMstConfigId { br_index: i32, revision: u16, name: String },
    SetCistBridgeConfig { br_index: i32 },
    SetMstiBridgeConfig { br_index: i32, mstid: u16, bridge_priority: u8 },
    SetCistPortConfig { br_index: i32, if_index: i32 },
    SetMstiPortConfig { br_index: i32, if_index: i32, mstid: u16 },
    SetVidToFid { br_index: i32, vid: u16, fid: u16 },
    SetFidToMstid { br_index: i32, fid: u16, mstid: u16 },
    SetAllVidsToFids { br_index: i32 },
    SetAllFidsToMstids { br_index: i32 },
}

pub struct EngineState {
    pub calls: Vec<EngineCall>,
    pub fail_bridge_create: bool,
    pub fail_port_create: bool,
    /// Actions returned by the next engine call that can produce them,
    /// consumed on use.
    pub next_actions: Vec<EngineAction>,
    pub cist_bridge_status: CistBridgeStatus,
    pub msti_bridge_status: MstiBridgeStatus,
    pub cist_port_status: CistPortStatus,
    pub msti_port_status: MstiPortStatus,
}

impl EngineState {
    pub fn calls_of<F: Fn(&EngineCall) -> bool>(&self, pred: F) -> Vec<EngineCall> {
        self.calls.iter().filter(|c| pred(c)).cloned().collect()
    }
}

pub fn sample_cist_bridge_status() -> CistBridgeStatus {
    CistBridgeStatus {
        bridge_id: [0x80, 0x00, 2, 0, 0, 0, 0, 1],
        designated_root: [0x80, 0x00, 2, 0, 0, 0, 0, 1],
        regional_root: [0x80, 0x00, 2, 0, 0, 0, 0, 1],
        root_path_cost: 0,
        internal_path_cost: 0,
        root_port_id: 0,
        max_age: 20,
        hello_time: 2,
        forward_delay: 15,
        max_hops: 20,
        topology_change: false,
        topology_change_count: 0,
        time_since_topology_change: 0,
        enabled: true,
    }
}

pub fn sample_msti_bridge_status() -> MstiBridgeStatus {
    MstiBridgeStatus {
        bridge_id: [0x80, 0x64, 2, 0, 0, 0, 0, 1],
        regional_root: [0x80, 0x64, 2, 0, 0, 0, 0, 1],
        internal_path_cost: 0,
        root_port_id: 0,
    }
}

pub fn sample_cist_port_status() -> CistPortStatus {
    CistPortStatus {
        port_id: 0x8001,
        state: PortState::Forwarding,
        role: PortRole::Designated,
        external_port_path_cost: 200_000,
        internal_port_path_cost: 200_000,
        designated_bridge: [0x80, 0x00, 2, 0, 0, 0, 0, 1],
        designated_port: 0x8001,
        oper_edge_port: false,
        oper_p2p: true,
        sends_stp: false,
    }
}

pub fn sample_msti_port_status() -> MstiPortStatus {
    MstiPortStatus {
        port_id: 0x8001,
        state: PortState::Forwarding,
        role: PortRole::Designated,
        internal_port_path_cost: 200_000,
        designated_bridge: [0x80, 0x64, 2, 0, 0, 0, 0, 1],
        designated_port: 0x8001,
        disputed: false,
    }
}

/// Records every call and returns scripted actions. Shared state lets the
/// test both steer failures and inspect the call log while the tracker owns
/// the boxed engine.
pub struct RecordingEngine {
    state: Arc<Mutex<EngineState>>,
}

impl RecordingEngine {
    pub fn new() -> (RecordingEngine, Arc<Mutex<EngineState>>) {
        let state = Arc::new(Mutex::new(EngineState {
            calls: Vec::new(),
            fail_bridge_create: false,
            fail_port_create: false,
            next_actions: Vec::new(),
            cist_bridge_status: sample_cist_bridge_status(),
            msti_bridge_status: sample_msti_bridge_status(),
            cist_port_status: sample_cist_port_status(),
            msti_port_status: sample_msti_port_status(),
        }));
        (RecordingEngine { state: state.clone() }, state)
    }

    fn record(&self, call: EngineCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn take_actions(&self) -> Vec<EngineAction> {
        std::mem::take(&mut self.state.lock().unwrap().next_actions)
    }
}

impl MstpEngine for RecordingEngine {
    fn bridge_create(&mut self, br_index: i32, mac: MacAddr) -> MstpResult<MstConfigId> {
        self.record(EngineCall::BridgeCreate { br_index, mac });
        if self.state.lock().unwrap().fail_bridge_create {
            return Err(MstpError::EngineRejected("bridge_create scripted to fail".into()));
        }
        Ok(MstConfigId {
            name: mac.to_string(),
            revision: 0,
            digest: [0; 16],
        })
    }

    fn bridge_delete(&mut self, br_index: i32) -> Vec<EngineAction> {
        self.record(EngineCall::BridgeDelete { br_index });
        self.take_actions()
    }

    fn port_create(
        &mut self,
        br_index: i32,
        if_index: i32,
        portno: u16,
        _mac: MacAddr,
    ) -> MstpResult<u16> {
        self.record(EngineCall::PortCreate { br_index, if_index, portno });
        if self.state.lock().unwrap().fail_port_create {
            return Err(MstpError::EngineRejected("port_create scripted to fail".into()));
        }
        Ok((8 << 12) | portno)
    }

    fn port_delete(&mut self, br_index: i32, if_index: i32) -> Vec<EngineAction> {
        self.record(EngineCall::PortDelete { br_index, if_index });
        self.take_actions()
    }

    fn set_bridge_address(&mut self, br_index: i32, mac: MacAddr) -> Vec<EngineAction> {
        self.record(EngineCall::SetBridgeAddress { br_index, mac });
        self.take_actions()
    }

    fn set_bridge_enable(&mut self, br_index: i32, enabled: bool) -> Vec<EngineAction> {
        self.record(EngineCall::SetBridgeEnable { br_index, enabled });
        self.take_actions()
    }

    fn set_port_enable(
        &mut self,
        br_index: i32,
        if_index: i32,
        up: bool,
        speed: u32,
        duplex: u8,
    ) -> Vec<EngineAction> {
        self.record(EngineCall::SetPortEnable { br_index, if_index, up, speed, duplex });
        self.take_actions()
    }

    fn rx_bpdu(&mut self, br_index: i32, if_index: i32, payload: &[u8]) -> Vec<EngineAction> {
        self.record(EngineCall::RxBpdu {
            br_index,
            if_index,
            payload: payload.to_vec(),
        });
        self.take_actions()
    }

    fn one_second(&mut self, br_index: i32) -> Vec<EngineAction> {
        self.record(EngineCall::OneSecond { br_index });
        self.take_actions()
    }

    fn all_fids_flushed(
        &mut self,
        br_index: i32,
        if_index: i32,
        mstid: u16,
    ) -> Vec<EngineAction> {
        self.record(EngineCall::AllFidsFlushed { br_index, if_index, mstid });
        Vec::new()
    }

    fn port_mcheck(&mut self, br_index: i32, if_index: i32) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::PortMcheck { br_index, if_index });
        Ok(self.take_actions())
    }

    fn create_msti(&mut self, br_index: i32, mstid: u16) -> MstpResult<()> {
        self.record(EngineCall::CreateMsti { br_index, mstid });
        Ok(())
    }

    fn delete_msti(&mut self, br_index: i32, mstid: u16) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::DeleteMsti { br_index, mstid });
        Ok(self.take_actions())
    }

    fn set_mst_config_id(
        &mut self,
        br_index: i32,
        revision: u16,
        name: &str,
    ) -> MstpResult<MstConfigId> {
        self.record(EngineCall::SetMstConfigId {
            br_index,
            revision,
            name: name.to_string(),
        });
        Ok(MstConfigId {
            name: name.to_string(),
            revision,
            digest: [0xab; 16],
        })
    }

    fn get_cist_bridge_status(&self, _br_index: i32) -> MstpResult<CistBridgeStatus> {
        Ok(self.state.lock().unwrap().cist_bridge_status.clone())
    }

    fn set_cist_bridge_config(
        &mut self,
        br_index: i32,
        _cfg: &CistBridgeConfig,
    ) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::SetCistBridgeConfig { br_index });
        Ok(self.take_actions())
    }

    fn get_msti_bridge_status(
        &self,
        _br_index: i32,
        _mstid: u16,
    ) -> MstpResult<MstiBridgeStatus> {
        Ok(self.state.lock().unwrap().msti_bridge_status.clone())
    }

    fn set_msti_bridge_config(
        &mut self,
        br_index: i32,
        mstid: u16,
        bridge_priority: u8,
    ) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::SetMstiBridgeConfig { br_index, mstid, bridge_priority });
        Ok(self.take_actions())
    }

    fn get_cist_port_status(&self, _br_index: i32, _if_index: i32) -> MstpResult<CistPortStatus> {
        Ok(self.state.lock().unwrap().cist_port_status.clone())
    }

    fn set_cist_port_config(
        &mut self,
        br_index: i32,
        if_index: i32,
        _cfg: &CistPortConfig,
    ) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::SetCistPortConfig { br_index, if_index });
        Ok(self.take_actions())
    }

    fn get_msti_port_status(
        &self,
        _br_index: i32,
        _if_index: i32,
        _mstid: u16,
    ) -> MstpResult<MstiPortStatus> {
        Ok(self.state.lock().unwrap().msti_port_status.clone())
    }

    fn set_msti_port_config(
        &mut self,
        br_index: i32,
        if_index: i32,
        mstid: u16,
        _cfg: &MstiPortConfig,
    ) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::SetMstiPortConfig { br_index, if_index, mstid });
        Ok(self.take_actions())
    }

    fn set_vid_to_fid(
        &mut self,
        br_index: i32,
        vid: u16,
        fid: u16,
    ) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::SetVidToFid { br_index, vid, fid });
        Ok(self.take_actions())
    }

    fn set_fid_to_mstid(
        &mut self,
        br_index: i32,
        fid: u16,
        mstid: u16,
    ) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::SetFidToMstid { br_index, fid, mstid });
        Ok(self.take_actions())
    }

    fn set_all_vids_to_fids(
        &mut self,
        br_index: i32,
        _table: &[u16; VID_TABLE_SIZE],
    ) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::SetAllVidsToFids { br_index });
        Ok(self.take_actions())
    }

    fn set_all_fids_to_mstids(
        &mut self,
        br_index: i32,
        _table: &[u16; VID_TABLE_SIZE],
    ) -> MstpResult<Vec<EngineAction>> {
        self.record(EngineCall::SetAllFidsToMstids { br_index });
        Ok(self.take_actions())
    }
}

// ---------------------------------------------------------------------------
// Test bed
// ---------------------------------------------------------------------------

pub struct TestBed {
    pub tracker: BridgeTracker,
    pub sys: Arc<FakeSys>,
    pub engine: Arc<Mutex<EngineState>>,
}

/// A tracker wired to fresh fakes.
pub fn testbed() -> TestBed {
    init_tracing();
    let sys = FakeSys::new();
    let (engine, state) = RecordingEngine::new();
    let tracker = BridgeTracker::new(Box::new(engine), sys.clone());
    TestBed {
        tracker,
        sys,
        engine: state,
    }
}

/// A bed with bridge `br0` (index 10) already created and up with STP on,
/// and interface `eth0` (index 11) registered but not yet enslaved.
pub async fn bed_with_bridge() -> TestBed {
    let mut bed = testbed();
    bed.sys.add_iface(10, "br0", mac(1));
    bed.sys.set_link("br0", true);
    bed.sys.add_iface(11, "eth0", mac(2));
    bed.tracker.link_notify(10, 10, true, true).await.unwrap();
    bed
}
