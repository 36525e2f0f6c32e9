//! Control-plane surface
//!
//! Typed request handlers for an external controller: status and
//! configuration of the CIST and of each MSTI, at bridge and port scope,
//! plus MSTI lifecycle, the MST configuration identifier, the VID/FID
//! tables and the log level. Every handler resolves its target
//! (bridge, port, tree) in the registry, then forwards to the protocol
//! engine; lookup misses log and fail without side effects.
//!
//! MSTIDs are host order here and converted to the model's network byte
//! order at this boundary.

use crate::bridge::{Bridge, CIST_MSTID_BE};
use crate::error::{MstpError, MstpResult};
use crate::tracker::BridgeTracker;
use crate::types::{
    CistBridgeConfig, CistBridgeStatus, CistPortConfig, CistPortStatus, MstConfigId,
    MstiBridgeStatus, MstiPortConfig, MstiPortStatus, VID_TABLE_SIZE,
};
use tracing::{debug, error, info};
use tracing::level_filters::LevelFilter;

/// Highest MSTID a control request may create
pub const MAX_MSTID: u16 = 4094;

/// Longest MST configuration name, bytes
pub const CONFIG_NAME_MAX: usize = 32;

fn root_port_name(br: &Bridge, mstid_be: u16, root_port_id: u16) -> String {
    for port in &br.ports {
        if let Some(ptp) = port.find_tree(mstid_be) {
            if ptp.port_id == root_port_id {
                return port.name.clone();
            }
        }
    }
    String::new()
}

impl BridgeTracker {
    fn ctl_bridge(&self, br_index: i32) -> MstpResult<&Bridge> {
        self.find_bridge(br_index).ok_or_else(|| {
            error!("Couldn't find bridge with index {}", br_index);
            MstpError::BridgeNotFound(br_index)
        })
    }

    fn ctl_port(&self, br_index: i32, port_index: i32) -> MstpResult<()> {
        let br = self.ctl_bridge(br_index)?;
        if br.find_port(port_index).is_none() {
            error!(
                "Couldn't find port with index {} on bridge {}",
                port_index, br.name
            );
            return Err(MstpError::PortNotFound {
                bridge: br_index,
                port: port_index,
            });
        }
        Ok(())
    }

    fn ctl_tree(&self, br_index: i32, mstid: u16) -> MstpResult<()> {
        let br = self.ctl_bridge(br_index)?;
        if !br.has_tree(mstid.to_be()) {
            error!("Couldn't find MSTI with ID {} on bridge {}", mstid, br.name);
            return Err(MstpError::TreeNotFound {
                bridge: br_index,
                mstid,
            });
        }
        Ok(())
    }

    fn ctl_tree_port(&self, br_index: i32, port_index: i32, mstid: u16) -> MstpResult<()> {
        let br = self.ctl_bridge(br_index)?;
        let Some(port) = br.find_port(port_index) else {
            error!(
                "Couldn't find port with index {} on bridge {}",
                port_index, br.name
            );
            return Err(MstpError::PortNotFound {
                bridge: br_index,
                port: port_index,
            });
        };
        if port.find_tree(mstid.to_be()).is_none() {
            error!(
                "Couldn't find MSTI with ID {} on port {}",
                mstid, port.name
            );
            return Err(MstpError::TreePortNotFound {
                bridge: br_index,
                port: port_index,
                mstid,
            });
        }
        Ok(())
    }

    /// CIST bridge status plus the name of the current root port
    /// (empty when this bridge is the root).
    pub fn get_cist_bridge_status(
        &self,
        br_index: i32,
    ) -> MstpResult<(CistBridgeStatus, String)> {
        let br = self.ctl_bridge(br_index)?;
        let status = self.engine.get_cist_bridge_status(br_index)?;
        let root_port = root_port_name(br, CIST_MSTID_BE, status.root_port_id);
        Ok((status, root_port))
    }

    /// Per-MSTI bridge status plus the name of that tree's root port.
    pub fn get_msti_bridge_status(
        &self,
        br_index: i32,
        mstid: u16,
    ) -> MstpResult<(MstiBridgeStatus, String)> {
        self.ctl_tree(br_index, mstid)?;
        let br = self.ctl_bridge(br_index)?;
        let status = self.engine.get_msti_bridge_status(br_index, mstid)?;
        let root_port = root_port_name(br, mstid.to_be(), status.root_port_id);
        Ok((status, root_port))
    }

    pub async fn set_cist_bridge_config(
        &mut self,
        br_index: i32,
        cfg: &CistBridgeConfig,
    ) -> MstpResult<()> {
        self.ctl_bridge(br_index)?;
        let actions = self.engine.set_cist_bridge_config(br_index, cfg)?;
        self.apply_actions(actions).await;
        Ok(())
    }

    pub async fn set_msti_bridge_config(
        &mut self,
        br_index: i32,
        mstid: u16,
        bridge_priority: u8,
    ) -> MstpResult<()> {
        self.ctl_tree(br_index, mstid)?;
        let actions = self
            .engine
            .set_msti_bridge_config(br_index, mstid, bridge_priority)?;
        self.apply_actions(actions).await;
        Ok(())
    }

    pub fn get_cist_port_status(
        &self,
        br_index: i32,
        port_index: i32,
    ) -> MstpResult<CistPortStatus> {
        self.ctl_port(br_index, port_index)?;
        self.engine.get_cist_port_status(br_index, port_index)
    }

    pub fn get_msti_port_status(
        &self,
        br_index: i32,
        port_index: i32,
        mstid: u16,
    ) -> MstpResult<MstiPortStatus> {
        self.ctl_tree_port(br_index, port_index, mstid)?;
        self.engine.get_msti_port_status(br_index, port_index, mstid)
    }

    pub async fn set_cist_port_config(
        &mut self,
        br_index: i32,
        port_index: i32,
        cfg: &CistPortConfig,
    ) -> MstpResult<()> {
        self.ctl_port(br_index, port_index)?;
        let actions = self.engine.set_cist_port_config(br_index, port_index, cfg)?;
        self.apply_actions(actions).await;
        self.refresh_port_id(br_index, port_index, 0);
        Ok(())
    }

    pub async fn set_msti_port_config(
        &mut self,
        br_index: i32,
        port_index: i32,
        mstid: u16,
        cfg: &MstiPortConfig,
    ) -> MstpResult<()> {
        self.ctl_tree_port(br_index, port_index, mstid)?;
        let actions = self
            .engine
            .set_msti_port_config(br_index, port_index, mstid, cfg)?;
        self.apply_actions(actions).await;
        self.refresh_port_id(br_index, port_index, mstid);
        Ok(())
    }

    /// A priority write moves the port identifier; pull the current value
    /// back from the engine so root-port resolution keeps matching.
    fn refresh_port_id(&mut self, br_index: i32, port_index: i32, mstid: u16) {
        let port_id = if mstid == 0 {
            self.engine
                .get_cist_port_status(br_index, port_index)
                .map(|s| s.port_id)
        } else {
            self.engine
                .get_msti_port_status(br_index, port_index, mstid)
                .map(|s| s.port_id)
        };
        let Ok(port_id) = port_id else {
            debug!(
                "Couldn't refresh port id for port {} mstid {}",
                port_index, mstid
            );
            return;
        };
        if let Some(br) = self.bridges.iter_mut().find(|b| b.if_index == br_index) {
            if let Some(port) = br.find_port_mut(port_index) {
                if let Some(ptp) = port.find_tree_mut(mstid.to_be()) {
                    ptp.port_id = port_id;
                }
            }
        }
    }

    /// Force a protocol-migration check on the port.
    pub async fn port_mcheck(&mut self, br_index: i32, port_index: i32) -> MstpResult<()> {
        self.ctl_port(br_index, port_index)?;
        let actions = self.engine.port_mcheck(br_index, port_index)?;
        self.apply_actions(actions).await;
        Ok(())
    }

    /// All MSTIDs on the bridge, host order, CIST included.
    pub fn get_mstilist(&self, br_index: i32) -> MstpResult<Vec<u16>> {
        let br = self.ctl_bridge(br_index)?;
        Ok(br.trees.iter().map(|t| u16::from_be(t.mstid_be)).collect())
    }

    /// Create an MSTI. Creating one that already exists succeeds without
    /// side effects.
    pub async fn create_msti(&mut self, br_index: i32, mstid: u16) -> MstpResult<()> {
        self.ctl_bridge(br_index)?;
        if mstid == 0 || mstid > MAX_MSTID {
            error!("MSTID {} is out of range on bridge {}", mstid, br_index);
            return Err(MstpError::InvalidParameter(format!(
                "MSTID {} out of range",
                mstid
            )));
        }
        if self.ctl_bridge(br_index)?.has_tree(mstid.to_be()) {
            return Ok(());
        }
        self.engine.create_msti(br_index, mstid)?;
        if let Some(br) = self.bridges.iter_mut().find(|b| b.if_index == br_index) {
            info!("Create MSTI {} on bridge {}", mstid, br.name);
            br.add_tree(mstid.to_be());
        }
        Ok(())
    }

    /// Delete an MSTI and its per-tree port entries. The CIST cannot be
    /// deleted.
    pub async fn delete_msti(&mut self, br_index: i32, mstid: u16) -> MstpResult<()> {
        if mstid == 0 {
            error!("Refusing to delete the CIST on bridge {}", br_index);
            return Err(MstpError::InvalidParameter(
                "the CIST cannot be deleted".to_string(),
            ));
        }
        self.ctl_tree(br_index, mstid)?;
        let actions = self.engine.delete_msti(br_index, mstid)?;
        if let Some(br) = self.bridges.iter_mut().find(|b| b.if_index == br_index) {
            info!("Delete MSTI {} from bridge {}", mstid, br.name);
            br.remove_tree(mstid.to_be());
        }
        self.apply_actions(actions).await;
        Ok(())
    }

    pub fn get_mst_config_id(&self, br_index: i32) -> MstpResult<MstConfigId> {
        Ok(self.ctl_bridge(br_index)?.mst_config_id.clone())
    }

    pub fn set_mst_config_id(
        &mut self,
        br_index: i32,
        revision: u16,
        name: &str,
    ) -> MstpResult<()> {
        self.ctl_bridge(br_index)?;
        if name.len() > CONFIG_NAME_MAX {
            error!("MST configuration name '{}' is too long", name);
            return Err(MstpError::InvalidParameter(format!(
                "configuration name longer than {} bytes",
                CONFIG_NAME_MAX
            )));
        }
        let id = self.engine.set_mst_config_id(br_index, revision, name)?;
        if let Some(br) = self.bridges.iter_mut().find(|b| b.if_index == br_index) {
            br.mst_config_id = id;
        }
        Ok(())
    }

    /// The whole VID-to-FID table, host order.
    pub fn get_vids2fids(&self, br_index: i32) -> MstpResult<Vec<u16>> {
        Ok(self.ctl_bridge(br_index)?.vid2fid.to_vec())
    }

    /// The whole FID-to-MSTID table, converted to host order per entry.
    pub fn get_fids2mstids(&self, br_index: i32) -> MstpResult<Vec<u16>> {
        Ok(self
            .ctl_bridge(br_index)?
            .fid2mstid
            .iter()
            .map(|&m| u16::from_be(m))
            .collect())
    }

    pub async fn set_vid2fid(&mut self, br_index: i32, vid: u16, fid: u16) -> MstpResult<()> {
        self.ctl_bridge(br_index)?;
        if vid as usize >= VID_TABLE_SIZE || fid as usize >= VID_TABLE_SIZE {
            return Err(MstpError::InvalidParameter(format!(
                "VID {} or FID {} out of range",
                vid, fid
            )));
        }
        let actions = self.engine.set_vid_to_fid(br_index, vid, fid)?;
        if let Some(br) = self.bridges.iter_mut().find(|b| b.if_index == br_index) {
            br.vid2fid[vid as usize] = fid;
        }
        self.apply_actions(actions).await;
        Ok(())
    }

    pub async fn set_fid2mstid(&mut self, br_index: i32, fid: u16, mstid: u16) -> MstpResult<()> {
        self.ctl_bridge(br_index)?;
        if fid as usize >= VID_TABLE_SIZE {
            return Err(MstpError::InvalidParameter(format!(
                "FID {} out of range",
                fid
            )));
        }
        let actions = self.engine.set_fid_to_mstid(br_index, fid, mstid)?;
        if let Some(br) = self.bridges.iter_mut().find(|b| b.if_index == br_index) {
            br.fid2mstid[fid as usize] = mstid.to_be();
        }
        self.apply_actions(actions).await;
        Ok(())
    }

    /// Replace the whole VID-to-FID table; entries are stored as given.
    pub async fn set_vids2fids(
        &mut self,
        br_index: i32,
        table: &[u16; VID_TABLE_SIZE],
    ) -> MstpResult<()> {
        self.ctl_bridge(br_index)?;
        let actions = self.engine.set_all_vids_to_fids(br_index, table)?;
        if let Some(br) = self.bridges.iter_mut().find(|b| b.if_index == br_index) {
            br.vid2fid.copy_from_slice(table);
        }
        self.apply_actions(actions).await;
        Ok(())
    }

    /// Replace the whole FID-to-MSTID table; entries are host order on the
    /// way in and stored in network byte order.
    pub async fn set_fids2mstids(
        &mut self,
        br_index: i32,
        table: &[u16; VID_TABLE_SIZE],
    ) -> MstpResult<()> {
        self.ctl_bridge(br_index)?;
        let actions = self.engine.set_all_fids_to_mstids(br_index, table)?;
        if let Some(br) = self.bridges.iter_mut().find(|b| b.if_index == br_index) {
            for (slot, &mstid) in br.fid2mstid.iter_mut().zip(table.iter()) {
                *slot = mstid.to_be();
            }
        }
        self.apply_actions(actions).await;
        Ok(())
    }

    /// Adjust the adapter's log verbosity. Levels are 0 (errors only)
    /// through 4 (trace). The embedding daemon reads [`Self::log_level`]
    /// and applies it to its subscriber.
    pub fn set_log_level(&mut self, level: u8) -> MstpResult<()> {
        let filter = match level {
            0 => LevelFilter::ERROR,
            1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            4 => LevelFilter::TRACE,
            _ => {
                return Err(MstpError::InvalidParameter(format!(
                    "log level {} out of range",
                    level
                )))
            }
        };
        info!("log level {}", level);
        self.log_level = filter;
        Ok(())
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }
}
