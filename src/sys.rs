//! Platform access trait
//!
//! Everything the tracker needs from the operating system goes through
//! [`SysOps`]: interface naming, hardware addresses, link/speed/duplex via
//! ethtool, the bridge sysfs attributes, and the raw packet socket used for
//! BPDU transmit. Implementations own the actual sysfs/ioctl/socket
//! plumbing; tests substitute fakes.

use crate::error::MstpResult;
use crate::types::MacAddr;
use async_trait::async_trait;

/// sysfs `bridge/stp_state` value meaning user-space STP
pub const STP_STATE_USER: i32 = 2;

#[async_trait]
pub trait SysOps: Send + Sync {
    /// Resolve an OS interface index to its name.
    async fn if_index_to_name(&self, if_index: i32) -> MstpResult<String>;

    /// Read the hardware address of an interface.
    async fn hwaddr(&self, name: &str) -> MstpResult<MacAddr>;

    /// Read carrier status via ethtool.
    async fn ethtool_link(&self, name: &str) -> MstpResult<bool>;

    /// Read `(speed_mbps, duplex)` via ethtool. Either value may be
    /// negative when the driver does not report it; duplex 0 is half,
    /// 1 is full.
    async fn ethtool_speed_duplex(&self, name: &str) -> MstpResult<(i32, i32)>;

    /// Read `/sys/class/net/<name>/bridge/stp_state`.
    async fn bridge_stp_state(&self, name: &str) -> MstpResult<i32>;

    /// Read the bridge-relative port number of a slave interface.
    async fn bridge_portno(&self, name: &str) -> MstpResult<i32>;

    /// Send one link-layer frame on the interface. `segments` are
    /// concatenated on the wire (header, then payload).
    async fn packet_send(&self, if_index: i32, segments: &[&[u8]]) -> MstpResult<()>;
}
