//! Error types for the bridge/MSTP adapter

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum MstpError {
    /// IO error
    Io(io::Error),
    /// OS query failed (sysfs, ioctl, ethtool)
    SysQuery { what: String, reason: String },
    /// Invalid parameter
    InvalidParameter(String),
    /// Bridge not found
    BridgeNotFound(i32),
    /// Port not found on a bridge
    PortNotFound { bridge: i32, port: i32 },
    /// Tree (MSTI) not found on a bridge
    TreeNotFound { bridge: i32, mstid: u16 },
    /// Per-tree port not found
    TreePortNotFound { bridge: i32, port: i32, mstid: u16 },
    /// Protocol engine rejected the request
    EngineRejected(String),
    /// Packet transmit failed
    SendFailed(String),
}

impl fmt::Display for MstpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MstpError::Io(e) => write!(f, "IO error: {}", e),
            MstpError::SysQuery { what, reason } => {
                write!(f, "System query '{}' failed: {}", what, reason)
            }
            MstpError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            MstpError::BridgeNotFound(idx) => {
                write!(f, "Couldn't find bridge with index {}", idx)
            }
            MstpError::PortNotFound { bridge, port } => {
                write!(f, "Couldn't find port with index {} on bridge {}", port, bridge)
            }
            MstpError::TreeNotFound { bridge, mstid } => {
                write!(f, "Couldn't find MSTI with ID {} on bridge {}", mstid, bridge)
            }
            MstpError::TreePortNotFound { bridge, port, mstid } => {
                write!(
                    f,
                    "Couldn't find MSTI {} on port {} of bridge {}",
                    mstid, port, bridge
                )
            }
            MstpError::EngineRejected(msg) => write!(f, "Engine rejected request: {}", msg),
            MstpError::SendFailed(msg) => write!(f, "Packet send failed: {}", msg),
        }
    }
}

impl std::error::Error for MstpError {}

impl From<io::Error> for MstpError {
    fn from(error: io::Error) -> Self {
        MstpError::Io(error)
    }
}

pub type MstpResult<T> = Result<T, MstpError>;
