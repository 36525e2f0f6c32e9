//! LLC framing for Bridge PDUs
//!
//! BPDUs travel in 802.3 frames with a 3-byte LLC header (802.1D 7.12.3):
//! destination is the bridge group address, DSAP/SSAP are the bridge
//! spanning-tree SAP, and the control byte marks an unnumbered PDU. This
//! module validates received frames and synthesizes headers for transmit;
//! the BPDU payload itself is opaque to the adapter.

use crate::types::{MacAddr, ETH_ALEN};

/// Ethernet header length
pub const ETH_HLEN: usize = 14;

/// Maximum 802.3 payload length
pub const ETH_DATA_LEN: usize = 1500;

/// Bridge spanning-tree SAP (802.1D 7.12.3)
pub const LLC_SAP_BSPAN: u8 = 0x42;

/// LLC header length for U-format PDUs (DSAP, SSAP and 1 control byte)
pub const LLC_PDU_LEN_U: usize = 3;

/// U-format marker in the low two bits of the LLC control byte
pub const LLC_PDU_TYPE_U: u8 = 3;

/// Full Ethernet + LLC header length in front of the BPDU payload
pub const LLC_FRAME_HLEN: usize = ETH_HLEN + LLC_PDU_LEN_U;

/// IEEE-reserved multicast destination for STP BPDUs
pub const BRIDGE_GROUP_ADDRESS: [u8; ETH_ALEN] = [0x01, 0x80, 0xc2, 0x00, 0x00, 0x00];

/// Validate an Ethernet+LLC frame and return the BPDU payload it carries.
///
/// Checks, in order: frame longer than the 17-byte header, destination is
/// the bridge group address, the 802.3 length field within
/// `[LLC_PDU_LEN_U, ETH_DATA_LEN]` and covered by the frame, DSAP and SSAP
/// both the bridge SAP, and a U-format control byte. Returns `None` on any
/// failure.
pub fn validate_frame(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() <= LLC_FRAME_HLEN {
        return None;
    }
    if frame[0..ETH_ALEN] != BRIDGE_GROUP_ADDRESS {
        return None;
    }
    let len8023 = u16::from_be_bytes([frame[12], frame[13]]) as usize;
    if len8023 > ETH_DATA_LEN || len8023 > frame.len() - ETH_HLEN || len8023 < LLC_PDU_LEN_U {
        return None;
    }
    let dsap = frame[14];
    let ssap = frame[15];
    let control = frame[16];
    if dsap != LLC_SAP_BSPAN || ssap != LLC_SAP_BSPAN || (control & 0x3) != LLC_PDU_TYPE_U {
        return None;
    }
    Some(&frame[LLC_FRAME_HLEN..ETH_HLEN + len8023])
}

/// Build the 17-byte Ethernet+LLC header for a BPDU of `payload_len` bytes.
pub fn llc_header(src: MacAddr, payload_len: usize) -> [u8; LLC_FRAME_HLEN] {
    let mut header = [0u8; LLC_FRAME_HLEN];
    header[0..ETH_ALEN].copy_from_slice(&BRIDGE_GROUP_ADDRESS);
    header[ETH_ALEN..2 * ETH_ALEN].copy_from_slice(src.as_bytes());
    let len8023 = (payload_len + LLC_PDU_LEN_U) as u16;
    header[12..14].copy_from_slice(&len8023.to_be_bytes());
    header[14] = LLC_SAP_BSPAN;
    header[15] = LLC_SAP_BSPAN;
    header[16] = LLC_PDU_TYPE_U;
    header
}

/// Classify a BPDU payload by its protocol-version and type octets,
/// for transmit/receive logging only.
pub fn bpdu_kind(payload: &[u8]) -> &'static str {
    if payload.len() < 4 {
        return "Truncated";
    }
    let version = payload[2];
    let bpdu_type = payload[3];
    match version {
        0 => match bpdu_type {
            0x00 => "STP-Config",
            0x80 => "STP-TCN",
            _ => "STP-UnknownType",
        },
        2 => "RST",
        3 => "MST",
        _ => "UnknownProto",
    }
}
