//! WMM action frames: ADDTS request/response and DELTS.
//!
//! Body layout (after the 24-byte management header):
//! `category (17) | action | dialog token | status | TSPEC element (63) | optional IEs`.

use crate::codec::{TspecRecord, TSPEC_ELEMENT_LEN};
use crate::error::{CacError, Result};
use crate::station::MacAddr;
use byteorder::{ByteOrder, LittleEndian};

pub const WLAN_CATEGORY_WMM: u8 = 17;

pub const WMM_ACTION_ADDTS_REQ: u8 = 0;
pub const WMM_ACTION_ADDTS_RESP: u8 = 1;
pub const WMM_ACTION_DELTS: u8 = 2;

pub const ADDTS_STATUS_ACCEPTED: u8 = 0x00;
pub const ADDTS_STATUS_INVALID_PARAM: u8 = 0x01;
pub const ADDTS_STATUS_REFUSED: u8 = 0x03;
pub const ADDTS_STATUS_DELAY: u8 = 0x2f;
pub const ADDTS_STATUS_UNSPECIFIED: u8 = 0xc8;
pub const ADDTS_STATUS_POLICY_CONFIG: u8 = 0xc9;
pub const ADDTS_STATUS_ASSOC_DENIED: u8 = 0xca;
pub const ADDTS_STATUS_INVALID_PARAM2: u8 = 0xcb;

pub const MGMT_HEADER_LEN: usize = 24;
pub const ACTION_HEADER_LEN: usize = 4;
/// Management type, action subtype.
pub const FC_MGMT_ACTION: u16 = 0x00d0;

/// Category, action code, dialog token and status of a WMM action frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionHeader {
    pub category: u8,
    pub action: u8,
    pub dialog_token: u8,
    pub status: u8,
}

impl ActionHeader {
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[self.category, self.action, self.dialog_token, self.status]);
    }
}

/// A parsed inbound (or captured) WMM action body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmmFrame<'a> {
    AddtsRequest {
        dialog_token: u8,
        tspec: TspecRecord,
        ies: &'a [u8],
    },
    AddtsResponse {
        dialog_token: u8,
        status: u8,
        tspec: TspecRecord,
        ies: &'a [u8],
    },
    Delts {
        tspec: TspecRecord,
    },
    Other {
        action: u8,
    },
}

/// Append a management header addressed to the AP (addr1 = addr3 = BSSID).
pub fn write_mgmt_header(out: &mut Vec<u8>, bssid: &MacAddr, sa: &MacAddr) {
    let mut fc = [0u8; 2];
    LittleEndian::write_u16(&mut fc, FC_MGMT_ACTION);
    out.extend_from_slice(&fc);
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(bssid);
    out.extend_from_slice(sa);
    out.extend_from_slice(bssid);
    out.extend_from_slice(&[0, 0]);
}

/// The body of a management action frame, or `None` for any other frame.
pub fn split_mgmt(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < MGMT_HEADER_LEN {
        return None;
    }
    let fc = LittleEndian::read_u16(&frame[..2]);
    if fc & 0x00fc != FC_MGMT_ACTION {
        return None;
    }
    Some(&frame[MGMT_HEADER_LEN..])
}

fn tspec_frame(bssid: &MacAddr, sa: &MacAddr, header: ActionHeader, tspec: &TspecRecord, extra: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(MGMT_HEADER_LEN + ACTION_HEADER_LEN + TSPEC_ELEMENT_LEN + extra);
    write_mgmt_header(&mut out, bssid, sa);
    header.write(&mut out);
    out.extend_from_slice(tspec.as_bytes());
    out
}

/// ADDTS request frame; vendor IEs may be appended by the caller.
pub fn addts_request(bssid: &MacAddr, sa: &MacAddr, dialog_token: u8, tspec: &TspecRecord) -> Vec<u8> {
    let header = ActionHeader {
        category: WLAN_CATEGORY_WMM,
        action: WMM_ACTION_ADDTS_REQ,
        dialog_token,
        status: 0,
    };
    tspec_frame(bssid, sa, header, tspec, 32)
}

/// DELTS frame (dialog token 0).
pub fn delts(bssid: &MacAddr, sa: &MacAddr, tspec: &TspecRecord) -> Vec<u8> {
    let header = ActionHeader {
        category: WLAN_CATEGORY_WMM,
        action: WMM_ACTION_DELTS,
        dialog_token: 0,
        status: 0,
    };
    tspec_frame(bssid, sa, header, tspec, 0)
}

/// ADDTS response body as sent by an access point (no management header).
pub fn addts_response_body(dialog_token: u8, status: u8, tspec: &TspecRecord, ies: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ACTION_HEADER_LEN + TSPEC_ELEMENT_LEN + ies.len());
    ActionHeader {
        category: WLAN_CATEGORY_WMM,
        action: WMM_ACTION_ADDTS_RESP,
        dialog_token,
        status,
    }
    .write(&mut out);
    out.extend_from_slice(tspec.as_bytes());
    out.extend_from_slice(ies);
    out
}

/// DELTS body as sent by an access point.
pub fn delts_body(tspec: &TspecRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(ACTION_HEADER_LEN + TSPEC_ELEMENT_LEN);
    ActionHeader {
        category: WLAN_CATEGORY_WMM,
        action: WMM_ACTION_DELTS,
        dialog_token: 0,
        status: 0,
    }
    .write(&mut out);
    out.extend_from_slice(tspec.as_bytes());
    out
}

pub fn parse_header(body: &[u8]) -> Result<ActionHeader> {
    if body.len() < ACTION_HEADER_LEN {
        return Err(CacError::Malformed(format!("action body of {} bytes", body.len())));
    }
    let header = ActionHeader {
        category: body[0],
        action: body[1],
        dialog_token: body[2],
        status: body[3],
    };
    if header.category != WLAN_CATEGORY_WMM {
        return Err(CacError::Malformed(format!("category {} is not WMM", header.category)));
    }
    Ok(header)
}

/// Parse a WMM action body (starting at the category octet).
pub fn parse_wmm_action(body: &[u8]) -> Result<WmmFrame<'_>> {
    let header = parse_header(body)?;
    if !matches!(header.action, WMM_ACTION_ADDTS_REQ | WMM_ACTION_ADDTS_RESP | WMM_ACTION_DELTS) {
        return Ok(WmmFrame::Other { action: header.action });
    }
    let rest = &body[ACTION_HEADER_LEN..];
    let tspec = TspecRecord::from_bytes(rest)
        .ok_or_else(|| CacError::Malformed(format!("TSPEC truncated to {} bytes", rest.len())))?;
    let ies = &rest[TSPEC_ELEMENT_LEN..];
    Ok(match header.action {
        WMM_ACTION_ADDTS_REQ => WmmFrame::AddtsRequest {
            dialog_token: header.dialog_token,
            tspec,
            ies,
        },
        WMM_ACTION_ADDTS_RESP => WmmFrame::AddtsResponse {
            dialog_token: header.dialog_token,
            status: header.status,
            tspec,
            ies,
        },
        _ => WmmFrame::Delts { tspec },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BSSID: MacAddr = [0x02, 0, 0, 0, 0, 1];
    const STA: MacAddr = [0x02, 0, 0, 0, 0, 2];

    #[test]
    fn addts_request_layout() {
        let mut tspec = TspecRecord::new();
        tspec.set("tsid", 3).unwrap();
        let frame = addts_request(&BSSID, &STA, 7, &tspec);
        assert_eq!(frame.len(), MGMT_HEADER_LEN + ACTION_HEADER_LEN + TSPEC_ELEMENT_LEN);
        assert_eq!(&frame[..2], &[0xd0, 0x00]);
        assert_eq!(&frame[4..10], &BSSID);
        assert_eq!(&frame[10..16], &STA);
        let body = split_mgmt(&frame).unwrap();
        assert_eq!(&body[..4], &[17, 0, 7, 0]);
        match parse_wmm_action(body).unwrap() {
            WmmFrame::AddtsRequest { dialog_token, tspec: parsed, ies } => {
                assert_eq!(dialog_token, 7);
                assert_eq!(parsed.tsid(), 3);
                assert!(ies.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_truncated_and_foreign() {
        let tspec = TspecRecord::new();
        let body = addts_response_body(1, 0, &tspec, &[]);
        assert!(matches!(parse_wmm_action(&body[..20]), Err(CacError::Malformed(_))));
        let mut other = body.clone();
        other[0] = 3;
        assert!(parse_wmm_action(&other).is_err());
        assert_eq!(parse_wmm_action(&[17, 9, 0, 0]).unwrap(), WmmFrame::Other { action: 9 });
    }

    #[test]
    fn split_ignores_non_action() {
        let mut frame = vec![0u8; 30];
        frame[0] = 0x80; // beacon
        assert!(split_mgmt(&frame).is_none());
    }
}
