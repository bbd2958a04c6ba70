//! Information elements: a bounds-checked reader over IE chains, vendor IE lookup, and
//! writers for the vendor elements that travel with ADDTS requests and (re)association.

use crate::codec::{
    TspecRecord, TSPEC_BODY_LEN, WLAN_EID_VENDOR_SPECIFIC, WMM_OUI, WMM_OUI_SUBTYPE_TSPEC, WMM_OUI_TYPE,
};
use byteorder::{ByteOrder, LittleEndian};

pub const WLAN_EID_SUPP_RATES: u8 = 1;
pub const WLAN_EID_EXT_SUPP_RATES: u8 = 50;
pub const WLAN_EID_RIC_DATA: u8 = 57;

pub const CISCO_OUI: [u8; 3] = [0x00, 0x40, 0x96];
pub const CISCO_TYPE_TSRS: u8 = 0x08;
pub const CISCO_TYPE_EDCA: u8 = 0x09;
pub const CISCO_TYPE_EBW: u8 = 0x0f;

/// Size of the bandwidth (EBW) vendor element.
pub const EBW_IE_LEN: usize = 8;
/// Size of the Resource Descriptor element (header + 4-byte body).
pub const RDE_LEN: usize = 6;
/// Largest rate list carried in a TSRS element.
pub const TSRS_MAX_RATES: usize = 8;

/// One element of an IE chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    pub id: u8,
    /// Offset of the element header within the chain.
    pub offset: usize,
    pub body: &'a [u8],
    /// Header and body.
    pub raw: &'a [u8],
}

impl<'a> Element<'a> {
    /// Vendor element whose body starts with `oui` followed by `oui_type`.
    pub fn is_vendor(&self, oui: [u8; 3], oui_type: u8) -> bool {
        self.id == WLAN_EID_VENDOR_SPECIFIC && self.body.len() >= 4 && self.body[..3] == oui && self.body[3] == oui_type
    }

    /// WMM TSPEC vendor element (OUI 00:50:f2, type 2, subtype 2).
    pub fn is_wmm_tspec(&self) -> bool {
        self.is_vendor(WMM_OUI, WMM_OUI_TYPE) && self.body.len() > 4 && self.body[4] == WMM_OUI_SUBTYPE_TSPEC
    }
}

/// Iterates the elements of a chain. Stops at the first truncated element.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }
}

impl<'a> Iterator for Reader<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.bytes.get(self.pos..)?;
        if rest.len() < 2 {
            return None;
        }
        let body_len = rest[1] as usize;
        if rest.len() < 2 + body_len {
            return None;
        }
        let offset = self.pos;
        self.pos += 2 + body_len;
        Some(Element {
            id: rest[0],
            offset,
            body: &rest[2..2 + body_len],
            raw: &rest[..2 + body_len],
        })
    }
}

pub fn find(ies: &[u8], id: u8) -> Option<Element<'_>> {
    Reader::new(ies).find(|e| e.id == id)
}

pub fn find_vendor(ies: &[u8], oui: [u8; 3], oui_type: u8) -> Option<Element<'_>> {
    Reader::new(ies).find(|e| e.is_vendor(oui, oui_type))
}

/// Append the bandwidth (EBW) element: `dd 06 00 40 96 0f <tsid> 00`.
pub fn write_ebw(out: &mut Vec<u8>, tsid: u8) {
    out.push(WLAN_EID_VENDOR_SPECIFIC);
    out.push((EBW_IE_LEN - 2) as u8);
    out.extend_from_slice(&CISCO_OUI);
    out.push(CISCO_TYPE_EBW);
    out.push(tsid);
    out.push(0);
}

/// Append a TSRS (supported rate set) element carrying `rates` in 500 kb/s units.
/// Returns false, writing nothing, when more than [`TSRS_MAX_RATES`] rates are given.
pub fn write_tsrs(out: &mut Vec<u8>, tsid: u8, rates: &[u8]) -> bool {
    if rates.len() > TSRS_MAX_RATES {
        return false;
    }
    out.push(WLAN_EID_VENDOR_SPECIFIC);
    out.push((5 + rates.len()) as u8);
    out.extend_from_slice(&CISCO_OUI);
    out.push(CISCO_TYPE_TSRS);
    out.push(tsid);
    out.extend_from_slice(rates);
    true
}

/// Supported and extended supported rates, basic-rate bit masked off (500 kb/s units).
pub fn supported_rates(ies: &[u8]) -> Vec<u8> {
    Reader::new(ies)
        .filter(|e| e.id == WLAN_EID_SUPP_RATES || e.id == WLAN_EID_EXT_SUPP_RATES)
        .flat_map(|e| e.body.iter().map(|r| r & 0x7f))
        .collect()
}

/// `(tsid, lifetime)` from the EDCA-lifetime vendor element, if present.
pub fn edca_lifetime(ies: &[u8]) -> Option<(u8, u16)> {
    let e = find_vendor(ies, CISCO_OUI, CISCO_TYPE_EDCA)?;
    if e.body.len() < 7 {
        return None;
    }
    Some((e.body[4], LittleEndian::read_u16(&e.body[5..7])))
}

/// Append a Resource Descriptor header: id, length 4, identifier 0, descriptor count,
/// status 0 (success). Returns the offset of the count byte so it can be patched.
pub fn write_rde_header(out: &mut Vec<u8>, count: u8) -> usize {
    out.extend_from_slice(&[WLAN_EID_RIC_DATA, 4, 0]);
    let count_at = out.len();
    out.push(count);
    out.extend_from_slice(&[0, 0]);
    count_at
}

/// TSPEC elements admitted through Resource Descriptor elements of an association response.
///
/// Descriptor counts of every successful (status 0) Resource Descriptor are summed and
/// capped at `cap`; then WMM TSPEC elements are collected, in order, from the first
/// successful descriptor onwards. Elements too short to hold a full TSPEC are skipped.
pub fn rde_tspecs(ies: &[u8], cap: usize) -> Vec<TspecRecord> {
    let mut count = 0usize;
    let mut first = None;
    for e in Reader::new(ies).filter(|e| e.id == WLAN_EID_RIC_DATA && e.body.len() >= 4) {
        if LittleEndian::read_u16(&e.body[2..4]) != 0 {
            continue;
        }
        count += e.body[1] as usize;
        first.get_or_insert(e.offset);
    }
    let Some(start) = first else {
        return Vec::new();
    };
    Reader::new(&ies[start..])
        .filter(|e| e.is_wmm_tspec() && e.body.len() >= TSPEC_BODY_LEN as usize)
        .take(count.min(cap))
        .filter_map(|e| TspecRecord::from_bytes(e.raw))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_stops_on_truncation() {
        let ies = [0, 2, b'a', b'b', 1, 3, 0x82, 0x84];
        let ids: Vec<u8> = Reader::new(&ies).map(|e| e.id).collect();
        assert_eq!(ids, vec![0]);
    }

    #[test]
    fn ebw_layout() {
        let mut out = Vec::new();
        write_ebw(&mut out, 5);
        assert_eq!(out, vec![0xdd, 6, 0x00, 0x40, 0x96, 0x0f, 5, 0]);
        assert_eq!(out.len(), EBW_IE_LEN);
    }

    #[test]
    fn tsrs_layout() {
        let mut out = Vec::new();
        assert!(write_tsrs(&mut out, 3, &[48]));
        assert_eq!(out, vec![0xdd, 6, 0x00, 0x40, 0x96, 0x08, 3, 48]);
        assert!(!write_tsrs(&mut out, 3, &[1; 9]));
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn rates_mask_basic_bit() {
        let ies = [1, 4, 0x82, 0x84, 0x8b, 0x96, 50, 2, 0x30, 0x48];
        assert_eq!(supported_rates(&ies), vec![2, 4, 11, 22, 48, 72]);
    }

    #[test]
    fn edca_lifetime_found() {
        let ies = [0xdd, 7, 0x00, 0x40, 0x96, 0x09, 2, 0x00, 0x02];
        assert_eq!(edca_lifetime(&ies), Some((2, 512)));
        assert_eq!(edca_lifetime(&ies[..8]), None);
    }

    #[test]
    fn rde_skips_failed_descriptors() {
        let mut a = TspecRecord::new();
        a.set("tsid", 1).unwrap();
        let mut b = TspecRecord::new();
        b.set("tsid", 2).unwrap();

        let mut ies = Vec::new();
        ies.extend_from_slice(&[WLAN_EID_RIC_DATA, 4, 0, 1, 0x03, 0x00]);
        ies.extend_from_slice(&[WLAN_EID_RIC_DATA, 4, 0, 1, 0, 0]);
        ies.extend_from_slice(a.as_bytes());
        ies.extend_from_slice(b.as_bytes());
        let got = rde_tspecs(&ies, 8);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].tsid(), 1);
    }

    #[test]
    fn rde_count_is_capped() {
        let mut ies = Vec::new();
        write_rde_header(&mut ies, 3);
        for tsid in 0..3 {
            let mut r = TspecRecord::new();
            r.set("tsid", tsid).unwrap();
            ies.extend_from_slice(r.as_bytes());
        }
        assert_eq!(rde_tspecs(&ies, 2).len(), 2);
        assert_eq!(rde_tspecs(&ies, 8).len(), 3);
        assert!(rde_tspecs(&ies[RDE_LEN..], 8).is_empty());
    }
}
