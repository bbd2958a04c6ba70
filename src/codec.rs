//! Table-driven access to the fields of a WMM TSPEC element.
//!
//! The element is kept in wire form ([`TspecRecord`], 63 bytes including the vendor IE
//! header). Every named field is described once in [`TSPEC_FIELDS`]: either a subfield of
//! the 24-bit TS Info word (mask + shift) or a little-endian integer at a byte offset.
//! All multi-byte values are little-endian on the wire regardless of host byte order.
//!
//! ## TS Info layout (LSB first)
//!
//! | Bits | Field |
//! |------|-------|
//! | 0 | `traffic_type` |
//! | 1-4 | `tsid` |
//! | 5-6 | `direction` |
//! | 7-8 | `access_policy` (bit 7 is always set on creation) |
//! | 9 | `aggregation` |
//! | 10 | `psb` (power-save behaviour, U-APSD) |
//! | 11-13 | `user_priority` |
//! | 14-15 | `tsinfo_ack_policy` |
//! | 16 | `schedule` |

use crate::error::{CacError, Result};
use byteorder::{ByteOrder, LittleEndian};

pub const WLAN_EID_VENDOR_SPECIFIC: u8 = 221;
pub const WMM_OUI: [u8; 3] = [0x00, 0x50, 0xf2];
pub const WMM_OUI_TYPE: u8 = 2;
pub const WMM_OUI_SUBTYPE_TSPEC: u8 = 2;
pub const WMM_VERSION: u8 = 1;

/// Total element size: 2-byte IE header, 6-byte WMM header, 55-byte TSPEC body.
pub const TSPEC_ELEMENT_LEN: usize = 63;
/// Value of the element's length octet.
pub const TSPEC_BODY_LEN: u8 = (TSPEC_ELEMENT_LEN - 2) as u8;

/// Highest valid TSID.
pub const TSID_MAX: u8 = 7;

pub const OFFSET_ELEMENT_ID: usize = 0;
pub const OFFSET_LENGTH: usize = 1;
pub const OFFSET_OUI: usize = 2;
pub const OFFSET_OUI_TYPE: usize = 5;
pub const OFFSET_OUI_SUBTYPE: usize = 6;
pub const OFFSET_VERSION: usize = 7;
pub const OFFSET_TS_INFO: usize = 8;
pub const OFFSET_NOMINAL_MSDU_SIZE: usize = 11;
pub const OFFSET_MAX_MSDU_SIZE: usize = 13;
pub const OFFSET_MIN_SERVICE_INTERVAL: usize = 15;
pub const OFFSET_MAX_SERVICE_INTERVAL: usize = 19;
pub const OFFSET_INACTIVITY_INTERVAL: usize = 23;
pub const OFFSET_SUSPENSION_INTERVAL: usize = 27;
pub const OFFSET_SERVICE_START_TIME: usize = 31;
pub const OFFSET_MIN_DATA_RATE: usize = 35;
pub const OFFSET_MEAN_DATA_RATE: usize = 39;
pub const OFFSET_PEAK_DATA_RATE: usize = 43;
pub const OFFSET_MAX_BURST_SIZE: usize = 47;
pub const OFFSET_DELAY_BOUND: usize = 51;
pub const OFFSET_MIN_PHY_RATE: usize = 55;
pub const OFFSET_SURPLUS_BW_ALLOWANCE: usize = 59;
pub const OFFSET_MEDIUM_TIME: usize = 61;

const TSINFO_MASK: u32 = 0x00ff_ffff;
const TSID_SHIFT: u32 = 1;
const PSB_SHIFT: u32 = 10;
const USER_PRIORITY_SHIFT: u32 = 11;

/// Byte width of a plain field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
    U32,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
        }
    }

    /// Largest value that fits the field.
    pub fn max(self) -> u32 {
        match self {
            Width::U8 => u8::MAX as u32,
            Width::U16 => u16::MAX as u32,
            Width::U32 => u32::MAX,
        }
    }
}

/// Where a named field lives inside the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Subfield of the 24-bit TS Info word: `(ts_info >> shift) & mask`.
    TsInfo { mask: u32, shift: u32 },
    /// Little-endian integer at `offset` bytes from the element start.
    Plain { width: Width, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub read_only: bool,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    const fn tsinfo(name: &'static str, mask: u32, shift: u32) -> Self {
        FieldDescriptor { name, read_only: false, kind: FieldKind::TsInfo { mask, shift } }
    }

    const fn plain(name: &'static str, width: Width, offset: usize) -> Self {
        FieldDescriptor { name, read_only: false, kind: FieldKind::Plain { width, offset } }
    }

    const fn fixed(name: &'static str, offset: usize) -> Self {
        FieldDescriptor { name, read_only: true, kind: FieldKind::Plain { width: Width::U8, offset } }
    }

    /// Largest value accepted by [`TspecRecord::write`].
    pub fn max(&self) -> u32 {
        match self.kind {
            FieldKind::TsInfo { mask, .. } => mask,
            FieldKind::Plain { width, .. } => width.max(),
        }
    }

    pub fn is_psb(&self) -> bool {
        matches!(self.kind, FieldKind::TsInfo { shift: PSB_SHIFT, .. })
    }
}

/// Every addressable field of the TSPEC element.
pub static TSPEC_FIELDS: [FieldDescriptor; 29] = [
    FieldDescriptor::fixed("element_id", OFFSET_ELEMENT_ID),
    FieldDescriptor::fixed("length", OFFSET_LENGTH),
    FieldDescriptor::fixed("oui_type", OFFSET_OUI_TYPE),
    FieldDescriptor::fixed("oui_subtype", OFFSET_OUI_SUBTYPE),
    FieldDescriptor::fixed("version", OFFSET_VERSION),
    FieldDescriptor::tsinfo("traffic_type", 0x1, 0),
    FieldDescriptor::tsinfo("tsid", 0xf, TSID_SHIFT),
    FieldDescriptor::tsinfo("direction", 0x3, 5),
    // WMM: always 1 (EDCA).
    FieldDescriptor::tsinfo("access_policy", 0x3, 7),
    FieldDescriptor::tsinfo("aggregation", 0x1, 9),
    FieldDescriptor::tsinfo("psb", 0x1, PSB_SHIFT),
    FieldDescriptor::tsinfo("user_priority", 0x7, USER_PRIORITY_SHIFT),
    FieldDescriptor::tsinfo("tsinfo_ack_policy", 0x3, 14),
    FieldDescriptor::tsinfo("schedule", 0x1, 16),
    FieldDescriptor::plain("nominal_msdu_size", Width::U16, OFFSET_NOMINAL_MSDU_SIZE),
    FieldDescriptor::plain("max_msdu_size", Width::U16, OFFSET_MAX_MSDU_SIZE),
    FieldDescriptor::plain("min_service_interval", Width::U32, OFFSET_MIN_SERVICE_INTERVAL),
    FieldDescriptor::plain("max_service_interval", Width::U32, OFFSET_MAX_SERVICE_INTERVAL),
    FieldDescriptor::plain("inactivity_interval", Width::U32, OFFSET_INACTIVITY_INTERVAL),
    FieldDescriptor::plain("suspension_interval", Width::U32, OFFSET_SUSPENSION_INTERVAL),
    FieldDescriptor::plain("service_start_time", Width::U32, OFFSET_SERVICE_START_TIME),
    FieldDescriptor::plain("min_data_rate", Width::U32, OFFSET_MIN_DATA_RATE),
    FieldDescriptor::plain("mean_data_rate", Width::U32, OFFSET_MEAN_DATA_RATE),
    FieldDescriptor::plain("peak_data_rate", Width::U32, OFFSET_PEAK_DATA_RATE),
    FieldDescriptor::plain("max_burst_size", Width::U32, OFFSET_MAX_BURST_SIZE),
    FieldDescriptor::plain("delay_bound", Width::U32, OFFSET_DELAY_BOUND),
    FieldDescriptor::plain("min_phy_rate", Width::U32, OFFSET_MIN_PHY_RATE),
    FieldDescriptor::plain("surplus_bw_allowance", Width::U16, OFFSET_SURPLUS_BW_ALLOWANCE),
    FieldDescriptor::plain("medium_time", Width::U16, OFFSET_MEDIUM_TIME),
];

/// Case-insensitive lookup in [`TSPEC_FIELDS`].
pub fn lookup(name: &str) -> Result<&'static FieldDescriptor> {
    TSPEC_FIELDS
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| CacError::InvalidField(name.to_string()))
}

/// A WMM TSPEC element in wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TspecRecord([u8; TSPEC_ELEMENT_LEN]);

impl Default for TspecRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl TspecRecord {
    /// Fresh element: vendor IE header, WMM OUI/type/subtype/version, reserved TS Info bit set.
    pub fn new() -> Self {
        let mut b = [0u8; TSPEC_ELEMENT_LEN];
        b[OFFSET_ELEMENT_ID] = WLAN_EID_VENDOR_SPECIFIC;
        b[OFFSET_LENGTH] = TSPEC_BODY_LEN;
        b[OFFSET_OUI..OFFSET_OUI + 3].copy_from_slice(&WMM_OUI);
        b[OFFSET_OUI_TYPE] = WMM_OUI_TYPE;
        b[OFFSET_OUI_SUBTYPE] = WMM_OUI_SUBTYPE_TSPEC;
        b[OFFSET_VERSION] = WMM_VERSION;
        b[OFFSET_TS_INFO] = 0x80;
        TspecRecord(b)
    }

    /// Copy an element out of `bytes`, which must hold at least a full element.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let src = bytes.get(..TSPEC_ELEMENT_LEN)?;
        let mut b = [0u8; TSPEC_ELEMENT_LEN];
        b.copy_from_slice(src);
        Some(TspecRecord(b))
    }

    pub fn as_bytes(&self) -> &[u8; TSPEC_ELEMENT_LEN] {
        &self.0
    }

    /// Read a field by name.
    pub fn get(&self, name: &str) -> Result<u32> {
        Ok(self.read(lookup(name)?))
    }

    /// Write a field by name; returns the descriptor that was written.
    pub fn set(&mut self, name: &str, value: u32) -> Result<&'static FieldDescriptor> {
        let d = lookup(name)?;
        self.write(d, value)?;
        Ok(d)
    }

    pub fn read(&self, d: &FieldDescriptor) -> u32 {
        match d.kind {
            FieldKind::TsInfo { mask, shift } => (self.ts_info() >> shift) & mask,
            FieldKind::Plain { width, offset } => {
                let pos = &self.0[offset..offset + width.bytes()];
                match width {
                    Width::U8 => pos[0] as u32,
                    Width::U16 => LittleEndian::read_u16(pos) as u32,
                    Width::U32 => LittleEndian::read_u32(pos),
                }
            }
        }
    }

    /// Range-checked write. Rejected values leave the element untouched.
    pub fn write(&mut self, d: &FieldDescriptor, value: u32) -> Result<()> {
        if d.read_only {
            return Err(CacError::ReadOnly(d.name));
        }
        let max = d.max();
        if value > max {
            return Err(CacError::ValueOutOfRange { field: d.name, value, max });
        }
        match d.kind {
            FieldKind::TsInfo { mask, shift } => {
                let tsinfo = (self.ts_info() & !(mask << shift)) | ((value & mask) << shift);
                self.set_ts_info(tsinfo);
            }
            FieldKind::Plain { width, offset } => {
                let pos = &mut self.0[offset..offset + width.bytes()];
                match width {
                    Width::U8 => pos[0] = value as u8,
                    Width::U16 => LittleEndian::write_u16(pos, value as u16),
                    Width::U32 => LittleEndian::write_u32(pos, value),
                }
            }
        }
        Ok(())
    }

    pub fn ts_info(&self) -> u32 {
        LittleEndian::read_u24(&self.0[OFFSET_TS_INFO..OFFSET_TS_INFO + 3]) & TSINFO_MASK
    }

    pub fn set_ts_info(&mut self, value: u32) {
        LittleEndian::write_u24(&mut self.0[OFFSET_TS_INFO..OFFSET_TS_INFO + 3], value & TSINFO_MASK);
    }

    pub fn tsid(&self) -> u8 {
        ((self.ts_info() >> TSID_SHIFT) & 0xf) as u8
    }

    pub fn user_priority(&self) -> u8 {
        ((self.ts_info() >> USER_PRIORITY_SHIFT) & 0x7) as u8
    }

    pub fn set_user_priority(&mut self, up: u8) {
        let tsinfo = (self.ts_info() & !(0x7 << USER_PRIORITY_SHIFT)) | (((up & 0x7) as u32) << USER_PRIORITY_SHIFT);
        self.set_ts_info(tsinfo);
    }

    pub fn psb(&self) -> bool {
        (self.ts_info() >> PSB_SHIFT) & 1 != 0
    }

    pub fn set_psb(&mut self, on: bool) {
        let tsinfo = if on {
            self.ts_info() | (1 << PSB_SHIFT)
        } else {
            self.ts_info() & !(1 << PSB_SHIFT)
        };
        self.set_ts_info(tsinfo);
    }

    pub fn medium_time(&self) -> u16 {
        LittleEndian::read_u16(&self.0[OFFSET_MEDIUM_TIME..])
    }

    pub fn set_medium_time(&mut self, value: u16) {
        LittleEndian::write_u16(&mut self.0[OFFSET_MEDIUM_TIME..], value);
    }

    pub fn min_data_rate(&self) -> u32 {
        LittleEndian::read_u32(&self.0[OFFSET_MIN_DATA_RATE..])
    }

    pub fn set_min_data_rate(&mut self, value: u32) {
        LittleEndian::write_u32(&mut self.0[OFFSET_MIN_DATA_RATE..], value);
    }

    pub fn min_phy_rate(&self) -> u32 {
        LittleEndian::read_u32(&self.0[OFFSET_MIN_PHY_RATE..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_header() {
        let r = TspecRecord::new();
        let b = r.as_bytes();
        assert_eq!(&b[..8], &[221, 61, 0x00, 0x50, 0xf2, 2, 2, 1]);
        assert_eq!(b[OFFSET_TS_INFO], 0x80);
        assert_eq!(r.get("access_policy").unwrap(), 1);
        assert_eq!(r.tsid(), 0);
    }

    #[test]
    fn roundtrip_every_writable_field() {
        for d in TSPEC_FIELDS.iter().filter(|d| !d.read_only) {
            for v in [0, 1, d.max() / 2, d.max()] {
                let mut r = TspecRecord::new();
                r.set(d.name, v).expect("set");
                assert_eq!(r.get(d.name).unwrap(), v, "field {}", d.name);
            }
        }
    }

    #[test]
    fn out_of_range_does_not_mutate() {
        let mut r = TspecRecord::new();
        r.set("nominal_msdu_size", 1500).unwrap();
        let before = r;
        let err = r.set("nominal_msdu_size", 0x1_0000).unwrap_err();
        assert!(matches!(err, CacError::ValueOutOfRange { max: 0xffff, .. }));
        let err = r.set("user_priority", 8).unwrap_err();
        assert!(matches!(err, CacError::ValueOutOfRange { max: 7, .. }));
        assert_eq!(r, before);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut r = TspecRecord::new();
        r.set("User_Priority", 5).unwrap();
        assert_eq!(r.get("USER_PRIORITY").unwrap(), 5);
        assert!(matches!(r.get("bogus"), Err(CacError::InvalidField(_))));
    }

    #[test]
    fn read_only_header_fields() {
        let mut r = TspecRecord::new();
        assert_eq!(r.get("version").unwrap(), 1);
        assert!(matches!(r.set("version", 2), Err(CacError::ReadOnly("version"))));
    }

    #[test]
    fn tsinfo_bit_positions() {
        let mut r = TspecRecord::new();
        r.set("tsid", 5).unwrap();
        r.set("user_priority", 6).unwrap();
        r.set("direction", 3).unwrap();
        // 0x80 | tsid 5 << 1 | direction 3 << 5
        assert_eq!(r.as_bytes()[OFFSET_TS_INFO], 0x80 | 0x0a | 0x60);
        // user priority bits 11..13 land in byte 1 bits 3..5
        assert_eq!(r.as_bytes()[OFFSET_TS_INFO + 1], 6 << 3);
        assert_eq!(r.tsid(), 5);
        assert_eq!(r.user_priority(), 6);
    }

    #[test]
    fn plain_fields_are_little_endian() {
        let mut r = TspecRecord::new();
        r.set("min_phy_rate", 0x0102_0304).unwrap();
        assert_eq!(&r.as_bytes()[OFFSET_MIN_PHY_RATE..OFFSET_MIN_PHY_RATE + 4], &[4, 3, 2, 1]);
        r.set_medium_time(0x1234);
        assert_eq!(&r.as_bytes()[OFFSET_MEDIUM_TIME..], &[0x34, 0x12]);
    }
}
