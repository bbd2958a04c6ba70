//! Collaborator boundary: the station interface this core drives and the link/peer
//! state it reads and updates.
//!
//! Every blocking collaborator call takes an explicit timeout; the implementation may
//! block the calling thread until the firmware confirms or the timeout expires.

use crate::error::StationError;
use std::time::Duration;

pub type MacAddr = [u8; 6];

/// Kind of management frame handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Action,
}

/// Purpose of an additional IE blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IePurpose {
    AssociationRequest,
}

/// Firmware/transport operations consumed by the admission-control core.
pub trait Station {
    /// Send a management frame and wait for the firmware acknowledgment.
    fn send_mgmt_frame(&mut self, dest: &MacAddr, frame: &[u8], kind: FrameKind, timeout: Duration) -> Result<(), StationError>;

    fn set_traffic_parameters(
        &mut self,
        priority: u8,
        medium_time: u16,
        min_data_rate: u32,
        bssid: &MacAddr,
        timeout: Duration,
    ) -> Result<(), StationError>;

    fn remove_traffic_parameters(&mut self, priority: u8, timeout: Duration) -> Result<(), StationError>;

    fn max_msdu_lifetime(&mut self, timeout: Duration) -> Result<u16, StationError>;

    fn set_max_msdu_lifetime(&mut self, value: u16, timeout: Duration) -> Result<(), StationError>;

    /// Install IEs appended to the next (re)association request.
    fn set_additional_ies(&mut self, purpose: IePurpose, ies: &[u8]) -> Result<(), StationError>;
}

/// WMM access category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessCategory {
    Background,
    BestEffort,
    Video,
    Voice,
}

impl AccessCategory {
    /// Standard WMM mapping of 802.1D user priority.
    pub fn from_priority(up: u32) -> Option<Self> {
        match up {
            1 | 2 => Some(AccessCategory::Background),
            0 | 3 => Some(AccessCategory::BestEffort),
            4 | 5 => Some(AccessCategory::Video),
            6 | 7 => Some(AccessCategory::Voice),
            _ => None,
        }
    }

    /// The two user priorities of this category, lower first.
    pub fn priorities(self) -> [u8; 2] {
        match self {
            AccessCategory::Background => [1, 2],
            AccessCategory::BestEffort => [0, 3],
            AccessCategory::Video => [4, 5],
            AccessCategory::Voice => [6, 7],
        }
    }

    /// Bit in the WMM QoS Info U-APSD flags.
    pub fn uapsd_bit(self) -> u8 {
        match self {
            AccessCategory::Voice => 1 << 0,
            AccessCategory::Video => 1 << 1,
            AccessCategory::Background => 1 << 2,
            AccessCategory::BestEffort => 1 << 3,
        }
    }
}

/// The BSS the station is associated with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bss {
    pub bssid: MacAddr,
    /// IEs from the beacon/probe response (rates are read from here).
    pub ies: Vec<u8>,
    /// The network runs the extended (CCX) admission mode: TSRS IE and MSDU lifetime.
    pub extended_mode: bool,
}

/// The access point as a peer of the station.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Peer {
    pub address: MacAddr,
    /// One bit per user priority with admitted traffic parameters.
    pub established: u8,
    /// U-APSD flags negotiated at association (see [`AccessCategory::uapsd_bit`]).
    pub uapsd: u8,
    pub assoc_resp_ies: Vec<u8>,
}

impl Peer {
    pub fn uapsd(&self, ac: AccessCategory) -> bool {
        self.uapsd & ac.uapsd_bit() != 0
    }

    pub fn is_established(&self, priority: u8) -> bool {
        priority < 8 && self.established & (1 << priority) != 0
    }

    pub fn set_established(&mut self, priority: u8) {
        self.established |= 1 << (priority & 0x7);
    }

    pub fn clear_established(&mut self, priority: u8) {
        self.established &= !(1 << (priority & 0x7));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Station interface state. Exclusive access (`&mut StaLink`) stands in for the
/// interface lock held by the caller around every entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaLink {
    pub own_addr: MacAddr,
    pub state: LinkState,
    pub bss: Option<Bss>,
    pub peer: Option<Peer>,
    /// Caller-supplied IEs for association requests; the Resource Descriptor is appended to these.
    pub assoc_req_ies: Vec<u8>,
}

impl StaLink {
    pub fn connected(own_addr: MacAddr, bss: Bss, peer: Peer) -> Self {
        StaLink {
            own_addr,
            state: LinkState::Connected,
            bss: Some(bss),
            peer: Some(peer),
            assoc_req_ies: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected && self.bss.is_some()
    }

    pub fn bssid(&self) -> Option<MacAddr> {
        self.bss.as_ref().map(|b| b.bssid)
    }

    pub fn extended_mode(&self) -> bool {
        self.bss.as_ref().map_or(false, |b| b.extended_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wmm_priority_mapping() {
        assert_eq!(AccessCategory::from_priority(0), Some(AccessCategory::BestEffort));
        assert_eq!(AccessCategory::from_priority(2), Some(AccessCategory::Background));
        assert_eq!(AccessCategory::from_priority(5), Some(AccessCategory::Video));
        assert_eq!(AccessCategory::from_priority(7), Some(AccessCategory::Voice));
        assert_eq!(AccessCategory::from_priority(8), None);
        for up in 0..8u8 {
            let ac = AccessCategory::from_priority(up as u32).unwrap();
            assert!(ac.priorities().contains(&up));
        }
    }

    #[test]
    fn established_bits() {
        let mut peer = Peer::default();
        peer.set_established(6);
        assert!(peer.is_established(6));
        assert!(!peer.is_established(7));
        peer.clear_established(6);
        assert_eq!(peer.established, 0);
    }
}
