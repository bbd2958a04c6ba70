//! In-process stand-ins for the station firmware and the access point, used by the
//! `cac_ctl` tool, the tests and the benches.

use crate::codec::{TspecRecord, TSID_MAX};
use crate::config::SimConfig;
use crate::error::StationError;
use crate::frame::{self, WmmFrame, ADDTS_STATUS_ACCEPTED};
use crate::ie;
use crate::station::{Bss, FrameKind, IePurpose, MacAddr, Peer, StaLink, Station};
use std::time::Duration;
use tracing::trace;

/// One collaborator call as seen by [`SimStation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationCall {
    SendFrame { dest: MacAddr, frame: Vec<u8> },
    SetTraffic {
        priority: u8,
        medium_time: u16,
        min_data_rate: u32,
        bssid: MacAddr,
    },
    RemoveTraffic { priority: u8 },
    GetLifetime,
    SetLifetime(u16),
    AdditionalIes(Vec<u8>),
}

/// Station that records every call and fails on request.
#[derive(Debug, Default)]
pub struct SimStation {
    pub calls: Vec<StationCall>,
    pub fail_send: bool,
    pub fail_set_traffic: bool,
    pub fail_remove_traffic: bool,
    pub fail_lifetime: bool,
    /// Current MSDU lifetime MIB value.
    pub lifetime: u16,
    /// IEs installed for the next association request.
    pub additional_ies: Vec<u8>,
}

impl SimStation {
    pub fn sent_frames(&self) -> impl Iterator<Item = &[u8]> {
        self.calls.iter().filter_map(|c| match c {
            StationCall::SendFrame { frame, .. } => Some(frame.as_slice()),
            _ => None,
        })
    }

    pub fn last_frame(&self) -> Option<&[u8]> {
        self.sent_frames().last()
    }
}

fn refuse(flag: bool, what: &str) -> Result<(), StationError> {
    if flag {
        Err(StationError::Rejected(what.to_string()))
    } else {
        Ok(())
    }
}

impl Station for SimStation {
    fn send_mgmt_frame(&mut self, dest: &MacAddr, frame: &[u8], _kind: FrameKind, _timeout: Duration) -> Result<(), StationError> {
        if self.fail_send {
            return Err(StationError::Timeout);
        }
        trace!(len = frame.len(), "sim: frame sent");
        self.calls.push(StationCall::SendFrame {
            dest: *dest,
            frame: frame.to_vec(),
        });
        Ok(())
    }

    fn set_traffic_parameters(
        &mut self,
        priority: u8,
        medium_time: u16,
        min_data_rate: u32,
        bssid: &MacAddr,
        _timeout: Duration,
    ) -> Result<(), StationError> {
        refuse(self.fail_set_traffic, "set traffic parameters")?;
        self.calls.push(StationCall::SetTraffic {
            priority,
            medium_time,
            min_data_rate,
            bssid: *bssid,
        });
        Ok(())
    }

    fn remove_traffic_parameters(&mut self, priority: u8, _timeout: Duration) -> Result<(), StationError> {
        refuse(self.fail_remove_traffic, "remove traffic parameters")?;
        self.calls.push(StationCall::RemoveTraffic { priority });
        Ok(())
    }

    fn max_msdu_lifetime(&mut self, _timeout: Duration) -> Result<u16, StationError> {
        refuse(self.fail_lifetime, "MSDU lifetime")?;
        self.calls.push(StationCall::GetLifetime);
        Ok(self.lifetime)
    }

    fn set_max_msdu_lifetime(&mut self, value: u16, _timeout: Duration) -> Result<(), StationError> {
        refuse(self.fail_lifetime, "MSDU lifetime")?;
        self.calls.push(StationCall::SetLifetime(value));
        self.lifetime = value;
        Ok(())
    }

    fn set_additional_ies(&mut self, _purpose: IePurpose, ies: &[u8]) -> Result<(), StationError> {
        self.calls.push(StationCall::AdditionalIes(ies.to_vec()));
        self.additional_ies = ies.to_vec();
        Ok(())
    }
}

/// Supported rates 1, 2, 5.5, 11 (basic), 6, 9, 12, 18 Mb/s.
pub const SIM_RATES_IE: [u8; 10] = [ie::WLAN_EID_SUPP_RATES, 8, 0x82, 0x84, 0x8b, 0x96, 0x0c, 0x12, 0x18, 0x24];

/// Access point answering ADDTS requests and reassociations according to [`SimConfig`].
#[derive(Debug, Clone)]
pub struct SimAccessPoint {
    pub bssid: MacAddr,
    pub config: SimConfig,
}

impl SimAccessPoint {
    pub fn new(bssid: MacAddr, config: SimConfig) -> Self {
        SimAccessPoint { bssid, config }
    }

    /// A link associated with this AP, every access category U-APSD enabled.
    pub fn associate(&self, own_addr: MacAddr, extended_mode: bool) -> StaLink {
        StaLink::connected(
            own_addr,
            Bss {
                bssid: self.bssid,
                ies: SIM_RATES_IE.to_vec(),
                extended_mode,
            },
            Peer {
                address: self.bssid,
                uapsd: 0x0f,
                ..Default::default()
            },
        )
    }

    fn admit(&self, mut tspec: TspecRecord) -> TspecRecord {
        tspec.set_medium_time(self.config.medium_time);
        tspec
    }

    /// ADDTS response body for a transmitted ADDTS request; `None` for any other frame.
    pub fn respond(&self, sent: &[u8]) -> Option<Vec<u8>> {
        let body = frame::split_mgmt(sent)?;
        let WmmFrame::AddtsRequest { dialog_token, tspec, .. } = frame::parse_wmm_action(body).ok()? else {
            return None;
        };
        let (status, tspec) = if self.config.accept {
            (ADDTS_STATUS_ACCEPTED, self.admit(tspec))
        } else {
            (self.config.status, tspec)
        };
        Some(frame::addts_response_body(dialog_token, status, &tspec, &[]))
    }

    /// Reassociation response IEs admitting every TSPEC announced in the request's
    /// Resource Descriptor. Empty when the AP refuses.
    pub fn reassociation_ies(&self, request_ies: &[u8]) -> Vec<u8> {
        let tspecs = ie::rde_tspecs(request_ies, TSID_MAX as usize + 1);
        if !self.config.accept || tspecs.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        ie::write_rde_header(&mut out, tspecs.len() as u8);
        for tspec in tspecs {
            out.extend_from_slice(self.admit(tspec).as_bytes());
        }
        out
    }
}
