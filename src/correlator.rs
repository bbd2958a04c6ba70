//! Inbound WMM action frames: ADDTS responses matched to outstanding requests by dialog
//! token, and DELTS sent by the AP.

use crate::cac::Cac;
use crate::codec::TspecRecord;
use crate::error::{CacError, Result};
use crate::frame::{self, WmmFrame, ADDTS_STATUS_ACCEPTED};
use crate::ie;
use crate::station::{AccessCategory, StaLink, Station};
use tracing::{debug, error, warn};

/// Result of applying an ADDTS response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddtsOutcome {
    /// Traffic parameters installed for `priority` with the (possibly summed) medium time.
    Admitted { id: u8, priority: u8, medium_time: u16 },
    /// The AP refused; the pending entry is gone.
    Rejected { id: u8, status: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmmEvent {
    Addts(AddtsOutcome),
    /// AP tore down the stream with this TSID.
    Delts(u8),
    Ignored,
}

impl Cac {
    /// Dispatch a WMM action body (category octet first).
    pub fn on_wmm_action<S: Station>(&mut self, link: &mut StaLink, sta: &mut S, body: &[u8]) -> Result<WmmEvent> {
        match frame::parse_wmm_action(body)? {
            WmmFrame::AddtsResponse {
                dialog_token,
                status,
                tspec,
                ies,
            } => self
                .on_addts_response(link, sta, dialog_token, status, &tspec, ies)
                .map(WmmEvent::Addts),
            WmmFrame::Delts { tspec } => Ok(self
                .on_delts_request(link, sta, &tspec)?
                .map_or(WmmEvent::Ignored, WmmEvent::Delts)),
            WmmFrame::AddtsRequest { .. } | WmmFrame::Other { .. } => Ok(WmmEvent::Ignored),
        }
    }

    /// Apply an ADDTS response. The matching entry's token is consumed first, so a
    /// repeated response fails with `NoMatchingRequest` and changes nothing.
    pub fn on_addts_response<S: Station>(
        &mut self,
        link: &mut StaLink,
        sta: &mut S,
        dialog_token: u8,
        status: u8,
        tspec: &TspecRecord,
        ies: &[u8],
    ) -> Result<AddtsOutcome> {
        if !link.is_connected() || link.peer.is_none() {
            return Err(CacError::NotConnected);
        }
        let bssid = link.bssid().ok_or(CacError::NotConnected)?;

        let Some(entry) = self.registry.find_by_token_mut(dialog_token) else {
            warn!(dialog_token, "ADDTS response matches no request");
            return Err(CacError::NoMatchingRequest(dialog_token));
        };
        entry.dialog_token = 0;
        let (id, was_accepted) = (entry.id, entry.accepted);
        let requested_up = entry.record.user_priority();

        if status != ADDTS_STATUS_ACCEPTED {
            warn!(id, dialog_token, status, "ADDTS rejected");
            self.last_error = Some(status);
            if let Err(e) = self.registry.remove(id, false) {
                warn!(id, "dropping rejected TSPEC failed: {}", e);
            }
            return Ok(AddtsOutcome::Rejected { id, status });
        }
        if was_accepted {
            warn!(id, dialog_token, "ADDTS response for a stream already admitted");
            return Err(CacError::NoMatchingRequest(dialog_token));
        }

        let ac = AccessCategory::from_priority(requested_up as u32)
            .ok_or(CacError::ProtocolError(requested_up as u32))?;
        let mut medium_time = tspec.medium_time();
        let min_data_rate = tspec.min_data_rate();
        let mut priority = requested_up;

        let established = link.peer.as_ref().map_or(0, |p| p.established);
        let ac_established = ac.priorities().into_iter().find(|&p| established & (1 << p) != 0);
        if let Some(prev) = ac_established {
            if let Some(stale) = self.registry.find(id, true) {
                // medium-time update for a stream already admitted under this id
                let stale_up = stale.record.user_priority();
                self.registry.remove(id, true)?;
                priority = stale_up;
            } else {
                let shared = self
                    .registry
                    .accepted()
                    .find(|e| AccessCategory::from_priority(e.record.user_priority() as u32) == Some(ac))
                    .map(|e| (e.record.user_priority(), e.record.medium_time()));
                let Some((shared_up, shared_time)) = shared else {
                    error!(id, prev, "no admitted stream backs the established priority");
                    return Err(CacError::NoPriorAdmission(prev));
                };
                medium_time = medium_time.saturating_add(shared_time);
                priority = shared_up;
            }
            if priority != requested_up {
                if let Some(pending) = self.registry.find_mut(id, false) {
                    pending.record.set_user_priority(priority);
                }
            }
        }

        sta.set_traffic_parameters(priority, medium_time, min_data_rate, &bssid, self.timeout())
            .map_err(|e| {
                error!(id, priority, "setting traffic parameters failed: {}", e);
                CacError::Firmware(e.to_string())
            })?;

        if link.extended_mode() {
            self.program_msdu_lifetime(sta, ies)?;
        }

        let entry = self.registry.find_mut(id, false).ok_or(CacError::NotFound(id))?;
        entry.record.set_medium_time(medium_time);
        self.registry.accept(id);
        self.last_error = None;
        if let Some(peer) = link.peer.as_mut() {
            peer.set_established(priority);
        }
        debug!(id, priority, medium_time, "TSPEC admitted");
        self.refresh_ric(link, sta);
        Ok(AddtsOutcome::Admitted {
            id,
            priority,
            medium_time,
        })
    }

    /// Remember the current MSDU lifetime, then program the one the AP asked for.
    fn program_msdu_lifetime<S: Station>(&mut self, sta: &mut S, ies: &[u8]) -> Result<()> {
        let lifetime = ie::edca_lifetime(ies).map_or(self.config.default_msdu_lifetime, |(_, l)| l);
        match sta.max_msdu_lifetime(self.timeout()) {
            Ok(previous) => self.previous_msdu_lifetime = Some(previous),
            Err(e) => {
                self.previous_msdu_lifetime = None;
                error!("reading MSDU lifetime failed: {}", e);
                return Err(CacError::Firmware(e.to_string()));
            }
        }
        sta.set_max_msdu_lifetime(lifetime, self.timeout())
            .map_err(|e| CacError::Firmware(e.to_string()))
    }

    /// AP-initiated teardown. Returns the TSID torn down, or `None` when there was nothing
    /// to tear down (no connected peer, no accepted entry for the TSID).
    pub fn on_delts_request<S: Station>(&mut self, link: &mut StaLink, sta: &mut S, tspec: &TspecRecord) -> Result<Option<u8>> {
        let tsid = tspec.tsid();
        if !link.is_connected() || link.peer.is_none() {
            warn!(tsid, "DELTS without a connected peer");
            return Ok(None);
        }
        let Some(entry) = self.registry.find(tsid, true) else {
            warn!(tsid, "DELTS for a TSID that is not admitted");
            return Ok(None);
        };
        let record = entry.record;
        let priority = record.user_priority();
        sta.remove_traffic_parameters(priority, self.timeout())
            .map_err(|e| {
                error!(tsid, priority, "removing traffic parameters failed: {}", e);
                CacError::Firmware(e.to_string())
            })?;
        self.finish_teardown(link, sta, tsid, &record);
        debug!(tsid, "TSPEC torn down by AP");
        Ok(Some(tsid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimStation, StationCall};
    use crate::station::{Bss, Peer};

    const BSSID: [u8; 6] = [0x02, 0, 0, 0, 0, 1];

    fn link() -> StaLink {
        StaLink::connected(
            [0x02, 0, 0, 0, 0, 2],
            Bss {
                bssid: BSSID,
                ..Default::default()
            },
            Peer {
                address: BSSID,
                ..Default::default()
            },
        )
    }

    fn pending(cac: &mut Cac, id: u8, up: u32, token: u8) {
        cac.create_tspec(Some(id as i64)).unwrap();
        cac.config_tspec(id, "tsid", id as u32).unwrap();
        cac.config_tspec(id, "user_priority", up).unwrap();
        cac.registry.find_mut(id, false).unwrap().dialog_token = token;
    }

    fn response(medium_time: u16) -> TspecRecord {
        let mut r = TspecRecord::new();
        r.set_medium_time(medium_time);
        r.set_min_data_rate(64_000);
        r
    }

    #[test]
    fn same_id_update_replaces_stale_entry() {
        let mut cac = Cac::default();
        let mut link = link();
        let mut sta = SimStation::default();

        pending(&mut cac, 2, 7, 5);
        cac.on_addts_response(&mut link, &mut sta, 5, 0, &response(100), &[]).unwrap();
        assert!(link.peer.as_ref().unwrap().is_established(7));

        // renegotiation of the admitted stream at the other voice priority
        pending(&mut cac, 2, 6, 9);
        let outcome = cac.on_addts_response(&mut link, &mut sta, 9, 0, &response(300), &[]).unwrap();
        assert_eq!(
            outcome,
            AddtsOutcome::Admitted {
                id: 2,
                priority: 7,
                medium_time: 300
            }
        );
        assert_eq!(cac.registry.accepted_count(), 1);
        let entry = cac.registry.find(2, true).unwrap();
        assert_eq!(entry.record().user_priority(), 7);
        assert_eq!(entry.record().medium_time(), 300);
        assert!(cac.registry.find(2, false).is_none());
    }

    #[test]
    fn second_tsid_in_category_shares_medium_time() {
        let mut cac = Cac::default();
        let mut link = link();
        let mut sta = SimStation::default();

        pending(&mut cac, 0, 6, 1);
        cac.on_addts_response(&mut link, &mut sta, 1, 0, &response(0x100), &[]).unwrap();
        pending(&mut cac, 1, 7, 2);
        let outcome = cac.on_addts_response(&mut link, &mut sta, 2, 0, &response(0x80), &[]).unwrap();
        assert_eq!(
            outcome,
            AddtsOutcome::Admitted {
                id: 1,
                priority: 6,
                medium_time: 0x180
            }
        );
        assert_eq!(cac.registry.find(1, true).unwrap().record().user_priority(), 6);
        assert_eq!(
            sta.calls.iter().filter(|c| matches!(c, StationCall::SetTraffic { .. })).last(),
            Some(&StationCall::SetTraffic {
                priority: 6,
                medium_time: 0x180,
                min_data_rate: 64_000,
                bssid: BSSID
            })
        );
    }

    #[test]
    fn established_priority_without_entry_fails() {
        let mut cac = Cac::default();
        let mut link = link();
        let mut sta = SimStation::default();
        link.peer.as_mut().unwrap().set_established(4);
        pending(&mut cac, 3, 5, 7);
        let err = cac.on_addts_response(&mut link, &mut sta, 7, 0, &response(10), &[]).unwrap_err();
        assert!(matches!(err, CacError::NoPriorAdmission(4)));
        assert_eq!(cac.registry.accepted_count(), 0);
    }

    #[test]
    fn firmware_failure_leaves_entry_pending() {
        let mut cac = Cac::default();
        let mut link = link();
        let mut sta = SimStation {
            fail_set_traffic: true,
            ..Default::default()
        };
        pending(&mut cac, 0, 0, 3);
        let err = cac.on_addts_response(&mut link, &mut sta, 3, 0, &response(10), &[]).unwrap_err();
        assert!(matches!(err, CacError::Firmware(_)));
        let entry = cac.registry.find(0, false).unwrap();
        assert_eq!(entry.dialog_token(), 0);
        assert_eq!(link.peer.as_ref().unwrap().established, 0);
    }

    #[test]
    fn extended_mode_programs_lifetime() {
        let mut cac = Cac::default();
        let mut link = link();
        link.bss.as_mut().unwrap().extended_mode = true;
        let mut sta = SimStation {
            lifetime: 100,
            ..Default::default()
        };
        pending(&mut cac, 0, 6, 1);
        let edca = [0xdd, 7, 0x00, 0x40, 0x96, 0x09, 0, 0x2c, 0x01];
        cac.on_addts_response(&mut link, &mut sta, 1, 0, &response(10), &edca).unwrap();
        assert_eq!(sta.lifetime, 300);
        assert_eq!(cac.previous_msdu_lifetime, Some(100));

        let delts = frame::delts_body(cac.registry.find(0, true).unwrap().record());
        assert_eq!(cac.on_wmm_action(&mut link, &mut sta, &delts).unwrap(), WmmEvent::Delts(0));
        assert_eq!(sta.lifetime, 100);
    }

    #[test]
    fn lifetime_read_failure_invalidates_memo() {
        let mut cac = Cac::default();
        cac.previous_msdu_lifetime = Some(7);
        let mut link = link();
        link.bss.as_mut().unwrap().extended_mode = true;
        let mut sta = SimStation {
            fail_lifetime: true,
            ..Default::default()
        };
        pending(&mut cac, 0, 6, 1);
        assert!(cac.on_addts_response(&mut link, &mut sta, 1, 0, &response(10), &[]).is_err());
        assert_eq!(cac.previous_msdu_lifetime, None);
        assert!(cac.registry.find(0, true).is_none());
    }

    #[test]
    fn peer_delts_for_unknown_tsid_is_ignored() {
        let mut cac = Cac::default();
        let mut link = link();
        let mut sta = SimStation::default();
        let mut r = TspecRecord::new();
        r.set("tsid", 5).unwrap();
        assert_eq!(cac.on_delts_request(&mut link, &mut sta, &r).unwrap(), None);
        link.state = crate::station::LinkState::Disconnected;
        assert_eq!(cac.on_delts_request(&mut link, &mut sta, &r).unwrap(), None);
        assert!(sta.calls.is_empty());
    }

    #[test]
    fn non_tspec_actions_are_ignored() {
        let mut cac = Cac::default();
        let mut link = link();
        let mut sta = SimStation::default();
        assert_eq!(cac.on_wmm_action(&mut link, &mut sta, &[17, 5, 0, 0]).unwrap(), WmmEvent::Ignored);
        let req = frame::addts_request(&BSSID, &BSSID, 1, &TspecRecord::new());
        let body = frame::split_mgmt(&req).unwrap();
        assert_eq!(cac.on_wmm_action(&mut link, &mut sta, body).unwrap(), WmmEvent::Ignored);
    }
}
