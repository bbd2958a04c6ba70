//! Outbound negotiation: ADDTS requests, DELTS teardown, and deletion with teardown.

use crate::cac::Cac;
use crate::codec::TspecRecord;
use crate::error::{CacError, Result};
use crate::frame;
use crate::ie;
use crate::station::{AccessCategory, FrameKind, StaLink, Station};
use tracing::{debug, error, warn};

/// Highest rate offered in a TSRS element, 500 kb/s units (24 Mb/s).
pub const TSRS_RATE_CEILING: u8 = 48;
/// Rate assumed when the BSS advertises none (6 Mb/s).
pub const FALLBACK_RATE: u8 = 12;

/// Rate for the TSRS element, `None` when the minimum PHY rate is met exactly and the
/// element can be left out.
pub fn tsrs_rate(bss_rates: &[u8], min_phy_rate: u32) -> Result<Option<u8>> {
    let fallback = [FALLBACK_RATE];
    let rates = if bss_rates.is_empty() { &fallback[..] } else { bss_rates };
    let eligible = rates.iter().copied().filter(|&r| r <= TSRS_RATE_CEILING);
    match eligible.clone().filter(|&r| bps(r) >= min_phy_rate).min() {
        Some(r) if bps(r) == min_phy_rate => Ok(None),
        Some(r) => Ok(Some(r)),
        None => Err(CacError::RateTooLow {
            rate: eligible.max().map_or(0, bps),
            min_phy_rate,
        }),
    }
}

fn bps(rate: u8) -> u32 {
    rate as u32 * 500_000
}

impl Cac {
    /// Build an ADDTS request for the pending entry `id` and hand it to the transport.
    ///
    /// Returns the transmitted frame (management header included). The dialog token is
    /// recorded on the entry before the send and is left in place if the send fails.
    pub fn send_addts<S: Station>(&mut self, link: &StaLink, sta: &mut S, id: u8, ebw: bool) -> Result<Vec<u8>> {
        if self.registry.find(id, false).is_none() {
            return Err(CacError::InvalidTsid(id));
        }
        if self.registry.find(id, true).is_some() {
            return Err(CacError::AlreadyAccepted(id));
        }
        let (bss, peer) = match (&link.bss, &link.peer) {
            (Some(bss), Some(peer)) if link.is_connected() => (bss, peer),
            _ => return Err(CacError::NotConnected),
        };

        let token = self.next_dialog_token();
        let entry = self.registry.find_mut(id, false).ok_or(CacError::InvalidTsid(id))?;
        if !entry.psb_specified {
            let up = entry.record.user_priority();
            if AccessCategory::from_priority(up as u32).map_or(false, |ac| peer.uapsd(ac)) {
                entry.record.set_psb(true);
            }
        }
        let tsid = entry.record.tsid();
        entry.ebw = ebw;

        let mut out = frame::addts_request(&bss.bssid, &link.own_addr, token, &entry.record);
        if ebw {
            ie::write_ebw(&mut out, tsid);
        }
        if bss.extended_mode {
            let rates = ie::supported_rates(&bss.ies);
            if let Some(rate) = tsrs_rate(&rates, entry.record.min_phy_rate())? {
                ie::write_tsrs(&mut out, tsid, &[rate]);
            }
        }

        entry.dialog_token = token;
        debug!(id, tsid, token, "sending ADDTS request");
        sta.send_mgmt_frame(&bss.bssid, &out, FrameKind::Action, self.timeout())
            .map_err(|e| {
                error!(id, token, "ADDTS send failed: {}", e);
                CacError::Transport(e.to_string())
            })?;
        Ok(out)
    }

    /// Tear down the accepted entry `id`: DELTS to the AP, then release the firmware
    /// traffic parameters. The entry returns to the pending state.
    pub fn send_delts<S: Station>(&mut self, link: &mut StaLink, sta: &mut S, id: u8) -> Result<Vec<u8>> {
        let record = *self.registry.find(id, true).ok_or(CacError::InvalidTsid(id))?.record();
        if !link.is_connected() || link.peer.is_none() {
            return Err(CacError::NotConnected);
        }
        let bssid = link.bssid().ok_or(CacError::NotConnected)?;

        let out = frame::delts(&bssid, &link.own_addr, &record);
        sta.send_mgmt_frame(&bssid, &out, FrameKind::Action, self.timeout())
            .map_err(|e| {
                error!(id, "DELTS send failed: {}", e);
                CacError::Transport(e.to_string())
            })?;

        let priority = record.user_priority();
        sta.remove_traffic_parameters(priority, self.timeout())
            .map_err(|e| {
                error!(id, priority, "removing traffic parameters failed: {}", e);
                CacError::Firmware(e.to_string())
            })?;

        self.last_error = None;
        self.finish_teardown(link, sta, id, &record);
        Ok(out)
    }

    /// Delete the first entry with `id` (pending preferred). An accepted entry is torn
    /// down with a DELTS first; a failed teardown is logged and the entry removed anyway.
    pub fn delete_tspec<S: Station>(&mut self, link: &mut StaLink, sta: &mut S, id: u8) -> Result<()> {
        let accepted = self.registry.first_by_id(id).ok_or(CacError::NotFound(id))?.is_accepted();
        if accepted {
            if let Err(e) = self.send_delts(link, sta, id) {
                warn!(id, "deleting TSPEC without a clean DELTS: {}", e);
            }
        }
        self.registry.remove_by_id(id)?;
        Ok(())
    }

    /// Remove the exact (id, accepted) entry without talking to the AP.
    pub fn delete_tspec_by_state(&mut self, id: u8, accepted: bool) -> Result<()> {
        self.registry.remove(id, accepted).map(|_| ())
    }

    /// Local bookkeeping shared by local and peer-initiated teardown, after the firmware
    /// released the traffic parameters for the entry's priority.
    pub(crate) fn finish_teardown<S: Station>(&mut self, link: &mut StaLink, sta: &mut S, id: u8, record: &TspecRecord) {
        self.registry.deactivate(id);
        if let Some(peer) = link.peer.as_mut() {
            peer.clear_established(record.user_priority());
        }
        self.refresh_ric(link, sta);

        if link.extended_mode() {
            if let Some(lifetime) = self.previous_msdu_lifetime {
                if let Err(e) = sta.set_max_msdu_lifetime(lifetime, self.timeout()) {
                    error!(lifetime, "restoring MSDU lifetime failed: {}", e);
                }
            }
        }
    }
}
