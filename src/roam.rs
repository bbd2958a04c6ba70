//! Resynchronization after a roam: the new AP's association response lists, through
//! Resource Descriptor elements, which of our streams it carried over.

use crate::cac::Cac;
use crate::ie;
use crate::station::{StaLink, Station};
use tracing::{debug, error, warn};

impl Cac {
    /// Demote every entry, then re-accept the ones the association response admits.
    /// Returns the ids recovered, in response order.
    pub fn on_roam<S: Station>(&mut self, link: &mut StaLink, sta: &mut S) -> Vec<u8> {
        self.registry.deactivate_all();
        let Some(peer) = link.peer.as_ref() else {
            error!("roam without a peer");
            return Vec::new();
        };
        let bssid = link.bssid().unwrap_or(peer.address);
        let recovered = ie::rde_tspecs(&peer.assoc_resp_ies, self.config.max_roam_tspecs);
        debug!(count = recovered.len(), "TSPECs in association response");

        let mut ids = Vec::with_capacity(recovered.len());
        for tspec in recovered {
            let tsid = tspec.tsid();
            let Some(entry) = self.registry.find_mut(tsid, false) else {
                warn!(tsid, "AP admitted a TSPEC that was never requested");
                continue;
            };
            entry.record.set_medium_time(tspec.medium_time());
            entry.record.set_min_data_rate(tspec.min_data_rate());
            let priority = entry.record.user_priority();
            self.registry.accept(tsid);
            if let Some(peer) = link.peer.as_mut() {
                peer.set_established(priority);
            }
            if let Err(e) = sta.set_traffic_parameters(
                priority,
                tspec.medium_time(),
                tspec.min_data_rate(),
                &bssid,
                self.timeout(),
            ) {
                warn!(tsid, priority, "restoring traffic parameters failed: {}", e);
            }
            ids.push(tsid);
        }
        if !ids.is_empty() {
            self.refresh_ric(link, sta);
        }
        ids
    }
}
