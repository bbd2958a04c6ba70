//! Resource Descriptor IE: the admitted TSPECs announced in the next (re)association
//! request, so the new AP can carry the streams over.

use crate::cac::Cac;
use crate::codec::TSPEC_ELEMENT_LEN;
use crate::ie;
use crate::registry::Registry;
use crate::station::{IePurpose, StaLink, Station};
use tracing::{debug, warn};

/// `base` followed by a Resource Descriptor and one TSPEC per accepted entry, medium time
/// zeroed. Returns `base` unchanged when nothing is accepted.
pub fn association_ies(registry: &Registry, base: &[u8]) -> Vec<u8> {
    let accepted = registry.accepted_count();
    if accepted == 0 {
        return base.to_vec();
    }
    let mut out = Vec::with_capacity(base.len() + ie::RDE_LEN + accepted * TSPEC_ELEMENT_LEN);
    out.extend_from_slice(base);
    let count_at = ie::write_rde_header(&mut out, 0);
    let mut count = 0u8;
    for entry in registry.accepted() {
        let mut record = *entry.record();
        record.set_medium_time(0);
        out.extend_from_slice(record.as_bytes());
        count += 1;
    }
    out[count_at] = count;
    out
}

impl Cac {
    pub fn build_association_ies(&self, base: &[u8]) -> Vec<u8> {
        association_ies(&self.registry, base)
    }

    /// Install the current association IEs for the next (re)association attempt.
    pub fn refresh_ric<S: Station>(&self, link: &StaLink, sta: &mut S) {
        let ies = self.build_association_ies(&link.assoc_req_ies);
        debug!(len = ies.len(), accepted = self.registry.accepted_count(), "updating association IEs");
        if let Err(e) = sta.set_additional_ies(IePurpose::AssociationRequest, &ies) {
            warn!("installing association IEs failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_returns_base() {
        let reg = Registry::new();
        assert_eq!(association_ies(&reg, &[0, 3, b'a', b'b', b'c']), vec![0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn descriptor_counts_accepted_only() {
        let mut reg = Registry::new();
        for id in [1u8, 4] {
            reg.create(Some(id as i64)).unwrap();
            reg.configure(id, "tsid", id as u32).unwrap();
            reg.configure(id, "medium_time", 0x200).unwrap();
            reg.accept(id);
        }
        reg.create(Some(6)).unwrap();

        let ies = association_ies(&reg, &[]);
        assert_eq!(ies.len(), ie::RDE_LEN + 2 * TSPEC_ELEMENT_LEN);
        assert_eq!(&ies[..ie::RDE_LEN], &[57, 4, 0, 2, 0, 0]);
        let parsed = ie::rde_tspecs(&ies, 8);
        assert_eq!(parsed.iter().map(|r| r.tsid()).collect::<Vec<_>>(), vec![1, 4]);
        assert!(parsed.iter().all(|r| r.medium_time() == 0));
        // registry copy untouched
        assert_eq!(reg.find(1, true).unwrap().record().medium_time(), 0x200);
    }
}
