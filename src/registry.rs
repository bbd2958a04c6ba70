//! TSPEC registry: every locally configured traffic stream, keyed by (id, accepted).
//!
//! Storage is a fixed arena of 8 ids x 2 states, so the "at most one entry per
//! (id, accepted)" invariant holds by construction. An id may have one pending entry
//! (being configured or negotiated) and one accepted entry (admitted by the AP) at once.

use crate::codec::{TspecRecord, TSID_MAX};
use crate::error::{CacError, Result};
use tracing::debug;

const NUM_IDS: usize = TSID_MAX as usize + 1;

/// One locally configured TSPEC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TspecEntry {
    pub(crate) id: u8,
    pub(crate) record: TspecRecord,
    /// `psb` was set explicitly rather than inherited from the peer's U-APSD flags.
    pub(crate) psb_specified: bool,
    /// A bandwidth (EBW) IE was appended to the last ADDTS request.
    pub(crate) ebw: bool,
    pub(crate) accepted: bool,
    /// Outstanding ADDTS dialog token; 0 when none.
    pub(crate) dialog_token: u8,
}

impl TspecEntry {
    fn new(id: u8) -> Self {
        TspecEntry {
            id,
            record: TspecRecord::new(),
            psb_specified: false,
            ebw: false,
            accepted: false,
            dialog_token: 0,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn record(&self) -> &TspecRecord {
        &self.record
    }

    pub fn psb_specified(&self) -> bool {
        self.psb_specified
    }

    pub fn ebw(&self) -> bool {
        self.ebw
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn dialog_token(&self) -> u8 {
        self.dialog_token
    }

    pub fn field(&self, name: &str) -> Result<u32> {
        self.record.get(name)
    }

    /// Write a named field; writing `psb` marks power-save behaviour as explicitly specified.
    pub fn set_field(&mut self, name: &str, value: u32) -> Result<()> {
        let d = self.record.set(name, value)?;
        if d.is_psb() {
            self.psb_specified = true;
        }
        Ok(())
    }
}

/// Copy of an admitted TSPEC, as exported for telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTspec {
    pub record: TspecRecord,
    pub ebw: bool,
}

#[derive(Debug, Default)]
pub struct Registry {
    slots: [[Option<TspecEntry>; 2]; NUM_IDS],
    next_id: u8,
}

fn state(accepted: bool) -> usize {
    accepted as usize
}

fn index(id: u8) -> Option<usize> {
    if id <= TSID_MAX {
        Some(id as usize)
    } else {
        None
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u8 {
        if self.next_id <= TSID_MAX {
            let id = self.next_id;
            self.next_id += 1;
            id
        } else {
            self.next_id = 1;
            0
        }
    }

    /// Create a pending entry. Without an explicit id the next id of the 0-7 round-robin
    /// counter is used. Fails with `IdInUse` when that id already has a pending entry.
    pub fn create(&mut self, requested: Option<i64>) -> Result<u8> {
        let id = match requested {
            Some(id) => id,
            None => self.allocate_id() as i64,
        };
        if !(0..=TSID_MAX as i64).contains(&id) {
            return Err(CacError::OutOfRange(id));
        }
        let id = id as u8;
        let slot = &mut self.slots[id as usize][state(false)];
        if slot.is_some() {
            return Err(CacError::IdInUse(id));
        }
        *slot = Some(TspecEntry::new(id));
        debug!(id, "created TSPEC entry");
        Ok(id)
    }

    pub fn find(&self, id: u8, accepted: bool) -> Option<&TspecEntry> {
        self.slots.get(index(id)?)?[state(accepted)].as_ref()
    }

    pub fn find_mut(&mut self, id: u8, accepted: bool) -> Option<&mut TspecEntry> {
        self.slots.get_mut(index(id)?)?[state(accepted)].as_mut()
    }

    /// Entry (in either state) waiting on `token`. Token 0 never matches.
    pub fn find_by_token_mut(&mut self, token: u8) -> Option<&mut TspecEntry> {
        if token == 0 {
            return None;
        }
        self.iter_mut().find(|e| e.dialog_token == token)
    }

    /// Remove the exact (id, accepted) entry.
    pub fn remove(&mut self, id: u8, accepted: bool) -> Result<TspecEntry> {
        let entry = index(id)
            .and_then(|i| self.slots[i][state(accepted)].take())
            .ok_or(CacError::NotFound(id))?;
        debug!(id, accepted, "removed TSPEC entry");
        Ok(entry)
    }

    /// The entry `remove_by_id` would take: the pending one if any, else the accepted one.
    pub fn first_by_id(&self, id: u8) -> Option<&TspecEntry> {
        self.find(id, false).or_else(|| self.find(id, true))
    }

    /// Remove the first entry with `id` regardless of state.
    pub fn remove_by_id(&mut self, id: u8) -> Result<TspecEntry> {
        let accepted = self.first_by_id(id).ok_or(CacError::NotFound(id))?.accepted;
        self.remove(id, accepted)
    }

    /// Set a field on the pending entry for `id`.
    pub fn configure(&mut self, id: u8, field: &str, value: u32) -> Result<()> {
        self.find_mut(id, false)
            .ok_or(CacError::InvalidTsid(id))?
            .set_field(field, value)
    }

    /// Move the pending entry for `id` to the accepted state. A stale accepted entry with
    /// the same id is dropped.
    pub fn accept(&mut self, id: u8) -> Option<&mut TspecEntry> {
        let i = index(id)?;
        let mut entry = self.slots[i][state(false)].take()?;
        entry.accepted = true;
        if let Some(stale) = self.slots[i][state(true)].replace(entry) {
            debug!(id, token = stale.dialog_token, "replaced stale accepted TSPEC");
        }
        self.slots[i][state(true)].as_mut()
    }

    /// Move the accepted entry for `id` back to pending. If a pending entry already exists
    /// for that id it is kept and the demoted one is dropped. Returns false if nothing was accepted.
    pub fn deactivate(&mut self, id: u8) -> bool {
        let Some(i) = index(id) else {
            return false;
        };
        let Some(mut entry) = self.slots[i][state(true)].take() else {
            return false;
        };
        entry.accepted = false;
        entry.dialog_token = 0;
        let pending = &mut self.slots[i][state(false)];
        if pending.is_none() {
            *pending = Some(entry);
        } else {
            debug!(id, "pending TSPEC supersedes deactivated entry");
        }
        true
    }

    /// Mark every entry not accepted and forget all dialog tokens. Entries are kept, except an
    /// accepted one whose id already has a pending entry (see [`Registry::deactivate`]).
    pub fn deactivate_all(&mut self) {
        for id in 0..=TSID_MAX {
            self.deactivate(id);
        }
        for e in self.iter_mut() {
            e.dialog_token = 0;
        }
    }

    pub fn clear_all(&mut self) {
        for pair in self.slots.iter_mut() {
            *pair = [None, None];
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TspecEntry> {
        self.slots.iter().flat_map(|pair| pair.iter().flatten())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TspecEntry> {
        self.slots.iter_mut().flat_map(|pair| pair.iter_mut().flatten())
    }

    pub fn accepted(&self) -> impl Iterator<Item = &TspecEntry> {
        self.iter().filter(|e| e.accepted)
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn snapshot_accepted(&self) -> Vec<ActiveTspec> {
        self.accepted()
            .map(|e| ActiveTspec { record: e.record, ebw: e.ebw })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_ids_wrap_without_evicting() {
        let mut reg = Registry::new();
        for expected in 0..8 {
            assert_eq!(reg.create(None).unwrap(), expected);
        }
        assert!(matches!(reg.create(None), Err(CacError::IdInUse(0))));
        assert_eq!(reg.iter().count(), 8);
        // counter moved on to 1
        reg.remove(1, false).unwrap();
        assert_eq!(reg.create(None).unwrap(), 1);
    }

    #[test]
    fn explicit_id_out_of_range() {
        let mut reg = Registry::new();
        assert!(matches!(reg.create(Some(8)), Err(CacError::OutOfRange(8))));
        assert!(matches!(reg.create(Some(-1)), Err(CacError::OutOfRange(-1))));
        assert_eq!(reg.create(Some(7)).unwrap(), 7);
        assert!(matches!(reg.create(Some(7)), Err(CacError::IdInUse(7))));
    }

    #[test]
    fn configure_targets_pending_entry() {
        let mut reg = Registry::new();
        assert!(matches!(reg.configure(3, "tsid", 3), Err(CacError::InvalidTsid(3))));
        reg.create(Some(3)).unwrap();
        reg.configure(3, "user_priority", 6).unwrap();
        assert_eq!(reg.find(3, false).unwrap().record().user_priority(), 6);
        assert!(!reg.find(3, false).unwrap().psb_specified());
        reg.configure(3, "PSB", 1).unwrap();
        assert!(reg.find(3, false).unwrap().psb_specified());
    }

    #[test]
    fn psb_out_of_range_is_not_specified() {
        let mut reg = Registry::new();
        reg.create(Some(0)).unwrap();
        assert!(reg.configure(0, "psb", 2).is_err());
        assert!(!reg.find(0, false).unwrap().psb_specified());
    }

    #[test]
    fn accept_and_deactivate() {
        let mut reg = Registry::new();
        reg.create(Some(2)).unwrap();
        reg.find_mut(2, false).unwrap().dialog_token = 9;
        assert!(reg.accept(2).is_some());
        assert!(reg.find(2, false).is_none());
        assert!(reg.find(2, true).is_some());
        reg.create(Some(2)).unwrap();
        assert_eq!(reg.iter().count(), 2);
        reg.deactivate_all();
        assert_eq!(reg.accepted_count(), 0);
        assert_eq!(reg.iter().count(), 1);
        assert!(reg.iter().all(|e| e.dialog_token() == 0));
    }

    #[test]
    fn remove_by_id_prefers_pending() {
        let mut reg = Registry::new();
        reg.create(Some(4)).unwrap();
        reg.accept(4);
        reg.create(Some(4)).unwrap();
        assert!(!reg.remove_by_id(4).unwrap().is_accepted());
        assert!(reg.remove_by_id(4).unwrap().is_accepted());
        assert!(matches!(reg.remove_by_id(4), Err(CacError::NotFound(4))));
    }

    #[test]
    fn token_zero_never_matches() {
        let mut reg = Registry::new();
        reg.create(None).unwrap();
        assert!(reg.find_by_token_mut(0).is_none());
    }

    #[test]
    fn one_entry_per_id_and_state() {
        let mut reg = Registry::new();
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let id = ((seed >> 16) % 8) as u8;
            match (seed >> 8) % 5 {
                0 => {
                    let _ = reg.create(None);
                }
                1 => {
                    let _ = reg.create(Some(id as i64));
                }
                2 => {
                    reg.accept(id);
                }
                3 => {
                    let _ = reg.remove_by_id(id);
                }
                _ => {
                    reg.deactivate(id);
                }
            }
            for id in 0..8u8 {
                let pending = reg.iter().filter(|e| e.id() == id && !e.is_accepted()).count();
                let accepted = reg.iter().filter(|e| e.id() == id && e.is_accepted()).count();
                assert!(pending <= 1 && accepted <= 1);
            }
        }
    }
}
