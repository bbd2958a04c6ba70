//! The admission-control engine value owned by a station interface.
//!
//! [`Cac`] holds the TSPEC [`Registry`] plus the little per-connection state the
//! negotiation needs (dialog-token counter, remembered MSDU lifetime, last admission
//! error). Operations are split by concern across `admission`, `correlator`, `rde` and
//! `roam`; each takes the link state and the station collaborator explicitly.

use crate::config::CacConfig;
use crate::error::Result;
use crate::registry::{ActiveTspec, Registry};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Cac {
    pub(crate) registry: Registry,
    pub(crate) config: CacConfig,
    dialog_token_next: u8,
    /// Lifetime MIB value before the last extended-mode admission; `None` when not valid.
    pub(crate) previous_msdu_lifetime: Option<u16>,
    pub(crate) last_error: Option<u8>,
}

impl Cac {
    pub fn new(config: CacConfig) -> Self {
        Cac {
            config,
            ..Default::default()
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &CacConfig {
        &self.config
    }

    /// Status of the last rejected ADDTS, cleared by the next admission or DELTS.
    pub fn last_admission_error(&self) -> Option<u8> {
        self.last_error
    }

    pub fn create_tspec(&mut self, id: Option<i64>) -> Result<u8> {
        self.registry.create(id)
    }

    pub fn config_tspec(&mut self, id: u8, field: &str, value: u32) -> Result<()> {
        self.registry.configure(id, field, value)
    }

    pub fn active_tspecs(&self) -> Vec<ActiveTspec> {
        self.registry.snapshot_accepted()
    }

    /// Link dropped: nothing stays admitted, entries are kept for renegotiation.
    pub fn on_link_lost(&mut self) {
        self.registry.deactivate_all();
    }

    /// Disconnect: forget every TSPEC.
    pub fn on_disconnect(&mut self) {
        debug!(entries = self.registry.iter().count(), "clearing TSPEC registry");
        self.registry.clear_all();
        self.previous_msdu_lifetime = None;
        self.last_error = None;
    }

    /// Next ADDTS dialog token, cycling through 1..=255.
    pub(crate) fn next_dialog_token(&mut self) -> u8 {
        if self.dialog_token_next == 0 {
            self.dialog_token_next = 1;
        }
        let token = self.dialog_token_next;
        self.dialog_token_next = self.dialog_token_next.wrapping_add(1);
        token
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.config.confirm_timeout()
    }
}
