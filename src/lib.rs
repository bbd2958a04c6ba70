//! # wmm-cac: client-side WMM Call Admission Control
//!
//! Station-side negotiation of WMM traffic streams with an access point:
//!
//! - **codec**: table-driven get/set of the fields of a WMM TSPEC element
//! - **registry**: locally configured TSPECs, keyed by (id, accepted)
//! - **admission**: ADDTS requests (with the optional bandwidth and rate-set vendor IEs) and DELTS
//! - **correlator**: ADDTS responses matched by dialog token, AP-initiated DELTS
//! - **rde**: the Resource Descriptor IE announcing admitted streams at reassociation
//! - **roam**: re-accepting the streams a new AP carried over
//!
//! The engine ([`Cac`]) owns no link state and no firmware handle; every operation takes
//! the station link ([`StaLink`]) and a [`Station`] collaborator explicitly.
//!
//! ## Usage
//!
//! ```no_run
//! use wmm_cac::sim::{SimAccessPoint, SimStation};
//! use wmm_cac::{Cac, CacConfig};
//!
//! let config = CacConfig::default();
//! let ap = SimAccessPoint::new([0x02, 0, 0, 0, 0, 1], config.sim.clone());
//! let mut link = ap.associate([0x02, 0, 0, 0, 0, 2], false);
//! let mut sta = SimStation::default();
//! let mut cac = Cac::new(config);
//!
//! let id = cac.create_tspec(None)?;
//! cac.config_tspec(id, "tsid", id as u32)?;
//! cac.config_tspec(id, "user_priority", 6)?;
//! let request = cac.send_addts(&link, &mut sta, id, false)?;
//! if let Some(response) = ap.respond(&request) {
//!     cac.on_wmm_action(&mut link, &mut sta, &response)?;
//! }
//! assert_eq!(cac.active_tspecs().len(), 1);
//! # Ok::<(), wmm_cac::CacError>(())
//! ```

pub mod admission;
pub mod cac;
pub mod codec;
pub mod config;
pub mod control;
pub mod correlator;
pub mod dump;
pub mod error;
pub mod frame;
pub mod ie;
pub mod rde;
pub mod registry;
pub mod roam;
pub mod sim;
pub mod station;

pub use cac::Cac;
pub use codec::{FieldDescriptor, TspecRecord, TSPEC_FIELDS};
pub use config::{CacConfig, SimConfig};
pub use control::{parse_command, parse_script, Command, Reply};
pub use correlator::{AddtsOutcome, WmmEvent};
pub use error::{CacError, Result, StationError};
pub use frame::{parse_wmm_action, WmmFrame};
pub use registry::{ActiveTspec, Registry, TspecEntry};
pub use station::{AccessCategory, Bss, MacAddr, Peer, StaLink, Station};
