//! IE and action-frame fuzz target: feed arbitrary bytes to the element reader, the
//! Resource Descriptor parser and the WMM action parser. None of them may panic.
//! Build with: cargo fuzz run ie_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let _ = wmm_cac::ie::Reader::new(data).count();
    let _ = wmm_cac::ie::rde_tspecs(data, 8);
    let _ = wmm_cac::ie::supported_rates(data);
    let _ = wmm_cac::ie::edca_lifetime(data);
    let _ = wmm_cac::frame::parse_wmm_action(data);
    if let Some(body) = wmm_cac::frame::split_mgmt(data) {
        let _ = wmm_cac::frame::parse_wmm_action(body);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run ie_fuzz");
}
