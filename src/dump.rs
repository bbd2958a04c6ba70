//! Format TSPEC records and WMM action frames for display (control replies, pcap dump).

use crate::codec::{FieldDescriptor, TspecRecord, TSPEC_FIELDS};
use crate::frame::WmmFrame;
use crate::registry::ActiveTspec;

/// `(multiplier, divisor, unit)` turning a raw field into its physical value.
fn quantum(name: &str) -> Option<(f64, f64, &'static str)> {
    match name {
        "min_service_interval" | "max_service_interval" | "inactivity_interval" | "suspension_interval"
        | "service_start_time" | "delay_bound" => Some((1.0, 1.0, "us")),
        "min_data_rate" | "mean_data_rate" | "peak_data_rate" | "min_phy_rate" => Some((1.0, 1e6, "Mb/s")),
        "nominal_msdu_size" | "max_msdu_size" | "max_burst_size" => Some((1.0, 1.0, "B")),
        // 32 us units
        "medium_time" => Some((32.0, 1.0, "us")),
        // 13.3 fixed point
        "surplus_bw_allowance" => Some((1.0, 8192.0, "")),
        _ => None,
    }
}

/// One field value, with its physical reading when the field carries a unit.
pub fn format_field(d: &FieldDescriptor, raw: u32) -> String {
    match quantum(d.name) {
        Some((mul, div, unit)) if raw != 0 => {
            let physical = raw as f64 * mul / div;
            if unit.is_empty() {
                format!("{} ({})", physical, raw)
            } else {
                format!("{} {} ({})", physical, unit, raw)
            }
        }
        _ if d.read_only => format!("0x{:02x}", raw),
        _ => format!("{}", raw),
    }
}

/// Every field of the element, one `name: value` line each.
pub fn tspec_to_dump(record: &TspecRecord, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    TSPEC_FIELDS
        .iter()
        .map(|d| format!("{}{}: {}", pad, d.name, format_field(d, record.read(d))))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compact one-line summary (for lists).
pub fn tspec_summary_line(record: &TspecRecord) -> String {
    format!(
        "tsid={} up={} dir={} psb={} medium_time={} min_data_rate={}",
        record.tsid(),
        record.user_priority(),
        record.get("direction").unwrap_or_default(),
        record.psb() as u8,
        record.medium_time(),
        record.min_data_rate()
    )
}

pub fn active_to_dump(active: &[ActiveTspec]) -> String {
    if active.is_empty() {
        return "no active TSPECs".to_string();
    }
    active
        .iter()
        .map(|a| {
            format!(
                "{}{}",
                tspec_summary_line(&a.record),
                if a.ebw { " ebw" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Multi-line dump of a parsed WMM action body.
pub fn frame_to_dump(frame: &WmmFrame<'_>) -> String {
    let (head, tspec, ies) = match frame {
        WmmFrame::AddtsRequest {
            dialog_token,
            tspec,
            ies,
        } => (format!("ADDTS request token={}", dialog_token), Some(tspec), *ies),
        WmmFrame::AddtsResponse {
            dialog_token,
            status,
            tspec,
            ies,
        } => (
            format!("ADDTS response token={} status=0x{:02x}", dialog_token, status),
            Some(tspec),
            *ies,
        ),
        WmmFrame::Delts { tspec } => ("DELTS".to_string(), Some(tspec), &[][..]),
        WmmFrame::Other { action } => (format!("WMM action {}", action), None, &[][..]),
    };
    let mut lines = vec![head];
    if let Some(tspec) = tspec {
        lines.push(tspec_to_dump(tspec, 1));
    }
    if !ies.is_empty() {
        lines.push(format!("  ies: hex({})", hex_string(ies)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_and_raw_values() {
        let mut r = TspecRecord::new();
        r.set("min_phy_rate", 6_000_000).unwrap();
        r.set_medium_time(10);
        let dump = tspec_to_dump(&r, 0);
        assert!(dump.contains("min_phy_rate: 6 Mb/s (6000000)"));
        assert!(dump.contains("medium_time: 320 us (10)"));
        assert!(dump.contains("element_id: 0xdd"));
        assert_eq!(dump.lines().count(), TSPEC_FIELDS.len());
    }

    #[test]
    fn summary_for_active_list() {
        let mut r = TspecRecord::new();
        r.set("tsid", 3).unwrap();
        r.set_user_priority(6);
        let line = active_to_dump(&[ActiveTspec { record: r, ebw: true }]);
        assert!(line.starts_with("tsid=3 up=6"));
        assert!(line.ends_with(" ebw"));
        assert_eq!(active_to_dump(&[]), "no active TSPECs");
    }
}
