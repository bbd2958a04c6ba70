//! Decode WMM ADDTS/DELTS action frames from an 802.11 capture (pcap or pcapng).
//!
//! Usage: `decode_wmm_pcap [-v] <capture>`; linktypes 105 (802.11) and 127 (radiotap).

use pcap_parser::pcapng::Block as PcapNgBlock;
use pcap_parser::traits::{PcapNGPacketBlock, PcapReaderIterator};
use pcap_parser::{Linktype, PcapBlockOwned, PcapError};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wmm_cac::dump::{frame_to_dump, hex_string};
use wmm_cac::frame::{self, WmmFrame};

const LINKTYPE_IEEE802_11: i32 = 105;
const LINKTYPE_IEEE802_11_RADIOTAP: i32 = 127;

#[derive(Debug, Default)]
struct Stats {
    packets: u64,
    action_frames: u64,
    addts_requests: u64,
    addts_responses: u64,
    delts: u64,
    malformed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut raw_args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = if let Some(pos) = raw_args.iter().position(|a| a == "--verbose" || a == "-v") {
        raw_args.remove(pos);
        true
    } else {
        false
    };
    let path: PathBuf = raw_args
        .into_iter()
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("usage: decode_wmm_pcap [-v] <capture>"))?;

    let mut probe = [0u8; 4];
    {
        let mut f = File::open(&path)?;
        f.read_exact(&mut probe)?;
    }
    let mut stats = Stats::default();
    let file = File::open(&path)?;
    if probe == [0x0a, 0x0d, 0x0d, 0x0a] {
        run_pcapng(file, verbose, &mut stats)?;
    } else {
        run_legacy_pcap(file, verbose, &mut stats)?;
    }

    info!(capture = %path.display(), "done");
    eprintln!("packets: {}", stats.packets);
    eprintln!("action frames: {}", stats.action_frames);
    eprintln!("ADDTS requests: {}", stats.addts_requests);
    eprintln!("ADDTS responses: {}", stats.addts_responses);
    eprintln!("DELTS: {}", stats.delts);
    eprintln!("malformed WMM actions: {}", stats.malformed);
    Ok(())
}

fn run_legacy_pcap<R: Read>(file: R, verbose: bool, stats: &mut Stats) -> anyhow::Result<()> {
    let mut reader = pcap_parser::pcap::LegacyPcapReader::new(1 << 20, file)?;
    let mut linktype: Option<Linktype> = None;
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                match block {
                    PcapBlockOwned::LegacyHeader(h) => linktype = Some(h.network),
                    PcapBlockOwned::Legacy(b) => {
                        stats.packets += 1;
                        let lt = linktype.unwrap_or(Linktype(LINKTYPE_IEEE802_11));
                        process_frame(lt, b.data, verbose, stats);
                    }
                    PcapBlockOwned::NG(_) => {}
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| anyhow::anyhow!("pcap refill error: {:?}", e))?;
            }
            Err(e) => return Err(anyhow::anyhow!("pcap read error: {:?}", e)),
        }
    }
    Ok(())
}

fn run_pcapng<R: Read>(file: R, verbose: bool, stats: &mut Stats) -> anyhow::Result<()> {
    let mut reader = pcap_parser::pcapng::PcapNGReader::new(1 << 20, file)?;
    let mut if_linktypes: Vec<Linktype> = Vec::new();
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                if let PcapBlockOwned::NG(b) = block {
                    match &b {
                        PcapNgBlock::InterfaceDescription(idb) => if_linktypes.push(idb.linktype),
                        PcapNgBlock::EnhancedPacket(epb) => {
                            stats.packets += 1;
                            let lt = if_linktypes
                                .get(epb.if_id as usize)
                                .copied()
                                .unwrap_or(Linktype(LINKTYPE_IEEE802_11));
                            process_frame(lt, epb.packet_data(), verbose, stats);
                        }
                        PcapNgBlock::SimplePacket(spb) => {
                            stats.packets += 1;
                            let lt = if_linktypes.first().copied().unwrap_or(Linktype(LINKTYPE_IEEE802_11));
                            process_frame(lt, spb.packet_data(), verbose, stats);
                        }
                        _ => {}
                    }
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| anyhow::anyhow!("pcapng refill error: {:?}", e))?;
            }
            Err(e) => return Err(anyhow::anyhow!("pcapng read error: {:?}", e)),
        }
    }
    Ok(())
}

/// 802.11 frame from a captured packet, radiotap header stripped.
fn wlan_frame(linktype: Linktype, data: &[u8]) -> Option<&[u8]> {
    match linktype.0 {
        LINKTYPE_IEEE802_11 => Some(data),
        LINKTYPE_IEEE802_11_RADIOTAP => {
            let len = u16::from_le_bytes([*data.get(2)?, *data.get(3)?]) as usize;
            data.get(len..)
        }
        _ => None,
    }
}

fn process_frame(linktype: Linktype, data: &[u8], verbose: bool, stats: &mut Stats) {
    let Some(body) = wlan_frame(linktype, data).and_then(frame::split_mgmt) else {
        return;
    };
    stats.action_frames += 1;
    if body.first() != Some(&frame::WLAN_CATEGORY_WMM) {
        return;
    }
    match frame::parse_wmm_action(body) {
        Ok(parsed) => {
            match parsed {
                WmmFrame::AddtsRequest { .. } => stats.addts_requests += 1,
                WmmFrame::AddtsResponse { .. } => stats.addts_responses += 1,
                WmmFrame::Delts { .. } => stats.delts += 1,
                WmmFrame::Other { .. } => {}
            }
            println!("packet {}: {}", stats.packets, frame_to_dump(&parsed));
            if verbose {
                println!("  raw: {}", hex_string(body));
            }
        }
        Err(e) => {
            stats.malformed += 1;
            debug!(packet = stats.packets, "skipping WMM action: {}", e);
        }
    }
}
