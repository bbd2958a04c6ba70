//! Run control commands against a simulated access point.
//!
//! Usage:
//!   cac_ctl [OPTIONS] [SCRIPT ...]
//!   cac_ctl < script
//!
//! Options:
//!   --config, -c FILE   TOML configuration (see `CacConfig`)
//!   --log LEVEL         tracing filter (default: `RUST_LOG`, else `info`)
//!   --extended, -x      associate with extended admission mode (TSRS, MSDU lifetime)
//!
//! Every ADDTS request is answered by the simulated AP; `roam` reassociates with the
//! Resource Descriptor the station last installed.

use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wmm_cac::dump::active_to_dump;
use wmm_cac::sim::{SimAccessPoint, SimStation};
use wmm_cac::{parse_script, Cac, CacConfig, Command, Reply, StaLink, WmmEvent};

const AP_ADDR: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
const STA_ADDR: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x02];

struct Session {
    cac: Cac,
    link: StaLink,
    sta: SimStation,
    ap: SimAccessPoint,
}

impl Session {
    fn run(&mut self, command: Command) -> wmm_cac::Result<Reply> {
        if command == Command::Roam {
            if let Some(peer) = self.link.peer.as_mut() {
                peer.established = 0;
                peer.assoc_resp_ies = self.ap.reassociation_ies(&self.sta.additional_ies);
            }
        }
        let answer_addts = matches!(command, Command::SendAddts { .. });
        let reply = self.cac.execute(&mut self.link, &mut self.sta, command)?;
        if answer_addts {
            let response = self.sta.last_frame().and_then(|f| self.ap.respond(f));
            if let Some(body) = response {
                match self.cac.on_wmm_action(&mut self.link, &mut self.sta, &body)? {
                    WmmEvent::Addts(outcome) => info!(?outcome, "ADDTS response"),
                    other => warn!(?other, "unexpected reply to ADDTS"),
                }
            }
        }
        Ok(reply)
    }
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Created(id) => println!("created TSPEC {}", id),
        Reply::Done => println!("ok"),
        Reply::Active(active) => println!("{}", active_to_dump(active)),
        Reply::Roamed(ids) => println!("recovered TSPECs: {:?}", ids),
    }
}

fn main() -> anyhow::Result<()> {
    let mut raw_args: Vec<String> = std::env::args().skip(1).collect();
    let extended = if let Some(pos) = raw_args.iter().position(|a| a == "--extended" || a == "-x") {
        raw_args.remove(pos);
        true
    } else {
        false
    };
    let config_path: Option<PathBuf> = match raw_args.iter().position(|a| a == "--config" || a == "-c") {
        Some(pos) if pos + 1 < raw_args.len() => {
            raw_args.remove(pos);
            Some(PathBuf::from(raw_args.remove(pos)))
        }
        Some(_) => anyhow::bail!("--config needs a file"),
        None => None,
    };
    let log_level: Option<String> = match raw_args.iter().position(|a| a == "--log") {
        Some(pos) if pos + 1 < raw_args.len() => {
            raw_args.remove(pos);
            Some(raw_args.remove(pos))
        }
        Some(_) => anyhow::bail!("--log needs a level"),
        None => None,
    };

    let filter = match log_level {
        Some(level) => EnvFilter::try_new(&level).map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", level, e))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let config = match &config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            CacConfig::load(path)?
        }
        None => CacConfig::default(),
    };

    let mut scripts = Vec::new();
    if raw_args.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        scripts.push(("<stdin>".to_string(), src));
    } else {
        for path in &raw_args {
            scripts.push((path.clone(), std::fs::read_to_string(path)?));
        }
    }

    let ap = SimAccessPoint::new(AP_ADDR, config.sim.clone());
    let mut session = Session {
        link: ap.associate(STA_ADDR, extended),
        cac: Cac::new(config),
        sta: SimStation::default(),
        ap,
    };

    let mut failures = 0usize;
    for (name, src) in scripts {
        let commands = parse_script(&src).map_err(|e| anyhow::anyhow!("{}: {}", name, e))?;
        for command in commands {
            match session.run(command) {
                Ok(reply) => print_reply(&reply),
                Err(e) => {
                    failures += 1;
                    println!("error: {}", e);
                }
            }
        }
    }
    if let Some(status) = session.cac.last_admission_error() {
        eprintln!("last admission error: 0x{:02x}", status);
    }
    if failures > 0 {
        anyhow::bail!("{} command(s) failed", failures);
    }
    Ok(())
}
