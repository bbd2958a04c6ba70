//! Control-plane commands: parsing with PEST and execution against a [`Cac`].

use crate::cac::Cac;
use crate::codec::TSID_MAX;
use crate::error::{CacError, Result};
use crate::registry::ActiveTspec;
use crate::station::{StaLink, Station};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "control.pest"]
struct ControlParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Explicit id, or `None` for the next automatic one.
    CreateTspec(Option<i64>),
    ConfigTspec { id: u8, field: String, value: u32 },
    SendAddts { id: u8, ebw: bool },
    SendDelts(u8),
    /// `state` selects pending (`Some(false)`) or accepted (`Some(true)`); `None` deletes
    /// the first entry with the id, tearing it down if admitted.
    DeleteTspec { id: u8, state: Option<bool> },
    GetActiveTspecs,
    Roam,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Created(u8),
    Done,
    Active(Vec<ActiveTspec>),
    /// Ids re-admitted after a roam.
    Roamed(Vec<u8>),
}

/// Parse one command line.
pub fn parse_command(line: &str) -> Result<Command> {
    let mut pairs = ControlParser::parse(Rule::line, line.trim()).map_err(|e| CacError::Parse(e.to_string()))?;
    let line = pairs.next().ok_or_else(|| CacError::Parse("empty input".to_string()))?;
    let pair = line
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or_else(|| CacError::Parse("missing command".to_string()))?;
    build_command(pair)
}

/// Parse a script: one command per line, blank lines and `#` comments allowed.
pub fn parse_script(source: &str) -> Result<Vec<Command>> {
    let mut pairs = ControlParser::parse(Rule::script, source).map_err(|e| CacError::Parse(e.to_string()))?;
    let script = pairs.next().ok_or_else(|| CacError::Parse("empty input".to_string()))?;
    script
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(build_command)
        .collect()
}

fn build_command(pair: Pair<Rule>) -> Result<Command> {
    let rule = pair.as_rule();
    let mut args = pair.into_inner().skip(1);
    let cmd = match rule {
        Rule::create_tspec => Command::CreateTspec(args.next().and_then(|a| parse_number(a.as_str()).ok())),
        Rule::config_tspec => {
            let id = id_arg(args.next())?;
            let field = args
                .next()
                .ok_or_else(|| CacError::Parse("config_tspec: field".to_string()))?
                .as_str()
                .to_string();
            let value = value_arg(args.next())?;
            Command::ConfigTspec { id, field, value }
        }
        Rule::send_addts => Command::SendAddts {
            id: id_arg(args.next())?,
            ebw: args.next().is_some(),
        },
        Rule::send_delts => Command::SendDelts(id_arg(args.next())?),
        Rule::delete_tspec => Command::DeleteTspec {
            id: id_arg(args.next())?,
            state: args.next().map(|s| s.as_str().eq_ignore_ascii_case("accepted")),
        },
        Rule::get_active_tspecs => Command::GetActiveTspecs,
        Rule::roam => Command::Roam,
        Rule::disconnect => Command::Disconnect,
        other => return Err(CacError::Parse(format!("unexpected {:?}", other))),
    };
    Ok(cmd)
}

/// Decimal or `0x` hexadecimal.
pub fn parse_number(s: &str) -> Result<i64> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => s.parse::<i64>(),
    };
    parsed.map_err(|e| CacError::Parse(format!("{}: {}", s, e)))
}

fn number_arg(pair: Option<Pair<Rule>>) -> Result<i64> {
    let pair = pair.ok_or_else(|| CacError::Parse("missing number".to_string()))?;
    parse_number(pair.as_str())
}

fn id_arg(pair: Option<Pair<Rule>>) -> Result<u8> {
    let n = number_arg(pair)?;
    u8::try_from(n)
        .ok()
        .filter(|&id| id <= TSID_MAX)
        .ok_or(CacError::OutOfRange(n))
}

fn value_arg(pair: Option<Pair<Rule>>) -> Result<u32> {
    let n = number_arg(pair)?;
    u32::try_from(n).map_err(|_| CacError::Parse(format!("value {} does not fit 32 bits", n)))
}

impl Cac {
    pub fn execute<S: Station>(&mut self, link: &mut StaLink, sta: &mut S, command: Command) -> Result<Reply> {
        match command {
            Command::CreateTspec(id) => {
                if !link.is_connected() {
                    return Err(CacError::NotConnected);
                }
                self.create_tspec(id).map(Reply::Created)
            }
            Command::ConfigTspec { id, field, value } => self.config_tspec(id, &field, value).map(|_| Reply::Done),
            Command::SendAddts { id, ebw } => self.send_addts(link, sta, id, ebw).map(|_| Reply::Done),
            Command::SendDelts(id) => self.send_delts(link, sta, id).map(|_| Reply::Done),
            Command::DeleteTspec { id, state: None } => self.delete_tspec(link, sta, id).map(|_| Reply::Done),
            Command::DeleteTspec {
                id,
                state: Some(accepted),
            } => self.delete_tspec_by_state(id, accepted).map(|_| Reply::Done),
            Command::GetActiveTspecs => Ok(Reply::Active(self.active_tspecs())),
            Command::Roam => Ok(Reply::Roamed(self.on_roam(link, sta))),
            Command::Disconnect => {
                self.on_disconnect();
                Ok(Reply::Done)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!(parse_command("create_tspec").unwrap(), Command::CreateTspec(None));
        assert_eq!(parse_command("create_tspec 0x3").unwrap(), Command::CreateTspec(Some(3)));
        assert_eq!(parse_command("CREATE_TSPEC auto").unwrap(), Command::CreateTspec(None));
        assert_eq!(
            parse_command("config_tspec 1 user_priority 6").unwrap(),
            Command::ConfigTspec {
                id: 1,
                field: "user_priority".to_string(),
                value: 6
            }
        );
        assert_eq!(
            parse_command("send_addts 2 ebw").unwrap(),
            Command::SendAddts { id: 2, ebw: true }
        );
        assert_eq!(
            parse_command("  send_addts 2  ").unwrap(),
            Command::SendAddts { id: 2, ebw: false }
        );
        assert_eq!(parse_command("send_delts 7").unwrap(), Command::SendDelts(7));
        assert_eq!(
            parse_command("delete_tspec 4 accepted").unwrap(),
            Command::DeleteTspec {
                id: 4,
                state: Some(true)
            }
        );
        assert_eq!(
            parse_command("delete_tspec 4").unwrap(),
            Command::DeleteTspec { id: 4, state: None }
        );
        assert_eq!(parse_command("get_active_tspecs").unwrap(), Command::GetActiveTspecs);
        assert_eq!(parse_command("roam # new AP").unwrap(), Command::Roam);
        assert_eq!(parse_command("disconnect").unwrap(), Command::Disconnect);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse_command("send_addts"), Err(CacError::Parse(_))));
        assert!(matches!(parse_command("send_addtsx 1"), Err(CacError::Parse(_))));
        assert!(matches!(parse_command("send_delts 9"), Err(CacError::OutOfRange(9))));
        assert!(matches!(
            parse_command("config_tspec 0 mean_data_rate -5"),
            Err(CacError::Parse(_))
        ));
        assert!(parse_command("config_tspec 0 tsid 0x1g").is_err());
    }

    #[test]
    fn script_skips_blanks_and_comments() {
        let script = "# voice stream\ncreate_tspec 0\n\nconfig_tspec 0 user_priority 6\r\nsend_addts 0\n";
        let cmds = parse_script(script).unwrap();
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[2], Command::SendAddts { id: 0, ebw: false });
    }

    #[test]
    fn create_requires_connection() {
        let mut cac = Cac::default();
        let mut link = StaLink::default();
        let mut sta = crate::sim::SimStation::default();
        assert!(matches!(
            cac.execute(&mut link, &mut sta, Command::CreateTspec(None)),
            Err(CacError::NotConnected)
        ));
    }
}
