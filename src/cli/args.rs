use crate::core::currency::CURRENCY_CODE_LENGTH;
use clap::Parser;
use clap::error::ErrorKind;
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

pub const USAGE_NOTE: &str = "This utility converts AMOUNT of money in FROM currency to amount in TO
currency. Both currencies are given as ISO 4217 code (eg. USD).";

#[derive(Parser, Debug)]
#[command(name = "fiatconv", version, about, after_help = USAGE_NOTE)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long)]
    pub config_path: Option<PathBuf>,

    /// Amount of money to convert
    #[arg(allow_negative_numbers = true)]
    pub amount: f64,

    /// Currency to convert from (eg. USD)
    #[arg(value_parser = parse_currency)]
    pub from: String,

    /// Currency to convert to (eg. EUR)
    #[arg(value_parser = parse_currency)]
    pub to: String,
}

/// AMOUNT, FROM and TO.
const POSITIONAL_COUNT: usize = 3;

/// A single conversion: `amount` of `from` expressed in `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

impl Cli {
    pub fn request(&self) -> Request {
        Request {
            amount: self.amount,
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

fn parse_currency(s: &str) -> Result<String, String> {
    if s.chars().count() != CURRENCY_CODE_LENGTH {
        return Err(format!("Invalid fiat: {s}"));
    }
    Ok(s.to_uppercase())
}

/// Parses the full argument list, program name included. Anything after TO
/// is ignored, flags included.
pub fn parse_arguments<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    Cli::try_parse_from(strip_trailing(args))
}

/// Truncates `args` right after the last positional so clap never sees the
/// trailing ones.
fn strip_trailing(mut args: Vec<OsString>) -> Vec<OsString> {
    let mut positionals = 0;
    let mut only_positionals = false;
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].to_string_lossy().into_owned();
        if only_positionals || !arg.starts_with('-') || arg == "-" || arg.parse::<f64>().is_ok() {
            positionals += 1;
            if positionals == POSITIONAL_COUNT {
                args.truncate(i + 1);
                break;
            }
        } else if arg == "--" {
            only_positionals = true;
        } else if takes_separate_value(&arg) {
            // Skip the flag's value
            i += 1;
        }
        i += 1;
    }
    args
}

/// Whether `flag` is `-c`/`--config-path` (possibly ending a short cluster
/// like `-vc`) with its value in the next argument.
fn takes_separate_value(flag: &str) -> bool {
    if let Some(long) = flag.strip_prefix("--") {
        return long == "config-path";
    }
    flag[1..].find('c').is_some_and(|pos| pos == flag.len() - 2)
}

/// Reports a parse failure and returns the exit code for it. Help and version
/// requests go to `out` and succeed.
pub fn report_parse_error(e: &clap::Error, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(out, "{e}");
            0
        }
        _ => {
            let _ = writeln!(err, "{e}");
            let _ = writeln!(err, "{USAGE_NOTE}");
            1
        }
    }
}
