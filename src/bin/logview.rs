use anyhow::Result;
use clap::{Arg, ColorChoice, Command};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use tutorgate::cli::commands::{logging, styles};
use tutorgate::query::{self, View};

const VIEWS: &str = "access, app, code, auth, stats, all";

fn command() -> Command {
    Command::new("logview")
        .about("Read the tutorgate audit streams")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Never)
        .styles(styles())
        .arg(
            Arg::new("view")
                .help(format!("What to show: {VIEWS}"))
                .value_name("VIEW"),
        )
        .arg(
            Arg::new("lines")
                .help("Number of lines (default: 50, or 20 per stream for `all`)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(logging::log_dir_arg())
}

/// Usage problems print help and succeed; only reading the logs can fail.
fn run<I, T>(args: I, out: &mut impl Write) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(err) => {
            write!(out, "{}", err.render())?;
            return Ok(());
        }
    };

    let requested = matches.get_one::<String>("view");
    let Some(view) = requested.and_then(|value| View::parse(value)) else {
        if let Some(value) = requested {
            writeln!(out, "unknown view '{value}', expected one of: {VIEWS}")?;
        }
        write!(out, "{}", command().render_help())?;
        return Ok(());
    };
    let lines = matches
        .get_one::<usize>("lines")
        .copied()
        .unwrap_or_else(|| view.default_count());
    let dir = matches
        .get_one::<String>(logging::ARG_LOG_DIR)
        .map_or_else(|| PathBuf::from("logs"), PathBuf::from);

    for line in query::view(&dir, view, lines)? {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    run(std::env::args_os(), &mut std::io::stdout().lock())
}
