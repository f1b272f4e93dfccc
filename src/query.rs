//! Read-only queries over the audit streams, used by `logview`.
//!
//! Nothing here opens a file for writing.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::audit::Stream;

const BLOCK_SIZE: u64 = 8 * 1024;

/// Access line layout up to the event type. Writers never emit `|` inside a
/// field, so the first match is the real `Event:` field.
const ACCESS_LINE_PATTERN: &str =
    r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} - IP: [^|]* \| Location: [^|]* \| Event: ([A-Z_]+) \| Details: ";
const APP_LINE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} - ([A-Z]+) - ";

fn is_content(segment: &[u8]) -> bool {
    !matches!(segment, [] | [b'\r'])
}

/// Last `n` non-empty lines of a file, reading backwards from the end.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn tail(path: &Path, n: usize) -> Result<Vec<String>> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut pos = file.metadata()?.len();
    let mut buf: Vec<u8> = Vec::new();

    while pos > 0 {
        let step = BLOCK_SIZE.min(pos);
        pos -= step;
        file.seek(SeekFrom::Start(pos))?;
        let mut block = vec![0u8; usize::try_from(step)?];
        file.read_exact(&mut block)
            .with_context(|| format!("failed to read {}", path.display()))?;
        block.extend_from_slice(&buf);
        buf = block;
        // The first segment may be partial, so stop once n + 1 non-empty ones are buffered.
        if buf.split(|byte| *byte == b'\n').filter(|segment| is_content(segment)).count() > n {
            break;
        }
    }

    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<&str> = text.lines().filter(|line| !line.is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].iter().map(ToString::to_string).collect())
}

/// Every non-empty line for which `predicate` holds, in file order.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn filter<F>(path: &Path, mut predicate: F) -> Result<Vec<String>>
where
    F: FnMut(&str) -> bool,
{
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut matches = Vec::new();
    let mut raw = Vec::new();
    loop {
        raw.clear();
        let read = reader
            .read_until(b'\n', &mut raw)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.is_empty() && predicate(line) {
            matches.push(line.to_string());
        }
    }
    Ok(matches)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
}

/// Count entries per event type (access) or level (application).
///
/// Lines that do not match the stream format count toward `total` only.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn stats(path: &Path, stream: Stream) -> Result<StreamStats> {
    let pattern = match stream {
        Stream::Access => Regex::new(ACCESS_LINE_PATTERN),
        Stream::App => Regex::new(APP_LINE_PATTERN),
    }?;

    let mut stats = StreamStats::default();
    filter(path, |line| {
        stats.total += 1;
        if let Some(kind) = pattern.captures(line).and_then(|c| c.get(1)) {
            *stats.by_type.entry(kind.as_str().to_string()).or_insert(0) += 1;
        }
        false
    })?;
    Ok(stats)
}

/// Application lines reporting code execution.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn code_events(path: &Path) -> Result<Vec<String>> {
    filter(path, |line| line.contains("Code execution"))
}

/// Access lines carrying an `AUTH_*` event.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn auth_events(path: &Path) -> Result<Vec<String>> {
    let pattern = Regex::new(ACCESS_LINE_PATTERN)?;
    filter(path, |line| {
        pattern
            .captures(line)
            .and_then(|c| c.get(1))
            .is_some_and(|kind| kind.as_str().starts_with("AUTH_"))
    })
}

/// What `logview` shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Access,
    App,
    Code,
    Auth,
    Stats,
    All,
}

impl View {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "access" => Some(Self::Access),
            "app" => Some(Self::App),
            "code" => Some(Self::Code),
            "auth" => Some(Self::Auth),
            "stats" => Some(Self::Stats),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    #[must_use]
    pub fn default_count(self) -> usize {
        match self {
            Self::All => 20,
            _ => 50,
        }
    }
}

fn last(mut lines: Vec<String>, n: usize) -> Vec<String> {
    let start = lines.len().saturating_sub(n);
    lines.split_off(start)
}

fn render_stats(out: &mut Vec<String>, stream: Stream, stats: &StreamStats) {
    out.push(format!("{}: {} entries", stream.file_name(), stats.total));
    for (kind, count) in &stats.by_type {
        out.push(format!("  {kind}: {count}"));
    }
}

/// Render a view over the streams in `dir` as output lines.
///
/// Empty streams render nothing.
///
/// # Errors
/// Returns an error if a stream file is missing or unreadable.
pub fn view(dir: &Path, view: View, n: usize) -> Result<Vec<String>> {
    let access = dir.join(Stream::Access.file_name());
    let app = dir.join(Stream::App.file_name());
    match view {
        View::Access => tail(&access, n),
        View::App => tail(&app, n),
        View::Code => Ok(last(code_events(&app)?, n)),
        View::Auth => Ok(last(auth_events(&access)?, n)),
        View::Stats => {
            let mut out = Vec::new();
            for (stream, path) in [(Stream::Access, &access), (Stream::App, &app)] {
                let stats = stats(path, stream)?;
                if stats.total > 0 {
                    render_stats(&mut out, stream, &stats);
                }
            }
            Ok(out)
        }
        View::All => {
            let mut out = Vec::new();
            for (stream, path) in [(Stream::Access, &access), (Stream::App, &app)] {
                let lines = tail(path, n)?;
                if !lines.is_empty() {
                    out.push(format!("== {} ==", stream.file_name()));
                    out.extend(lines);
                }
            }
            Ok(out)
        }
    }
}
