// Copyright 2025 Accenture.
//
// SPDX-License-Identifier: Apache-2.0

//! Log line layout

use console::{style, Color, StyledObject};
use log::Level;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond digits:3]");

static TARGET_WIDTH: AtomicUsize = AtomicUsize::new(16);
static PID_WIDTH: AtomicUsize = AtomicUsize::new(4);
static TID_WIDTH: AtomicUsize = AtomicUsize::new(4);

/// Everything printed for one log record
pub struct Line<'a> {
    pub level: Level,
    pub target: &'a str,
    pub file: Option<&'a str>,
    pub line: Option<u32>,
    pub pid: u32,
    pub tid: u32,
    pub args: &'a std::fmt::Arguments<'a>,
}

pub fn format<W: std::io::Write>(line: &Line, mut writer: W) -> std::io::Result<()> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let timestamp = now.format(TIMESTAMP_FORMAT).unwrap_or_default();

    let level = style(line.level).bold().fg(level_color(line.level));
    let pid = format_id(line.pid, &PID_WIDTH, true);
    let tid = format_id(line.tid, &TID_WIDTH, false);
    let target = {
        TARGET_WIDTH.fetch_max(line.target.len(), Ordering::Relaxed);
        let width = TARGET_WIDTH.load(Ordering::Relaxed);
        style(format!("{:<width$}", line.target)).fg(hash_color(line.target))
    };
    let message = line.args;

    // Source location on trace level only
    if line.level == Level::Trace {
        let file = line.file.unwrap_or("file unknown");
        let file = style(file).fg(hash_color(file));
        let number = line.line.unwrap_or(0);
        writeln!(
            writer,
            "{timestamp} {target} ({pid} {tid}): {level:<5}: {file}:{number}: {message}"
        )
    } else {
        writeln!(
            writer,
            "{timestamp} {target} ({pid} {tid}): {level:<5}: {message}"
        )
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Color256(243),
        Level::Trace => Color::White,
    }
}

/// Stable terminal color derived from `text`
fn hash_color(text: &str) -> Color {
    id_color(text.bytes().fold(42u8, |c, x| c ^ x) as u32)
}

fn id_color(id: u32) -> Color {
    // Skip shades that are hard to read on dark terminals
    let color = match id as u8 {
        c @ 0..=1 => c + 2,
        c @ 16..=21 => c + 6,
        c @ 52..=55 | c @ 126..=129 => c + 4,
        c @ 163..=165 | c @ 200..=201 => c + 3,
        c @ 207 => c + 1,
        c @ 232..=240 => c + 9,
        c => c,
    };
    Color::Color256(color)
}

/// Hex formatted `id`, padded to the widest id seen so far in `width`
fn format_id(id: u32, width: &AtomicUsize, align_left: bool) -> StyledObject<String> {
    width.fetch_max(hex_digits(id), Ordering::Relaxed);
    let width = width.load(Ordering::Relaxed);
    let text = if align_left {
        format!("{id:<width$x}")
    } else {
        format!("{id:>width$x}")
    };
    style(text).fg(id_color(id))
}

fn hex_digits(n: u32) -> usize {
    (1 + n.checked_ilog2().unwrap_or_default() / 4) as usize
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_digits_of_ids() {
        assert_eq!(hex_digits(0), 1);
        assert_eq!(hex_digits(15), 1);
        assert_eq!(hex_digits(16), 2);
        assert_eq!(hex_digits(4095), 3);
        assert_eq!(hex_digits(u32::MAX), 8);
    }

    fn render(args: std::fmt::Arguments) -> String {
        let line = Line {
            level: Level::Info,
            target: "dreyevr_sync::worker",
            file: None,
            line: None,
            pid: 0x1a,
            tid: 0x2b,
            args: &args,
        };
        let mut out = Vec::new();
        format(&line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn line_layout() {
        console::set_colors_enabled(false);
        let out = render(format_args!("status {}", "TakeOver"));
        assert!(out.ends_with(": INFO : status TakeOver\n"), "{out}");
        assert!(out.contains("dreyevr_sync::worker"), "{out}");
        assert!(out.contains("(1a"), "{out}");
    }
}
