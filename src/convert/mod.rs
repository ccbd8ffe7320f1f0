//! Bidirectional WebVTT/SRT conversion
//!
//! Both directions are pure, total functions over well-formed input:
//! trailing whitespace or a missing final blank line never fail them.

pub mod cue;

pub use cue::{parse_webvtt, Cue};

use crate::error::Result;

/// Tags allowed to survive conversion and overlay rendering.
const ALLOWED_TAGS: [&str; 3] = ["i", "u", "b"];

/// Convert a WebVTT document to SRT.
///
/// Cues are emitted in order as 1-indexed `idx\nstart --> end\ntext\n\n`
/// blocks with `HH:MM:SS,mmm` timestamps. Inline markup is reduced to the
/// `i`/`u`/`b` allow-list and directional-mark prefixes are rewritten to
/// Unicode embedding controls.
pub fn webvtt_to_srt(webvtt: &str) -> Result<String> {
    let cues = parse_webvtt(webvtt)?;

    let mut out = String::new();
    for (idx, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            idx + 1,
            format_srt_time(cue.start_secs),
            format_srt_time(cue.end_secs),
            simplify_text(&cue.text),
        ));
    }
    Ok(out)
}

/// Convert an SRT document to WebVTT.
///
/// Line oriented: blank lines and pure-integer index lines are skipped, the
/// comma decimal separators of a timing line become periods, and contiguous
/// non-blank lines after it are copied forward as cue text.
pub fn srt_to_webvtt(srt: &str) -> String {
    let lines: Vec<&str> = srt.lines().collect();
    let mut out = String::from("WEBVTT\n\n");

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        // Blank lines and pure-integer index lines carry no content.
        if line.is_empty() || line.chars().all(|c| c.is_ascii_digit()) {
            i += 1;
            continue;
        }

        if line.contains("-->") {
            out.push_str(&line.replace(',', "."));
            out.push('\n');

            i += 1;
            while i < lines.len() && !lines[i].trim().is_empty() {
                out.push_str(lines[i].trim());
                out.push('\n');
                i += 1;
            }
            out.push('\n');
        } else {
            i += 1;
        }
    }

    out
}

/// Reduce cue text to plain text plus the simple tags SRT tolerates, and
/// rewrite the platform's RTL marker prefixes to Unicode embedding controls.
pub fn simplify_text(text: &str) -> String {
    let stripped = strip_tags(text);

    let mut out_lines: Vec<String> = Vec::new();
    for line in stripped.split('\n') {
        if let Some(rest) = line.strip_prefix("&lrm;") {
            out_lines.push(format!("\u{202a}{rest}\u{202c}"));
        } else if let Some(rest) = line.strip_prefix("&rlm;") {
            out_lines.push(format!("\u{202b}{rest}\u{202c}"));
        } else {
            out_lines.push(line.to_string());
        }
    }
    out_lines.join("\n")
}

/// Strip all markup tags except `<i>`, `<u>`, `<b>` and their closers,
/// matching tag names case-insensitively. Unterminated `<` is kept as text.
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        match after_open.find('>') {
            Some(close) => {
                let inner = &after_open[..close];
                let name = inner.strip_prefix('/').unwrap_or(inner);
                if ALLOWED_TAGS.contains(&name.to_ascii_lowercase().as_str()) {
                    out.push('<');
                    out.push_str(inner);
                    out.push('>');
                }
                rest = &after_open[close + 1..];
            }
            None => {
                // No closing bracket; not a tag
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Format seconds as an SRT `HH:MM:SS,mmm` timestamp.
pub fn format_srt_time(secs: f64) -> String {
    let total_ms = (secs * 1000.0).round().max(0.0) as u64;
    let ms = total_ms % 1000;
    let s = (total_ms / 1000) % 60;
    let m = (total_ms / 60_000) % 60;
    let h = total_ms / 3_600_000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}
