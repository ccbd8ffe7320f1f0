//! WebVTT cue parsing
//!
//! A minimal cue parser that keeps only timing and payload text. Cue
//! settings after the end timestamp, cue identifiers, NOTE/STYLE/REGION
//! blocks and positioning metadata are all dropped, which is exactly what
//! SRT emission needs.

use crate::error::{EngineError, Result};

/// A single timed caption entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    /// Start time in seconds.
    pub start_secs: f64,
    /// End time in seconds.
    pub end_secs: f64,
    /// Payload text, possibly containing inline markup.
    pub text: String,
}

impl Cue {
    pub fn new(start_secs: f64, end_secs: f64, text: String) -> Self {
        Self {
            start_secs,
            end_secs,
            text,
        }
    }

    /// Whether this cue is active at the given playback position.
    pub fn active_at(&self, position_secs: f64) -> bool {
        position_secs >= self.start_secs && position_secs < self.end_secs
    }
}

/// Parse a WebVTT document into its cue list.
///
/// Tolerant of trailing whitespace and a missing final blank line. A cue
/// line whose timestamps cannot be parsed rejects the whole document, the
/// same way the browser's text-track parser rejects malformed input.
pub fn parse_webvtt(content: &str) -> Result<Vec<Cue>> {
    let mut cues = Vec::new();
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if !line.contains("-->") {
            i += 1;
            continue;
        }

        let (start, end) = parse_cue_timing(line)?;

        // Collect contiguous non-blank payload lines.
        let mut text_lines: Vec<&str> = Vec::new();
        i += 1;
        while i < lines.len() && !lines[i].trim().is_empty() {
            text_lines.push(lines[i].trim_end());
            i += 1;
        }

        cues.push(Cue::new(start, end, text_lines.join("\n")));
    }

    Ok(cues)
}

/// Parse a `start --> end [settings]` line, discarding cue settings.
fn parse_cue_timing(line: &str) -> Result<(f64, f64)> {
    let mut parts = line.splitn(2, "-->");
    let start_str = parts
        .next()
        .ok_or_else(|| EngineError::Conversion(format!("bad cue timing line: {line}")))?
        .trim();
    let end_part = parts
        .next()
        .ok_or_else(|| EngineError::Conversion(format!("bad cue timing line: {line}")))?
        .trim();

    // Anything after the first whitespace in the end part is cue settings.
    let end_str = end_part.split_whitespace().next().unwrap_or("");

    let start = parse_timestamp(start_str)?;
    let end = parse_timestamp(end_str)?;
    Ok((start, end))
}

/// Parse a `HH:MM:SS.mmm` or `MM:SS.mmm` timestamp into seconds.
fn parse_timestamp(ts: &str) -> Result<f64> {
    let err = || EngineError::Conversion(format!("bad timestamp: {ts}"));

    let fields: Vec<&str> = ts.split(':').collect();
    if fields.len() < 2 || fields.len() > 3 {
        return Err(err());
    }

    let mut secs = 0.0;
    for field in &fields {
        // WebVTT uses a period decimal separator; accept a comma as well so
        // SRT-shaped timestamps do not reject the document.
        let normalized = field.replace(',', ".");
        let value: f64 = normalized.parse().map_err(|_| err())?;
        secs = secs * 60.0 + value;
    }

    Ok(secs)
}
