use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use log::debug;
use crate::errors::CueError;

// @module: Cue timing model and caption text parsing

// @const: HH:MM:SS followed by a 3 digit millisecond part
static FULL_TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{1,2}):(\d{1,2})[,.:](\d{3})$").unwrap()
});

// @const: MM:SS followed by a 3 digit millisecond part
static SHORT_TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{1,2})[,.:](\d{3})$").unwrap()
});

// @const: Bare SS followed by a 3 digit millisecond part
static SECONDS_TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[,.:](\d{3})$").unwrap()
});

// @const: Blank line block separator
static BLOCK_SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*\n").unwrap()
});

/// Token separating the start and end timestamps of a timing line
pub const TIMING_SEPARATOR: &str = "-->";

// @struct: Single timed caption entry
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    // @field: Index from the source, used only as a lookup key
    pub index: u32,

    // @field: Start offset in seconds
    pub start: f64,

    // @field: End offset in seconds
    pub end: f64,

    // @field: Display lines joined by '\n'
    pub text: String,
}

impl Cue {
    pub fn new(index: u32, start: f64, end: f64, text: impl Into<String>) -> Self {
        Cue {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    /// Length of the cue window in seconds (negative for defective cues)
    pub fn window(&self) -> f64 {
        self.end - self.start
    }

    /// Text with all whitespace runs collapsed to single spaces
    pub fn spoken_text(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Whether there is nothing to say for this cue
    pub fn is_silent(&self) -> bool {
        self.text.trim().is_empty()
    }

    // @validates: Start offset and time range
    pub fn validate(&self) -> Result<(), CueError> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(CueError::InvalidStart { index: self.index, start: self.start });
        }
        if self.end < self.start {
            return Err(CueError::EndBeforeStart {
                index: self.index,
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(
            f,
            "{} {} {}",
            format_timestamp(self.start),
            TIMING_SEPARATOR,
            format_timestamp(self.end)
        )?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Outcome of parsing caption text, including how many blocks were dropped
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    /// Cues that parsed, in source order
    pub cues: Vec<Cue>,

    /// Number of non-empty blocks that were rejected
    pub rejected_blocks: usize,
}

impl ParseReport {
    /// True when nothing usable came out of the text
    pub fn is_degenerate(&self) -> bool {
        self.cues.is_empty()
    }
}

/// Ordered sequence of cues as they appear in the caption text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    /// Cues in textual order (not necessarily sorted by start time)
    pub cues: Vec<Cue>,
}

impl Transcript {
    pub fn new(cues: Vec<Cue>) -> Self {
        Transcript { cues }
    }

    /// Parse caption text into a transcript, skipping malformed blocks
    pub fn parse(text: &str) -> Self {
        Transcript { cues: parse(text) }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Latest end offset over all cues
    pub fn end_time(&self) -> f64 {
        self.cues.iter().map(|c| c.end).fold(0.0, f64::max)
    }

    /// Collect data-quality defects without modifying any cue
    pub fn timing_defects(&self) -> Vec<CueError> {
        let mut defects = Vec::new();
        for cue in &self.cues {
            if let Err(e) = cue.validate() {
                defects.push(e);
            }
            if cue.is_silent() {
                defects.push(CueError::EmptyText { index: cue.index });
            }
        }
        defects
    }

    /// Render the transcript back to SRT text
    pub fn to_srt(&self) -> String {
        self.cues.iter().map(|c| c.to_string()).collect()
    }
}

/// Strip markdown code fence lines and surrounding whitespace
///
/// Only lines that consist of exactly "```srt" or "```" (ignoring trailing
/// whitespace) are removed. The cue grammar itself is not touched here.
pub fn normalize(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| {
            let fence = line.trim_end();
            fence != "```srt" && fence != "```"
        })
        .collect();
    kept.join("\n").trim().to_string()
}

/// Parse caption text into cues; malformed blocks are skipped
pub fn parse(text: &str) -> Vec<Cue> {
    parse_with_report(text).cues
}

/// Parse caption text and report how many blocks were rejected
pub fn parse_with_report(text: &str) -> ParseReport {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = unified.trim();
    let mut report = ParseReport::default();
    if trimmed.is_empty() {
        return report;
    }

    for block in BLOCK_SEPARATOR_REGEX.split(trimmed) {
        if block.trim().is_empty() {
            continue;
        }
        match parse_block(block) {
            Some(cue) => report.cues.push(cue),
            None => {
                report.rejected_blocks += 1;
                debug!("Skipping malformed cue block: {:?}", block.lines().next().unwrap_or(""));
            }
        }
    }

    report
}

// @parses: One blank-line delimited block (index, timing, text lines)
fn parse_block(block: &str) -> Option<Cue> {
    let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 3 {
        return None;
    }

    let index: u32 = lines[0].trim().parse().ok()?;

    let timing = lines[1];
    if !timing.contains(TIMING_SEPARATOR) {
        return None;
    }
    let mut parts = timing.split(TIMING_SEPARATOR);
    let start_str = parts.next()?.trim();
    // Trailing positional hints after the end timestamp are ignored
    let end_str = parts.next()?.split_whitespace().next()?;
    if parts.next().is_some() {
        return None;
    }

    let start = parse_timestamp(start_str)?;
    let end = parse_timestamp(end_str)?;
    let text = lines[2..].join("\n");

    Some(Cue { index, start, end, text })
}

/// Convert a timestamp to seconds
///
/// Accepts `HH:MM:SS`, `MM:SS` or `SS`, followed by `,`, `.` or `:` and
/// exactly three millisecond digits. Missing higher units count as zero.
pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
    let ts = timestamp.trim();

    let (hours, minutes, seconds, millis) = if let Some(caps) = FULL_TIMESTAMP_REGEX.captures(ts) {
        (caps[1].parse::<u64>().ok()?, caps[2].parse::<u64>().ok()?, caps[3].parse::<u64>().ok()?, caps[4].parse::<u64>().ok()?)
    } else if let Some(caps) = SHORT_TIMESTAMP_REGEX.captures(ts) {
        (0, caps[1].parse::<u64>().ok()?, caps[2].parse::<u64>().ok()?, caps[3].parse::<u64>().ok()?)
    } else if let Some(caps) = SECONDS_TIMESTAMP_REGEX.captures(ts) {
        (0, 0, caps[1].parse::<u64>().ok()?, caps[2].parse::<u64>().ok()?)
    } else {
        return None;
    };

    Some((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
