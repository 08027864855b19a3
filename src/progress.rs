//! Progress reporting for `mmqa score-images`.
//!
//! Progress goes to **stderr** so the JSON-lines scores on stdout stay
//! parseable for scripts.

use std::io::Write;

/// A single progress event while scoring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScoreProgressEvent {
    /// Pairs have been collected; scoring is about to start.
    Collected { pairs: u64, missing: u64 },
    /// `n` pairs scored out of `total`.
    Scoring { n: u64, total: u64 },
}

/// Receives progress events from the scoring loop.
pub trait ScoreProgressReporter: Send + Sync {
    fn report(&self, event: ScoreProgressEvent);
}

/// Human-friendly progress on stderr: "score-images  scoring  1,234 / 5,000 pairs".
pub struct StderrProgress;

impl ScoreProgressReporter for StderrProgress {
    fn report(&self, event: ScoreProgressEvent) {
        let line = match &event {
            ScoreProgressEvent::Collected { pairs, missing } => format!(
                "score-images  collected {} pairs ({} evidence ids not found)\n",
                format_number(*pairs),
                format_number(*missing)
            ),
            ScoreProgressEvent::Scoring { n, total } => format!(
                "score-images  scoring  {} / {} pairs\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ScoreProgressReporter for JsonProgress {
    fn report(&self, event: ScoreProgressEvent) {
        let obj = match &event {
            ScoreProgressEvent::Collected { pairs, missing } => serde_json::json!({
                "event": "progress",
                "phase": "collected",
                "pairs": pairs,
                "missing": missing
            }),
            ScoreProgressEvent::Scoring { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "scoring",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ScoreProgressReporter for NoProgress {
    fn report(&self, _event: ScoreProgressEvent) {}
}

/// `1234567` -> `"1,234,567"`.
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut groups: Vec<&str> = Vec::with_capacity(digits.len() / 3 + 1);
    if head > 0 {
        groups.push(&digits[..head]);
    }
    groups.extend(
        digits.as_bytes()[head..]
            .chunks(3)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok()),
    );
    groups.join(",")
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// The requested mode, or human progress when stderr is a TTY and
    /// none otherwise.
    pub fn resolve(requested: Option<ProgressMode>) -> Self {
        requested.unwrap_or_else(|| {
            if atty::is(atty::Stream::Stderr) {
                ProgressMode::Human
            } else {
                ProgressMode::Off
            }
        })
    }

    pub fn reporter(self) -> Box<dyn ScoreProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
