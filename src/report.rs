//! Console output for a batch run.

use crate::app::{BatchObserver, FileOutcome, JobReport};
use crate::encoding::normalize_name;
use crate::types::{CommandMode, MediaRecord, Statistics};
use serde::Serialize;
use std::io::{self, Write};
use time::OffsetDateTime;

#[derive(Serialize)]
struct JsonSummary<'a> {
    mode: String,
    finished_at: String,
    statistics: &'a Statistics,
}

/// Local time when the offset is known, UTC otherwise. "2026-10-19T14:03:09+07:00".
fn finished_at_stamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let offset = now.offset();
    let sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{:02}:{:02}",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        sign,
        offset.whole_hours().unsigned_abs(),
        offset.minutes_past_hour().unsigned_abs()
    )
}

/// Prints per-file lines and the final statistics block.
pub struct ConsoleReport<W: Write> {
    out: W,
    mode: CommandMode,
    json: bool,
}

impl ConsoleReport<io::Stdout> {
    pub fn stdout(json: bool) -> Self {
        Self::new(io::stdout(), json)
    }
}

impl<W: Write> ConsoleReport<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self {
            out,
            mode: CommandMode::Scan,
            json,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_scan(&mut self, rel: &str, r: &MediaRecord) -> io::Result<()> {
        writeln!(self.out, "File: {rel}")?;
        writeln!(self.out, "  Title: {}", r.title)?;
        writeln!(self.out, "  Artist: {}", r.artist)?;
        writeln!(self.out, "  Album: {}", r.album)?;
        if r.year > 0 {
            writeln!(self.out, "  Year: {}", r.year)?;
        }
        if !r.genre.is_empty() {
            writeln!(self.out, "  Genre: {}", r.genre)?;
        }
        writeln!(self.out)
    }

    fn write_preview(&mut self, rel: &str, report: &JobReport) -> io::Result<()> {
        let before = &report.before;
        let after = report.after.as_ref().unwrap_or(before);
        writeln!(self.out, "File: {rel}")?;
        writeln!(
            self.out,
            "  Current: Title={:?}, Artist={:?}, Album={:?}",
            before.title, before.artist, before.album
        )?;
        writeln!(
            self.out,
            "  New:     Title={:?}, Artist={:?}, Album={:?}",
            after.title, after.artist, after.album
        )?;
        if report.events.is_empty() {
            writeln!(self.out, "  No changes")?;
        } else {
            writeln!(self.out, "  Changes:")?;
            for e in &report.events {
                writeln!(self.out, "    - {e}")?;
            }
        }
        writeln!(self.out)
    }

    fn write_processing(
        &mut self,
        outcome: &FileOutcome,
        total: usize,
        report: &JobReport,
    ) -> io::Result<()> {
        let r = report.after.as_ref().unwrap_or(&report.before);
        let name = outcome
            .file
            .path
            .file_name()
            .map(normalize_name)
            .unwrap_or_default();
        writeln!(
            self.out,
            "[{}/{}] Processing: {} → Title: {:?}, Artist: {:?}, Album: {:?}",
            outcome.index, total, name, r.title, r.artist, r.album
        )?;
        // in-place writes need no extra line
        match &report.written_to {
            Some(dest) if *dest != outcome.file.path => {
                writeln!(self.out, "  Saved to: {}", dest.display())
            }
            _ => Ok(()),
        }
    }

    fn write_outcome(&mut self, outcome: &FileOutcome, total: usize) -> io::Result<()> {
        let report = match &outcome.result {
            Ok(report) => report,
            Err(e) => return writeln!(self.out, "Error: {e}"),
        };
        let rel = outcome.file.rel_path.to_string_lossy();
        match self.mode {
            CommandMode::Scan => self.write_scan(&rel, &report.before),
            CommandMode::Test => self.write_preview(&rel, report),
            CommandMode::Check | CommandMode::Fix | CommandMode::Tag => {
                self.write_processing(outcome, total, report)
            }
        }
    }

    fn write_statistics(&mut self, stats: &Statistics) -> io::Result<()> {
        if self.json {
            let summary = JsonSummary {
                mode: self.mode.to_string(),
                finished_at: finished_at_stamp(),
                statistics: stats,
            };
            let text = serde_json::to_string_pretty(&summary).map_err(io::Error::other)?;
            return writeln!(self.out, "{text}");
        }

        writeln!(self.out, "\n---\n\nStatistics:")?;
        writeln!(self.out, "  Total files: {}", stats.total)?;
        writeln!(self.out, "  Successfully processed: {}", stats.success)?;
        writeln!(self.out, "  Failed: {}", stats.failed)?;
        writeln!(self.out, "  Encoding fixed: {}", stats.encoding_fixed)?;
        writeln!(self.out, "  Tags updated: {}", stats.tags_updated)?;
        writeln!(self.out, "  Auto-derived albums: {}", stats.auto_albums)?;
        writeln!(self.out, "  Auto-formatted titles: {}", stats.auto_titles)?;
        writeln!(self.out)
    }
}

impl<W: Write> BatchObserver for ConsoleReport<W> {
    fn on_start(&mut self, mode: CommandMode, total: usize) {
        self.mode = mode;
        let header = if mode == CommandMode::Test {
            writeln!(self.out, "Preview mode: no files will be modified\n")
        } else {
            Ok(())
        };
        if let Err(e) = header.and_then(|_| writeln!(self.out, "Found {total} audio files\n")) {
            tracing::warn!(error = %e, "report output failed");
        }
    }

    fn on_file(&mut self, outcome: &FileOutcome, total: usize) {
        if let Err(e) = self.write_outcome(outcome, total) {
            tracing::warn!(error = %e, "report output failed");
        }
    }

    fn on_finish(&mut self, stats: &Statistics) {
        if let Err(e) = self.write_statistics(stats).and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "report output failed");
        }
    }
}
