/// High-score tables: the top five results per mode.
///
/// ## File format
///
/// One plain-text table per mode, `scores_escape.txt` and
/// `scores_hunter.txt`, in the configured scores directory:
///
///   === TOP 5 - ESCAPE ===
///   name | score | date
///   ----------------------------------------
///   alice | 2100 | 19/10/2026 14:05
///
/// Parsing is lenient: the header, the separator and anything that does
/// not read as `name | score | date` are skipped, so a hand-edited file
/// never stops the game from starting. Two-column `name | score` lines
/// from older tables load with an empty date.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ScoreError;
use super::world::Mode;

pub const TOP_N: usize = 5;
const SEPARATOR_WIDTH: usize = 40;
const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

// ══════════════════════════════════════════════════════════════
// Public types
// ══════════════════════════════════════════════════════════════

/// What a finished session hands to the score table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoreRecord {
    pub player_name: String,
    pub score: u32,
    pub mode: Mode,
    /// Local time the session ended, `dd/mm/yyyy HH:MM`.
    pub date: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
    /// Empty for entries read from two-column tables.
    pub date: String,
}

/// Current local time in the table's date format.
pub fn timestamp_now() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighScores {
    escape: Vec<ScoreEntry>,
    hunter: Vec<ScoreEntry>,
}

// ══════════════════════════════════════════════════════════════
// Table operations
// ══════════════════════════════════════════════════════════════

impl HighScores {
    /// Best first. Ties keep the order they were added in.
    pub fn top(&self, mode: Mode) -> &[ScoreEntry] {
        match mode {
            Mode::Escape => &self.escape,
            Mode::Hunter => &self.hunter,
        }
    }

    fn table_mut(&mut self, mode: Mode) -> &mut Vec<ScoreEntry> {
        match mode {
            Mode::Escape => &mut self.escape,
            Mode::Hunter => &mut self.hunter,
        }
    }

    /// Insert a record. Returns its rank (0 = best) if it made the table.
    pub fn add(&mut self, record: ScoreRecord) -> Option<usize> {
        let table = self.table_mut(record.mode);
        let name = sanitize_name(&record.player_name);
        // Stable sort: an equal score goes below the ones already there.
        let rank = table.iter().position(|e| e.score < record.score).unwrap_or(table.len());
        if rank >= TOP_N {
            return None;
        }
        let date = sanitize_date(&record.date);
        table.insert(rank, ScoreEntry { name, score: record.score, date });
        table.truncate(TOP_N);
        Some(rank)
    }

    pub fn qualifies(&self, mode: Mode, score: u32) -> bool {
        let table = self.top(mode);
        table.len() < TOP_N || table.iter().any(|e| e.score < score)
    }
}

// ══════════════════════════════════════════════════════════════
// Persistence
// ══════════════════════════════════════════════════════════════

pub fn table_path(dir: &Path, mode: Mode) -> PathBuf {
    dir.join(format!("scores_{}.txt", mode.label().to_lowercase()))
}

impl HighScores {
    /// Read both tables. A missing file is an empty table.
    pub fn load(dir: &Path) -> Result<Self, ScoreError> {
        let mut scores = HighScores::default();
        for mode in Mode::ALL {
            let path = table_path(dir, mode);
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(io_error(&path, source)),
            };
            let mut entries = parse_table(&text);
            entries.sort_by(|a, b| b.score.cmp(&a.score));
            entries.truncate(TOP_N);
            *scores.table_mut(mode) = entries;
        }
        Ok(scores)
    }

    pub fn save(&self, dir: &Path) -> Result<(), ScoreError> {
        std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        for mode in Mode::ALL {
            let path = table_path(dir, mode);
            std::fs::write(&path, serialize_table(mode, self.top(mode)))
                .map_err(|e| io_error(&path, e))?;
        }
        tracing::debug!(dir = %dir.display(), "high scores saved");
        Ok(())
    }

    /// Reload from disk, add one record, write back. Keeps tables written by
    /// other sessions since this one started.
    pub fn merge_record(dir: &Path, record: ScoreRecord) -> Result<Self, ScoreError> {
        let mut scores = HighScores::load(dir)?;
        let (mode, score) = (record.mode, record.score);
        if !scores.qualifies(mode, score) {
            tracing::debug!(mode = mode.label(), score, "score did not make the table");
            return Ok(scores);
        }
        match scores.add(record) {
            Some(rank) => {
                tracing::info!(mode = mode.label(), score, rank = rank + 1, "new high score");
                scores.save(dir)?;
            }
            None => tracing::debug!(mode = mode.label(), score, "score did not make the table"),
        }
        Ok(scores)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ScoreError {
    ScoreError::Io { path: path.display().to_string(), source }
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

/// `|` separates columns and newlines separate rows, so neither may
/// appear in a stored name.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '|' || c.is_control() { ' ' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() { "player".to_string() } else { trimmed.to_string() }
}

fn sanitize_date(date: &str) -> String {
    date.chars()
        .map(|c| if c == '|' || c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn serialize_table(mode: Mode, entries: &[ScoreEntry]) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(&format!("=== TOP {} - {} ===\n", TOP_N, mode.label()));
    out.push_str("name | score | date\n");
    out.push_str(&"-".repeat(SEPARATOR_WIDTH));
    out.push('\n');
    for e in entries {
        if e.date.is_empty() {
            out.push_str(&format!("{} | {}\n", e.name, e.score));
        } else {
            out.push_str(&format!("{} | {} | {}\n", e.name, e.score, e.date));
        }
    }
    out
}

fn parse_table(text: &str) -> Vec<ScoreEntry> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("===") || line.starts_with('-') {
            continue;
        }
        let columns: Vec<&str> = line.split('|').map(str::trim).collect();
        let (name, score, date) = match columns.as_slice() {
            [name, score] => (*name, *score, ""),
            [name, score, date] => (*name, *score, *date),
            _ => continue,
        };
        let Ok(score) = score.parse::<u32>() else { continue }; // also drops the column header
        if name.is_empty() {
            continue;
        }
        entries.push(ScoreEntry { name: name.to_string(), score, date: date.to_string() });
    }
    entries
}
