use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default size of the worker pool.
pub const DEFAULT_THREADS: usize = 5;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CommandMode {
    Scan,
    Check,
    Test,
    Fix,
    Tag,
}

impl CommandMode {
    /// Modes that run the normalization pipeline.
    pub fn normalizes(self) -> bool {
        matches!(self, CommandMode::Test | CommandMode::Fix | CommandMode::Tag)
    }

    /// Modes that write tags back and fold counters into Statistics.
    pub fn writes(self) -> bool {
        matches!(self, CommandMode::Fix | CommandMode::Tag)
    }
}

impl fmt::Display for CommandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandMode::Scan => "scan",
            CommandMode::Check => "check",
            CommandMode::Test => "test",
            CommandMode::Fix => "fix",
            CommandMode::Tag => "tag",
        };
        f.write_str(s)
    }
}

/// One audio file found under the scan root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AudioFile {
    pub path: PathBuf,
    /// path relative to the scan root, reused under the output root
    pub rel_path: PathBuf,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum TagField {
    Title,
    Artist,
    Album,
}

impl TagField {
    pub const ALL: [TagField; 3] = [TagField::Title, TagField::Artist, TagField::Album];
}

impl fmt::Display for TagField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TagField::Title => "Title",
            TagField::Artist => "Artist",
            TagField::Album => "Album",
        };
        f.write_str(s)
    }
}

/// Tag values of one file, as read from the tag store.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MediaRecord {
    pub path: PathBuf,
    pub rel_path: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,

    /// 0 = absent
    pub year: u32,
    pub genre: String,

    /// 0 = absent
    pub track: u32,
    pub comment: String,
}

impl MediaRecord {
    pub fn field(&self, field: TagField) -> &str {
        match field {
            TagField::Title => &self.title,
            TagField::Artist => &self.artist,
            TagField::Album => &self.album,
        }
    }

    pub fn field_mut(&mut self, field: TagField) -> &mut String {
        match field {
            TagField::Title => &mut self.title,
            TagField::Artist => &mut self.artist,
            TagField::Album => &mut self.album,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NormalizationOptions {
    /// derive fields from filename / directory name
    pub force: bool,
    /// together with `force`: overwrite fields even when they look fine
    pub force_all: bool,
    /// restrict the pipeline to encoding repair (empty/garbled fallback still runs)
    pub update_encoding_only: bool,
    /// None = write in place
    pub output_root: Option<PathBuf>,
    pub threads: usize,
}

impl NormalizationOptions {
    /// `force` AND `force_all`, never in encoding-only mode.
    pub fn unconditional_overwrite(&self) -> bool {
        self.force && self.force_all && !self.update_encoding_only
    }
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            force: false,
            force_all: false,
            update_encoding_only: false,
            output_root: None,
            threads: DEFAULT_THREADS,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ChangeKind {
    EncodingFixed { charset: &'static str },
    Cleaned,
    ZeroPadded,
    FallbackFilled,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub field: TagField,
    pub kind: ChangeKind,
    pub old_value: String,
    pub new_value: String,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ChangeKind::EncodingFixed { charset } => {
                write!(f, "{}: {} -> UTF-8", self.field, charset)
            }
            ChangeKind::Cleaned => write!(
                f,
                "{} cleaned: {:?} -> {:?}",
                self.field, self.old_value, self.new_value
            ),
            ChangeKind::ZeroPadded => write!(f, "{} zero-padded: {:?}", self.field, self.new_value),
            ChangeKind::FallbackFilled => {
                let source = match self.field {
                    TagField::Title => "filename",
                    TagField::Artist | TagField::Album => "directory",
                };
                write!(f, "{}={:?} (from {}, fallback)", self.field, self.new_value, source)
            }
        }
    }
}

/// Aggregated batch counters. Only the coordinator mutates these.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub encoding_fixed: usize,
    pub tags_updated: usize,
    pub auto_albums: usize,
    pub auto_titles: usize,
}

impl Statistics {
    /// Folds the events of one written file.
    pub fn record_write(&mut self, events: &[ChangeEvent]) {
        self.tags_updated += 1;
        self.encoding_fixed += events
            .iter()
            .filter(|e| matches!(e.kind, ChangeKind::EncodingFixed { .. }))
            .count();

        let album_derived = events
            .iter()
            .any(|e| e.field == TagField::Album && e.kind == ChangeKind::FallbackFilled);
        if album_derived {
            self.auto_albums += 1;
        }

        let title_touched = events.iter().any(|e| {
            e.field == TagField::Title
                && matches!(e.kind, ChangeKind::ZeroPadded | ChangeKind::FallbackFilled)
        });
        if title_touched {
            self.auto_titles += 1;
        }
    }
}
