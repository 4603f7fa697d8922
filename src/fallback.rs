//! Field values derived from a file's own name and its parent directory.

use crate::encoding::normalize_name;
use crate::types::TagField;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static PURE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("pure number pattern"));

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<text>.+?)(?P<num>[0-9]+)$").expect("trailing number pattern"));

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<num>[0-9]+)\s+(?P<rest>.+)$").expect("leading number pattern"));

fn pad2(digits: &str) -> String {
    format!("{digits:0>2}")
}

/// "康熙大帝5" -> "05 康熙大帝", "康熙大帝（第二卷）35" -> "35 康熙大帝（第二卷）",
/// "5" -> "05", "002" -> "002".
pub fn format_title_from_filename(stem: &str) -> String {
    if PURE_NUMBER.is_match(stem) {
        return pad2(stem);
    }

    let Some(caps) = TRAILING_NUMBER.captures(stem) else {
        return stem.to_string();
    };
    let text = caps["text"].trim();
    let num = pad2(&caps["num"]);
    if text.is_empty() {
        num
    } else {
        format!("{num} {text}")
    }
}

/// "1 Song" -> "01 Song". Longer numbers are left alone.
pub fn format_title(title: &str) -> String {
    match LEADING_NUMBER.captures(title) {
        Some(caps) if caps["num"].len() == 1 => format!("0{} {}", &caps["num"], &caps["rest"]),
        _ => title.to_string(),
    }
}

/// Filename stem and parent-directory name of one file, already decoded to UTF-8.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FallbackSource {
    pub stem: String,
    pub dir_name: String,
}

impl FallbackSource {
    pub fn new(stem: impl Into<String>, dir_name: impl Into<String>) -> Self {
        Self {
            stem: stem.into(),
            dir_name: dir_name.into(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        let stem = path.file_stem().map(normalize_name).unwrap_or_default();
        let dir_name = path
            .parent()
            .and_then(Path::file_name)
            .map(normalize_name)
            .unwrap_or_default();
        Self { stem, dir_name }
    }

    fn usable_dir(&self) -> Option<&str> {
        match self.dir_name.as_str() {
            "" | "." => None,
            d => Some(d),
        }
    }

    /// Already in the zero-padded form `format_title` produces, so a derived
    /// title is stable on the next pass.
    pub fn title(&self) -> Option<String> {
        (!self.stem.is_empty()).then(|| format_title(&format_title_from_filename(&self.stem)))
    }

    pub fn album(&self) -> Option<String> {
        self.usable_dir().map(str::to_string)
    }

    /// "Artist_Album" directories name the artist before the first `_`.
    pub fn artist(&self) -> Option<String> {
        let dir = self.usable_dir()?;
        match dir.split_once('_') {
            Some(("", _)) => None,
            Some((artist, _)) => Some(artist.to_string()),
            None => Some(dir.to_string()),
        }
    }

    pub fn derive(&self, field: TagField) -> Option<String> {
        match field {
            TagField::Title => self.title(),
            TagField::Artist => self.artist(),
            TagField::Album => self.album(),
        }
    }
}
