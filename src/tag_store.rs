//! Tag store: reads and writes the textual tag fields of one audio file.

use crate::error::TagError;
use crate::types::MediaRecord;
use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use std::path::Path;
use tracing::debug;

pub trait TagStore: Send + Sync {
    fn read(&self, path: &Path) -> Result<MediaRecord, TagError>;

    fn write(&self, path: &Path, record: &MediaRecord) -> Result<(), TagError>;

    /// Copies `src` to `dest` (creating directories) and writes `record` into the copy.
    fn write_to_copy(&self, src: &Path, dest: &Path, record: &MediaRecord) -> Result<(), TagError>;
}

/// First run of four digits, e.g. "2004-05-01" -> 2004.
fn year_from_text(text: &str) -> u32 {
    let mut digits = String::with_capacity(4);
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            if digits.len() == 4 {
                return digits.parse().unwrap_or(0);
            }
        } else {
            digits.clear();
        }
    }
    0
}

/// `lofty` backed store. Writes go to the file's primary tag type
/// (ID3v2.4 for MP3) and only ever set non-empty values.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagStore;

impl LoftyTagStore {
    fn apply(tag: &mut Tag, record: &MediaRecord) {
        if !record.title.is_empty() {
            tag.set_title(record.title.clone());
        }
        if !record.artist.is_empty() {
            tag.set_artist(record.artist.clone());
        }
        if !record.album.is_empty() {
            tag.set_album(record.album.clone());
        }
        if record.year > 0 {
            tag.remove_key(ItemKey::Year);
            tag.insert_text(ItemKey::Year, record.year.to_string());
        }
        if !record.genre.is_empty() {
            tag.set_genre(record.genre.clone());
        }
    }
}

impl TagStore for LoftyTagStore {
    fn read(&self, path: &Path) -> Result<MediaRecord, TagError> {
        let tagged_file = Probe::open(path)
            .map_err(|e| TagError::read(path, e))?
            .read()
            .map_err(|e| TagError::read(path, e))?;

        let mut record = MediaRecord {
            path: path.to_path_buf(),
            ..Default::default()
        };

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            debug!(file = %path.display(), "no tag present");
            return Ok(record);
        };

        record.title = tag.title().map(|v| v.into_owned()).unwrap_or_default();
        record.artist = tag.artist().map(|v| v.into_owned()).unwrap_or_default();
        record.album = tag.album().map(|v| v.into_owned()).unwrap_or_default();
        record.genre = tag.genre().map(|v| v.into_owned()).unwrap_or_default();
        record.comment = tag.comment().map(|v| v.into_owned()).unwrap_or_default();
        record.track = tag.track().unwrap_or(0);
        record.year = tag
            .get_string(ItemKey::Year)
            .or_else(|| tag.get_string(ItemKey::RecordingDate))
            .map(year_from_text)
            .unwrap_or(0);

        Ok(record)
    }

    fn write(&self, path: &Path, record: &MediaRecord) -> Result<(), TagError> {
        let mut tagged_file = lofty::read_from_path(path).map_err(|e| TagError::write(path, e))?;

        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .tag_mut(tag_type)
            .ok_or_else(|| TagError::write(path, format!("no writable {tag_type:?} tag")))?;

        Self::apply(tag, record);

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| TagError::write(path, e))?;
        debug!(file = %path.display(), "tags saved");
        Ok(())
    }

    fn write_to_copy(&self, src: &Path, dest: &Path, record: &MediaRecord) -> Result<(), TagError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TagError::write(dest, format!("create {}: {e}", parent.display())))?;
        }
        std::fs::copy(src, dest)
            .map_err(|e| TagError::write(dest, format!("copy from {}: {e}", src.display())))?;
        self.write(dest, record)
    }
}
