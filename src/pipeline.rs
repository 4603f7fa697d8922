//! Per-file tag normalization.
//!
//! Fixed precedence per field: encoding repair, cleanup, title zero-padding,
//! then filename/directory fallback. Pure: no shared state, no I/O.

use crate::cleaner;
use crate::encoding::{fix_encoding, is_garbled};
use crate::fallback::{FallbackSource, format_title};
use crate::types::{ChangeEvent, ChangeKind, MediaRecord, NormalizationOptions, TagField};
use tracing::debug;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Normalized {
    pub record: MediaRecord,
    pub events: Vec<ChangeEvent>,
}

impl Normalized {
    pub fn is_unchanged(&self) -> bool {
        self.events.is_empty()
    }
}

struct FieldRun<'a> {
    field: TagField,
    value: String,
    events: &'a mut Vec<ChangeEvent>,
}

impl FieldRun<'_> {
    fn set(&mut self, kind: ChangeKind, next: String) {
        if next == self.value {
            return;
        }
        self.events.push(ChangeEvent {
            field: self.field,
            kind,
            old_value: std::mem::replace(&mut self.value, next.clone()),
            new_value: next,
        });
    }
}

fn normalize_field(
    field: TagField,
    raw: &str,
    options: &NormalizationOptions,
    source: &FallbackSource,
    events: &mut Vec<ChangeEvent>,
) -> String {
    let mut run = FieldRun {
        field,
        value: raw.to_string(),
        events,
    };

    if !run.value.is_empty() {
        let fix = fix_encoding(&run.value);
        if fix.changed {
            run.set(ChangeKind::EncodingFixed { charset: fix.charset }, fix.text);
        }
        if is_garbled(&run.value) {
            debug!(%field, value = %run.value, "still garbled after encoding repair");
        }

        let cleaned = cleaner::clean(&run.value);
        run.set(ChangeKind::Cleaned, cleaned);
    }

    if field == TagField::Title && !options.update_encoding_only && !run.value.is_empty() {
        let padded = format_title(&run.value);
        run.set(ChangeKind::ZeroPadded, padded);
    }

    let needs_fallback =
        run.value.is_empty() || is_garbled(&run.value) || options.unconditional_overwrite();
    if needs_fallback {
        if let Some(derived) = source.derive(field) {
            run.set(ChangeKind::FallbackFilled, derived);
        }
    }

    run.value
}

/// Normalizes title, artist and album of `record`. Other fields pass through.
pub fn normalize(
    record: &MediaRecord,
    options: &NormalizationOptions,
    source: &FallbackSource,
) -> Normalized {
    let mut out = record.clone();
    let mut events = Vec::new();

    for field in TagField::ALL {
        let value = normalize_field(field, record.field(field), options, source, &mut events);
        *out.field_mut(field) = value;
    }

    Normalized {
        record: out,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::GBK;

    fn record(title: &str, artist: &str, album: &str) -> MediaRecord {
        MediaRecord {
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            ..Default::default()
        }
    }

    fn kinds(n: &Normalized, field: TagField) -> Vec<ChangeKind> {
        n.events
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.kind)
            .collect()
    }

    fn gbk_as_latin1(s: &str) -> String {
        let (bytes, _, _) = GBK.encode(s);
        bytes.iter().map(|&b| char::from(b)).collect()
    }

    #[test]
    fn end_to_end_force_all_derives_from_path() {
        let source = FallbackSource::new("1 song", "MyAlbum_ArtistName");
        let options = NormalizationOptions {
            force: true,
            force_all: true,
            ..Default::default()
        };
        let input = record(&gbk_as_latin1("你好世界"), "", "");

        let out = normalize(&input, &options, &source);

        assert_eq!(out.record.album, "MyAlbum_ArtistName");
        assert_eq!(out.record.artist, "MyAlbum");
        assert_eq!(out.record.title, "01 song");
        assert!(kinds(&out, TagField::Album).contains(&ChangeKind::FallbackFilled));
        assert!(kinds(&out, TagField::Artist).contains(&ChangeKind::FallbackFilled));
        assert!(kinds(&out, TagField::Title).contains(&ChangeKind::FallbackFilled));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let source = FallbackSource::new("1 song", "MyAlbum_ArtistName");
        for options in [
            NormalizationOptions::default(),
            NormalizationOptions {
                force: true,
                force_all: true,
                ..Default::default()
            },
        ] {
            let first = normalize(&record("1 Hello", "", "Album"), &options, &source);
            let second = normalize(&first.record, &options, &source);
            assert!(second.is_unchanged(), "{:?}", second.events);
            assert_eq!(second.record, first.record);
        }
    }

    #[test]
    fn clean_utf8_record_emits_nothing() {
        let source = FallbackSource::new("whatever 9", "Dir");
        let input = record("01 Song", "Artist", "Album");
        let out = normalize(&input, &NormalizationOptions::default(), &source);
        assert!(out.is_unchanged());
        assert_eq!(out.record, input);
    }

    #[test]
    fn double_encoded_title_is_repaired_first() {
        let original = "康熙大帝";
        let mangled: String = original.bytes().map(char::from).collect();
        let source = FallbackSource::new("ignored 3", "Dir");
        let out = normalize(&record(&mangled, "A", "B"), &NormalizationOptions::default(), &source);

        assert_eq!(out.record.title, original);
        assert_eq!(
            kinds(&out, TagField::Title),
            [ChangeKind::EncodingFixed { charset: crate::encoding::DOUBLE_ENCODED_LABEL }]
        );
    }

    #[test]
    fn cleanup_that_empties_a_field_triggers_fallback() {
        let source = FallbackSource::new("Song 3", "Artist_Album");
        let input = record("CD Digital Audio, Track#30", "www.site.com", "Album");
        let out = normalize(&input, &NormalizationOptions::default(), &source);

        assert_eq!(out.record.title, "03 Song");
        assert_eq!(out.record.artist, "Artist");
        assert_eq!(out.record.album, "Album");
        assert_eq!(
            kinds(&out, TagField::Title),
            [ChangeKind::Cleaned, ChangeKind::FallbackFilled]
        );
    }

    #[test]
    fn title_is_zero_padded() {
        let source = FallbackSource::new("x", "Dir");
        let out = normalize(&record("1 Song", "A", "B"), &NormalizationOptions::default(), &source);
        assert_eq!(out.record.title, "01 Song");
        assert_eq!(kinds(&out, TagField::Title), [ChangeKind::ZeroPadded]);
    }

    #[test]
    fn encoding_only_skips_padding_and_forced_overwrite() {
        let source = FallbackSource::new("9 other", "Other_Dir");
        let options = NormalizationOptions {
            force: true,
            force_all: true,
            update_encoding_only: true,
            ..Default::default()
        };
        let input = record("1 Song", "Artist", "Album");
        let out = normalize(&input, &options, &source);
        assert!(out.is_unchanged());
        assert_eq!(out.record, input);
    }

    #[test]
    fn encoding_only_still_fills_empty_and_garbled_fields() {
        let source = FallbackSource::new("Track5", "Singer_Best");
        let options = NormalizationOptions {
            update_encoding_only: true,
            ..Default::default()
        };
        let input = record("??????", "", "Album");
        let out = normalize(&input, &options, &source);

        assert_eq!(out.record.title, "05 Track");
        assert_eq!(out.record.artist, "Singer");
        assert_eq!(out.record.album, "Album");
    }

    #[test]
    fn short_legacy_tags_never_survive_garbled() {
        let source = FallbackSource::new("Track5", "Singer_Best");
        let (big5, _, _) = encoding_rs::BIG5.encode("周杰倫");
        let big5: String = big5.iter().map(|&b| char::from(b)).collect();

        for mangled in [gbk_as_latin1("爱"), gbk_as_latin1("你好"), big5] {
            assert!(is_garbled(&mangled), "{mangled:?}");
            let out = normalize(&record(&mangled, "A", "B"), &NormalizationOptions::default(), &source);
            // either the detector recovered the text or the filename fallback replaced it
            assert_ne!(out.record.title, mangled);
            assert!(!is_garbled(&out.record.title), "{:?}", out.record.title);
            assert!(!out.record.title.is_empty());
        }
    }

    #[test]
    fn force_without_all_keeps_good_values() {
        let source = FallbackSource::new("2 other", "Other_Dir");
        let options = NormalizationOptions {
            force: true,
            ..Default::default()
        };
        let input = record("01 Song", "Artist", "Album");
        assert!(normalize(&input, &options, &source).is_unchanged());
    }

    #[test]
    fn missing_directory_leaves_album_empty() {
        let source = FallbackSource::new("song", ".");
        let out = normalize(&record("", "", ""), &NormalizationOptions::default(), &source);
        assert_eq!(out.record.title, "song");
        assert_eq!(out.record.album, "");
        assert_eq!(out.record.artist, "");
    }

    #[test]
    fn other_fields_pass_through() {
        let input = MediaRecord {
            year: 1998,
            genre: "Pop".to_string(),
            track: 4,
            comment: "c".to_string(),
            ..record("t", "a", "b")
        };
        let out = normalize(&input, &NormalizationOptions::default(), &FallbackSource::default());
        assert_eq!(out.record.year, 1998);
        assert_eq!(out.record.genre, "Pop");
        assert_eq!(out.record.track, 4);
        assert_eq!(out.record.comment, "c");
    }
}
