//! Noise removal for tag text: CD ripper defaults, URLs, site watermarks,
//! leftover file extensions.

use regex::Regex;
use std::sync::LazyLock;

const DOMAIN_TLDS: &str = "com|cn|net|org|edu|gov|io|co|uk|de|fr|jp|ru|au|ca|br|in|it|es|nl|se|no|dk|fi|pl|cz|hu|gr|pt|ie|at|ch|be|tr|kr|tw|hk|sg|my|th|vn|id|ph|nz|za|mx|ar|cl|pe|eg|sa|ae|il|pk|bd|lk|np|mm|kh|la|mn|kz|uz|az|ge|am|by|ua|md|ro|bg|rs|hr|si|sk|lt|lv|ee|is|mt|cy|lu|mc|ad|li|sm|va|me|ba|mk|al|xk";

const AUDIO_EXTENSIONS: &str = "mp3|wav|flac|m4a|aac|ogg|wma|ape|wv|tta|tak|ofr|ofs|off|rka|shn|aa3|gsm|3gp|amr|awb|au|snd|ra|rm|ram|dct|vox|sln";

/// Texts that are nothing but a separator.
const SEPARATOR_TOKENS: [&str; 2] = ["---", "[]"];

/// Short-title rule only fires below this many characters.
const SHORT_TRACK_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// whole value is boilerplate: return empty
    Discard { below_chars: Option<usize> },
    /// cut every match out of the value
    Strip,
}

#[derive(Debug)]
pub struct CleanRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub action: RuleAction,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    Discarded,
    Kept(String),
}

impl CleanRule {
    fn new(name: &'static str, pattern: &str, action: RuleAction) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("cleanup rule pattern"),
            action,
        }
    }

    pub fn apply(&self, text: &str) -> RuleOutcome {
        match self.action {
            RuleAction::Discard { below_chars } => {
                let short_enough = below_chars.is_none_or(|max| text.chars().count() < max);
                if short_enough && self.pattern.is_match(text) {
                    RuleOutcome::Discarded
                } else {
                    RuleOutcome::Kept(text.to_string())
                }
            }
            RuleAction::Strip => {
                // `follow` is the terminator of an extension token; it stays
                RuleOutcome::Kept(self.pattern.replace_all(text, "$follow").into_owned())
            }
        }
    }
}

static RULES: LazyLock<Vec<CleanRule>> = LazyLock::new(|| {
    vec![
        CleanRule::new(
            "cd-default-title",
            r"(?i)^CD\s*(Digital\s+Audio|DA)\s*,?\s*Track#?\s*\d+.*$",
            RuleAction::Discard { below_chars: None },
        ),
        CleanRule::new(
            "short-track-title",
            r"(?i)^(CD\s*)?Track#?\s*\d+.*$",
            RuleAction::Discard {
                below_chars: Some(SHORT_TRACK_MAX_CHARS),
            },
        ),
        CleanRule::new("url", r"(?i)(https?://\S+|www\.\S+)", RuleAction::Strip),
        CleanRule::new(
            "bracketed-domain",
            &format!(r"\[[^\]]*\.({DOMAIN_TLDS})[^\]]*\]"),
            RuleAction::Strip,
        ),
        CleanRule::new(
            "audio-extension",
            &format!(r"(?i)(\.(?:{AUDIO_EXTENSIONS}))+(?P<follow>\s|$|\.)"),
            RuleAction::Strip,
        ),
    ]
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Ordered cleanup rules, in the order [`clean`] applies them.
pub fn cleanup_rules() -> &'static [CleanRule] {
    &RULES
}

fn tidy_whitespace(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches('-');
    WHITESPACE_RUN.replace_all(trimmed, " ").trim().to_string()
}

pub fn clean(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned = text.to_string();
    for rule in cleanup_rules() {
        match rule.apply(&cleaned) {
            RuleOutcome::Discarded => return String::new(),
            RuleOutcome::Kept(next) => cleaned = next,
        }
    }

    let cleaned = tidy_whitespace(&cleaned);
    if SEPARATOR_TOKENS.contains(&cleaned.as_str()) {
        return String::new();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> &'static CleanRule {
        cleanup_rules()
            .iter()
            .find(|r| r.name == name)
            .unwrap()
    }

    #[test]
    fn bracketed_domain_is_removed() {
        assert_eq!(clean("Track Name [bbs.example.com]"), "Track Name");
        assert_eq!(clean("[bbs.bbxpp.cn]康熙大帝"), "康熙大帝");
    }

    #[test]
    fn brackets_without_known_tld_are_kept() {
        assert_eq!(clean("Song [Live]"), "Song [Live]");
        assert_eq!(clean("Song [v1.2]"), "Song [v1.2]");
    }

    #[test]
    fn cd_default_titles_become_empty() {
        assert_eq!(clean("CD Digital Audio, Track#30"), "");
        assert_eq!(clean("cd digital audio track 7"), "");
        assert_eq!(clean("CDDA Track#3"), "");
        assert_eq!(clean("Track 12"), "");
        assert_eq!(clean("CD Track 4"), "");
    }

    #[test]
    fn short_track_rule_ignores_long_titles() {
        let long = "Track 1 of the extended live session recorded in Berlin 1999";
        assert!(long.chars().count() >= SHORT_TRACK_MAX_CHARS);
        assert_eq!(
            rule("short-track-title").apply(long),
            RuleOutcome::Kept(long.to_string())
        );
        assert_eq!(clean(long), long);
    }

    #[test]
    fn titles_starting_with_track_words_survive() {
        assert_eq!(clean("Tracks of My Tears"), "Tracks of My Tears");
    }

    #[test]
    fn urls_are_removed() {
        assert_eq!(clean("Song http://example.com/x"), "Song");
        assert_eq!(clean("www.site.cn Song"), "Song");
        assert_eq!(clean("https://only.example.com"), "");
    }

    #[test]
    fn extensions_are_removed() {
        assert_eq!(clean("Song.mp3"), "Song");
        assert_eq!(clean("Song.MP3 Remix"), "Song Remix");
        assert_eq!(clean("Intro.wav.mp3"), "Intro");
        assert_eq!(clean("Live.flac.Set"), "Live.Set");
        assert_eq!(clean("Mp3 Collection"), "Mp3 Collection");
    }

    #[test]
    fn whitespace_and_trailing_dashes() {
        assert_eq!(clean("  Song   Name  "), "Song Name");
        assert_eq!(clean("Song - "), "Song");
        assert_eq!(clean("Song ---"), "Song");
    }

    #[test]
    fn separator_only_values_become_empty() {
        assert_eq!(clean("---"), "");
        assert_eq!(clean("[]"), "");
        assert_eq!(clean("   "), "");
    }

    #[test]
    fn clean_is_stable_on_clean_text() {
        for s in ["01 Song", "康熙大帝（第二卷）", "Artist Name"] {
            assert_eq!(clean(s), s);
            assert_eq!(clean(&clean(s)), clean(s));
        }
    }

    #[test]
    fn rules_are_ordered() {
        let names: Vec<_> = cleanup_rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            [
                "cd-default-title",
                "short-track-title",
                "url",
                "bracketed-domain",
                "audio-extension"
            ]
        );
    }
}
