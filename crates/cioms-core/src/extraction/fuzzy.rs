//! Noise-tolerant phrase matching for printed form labels.
//!
//! OCR output is normalized (lowercase, punctuation stripped) and split into
//! word tokens; a phrase matches when some window of tokens is within a
//! bounded Levenshtein distance of it.

use crate::models::config::MatchConfig;

/// A phrase found inside a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseMatch {
    /// Edit distance between the phrase and the matched window.
    pub distance: usize,

    /// Length in characters of the normalized phrase.
    pub phrase_len: usize,

    /// Byte offset in the original text where the matched window starts.
    pub start: usize,

    /// Byte offset in the original text where the matched window ends.
    pub end: usize,
}

/// Strategy for locating a label phrasing inside OCR text.
pub trait PhraseMatcher {
    /// Find `phrase` in `text`, returning the best match if any.
    fn find(&self, text: &str, phrase: &str) -> Option<PhraseMatch>;
}

/// A normalized word and its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    word: String,
    start: usize,
    end: usize,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut start = 0;
    let mut end = 0;

    for (i, c) in text.char_indices() {
        if c.is_alphanumeric() {
            if word.is_empty() {
                start = i;
            }
            word.extend(c.to_lowercase());
            end = i + c.len_utf8();
        } else if !word.is_empty() {
            tokens.push(Token {
                word: std::mem::take(&mut word),
                start,
                end,
            });
        }
    }

    if !word.is_empty() {
        tokens.push(Token { word, start, end });
    }

    tokens
}

/// Lowercase, replace punctuation with spaces, and collapse whitespace.
pub fn normalize(text: &str) -> String {
    tokenize(text)
        .into_iter()
        .map(|t| t.word)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Levenshtein matcher over word windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatcher {
    max_edit_distance: usize,
    chars_per_edit: usize,
}

impl FuzzyMatcher {
    /// Create a matcher with default thresholds.
    pub fn new() -> Self {
        Self::from_config(&MatchConfig::default())
    }

    /// Create a matcher using the thresholds in `config`.
    pub fn from_config(config: &MatchConfig) -> Self {
        Self {
            max_edit_distance: config.max_edit_distance,
            chars_per_edit: config.chars_per_edit,
        }
    }

    /// Set the upper bound on edit distance.
    pub fn with_max_edit_distance(mut self, distance: usize) -> Self {
        self.max_edit_distance = distance;
        self
    }

    /// Set how many phrase characters buy one allowed edit.
    pub fn with_chars_per_edit(mut self, chars: usize) -> Self {
        self.chars_per_edit = chars;
        self
    }

    /// Edits tolerated for a normalized phrase of `phrase_len` characters.
    ///
    /// Short phrasings like "age" or "sex" must match exactly.
    pub fn allowed_distance(&self, phrase_len: usize) -> usize {
        if self.chars_per_edit == 0 {
            return self.max_edit_distance;
        }
        self.max_edit_distance.min(phrase_len / self.chars_per_edit)
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseMatcher for FuzzyMatcher {
    fn find(&self, text: &str, phrase: &str) -> Option<PhraseMatch> {
        let phrase = normalize(phrase);
        if phrase.is_empty() {
            return None;
        }

        let tokens = tokenize(text);
        if tokens.is_empty() {
            return None;
        }

        let phrase_len = phrase.chars().count();
        let allowed = self.allowed_distance(phrase_len);
        let phrase_words = phrase.split(' ').count();

        // One word more or less absorbs OCR splitting or merging words
        let min_window = phrase_words.saturating_sub(1).max(1);
        let max_window = (phrase_words + 1).min(tokens.len());

        let mut best: Option<(usize, usize, usize)> = None; // (distance, first token, last token)

        for start in 0..tokens.len() {
            for size in min_window..=max_window {
                let Some(window) = tokens.get(start..start + size) else {
                    break;
                };

                let candidate = window
                    .iter()
                    .map(|t| t.word.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");

                // Cheap reject before the quadratic distance
                if candidate.chars().count().abs_diff(phrase_len) > allowed {
                    continue;
                }

                let distance = strsim::levenshtein(&candidate, &phrase);
                if distance <= allowed && best.is_none_or(|(d, _, _)| distance < d) {
                    best = Some((distance, start, start + size - 1));
                }
            }
        }

        best.map(|(distance, first, last)| PhraseMatch {
            distance,
            phrase_len,
            start: tokens[first].start,
            end: tokens[last].end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  1. PATIENT  Initials: "), "1 patient initials");
        assert_eq!(normalize("Batch/Lot No."), "batch lot no");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn test_allowed_distance() {
        let matcher = FuzzyMatcher::new();
        assert_eq!(matcher.allowed_distance(3), 0);
        assert_eq!(matcher.allowed_distance(6), 1);
        assert_eq!(matcher.allowed_distance(16), 2);

        let strict = FuzzyMatcher::new().with_max_edit_distance(0);
        assert_eq!(strict.allowed_distance(16), 0);
    }

    #[test]
    fn test_exact_match_case_and_punctuation_insensitive() {
        let matcher = FuzzyMatcher::new();
        let m = matcher.find("SUSPECT DRUG:", "suspect drug").unwrap();

        assert_eq!(m.distance, 0);
        assert_eq!(m.phrase_len, 12);
        assert_eq!(&"SUSPECT DRUG:"[m.end..], ":");
    }

    #[test]
    fn test_ocr_noise_within_threshold() {
        let matcher = FuzzyMatcher::new();

        let m = matcher.find("Patlent Initials", "Patient Initials").unwrap();
        assert_eq!(m.distance, 1);

        let m = matcher.find("Patlent lnitials", "Patient Initials").unwrap();
        assert_eq!(m.distance, 2);
    }

    #[test]
    fn test_ocr_noise_beyond_threshold() {
        let matcher = FuzzyMatcher::new();
        assert!(matcher.find("Pztlent lnitlals", "Patient Initials").is_none());
    }

    #[test]
    fn test_short_phrases_require_exact_match() {
        let matcher = FuzzyMatcher::new();
        assert!(matcher.find("Age", "age").is_some());
        assert!(matcher.find("Ago", "age").is_none());
        assert!(matcher.find("Page 1", "age").is_none());
    }

    #[test]
    fn test_match_inside_longer_label() {
        let matcher = FuzzyMatcher::new();
        let text = "1. PATIENT INITIALS (first, last)";
        let m = matcher.find(text, "patient initials").unwrap();

        assert_eq!(m.distance, 0);
        assert_eq!(&text[..m.end], "1. PATIENT INITIALS");
        assert_eq!(&text[m.start..m.end], "PATIENT INITIALS");
    }

    #[test]
    fn test_merged_words() {
        let matcher = FuzzyMatcher::new();
        let m = matcher.find("PatientInitials", "patient initials").unwrap();
        assert_eq!(m.distance, 1);
    }

    #[test]
    fn test_prefers_lowest_distance_window() {
        let matcher = FuzzyMatcher::new();
        let text = "Welght / Weight";
        let m = matcher.find(text, "weight").unwrap();

        assert_eq!(m.distance, 0);
        assert_eq!(m.end, text.len());
    }

    #[test]
    fn test_empty_inputs() {
        let matcher = FuzzyMatcher::new();
        assert!(matcher.find("", "age").is_none());
        assert!(matcher.find("Age", "  ").is_none());
    }
}
