//! Spatial label/value matching over OCR fragments.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::models::catalog::LabelCatalog;
use crate::models::config::MatchConfig;
use crate::models::form::FieldLabel;
use crate::ocr::{BoundingBox, TextFragment};

use super::fuzzy::{FuzzyMatcher, PhraseMatch, PhraseMatcher, normalize};
use super::patterns::{clean_value, is_box_number, is_filled, strip_notes};

/// A label and the value found for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedValue {
    /// Label name from the catalog.
    pub label: String,

    /// Cleaned value text.
    pub value: String,
}

/// A fragment identified as a printed label.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LabelHit {
    label_index: usize,
    phrase_len: usize,
    distance: usize,
    /// Text after a colon following the label, e.g. "Age: 45".
    inline: Option<String>,
}

impl LabelHit {
    /// Longer phrasings are more specific; ties go to the closer match.
    fn outranks(&self, other: &LabelHit) -> bool {
        (self.phrase_len, other.distance) > (other.phrase_len, self.distance)
    }
}

/// Whether `rest` starts with a colon, allowing a note such as "(s)" before it.
fn colon_follows(rest: &str) -> bool {
    let rest = rest.trim_start();
    let rest = match rest.strip_prefix('(') {
        Some(note) => note.find(')').map_or(rest, |end| &note[end + 1..]),
        None => rest,
    };
    rest.trim_start().starts_with(':')
}

/// Where a phrase match sits decides whether the fragment is a label.
///
/// The phrase must open the fragment, after an optional box number like
/// "1a.", and be followed only by a note, or by a colon and an inline value.
/// Returns `None` when the fragment is not a label, otherwise the inline value.
fn label_inline(text: &str, m: &PhraseMatch) -> Option<Option<String>> {
    let leading = normalize(&text[..m.start]);
    if !leading.split(' ').filter(|t| !t.is_empty()).all(is_box_number) {
        return None;
    }

    let rest = &text[m.end..];
    match rest.find(':') {
        Some(pos) if normalize(&strip_notes(&rest[..pos])).is_empty() => {
            Some(Some(rest[pos + 1..].trim().to_string()))
        }
        Some(_) => None,
        None if normalize(&strip_notes(rest)).is_empty() => Some(None),
        None => None,
    }
}

/// Finds catalog labels among fragments and the values printed next to them.
pub struct FieldMatcher<M: PhraseMatcher = FuzzyMatcher> {
    phrase_matcher: M,
    config: MatchConfig,
}

impl FieldMatcher<FuzzyMatcher> {
    /// Create a matcher with the fuzzy phrase strategy configured from `config`.
    pub fn from_config(config: MatchConfig) -> Self {
        Self::new(FuzzyMatcher::from_config(&config), config)
    }
}

impl Default for FieldMatcher<FuzzyMatcher> {
    fn default() -> Self {
        Self::from_config(MatchConfig::default())
    }
}

impl<M: PhraseMatcher> FieldMatcher<M> {
    /// Create a matcher with an explicit phrase strategy.
    pub fn new(phrase_matcher: M, config: MatchConfig) -> Self {
        Self {
            phrase_matcher,
            config,
        }
    }

    /// Matching configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Identify which label, if any, a piece of text is.
    pub fn identify_label<'a>(&self, text: &str, catalog: &'a LabelCatalog) -> Option<&'a FieldLabel> {
        self.classify(text, catalog)
            .map(|hit| &catalog.labels()[hit.label_index])
    }

    /// Match every catalog label against `fragments`.
    ///
    /// Returns filled values in catalog order. Labels that are absent, or
    /// present with a blank or placeholder value, are omitted.
    pub fn match_fields(&self, fragments: &[TextFragment], catalog: &LabelCatalog) -> Vec<MatchedValue> {
        let fragments: Vec<TextFragment> = fragments
            .iter()
            .flat_map(|f| self.split_pairs(f, catalog))
            .collect();

        let hits: Vec<Option<LabelHit>> = fragments
            .iter()
            .map(|f| self.classify(&f.text, catalog))
            .collect();

        debug!(
            "{} of {} fragments identified as labels",
            hits.iter().filter(|h| h.is_some()).count(),
            fragments.len()
        );

        let mut values = Vec::new();

        for (label_index, label) in catalog.labels().iter().enumerate() {
            // First occurrence in reading order that yields a filled value
            let value = hits
                .iter()
                .enumerate()
                .filter_map(|(i, hit)| hit.as_ref().map(|h| (i, h)))
                .filter(|(_, hit)| hit.label_index == label_index)
                .find_map(|(i, hit)| self.locate_value(i, hit, &fragments, &hits));

            match value {
                Some(value) => {
                    debug!("{}: {}", label.name, value);
                    values.push(MatchedValue {
                        label: label.name.clone(),
                        value,
                    });
                }
                None => trace!("No filled value for {}", label.name),
            }
        }

        values
    }

    /// Split a fragment holding several "Label: value" pairs, such as
    /// "Sex: M  Age: 45", into one fragment per pair.
    ///
    /// Widths are shared out by character count.
    fn split_pairs(&self, fragment: &TextFragment, catalog: &LabelCatalog) -> Vec<TextFragment> {
        let text = fragment.text.as_str();
        let Some(first_colon) = text.find(':') else {
            return vec![fragment.clone()];
        };

        let mut spans: Vec<(usize, usize)> = catalog
            .labels()
            .iter()
            .flat_map(|l| l.phrasings.iter())
            .filter_map(|p| self.phrase_matcher.find(text, p))
            .filter(|m| m.start > first_colon && colon_follows(&text[m.end..]))
            .map(|m| (m.start, m.end))
            .collect();

        if spans.is_empty() {
            return vec![fragment.clone()];
        }

        // A phrase inside a longer one ("onset date" in "reaction onset date") is not a cut
        spans.sort_unstable();
        let mut cuts = Vec::new();
        let mut covered = 0;
        for (start, end) in spans {
            if start >= covered {
                cuts.push(start);
            }
            covered = covered.max(end);
        }

        let total = text.chars().count() as f32;
        let bbox = fragment.bbox;
        let bounds: Vec<usize> = std::iter::once(0)
            .chain(cuts)
            .chain(std::iter::once(text.len()))
            .collect();

        trace!("Splitting '{}' into {} pairs", text, bounds.len() - 1);

        bounds
            .windows(2)
            .filter(|w| !text[w[0]..w[1]].trim().is_empty())
            .map(|w| {
                let offset = text[..w[0]].chars().count() as f32 / total;
                let share = text[w[0]..w[1]].chars().count() as f32 / total;
                TextFragment::new(
                    text[w[0]..w[1]].trim(),
                    BoundingBox::new(
                        bbox.x + bbox.width * offset,
                        bbox.y,
                        bbox.width * share,
                        bbox.height,
                    ),
                    fragment.confidence,
                )
            })
            .collect()
    }

    fn classify(&self, text: &str, catalog: &LabelCatalog) -> Option<LabelHit> {
        let mut best: Option<LabelHit> = None;

        for (label_index, label) in catalog.labels().iter().enumerate() {
            for phrasing in &label.phrasings {
                let Some(m) = self.phrase_matcher.find(text, phrasing) else {
                    continue;
                };

                let Some(inline) = label_inline(text, &m) else {
                    trace!("'{}' contains '{}' but is not that label", text, phrasing);
                    continue;
                };

                let hit = LabelHit {
                    label_index,
                    phrase_len: m.phrase_len,
                    distance: m.distance,
                    inline,
                };

                // Strict comparison keeps catalog order on ties
                if best.as_ref().is_none_or(|b| hit.outranks(b)) {
                    best = Some(hit);
                }
            }
        }

        best
    }

    fn locate_value(
        &self,
        index: usize,
        hit: &LabelHit,
        fragments: &[TextFragment],
        hits: &[Option<LabelHit>],
    ) -> Option<String> {
        let (first, anchor) = match hit.inline.as_deref() {
            Some(inline) if !inline.is_empty() => (inline, index),
            _ => {
                let candidate = self
                    .value_right(index, fragments, hits)
                    .or_else(|| self.value_below(index, fragments, hits))?;
                (fragments[candidate].text.as_str(), candidate)
            }
        };

        if !is_filled(first) {
            return None;
        }

        let mut parts = vec![first];
        parts.extend(
            self.continuation(anchor, fragments, hits)
                .into_iter()
                .map(|i| fragments[i].text.as_str()),
        );

        Some(clean_value(&parts.join(" ")))
    }

    /// Whether a label sits to the left of `index` on its row.
    ///
    /// Such a fragment is that label's right-hand value and cannot be taken
    /// by a label above it.
    fn owned_by_row_label(&self, index: usize, fragments: &[TextFragment], hits: &[Option<LabelHit>]) -> bool {
        let bbox = &fragments[index].bbox;

        fragments.iter().enumerate().any(|(i, f)| {
            i != index
                && hits[i].is_some()
                && f.bbox.x < bbox.x
                && (f.bbox.center_y() - bbox.center_y()).abs() <= self.config.row_tolerance * f.bbox.height
        })
    }

    /// Nearest unlabeled fragment on the label's row, before the next label.
    fn value_right(&self, index: usize, fragments: &[TextFragment], hits: &[Option<LabelHit>]) -> Option<usize> {
        let label = &fragments[index].bbox;
        let row_tolerance = self.config.row_tolerance * label.height;
        let start = label.right() - self.config.proximity_tolerance;

        let on_row_after = |i: usize, bbox: &BoundingBox| {
            i != index
                && bbox.x >= start
                && (bbox.center_y() - label.center_y()).abs() <= row_tolerance
        };

        let next_label = fragments
            .iter()
            .enumerate()
            .filter(|(i, f)| hits[*i].is_some() && on_row_after(*i, &f.bbox))
            .map(|(_, f)| f.bbox.x)
            .fold(f32::INFINITY, f32::min);

        let candidates = fragments
            .iter()
            .enumerate()
            .filter(|(i, f)| hits[*i].is_none() && on_row_after(*i, &f.bbox) && f.bbox.x < next_label)
            .map(|(i, f)| (i, (f.bbox.x - label.right()).max(0.0)));

        self.pick_nearest(candidates, fragments)
    }

    /// Nearest unlabeled fragment under the label's column, within one line.
    fn value_below(&self, index: usize, fragments: &[TextFragment], hits: &[Option<LabelHit>]) -> Option<usize> {
        let label = &fragments[index].bbox;
        let max_gap = self.config.vertical_tolerance * label.height;

        let candidates = fragments
            .iter()
            .enumerate()
            .filter(|(i, f)| {
                *i != index
                    && hits[*i].is_none()
                    && f.bbox.center_y() > label.bottom()
                    && f.bbox.overlaps_horizontally(label)
                    && !self.owned_by_row_label(*i, fragments, hits)
            })
            .map(|(i, f)| (i, (f.bbox.y - label.bottom()).max(0.0)))
            .filter(|(_, gap)| *gap <= max_gap);

        self.pick_nearest(candidates, fragments)
    }

    /// Lines that continue a value downward, in its column, up to the next label.
    fn continuation(&self, anchor: usize, fragments: &[TextFragment], hits: &[Option<LabelHit>]) -> Vec<usize> {
        let mut lines = Vec::new();
        let mut current = anchor;

        loop {
            let bbox = fragments[current].bbox;
            let max_gap = self.config.vertical_tolerance * bbox.height;

            let next = fragments
                .iter()
                .enumerate()
                .filter(|(i, f)| {
                    *i != anchor
                        && !lines.contains(i)
                        && f.bbox.center_y() > bbox.bottom()
                        && f.bbox.overlaps_horizontally(&bbox)
                        && f.bbox.y - bbox.bottom() <= max_gap
                })
                .min_by(|(_, a), (_, b)| a.bbox.y.partial_cmp(&b.bbox.y).unwrap_or(Ordering::Equal))
                .map(|(i, _)| i);

            match next {
                Some(i) if hits[i].is_none() && !self.owned_by_row_label(i, fragments, hits) => {
                    trace!("Continuing value with '{}'", fragments[i].text);
                    lines.push(i);
                    current = i;
                }
                _ => break,
            }
        }

        lines
    }

    /// Among candidates tied on proximity, take the most confident, then leftmost.
    fn pick_nearest(
        &self,
        candidates: impl Iterator<Item = (usize, f32)>,
        fragments: &[TextFragment],
    ) -> Option<usize> {
        let candidates: Vec<(usize, f32)> = candidates.collect();
        let nearest = candidates
            .iter()
            .map(|(_, gap)| *gap)
            .fold(f32::INFINITY, f32::min);

        candidates
            .into_iter()
            .filter(|(_, gap)| *gap <= nearest + self.config.proximity_tolerance)
            .max_by(|(a, _), (b, _)| {
                let (fa, fb) = (&fragments[*a], &fragments[*b]);
                fa.confidence
                    .partial_cmp(&fb.confidence)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| fb.bbox.x.partial_cmp(&fa.bbox.x).unwrap_or(Ordering::Equal))
            })
            .map(|(i, _)| i)
    }
}
