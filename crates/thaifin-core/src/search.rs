//! Bilingual symbol and company-name search.
//!
//! The index is derived from a listing snapshot and rebuilt wholesale; it has
//! no incremental insert. A query containing any Thai code point is matched
//! against Thai names, anything else against English names and symbols.
//!
//! Similarity: `strsim::normalized_levenshtein` over whole strings, and over
//! the best query-sized window of a longer name (weighted by `partial_weight`).
//! Latin text is case- and diacritic-folded before comparison.

use std::collections::HashMap;

use serde::Serialize;
use strsim::normalized_levenshtein;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::SearchSettings;
use crate::SecurityIdentity;

/// Score of an exact symbol match.
pub const EXACT_SCORE: f64 = 1.0;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub identity: SecurityIdentity,
    /// Similarity in `0.0..=1.0`; exact symbol matches score [`EXACT_SCORE`].
    pub score: f64,
}

/// Script of a query, chosen by a code-point range test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScript {
    Thai,
    Latin,
}

impl QueryScript {
    pub fn detect(query: &str) -> Self {
        if query.chars().any(is_thai) {
            Self::Thai
        } else {
            Self::Latin
        }
    }
}

/// Thai block, U+0E00..=U+0E7F.
pub fn is_thai(ch: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&ch)
}

/// Lowercases, strips combining marks after NFKD and collapses whitespace.
pub fn fold_latin(input: &str) -> String {
    let folded: String = input
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect();
    collapse_whitespace(&folded)
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Best similarity between `needle` and any `needle`-sized window of `haystack`.
fn partial_similarity(needle: &str, haystack: &str) -> f64 {
    let needle_len = needle.chars().count();
    let haystack: Vec<char> = haystack.chars().collect();
    if needle_len == 0 || haystack.len() <= needle_len {
        return 0.0;
    }

    let mut best: f64 = 0.0;
    for window in haystack.windows(needle_len) {
        let window: String = window.iter().collect();
        best = best.max(normalized_levenshtein(needle, &window));
        if best >= 1.0 {
            break;
        }
    }
    best
}

#[derive(Debug, Clone)]
struct IndexEntry {
    identity: SecurityIdentity,
    symbol: String,
    english: String,
    thai: String,
}

#[derive(Debug, Clone, Default)]
enum IndexState {
    #[default]
    Empty,
    Built {
        entries: Vec<IndexEntry>,
        by_symbol: HashMap<String, usize>,
    },
}

/// In-memory search index over security identities.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    state: IndexState,
    settings: SearchSettings,
}

impl SearchIndex {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            state: IndexState::Empty,
            settings,
        }
    }

    /// Builds an index in one step.
    pub fn from_identities(
        identities: impl IntoIterator<Item = SecurityIdentity>,
        settings: SearchSettings,
    ) -> Self {
        let mut index = Self::new(settings);
        index.build(identities);
        index
    }

    /// Replaces the whole index. The first identity wins on duplicate symbols.
    pub fn build(&mut self, identities: impl IntoIterator<Item = SecurityIdentity>) {
        let mut entries = Vec::new();
        let mut by_symbol = HashMap::new();

        for identity in identities {
            let symbol = fold_latin(identity.symbol.as_str());
            if by_symbol.contains_key(&symbol) {
                continue;
            }
            by_symbol.insert(symbol.clone(), entries.len());
            entries.push(IndexEntry {
                english: fold_latin(&identity.english_name),
                thai: collapse_whitespace(&identity.thai_name.nfc().collect::<String>()),
                symbol,
                identity,
            });
        }

        tracing::debug!(entries = entries.len(), "search index built");
        self.state = IndexState::Built { entries, by_symbol };
    }

    pub fn is_built(&self) -> bool {
        matches!(self.state, IndexState::Built { .. })
    }

    pub fn len(&self) -> usize {
        match &self.state {
            IndexState::Empty => 0,
            IndexState::Built { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Identity with exactly this symbol, ignoring case.
    pub fn get(&self, symbol: &str) -> Option<&SecurityIdentity> {
        let IndexState::Built { entries, by_symbol } = &self.state else {
            return None;
        };
        by_symbol
            .get(&fold_latin(symbol))
            .map(|position| &entries[*position].identity)
    }

    /// Ranked candidates for `query`, at most `limit` of them.
    ///
    /// An exact symbol match comes first with [`EXACT_SCORE`]; remaining slots
    /// are filled with fuzzy matches at or above the similarity floor, by
    /// descending score then symbol. No match yields an empty vector.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let IndexState::Built { entries, by_symbol } = &self.state else {
            return Vec::new();
        };
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let exact = by_symbol.get(&fold_latin(query)).copied();
        let script = QueryScript::detect(query);
        let needle = match script {
            QueryScript::Thai => collapse_whitespace(&query.nfc().collect::<String>()),
            QueryScript::Latin => fold_latin(query),
        };

        let mut hits: Vec<(usize, f64)> = entries
            .iter()
            .enumerate()
            .filter(|(position, _)| Some(*position) != exact)
            .filter_map(|(position, entry)| {
                let score = self.score(script, &needle, entry);
                (score >= self.settings.min_similarity).then_some((position, score))
            })
            .collect();
        hits.sort_by(|(a_pos, a_score), (b_pos, b_score)| {
            b_score
                .total_cmp(a_score)
                .then_with(|| entries[*a_pos].identity.symbol.cmp(&entries[*b_pos].identity.symbol))
        });

        exact
            .map(|position| (position, EXACT_SCORE))
            .into_iter()
            .chain(hits)
            .take(limit)
            .map(|(position, score)| SearchHit {
                identity: entries[position].identity.clone(),
                score,
            })
            .collect()
    }

    fn score(&self, script: QueryScript, needle: &str, entry: &IndexEntry) -> f64 {
        match script {
            QueryScript::Thai => self.name_similarity(needle, &entry.thai),
            QueryScript::Latin => self
                .name_similarity(needle, &entry.english)
                .max(normalized_levenshtein(needle, &entry.symbol)),
        }
    }

    fn name_similarity(&self, needle: &str, name: &str) -> f64 {
        if name.is_empty() {
            return 0.0;
        }
        let whole = normalized_levenshtein(needle, name);
        let partial = partial_similarity(needle, name) * self.settings.partial_weight;
        whole.max(partial)
    }
}
