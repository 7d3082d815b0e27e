use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::fetcher::CleanedText;
use crate::segmenter::Segmenter;

/// How many words a ranking keeps.
pub const TOP_N: usize = 20;

static IDEOGRAPHS_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\x{4e00}-\x{9fff}]+$").expect("static character class is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Top words ordered by count, ties in first-seen order.
///
/// Always holds between 1 and [`TOP_N`] entries with unique words and
/// non-increasing counts; both the constructor and deserialization enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WordCount>", into = "Vec<WordCount>")]
pub struct FrequencyRanking {
    entries: Vec<WordCount>,
}

impl FrequencyRanking {
    pub fn new(entries: Vec<WordCount>) -> PipelineResult<Self> {
        if entries.is_empty() {
            return Err(PipelineError::NoTokens);
        }
        if entries.len() > TOP_N {
            return Err(PipelineError::InvalidRanking(format!(
                "{} entries, at most {} allowed",
                entries.len(),
                TOP_N
            )));
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.count == 0 {
                return Err(PipelineError::InvalidRanking(format!(
                    "`{}` has a zero count",
                    entry.word
                )));
            }
            if !seen.insert(entry.word.as_str()) {
                return Err(PipelineError::InvalidRanking(format!(
                    "`{}` appears twice",
                    entry.word
                )));
            }
        }
        if entries.windows(2).any(|pair| pair[0].count < pair[1].count) {
            return Err(PipelineError::InvalidRanking(
                "counts are not in descending order".to_string(),
            ));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[WordCount] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.word.as_str())
    }

    pub fn counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|e| e.count)
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.word == word).map(|e| e.count)
    }

    /// Sum of all counts in the ranking.
    pub fn total(&self) -> usize {
        self.counts().sum()
    }

    pub fn max_count(&self) -> usize {
        // Entries are sorted and never empty.
        self.entries[0].count
    }

    pub fn min_count(&self) -> usize {
        self.entries[self.entries.len() - 1].count
    }

    /// Each word's share of the ranking total, in ranking order.
    pub fn shares(&self) -> Vec<(&str, f64)> {
        let total = self.total() as f64;
        self.entries
            .iter()
            .map(|e| (e.word.as_str(), e.count as f64 / total))
            .collect()
    }
}

impl TryFrom<Vec<WordCount>> for FrequencyRanking {
    type Error = PipelineError;

    fn try_from(entries: Vec<WordCount>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<FrequencyRanking> for Vec<WordCount> {
    fn from(ranking: FrequencyRanking) -> Self {
        ranking.entries
    }
}

/// Ranking plus the numbers shown alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub source: String,
    pub analyzed_at: DateTime<Utc>,
    /// Tokens that passed both filters, repeats included.
    pub total_words: usize,
    pub unique_words: usize,
    pub top_words: FrequencyRanking,
}

pub struct FrequencyAnalyzer {
    segmenter: Box<dyn Segmenter>,
    limit: usize,
}

impl FrequencyAnalyzer {
    pub fn new(segmenter: Box<dyn Segmenter>) -> Self {
        Self {
            segmenter,
            limit: TOP_N,
        }
    }

    /// Keep fewer than [`TOP_N`] words. Values above it are clamped.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, TOP_N);
        self
    }

    pub fn analyze(&self, text: &CleanedText) -> PipelineResult<FrequencyRanking> {
        self.analyze_source("<text>", text).map(|r| r.top_words)
    }

    pub fn analyze_source(&self, source: &str, text: &CleanedText) -> PipelineResult<AnalysisResults> {
        if text.as_str().trim().is_empty() {
            return Err(PipelineError::NoTokens);
        }

        let tokens = self.tokenize(text.as_str());
        let unique_words = tokens.iter().collect::<HashSet<_>>().len();
        let top_words = rank(&tokens, self.limit)?;
        debug!(
            total = tokens.len(),
            unique = unique_words,
            kept = top_words.len(),
            "ranked tokens"
        );

        Ok(AnalysisResults {
            source: source.to_string(),
            analyzed_at: Utc::now(),
            total_words: tokens.len(),
            unique_words,
            top_words,
        })
    }

    /// Segments `text` and keeps only multi-character, all-ideograph words.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let raw = self.segmenter.segment(text);
        let candidates = raw.len();

        let tokens: Vec<String> = raw
            .into_iter()
            .filter(|token| is_chinese_word(token))
            .collect();
        debug!(candidates, kept = tokens.len(), "filtered segmentation");
        tokens
    }
}

/// All ideographs and longer than one character.
pub fn is_chinese_word(token: &str) -> bool {
    IDEOGRAPHS_ONLY.is_match(token) && token.chars().count() > 1
}

/// Counts `tokens` and keeps the `limit` most frequent.
///
/// Ties keep the order in which words first appeared in `tokens`.
pub fn rank(tokens: &[String], limit: usize) -> PipelineResult<FrequencyRanking> {
    // word -> (count, index of first occurrence)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, token) in tokens.iter().enumerate() {
        counts.entry(token.as_str()).or_insert((0, index)).0 += 1;
    }

    let mut sorted: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    sorted.truncate(limit);

    FrequencyRanking::new(
        sorted
            .into_iter()
            .map(|(word, (count, _))| WordCount {
                word: word.to_string(),
                count,
            })
            .collect(),
    )
}
