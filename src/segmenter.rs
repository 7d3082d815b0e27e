use clap::ValueEnum;
use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use tracing::info;

// Loading the bundled dictionary takes a noticeable moment, so do it once.
static JIEBA: Lazy<Jieba> = Lazy::new(|| {
    info!("loading jieba dictionary");
    Jieba::new()
});

/// Splits unspaced Chinese text into word candidates, in stream order.
pub trait Segmenter {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Dictionary segmentation backed by jieba.
#[derive(Debug, Clone, Copy)]
pub struct JiebaSegmenter {
    hmm: bool,
}

impl JiebaSegmenter {
    /// `hmm` enables the hidden Markov model for words missing from the dictionary.
    pub fn new(hmm: bool) -> Self {
        Self { hmm }
    }
}

impl Default for JiebaSegmenter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Segmenter for JiebaSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        JIEBA
            .cut(text, self.hmm)
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// For text that is already word-separated by whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceSegmenter;

impl Segmenter for WhitespaceSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SegmenterKind {
    Jieba,
    Whitespace,
}

impl SegmenterKind {
    pub fn build(self, hmm: bool) -> Box<dyn Segmenter> {
        match self {
            SegmenterKind::Jieba => Box::new(JiebaSegmenter::new(hmm)),
            SegmenterKind::Whitespace => Box::new(WhitespaceSegmenter),
        }
    }
}
