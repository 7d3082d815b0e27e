use std::path::PathBuf;

use thiserror::Error;

/// Every way a single URL-to-chart request can fail.
///
/// None of these are fatal to the process; the interactive loop reports
/// them and waits for the next URL.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("{url} did not contain any extractable Chinese text")]
    EmptyContent { url: String },

    #[error("segmentation produced no usable vocabulary")]
    NoTokens,

    #[error("invalid ranking: {0}")]
    InvalidRanking(String),

    #[error("font resource {} is unusable: {reason}", path.display())]
    FontResource { path: PathBuf, reason: String },

    #[error("failed to render {chart}: {reason}")]
    Render { chart: &'static str, reason: String },
}

impl PipelineError {
    pub(crate) fn fetch(url: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn render(chart: &'static str, reason: impl ToString) -> Self {
        Self::Render {
            chart,
            reason: reason.to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
