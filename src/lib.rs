//! Fetch a web page, keep its Chinese text, rank the most frequent words and
//! chart them.
//!
//! The request path is [`fetcher`] -> [`analyzer`] -> [`visualizer`], wired
//! together by [`pipeline::Pipeline`]. Each stage returns a
//! [`error::PipelineError`] on failure and nothing downstream runs.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod pipeline;
pub mod segmenter;
pub mod utils;
pub mod visualizer;
pub mod web_charts;

#[cfg(test)]
mod test_support;
