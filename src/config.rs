//! Command-line options shared by every subcommand and the validated
//! [`Config`] built from them.
//!
//! Each option can also come from the environment:
//!
//! - `ZH_WORDFREQ_FONT` - CJK-capable TTF/OTF/TTC used by the PNG charts
//! - `ZH_WORDFREQ_USER_AGENT` - User-Agent header for page requests
//! - `ZH_WORDFREQ_OUTPUT_DIR` - where charts are written (default: `.`)
//! - `ZH_WORDFREQ_TOP` - ranking size, 1 to 20 (default: 20)
//! - `RUST_LOG` - overrides the log filter chosen by `-v`

use anyhow::{bail, Result};
use clap::builder::TypedValueParser;
use clap::Args;
use std::path::PathBuf;

use crate::analyzer::TOP_N;
use crate::fetcher::DEFAULT_USER_AGENT;
use crate::segmenter::SegmenterKind;

#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Font file able to render Chinese glyphs (word cloud and static bar chart)
    #[arg(long, global = true, env = "ZH_WORDFREQ_FONT")]
    pub font: Option<PathBuf>,

    /// User-Agent header sent with the page request
    #[arg(long, global = true, env = "ZH_WORDFREQ_USER_AGENT", default_value = DEFAULT_USER_AGENT, hide_default_value = true)]
    pub user_agent: String,

    /// Directory charts are written to when no explicit output is given
    #[arg(long, global = true, env = "ZH_WORDFREQ_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Word segmentation strategy
    #[arg(long, global = true, value_enum, default_value = "jieba")]
    pub segmenter: SegmenterKind,

    /// How many of the most frequent words to rank and chart (1-20)
    #[arg(
        long,
        global = true,
        env = "ZH_WORDFREQ_TOP",
        default_value_t = TOP_N,
        value_parser = clap::value_parser!(u16).range(1..=TOP_N as i64).map(usize::from)
    )]
    pub top: usize,

    /// Disable jieba's HMM guessing of words missing from the dictionary
    #[arg(long, global = true)]
    pub no_hmm: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub font_path: Option<PathBuf>,
    pub user_agent: String,
    pub output_dir: PathBuf,
    pub segmenter: SegmenterKind,
    pub hmm: bool,
    pub top: usize,
    pub log_level: &'static str,
}

impl Config {
    pub fn from_opts(opts: &GlobalOpts) -> Result<Self> {
        let user_agent = opts.user_agent.trim();
        if user_agent.is_empty() {
            bail!("--user-agent must not be empty");
        }
        if opts.output_dir.is_file() {
            bail!(
                "--output-dir {} is a file, not a directory",
                opts.output_dir.display()
            );
        }

        let log_level = match opts.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        Ok(Self {
            font_path: opts.font.clone(),
            user_agent: user_agent.to_string(),
            output_dir: opts.output_dir.clone(),
            segmenter: opts.segmenter,
            hmm: !opts.no_hmm,
            top: opts.top,
            log_level,
        })
    }
}
