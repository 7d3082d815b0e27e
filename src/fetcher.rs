use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{Html, Node};
use std::fmt;
use tracing::{debug, info};
use url::Url;

use crate::error::{PipelineError, PipelineResult};

/// Sent with every request; some sites refuse clients without a browser UA.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0";

// CJK ideographs, CJK symbols and punctuation, fullwidth forms.
static NON_CHINESE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\x{4e00}-\x{9fff}\x{3000}-\x{303f}\x{ff00}-\x{ffef}]")
        .expect("static character class is valid")
});

// Elements whose text content is code or inert markup, not page text.
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Page text reduced to Chinese script and whitespace. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedText(String);

impl CleanedText {
    /// Replaces every character outside the Chinese blocks with a space and
    /// trims the result. Returns `None` if nothing is left.
    pub fn from_text(text: &str) -> Option<Self> {
        let filtered = NON_CHINESE.replace_all(text, " ");
        let trimmed = filtered.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CleanedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Downloads pages and turns them into [`CleanedText`].
pub struct TextFetcher {
    client: Client,
}

impl TextFetcher {
    pub fn new(user_agent: &str) -> PipelineResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| PipelineError::fetch("<client>", e))?;
        Ok(Self { client })
    }

    /// One GET, no retries. Non-2xx responses are failures.
    pub fn fetch(&self, url: &str) -> PipelineResult<CleanedText> {
        let parsed = parse_http_url(url)?;

        info!(%url, "fetching page");
        let response = self
            .client
            .get(parsed)
            .send()
            .map_err(|e| PipelineError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::fetch(url, format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .map_err(|e| PipelineError::fetch(url, e))?;
        debug!(bytes = body.len(), %status, "downloaded document");

        let cleaned = clean_markup(url, &body)?;
        info!(chars = cleaned.as_str().chars().count(), "extracted Chinese text");
        Ok(cleaned)
    }
}

fn parse_http_url(url: &str) -> PipelineResult<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| PipelineError::fetch(url, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(PipelineError::fetch(
            url,
            format!("unsupported scheme `{}`", other),
        )),
    }
}

/// Strips markup from `html` and filters what remains to Chinese script.
/// `source` only names the document in the error.
pub fn clean_markup(source: &str, html: &str) -> PipelineResult<CleanedText> {
    let text = extract_text(html);
    CleanedText::from_text(&text).ok_or_else(|| PipelineError::EmptyContent {
        url: source.to_string(),
    })
}

/// All document text nodes joined by single spaces.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::with_capacity(html.len() / 2);

    for node in document.root_element().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(fragment);
    }

    text
}
