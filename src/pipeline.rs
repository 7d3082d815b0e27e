use tracing::info;

use crate::analyzer::{AnalysisResults, FrequencyAnalyzer, FrequencyRanking};
use crate::config::Config;
use crate::error::PipelineResult;
use crate::fetcher::TextFetcher;
use crate::visualizer::{Artifact, ChartKind, FontCheck};

/// Result of one URL-to-chart request.
pub struct Report {
    pub results: AnalysisResults,
    pub artifact: Artifact,
}

/// Fetch, analyze and render, in that order, stopping at the first failure.
pub struct Pipeline {
    fetcher: TextFetcher,
    analyzer: FrequencyAnalyzer,
    fonts: FontCheck,
}

impl Pipeline {
    /// Builds the HTTP client and runs the startup font check.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        let fetcher = TextFetcher::new(&config.user_agent)?;
        let analyzer = FrequencyAnalyzer::new(config.segmenter.build(config.hmm)).with_limit(config.top);
        let fonts = FontCheck::run(config.font_path.as_deref());
        Ok(Self::new(fetcher, analyzer, fonts))
    }

    pub fn new(fetcher: TextFetcher, analyzer: FrequencyAnalyzer, fonts: FontCheck) -> Self {
        Self {
            fetcher,
            analyzer,
            fonts,
        }
    }

    pub fn fonts(&self) -> &FontCheck {
        &self.fonts
    }

    pub fn analyze_url(&self, url: &str) -> PipelineResult<AnalysisResults> {
        let text = self.fetcher.fetch(url)?;
        self.analyzer.analyze_source(url, &text)
    }

    pub fn render(&self, ranking: &FrequencyRanking, chart: ChartKind) -> PipelineResult<Artifact> {
        let artifact = chart.renderer(&self.fonts)?.render(ranking)?;
        info!(chart = chart.label(), bytes = artifact.bytes.len(), "rendered chart");
        Ok(artifact)
    }

    pub fn run(&self, url: &str, chart: ChartKind) -> PipelineResult<Report> {
        // A chart that cannot be drawn fails before the network is touched.
        let renderer = chart.renderer(&self.fonts)?;
        let results = self.analyze_url(url)?;
        let artifact = renderer.render(&results.top_words)?;
        info!(chart = chart.label(), bytes = artifact.bytes.len(), "rendered chart");
        Ok(Report { results, artifact })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::fetcher::DEFAULT_USER_AGENT;
    use crate::segmenter::{JiebaSegmenter, SegmenterKind};
    use crate::test_support::serve_once;
    use crate::visualizer::ArtifactFormat;

    fn pipeline() -> Pipeline {
        Pipeline::new(
            TextFetcher::new(DEFAULT_USER_AGENT).unwrap(),
            FrequencyAnalyzer::new(Box::new(JiebaSegmenter::default())),
            FontCheck::run(None),
        )
    }

    const PAGE: &str = r#"<html><head><title>Economy</title></head><body>
        <p>中国 中国 经济 发展 发展 发展 北京</p>
        <script>var x = "上海 上海 上海 上海";</script>
        </body></html>"#;

    #[test]
    fn page_to_interactive_bar_chart() {
        let (url, _) = serve_once("200 OK", PAGE);
        let report = pipeline().run(&url, ChartKind::InteractiveBar).unwrap();

        let words: Vec<&str> = report.results.top_words.words().collect();
        assert_eq!(words, ["发展", "中国", "经济", "北京"]);
        assert_eq!(report.artifact.format, ArtifactFormat::Html);
        assert_eq!(report.results.source, url);
    }

    #[test]
    fn not_found_aborts_before_rendering() {
        let (url, _) = serve_once("404 Not Found", PAGE);
        let err = pipeline().run(&url, ChartKind::Pie).err().unwrap();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    #[test]
    fn font_less_word_cloud_fails_without_fetching() {
        // nothing listens on the discard port; a fetch attempt would be a Fetch error
        let err = pipeline()
            .run("http://127.0.0.1:9/", ChartKind::WordCloud)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::FontResource { .. }));
    }

    #[test]
    fn configured_top_limits_the_ranking() {
        let config = Config {
            font_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            output_dir: ".".into(),
            segmenter: SegmenterKind::Jieba,
            hmm: true,
            top: 2,
            log_level: "warn",
        };
        let (url, _) = serve_once("200 OK", PAGE);
        let results = Pipeline::from_config(&config).unwrap().analyze_url(&url).unwrap();
        let words: Vec<&str> = results.top_words.words().collect();
        assert_eq!(words, ["发展", "中国"]);
    }

    #[test]
    fn render_reuses_an_existing_ranking() {
        let (url, _) = serve_once("200 OK", PAGE);
        let pipeline = pipeline();
        let results = pipeline.analyze_url(&url).unwrap();
        let artifact = pipeline.render(&results.top_words, ChartKind::Pie).unwrap();
        assert!(String::from_utf8(artifact.bytes).unwrap().contains("发展"));
    }
}
