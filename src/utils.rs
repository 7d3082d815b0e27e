use anyhow::{Context, Result};
use colored::*;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use url::Url;

use crate::analyzer::AnalysisResults;
use crate::visualizer::{Artifact, ChartKind};

pub fn export_to_json<T: serde::Serialize>(data: &T, path: &Path) -> Result<()> {
    let file = File::create(path).context("Failed to create output JSON file")?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, data)
        .context("Failed to serialize data to JSON")
}

pub fn import_from_json(path: &Path) -> Result<AnalysisResults> {
    let file = File::open(path).context("Failed to open JSON file")?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader)
        .context("Failed to deserialize analysis results from JSON")
}

pub fn write_artifact(artifact: &Artifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// `<output_dir>/<host>-<chart>.<ext>`, e.g. `./news.sina.com.cn-pie.html`.
pub fn default_output_path(output_dir: &Path, source: &str, chart: ChartKind, artifact: &Artifact) -> PathBuf {
    let stem = Url::parse(source)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| host_stem(&host))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "ranking".to_string());
    let chart = match chart {
        ChartKind::WordCloud => "wordcloud",
        ChartKind::InteractiveBar => "bar",
        ChartKind::StaticBar => "bar-static",
        ChartKind::Pie => "pie",
    };
    output_dir.join(format!("{}-{}.{}", stem, chart, artifact.format.extension()))
}

/// File stem for a URL host. IPv6 literals (`[::1]`) are the only hosts
/// with characters that do not belong in a file name.
fn host_stem(host: &str) -> String {
    host.trim_matches(|c| c == '[' || c == ']')
        .replace(':', "_")
}

pub fn print_ranking(results: &AnalysisResults) {
    println!("\n{}", "=== Chinese Word Frequency ===".bold().green());
    println!("Source: {}", results.source);
    println!("Words counted: {}", results.total_words);
    println!("Unique words: {}", results.unique_words);

    let ranking = &results.top_words;
    let shares = ranking.shares();
    let width = ranking.max_count().to_string().len();

    println!("\n{}", format!("Top {} words:", ranking.len()).bold());
    for (i, (entry, (_, share))) in ranking.entries().iter().zip(shares).enumerate() {
        println!(
            "  {:>2}. {}  {:>width$}  {}",
            i + 1,
            entry.word.cyan(),
            entry.count,
            format!("{:5.1}%", share * 100.0).dimmed(),
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rank;
    use crate::visualizer::ArtifactFormat;
    use chrono::Utc;

    fn results() -> AnalysisResults {
        let tokens: Vec<String> = ["北京", "北京", "上海"].iter().map(|s| s.to_string()).collect();
        AnalysisResults {
            source: "https://news.example.cn/a/b".to_string(),
            analyzed_at: Utc::now(),
            total_words: 3,
            unique_words: 2,
            top_words: rank(&tokens, 20).unwrap(),
        }
    }

    #[test]
    fn json_export_round_trips_through_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranking.json");
        let original = results();

        export_to_json(&original, &path).unwrap();
        let imported = import_from_json(&path).unwrap();

        assert_eq!(imported.top_words, original.top_words);
        assert_eq!(imported.source, original.source);
    }

    #[test]
    fn import_rejects_tampered_rankings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranking.json");
        fs::write(
            &path,
            r#"{"source":"x","analyzed_at":"2024-01-01T00:00:00Z","total_words":2,"unique_words":2,
               "top_words":[{"word":"北京","count":1},{"word":"上海","count":5}]}"#,
        )
        .unwrap();

        assert!(import_from_json(&path).is_err());
    }

    #[test]
    fn output_path_uses_host_and_chart() {
        let artifact = Artifact {
            format: ArtifactFormat::Html,
            bytes: Vec::new(),
        };
        let path = default_output_path(Path::new("out"), "https://news.example.cn/a/b", ChartKind::Pie, &artifact);
        assert_eq!(path, Path::new("out").join("news.example.cn-pie.html"));

        let path = default_output_path(Path::new("."), "ranking.json", ChartKind::StaticBar, &Artifact {
            format: ArtifactFormat::Png,
            bytes: Vec::new(),
        });
        assert_eq!(path, Path::new(".").join("ranking-bar-static.png"));
    }

    #[test]
    fn artifact_is_written_with_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chart.html");
        let artifact = Artifact {
            format: ArtifactFormat::Html,
            bytes: b"<html></html>".to_vec(),
        };
        write_artifact(&artifact, &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), artifact.bytes);
    }

    #[test]
    fn ipv6_host_becomes_a_plain_stem() {
        let artifact = Artifact {
            format: ArtifactFormat::Png,
            bytes: Vec::new(),
        };
        let path = default_output_path(Path::new("out"), "http://[::1]:8080/news", ChartKind::WordCloud, &artifact);
        assert_eq!(path, Path::new("out").join("__1-wordcloud.png"));
        assert_eq!(host_stem("news.sina.com.cn"), "news.sina.com.cn");
    }
}
