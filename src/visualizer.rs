use clap::ValueEnum;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::analyzer::FrequencyRanking;
use crate::error::{PipelineError, PipelineResult};
use crate::web_charts::{InteractiveBarChart, PieChart};

/// Family name the configured font is registered under with plotters.
const FONT_FAMILY: &str = "zh-wordfreq-cjk";

type DrawResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Png,
    Html,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Png => "png",
            ArtifactFormat::Html => "html",
        }
    }
}

/// A finished chart, ready to be written out or served.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub format: ArtifactFormat,
    pub bytes: Vec<u8>,
}

/// Turns a ranking into something displayable.
pub trait Renderer {
    fn name(&self) -> &'static str;

    fn render(&self, ranking: &FrequencyRanking) -> PipelineResult<Artifact>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartKind {
    WordCloud,
    InteractiveBar,
    StaticBar,
    Pie,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::WordCloud,
        ChartKind::InteractiveBar,
        ChartKind::StaticBar,
        ChartKind::Pie,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::WordCloud => "Word Cloud",
            ChartKind::InteractiveBar => "Bar Chart (interactive)",
            ChartKind::StaticBar => "Bar Chart (static)",
            ChartKind::Pie => "Pie Chart",
        }
    }

    /// Raster charts draw glyphs themselves and need the CJK font.
    pub fn requires_font(self) -> bool {
        matches!(self, ChartKind::WordCloud | ChartKind::StaticBar)
    }

    pub fn renderer(self, fonts: &FontCheck) -> PipelineResult<Box<dyn Renderer>> {
        Ok(match self {
            ChartKind::WordCloud => Box::new(WordCloud::new(fonts.resource()?.clone())),
            ChartKind::InteractiveBar => Box::new(InteractiveBarChart::default()),
            ChartKind::StaticBar => Box::new(StaticBarChart::new(fonts.resource()?.clone())),
            ChartKind::Pie => Box::new(PieChart::default()),
        })
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A font file that parsed and is registered with the plotters text backend.
#[derive(Debug, Clone)]
pub struct FontResource {
    path: PathBuf,
}

impl FontResource {
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let font_error = |reason: String| PipelineError::FontResource {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = fs::read(path).map_err(|e| font_error(e.to_string()))?;
        // plotters keeps registered fonts for the life of the process
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes)
            .map_err(|_| font_error("not a TrueType/OpenType font".to_string()))?;

        info!(path = %path.display(), "registered CJK font");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn style(&self, size: f64) -> TextStyle<'static> {
        TextStyle::from(FontDesc::new(
            FontFamily::Name(FONT_FAMILY),
            size,
            FontStyle::Normal,
        ))
    }
}

/// Outcome of the startup font check.
///
/// Kept around so a raster chart requested later fails with the original
/// reason instead of a rendering error halfway through drawing.
#[derive(Debug)]
pub enum FontCheck {
    Ready(FontResource),
    Unavailable { path: PathBuf, reason: String },
}

impl FontCheck {
    pub fn run(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return FontCheck::Unavailable {
                path: PathBuf::from("<unset>"),
                reason: "no CJK font configured (use --font)".to_string(),
            };
        };

        match FontResource::load(path) {
            Ok(font) => FontCheck::Ready(font),
            Err(e) => {
                warn!(error = %e, "CJK font unavailable; raster charts disabled");
                let reason = match e {
                    PipelineError::FontResource { reason, .. } => reason,
                    other => other.to_string(),
                };
                FontCheck::Unavailable {
                    path: path.to_path_buf(),
                    reason,
                }
            }
        }
    }

    pub fn resource(&self) -> PipelineResult<&FontResource> {
        match self {
            FontCheck::Ready(font) => Ok(font),
            FontCheck::Unavailable { path, reason } => Err(PipelineError::FontResource {
                path: path.clone(),
                reason: reason.clone(),
            }),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, FontCheck::Ready(_))
    }
}

/// Draws into an in-memory RGB buffer and encodes it as PNG.
fn render_png<F>(chart: &'static str, size: (u32, u32), draw: F) -> PipelineResult<Artifact>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult,
{
    let (width, height) = size;
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| PipelineError::render(chart, e))?;
        draw(&root).map_err(|e| PipelineError::render(chart, e))?;
        root.present()
            .map_err(|e| PipelineError::render(chart, e))?;
    }

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(&buffer, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| PipelineError::render(chart, e))?;
    debug!(chart, bytes = bytes.len(), "encoded png");

    Ok(Artifact {
        format: ArtifactFormat::Png,
        bytes,
    })
}

/// A stable colour per word, spread over the hue circle.
fn word_color(word: &str) -> HSLColor {
    let hue = (word.chars().fold(0u32, |acc, c| acc.wrapping_add(c as u32)) % 360) as f64 / 360.0;
    HSLColor(hue, 0.7, 0.42)
}

pub struct StaticBarChart {
    font: FontResource,
    size: (u32, u32),
}

impl StaticBarChart {
    pub fn new(font: FontResource) -> Self {
        Self {
            font,
            size: (1000, 600),
        }
    }

    fn draw(&self, root: &DrawingArea<BitMapBackend<'_>, Shift>, ranking: &FrequencyRanking) -> DrawResult {
        let entries = ranking.entries();
        let max_count = ranking.max_count();
        let bar_color = RGBColor(42, 100, 246);

        let mut chart = ChartBuilder::on(root)
            .caption(
                "Top 20 Words Frequency",
                self.font.style(32.0).color(&RGBColor(30, 30, 85)),
            )
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 110)
            .build_cartesian_2d(
                (0..entries.len()).into_segmented(),
                0..max_count + max_count / 5 + 1,
            )?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(RGBColor(240, 240, 245))
            .bold_line_style(RGBColor(220, 220, 230))
            .x_desc("Words")
            .y_desc("Frequency")
            .label_style(self.font.style(14.0))
            .axis_desc_style(self.font.style(18.0))
            .x_labels(entries.len())
            .x_label_formatter(&|x| match x {
                SegmentValue::CenterOf(i) => entries
                    .get(*i)
                    .map(|e| e.word.clone())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .x_label_style(
                self.font
                    .style(16.0)
                    .transform(FontTransform::Rotate90)
                    .color(&RGBColor(30, 30, 80)),
            )
            .y_label_style(self.font.style(14.0))
            .draw()?;

        chart.draw_series(entries.iter().enumerate().map(|(i, entry)| {
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0),
                    (SegmentValue::Exact(i + 1), entry.count),
                ],
                bar_color.mix(0.9).filled(),
            );
            bar.set_margin(0, 0, 6, 6);
            bar
        }))?;

        // count above each bar
        chart.draw_series(entries.iter().enumerate().map(|(i, entry)| {
            Text::new(
                entry.count.to_string(),
                (SegmentValue::CenterOf(i), entry.count + max_count / 30 + 1),
                self.font.style(14.0).color(&RGBColor(50, 50, 100)),
            )
        }))?;

        let generated = chrono::Local::now().format("%Y-%m-%d").to_string();
        let (width, height) = root.dim_in_pixel();
        root.draw(&Text::new(
            format!("Generated: {}", generated),
            (width as i32 - 160, height as i32 - 24),
            self.font.style(12.0).color(&RGBColor(150, 150, 170)),
        ))?;

        Ok(())
    }
}

impl Renderer for StaticBarChart {
    fn name(&self) -> &'static str {
        "static bar chart"
    }

    fn render(&self, ranking: &FrequencyRanking) -> PipelineResult<Artifact> {
        render_png(self.name(), self.size, |root| self.draw(root, ranking))
    }
}

/// Places rectangles along an Archimedean spiral out from the canvas centre.
#[derive(Debug)]
pub struct SpiralLayout {
    width: i32,
    height: i32,
    padding: i32,
    placed: Vec<(i32, i32, i32, i32)>,
}

impl SpiralLayout {
    const STEP: f64 = 0.1;
    const MAX_STEPS: usize = 20_000;

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            padding: 2,
            placed: Vec::new(),
        }
    }

    /// Top-left corner for a `w` x `h` box, or `None` if it no longer fits.
    pub fn place(&mut self, w: u32, h: u32) -> Option<(i32, i32)> {
        let (w, h) = (w as i32, h as i32);
        if w > self.width || h > self.height {
            return None;
        }

        let (cx, cy) = (self.width as f64 / 2.0, self.height as f64 / 2.0);
        // flatten the spiral to the canvas aspect ratio
        let aspect = self.height as f64 / self.width as f64;

        for step in 0..Self::MAX_STEPS {
            let theta = step as f64 * Self::STEP;
            let radius = 2.0 * theta;
            let x = (cx + radius * theta.cos()) as i32 - w / 2;
            let y = (cy + radius * aspect * theta.sin()) as i32 - h / 2;

            if x < 0 || y < 0 || x + w > self.width || y + h > self.height {
                continue;
            }
            let candidate = (x, y, x + w, y + h);
            if self.placed.iter().any(|r| self.overlaps(*r, candidate)) {
                continue;
            }
            self.placed.push(candidate);
            return Some((x, y));
        }
        None
    }

    fn overlaps(&self, a: (i32, i32, i32, i32), b: (i32, i32, i32, i32)) -> bool {
        let p = self.padding;
        a.0 < b.2 + p && b.0 < a.2 + p && a.1 < b.3 + p && b.1 < a.3 + p
    }
}

pub struct WordCloud {
    font: FontResource,
    size: (u32, u32),
    min_font: f64,
    max_font: f64,
}

impl WordCloud {
    pub fn new(font: FontResource) -> Self {
        Self {
            font,
            size: (800, 400),
            min_font: 16.0,
            max_font: 80.0,
        }
    }

    /// Proportional to count, the top word at `max_font`, floored at `min_font`.
    fn font_size(&self, count: usize, max: usize) -> f64 {
        let scaled = self.max_font * count as f64 / max.max(1) as f64;
        scaled.max(self.min_font)
    }

    /// Draws the words and returns how many found a place.
    fn draw(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        ranking: &FrequencyRanking,
    ) -> Result<usize, Box<dyn Error>> {
        let (width, height) = root.dim_in_pixel();
        let mut layout = SpiralLayout::new(width, height);
        let max = ranking.max_count();
        let mut placed = 0;

        for entry in ranking.entries() {
            let color = word_color(&entry.word);
            let mut size = self.font_size(entry.count, max);
            loop {
                let style = self.font.style(size).color(&color);
                let (w, h) = root.estimate_text_size(&entry.word, &style)?;
                if let Some(pos) = layout.place(w, h) {
                    root.draw(&Text::new(entry.word.as_str(), pos, style))?;
                    placed += 1;
                    break;
                }
                if size <= self.min_font / 2.0 {
                    warn!(word = %entry.word, "no room left in word cloud");
                    break;
                }
                size *= 0.8;
            }
        }

        Ok(placed)
    }
}

impl Renderer for WordCloud {
    fn name(&self) -> &'static str {
        "word cloud"
    }

    fn render(&self, ranking: &FrequencyRanking) -> PipelineResult<Artifact> {
        render_png(self.name(), self.size, |root| {
            let placed = self.draw(root, ranking)?;
            debug!(placed, words = ranking.len(), "word cloud laid out");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::rank;
    use std::io::Write;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    // Latin-only TrueType font; CJK glyphs fall back to its notdef box,
    // which is enough to exercise layout and encoding.
    const FIXTURE_FONT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/DejaVuSansMono.ttf");

    fn fixture_font() -> FontResource {
        FontResource::load(Path::new(FIXTURE_FONT)).unwrap()
    }

    fn full_ranking() -> FrequencyRanking {
        let words = [
            "发展", "中国", "经济", "北京", "上海", "改革", "开放", "科技", "创新", "人民",
            "政府", "市场", "企业", "社会", "文化", "教育", "世界", "国际", "合作", "未来",
        ];
        let tokens: Vec<String> = words
            .iter()
            .enumerate()
            .flat_map(|(i, w)| std::iter::repeat(w.to_string()).take(words.len() - i))
            .collect();
        rank(&tokens, 20).unwrap()
    }

    fn sample_ranking() -> FrequencyRanking {
        let tokens: Vec<String> = ["发展", "发展", "发展", "中国", "中国", "经济", "北京"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        rank(&tokens, 20).unwrap()
    }

    #[test]
    fn missing_font_path_is_a_font_resource_error() {
        let err = FontResource::load(Path::new("/definitely/not/here/simhei.ttf")).unwrap_err();
        assert!(matches!(err, PipelineError::FontResource { .. }));
    }

    #[test]
    fn garbage_font_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a font").unwrap();
        let err = FontResource::load(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::FontResource { .. }));
    }

    #[test]
    fn raster_charts_refuse_to_build_without_font() {
        let fonts = FontCheck::run(None);
        assert!(!fonts.is_ready());
        for kind in ChartKind::ALL {
            let result = kind.renderer(&fonts);
            if kind.requires_font() {
                assert!(matches!(result, Err(PipelineError::FontResource { .. })));
            } else {
                assert!(result.is_ok());
            }
        }
    }

    #[test]
    fn startup_check_keeps_the_failure_reason() {
        let fonts = FontCheck::run(Some(Path::new("/nope/font.ttf")));
        match fonts.resource() {
            Err(PipelineError::FontResource { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nope/font.ttf"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn chart_labels_match_the_selection_list() {
        let labels: Vec<&str> = ChartKind::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(
            labels,
            ["Word Cloud", "Bar Chart (interactive)", "Bar Chart (static)", "Pie Chart"]
        );
    }

    #[test]
    fn spiral_layout_never_overlaps() {
        let mut layout = SpiralLayout::new(800, 400);
        let mut boxes = Vec::new();
        for i in 0..20u32 {
            let (w, h) = (40 + (i % 5) * 30, 20 + (i % 3) * 15);
            let (x, y) = layout.place(w, h).expect("20 small boxes fit");
            assert!(x >= 0 && y >= 0);
            assert!(x + w as i32 <= 800 && y + h as i32 <= 400);
            boxes.push((x, y, x + w as i32, y + h as i32));
        }
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                let disjoint = a.2 <= b.0 || b.2 <= a.0 || a.3 <= b.1 || b.3 <= a.1;
                assert!(disjoint, "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn first_box_lands_in_the_centre() {
        let mut layout = SpiralLayout::new(800, 400);
        assert_eq!(layout.place(100, 50), Some((350, 175)));
    }

    #[test]
    fn oversized_box_is_not_placed() {
        let mut layout = SpiralLayout::new(100, 100);
        assert_eq!(layout.place(200, 10), None);
    }

    #[test]
    fn word_size_is_proportional_to_count() {
        let cloud = WordCloud::new(fixture_font());
        assert_eq!(cloud.font_size(20, 20), 80.0);
        assert_eq!(cloud.font_size(10, 20), 40.0);
        assert_eq!(cloud.font_size(1, 2), 40.0);
        assert_eq!(cloud.font_size(1, 20), 16.0);
    }

    #[test]
    fn word_cloud_places_every_ranked_word() {
        let ranking = full_ranking();
        assert_eq!(ranking.len(), 20);
        let cloud = WordCloud::new(fixture_font());

        let mut placed = 0;
        let artifact = render_png("word cloud", cloud.size, |root| {
            placed = cloud.draw(root, &ranking)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(placed, ranking.len());
        assert_eq!(artifact.bytes[..8], PNG_MAGIC);
    }

    #[test]
    fn raster_charts_produce_png_of_the_declared_size() {
        let font = fixture_font();
        for (renderer, size) in [
            (Box::new(WordCloud::new(font.clone())) as Box<dyn Renderer>, (800, 400)),
            (Box::new(StaticBarChart::new(font)), (1000, 600)),
        ] {
            let artifact = renderer.render(&sample_ranking()).unwrap();
            assert_eq!(artifact.format, ArtifactFormat::Png);
            assert_eq!(artifact.bytes[..8], PNG_MAGIC);

            let decoded = image::load_from_memory(&artifact.bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), size);
        }
    }

    #[test]
    fn raster_charts_build_once_the_font_check_passes() {
        let fonts = FontCheck::run(Some(Path::new(FIXTURE_FONT)));
        assert!(fonts.is_ready());
        for kind in ChartKind::ALL {
            let artifact = kind.renderer(&fonts).unwrap().render(&full_ranking()).unwrap();
            assert!(!artifact.bytes.is_empty());
        }
    }
}
