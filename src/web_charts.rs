//! Browser-side charts.
//!
//! These emit a standalone HTML page and leave drawing (and the glyphs) to
//! the browser, so unlike the raster charts they never need a local font.

use minijinja::{context, Environment};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tracing::debug;

use crate::analyzer::FrequencyRanking;
use crate::error::{PipelineError, PipelineResult};
use crate::visualizer::{Artifact, ArtifactFormat, Renderer};

const PLOTLY_SRC: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const ECHARTS_SRC: &str = "https://cdn.jsdelivr.net/npm/echarts@5.5.1/dist/echarts.min.js";

const PLOTLY_PAGE: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<script src="{{ script_src | safe }}"></script>
</head>
<body>
<div id="chart" style="width:{{ width }}px;height:{{ height }}px;"></div>
<script>
Plotly.newPlot("chart", {{ data | safe }}, {{ layout | safe }}, {responsive: true});
</script>
</body>
</html>
"#;

const ECHARTS_PAGE: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<script src="{{ script_src | safe }}"></script>
</head>
<body>
<div id="chart" style="width:{{ width }}px;height:{{ height }}px;"></div>
<script>
var chart = echarts.init(document.getElementById("chart"));
chart.setOption({{ option | safe }});
</script>
</body>
</html>
"#;

// `.html` names switch on HTML auto-escaping for everything not marked safe.
static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_template("plotly.html", PLOTLY_PAGE)
        .expect("built-in plotly template parses");
    env.add_template("echarts.html", ECHARTS_PAGE)
        .expect("built-in echarts template parses");
    env
});

fn render_page(chart: &'static str, template: &str, ctx: minijinja::Value) -> PipelineResult<Artifact> {
    let page = TEMPLATES
        .get_template(template)
        .and_then(|t| t.render(ctx))
        .map_err(|e| PipelineError::render(chart, e))?;
    debug!(chart, bytes = page.len(), "rendered html");

    Ok(Artifact {
        format: ArtifactFormat::Html,
        bytes: page.into_bytes(),
    })
}

/// Hoverable bar chart drawn by Plotly.js.
pub struct InteractiveBarChart {
    title: String,
    size: (u32, u32),
}

impl Default for InteractiveBarChart {
    fn default() -> Self {
        Self {
            title: "Top 20 Words Frequency".to_string(),
            size: (900, 600),
        }
    }
}

impl InteractiveBarChart {
    fn traces(&self, ranking: &FrequencyRanking) -> Value {
        json!([{
            "type": "bar",
            "x": ranking.words().collect::<Vec<_>>(),
            "y": ranking.counts().collect::<Vec<_>>(),
            "hovertemplate": "%{x}: %{y}<extra></extra>",
        }])
    }

    fn layout(&self) -> Value {
        json!({
            "title": { "text": self.title },
            "xaxis": { "title": { "text": "Words" }, "tickangle": -45 },
            "yaxis": { "title": { "text": "Frequency" } },
        })
    }
}

impl Renderer for InteractiveBarChart {
    fn name(&self) -> &'static str {
        "interactive bar chart"
    }

    fn render(&self, ranking: &FrequencyRanking) -> PipelineResult<Artifact> {
        render_page(
            self.name(),
            "plotly.html",
            context! {
                title => self.title.as_str(),
                script_src => PLOTLY_SRC,
                width => self.size.0,
                height => self.size.1,
                data => self.traces(ranking).to_string(),
                layout => self.layout().to_string(),
            },
        )
    }
}

/// Pie chart drawn by ECharts; each slice is count / ranking total.
pub struct PieChart {
    title: String,
    size: (u32, u32),
}

impl Default for PieChart {
    fn default() -> Self {
        Self {
            title: "Top 20 Words Distribution".to_string(),
            size: (800, 600),
        }
    }
}

impl PieChart {
    fn option(&self, ranking: &FrequencyRanking) -> Value {
        let data: Vec<Value> = ranking
            .entries()
            .iter()
            .map(|e| json!({ "name": e.word, "value": e.count }))
            .collect();

        json!({
            "title": { "text": self.title },
            "tooltip": { "trigger": "item", "formatter": "{b}: {c} ({d}%)" },
            "legend": { "type": "scroll", "orient": "vertical", "left": "left", "top": 40 },
            "series": [{
                "type": "pie",
                "radius": "60%",
                "center": ["55%", "55%"],
                "data": data,
            }],
        })
    }
}

impl Renderer for PieChart {
    fn name(&self) -> &'static str {
        "pie chart"
    }

    fn render(&self, ranking: &FrequencyRanking) -> PipelineResult<Artifact> {
        render_page(
            self.name(),
            "echarts.html",
            context! {
                title => self.title.as_str(),
                script_src => ECHARTS_SRC,
                width => self.size.0,
                height => self.size.1,
                option => self.option(ranking).to_string(),
            },
        )
    }
}
