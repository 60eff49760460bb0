//! Chart-image URLs
//!
//! Charts are not drawn locally. Each chart is a Chart.js configuration,
//! serialized to compact JSON and URL-encoded into the `c` query parameter of
//! a chart-rendering service (QuickChart-compatible). The report embeds the
//! resulting URLs as `<img>` sources.

use serde_json::{json, Value};

use crate::model::{Category, CategoryScores};

pub const DONUT_SIZE: (u32, u32) = (300, 300);
pub const POLAR_SIZE: (u32, u32) = (400, 400);

const SCORE_COLOR: &str = "#393028";
const REMAINDER_COLOR: &str = "#eeeeee";
const CATEGORY_COLORS: [&str; 4] = [
    "rgba(57, 48, 40, 0.8)",
    "rgba(52, 152, 219, 0.7)",
    "rgba(230, 126, 34, 0.7)",
    "rgba(39, 174, 96, 0.7)",
];

/// Both chart images for one report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartUrls {
    pub donut: String,
    pub polar: String,
}

impl ChartUrls {
    pub fn new(base_url: &str, overall_score: f64, scores: &CategoryScores) -> Self {
        Self {
            donut: donut_chart_url(base_url, overall_score),
            polar: polar_chart_url(base_url, scores),
        }
    }
}

/// Overall-score donut: the score against the remainder out of 100
pub fn donut_chart_url(base_url: &str, overall_score: f64) -> String {
    let score = overall_score.round().clamp(0.0, 100.0);
    let spec = json!({
        "type": "doughnut",
        "data": {
            "datasets": [{
                "data": [score, 100.0 - score],
                "backgroundColor": [SCORE_COLOR, REMAINDER_COLOR],
                "borderWidth": 0
            }]
        },
        "options": {
            "cutoutPercentage": 75,
            "legend": { "display": false },
            "plugins": {
                "datalabels": { "display": false },
                "doughnutlabel": {
                    "labels": [
                        { "text": format!("{}", score as u8), "font": { "size": 48 } },
                        { "text": "/100" }
                    ]
                }
            }
        }
    });
    encode(base_url, &spec, DONUT_SIZE)
}

/// Per-category polar-area chart, categories in fixed order
pub fn polar_chart_url(base_url: &str, scores: &CategoryScores) -> String {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
    let data: Vec<f64> = scores.iter().map(|(_, s)| s.round()).collect();
    let spec = json!({
        "type": "polarArea",
        "data": {
            "labels": labels,
            "datasets": [{
                "data": data,
                "backgroundColor": CATEGORY_COLORS
            }]
        },
        "options": {
            "scale": { "ticks": { "min": 0, "max": 100, "stepSize": 25 } },
            "legend": { "position": "bottom" }
        }
    });
    encode(base_url, &spec, POLAR_SIZE)
}

fn encode(base_url: &str, spec: &Value, (width, height): (u32, u32)) -> String {
    format!(
        "{}?c={}&w={}&h={}&bkg=white",
        base_url.trim_end_matches('?'),
        urlencoding::encode(&spec.to_string()),
        width,
        height
    )
}
