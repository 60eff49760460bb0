//! HTML report assembly
//!
//! The same document is rasterized to PDF, emailed as the message body, and
//! stored for the history view, so it is written for the lowest common
//! denominator: table layout, inline styles only, no scripts, images by URL.
//!
//! Rendering is a pure function of its inputs. The same [`AuditResult`] and
//! [`ReportOptions`] always produce byte-identical HTML.

use crate::chart::ChartUrls;
use crate::domain::display_domain;
use crate::model::{AuditResult, Blocker, Priority};

/// Site-specific values baked into every report
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Absolute URL of the logo image
    pub logo_url: String,
    /// Call-to-action link at the bottom of the report
    pub cta_url: String,
    /// Base URL of the chart-rendering service
    pub chart_base_url: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            logo_url: "http://localhost:3000/BOW-Big.png".to_string(),
            cta_url: "https://pagesense.co/templates".to_string(),
            chart_base_url: "https://quickchart.io/chart".to_string(),
        }
    }
}

/// A rendered report
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub html: String,
    /// Display domain used in the title (and the email subject)
    pub domain: String,
    /// Rounded overall score, persisted alongside the HTML
    pub score: u8,
    pub charts: ChartUrls,
}

/// Render the full report document for `url`
pub fn render_report(url: &str, result: &AuditResult, options: &ReportOptions) -> Report {
    let domain = display_domain(url);
    let charts = ChartUrls::new(&options.chart_base_url, result.overall_score, &result.category_scores);
    let score_label = result.score_label();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>PageSense Audit for {domain}</title>
</head>
<body style="margin:0; padding:0; background:#f9f9f9; color:#222; font-family:Arial,sans-serif;">
  <table width="100%" cellpadding="0" cellspacing="0" border="0" style="background:#f9f9f9;">
    <tr>
      <td align="center">
        <table width="700" cellpadding="0" cellspacing="0" border="0" style="background:#fff; margin:40px 0; border-radius:8px; box-shadow:0 2px 8px #eee;">
          <tr>
            <td style="padding:32px 24px 16px 24px; text-align:left;">
              <img src="{logo_url}" alt="Logo" width="32" height="32" style="vertical-align:middle; margin-right:12px;">
              <span style="font-size:28px; font-weight:bold; color:#393028;">PageSense Audit for {domain}</span>
            </td>
          </tr>
          <tr>
            <td style="padding:0 24px 24px 24px;">
              <table width="100%" cellpadding="0" cellspacing="0" border="0">
                <tr>
                  <td style="width:50%; text-align:center; vertical-align:middle;">
                    <div style="font-size:14px; color:#777; text-transform:uppercase; letter-spacing:1px;">Overall Score</div>
                    <div style="font-size:48px; font-weight:bold; color:#393028;">{score_label}</div>
                    <img src="{donut_url}" alt="Overall score chart" width="200" height="200" style="display:block; margin:8px auto 0 auto;">
                  </td>
                  <td style="width:50%; text-align:center; vertical-align:middle;">
                    <img src="{polar_url}" alt="Category scores chart" width="260" height="260" style="display:block; margin:0 auto;">
                  </td>
                </tr>
              </table>
{category_rows}
              <h2 style="font-size:20px; color:#393028; border-bottom:1px solid #eee; padding-bottom:8px; margin-top:24px;">Conversion Blockers</h2>
{blockers}
              <h2 style="font-size:20px; color:#393028; border-bottom:1px solid #eee; padding-bottom:8px; margin-top:24px;">Recommendations</h2>
{recommendations}
              <div style="margin-top:32px; text-align:center;">
                <a href="{cta_url}" style="display:inline-block; color:#393028; padding:12px 24px; border-radius:4px; text-decoration:none; font-weight:bold;">Explore Our High Conversion Templates &rarr;</a>
              </div>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>
"#,
        domain = escape_html(&domain),
        logo_url = escape_html(&options.logo_url),
        score_label = score_label,
        donut_url = escape_html(&charts.donut),
        polar_url = escape_html(&charts.polar),
        category_rows = format_category_scores(result),
        blockers = format_blockers(result),
        recommendations = format_recommendations(&result.recommendations),
        cta_url = escape_html(&options.cta_url),
    );

    Report {
        html,
        domain,
        score: result.rounded_score(),
        charts,
    }
}

/// Text fallback for the polar chart, for clients that block remote images
fn format_category_scores(result: &AuditResult) -> String {
    let cells: String = result
        .category_scores
        .iter()
        .map(|(category, score)| {
            format!(
                r#"                  <td style="text-align:center; padding:8px; border:1px solid #eee;"><div style="font-size:12px; color:#777;">{}</div><div style="font-size:20px; font-weight:bold; color:#393028;">{}</div></td>
"#,
                category.label(),
                score.round() as i64
            )
        })
        .collect();

    format!(
        r#"              <table width="100%" cellpadding="0" cellspacing="0" border="0" style="margin-top:16px; border-collapse:collapse;">
                <tr>
{cells}                </tr>
              </table>"#
    )
}

/// Blockers grouped by priority, most severe first, one styled block per group
pub fn format_blockers(result: &AuditResult) -> String {
    let groups = result.blockers_by_priority();
    if groups.is_empty() {
        return r#"              <p style="color:#555;">No conversion blockers found.</p>"#.to_string();
    }

    groups
        .into_iter()
        .map(|(priority, blockers)| format_priority_group(priority, &blockers))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_priority_group(priority: Priority, blockers: &[&Blocker]) -> String {
    let cards: String = blockers.iter().map(|b| format_blocker(priority, b)).collect();

    format!(
        r#"              <div data-priority="{name}" style="margin-top:16px;">
                <h3 style="font-size:16px; color:{accent}; margin:0 0 8px 0;">{name} Priority ({count})</h3>
{cards}              </div>"#,
        name = priority.as_str(),
        accent = priority.accent_color(),
        count = blockers.len(),
        cards = cards,
    )
}

fn format_blocker(priority: Priority, blocker: &Blocker) -> String {
    let suggestions: String = blocker
        .suggestions
        .iter()
        .map(|s| format!("                    <li style=\"margin-bottom:4px;\">{}</li>\n", escape_html(s)))
        .collect();

    format!(
        r#"                <div style="background:{bg}; border-left:4px solid {accent}; padding:12px; border-radius:4px; margin-bottom:12px;">
                  <div><b>Issue:</b> {issue} <span style="font-size:12px; color:#777;">({category})</span></div>
                  <div style="margin-top:8px;"><b>Suggestions:</b></div>
                  <ol style="margin:4px 0 0 0; padding-left:20px;">
{suggestions}                  </ol>
                </div>
"#,
        bg = priority.background_color(),
        accent = priority.accent_color(),
        issue = escape_html(&blocker.issue),
        category = blocker.category.label(),
        suggestions = suggestions,
    )
}

/// Recommendations as a bullet list
pub fn format_recommendations(recommendations: &[String]) -> String {
    if recommendations.is_empty() {
        return r#"              <p style="color:#555;">No additional recommendations.</p>"#.to_string();
    }

    let items: String = recommendations
        .iter()
        .map(|r| format!("                <li style=\"margin-bottom:8px;\">{}</li>\n", escape_html(r)))
        .collect();

    format!(
        r#"              <ul style="padding-left:20px; color:#222;">
{items}              </ul>"#
    )
}

/// Escape text for safe inclusion in HTML content and attribute values
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
