//! Responsive wrapping for stored reports
//!
//! Reports are laid out at a fixed email width. When the history view embeds
//! one in an iframe it injects a viewport tag and overrides that let the
//! tables shrink, scale images, and disable links.

const RESPONSIVE_HEAD: &str = r#"
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
      body {
        margin: 0;
        padding: 0;
        overflow-x: hidden;
        max-width: 100%;
      }
      table {
        width: 100% !important;
        max-width: 100% !important;
      }
      table[width="700"] {
        width: 100% !important;
        max-width: 700px !important;
      }
      img {
        max-width: 100%;
        height: auto;
      }
      a {
        pointer-events: none;
        cursor: default;
        text-decoration: none;
        color: inherit;
      }
      @media (max-width: 768px) {
        table[width="700"] td {
          padding: 16px !important;
        }
        table td[style*="width:50%"] {
          display: block !important;
          width: 100% !important;
          padding: 0 0 16px 0 !important;
        }
        h2 {
          font-size: 20px !important;
        }
        div[style*="font-size:48px"] {
          font-size: 36px !important;
        }
      }
    </style>"#;

/// Inject the responsive head into a stored report.
///
/// Inserts into an existing `<head>`, else creates one after `<html>`, else
/// prepends one. Empty input stays empty.
pub fn responsive_view(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    if html.contains("<head>") {
        html.replacen("<head>", &format!("<head>{RESPONSIVE_HEAD}"), 1)
    } else if html.contains("<html>") {
        html.replacen("<html>", &format!("<html><head>{RESPONSIVE_HEAD}</head>"), 1)
    } else {
        format!("<head>{RESPONSIVE_HEAD}</head>{html}")
    }
}
