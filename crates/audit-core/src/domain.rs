//! Display-domain derivation
//!
//! The report title and the email subject both name the audited site by its
//! host. Input is user-supplied, so this never fails: anything that does not
//! parse as a URL with a host falls back to simple string trimming.

use url::Url;

/// Derive the display name for an audited URL.
///
/// Returns the hostname when `input` parses as a URL with a host. Otherwise
/// strips a leading `http://` or `https://` and truncates at the first `/`.
pub fn display_domain(input: &str) -> String {
    if let Ok(parsed) = Url::parse(input) {
        if let Some(host) = parsed.host_str() {
            if !host.is_empty() {
                return host.to_string();
            }
        }
    }

    let stripped = input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"))
        .unwrap_or(input);

    stripped.split('/').next().unwrap_or_default().to_string()
}
