//! Warnings returned by the Cloud Controller

use http::HeaderMap;

/// Header the Cloud Controller uses to report non-fatal warnings
pub const WARNINGS_HEADER: &str = "X-Cf-Warnings";

/// Warnings collected from a single API call, in server order
pub type Warnings = Vec<String>;

/// Decode the warnings header of a response.
///
/// The header holds a comma separated list of query-escaped strings and may
/// be repeated.
pub fn parse_warnings(headers: &HeaderMap) -> Warnings {
    headers
        .get_all(WARNINGS_HEADER)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|raw| unescape(raw.trim()))
        .filter(|warning| !warning.is_empty())
        .collect()
}

/// Query-unescape a single warning. `&` and `=` are kept as they are.
fn unescape(raw: &str) -> String {
    raw.split('&').map(decode_component).collect::<Vec<_>>().join("&")
}

fn decode_component(component: &str) -> String {
    // Behind a fixed key the whole component is the value, `=` included.
    url::form_urlencoded::parse(format!("w={}", component).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}
