//! URL canonicalization.
//!
//! Two raw events whose URLs canonicalize to the same string are the same
//! event. Canonical form: lower-case scheme and host, no default port, no
//! fragment, no tracking parameters, remaining query pairs sorted, no
//! trailing slash on non-root paths.

use url::Url;

/// Query parameters dropped regardless of configuration (besides `utm_*`).
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "yclid", "igshid", "mc_cid", "mc_eid", "_hsenc",
    "_hsmi", "mkt_tok", "ref", "ref_src", "source",
];

/// Canonicalize an event URL.
///
/// Never fails: text that does not parse as a URL is returned trimmed and
/// without its fragment so it still works as a dedup key.
pub fn canonicalize_url(raw: &str, extra_tracking_params: &[String]) -> String {
    let trimmed = raw.trim();

    let candidate = if trimmed
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."))
    {
        format!("https://{trimmed}")
    } else {
        trimmed.to_string()
    };

    let Ok(mut url) = Url::parse(&candidate) else {
        return strip_fragment(trimmed).to_string();
    };

    url.set_fragment(None);

    if url.query().is_some() {
        let mut kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key, extra_tracking_params))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        kept.sort();

        url.set_query(None);
        if !kept.is_empty() {
            url.query_pairs_mut().extend_pairs(kept);
        }
    }

    // Remove trailing slash for consistency (except root path)
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

fn is_tracking_param(key: &str, extra: &[String]) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_")
        || TRACKING_PARAMS.contains(&key.as_str())
        || extra.iter().any(|p| p.eq_ignore_ascii_case(&key))
}

fn strip_fragment(s: &str) -> &str {
    s.split('#').next().unwrap_or(s)
}
