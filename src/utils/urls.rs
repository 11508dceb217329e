//! URL normalization and domain extraction.

use url::Url;

/// Tracking query parameters stripped during normalization.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
    "si",
];

/// Normalize a URL for cache keying and cross-user matching.
///
/// Lowercases the host, strips the fragment, tracking parameters, a
/// leading `www.`, and any trailing slash. Invalid URLs pass through
/// trimmed so they still key consistently.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        let stripped = lowered.strip_prefix("www.").unwrap_or(&lowered).to_string();
        let _ = url.set_host(Some(&stripped));
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        let query = kept
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }

    let mut out = url.to_string();
    if out.ends_with('/') && url.path() == "/" {
        out.pop();
    }
    out
}

/// Extract the registrable domain portion of a URL (host without `www.`).
pub fn domain_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_tracking() {
        assert_eq!(
            normalize_url("https://Example.com/a?utm_source=x&id=2#frag"),
            "https://example.com/a?id=2"
        );
    }

    #[test]
    fn test_normalize_strips_www_and_trailing_slash() {
        assert_eq!(normalize_url("https://www.example.com/"), "https://example.com");
    }

    #[test]
    fn test_normalize_same_key_for_variants() {
        let a = normalize_url("https://www.example.com/post?fbclid=abc");
        let b = normalize_url("https://example.com/post");
        assert_eq!(a, b);
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(
            domain_of("https://www.youtube.com/watch?v=1"),
            Some("youtube.com".to_string())
        );
        assert_eq!(domain_of("not a url"), None);
    }
}
