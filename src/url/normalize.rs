use crate::UrlError;
use url::Url;

/// Query parameters stripped during normalization: pure tracking noise that
/// would otherwise make identical pages look distinct.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Normalizes a URL into its canonical fetch form
///
/// Steps:
/// 1. Parse; only `http` and `https` schemes are accepted.
/// 2. Lowercase the host and strip a leading `www.`.
/// 3. Collapse dot segments and duplicate slashes in the path; strip the
///    trailing slash except for the root.
/// 4. Drop the fragment.
/// 5. Drop tracking query parameters (`utm_*` and [`TRACKING_PARAMS`]) and
///    sort the survivors so parameter order never defeats deduplication.
///
/// # Examples
///
/// ```
/// use sitescope::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Example.COM/pricing/?b=2&a=1#plans").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/pricing?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?;
    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Collapses dot segments and duplicate slashes; trailing slash is removed
/// except for the root path.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
