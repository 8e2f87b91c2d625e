use url::Url;

/// Extracts the lowercase host of a URL
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Tests whether a candidate URL belongs to the seed's site
///
/// A candidate is in scope when its host equals the seed domain or is a
/// subdomain of it. The seed domain is compared after `www.` stripping, so
/// `www.example.com` seeds accept `example.com` links and vice versa.
pub fn in_scope(candidate: &Url, seed_domain: &str) -> bool {
    let seed = seed_domain
        .strip_prefix("www.")
        .unwrap_or(seed_domain)
        .to_lowercase();

    let Some(host) = extract_domain(candidate) else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(&host);

    host == seed || host.ends_with(&format!(".{}", seed))
}
