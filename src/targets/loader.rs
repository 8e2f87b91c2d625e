use crate::targets::{Target, TargetError};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Maximum number of sites accepted in one batch
pub const MAX_TARGETS: usize = 10;

/// Loads and validates the target list from a CSV file
///
/// # Arguments
///
/// * `path` - Path to a CSV file with a `company_name,website_url` header
///
/// # Returns
///
/// * `Ok(Vec<Target>)` - Validated targets in file order
/// * `Err(TargetError)` - File, format, or validation failure
pub fn load_targets(path: &Path) -> Result<Vec<Target>, TargetError> {
    let content = std::fs::read_to_string(path)?;
    parse_targets(&content)
}

/// Parses and validates CSV content into targets
///
/// Validation rules:
/// - header row `company_name,website_url` is required
/// - every row has a non-empty name and a parseable URL
/// - HTTPS only; localhost, loopback, and private addresses are rejected
/// - duplicate seed URLs and duplicate company names are rejected
/// - at most [`MAX_TARGETS`] rows
pub fn parse_targets(content: &str) -> Result<Vec<Target>, TargetError> {
    let mut lines = content.lines().enumerate();

    let (_, header) = lines
        .by_ref()
        .find(|(_, l)| !l.trim().is_empty())
        .ok_or(TargetError::Empty)?;

    let header_cols: Vec<String> = split_row(header)
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    if header_cols != ["company_name", "website_url"] {
        return Err(TargetError::MissingHeader(header.trim().to_string()));
    }

    let mut targets = Vec::new();
    let mut seen = HashSet::new();
    let mut seen_names = HashSet::new();

    for (idx, line) in lines {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let cols = split_row(line);
        if cols.len() != 2 {
            return Err(TargetError::MalformedRow {
                line: line_no,
                message: format!("expected 2 columns, got {}", cols.len()),
            });
        }

        let name = cols[0].trim().to_string();
        let raw_url = cols[1].trim().to_string();

        if name.is_empty() {
            return Err(TargetError::MalformedRow {
                line: line_no,
                message: "company_name is empty".to_string(),
            });
        }

        let seed_url = Url::parse(&raw_url).map_err(|e| TargetError::InvalidUrl {
            url: raw_url.clone(),
            message: e.to_string(),
        })?;

        if seed_url.scheme() != "https" {
            return Err(TargetError::InsecureScheme(raw_url));
        }

        let host = seed_url.host_str().ok_or_else(|| TargetError::InvalidUrl {
            url: raw_url.clone(),
            message: "missing host".to_string(),
        })?;

        if is_local_host(host) {
            return Err(TargetError::LocalAddress(raw_url));
        }

        if !seen.insert(seed_url.as_str().to_string()) {
            return Err(TargetError::Duplicate(raw_url));
        }

        // Reports and progress counters are keyed by name, so names must be
        // unique too.
        if !seen_names.insert(name.clone()) {
            return Err(TargetError::DuplicateName(name));
        }

        targets.push(Target { name, seed_url });
    }

    if targets.is_empty() {
        return Err(TargetError::Empty);
    }

    if targets.len() > MAX_TARGETS {
        return Err(TargetError::TooMany {
            count: targets.len(),
            max: MAX_TARGETS,
        });
    }

    Ok(targets)
}

/// Splits one CSV row, honoring double-quoted fields
///
/// The format is fixed at two columns, so a minimal splitter is enough;
/// quotes are only needed for names containing commas.
fn split_row(line: &str) -> Vec<String> {
    let mut cols = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                cols.push(current.clone());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cols.push(current);
    cols
}

/// Rejects localhost, loopback, and RFC 1918 private hosts
fn is_local_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    if let Ok(addr) = host.parse::<std::net::IpAddr>() {
        return match addr {
            std::net::IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
            std::net::IpAddr::V6(v6) => v6.is_loopback(),
        };
    }

    false
}
