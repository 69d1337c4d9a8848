use crate::url::domain::strip_www;
use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// File extensions that make a dotted relative href a path, not a host
const FILE_EXTENSIONS: &[&str] = &[
    "html", "htm", "xhtml", "shtml", "php", "asp", "aspx", "jsp", "cgi", "pl", "pdf", "jpg",
    "jpeg", "png", "gif", "svg", "webp", "ico", "css", "js", "json", "xml", "rss", "atom", "txt",
    "md", "csv", "zip", "gz", "tar", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "mp3", "mp4",
    "avi", "mov",
];

/// Normalizes an absolute URL into its canonical frontier form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP or HTTPS (the scheme itself is kept)
/// 3. Lowercase the host and remove a leading `www.` label
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and empty segments
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove tracking query parameters and sort the rest by key
/// 7. Remove empty query string (trailing ?)
///
/// The output is a fixed point: normalizing an already normalized URL
/// returns it unchanged.
///
/// # Examples
///
/// ```
/// use tidewater::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Example.com/a#frag").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/a");
///
/// let url = normalize_url("http://example.com/a").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(url)
}

/// Resolves an href found on a page and normalizes it
///
/// Handles everything `<a href>` can carry:
///
/// - absolute `http(s)://` links
/// - protocol-relative (`//host/path`), root-relative and path-relative
///   links, resolved against `base`
/// - bare domain references such as `example.com/x`, which are taken as
///   domain-rooted (using the base's scheme) rather than path-relative
///
/// `javascript:`, `mailto:`, `tel:`, `data:` and any other non-HTTP scheme is
/// rejected, as are empty and fragment-only hrefs. Callers treat every error
/// as "skip this link".
///
/// # Examples
///
/// ```
/// use tidewater::url::normalize_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/blog/post").unwrap();
/// assert_eq!(normalize_link("../about", &base).unwrap().as_str(), "https://example.com/about");
/// assert_eq!(normalize_link("other.org/x", &base).unwrap().as_str(), "https://other.org/x");
/// assert!(normalize_link("mailto:me@example.com", &base).is_err());
/// ```
pub fn normalize_link(href: &str, base: &Url) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    if href.starts_with('#') {
        return Err(UrlError::Malformed("fragment-only link".to_string()));
    }

    if let Some(scheme) = explicit_scheme(href) {
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(UrlError::InvalidScheme(scheme));
        }
        return normalize_url(href);
    }

    if looks_like_bare_domain(href) {
        return normalize_url(&format!("{}://{}", base.scheme(), href));
    }

    let resolved = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    canonicalize(resolved)
}

/// Applies the normalization rules to an already parsed URL
fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    let normalized_host = strip_www(&host).to_string();
    if normalized_host != host {
        url.set_host(Some(&normalized_host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Returns the scheme of an href that carries one
///
/// A prefix containing a dot is treated as a host (`example.com:8080/x`),
/// not a scheme.
fn explicit_scheme(href: &str) -> Option<&str> {
    let colon = href.find(':')?;
    let candidate = &href[..colon];

    let mut chars = candidate.chars();
    let starts_alpha = chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);
    let scheme_chars = candidate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-');

    if starts_alpha && scheme_chars {
        Some(candidate)
    } else {
        None
    }
}

/// Decides whether a scheme-less href names a host rather than a path
///
/// The first segment must contain a dot, consist of host characters and end
/// in an alphabetic label that is not a common file extension, so
/// `example.com/x` qualifies while `page.html` and `v1.2/notes` do not.
fn looks_like_bare_domain(href: &str) -> bool {
    if href.starts_with('/') || href.starts_with('.') || href.starts_with('?') {
        return false;
    }

    let first_segment = href
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("");
    let host = match first_segment.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            host
        }
        _ => first_segment,
    };

    if !host.contains('.') {
        return false;
    }

    let labels: Vec<&str> = host.split('.').collect();
    let well_formed = labels.iter().all(|label| {
        !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !well_formed {
        return false;
    }

    let tld = labels.last().map(|l| l.to_ascii_lowercase()).unwrap_or_default();
    tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
        && !FILE_EXTENSIONS.contains(&tld.as_str())
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
