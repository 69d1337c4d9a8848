use crate::UrlError;
use url::Url;

/// Removes every leading `www.` label from a lowercase host
///
/// A label is only dropped when something host-like remains, so `www.com`
/// is left alone and `www.www.example.com` becomes `example.com`.
pub(crate) fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        if !rest.contains('.') {
            break;
        }
        host = rest;
    }
    host
}

/// Extracts the normalized domain from a URL
///
/// The host is lowercased and a leading `www.` label is removed, the same
/// rule the normalizer applies. Ports are not part of the domain.
///
/// # Arguments
///
/// * `url` - The URL to extract the domain from
///
/// # Returns
///
/// * `Some(String)` - The normalized host
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tidewater::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://sub.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(strip_www(&host).to_string())
}

/// Extracts the normalized domain from a URL string
///
/// Scheme-less input such as `example.com/page` is read as an HTTPS URL.
pub fn parse_domain(url_str: &str) -> Option<String> {
    let url_str = url_str.trim();
    let parsed = match Url::parse(url_str) {
        Ok(url) if url.has_host() => url,
        _ => Url::parse(&format!("https://{}", url_str)).ok()?,
    };
    extract_domain(&parsed)
}

/// Returns true if both URLs have the same normalized host
pub fn is_same_domain(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Canonicalizes an operator-supplied domain name
///
/// Accepts a bare host (`Example.com`), a host with `www.`, a trailing dot,
/// or a full URL, and returns the registry form: lowercase, no `www.`, no
/// scheme, port or path.
///
/// # Examples
///
/// ```
/// use tidewater::url::canonicalize_domain;
///
/// assert_eq!(canonicalize_domain("https://www.Example.com/about").unwrap(), "example.com");
/// assert_eq!(canonicalize_domain("example.com.").unwrap(), "example.com");
/// ```
pub fn canonicalize_domain(input: &str) -> Result<String, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let domain = parse_domain(trimmed).ok_or(UrlError::MissingDomain)?;
    let domain = domain.trim_end_matches('.');

    if domain.is_empty() || (!domain.contains('.') && domain != "localhost") {
        return Err(UrlError::Malformed(format!(
            "'{}' is not a valid domain name",
            input
        )));
    }

    Ok(domain.to_string())
}
