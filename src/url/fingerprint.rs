use sha2::{Digest, Sha256};

/// Computes the content-addressed identity of a normalized URL
///
/// The fingerprint is the hex-encoded SHA-256 of the URL string exactly as
/// given; callers must normalize first so that equivalent links collide.
/// It is the frontier's only dedup key: two records never share one.
///
/// # Examples
///
/// ```
/// use tidewater::url::fingerprint;
///
/// let a = fingerprint("https://example.com/about");
/// assert_eq!(a, fingerprint("https://example.com/about"));
/// assert_eq!(a.len(), 64);
/// ```
pub fn fingerprint(normalized_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_url.as_bytes());
    hex::encode(hasher.finalize())
}
