/// Checks if a host matches an allowed-domain pattern
///
/// Two pattern shapes are supported:
/// 1. Exact host: "www.example.com" matches only that host
/// 2. Wildcard: "*.example.com" matches "example.com" and any subdomain of it
///
/// Comparison ignores ASCII case, so patterns may be written as they appear in
/// the site's links.
///
/// # Examples
///
/// ```
/// use shelf_scout::url::matches_wildcard;
///
/// assert!(matches_wildcard("www.example.com", "www.example.com"));
/// assert!(!matches_wildcard("www.example.com", "example.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "img.cdn.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            if host.eq_ignore_ascii_case(base) {
                return true;
            }
            // Subdomain: host must end with ".{base}"
            let (host, base) = (host.as_bytes(), base.as_bytes());
            host.len() > base.len()
                && host[host.len() - base.len() - 1] == b'.'
                && host[host.len() - base.len()..].eq_ignore_ascii_case(base)
        }
        None => host.eq_ignore_ascii_case(pattern),
    }
}
