//! URL handling module for Shelf-Scout
//!
//! This module provides link resolution against the rendered page, the dedup
//! key used by the frontier, host extraction, and the wildcard matching behind
//! the offsite filter.

mod matcher;
mod normalize;

use ::url::{ParseError, Url};

// Re-export main functions
pub use matcher::matches_wildcard;
pub use normalize::dedup_key;

/// Extracts the lowercase host from a URL
///
/// Returns `None` for URLs without a host (e.g. `data:` URIs).
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Resolves an `href` found on a page into an absolute URL
///
/// An `href` that already carries a scheme is used as-is; anything else is
/// joined onto `base`, which should be the page's final (post-redirect) URL.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use shelf_scout::url::resolve_link;
///
/// let base = Url::parse("https://shop.example.com/en/beverages").unwrap();
/// let link = resolve_link("/en/beverages/juice", &base).unwrap();
/// assert_eq!(link.as_str(), "https://shop.example.com/en/beverages/juice");
/// ```
pub fn resolve_link(href: &str, base: &Url) -> Result<Url, ParseError> {
    let href = href.trim();
    match Url::parse(href) {
        Ok(absolute) => Ok(absolute),
        Err(ParseError::RelativeUrlWithoutBase) => base.join(href),
        Err(e) => Err(e),
    }
}

/// Checks whether a URL's host is covered by the allowed-domain patterns
///
/// An empty pattern list allows every host.
pub fn is_allowed_host(url: &Url, allowed_domains: &[String]) -> bool {
    if allowed_domains.is_empty() {
        return true;
    }

    match extract_domain(url) {
        Some(host) => allowed_domains
            .iter()
            .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &host)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.example.com/en/fresh-food").unwrap()
    }

    #[test]
    fn test_resolve_absolute_link_untouched() {
        let link = resolve_link("https://cdn.example.com/p/1", &base()).unwrap();
        assert_eq!(link.as_str(), "https://cdn.example.com/p/1");
    }

    #[test]
    fn test_resolve_root_relative_link() {
        let link = resolve_link("/en/bakery", &base()).unwrap();
        assert_eq!(link.as_str(), "https://www.example.com/en/bakery");
    }

    #[test]
    fn test_resolve_path_relative_link() {
        let link = resolve_link("bread-1234", &base()).unwrap();
        assert_eq!(link.as_str(), "https://www.example.com/en/bread-1234");
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        let link = resolve_link("  /en/bakery \n", &base()).unwrap();
        assert_eq!(link.as_str(), "https://www.example.com/en/bakery");
    }

    #[test]
    fn test_resolve_protocol_relative_link() {
        let link = resolve_link("//img.example.com/a.png", &base()).unwrap();
        assert_eq!(link.as_str(), "https://img.example.com/a.png");
    }

    #[test]
    fn test_extract_domain_lowercases() {
        let url = Url::parse("https://WWW.Example.COM:8443/en").unwrap();
        assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
    }

    #[test]
    fn test_allowed_host_empty_list_allows_all() {
        let url = Url::parse("https://anything.test/").unwrap();
        assert!(is_allowed_host(&url, &[]));
    }

    #[test]
    fn test_allowed_host_exact_and_wildcard() {
        let allowed = vec!["www.example.com".to_string(), "*.cdn.example.com".to_string()];

        let on_site = Url::parse("https://WWW.example.com/en").unwrap();
        let cdn = Url::parse("https://img.cdn.example.com/x").unwrap();
        let offsite = Url::parse("https://tracker.ads.test/pixel").unwrap();

        assert!(is_allowed_host(&on_site, &allowed));
        assert!(is_allowed_host(&cdn, &allowed));
        assert!(!is_allowed_host(&offsite, &allowed));
    }

    #[test]
    fn test_allowed_host_localhost() {
        let allowed = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        let url = Url::parse("http://127.0.0.1:8080/en").unwrap();
        assert!(is_allowed_host(&url, &allowed));
    }
}
