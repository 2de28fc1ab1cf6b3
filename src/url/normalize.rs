use url::Url;

/// Query parameters that never change which page is served
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Builds the key the frontier uses to recognise repeat requests
///
/// Two links that only differ in ways the site ignores map to the same key:
///
/// 1. The fragment is dropped
/// 2. Tracking parameters (`utm_*`, `fbclid`, `gclid`, ...) are removed
/// 3. Remaining query parameters are sorted by name
/// 4. A trailing slash is removed from non-root paths
///
/// Scheme, host and path case are kept: product slugs on retail sites are
/// frequently case-sensitive.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use shelf_scout::url::dedup_key;
///
/// let a = Url::parse("https://shop.example.com/en/p/123/?utm_source=mail#top").unwrap();
/// let b = Url::parse("https://shop.example.com/en/p/123").unwrap();
/// assert_eq!(dedup_key(&a), dedup_key(&b));
/// ```
pub fn dedup_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);

    if key.query().is_some() {
        let params = filter_and_sort_query_params(url);
        if params.is_empty() {
            key.set_query(None);
        } else {
            key.query_pairs_mut()
                .clear()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    let path = key.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        key.set_path(if trimmed.is_empty() { "/" } else { &trimmed });
    }

    key.to_string()
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
