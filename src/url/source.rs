use std::collections::HashSet;
use url::Url;

/// Id used when a locator has no usable segment at all
const UNKNOWN_SOURCE: &str = "unknown";

/// Derives the stable source id of a list locator
///
/// The id is the last non-empty path segment, so trailing slashes and query
/// strings do not change it. Locators that do not parse as URLs fall back to
/// plain `/`-splitting. Excluded locators go through the same derivation, which
/// is what makes exclusion match on `Record::source`.
///
/// # Examples
///
/// ```
/// use doulist_harvester::url::source_id;
///
/// assert_eq!(source_id("https://www.douban.com/doulist/1518184/"), "1518184");
/// assert_eq!(source_id("https://www.douban.com/doulist/1518184?start=25"), "1518184");
/// ```
pub fn source_id(locator: &str) -> String {
    let locator = locator.trim();

    if let Ok(url) = Url::parse(locator) {
        let last_segment = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string);

        if let Some(segment) = last_segment {
            return segment;
        }

        if let Some(host) = url.host_str() {
            return host.to_string();
        }
    }

    locator
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

/// Derives the set of source ids for a list of locators, skipping blank entries
pub fn source_ids<S: AsRef<str>>(locators: &[S]) -> HashSet<String> {
    locators
        .iter()
        .map(AsRef::as_ref)
        .filter(|l| !l.trim().is_empty())
        .map(source_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_ignored() {
        assert_eq!(source_id("https://www.douban.com/doulist/42/"), "42");
        assert_eq!(source_id("https://www.douban.com/doulist/42"), "42");
        assert_eq!(source_id("  https://www.douban.com/doulist/42//  "), "42");
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        assert_eq!(source_id("https://www.douban.com/doulist/42/?start=0#top"), "42");
    }

    #[test]
    fn test_host_only_locator() {
        assert_eq!(source_id("https://example.com/"), "example.com");
    }

    #[test]
    fn test_non_url_locator() {
        assert_eq!(source_id("doulist/42/"), "42");
        assert_eq!(source_id("42"), "42");
        assert_eq!(source_id(""), "unknown");
        assert_eq!(source_id("///"), "unknown");
    }

    #[test]
    fn test_source_ids_skips_blank() {
        let ids = source_ids(&["https://a.com/list/1/", "  ", "https://a.com/list/2"]);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("1"));
        assert!(ids.contains("2"));
    }
}
