use crate::UrlError;
use url::Url;

/// Query parameter carrying the pagination offset
const START_PARAM: &str = "start";

/// Parses a list locator, accepting only HTTP(S)
pub fn parse_locator(locator: &str) -> Result<Url, UrlError> {
    let url = Url::parse(locator.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Builds the locator of the first page to fetch for a source
///
/// The pagination offset is `start_page - 1`. Any `start` parameter already
/// present on the source locator is replaced; other query parameters are kept
/// in order.
///
/// # Examples
///
/// ```
/// use doulist_harvester::url::page_locator;
///
/// let url = page_locator("https://www.douban.com/doulist/42/", 1).unwrap();
/// assert_eq!(url, "https://www.douban.com/doulist/42/?start=0");
/// ```
pub fn page_locator(source: &str, start_page: u32) -> Result<String, UrlError> {
    let mut url = parse_locator(source)?;
    let offset = start_page.saturating_sub(1);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != START_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.set_query(None);
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        pairs.append_pair(START_PARAM, &offset.to_string());
    }

    Ok(url.to_string())
}

/// Resolves a pagination href against the page it was found on
///
/// Returns None for empty, fragment-only, or non-HTTP(S) links.
pub fn resolve_link(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    let resolved = match Url::parse(base_url) {
        Ok(base) => base.join(href).ok()?,
        Err(_) => Url::parse(href).ok()?,
    };

    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved.to_string())
    } else {
        None
    }
}
