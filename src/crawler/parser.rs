//! HTML extraction of list records
//!
//! This module turns one list page into:
//! - The ordered records shown on that page
//! - The locator of the next page, if the paginator has one

use crate::record::Record;
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};

/// Records found on one page plus the pagination link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Records in on-page order, not yet tagged with a source
    pub records: Vec<Record>,

    /// Absolute locator of the next page; None on the last page
    pub next: Option<String>,
}

/// Turns raw page content into records
pub trait RecordExtractor: Send + Sync {
    /// Extracts records and the next-page locator
    ///
    /// # Arguments
    ///
    /// * `content` - Raw page content
    /// * `page_url` - Locator the content was fetched from, for resolving links
    fn extract(&self, content: &str, page_url: &str) -> ExtractedPage;
}

/// Extractor for Douban doulist pages
///
/// # Extraction Rules
///
/// - Each `.doulist-item` with both a `.title a` and an `.abstract` is a record;
///   items missing either are skipped
/// - Title is the link text, link is its `href`
/// - Abstract lines are matched by prefix: `导演:`, `主演:`, `类型:`,
///   `制片国家/地区:`, `年份:`
/// - The next page is `.paginator .next a[href]`
#[derive(Debug, Clone, Copy, Default)]
pub struct DoulistExtractor;

const DIRECTOR_PREFIX: &str = "导演:";
const CAST_PREFIX: &str = "主演:";
const GENRE_PREFIX: &str = "类型:";
const COUNTRY_PREFIX: &str = "制片国家/地区:";
const YEAR_PREFIX: &str = "年份:";

impl RecordExtractor for DoulistExtractor {
    fn extract(&self, content: &str, page_url: &str) -> ExtractedPage {
        let document = Html::parse_document(content);

        ExtractedPage {
            records: extract_records(&document),
            next: extract_next(&document, page_url),
        }
    }
}

fn extract_records(document: &Html) -> Vec<Record> {
    let (Ok(item_selector), Ok(title_selector), Ok(abstract_selector)) = (
        Selector::parse(".doulist-item"),
        Selector::parse(".title a"),
        Selector::parse(".abstract"),
    ) else {
        return Vec::new();
    };

    let mut records = Vec::new();

    for item in document.select(&item_selector) {
        let (Some(title_link), Some(abstract_el)) = (
            item.select(&title_selector).next(),
            item.select(&abstract_selector).next(),
        ) else {
            continue;
        };

        let mut record = Record::new(
            stripped_text(&title_link),
            title_link.value().attr("href").unwrap_or_default().trim(),
            "",
        );

        for line in abstract_el.text().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(value) = line.strip_prefix(DIRECTOR_PREFIX) {
                record.director = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix(CAST_PREFIX) {
                record.cast = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix(GENRE_PREFIX) {
                record.genre = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix(COUNTRY_PREFIX) {
                record.country = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix(YEAR_PREFIX) {
                record.year = value.trim().to_string();
            }
        }

        records.push(record);
    }

    records
}

fn extract_next(document: &Html, page_url: &str) -> Option<String> {
    let selector = Selector::parse(".paginator .next a").ok()?;
    let href = document.select(&selector).next()?.value().attr("href")?;
    resolve_link(href, page_url)
}

/// Concatenation of the element's text nodes, each trimmed
fn stripped_text(element: &ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://www.douban.com/doulist/42/?start=0";

    fn item(title: &str, href: &str, abstract_lines: &[&str]) -> String {
        format!(
            r#"<div class="doulist-item">
                 <div class="title"><a href="{}"> {} </a></div>
                 <div class="abstract">{}</div>
               </div>"#,
            href,
            title,
            abstract_lines.join("<br />\n")
        )
    }

    fn page(items: &[String], next: Option<&str>) -> String {
        let paginator = match next {
            Some(href) => format!(
                r#"<div class="paginator"><span class="next"><a href="{}">后页&gt;</a></span></div>"#,
                href
            ),
            None => r#"<div class="paginator"><span class="next">后页&gt;</span></div>"#.to_string(),
        };
        format!("<html><body>{}{}</body></html>", items.join("\n"), paginator)
    }

    #[test]
    fn test_extract_full_record() {
        let html = page(
            &[item(
                "一一",
                "https://movie.douban.com/subject/1292434/",
                &[
                    "导演: 杨德昌",
                    "主演: 吴念真 / 李凯莉",
                    "类型: 剧情 / 爱情 / 家庭",
                    "制片国家/地区: 中国台湾 / 日本",
                    "年份: 2000",
                ],
            )],
            None,
        );

        let extracted = DoulistExtractor.extract(&html, PAGE_URL);

        assert_eq!(extracted.records.len(), 1);
        let record = &extracted.records[0];
        assert_eq!(record.title, "一一");
        assert_eq!(record.link, "https://movie.douban.com/subject/1292434/");
        assert_eq!(record.director, "杨德昌");
        assert_eq!(record.cast, "吴念真 / 李凯莉");
        assert_eq!(record.genre, "剧情 / 爱情 / 家庭");
        assert_eq!(record.country, "中国台湾 / 日本");
        assert_eq!(record.year, "2000");
        assert_eq!(record.source, "");
        assert_eq!(extracted.next, None);
    }

    #[test]
    fn test_order_and_missing_fields() {
        let html = page(
            &[
                item("A", "https://example.com/a", &["年份: 2001"]),
                item("B", "https://example.com/b", &["导演: X"]),
            ],
            None,
        );

        let records = DoulistExtractor.extract(&html, PAGE_URL).records;

        assert_eq!(records[0].title, "A");
        assert_eq!(records[0].year, "2001");
        assert_eq!(records[1].title, "B");
        assert_eq!(records[1].year, "");
    }

    #[test]
    fn test_items_without_abstract_are_skipped() {
        let html = page(
            &[
                r#"<div class="doulist-item"><div class="title"><a href="/x">No abstract</a></div></div>"#
                    .to_string(),
                item("Kept", "https://example.com/k", &["年份: 1999"]),
            ],
            None,
        );

        let records = DoulistExtractor.extract(&html, PAGE_URL).records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Kept");
    }

    #[test]
    fn test_next_page_resolved() {
        let html = page(&[item("A", "https://example.com/a", &[])], Some("?start=25&sort=seq"));

        let extracted = DoulistExtractor.extract(&html, PAGE_URL);
        assert_eq!(
            extracted.next.as_deref(),
            Some("https://www.douban.com/doulist/42/?start=25&sort=seq")
        );
    }

    #[test]
    fn test_empty_page() {
        let extracted = DoulistExtractor.extract("<html><body></body></html>", PAGE_URL);
        assert_eq!(extracted, ExtractedPage::default());
    }
}
