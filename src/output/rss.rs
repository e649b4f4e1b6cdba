//! RSS 2.0 document encoding
//!
//! Each record becomes one `<item>` with a year-suffixed title, its link, a
//! synthetic publication date (January 1 of the record's year, UTC) when the
//! year is numeric, and a pipe-joined description of its attributes.

use crate::output::traits::{DocumentEncoder, FeedMeta, OutputResult};
use crate::record::Record;
use chrono::{TimeZone, Utc};

/// Channel title used when the caller supplies none
pub const DEFAULT_FEED_TITLE: &str = "豆瓣豆列 - RSS 抓取";

/// Channel description used when the caller supplies none
pub const DEFAULT_FEED_DESCRIPTION: &str = "从多个豆瓣豆列抓取的电影列表";

/// Encodes records as an RSS 2.0 feed
#[derive(Debug, Clone, Copy, Default)]
pub struct RssEncoder;

impl DocumentEncoder for RssEncoder {
    fn encode(&self, records: &[Record], meta: &FeedMeta) -> OutputResult<Vec<u8>> {
        let title = non_empty_or(&meta.title, DEFAULT_FEED_TITLE);
        let description = non_empty_or(&meta.description, DEFAULT_FEED_DESCRIPTION);

        let mut xml = String::with_capacity(256 + records.len() * 256);
        xml.push_str("<?xml version='1.0' encoding='utf-8'?>\n");
        xml.push_str("<rss version=\"2.0\">\n");
        xml.push_str("  <channel>\n");
        push_element(&mut xml, 4, "title", title);
        push_element(&mut xml, 4, "link", &meta.link);
        push_element(&mut xml, 4, "description", description);

        for record in records {
            xml.push_str("    <item>\n");
            push_element(&mut xml, 6, "title", &record.display_title());
            push_element(&mut xml, 6, "link", record.link.trim());
            if let Some(pub_date) = year_to_pub_date(record) {
                push_element(&mut xml, 6, "pubDate", &pub_date);
            }
            push_element(&mut xml, 6, "description", &record.description());
            xml.push_str("    </item>\n");
        }

        xml.push_str("  </channel>\n");
        xml.push_str("</rss>\n");

        Ok(xml.into_bytes())
    }
}

/// RFC 2822 date for January 1 of the record's year, if it has a numeric one
pub fn year_to_pub_date(record: &Record) -> Option<String> {
    let year = i32::try_from(record.numeric_year()?).ok()?;
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.to_rfc2822())
}

/// Escapes the five XML special characters
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn push_element(xml: &mut String, indent: usize, tag: &str, text: &str) {
    xml.push_str(&" ".repeat(indent));
    if text.is_empty() {
        xml.push_str(&format!("<{} />\n", tag));
    } else {
        xml.push_str(&format!("<{}>{}</{}>\n", tag, escape_xml(text), tag));
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(records: &[Record], meta: &FeedMeta) -> String {
        String::from_utf8(RssEncoder.encode(records, meta).unwrap()).unwrap()
    }

    #[test]
    fn test_channel_defaults() {
        let xml = encode(&[], &FeedMeta::new("", "https://example.com/", ""));

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(&format!("<title>{}</title>", DEFAULT_FEED_TITLE)));
        assert!(xml.contains(&format!("<description>{}</description>", DEFAULT_FEED_DESCRIPTION)));
        assert!(xml.contains("<link>https://example.com/</link>"));
        assert!(!xml.contains("<item>"));
    }

    #[test]
    fn test_item_fields() {
        let mut record = Record::new("Yi Yi", "https://movie.example.com/1/", "2000");
        record.director = "杨德昌".to_string();

        let xml = encode(&[record], &FeedMeta::new("Feed", "https://example.com/", "Desc"));

        assert!(xml.contains("<title>Yi Yi (2000)</title>"));
        assert!(xml.contains("<link>https://movie.example.com/1/</link>"));
        assert!(xml.contains("<pubDate>Sat, "));
        assert!(xml.contains("Jan 2000 00:00:00 +0000</pubDate>"));
        assert!(xml.contains("<description>导演: 杨德昌 | 年份: 2000</description>"));
    }

    #[test]
    fn test_pub_date_omitted_without_numeric_year() {
        let xml = encode(
            &[Record::new("Untitled", "https://example.com/x", "n/a")],
            &FeedMeta::default(),
        );

        assert!(!xml.contains("<pubDate>"));
        assert!(xml.contains("<title>Untitled (n/a)</title>"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_xml("a & b <c> \"d\" 'e'"), "a &amp; b &lt;c&gt; &quot;d&quot; &apos;e&apos;");

        let xml = encode(
            &[Record::new("Tom & Jerry", "https://example.com/?a=1&b=2", "")],
            &FeedMeta::default(),
        );
        assert!(xml.contains("<title>Tom &amp; Jerry</title>"));
        assert!(xml.contains("<link>https://example.com/?a=1&amp;b=2</link>"));
    }
}
