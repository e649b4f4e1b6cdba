//! Shared fixtures: page builders, mock mounting and test configuration

use doulist_harvester::config::Config;
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One list entry as it appears on a page
pub struct Item {
    pub title: &'static str,
    pub year: &'static str,
}

pub const fn item(title: &'static str, year: &'static str) -> Item {
    Item { title, year }
}

/// Link the extractor will report for an item title
pub fn movie_link(title: &str) -> String {
    format!("https://movie.example.com/{}/", title)
}

/// Renders a list page with the given items and optional next-page href
pub fn list_page(items: &[Item], next: Option<&str>) -> String {
    let mut html = String::from("<html><body><div class=\"article\">\n");

    for item in items {
        html.push_str(&format!(
            r#"<div class="doulist-item">
  <div class="title"><a href="{}">{}</a></div>
  <div class="abstract">
    导演: 某导演<br />
    类型: 剧情<br />
    年份: {}
  </div>
</div>
"#,
            movie_link(item.title),
            item.title,
            item.year
        ));
    }

    html.push_str("<div class=\"paginator\"><span class=\"next\">");
    match next {
        Some(href) => html.push_str(&format!("<a href=\"{}\">后页&gt;</a>", href)),
        None => html.push_str("后页&gt;"),
    }
    html.push_str("</span></div>\n</div></body></html>");

    html
}

/// Serves `body` for `GET <list_path>?start=<start>`
pub async fn mount_page(server: &MockServer, list_path: &str, start: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(list_path))
        .and(query_param("start", start.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Locator of a list served by the mock server
pub fn list_url(server: &MockServer, list_path: &str) -> String {
    format!("{}{}", server.uri(), list_path)
}

/// Configuration writing everything under `root`, with no pacing and fast retries
pub fn test_config(root: &Path, sources: Vec<String>) -> Config {
    let mut config = Config::default();

    config.harvest.sources = sources;
    config.output.output_root = root.join("rss_files");
    config.output.cache_root = root.join("cache_doulist");
    config.output.filtered_root = root.join("rss_filtered");
    config.delay.min_secs = 0;
    config.delay.max_secs = 0;
    config.fetch.retries = 2;
    config.fetch.retry_delay_secs = 0;
    config.fetch.timeout_secs = 5;

    config
}
