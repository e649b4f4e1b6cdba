//! End-to-end harvest tests
//!
//! Crawl -> cache -> merge -> filter -> chunked output against a mock list host.

use crate::support::{item, list_page, list_url, mount_page, movie_link, test_config};
use doulist_harvester::crawler::{
    AbortOnExhaustion, ExhaustionHandler, Harvester, RetryDecision,
};
use doulist_harvester::merge::DedupMode;
use doulist_harvester::output::{chunk_path, progress_target, read_manifest};
use doulist_harvester::storage::{open_cache_store, CacheStore};
use doulist_harvester::{HarvestError, Record};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn titles(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.title.as_str()).collect()
}

#[tokio::test]
async fn test_full_harvest_two_sources() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/doulist/1/",
        0,
        list_page(&[item("Alpha", "2001"), item("Beta", "1999")], Some("?start=25")),
    )
    .await;
    mount_page(&server, "/doulist/1/", 25, list_page(&[item("Gamma", "2005")], None)).await;
    mount_page(
        &server,
        "/doulist/2/",
        0,
        list_page(&[item("Alpha", "2001"), item("Delta", "unknown")], None),
    )
    .await;

    let mut config = test_config(
        dir.path(),
        vec![list_url(&server, "/doulist/1/"), list_url(&server, "/doulist/2/")],
    );
    config.harvest.min_year = Some(2000);
    config.output.chunk_size = 2;

    let harvester = Harvester::from_config(config.clone(), Arc::new(AbortOnExhaustion)).unwrap();
    let summary = harvester.run().await.unwrap();

    // Per-source stats
    assert_eq!(summary.sources.len(), 2);
    assert_eq!(summary.sources[0].source_id, "1");
    assert_eq!(summary.sources[0].pages_fetched, 2);
    assert_eq!(summary.sources[0].new_records, 3);
    assert_eq!(summary.sources[1].source_id, "2");
    assert_eq!(summary.sources[1].new_records, 2);

    // Merge counts: the second Alpha is a duplicate
    assert_eq!(summary.raw_records, 5);
    assert_eq!(summary.excluded_records, 0);
    assert_eq!(summary.duplicate_records, 1);
    assert_eq!(summary.merged_records, 4);
    assert_eq!(summary.filtered_records, Some(2));

    // Caches hold the raw per-source sequences, tagged with their source
    let store = open_cache_store(&config.output, &config.cache);
    let first = store.load_strict("1").unwrap();
    assert_eq!(titles(&first), vec!["Alpha", "Beta", "Gamma"]);
    assert!(first.iter().all(|r| r.source == "1"));
    assert_eq!(first[0].link, movie_link("Alpha"));
    assert_eq!(first[0].director, "某导演");
    let second = store.load_strict("2").unwrap();
    assert_eq!(titles(&second), vec!["Alpha", "Delta"]);

    // Merged output: 4 records in 2 chunks, first occurrence kept
    let merged_target = summary.merged_target.clone().unwrap();
    assert_eq!(merged_target, config.output.output_root.join("merged_all_doulists.xml"));
    let manifest = read_manifest(&merged_target).unwrap();
    assert_eq!(summary.merged_manifest.as_ref(), Some(&manifest));
    assert_eq!(manifest.total_items, 4);
    assert_eq!(manifest.chunks.len(), 2);
    assert_eq!(manifest.chunks[0].file, "merged_all_doulists_part_1_of_2.xml");

    let part1 = std::fs::read_to_string(chunk_path(&merged_target, 1, 2)).unwrap();
    let part2 = std::fs::read_to_string(chunk_path(&merged_target, 2, 2)).unwrap();
    assert!(part1.contains("<title>多个豆瓣豆列合并（去重后全量）</title>"));
    assert!(part1.contains("<title>Alpha (2001)</title>"));
    assert!(part1.contains("<title>Beta (1999)</title>"));
    assert!(part2.contains("<title>Gamma (2005)</title>"));
    assert!(part2.contains("<title>Delta (unknown)</title>"));

    // Filtered output: only numeric years >= 2000 survive
    let filtered_target = summary.filtered_target.clone().unwrap();
    let filtered = std::fs::read_to_string(chunk_path(&filtered_target, 1, 1)).unwrap();
    assert!(filtered.contains("<description>（年份 &gt;= 2000）</description>"));
    assert!(filtered.contains("Alpha (2001)"));
    assert!(filtered.contains("Gamma (2005)"));
    assert!(!filtered.contains("Beta"));
    assert!(!filtered.contains("Delta"));

    // Progress feed of each source is its undeduplicated cache
    let progress = progress_target(&config.output.output_root, "2");
    let progress = std::fs::read_to_string(chunk_path(&progress, 1, 1)).unwrap();
    assert!(progress.contains("<title>豆瓣豆列 2 实时进度</title>"));
    assert!(progress.contains("Alpha (2001)"));
}

#[tokio::test]
async fn test_excluded_source_is_crawled_but_not_merged() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/doulist/1/", 0, list_page(&[item("Alpha", "2001")], None)).await;
    mount_page(&server, "/doulist/2/", 0, list_page(&[item("Beta", "2002")], None)).await;

    let mut config = test_config(
        dir.path(),
        vec![list_url(&server, "/doulist/1/"), list_url(&server, "/doulist/2/")],
    );
    config.harvest.exclude = vec![list_url(&server, "/doulist/1/")];

    let summary = Harvester::from_config(config, Arc::new(AbortOnExhaustion))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.raw_records, 2);
    assert_eq!(summary.excluded_records, 1);
    assert_eq!(summary.merged_records, 1);
    assert_eq!(summary.filtered_records, None);
    assert!(summary.filtered_target.is_none());

    let merged = summary.merged_target.unwrap();
    let xml = std::fs::read_to_string(chunk_path(&merged, 1, 1)).unwrap();
    assert!(xml.contains("Beta (2002)"));
    assert!(!xml.contains("Alpha"));
}

#[tokio::test]
async fn test_resume_from_start_page_appends_to_cache() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/doulist/7/", 1, list_page(&[item("Later", "2010")], None)).await;

    let mut config = test_config(dir.path(), vec![list_url(&server, "/doulist/7/")]);
    config.harvest.start_page = 2;

    let store = open_cache_store(&config.output, &config.cache);
    store
        .save(
            "7",
            &[Record::new("Earlier", movie_link("Earlier"), "2009").with_source("7")],
        )
        .unwrap();

    let summary = Harvester::from_config(config, Arc::new(AbortOnExhaustion))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.sources[0].cached_records, 1);
    assert_eq!(summary.sources[0].new_records, 1);
    assert_eq!(titles(&store.load("7")), vec!["Earlier", "Later"]);
}

#[tokio::test]
async fn test_empty_page_ends_source_despite_next_link() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/doulist/3/", 0, list_page(&[item("Only", "2000")], Some("?start=25"))).await;
    mount_page(&server, "/doulist/3/", 25, list_page(&[], Some("?start=50"))).await;

    Mock::given(method("GET"))
        .and(path("/doulist/3/"))
        .and(query_param("start", "50"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config(dir.path(), vec![list_url(&server, "/doulist/3/")]);
    let summary = Harvester::from_config(config, Arc::new(AbortOnExhaustion))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.sources[0].pages_fetched, 2);
    assert_eq!(summary.merged_records, 1);
}

#[tokio::test]
async fn test_exhausted_fetch_aborts_run_and_keeps_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/doulist/4/", 0, list_page(&[item("Saved", "2003")], Some("?start=25"))).await;

    Mock::given(method("GET"))
        .and(path("/doulist/4/"))
        .and(query_param("start", "25"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(dir.path(), vec![list_url(&server, "/doulist/4/")]);
    let harvester = Harvester::from_config(config.clone(), Arc::new(AbortOnExhaustion)).unwrap();

    let err = harvester.run().await.unwrap_err();
    match err {
        HarvestError::Source { source_id, message } => {
            assert_eq!(source_id, "4");
            assert!(message.contains("after 2 attempts"));
        }
        other => panic!("unexpected error: {}", other),
    }

    let store = open_cache_store(&config.output, &config.cache);
    assert_eq!(titles(&store.load("4")), vec!["Saved"]);

    let merged = config.output.output_root.join("merged_all_doulists.xml");
    assert!(read_manifest(&merged).is_none());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/doulist/5/"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/doulist/5/", 0, list_page(&[item("Recovered", "2020")], None)).await;

    let config = test_config(dir.path(), vec![list_url(&server, "/doulist/5/")]);
    let summary = Harvester::from_config(config, Arc::new(AbortOnExhaustion))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.merged_records, 1);
}

#[tokio::test]
async fn test_handler_can_extend_retry_rounds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/doulist/6/"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(500))
        .expect(6)
        .mount(&server)
        .await;

    let handler: Arc<dyn ExhaustionHandler> = Arc::new(|_: &str, attempts: u32| {
        if attempts < 6 {
            RetryDecision::Continue
        } else {
            RetryDecision::Abort
        }
    });

    let config = test_config(dir.path(), vec![list_url(&server, "/doulist/6/")]);
    let err = Harvester::from_config(config, handler)
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert!(err.to_string().contains("after 6 attempts"));
}

#[tokio::test]
async fn test_rerun_rewrites_outputs_with_link_dedup() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/doulist/8/",
        0,
        list_page(&[item("Same", "2001"), item("Same", "2002")], None),
    )
    .await;

    let mut config = test_config(dir.path(), vec![list_url(&server, "/doulist/8/")]);
    config.harvest.dedup_mode = DedupMode::Link;

    let harvester = Harvester::from_config(config, Arc::new(AbortOnExhaustion)).unwrap();

    let first = harvester.run().await.unwrap();
    assert_eq!(first.merged_records, 1);

    // The second run appends the same page again to the cache; dedup absorbs it
    let second = harvester.run().await.unwrap();
    assert_eq!(second.sources[0].cached_records, 2);
    assert_eq!(second.raw_records, 4);
    assert_eq!(second.merged_records, 1);
}
