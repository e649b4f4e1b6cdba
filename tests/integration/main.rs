//! Integration tests for Doulist-Harvester
//!
//! These run the harvester against wiremock servers serving paginated list
//! pages and inspect the caches and chunked feeds it leaves on disk.

mod harvest_tests;
mod support;
