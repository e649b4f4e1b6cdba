//! URL handling module for Doulist-Harvester
//!
//! This module derives stable source ids from list locators, builds the first
//! page locator from the configured start page, and resolves pagination links.

mod locator;
mod source;

// Re-export main functions
pub use locator::{page_locator, parse_locator, resolve_link};
pub use source::{source_id, source_ids};
