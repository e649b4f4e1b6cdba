//! Chunked document output
//!
//! A record set is split into `ceil(N / chunk_size)` contiguous chunks. Chunk `i`
//! of `n` is written next to the target as `<stem>_part_<i>_of_<n>.<ext>`, even
//! when there is only one chunk, followed by `<stem>_manifest.json` describing
//! the partitioning.

use crate::output::traits::{DocumentEncoder, FeedMeta, OutputError, OutputResult};
use crate::record::Record;
use crate::storage::{write_atomic, WriteOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 1-based inclusive item range covered by one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: usize,
    pub of: usize,
    pub start_item: usize,
    pub end_item: usize,
}

impl ChunkSpan {
    pub fn count(&self) -> usize {
        self.end_item + 1 - self.start_item
    }

    /// Zero-based slice range into the record set
    pub fn range(&self) -> std::ops::Range<usize> {
        (self.start_item - 1)..self.end_item
    }
}

/// Splits `total` items into spans of at most `chunk_size`
///
/// Returns no spans for an empty set or a zero chunk size.
pub fn chunk_plan(total: usize, chunk_size: usize) -> Vec<ChunkSpan> {
    if total == 0 || chunk_size == 0 {
        return Vec::new();
    }

    let of = total.div_ceil(chunk_size);
    (0..of)
        .map(|i| ChunkSpan {
            index: i + 1,
            of,
            start_item: i * chunk_size + 1,
            end_item: ((i + 1) * chunk_size).min(total),
        })
        .collect()
}

/// One chunk entry of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestChunk {
    /// File name, relative to the manifest's directory
    pub file: String,
    pub index: usize,
    pub of: usize,
    pub start_item: usize,
    pub end_item: usize,
    pub count: usize,
}

/// Partitioning of one written record set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub total_items: usize,
    pub chunk_size: usize,
    pub chunks: Vec<ManifestChunk>,
}

/// `<dir>/<stem>_part_<i>_of_<n>.<ext>`
pub fn chunk_path(target: &Path, index: usize, of: usize) -> PathBuf {
    let (stem, ext) = stem_and_extension(target);
    let name = match ext {
        Some(ext) => format!("{}_part_{}_of_{}.{}", stem, index, of, ext),
        None => format!("{}_part_{}_of_{}", stem, index, of),
    };
    target.with_file_name(name)
}

/// `<dir>/<stem>_manifest.json`
pub fn manifest_path(target: &Path) -> PathBuf {
    let (stem, _) = stem_and_extension(target);
    target.with_file_name(format!("{}_manifest.json", stem))
}

fn stem_and_extension(target: &Path) -> (String, Option<String>) {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = target
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
    (stem, ext)
}

/// Writes record sets as size-bounded chunk documents plus a manifest
#[derive(Clone)]
pub struct SegmentedWriter {
    encoder: Arc<dyn DocumentEncoder>,
    chunk_size: usize,
    options: WriteOptions,
}

impl std::fmt::Debug for SegmentedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentedWriter")
            .field("chunk_size", &self.chunk_size)
            .field("options", &self.options)
            .finish()
    }
}

impl SegmentedWriter {
    /// Creates a writer; output artifacts are backed up but never locked
    pub fn new(encoder: Arc<dyn DocumentEncoder>, chunk_size: usize) -> OutputResult<Self> {
        Self::with_options(encoder, chunk_size, WriteOptions::for_output(5))
    }

    pub fn with_options(
        encoder: Arc<dyn DocumentEncoder>,
        chunk_size: usize,
        options: WriteOptions,
    ) -> OutputResult<Self> {
        if chunk_size == 0 {
            return Err(OutputError::InvalidChunkSize);
        }

        Ok(Self {
            encoder,
            chunk_size,
            options,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Writes `records` as chunks derived from `target`
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - `records` is empty; nothing was written
    /// * `Ok(Some(Manifest))` - All chunks and the manifest were written
    /// * `Err(OutputError)` - Encoding or a write failed
    pub fn write(
        &self,
        records: &[Record],
        target: &Path,
        meta: &FeedMeta,
    ) -> OutputResult<Option<Manifest>> {
        if records.is_empty() {
            tracing::debug!("No records for {}, skipping", target.display());
            return Ok(None);
        }

        let previous = read_manifest(target);
        let plan = chunk_plan(records.len(), self.chunk_size);
        let mut chunks = Vec::with_capacity(plan.len());

        for span in &plan {
            let path = chunk_path(target, span.index, span.of);
            let bytes = self.encoder.encode(&records[span.range()], meta)?;
            write_atomic(&path, &bytes, &self.options)?;

            tracing::debug!(
                "Wrote chunk {}/{} (items {}-{}) to {}",
                span.index,
                span.of,
                span.start_item,
                span.end_item,
                path.display()
            );

            chunks.push(ManifestChunk {
                file: file_name_of(&path),
                index: span.index,
                of: span.of,
                start_item: span.start_item,
                end_item: span.end_item,
                count: span.count(),
            });
        }

        let manifest = Manifest {
            total_items: records.len(),
            chunk_size: self.chunk_size,
            chunks,
        };
        let json = serde_json::to_vec_pretty(&manifest)?;
        write_atomic(&manifest_path(target), &json, &self.options)?;

        if let Some(previous) = previous {
            remove_stale_chunks(target, &previous, &manifest);
        }

        tracing::info!(
            "Wrote {} items in {} chunk(s) for {}",
            manifest.total_items,
            manifest.chunks.len(),
            target.display()
        );

        Ok(Some(manifest))
    }
}

/// Reads the manifest currently on disk for `target`, if any
pub fn read_manifest(target: &Path) -> Option<Manifest> {
    let content = std::fs::read(manifest_path(target)).ok()?;
    serde_json::from_slice(&content).ok()
}

/// Deletes chunk files listed by the previous manifest but not the new one
///
/// A different chunk count changes every file name, so without this a shrinking
/// record set would leave the old `_of_<n>` files behind.
fn remove_stale_chunks(target: &Path, previous: &Manifest, current: &Manifest) {
    let keep: HashSet<&str> = current.chunks.iter().map(|c| c.file.as_str()).collect();

    for chunk in &previous.chunks {
        if keep.contains(chunk.file.as_str()) || chunk.file.contains(['/', '\\']) {
            continue;
        }
        let stale = target.with_file_name(&chunk.file);
        match std::fs::remove_file(&stale) {
            Ok(()) => tracing::debug!("Removed stale chunk {}", stale.display()),
            Err(e) => tracing::debug!("Could not remove stale chunk {}: {}", stale.display(), e),
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
