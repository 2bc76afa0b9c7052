//! Range data source abstraction for exon blocks.
//!
//! The shortened-introns viewport never talks to a service directly; it asks a
//! [`RangeSource`] for the exon blocks around a viewport centre or inside an
//! absolute window. Implementations decide where the blocks come from.
//!
//! # Implementations
//!
//! - [`LocalRangeSource`] - In-memory exon annotation (optionally read from BED)
//! - [`HttpRangeSource`] - Genome browser REST API (feature `http`)
//!
//! # Example
//!
//! ```no_run
//! use intronview::source::{LocalRangeSource, RangeSource};
//! use intronview::types::Block;
//!
//! let mut source = LocalRangeSource::new();
//! source.insert(1, 1, vec![Block::new(100, 200), Block::new(400, 450)]);
//! ```

#[cfg(feature = "http")]
mod http;
mod local;

#[cfg(feature = "http")]
pub use http::HttpRangeSource;
pub use local::{LocalRangeSource, read_bed};

use crate::Result;
use crate::types::{Block, RangeQuery, ViewportQuery};
use async_trait::async_trait;

/// Either of the two exon queries a rebuild can issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExonQuery {
    Viewport(ViewportQuery),
    Range(RangeQuery),
}

/// Source of exon blocks for a track.
///
/// Returned blocks are absolute, 1-based inclusive, ascending and
/// non-overlapping. No retries are expected from callers.
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Exons around a viewport centre, enough to fill `viewPortSize`.
    async fn exons_by_viewport(&self, query: &ViewportQuery) -> Result<Vec<Block>>;

    /// Exons overlapping an absolute window.
    async fn exons_by_range(&self, query: &RangeQuery) -> Result<Vec<Block>>;

    async fn fetch(&self, query: &ExonQuery) -> Result<Vec<Block>> {
        match query {
            ExonQuery::Viewport(q) => self.exons_by_viewport(q).await,
            ExonQuery::Range(q) => self.exons_by_range(q).await,
        }
    }
}
