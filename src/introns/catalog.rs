//! Covered-range catalog built from exon blocks.
//!
//! A catalog is an immutable, ordered set of [`Range`]s. Each range carries
//! its absolute (hard) bounds, its bounds in compressed coordinate space, and
//! the soft bounds it owns when resolving positions that fall between exons.
//! A rebuild produces a new catalog; existing catalogs are never mutated.

use super::brush::midpoint;
use crate::types::Block;
use crate::{Error, Result};
use serde::Serialize;

/// Inclusive interval `[start_index, end_index]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub start_index: i64,
    pub end_index: i64,
}

impl Bounds {
    pub fn new(start_index: i64, end_index: i64) -> Self {
        Self {
            start_index,
            end_index,
        }
    }

    pub fn contains(&self, position: i64) -> bool {
        self.start_index <= position && position <= self.end_index
    }

    pub fn len(&self) -> i64 {
        self.end_index - self.start_index + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end_index < self.start_index
    }
}

/// One contiguous genomic interval kept after intron compression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start_index: i64,
    pub end_index: i64,
    pub relative: Bounds,
    pub soft: Bounds,
}

impl Range {
    pub fn hard(&self) -> Bounds {
        Bounds::new(self.start_index, self.end_index)
    }

    pub fn intersects(&self, start: i64, end: i64) -> bool {
        start <= self.end_index && end >= self.start_index
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeCatalog {
    ranges: Vec<Range>,
    start_index: i64,
    end_index: i64,
    relative: Bounds,
}

impl RangeCatalog {
    /// Build a catalog from exon blocks.
    ///
    /// Blocks are sorted and overlapping blocks merged before relative and
    /// soft bounds are assigned. `chromosome` bounds the soft range of the
    /// first and last range. Returns `Ok(None)` for an empty block list.
    pub fn build(blocks: &[Block], chromosome: Bounds) -> Result<Option<Self>> {
        if let Some(bad) = blocks.iter().find(|b| b.is_empty()) {
            return Err(Error::InvalidRange(format!(
                "exon block {}-{} ends before it starts",
                bad.start_index, bad.end_index
            )));
        }

        let merged = merge_blocks(blocks);
        let (first, last) = match (merged.first(), merged.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Ok(None),
        };

        let mut ranges = Vec::with_capacity(merged.len());
        let mut relative_position = 1;
        let mut soft_start = chromosome.start_index.min(first.start_index);

        for (i, block) in merged.iter().enumerate() {
            let length = block.len();
            // Midpoint to the next exon, ties to the left range. Merged
            // blocks are at least one base apart, so the next hard start
            // stays inside its own soft bounds.
            let soft_end = match merged.get(i + 1) {
                Some(next) => midpoint(block.end_index, next.start_index),
                None => chromosome.end_index.max(block.end_index),
            };

            ranges.push(Range {
                start_index: block.start_index,
                end_index: block.end_index,
                relative: Bounds::new(relative_position, relative_position + length - 1),
                soft: Bounds::new(soft_start, soft_end),
            });

            soft_start = soft_end + 1;
            relative_position += length;
        }

        Ok(Some(Self {
            ranges,
            start_index: first.start_index,
            end_index: last.end_index,
            relative: Bounds::new(1, relative_position - 1),
        }))
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn start_index(&self) -> i64 {
        self.start_index
    }

    pub fn end_index(&self) -> i64 {
        self.end_index
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.start_index, self.end_index)
    }

    pub fn relative(&self) -> Bounds {
        self.relative
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Index of the range whose soft bounds contain `position`.
    pub fn soft_range_index(&self, position: i64) -> Option<usize> {
        let index = self
            .ranges
            .partition_point(|r| r.soft.end_index < position);
        self.ranges
            .get(index)
            .filter(|r| r.soft.contains(position))
            .map(|_| index)
    }

    /// Index of the range whose relative bounds contain `relative`.
    pub fn relative_range_index(&self, relative: i64) -> Option<usize> {
        let index = self
            .ranges
            .partition_point(|r| r.relative.end_index < relative);
        self.ranges
            .get(index)
            .filter(|r| r.relative.contains(relative))
            .map(|_| index)
    }

    /// Index of the lowest range whose hard bounds intersect `[start, end]`.
    pub fn first_intersecting(&self, start: i64, end: i64) -> Option<usize> {
        let index = self.ranges.partition_point(|r| r.end_index < start);
        self.ranges
            .get(index)
            .filter(|r| r.intersects(start, end))
            .map(|_| index)
    }
}

fn merge_blocks(blocks: &[Block]) -> Vec<Block> {
    let mut sorted = blocks.to_vec();
    sorted.sort_by_key(|b| (b.start_index, b.end_index));

    let mut merged: Vec<Block> = Vec::with_capacity(sorted.len());
    for block in sorted {
        match merged.last_mut() {
            // Touching blocks are one contiguous exonic stretch.
            Some(last) if block.start_index <= last.end_index + 1 => {
                last.end_index = last.end_index.max(block.end_index);
            }
            _ => merged.push(block),
        }
    }
    merged
}
