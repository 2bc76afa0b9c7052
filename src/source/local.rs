use super::RangeSource;
use crate::types::{Block, RangeQuery, ViewportQuery};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// In-memory exon annotation keyed by track and chromosome.
///
/// Answers queries the way the genome browser server does: exons are padded
/// by the requested intron length and overlapping padded exons are merged.
#[derive(Debug, Default, Clone)]
pub struct LocalRangeSource {
    tracks: HashMap<(i64, i64), Vec<Block>>,
}

impl LocalRangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track_id: i64, chromosome_id: i64, mut exons: Vec<Block>) {
        exons.sort_by_key(|b| (b.start_index, b.end_index));
        self.tracks.insert((track_id, chromosome_id), exons);
    }

    /// Load exons for one chromosome from a BED file. Returns the number of
    /// exons read.
    pub async fn load_bed(
        &mut self,
        track_id: i64,
        chromosome_id: i64,
        path: &Path,
        chromosome_name: &str,
    ) -> Result<usize> {
        let exons = read_bed(path, chromosome_name).await?;
        let count = exons.len();
        tracing::info!(
            "loaded {} exons for {} from {:?}",
            count,
            chromosome_name,
            path
        );
        self.insert(track_id, chromosome_id, exons);
        Ok(count)
    }

    fn padded_exons(&self, track_id: i64, chromosome_id: i64, intron_length: i64) -> Result<Vec<Block>> {
        let exons = self.tracks.get(&(track_id, chromosome_id)).ok_or_else(|| {
            Error::NotFound(format!(
                "no exons for track {} on chromosome {}",
                track_id, chromosome_id
            ))
        })?;
        let padded = exons.iter().map(|e| pad_exon(e, intron_length));
        Ok(merge_ascending(padded))
    }
}

#[async_trait]
impl RangeSource for LocalRangeSource {
    async fn exons_by_viewport(&self, query: &ViewportQuery) -> Result<Vec<Block>> {
        let exons = self.padded_exons(query.id, query.chromosome_id, query.intron_length)?;
        let center = query.center_position;
        let half = query.view_port_size / 2;

        let mut selected: Vec<Block> = Vec::new();

        // Forward from the centre
        let mut total = 0;
        for exon in exons.iter().filter(|e| e.end_index >= center) {
            if total >= half {
                break;
            }
            total += exon.end_index - exon.start_index.max(center);
            selected.push(*exon);
        }

        // Backwards, counting what the forward pass already picked up left of the centre
        let mut total: i64 = selected
            .iter()
            .filter(|e| e.start_index < center)
            .map(|e| e.end_index.min(center) - e.start_index)
            .sum();
        for exon in exons.iter().rev().filter(|e| e.start_index < center) {
            if total >= half {
                break;
            }
            if selected.contains(exon) {
                continue;
            }
            total += exon.end_index.min(center) - exon.start_index;
            selected.push(*exon);
        }

        selected.sort_by_key(|b| b.start_index);
        Ok(selected)
    }

    async fn exons_by_range(&self, query: &RangeQuery) -> Result<Vec<Block>> {
        if query.start_index > query.end_index {
            return Err(Error::InvalidRange(format!(
                "start {} is after end {}",
                query.start_index, query.end_index
            )));
        }
        let exons = self.padded_exons(query.id, query.chromosome_id, query.intron_length)?;
        Ok(exons
            .into_iter()
            .filter(|e| e.overlaps(query.start_index, query.end_index))
            .collect())
    }
}

fn pad_exon(exon: &Block, intron_length: i64) -> Block {
    Block::new(
        (exon.start_index - intron_length).max(1),
        exon.end_index + intron_length,
    )
}

fn merge_ascending(blocks: impl Iterator<Item = Block>) -> Vec<Block> {
    let mut merged: Vec<Block> = Vec::new();
    for block in blocks {
        match merged.last_mut() {
            Some(last) if block.start_index <= last.end_index => {
                last.end_index = last.end_index.max(block.end_index);
            }
            _ => merged.push(block),
        }
    }
    merged
}

/// Read the exons of one chromosome from a BED file.
///
/// BED intervals are 0-based half-open; the returned blocks are 1-based
/// inclusive.
pub async fn read_bed(path: &Path, chromosome_name: &str) -> Result<Vec<Block>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;

    let mut exons = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(chrom), Some(start), Some(end)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::InvalidInput(format!(
                "line {}: expected at least 3 BED columns",
                number + 1
            )));
        };
        if chrom != chromosome_name {
            continue;
        }

        let parse = |value: &str| {
            value.parse::<i64>().map_err(|e| {
                Error::InvalidInput(format!("line {}: bad coordinate {:?}: {}", number + 1, value, e))
            })
        };
        let (start, end) = (parse(start)?, parse(end)?);
        if end <= start {
            return Err(Error::InvalidRange(format!(
                "line {}: empty interval {}-{}",
                number + 1,
                start,
                end
            )));
        }
        exons.push(Block::new(start + 1, end));
    }
    Ok(exons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source() -> LocalRangeSource {
        let mut source = LocalRangeSource::new();
        source.insert(
            1,
            1,
            vec![
                Block::new(1000, 1100),
                Block::new(2000, 2100),
                Block::new(2150, 2200),
                Block::new(5000, 5300),
            ],
        );
        source
    }

    fn range_query(start: i64, end: i64, intron_length: i64) -> RangeQuery {
        RangeQuery {
            chromosome_id: 1,
            id: 1,
            project_id: None,
            intron_length,
            start_index: start,
            end_index: end,
        }
    }

    fn viewport_query(center: i64, size: i64) -> ViewportQuery {
        ViewportQuery {
            center_position: center,
            chromosome_id: 1,
            id: 1,
            project_id: None,
            intron_length: 0,
            view_port_size: size,
        }
    }

    #[tokio::test]
    async fn test_range_query_filters_overlapping() {
        let blocks = source().exons_by_range(&range_query(1050, 2120, 0)).await.unwrap();
        assert_eq!(blocks, vec![Block::new(1000, 1100), Block::new(2000, 2100)]);
    }

    #[tokio::test]
    async fn test_intron_length_pads_and_merges() {
        let blocks = source().exons_by_range(&range_query(1900, 2300, 30)).await.unwrap();
        assert_eq!(blocks, vec![Block::new(1970, 2230)]);

        let blocks = source().exons_by_range(&range_query(1, 1000, 2000)).await.unwrap();
        assert_eq!(blocks[0].start_index, 1);
    }

    #[tokio::test]
    async fn test_viewport_query_fills_both_sides() {
        // 150bp each side of 2050: forward is still short after 2150-2200 so
        // it takes 5000-5300 too; backwards needs 1000-1100 to reach 150.
        let blocks = source().exons_by_viewport(&viewport_query(2050, 300)).await.unwrap();
        assert_eq!(
            blocks,
            vec![
                Block::new(1000, 1100),
                Block::new(2000, 2100),
                Block::new(2150, 2200),
                Block::new(5000, 5300),
            ]
        );
    }

    #[tokio::test]
    async fn test_viewport_query_stops_when_filled() {
        let blocks = source().exons_by_viewport(&viewport_query(2050, 40)).await.unwrap();
        assert_eq!(blocks, vec![Block::new(2000, 2100)]);
    }

    #[tokio::test]
    async fn test_unknown_track() {
        let mut query = range_query(1, 10, 0);
        query.id = 99;
        let result = source().exons_by_range(&query).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let result = source().exons_by_range(&range_query(10, 1, 0)).await;
        assert!(matches!(result, Err(Error::InvalidRange(_))));
    }

    #[tokio::test]
    async fn test_read_bed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "track name=exons").unwrap();
        writeln!(file, "chr1\t99\t200\texon1").unwrap();
        writeln!(file, "chr2\t10\t20\texon2").unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "chr1 399 450").unwrap();

        let exons = read_bed(file.path(), "chr1").await.unwrap();
        assert_eq!(exons, vec![Block::new(100, 200), Block::new(400, 450)]);
    }

    #[tokio::test]
    async fn test_read_bed_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr1\tten\t20").unwrap();
        let result = read_bed(file.path(), "chr1").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_load_bed_registers_track() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chr7\t0\t10").unwrap();

        let mut source = LocalRangeSource::new();
        let count = source.load_bed(4, 7, file.path(), "chr7").await.unwrap();
        assert_eq!(count, 1);

        let mut query = range_query(1, 100, 0);
        query.id = 4;
        query.chromosome_id = 7;
        assert_eq!(source.exons_by_range(&query).await.unwrap(), vec![Block::new(1, 10)]);
    }
}
