//! Feature visibility and clipping against the covered ranges.

use super::catalog::RangeCatalog;
use crate::types::Block;

/// Anything with an inclusive absolute extent that a track renders.
pub trait Feature {
    fn start_index(&self) -> i64;
    fn end_index(&self) -> i64;
    fn set_bounds(&mut self, start_index: i64, end_index: i64);
}

impl Feature for Block {
    fn start_index(&self) -> i64 {
        self.start_index
    }

    fn end_index(&self) -> i64 {
        self.end_index
    }

    fn set_bounds(&mut self, start_index: i64, end_index: i64) {
        self.start_index = start_index;
        self.end_index = end_index;
    }
}

/// Whether a feature should be fetched or rendered at all.
///
/// Without a catalog everything passes. A missing end is treated as a
/// single-base feature.
pub fn check_feature(catalog: Option<&RangeCatalog>, start: i64, end: Option<i64>) -> bool {
    let Some(catalog) = catalog else {
        return true;
    };
    let end = end.unwrap_or(start);
    if end < catalog.start_index() || start > catalog.end_index() {
        return false;
    }
    catalog.first_intersecting(start, end).is_some()
}

/// True when the feature lies entirely in elided space.
pub fn should_skip_feature<F: Feature>(catalog: Option<&RangeCatalog>, feature: &F) -> bool {
    catalog
        .and_then(|c| c.first_intersecting(feature.start_index(), feature.end_index()))
        .is_none()
}

/// Clip a feature to the first range it intersects.
pub fn transform_feature<F: Feature>(catalog: Option<&RangeCatalog>, mut feature: F) -> Option<F> {
    let catalog = catalog?;
    let index = catalog.first_intersecting(feature.start_index(), feature.end_index())?;
    let range = &catalog.ranges()[index];
    let start = feature.start_index().max(range.start_index);
    let end = feature.end_index().min(range.end_index);
    feature.set_bounds(start, end);
    Some(feature)
}

pub fn transform_features<F: Feature>(catalog: Option<&RangeCatalog>, features: Vec<F>) -> Vec<F> {
    features
        .into_iter()
        .filter_map(|f| transform_feature(catalog, f))
        .collect()
}
