//! Translation between absolute and compressed (relative) coordinates.
//!
//! Every function here is pure. A position that no range's soft bounds
//! contain cannot be translated and yields `None`.

use super::catalog::RangeCatalog;
use serde::Serialize;

/// Where an absolute position lands in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    /// Position clamped to the owning range. One before the hard start or
    /// one after the hard end when the input lies in a gap.
    pub position: i64,
    pub range_index: usize,
    pub relative_position: i64,
}

impl RangeCatalog {
    pub fn position_info(&self, position: i64) -> Option<PositionInfo> {
        let range_index = self.soft_range_index(position)?;
        let range = &self.ranges()[range_index];

        let inside = position.clamp(range.start_index, range.end_index);
        let clamped = if position < range.start_index {
            inside - 1
        } else if position > range.end_index {
            inside + 1
        } else {
            inside
        };

        Some(PositionInfo {
            position: clamped,
            range_index,
            relative_position: range.relative.start_index + (inside - range.start_index),
        })
    }

    pub fn shortened_position(&self, position: i64) -> Option<i64> {
        self.position_info(position).map(|info| info.position)
    }

    pub fn relative_position(&self, position: i64) -> Option<i64> {
        self.position_info(position).map(|info| info.relative_position)
    }

    /// Absolute position of a relative coordinate. Coordinates past either
    /// end of the catalog are extrapolated linearly from the nearest edge.
    /// `None` when the result does not fit in an `i64`.
    pub fn absolute_position(&self, relative: i64) -> Option<i64> {
        if let Some(index) = self.relative_range_index(relative) {
            let range = &self.ranges()[index];
            return Some(range.start_index + (relative - range.relative.start_index));
        }
        let bounds = self.relative();
        if relative <= bounds.start_index {
            self.start_index()
                .checked_sub(bounds.start_index.checked_sub(relative)?)
        } else {
            self.end_index()
                .checked_add(relative.checked_sub(bounds.end_index)?)
        }
    }

    /// Move `position` by `delta` compressed-space units.
    pub fn translate_position(&self, position: i64, delta: i64) -> Option<i64> {
        let relative = self.relative_position(position)?;
        self.absolute_position(relative.checked_add(delta)?)
    }

    /// Compressed-space width of the inclusive window `[start, end]`.
    pub fn shortened_size(&self, start: i64, end: i64) -> Option<i64> {
        let start = self.relative_position(start)?;
        let end = self.relative_position(end)?;
        Some(end - start + 1)
    }

    /// Whether `position` lies inside the catalog's hard coverage.
    pub fn covers(&self, position: i64) -> bool {
        self.bounds().contains(position)
    }

    /// Coverage check of `position` shifted by `delta` compressed units.
    pub fn covers_translated(&self, position: i64, delta: i64) -> bool {
        self.translate_position(position, delta)
            .is_some_and(|p| self.covers(p))
    }
}

#[cfg(test)]
mod tests {
    use super::super::catalog::tests::two_range_catalog;

    #[test]
    fn test_position_inside_range() {
        let catalog = two_range_catalog();
        let info = catalog.position_info(150).unwrap();
        assert_eq!(info.position, 150);
        assert_eq!(info.range_index, 0);
        assert_eq!(info.relative_position, 51);

        assert_eq!(catalog.relative_position(400), Some(102));
        assert_eq!(catalog.relative_position(450), Some(152));
    }

    #[test]
    fn test_gap_midpoint_resolves_to_lower_range_edge() {
        let catalog = two_range_catalog();
        let info = catalog.position_info(300).unwrap();
        assert_eq!(info.range_index, 0);
        assert_eq!(info.position, 201);
        assert_eq!(info.relative_position, 101);

        let info = catalog.position_info(301).unwrap();
        assert_eq!(info.range_index, 1);
        assert_eq!(info.position, 399);
        assert_eq!(info.relative_position, 102);
    }

    #[test]
    fn test_before_first_range() {
        let catalog = two_range_catalog();
        let info = catalog.position_info(10).unwrap();
        assert_eq!(info.position, 99);
        assert_eq!(info.relative_position, 1);
    }

    #[test]
    fn test_outside_chromosome_is_unresolvable() {
        let catalog = two_range_catalog();
        assert!(catalog.position_info(0).is_none());
        assert!(catalog.position_info(5000).is_none());
        assert!(catalog.translate_position(5000, 10).is_none());
        assert!(catalog.shortened_size(150, 5000).is_none());
    }

    #[test]
    fn test_translate_across_gap() {
        let catalog = two_range_catalog();
        // 190 is relative 91; +20 lands on relative 111, nine past 400.
        assert_eq!(catalog.translate_position(190, 20), Some(409));
        assert_eq!(catalog.translate_position(409, -20), Some(190));
    }

    #[test]
    fn test_translate_extrapolates_past_edges() {
        let catalog = two_range_catalog();
        assert_eq!(catalog.translate_position(110, -30), Some(80));
        assert_eq!(catalog.translate_position(440, 30), Some(470));
    }

    #[test]
    fn test_translate_overflow_cannot_be_computed() {
        let catalog = two_range_catalog();
        assert_eq!(catalog.translate_position(150, i64::MAX), None);
        assert_eq!(catalog.absolute_position(i64::MIN), None);
        assert!(!catalog.covers_translated(150, i64::MAX));
    }

    #[test]
    fn test_round_trip_inside_coverage() {
        let catalog = two_range_catalog();
        for position in (100..=200).chain(400..=450) {
            for delta in [-60, -17, -1, 0, 1, 5, 33, 90] {
                let moved = catalog.translate_position(position, delta).unwrap();
                if !catalog.covers(moved) || catalog.position_info(moved).unwrap().position != moved {
                    continue;
                }
                assert_eq!(catalog.translate_position(moved, -delta), Some(position));
            }
        }
    }

    #[test]
    fn test_relative_position_is_monotonic() {
        let catalog = two_range_catalog();
        let mut previous = i64::MIN;
        for position in 1..=1000 {
            let relative = catalog.relative_position(position).unwrap();
            assert!(relative >= previous, "position {position} went backwards");
            previous = relative;
        }
    }

    #[test]
    fn test_shortened_size_skips_gap() {
        let catalog = two_range_catalog();
        assert_eq!(catalog.shortened_size(100, 450), Some(152));
        assert_eq!(catalog.shortened_size(150, 160), Some(11));
    }

    #[test]
    fn test_coverage() {
        let catalog = two_range_catalog();
        assert!(catalog.covers(100));
        assert!(catalog.covers(300));
        assert!(!catalog.covers(99));
        assert!(catalog.covers_translated(150, 100));
        assert!(!catalog.covers_translated(150, 200));
    }
}
