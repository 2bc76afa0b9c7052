//! Compressed-space brush and transform classification.

use super::catalog::RangeCatalog;
use serde::Serialize;
use std::fmt;

/// The currently displayed window in shortened-introns mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Brush {
    pub start_index: i64,
    pub end_index: i64,
    pub center: i64,
    pub shortened_size: i64,
    pub relative_start_index: i64,
}

impl Brush {
    /// Brush of `shortened_size` compressed units centred on `center`.
    pub fn around(catalog: &RangeCatalog, center: i64, shortened_size: i64) -> Option<Self> {
        let half = shortened_size / 2;
        let relative_center = catalog.relative_position(center)?;
        let relative_start_index = relative_center.checked_sub(half)?;
        Some(Self {
            start_index: catalog.absolute_position(relative_start_index)?,
            end_index: catalog.absolute_position(relative_center.checked_add(half)?)?,
            center,
            shortened_size,
            relative_start_index,
        })
    }

    /// Brush spanning the absolute window `[start, end]`.
    pub fn spanning(catalog: &RangeCatalog, start: i64, end: i64) -> Option<Self> {
        let shortened_size = catalog.shortened_size(start, end)?;
        let relative_start_index = catalog.relative_position(start)?;
        Some(Self {
            start_index: start,
            end_index: end,
            center: catalog.absolute_position(relative_start_index + shortened_size / 2)?,
            shortened_size,
            relative_start_index,
        })
    }

    /// Same size, centre moved by `delta` compressed units.
    pub fn moved(&self, catalog: &RangeCatalog, delta: i64) -> Option<Self> {
        let center = catalog.translate_position(self.center, delta)?;
        Self::around(catalog, center, self.shortened_size)
    }

    /// Midpoint of the absolute edges, rounded half up.
    pub fn midpoint(&self) -> i64 {
        midpoint(self.start_index, self.end_index)
    }

    pub fn half_size(&self) -> i64 {
        self.shortened_size / 2
    }
}

pub(crate) fn midpoint(start: i64, end: i64) -> i64 {
    (start + end + 1).div_euclid(2)
}

/// A pan/zoom/set request in absolute coordinates.
///
/// `delta` is a pan distance in compressed units; zero means no pan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformRequest {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub delta: i64,
}

impl TransformRequest {
    pub fn window(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            delta: 0,
        }
    }

    pub fn pan(delta: i64) -> Self {
        Self {
            delta,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransformType {
    /// Full rebuild anchored at the requested window.
    Set,
    /// Pan within the current catalog.
    Move,
    /// Zoom around the current centre.
    Scale,
    /// Window grows to contain the current brush.
    Global,
    /// Window shrinks inside the current brush.
    Local,
    /// Refetch ranges around the same centre and size.
    Rebuild,
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformType::Set => "SET",
            TransformType::Move => "MOVE",
            TransformType::Scale => "SCALE",
            TransformType::Global => "GLOBAL",
            TransformType::Local => "LOCAL",
            TransformType::Rebuild => "REBUILD",
        };
        f.write_str(name)
    }
}

/// Decide how a request is applied. First matching rule wins.
pub fn classify(
    brush: Option<&Brush>,
    catalog: Option<&RangeCatalog>,
    rebuild_requested: bool,
    request: &TransformRequest,
) -> TransformType {
    let Some(brush) = brush else {
        return TransformType::Set;
    };
    if rebuild_requested {
        return TransformType::Rebuild;
    }

    if request.delta != 0 {
        if let Some(catalog) = catalog {
            let covered = brush.moved(catalog, request.delta).is_some_and(|moved| {
                catalog.covers(moved.start_index) && catalog.covers(moved.end_index)
            });
            if covered {
                return TransformType::Move;
            }
        }
    }

    let (Some(start), Some(end)) = (request.start, request.end) else {
        return TransformType::Set;
    };

    if brush.shortened_size > 0 && midpoint(start, end) == brush.midpoint() {
        return TransformType::Scale;
    }
    if brush.start_index <= start && brush.end_index >= end {
        return TransformType::Local;
    }
    if brush.start_index >= start && brush.end_index <= end {
        return TransformType::Global;
    }
    TransformType::Set
}
