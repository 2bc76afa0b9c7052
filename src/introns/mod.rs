//! Shortened-introns viewport.
//!
//! Maintains a compressed coordinate space in which long introns are elided,
//! and keeps a [`Brush`] over it consistent across pan, zoom and rebuild
//! requests. Exon ranges come from a [`RangeSource`]; the plain viewport
//! brush is written back after every transform so the rendering layer can
//! draw from it.
//!
//! Range fetches run without holding the state lock. Every transform takes a
//! new generation token, and a fetch whose token is no longer current is
//! discarded instead of overwriting newer state.

pub mod brush;
pub mod catalog;
pub mod features;
mod translate;

pub use brush::{Brush, TransformRequest, TransformType, classify};
pub use catalog::{Bounds, Range, RangeCatalog};
pub use features::Feature;
pub use translate::PositionInfo;

use crate::source::{ExonQuery, RangeSource};
use crate::types::{Block, RangeQuery, TrackConfig, ViewportQuery};
use crate::viewport::{Viewport, ViewportEvent, Window};
use crate::{Error, Result};
use brush::midpoint;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events queued alongside the brush that force a particular transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingEvent {
    Rebuild,
}

/// What a catalog rebuild should ask the range source for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildRequest {
    /// Around a centre; the source is asked for twice the brush size.
    Viewport { center: i64, brush_size: i64 },
    /// An explicit window; half its span is added on each side.
    Range { start: i64, end: i64 },
}

/// How the brush is derived once the rebuilt catalog is installed.
#[derive(Debug, Clone, Copy)]
enum Continuation {
    Set { start: i64, end: i64 },
    Around { center: i64, shortened_size: i64 },
    Spanning { start: i64, end: i64 },
}

enum Plan {
    Ready(Option<Brush>),
    Fetch(RebuildRequest, Continuation),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Mode is off; only the plain brush moved.
    Plain(Window),
    Applied {
        kind: TransformType,
        brush: Option<Brush>,
    },
    /// A newer transform started while this one waited for ranges.
    Superseded(TransformType),
}

struct State {
    viewport: Viewport,
    configuration: Option<TrackConfig>,
    intron_length: i64,
    catalog: Option<Arc<RangeCatalog>>,
    brush: Option<Brush>,
    pending: Option<PendingEvent>,
    generation: u64,
}

impl State {
    fn chromosome(&self) -> Bounds {
        Bounds::new(self.viewport.chromosome.start, self.viewport.chromosome.end)
    }

    fn plan(&self, kind: TransformType, request: &TransformRequest) -> Plan {
        let catalog = self.catalog.as_deref();
        let start = request.start.unwrap_or(self.viewport.brush.start);
        let end = request.end.unwrap_or(self.viewport.brush.end);

        let Some(brush) = self.brush else {
            return set_plan(start, end);
        };

        match kind {
            TransformType::Set => set_plan(start, end),
            TransformType::Move => {
                Plan::Ready(catalog.and_then(|c| brush.moved(c, request.delta)))
            }
            TransformType::Scale => {
                let width = brush.end_index - brush.start_index;
                let ratio = if width > 0 {
                    (end - start) as f64 / width as f64
                } else {
                    1.0
                };
                let shortened_size = ((brush.shortened_size as f64 * ratio).round() as i64).max(1);
                let scaled = catalog.and_then(|c| {
                    Brush::around(c, brush.center, shortened_size)
                        .filter(|b| c.covers(b.start_index) && c.covers(b.end_index))
                });
                match scaled {
                    Some(scaled) => Plan::Ready(Some(scaled)),
                    None => Plan::Fetch(
                        RebuildRequest::Viewport {
                            center: brush.center,
                            brush_size: shortened_size,
                        },
                        Continuation::Around {
                            center: brush.center,
                            shortened_size,
                        },
                    ),
                }
            }
            TransformType::Global => {
                if let Some(c) = catalog.filter(|c| c.covers(start) && c.covers(end)) {
                    return Plan::Ready(Brush::spanning(c, start, end));
                }
                let span = end - start;
                let chromosome = self.chromosome();
                Plan::Fetch(
                    RebuildRequest::Range {
                        start: chromosome.start_index.max(start - span / 2),
                        end: chromosome.end_index.min(end + span / 2),
                    },
                    Continuation::Spanning { start, end },
                )
            }
            TransformType::Local => {
                Plan::Ready(catalog.and_then(|c| Brush::spanning(c, start, end)))
            }
            TransformType::Rebuild => Plan::Fetch(
                RebuildRequest::Viewport {
                    center: brush.center,
                    brush_size: brush.shortened_size,
                },
                Continuation::Around {
                    center: brush.center,
                    shortened_size: brush.shortened_size,
                },
            ),
        }
    }

    fn exon_query(&self, request: RebuildRequest) -> Result<ExonQuery> {
        let config = self.configuration.as_ref().ok_or_else(|| {
            Error::Internal("range rebuild requested while shortened introns mode is off".into())
        })?;
        let project_id = config.project_id_number;

        Ok(match request {
            RebuildRequest::Viewport { center, brush_size } => ExonQuery::Viewport(ViewportQuery {
                center_position: center,
                chromosome_id: config.chromosome_id,
                id: config.id,
                project_id,
                intron_length: self.intron_length,
                view_port_size: brush_size.saturating_mul(2),
            }),
            RebuildRequest::Range { start, end } => {
                let chromosome = self.chromosome();
                let span = end - start;
                ExonQuery::Range(RangeQuery {
                    chromosome_id: config.chromosome_id,
                    id: config.id,
                    project_id,
                    intron_length: self.intron_length,
                    start_index: chromosome.start_index.max(start - span / 2),
                    end_index: chromosome.end_index.min(end + span / 2),
                })
            }
        })
    }

    /// Replace the catalog with one built from `blocks`. An empty block list
    /// keeps the previous catalog.
    fn install(&mut self, blocks: &[Block]) -> Result<bool> {
        match RangeCatalog::build(blocks, self.chromosome())? {
            Some(catalog) => {
                debug!(
                    ranges = catalog.len(),
                    start = catalog.start_index(),
                    end = catalog.end_index(),
                    "installed range catalog"
                );
                self.catalog = Some(Arc::new(catalog));
                Ok(true)
            }
            None => {
                warn!("range source returned no exon blocks; keeping previous catalog");
                Ok(false)
            }
        }
    }

    fn resume(&self, continuation: Continuation) -> Option<Brush> {
        let catalog = self.catalog.as_deref()?;
        match continuation {
            Continuation::Set { start, end } => {
                let center = catalog
                    .shortened_position(midpoint(start, end))?
                    .clamp(catalog.start_index(), catalog.end_index());
                Brush::around(catalog, center, end - start + 1)
            }
            Continuation::Around {
                center,
                shortened_size,
            } => Brush::around(catalog, center, shortened_size),
            Continuation::Spanning { start, end } => Brush::spanning(catalog, start, end),
        }
    }

    fn commit(&mut self, kind: TransformType, brush: Option<Brush>) -> Option<Brush> {
        match brush {
            Some(brush) => {
                self.brush = Some(brush);
                self.viewport.brush = Window::new(brush.start_index, brush.end_index);
            }
            None => {
                warn!(%kind, "brush could not be resolved against covered ranges; keeping previous brush");
                if let Some(kept) = self.brush {
                    self.viewport.brush = Window::new(kept.start_index, kept.end_index);
                }
            }
        }
        self.brush
    }
}

fn set_plan(start: i64, end: i64) -> Plan {
    Plan::Fetch(
        RebuildRequest::Viewport {
            center: midpoint(start, end),
            brush_size: end - start,
        },
        Continuation::Set { start, end },
    )
}

/// Read-only view of the viewport for one render pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub enabled: bool,
    pub viewport: Viewport,
    pub brush: Option<Brush>,
    #[serde(skip)]
    pub catalog: Option<Arc<RangeCatalog>>,
}

impl Snapshot {
    pub fn catalog(&self) -> Option<&RangeCatalog> {
        self.catalog.as_deref()
    }

    /// Compressed projection is in effect.
    pub fn is_shortened(&self) -> bool {
        self.enabled && self.brush.is_some()
    }

    fn shortened_brush(&self) -> Option<&Brush> {
        self.brush.as_ref().filter(|_| self.enabled)
    }

    pub fn check_feature(&self, start: i64, end: Option<i64>) -> bool {
        features::check_feature(self.catalog(), start, end)
    }

    pub fn should_skip_feature<F: Feature>(&self, feature: &F) -> bool {
        features::should_skip_feature(self.catalog(), feature)
    }

    pub fn transform_feature<F: Feature>(&self, feature: F) -> Option<F> {
        features::transform_feature(self.catalog(), feature)
    }

    pub fn transform_features<F: Feature>(&self, features: Vec<F>) -> Vec<F> {
        features::transform_features(self.catalog(), features)
    }

    pub fn position_info(&self, position: i64) -> Option<PositionInfo> {
        self.catalog()?.position_info(position)
    }

    pub fn translate_position(&self, position: i64, delta: i64) -> Option<i64> {
        self.catalog()?.translate_position(position, delta)
    }

    pub fn shortened_size(&self, start: i64, end: i64) -> Option<i64> {
        self.catalog()?.shortened_size(start, end)
    }

    /// Absolute position `delta` compressed units right of the brush start.
    pub fn translate_start_position(&self, delta: i64) -> Option<i64> {
        let brush = self.shortened_brush()?;
        let catalog = self.catalog()?;
        catalog.absolute_position(brush.relative_start_index.checked_add(delta)?)
    }

    /// Pixels per displayed base.
    pub fn factor(&self) -> f64 {
        match self.shortened_brush() {
            Some(brush) => self.viewport.canvas_size / brush.shortened_size.max(1) as f64,
            None => self.viewport.factor(),
        }
    }

    /// Width of the visible window in displayed bases.
    pub fn actual_brush_size(&self) -> i64 {
        match self.shortened_brush() {
            Some(brush) => brush.shortened_size,
            None => self.viewport.brush.size(),
        }
    }

    pub fn center_position(&self) -> i64 {
        match self.shortened_brush() {
            Some(brush) => brush.center,
            None => self.viewport.brush.midpoint(),
        }
    }

    pub fn brush_bp_to_pixel(&self, bp: i64) -> Option<f64> {
        match self.shortened_brush() {
            Some(brush) => {
                let relative = self.catalog()?.relative_position(bp)?;
                Some((relative - brush.relative_start_index) as f64 * self.factor())
            }
            None => Some((bp - self.viewport.brush.start) as f64 * self.factor()),
        }
    }

    pub fn pixel_to_brush_bp(&self, px: f64) -> Option<i64> {
        let delta = (px / self.factor()).round() as i64;
        if self.is_shortened() {
            self.translate_start_position(delta)
        } else {
            Some(self.viewport.brush.start + delta)
        }
    }
}

/// Orchestrates the compressed coordinate space for one track/viewport pair.
pub struct ShortenedIntronsViewport {
    source: Arc<dyn RangeSource>,
    state: Mutex<State>,
    events: broadcast::Sender<ViewportEvent>,
}

impl ShortenedIntronsViewport {
    pub fn new(viewport: Viewport, source: Arc<dyn RangeSource>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source,
            state: Mutex::new(State {
                viewport,
                configuration: None,
                intron_length: 0,
                catalog: None,
                brush: None,
                pending: None,
                generation: 0,
            }),
            events,
        }
    }

    pub fn with_intron_length(mut self, intron_length: i64) -> Self {
        self.state.get_mut().intron_length = intron_length.max(0);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewportEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: ViewportEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn notify_brush(&self, window: Window, awake_from_shortened_introns: bool) {
        self.notify(ViewportEvent::BrushChanged {
            start: window.start,
            end: window.end,
            awake_from_shortened_introns,
        });
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.lock().await.configuration.is_some()
    }

    pub async fn track_id(&self) -> Option<i64> {
        self.state.lock().await.configuration.as_ref().map(|c| c.id)
    }

    pub async fn intron_length(&self) -> i64 {
        self.state.lock().await.intron_length
    }

    pub async fn brush(&self) -> Option<Brush> {
        self.state.lock().await.brush
    }

    pub async fn viewport(&self) -> Viewport {
        self.state.lock().await.viewport.clone()
    }

    pub async fn catalog(&self) -> Option<Arc<RangeCatalog>> {
        self.state.lock().await.catalog.clone()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.lock().await;
        Snapshot {
            enabled: state.configuration.is_some(),
            viewport: state.viewport.clone(),
            brush: state.brush,
            catalog: state.catalog.clone(),
        }
    }

    /// Turn on compression driven by `track`. Re-enabling the same track on
    /// the same chromosome does nothing.
    pub async fn enable(&self, track: TrackConfig) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state
                .configuration
                .as_ref()
                .is_some_and(|c| c.same_target(&track))
            {
                debug!(track_id = track.id, "shortened introns already enabled for track");
                return Ok(());
            }

            let chromosome_changed = state
                .configuration
                .as_ref()
                .is_none_or(|c| c.chromosome_id != track.chromosome_id);
            if chromosome_changed {
                state.brush = None;
                state.catalog = None;
            }

            info!(
                track_id = track.id,
                chromosome_id = track.chromosome_id,
                "shortened introns mode enabled"
            );
            state.configuration = Some(track);
        }
        self.invalidate().await
    }

    /// Leave compressed mode, restoring a plain brush of the same displayed
    /// width around the last compressed centre.
    pub async fn disable(&self) {
        let mut state = self.state.lock().await;
        if state.configuration.take().is_some() {
            info!("shortened introns mode disabled");
        }
        self.notify(ViewportEvent::ShortenedIntronsChanged);
        self.restore_plain(&mut state);
    }

    /// Change the padding kept around each exon. A new value rebuilds the
    /// catalog around the current centre.
    pub async fn set_intron_length(&self, intron_length: i64) -> Result<()> {
        if intron_length < 0 {
            return Err(Error::InvalidInput(format!(
                "intron length must not be negative, got {}",
                intron_length
            )));
        }
        {
            let mut state = self.state.lock().await;
            if state.intron_length == intron_length {
                return Ok(());
            }
            state.intron_length = intron_length;
        }
        self.invalidate().await
    }

    /// Signal that compression settings changed. In compressed mode the next
    /// transform refetches ranges around the same centre; otherwise the plain
    /// brush is restored.
    pub async fn invalidate(&self) -> Result<()> {
        let enabled = {
            let mut state = self.state.lock().await;
            self.notify(ViewportEvent::ShortenedIntronsChanged);
            if state.configuration.is_some() {
                state.pending = Some(PendingEvent::Rebuild);
                true
            } else {
                self.restore_plain(&mut state);
                false
            }
        };
        if enabled {
            self.transform(TransformRequest::default()).await?;
        }
        Ok(())
    }

    fn restore_plain(&self, state: &mut State) {
        state.catalog = None;
        state.pending = None;
        state.generation += 1;
        if let Some(brush) = state.brush.take() {
            let half = brush.half_size();
            let window = state.viewport.normalize(&TransformRequest::window(
                brush.center - half,
                brush.center + half,
            ));
            state.viewport.brush = window;
            self.notify_brush(window, true);
        }
    }

    /// Apply a pan/zoom/set request.
    pub async fn transform(&self, request: TransformRequest) -> Result<TransformOutcome> {
        let (token, kind, query, continuation) = {
            let mut state = self.state.lock().await;
            let window = state.viewport.normalize(&request);
            state.viewport.brush = window;
            state.generation += 1;
            let token = state.generation;

            if state.configuration.is_none() {
                self.notify_brush(window, false);
                return Ok(TransformOutcome::Plain(window));
            }

            let request = TransformRequest {
                start: Some(window.start),
                end: Some(window.end),
                delta: request.delta,
            };
            let kind = classify(
                state.brush.as_ref(),
                state.catalog.as_deref(),
                state.pending.is_some(),
                &request,
            );
            if matches!(kind, TransformType::Set | TransformType::Rebuild) {
                state.pending = None;
            }
            debug!(%kind, start = window.start, end = window.end, delta = request.delta, token, "classified transform");

            match state.plan(kind, &request) {
                Plan::Ready(brush) => {
                    let brush = state.commit(kind, brush);
                    self.notify_brush(state.viewport.brush, false);
                    return Ok(TransformOutcome::Applied { kind, brush });
                }
                Plan::Fetch(rebuild, continuation) => {
                    debug!(%kind, ?rebuild, "rebuilding range catalog");
                    (token, kind, state.exon_query(rebuild)?, continuation)
                }
            }
        };

        let fetched = self.source.fetch(&query).await;

        let mut state = self.state.lock().await;
        if state.generation != token {
            debug!(%kind, token, current = state.generation, "discarding superseded range rebuild");
            // Catalog is still stale until a rebuild lands.
            if kind == TransformType::Rebuild && state.configuration.is_some() {
                state.pending = Some(PendingEvent::Rebuild);
            }
            return Ok(TransformOutcome::Superseded(kind));
        }

        let blocks = match fetched {
            Ok(blocks) => blocks,
            Err(e) => {
                if kind == TransformType::Rebuild {
                    state.pending = Some(PendingEvent::Rebuild);
                }
                warn!(%kind, error = %e, "range rebuild failed");
                return Err(e);
            }
        };

        state.install(&blocks)?;
        let brush = state.resume(continuation);
        let brush = state.commit(kind, brush);
        self.notify_brush(state.viewport.brush, false);
        Ok(TransformOutcome::Applied { kind, brush })
    }
}
