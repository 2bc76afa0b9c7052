use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intronview::{
    Config, Error, ShortenedIntronsViewport,
    introns::{Snapshot, TransformOutcome, TransformRequest},
    source::{LocalRangeSource, RangeSource},
    types::{ApiResponse, Block, TrackConfig},
    viewport::Viewport,
};

/// Zoom factors outside `[1 / MAX_ZOOM_FACTOR, MAX_ZOOM_FACTOR]` are rejected.
const MAX_ZOOM_FACTOR: f64 = 1e6;

/// One line of driver input.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Set { start: i64, end: i64 },
    Move { delta: i64 },
    Zoom { factor: f64 },
    Enable,
    Disable,
    Intron { length: i64 },
    Feature { start: i64, end: i64 },
    Show,
}

fn parse_command(line: &str) -> intronview::Result<Command> {
    let mut words = line.split_whitespace();
    let name = words
        .next()
        .ok_or_else(|| Error::InvalidInput("empty command".into()))?;
    let args: Vec<&str> = words.collect();

    let int = |index: usize| -> intronview::Result<i64> {
        let value = args.get(index).ok_or_else(|| {
            Error::InvalidInput(format!("{}: missing argument {}", name, index + 1))
        })?;
        value
            .parse()
            .map_err(|e| Error::InvalidInput(format!("{}: bad number {:?}: {}", name, value, e)))
    };
    let arity = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "{} takes {} argument(s), got {}",
                name,
                expected,
                args.len()
            )))
        }
    };

    let command = match name {
        "set" => {
            arity(2)?;
            let (start, end) = (int(0)?, int(1)?);
            if start > end {
                return Err(Error::InvalidRange(format!("start {} is after end {}", start, end)));
            }
            Command::Set { start, end }
        }
        "move" => {
            arity(1)?;
            Command::Move { delta: int(0)? }
        }
        "zoom" => {
            arity(1)?;
            let factor: f64 = args[0]
                .parse()
                .map_err(|e| Error::InvalidInput(format!("zoom: bad factor {:?}: {}", args[0], e)))?;
            if !(1.0 / MAX_ZOOM_FACTOR..=MAX_ZOOM_FACTOR).contains(&factor) {
                return Err(Error::InvalidInput(format!(
                    "zoom: factor must be between {} and {}, got {}",
                    1.0 / MAX_ZOOM_FACTOR,
                    MAX_ZOOM_FACTOR,
                    factor
                )));
            }
            Command::Zoom { factor }
        }
        "enable" => {
            arity(0)?;
            Command::Enable
        }
        "disable" => {
            arity(0)?;
            Command::Disable
        }
        "intron" => {
            arity(1)?;
            Command::Intron { length: int(0)? }
        }
        "feature" => {
            arity(2)?;
            Command::Feature {
                start: int(0)?,
                end: int(1)?,
            }
        }
        "show" => {
            arity(0)?;
            Command::Show
        }
        other => return Err(Error::InvalidInput(format!("unknown command {:?}", other))),
    };
    Ok(command)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeatureReport {
    visible: bool,
    clipped: Option<Block>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    transform: Option<String>,
    #[serde(flatten)]
    snapshot: Snapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature: Option<FeatureReport>,
}

fn describe(outcome: &TransformOutcome) -> String {
    match outcome {
        TransformOutcome::Plain(_) => "PLAIN".to_string(),
        TransformOutcome::Applied { kind, .. } => kind.to_string(),
        TransformOutcome::Superseded(kind) => format!("{} (superseded)", kind),
    }
}

async fn run(
    introns: &ShortenedIntronsViewport,
    track: &TrackConfig,
    command: Command,
) -> intronview::Result<Report> {
    let outcome = match command {
        Command::Set { start, end } => {
            Some(introns.transform(TransformRequest::window(start, end)).await?)
        }
        Command::Move { delta } => Some(introns.transform(TransformRequest::pan(delta)).await?),
        Command::Zoom { factor } => {
            let brush = introns.viewport().await.brush;
            let center = brush.midpoint();
            let half = (brush.size() as f64 / factor / 2.0).round() as i64;
            Some(
                introns
                    .transform(TransformRequest::window(
                        center.saturating_sub(half),
                        center.saturating_add(half),
                    ))
                    .await?,
            )
        }
        Command::Enable => {
            introns.enable(track.clone()).await?;
            None
        }
        Command::Disable => {
            introns.disable().await;
            None
        }
        Command::Intron { length } => {
            introns.set_intron_length(length).await?;
            None
        }
        Command::Feature { .. } | Command::Show => None,
    };

    let snapshot = introns.snapshot().await;
    let feature = match command {
        Command::Feature { start, end } => Some(FeatureReport {
            visible: snapshot.check_feature(start, Some(end)),
            clipped: snapshot.transform_feature(Block::new(start, end)),
        }),
        _ => None,
    };

    Ok(Report {
        transform: outcome.as_ref().map(describe),
        snapshot,
        feature,
    })
}

#[cfg(feature = "http")]
fn http_source(config: &Config) -> anyhow::Result<Option<Arc<dyn RangeSource>>> {
    use intronview::source::HttpRangeSource;

    let Some(url) = &config.server_url else {
        return Ok(None);
    };
    tracing::info!("Using exon service at {}", url);
    let source: Arc<dyn RangeSource> = Arc::new(HttpRangeSource::new(
        url,
        config.request_timeout(),
        config.cache_ttl(),
    )?);
    Ok(Some(source))
}

#[cfg(not(feature = "http"))]
fn http_source(config: &Config) -> anyhow::Result<Option<Arc<dyn RangeSource>>> {
    if config.server_url.is_some() {
        tracing::warn!("built without the http feature; ignoring --server-url");
    }
    Ok(None)
}

async fn build_source(config: &Config) -> anyhow::Result<Arc<dyn RangeSource>> {
    if let Some(source) = http_source(config)? {
        return Ok(source);
    }
    let Some(bed) = &config.bed else {
        anyhow::bail!("no exon source configured; pass --bed");
    };
    let mut source = LocalRangeSource::new();
    source
        .load_bed(config.track_id, config.chromosome_id, bed, &config.chromosome_name)
        .await?;
    let source: Arc<dyn RangeSource> = Arc::new(source);
    Ok(source)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // stdout carries the JSON replies
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    config.validate()?;

    let source = build_source(&config).await?;
    let viewport = Viewport::new(config.chromosome_size, config.canvas_width);
    let introns =
        ShortenedIntronsViewport::new(viewport, source).with_intron_length(config.intron_length);

    let mut track = TrackConfig::new(config.track_id, config.chromosome_id);
    if let Some(project_id) = config.project_id {
        track = track.with_project(project_id);
    }
    if let Err(e) = introns.enable(track.clone()).await {
        tracing::warn!("Initial range rebuild failed: {}", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match parse_command(line) {
            Ok(command) => run(&introns, &track, command).await,
            Err(e) => Err(e),
        };
        let body = match reply {
            Ok(report) => serde_json::to_string(&ApiResponse::success(report))?,
            Err(e) => {
                tracing::warn!(error_type = e.error_type(), "{}: {}", line, e);
                serde_json::to_string(&ApiResponse::<Report>::error(e.to_string()))?
            }
        };
        stdout.write_all(body.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
