//! CLI command implementations

use crate::output::{self, OutputFormat};
use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use playhead_core::{
    time, InMemoryGateway, LifecycleKind, LookupGateway, Phase, PlaybackState, Player,
    PlayerConfig, RawVideo, SimulatedEngine, Video,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

/// Duration assumed when the metadata does not carry one
const FALLBACK_DURATION: f64 = 60.0;

fn read_video(path: &Path) -> anyhow::Result<Video> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(Video::from_raw(&RawVideo::from_json(value)))
}

/// Build a player backed by a local catalog, the playback API, or nothing
fn build_player(config: Option<PathBuf>, catalog: Option<PathBuf>) -> anyhow::Result<Player> {
    let config = match config {
        Some(path) => PlayerConfig::from_json_file(&path)?,
        None => PlayerConfig::default(),
    };
    let engine = Arc::new(SimulatedEngine::new());

    let player = match catalog {
        Some(path) => {
            let gateway = InMemoryGateway::from_json_file(&path)
                .with_context(|| format!("failed to load catalog {}", path.display()))?;
            info!(videos = gateway.video_count(), "Using local catalog");
            let gateway: Arc<dyn LookupGateway> = Arc::new(gateway);
            Player::with_gateway(config, engine, Some(gateway))?
        }
        None => Player::new(config, engine)?,
    };
    Ok(player)
}

/// Normalize a metadata file
pub fn inspect(path: &Path, format: &str) -> anyhow::Result<()> {
    let video = read_video(path)?;
    output::print_video(&video, OutputFormat::from(format))
}

/// Resolve a video by id or reference id
pub async fn lookup(
    id: &str,
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    reference: bool,
    format: &str,
) -> anyhow::Result<()> {
    let player = build_player(config, catalog)?;

    let video = if reference {
        player.load_video_by_reference_id(id).await?
    } else {
        player.load_video_by_id(id).await?
    };

    output::print_video(&video, OutputFormat::from(format))
}

/// Resolve a playlist
pub async fn playlist(
    id: &str,
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    format: &str,
) -> anyhow::Result<()> {
    let player = build_player(config, catalog)?;
    let playlist = player.fetch_playlist(id).await?;
    output::print_playlist(&playlist, OutputFormat::from(format))
}

async fn settle(
    rx: &mut watch::Receiver<PlaybackState>,
    until: impl FnMut(&PlaybackState) -> bool,
) -> anyhow::Result<PlaybackState> {
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(until))
        .await
        .context("player did not reach the expected state")??;
    Ok(state.clone())
}

/// Drive a player through one scripted session
pub async fn simulate(input: &str, step: f64, fail_at: Option<f64>, format: &str) -> anyhow::Result<()> {
    if !(step.is_finite() && step > 0.0) {
        bail!("--step must be a positive number of seconds");
    }
    let format = OutputFormat::from(format);

    let engine = SimulatedEngine::new();
    let player = Player::url_only(Arc::new(engine.clone()));
    let mut rx = player.subscribe();

    let video = match Url::parse(input) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => player.load_video_by_url(url),
        _ => {
            let video = read_video(Path::new(input))?;
            player.set_videos(vec![video.clone()]);
            video
        }
    };

    let duration = if video.duration > 0.0 { video.duration } else { FALLBACK_DURATION };
    let bar = if format == OutputFormat::Json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new((duration * 1000.0) as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {msg}")?.progress_chars("=> "),
        );
        bar
    };

    let mut last_phase = player.phase();
    let mut report = |state: &PlaybackState, bar: &ProgressBar| {
        if state.phase != last_phase {
            bar.println(format!("phase: {} -> {}", last_phase, state.phase));
            last_phase = state.phase;
        }
        bar.set_position((state.current_time * 1000.0) as u64);
        bar.set_message(format!(
            "{} {}",
            time::format_progress_with_time(state.current_time, state.duration),
            time::format_progress(state.progress),
        ));
    };

    report(&player.state(), &bar);

    engine.emit_duration(duration);
    player.play();
    engine.emit_lifecycle(LifecycleKind::Play, None);
    let state = settle(&mut rx, |s| s.duration == duration).await?;
    report(&state, &bar);

    let mut position = 0.0;
    loop {
        position = (position + step).min(duration);

        if let Some(fail_at) = fail_at.filter(|t| position >= *t) {
            let detail = format!("simulated failure at {}", time::format_time(fail_at));
            engine.emit_lifecycle(LifecycleKind::Fail, Some(&detail));
            let state = settle(&mut rx, |s| s.phase == Phase::Error).await?;
            report(&state, &bar);
            break;
        }

        debug!(position, "Emitting progress");
        engine.emit_progress(position);
        let state = settle(&mut rx, |s| s.current_time == position).await?;
        report(&state, &bar);

        if position >= duration {
            engine.emit_lifecycle(LifecycleKind::End, None);
            let state = settle(&mut rx, |s| s.phase == Phase::Ended).await?;
            report(&state, &bar);
            break;
        }
    }
    bar.finish_and_clear();

    let state = player.state();
    if format == OutputFormat::Json {
        println!("{}", output::to_json(&state)?);
    } else {
        println!("Final phase: {}", state.phase);
        println!("Position: {}", time::format_progress_with_time(state.current_time, state.duration));
        if let Some(error) = &state.last_error {
            println!("Last error: {} ({})", error, error.error_code());
        }
    }
    Ok(())
}
