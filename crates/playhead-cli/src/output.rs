//! Output formatting for CLI

use playhead_core::{
    model::format_file_size,
    time::{self, TimeFormat},
    Playlist, Source, Video,
};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// One row of the sources table
#[derive(Serialize, Tabled)]
pub struct SourceRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Delivery")]
    pub delivery: String,
    #[tabled(rename = "Resolution")]
    pub resolution: String,
    #[tabled(rename = "Quality")]
    pub quality: String,
    #[tabled(rename = "Bitrate")]
    pub bitrate: String,
    #[tabled(rename = "Size")]
    pub size: String,
    #[tabled(rename = "URL")]
    pub url: String,
}

impl SourceRow {
    fn new(index: usize, source: &Source) -> Self {
        let resolution = match (source.width, source.height) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ => "-".to_string(),
        };
        Self {
            index,
            delivery: source.delivery_method.to_string(),
            resolution,
            quality: source.quality_level().to_string(),
            bitrate: source
                .estimated_bandwidth_mbps()
                .map(|mbps| format!("{:.2} Mbps", mbps))
                .unwrap_or_else(|| "-".to_string()),
            size: source.size.map(format_file_size).unwrap_or_else(|| "-".to_string()),
            url: source.url.to_string(),
        }
    }
}

/// One row of the playlist table
#[derive(Serialize, Tabled)]
pub struct VideoRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Duration")]
    pub duration: String,
    #[tabled(rename = "Quality")]
    pub quality: String,
    #[tabled(rename = "Sources")]
    pub sources: usize,
}

/// Normalized video summary
#[derive(Serialize)]
pub struct VideoReport {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration: f64,
    pub duration_display: String,
    pub quality: String,
    pub orientation: String,
    pub aspect_ratio: f64,
    pub requires_authentication: bool,
    pub best_source: Option<String>,
    pub sources: Vec<SourceRow>,
}

impl VideoReport {
    pub fn new(video: &Video) -> Self {
        Self {
            id: video.id.clone(),
            name: video.name.clone(),
            description: video.description.clone(),
            duration: video.duration,
            duration_display: time::format_time_as(video.duration, TimeFormat::Verbose),
            quality: video.quality_level().to_string(),
            orientation: format!("{:?}", video.orientation()),
            aspect_ratio: video.aspect_ratio(),
            requires_authentication: video.requires_authentication(),
            best_source: video.best_quality_source().map(|s| s.url.to_string()),
            sources: video
                .sources
                .iter()
                .enumerate()
                .map(|(i, s)| SourceRow::new(i + 1, s))
                .collect(),
        }
    }
}

pub fn to_json<T: Serialize>(data: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

fn render_table<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print a normalized video in the selected format
pub fn print_video(video: &Video, format: OutputFormat) -> anyhow::Result<()> {
    let report = VideoReport::new(video);
    if format == OutputFormat::Json {
        println!("{}", to_json(&report)?);
        return Ok(());
    }

    println!("Video: {}", report.id);
    if let Some(name) = &report.name {
        println!("  Name: {}", name);
    }
    println!("  Duration: {} ({})", time::format_time(report.duration), report.duration_display);
    println!("  Quality: {}", report.quality);
    println!("  Orientation: {} ({:.2})", report.orientation, report.aspect_ratio);
    println!("  Requires auth: {}", report.requires_authentication);
    println!("  Best source: {}", report.best_source.as_deref().unwrap_or("none"));

    if report.sources.is_empty() {
        println!("\nNo playable sources");
    } else if format == OutputFormat::Table {
        println!("\n{}", render_table(&report.sources));
    } else {
        println!("\nSources:");
        for row in &report.sources {
            println!(
                "  {}. {} {} {} - {}",
                row.index, row.delivery, row.resolution, row.bitrate, row.url
            );
        }
    }
    Ok(())
}

/// Print a playlist in the selected format
pub fn print_playlist(playlist: &Playlist, format: OutputFormat) -> anyhow::Result<()> {
    let rows: Vec<VideoRow> = playlist
        .videos
        .iter()
        .enumerate()
        .map(|(i, v)| VideoRow {
            index: i + 1,
            id: v.id.clone(),
            name: v.name.clone().unwrap_or_default(),
            duration: time::format_time(v.duration),
            quality: v.quality_level().to_string(),
            sources: v.sources.len(),
        })
        .collect();

    if format == OutputFormat::Json {
        println!("{}", to_json(&serde_json::json!({
            "id": playlist.id,
            "name": playlist.name,
            "total_duration": playlist.total_duration(),
            "videos": rows,
        }))?);
        return Ok(());
    }

    println!("Playlist: {}", playlist.id);
    if let Some(name) = &playlist.name {
        println!("  Name: {}", name);
    }
    println!("  Videos: {}", playlist.len());
    println!("  Total duration: {}", time::format_time(playlist.total_duration()));

    if format == OutputFormat::Table {
        println!("\n{}", render_table(&rows));
    } else {
        for row in &rows {
            println!("  {}. {} {} [{}]", row.index, row.id, row.name, row.duration);
        }
    }
    Ok(())
}
