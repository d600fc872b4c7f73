//! Renders a saved plan JSON to video without calling the LLM.
//!
//! ```text
//! render-from-plan plans/eigenvalues.json --quality low --beats 3
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};
use clap::Parser;
use mathviz_config::{Quality, Settings};
use mathviz_core::validator::validate_beats;
use mathviz_core::Plan;
use mathviz_engine::{Job, JobStore, Pipeline, RenderOptions};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "render-from-plan", version, about = "Render a saved mathviz plan without LLM calls")]
struct Args {
    /// Plan JSON with `title` and `beats`
    plan: PathBuf,

    /// Render quality
    #[arg(long, default_value = "low", value_parser = parse_quality)]
    quality: Quality,

    /// Only render the first N beats
    #[arg(long)]
    beats: Option<usize>,

    /// Job id used for output paths (default: plan_<unix seconds>)
    #[arg(long)]
    job_id: Option<String>,

    /// Sarvam voice (default: DEFAULT_VOICE)
    #[arg(long)]
    voice: Option<String>,

    /// Narration language (default: DEFAULT_LANGUAGE)
    #[arg(long)]
    language: Option<String>,

    /// Also re-encode the result to RENDER_RESOLUTION at RENDER_FPS
    #[arg(long)]
    encode: bool,
}

fn parse_quality(s: &str) -> Result<Quality, String> {
    s.parse()
        .map_err(|_| format!("invalid quality '{}', expected low, medium or high", s))
}

fn default_job_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("plan_{}", secs)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let args = Args::parse();
    if !args.plan.exists() {
        bail!("Plan file not found: {}", args.plan.display());
    }

    let started = Instant::now();
    let mut plan = Plan::from_file(&args.plan)?;
    if let Some(n) = args.beats {
        plan.beats.truncate(n);
        info!("Limiting to first {} beats", n);
    }
    info!("Plan: '{}', {} beats", plan.title, plan.beats.len());

    let errors = validate_beats(&plan.beats);
    if !errors.is_empty() {
        let shown: Vec<&str> = errors.iter().take(10).map(String::as_str).collect();
        warn!("Validation warnings:\n{}", shown.join("\n"));
    }

    let settings = Settings::from_env()?;
    settings.ensure_dirs()?;

    let job_id = args.job_id.unwrap_or_else(default_job_id);
    let options = RenderOptions {
        quality: args.quality,
        voice: args.voice.unwrap_or_else(|| settings.default_voice.clone()),
        language: args.language.unwrap_or_else(|| settings.default_language.clone()),
    };

    let jobs = Arc::new(JobStore::new());
    jobs.insert(Job::new(job_id.clone(), plan.title.clone())).await;
    let pipeline = Pipeline::new(Arc::new(settings), jobs);

    let summary = pipeline.render_plan(&job_id, &plan.beats, &options).await?;
    let final_path = if args.encode {
        pipeline.encode_delivery(&summary.final_path).await?
    } else {
        summary.final_path.clone()
    };

    println!("Final video: {}", final_path.display());
    println!(
        "Rendered {} beats ({} dropped) in {:.1}s",
        summary.beats_rendered,
        summary.beats_dropped,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arguments() {
        let args = Args::try_parse_from(["render-from-plan", "plan.json", "--beats", "3", "--quality", "high"]).unwrap();
        assert_eq!(args.plan, PathBuf::from("plan.json"));
        assert_eq!(args.beats, Some(3));
        assert_eq!(args.quality, Quality::High);
        assert!(args.job_id.is_none());
        assert!(!args.encode);
        assert!(Args::try_parse_from(["render-from-plan", "plan.json", "--encode"]).unwrap().encode);
    }

    #[test]
    fn quality_defaults_to_low_and_rejects_unknown() {
        let args = Args::try_parse_from(["render-from-plan", "plan.json"]).unwrap();
        assert_eq!(args.quality, Quality::Low);
        assert!(Args::try_parse_from(["render-from-plan", "p.json", "--quality", "ultra"]).is_err());
    }

    #[test]
    fn default_job_id_is_timestamped() {
        let id = default_job_id();
        assert!(id.starts_with("plan_"));
        assert!(id["plan_".len()..].parse::<u64>().is_ok());
    }
}
