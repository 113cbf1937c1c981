use anyhow::Result;
use evpipeline::{config::PipelineConfig, pipeline, raw::RawStore};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = PipelineConfig::load()?;
    let current_year = cfg.current_year();
    info!(
        raw = %cfg.raw_dir.display(),
        out = %cfg.output_dir.display(),
        current_year,
        "configured"
    );

    // ─── 3) load the raw feed; an unreadable feed aborts before any write ─
    let raw = RawStore::load_dir(&cfg.raw_dir)?;

    // ─── 4) project, validate, publish ───────────────────────────────
    let summary = pipeline::run(&cfg, &raw, current_year)?;
    for path in &summary.published {
        info!("published {}", path.display());
    }

    info!("all done");
    Ok(())
}
