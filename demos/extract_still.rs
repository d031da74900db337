//! Extract a still frame from a (simulated) video file.
//!
//! Run with: cargo run --example extract_still [media-path] [artifact-path]

use std::time::Duration;
use stillcast::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let media = args.next().unwrap_or_else(|| "/media/clip.mp4".to_string());
    let artifact = args
        .next()
        .unwrap_or_else(|| std::env::temp_dir().join("still.jpg").display().to_string());
    let extension = media.rsplit('.').next().unwrap_or("").to_string();

    let registry = StageRegistry::new();
    // A 42-second simulated clip; swap in a real framework runtime here.
    let factory = SimFactory::new(SimScript::video(Duration::from_secs(42)));

    let extractor =
        ThumbnailExtractor::new(&registry, &factory, ThumbnailConfig::new(artifact));
    let report = extractor.extract(&media, &extension).await?;

    println!(
        "still frame for {} ({}) written to {}",
        media, report.format, report.artifact
    );
    if let Some(duration) = report.duration {
        println!("stream duration: {}s", duration.as_secs());
    }
    Ok(())
}
