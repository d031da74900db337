//! Drive a (simulated) streaming pipeline from the keyboard.
//!
//! Run with: cargo run --example live_control [media-path]
//! Then type single-letter commands; `k` prints the help.

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

    let media = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/media/clip.mp4".to_string());
    let extension = media.rsplit('.').next().unwrap_or("");
    let format = ContainerFormat::from_extension(extension)
        .ok_or_else(|| Error::UnsupportedFormat(extension.to_string()))?;

    let registry = StageRegistry::new();
    let factory = SimFactory::new(SimScript::video(Duration::from_secs(300)));

    let recipe = recipe::live_recipe(format);
    let mut instance =
        PipelineBuilder::new(&registry, &factory).build(&recipe, &BuildEndpoints::playback(&*media))?;
    instance.set_state(PipelineState::Playing)?;

    println!("playing {media}; press k<enter> for the command list");
    let session = LiveSession::new(instance, media);
    let exit = session
        .run(tokio::io::BufReader::new(tokio::io::stdin()))
        .await?;

    match exit {
        LoopExit::Quit => println!("bye"),
        LoopExit::Next => println!("ready for the next item"),
        LoopExit::Finished => println!("stream finished"),
    }
    Ok(())
}
