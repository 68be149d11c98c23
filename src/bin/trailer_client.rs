use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use future_trailer::client::{FileStore, FormController, HttpTransport, ImageFile, View};
use future_trailer::consts::GENERATE_TRAILER_PATH;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let endpoint = env::var("TRAILER_ENDPOINT")
        .unwrap_or_else(|_| format!("http://localhost:3000{GENERATE_TRAILER_PATH}"));
    let store_path = env::var("TRAILER_STORE").unwrap_or_else(|_| ".future-trailer.json".into());
    let require_image = env::var("TRAILER_REQUIRE_IMAGE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(true);

    let prompt = env::args().skip(1).collect::<Vec<_>>().join(" ");

    let mut form = FormController::new(
        FileStore::new(store_path),
        HttpTransport::new(endpoint),
        require_image,
    );

    if let Ok(token) = env::var("TRAILER_API_TOKEN") {
        form.set_credential(token)
            .context("Failed to save API token")?;
    }
    if let Ok(image_path) = env::var("TRAILER_IMAGE") {
        let image = ImageFile::from_path(&PathBuf::from(&image_path))
            .await
            .with_context(|| format!("Failed to read image {image_path}"))?;
        form.set_image(Some(image));
    }
    form.set_prompt(prompt);

    if !form.can_submit() {
        bail!(
            "usage: TRAILER_API_TOKEN=... TRAILER_IMAGE=path trailer_client <prompt>\n\
             prompt, API token{} are required",
            if require_image { " and image" } else { "" }
        );
    }

    eprintln!("Generating your video. This may take a few minutes...");
    form.submit().await;

    match form.view() {
        View::Result { script, video_url } => {
            println!("Script: {script}");
            println!("Video: {video_url}");
            Ok(())
        }
        View::Error(message) => bail!("{message}"),
        View::Loading | View::Idle => bail!("generation did not complete"),
    }
}
