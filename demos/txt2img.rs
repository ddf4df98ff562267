//! Generate a single image from a text prompt.
//!
//! Requires a running engine at http://127.0.0.1:8188.
//!
//! ```sh
//! cargo run --example txt2img
//! ```

use comfy_link::{EngineClient, GenerationRequest, DEFAULT_WAIT};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = EngineClient::new("http://127.0.0.1:8188");

    let graph = GenerationRequest::new("a lighthouse on a cliff at dusk, dramatic sky")
        .negative("lowres, blurry, bad anatomy")
        .steps(25)
        .cfg(7.5)
        .size(768, 512)
        .text_to_image();

    let job_id = client.submit(&graph).await?;
    println!("queued job {job_id}");

    let history = client.await_completion(&job_id, DEFAULT_WAIT).await?;
    let images = client.collect_artifacts(&history).await?;
    println!("generated {} image(s)", images.len());

    for (i, bytes) in images.iter().enumerate() {
        let path = format!("txt2img-{i}.png");
        std::fs::write(&path, bytes)?;
        println!("saved {path}");
    }

    Ok(())
}
