//! Re-render an existing image with a new prompt.
//!
//! Requires a running engine at http://127.0.0.1:8188.
//!
//! ```sh
//! cargo run --example img2img -- input.png "an oil painting of a harbor"
//! ```

use std::time::Duration;

use comfy_link::{EngineClient, GenerationRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(input), Some(prompt)) = (args.next(), args.next()) else {
        eprintln!("usage: img2img <input.png> <prompt>");
        return Ok(());
    };

    let client = EngineClient::new("http://127.0.0.1:8188");

    let bytes = std::fs::read(&input)?;
    let stored = client.upload_image(bytes, "img2img-source.png").await?;
    println!("uploaded as {stored}");

    let graph = GenerationRequest::new(prompt)
        .negative("lowres, blurry")
        .denoise(0.6)
        .image_to_image(&stored);

    let images = client.generate(&graph, Duration::from_secs(180)).await?;
    println!("generated {} image(s)", images.len());

    for (i, data) in images.iter().enumerate() {
        let path = format!("img2img-{i}.png");
        std::fs::write(&path, data)?;
        println!("saved {path}");
    }

    Ok(())
}
