//! Camera stand-in: POST image files to a running sortcam server.
//!
//! Usage:
//!   cargo run --bin camsim -- http://localhost:8000/upload photo1.jpg [photo2.jpg ...]
//!
//! Each file is sent as a raw request body, one after another, and the reply
//! is printed. Files listed together are sent sequentially, so none of them
//! should see `BUSY` unless another client is uploading too.

use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or("usage: camsim <upload-url> <image-file>...")?;
    let files: Vec<String> = args.collect();
    if files.is_empty() {
        return Err("no image files given".into());
    }

    let client = reqwest::Client::new();

    for path in files {
        let bytes = tokio::fs::read(&path).await?;
        println!("📷 {} ({} bytes)", path, bytes.len());

        let start = Instant::now();
        let response = client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        println!("   {} in {:?}", status, start.elapsed());
        for line in text.lines() {
            println!("   {}", line);
        }
    }

    Ok(())
}
