/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

extern crate dailymotion;

use anyhow::Result;
use dailymotion::api::{Client, Creds, Status};
use dotenvy::dotenv;

// main
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let Some(video_id) = std::env::args().nth(1) else {
        anyhow::bail!("usage: video_streams <video id>");
    };

    // Embed pages are public, no credentials needed
    let client = Client::new(Creds::default())?;
    let request = client.streams();
    if request.list(&video_id).await? != Status::Ready {
        anyhow::bail!("{}: {}", request.error(), request.error_string());
    }

    for stream in request.streams()? {
        println!(
            "{:>5} {}x{} {} ({}) {}",
            stream.id, stream.width, stream.height, stream.ext, stream.description, stream.url
        );
    }
    Ok(())
}
