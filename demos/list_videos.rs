/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */

extern crate dailymotion;

use anyhow::Result;
use dailymotion::api::{Client, Creds, Filters, ListModel, ModelEvent, Status};
use dotenvy::dotenv;
use serde_json::json;

const MAX_PAGES: usize = 3;

// Prints the rows added since `from`
fn print_rows(model: &ListModel, from: usize) {
    for (row, video) in model.items().iter().enumerate().skip(from) {
        println!(
            "{:>3} {} {}",
            row,
            video["id"].as_str().unwrap_or("?"),
            video["title"].as_str().unwrap_or("")
        );
    }
}

// main
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    // Only the client id is needed for public listings.
    let search = std::env::args().nth(1).unwrap_or_else(|| "rust".to_string());
    let client = Client::new(Creds::from_env()?)?;

    let model = client.videos_model();
    let mut events = model.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let ModelEvent::CountChanged(count) = event {
                log::info!("{count} videos loaded");
            }
        }
    });

    let filters: Filters = json!({"search": search, "limit": 10, "sort": "relevance"})
        .as_object()
        .cloned()
        .unwrap_or_default();

    let mut status = model.list("/videos", &filters, &["title"]).await?;
    let mut shown = 0;
    for _ in 0..MAX_PAGES {
        if status != Status::Ready {
            anyhow::bail!("Listing failed: {}: {}", model.error(), model.error_string());
        }
        print_rows(&model, shown);
        shown = model.count();
        if !model.can_fetch_more() {
            break;
        }
        status = model.fetch_more().await?;
    }
    Ok(())
}
