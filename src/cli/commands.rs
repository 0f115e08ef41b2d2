use std::path::Path;
use std::sync::Arc;

use chrono::{Local, Utc};

use crate::aggregator::age_of;
use crate::app::{AppContext, Result};
use crate::domain::{FeedItem, RefreshOptions};
use crate::export::{self, ExportFormat};
use crate::freshness;
use crate::scheduler::{self, Scheduler, SchedulerConfig};

pub async fn refresh(ctx: &AppContext, force: bool) -> Result<()> {
    let options = RefreshOptions {
        force_bypass_cache: force,
    };
    let report = ctx.refresh(options).await?;
    println!("Refresh complete: {} items", report.items.len());
    Ok(())
}

pub fn status(ctx: &AppContext) -> Result<()> {
    let metadata = ctx.stored_metadata()?;
    let items = ctx.stored_items()?;

    match metadata.as_ref() {
        Some(meta) => {
            let age = age_of(meta, Utc::now())
                .map(|d| format!("{} min ago", d.num_minutes()))
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "Last refresh: {} ({})",
                meta.last_update_date.as_deref().unwrap_or("-"),
                age
            );
        }
        None => println!("Never refreshed"),
    }
    println!("Stored items: {}", items.len());
    println!(
        "Next load: {}",
        freshness::decide(metadata.as_ref(), Local::now())
    );
    println!("{}", scheduler::scheduler_status());
    Ok(())
}

pub async fn list(ctx: &AppContext, limit: usize) -> Result<()> {
    let load = ctx.load_feed().await?;

    if load.items.is_empty() {
        println!("No items");
    }
    for item in load.items.iter().take(limit) {
        print_item(item);
    }

    if let Some(background) = load.background {
        match background.await {
            Ok(Ok(report)) => eprintln!("Refreshed in background: {} items", report.items.len()),
            Ok(Err(e)) => eprintln!("Background refresh failed: {}", e),
            Err(e) => eprintln!("Background refresh aborted: {}", e),
        }
    }
    Ok(())
}

fn print_item(item: &FeedItem) {
    let pin = if item.is_pinned { "*" } else { " " };
    let date = item
        .published_at
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "          ".to_string());
    let score = item
        .score
        .map(|s| format!(" [{}]", s))
        .unwrap_or_default();

    println!(
        "{} {} {:<12} {}{}\n  {}",
        pin,
        date,
        item.display_source(),
        item.title,
        score,
        item.url
    );
}

pub fn sources(ctx: &AppContext) -> Result<()> {
    let config = ctx.active_config();

    if config.sources.is_empty() {
        println!("No sources configured");
        return Ok(());
    }

    let registry = ctx.aggregator.registry();
    for source in &config.sources {
        let state = if !source.enabled {
            "disabled"
        } else if registry.has(source.source_type.adapter_name()) {
            "enabled"
        } else {
            "no adapter"
        };
        let label = source.name.as_deref().unwrap_or(&source.id);
        println!("{:<16} {:<12} {}", label, source.source_type, state);
        if let Some(url) = &source.url {
            println!("  {}", url);
        }
    }
    Ok(())
}

pub fn export(ctx: &AppContext, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let items = ctx.stored_items()?;
    let content = match format {
        ExportFormat::Json => export::export_json(&ctx.active_config(), &items)?,
        ExportFormat::Csv => export::export_csv(&items, ctx.store.as_ref())?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            println!("Exported {} items to {}", items.len(), path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub fn import(ctx: &AppContext, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let bundle = export::import_json(ctx.store.as_ref(), &content)?;
    println!(
        "Import complete: {} sources, {} items",
        bundle.config.sources.len(),
        bundle.feed_items.len()
    );
    Ok(())
}

pub async fn daemon(ctx: Arc<AppContext>, hour: Option<u32>, no_initial_update: bool) -> Result<()> {
    let config = SchedulerConfig {
        refresh_hour: hour.unwrap_or_else(|| ctx.active_config().refresh_hour),
        update_on_start: !no_initial_update,
    };
    Scheduler::new(ctx, config).run().await
}

pub fn clear(ctx: &AppContext) -> Result<()> {
    let count = ctx.store.keys()?.len();
    ctx.store.clear()?;
    println!("Cleared {} stored entries", count);
    Ok(())
}
