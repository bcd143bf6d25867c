use chrono::Local;
use runlens_core::context::AppConfigExt;
use runlens_core::{CategoryOrder, Distribution, Record, RowKind, SubtypeKey};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

use runlens_core::RecordFeed;

use crate::CliContext;

// ─────────────────────────────────────────────────────────────────────────────
// Dataset
// ─────────────────────────────────────────────────────────────────────────────

pub async fn load(path: &str, ctx: &CliContext) {
    let path = PathBuf::from(path);
    let feed = match RecordFeed::load(&path) {
        Ok(feed) => feed,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };

    let session = ctx.session();
    let mut s = session.write().await;
    s.engine_mut().set_records(feed);
    let engine = s.engine();
    println!(
        "loaded {} records ({} categories), {} pass the current selection",
        engine.feed().all().len(),
        engine.taxonomy().len(),
        engine.filtered_bots().len()
    );
    drop(s);

    *ctx.feed_path.write().await = Some(path);
}

pub async fn reload(ctx: &CliContext) {
    let path = ctx.feed_path.read().await.clone();
    match path {
        Some(path) => load(&path.to_string_lossy(), ctx).await,
        None => println!("No record feed loaded"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Selection
// ─────────────────────────────────────────────────────────────────────────────

pub async fn select(category: &str, ctx: &CliContext) {
    let session = ctx.session();
    let mut s = session.write().await;
    if !s.engine().taxonomy().contains(category) {
        println!("Unknown category: {}", category);
        return;
    }
    s.engine_mut().add_error_value(category);
    print_count(s.engine().filtered_bots());
}

pub async fn deselect(category: &str, ctx: &CliContext) {
    let session = ctx.session();
    let mut s = session.write().await;
    s.engine_mut().remove_error_value(category);
    print_count(s.engine().filtered_bots());
}

pub async fn expand(category: &str, ctx: &CliContext) {
    let session = ctx.session();
    let mut s = session.write().await;
    if !s.engine_mut().expand(category) {
        println!("{} has no subtypes to expand", category);
    }
}

pub async fn collapse(category: &str, ctx: &CliContext) {
    let session = ctx.session();
    let mut s = session.write().await;
    s.engine_mut().collapse(category);
    print_count(s.engine().filtered_bots());
}

pub async fn subtype(key: &str, ctx: &CliContext) {
    let Some(key) = SubtypeKey::parse(key) else {
        println!("Invalid subtype key '{}', expected <category>::<label>", key);
        return;
    };
    let session = ctx.session();
    let mut s = session.write().await;
    s.engine_mut().add_subtype(key);
    print_count(s.engine().filtered_bots());
}

pub async fn unsubtype(key: &str, ctx: &CliContext) {
    let Some(key) = SubtypeKey::parse(key) else {
        println!("Invalid subtype key '{}', expected <category>::<label>", key);
        return;
    };
    let session = ctx.session();
    let mut s = session.write().await;
    s.engine_mut().remove_subtype(&key);
    print_count(s.engine().filtered_bots());
}

pub async fn select_all(ctx: &CliContext) {
    let session = ctx.session();
    let mut s = session.write().await;
    let all = s.engine().taxonomy().available();
    s.engine_mut().select_all(all);
    print_count(s.engine().filtered_bots());
}

pub async fn select_none(ctx: &CliContext) {
    let session = ctx.session();
    let mut s = session.write().await;
    s.engine_mut().select_none();
    print_count(s.engine().filtered_bots());
}

pub async fn select_default(ctx: &CliContext) {
    let session = ctx.session();
    let mut s = session.write().await;
    s.engine_mut().select_default();
    print_count(s.engine().filtered_bots());
}

fn print_count(filtered: &[Record]) {
    println!("{} records pass", filtered.len());
}

// ─────────────────────────────────────────────────────────────────────────────
// Views
// ─────────────────────────────────────────────────────────────────────────────

pub async fn show(order: Option<&str>, ctx: &CliContext) {
    let session = ctx.session();
    let mut s = session.write().await;
    if let Some(order) = order {
        s.set_order(CategoryOrder::from_input(order));
    }
    let dist = s.distribution();
    if dist.rows.is_empty() {
        println!("No errors or warnings in the dataset");
        return;
    }
    for line in format_distribution(&dist, s.engine().selected_error_values()) {
        println!("{}", line);
    }
}

/// Render distribution rows with their index, which `hover`/`click` refer to
pub fn format_distribution(dist: &Distribution, selected: &BTreeSet<String>) -> Vec<String> {
    let mut lines = vec![format!(
        "{:>3}  {:<40} {:>7} {:>7}",
        "#", "Category", "Count", "%"
    )];
    lines.push("-".repeat(60));

    for (idx, row) in dist.rows.iter().enumerate() {
        let label = match &row.kind {
            RowKind::Category {
                expandable,
                expanded,
            } => {
                let check = if selected.contains(&row.name) { "x" } else { " " };
                let marker = match (expandable, expanded) {
                    (true, true) => "-",
                    (true, false) => "+",
                    (false, _) => " ",
                };
                format!("[{}] {} {}", check, marker, row.name)
            }
            RowKind::Subtype { .. } => format!("        {}", row.name),
        };
        lines.push(format!(
            "{:>3}  {:<40} {:>7} {:>6.1}%",
            idx, label, row.count, row.percentage
        ));
    }
    lines.push(format!("{} errors/warnings in scope", dist.total_in_scope));
    lines
}

pub async fn show_filtered(ctx: &CliContext) {
    let session = ctx.session();
    let s = session.read().await;
    let filtered = s.engine().filtered_bots();

    println!("{:<24} {:<8} {:<24} {:<20} Message", "Id", "Status", "Value", "Started");
    println!("{}", "-".repeat(100));
    for record in filtered {
        let started = record
            .started_at
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<8} {:<24} {:<20} {}",
            record.id,
            record.status.kind().as_str(),
            record.status.value(),
            started,
            record.status.message()
        );
    }
    println!("{} of {} records", filtered.len(), s.engine().feed().page().len());
}

pub async fn show_selection(ctx: &CliContext) {
    let session = ctx.session();
    let s = session.read().await;
    let engine = s.engine();

    let join = |items: Vec<&str>| {
        if items.is_empty() {
            "(none)".to_string()
        } else {
            items.join(", ")
        }
    };
    println!(
        "categories: {}",
        join(engine.selected_error_values().iter().map(String::as_str).collect())
    );
    println!(
        "subtypes:   {}",
        join(engine.selected_subtypes().iter().map(SubtypeKey::as_str).collect())
    );
    println!(
        "expanded:   {}",
        join(engine.expanded_categories().iter().map(String::as_str).collect())
    );
    println!("filtering:  {}", engine.bots_filtered_by_error());
}

// ─────────────────────────────────────────────────────────────────────────────
// Interaction
// ─────────────────────────────────────────────────────────────────────────────

pub async fn hover(index: usize, ctx: &CliContext) -> Result<(), String> {
    let session = ctx.session();
    let s = session.read().await;
    let dist = s.distribution();
    let row = dist
        .rows
        .get(index)
        .ok_or_else(|| format!("No row {}", index))?;
    s.bridge()
        .on_segment_hover(row.record_ids.clone())
        .map_err(|e| e.to_string())
}

pub async fn leave(ctx: &CliContext) -> Result<(), String> {
    let session = ctx.session();
    let s = session.read().await;
    s.bridge().on_segment_leave().map_err(|e| e.to_string())
}

pub async fn click(index: usize, ctx: &CliContext) -> Result<(), String> {
    let session = ctx.session();
    let s = session.read().await;
    let dist = s.distribution();
    let row = dist
        .rows
        .get(index)
        .ok_or_else(|| format!("No row {}", index))?;
    s.bridge()
        .on_segment_click(row.record_ids.clone())
        .map_err(|e| e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Misc
// ─────────────────────────────────────────────────────────────────────────────

pub async fn show_settings(ctx: &CliContext) {
    let config = ctx.config.read().await;
    println!("storage directory:   {}", config.storage_path().display());
    println!(
        "excluded by default: {}",
        config.default_excluded_categories.join(", ")
    );
    println!("hover delay:         {}ms", config.hover_coalesce_ms);
    println!("category order:      {:?}", config.category_order);
    println!("watch storage:       {}", config.watch_storage);
}

pub fn exit() {
    println!("quitting...");
    let _ = std::io::stdout().flush();
}
