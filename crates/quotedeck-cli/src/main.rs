use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use quotedeck_client::batch::{self, BatchPacing, BatchReport, ItemOutcome};
use quotedeck_client::dedup;
use quotedeck_client::text::ellipsize;
use quotedeck_client::{
    ListParams, ListingSnapshot, QuoteListing, QuoteStore, StoreAuth, StoreError,
};
use quotedeck_core::{AppConfig, ExitCode, Quote, QuoteDraft, SortField, SortSpec};

/// Page size used when walking the whole store for an export.
const EXPORT_PAGE_LIMIT: usize = 1000;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "quotedeck",
    about = "Admin and reader tools for the remote quote store",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for AI agents and scripts).
    /// Also enabled by setting QUOTEDECK_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List quotes, newest first unless configured otherwise.
    List {
        /// Page size (defaults to the configured value).
        #[arg(long)]
        limit: Option<usize>,
        /// Sort field: quote, author, created_at, updated_at. Persisted.
        #[arg(long)]
        sort: Option<String>,
        /// Sort direction: asc or desc. Persisted.
        #[arg(long)]
        order: Option<String>,
        /// How many pages to fetch via cursor continuation.
        #[arg(long, default_value = "1")]
        pages: usize,
    },

    /// Search quotes by text, author, or tag.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        /// Sort field: quote, author, created_at, updated_at. Persisted.
        #[arg(long)]
        sort: Option<String>,
        /// Sort direction: asc or desc. Persisted.
        #[arg(long)]
        order: Option<String>,
        #[arg(long, default_value = "1")]
        pages: usize,
    },

    /// Fetch one quote by id (falls back to a random quote if it is gone).
    Get { id: String },

    /// Fetch a random quote.
    Random,

    /// Create a quote. Rejected with the collision report if the store
    /// already holds something too similar.
    Add {
        text: String,
        author: String,
        #[arg(long, action = clap::ArgAction::Append)]
        tag: Vec<String>,
    },

    /// Update a quote. Omitted fields keep their current value.
    Update {
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        author: Option<String>,
        /// Replacement tag set; repeat for several tags.
        #[arg(long, action = clap::ArgAction::Append)]
        tag: Vec<String>,
    },

    /// Delete one or more quotes.
    Delete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
        #[arg(long)]
        confirm: bool,
    },

    /// Scan a page of quotes for duplicate groups.
    Duplicates {
        /// How many quotes to scan (defaults to the configured page size).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ask the store whether a quote would be rejected as a duplicate.
    /// Exits 7 when it would be.
    Check { text: String, author: String },

    /// Tag management.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Import quotes from a JSON file (an array of {quote, author, tags}).
    Import { file: String },

    /// Export every quote as a JSON array.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<String>,
    },

    /// Attach a custom share image to a quote.
    SetImage { id: String, url: String },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run diagnostics.
    Doctor,

    /// Show version information.
    Version,
}

// ─── Tag Actions ────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum TagAction {
    /// List all tags with usage counts.
    List,
    /// Register a tag.
    Add { name: String },
    /// Rename a tag across every quote carrying it.
    Rename { old: String, new: String },
    /// Delete a tag from the registry and from every quote.
    Delete {
        name: String,
        #[arg(long)]
        confirm: bool,
    },
    /// Remove registered tags no quote uses anymore.
    Cleanup,
}

// ─── Config Actions ─────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Get a specific config key.
    Get { key: String },
    /// Set a config key and save the file.
    Set { key: String, value: String },
}

// ─── Main ───────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ── Env var overrides ──────────────────────────────────────────────────
    let json_output = cli.json || std::env::var("QUOTEDECK_JSON").as_deref() == Ok("1");

    // Load config (honors QUOTEDECK_API_URL if set)
    let mut config = AppConfig::load()?;
    if let Ok(url) = std::env::var("QUOTEDECK_API_URL") {
        if !url.is_empty() {
            config.api.base_url = url;
        }
    }

    match cli.command {
        Commands::List { limit, sort, order, pages } => {
            let (spec, changed) = resolve_sort(&config, sort.as_deref(), order.as_deref());
            if changed {
                persist_sort(&mut config, spec);
            }
            let page_size = limit.unwrap_or(config.list.page_size).clamp(1, 1000);

            let listing = QuoteListing::new(Arc::new(open_store(&config)), page_size, spec);
            listing.refresh().await;
            for _ in 1..pages.max(1) {
                listing.load_more().await;
            }
            finish_listing(listing.snapshot().await, json_output, start)?;
        }

        Commands::Search { query, limit, sort, order, pages } => {
            let (spec, changed) = resolve_sort(&config, sort.as_deref(), order.as_deref());
            if changed {
                persist_sort(&mut config, spec);
            }
            let page_size = limit.unwrap_or(config.list.page_size).clamp(1, 1000);

            let listing = QuoteListing::new(Arc::new(open_store(&config)), page_size, spec);
            listing.set_query(&query).await;
            for _ in 1..pages.max(1) {
                listing.load_more().await;
            }
            finish_listing(listing.snapshot().await, json_output, start)?;
        }

        Commands::Get { id } => {
            let store = open_store(&config);
            match store.fetch_quote_by_id(&id).await {
                Ok(quote) => {
                    let dur = start.elapsed().as_millis();
                    let fallback = quote.id != id;
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "quote": quote, "fallback": fallback },
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        if fallback {
                            println!("Quote {id} not found; showing a random one instead.\n");
                        }
                        println!("\u{201c}{}\u{201d}", quote.text);
                        println!("    — {}", quote.author);
                        if !quote.tags.is_empty() {
                            println!("    #{}", quote.tags.join(" #"));
                        }
                        println!("    id: {}  created: {}", quote.id, quote.created_at);
                    }
                }
                Err(e) => fail(&e, json_output, start),
            }
        }

        Commands::Random => {
            let store = open_store(&config);
            match store.fetch_random_quote().await {
                Ok(quote) => {
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": quote,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        println!("\u{201c}{}\u{201d}", quote.text);
                        println!("    — {}", quote.author);
                    }
                }
                Err(e) => fail(&e, json_output, start),
            }
        }

        Commands::Add { text, author, tag } => {
            let store = open_store(&config);
            let mut draft = QuoteDraft::new(text, author);
            draft.tags = tag;
            match store.create_quote(&draft).await {
                Ok(quote) => {
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": quote,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        println!("Added: {} ({})", ellipsize(&quote.text, 60), quote.id);
                    }
                }
                Err(StoreError::DuplicateDetected(report)) => {
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "error",
                            "error": "duplicate",
                            "message": report.message,
                            "data": report,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        eprintln!("Rejected: {}", report.message);
                        for d in &report.duplicates {
                            eprintln!(
                                "  {}  {:<50}  — {}  [{}]",
                                short_id(&d.id),
                                ellipsize(&d.text, 50),
                                d.author,
                                d.match_reason.as_deref().unwrap_or("similar")
                            );
                        }
                    }
                    std::process::exit(ExitCode::Conflict as i32);
                }
                Err(e) => fail(&e, json_output, start),
            }
        }

        Commands::Update { id, text, author, tag } => {
            let store = open_store(&config);
            // The service has no admin read-by-id, so fetch through the
            // public endpoint and reject the random fallback as not-found.
            let current = match store.fetch_quote_by_id(&id).await {
                Ok(q) if q.id == id => q,
                Ok(_) => {
                    let e = StoreError::NotFound(format!("quote {id}"));
                    fail(&e, json_output, start)
                }
                Err(e) => fail(&e, json_output, start),
            };

            let draft = QuoteDraft {
                text: text.unwrap_or(current.text),
                author: author.unwrap_or(current.author),
                tags: if tag.is_empty() { current.tags } else { tag },
            };
            match store.update_quote(&id, &draft).await {
                Ok(quote) => {
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": quote,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        println!("Updated: {} ({})", ellipsize(&quote.text, 60), quote.id);
                    }
                }
                Err(e) => fail(&e, json_output, start),
            }
        }

        Commands::Delete { ids, confirm } => {
            if !confirm {
                eprintln!("Add --confirm to delete without prompt.");
                std::process::exit(ExitCode::ConfirmRequired as i32);
            }
            let store = open_store(&config);
            if ids.len() == 1 {
                match store.delete_quote(&ids[0]).await {
                    Ok(deleted) => {
                        let dur = start.elapsed().as_millis();
                        if json_output {
                            print_json(&serde_json::json!({
                                "status": "ok",
                                "data": { "deleted": deleted },
                                "meta": { "duration_ms": dur }
                            }))?;
                        } else {
                            println!("Deleted quote: {deleted}");
                        }
                    }
                    Err(e) => fail(&e, json_output, start),
                }
            } else {
                let report =
                    batch::delete_quotes(&store, &ids, &BatchPacing::delete_profile()).await;
                finish_batch("delete", &report, json_output, start)?;
            }
        }

        Commands::Duplicates { limit } => {
            let store = open_store(&config);
            let scan_limit = limit.unwrap_or(config.list.page_size).clamp(1, 1000);
            let spec = config.sort_spec().unwrap_or_default();
            let page = match store.list_quotes(&ListParams::new(scan_limit, spec)).await {
                Ok(p) => p,
                Err(e) => fail(&e, json_output, start),
            };
            let groups = dedup::find_duplicate_groups(&page.quotes);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": {
                        "groups": groups,
                        "count": groups.len(),
                        "scanned": page.quotes.len()
                    },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if groups.is_empty() {
                println!("No duplicates among {} quote(s).", page.quotes.len());
            } else {
                for (i, group) in groups.iter().enumerate() {
                    println!("Group {} ({} quotes):", i + 1, group.len());
                    let anchor = &group.quotes[0];
                    for quote in &group.quotes {
                        let reason = if quote.id == anchor.id {
                            "anchor".to_string()
                        } else {
                            dedup::judge(anchor, quote)
                                .map(|r| r.to_string())
                                .unwrap_or_else(|| "similar".to_string())
                        };
                        println!(
                            "  {}  {:<50}  — {}  [{}]",
                            short_id(&quote.id),
                            ellipsize(&quote.text, 50),
                            quote.author,
                            reason
                        );
                    }
                    println!();
                }
                println!(
                    "{} duplicate group(s) among {} quote(s).",
                    groups.len(),
                    page.quotes.len()
                );
            }
        }

        Commands::Check { text, author } => {
            let store = open_store(&config);
            match store.check_duplicate(&text, &author).await {
                Ok(report) => {
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": report,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else if report.is_duplicate {
                        println!("{}", report.message);
                        for d in &report.duplicates {
                            println!(
                                "  {}  {:<50}  — {}  [{}]",
                                short_id(&d.id),
                                ellipsize(&d.text, 50),
                                d.author,
                                d.match_reason.as_deref().unwrap_or("similar")
                            );
                        }
                    } else {
                        println!("No duplicates found.");
                    }
                    if report.is_duplicate {
                        std::process::exit(ExitCode::Conflict as i32);
                    }
                }
                Err(e) => fail(&e, json_output, start),
            }
        }

        // ── Tag ────────────────────────────────────────────────────────────

        Commands::Tag { action } => match action {
            TagAction::List => {
                let store = open_store(&config);
                match store.get_tags_with_metadata().await {
                    Ok(tags) => {
                        let dur = start.elapsed().as_millis();
                        if json_output {
                            print_json(&serde_json::json!({
                                "status": "ok",
                                "data": { "tags": tags, "count": tags.len() },
                                "meta": { "duration_ms": dur }
                            }))?;
                        } else if tags.is_empty() {
                            println!("No tags.");
                        } else {
                            for tag in &tags {
                                println!("  #{} ({})", tag.name, tag.quote_count);
                            }
                        }
                    }
                    Err(e) => fail(&e, json_output, start),
                }
            }
            TagAction::Add { name } => {
                let store = open_store(&config);
                match store.add_tag(&name).await {
                    Ok(all_tags) => {
                        let dur = start.elapsed().as_millis();
                        if json_output {
                            print_json(&serde_json::json!({
                                "status": "ok",
                                "data": { "added": name, "all_tags": all_tags },
                                "meta": { "duration_ms": dur }
                            }))?;
                        } else {
                            println!("Added tag '#{name}' ({} total).", all_tags.len());
                        }
                    }
                    Err(e) => fail(&e, json_output, start),
                }
            }
            TagAction::Rename { old, new } => {
                let store = open_store(&config);
                match store.rename_tag(&old, &new).await {
                    Ok(updated) => {
                        let dur = start.elapsed().as_millis();
                        if json_output {
                            print_json(&serde_json::json!({
                                "status": "ok",
                                "data": { "old": old, "new": new, "quotes_updated": updated },
                                "meta": { "duration_ms": dur }
                            }))?;
                        } else {
                            println!("Renamed tag '#{old}' → '#{new}' on {updated} quote(s).");
                        }
                    }
                    Err(e) => fail(&e, json_output, start),
                }
            }
            TagAction::Delete { name, confirm } => {
                if !confirm {
                    eprintln!("Add --confirm to delete the tag from every quote.");
                    std::process::exit(ExitCode::ConfirmRequired as i32);
                }
                let store = open_store(&config);
                match store.delete_tag(&name).await {
                    Ok(updated) => {
                        let dur = start.elapsed().as_millis();
                        if json_output {
                            print_json(&serde_json::json!({
                                "status": "ok",
                                "data": { "deleted": name, "quotes_updated": updated },
                                "meta": { "duration_ms": dur }
                            }))?;
                        } else {
                            println!("Deleted tag '#{name}' from {updated} quote(s).");
                        }
                    }
                    Err(e) => fail(&e, json_output, start),
                }
            }
            TagAction::Cleanup => {
                let store = open_store(&config);
                match store.cleanup_unused_tags().await {
                    Ok(report) => {
                        let dur = start.elapsed().as_millis();
                        if json_output {
                            print_json(&serde_json::json!({
                                "status": "ok",
                                "data": report,
                                "meta": { "duration_ms": dur }
                            }))?;
                        } else if report.removed_tags.is_empty() {
                            println!("No unused tags.");
                        } else {
                            println!(
                                "Removed {} unused tag(s): {}",
                                report.count_removed,
                                report.removed_tags.join(", ")
                            );
                            println!("{} tag(s) remain.", report.count_remaining);
                        }
                    }
                    Err(e) => fail(&e, json_output, start),
                }
            }
        },

        // ── Import / Export ────────────────────────────────────────────────

        Commands::Import { file } => {
            let raw = match std::fs::read_to_string(&file) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Cannot read {file}: {e}");
                    std::process::exit(ExitCode::FileSystemError as i32);
                }
            };
            // Accepts a bare array or this tool's own export dump.
            let parsed: serde_json::Value = match serde_json::from_str(&raw) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("Invalid import file {file}: {e}");
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
            };
            let node = match parsed {
                serde_json::Value::Object(mut map) if map.contains_key("quotes") => {
                    map.remove("quotes").unwrap_or(serde_json::Value::Null)
                }
                other => other,
            };
            let drafts: Vec<QuoteDraft> = match serde_json::from_value(node) {
                Ok(d) => d,
                Err(e) => {
                    eprintln!("Invalid import file {file}: {e}");
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
            };
            if drafts.is_empty() {
                println!("Nothing to import.");
            } else {
                if !json_output {
                    println!(
                        "Importing {} quote(s); writes are paced to respect the store's rate limit.",
                        drafts.len()
                    );
                }
                let store = open_store(&config);
                let report = batch::import_quotes(&store, &drafts, &BatchPacing::default()).await;
                finish_batch("import", &report, json_output, start)?;
            }
        }

        Commands::Export { output } => {
            let store = open_store(&config);
            let spec = config.sort_spec().unwrap_or_default();
            let mut params = ListParams::new(EXPORT_PAGE_LIMIT, spec);
            let mut all: Vec<Quote> = Vec::new();
            loop {
                let page = match store.list_quotes(&params).await {
                    Ok(p) => p,
                    Err(e) => fail(&e, json_output, start),
                };
                all.extend(page.quotes);
                match (page.has_more, page.last_key) {
                    (true, Some(key)) => params.cursor = Some(key),
                    _ => break,
                }
            }
            let body = serde_json::to_string_pretty(&export_dump(&all))?;
            let dur = start.elapsed().as_millis();

            match output {
                Some(path) => {
                    if let Err(e) = std::fs::write(&path, &body) {
                        eprintln!("Cannot write {path}: {e}");
                        std::process::exit(ExitCode::FileSystemError as i32);
                    }
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "exported": all.len(), "output": path },
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        println!("Exported {} quote(s) to {path}.", all.len());
                    }
                }
                None => println!("{body}"),
            }
        }

        Commands::SetImage { id, url } => {
            let store = open_store(&config);
            match store.save_custom_image(&id, &url).await {
                Ok(()) => {
                    let dur = start.elapsed().as_millis();
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "id": id, "image_url": url },
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        println!("Image saved for quote {id}.");
                    }
                }
                Err(e) => fail(&e, json_output, start),
            }
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => {
            let dur = start.elapsed().as_millis();
            match action {
                ConfigAction::List => {
                    let kv = config_key_values(&config);
                    if json_output {
                        let map: serde_json::Map<String, serde_json::Value> = kv
                            .iter()
                            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                            .collect();
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": map,
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        for (k, v) in &kv {
                            println!("{k} = {v}");
                        }
                    }
                }
                ConfigAction::Get { key } => {
                    let kv = config_key_values(&config);
                    match kv.iter().find(|(k, _)| *k == key.as_str()) {
                        Some((_, val)) => {
                            if json_output {
                                print_json(&serde_json::json!({
                                    "status": "ok",
                                    "data": { "key": key, "value": val },
                                    "meta": { "duration_ms": dur }
                                }))?;
                            } else {
                                println!("{val}");
                            }
                        }
                        None => {
                            eprintln!("Unknown config key: {key}");
                            std::process::exit(ExitCode::NotFound as i32);
                        }
                    }
                }
                ConfigAction::Set { key, value } => {
                    match key.as_str() {
                        "api.base_url" => config.api.base_url = value.clone(),
                        "api.token_env" => config.api.token_env = value.clone(),
                        "api.api_key_env" => config.api.api_key_env = value.clone(),
                        "list.page_size" => match value.parse::<usize>() {
                            Ok(n) if n >= 1 => config.list.page_size = n,
                            _ => {
                                eprintln!("Invalid page size: {value}");
                                std::process::exit(ExitCode::InvalidArgs as i32);
                            }
                        },
                        "list.sort_field" => match value.parse::<SortField>() {
                            Ok(f) => config.list.sort_field = f.as_param().to_string(),
                            Err(e) => {
                                eprintln!("{e}");
                                std::process::exit(ExitCode::InvalidArgs as i32);
                            }
                        },
                        "list.sort_ascending" => match value.parse::<bool>() {
                            Ok(b) => config.list.sort_ascending = b,
                            Err(_) => {
                                eprintln!("Invalid boolean: {value}");
                                std::process::exit(ExitCode::InvalidArgs as i32);
                            }
                        },
                        _ => {
                            eprintln!("Unknown config key: {key}");
                            std::process::exit(ExitCode::NotFound as i32);
                        }
                    }
                    config.save()?;
                    if json_output {
                        print_json(&serde_json::json!({
                            "status": "ok",
                            "data": { "key": key, "value": value },
                            "meta": { "duration_ms": dur }
                        }))?;
                    } else {
                        println!("{key} = {value}");
                    }
                }
            }
        }

        // ── Doctor ─────────────────────────────────────────────────────────

        Commands::Doctor => {
            let config_path = AppConfig::config_path();
            if config_path.exists() {
                println!("✓ Config: {}", config_path.display());
            } else {
                println!("○ Config: not found (using defaults)");
            }

            let auth = StoreAuth::from_env(&config.api.token_env, &config.api.api_key_env);
            if auth.bearer_token.is_some() {
                println!("✓ Admin token: {} is set", config.api.token_env);
            } else {
                println!("○ Admin token: {} not set (admin commands will fail)", config.api.token_env);
            }
            if auth.api_key.is_some() {
                println!("✓ API key: {} is set", config.api.api_key_env);
            } else {
                println!("○ API key: {} not set (public fetches may be rejected)", config.api.api_key_env);
            }

            let mut issues = 0;
            let store = open_store(&config);
            match store.fetch_random_quote().await {
                Ok(quote) => {
                    println!("✓ Service: {} (random quote by {})", config.api.base_url, quote.author);
                }
                Err(e) => {
                    issues += 1;
                    println!("✗ Service: {e}");
                }
            }

            if issues == 0 {
                println!("\nAll checks passed ✓");
            } else {
                println!("\n{issues} issue(s) found");
                std::process::exit(1);
            }
        }

        // ── Version ────────────────────────────────────────────────────────

        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "version": version },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("quotedeck v{version}");
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn open_store(config: &AppConfig) -> QuoteStore {
    let auth = StoreAuth::from_env(&config.api.token_env, &config.api.api_key_env);
    QuoteStore::new(&config.api.base_url, auth)
}

/// Combine the persisted sort with the `--sort`/`--order` flags. A new field
/// starts ascending unless `--order` says otherwise.
fn resolve_sort(config: &AppConfig, sort: Option<&str>, order: Option<&str>) -> (SortSpec, bool) {
    let mut spec = config.sort_spec().unwrap_or_else(|e| {
        tracing::warn!("stored sort preference is invalid ({e}), using default");
        SortSpec::default()
    });
    let mut changed = false;

    if let Some(field) = sort {
        match field.parse::<SortField>() {
            Ok(field) if field != spec.field => {
                spec.field = field;
                spec.ascending = true;
                changed = true;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(ExitCode::InvalidArgs as i32);
            }
        }
    }

    if let Some(order) = order {
        let ascending = match order {
            "asc" => true,
            "desc" => false,
            other => {
                eprintln!("invalid sort order '{other}' (valid: asc, desc)");
                std::process::exit(ExitCode::InvalidArgs as i32);
            }
        };
        if ascending != spec.ascending {
            spec.ascending = ascending;
            changed = true;
        }
    }

    (spec, changed)
}

fn persist_sort(config: &mut AppConfig, spec: SortSpec) {
    config.set_sort_spec(spec);
    if let Err(e) = config.save() {
        tracing::warn!("could not persist sort preference: {e}");
    }
}

fn fail(err: &StoreError, json_output: bool, start: Instant) -> ! {
    let dur = start.elapsed().as_millis();
    let kind = match err {
        StoreError::Network(_) => "network",
        StoreError::Server { .. } => "server",
        StoreError::NotFound(_) => "not_found",
        StoreError::Validation(_) => "validation",
        StoreError::DuplicateDetected(_) => "duplicate",
        StoreError::Parse(_) => "parse",
    };
    let code = match err {
        StoreError::Network(_) | StoreError::Server { .. } => ExitCode::NetworkError,
        StoreError::NotFound(_) => ExitCode::NotFound,
        StoreError::Validation(_) => ExitCode::InvalidArgs,
        StoreError::DuplicateDetected(_) => ExitCode::Conflict,
        StoreError::Parse(_) => ExitCode::GeneralError,
    };
    if json_output {
        let _ = print_json(&serde_json::json!({
            "status": "error",
            "error": kind,
            "message": err.to_string(),
            "meta": { "duration_ms": dur }
        }));
    } else {
        eprintln!("Error: {err}");
    }
    std::process::exit(code as i32);
}

fn finish_listing(snap: ListingSnapshot, json_output: bool, start: Instant) -> Result<()> {
    let dur = start.elapsed().as_millis();

    if let Some(message) = snap.error {
        if json_output {
            print_json(&serde_json::json!({
                "status": "error",
                "error": "listing",
                "message": message,
                "meta": { "duration_ms": dur }
            }))?;
        } else {
            eprintln!("Error: {message}");
        }
        std::process::exit(ExitCode::NetworkError as i32);
    }

    if json_output {
        print_json(&serde_json::json!({
            "status": "ok",
            "data": {
                "items": snap.items,
                "total": snap.total_count,
                "has_more": snap.has_more,
                "query": snap.query,
                "sort": snap.sort.to_string()
            },
            "meta": { "duration_ms": dur }
        }))?;
    } else if snap.items.is_empty() {
        match &snap.query {
            Some(query) => println!("No results for: {query}"),
            None => println!("No quotes in the store. Use `quotedeck add` to create one."),
        }
    } else {
        if let Some(query) = &snap.query {
            println!("Found {} result(s) for '{query}':", snap.items.len());
        }
        for quote in &snap.items {
            let tags = if quote.tags.is_empty() {
                String::new()
            } else {
                format!("  #{}", quote.tags.join(" #"))
            };
            println!(
                "{}  {:<60}  — {}{}",
                short_id(&quote.id),
                ellipsize(&quote.text, 60),
                quote.author,
                tags
            );
        }
        if snap.has_more {
            println!("  … more available (rerun with --pages or a larger --limit)");
        }
    }

    Ok(())
}

fn finish_batch(op: &str, report: &BatchReport, json_output: bool, start: Instant) -> Result<()> {
    let dur = start.elapsed().as_millis();

    if json_output {
        let items: Vec<serde_json::Value> = report
            .items
            .iter()
            .map(|item| {
                let outcome = match &item.outcome {
                    ItemOutcome::Created { id } => {
                        serde_json::json!({ "result": "created", "id": id })
                    }
                    ItemOutcome::Deleted => serde_json::json!({ "result": "deleted" }),
                    ItemOutcome::Duplicate { count } => {
                        serde_json::json!({ "result": "duplicate", "count": count })
                    }
                    ItemOutcome::Failed { message } => {
                        serde_json::json!({ "result": "failed", "message": message })
                    }
                };
                serde_json::json!({ "index": item.index, "label": item.label, "outcome": outcome })
            })
            .collect();
        let status = if report.failed() == 0 { "ok" } else { "partial" };
        print_json(&serde_json::json!({
            "status": status,
            "data": { "op": op, "items": items, "summary": report.summary() },
            "meta": { "duration_ms": dur }
        }))?;
    } else {
        for item in &report.items {
            match &item.outcome {
                ItemOutcome::Created { id } => {
                    println!("  ✓ [{}] created {}: {}", item.index, short_id(id), item.label)
                }
                ItemOutcome::Deleted => println!("  ✓ [{}] deleted {}", item.index, item.label),
                ItemOutcome::Duplicate { count } => println!(
                    "  ○ [{}] skipped {} ({count} duplicate(s))",
                    item.index, item.label
                ),
                ItemOutcome::Failed { message } => {
                    println!("  ✗ [{}] failed {}: {message}", item.index, item.label)
                }
            }
        }
        println!("\n{}", report.summary());
    }

    if report.failed() > 0 {
        std::process::exit(ExitCode::GeneralError as i32);
    }
    Ok(())
}

/// Export file shape: a metadata/statistics header followed by every quote.
/// The quote objects themselves re-import cleanly (`import` ignores the
/// extra fields).
fn export_dump(quotes: &[Quote]) -> serde_json::Value {
    let mut authors: Vec<&str> = quotes.iter().map(|q| q.author.as_str()).collect();
    authors.sort_unstable();
    authors.dedup();
    let mut tags: Vec<&str> = quotes
        .iter()
        .flat_map(|q| q.tags.iter().map(String::as_str))
        .collect();
    tags.sort_unstable();
    tags.dedup();

    serde_json::json!({
        "export_metadata": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "total_quotes": quotes.len(),
            "unique_authors": authors.len(),
            "unique_tags": tags.len(),
            "authors": authors,
            "tags": tags
        },
        "quotes": quotes
    })
}

fn config_key_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    vec![
        ("api.base_url", config.api.base_url.clone()),
        ("api.token_env", config.api.token_env.clone()),
        ("api.api_key_env", config.api.api_key_env.clone()),
        ("list.page_size", config.list.page_size.to_string()),
        ("list.sort_field", config.list.sort_field.clone()),
        ("list.sort_ascending", config.list.sort_ascending.to_string()),
    ]
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

