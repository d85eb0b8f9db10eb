use crate::checkpoint::Checkpointer;
use crate::cli::{ModelsArgs, RunArgs, StatusArgs};
use crate::config::{self, API_KEY_ENV};
use crate::lookup::GeminiClient;
use crate::lookup_log::LookupLog;
use crate::runner::{EnrichmentRunner, RunSettings};
use crate::status::status_report;
use crate::store::RecordStore;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

fn env_api_key() -> Option<String> {
    std::env::var(API_KEY_ENV).ok()
}

pub fn run_enrich(config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    let file = config::resolve_config_file(config_path)?;
    let config = config::build_run_config(args, &file, env_api_key())?;

    let table = config.working_table();
    let resuming = table == config.output.as_path();
    let mut store = RecordStore::load(table)?;
    tracing::info!(path = %table.display(), resuming, "working table loaded");
    println!(
        "{} {} rows ({} columns) from {}",
        if resuming { "Resuming" } else { "Loaded" },
        store.row_count(),
        store.headers().len(),
        table.display()
    );

    let settings = RunSettings {
        rows: config.rows,
        overwrite: config.overwrite,
        delay: config.delay,
    };
    let client = GeminiClient::new(config.gemini.clone());
    let log = config.lookup_log.clone().map(LookupLog::new);
    let mut checkpointer = Checkpointer::new(config.output.clone(), config.checkpoint_every);

    let mut runner = EnrichmentRunner::new(&client, &settings);
    if let Some(log) = &log {
        runner = runner.with_log(log);
    }
    let summary = runner.run(&mut store, &mut checkpointer)?;

    tracing::info!(
        rows = summary.rows_in_range,
        lookups = summary.lookups(),
        failed = summary.failed,
        checkpoints = summary.checkpoints,
        "run complete"
    );
    println!("\n{}", "=".repeat(60));
    println!("DONE! Enriched data saved to {}", checkpointer.path().display());
    println!(
        "{} looked up ({} found, {} failed), {} already complete, {} without a name",
        summary.lookups(),
        summary.succeeded,
        summary.failed,
        summary.skipped_complete,
        summary.skipped_no_name
    );
    if let Some(log) = &log {
        println!("Lookup log: {}", log.path().display());
    }
    println!("{}", "=".repeat(60));
    Ok(())
}

pub fn run_status(config_path: Option<&Path>, args: &StatusArgs) -> Result<()> {
    let file = config::resolve_config_file(config_path)?;
    // without --input, prefer the enriched output once a run has written it
    let input = match &args.input {
        Some(path) => path.clone(),
        None => {
            let input = file.input.clone().ok_or_else(|| {
                anyhow!("no dataset: pass --input or set \"input\" in the config file")
            })?;
            let output = file
                .output
                .clone()
                .unwrap_or_else(|| config::default_output_path(&input));
            if output.is_file() {
                output
            } else {
                input
            }
        }
    };
    let rows = args.rows.or(file.rows).unwrap_or_default();

    let store = RecordStore::load(&input)?;
    let report = status_report(&store, &rows);

    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize status")?;
        println!("{text}");
        return Ok(());
    }
    println!("{} (rows {rows} of {})", input.display(), report.total_rows);
    println!("  complete:     {}", report.complete);
    println!("  partial:      {}", report.partial);
    println!("  unresolved:   {}", report.unresolved);
    println!("  missing name: {}", report.missing_name);
    println!("  pending:      {}", report.pending());
    Ok(())
}

pub fn run_models(config_path: Option<&Path>, args: &ModelsArgs) -> Result<()> {
    let file = config::resolve_config_file(config_path)?;
    let api_key = config::resolve_api_key(args.api_key.as_deref(), &file, env_api_key())?;
    let client = GeminiClient::new(config::gemini_settings(&file, api_key, None, None));
    let models = client.list_models()?;

    if args.json {
        let text = serde_json::to_string_pretty(&models).context("serialize models")?;
        println!("{text}");
        return Ok(());
    }
    println!("Models supporting generateContent:");
    for model in &models {
        match &model.display_name {
            Some(display) => println!("  {} ({display})", model.name),
            None => println!("  {}", model.name),
        }
    }
    Ok(())
}
