//! `vaersmine` - CLI for VAERS association rule mining
//!
//! This binary loads configuration, applies command-line overrides, and
//! dispatches to the mining pipeline and the run history database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use vaersmine::cli::{BasketsCommand, Cli, Command, ConfigCommand, MineCommand, RunsCommand};
use vaersmine::filter::ItemFilter;
use vaersmine::output::{write_itemsets, write_rules, ITEM_SEPARATOR};
use vaersmine::pipeline::{self, RunSummary};
use vaersmine::{init_logging, Config, Storage};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Mine(cmd) => handle_mine(config, &cmd),
        Command::Baskets(cmd) => handle_baskets(config, &cmd),
        Command::Runs(cmd) => handle_runs(&config, cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("opening run database {}", path.display()))
}

fn handle_mine(mut config: Config, cmd: &MineCommand) -> Result<()> {
    cmd.apply(&mut config);
    config.validate()?;

    let paths = config.input_paths();
    let params = config.mining_params();
    let filter = ItemFilter::from_config(&config.filter);

    let outcome = pipeline::run(&paths, &params, &filter).map_err(|e| {
        if e.is_input_error() {
            anyhow::Error::new(e).context("the release files are malformed")
        } else {
            e.into()
        }
    })?;

    let format = config.output.format;
    write_itemsets(
        &config.itemsets_path(),
        &outcome.catalog,
        &outcome.itemsets,
        format,
    )?;
    write_rules(&config.rules_path(), &outcome.catalog, &outcome.rules, format)?;

    if config.storage.record_runs {
        let storage = open_storage(&config)?;
        match storage.insert_run(&outcome)? {
            Some(id) => info!("Recorded as run {}", id),
            None => info!("Identical run already recorded; not storing again"),
        }
        if config.storage.max_runs > 0 {
            storage.prune_keep_recent(config.storage.max_runs)?;
        }
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    } else {
        print_summary(&outcome.summary);
        println!("Itemsets file:  {}", config.itemsets_path().display());
        println!("Rules file:     {}", config.rules_path().display());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Reports:        {}", summary.reports);
    println!("Symptom rows:   {}", summary.symptom_rows);
    println!("Vax rows:       {}", summary.vax_rows);
    println!("Joined rows:    {}", summary.merged_rows);
    println!("Baskets:        {}", summary.baskets);
    println!("Distinct items: {}", summary.distinct_items);
    println!("Itemsets:       {}", summary.itemsets);
    println!("Rules:          {}", summary.rules);
    println!(
        "Parameters:     min_support={} max_len={} {}>={}",
        summary.params.min_support,
        summary
            .params
            .max_len
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string()),
        summary.params.metric,
        summary.params.min_threshold
    );
    println!("Duration:       {} ms", summary.duration_ms());
}

fn handle_baskets(mut config: Config, cmd: &BasketsCommand) -> Result<()> {
    cmd.input.apply(&mut config);
    let filter = if cmd.no_filter {
        ItemFilter::pass_all()
    } else {
        ItemFilter::from_config(&config.filter)
    };

    let load = pipeline::load_baskets(&config.input_paths(), &filter)?;
    let shown = &load.baskets[..cmd.limit.min(load.baskets.len())];

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(shown)?);
    } else {
        for basket in shown {
            println!("{}", basket.items().join(ITEM_SEPARATOR));
        }
        if shown.len() < load.baskets.len() {
            println!("... {} more", load.baskets.len() - shown.len());
        }
    }
    Ok(())
}

fn handle_runs(config: &Config, cmd: RunsCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        RunsCommand::List { limit, json } => {
            let runs = storage.list_runs(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else if runs.is_empty() {
                println!("No runs recorded.");
            } else {
                println!(
                    "{:>5}  {:<25}  {:>8}  {:>9}  {:>7}",
                    "ID", "STARTED", "BASKETS", "ITEMSETS", "RULES"
                );
                for run in &runs {
                    println!(
                        "{:>5}  {:<25}  {:>8}  {:>9}  {:>7}",
                        run.id,
                        run.summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        run.summary.baskets,
                        run.summary.itemsets,
                        run.summary.rules
                    );
                }
            }
        }
        RunsCommand::Show { id, limit, json } => {
            let Some(run) = storage.get_run(id)? else {
                bail!("run {id} not found");
            };
            let itemsets = storage.run_itemsets(id, limit)?;
            let rules = storage.run_rules(id, limit)?;

            if json {
                // Infinite conviction serializes as null
                let value = serde_json::json!({
                    "run": run,
                    "itemsets": itemsets,
                    "rules": rules,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Run {}", run.id);
                println!("Started:        {}", run.summary.started_at.to_rfc3339());
                println!("Fingerprint:    {}", run.summary.fingerprint);
                println!("Data file:      {}", run.summary.inputs.data.display());
                print_summary(&run.summary);
                println!();
                println!("Top itemsets:");
                for itemset in &itemsets {
                    println!("  {:.4}  {}", itemset.support, itemset.items.join(ITEM_SEPARATOR));
                }
                println!();
                println!("Top rules:");
                for rule in &rules {
                    println!(
                        "  {} => {}  ({} {:.4}, lift {:.4})",
                        rule.antecedents.join(ITEM_SEPARATOR),
                        rule.consequents.join(ITEM_SEPARATOR),
                        run.summary.params.metric,
                        rule.metric(run.summary.params.metric),
                        rule.lift
                    );
                }
            }
        }
        RunsCommand::Delete { id } => {
            if storage.delete_run(id)? {
                println!("Deleted run {id}.");
            } else {
                bail!("run {id} not found");
            }
        }
        RunsCommand::Prune { keep } => {
            let keep = keep.unwrap_or(config.storage.max_runs);
            if keep == 0 {
                warn!("Refusing to prune with keep=0; pass --keep to choose a count");
                return Ok(());
            }
            let deleted = storage.prune_keep_recent(keep)?;
            println!("Pruned {deleted} runs.");
        }
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("vaersmine status");
        println!("----------------");
        println!("Database:       {}", storage.path().display());
        println!("Runs:           {}", stats.total_runs);
        println!("Itemsets:       {}", stats.total_itemsets);
        println!("Rules:          {}", stats.total_rules);
        if let (Some(oldest), Some(newest)) = (stats.oldest_run, stats.newest_run) {
            println!("Oldest run:     {}", oldest.to_rfc3339());
            println!("Newest run:     {}", newest.to_rfc3339());
        }
        println!("Size:           {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let paths = config.input_paths();
                let params = config.mining_params();
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Input]");
                println!("  Data file:          {}", paths.data.display());
                println!("  Symptoms file:      {}", paths.symptoms.display());
                println!("  Vax file:           {}", paths.vax.display());
                println!();
                println!("[Mining]");
                println!("  Min support:        {}", params.min_support);
                println!(
                    "  Max length:         {}",
                    params
                        .max_len
                        .map_or_else(|| "unlimited".to_string(), |n| n.to_string())
                );
                println!("  Metric:             {}", params.metric);
                println!("  Min threshold:      {}", params.min_threshold);
                println!();
                println!("[Output]");
                println!("  Itemsets file:      {}", config.itemsets_path().display());
                println!("  Rules file:         {}", config.rules_path().display());
                println!("  Format:             {:?}", config.output.format);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Record runs:        {}", config.storage.record_runs);
                println!("  Max runs:           {}", config.storage.max_runs);
                println!();
                println!("[Filter]");
                println!("  Enabled:            {}", config.filter.enabled);
                println!(
                    "  Excluded items:     {}",
                    config.filter.excluded_items.len()
                );
                println!(
                    "  Exclude patterns:   {}",
                    config.filter.exclude_patterns.len()
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
