use anyhow::{bail, Context};
use catalog_match::{cli, config, export, loader, matcher, service, sheet_selector};
use catalog_match_common::{MatchResult, MatchStatus, SynonymTable};
use clap::Parser;
use cli::{Cli, Commands, MatchArgs};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use matcher::{MatchContext, PredicateProvider, Strategy};
use service::{OllamaService, ServiceClient, ServiceLimits, VerdictCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("catalog_match={0},catalog_match_common={0}", default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load().context("failed to load config")?;

    match cli.command {
        Commands::Match(args) => run_match(config, args).await?,

        Commands::Config { show, init } => {
            if init {
                let default = Config::default();
                default.save()?;
                println!("✔ Wrote default config: {}", Config::config_path()?.display());
            }

            if show || !init {
                println!("Config ({}):", Config::config_path()?.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = VerdictCache::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = VerdictCache::load(&target);
                    println!("Verdict cache:");
                    println!("  path: {}", cache_path.display());
                    println!("  entries: {}", cache.len());
                    if let Some(newest) = cache.newest() {
                        println!("  last answer: {}", newest);
                    }
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  size: {} bytes", meta.len());
                    }
                } else {
                    println!("No verdict cache at {}", cache_path.display());
                }
            }

            if clear {
                match VerdictCache::clear(&target) {
                    Ok(true) => println!("✔ Deleted verdict cache: {}", cache_path.display()),
                    Ok(false) => println!("No verdict cache to delete"),
                    Err(e) => println!("Failed to delete verdict cache: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn apply_overrides(mut config: Config, args: &MatchArgs) -> anyhow::Result<Config> {
    if let Some(mode) = args.mode {
        config.mode = mode;
        if config.stages.is_some() {
            info!("Config lists explicit stages; --mode {:?} is ignored", mode);
        }
    }
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    if let Some(top_k) = args.top_k {
        config.top_k = top_k;
    }
    if let Some(on_empty) = args.on_empty {
        config.on_empty = on_empty;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(path) = &args.synonyms {
        config.synonyms_path = Some(path.clone());
    }
    if args.sheet.is_some() {
        config.transaction_sheet = args.sheet.clone();
    }
    config.validate()?;
    Ok(config)
}

fn load_synonyms(config: &Config) -> anyhow::Result<SynonymTable> {
    let mut table = SynonymTable::from_preset(&config.synonym_preset)
        .with_context(|| format!("unknown synonym preset '{}'", config.synonym_preset))?;
    if let Some(path) = &config.synonyms_path {
        let custom = SynonymTable::from_file(path)
            .with_context(|| format!("failed to read synonyms {}", path.display()))?;
        table.merge(&custom);
    }
    Ok(table)
}

fn folder_of(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn summarize(results: &[MatchResult]) {
    let mut matched = 0;
    let mut fallback = 0;
    let mut no_match = 0;
    let mut failed = 0;
    for result in results {
        match result.status {
            MatchStatus::Matched => matched += 1,
            MatchStatus::Fallback { .. } => fallback += 1,
            MatchStatus::NoMatch { .. } => no_match += 1,
            MatchStatus::Failed { .. } => failed += 1,
        }
    }
    println!(
        "  matched: {}  fallback: {}  no match: {}  failed: {}",
        matched, fallback, no_match, failed
    );
}

async fn run_match(config: Config, args: MatchArgs) -> anyhow::Result<()> {
    let config = apply_overrides(config, &args)?;
    let specs = config.stage_specs();

    println!("🔎 catalog-match\n");

    // 1. Catalog
    println!("[1/4] Loading catalog...");
    let catalog = loader::load_catalog(
        &args.catalog,
        args.catalog_sheet.as_deref(),
        &config.catalog_columns,
    )
    .with_context(|| format!("cannot load catalog {}", args.catalog.display()))?;
    println!("✔ {} catalog items\n", catalog.len());

    // 2. Transactions
    println!("[2/4] Loading transactions...");
    let sheet = sheet_selector::select_sheet(&args.transactions, config.transaction_sheet.as_deref())?;
    let mut records = loader::load_transactions(
        &args.transactions,
        sheet.as_deref(),
        &config.transaction_columns,
    )
    .with_context(|| format!("cannot load transactions {}", args.transactions.display()))?;
    println!("✔ {} transactions\n", records.len());

    let first_index = match args.entry {
        Some(entry) if entry >= records.len() => {
            bail!("--entry {} is out of range ({} transactions)", entry, records.len())
        }
        Some(entry) => {
            records = vec![records.swap_remove(entry)];
            entry
        }
        None => 0,
    };

    // 3. Matching
    let synonyms = load_synonyms(&config)?;
    let cache_folder = folder_of(&args.transactions);

    let client = if specs.iter().any(|s| s.strategy == Strategy::Service) {
        let ollama = OllamaService::new(&config.service);
        let client = ServiceClient::new(
            Arc::new(ollama),
            ServiceLimits::from_config(&config.service),
            tokio::runtime::Handle::current(),
        );
        info!("Decision service: {} at {}", config.service.model, config.service.base_url);
        Some(if args.use_cache {
            client.with_cache(VerdictCache::load(&cache_folder))
        } else {
            client
        })
    } else {
        None
    };

    let mut ctx = MatchContext::build(
        Arc::new(catalog),
        synonyms,
        &specs,
        config.match_options(),
        client.as_ref().map(|c| c as &dyn PredicateProvider),
    )?;
    if let Some(dir) = &args.dump_passes {
        ctx = ctx.with_observer(Arc::new(export::PassDump::new(dir)?));
        println!("- Pass dumps: {}", dir.display());
    }

    println!(
        "[3/4] Matching... ({} stages, on empty: {:?})",
        ctx.pipeline().len(),
        config.on_empty
    );
    for stage in ctx.pipeline().stages() {
        match stage.missing_column() {
            Some(column) => println!("  - {} (skipped, no '{}' column)", stage.name(), column),
            None => println!("  - {} ({:?} gate)", stage.name(), stage.gate()),
        }
    }
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("  {bar:40} {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let workers = config.workers;
    let single = args.entry.is_some();
    let progress = pb.clone();
    let results = tokio::task::spawn_blocking(move || {
        if single {
            let result = ctx.match_record(first_index, &records[0]);
            progress.inc(1);
            Ok(vec![result])
        } else {
            matcher::run_batch(&ctx, &records, workers, Some(&progress))
        }
    })
    .await
    .context("matching task aborted")??;
    pb.finish_and_clear();
    println!("✔ Matching done");
    summarize(&results);
    println!();

    if let (Some(client), true) = (&client, args.use_cache) {
        let cache = client.cache_snapshot();
        cache.save(&cache_folder)?;
        info!("Saved {} verdicts to {}", cache.len(), VerdictCache::cache_path(&cache_folder).display());
    }

    // 4. Export
    println!("[4/4] Writing results...");
    let stem = match (&sheet, args.transactions.file_stem()) {
        (Some(sheet), _) => format!("output_{}", sheet),
        (None, Some(stem)) => format!("output_{}", stem.to_string_lossy()),
        (None, None) => "output".to_string(),
    };
    let output = args.output.unwrap_or_else(|| cache_folder.clone());
    let path = export::export_results(&results, args.format, &output, &stem)?;
    println!("✔ Results: {}", path.display());

    println!("\n✅ Done");
    Ok(())
}
