use anyhow::{Context, Result};
use clap::{Arg, Command};
use log::LevelFilter;
use mail_sorter::{ClassifierConfig, ClassifierEngine, EmailData};
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    let matches = Command::new("mail-sorter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rule-based email categorizer with per-sender learning")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("mail-sorter.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("classify")
                .long("classify")
                .value_name("FILE")
                .help("Categorize emails from a JSON file (one email object or an array)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("import-rules")
                .long("import-rules")
                .value_name("FILE")
                .help("Import a rules snapshot before classifying")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("export-rules")
                .long("export-rules")
                .value_name("FILE")
                .help("Write the rules snapshot (patterns and learned weights) after classifying")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("list-categories")
                .long("list-categories")
                .help("List the configured categories")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-learning")
                .long("no-learning")
                .help("Classify without updating learned sender weights")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Print classification statistics when done")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging with scoring details")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match ClassifierConfig::default().save_to_file(generate_path) {
            Ok(()) => println!("Default configuration written to {generate_path}"),
            Err(e) => {
                eprintln!("Error generating configuration: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("mail-sorter.yaml");

    let config_found = Path::new(config_path).exists();
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(resolve_log_level(matches.get_flag("verbose"), &config))
        .init();

    if !config_found {
        log::warn!("Config file not found: {}, using defaults", config_path);
    }

    let mut engine = match ClassifierEngine::new(&config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error initializing classifier: {e:#}");
            process::exit(1);
        }
    };

    if matches.get_flag("no-learning") {
        engine.set_learning_mode(false);
    }

    if let Err(e) = run(&matches, &mut engine) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(matches: &clap::ArgMatches, engine: &mut ClassifierEngine) -> Result<()> {
    if let Some(rules_path) = matches.get_one::<String>("import-rules") {
        engine.load_rules(rules_path)?;
        log::info!("Imported rules from {}", rules_path);
    }

    if matches.get_flag("list-categories") {
        for category in engine.categories() {
            println!(
                "{} {:<12} {:<14} priority={} keywords={}",
                category.icon,
                category.id,
                category.name,
                category.priority,
                category.keywords.len()
            );
        }
    }

    if let Some(email_file) = matches.get_one::<String>("classify") {
        let emails = load_emails(email_file)?;
        log::info!("Classifying {} emails from {}", emails.len(), email_file);
        let results = engine.categorize_batch(&emails);
        println!(
            "{}",
            serde_json::to_string_pretty(&results).context("Failed to serialize results")?
        );
    }

    if let Some(export_path) = matches.get_one::<String>("export-rules") {
        engine.save_rules(export_path)?;
        log::info!("Exported rules to {}", export_path);
    }

    if matches.get_flag("stats") {
        let stats = engine.statistics();
        let global = stats.global();
        println!("📊 Classification statistics");
        println!("  Emails processed: {}", global.total_emails);
        println!("  Auto-applied:     {}", global.total_auto_applied);
        println!("  General fallback: {}", global.general_fallbacks);
        println!("  Keywords learned: {}", global.keywords_learned);
        for category in stats.category_stats() {
            println!(
                "  {:<12} matches={} auto_applied={}",
                category.category_id, category.matches, category.auto_applied
            );
        }
    }

    Ok(())
}

fn load_config(path: &str) -> Result<ClassifierConfig> {
    if Path::new(path).exists() {
        ClassifierConfig::load_from_file(path)
    } else {
        Ok(ClassifierConfig::default())
    }
}

fn load_emails(path: &str) -> Result<Vec<EmailData>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read email file: {path}"))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse email file: {path}"))?;

    let emails = match value {
        serde_json::Value::Array(records) => records
            .into_iter()
            .map(EmailData::from_value_lenient)
            .collect(),
        record => vec![EmailData::from_value_lenient(record)],
    };
    Ok(emails)
}

/// `--verbose` wins; otherwise the config's `logging.level`, defaulting to info
fn resolve_log_level(verbose: bool, config: &ClassifierConfig) -> LevelFilter {
    if verbose {
        return LevelFilter::Debug;
    }
    match config.logging.as_ref() {
        Some(logging) => logging.level.parse().unwrap_or_else(|_| {
            eprintln!("Unknown log level '{}', using info", logging.level);
            LevelFilter::Info
        }),
        None => LevelFilter::Info,
    }
}
