// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use x_match_core::{
    AircraftIcaoCode, AircraftModel, AirlineIcaoCode, CachedRuleProvider, CaseSensitivity,
    InitEvent, MappingProvider, Matcher, MatchingLog, MatchingMode, ModelSet, ModelSetCache,
    ModelSynchronizer, RuleFileProvider, SetupStore, SimulatedAircraft, StaticRuleProvider,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Model set cache (JSON). Defaults to the one in the config directory
    #[arg(short, long, env = "X_MATCH_MODELS")]
    models: Option<PathBuf>,

    /// Mapping rule file (`<key> = <model string>` per line)
    #[arg(short, long, env = "X_MATCH_RULES", conflicts_with = "rule_cache")]
    rules: Option<PathBuf>,

    /// Cached mapping rules (JSON)
    #[arg(long)]
    rule_cache: Option<PathBuf>,

    /// Matcher setup file (JSON)
    #[arg(short, long)]
    setup: Option<PathBuf>,

    /// Override the matching mode: all, none or e.g. "exact,mapping"
    #[arg(long)]
    mode: Option<MatchingMode>,

    /// Model string of the fallback model
    #[arg(long, env = "X_MATCH_DEFAULT_MODEL", default_value = "Default")]
    default_model: String,

    /// More output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match one remote aircraft
    Match {
        callsign: String,
        /// Aircraft ICAO designator, e.g. B738
        #[arg(short, long)]
        aircraft: Option<String>,
        /// Aircraft family, e.g. A32X
        #[arg(long)]
        family: Option<String>,
        /// Combined type code, e.g. L2J
        #[arg(long)]
        combined_type: Option<String>,
        /// Airline ICAO designator
        #[arg(short = 'l', long)]
        airline: Option<String>,
        /// Model string already assigned to the aircraft
        #[arg(long)]
        model_string: Option<String>,
        /// Treat the assigned model string as picked by the user
        #[arg(long, requires = "model_string")]
        manual: bool,
    },
    /// Read the rules and show how many survive synchronization
    Sync,
    /// List rules whose target model is not installed
    Check,
    /// List the cleaned model set
    Models {
        /// Only models whose string contains this text
        filter: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Logger already initialized: {}", e);
    }
}

fn build_provider(cli: &Cli) -> Box<dyn MappingProvider> {
    if let Some(path) = &cli.rules {
        return Box::new(RuleFileProvider::new(path));
    }
    if let Some(path) = &cli.rule_cache {
        return Box::new(CachedRuleProvider::new(path));
    }
    let default_cache = CachedRuleProvider::default_path();
    if default_cache.exists() {
        Box::new(CachedRuleProvider::new(default_cache))
    } else {
        log::info!("[CLI] No rule source given, running without mapping rules");
        Box::new(StaticRuleProvider::default())
    }
}

fn load_models(cli: &Cli) -> Vec<AircraftModel> {
    let path = cli.models.clone().unwrap_or_else(ModelSetCache::default_path);
    let cache = ModelSetCache::load(&path);
    if cache.is_empty() {
        log::warn!("[CLI] No models in {:?}", path);
    }
    cache.models
}

fn build_matcher(cli: &Cli) -> Result<Matcher> {
    let store = match &cli.setup {
        Some(path) => SetupStore::new(path),
        None => SetupStore::default_location(),
    };
    let mut setup = store
        .load()
        .with_context(|| format!("Failed to load setup from {:?}", store.path()))?;
    if let Some(mode) = cli.mode {
        setup.mode = mode;
    }

    let matcher = Matcher::new(
        setup,
        AircraftModel::new(&cli.default_model),
        build_provider(cli),
        load_models(cli),
    )?;

    match matcher.init_blocking() {
        Some(InitEvent::Finished {
            provider_ok: false, ..
        }) => eprintln!("Warning: mapping rules could not be read, see log"),
        Some(_) => {}
        None => anyhow::bail!("Matcher initialization could not be started"),
    }
    Ok(matcher)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Match {
            callsign,
            aircraft,
            family,
            combined_type,
            airline,
            model_string,
            manual,
        } => {
            let matcher = build_matcher(&cli)?;

            let mut icao = AircraftIcaoCode::new(aircraft.as_deref().unwrap_or_default());
            if let Some(family) = family {
                icao = icao.with_family(family);
            }
            if let Some(combined_type) = combined_type {
                icao = icao.with_combined_type(combined_type);
            }
            let mut remote = SimulatedAircraft::new(callsign).with_aircraft_icao(icao);
            if let Some(airline) = airline {
                remote = remote.with_airline_icao(AirlineIcaoCode::new(airline));
            }
            if let Some(model_string) = model_string {
                remote = if *manual {
                    remote.with_manually_set_model(model_string)
                } else {
                    remote.with_assigned_model_string(model_string)
                };
            }

            let mut log = MatchingLog::new();
            let result = matcher.match_aircraft(&remote, Some(&mut log));
            println!("Model:    {}", result.model.model_string);
            println!("Strategy: {}", result.strategy);
            if let Some(score) = result.score {
                println!("Score:    {}", score);
            }
            if !result.model.distributor.is_empty() {
                println!("Distributor: {}", result.model.distributor);
            }
            println!();
            print!("{}", log);
        }
        Commands::Sync => {
            let matcher = build_matcher(&cli)?;
            println!(
                "{} models installed, {} mapping rules usable",
                matcher.count_installed_models(),
                matcher.count_mapping_rules()
            );
        }
        Commands::Check => {
            let mut provider = build_provider(&cli);
            let count = provider
                .read()
                .with_context(|| format!("Failed to read {}", provider.name()))?;
            let (models, _) = ModelSet::from_models(load_models(&cli));
            let stale = ModelSynchronizer::stale_rules(
                provider.mapping_list(),
                &models.model_names(),
                CaseSensitivity::Insensitive,
            );

            if stale.is_empty() {
                println!("All {} rules resolve to installed models", count);
            } else {
                println!("{} of {} rules point to missing models:", stale.len(), count);
                for rule in stale {
                    println!("  {}", rule);
                }
            }
        }
        Commands::Models { filter } => {
            let (models, report) = ModelSet::from_models(load_models(&cli));
            for model in models.iter() {
                if let Some(filter) = filter {
                    if !model
                        .model_string
                        .to_lowercase()
                        .contains(&filter.to_lowercase())
                    {
                        continue;
                    }
                }
                println!(
                    "{:<40} {:<6} {:<4} {}",
                    model.model_string,
                    model.aircraft_icao.designator,
                    model.airline_icao.designator,
                    model.distributor
                );
            }
            println!(
                "{} models ({} removed while cleaning)",
                models.len(),
                report.removed_count()
            );
        }
    }

    Ok(())
}
