//! Flight currency CLI — `fcur` command.
//!
//! Evaluates qualification currencies from a definition file and an event
//! history file, and answers the edit-time questions (what uses this
//! currency, would this tree close a cycle, can this be deleted).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::debug;

use flight_currency::storage::{load_definitions, load_history, save_definitions};
use flight_currency::time::{format_date, parse_date, today};
use flight_currency::{
    validate_definitions, CurrencyEngine, CurrencyId, DefinitionSet, DefinitionStore,
    EngineConfig, InMemoryHistory, LogicNode, PersonCurrencyStatus, PersonId, RollingWindowMode,
    ValidationIssue,
};

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Flight currency CLI — evaluate qualifications and guard definition edits.
#[derive(Parser, Debug)]
#[command(
    name = "fcur",
    about = "Flight currency CLI",
    version,
    long_about = "fcur — flight currency CLI\n\nEvaluate primitive and composite qualification currencies for a person\non a date, and inspect or edit the currency definition set safely."
)]
struct Cli {
    /// Definition file (JSON)
    #[arg(long, global = true, default_value = "currencies.json")]
    definitions: PathBuf,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate currencies for one person, or every person in the history
    Evaluate {
        /// History file (JSON)
        #[arg(long)]
        history: PathBuf,

        /// Person to evaluate (default: everyone in the history file)
        #[arg(long)]
        person: Option<String>,

        /// Evaluation date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Include hidden currencies
        #[arg(long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Days under which a held currency is "expiring soon"
        #[arg(long)]
        threshold: Option<i64>,

        /// Maximum nesting depth per evaluation
        #[arg(long)]
        max_depth: Option<usize>,

        /// Report the projected lapse date for held rolling-window currencies
        #[arg(long)]
        project_rolling: bool,
    },

    /// List the composites that reference a currency
    UsedIn {
        /// Currency id
        id: String,
    },

    /// Check whether a proposed logic tree would create a reference cycle
    CheckCycle {
        /// Composite id being edited
        composite_id: String,

        /// File holding the proposed logic tree (JSON)
        #[arg(long)]
        tree: PathBuf,
    },

    /// Delete a currency (refused while any composite references it)
    Delete {
        /// Currency id
        id: String,
    },

    /// Validate the definition file
    Validate,

    /// List currency definitions
    List {
        /// Only primitive currencies
        #[arg(long, conflicts_with = "composites")]
        primitives: bool,

        /// Only composite currencies
        #[arg(long)]
        composites: bool,
    },
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let definitions = cli.definitions.clone();

    let result = match cli.command {
        Commands::Evaluate {
            history,
            person,
            date,
            all,
            json,
            config,
            threshold,
            max_depth,
            project_rolling,
        } => {
            let options = EvaluateOptions {
                all,
                json,
                config,
                threshold,
                max_depth,
                project_rolling,
            };
            cmd_evaluate(
                &definitions,
                &history,
                person.as_deref(),
                date.as_deref(),
                &options,
            )
        }
        Commands::UsedIn { id } => cmd_used_in(&definitions, &id),
        Commands::CheckCycle { composite_id, tree } => {
            cmd_check_cycle(&definitions, &composite_id, &tree)
        }
        Commands::Delete { id } => cmd_delete(&definitions, &id),
        Commands::Validate => cmd_validate(&definitions),
        Commands::List {
            primitives,
            composites,
        } => cmd_list(&definitions, primitives, composites),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Load the definition file without blocking on validation errors.
///
/// Evaluation tolerates cycles and dangling references, so a broken file
/// can still be inspected.
fn load_set(path: &Path) -> Result<DefinitionSet> {
    let defs = load_definitions(path)
        .with_context(|| format!("failed to load definitions from {}", path.display()))?;
    debug!("loaded {} definitions from {}", defs.len(), path.display());
    Ok(DefinitionSet::unchecked(0, defs)?)
}

fn parse_date_arg(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => Ok(parse_date(s)?),
        None => Ok(today()),
    }
}

fn opt_date(date: Option<NaiveDate>) -> String {
    date.map(format_date).unwrap_or_else(|| "-".to_string())
}

fn opt_days(days: Option<i64>) -> String {
    days.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

struct EvaluateOptions {
    all: bool,
    json: bool,
    config: Option<PathBuf>,
    threshold: Option<i64>,
    max_depth: Option<usize>,
    project_rolling: bool,
}

impl EvaluateOptions {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)
                .with_context(|| format!("failed to load engine config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(days) = self.threshold {
            config = config.with_expiring_soon_days(days);
        }
        if let Some(depth) = self.max_depth {
            config = config.with_max_depth(depth);
        }
        if self.project_rolling {
            config = config.with_rolling_window(RollingWindowMode::ProjectedLapse);
        }
        Ok(config)
    }
}

fn print_statuses(person: &PersonId, statuses: &BTreeMap<String, PersonCurrencyStatus>) {
    println!("Person: {person}");
    if statuses.is_empty() {
        println!("  (no currencies)");
        return;
    }
    println!(
        "  {:<32} {:<14} {:<12} {:>6}",
        "CURRENCY", "STATE", "EXPIRES", "DAYS"
    );
    for (name, status) in statuses {
        println!(
            "  {:<32} {:<14} {:<12} {:>6}",
            name,
            status.state.to_string(),
            opt_date(status.expiry_date),
            opt_days(status.days_remaining)
        );
        for diag in &status.diagnostics {
            println!("      ! {diag}");
        }
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `fcur evaluate --history FILE [--person ID] [--date YYYY-MM-DD]`
fn cmd_evaluate(
    definitions: &Path,
    history_path: &Path,
    person: Option<&str>,
    date: Option<&str>,
    options: &EvaluateOptions,
) -> Result<()> {
    let set = load_set(definitions)?;
    let history: InMemoryHistory = load_history(history_path)
        .with_context(|| format!("failed to load history from {}", history_path.display()))?;
    let as_of = parse_date_arg(date)?;
    let engine = CurrencyEngine::new(Arc::new(set), options.engine_config()?);

    let persons: Vec<PersonId> = match person {
        Some(p) => vec![PersonId::new(p)],
        None => history.persons(),
    };
    if persons.is_empty() {
        return Err(anyhow!(
            "no persons found in {}",
            history_path.display()
        ));
    }

    let results: BTreeMap<PersonId, BTreeMap<String, PersonCurrencyStatus>> = persons
        .iter()
        .map(|p| {
            let statuses = if options.all {
                engine.evaluate(p, &history, as_of)
            } else {
                engine.evaluate_visible(p, &history, as_of)
            };
            (p.clone(), statuses)
        })
        .collect();

    if options.json {
        let json = if let (Some(_), Some((_, statuses))) = (person, results.iter().next()) {
            serde_json::to_string_pretty(statuses)?
        } else {
            serde_json::to_string_pretty(&results)?
        };
        println!("{json}");
        return Ok(());
    }

    println!(
        "Evaluation date: {} (definitions generation {}, {})",
        format_date(as_of),
        engine.definitions().generation(),
        engine.definitions().fingerprint().get(..12).unwrap_or_default()
    );
    for (p, statuses) in &results {
        print_statuses(p, statuses);
    }
    Ok(())
}

/// `fcur used-in ID`
fn cmd_used_in(definitions: &Path, id: &str) -> Result<()> {
    let set = load_set(definitions)?;
    let id = CurrencyId::new(id);
    let def = set
        .get(&id)
        .ok_or_else(|| anyhow!("currency '{id}' not found"))?;

    let users = set.index().references_of(&id);
    if users.is_empty() {
        println!("{} ({}) is not used by any composite", def.name(), id);
        return Ok(());
    }

    println!("{} ({}) is used in {} composite(s):", def.name(), id, users.len());
    for name in &users {
        println!("  {name}");
    }

    let transitive = set.index().dependents_transitive(&id);
    if transitive.len() > users.len() {
        println!("Indirectly affected:");
        for dep in transitive {
            let name = set.index().name_of(&dep);
            if !users.contains(&name) {
                println!("  {name}");
            }
        }
    }
    Ok(())
}

/// `fcur check-cycle COMPOSITE --tree FILE`
fn cmd_check_cycle(definitions: &Path, composite_id: &str, tree_path: &Path) -> Result<()> {
    let set = load_set(definitions)?;
    let bytes = std::fs::read(tree_path)
        .with_context(|| format!("failed to read {}", tree_path.display()))?;
    let tree: LogicNode = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse logic tree {}", tree_path.display()))?;

    let composite_id = CurrencyId::new(composite_id);
    match set.index().cycle_path(&composite_id, &tree) {
        Some(path) => {
            let joined: Vec<&str> = path.iter().map(|id| id.as_str()).collect();
            Err(anyhow!(
                "edit to '{composite_id}' would create a cycle: {}",
                joined.join(" -> ")
            ))
        }
        None => {
            println!("No cycle: '{composite_id}' can take the proposed tree");
            Ok(())
        }
    }
}

/// `fcur delete ID`
fn cmd_delete(definitions: &Path, id: &str) -> Result<()> {
    let defs = load_definitions(definitions)
        .with_context(|| format!("failed to load definitions from {}", definitions.display()))?;

    // Rewriting would keep one copy of each duplicated id and lose the rest.
    let mut duplicates: Vec<String> = validate_definitions(&defs)
        .errors()
        .filter_map(|issue| match issue {
            ValidationIssue::DuplicateId { id } => Some(id.to_string()),
            _ => None,
        })
        .collect();
    duplicates.dedup();
    if !duplicates.is_empty() {
        return Err(anyhow!(
            "refusing to rewrite {}: duplicate id(s) {}; run `fcur validate` and fix the file first",
            definitions.display(),
            duplicates.join(", ")
        ));
    }

    let store = DefinitionStore::new(DefinitionSet::unchecked(0, defs)?);
    let id = CurrencyId::new(id);
    let name = store
        .snapshot()?
        .get(&id)
        .map(|d| d.name().to_string())
        .unwrap_or_else(|| id.to_string());

    let next = store.delete(&id)?;
    save_definitions(definitions, &next.to_vec())
        .with_context(|| format!("failed to write {}", definitions.display()))?;

    println!("Deleted {name} ({id}); {} definition(s) remain", next.len());
    Ok(())
}

/// `fcur validate`
fn cmd_validate(definitions: &Path) -> Result<()> {
    let defs = load_definitions(definitions)
        .with_context(|| format!("failed to load definitions from {}", definitions.display()))?;
    let report = validate_definitions(&defs);

    let errors: Vec<_> = report.errors().collect();
    let warnings: Vec<_> = report.warnings().collect();

    for issue in &errors {
        println!("error:   {issue}");
    }
    for issue in &warnings {
        println!("warning: {issue}");
    }

    if !errors.is_empty() {
        return Err(anyhow!(
            "{} blocking error(s) in {}",
            errors.len(),
            definitions.display()
        ));
    }
    println!(
        "OK: {} definition(s), {} warning(s)",
        defs.len(),
        warnings.len()
    );
    Ok(())
}

/// `fcur list [--primitives|--composites]`
fn cmd_list(definitions: &Path, primitives: bool, composites: bool) -> Result<()> {
    let set = load_set(definitions)?;
    let show_primitives = primitives || !composites;
    let show_composites = composites || !primitives;

    if show_primitives {
        for p in set.list_primitives() {
            let codes: Vec<&str> = p.event_codes.iter().map(String::as_str).collect();
            println!(
                "primitive  {:<20} {:<32} {:?} {}x/{}d [{}]{}",
                p.id.as_str(),
                p.name,
                p.expiry_rule,
                p.required_count,
                p.validity_days,
                codes.join(", "),
                if p.is_visible { "" } else { " (hidden)" }
            );
        }
    }
    if show_composites {
        for c in set.list_composites() {
            println!(
                "composite  {:<20} {:<32} {:?} refs={}{}",
                c.id.as_str(),
                c.name,
                c.expiry_calculation,
                c.logic_tree.referenced_ids().len(),
                if c.is_visible { "" } else { " (hidden)" }
            );
        }
    }
    Ok(())
}
