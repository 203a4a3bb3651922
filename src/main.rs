//! shelver CLI: organize a folder of academic PDFs into a subject taxonomy.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use shelver::config::OrganizerConfig;
use shelver::error::{ShelverError, ShelverResult};
use shelver::journal;
use shelver::library::apply::{FileOutcome, OrganizeReport};
use shelver::library::plan::parse_plan;
use shelver::llm::OpenRouterClient;
use shelver::organizer::Organizer;
use shelver::paths::ShelverPaths;
use shelver::prompt::{ask, confirm};
use shelver::replay;

const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Parser)]
#[command(name = "shelver", version, about = "Organize academic PDFs into a subject taxonomy")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/shelver/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run log to append to and replay (overrides the config file).
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, plan and move the PDFs in a folder (the default).
    Organize(OrganizeArgs),

    /// Show what the run log replays into, without contacting the model.
    Replay {
        /// Also print the most recent organization plan.
        #[arg(long)]
        plan: bool,
    },

    /// Show the effective configuration.
    Config {
        /// Write a default config file if none exists.
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args, Default)]
struct OrganizeArgs {
    /// Folder containing the documents (prompted for when omitted).
    root: Option<PathBuf>,

    /// Resume with the last plan from the run log instead of asking.
    #[arg(long)]
    resume: bool,

    /// Resume with the plan JSON in this file.
    #[arg(long, conflicts_with = "resume")]
    plan_file: Option<PathBuf>,

    /// OpenRouter API key (prompted for when omitted).
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => ShelverPaths::resolve()?.config_file(),
    };
    let mut config = OrganizerConfig::load_or_default(&config_path)?;
    if let Some(log_file) = cli.log_file {
        config.log_file = log_file;
    }

    match cli.command.unwrap_or(Commands::Organize(OrganizeArgs::default())) {
        Commands::Organize(args) => {
            journal::init(&config.log_file)?;
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            organize(config, args, &mut input, &mut output)?;
        }

        Commands::Replay { plan } => {
            let cache = replay::rebuild_cache(&config.log_file);
            if cache.is_empty() {
                println!("No cached metadata in {}", config.log_file.display());
            } else {
                println!("Cached metadata ({}):", cache.len());
                for (filename, metadata) in cache.sorted() {
                    if metadata.is_resolved() {
                        println!("  {filename}: \"{}\" by {}", metadata.title, metadata.author);
                    } else {
                        println!("  {filename}: (unresolved)");
                    }
                }
            }

            if plan {
                match replay::find_last_placement_plan(&config.log_file) {
                    Some(plan) => {
                        let json = serde_json::to_string_pretty(&plan).into_diagnostic()?;
                        println!("\nLast plan ({} placements):\n{json}", plan.len());
                    }
                    None => println!("\nNo plan found in {}", config.log_file.display()),
                }
            }
        }

        Commands::Config { init } => {
            if init {
                if config_path.exists() {
                    println!("Config already exists at {}", config_path.display());
                } else {
                    OrganizerConfig::default().save(&config_path)?;
                    println!("Wrote default config to {}", config_path.display());
                }
            } else {
                let toml = toml::to_string_pretty(&config).into_diagnostic()?;
                println!("# {}\n{toml}", config_path.display());
            }
        }
    }

    Ok(())
}

/// The interactive organize flow: key, folder, then resume or fresh run.
fn organize<R: BufRead, W: Write>(
    config: OrganizerConfig,
    args: OrganizeArgs,
    input: &mut R,
    output: &mut W,
) -> ShelverResult<()> {
    // A bare `shelver` skips clap's env lookup for the organize args.
    let api_key = args.api_key.or_else(|| std::env::var(API_KEY_ENV).ok());
    let api_key = match api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) => key,
        None => ask(input, output, "Please enter your OpenRouter API key: ")?,
    };
    if api_key.is_empty() {
        tracing::error!("No API key provided");
        return Err(ShelverError::MissingApiKey);
    }

    let root = match args.root {
        Some(root) => root,
        None => PathBuf::from(ask(
            input,
            output,
            "Enter the path to the folder containing your documents: ",
        )?),
    };
    if !root.is_dir() {
        tracing::error!("Invalid folder path provided: {}", root.display());
        return Err(ShelverError::RootMissing {
            path: root.display().to_string(),
        });
    }

    let log_file = config.log_file.clone();
    let client = OpenRouterClient::new(config.completion_config(), api_key);
    let mut organizer = Organizer::new(config, Box::new(client));
    tracing::debug!(cached = organizer.cache().len(), "replayed run log");

    let choice = PlanChoice {
        resume: args.resume,
        plan_file: args.plan_file,
        interactive: io::stdin().is_terminal(),
    };
    let (mode, report) = run_organizer(&mut organizer, &root, choice, input, output)?;

    print_report(&report, mode, &log_file);
    Ok(())
}

/// How the plan for a run is to be obtained.
#[derive(Debug, Default)]
struct PlanChoice {
    /// `--resume`: use the last plan from the run log without asking.
    resume: bool,
    /// `--plan-file`: use the plan in this file.
    plan_file: Option<PathBuf>,
    /// Whether to ask the resume question.
    interactive: bool,
}

/// Whether a run requested a new plan or reused one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Fresh,
    Resumed,
}

/// Resume with a recovered, pasted or file plan, or run fresh.
fn run_organizer<R: BufRead, W: Write>(
    organizer: &mut Organizer,
    root: &Path,
    choice: PlanChoice,
    input: &mut R,
    output: &mut W,
) -> ShelverResult<(RunMode, OrganizeReport)> {
    if let Some(plan_file) = choice.plan_file {
        let text = std::fs::read_to_string(&plan_file).map_err(|e| ShelverError::PlanFile {
            path: plan_file.display().to_string(),
            source: e,
        })?;
        let report = organizer.resume(root, &parse_plan(&text)?)?;
        return Ok((RunMode::Resumed, report));
    }

    let resume = choice.resume
        || (choice.interactive
            && confirm(input, output, "Do you want to resume with existing placements?")?);
    if !resume {
        return Ok((RunMode::Fresh, organizer.organize(root)?));
    }

    if let Some(plan) = organizer.recover_plan() {
        println!("Found previous placement JSON in log file.");
        return Ok((RunMode::Resumed, organizer.resume(root, &plan)?));
    }

    println!("No valid placement JSON found in log file.");
    if confirm(input, output, "Would you like to paste the placements JSON manually?")? {
        let pasted = ask(input, output, "Paste the placements JSON: ")?;
        Ok((RunMode::Resumed, organizer.resume(root, &parse_plan(&pasted)?)?))
    } else {
        println!("Starting fresh organization...");
        Ok((RunMode::Fresh, organizer.organize(root)?))
    }
}

fn print_report(report: &OrganizeReport, mode: RunMode, log_file: &Path) {
    for failure in &report.folder_failures {
        println!("  ✗ Could not create folder {failure}");
    }
    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Moved { to, .. } => println!("  ✓ Moved to: {}", to.display()),
            FileOutcome::NoPlacement { work_key } => {
                println!("  ✗ No folder assignment found for '{work_key}'")
            }
            FileOutcome::FolderUnavailable { work_key, folder } => {
                println!("  ✗ Folder '{folder}' for '{work_key}' was not created")
            }
            FileOutcome::MoveFailed { from, message, .. } => {
                println!("  ✗ Error moving {}: {message}", from.display())
            }
        }
    }

    println!("\n=== Organization Complete ===");
    println!(
        "Successfully organized {} out of {} files",
        report.moved(),
        summary_total(report, mode)
    );
    println!("Check {} for detailed information", log_file.display());
}

/// Fresh runs count against the resolved documents, resumes against every file.
fn summary_total(report: &OrganizeReport, mode: RunMode) -> usize {
    match mode {
        RunMode::Fresh => report.total_resolved,
        RunMode::Resumed => report.total_files,
    }
}
