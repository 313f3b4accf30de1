//! Finrec CLI - Command-line interface for the Finrec engine
//!
//! Commands:
//! - train: Fit the per-product classifier ensemble from user feature data
//! - recommend: Serve ranked recommendations for one user from saved artifacts
//! - evaluate: Train with a holdout split and report multi-label metrics
//! - catalog: Print the built-in product catalog
//! - personas: Run the built-in demo profiles against saved artifacts
//! - doctor: Diagnose engine health and saved artifacts

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use finrec::artifacts::TrainedArtifacts;
use finrec::{
    parse_user, EngineError, FeatureFrame, Persona, ProductCatalog, ProductCategory,
    Recommendation, RecommendOptions, Recommender, TrainingConfig, TrainingReport, UserArchetype,
    UserTypeClassifier, ENGINE_NAME, ENGINE_VERSION,
};

/// Finrec - Rule-grounded recommendation engine for financial products
#[derive(Parser)]
#[command(name = "finrec")]
#[command(author = "Finrec Maintainers")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Train and serve financial product recommendations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the classifier ensemble from user feature data
    Train {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Write trained artifacts to this file
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// Training configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output the training report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Serve ranked recommendations for one user
    Recommend {
        /// Trained artifacts file
        #[arg(short, long)]
        artifacts: PathBuf,

        /// User feature JSON object (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Use a built-in demo profile instead of --input
        #[arg(long, conflicts_with = "input")]
        persona: Option<String>,

        /// Maximum number of recommendations
        #[arg(long, default_value = "10")]
        top_n: usize,

        /// Restrict results to one product category
        #[arg(long)]
        category: Option<String>,

        /// Drop candidates at or below this final score
        #[arg(long)]
        min_score: Option<f64>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Train with a holdout split and report multi-label metrics
    Evaluate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Training configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output the evaluation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the built-in product catalog
    Catalog {
        /// Restrict to one product category
        #[arg(long)]
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the built-in demo profiles against saved artifacts
    Personas {
        /// Trained artifacts file
        #[arg(short, long)]
        artifacts: PathBuf,

        /// Run a single profile by name
        #[arg(long)]
        persona: Option<String>,

        /// Maximum number of recommendations per profile
        #[arg(long, default_value = "5")]
        top_n: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine health and saved artifacts
    Doctor {
        /// Check a trained artifacts file
        #[arg(long)]
        artifacts: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one user per line)
    Ndjson,
    /// JSON array of user objects
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one recommendation per line)
    Ndjson,
    /// JSON array of recommendations
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-parseable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), FinrecCliError> {
    match cli.command {
        Commands::Train {
            input,
            input_format,
            artifacts,
            config,
            json,
        } => cmd_train(
            &input,
            input_format,
            artifacts.as_deref(),
            config.as_deref(),
            json,
        ),

        Commands::Recommend {
            artifacts,
            input,
            persona,
            top_n,
            category,
            min_score,
            output_format,
        } => cmd_recommend(
            &artifacts,
            input.as_deref(),
            persona.as_deref(),
            top_n,
            category,
            min_score,
            output_format,
        ),

        Commands::Evaluate {
            input,
            input_format,
            config,
            json,
        } => cmd_evaluate(&input, input_format, config.as_deref(), json),

        Commands::Catalog { category, json } => cmd_catalog(category.as_deref(), json),

        Commands::Personas {
            artifacts,
            persona,
            top_n,
            json,
        } => cmd_personas(&artifacts, persona.as_deref(), top_n, json),

        Commands::Doctor { artifacts, json } => cmd_doctor(artifacts.as_deref(), json),
    }
}

fn cmd_train(
    input: &Path,
    input_format: InputFormat,
    artifacts: Option<&Path>,
    config: Option<&Path>,
    json: bool,
) -> Result<(), FinrecCliError> {
    let frame = read_frame(input, input_format)?;
    let config = load_config(config)?;

    let mut recommender = Recommender::new().with_config(config);
    let report = recommender.train(&frame)?;
    if let Some(artifacts_path) = artifacts {
        fs::write(artifacts_path, recommender.save_artifacts()?)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_training_summary(&report);
        if let Some(artifacts_path) = artifacts {
            println!();
            println!("Artifacts written to {}", artifacts_path.display());
        }
    }

    Ok(())
}

fn cmd_recommend(
    artifacts: &Path,
    input: Option<&Path>,
    persona: Option<&str>,
    top_n: usize,
    category: Option<String>,
    min_score: Option<f64>,
    output_format: OutputFormat,
) -> Result<(), FinrecCliError> {
    if let Some(name) = category.as_deref() {
        if ProductCategory::parse(name).is_none() {
            return Err(FinrecCliError::UnknownCategory(name.to_string()));
        }
    }

    let recommender = load_recommender(artifacts)?;
    let features = match (persona, input) {
        (Some(name), _) => lookup_persona(name)?.features(),
        (None, Some(path)) => parse_user(&read_input(path)?)?,
        (None, None) => return Err(FinrecCliError::NoUser),
    };

    let options = RecommendOptions {
        top_n,
        category,
        min_score,
    };
    let recommendations = recommender.recommend(&features, &options);
    print!("{}", format_recommendations(&recommendations, &output_format)?);

    Ok(())
}

fn cmd_evaluate(
    input: &Path,
    input_format: InputFormat,
    config: Option<&Path>,
    json: bool,
) -> Result<(), FinrecCliError> {
    let frame = read_frame(input, input_format)?;
    let config = load_config(config)?;
    if config.test_fraction <= 0.0 {
        return Err(FinrecCliError::NoHoldout);
    }

    let mut recommender = Recommender::new().with_config(config);
    let report = recommender.train(&frame)?;
    let evaluation = report.evaluation.as_ref().ok_or(FinrecCliError::NoHoldout)?;

    if json {
        println!("{}", serde_json::to_string_pretty(evaluation)?);
    } else {
        println!("Evaluation Report");
        println!("=================");
        println!("Users evaluated:    {}", evaluation.evaluated_users);
        println!("Products evaluated: {}", evaluation.evaluated_products);
        println!("Hamming loss:       {:.4}", evaluation.hamming_loss);
        println!("Jaccard score:      {:.4}", evaluation.jaccard_score);
        println!("Coverage:           {:.4}", evaluation.coverage);
    }

    Ok(())
}

fn cmd_catalog(category: Option<&str>, json: bool) -> Result<(), FinrecCliError> {
    let catalog = ProductCatalog::default_catalog();
    let filter = match category {
        Some(name) => Some(
            ProductCategory::parse(name)
                .ok_or_else(|| FinrecCliError::UnknownCategory(name.to_string()))?,
        ),
        None => None,
    };

    let entries: Vec<_> = catalog
        .iter()
        .filter(|entry| filter.map_or(true, |c| entry.category == c))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("Product Catalog ({} products)", entries.len());
        for group_category in ProductCategory::ALL {
            let group: Vec<_> = entries
                .iter()
                .filter(|e| e.category == group_category)
                .collect();
            if group.is_empty() {
                continue;
            }
            println!();
            println!("{} ({}):", group_category.as_str(), group.len());
            for entry in group {
                println!(
                    "  {:<24} priority {:>2}   min age {}",
                    entry.id, entry.priority, entry.min_age
                );
            }
        }
    }

    Ok(())
}

fn cmd_personas(
    artifacts: &Path,
    persona: Option<&str>,
    top_n: usize,
    json: bool,
) -> Result<(), FinrecCliError> {
    let recommender = load_recommender(artifacts)?;
    let selected: Vec<Persona> = match persona {
        Some(name) => vec![lookup_persona(name)?],
        None => Persona::ALL.to_vec(),
    };

    let options = RecommendOptions {
        top_n,
        category: None,
        min_score: None,
    };
    let mut runs: Vec<PersonaRun> = Vec::new();
    for persona in selected {
        let features = persona.features();
        runs.push(PersonaRun {
            persona: persona.as_str().to_string(),
            archetype: UserTypeClassifier::classify(&features),
            recommendations: recommender.recommend(&features, &options),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
    } else {
        for run in &runs {
            println!("=== {} (archetype: {}) ===", run.persona, run.archetype.as_str());
            if run.recommendations.is_empty() {
                println!("  No recommendations for this profile");
            }
            for (i, r) in run.recommendations.iter().enumerate() {
                println!(
                    "  {}. {:<24} score {}  probability {:>6}  [{}]",
                    i + 1,
                    r.product_id,
                    r.score,
                    r.probability,
                    r.category.as_str()
                );
                println!("     Recommended because: {}", r.explanation);
            }
            println!();
        }
    }

    Ok(())
}

fn cmd_doctor(artifacts: Option<&Path>, json: bool) -> Result<(), FinrecCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    // Check engine version
    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Finrec version {}", ENGINE_VERSION),
    });

    // Check built-in catalog
    let catalog = ProductCatalog::default_catalog();
    checks.push(DoctorCheck {
        name: "catalog".to_string(),
        status: CheckStatus::Ok,
        message: format!("Built-in catalog valid ({} products)", catalog.len()),
    });

    // Check artifacts file if provided
    if let Some(artifacts_path) = artifacts {
        if artifacts_path.exists() {
            match fs::read_to_string(artifacts_path) {
                Ok(content) => match TrainedArtifacts::from_json(&content) {
                    Ok(artifacts) => match artifacts.validate() {
                        Ok(()) => {
                            let status = if artifacts.engine_version == ENGINE_VERSION {
                                CheckStatus::Ok
                            } else {
                                CheckStatus::Warning
                            };
                            checks.push(DoctorCheck {
                                name: "artifacts".to_string(),
                                status,
                                message: format!(
                                    "Artifacts valid: {} classifiers, generation {}, produced by version {}",
                                    artifacts.trained_ids.len(),
                                    artifacts.generation_id,
                                    artifacts.engine_version
                                ),
                            });
                        }
                        Err(e) => {
                            checks.push(DoctorCheck {
                                name: "artifacts".to_string(),
                                status: CheckStatus::Error,
                                message: format!("Artifacts failed validation: {}", e),
                            });
                        }
                    },
                    Err(e) => {
                        checks.push(DoctorCheck {
                            name: "artifacts".to_string(),
                            status: CheckStatus::Error,
                            message: format!("Invalid artifacts JSON: {}", e),
                        });
                    }
                },
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "artifacts".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Cannot read artifacts file: {}", e),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "artifacts".to_string(),
                status: CheckStatus::Warning,
                message: "Artifacts file does not exist".to_string(),
            });
        }
    }

    // Check stdin is available (for piped input)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: ENGINE_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Finrec Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!();
        println!("Checks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FinrecCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, FinrecCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(FinrecCliError::NoStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_frame(input: &Path, input_format: InputFormat) -> Result<FeatureFrame, FinrecCliError> {
    let input_data = read_input(input)?;
    let frame = match input_format {
        InputFormat::Ndjson => FeatureFrame::parse_ndjson(&input_data)?,
        InputFormat::Json => FeatureFrame::parse_array(&input_data)?,
    };
    Ok(frame)
}

fn load_config(path: Option<&Path>) -> Result<TrainingConfig, FinrecCliError> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(TrainingConfig::default()),
    }
}

fn load_recommender(artifacts: &Path) -> Result<Recommender, FinrecCliError> {
    let mut recommender = Recommender::new();
    recommender.load_artifacts(&fs::read_to_string(artifacts)?)?;
    Ok(recommender)
}

fn lookup_persona(name: &str) -> Result<Persona, FinrecCliError> {
    Persona::parse(name).ok_or_else(|| FinrecCliError::UnknownPersona(name.to_string()))
}

fn print_training_summary(report: &TrainingReport) {
    println!("Training Report");
    println!("===============");
    println!("Users:            {}", report.users);
    println!("Features:         {}", report.features);
    println!("Products trained: {}", report.trained);
    println!("Products skipped: {}", report.skipped);
    println!("Products failed:  {}", report.failed);
    println!("Label coverage:   {} products", report.label_coverage);
    println!("Labels per user:  {:.2}", report.mean_labels_per_user);

    if let Some(evaluation) = &report.evaluation {
        println!();
        println!("Holdout evaluation ({} users):", evaluation.evaluated_users);
        println!("  Hamming loss:  {:.4}", evaluation.hamming_loss);
        println!("  Jaccard score: {:.4}", evaluation.jaccard_score);
        println!("  Coverage:      {:.4}", evaluation.coverage);
    }
}

fn format_recommendations(
    recommendations: &[Recommendation],
    format: &OutputFormat,
) -> Result<String, FinrecCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for recommendation in recommendations {
                lines.push(serde_json::to_string(recommendation)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(recommendations)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(recommendations)?),
    }
}

// Error types

#[derive(Debug)]
enum FinrecCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoStdin,
    NoUser,
    UnknownPersona(String),
    UnknownCategory(String),
    NoHoldout,
    DoctorFailed,
}

impl From<io::Error> for FinrecCliError {
    fn from(e: io::Error) -> Self {
        FinrecCliError::Io(e)
    }
}

impl From<EngineError> for FinrecCliError {
    fn from(e: EngineError) -> Self {
        FinrecCliError::Engine(e)
    }
}

impl From<serde_json::Error> for FinrecCliError {
    fn from(e: serde_json::Error) -> Self {
        FinrecCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FinrecCliError> for CliError {
    fn from(e: FinrecCliError) -> Self {
        match e {
            FinrecCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FinrecCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'finrec doctor' to check engine health".to_string()),
            },
            FinrecCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FinrecCliError::NoStdin => CliError {
                code: "NO_STDIN".to_string(),
                message: "stdin is a TTY with no piped input".to_string(),
                hint: Some("Pipe input or pass a file path instead of -".to_string()),
            },
            FinrecCliError::NoUser => CliError {
                code: "NO_USER".to_string(),
                message: "No user features provided".to_string(),
                hint: Some("Pass --input or --persona".to_string()),
            },
            FinrecCliError::UnknownPersona(name) => CliError {
                code: "UNKNOWN_PERSONA".to_string(),
                message: format!("Unknown persona: {}", name),
                hint: Some(format!(
                    "Known personas: {}",
                    Persona::ALL.map(|p| p.as_str()).join(", ")
                )),
            },
            FinrecCliError::UnknownCategory(name) => CliError {
                code: "UNKNOWN_CATEGORY".to_string(),
                message: format!("Unknown product category: {}", name),
                hint: Some(format!(
                    "Known categories: {}",
                    ProductCategory::ALL.map(|c| c.as_str()).join(", ")
                )),
            },
            FinrecCliError::NoHoldout => CliError {
                code: "NO_HOLDOUT".to_string(),
                message: "Training reserved no holdout rows to evaluate".to_string(),
                hint: Some("Set test_fraction above zero in the training config".to_string()),
            },
            FinrecCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct PersonaRun {
    persona: String,
    archetype: UserArchetype,
    recommendations: Vec<Recommendation>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
