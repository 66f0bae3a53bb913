//! OpenField CLI - Command-line interface for OpenField Flux
//!
//! Commands:
//! - analyze: Bin and aggregate a cohort of subject records into a report
//! - validate: Validate one subject record
//! - rotarod: Summarize rotarod trials into learning curves
//! - doctor: Diagnose configuration and data directory health
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use openfield_flux::adapter::{load_roster, load_subject, parse_subject, subject_file_name};
use openfield_flux::encoder::REPORT_VERSION;
use openfield_flux::events::count_in_window;
use openfield_flux::rotarod::{analyze_rotarod, parse_trials};
use openfield_flux::{
    AnalysisConfig, AnalysisError, CohortProcessor, ReportEncoder, PRODUCER_NAME, VERSION,
};

/// OpenField - Binning and aggregation of open-field behavioral events
#[derive(Parser)]
#[command(name = "openfield")]
#[command(version = VERSION)]
#[command(about = "Bin and aggregate open-field behavioral event streams", long_about = None)]
struct Cli {
    /// Enable debug logging to stderr (RUST_LOG refines the filter)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every roster subject in a data directory
    Analyze {
        /// Directory holding `<ID>_OpenField_rawdata.json` files
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Analysis config file (JSON); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,

        /// Skip cross-subject reductions
        #[arg(long)]
        no_summary: bool,
    },

    /// Validate one subject record
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis config file used for the window check
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize rotarod trials into learning curves
    Rotarod {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Diagnose configuration and data directory health
    Doctor {
        /// Data directory to check
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Analysis config file to check
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Subject record input
    Input,
    /// Cohort report output
    Output,
    /// Rotarod trial input
    Rotarod,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

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

fn init_tracing(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(io::stderr)
            .init();
    }
}

fn run(cli: Cli) -> Result<(), OpenfieldCliError> {
    match cli.command {
        Commands::Analyze {
            data_dir,
            config,
            output,
            pretty,
            no_summary,
        } => cmd_analyze(&data_dir, config.as_deref(), &output, pretty, no_summary),

        Commands::Validate {
            input,
            config,
            json,
        } => cmd_validate(&input, config.as_deref(), json),

        Commands::Rotarod {
            input,
            output,
            pretty,
        } => cmd_rotarod(&input, &output, pretty),

        Commands::Doctor {
            data_dir,
            config,
            json,
        } => cmd_doctor(data_dir.as_deref(), config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_analyze(
    data_dir: &Path,
    config_path: Option<&Path>,
    output: &Path,
    pretty: bool,
    no_summary: bool,
) -> Result<(), OpenfieldCliError> {
    if !data_dir.is_dir() {
        return Err(OpenfieldCliError::MissingDataDir(data_dir.to_path_buf()));
    }

    let config = load_config(config_path)?;
    let loaded = load_roster(data_dir, &config.roster)?;

    let mut processor = CohortProcessor::new(config);
    for (id, record) in &loaded {
        processor.add_loaded(id.clone(), record.as_ref())?;
    }

    if processor.subject_count() == 0 {
        return Err(OpenfieldCliError::NoSubjects);
    }

    let summary = if no_summary {
        None
    } else {
        Some(processor.summarize()?)
    };

    let report = ReportEncoder::new().encode(&processor, summary)?;
    let output_data = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    write_output(output, &output_data)
}

fn cmd_validate(
    input: &Path,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), OpenfieldCliError> {
    let config = load_config(config_path)?;
    let input_data = read_input(input)?;
    let record = parse_subject(&input_data)?;

    let window = &config.window;
    let crossings_in_window = count_in_window(&record.crossing_times, window);
    let periphery_in_window = count_in_window(&record.periphery_times, window);

    let mut warnings = Vec::new();
    if periphery_in_window > crossings_in_window {
        warnings.push(format!(
            "{periphery_in_window} periphery crossings exceed {crossings_in_window} total crossings in window"
        ));
    }
    if record
        .crossing_times
        .iter()
        .chain(&record.periphery_times)
        .any(|t| !t.is_finite() || *t < 0.0)
    {
        warnings.push("negative or non-finite timestamps present".to_string());
    }
    for key in &config.behaviors {
        if record.behavior(key).is_none() {
            warnings.push(format!("behavior '{key}' absent, treated as no occurrences"));
        }
    }

    let report = ValidationReport {
        crossings: record.crossing_times.len(),
        crossings_in_window,
        periphery: record.periphery_times.len(),
        periphery_in_window,
        behaviors: record
            .interval_behaviors
            .iter()
            .map(|(key, series)| (key.clone(), series.len()))
            .collect(),
        warnings,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!(
            "Crossings:  {} ({} in window)",
            report.crossings, report.crossings_in_window
        );
        println!(
            "Periphery:  {} ({} in window)",
            report.periphery, report.periphery_in_window
        );
        for (key, count) in &report.behaviors {
            println!("Behavior:   {key} ({count} intervals)");
        }
        if !report.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &report.warnings {
                println!("  - {warning}");
            }
        }
    }

    Ok(())
}

fn cmd_rotarod(input: &Path, output: &Path, pretty: bool) -> Result<(), OpenfieldCliError> {
    let input_data = read_input(input)?;
    let trials = parse_trials(&input_data)?;
    if trials.is_empty() {
        return Err(OpenfieldCliError::NoTrials);
    }

    let report = analyze_rotarod(trials)?;
    let output_data = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    write_output(output, &output_data)
}

fn cmd_doctor(
    data_dir: Option<&Path>,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), OpenfieldCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("OpenField Flux {VERSION}, report schema {REPORT_VERSION}"),
    });

    let config = match load_config(config_path) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "window {}..{} s, {} s bins, {} subjects",
                    config.window.start(),
                    config.window.end(),
                    config.bin().seconds(),
                    config.roster.len()
                ),
            });
            Some(config)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: CliError::from(e).message,
            });
            None
        }
    };

    if let (Some(dir), Some(config)) = (data_dir, &config) {
        if dir.is_dir() {
            for id in &config.roster {
                let check = match load_subject(dir, id) {
                    Ok(Some(_)) => DoctorCheck {
                        name: id.code(),
                        status: CheckStatus::Ok,
                        message: format!("{} readable", subject_file_name(id)),
                    },
                    Ok(None) => DoctorCheck {
                        name: id.code(),
                        status: CheckStatus::Warning,
                        message: format!("{} missing, subject will be skipped", subject_file_name(id)),
                    },
                    Err(e) => DoctorCheck {
                        name: id.code(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                };
                checks.push(check);
            }
        } else {
            checks.push(DoctorCheck {
                name: "data_dir".to_string(),
                status: CheckStatus::Error,
                message: format!("{} is not a directory", dir.display()),
            });
        }
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("OpenField Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
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
        Err(OpenfieldCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), OpenfieldCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", input_json_schema());
            } else {
                println!("Input: one JSON file per subject, <ID>_OpenField_rawdata.json");
                println!();
                println!("- subject_id: optional, the roster id is authoritative");
                println!("- crossing_times: seconds of every line crossing");
                println!("- periphery_times: seconds of crossings into the periphery");
                println!("- interval_behaviors: {{ <key>: {{ starts: [..], ends: [..] }} }}");
                println!("  - default keys: Freezing_start_stop, grooming_start_stop");
                println!("  - a missing key means no occurrences");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", output_json_schema());
            } else {
                println!("Output: cohort report v{REPORT_VERSION}");
                println!();
                println!("- report_version, producer {{ name, version, instance_id }}");
                println!("- provenance {{ computed_at_utc }}");
                println!("- quality {{ subjects_analyzed, subjects_skipped, flags }}");
                println!("- config: window, bin size, behaviors, roster");
                println!("- bin_ends_minutes: bin end labels relative to the window start");
                println!("- subjects: per-subject binned counts, thigmotaxis, durations, ratio");
                println!("- skipped: roster subjects without a record");
                println!("- summary: means by sex and by cohort, ratio mean/SEM/n by sex");
            }
        }
        SchemaType::Rotarod => {
            if json_schema {
                println!("{}", rotarod_json_schema());
            } else {
                println!("Rotarod input: JSON array of trials");
                println!();
                println!("- subject: subject code (e.g. MB)");
                println!("- recorded_at: local date-time, e.g. 2025-07-12T10:00:00");
                println!("- latency_to_fall_sec: non-negative seconds");
                println!();
                println!("Sessions are numbered chronologically per subject.");
            }
        }
    }
    Ok(())
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, OpenfieldCliError> {
    match path {
        Some(path) => Ok(AnalysisConfig::load(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, OpenfieldCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), OpenfieldCliError> {
    if output.to_string_lossy() == "-" {
        println!("{data}");
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn input_json_schema() -> String {
    let intervals = serde_json::json!({
        "type": "object",
        "required": ["starts", "ends"],
        "properties": {
            "starts": { "type": "array", "items": { "type": "number" } },
            "ends": { "type": "array", "items": { "type": "number" } }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "openfield.subject_record.v1",
        "type": "object",
        "properties": {
            "subject_id": { "type": "string", "pattern": "^[MF][A-Za-z0-9]+$" },
            "crossing_times": { "type": "array", "items": { "type": "number", "minimum": 0 } },
            "periphery_times": { "type": "array", "items": { "type": "number", "minimum": 0 } },
            "interval_behaviors": {
                "type": "object",
                "additionalProperties": intervals
            }
        }
    })
    .to_string()
}

fn output_json_schema() -> String {
    let binned = serde_json::json!({
        "type": "object",
        "required": ["values", "bin_ends_minutes"],
        "properties": {
            "values": { "type": "array", "items": { "type": "number" } },
            "bin_ends_minutes": { "type": "array", "items": { "type": "number" } }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "openfield.cohort_report",
        "type": "object",
        "required": [
            "report_version", "producer", "provenance", "quality",
            "config", "bin_ends_minutes", "subjects", "skipped"
        ],
        "properties": {
            "report_version": { "type": "string", "const": REPORT_VERSION },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "provenance": {
                "type": "object",
                "properties": {
                    "computed_at_utc": { "type": "string", "format": "date-time" }
                }
            },
            "quality": {
                "type": "object",
                "properties": {
                    "subjects_analyzed": { "type": "integer" },
                    "subjects_skipped": { "type": "integer" },
                    "flags": {
                        "type": "array",
                        "items": { "enum": ["missing_subjects", "short_final_bin", "no_summary"] }
                    }
                }
            },
            "config": { "type": "object" },
            "bin_ends_minutes": { "type": "array", "items": { "type": "number" } },
            "subjects": {
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "properties": {
                        "total_crossings": binned.clone(),
                        "accumulated_crossings": binned.clone(),
                        "periphery_crossings": binned.clone(),
                        "accumulated_periphery_crossings": binned.clone(),
                        "thigmotaxis_index": binned.clone(),
                        "behavior_durations": { "type": "object", "additionalProperties": binned },
                        "periphery_center_ratio": { "type": "number" }
                    }
                }
            },
            "skipped": { "type": "array", "items": { "type": "string" } },
            "summary": { "type": "object" }
        }
    })
    .to_string()
}

fn rotarod_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "openfield.rotarod_trials",
        "type": "array",
        "items": {
            "type": "object",
            "required": ["subject", "recorded_at", "latency_to_fall_sec"],
            "properties": {
                "subject": { "type": "string", "pattern": "^[MF][A-Za-z0-9]+$" },
                "recorded_at": { "type": "string" },
                "latency_to_fall_sec": { "type": "number", "minimum": 0 }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum OpenfieldCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    MissingDataDir(PathBuf),
    NoSubjects,
    NoTrials,
    DoctorFailed,
}

impl From<io::Error> for OpenfieldCliError {
    fn from(e: io::Error) -> Self {
        OpenfieldCliError::Io(e)
    }
}

impl From<AnalysisError> for OpenfieldCliError {
    fn from(e: AnalysisError) -> Self {
        OpenfieldCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for OpenfieldCliError {
    fn from(e: serde_json::Error) -> Self {
        OpenfieldCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AnalysisError> for CliError {
    fn from(e: AnalysisError) -> Self {
        let (code, hint) = match &e {
            AnalysisError::InvalidWindow { .. } | AnalysisError::InvalidBinSize(_) => (
                "CONFIG_ERROR",
                "Window end must exceed start; bin size must be positive and yield at most 100000 bins",
            ),
            AnalysisError::EmptyGroup(_) => (
                "EMPTY_GROUP",
                "Both sexes need at least one subject; use --no-summary for partial cohorts",
            ),
            AnalysisError::LengthMismatch { .. } | AnalysisError::BinMismatch { .. } => (
                "BIN_MISMATCH",
                "All series must come from one window and bin size",
            ),
            AnalysisError::InvalidSubjectId(_) => (
                "INVALID_SUBJECT",
                "Subject codes start with M or F followed by a cohort code",
            ),
            AnalysisError::MismatchedIntervals { .. }
            | AnalysisError::InvalidInterval { .. }
            | AnalysisError::ParseError(_) => (
                "PARSE_ERROR",
                "Run 'openfield schema input' for the expected format",
            ),
            AnalysisError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
            AnalysisError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
        };
        CliError {
            code: code.to_string(),
            message: e.to_string(),
            hint: Some(hint.to_string()),
        }
    }
}

impl From<OpenfieldCliError> for CliError {
    fn from(e: OpenfieldCliError) -> Self {
        match e {
            OpenfieldCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            OpenfieldCliError::Analysis(e) => CliError::from(e),
            OpenfieldCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            OpenfieldCliError::MissingDataDir(dir) => CliError {
                code: "NO_DATA_DIR".to_string(),
                message: format!("{} is not a directory", dir.display()),
                hint: Some("Pass the directory holding the subject JSON files".to_string()),
            },
            OpenfieldCliError::NoSubjects => CliError {
                code: "NO_SUBJECTS".to_string(),
                message: "No roster subject has a record".to_string(),
                hint: Some("Run 'openfield doctor --data-dir <DIR>' for details".to_string()),
            },
            OpenfieldCliError::NoTrials => CliError {
                code: "NO_TRIALS".to_string(),
                message: "No rotarod trials found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            OpenfieldCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    crossings: usize,
    crossings_in_window: usize,
    periphery: usize,
    periphery_in_window: usize,
    behaviors: BTreeMap<String, usize>,
    warnings: Vec<String>,
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
