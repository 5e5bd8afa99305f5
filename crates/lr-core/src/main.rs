//! logredact - streaming redaction of MongoDB logs
//!
//! The main entry point, handling:
//! - `redact`: mask sensitive values in a log file or stream
//! - `detect`: report the detected log format
//! - `patterns`: list the active pattern registry
//! - `config`: show or validate configuration
//! - `sample`: write demo log files

use clap::{Args, Parser, Subcommand, ValueEnum};
use lr_core::config::{
    load_config, ConfigError, ConfigOptions, ConfigOverrides, ConfigSource, ResolvedConfig,
};
use lr_core::events::{
    event_names as progress_names, EmitterObserver, JsonlWriter, Phase, ProgressEmitter,
    ProgressEvent, TracingEmitter,
};
use lr_core::exit_codes::ExitCode;
use lr_core::logging::{
    event_names, generate_run_id, init_logging, run_span, verbosity_level, LogConfig, LogFormat,
    Stage,
};
use lr_core::output::{render_human, render_json, render_patterns, SummaryFormat};
use lr_core::{interrupt, sample};
use lr_redact::{
    detect_stream, LogFormat as InputFormat, NoopObserver, ProgressObserver, RedactionEngine,
    RedactionError, StreamOptions, StreamProcessor, ValidatorKind,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read and write buffer size for file and pipe I/O.
const IO_BUFFER_BYTES: usize = 1 << 20;

/// Redact connection IDs, addresses, identifiers and PII from MongoDB logs
#[derive(Parser)]
#[command(name = "logredact")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to a JSON config file (overrides LOGREDACT_CONFIG and XDG lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format on stderr (human or jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Redact sensitive values from a log file or stream
    Redact(RedactArgs),

    /// Print the detected format of a log
    Detect(DetectArgs),

    /// List active patterns in application order
    Patterns(PatternsArgs),

    /// Show or validate configuration
    Config(ConfigArgs),

    /// Write demo log files
    Sample(SampleArgs),
}

#[derive(Args, Debug)]
struct RedactArgs {
    /// Input log file, or `-` for stdin
    input: String,

    /// Output file, or `-` for stdout [default: <stem>.redacted.<ext>]
    output: Option<String>,

    /// Lines per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Force the input format instead of detecting it
    #[arg(long, value_enum, default_value_t = FormatChoice::Auto)]
    format: FormatChoice,

    /// Character used to mask sensitive spans
    #[arg(long)]
    mask_char: Option<char>,

    /// Phone validator (auto, numbering_plan, heuristic)
    #[arg(long)]
    validator: Option<ValidatorKind>,

    /// How batch progress is reported on stderr
    #[arg(long, value_enum, default_value_t = ProgressMode::Log)]
    progress: ProgressMode,

    /// End-of-run summary format
    #[arg(long, value_enum, default_value_t = SummaryFormat::Human)]
    summary: SummaryFormat,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// Input log file, or `-` for stdin
    input: String,

    /// Print a JSON object instead of the bare format name
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PatternsArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration and where it came from
    Show,

    /// Validate a config file (defaults to the resolved one)
    Validate {
        /// Config file to check
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// Directory to write the sample logs into
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatChoice {
    Auto,
    Structured,
    Freeform,
}

impl FormatChoice {
    fn forced(self) -> Option<InputFormat> {
        match self {
            FormatChoice::Auto => None,
            FormatChoice::Structured => Some(InputFormat::Structured),
            FormatChoice::Freeform => Some(InputFormat::Freeform),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProgressMode {
    Off,
    Log,
    Jsonl,
}

/// A file path or the standard stream (`-`).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Std,
    Path(PathBuf),
}

impl Endpoint {
    fn parse(arg: &str) -> Self {
        if arg == "-" {
            Endpoint::Std
        } else {
            Endpoint::Path(PathBuf::from(arg))
        }
    }

    fn label(&self, std_name: &str) -> String {
        match self {
            Endpoint::Std => std_name.to_string(),
            Endpoint::Path(path) => path.display().to_string(),
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            std::process::exit(code.as_i32());
        }
    };

    let log_config = LogConfig::from_env(
        verbosity_level(cli.global.verbose, cli.global.quiet),
        cli.global.log_format,
    );
    init_logging(&log_config);

    let run_id = generate_run_id();
    let exit_code = match &cli.command {
        Commands::Redact(args) => run_redact(&cli.global, args, &run_id),
        Commands::Detect(args) => run_detect(&cli.global, args, &run_id),
        Commands::Patterns(args) => run_patterns(&cli.global, args),
        Commands::Config(args) => run_config(&cli.global, args),
        Commands::Sample(args) => run_sample(args),
    };

    std::process::exit(exit_code.as_i32());
}

fn run_redact(global: &GlobalOpts, args: &RedactArgs, run_id: &str) -> ExitCode {
    let overrides = ConfigOverrides {
        batch_size: args.batch_size,
        mask_char: args.mask_char,
        phone_validator: args.validator,
    };
    let config = {
        let _init = run_span(run_id, Stage::Init).entered();
        match resolve_config(global, &overrides) {
            Ok(resolved) => resolved.config,
            Err(code) => return code,
        }
    };

    let redact_span = run_span(run_id, Stage::Redact).entered();

    let input = Endpoint::parse(&args.input);
    let output = match &args.output {
        Some(arg) => Endpoint::parse(arg),
        None => match &input {
            Endpoint::Std => Endpoint::Std,
            Endpoint::Path(path) => Endpoint::Path(default_output_path(path)),
        },
    };
    if let (Endpoint::Path(i), Endpoint::Path(o)) = (&input, &output) {
        if same_file(i, o) {
            eprintln!("error: output would overwrite the input file {}", i.display());
            return ExitCode::ArgsError;
        }
    }

    // Input is opened first so a missing file never leaves an empty output behind.
    let reader = match open_input(&input) {
        Ok(reader) => reader,
        Err(e) => return report_error(&e),
    };
    let engine = match RedactionEngine::from_config(&config) {
        Ok(engine) => engine,
        Err(e) => return report_error(&e),
    };
    let writer = match open_output(&output) {
        Ok(writer) => writer,
        Err(e) => return report_error(&e),
    };

    let emitter: Option<Arc<dyn ProgressEmitter>> = match args.progress {
        ProgressMode::Off => None,
        ProgressMode::Log => Some(Arc::new(TracingEmitter)),
        ProgressMode::Jsonl => Some(Arc::new(JsonlWriter::new(io::stderr()))),
    };
    let mut observer: Box<dyn ProgressObserver> = match &emitter {
        Some(emitter) => Box::new(EmitterObserver::new(run_id, emitter.clone())),
        None => Box::new(NoopObserver),
    };

    let options = StreamOptions::from_config(&config)
        .with_labels(input.label("<stdin>"), output.label("<stdout>"))
        .with_format(args.format.forced());

    tracing::info!(
        target: event_names::RUN_STARTED,
        input = %options.input_label,
        output = %options.output_label,
        batch_size = options.batch_size,
        "redaction started"
    );
    if let Some(emitter) = &emitter {
        emitter.emit(
            ProgressEvent::new(progress_names::RUN_STARTED, Phase::Detect)
                .with_run_id(run_id)
                .with_detail("input", &options.input_label)
                .with_detail("output", &options.output_label),
        );
    }

    let mut processor =
        StreamProcessor::new(engine, options).with_cancel_flag(interrupt::install());
    let summary = match processor.process(reader, writer, observer.as_mut()) {
        Ok(summary) => summary,
        Err(e) => return report_error(&e),
    };

    drop(redact_span);

    let _report = run_span(run_id, Stage::Report).entered();
    if let Some(emitter) = &emitter {
        emitter.emit(ProgressEvent::from_summary(&summary).with_run_id(run_id));
    }

    let rendered = match args.summary {
        SummaryFormat::Human => render_human(&summary),
        SummaryFormat::Json => match render_json(&summary) {
            Ok(json) => json,
            Err(e) => return report_error(&RedactionError::Json(e)),
        },
    };
    // stdout belongs to the redacted stream when it is the output
    if output == Endpoint::Std {
        eprintln!("{}", rendered.trim_end());
    } else {
        println!("{}", rendered.trim_end());
    }

    if summary.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Clean
    }
}

fn run_detect(global: &GlobalOpts, args: &DetectArgs, run_id: &str) -> ExitCode {
    let span = run_span(run_id, Stage::Detect);
    let _guard = span.enter();

    let config = match resolve_config(global, &ConfigOverrides::default()) {
        Ok(resolved) => resolved.config,
        Err(code) => return code,
    };
    let input = Endpoint::parse(&args.input);
    let detected = open_input(&input).and_then(|r| detect_stream(r, config.detect_sample_lines));
    let format = match detected {
        Ok(format) => format,
        Err(e) => return report_error(&e),
    };

    tracing::debug!(target: event_names::FORMAT_DETECTED, format = %format, "format detected");
    if args.json {
        let response = serde_json::json!({
            "input": input.label("<stdin>"),
            "format": format,
            "sample_lines": config.detect_sample_lines,
        });
        println!("{}", response);
    } else {
        println!("{}", format);
    }
    ExitCode::Clean
}

fn run_patterns(global: &GlobalOpts, args: &PatternsArgs) -> ExitCode {
    let config = match resolve_config(global, &ConfigOverrides::default()) {
        Ok(resolved) => resolved.config,
        Err(code) => return code,
    };
    let registry = match config.build_registry() {
        Ok(registry) => registry,
        Err(e) => return report_error(&e),
    };

    if args.json {
        let patterns: Vec<serde_json::Value> = registry
            .iter()
            .map(|spec| {
                serde_json::json!({
                    "name": spec.name(),
                    "priority": spec.priority().to_string(),
                    "formats": spec.formats(),
                    "description": spec.description(),
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(patterns));
    } else {
        print!("{}", render_patterns(&registry));
    }
    ExitCode::Clean
}

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> ExitCode {
    match &args.command {
        ConfigCommands::Show => match resolve_config(global, &ConfigOverrides::default()) {
            Ok(resolved) => print_config(&resolved, "effective"),
            Err(code) => code,
        },
        ConfigCommands::Validate { path } => {
            let options = ConfigOptions {
                config_path: path.clone().or_else(|| global.config.clone()),
            };
            match load_config(&options, &ConfigOverrides::default()) {
                Ok(resolved) => print_config(&resolved, "valid"),
                Err(e) => output_config_error(&e),
            }
        }
    }
}

fn print_config(resolved: &ResolvedConfig, status: &str) -> ExitCode {
    let response = serde_json::json!({
        "status": status,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "source": &resolved.source,
        "config": &resolved.config,
    });
    match serde_json::to_string_pretty(&response) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::Clean
        }
        Err(e) => report_error(&RedactionError::Json(e)),
    }
}

fn run_sample(args: &SampleArgs) -> ExitCode {
    match sample::write_samples(&args.dir) {
        Ok(paths) => {
            println!("Sample files created:");
            for path in &paths {
                println!("  - {}", path.display());
            }
            println!();
            println!("To try the redactor:");
            for path in &paths {
                println!("  logredact redact {}", path.display());
            }
            ExitCode::Clean
        }
        Err(e) => {
            eprintln!("error: could not write samples to {}: {}", args.dir.display(), e);
            ExitCode::from_io_error(&e)
        }
    }
}

/// Resolve configuration, reporting failures on stderr.
fn resolve_config(
    global: &GlobalOpts,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig, ExitCode> {
    let options = ConfigOptions {
        config_path: global.config.clone(),
    };
    let resolved = load_config(&options, overrides).map_err(|e| output_config_error(&e))?;
    if resolved.source == ConfigSource::Defaults {
        tracing::debug!(
            target: event_names::CONFIG_DEFAULT_USED,
            "no config file found, using defaults"
        );
    }
    Ok(resolved)
}

/// Output a config error and pick its exit code.
fn output_config_error(error: &ConfigError) -> ExitCode {
    tracing::debug!(target: event_names::CONFIG_ERROR, code = error.code(), "{}", error);
    eprintln!("error: {}", error);
    match error {
        ConfigError::IoError { source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            ExitCode::PermissionError
        }
        _ => ExitCode::ConfigError,
    }
}

/// Output a run error and pick its exit code.
fn report_error(error: &RedactionError) -> ExitCode {
    let code = ExitCode::from_redaction_error(error);
    if code.is_internal_error() {
        tracing::error!(
            target: event_names::INTERNAL_ERROR,
            error_code = error.code(),
            exit = %code,
            "{}",
            error
        );
    } else {
        tracing::debug!(
            target: event_names::RUN_FAILED,
            error_code = error.code(),
            exit = %code,
            "{}",
            error
        );
    }
    eprintln!("error: {}", error);
    code
}

fn open_input(input: &Endpoint) -> Result<Box<dyn BufRead>, RedactionError> {
    match input {
        Endpoint::Std => Ok(Box::new(BufReader::with_capacity(
            IO_BUFFER_BYTES,
            io::stdin(),
        ))),
        Endpoint::Path(path) => match File::open(path) {
            Ok(file) => Ok(Box::new(BufReader::with_capacity(IO_BUFFER_BYTES, file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RedactionError::InputNotFound {
                path: path.clone(),
            }),
            Err(e) => Err(RedactionError::ReadFailure(e)),
        },
    }
}

fn open_output(output: &Endpoint) -> Result<Box<dyn Write>, RedactionError> {
    match output {
        Endpoint::Std => Ok(Box::new(BufWriter::with_capacity(
            IO_BUFFER_BYTES,
            io::stdout(),
        ))),
        Endpoint::Path(path) => File::create(path)
            .map(|file| {
                Box::new(BufWriter::with_capacity(IO_BUFFER_BYTES, file)) as Box<dyn Write>
            })
            .map_err(RedactionError::WriteFailure),
    }
}

/// `<stem>.redacted.<ext>` next to the input.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{}.redacted.{}", stem, ext.to_string_lossy()),
        None => format!("{}.redacted", stem),
    };
    input.with_file_name(name)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
