//! specbridge command-line interface.
//!
//! Converts API descriptions between OpenAPI, AsyncAPI and API Blueprint,
//! validates them, and sniffs their format.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tempfile::NamedTempFile;

use specbridge_converter::{
    AsyncApiVersion, Context, ConvertError, ConvertOptions, ConvertReport, Converter, Encoding,
    ErrorKind, Format, OpenApiVersion, ValidationError, Warning, WriteOptions,
};
use specbridge_telemetry::{config_from_strings, init_logging};

#[derive(Parser, Debug)]
#[command(name = "specbridge", about = "Convert API descriptions between formats", version)]
struct Cli {
    /// Log level filter (`RUST_LOG` overrides it).
    #[arg(long, global = true, env = "SPECBRIDGE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log output format (pretty or json).
    #[arg(long, global = true, env = "SPECBRIDGE_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Raise logging to debug (-v) or trace (-vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a document to another format.
    ///
    /// Exit codes: 1 conversion error, 2 undetectable input,
    /// 3 validation or strict-mode failure.
    Convert {
        /// Input file; `-` or absent reads stdin.
        input: Option<PathBuf>,

        /// Target format (openapi, asyncapi, blueprint).
        #[arg(short, long)]
        to: Format,

        /// Source format, or `auto` to detect it from the content.
        #[arg(short, long, default_value = "auto")]
        from: String,

        /// Output file; absent writes stdout. Only replaced on success.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target OpenAPI version (2.0, 3.0, 3.1).
        #[arg(long, default_value = "3.0")]
        openapi_version: OpenApiVersion,

        /// Target AsyncAPI version (2.6, 3.0).
        #[arg(long, default_value = "3.0")]
        asyncapi_version: AsyncApiVersion,

        /// Transport protocol for AsyncAPI servers, or `auto` to sniff URLs.
        #[arg(long)]
        protocol: Option<String>,

        /// Output encoding for OpenAPI and AsyncAPI.
        #[arg(long, value_enum, default_value_t = OutputEncoding::Yaml)]
        encoding: OutputEncoding,

        /// Keep nullability on OpenAPI 2.0/3.0 targets as `x-nullable`/`nullable`.
        #[arg(long)]
        nullable_keywords: bool,

        /// Validate before writing and fail on errors.
        #[arg(long)]
        validate: bool,

        /// Stop validation at the first failing rule.
        #[arg(long, requires = "validate")]
        stop_on_first_error: bool,

        /// Treat any warning as a failure.
        #[arg(long)]
        strict: bool,
    },

    /// Validate document(s) without converting.
    Validate {
        /// Input file(s); `-` reads stdin.
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Source format, or `auto` to detect it per file.
        #[arg(short, long, default_value = "auto")]
        from: String,

        /// Report format.
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Print the detected format of a document.
    Detect {
        /// Input file; `-` or absent reads stdin.
        input: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputEncoding {
    Json,
    Yaml,
}

impl From<OutputEncoding> for Encoding {
    fn from(encoding: OutputEncoding) -> Self {
        match encoding {
            OutputEncoding::Json => Encoding::Json,
            OutputEncoding::Yaml => Encoding::Yaml,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match config_from_strings(&cli.log_level, &cli.log_format) {
        Ok(config) => {
            if let Err(e) = init_logging(&config.with_verbosity(cli.verbose)) {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    }

    let converter = Converter::default();
    match cli.command {
        Commands::Convert {
            input,
            to,
            from,
            output,
            openapi_version,
            asyncapi_version,
            protocol,
            encoding,
            nullable_keywords,
            validate,
            stop_on_first_error,
            strict,
        } => {
            let mut write = WriteOptions::default()
                .with_openapi_version(openapi_version)
                .with_asyncapi_version(asyncapi_version)
                .with_encoding(encoding.into())
                .with_nullable_keywords(nullable_keywords);
            if let Some(protocol) = protocol {
                write = write.with_protocol(protocol);
            }
            let options = ConvertOptions::new()
                .with_validate(validate)
                .with_stop_on_first_error(stop_on_first_error)
                .with_strict(strict)
                .with_write_options(write);
            run_convert(
                &converter,
                input.as_deref(),
                output.as_deref(),
                &from,
                to,
                &options,
            )
        }
        Commands::Validate {
            inputs,
            from,
            format,
        } => run_validate(&converter, &inputs, &from, format),
        Commands::Detect { input } => run_detect(input.as_deref()),
    }
}

/// `auto` means detect; anything else must name a format.
fn source_format(from: &str) -> Result<Option<Format>, String> {
    if from.eq_ignore_ascii_case("auto") {
        Ok(None)
    } else {
        from.parse().map(Some)
    }
}

fn is_stdio(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p.as_os_str() == "-")
}

fn open_input(path: Option<&Path>) -> anyhow::Result<Box<dyn Read>> {
    match path {
        Some(path) if !is_stdio(Some(path)) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open input {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

/// Run the convert command.
fn run_convert(
    converter: &Converter,
    input: Option<&Path>,
    output: Option<&Path>,
    from: &str,
    to: Format,
    options: &ConvertOptions,
) -> ExitCode {
    let from = match source_format(from) {
        Ok(from) => from,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };
    let mut reader = match open_input(input) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    let ctx = Context::new();
    let result = match output {
        Some(path) if !is_stdio(Some(path)) => {
            convert_to_file(converter, &ctx, &mut reader, path, from, to, options)
        }
        _ => {
            let mut stdout = BufWriter::new(io::stdout().lock());
            converter
                .convert(&ctx, &mut reader, &mut stdout, from, to, options)
                .map_err(anyhow::Error::from)
        }
    };

    match result {
        Ok(report) => {
            print_warnings(&report.warnings, &report.validation);
            eprintln!(
                "converted {} to {} ({} bytes, {} warning(s))",
                report.from,
                report.to,
                report.bytes_written,
                report.warnings.len() + report.validation.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => report_failure(&e),
    }
}

/// Write through a sibling temp file so a failed run leaves `path` untouched.
fn convert_to_file(
    converter: &Converter,
    ctx: &Context,
    reader: &mut dyn Read,
    path: &Path,
    from: Option<Format>,
    to: Format,
    options: &ConvertOptions,
) -> anyhow::Result<ConvertReport> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot stage output in {}", dir.display()))?;
    let report = {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let report = converter.convert(ctx, reader, &mut writer, from, to, options)?;
        writer.flush()?;
        report
    };
    staged
        .persist(path)
        .with_context(|| format!("cannot write output {}", path.display()))?;
    Ok(report)
}

fn report_failure(error: &anyhow::Error) -> ExitCode {
    let Some(convert_error) = error.downcast_ref::<ConvertError>() else {
        eprintln!("error: {:#}", error);
        return ExitCode::from(1);
    };
    eprintln!("error: {}", convert_error);
    match convert_error {
        ConvertError::Validation(results) => {
            for result in results {
                eprintln!("  {}", result);
            }
        }
        ConvertError::Strict(warnings) => {
            for warning in warnings {
                eprintln!("  {}", warning);
            }
        }
        _ => {}
    }
    ExitCode::from(convert_error.kind().exit_code())
}

fn print_warnings(warnings: &[Warning], validation: &[ValidationError]) {
    for warning in warnings {
        eprintln!("  {} (warning)", warning);
    }
    for finding in validation {
        eprintln!("  {} (warning)", finding);
    }
}

/// Result of validating one input file.
#[derive(Debug, Serialize)]
struct FileResult {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Format>,
    valid: bool,
    errors: Vec<Issue>,
    warnings: Vec<Issue>,
}

#[derive(Debug, Serialize)]
struct Issue {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

impl From<&ValidationError> for Issue {
    fn from(finding: &ValidationError) -> Self {
        Self {
            code: finding.code.clone(),
            message: finding.message.clone(),
            location: finding.location.clone(),
        }
    }
}

impl From<&Warning> for Issue {
    fn from(warning: &Warning) -> Self {
        Self {
            code: warning.code.clone(),
            message: warning.message.clone(),
            location: warning.location.clone(),
        }
    }
}

/// Run the validate command.
fn run_validate(
    converter: &Converter,
    inputs: &[PathBuf],
    from: &str,
    output_format: ReportFormat,
) -> ExitCode {
    let from = match source_format(from) {
        Ok(from) => from,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };

    let mut results = Vec::new();
    // Exit code of the first failing input.
    let mut exit: Option<u8> = None;

    for input in inputs {
        let file = input.display().to_string();
        let outcome = open_input(Some(input.as_path())).and_then(|mut reader| {
            converter
                .validate(&Context::new(), &mut reader, from)
                .map_err(anyhow::Error::from)
        });

        let result = match outcome {
            Ok(report) => {
                let (errors, findings): (Vec<_>, Vec<_>) =
                    report.results.iter().partition(|r| r.is_error());
                let mut warnings: Vec<Issue> = report.warnings.iter().map(Issue::from).collect();
                warnings.extend(findings.into_iter().map(Issue::from));
                if !errors.is_empty() {
                    exit = exit.or(Some(ErrorKind::Validation.exit_code()));
                }
                FileResult {
                    file,
                    format: Some(report.format),
                    valid: errors.is_empty(),
                    errors: errors.into_iter().map(Issue::from).collect(),
                    warnings,
                }
            }
            Err(e) => {
                let (code, message, status) = match e.downcast_ref::<ConvertError>() {
                    Some(err) => (issue_code(err), err.to_string(), err.kind().exit_code()),
                    None => ("E4008".to_string(), format!("{:#}", e), 1),
                };
                exit = exit.or(Some(status));
                FileResult {
                    file,
                    format: None,
                    valid: false,
                    errors: vec![Issue {
                        code,
                        message,
                        location: None,
                    }],
                    warnings: Vec::new(),
                }
            }
        };
        results.push(result);
    }

    if output_format == ReportFormat::Json {
        let output = serde_json::json!({
            "results": results,
            "summary": {
                "total": results.len(),
                "valid": results.iter().filter(|r| r.valid).count(),
                "invalid": results.iter().filter(|r| !r.valid).count(),
            }
        });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }
        }
    } else {
        for result in &results {
            if result.valid && result.warnings.is_empty() {
                eprintln!("✓ {} is valid", result.file);
            } else if result.valid {
                eprintln!("✓ {} is valid (with {} warning(s))", result.file, result.warnings.len());
            } else {
                eprintln!("✗ {} has {} error(s)", result.file, result.errors.len());
            }
            for err in &result.errors {
                print_issue(err, "");
            }
            for warn in &result.warnings {
                print_issue(warn, " (warning)");
            }
        }

        let valid_count = results.iter().filter(|r| r.valid).count();
        let total = results.len();
        eprintln!();
        eprintln!(
            "validated {} document(s): {} valid, {} invalid",
            total,
            valid_count,
            total - valid_count
        );
    }

    exit.map_or(ExitCode::SUCCESS, ExitCode::from)
}

/// The leading code of a conversion error's message, e.g. `E4002`.
fn issue_code(error: &ConvertError) -> String {
    error
        .to_string()
        .split(':')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn print_issue(issue: &Issue, suffix: &str) {
    match &issue.location {
        Some(loc) => eprintln!("  {} [{}]: {}{}", issue.code, loc, issue.message, suffix),
        None => eprintln!("  {}: {}{}", issue.code, issue.message, suffix),
    }
}

/// Run the detect command.
fn run_detect(input: Option<&Path>) -> ExitCode {
    let mut bytes = Vec::new();
    let read = open_input(input).and_then(|mut reader| {
        reader.read_to_end(&mut bytes)?;
        Ok(())
    });
    if let Err(e) = read {
        eprintln!("error: {:#}", e);
        return ExitCode::from(1);
    }

    match specbridge_converter::detect_format(&bytes) {
        Ok(format) => {
            println!("{}", format);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.kind().exit_code())
        }
    }
}
