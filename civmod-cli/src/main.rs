mod script;

use std::fmt::Write as FmtWrite;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use serde_json::{Map, Value};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use civmod::{
    DataType, DocumentFormat, EditorMode, EditorSession, HttpCatalog, MergeConfig,
    MutationMode, OutputDestination, OutputOptions, ReferenceCatalog, SessionOptions, emit,
    parse_document_map,
};

use crate::script::{COMMANDS, ScriptContext, ScriptLine};

const DEFAULT_CATALOG_URL: &str = "http://localhost:3000";

#[derive(Debug, Parser)]
#[command(
    name = "civmod",
    version,
    about = "Author game mod configuration documents from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a mod document, replay edit commands against it and write it out
    #[command(after_help = script_help())]
    Edit(EditArgs),
    /// Fetch a reference-data catalog and print its ids, one per line
    Catalog(CatalogArgs),
}

#[derive(Debug, Args)]
struct EditArgs {
    /// Document spec: file path, inline payload, or "-" for stdin
    #[arg(short = 'i', long = "input", value_name = "SPEC")]
    input: Option<String>,

    /// Edit script file, or "-" for stdin
    #[arg(short = 's', long = "script", value_name = "FILE")]
    script: Option<String>,

    /// Single edit command, run after the script. Repeatable.
    #[arg(short = 'e', long = "exec", value_name = "COMMAND", action = ArgAction::Append)]
    commands: Vec<String>,

    /// Output destinations ("-" writes to stdout). Accepts multiple values per flag use.
    #[arg(short = 'o', long = "output", value_name = "DEST", num_args = 1.., action = ArgAction::Append)]
    outputs: Vec<String>,

    /// Emit compact JSON/TOML rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,

    /// Overwrite output files even if they already exist
    #[arg(short = 'f', long = "force", short_alias = 'y', alias = "yes")]
    force: bool,

    /// Replace wrongly-typed intermediate nodes instead of failing
    #[arg(long = "coerce")]
    coerce: bool,

    /// Binding prefix managed by the wizard (default: MOD_). Repeatable.
    #[arg(long = "owned-prefix", value_name = "PREFIX", action = ArgAction::Append)]
    owned_prefixes: Vec<String>,
}

#[derive(Debug, Args)]
struct CatalogArgs {
    /// Catalog to fetch, e.g. "yield-types" or "unit-cultures"
    #[arg(value_name = "DATA_TYPE", value_parser = parse_data_type)]
    data_type: DataType,

    /// Base URL of the reference-data service
    #[arg(long = "catalog-url", value_name = "URL", default_value = DEFAULT_CATALOG_URL)]
    catalog_url: String,
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Edit(args) => run_edit(&args),
        Command::Catalog(args) => run_catalog(&args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn script_help() -> String {
    let mut body = String::from("Edit commands:\n");
    for spec in COMMANDS {
        let _ = writeln!(body, "  {:<20} {}", spec.usage, spec.about);
    }
    body.push_str("\nBlank lines and lines starting with '#' are ignored.");
    body
}

fn parse_data_type(raw: &str) -> std::result::Result<DataType, String> {
    raw.parse::<DataType>().map_err(|err| {
        let known: Vec<&str> = DataType::ALL.iter().map(|dt| dt.as_str()).collect();
        format!("{err}; expected one of: {}", known.join(", "))
    })
}

fn run_edit(args: &EditArgs) -> Result<()> {
    let mut diagnostics = DiagnosticCollector::default();

    let input_spec = args.input.as_deref();
    let script_spec = args.script.as_deref();
    let both_stdin = input_spec == Some("-") && script_spec == Some("-");
    if both_stdin {
        diagnostics.push_input(
            "input/script",
            "cannot read the document and the script from stdin simultaneously",
        );
    }

    let input_hint = resolve_format_hint(input_spec, "input", &mut diagnostics);
    let document = if input_hint.blocked || both_stdin {
        None
    } else {
        load_optional_document(input_spec, input_hint.hint.format, &mut diagnostics)
    };
    let script = if both_stdin {
        None
    } else {
        load_optional_script(script_spec, &mut diagnostics)
    };

    let (output_settings, output_paths) =
        build_output_options(args, input_hint.hint.extension_value(), &mut diagnostics);
    ensure_output_paths_available(&output_paths, args.force, &mut diagnostics);

    diagnostics.into_result()?;

    let mut session = EditorSession::new(session_options(args));
    if let Some(document) = document {
        session.load(document);
    }

    let mut lines = script.map(|s| ScriptLine::from_script(&s)).unwrap_or_default();
    lines.extend(ScriptLine::from_inline(&args.commands));

    let mut stdout = io::stdout();
    ScriptContext::new(&mut session, &mut stdout).run(&lines)?;

    if session.mode() == EditorMode::Wizard {
        warn!(
            state = %session.wizard_state(),
            "wizard still open at end of script; staged edits were not merged"
        );
    }

    if let Some(options) = output_settings {
        emit(session.main().as_value(), &options).map_err(|err| eyre!("{err:#}"))?;
        session.mark_saved();
    }
    Ok(())
}

fn session_options(args: &EditArgs) -> SessionOptions {
    let mut options = SessionOptions::default();
    if args.coerce {
        options = options.with_mutation_mode(MutationMode::Coerce);
    }
    if !args.owned_prefixes.is_empty() {
        options = options.with_merge_config(
            MergeConfig::default().with_owned_prefixes(args.owned_prefixes.clone()),
        );
    }
    options
}

fn run_catalog(args: &CatalogArgs) -> Result<()> {
    let client = HttpCatalog::new(args.catalog_url.as_str()).map_err(|err| eyre!("{err:#}"))?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start async runtime")?;

    let mut catalog = ReferenceCatalog::new();
    let entries = runtime.block_on(client.load(&mut catalog, args.data_type));
    for entry in entries {
        println!("{}", entry.id);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
struct FormatHint {
    format: DocumentFormat,
    from_extension: bool,
}

impl FormatHint {
    fn extension_value(&self) -> Option<DocumentFormat> {
        self.from_extension.then_some(self.format)
    }
}

#[derive(Debug, Clone, Copy)]
struct FormatResolution {
    hint: FormatHint,
    blocked: bool,
}

fn resolve_format_hint(
    path_hint: Option<&str>,
    label: &str,
    diagnostics: &mut DiagnosticCollector,
) -> FormatResolution {
    if let Some(path) = path_hint
        && path != "-"
    {
        match probe_format_from_extension(Path::new(path)) {
            ExtensionFormat::Known(format) => {
                return FormatResolution {
                    hint: FormatHint {
                        format,
                        from_extension: true,
                    },
                    blocked: false,
                };
            }
            ExtensionFormat::UnsupportedFeature {
                format_name,
                feature_flag,
            } => {
                diagnostics.push_input(
                    label,
                    format!(
                        "{label} '{path}' requires {format_name} support, but this build lacks the '{feature_flag}' feature"
                    ),
                );
                return FormatResolution {
                    hint: FormatHint::default(),
                    blocked: true,
                };
            }
            ExtensionFormat::Unknown => {}
        }
    }

    FormatResolution {
        hint: FormatHint::default(),
        blocked: false,
    }
}

fn load_optional_document(
    spec: Option<&str>,
    format: DocumentFormat,
    diagnostics: &mut DiagnosticCollector,
) -> Option<Map<String, Value>> {
    let raw = spec?;
    match load_document(raw, format) {
        Ok(document) => Some(document),
        Err(err) => {
            diagnostics.push_input("input", format!("{err:#}"));
            None
        }
    }
}

fn load_document(spec: &str, format: DocumentFormat) -> Result<Map<String, Value>> {
    if spec == "-" {
        let contents = read_from_source(&InputSource::Stdin)?;
        return parse_contents(&contents, format, "input");
    }

    let path = PathBuf::from(spec);
    match read_from_source(&InputSource::File(path.clone())) {
        Ok(contents) => parse_contents(&contents, format, "input"),
        Err(err) => {
            if is_not_found(&err) {
                return parse_contents(spec, format, "inline input");
            }
            Err(err.wrap_err(format!("failed to load input from {}", path.display())))
        }
    }
}

fn load_optional_script(
    spec: Option<&str>,
    diagnostics: &mut DiagnosticCollector,
) -> Option<String> {
    let raw = spec?;
    let source = if raw == "-" {
        InputSource::Stdin
    } else {
        InputSource::File(PathBuf::from(raw))
    };
    match read_from_source(&source) {
        Ok(contents) => Some(contents),
        Err(err) => {
            diagnostics.push_input("script", format!("{err:#}"));
            None
        }
    }
}

fn read_from_source(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("failed to read from stdin")?;
            Ok(buffer)
        }
        InputSource::File(path) => fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read file {}", path.display())),
    }
}

fn is_not_found(err: &Report) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}

/// Parses with the hinted format first, then every other compiled-in one.
fn parse_contents(contents: &str, format: DocumentFormat, label: &str) -> Result<Map<String, Value>> {
    match parse_document_map(contents, format) {
        Ok(document) => Ok(document),
        Err(primary) => {
            for candidate in DocumentFormat::available_formats() {
                if candidate == format {
                    continue;
                }
                if let Ok(document) = parse_document_map(contents, candidate) {
                    return Ok(document);
                }
            }
            Err(eyre!(
                "failed to parse {label}: tried {} (first error: {primary:#})",
                format_list()
            ))
        }
    }
}

fn format_list() -> String {
    let items: Vec<String> = DocumentFormat::available_formats()
        .into_iter()
        .map(|fmt| fmt.to_string())
        .collect();
    items.join(", ")
}

#[derive(Default)]
struct DiagnosticCollector {
    messages: Vec<String>,
}

impl DiagnosticCollector {
    fn push_input(&mut self, label: &str, message: impl Into<String>) {
        self.messages
            .push(format!("input ({label}): {}", message.into()));
    }

    fn push_output(&mut self, message: impl Into<String>) {
        self.messages.push(format!("output: {}", message.into()));
    }

    fn len(&self) -> usize {
        self.messages.len()
    }

    fn into_result(self) -> Result<()> {
        if self.messages.is_empty() {
            return Ok(());
        }
        let mut body = String::from("encountered input/output issues:\n");
        for (idx, msg) in self.messages.iter().enumerate() {
            let _ = writeln!(body, "  {}. {}", idx + 1, msg);
        }
        Err(eyre!(body))
    }
}

fn build_output_options(
    args: &EditArgs,
    input_hint: Option<DocumentFormat>,
    diagnostics: &mut DiagnosticCollector,
) -> (Option<OutputOptions>, Vec<PathBuf>) {
    let mut destinations = Vec::new();
    let explicit_outputs = !args.outputs.is_empty();

    for raw in &args.outputs {
        if raw.trim().is_empty() {
            diagnostics.push_output("output destination cannot be empty");
            continue;
        }
        if raw == "-" {
            destinations.push(OutputDestination::Stdout);
        } else {
            destinations.push(OutputDestination::file(raw));
        }
    }

    if destinations.is_empty() && !explicit_outputs {
        destinations.push(OutputDestination::Stdout);
    }

    if destinations.is_empty() {
        return (None, Vec::new());
    }

    let file_paths: Vec<PathBuf> = destinations
        .iter()
        .filter_map(|dest| match dest {
            OutputDestination::File(path) => Some(path.clone()),
            OutputDestination::Stdout => None,
        })
        .collect();

    let start = diagnostics.len();
    let format = if file_paths.is_empty() {
        input_hint.unwrap_or_default()
    } else {
        infer_format_from_files(&file_paths, diagnostics).unwrap_or_default()
    };

    if diagnostics.len() > start {
        return (None, file_paths);
    }

    (
        Some(OutputOptions {
            format,
            pretty: !args.no_pretty,
            destinations,
        }),
        file_paths,
    )
}

fn infer_format_from_files(
    file_paths: &[PathBuf],
    diagnostics: &mut DiagnosticCollector,
) -> Option<DocumentFormat> {
    let mut detected: Option<DocumentFormat> = None;
    for path in file_paths {
        match probe_format_from_extension(path) {
            ExtensionFormat::Known(format) => {
                if let Some(existing) = detected {
                    if existing != format {
                        diagnostics.push_output(format!(
                            "output file {} uses {format} but other destinations use {existing}; align extensions",
                            path.display()
                        ));
                    }
                } else {
                    detected = Some(format);
                }
            }
            ExtensionFormat::UnsupportedFeature {
                format_name,
                feature_flag,
            } => diagnostics.push_output(format!(
                "output file {} requires {format_name} support, but this build was compiled without the '{feature_flag}' feature",
                path.display()
            )),
            ExtensionFormat::Unknown => diagnostics.push_output(format!(
                "cannot infer format from output file {}; use .json/.yaml/.toml",
                path.display()
            )),
        }
    }
    detected
}

fn probe_format_from_extension(path: &Path) -> ExtensionFormat {
    if let Some(format) = DocumentFormat::from_path(path) {
        return ExtensionFormat::Known(format);
    }
    let Some(ext) = path.extension() else {
        return ExtensionFormat::Unknown;
    };
    match ext.to_string_lossy().to_ascii_lowercase().as_str() {
        "yaml" | "yml" => ExtensionFormat::UnsupportedFeature {
            format_name: "yaml",
            feature_flag: "yaml",
        },
        "toml" => ExtensionFormat::UnsupportedFeature {
            format_name: "toml",
            feature_flag: "toml",
        },
        _ => ExtensionFormat::Unknown,
    }
}

#[derive(Debug)]
enum ExtensionFormat {
    Known(DocumentFormat),
    UnsupportedFeature {
        format_name: &'static str,
        feature_flag: &'static str,
    },
    Unknown,
}

fn ensure_output_paths_available(
    paths: &[PathBuf],
    force: bool,
    diagnostics: &mut DiagnosticCollector,
) {
    if force {
        return;
    }
    for path in paths {
        if path.exists() {
            diagnostics.push_output(format!(
                "file {} already exists (pass --force to overwrite)",
                path.display()
            ));
        }
    }
}
