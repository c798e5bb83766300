use serde::Serialize;
use shiplog_core::{Command as EditCommand, Editor, EditorConfig, GraphStore, backup};
use std::io::Read;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SHIPLOG_LOG";

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    /// The input document could not be imported.
    Rejected(shiplog_core::Error),
    Core(shiplog_core::Error),
    Script { line: usize, message: String },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Rejected(err) => write!(f, "{err}"),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Script { line, message } => write!(f, "script line {line}: {message}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<shiplog_core::Error> for CliError {
    fn from(value: shiplog_core::Error) -> Self {
        Self::Core(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Command {
    #[default]
    New,
    Inspect,
    Normalize,
    Replay,
    Name,
}

#[derive(Debug, Default)]
struct Args {
    command: Option<Command>,
    input: Option<String>,
    pretty: bool,
    fresh: bool,
    config: Option<String>,
    script: Option<String>,
    out: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectOut<'a> {
    version: Option<&'a str>,
    nodes: usize,
    edges: usize,
    viewport: Option<shiplog_core::Viewport>,
    dangling_edges: Vec<&'a str>,
    self_loops: Vec<&'a str>,
    duplicate_node_ids: Vec<&'a str>,
}

fn usage() -> &'static str {
    "shiplog-cli\n\
\n\
USAGE:\n\
  shiplog-cli new [--config <path>] [--pretty] [--out <path>]\n\
  shiplog-cli inspect [--pretty] [<path>|-]\n\
  shiplog-cli normalize [--config <path>] [--out <path>] [<path>|-]\n\
  shiplog-cli replay --script <path> [--fresh] [--config <path>] [--out <path>] [<path>|-]\n\
  shiplog-cli name [--config <path>]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the backup is read from stdin.\n\
  - replay applies one JSON editor command per script line; lines starting with '#' are skipped.\n\
  - replay --fresh starts from the initial document instead of reading a backup.\n\
  - Set SHIPLOG_LOG (e.g. SHIPLOG_LOG=debug) to log to stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "new" | "inspect" | "normalize" | "replay" | "name" if args.command.is_none() => {
                args.command = Some(match a.as_str() {
                    "new" => Command::New,
                    "inspect" => Command::Inspect,
                    "normalize" => Command::Normalize,
                    "replay" => Command::Replay,
                    _ => Command::Name,
                });
            }
            "--pretty" => args.pretty = true,
            "--fresh" => args.fresh = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--script" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.script = Some(path.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    let command = args.command.unwrap_or_default();
    let takes_input = matches!(command, Command::Inspect | Command::Normalize)
        || (command == Command::Replay && !args.fresh);
    if args.input.is_some() && !takes_input {
        return Err(CliError::Usage(usage()));
    }
    if command == Command::Replay && args.script.is_none() {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_config(path: Option<&str>) -> Result<EditorConfig, CliError> {
    match path {
        None => Ok(EditorConfig::default()),
        Some(path) => Ok(EditorConfig::from_json_str(&std::fs::read_to_string(path)?)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            println!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))?;
            Ok(())
        }
    }
}

fn load_editor(config: EditorConfig, input: Option<&str>) -> Result<Editor, CliError> {
    let text = read_input(input)?;
    Editor::from_backup(config, &text).map_err(CliError::Rejected)
}

fn inspect(text: &str, pretty: bool) -> Result<(), CliError> {
    let imported = backup::import(text).map_err(CliError::Rejected)?;
    let version = imported.version.clone();
    let viewport = imported.viewport;
    let store = GraphStore::from_parts(imported.nodes, imported.edges);

    let dangling_edges: Vec<&str> = store
        .dangling_edges()
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    if !dangling_edges.is_empty() {
        tracing::warn!(count = dangling_edges.len(), ids = ?dangling_edges, "dangling edges");
    }
    let out = InspectOut {
        version: version.as_deref(),
        nodes: store.nodes().len(),
        edges: store.edges().len(),
        viewport,
        dangling_edges,
        self_loops: store.self_loops().iter().map(|e| e.id.as_str()).collect(),
        duplicate_node_ids: store.duplicate_node_ids(),
    };
    write_json(&out, pretty)
}

fn replay(editor: &mut Editor, script: &str) -> Result<(), CliError> {
    for (idx, raw) in script.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command: EditCommand = serde_json::from_str(line).map_err(|e| CliError::Script {
            line: idx + 1,
            message: e.to_string(),
        })?;
        let is_import = matches!(command, EditCommand::Import { .. });
        match editor.dispatch(command) {
            Ok(effect) => tracing::debug!(line = idx + 1, ?effect, "replayed"),
            Err(err) if is_import => return Err(CliError::Rejected(err)),
            Err(err) => {
                return Err(CliError::Script {
                    line: idx + 1,
                    message: err.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    match args.command.unwrap_or_default() {
        Command::New => {
            let editor = Editor::new(config);
            let doc = editor.export();
            let text = if args.pretty {
                doc.to_json_pretty()?
            } else {
                doc.to_json()?
            };
            write_text(&text, args.out.as_deref())
        }
        Command::Inspect => {
            let text = read_input(args.input.as_deref())?;
            inspect(&text, args.pretty)
        }
        Command::Normalize => {
            let editor = load_editor(config, args.input.as_deref())?;
            write_text(&editor.export().to_json_pretty()?, args.out.as_deref())
        }
        Command::Replay => {
            let Some(script_path) = args.script.as_deref() else {
                return Err(CliError::Usage(usage()));
            };
            let script = std::fs::read_to_string(script_path)?;
            let mut editor = if args.fresh {
                Editor::new(config)
            } else {
                load_editor(config, args.input.as_deref())?
            };
            replay(&mut editor, &script)?;
            write_text(&editor.export().to_json_pretty()?, args.out.as_deref())
        }
        Command::Name => {
            println!("{}", backup::file_name_for_today(&config.backup_file_prefix));
            Ok(())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_logging();

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::Rejected(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
