mod commands;

use clap::{Parser, Subcommand};
use notesync_api::NotesApi;
use notesync_controller::NoteListController;
use notesync_core::{ExitCode, NoteError, NoteResult};
use notesync_fs::{
    ResolvedSettings, WorkspacePaths, init_workspace, load_config, resolve_settings,
    resolve_workspace,
};
use notesync_store::NoteCache;
use notesync_sync::{Connectivity, ProbeConnectivity, SyncStore, ToggleConnectivity};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "notesync",
    version,
    about = "Offline-first notes that sync when the server is reachable",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,

    #[arg(long, global = true)]
    server: Option<String>,

    /// Skip the reachability probe and work against the local cache only.
    #[arg(long, global = true)]
    offline: bool,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    no_color: bool,

    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Init,
    Doctor,
    /// Refresh and print the note list.
    List {
        #[arg(long)]
        query: Option<String>,
    },
    Add {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
    },
    Delete {
        id: String,
    },
    /// Interactive edit session with autosave.
    Edit {
        id: String,
    },
    Status,
}

#[derive(Debug, Clone)]
struct GlobalOptions {
    workspace: Option<PathBuf>,
    server: Option<String>,
    offline: bool,
    json: bool,
}

struct AppContext {
    paths: WorkspacePaths,
    settings: ResolvedSettings,
    controller: NoteListController,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    workspace: String,
    created: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    configure_logging(cli.debug, cli.json, cli.no_color);

    let globals = GlobalOptions {
        workspace: cli.workspace,
        server: cli.server,
        offline: cli.offline,
        json: cli.json,
    };

    let result = run_command(cli.command, &globals);

    let exit = match result {
        Ok(code) => code,
        Err(error) => {
            render_error(&error, globals.json);
            error.exit_code()
        }
    };

    std::process::exit(exit.as_i32());
}

fn configure_logging(debug: bool, json: bool, no_color: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(!no_color)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run_command(command: Command, globals: &GlobalOptions) -> NoteResult<ExitCode> {
    match command {
        Command::Init => commands::workspace::cmd_init(globals),
        Command::Doctor => commands::workspace::cmd_doctor(globals),
        Command::List { query } => commands::note::cmd_list(query, globals),
        Command::Add { title, content } => commands::note::cmd_add(title, content, globals),
        Command::Delete { id } => commands::note::cmd_delete(id, globals),
        Command::Edit { id } => commands::edit::cmd_edit(id, globals),
        Command::Status => commands::sync::cmd_status(globals),
    }
}

fn with_app_context<F>(globals: &GlobalOptions, run: F) -> NoteResult<ExitCode>
where
    F: FnOnce(AppContext) -> NoteResult<ExitCode>,
{
    let target = workspace_target(globals)?;
    if !WorkspacePaths::from_root(target.clone()).is_initialized() {
        init_workspace(Some(&target), globals.server.as_deref())?;
    }

    let paths = resolve_workspace(Some(&target))?;
    let config = load_config(&paths)?;
    let settings = resolve_settings(&config, globals.server.as_deref())?;

    let api = NotesApi::new(&settings.server)?;
    let cache = NoteCache::from_workspace(&paths)?;
    let connectivity: Arc<dyn Connectivity> = if globals.offline {
        Arc::new(ToggleConnectivity::new(false))
    } else {
        Arc::new(ProbeConnectivity::for_server(
            &settings.server,
            settings.connect_timeout,
        )?)
    };

    let store = SyncStore::new(api, cache, connectivity).with_load_policy(settings.load_policy);
    let controller = NoteListController::new(store, settings.autosave_delay);

    run(AppContext {
        paths,
        settings,
        controller,
    })
}

fn workspace_target(globals: &GlobalOptions) -> NoteResult<PathBuf> {
    if let Some(path) = &globals.workspace {
        return absolutize(path);
    }

    std::env::current_dir().map_err(|err| {
        NoteError::io(format!(
            "failed to resolve current directory for default workspace: {err}"
        ))
    })
}

fn absolutize(path: &Path) -> NoteResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir().map_err(|err| {
        NoteError::io(format!(
            "failed to resolve current directory for path: {err}"
        ))
    })?;

    Ok(cwd.join(path))
}

fn render_error(error: &NoteError, json_output: bool) {
    if json_output {
        let payload = json!({
            "ok": false,
            "error": {
                "kind": error.kind,
                "message": &error.message,
            }
        });
        let serialized = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"ok\":false,\"error\":{\"kind\":\"io\",\"message\":\"failed to serialize error\"}}".to_string()
        });
        eprintln!("{serialized}");
    } else {
        eprintln!("error: {}", error.message);
    }
}

fn print_json<T: Serialize>(value: &T) -> NoteResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| NoteError::io(format!("failed to render JSON output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
