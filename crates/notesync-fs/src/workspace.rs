use crate::config::{DEFAULT_SERVER_URL, WorkspaceConfig, load_config, save_config};
use notesync_core::{NoteError, NoteResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_DIR_NAME: &str = ".notesync";

#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub cache_db_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WorkspaceInitResult {
    pub paths: WorkspacePaths,
    pub created: Vec<PathBuf>,
}

impl WorkspacePaths {
    pub fn from_root(root: PathBuf) -> Self {
        let data_dir = root.join(DATA_DIR_NAME);

        Self {
            config_path: data_dir.join("config.toml"),
            cache_db_path: data_dir.join("cache.db"),
            root,
            data_dir,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.data_dir.is_dir()
    }
}

pub fn init_workspace(
    target: Option<&Path>,
    server: Option<&str>,
) -> NoteResult<WorkspaceInitResult> {
    let root = match target {
        Some(path) => absolutize(path)?,
        None => std::env::current_dir().map_err(|err| {
            NoteError::io(format!(
                "failed to resolve current directory for init: {err}"
            ))
        })?,
    };

    let paths = WorkspacePaths::from_root(root);
    let mut created = Vec::new();

    ensure_dir(&paths.root, &mut created)?;
    ensure_dir(&paths.data_dir, &mut created)?;

    if paths.config_path.exists() {
        let _ = load_config(&paths)?;
    } else {
        let config = WorkspaceConfig::with_server(server.unwrap_or(DEFAULT_SERVER_URL));
        save_config(&paths, &config)?;
        created.push(paths.config_path.clone());
    }

    Ok(WorkspaceInitResult { paths, created })
}

pub fn resolve_workspace(explicit: Option<&Path>) -> NoteResult<WorkspacePaths> {
    let root = match explicit {
        Some(path) => absolutize(path)?,
        None => std::env::current_dir().map_err(|err| {
            NoteError::io(format!(
                "failed to resolve current directory for workspace lookup: {err}"
            ))
        })?,
    };

    let paths = WorkspacePaths::from_root(root);
    if !paths.is_initialized() {
        let root_display = paths.root.display();
        return Err(NoteError::usage(format!(
            "workspace is not initialized at '{root_display}'; run `notesync init --workspace {root_display}` first"
        )));
    }

    Ok(paths)
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

fn ensure_dir(path: &Path, created: &mut Vec<PathBuf>) -> NoteResult<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(NoteError::io(format!(
                "expected '{}' to be a directory",
                path.display()
            )));
        }
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|err| {
        NoteError::io(format!(
            "failed to create directory '{}': {}",
            path.display(),
            err
        ))
    })?;
    created.push(path.to_path_buf());
    Ok(())
}
