mod config;
mod doctor;
mod workspace;

pub use config::{
    CONFIG_VERSION, DEFAULT_AUTOSAVE_DELAY_MS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_SERVER_URL,
    ResolvedSettings, WorkspaceConfig, load_config, resolve_settings, save_config,
};
pub use doctor::{DoctorCheck, DoctorReport, run_doctor};
pub use workspace::{WorkspaceInitResult, WorkspacePaths, init_workspace, resolve_workspace};
