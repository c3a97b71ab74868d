use crate::config::{load_config, resolve_settings};
use crate::workspace::WorkspacePaths;
use notesync_core::NoteResult;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DoctorCheck {
    pub name: String,
    pub ok: bool,
    pub details: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub workspace: String,
    pub healthy: bool,
    pub checks: Vec<DoctorCheck>,
    pub server: Option<String>,
    pub load_policy: Option<String>,
}

pub fn run_doctor(paths: &WorkspacePaths, server_override: Option<&str>) -> NoteResult<DoctorReport> {
    let mut checks = vec![
        DoctorCheck {
            name: "workspace_root".to_string(),
            ok: paths.root.is_dir(),
            details: paths.root.display().to_string(),
        },
        DoctorCheck {
            name: "data_directory".to_string(),
            ok: paths.data_dir.is_dir(),
            details: paths.data_dir.display().to_string(),
        },
        DoctorCheck {
            name: "config_file".to_string(),
            ok: paths.config_path.is_file(),
            details: paths.config_path.display().to_string(),
        },
        DoctorCheck {
            name: "cache_db_file".to_string(),
            ok: paths.cache_db_path.is_file(),
            details: paths.cache_db_path.display().to_string(),
        },
    ];

    let mut server = None;
    let mut load_policy = None;

    if paths.config_path.is_file() {
        match load_config(paths).and_then(|config| resolve_settings(&config, server_override)) {
            Ok(settings) => {
                checks.push(DoctorCheck {
                    name: "settings".to_string(),
                    ok: true,
                    details: format!(
                        "server={} autosave={}ms load_policy={}",
                        settings.server,
                        settings.autosave_delay.as_millis(),
                        settings.load_policy
                    ),
                });
                server = Some(settings.server);
                load_policy = Some(settings.load_policy.to_string());
            }
            Err(err) => checks.push(DoctorCheck {
                name: "config_parse".to_string(),
                ok: false,
                details: err.message,
            }),
        }
    }

    let healthy = checks.iter().all(|check| check.ok);

    Ok(DoctorReport {
        workspace: paths.root.display().to_string(),
        healthy,
        checks,
        server,
        load_policy,
    })
}
