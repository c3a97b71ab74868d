use notesync_core::{ExitCode, NoteResult};
use notesync_fs::{init_workspace, resolve_workspace, run_doctor};
use notesync_store::NoteCache;
use serde_json::json;

use crate::{GlobalOptions, InitOutput, print_json, workspace_target};

pub(crate) fn cmd_init(globals: &GlobalOptions) -> NoteResult<ExitCode> {
    let target = workspace_target(globals)?;
    let result = init_workspace(Some(&target), globals.server.as_deref())?;

    let mut created: Vec<String> = result
        .created
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    if !result.paths.cache_db_path.exists() {
        created.push(result.paths.cache_db_path.display().to_string());
    }
    NoteCache::from_workspace(&result.paths)?;

    let output = InitOutput {
        workspace: result.paths.root.display().to_string(),
        created,
    };

    if globals.json {
        print_json(&json!({"ok": true, "result": output}))?;
    } else {
        println!("Workspace initialized: {}", output.workspace);
        println!("Created:");
        if output.created.is_empty() {
            println!("  - none");
        } else {
            for path in &output.created {
                println!("  - {path}");
            }
        }
    }

    Ok(ExitCode::Success)
}

pub(crate) fn cmd_doctor(globals: &GlobalOptions) -> NoteResult<ExitCode> {
    let target = workspace_target(globals)?;
    let paths = resolve_workspace(Some(&target))?;
    let report = run_doctor(&paths, globals.server.as_deref())?;

    if globals.json {
        print_json(&json!({"ok": report.healthy, "result": report}))?;
    } else {
        println!("Workspace: {}", report.workspace);
        println!(
            "Health: {}",
            if report.healthy {
                "healthy"
            } else {
                "degraded"
            }
        );

        for check in &report.checks {
            let prefix = if check.ok { "OK" } else { "FAIL" };
            println!("[{}] {} -> {}", prefix, check.name, check.details);
        }
    }

    Ok(if report.healthy {
        ExitCode::Success
    } else {
        ExitCode::Io
    })
}
