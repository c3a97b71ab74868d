use notesync_core::{ExitCode, NoteResult};
use serde_json::json;

use crate::{GlobalOptions, print_json, with_app_context};

pub(crate) fn cmd_status(globals: &GlobalOptions) -> NoteResult<ExitCode> {
    with_app_context(globals, |ctx| {
        let report = ctx.controller.store().status()?;

        if globals.json {
            print_json(&json!({
                "ok": true,
                "result": {
                    "workspace": ctx.paths.root.display().to_string(),
                    "server": ctx.settings.server,
                    "sync": report,
                }
            }))?;
        } else {
            println!("Workspace: {}", ctx.paths.root.display());
            println!(
                "Server: {} ({})",
                ctx.settings.server,
                if report.online { "online" } else { "offline" }
            );
            println!("Load policy: {}", report.load_policy);
            println!("Cached notes: {}", report.cached_notes);
            println!("Pending notes: {}", report.pending_notes);
            println!(
                "Last sync: {}",
                report.last_sync_at.unwrap_or_else(|| "never".to_string())
            );
            println!(
                "Last status: {}",
                report
                    .last_sync_status
                    .unwrap_or_else(|| "unknown".to_string())
            );
        }

        Ok(ExitCode::Success)
    })
}
