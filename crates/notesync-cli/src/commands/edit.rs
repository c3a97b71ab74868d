use notesync_controller::{EditField, NoteListController};
use notesync_core::{ExitCode, Note, NoteError, NoteResult};
use notesync_sync::{ConnectivityWatch, SyncStatus, SyncStatusObserver};
use serde::Serialize;
use serde_json::json;
use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::{GlobalOptions, print_json, with_app_context};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
enum EditorInput {
    Set(EditField, String),
    Save,
    Close,
}

#[derive(Debug, Serialize)]
struct EditOutput {
    id: String,
    saves: usize,
    failed_saves: usize,
    discarded: bool,
    note: Option<Note>,
}

struct StderrStatus;

impl SyncStatusObserver for StderrStatus {
    fn on_sync_status(&self, status: SyncStatus) {
        match status {
            SyncStatus::Started { .. } => eprintln!("syncing..."),
            SyncStatus::Finished { ok: true, .. } => eprintln!("synced"),
            SyncStatus::Finished { ok: false, .. } => eprintln!("sync failed"),
        }
    }
}

fn parse_input(line: &str) -> NoteResult<EditorInput> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

    match command.trim() {
        "save" => Ok(EditorInput::Save),
        "close" | "quit" => Ok(EditorInput::Close),
        field => Ok(EditorInput::Set(field.parse()?, rest.to_string())),
    }
}

/// Forwards a connectivity edge to the controller. A failed refresh keeps the
/// session open.
fn follow_connectivity(controller: &mut NoteListController, watch: &mut ConnectivityWatch) {
    if let Some(event) = watch.poll(controller.store().connectivity())
        && let Err(error) = controller.handle_connectivity(event)
    {
        tracing::warn!(error = %error, "refresh after connectivity change failed");
    }
}

pub(crate) fn cmd_edit(id: String, globals: &GlobalOptions) -> NoteResult<ExitCode> {
    with_app_context(globals, |mut ctx| {
        ctx.controller.refresh()?;
        let note = ctx
            .controller
            .find(&id)
            .cloned()
            .ok_or_else(|| NoteError::usage(format!("note not found: {id}")))?;

        if !globals.json {
            ctx.controller.store_mut().subscribe(Box::new(StderrStatus));
            eprintln!(
                "Editing {id}. Commands: 'title <text>', 'content <text>', 'save', 'close'."
            );
        }

        ctx.controller.begin_edit(note);
        let mut watch = ConnectivityWatch::new(ctx.controller.store().is_online());

        let (tx, rx) = mpsc::channel::<String>();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let mut saves = 0usize;
        let mut failed_saves = 0usize;

        loop {
            let wait = ctx
                .controller
                .next_deadline()
                .map(|deadline| {
                    deadline
                        .saturating_duration_since(Instant::now())
                        .min(POLL_INTERVAL)
                })
                .unwrap_or(POLL_INTERVAL);

            let mut saved = None;
            match rx.recv_timeout(wait) {
                Ok(line) if line.trim().is_empty() => {}
                Ok(line) => match parse_input(&line) {
                    Ok(EditorInput::Set(field, value)) => {
                        ctx.controller.update_edit_field(field, value)?;
                    }
                    Ok(EditorInput::Save) => saved = Some(ctx.controller.save_now()),
                    Ok(EditorInput::Close) => break,
                    Err(error) => eprintln!("error: {}", error.message),
                },
                Err(RecvTimeoutError::Timeout) => {}
                // End of input closes the editor like 'close' does.
                Err(RecvTimeoutError::Disconnected) => break,
            }

            follow_connectivity(&mut ctx.controller, &mut watch);

            if saved.is_none() {
                saved = Some(ctx.controller.run_pending());
            }

            match saved {
                Some(Ok(Some(note))) => {
                    saves += 1;
                    if !globals.json {
                        let state = if note.synced { "synced" } else { "pending" };
                        println!("Saved {} ({state}).", note.id);
                    }
                }
                Some(Err(error)) => {
                    failed_saves += 1;
                    tracing::error!(id = %id, error = %error, "autosave failed");
                }
                _ => {}
            }
        }

        let discarded = ctx.controller.close_editor();
        let output = EditOutput {
            note: ctx.controller.find(&id).cloned(),
            id,
            saves,
            failed_saves,
            discarded,
        };

        if globals.json {
            print_json(&json!({"ok": true, "result": output}))?;
        } else {
            println!(
                "Closed {} after {} save(s).{}",
                output.id,
                output.saves,
                if output.discarded {
                    " Unsaved change discarded."
                } else {
                    ""
                }
            );
        }

        if failed_saves > 0 {
            return Ok(ExitCode::Remote);
        }
        Ok(ExitCode::Success)
    })
}
