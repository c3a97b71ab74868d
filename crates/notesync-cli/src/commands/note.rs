use notesync_core::{ExitCode, Note, NoteResult};
use serde::Serialize;
use serde_json::json;

use crate::{GlobalOptions, print_json, with_app_context};

#[derive(Debug, Clone, Serialize)]
struct NoteView {
    id: String,
    title: String,
    content: String,
    updated_at: String,
    synced: bool,
}

impl From<&Note> for NoteView {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            updated_at: note.updated_at.to_rfc3339(),
            synced: note.synced,
        }
    }
}

pub(crate) fn cmd_list(query: Option<String>, globals: &GlobalOptions) -> NoteResult<ExitCode> {
    with_app_context(globals, |mut ctx| {
        ctx.controller.refresh()?;
        if let Some(query) = query {
            ctx.controller.set_search_query(query);
        }

        let views: Vec<NoteView> = ctx
            .controller
            .visible_notes()
            .into_iter()
            .map(NoteView::from)
            .collect();

        if globals.json {
            print_json(&json!({"ok": true, "result": views}))?;
        } else if views.is_empty() {
            println!("No notes found.");
        } else {
            for note in views {
                let marker = if note.synced { "" } else { " (pending)" };
                println!(
                    "{} | {} | {}{}",
                    note.id, note.updated_at, note.title, marker
                );
            }
        }

        Ok(ExitCode::Success)
    })
}

pub(crate) fn cmd_add(
    title: String,
    content: String,
    globals: &GlobalOptions,
) -> NoteResult<ExitCode> {
    with_app_context(globals, |mut ctx| {
        let created = ctx.controller.add_note(title, content)?;
        let view = NoteView::from(&created);

        if globals.json {
            print_json(&json!({"ok": true, "result": view}))?;
        } else {
            println!("Created note {}.", view.id);
            if !view.synced {
                println!("Saved locally; it will be pushed on the next online refresh.");
            }
        }

        Ok(ExitCode::Success)
    })
}

pub(crate) fn cmd_delete(id: String, globals: &GlobalOptions) -> NoteResult<ExitCode> {
    with_app_context(globals, |mut ctx| {
        ctx.controller.delete_note(&id)?;

        if globals.json {
            print_json(&json!({
                "ok": true,
                "result": {"deleted": id, "remaining": ctx.controller.notes().len()}
            }))?;
        } else {
            println!("Deleted note {id}.");
        }

        Ok(ExitCode::Success)
    })
}
