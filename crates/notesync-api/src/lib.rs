use notesync_core::{Note, NoteError, NoteResult};
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const NOTES_PATH: &str = "/notes";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the remote note collection (`/notes`, json-server style).
///
/// Every failure is reported as [`notesync_core::ErrorKind::Remote`].
#[derive(Debug, Clone)]
pub struct NotesApi {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
    message: Option<String>,
}

impl NotesApi {
    pub fn new(base_url: &str) -> NoteResult<Self> {
        let trimmed = base_url.trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(NoteError::usage("server URL cannot be empty"));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("notesync/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| NoteError::io(format!("failed to construct API client: {err}")))?;

        Ok(Self {
            base_url: trimmed,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn create_note(&self, note: &Note) -> NoteResult<Note> {
        tracing::debug!(id = %note.id, "POST {NOTES_PATH}");
        let response = self
            .client
            .post(self.url(NOTES_PATH))
            .json(note)
            .send()
            .map_err(network_error)?;
        parse_json_response(response)
    }

    pub fn list_notes(&self) -> NoteResult<Vec<Note>> {
        tracing::debug!("GET {NOTES_PATH}");
        let response = self
            .client
            .get(self.url(NOTES_PATH))
            .send()
            .map_err(network_error)?;
        parse_json_response(response)
    }

    pub fn update_note(&self, note: &Note) -> NoteResult<Note> {
        tracing::debug!(id = %note.id, "PUT {NOTES_PATH}/{{id}}");
        let response = self
            .client
            .put(self.note_url(&note.id)?)
            .json(note)
            .send()
            .map_err(network_error)?;
        parse_json_response(response)
    }

    pub fn delete_note(&self, id: &str) -> NoteResult<()> {
        tracing::debug!(%id, "DELETE {NOTES_PATH}/{{id}}");
        let response = self
            .client
            .delete(self.note_url(id)?)
            .send()
            .map_err(network_error)?;
        parse_no_content_response(response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn note_url(&self, id: &str) -> NoteResult<Url> {
        let mut url = Url::parse(&self.url(NOTES_PATH)).map_err(|err| {
            NoteError::usage(format!("invalid server URL '{}': {err}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                NoteError::usage(format!(
                    "server URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .push(id);
        Ok(url)
    }
}

/// Status code recorded in a remote error message, if the server answered.
pub fn error_status_code(error: &NoteError) -> Option<StatusCode> {
    let marker = "[http_status=";
    let start = error.message.find(marker)?;
    let rest = &error.message[start + marker.len()..];
    let end = rest.find(']')?;
    let code = rest[..end].parse::<u16>().ok()?;
    StatusCode::from_u16(code).ok()
}

pub fn is_not_found(error: &NoteError) -> bool {
    error_status_code(error) == Some(StatusCode::NOT_FOUND)
}

fn parse_no_content_response(response: Response) -> NoteResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body_text = response.text().unwrap_or_default();
    Err(parse_error_response(status, &body_text))
}

fn parse_json_response<T: DeserializeOwned>(response: Response) -> NoteResult<T> {
    let status = response.status();
    let body_text = response.text().map_err(network_error)?;

    if !status.is_success() {
        return Err(parse_error_response(status, &body_text));
    }

    serde_json::from_str::<T>(&body_text).map_err(|err| {
        NoteError::remote(format!(
            "failed to decode remote response ({}): {err}",
            truncate_for_error(body_text.trim(), 120)
        ))
    })
}

fn parse_error_response(status: StatusCode, body_text: &str) -> NoteError {
    let body_trimmed = body_text.trim();
    let fallback = if body_trimmed.is_empty() {
        format!("request failed with status {}", status.as_u16())
    } else {
        format!(
            "request failed with status {}: {}",
            status.as_u16(),
            truncate_for_error(body_trimmed, 240)
        )
    };

    let message = serde_json::from_str::<ErrorEnvelope>(body_text)
        .ok()
        .and_then(|payload| payload.message.or(payload.error))
        .unwrap_or(fallback);

    NoteError::remote(format!("{} [http_status={}]", message, status.as_u16()))
}

fn truncate_for_error(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    let truncated: String = input.chars().take(max_chars).collect();
    format!("{truncated}...")
}

fn network_error(err: reqwest::Error) -> NoteError {
    NoteError::remote(format!("network request failed: {err}"))
}
