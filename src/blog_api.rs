// Handles communication with the blog generation endpoint

use crate::db::{self, DbConn};
use crate::error::{BlogError, Result, CANCELLED_NOTICE, FALLBACK_REJECTION};
use crate::image_search::{self, ImageSearchClient};
use crate::metadata;
use crate::session::{self, SharedState, StreamSession};

use chrono::{SecondsFormat, Utc};
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
}

impl GenerationRequest {
    /// Trims `prompt`; an empty prompt never reaches the network.
    pub fn new(prompt: &str) -> Result<Self> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(BlogError::EmptyPrompt);
        }
        Ok(Self {
            prompt: prompt.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// A finished generation: cleaned Markdown plus its resolved image URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPost {
    pub prompt: String,
    pub text: String,
    pub images: Vec<String>,
    pub completed_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed(GeneratedPost),
    Aborted,
}

#[derive(Clone)]
pub struct BlogClient {
    client: Client,
    endpoint: String,
    image_search: Option<ImageSearchClient>,
}

impl BlogClient {
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            image_search: None,
        }
    }

    pub fn with_image_search(mut self, image_search: ImageSearchClient) -> Self {
        self.image_search = Some(image_search);
        self
    }
}

/// Incremental UTF-8 decoding; a code point split across chunks is held back
/// until its remaining bytes arrive.
#[derive(Default)]
struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Runs one generation: cancels any session in flight, streams the body into
/// the shared display (and `on_chunk`), then extracts images, records history
/// and stores the finished post.
pub async fn process_blog_generation<F>(
    api: &BlogClient,
    prompt: &str,
    state: &SharedState,
    db_conn: &DbConn,
    mut on_chunk: F,
) -> Result<StreamOutcome>
where
    F: FnMut(&str) + Send,
{
    let request = GenerationRequest::new(prompt)?;
    let session = session::begin_session(state).await;
    tracing::info!("generation {} started", session.id);

    let buffer = match stream_generation(api, &request, &session, state, &mut on_chunk).await {
        Ok(buffer) => buffer,
        Err(e) => return conclude_failure(state, &session, e).await,
    };

    match finalize_generation(api, &request, &session, state, db_conn, &buffer).await {
        Ok(post) => Ok(StreamOutcome::Completed(post)),
        Err(e) => conclude_failure(state, &session, e).await,
    }
}

async fn stream_generation<F>(
    api: &BlogClient,
    request: &GenerationRequest,
    session: &StreamSession,
    state: &SharedState,
    on_chunk: &mut F,
) -> Result<String>
where
    F: FnMut(&str) + Send,
{
    let token = &session.token;

    let response = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(BlogError::Cancelled),
        response = api.client.post(&api.endpoint).json(request).send() => {
            response.map_err(BlogError::TransportFailure)?
        }
    };

    let status = response.status();
    if !status.is_success() {
        let message = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(BlogError::Cancelled),
            body = response.json::<ErrorBody>() => body
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_REJECTION.to_string()),
        };
        return Err(BlogError::RequestRejected {
            status: status.as_u16(),
            message,
        });
    }

    if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
        return Err(BlogError::StreamUnavailable);
    }

    let mut stream = response.bytes_stream();
    let mut decoder = Utf8ChunkDecoder::default();
    let mut buffer = String::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(BlogError::Cancelled),
            next = stream.next() => next,
        };

        match next {
            Some(Ok(bytes)) => {
                let text = decoder.push(&bytes);
                publish_chunk(state, session, &mut buffer, on_chunk, &text).await?;
            }
            Some(Err(e)) => return Err(BlogError::TransportFailure(e)),
            None => break,
        }
    }

    let tail = decoder.finish();
    publish_chunk(state, session, &mut buffer, on_chunk, &tail).await?;

    Ok(buffer)
}

async fn publish_chunk<F>(
    state: &SharedState,
    session: &StreamSession,
    buffer: &mut String,
    on_chunk: &mut F,
    text: &str,
) -> Result<()>
where
    F: FnMut(&str) + Send,
{
    if text.is_empty() {
        return Ok(());
    }
    if !session::append_display(state, session, text).await {
        return Err(BlogError::Cancelled);
    }
    buffer.push_str(text);
    on_chunk(text);
    Ok(())
}

async fn finalize_generation(
    api: &BlogClient,
    request: &GenerationRequest,
    session: &StreamSession,
    state: &SharedState,
    db_conn: &DbConn,
    buffer: &str,
) -> Result<GeneratedPost> {
    let (text, entries) = metadata::extract_metadata(buffer).into_parts();

    let images = tokio::select! {
        biased;
        _ = session.token.cancelled() => return Err(BlogError::Cancelled),
        images = image_search::resolve_images(api.image_search.as_ref(), entries) => images,
    };

    let completed_at = Utc::now();
    let post = GeneratedPost {
        prompt: request.prompt.clone(),
        text,
        images,
        completed_at: completed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    if !session::complete_session(state, session, &post).await {
        return Err(BlogError::Cancelled);
    }

    {
        let conn = db_conn.lock().await;
        db::record_history(&conn, &request.prompt, completed_at)?;
        db::save_last_result(&conn, &post)?;
    }

    tracing::info!(
        "generation {} finished with {} image(s)",
        session.id,
        post.images.len()
    );
    Ok(post)
}

async fn conclude_failure(
    state: &SharedState,
    session: &StreamSession,
    err: BlogError,
) -> Result<StreamOutcome> {
    match err {
        BlogError::Cancelled => {
            tracing::info!("generation {} was cancelled", session.id);
            session::finish_session(state, session, CANCELLED_NOTICE).await;
            Ok(StreamOutcome::Aborted)
        }
        err => {
            tracing::error!("generation {} failed: {}", session.id, err);
            session::finish_session(state, session, &err.notice()).await;
            Err(err)
        }
    }
}
