// Manages the active generation session and the shared display state

use crate::blog_api::GeneratedPost;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub type SharedState = Arc<Mutex<GenerationState>>;

/// One generation attempt. Dropped when its stream ends or a newer session replaces it.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub id: u64,
    pub token: CancellationToken,
    pub started_at: DateTime<Utc>,
}

impl StreamSession {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
pub struct GenerationState {
    next_id: u64,
    active: Option<StreamSession>,
    display: String,
    last_result: Option<GeneratedPost>,
}

impl GenerationState {
    pub fn with_last_result(last_result: Option<GeneratedPost>) -> Self {
        Self {
            last_result,
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn last_result(&self) -> Option<&GeneratedPost> {
        self.last_result.as_ref()
    }

    fn is_current(&self, session: &StreamSession) -> bool {
        self.active.as_ref().map(|s| s.id) == Some(session.id)
    }
}

pub fn new_shared_state(last_result: Option<GeneratedPost>) -> SharedState {
    Arc::new(Mutex::new(GenerationState::with_last_result(last_result)))
}

/// Cancels whatever is in flight, then registers a fresh session with an empty display.
pub async fn begin_session(state: &SharedState) -> StreamSession {
    let mut generation_state = state.lock().await;

    if let Some(previous) = generation_state.active.take() {
        tracing::info!("cancelling generation {} in favour of a new one", previous.id);
        previous.token.cancel();
    }

    generation_state.next_id += 1;
    let session = StreamSession {
        id: generation_state.next_id,
        token: CancellationToken::new(),
        started_at: Utc::now(),
    };
    generation_state.active = Some(session.clone());
    generation_state.display.clear();

    session
}

/// Appends a chunk to the live display. Returns `false` once the session
/// is cancelled or superseded; the caller must stop reading.
pub async fn append_display(state: &SharedState, session: &StreamSession, chunk: &str) -> bool {
    let mut generation_state = state.lock().await;
    if session.is_cancelled() || !generation_state.is_current(session) {
        return false;
    }
    generation_state.display.push_str(chunk);
    true
}

/// Ends `session` with `notice` as the display text. No-op for superseded sessions.
pub async fn finish_session(state: &SharedState, session: &StreamSession, notice: &str) {
    let mut generation_state = state.lock().await;
    if !generation_state.is_current(session) {
        return;
    }
    generation_state.active = None;
    generation_state.display = notice.to_string();
}

/// Ends `session` successfully, publishing the finalized text. Returns `false`
/// if the session was cancelled or superseded in the meantime.
pub async fn complete_session(
    state: &SharedState,
    session: &StreamSession,
    post: &GeneratedPost,
) -> bool {
    let mut generation_state = state.lock().await;
    if session.is_cancelled() || !generation_state.is_current(session) {
        return false;
    }
    generation_state.active = None;
    generation_state.display = post.text.clone();
    generation_state.last_result = Some(post.clone());
    true
}

// Abort chat generation
pub async fn abort_generation(state: &SharedState) -> bool {
    let generation_state = state.lock().await;

    match &generation_state.active {
        Some(session) => {
            session.token.cancel();
            tracing::info!(
                "generation {} aborted after {}s",
                session.id,
                (Utc::now() - session.started_at).num_seconds()
            );
            true
        }
        None => false,
    }
}
