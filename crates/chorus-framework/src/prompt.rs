//! The prompt engine: time-boxed, resumable conversational waits.
//!
//! A command that needs a follow-up message registers a [`Prompt`] on the
//! bot's [`PromptHub`] and awaits it. Every Resonance the bot hears is
//! offered to every active prompt concurrently; the first one whose
//! condition matches resolves the wait.
//!
//! The wait itself is one cancellable await point — a `select!` racing the
//! matching-response signal, the timeout, and the prompt's cancellation
//! token — rather than separate timer and listener bookkeeping. The
//! response and timeout paths race on purpose; an atomic
//! `Awaiting → Resolving` transition guarantees exactly one of them
//! performs the resolution and the loser no-ops.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chorus_core::{ClientType, Resonance};

use crate::error::PromptError;

/// Default wait before a prompt gives up, tuned to human conversational
/// latency.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(10);

/// A prompt re-arms at most this many times (so three attempts total).
const MAX_RESETS: u32 = 2;

// =============================================================================
// Callbacks and Info
// =============================================================================

/// What a response callback decided about an incoming response.
pub enum PromptResolution {
    /// Accept: resolve the wait with this value, or with the raw
    /// response text when `None`.
    Resolve(Option<String>),
    /// Reject and re-arm the wait, delivering `PromptError` (typically
    /// [`PromptError::InvalidResponse`]) through `on_error` as feedback.
    Retry(PromptError),
}

/// Invoked with each candidate response the prompt accepted for
/// consideration.
pub type ResponseCallback =
    Arc<dyn Fn(Arc<Resonance>) -> BoxFuture<'static, PromptResolution> + Send + Sync>;

/// Invoked with every prompt error, terminal or feedback.
pub type ErrorCallback = Arc<dyn Fn(PromptError) -> BoxFuture<'static, ()> + Send + Sync>;

/// Decides whether a Resonance answers this prompt.
pub type PromptCondition = Arc<dyn Fn(&Resonance) -> bool + Send + Sync>;

/// Everything needed to open a prompt.
pub struct PromptInfo {
    client_type: ClientType,
    user_id: String,
    channel_id: String,
    time_limit: Duration,
    opening: Option<String>,
    condition: Option<PromptCondition>,
    on_response: Option<ResponseCallback>,
    on_error: Option<ErrorCallback>,
}

impl PromptInfo {
    /// A prompt expecting a reply from `user_id` on `channel_id`.
    pub fn new(
        client_type: ClientType,
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            client_type,
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            time_limit: DEFAULT_TIME_LIMIT,
            opening: None,
            condition: None,
            on_response: None,
            on_error: None,
        }
    }

    /// A prompt expecting a reply from the author of `resonance`, on the
    /// channel it arrived on.
    pub fn target(resonance: &Resonance) -> Self {
        Self::new(
            resonance.client_type(),
            resonance.author().id.clone(),
            resonance.origin().channel_id.clone(),
        )
    }

    /// Overrides the time limit.
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Sends this message before waiting.
    pub fn opening(mut self, text: impl Into<String>) -> Self {
        self.opening = Some(text.into());
        self
    }

    /// Replaces the default condition (same client, channel, and author).
    ///
    /// Conditions must stay precise: two outstanding prompts whose
    /// conditions overlap can steal each other's responses.
    pub fn condition(mut self, condition: PromptCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Sets the response callback.
    pub fn on_response(mut self, callback: ResponseCallback) -> Self {
        self.on_response = Some(callback);
        self
    }

    /// Sets the error callback.
    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }
}

// =============================================================================
// Prompt
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptState {
    /// Listening for a matching response.
    Awaiting,
    /// A response won the race and is being processed.
    Resolving,
    /// Terminal.
    Disabled,
}

enum PromptSignal {
    Response(Arc<Resonance>),
    Reset(PromptError),
}

/// One outstanding conversational expectation.
///
/// Held in the hub's active set from registration until terminal
/// resolution.
pub struct Prompt {
    id: u64,
    client_type: ClientType,
    user_id: String,
    channel_id: String,
    condition: PromptCondition,
    state: Mutex<PromptState>,
    signals: mpsc::Sender<PromptSignal>,
    cancel: CancellationToken,
}

impl Prompt {
    /// The user this prompt expects a reply from.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The channel this prompt watches.
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Offers a Resonance to this prompt. No-ops unless the client type
    /// matches, the condition holds, and this prompt wins the
    /// `Awaiting → Resolving` transition.
    async fn offer(&self, resonance: Arc<Resonance>) {
        if resonance.client_type() != self.client_type {
            return;
        }
        if !(self.condition)(&resonance) {
            return;
        }
        if !self.try_begin_resolution() {
            return;
        }
        if self
            .signals
            .send(PromptSignal::Response(resonance))
            .await
            .is_err()
        {
            debug!(prompt = self.id, "Prompt wait ended before response delivery");
        }
    }

    /// Re-arms the wait for another round, delivering `reason` through
    /// the error callback first. Bounded: exceeding the reset budget
    /// terminates the prompt with [`PromptError::MaxResetExceeded`].
    pub async fn reset(&self, reason: PromptError) {
        if self
            .signals
            .send(PromptSignal::Reset(reason))
            .await
            .is_err()
        {
            debug!(prompt = self.id, "Reset requested on a finished prompt");
        }
    }

    /// Disables the prompt. Idempotent and safe to call from anywhere;
    /// the pending wait rejects with [`PromptError::NoResponse`].
    pub fn disable(&self) {
        *self.state.lock() = PromptState::Disabled;
        self.cancel.cancel();
    }

    fn try_begin_resolution(&self) -> bool {
        let mut state = self.state.lock();
        if *state == PromptState::Awaiting {
            *state = PromptState::Resolving;
            true
        } else {
            false
        }
    }

    fn rearm(&self) {
        let mut state = self.state.lock();
        if *state == PromptState::Resolving {
            *state = PromptState::Awaiting;
        }
    }
}

impl std::fmt::Debug for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompt")
            .field("id", &self.id)
            .field("client_type", &self.client_type)
            .field("user_id", &self.user_id)
            .field("channel_id", &self.channel_id)
            .finish()
    }
}

// =============================================================================
// PromptHub
// =============================================================================

/// The set of outstanding prompts for one bot.
#[derive(Default)]
pub struct PromptHub {
    prompts: Mutex<Vec<Arc<Prompt>>>,
    next_id: AtomicU64,
}

impl PromptHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of prompts currently awaiting a response.
    pub fn active_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// A snapshot of the outstanding prompts, for callers that need to
    /// [`reset`](Prompt::reset) or [`disable`](Prompt::disable) one
    /// directly.
    pub fn active(&self) -> Vec<Arc<Prompt>> {
        self.prompts.lock().clone()
    }

    /// Disables every outstanding prompt. Idempotent.
    pub fn disable_all(&self) {
        for prompt in self.active() {
            prompt.disable();
        }
    }

    /// Offers a Resonance to every active prompt, concurrently. Client
    /// type mismatches and failed conditions are skipped silently.
    pub async fn listen(&self, resonance: &Arc<Resonance>) {
        let active: Vec<Arc<Prompt>> = self.prompts.lock().clone();
        if active.is_empty() {
            return;
        }
        join_all(active.into_iter().map(|prompt| {
            let resonance = Arc::clone(resonance);
            async move { prompt.offer(resonance).await }
        }))
        .await;
    }

    /// Opens a prompt and waits for its terminal resolution.
    ///
    /// Sends the opening message (if any), registers the prompt, then
    /// waits on a single race of {matching response, timeout,
    /// cancellation}:
    ///
    /// - a matching response runs `on_response`; a `Resolve` verdict
    ///   completes the wait with the callback's value or the raw text
    /// - a `Retry` verdict (or an explicit [`Prompt::reset`]) delivers
    ///   feedback through `on_error` and re-arms, at most twice; the
    ///   third attempt fails with one `MaxResetExceeded`
    /// - the timeout fires `on_error(NoResponse)` and rejects
    /// - [`Prompt::disable`] rejects with `NoResponse`, without the
    ///   error callback (the caller asked for the cancellation)
    ///
    /// The prompt leaves the hub's active set on every path out.
    pub async fn prompt(
        &self,
        resonance: &Arc<Resonance>,
        info: PromptInfo,
    ) -> Result<String, PromptError> {
        let PromptInfo {
            client_type,
            user_id,
            channel_id,
            time_limit,
            opening,
            condition,
            on_response,
            on_error,
        } = info;

        let condition = condition.unwrap_or_else(|| {
            let user = user_id.clone();
            let channel = channel_id.clone();
            Arc::new(move |candidate: &Resonance| {
                candidate.author().id == user && candidate.origin().channel_id == channel
            })
        });

        let (tx, mut rx) = mpsc::channel(8);
        let prompt = Arc::new(Prompt {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            client_type,
            user_id,
            channel_id,
            condition,
            state: Mutex::new(PromptState::Awaiting),
            signals: tx,
            cancel: CancellationToken::new(),
        });
        self.prompts.lock().push(Arc::clone(&prompt));
        debug!(prompt = prompt.id, user = %prompt.user_id, "Prompt opened");

        if let Some(text) = opening
            && let Err(err) = resonance.reply(&text).await
        {
            warn!(prompt = prompt.id, error = %err, "Failed to send prompt opening");
        }

        let mut resets: u32 = 0;
        let outcome = loop {
            tokio::select! {
                _ = prompt.cancel.cancelled() => {
                    break Err(PromptError::NoResponse);
                }
                _ = tokio::time::sleep(time_limit) => {
                    // The response path may have won the race already; if
                    // so, keep waiting for its signal to arrive.
                    if prompt.try_begin_resolution() {
                        if let Some(cb) = &on_error {
                            cb(PromptError::NoResponse).await;
                        }
                        break Err(PromptError::NoResponse);
                    }
                }
                signal = rx.recv() => match signal {
                    Some(PromptSignal::Response(response)) => {
                        let verdict = match &on_response {
                            Some(cb) => cb(Arc::clone(&response)).await,
                            None => PromptResolution::Resolve(None),
                        };
                        match verdict {
                            PromptResolution::Resolve(value) => {
                                break Ok(value
                                    .unwrap_or_else(|| response.content().to_string()));
                            }
                            PromptResolution::Retry(reason) => {
                                resets += 1;
                                if resets > MAX_RESETS {
                                    if let Some(cb) = &on_error {
                                        cb(PromptError::MaxResetExceeded).await;
                                    }
                                    break Err(PromptError::MaxResetExceeded);
                                }
                                if let Some(cb) = &on_error {
                                    cb(reason).await;
                                }
                                prompt.rearm();
                            }
                        }
                    }
                    Some(PromptSignal::Reset(reason)) => {
                        resets += 1;
                        if resets > MAX_RESETS {
                            if let Some(cb) = &on_error {
                                cb(PromptError::MaxResetExceeded).await;
                            }
                            break Err(PromptError::MaxResetExceeded);
                        }
                        if let Some(cb) = &on_error {
                            cb(reason).await;
                        }
                        prompt.rearm();
                    }
                    // All senders dropped; treat as a silent timeout.
                    None => break Err(PromptError::NoResponse),
                },
            }
        };

        prompt.disable();
        self.remove(prompt.id);
        debug!(prompt = prompt.id, outcome = ?outcome.as_ref().err(), "Prompt closed");
        outcome
    }

    fn remove(&self, id: u64) {
        self.prompts.lock().retain(|prompt| prompt.id != id);
    }
}

impl std::fmt::Debug for PromptHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptHub")
            .field("active", &self.active_count())
            .finish()
    }
}
