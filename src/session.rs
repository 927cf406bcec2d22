//! Capture session owned by the main context.
//!
//! The main context is a dedicated worker thread that owns the captured entries, the system
//! clipboard and the preview surface. Callers hold a cloneable `SessionHandle` and submit jobs
//! over a channel; jobs run one at a time in submission order, so UI-visible mutations
//! (clipboard clear, entry list clear, preview dismissal) are always observed together.
//! Each job answers through a oneshot channel that resolves exactly once.

use image::RgbaImage;
use thiserror::Error;
use tokio::sync::{mpsc as async_mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::system::clipboard::{self, ClipboardError, SystemClipboard};

const MAIN_CONTEXT_THREAD_NAME: &str = "textsnap-main";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Capture session is closed")]
    Closed,
    #[error("Failed to start main context thread: {0}")]
    Spawn(std::io::Error),
    #[error("Failed to initialize clipboard: {0}")]
    Clipboard(#[from] ClipboardError),
}

/// One recognized text region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedTextEntry {
    pub id: String,
    pub text: String,
}

impl CapturedTextEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: nanoid::nanoid!(),
            text: text.into(),
        }
    }
}

impl Default for CapturedTextEntry {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// A visible preview of the capture (window, popover...). Owned by the main context.
pub trait PreviewSurface: Send {
    /// Hides the surface. Called at most once, right before the reference is dropped.
    fn dismiss(&mut self);
}

/// State owned by the main context thread.
pub struct SessionState {
    entries: Vec<CapturedTextEntry>,
    clipboard: Box<dyn SystemClipboard>,
    preview: Option<Box<dyn PreviewSurface>>,
}

impl SessionState {
    fn new(clipboard: Box<dyn SystemClipboard>) -> Self {
        Self {
            entries: Vec::new(),
            clipboard,
            preview: None,
        }
    }

    pub fn entries(&self) -> &[CapturedTextEntry] {
        &self.entries
    }

    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }

    /// Replaces the preview, dismissing the previous one if any.
    pub fn show_preview(&mut self, surface: Box<dyn PreviewSurface>) {
        self.dismiss_preview();
        self.preview = Some(surface);
    }

    fn dismiss_preview(&mut self) {
        if let Some(mut preview) = self.preview.take() {
            preview.dismiss();
            debug!("Preview dismissed");
        }
    }

    /// Joins the entries' text with newlines and writes it to the clipboard.
    /// Failures are logged, not returned.
    pub fn copy_to_clipboard(&mut self, entries: &[CapturedTextEntry]) {
        let texts = entries.iter().map(|e| e.text.as_str());
        match clipboard::copy_lines(self.clipboard.as_mut(), texts) {
            Ok(len) => info!(entries = entries.len(), len, "Copied captured text"),
            Err(e) => warn!(error = %e, "Failed to copy captured text to clipboard"),
        }
    }

    /// Empties the entry list, clears the clipboard and dismisses the preview.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        if let Err(e) = self.clipboard.clear() {
            warn!(error = %e, "Failed to clear clipboard");
        }
        self.dismiss_preview();
        info!(dropped, "Capture cleared");
    }

    /// Image currently on the clipboard. Read errors are logged and reported as no image.
    pub fn read_clipboard_image(&mut self) -> Option<RgbaImage> {
        match self.clipboard.image() {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "Failed to read image from clipboard");
                None
            }
        }
    }
}

type Job = Box<dyn FnOnce(&mut SessionState) + Send>;

enum SessionRequest {
    Run(Job),
    Shutdown,
}

/// Sender side of the main context. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    tx: async_mpsc::UnboundedSender<SessionRequest>,
}

impl SessionHandle {
    /// Spawns the main context thread. The clipboard is created on that thread, so it does not
    /// need to be `Send`. Readiness is awaited, so no runtime worker blocks on it.
    pub async fn start<F>(make_clipboard: F) -> Result<Self, SessionError>
    where
        F: FnOnce() -> Result<Box<dyn SystemClipboard>, ClipboardError> + Send + 'static,
    {
        let (tx, mut rx) = async_mpsc::unbounded_channel::<SessionRequest>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), ClipboardError>>();

        std::thread::Builder::new()
            .name(MAIN_CONTEXT_THREAD_NAME.to_string())
            .spawn(move || {
                let clipboard = match make_clipboard() {
                    Ok(cb) => {
                        let _ = ready_tx.send(Ok(()));
                        cb
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let mut state = SessionState::new(clipboard);
                debug!("Main context started");
                while let Some(req) = rx.blocking_recv() {
                    match req {
                        SessionRequest::Run(job) => job(&mut state),
                        SessionRequest::Shutdown => break,
                    }
                }
                state.dismiss_preview();
                info!("Main context stopped");
            })
            .map_err(SessionError::Spawn)?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self { tx }),
            Ok(Err(e)) => Err(SessionError::Clipboard(e)),
            Err(_) => Err(SessionError::Closed),
        }
    }

    /// Starts a session on the real system clipboard.
    pub async fn start_with_system_clipboard() -> Result<Self, SessionError> {
        Self::start(|| {
            let cb = clipboard::ArboardClipboard::new()?;
            Ok(Box::new(cb) as Box<dyn SystemClipboard>)
        })
        .await
    }

    /// Runs `f` on the main context and returns its result.
    pub async fn run<F, R>(&self, f: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut SessionState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |state| {
            let _ = tx.send(f(state));
        });
        self.tx
            .send(SessionRequest::Run(job))
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Appends a recognized text region and returns its id.
    pub async fn add_entry(&self, text: impl Into<String>) -> Result<String, SessionError> {
        let entry = CapturedTextEntry::new(text);
        self.run(move |state| {
            let id = entry.id.clone();
            state.entries.push(entry);
            id
        })
        .await
    }

    /// Snapshot of the current entries, in order.
    pub async fn entries(&self) -> Result<Vec<CapturedTextEntry>, SessionError> {
        self.run(|state| state.entries.clone()).await
    }

    /// Copies `entries`, newline-joined, to the clipboard. Clipboard failures are only logged.
    pub async fn copy_to_clipboard(
        &self,
        entries: Vec<CapturedTextEntry>,
    ) -> Result<(), SessionError> {
        self.run(move |state| state.copy_to_clipboard(&entries)).await
    }

    /// Copies the session's own entries to the clipboard.
    pub async fn copy_session_to_clipboard(&self) -> Result<(), SessionError> {
        self.run(|state| {
            let entries = std::mem::take(&mut state.entries);
            state.copy_to_clipboard(&entries);
            state.entries = entries;
        })
        .await
    }

    /// Clears entries, clipboard and preview in one main-context job.
    pub async fn clear_capture(&self) -> Result<(), SessionError> {
        self.run(SessionState::clear).await
    }

    pub async fn show_preview(
        &self,
        surface: Box<dyn PreviewSurface>,
    ) -> Result<(), SessionError> {
        self.run(move |state| state.show_preview(surface)).await
    }

    pub async fn has_preview(&self) -> Result<bool, SessionError> {
        self.run(|state| state.has_preview()).await
    }

    pub async fn read_clipboard_image(&self) -> Result<Option<RgbaImage>, SessionError> {
        self.run(SessionState::read_clipboard_image).await
    }

    /// Stops the main context after the jobs already queued. The preview, if any, is
    /// dismissed; the clipboard keeps its contents.
    pub fn close(&self) {
        if self.tx.send(SessionRequest::Shutdown).is_err() {
            debug!("Main context already closed");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::system::clipboard::memory::{MemoryClipboard, MemoryContents};

    pub(crate) async fn memory_session() -> (SessionHandle, MemoryContents) {
        let (clipboard, contents) = MemoryClipboard::new();
        let handle =
            SessionHandle::start(move || Ok(Box::new(clipboard) as Box<dyn SystemClipboard>))
                .await
                .expect("session starts");
        (handle, contents)
    }

    struct RecordingPreview {
        dismissed: Arc<AtomicUsize>,
    }

    impl PreviewSurface for RecordingPreview {
        fn dismiss(&mut self) {
            self.dismissed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recording_preview() -> (Box<dyn PreviewSurface>, Arc<AtomicUsize>) {
        let dismissed = Arc::new(AtomicUsize::new(0));
        (
            Box::new(RecordingPreview {
                dismissed: dismissed.clone(),
            }),
            dismissed,
        )
    }

    #[test]
    fn entries_get_unique_ids_and_default_to_empty_text() {
        let a = CapturedTextEntry::default();
        let b = CapturedTextEntry::new("hello");
        assert!(a.text.is_empty());
        assert_eq!(b.text, "hello");
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn copy_joins_entries_with_newlines() {
        let (session, contents) = memory_session().await;
        let entries = vec![
            CapturedTextEntry::new("a"),
            CapturedTextEntry::new("b"),
            CapturedTextEntry::new("c"),
        ];

        session.copy_to_clipboard(entries).await.unwrap();

        assert_eq!(contents.text().as_deref(), Some("a\nb\nc"));
    }

    #[tokio::test]
    async fn copy_of_empty_sequence_sets_empty_string() {
        let (session, contents) = memory_session().await;
        contents.set_text("stale");

        session.copy_to_clipboard(Vec::new()).await.unwrap();

        assert_eq!(contents.text().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn copy_failure_is_absorbed() {
        let (session, contents) = memory_session().await;
        contents.fail_writes(true);

        let result = session.copy_to_clipboard(vec![CapturedTextEntry::new("x")]).await;

        assert!(result.is_ok());
        assert_eq!(contents.text(), None);
    }

    #[tokio::test]
    async fn session_entries_copy_in_insertion_order() {
        let (session, contents) = memory_session().await;
        for text in ["first", "second", "third"] {
            session.add_entry(text).await.unwrap();
        }

        session.copy_session_to_clipboard().await.unwrap();

        let texts: Vec<String> = session
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.text)
            .collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(contents.text().as_deref(), Some("first\nsecond\nthird"));
    }

    #[tokio::test]
    async fn clear_resets_entries_clipboard_and_preview() {
        let (session, contents) = memory_session().await;
        session.add_entry("text").await.unwrap();
        session.copy_session_to_clipboard().await.unwrap();
        let (preview, dismissed) = recording_preview();
        session.show_preview(preview).await.unwrap();

        session.clear_capture().await.unwrap();

        assert!(session.entries().await.unwrap().is_empty());
        assert_eq!(contents.text(), None);
        assert!(!session.has_preview().await.unwrap());
        assert_eq!(dismissed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_without_preview_is_safe() {
        let (session, contents) = memory_session().await;

        session.clear_capture().await.unwrap();
        session.clear_capture().await.unwrap();

        assert!(session.entries().await.unwrap().is_empty());
        assert!(!session.has_preview().await.unwrap());
        assert_eq!(contents.clears(), 2);
    }

    #[tokio::test]
    async fn clear_still_resets_state_when_clipboard_fails() {
        let (session, contents) = memory_session().await;
        session.add_entry("text").await.unwrap();
        let (preview, dismissed) = recording_preview();
        session.show_preview(preview).await.unwrap();
        contents.fail_writes(true);

        session.clear_capture().await.unwrap();

        assert!(session.entries().await.unwrap().is_empty());
        assert!(!session.has_preview().await.unwrap());
        assert_eq!(dismissed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn showing_a_new_preview_dismisses_the_old_one() {
        let (session, _contents) = memory_session().await;
        let (first, first_dismissed) = recording_preview();
        let (second, second_dismissed) = recording_preview();

        session.show_preview(first).await.unwrap();
        session.show_preview(second).await.unwrap();

        assert_eq!(first_dismissed.load(Ordering::SeqCst), 1);
        assert_eq!(second_dismissed.load(Ordering::SeqCst), 0);
        assert!(session.has_preview().await.unwrap());
    }

    #[tokio::test]
    async fn jobs_after_close_report_closed() {
        let (session, _contents) = memory_session().await;
        let (preview, dismissed) = recording_preview();
        session.show_preview(preview).await.unwrap();

        session.close();

        assert!(matches!(
            session.entries().await,
            Err(SessionError::Closed)
        ));
        assert_eq!(dismissed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn start_reports_clipboard_init_failure() {
        let result = SessionHandle::start(|| {
            Err(ClipboardError::Unavailable("no display".to_string()))
        })
        .await;
        assert!(matches!(result, Err(SessionError::Clipboard(_))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn start_completes_on_a_single_threaded_runtime() {
        let (session, contents) = memory_session().await;
        session
            .copy_to_clipboard(vec![CapturedTextEntry::new("ready")])
            .await
            .unwrap();
        assert_eq!(contents.text().as_deref(), Some("ready"));
    }
}
