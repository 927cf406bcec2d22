//! In-memory clipboard used by tests. The paired `MemoryContents` handle is `Send` so tests can
//! seed and inspect the clipboard while the session thread owns the `MemoryClipboard`.

use std::sync::{Arc, Mutex, MutexGuard};

use image::RgbaImage;

use super::{ClipboardError, SystemClipboard};

#[derive(Default)]
struct State {
    text: Option<String>,
    image: Option<RgbaImage>,
    fail_writes: bool,
    clears: usize,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryContents {
    state: Arc<Mutex<State>>,
}

impl MemoryContents {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn text(&self) -> Option<String> {
        self.lock().text.clone()
    }

    pub(crate) fn set_text(&self, text: &str) {
        self.lock().text = Some(text.to_string());
    }

    pub(crate) fn has_image(&self) -> bool {
        self.lock().image.is_some()
    }

    pub(crate) fn set_image(&self, image: RgbaImage) {
        self.lock().image = Some(image);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub(crate) fn clears(&self) -> usize {
        self.lock().clears
    }
}

pub(crate) struct MemoryClipboard {
    contents: MemoryContents,
}

impl MemoryClipboard {
    pub(crate) fn new() -> (Self, MemoryContents) {
        let contents = MemoryContents::default();
        (
            Self {
                contents: contents.clone(),
            },
            contents,
        )
    }
}

impl SystemClipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut state = self.contents.lock();
        if state.fail_writes {
            return Err(ClipboardError::Operation("write rejected".to_string()));
        }
        state.image = None;
        state.text = Some(text.to_string());
        Ok(())
    }

    fn image(&mut self) -> Result<Option<RgbaImage>, ClipboardError> {
        Ok(self.contents.lock().image.clone())
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        let mut state = self.contents.lock();
        if state.fail_writes {
            return Err(ClipboardError::Operation("clear rejected".to_string()));
        }
        state.text = None;
        state.image = None;
        state.clears += 1;
        Ok(())
    }
}
