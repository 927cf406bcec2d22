//! Clipboard access: text write, image read and clear.
//!
//! The `SystemClipboard` trait is the seam between the capture session and the OS pasteboard.
//! `ArboardClipboard` is the real implementation; tests use an in-memory one.

#[cfg(test)]
pub(crate) mod memory;

use arboard::Clipboard;
use image::RgbaImage;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Clipboard operation failed: {0}")]
    Operation(String),
    #[error("Clipboard image has inconsistent dimensions ({width}x{height}, {len} bytes)")]
    InvalidImage { width: usize, height: usize, len: usize },
}

impl From<arboard::Error> for ClipboardError {
    fn from(e: arboard::Error) -> Self {
        ClipboardError::Operation(e.to_string())
    }
}

/// Operations the capture session needs from the system clipboard.
///
/// Implementations are owned by the main context thread and need not be `Send`.
pub trait SystemClipboard {
    /// Replaces the clipboard contents with `text`.
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;

    /// Current clipboard image, `None` when the clipboard holds no image data.
    fn image(&mut self) -> Result<Option<RgbaImage>, ClipboardError>;

    /// Removes all clipboard contents.
    fn clear(&mut self) -> Result<(), ClipboardError>;
}

/// System clipboard backed by `arboard`.
pub struct ArboardClipboard {
    inner: Clipboard,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let inner = Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl SystemClipboard for ArboardClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner.set_text(text)?;
        Ok(())
    }

    fn image(&mut self) -> Result<Option<RgbaImage>, ClipboardError> {
        let data = match self.inner.get_image() {
            Ok(data) => data,
            Err(arboard::Error::ContentNotAvailable) => {
                debug!("Clipboard holds no image data");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let (width, height) = (data.width, data.height);
        let bytes = data.bytes.into_owned();
        let len = bytes.len();
        let image = u32::try_from(width)
            .ok()
            .zip(u32::try_from(height).ok())
            .and_then(|(w, h)| RgbaImage::from_raw(w, h, bytes))
            .ok_or(ClipboardError::InvalidImage { width, height, len })?;

        debug!(width, height, "Read image from clipboard");
        Ok(Some(image))
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        self.inner.clear()?;
        Ok(())
    }
}

/// Joins `texts` with newline separators, in order. An empty sequence yields `""`.
pub fn join_lines<'a, I>(texts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    texts.into_iter().collect::<Vec<_>>().join("\n")
}

/// Writes the newline-joined `texts` to the clipboard and returns the number of bytes written.
/// Logs only lengths to avoid leaking captured content into logs.
pub fn copy_lines<'a, I>(
    clipboard: &mut dyn SystemClipboard,
    texts: I,
) -> Result<usize, ClipboardError>
where
    I: IntoIterator<Item = &'a str>,
{
    let combined = join_lines(texts);
    clipboard.set_text(&combined)?;
    debug!(len = combined.len(), "Copied text to clipboard");
    Ok(combined.len())
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryClipboard;
    use super::*;

    #[test]
    fn join_lines_uses_newline_separators() {
        assert_eq!(join_lines(["a", "b", "c"]), "a\nb\nc");
        assert_eq!(join_lines(["only"]), "only");
        assert_eq!(join_lines(Vec::<&str>::new()), "");
    }

    #[test]
    fn copy_lines_replaces_clipboard_text() {
        let (mut clipboard, contents) = MemoryClipboard::new();
        clipboard.set_text("previous").unwrap();

        let written = copy_lines(&mut clipboard, ["first", "", "third"]).unwrap();

        assert_eq!(written, "first\n\nthird".len());
        assert_eq!(contents.text().as_deref(), Some("first\n\nthird"));
    }

    #[test]
    fn copy_lines_surfaces_write_failures() {
        let (mut clipboard, contents) = MemoryClipboard::new();
        contents.fail_writes(true);

        assert!(copy_lines(&mut clipboard, ["x"]).is_err());
        assert_eq!(contents.text(), None);
    }
}
