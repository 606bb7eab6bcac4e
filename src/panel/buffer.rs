//! Text fields that commit on blur instead of on every keystroke.

/// Local edit buffer over an externally owned value.
///
/// Keystrokes only touch the buffer. `commit` (blur) hands back the value to
/// write, and `sync` resets the buffer whenever the external value changes
/// out from under it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditBuffer {
    buffer: String,
    /// External value the buffer was last synced to or committed as.
    external: String,
}

impl EditBuffer {
    pub fn new(external: &str) -> Self {
        Self {
            buffer: external.to_string(),
            external: external.to_string(),
        }
    }

    pub fn value(&self) -> &str {
        &self.buffer
    }

    /// Replace the buffered text. Never writes anywhere.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Observe the current external value. Local edits are discarded only
    /// when the external value actually changed; returns whether it did.
    pub fn sync(&mut self, external: &str) -> bool {
        if self.external == external {
            return false;
        }
        self.external = external.to_string();
        self.buffer = external.to_string();
        true
    }

    /// Flush on blur. Returns the trimmed value to write, or `None` when it
    /// matches what the store already holds.
    pub fn commit(&mut self) -> Option<String> {
        let value = self.buffer.trim().to_string();
        self.buffer = value.clone();
        if value == self.external.trim() {
            return None;
        }
        self.external = value.clone();
        Some(value)
    }

    /// Undo a commit the store rejected: the external value goes back to
    /// `external` while the typed text stays, so the next blur writes again.
    pub fn revert(&mut self, external: &str) {
        self.external = external.to_string();
    }
}
