use std::sync::Mutex;

/// The text widget showing the active file.
///
/// Only the active file's content lives in the editor; the session copies it
/// back into the file set before every save, run, or tab switch.
pub trait Editor: Send + Sync {
    fn get_value(&self) -> String;
    fn set_value(&self, content: &str);
}

/// Headless editor backed by a string.
#[derive(Debug, Default)]
pub struct BufferEditor {
    text: Mutex<String>,
}

impl BufferEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
        }
    }
}

impl Editor for BufferEditor {
    fn get_value(&self) -> String {
        self.text.lock().expect("lock poisoned").clone()
    }

    fn set_value(&self, content: &str) {
        *self.text.lock().expect("lock poisoned") = content.to_owned();
    }
}
