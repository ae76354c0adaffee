pub mod tailer;
pub mod watcher;

pub use tailer::{ByteRange, MessageBatch, Tailer};
pub use watcher::{SessionWatcher, DEFAULT_DEBOUNCE};
