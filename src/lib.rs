pub mod args;
pub mod audio;
pub mod captions;
pub mod catalog;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod scheduler;
pub mod script;
pub mod subtitle;
pub mod tts;
pub mod utils;
pub mod video;

pub use error::{PipelineError, SelectionError};
pub use scheduler::{HistoryStore, JsonFileStore, MemoryStore, Scheduler};
