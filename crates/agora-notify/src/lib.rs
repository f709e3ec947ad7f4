pub mod digest;
pub mod emit;
pub mod handler;
pub mod labeler;
pub mod prune;
pub mod webhooks;

pub use emit::Notifier;
pub use handler::{ChainEventHandler, IngestOutcome};
