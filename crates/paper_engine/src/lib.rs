//! Paper insight engine: HTTP transport, polling scheduler and effect execution.
mod client;
mod engine;
mod poller;
mod types;
mod wire;

pub use client::{ClientSettings, PaperClient, ReqwestPaperClient, DEFAULT_BASE_URL};
pub use engine::EngineHandle;
pub use poller::{run_poll_loop, ChannelEventSink, EventSink, PollPlan, StopReason};
pub use types::{EngineEvent, FailureKind, FetchError};
pub use wire::{decode_snapshot, decode_upload};
