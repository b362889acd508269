//! Pipeline store
//!
//! The store holds the board in memory and mediates every change:
//!
//! - [`PipelineState`]: records keyed by stage, with the board invariants
//! - [`PipelineStore`]: optimistic moves with per-move snapshots and rollback
//! - [`BoardClient`]: drives a store against a [`DirectoryService`](crate::directory::DirectoryService)
//!   when round trips complete inline
//! - [`BoardEvent`]: notifications for subscribers

pub mod client;
pub mod events;
pub mod pipeline;
pub mod state;

pub use client::BoardClient;
pub use events::BoardEvent;
pub use pipeline::{LoadOutcome, LoadTicket, MoveOutcome, MoveTicket, PipelineStore};
pub use state::PipelineState;

use crate::directory::DirectoryError;
use crate::models::Stage;

/// Store-level failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("negotiation {0} appears more than once on the board")]
    DuplicateRecord(i64),
    #[error("negotiation {id} is tagged {tagged} but stored under {stored_under}")]
    StageMismatch {
        id: i64,
        tagged: Stage,
        stored_under: Stage,
    },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
