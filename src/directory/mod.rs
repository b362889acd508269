//! Negotiation directory service
//!
//! The directory is the server-authoritative owner of negotiations. The
//! pipeline store never talks to storage directly; it only sees this trait.
//! [`SqliteDirectory`] is the local implementation used by the CLI.

pub mod sqlite;

pub use sqlite::SqliteDirectory;

use serde::{Deserialize, Serialize};
use crate::models::{Board, NegotiationRecord, NewNegotiation, Stage};

/// Failures reported by a directory
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Network or IO failure; the request may not have reached the server
    #[error("transport error: {0}")]
    Transport(String),
    /// Unexpected server-side failure
    #[error("server error: {0}")]
    Server(String),
    /// The server refused the change on business grounds
    #[error("validation failed: {0}")]
    Validation(String),
    /// The negotiation no longer exists server-side
    #[error("negotiation {0} not found")]
    NotFound(i64),
}

impl DirectoryError {
    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DirectoryError::Transport(_) | DirectoryError::Server(_))
    }
}

/// Single-record move sent to the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub id: i64,
    pub target: Stage,
    pub order_hint: Option<i64>,
}

/// Directory acknowledgement of a move.
/// Fields are optional; when present they are reconciled into the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAck {
    pub updated_ts: Option<i64>,
    pub order_hint: Option<i64>,
}

/// Remote operations consumed by the pipeline
pub trait DirectoryService {
    /// Fetch every negotiation, grouped by stage and ordered within each stage
    fn fetch_board(&self) -> Result<Board, DirectoryError>;

    /// Persist a stage transition for one negotiation
    fn move_record(&self, request: &MoveRequest) -> Result<MoveAck, DirectoryError>;

    /// Create a negotiation; the returned record carries the assigned id
    fn create_record(&self, fields: &NewNegotiation) -> Result<NegotiationRecord, DirectoryError>;
}

impl<T: DirectoryService + ?Sized> DirectoryService for &T {
    fn fetch_board(&self) -> Result<Board, DirectoryError> {
        (**self).fetch_board()
    }

    fn move_record(&self, request: &MoveRequest) -> Result<MoveAck, DirectoryError> {
        (**self).move_record(request)
    }

    fn create_record(&self, fields: &NewNegotiation) -> Result<NegotiationRecord, DirectoryError> {
        (**self).create_record(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DirectoryError::Transport("timeout".into()).is_retryable());
        assert!(DirectoryError::Server("500".into()).is_retryable());
        assert!(!DirectoryError::Validation("rule".into()).is_retryable());
        assert!(!DirectoryError::NotFound(4).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(DirectoryError::NotFound(7).to_string(), "negotiation 7 not found");
        assert_eq!(
            DirectoryError::Validation("needs a property".into()).to_string(),
            "validation failed: needs a property"
        );
    }
}
