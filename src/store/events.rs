use crate::directory::DirectoryError;
use crate::models::Stage;
use crate::store::StoreError;

/// Notification emitted by the pipeline store
///
/// Every event follows a change a subscriber may want to render, except
/// `LoadFailed`, which leaves the board untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// A full-board fetch replaced the state
    Loaded { records: usize },
    /// A full-board fetch failed; the previous state is kept
    LoadFailed { error: StoreError },
    /// A card moved optimistically and awaits confirmation
    Moved { id: i64, from: Stage, to: Stage },
    /// The directory confirmed a move
    MoveConfirmed { id: i64, stage: Stage },
    /// The directory rejected a move and the board was restored
    MoveRolledBack { id: i64, attempted: Stage, error: DirectoryError },
    /// A server-confirmed record was added to the board
    Inserted { id: i64, stage: Stage },
}

impl BoardEvent {
    /// Failures the UI should surface to the user
    pub fn is_failure(&self) -> bool {
        matches!(self, BoardEvent::LoadFailed { .. } | BoardEvent::MoveRolledBack { .. })
    }
}
