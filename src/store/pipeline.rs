use std::sync::mpsc::{self, Receiver, Sender};
use crate::directory::{DirectoryError, MoveAck, MoveRequest};
use crate::models::{Board, NegotiationRecord, Stage};
use crate::store::{BoardEvent, PipelineState, StoreError};

/// Handle for an in-flight full-board fetch
///
/// Tickets are numbered; only the most recently issued one may replace the
/// board. Completing consumes the ticket.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// Result of completing a full-board fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The board was replaced
    Applied { records: usize },
    /// A newer fetch was started after this one; its result was discarded
    Superseded,
}

/// Handle for a move awaiting directory confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTicket {
    seq: u64,
    request: MoveRequest,
}

impl MoveTicket {
    /// Request to send to the directory
    pub fn request(&self) -> &MoveRequest {
        &self.request
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Terminal outcome of a move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The directory accepted the move; the optimistic state stands
    Confirmed,
    /// The directory refused the move; the board was restored
    RolledBack(DirectoryError),
    /// Nothing to do: unknown record, or already in place
    Skipped,
    /// The ticket no longer matches a journaled move (already completed,
    /// or dropped by a board reload after confirmation)
    NotPending,
}

/// A move that has been applied optimistically and not yet retired
#[derive(Debug, Clone)]
struct JournalEntry {
    seq: u64,
    request: MoveRequest,
    /// Board as it was immediately before this move was applied
    snapshot: PipelineState,
    confirmed: bool,
    /// Server metadata from the confirmation, re-applied on every replay
    ack: Option<MoveAck>,
}

impl JournalEntry {
    /// Re-apply this move on top of `state`
    fn replay(&self, state: &mut PipelineState) {
        state.relocate(self.request.id, self.request.target, self.request.order_hint);
        if let Some(ack) = &self.ack {
            apply_ack(state, &self.request, ack);
        }
    }
}

/// Fold server metadata for a confirmed move into one board.
///
/// The timestamp always applies. The order hint only applies while the record
/// still sits in the move's target stage, and a changed hint re-places the
/// record so the stage stays ordered.
fn apply_ack(state: &mut PipelineState, request: &MoveRequest, ack: &MoveAck) {
    if let Some(hint) = ack.order_hint {
        let in_target = state.find(request.id).map(|r| r.stage) == Some(request.target);
        let changed = state.find(request.id).map(|r| r.order_hint) != Some(Some(hint));
        if in_target && changed {
            state.relocate(request.id, request.target, Some(hint));
        }
    }
    if let Some(ts) = ack.updated_ts {
        state.patch(request.id, |record| record.updated_ts = ts);
    }
}

/// In-memory board with optimistic moves
///
/// The store never performs I/O. Each suspension point is split in two:
/// a *begin* call that returns a ticket, and a *complete* call that takes the
/// ticket and the directory's answer. All calls happen on one logical thread.
///
/// Every move is journaled with the snapshot taken right before it. When a
/// move fails, the board is restored to that snapshot and every later move
/// still in the journal is re-applied on top, so an overlapping move that
/// already succeeded is never erased.
///
/// # Example
///
/// ```
/// use negocia::models::{Board, NegotiationRecord, Stage};
/// use negocia::store::{MoveOutcome, PipelineStore};
/// use negocia::directory::DirectoryError;
///
/// let mut store = PipelineStore::new();
/// let ticket = store.begin_load();
/// let mut board = Board::new();
/// board.insert(Stage::NovoLead, vec![NegotiationRecord::new(1, Stage::NovoLead, 0)]);
/// store.complete_load(ticket, Ok(board)).unwrap();
///
/// let moving = store.move_card(1, Stage::Qualificado, None).unwrap();
/// assert_eq!(store.state().records(Stage::Qualificado).len(), 1);
///
/// let outcome = store.complete_move(&moving, Err(DirectoryError::Validation("no".into())));
/// assert!(matches!(outcome, MoveOutcome::RolledBack(_)));
/// assert_eq!(store.state().records(Stage::NovoLead).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct PipelineStore {
    state: PipelineState,
    journal: Vec<JournalEntry>,
    next_move_seq: u64,
    load_seq: u64,
    loaded: bool,
    subscribers: Vec<Sender<BoardEvent>>,
}

impl PipelineStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Tear the store down. Subscribers observe their channel closing.
    pub fn dispose(self) {
        log::debug!(
            "disposing pipeline store ({} records, {} journaled moves)",
            self.state.len(),
            self.journal.len()
        );
    }

    /// Subscribe to board notifications
    pub fn subscribe(&mut self) -> Receiver<BoardEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Current board (read-only)
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn find(&self, id: i64) -> Option<&NegotiationRecord> {
        self.state.find(id)
    }

    pub fn records(&self, stage: Stage) -> &[NegotiationRecord] {
        self.state.records(stage)
    }

    /// Whether a full-board fetch has ever been applied
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Moves still awaiting confirmation
    pub fn pending_moves(&self) -> usize {
        self.journal.iter().filter(|e| !e.confirmed).count()
    }

    // ------------------------------------------------------------------
    // Full-board fetch
    // ------------------------------------------------------------------

    /// Start a full-board fetch. Any fetch started earlier is superseded.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_seq += 1;
        log::debug!("board load #{} started", self.load_seq);
        LoadTicket(self.load_seq)
    }

    /// Complete a full-board fetch.
    ///
    /// A superseded ticket is discarded whatever it carries. On failure the
    /// current board is kept and the error is returned and broadcast. A board
    /// that breaks the invariants counts as a failure.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Board, DirectoryError>,
    ) -> Result<LoadOutcome, StoreError> {
        if ticket.0 != self.load_seq {
            log::debug!("board load #{} superseded by #{}, discarding", ticket.0, self.load_seq);
            return Ok(LoadOutcome::Superseded);
        }

        let fresh = result
            .map_err(StoreError::from)
            .and_then(PipelineState::from_board);

        match fresh {
            Ok(state) => {
                self.rebase(state);
                self.loaded = true;
                let records = self.state.len();
                log::info!("board load #{} applied: {} negotiations", ticket.0, records);
                self.emit(BoardEvent::Loaded { records });
                Ok(LoadOutcome::Applied { records })
            }
            Err(error) => {
                log::warn!("board load #{} failed: {}", ticket.0, error);
                self.emit(BoardEvent::LoadFailed { error: error.clone() });
                Err(error)
            }
        }
    }

    /// Install a freshly fetched board and replay pending moves on top of it.
    /// Confirmed moves are already part of the server's answer.
    fn rebase(&mut self, fresh: PipelineState) {
        self.journal.retain(|entry| !entry.confirmed);
        let mut state = fresh;
        for entry in &mut self.journal {
            entry.snapshot = state.clone();
            entry.replay(&mut state);
        }
        self.state = state;
    }

    // ------------------------------------------------------------------
    // Moves
    // ------------------------------------------------------------------

    /// Move a card optimistically.
    ///
    /// Returns `None` when the record is not on the board, or when it already
    /// sits in `target` and no different order hint is given; no request is
    /// needed then.
    /// Otherwise the board changes immediately and the returned ticket
    /// carries the request to send to the directory.
    pub fn move_card(&mut self, id: i64, target: Stage, order_hint: Option<i64>) -> Option<MoveTicket> {
        let origin = match self.state.find(id) {
            // No hint on the current stage keeps the current position
            Some(record) if record.stage == target && (order_hint.is_none() || record.order_hint == order_hint) => {
                log::debug!("negotiation {} already in {} with same order, skipping", id, target.as_str());
                return None;
            }
            Some(record) => record.stage,
            None => {
                log::debug!("negotiation {} not on the board, ignoring move", id);
                return None;
            }
        };

        let snapshot = self.state.clone();
        self.state.relocate(id, target, order_hint);

        self.next_move_seq += 1;
        let request = MoveRequest { id, target, order_hint };
        self.journal.push(JournalEntry {
            seq: self.next_move_seq,
            request,
            snapshot,
            confirmed: false,
            ack: None,
        });

        log::debug!(
            "move #{}: negotiation {} {} -> {} (optimistic)",
            self.next_move_seq,
            id,
            origin.as_str(),
            target.as_str()
        );
        self.emit(BoardEvent::Moved { id, from: origin, to: target });

        Some(MoveTicket { seq: self.next_move_seq, request })
    }

    /// Complete a move with the directory's answer
    pub fn complete_move(&mut self, ticket: &MoveTicket, result: Result<MoveAck, DirectoryError>) -> MoveOutcome {
        let pos = match self.journal.iter().position(|e| e.seq == ticket.seq) {
            Some(pos) => pos,
            None => {
                log::warn!("move #{} is not pending, ignoring its completion", ticket.seq);
                return MoveOutcome::NotPending;
            }
        };
        let request = ticket.request;

        match result {
            Ok(ack) => {
                self.journal[pos].confirmed = true;
                self.journal[pos].ack = Some(ack);
                self.reconcile(pos, &request, &ack);
                self.retire_confirmed();
                log::debug!("move #{} confirmed", ticket.seq);
                self.emit(BoardEvent::MoveConfirmed { id: request.id, stage: request.target });
                MoveOutcome::Confirmed
            }
            Err(error) => {
                self.roll_back(pos);
                log::warn!(
                    "move #{} of negotiation {} to {} failed, board restored: {}",
                    ticket.seq,
                    request.id,
                    request.target.as_str(),
                    error
                );
                self.emit(BoardEvent::MoveRolledBack {
                    id: request.id,
                    attempted: request.target,
                    error: error.clone(),
                });
                MoveOutcome::RolledBack(error)
            }
        }
    }

    /// Restore the snapshot of the journal entry at `pos` and replay every
    /// later entry on top of it, refreshing their snapshots along the way
    fn roll_back(&mut self, pos: usize) {
        let failed = self.journal.remove(pos);
        let mut state = failed.snapshot;
        for entry in &mut self.journal[pos..] {
            entry.snapshot = state.clone();
            entry.replay(&mut state);
        }
        self.state = state;
        self.retire_confirmed();
    }

    /// Fold server-provided metadata into the live board and into every
    /// snapshot taken after the confirmed move
    fn reconcile(&mut self, pos: usize, request: &MoveRequest, ack: &MoveAck) {
        if ack.updated_ts.is_none() && ack.order_hint.is_none() {
            return;
        }
        apply_ack(&mut self.state, request, ack);
        for entry in &mut self.journal[pos + 1..] {
            apply_ack(&mut entry.snapshot, request, ack);
        }
    }

    /// Drop confirmed entries from the head of the journal; nothing earlier
    /// can roll back past them anymore
    fn retire_confirmed(&mut self) {
        let settled = self.journal.iter().take_while(|e| e.confirmed).count();
        self.journal.drain(..settled);
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Add a server-confirmed record to the end of its stage.
    ///
    /// The record also joins every journaled snapshot, so rolling back an
    /// unrelated move cannot drop it.
    pub fn insert(&mut self, record: NegotiationRecord) -> Result<(), StoreError> {
        let (id, stage) = (record.id, record.stage);
        if self.state.contains(id) {
            return Err(StoreError::DuplicateRecord(id));
        }
        for entry in &mut self.journal {
            if !entry.snapshot.contains(id) {
                entry.snapshot.append(record.clone())?;
            }
        }
        self.state.append(record)?;
        log::debug!("negotiation {} inserted into {}", id, stage.as_str());
        self.emit(BoardEvent::Inserted { id, stage });
        Ok(())
    }

    fn emit(&mut self, event: BoardEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
