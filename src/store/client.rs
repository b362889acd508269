use std::sync::mpsc::Receiver;
use crate::board::{drop_card, DragError, DragSession};
use crate::directory::DirectoryService;
use crate::models::{NegotiationRecord, NewNegotiation, Stage};
use crate::store::{BoardEvent, MoveOutcome, PipelineState, PipelineStore, StoreError};

/// Pipeline store wired to a directory whose calls complete inline
///
/// Each operation issues the begin half on the store, calls the directory,
/// and hands the answer back to the store. Callers that dispatch requests
/// asynchronously use [`PipelineStore`] directly instead.
///
/// # Example
///
/// ```no_run
/// use negocia::db::DbConnection;
/// use negocia::directory::SqliteDirectory;
/// use negocia::models::Stage;
/// use negocia::store::BoardClient;
///
/// let conn = DbConnection::connect_in_memory().unwrap();
/// let mut client = BoardClient::new(SqliteDirectory::new(conn));
/// client.load_all().unwrap();
/// client.move_card(1, Stage::Qualificado, None);
/// ```
pub struct BoardClient<S: DirectoryService> {
    store: PipelineStore,
    service: S,
}

impl<S: DirectoryService> BoardClient<S> {
    pub fn new(service: S) -> Self {
        Self::with_store(PipelineStore::new(), service)
    }

    pub fn with_store(store: PipelineStore, service: S) -> Self {
        Self { store, service }
    }

    pub fn store(&self) -> &PipelineStore {
        &self.store
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn state(&self) -> &PipelineState {
        self.store.state()
    }

    pub fn subscribe(&mut self) -> Receiver<BoardEvent> {
        self.store.subscribe()
    }

    /// Fetch the full board and replace the local state
    pub fn load_all(&mut self) -> Result<&PipelineState, StoreError> {
        let ticket = self.store.begin_load();
        let result = self.service.fetch_board();
        self.store.complete_load(ticket, result)?;
        Ok(self.store.state())
    }

    /// Move a card and wait for the directory's answer
    pub fn move_card(&mut self, id: i64, target: Stage, order_hint: Option<i64>) -> MoveOutcome {
        match self.store.move_card(id, target, order_hint) {
            Some(ticket) => {
                let result = self.service.move_record(ticket.request());
                self.store.complete_move(&ticket, result)
            }
            None => MoveOutcome::Skipped,
        }
    }

    /// Finish a drag by dropping onto `target`, then confirm the move
    pub fn drop_card(
        &mut self,
        session: &mut DragSession,
        target: Stage,
        order_hint: Option<i64>,
    ) -> Result<MoveOutcome, DragError> {
        let outcome = match drop_card(session, &mut self.store, target, order_hint)? {
            Some(ticket) => {
                let result = self.service.move_record(ticket.request());
                self.store.complete_move(&ticket, result)
            }
            None => MoveOutcome::Skipped,
        };
        Ok(outcome)
    }

    /// Create a negotiation through the directory and add it to the board
    pub fn create(&mut self, fields: &NewNegotiation) -> Result<NegotiationRecord, StoreError> {
        let record = self.service.create_record(fields)?;
        self.store.insert(record.clone())?;
        Ok(record)
    }

    /// Tear down the store and hand back the directory
    pub fn dispose(self) -> S {
        self.store.dispose();
        self.service
    }
}
