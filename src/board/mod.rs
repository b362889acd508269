//! Board interaction and read path
//!
//! [`DragSession`] turns UI drag events into a drop intent; [`drop_card`]
//! hands that intent to the store. [`StageView`] and [`BoardView`] are pure
//! projections of the store's current state.

pub mod drag;
pub mod view;

pub use drag::{DragError, DragSession, DragState, DropIntent};
pub use view::{BoardView, CardView, StageView, STALE_AFTER_DAYS};

use crate::models::Stage;
use crate::store::{MoveTicket, PipelineStore};

/// End the drag by dropping onto `target` and start the optimistic move.
///
/// Returns the ticket to confirm with the directory, or `None` when the drop
/// needs no move (the record is gone, or it is already in place).
pub fn drop_card(
    session: &mut DragSession,
    store: &mut PipelineStore,
    target: Stage,
    order_hint: Option<i64>,
) -> Result<Option<MoveTicket>, DragError> {
    let intent = session.drop_on(target)?;
    Ok(store.move_card(intent.id, intent.target, order_hint))
}
