use crate::models::Stage;

/// Drag interaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        id: i64,
        /// Stage currently hovered; purely visual
        armed: Option<Stage>,
    },
}

/// Drag misuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DragError {
    #[error("already dragging negotiation {active}; cannot start dragging {requested}")]
    AlreadyDragging { active: i64, requested: i64 },
    #[error("no drag in progress")]
    NotDragging,
}

/// A drop resolved to a record and a target stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropIntent {
    pub id: i64,
    pub target: Stage,
}

/// Drag session for one board
///
/// Independent of the input device: pointer, touch and keyboard reordering
/// all drive the same `begin` / `hover` / `drop_on` / `cancel` calls.
/// Only one record can be dragged at a time.
#[derive(Debug, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn dragged_id(&self) -> Option<i64> {
        match self.state {
            DragState::Dragging { id, .. } => Some(id),
            DragState::Idle => None,
        }
    }

    /// Stage showing the drop highlight, if any
    pub fn armed_stage(&self) -> Option<Stage> {
        match self.state {
            DragState::Dragging { armed, .. } => armed,
            DragState::Idle => None,
        }
    }

    /// Start dragging a card. A second concurrent drag is rejected.
    pub fn begin(&mut self, id: i64) -> Result<(), DragError> {
        if let DragState::Dragging { id: active, .. } = self.state {
            return Err(DragError::AlreadyDragging { active, requested: id });
        }
        log::trace!("drag start: negotiation {}", id);
        self.state = DragState::Dragging { id, armed: None };
        Ok(())
    }

    /// Pointer entered a stage column
    pub fn hover(&mut self, stage: Stage) -> Result<(), DragError> {
        match &mut self.state {
            DragState::Dragging { armed, .. } => {
                *armed = Some(stage);
                Ok(())
            }
            DragState::Idle => Err(DragError::NotDragging),
        }
    }

    /// Pointer left a stage column. Late leave events after a drop are ignored.
    pub fn leave(&mut self, stage: Stage) {
        if let DragState::Dragging { armed, .. } = &mut self.state {
            if *armed == Some(stage) {
                *armed = None;
            }
        }
    }

    /// Drop onto a stage, ending the session
    pub fn drop_on(&mut self, target: Stage) -> Result<DropIntent, DragError> {
        match self.state {
            DragState::Dragging { id, .. } => {
                self.state = DragState::Idle;
                log::trace!("drop: negotiation {} onto {}", id, target.as_str());
                Ok(DropIntent { id, target })
            }
            DragState::Idle => Err(DragError::NotDragging),
        }
    }

    /// Abort the drag without touching the board; returns the dragged id
    pub fn cancel(&mut self) -> Option<i64> {
        let id = self.dragged_id();
        self.state = DragState::Idle;
        id
    }
}
