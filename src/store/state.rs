use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use crate::models::{Board, NegotiationRecord, Stage};
use crate::store::StoreError;

/// Board contents keyed by stage
///
/// Every stage is always present as a key, possibly with an empty sequence.
/// Two invariants hold for every value reachable through the public API:
///
/// - each record id appears in exactly one stage sequence;
/// - each record's `stage` equals the key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineState {
    stages: BTreeMap<Stage, Vec<NegotiationRecord>>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            stages: Stage::ALL.iter().map(|stage| (*stage, Vec::new())).collect(),
        }
    }
}

impl PipelineState {
    /// Build a state from a fetched board, rejecting boards that break the invariants
    pub fn from_board(board: Board) -> Result<Self, StoreError> {
        let mut state = Self::default();
        let mut seen = HashSet::new();

        for (stage, records) in board {
            for record in records {
                if record.stage != stage {
                    return Err(StoreError::StageMismatch {
                        id: record.id,
                        tagged: record.stage,
                        stored_under: stage,
                    });
                }
                if !seen.insert(record.id) {
                    return Err(StoreError::DuplicateRecord(record.id));
                }
                state.bucket_mut(stage).push(record);
            }
        }

        Ok(state)
    }

    /// Records of one stage, in board order
    pub fn records(&self, stage: Stage) -> &[NegotiationRecord] {
        self.stages.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stages in pipeline order with their records
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &[NegotiationRecord])> {
        self.stages.iter().map(|(stage, records)| (*stage, records.as_slice()))
    }

    /// Total number of records on the board
    pub fn len(&self) -> usize {
        self.stages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.values().all(Vec::is_empty)
    }

    /// Stage and index of a record
    pub fn locate(&self, id: i64) -> Option<(Stage, usize)> {
        self.stages.iter().find_map(|(stage, records)| {
            records.iter().position(|r| r.id == id).map(|idx| (*stage, idx))
        })
    }

    pub fn find(&self, id: i64) -> Option<&NegotiationRecord> {
        self.locate(id).map(|(stage, idx)| &self.stages[&stage][idx])
    }

    pub fn contains(&self, id: i64) -> bool {
        self.locate(id).is_some()
    }

    /// Copy of the board in wire shape
    pub fn to_board(&self) -> Board {
        self.stages.clone()
    }

    /// Verify both board invariants
    pub fn check_invariants(&self) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for (stage, records) in &self.stages {
            for record in records {
                if record.stage != *stage {
                    return Err(StoreError::StageMismatch {
                        id: record.id,
                        tagged: record.stage,
                        stored_under: *stage,
                    });
                }
                if !seen.insert(record.id) {
                    return Err(StoreError::DuplicateRecord(record.id));
                }
            }
        }
        Ok(())
    }

    /// Move a record to `target`, retagging it and replacing its order hint.
    /// Returns false when the record is not on the board.
    pub(crate) fn relocate(&mut self, id: i64, target: Stage, order_hint: Option<i64>) -> bool {
        let Some((origin, idx)) = self.locate(id) else {
            return false;
        };
        let mut record = self.bucket_mut(origin).remove(idx);
        record.stage = target;
        record.order_hint = order_hint;
        place(self.bucket_mut(target), record);
        true
    }

    /// Append a record to its declared stage
    pub(crate) fn append(&mut self, record: NegotiationRecord) -> Result<(), StoreError> {
        if self.contains(record.id) {
            return Err(StoreError::DuplicateRecord(record.id));
        }
        self.bucket_mut(record.stage).push(record);
        Ok(())
    }

    /// Apply `f` to a record in place. Stage changes are not allowed here.
    pub(crate) fn patch(&mut self, id: i64, f: impl FnOnce(&mut NegotiationRecord)) -> bool {
        match self.locate(id) {
            Some((stage, idx)) => {
                let record = &mut self.bucket_mut(stage)[idx];
                f(record);
                record.stage = stage;
                true
            }
            None => false,
        }
    }

    fn bucket_mut(&mut self, stage: Stage) -> &mut Vec<NegotiationRecord> {
        self.stages.entry(stage).or_default()
    }
}

/// Insert a moved record into its new stage.
/// Without a hint the record goes last. With a hint it goes before the first
/// record whose hint is greater or missing, so equal hints keep arrival order.
fn place(records: &mut Vec<NegotiationRecord>, record: NegotiationRecord) {
    match record.order_hint {
        None => records.push(record),
        Some(hint) => {
            let pos = records
                .iter()
                .position(|r| r.order_hint.map_or(true, |other| other > hint))
                .unwrap_or(records.len());
            records.insert(pos, record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, stage: Stage) -> NegotiationRecord {
        NegotiationRecord::new(id, stage, 0)
    }

    fn hinted(id: i64, stage: Stage, hint: i64) -> NegotiationRecord {
        NegotiationRecord { order_hint: Some(hint), ..rec(id, stage) }
    }

    fn ids(state: &PipelineState, stage: Stage) -> Vec<i64> {
        state.records(stage).iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_default_has_every_stage() {
        let state = PipelineState::default();
        assert_eq!(state.iter().count(), Stage::ALL.len());
        assert!(state.is_empty());
        assert_eq!(state.len(), 0);
    }

    #[test]
    fn test_from_board_accepts_consistent_board() {
        let mut board = Board::new();
        board.insert(Stage::NovoLead, vec![rec(1, Stage::NovoLead), rec(2, Stage::NovoLead)]);
        board.insert(Stage::Ganho, vec![rec(3, Stage::Ganho)]);

        let state = PipelineState::from_board(board).unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(ids(&state, Stage::NovoLead), vec![1, 2]);
        assert_eq!(state.locate(3), Some((Stage::Ganho, 0)));
        assert!(state.records(Stage::Qualificado).is_empty());
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_from_board_rejects_stage_mismatch() {
        let mut board = Board::new();
        board.insert(Stage::NovoLead, vec![rec(1, Stage::Qualificado)]);
        assert_eq!(
            PipelineState::from_board(board),
            Err(StoreError::StageMismatch { id: 1, tagged: Stage::Qualificado, stored_under: Stage::NovoLead })
        );
    }

    #[test]
    fn test_from_board_rejects_duplicates() {
        let mut board = Board::new();
        board.insert(Stage::NovoLead, vec![rec(1, Stage::NovoLead)]);
        board.insert(Stage::Qualificado, vec![rec(1, Stage::Qualificado)]);
        assert_eq!(PipelineState::from_board(board), Err(StoreError::DuplicateRecord(1)));
    }

    #[test]
    fn test_relocate_retags_and_appends() {
        let mut state = PipelineState::default();
        state.append(rec(1, Stage::NovoLead)).unwrap();
        state.append(rec(2, Stage::Qualificado)).unwrap();

        assert!(state.relocate(1, Stage::Qualificado, None));
        assert!(state.records(Stage::NovoLead).is_empty());
        assert_eq!(ids(&state, Stage::Qualificado), vec![2, 1]);
        assert_eq!(state.find(1).unwrap().stage, Stage::Qualificado);
        state.check_invariants().unwrap();

        assert!(!state.relocate(99, Stage::Ganho, None));
    }

    #[test]
    fn test_relocate_places_by_hint() {
        let mut state = PipelineState::default();
        state.append(hinted(1, Stage::Qualificado, 1)).unwrap();
        state.append(hinted(2, Stage::Qualificado, 5)).unwrap();
        state.append(rec(3, Stage::Qualificado)).unwrap();
        state.append(rec(4, Stage::NovoLead)).unwrap();
        state.append(rec(5, Stage::NovoLead)).unwrap();

        state.relocate(4, Stage::Qualificado, Some(5));
        assert_eq!(ids(&state, Stage::Qualificado), vec![1, 2, 4, 3]);

        state.relocate(5, Stage::Qualificado, Some(0));
        assert_eq!(ids(&state, Stage::Qualificado), vec![5, 1, 2, 4, 3]);
        assert_eq!(state.find(5).unwrap().order_hint, Some(0));
    }

    #[test]
    fn test_append_rejects_duplicate() {
        let mut state = PipelineState::default();
        state.append(rec(1, Stage::NovoLead)).unwrap();
        assert_eq!(state.append(rec(1, Stage::Ganho)), Err(StoreError::DuplicateRecord(1)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_patch_cannot_change_stage() {
        let mut state = PipelineState::default();
        state.append(rec(1, Stage::NovoLead)).unwrap();

        assert!(state.patch(1, |r| {
            r.updated_ts = 42;
            r.stage = Stage::Perdido;
        }));
        let record = state.find(1).unwrap();
        assert_eq!(record.updated_ts, 42);
        assert_eq!(record.stage, Stage::NovoLead);
        assert!(!state.patch(2, |_| {}));
    }
}
