use serde::Serialize;
use crate::models::{NegotiationRecord, Stage};
use crate::store::PipelineState;

/// Cards idle for more than this many days are flagged as stale
pub const STALE_AFTER_DAYS: i64 = 7;

/// One card as rendered in a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub id: i64,
    pub lead_name: Option<String>,
    pub lead_phone: Option<String>,
    pub property_title: Option<String>,
    pub price_cents: Option<i64>,
    pub order_hint: Option<i64>,
    pub idle_days: i64,
    pub stale: bool,
}

impl CardView {
    fn from_record(record: &NegotiationRecord, now_ts: i64) -> Self {
        let idle_days = record.idle_days(now_ts);
        Self {
            id: record.id,
            lead_name: record.lead.as_ref().map(|l| l.name.clone()),
            lead_phone: record.lead.as_ref().and_then(|l| l.phone.clone()),
            property_title: record.property.as_ref().map(|p| p.title.clone()),
            price_cents: record.property.as_ref().and_then(|p| p.price_cents),
            order_hint: record.order_hint,
            idle_days,
            stale: idle_days > STALE_AFTER_DAYS,
        }
    }
}

/// Read-only projection of one stage column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageView {
    pub stage: Stage,
    pub label: &'static str,
    pub count: usize,
    pub total_cents: i64,
    pub drop_armed: bool,
    pub cards: Vec<CardView>,
}

impl StageView {
    /// Project one stage. `armed` is the stage highlighted by an active drag.
    pub fn project(state: &PipelineState, stage: Stage, now_ts: i64, armed: Option<Stage>) -> Self {
        let records = state.records(stage);
        Self {
            stage,
            label: stage.label(),
            count: records.len(),
            total_cents: records.iter().map(NegotiationRecord::value_cents).sum(),
            drop_armed: armed == Some(stage),
            cards: records.iter().map(|r| CardView::from_record(r, now_ts)).collect(),
        }
    }

    pub fn stale_count(&self) -> usize {
        self.cards.iter().filter(|c| c.stale).count()
    }
}

/// Every stage column in pipeline order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub stages: Vec<StageView>,
    pub total_count: usize,
    pub total_cents: i64,
}

impl BoardView {
    pub fn project(state: &PipelineState, now_ts: i64, armed: Option<Stage>) -> Self {
        let stages: Vec<StageView> = Stage::ALL
            .iter()
            .map(|stage| StageView::project(state, *stage, now_ts, armed))
            .collect();
        Self {
            total_count: stages.iter().map(|s| s.count).sum(),
            total_cents: stages.iter().map(|s| s.total_cents).sum(),
            stages,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageView> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Board, LeadRef, PropertyRef, SECS_PER_DAY};

    const NOW: i64 = 1_800_000_000;

    fn record(id: i64, stage: Stage, price: Option<i64>, idle_days: i64) -> NegotiationRecord {
        NegotiationRecord {
            id,
            stage,
            order_hint: None,
            lead: Some(LeadRef { id, name: format!("Lead {}", id), phone: None }),
            property: price.map(|p| PropertyRef { id, title: format!("Imovel {}", id), price_cents: Some(p) }),
            updated_ts: NOW - idle_days * SECS_PER_DAY,
        }
    }

    fn state(records: Vec<NegotiationRecord>) -> PipelineState {
        let mut board = Board::new();
        for r in records {
            board.entry(r.stage).or_insert_with(Vec::new).push(r);
        }
        PipelineState::from_board(board).unwrap()
    }

    #[test]
    fn test_stage_metrics() {
        let state = state(vec![
            record(1, Stage::Qualificado, Some(30_000_000), 0),
            record(2, Stage::Qualificado, None, 1),
            record(3, Stage::Qualificado, Some(12_500_000), 2),
            record(4, Stage::Ganho, Some(99_000_000), 0),
        ]);

        let view = StageView::project(&state, Stage::Qualificado, NOW, None);
        assert_eq!(view.count, 3);
        assert_eq!(view.total_cents, 42_500_000);
        assert_eq!(view.label, "Qualificado");
        assert!(!view.drop_armed);
        assert_eq!(view.cards.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_stage() {
        let view = StageView::project(&PipelineState::default(), Stage::Fechamento, NOW, None);
        assert_eq!(view.count, 0);
        assert_eq!(view.total_cents, 0);
        assert!(view.cards.is_empty());
    }

    #[test]
    fn test_stale_threshold() {
        let state = state(vec![
            record(1, Stage::NovoLead, None, 7),
            record(2, Stage::NovoLead, None, 8),
        ]);

        let view = StageView::project(&state, Stage::NovoLead, NOW, None);
        assert_eq!(view.cards[0].idle_days, 7);
        assert!(!view.cards[0].stale);
        assert_eq!(view.cards[1].idle_days, 8);
        assert!(view.cards[1].stale);
        assert_eq!(view.stale_count(), 1);
    }

    #[test]
    fn test_drop_armed_marks_only_hovered_stage() {
        let state = PipelineState::default();
        let board = BoardView::project(&state, NOW, Some(Stage::VisitaAgendada));
        let armed: Vec<Stage> = board.stages.iter().filter(|s| s.drop_armed).map(|s| s.stage).collect();
        assert_eq!(armed, vec![Stage::VisitaAgendada]);
    }

    #[test]
    fn test_board_view_totals_and_order() {
        let state = state(vec![
            record(1, Stage::NovoLead, Some(100), 0),
            record(2, Stage::Perdido, Some(250), 0),
        ]);

        let board = BoardView::project(&state, NOW, None);
        assert_eq!(board.stages.len(), Stage::ALL.len());
        assert_eq!(board.stages[0].stage, Stage::NovoLead);
        assert_eq!(board.stages[7].stage, Stage::Perdido);
        assert_eq!(board.total_count, 2);
        assert_eq!(board.total_cents, 350);
        assert_eq!(board.stage(Stage::Perdido).unwrap().count, 1);
    }
}
