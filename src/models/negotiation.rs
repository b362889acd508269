use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::models::Stage;

/// Seconds in one day, used for idle computations
pub const SECS_PER_DAY: i64 = 86_400;

/// Lead linked to a negotiation (display only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRef {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
}

/// Property linked to a negotiation (display only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRef {
    pub id: i64,
    pub title: String,
    pub price_cents: Option<i64>,
}

/// Negotiation record
///
/// The unit of work tracked by the pipeline. `id` is assigned by the
/// directory and never changes; `updated_ts` is bumped by the directory on
/// every persisted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationRecord {
    pub id: i64,
    pub stage: Stage,
    pub order_hint: Option<i64>,
    pub lead: Option<LeadRef>,
    pub property: Option<PropertyRef>,
    pub updated_ts: i64,
}

impl NegotiationRecord {
    /// Bare record with no linked lead or property
    pub fn new(id: i64, stage: Stage, updated_ts: i64) -> Self {
        Self {
            id,
            stage,
            order_hint: None,
            lead: None,
            property: None,
            updated_ts,
        }
    }

    /// Linked property value in cents, zero when absent
    pub fn value_cents(&self) -> i64 {
        self.property
            .as_ref()
            .and_then(|p| p.price_cents)
            .unwrap_or(0)
    }

    /// Whole days since the last persisted change. Clock skew clamps to zero.
    pub fn idle_days(&self, now_ts: i64) -> i64 {
        (now_ts - self.updated_ts).max(0).div_euclid(SECS_PER_DAY)
    }
}

/// Full board as returned by a directory fetch
pub type Board = BTreeMap<Stage, Vec<NegotiationRecord>>;

/// Fields for creating a negotiation through the directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNegotiation {
    pub lead_name: String,
    pub lead_phone: Option<String>,
    pub property_title: Option<String>,
    pub property_price_cents: Option<i64>,
    pub stage: Option<Stage>,
    pub order_hint: Option<i64>,
}

impl NewNegotiation {
    pub fn new(lead_name: impl Into<String>) -> Self {
        Self {
            lead_name: lead_name.into(),
            ..Default::default()
        }
    }

    /// Stage the record lands in; new leads by default
    pub fn target_stage(&self) -> Stage {
        self.stage.unwrap_or(Stage::NovoLead)
    }
}

/// One persisted stage transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransition {
    pub negotiation_id: i64,
    pub from_stage: Option<Stage>,
    pub to_stage: Stage,
    pub changed_ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_cents_defaults_to_zero() {
        let mut record = NegotiationRecord::new(1, Stage::NovoLead, 0);
        assert_eq!(record.value_cents(), 0);

        record.property = Some(PropertyRef { id: 3, title: "Apto Centro".to_string(), price_cents: None });
        assert_eq!(record.value_cents(), 0);

        record.property = Some(PropertyRef { id: 3, title: "Apto Centro".to_string(), price_cents: Some(45_000_000) });
        assert_eq!(record.value_cents(), 45_000_000);
    }

    #[test]
    fn test_idle_days_floors() {
        let record = NegotiationRecord::new(1, Stage::NovoLead, 1_000_000);
        assert_eq!(record.idle_days(1_000_000), 0);
        assert_eq!(record.idle_days(1_000_000 + SECS_PER_DAY - 1), 0);
        assert_eq!(record.idle_days(1_000_000 + SECS_PER_DAY), 1);
        assert_eq!(record.idle_days(1_000_000 + 8 * SECS_PER_DAY + 5), 8);
    }

    #[test]
    fn test_idle_days_clamps_future_timestamps() {
        let record = NegotiationRecord::new(1, Stage::NovoLead, 2_000_000);
        assert_eq!(record.idle_days(1_000_000), 0);
    }

    #[test]
    fn test_new_negotiation_default_stage() {
        let fields = NewNegotiation::new("Maria");
        assert_eq!(fields.target_stage(), Stage::NovoLead);

        let fields = NewNegotiation { stage: Some(Stage::Qualificado), ..NewNegotiation::new("Maria") };
        assert_eq!(fields.target_stage(), Stage::Qualificado);
    }
}
