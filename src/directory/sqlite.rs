use rusqlite::{Connection, OptionalExtension};
use crate::directory::{DirectoryError, DirectoryService, MoveAck, MoveRequest};
use crate::models::{Board, LeadRef, NegotiationRecord, NewNegotiation, PropertyRef, Stage, StageTransition};
use crate::utils::now_ts;

impl From<rusqlite::Error> for DirectoryError {
    fn from(err: rusqlite::Error) -> Self {
        DirectoryError::Server(err.to_string())
    }
}

const RECORD_COLUMNS: &str =
    "n.id, n.stage, n.order_hint, n.updated_ts,
     l.id, l.name, l.phone,
     p.id, p.title, p.price_cents";

/// Row shape shared by board and single-record queries
struct RecordRow {
    id: i64,
    stage: String,
    order_hint: Option<i64>,
    updated_ts: i64,
    lead: Option<LeadRef>,
    property: Option<PropertyRef>,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let lead_id: Option<i64> = row.get(4)?;
        let property_id: Option<i64> = row.get(7)?;
        Ok(RecordRow {
            id: row.get(0)?,
            stage: row.get(1)?,
            order_hint: row.get(2)?,
            updated_ts: row.get(3)?,
            lead: match lead_id {
                Some(id) => Some(LeadRef { id, name: row.get(5)?, phone: row.get(6)? }),
                None => None,
            },
            property: match property_id {
                Some(id) => Some(PropertyRef { id, title: row.get(8)?, price_cents: row.get(9)? }),
                None => None,
            },
        })
    }

    fn into_record(self) -> Result<NegotiationRecord, DirectoryError> {
        let stage = parse_stage(&self.stage, self.id)?;
        Ok(NegotiationRecord {
            id: self.id,
            stage,
            order_hint: self.order_hint,
            lead: self.lead,
            property: self.property,
            updated_ts: self.updated_ts,
        })
    }
}

fn parse_stage(code: &str, id: i64) -> Result<Stage, DirectoryError> {
    Stage::from_str(code)
        .ok_or_else(|| DirectoryError::Server(format!("unknown stage '{}' on negotiation {}", code, id)))
}

/// Directory backed by a local SQLite database
///
/// Every mutation bumps `updated_ts` and appends to `stage_history` inside
/// the same transaction.
///
/// # Business rules
///
/// - A negotiation can only be won (`GANHO`) when it has a linked property.
/// - New negotiations need a non-empty lead name.
pub struct SqliteDirectory {
    conn: Connection,
}

impl SqliteDirectory {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Direct access to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Get a single negotiation by id
    pub fn get(&self, id: i64) -> Result<Option<NegotiationRecord>, DirectoryError> {
        let sql = format!(
            "SELECT {} FROM negotiations n
             LEFT JOIN leads l ON l.id = n.lead_id
             LEFT JOIN properties p ON p.id = n.property_id
             WHERE n.id = ?1",
            RECORD_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, [id], RecordRow::from_row)
            .optional()?;
        row.map(RecordRow::into_record).transpose()
    }

    /// Stage transitions of one negotiation, oldest first
    pub fn history(&self, id: i64) -> Result<Vec<StageTransition>, DirectoryError> {
        let mut stmt = self.conn.prepare(
            "SELECT negotiation_id, from_stage, to_stage, changed_ts
             FROM stage_history WHERE negotiation_id = ?1
             ORDER BY changed_ts, id",
        )?;

        let rows = stmt.query_map([id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut transitions = Vec::new();
        for row in rows {
            let (negotiation_id, from, to, changed_ts) = row?;
            transitions.push(StageTransition {
                negotiation_id,
                from_stage: from.map(|code| parse_stage(&code, negotiation_id)).transpose()?,
                to_stage: parse_stage(&to, negotiation_id)?,
                changed_ts,
            });
        }
        Ok(transitions)
    }

    fn record_transition(
        tx: &rusqlite::Transaction,
        id: i64,
        from: Option<Stage>,
        to: Stage,
        ts: i64,
    ) -> Result<(), DirectoryError> {
        tx.execute(
            "INSERT INTO stage_history (negotiation_id, from_stage, to_stage, changed_ts)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, from.map(|s| s.as_str()), to.as_str(), ts],
        )?;
        Ok(())
    }
}

impl DirectoryService for SqliteDirectory {
    fn fetch_board(&self) -> Result<Board, DirectoryError> {
        let sql = format!(
            "SELECT {} FROM negotiations n
             LEFT JOIN leads l ON l.id = n.lead_id
             LEFT JOIN properties p ON p.id = n.property_id
             ORDER BY n.order_hint IS NULL, n.order_hint, n.id",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], RecordRow::from_row)?;

        let mut board = Board::new();
        for row in rows {
            let record = row?.into_record()?;
            board.entry(record.stage).or_default().push(record);
        }

        log::debug!(
            "fetched board: {} negotiations across {} stages",
            board.values().map(Vec::len).sum::<usize>(),
            board.len()
        );
        Ok(board)
    }

    fn move_record(&self, request: &MoveRequest) -> Result<MoveAck, DirectoryError> {
        let tx = self.conn.unchecked_transaction()?;

        let current: Option<(String, Option<i64>)> = tx
            .query_row(
                "SELECT stage, property_id FROM negotiations WHERE id = ?1",
                [request.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (from_code, property_id) = current.ok_or(DirectoryError::NotFound(request.id))?;
        let from = parse_stage(&from_code, request.id)?;

        if request.target == Stage::Ganho && property_id.is_none() {
            return Err(DirectoryError::Validation(format!(
                "negotiation {} has no linked property and cannot be won",
                request.id
            )));
        }

        let now = now_ts();
        tx.execute(
            "UPDATE negotiations SET stage = ?1, order_hint = ?2, updated_ts = ?3 WHERE id = ?4",
            rusqlite::params![request.target.as_str(), request.order_hint, now, request.id],
        )?;

        if from != request.target {
            Self::record_transition(&tx, request.id, Some(from), request.target, now)?;
        }

        tx.commit()?;
        log::info!("negotiation {} moved {} -> {}", request.id, from.as_str(), request.target.as_str());

        Ok(MoveAck {
            updated_ts: Some(now),
            order_hint: request.order_hint,
        })
    }

    fn create_record(&self, fields: &NewNegotiation) -> Result<NegotiationRecord, DirectoryError> {
        let lead_name = fields.lead_name.trim();
        if lead_name.is_empty() {
            return Err(DirectoryError::Validation("lead name cannot be empty".to_string()));
        }
        if fields.property_price_cents.map_or(false, |p| p < 0) {
            return Err(DirectoryError::Validation("property price cannot be negative".to_string()));
        }
        if fields.property_price_cents.is_some() && fields.property_title.is_none() {
            return Err(DirectoryError::Validation("a price needs a property title".to_string()));
        }
        let stage = fields.target_stage();
        if stage == Stage::Ganho && fields.property_title.is_none() {
            return Err(DirectoryError::Validation(
                "a negotiation without a property cannot start as won".to_string(),
            ));
        }

        let now = now_ts();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO leads (name, phone, created_ts) VALUES (?1, ?2, ?3)",
            rusqlite::params![lead_name, fields.lead_phone, now],
        )?;
        let lead = LeadRef {
            id: tx.last_insert_rowid(),
            name: lead_name.to_string(),
            phone: fields.lead_phone.clone(),
        };

        let property = match &fields.property_title {
            Some(title) => {
                tx.execute(
                    "INSERT INTO properties (title, price_cents, created_ts) VALUES (?1, ?2, ?3)",
                    rusqlite::params![title, fields.property_price_cents, now],
                )?;
                Some(PropertyRef {
                    id: tx.last_insert_rowid(),
                    title: title.clone(),
                    price_cents: fields.property_price_cents,
                })
            }
            None => None,
        };

        tx.execute(
            "INSERT INTO negotiations (lead_id, property_id, stage, order_hint, created_ts, updated_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                lead.id,
                property.as_ref().map(|p| p.id),
                stage.as_str(),
                fields.order_hint,
                now,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();

        Self::record_transition(&tx, id, None, stage, now)?;
        tx.commit()?;
        log::info!("negotiation {} created in {}", id, stage.as_str());

        Ok(NegotiationRecord {
            id,
            stage,
            order_hint: fields.order_hint,
            lead: Some(lead),
            property,
            updated_ts: now,
        })
    }
}
