use crate::documents::{DocumentKind, GeneratedDocument, Profile};
use crate::error::KitError;
use crate::money::Amount;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{debug, info};

/// A document saved in a user's history
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DocumentRecord {
    /// Stable identity (UUID)
    pub id: String,
    pub user_id: String,
    pub kind: DocumentKind,
    pub title: String,
    pub description: String,
    pub value: Amount,

    /// Form snapshot used to reopen the document for editing.
    /// Older records were saved without one.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_data: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
    /// `DD/MM/YYYY`, as shown in the history list
    pub created_at_formatted: String,
}

impl DocumentRecord {
    pub fn has_snapshot(&self) -> bool {
        self.full_data.is_some()
    }
}

/// Snapshot handed back to a form for editing
#[derive(Debug, Serialize, Clone)]
pub struct EditableDocument {
    pub id: String,
    pub kind: DocumentKind,
    pub full_data: serde_json::Value,
    /// Stored amount re-masked for the currency field
    pub masked_value: String,
}

/// Per-user counters of generated documents
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Stats {
    pub propostas: i64,
    pub contratos: i64,
    pub recibos: i64,
}

impl Stats {
    pub fn get(&self, kind: DocumentKind) -> i64 {
        match kind {
            DocumentKind::Proposta => self.propostas,
            DocumentKind::Contrato => self.contratos,
            DocumentKind::Recibo => self.recibos,
        }
    }

    pub fn total(&self) -> i64 {
        self.propostas + self.contratos + self.recibos
    }
}

/// Event for audit trail
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            cpf_cnpj TEXT NOT NULL,
            phone TEXT NOT NULL,
            address TEXT NOT NULL,
            profession TEXT NOT NULL,
            company TEXT NOT NULL,
            bio TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stats (
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, kind)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            doc_uuid TEXT UNIQUE NOT NULL,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            value_cents INTEGER NOT NULL,
            full_data TEXT,
            created_at TEXT NOT NULL,
            created_at_ms INTEGER NOT NULL,
            created_at_formatted TEXT NOT NULL
        )",
        [],
    )?;

    // Audit trail
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id, created_at_ms)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// PROFILE
// ============================================================================

pub fn save_profile(conn: &Connection, user_id: &str, profile: &Profile) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO profiles (
            user_id, name, email, cpf_cnpj, phone, address, profession, company, bio, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(user_id) DO UPDATE SET
            name = excluded.name,
            email = excluded.email,
            cpf_cnpj = excluded.cpf_cnpj,
            phone = excluded.phone,
            address = excluded.address,
            profession = excluded.profession,
            company = excluded.company,
            bio = excluded.bio,
            updated_at = excluded.updated_at",
        params![
            user_id,
            profile.name,
            profile.email,
            profile.cpf_cnpj,
            profile.phone,
            profile.address,
            profile.profession,
            profile.company,
            profile.bio,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to save profile for user {}", user_id))?;

    let event = Event::new(
        "profile_saved",
        "profile",
        user_id,
        serde_json::to_value(profile)?,
        user_id,
    );
    insert_event(&tx, &event)?;
    tx.commit()?;

    info!(user_id, "profile saved");
    Ok(())
}

pub fn load_profile(conn: &Connection, user_id: &str) -> Result<Option<Profile>> {
    let profile = conn
        .query_row(
            "SELECT name, email, cpf_cnpj, phone, address, profession, company, bio
             FROM profiles
             WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Profile {
                    name: row.get(0)?,
                    email: row.get(1)?,
                    cpf_cnpj: row.get(2)?,
                    phone: row.get(3)?,
                    address: row.get(4)?,
                    profession: row.get(5)?,
                    company: row.get(6)?,
                    bio: row.get(7)?,
                })
            },
        )
        .optional()?;

    Ok(profile)
}

// ============================================================================
// STATS
// ============================================================================

/// Bump the counter for `kind` and return its new value
pub fn increment_stat(conn: &Connection, user_id: &str, kind: DocumentKind) -> Result<i64> {
    conn.execute(
        "INSERT INTO stats (user_id, kind, count) VALUES (?1, ?2, 1)
         ON CONFLICT(user_id, kind) DO UPDATE SET count = count + 1",
        params![user_id, kind.stat_key()],
    )?;

    let count: i64 = conn.query_row(
        "SELECT count FROM stats WHERE user_id = ?1 AND kind = ?2",
        params![user_id, kind.stat_key()],
        |row| row.get(0),
    )?;

    debug!(user_id, kind = kind.stat_key(), count, "stat incremented");
    Ok(count)
}

pub fn get_stats(conn: &Connection, user_id: &str) -> Result<Stats> {
    let mut stmt = conn.prepare("SELECT kind, count FROM stats WHERE user_id = ?1")?;

    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stats = Stats::default();
    for (kind, count) in rows {
        match kind.as_str() {
            "propostas" => stats.propostas = count,
            "contratos" => stats.contratos = count,
            "recibos" => stats.recibos = count,
            _ => {}
        }
    }

    Ok(stats)
}

// ============================================================================
// DOCUMENT HISTORY
// ============================================================================

/// Add a generated document to the user's history, together with its audit event
pub fn save_document(
    conn: &Connection,
    user_id: &str,
    doc: &GeneratedDocument,
    created_at: DateTime<Utc>,
) -> Result<DocumentRecord> {
    let tx = conn.unchecked_transaction()?;
    let record = write_document(&tx, user_id, doc, created_at)?;
    tx.commit()?;

    info!(user_id, id = %record.id, title = %record.title, "document saved to history");
    Ok(record)
}

/// Count a freshly generated document and save it to history as one unit.
/// Returns the new count for its kind and the saved record.
pub fn record_generated(
    conn: &Connection,
    user_id: &str,
    doc: &GeneratedDocument,
    created_at: DateTime<Utc>,
) -> Result<(i64, DocumentRecord)> {
    let tx = conn.unchecked_transaction()?;
    let count = increment_stat(&tx, user_id, doc.kind)?;
    let record = write_document(&tx, user_id, doc, created_at)?;
    tx.commit()?;

    info!(user_id, id = %record.id, count, "generated document recorded");
    Ok((count, record))
}

fn write_document(
    conn: &Connection,
    user_id: &str,
    doc: &GeneratedDocument,
    created_at: DateTime<Utc>,
) -> Result<DocumentRecord> {
    let record = DocumentRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: doc.kind,
        title: doc.title.clone(),
        description: doc.description.clone(),
        value: doc.value,
        full_data: Some(doc.full_data.clone()),
        created_at,
        created_at_formatted: created_at.format("%d/%m/%Y").to_string(),
    };

    insert_record(conn, &record)?;

    let event = Event::new(
        "document_saved",
        "document",
        &record.id,
        serde_json::json!({
            "kind": record.kind,
            "title": record.title,
            "value": record.value,
        }),
        user_id,
    );
    insert_event(conn, &event)?;

    Ok(record)
}

/// Insert a record as-is (also used for records without a snapshot)
pub fn insert_record(conn: &Connection, record: &DocumentRecord) -> Result<()> {
    let value_cents = i64::try_from(record.value.cents())
        .map_err(|_| KitError::AmountNotStorable(record.value.cents()))?;
    let full_data_json = record
        .full_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO documents (
            doc_uuid, user_id, kind, title, description, value_cents,
            full_data, created_at, created_at_ms, created_at_formatted
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.id,
            record.user_id,
            record.kind.code(),
            record.title,
            record.description,
            value_cents,
            full_data_json,
            record.created_at.to_rfc3339(),
            record.created_at.timestamp_millis(),
            record.created_at_formatted,
        ],
    )
    .with_context(|| format!("Failed to insert document {}", record.id))?;

    Ok(())
}

const RECORD_COLUMNS: &str = "doc_uuid, user_id, kind, title, description, value_cents,
     full_data, created_at, created_at_formatted";

/// A user's documents, newest first, optionally restricted to one kind
pub fn list_documents(
    conn: &Connection,
    user_id: &str,
    filter: Option<DocumentKind>,
) -> Result<Vec<DocumentRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}
         FROM documents
         WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2)
         ORDER BY created_at_ms DESC, id DESC",
        RECORD_COLUMNS
    ))?;

    let records = stmt
        .query_map(params![user_id, filter.map(|k| k.code().to_string())], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    debug!(user_id, count = records.len(), "documents listed");
    Ok(records)
}

pub fn get_document(conn: &Connection, user_id: &str, id: &str) -> Result<DocumentRecord> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {} FROM documents WHERE user_id = ?1 AND doc_uuid = ?2",
                RECORD_COLUMNS
            ),
            params![user_id, id],
            record_from_row,
        )
        .optional()?;

    record.ok_or_else(|| KitError::DocumentNotFound(id.to_string()).into())
}

pub fn delete_document(conn: &Connection, user_id: &str, id: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    let removed = tx.execute(
        "DELETE FROM documents WHERE user_id = ?1 AND doc_uuid = ?2",
        params![user_id, id],
    )?;

    if removed == 0 {
        return Err(KitError::DocumentNotFound(id.to_string()).into());
    }

    let event = Event::new(
        "document_deleted",
        "document",
        id,
        serde_json::json!({}),
        user_id,
    );
    insert_event(&tx, &event)?;
    tx.commit()?;

    info!(user_id, id, "document deleted");
    Ok(())
}

/// Fetch a record's form snapshot so the form can be filled in again
pub fn reload_snapshot(conn: &Connection, user_id: &str, id: &str) -> Result<EditableDocument> {
    let record = get_document(conn, user_id, id)?;

    let full_data = record
        .full_data
        .ok_or_else(|| KitError::MissingSnapshot(record.id.clone()))?;

    Ok(EditableDocument {
        id: record.id,
        kind: record.kind,
        full_data,
        masked_value: record.value.to_masked(),
    })
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    tipo: &'a str,
    titulo: &'a str,
    descricao: &'a str,
    valor: String,
    criado_em: &'a str,
}

/// Write a user's history as CSV, newest first. Returns the number of rows.
pub fn export_documents_csv<W: Write>(conn: &Connection, user_id: &str, writer: W) -> Result<usize> {
    let records = list_documents(conn, user_id, None)?;
    let mut wtr = csv::Writer::from_writer(writer);

    for record in &records {
        wtr.serialize(CsvRow {
            id: &record.id,
            tipo: record.kind.code(),
            titulo: &record.title,
            descricao: &record.description,
            valor: record.value.to_string(),
            criado_em: &record.created_at_formatted,
        })
        .context("Failed to write CSV row")?;
    }

    wtr.flush()?;
    Ok(records.len())
}

fn record_from_row(row: &Row) -> rusqlite::Result<DocumentRecord> {
    let kind_str: String = row.get(2)?;
    let value_cents: i64 = row.get(5)?;
    let full_data_json: Option<String> = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    let kind = kind_str
        .parse::<DocumentKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

    let full_data = full_data_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(DocumentRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind,
        title: row.get(3)?,
        description: row.get(4)?,
        value: Amount::from_cents(value_cents.max(0) as u64),
        full_data,
        created_at,
        created_at_formatted: row.get(8)?,
    })
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{generate, Contract, Proposal, Receipt};
    use chrono::{Duration, TimeZone};

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 9, 30, 0).unwrap()
    }

    fn receipt(cents: u64, payer: &str) -> GeneratedDocument {
        let form = Receipt {
            value: Amount::from_cents(cents),
            payer_name: payer.to_string(),
            number: Some(4321),
            ..Receipt::default()
        };
        generate(&form, &Profile::default(), at(1)).unwrap()
    }

    #[test]
    fn test_profile_round_trip_and_update() {
        let conn = test_db();
        assert!(load_profile(&conn, "u1").unwrap().is_none());

        let mut profile = Profile {
            name: "Ana".to_string(),
            cpf_cnpj: "123.456.789-01".to_string(),
            ..Profile::default()
        };
        save_profile(&conn, "u1", &profile).unwrap();

        profile.company = "Ana Design".to_string();
        save_profile(&conn, "u1", &profile).unwrap();

        assert_eq!(load_profile(&conn, "u1").unwrap(), Some(profile));
        assert_eq!(get_events_for_entity(&conn, "profile", "u1").unwrap().len(), 2);
    }

    #[test]
    fn test_stats_are_per_user_and_per_kind() {
        let conn = test_db();

        assert_eq!(increment_stat(&conn, "u1", DocumentKind::Recibo).unwrap(), 1);
        assert_eq!(increment_stat(&conn, "u1", DocumentKind::Recibo).unwrap(), 2);
        increment_stat(&conn, "u1", DocumentKind::Proposta).unwrap();
        increment_stat(&conn, "u2", DocumentKind::Contrato).unwrap();

        let stats = get_stats(&conn, "u1").unwrap();
        assert_eq!(stats.get(DocumentKind::Recibo), 2);
        assert_eq!(stats.propostas, 1);
        assert_eq!(stats.contratos, 0);
        assert_eq!(stats.total(), 3);
        assert_eq!(get_stats(&conn, "nobody").unwrap(), Stats::default());
    }

    #[test]
    fn test_history_newest_first_with_filter() {
        let conn = test_db();

        let proposal = generate(&Proposal::default(), &Profile::default(), at(1)).unwrap();
        let contract = generate(&Contract::default(), &Profile::default(), at(2)).unwrap();

        save_document(&conn, "u1", &proposal, at(1)).unwrap();
        save_document(&conn, "u1", &receipt(5000, "Beto"), at(3)).unwrap();
        save_document(&conn, "u1", &contract, at(2)).unwrap();
        save_document(&conn, "u2", &receipt(100, "Outro"), at(4)).unwrap();

        let all = list_documents(&conn, "u1", None).unwrap();
        let kinds: Vec<DocumentKind> = all.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DocumentKind::Recibo, DocumentKind::Contrato, DocumentKind::Proposta]
        );
        assert_eq!(all[0].created_at_formatted, "03/05/2024");
        assert_eq!(all[0].value, Amount::from_cents(5000));

        let receipts = list_documents(&conn, "u1", Some(DocumentKind::Recibo)).unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].description, "Pagador: Beto");

        println!("✅ History ordering test PASSED");
    }

    #[test]
    fn test_delete_document() {
        let conn = test_db();
        let saved = save_document(&conn, "u1", &receipt(100, "A"), at(1)).unwrap();

        // Another user cannot delete it
        assert!(delete_document(&conn, "u2", &saved.id).is_err());

        delete_document(&conn, "u1", &saved.id).unwrap();
        assert!(list_documents(&conn, "u1", None).unwrap().is_empty());

        let err = delete_document(&conn, "u1", &saved.id).unwrap_err();
        assert_eq!(
            err.downcast_ref::<KitError>(),
            Some(&KitError::DocumentNotFound(saved.id.clone()))
        );

        let events = get_events_for_entity(&conn, "document", &saved.id).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.event_type == "document_deleted"));
    }

    #[test]
    fn test_reload_snapshot_remasks_value() {
        let conn = test_db();
        let saved = save_document(&conn, "u1", &receipt(123450, "Carla"), at(1)).unwrap();

        let editable = reload_snapshot(&conn, "u1", &saved.id).unwrap();

        assert_eq!(editable.kind, DocumentKind::Recibo);
        assert_eq!(editable.masked_value, "R$ 1.234,50");
        assert_eq!(editable.full_data["payer_name"], "Carla");
    }

    #[test]
    fn test_reload_snapshot_of_legacy_record() {
        let conn = test_db();
        let legacy = DocumentRecord {
            id: "legacy-1".to_string(),
            user_id: "u1".to_string(),
            kind: DocumentKind::Proposta,
            title: "Antigo".to_string(),
            description: String::new(),
            value: Amount::ZERO,
            full_data: None,
            created_at: at(1) - Duration::days(365),
            created_at_formatted: "01/05/2023".to_string(),
        };
        insert_record(&conn, &legacy).unwrap();

        let err = reload_snapshot(&conn, "u1", "legacy-1").unwrap_err();
        assert_eq!(
            err.downcast_ref::<KitError>(),
            Some(&KitError::MissingSnapshot("legacy-1".to_string()))
        );
    }

    #[test]
    fn test_value_beyond_storage_range_is_rejected() {
        let conn = test_db();
        let form = Proposal {
            value: Amount::from_f64(1e17),
            ..Proposal::default()
        };
        let doc = generate(&form, &Profile::default(), at(1)).unwrap();

        let err = save_document(&conn, "u1", &doc, at(1)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<KitError>(),
            Some(&KitError::AmountNotStorable(doc.value.cents()))
        );
        assert!(list_documents(&conn, "u1", None).unwrap().is_empty());

        // Largest storable value survives unchanged
        let max = Amount::from_cents(i64::MAX as u64);
        let doc = generate(&Proposal { value: max, ..Proposal::default() }, &Profile::default(), at(1)).unwrap();
        let saved = save_document(&conn, "u1", &doc, at(1)).unwrap();
        assert_eq!(get_document(&conn, "u1", &saved.id).unwrap().value, max);
    }

    #[test]
    fn test_record_generated_counts_and_saves_together() {
        let conn = test_db();

        let (count, record) = record_generated(&conn, "u1", &receipt(100, "A"), at(1)).unwrap();
        assert_eq!(count, 1);
        assert_eq!(get_document(&conn, "u1", &record.id).unwrap().kind, DocumentKind::Recibo);

        // A failed save leaves the counter untouched
        conn.execute("DROP TABLE documents", []).unwrap();
        assert!(record_generated(&conn, "u1", &receipt(200, "B"), at(2)).is_err());
        assert_eq!(get_stats(&conn, "u1").unwrap().recibos, 1);
    }

    #[test]
    fn test_history_writes_roll_back_without_audit_event() {
        let conn = test_db();
        let saved = save_document(&conn, "u1", &receipt(100, "A"), at(1)).unwrap();

        conn.execute("DROP TABLE events", []).unwrap();

        assert!(save_document(&conn, "u1", &receipt(200, "B"), at(2)).is_err());
        assert!(delete_document(&conn, "u1", &saved.id).is_err());
        assert!(save_profile(&conn, "u1", &Profile::default()).is_err());

        let remaining = list_documents(&conn, "u1", None).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, saved.id);
        assert!(load_profile(&conn, "u1").unwrap().is_none());
    }

    #[test]
    fn test_export_csv() {
        let conn = test_db();
        save_document(&conn, "u1", &receipt(123450, "Carla"), at(1)).unwrap();

        let mut buffer = Vec::new();
        let rows = export_documents_csv(&conn, "u1", &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(rows, 1);
        assert!(text.starts_with("id,tipo,titulo,descricao,valor,criado_em\n"));
        assert!(text.contains("recibo,Recibo #4321,Pagador: Carla,\"R$ 1.234,50\",01/05/2024"));
    }
}
