use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Error, Result};
use crate::persistence::SnapshotStore;
use crate::prices::Snapshot;
use crate::types::alert::{Alert, AlertDraft, Direction};
use crate::types::item::{Item, ItemDraft, ItemKind, Metal};
use crate::types::user::{User, UserChanges};

/// Thread-safe sqlite wrapper shared across async tasks; every statement
/// runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and run the idempotent schema.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let conn = tokio::task::spawn_blocking(move || Connection::open(path))
            .await
            .map_err(|e| Error::PersistenceError(e.to_string()))??;
        init_schema(&conn)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            f(&conn)
        })
        .await
        .map_err(|e| Error::PersistenceError(e.to_string()))?
    }

    // ── users ──

    pub async fn create_user(
        &self,
        email: String,
        password_hash: String,
        first_name: String,
        last_name: String,
        age: Option<i64>,
        country: Option<String>,
    ) -> Result<User> {
        self.with_conn(move |conn| {
            let taken: Option<i64> = conn
                .query_row("SELECT id FROM users WHERE email = ?1", params![email], |r| {
                    r.get(0)
                })
                .optional()?;
            if taken.is_some() {
                return Err(Error::EmailTaken);
            }
            conn.execute(
                "INSERT INTO users (email, password, first_name, last_name, age, country)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![email, password_hash, first_name, last_name, age, country],
            )?;
            let id = conn.last_insert_rowid();
            user_by_id(conn, id)?.ok_or(Error::NotFound)
        })
        .await
    }

    pub async fn find_user_by_email(&self, email: String) -> Result<Option<User>> {
        self.with_conn(move |conn| {
            let id: Option<i64> = conn
                .query_row("SELECT id FROM users WHERE email = ?1", params![email], |r| {
                    r.get(0)
                })
                .optional()?;
            match id {
                Some(id) => user_by_id(conn, id),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(move |conn| user_by_id(conn, id)).await
    }

    pub async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User> {
        self.with_conn(move |conn| {
            let current = user_by_id(conn, id)?.ok_or(Error::NotFound)?;

            let email = changes.email.unwrap_or(current.email);
            let conflict: Option<i64> = conn
                .query_row(
                    "SELECT id FROM users WHERE email = ?1 AND id != ?2",
                    params![email, id],
                    |r| r.get(0),
                )
                .optional()?;
            if conflict.is_some() {
                return Err(Error::EmailTaken);
            }

            conn.execute(
                "UPDATE users SET email=?1, password=?2, first_name=?3, last_name=?4,
                        age=?5, country=?6, updated_at=datetime('now')
                 WHERE id=?7",
                params![
                    email,
                    changes.password_hash.unwrap_or(current.password_hash),
                    changes.first_name.unwrap_or(current.first_name),
                    changes.last_name.unwrap_or(current.last_name),
                    changes.age.or(current.age),
                    changes.country.or(current.country),
                    id
                ],
            )?;
            user_by_id(conn, id)?.ok_or(Error::NotFound)
        })
        .await
    }

    /// Items and alerts go with the user via ON DELETE CASCADE.
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    // ── items ──

    pub async fn list_items(&self, user_id: i64) -> Result<Vec<Item>> {
        self.with_conn(move |conn| items_for_user(conn, user_id)).await
    }

    pub async fn insert_item(&self, user_id: i64, draft: ItemDraft) -> Result<Item> {
        self.with_conn(move |conn| {
            let id = insert_item_row(conn, user_id, &draft)?;
            item_by_id(conn, user_id, id)?.ok_or(Error::NotFound)
        })
        .await
    }

    pub async fn update_item(&self, user_id: i64, id: i64, draft: ItemDraft) -> Result<Item> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE items SET
                    name=?1, metal=?2, type=?3, grade_name=?4, purity=?5, grams=?6, notes=?7,
                    purchase_date=?8, price_paid=?9, price_paid_curr=?10, price_paid_usd=?11,
                    receipt=?12, sold=?13, sell_price=?14, sell_currency=?15, sell_price_usd=?16,
                    sell_date=?17, sell_notes=?18, updated_at=datetime('now')
                 WHERE id=?19 AND user_id=?20",
                params![
                    draft.name,
                    draft.metal.as_str(),
                    draft.kind.as_str(),
                    draft.grade_name,
                    draft.purity,
                    draft.grams,
                    draft.notes,
                    draft.purchase_date,
                    draft.price_paid,
                    draft.price_paid_currency.as_deref().unwrap_or("USD"),
                    draft.price_paid_usd,
                    draft.receipt,
                    draft.sold,
                    draft.sell_price,
                    draft.sell_currency,
                    draft.sell_price_usd,
                    draft.sell_date,
                    draft.sell_notes,
                    id,
                    user_id
                ],
            )?;
            if changed == 0 {
                return Err(Error::NotFound);
            }
            item_by_id(conn, user_id, id)?.ok_or(Error::NotFound)
        })
        .await
    }

    pub async fn delete_item(&self, user_id: i64, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "DELETE FROM items WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            if changed == 0 {
                return Err(Error::NotFound);
            }
            Ok(())
        })
        .await
    }

    /// Bulk insert used when an offline frontend comes back online. Returns
    /// the user's full item list afterwards.
    pub async fn sync_items(&self, user_id: i64, drafts: Vec<ItemDraft>) -> Result<Vec<Item>> {
        self.with_conn(move |conn| {
            conn.execute_batch("BEGIN")?;
            let outcome = drafts
                .iter()
                .try_for_each(|draft| insert_item_row(conn, user_id, draft).map(|_| ()));
            match outcome {
                Ok(()) => conn.execute_batch("COMMIT")?,
                Err(e) => {
                    conn.execute_batch("ROLLBACK")?;
                    return Err(e);
                }
            }
            items_for_user(conn, user_id)
        })
        .await
    }

    // ── alerts ──

    pub async fn list_alerts(&self, user_id: i64) -> Result<Vec<Alert>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, client_id, metal, direction, price, note, fired, created_at
                 FROM alerts WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let mut rows = stmt.query(params![user_id])?;
            let mut alerts = Vec::new();
            while let Some(row) = rows.next()? {
                alerts.push(alert_from_row(row)?);
            }
            Ok(alerts)
        })
        .await
    }

    pub async fn insert_alert(&self, user_id: i64, draft: AlertDraft) -> Result<Alert> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO alerts (user_id, client_id, metal, direction, price, note)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user_id,
                    draft.client_id,
                    draft.metal.as_str(),
                    draft.dir.as_str(),
                    draft.price,
                    draft.note
                ],
            )?;
            let id = conn.last_insert_rowid();
            let mut stmt = conn.prepare(
                "SELECT id, client_id, metal, direction, price, note, fired, created_at
                 FROM alerts WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![id])?;
            let row = rows.next()?.ok_or(Error::NotFound)?;
            alert_from_row(row)
        })
        .await
    }

    pub async fn mark_alert_fired(&self, user_id: i64, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE alerts SET fired = 1 WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn delete_alert(&self, user_id: i64, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "DELETE FROM alerts WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            if changed == 0 {
                return Err(Error::NotFound);
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    async fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT gold, silver, usd_inr, usd_aed, usd_eur, usd_gbp, fetched_at
                     FROM price_cache WHERE id = 1",
                    [],
                    |r| {
                        Ok((
                            r.get::<_, f64>(0)?,
                            r.get::<_, f64>(1)?,
                            r.get::<_, f64>(2)?,
                            r.get::<_, f64>(3)?,
                            r.get::<_, f64>(4)?,
                            r.get::<_, f64>(5)?,
                            r.get::<_, String>(6)?,
                        ))
                    },
                )
                .optional()?;

            Ok(row.map(
                |(gold_usd, silver_usd, usd_inr, usd_aed, usd_eur, usd_gbp, fetched_at)| {
                    Snapshot {
                        gold_usd,
                        silver_usd,
                        usd_inr,
                        usd_aed,
                        usd_eur,
                        usd_gbp,
                        fetched_at: parse_timestamp(&fetched_at),
                    }
                },
            ))
        })
        .await
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let snapshot = snapshot.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE price_cache
                 SET gold=?1, silver=?2, usd_inr=?3, usd_aed=?4, usd_eur=?5, usd_gbp=?6,
                     fetched_at=?7
                 WHERE id = 1",
                params![
                    snapshot.gold_usd,
                    snapshot.silver_usd,
                    snapshot.usd_inr,
                    snapshot.usd_aed,
                    snapshot.usd_eur,
                    snapshot.usd_gbp,
                    snapshot.fetched_at.to_rfc3339()
                ],
            )?;
            Ok(())
        })
        .await
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;

         CREATE TABLE IF NOT EXISTS users (
             id          INTEGER PRIMARY KEY AUTOINCREMENT,
             email       TEXT    UNIQUE NOT NULL COLLATE NOCASE,
             password    TEXT    NOT NULL,
             first_name  TEXT    NOT NULL,
             last_name   TEXT    NOT NULL,
             age         INTEGER,
             country     TEXT,
             created_at  TEXT    DEFAULT (datetime('now')),
             updated_at  TEXT    DEFAULT (datetime('now'))
         );

         CREATE TABLE IF NOT EXISTS items (
             id               INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id          INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
             client_id        TEXT,
             name             TEXT    NOT NULL,
             metal            TEXT    NOT NULL CHECK(metal IN ('gold','silver')),
             type             TEXT    NOT NULL CHECK(type IN ('jewellery','coin_bar','raw')),
             grade_name       TEXT    NOT NULL,
             purity           REAL    NOT NULL,
             grams            REAL    NOT NULL,
             notes            TEXT,
             purchase_date    TEXT,
             price_paid       REAL,
             price_paid_curr  TEXT,
             price_paid_usd   REAL,
             receipt          TEXT,
             sold             INTEGER DEFAULT 0,
             sell_price       REAL,
             sell_currency    TEXT,
             sell_price_usd   REAL,
             sell_date        TEXT,
             sell_notes       TEXT,
             added_at         TEXT    DEFAULT (datetime('now')),
             updated_at       TEXT    DEFAULT (datetime('now'))
         );

         CREATE TABLE IF NOT EXISTS alerts (
             id          INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
             client_id   TEXT,
             metal       TEXT    NOT NULL CHECK(metal IN ('gold','silver')),
             direction   TEXT    NOT NULL CHECK(direction IN ('above','below')),
             price       REAL    NOT NULL,
             note        TEXT,
             fired       INTEGER DEFAULT 0,
             created_at  TEXT    DEFAULT (datetime('now'))
         );

         CREATE TABLE IF NOT EXISTS price_cache (
             id          INTEGER PRIMARY KEY CHECK(id = 1),
             gold        REAL    NOT NULL DEFAULT 3320,
             silver      REAL    NOT NULL DEFAULT 33.2,
             usd_inr     REAL    NOT NULL DEFAULT 83.5,
             usd_aed     REAL    NOT NULL DEFAULT 3.67,
             usd_eur     REAL    NOT NULL DEFAULT 0.92,
             usd_gbp     REAL    NOT NULL DEFAULT 0.79,
             fetched_at  TEXT    DEFAULT (datetime('now'))
         );

         INSERT OR IGNORE INTO price_cache (id) VALUES (1);",
    )?;
    Ok(())
}

/// The seed row is written by sqlite's `datetime('now')`; our own writes are
/// RFC 3339. Accept both, fall back to now rather than fail a startup load.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|naive| naive.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

fn user_by_id(conn: &Connection, id: i64) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, password, first_name, last_name, age, country, created_at
             FROM users WHERE id = ?1",
            params![id],
            |r| {
                Ok(User {
                    id: r.get(0)?,
                    email: r.get(1)?,
                    password_hash: r.get(2)?,
                    first_name: r.get(3)?,
                    last_name: r.get(4)?,
                    age: r.get(5)?,
                    country: r.get(6)?,
                    created_at: r.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

const ITEM_COLUMNS: &str = "id, client_id, name, metal, type, grade_name, purity, grams, notes,
     purchase_date, price_paid, price_paid_curr, price_paid_usd, receipt, sold,
     sell_price, sell_currency, sell_price_usd, sell_date, sell_notes, added_at";

fn item_from_row(row: &rusqlite::Row<'_>) -> Result<Item> {
    let metal: String = row.get(3)?;
    let kind: String = row.get(4)?;
    Ok(Item {
        id: row.get(0)?,
        client_id: row.get(1)?,
        name: row.get(2)?,
        metal: Metal::parse(&metal)?,
        kind: ItemKind::parse(&kind)?,
        grade_name: row.get(5)?,
        purity: row.get(6)?,
        grams: row.get(7)?,
        notes: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        purchase_date: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        price_paid: row.get(10)?,
        price_paid_currency: row.get(11)?,
        price_paid_usd: row.get(12)?,
        receipt: row.get(13)?,
        sold: row.get::<_, i64>(14)? != 0,
        sell_price: row.get(15)?,
        sell_currency: row.get(16)?,
        sell_price_usd: row.get(17)?,
        sell_date: row.get::<_, Option<String>>(18)?.unwrap_or_default(),
        sell_notes: row.get::<_, Option<String>>(19)?.unwrap_or_default(),
        added_at: row.get(20)?,
    })
}

fn item_by_id(conn: &Connection, user_id: i64, id: i64) -> Result<Option<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM items WHERE id = ?1 AND user_id = ?2",
        ITEM_COLUMNS
    ))?;
    let mut rows = stmt.query(params![id, user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(item_from_row(row)?)),
        None => Ok(None),
    }
}

fn items_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM items WHERE user_id = ?1 ORDER BY added_at DESC",
        ITEM_COLUMNS
    ))?;
    let mut rows = stmt.query(params![user_id])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(item_from_row(row)?);
    }
    Ok(items)
}

fn insert_item_row(conn: &Connection, user_id: i64, draft: &ItemDraft) -> Result<i64> {
    conn.execute(
        "INSERT INTO items
            (user_id, client_id, name, metal, type, grade_name, purity, grams, notes,
             purchase_date, price_paid, price_paid_curr, price_paid_usd, receipt, sold,
             sell_price, sell_currency, sell_price_usd, sell_date, sell_notes, added_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,
                 COALESCE(?21, datetime('now')))",
        params![
            user_id,
            draft.client_id,
            draft.name,
            draft.metal.as_str(),
            draft.kind.as_str(),
            draft.grade_name,
            draft.purity,
            draft.grams,
            draft.notes,
            draft.purchase_date,
            draft.price_paid,
            draft.price_paid_currency.as_deref().unwrap_or("USD"),
            draft.price_paid_usd,
            draft.receipt,
            draft.sold,
            draft.sell_price,
            draft.sell_currency,
            draft.sell_price_usd,
            draft.sell_date,
            draft.sell_notes,
            draft.added_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn alert_from_row(row: &rusqlite::Row<'_>) -> Result<Alert> {
    let metal: String = row.get(2)?;
    let direction: String = row.get(3)?;
    Ok(Alert {
        id: row.get(0)?,
        client_id: row.get(1)?,
        metal: Metal::parse(&metal)?,
        dir: Direction::parse(&direction)?,
        price: row.get(4)?,
        note: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        fired: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
    })
}
