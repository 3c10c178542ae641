//! SQLite-backed [`WorkOrderStore`].
//!
//! Ids are stored as hyphenated UUID text, dates as `YYYY-MM-DD` and timestamps
//! as fixed-width RFC 3339 in UTC so that text ordering matches time ordering.
//!
//! Every transaction opens with its write statement so concurrent writers wait
//! on the busy timeout. A transaction that has already read cannot upgrade its
//! lock while another writer is active and fails with `SQLITE_BUSY`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::StatusLogEntry;
use crate::identity::{Role, User};
use crate::store::{StoreError, WorkOrderStore};
use crate::work_orders::{Page, WorkOrder, WorkOrderNumber, WorkOrderQuery, WorkOrderStatus};

const WORK_ORDER_COLUMNS: &str = "id, work_order_number, product_name, quantity, deadline, status, \
     operator_id, created_by, created_at, updated_at, version";

const LOG_COLUMNS: &str = "id, work_order_id, previous_status, new_status, notes, changed_by, created_at";

const USER_COLUMNS: &str = "id, handle, name, role_id, password_hash, created_at";

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Work order store over a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database and optionally run migrations.
    pub async fn new(database_url: &str, max_connections: u32, auto_migrate: bool) -> Result<Self, StoreError> {
        if let Some(parent) = database_file(database_url).and_then(|p| p.parent().map(Path::to_path_buf)) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(&parent)
                    .map_err(|e| StoreError::Database(sqlx::Error::Io(e)))?;
            }
        }

        if !sqlx::Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }
}

/// Filesystem path behind a `sqlite:` URL, if it names a file.
fn database_file(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn day(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn corrupt(reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt { reason: reason.into() }
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| corrupt(format!("bad uuid '{raw}': {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(format!("bad timestamp '{raw}': {e}")))
}

fn parse_day(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| corrupt(format!("bad date '{raw}': {e}")))
}

fn parse_status(raw: &str) -> Result<WorkOrderStatus, StoreError> {
    raw.parse().map_err(corrupt)
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|e| e.is_unique_violation())
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|e| e.is_foreign_key_violation())
}

fn user_from_row(row: &SqliteRow) -> Result<User, StoreError> {
    let role = match row.try_get::<Option<String>, _>("role_id")? {
        Some(id) => Some(Role::from_id(&id).ok_or_else(|| corrupt(format!("unknown role '{id}'")))?),
        None => None,
    };
    Ok(User {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        handle: row.try_get("handle")?,
        name: row.try_get("name")?,
        role,
        password_hash: row.try_get("password_hash")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn work_order_from_row(row: &SqliteRow) -> Result<WorkOrder, StoreError> {
    let number: String = row.try_get("work_order_number")?;
    let quantity: i64 = row.try_get("quantity")?;
    let version: i64 = row.try_get("version")?;
    Ok(WorkOrder {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        number: number.parse::<WorkOrderNumber>().map_err(corrupt)?,
        product_name: row.try_get("product_name")?,
        quantity: u32::try_from(quantity).map_err(|_| corrupt(format!("bad quantity {quantity}")))?,
        deadline: parse_day(&row.try_get::<String, _>("deadline")?)?,
        status: parse_status(&row.try_get::<String, _>("status")?)?,
        operator_id: parse_uuid(&row.try_get::<String, _>("operator_id")?)?,
        created_by: parse_uuid(&row.try_get::<String, _>("created_by")?)?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
        version: u64::try_from(version).map_err(|_| corrupt(format!("bad version {version}")))?,
    })
}

fn log_from_row(row: &SqliteRow) -> Result<StatusLogEntry, StoreError> {
    let previous_status = row
        .try_get::<Option<String>, _>("previous_status")?
        .map(|s| parse_status(&s))
        .transpose()?;
    Ok(StatusLogEntry {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        work_order_id: parse_uuid(&row.try_get::<String, _>("work_order_id")?)?,
        previous_status,
        new_status: parse_status(&row.try_get::<String, _>("new_status")?)?,
        notes: row.try_get("notes")?,
        changed_by: parse_uuid(&row.try_get::<String, _>("changed_by")?)?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

async fn require_row(
    conn: &mut SqliteConnection,
    table: &'static str,
    entity: &'static str,
    id: Uuid,
) -> Result<(), StoreError> {
    let found: Option<i64> = sqlx::query_scalar(&format!("SELECT 1 FROM {table} WHERE id = ?1"))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::MissingReference { entity, id }),
    }
}

/// Turn a foreign key failure into the [`StoreError::MissingReference`] for the
/// first of `references` that is absent.
async fn missing_reference(
    conn: &mut SqliteConnection,
    error: sqlx::Error,
    references: &[(&'static str, &'static str, Uuid)],
) -> StoreError {
    if !is_foreign_key_violation(&error) {
        return error.into();
    }
    for &(table, entity, id) in references {
        if let Err(missing) = require_row(conn, table, entity, id).await {
            return missing;
        }
    }
    error.into()
}

async fn insert_log(conn: &mut SqliteConnection, entry: &StatusLogEntry) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO work_order_logs (id, work_order_id, previous_status, new_status, notes, changed_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.work_order_id.to_string())
    .bind(entry.previous_status.map(|s| s.as_str()))
    .bind(entry.new_status.as_str())
    .bind(entry.notes.as_deref())
    .bind(entry.changed_by.to_string())
    .bind(timestamp(&entry.created_at))
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => Err(missing_reference(
            conn,
            e,
            &[
                ("work_orders", "work order", entry.work_order_id),
                ("users", "user", entry.changed_by),
            ],
        )
        .await),
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &WorkOrderQuery) {
    builder.push(" WHERE 1 = 1");
    if let Some(operator_id) = query.operator_id {
        builder.push(" AND operator_id = ").push_bind(operator_id.to_string());
    }
    if let Some(term) = query.filter.search_term() {
        let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        builder
            .push(" AND (LOWER(work_order_number) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(product_name) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(status) = query.filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(from) = query.filter.deadline_from {
        builder.push(" AND deadline >= ").push_bind(day(&from));
    }
    if let Some(to) = query.filter.deadline_to {
        builder.push(" AND deadline <= ").push_bind(day(&to));
    }
}

#[async_trait]
impl WorkOrderStore for SqliteStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, handle, name, role_id, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.handle)
        .bind(&user.name)
        .bind(user.role.map(|r| r.id()))
        .bind(&user.password_hash)
        .bind(timestamp(&user.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateHandle { handle: user.handle }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn find_user_by_handle(&self, handle: &str) -> Result<Option<User>, StoreError> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE handle = ?1"))
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    async fn users_with_role(&self, role: Role) -> Result<Vec<User>, StoreError> {
        sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role_id = ?1 ORDER BY name, handle"
        ))
        .bind(role.id())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(user_from_row)
        .collect()
    }

    async fn next_sequence(&self, date: NaiveDate) -> Result<u32, StoreError> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO work_order_sequences (day, last_value) VALUES (?1, 1)
            ON CONFLICT (day) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(day(&date))
        .fetch_one(&self.pool)
        .await?;
        debug!(%date, value, "Allocated work order sequence");
        u32::try_from(value).map_err(|_| corrupt(format!("bad sequence {value}")))
    }

    async fn peek_sequence(&self, date: NaiveDate) -> Result<u32, StoreError> {
        let last: Option<i64> = sqlx::query_scalar("SELECT last_value FROM work_order_sequences WHERE day = ?1")
            .bind(day(&date))
            .fetch_optional(&self.pool)
            .await?;
        let next = last.unwrap_or(0) + 1;
        u32::try_from(next).map_err(|_| corrupt(format!("bad sequence {next}")))
    }

    async fn insert_work_order(&self, order: WorkOrder, entry: StatusLogEntry) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO work_orders (id, work_order_number, product_name, quantity, deadline, status,
                                     operator_id, created_by, created_at, updated_at, version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(order.id.to_string())
        .bind(order.number.to_string())
        .bind(&order.product_name)
        .bind(i64::from(order.quantity))
        .bind(day(&order.deadline))
        .bind(order.status.as_str())
        .bind(order.operator_id.to_string())
        .bind(order.created_by.to_string())
        .bind(timestamp(&order.created_at))
        .bind(timestamp(&order.updated_at))
        .bind(i64::try_from(order.version).map_err(|_| corrupt("version out of range"))?)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::DuplicateNumber { number: order.number });
            }
            Err(e) => {
                return Err(missing_reference(
                    &mut tx,
                    e,
                    &[
                        ("users", "user", order.created_by),
                        ("users", "user", order.operator_id),
                    ],
                )
                .await);
            }
        }

        insert_log(&mut tx, &entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_work_order(&self, id: Uuid) -> Result<Option<WorkOrder>, StoreError> {
        sqlx::query(&format!("SELECT {WORK_ORDER_COLUMNS} FROM work_orders WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(work_order_from_row)
            .transpose()
    }

    async fn find_work_order_by_number(
        &self,
        number: &WorkOrderNumber,
    ) -> Result<Option<WorkOrder>, StoreError> {
        sqlx::query(&format!("SELECT {WORK_ORDER_COLUMNS} FROM work_orders WHERE work_order_number = ?1"))
            .bind(number.to_string())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(work_order_from_row)
            .transpose()
    }

    async fn save_work_order(
        &self,
        order: WorkOrder,
        expected_version: u64,
        entry: Option<StatusLogEntry>,
    ) -> Result<(), StoreError> {
        let expected = i64::try_from(expected_version).map_err(|_| corrupt("version out of range"))?;
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE work_orders
            SET product_name = ?1, quantity = ?2, deadline = ?3, status = ?4,
                operator_id = ?5, updated_at = ?6, version = ?7
            WHERE id = ?8 AND version = ?9
            "#,
        )
        .bind(&order.product_name)
        .bind(i64::from(order.quantity))
        .bind(day(&order.deadline))
        .bind(order.status.as_str())
        .bind(order.operator_id.to_string())
        .bind(timestamp(&order.updated_at))
        .bind(i64::try_from(order.version).map_err(|_| corrupt("version out of range"))?)
        .bind(order.id.to_string())
        .bind(expected)
        .execute(&mut *tx)
        .await;

        let updated = match result {
            Ok(updated) => updated,
            Err(e) => {
                return Err(missing_reference(&mut tx, e, &[("users", "user", order.operator_id)]).await);
            }
        };

        if updated.rows_affected() == 0 {
            let found: Option<i64> = sqlx::query_scalar("SELECT version FROM work_orders WHERE id = ?1")
                .bind(order.id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match found {
                None => StoreError::WorkOrderNotFound { id: order.id },
                Some(found) => StoreError::VersionMismatch {
                    id: order.id,
                    expected: expected_version,
                    found: u64::try_from(found).unwrap_or_default(),
                },
            });
        }

        if let Some(entry) = &entry {
            insert_log(&mut tx, entry).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn append_log(&self, entry: StatusLogEntry) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_log(&mut tx, &entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, work_order_id: Uuid) -> Result<Vec<StatusLogEntry>, StoreError> {
        sqlx::query(&format!(
            "SELECT {LOG_COLUMNS} FROM work_order_logs WHERE work_order_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(work_order_id.to_string())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(log_from_row)
        .collect()
    }

    async fn query_work_orders(&self, query: WorkOrderQuery) -> Result<Page<WorkOrder>, StoreError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM work_orders");
        push_filters(&mut count, &query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {WORK_ORDER_COLUMNS} FROM work_orders"));
        push_filters(&mut select, &query);
        select
            .push(" ORDER BY created_at DESC, work_order_number DESC, id DESC LIMIT ")
            .push_bind(i64::from(query.per_page))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let items = select
            .build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(work_order_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(
            items,
            query.page,
            query.per_page,
            u64::try_from(total).unwrap_or_default(),
        ))
    }
}
