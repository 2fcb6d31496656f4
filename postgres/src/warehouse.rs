use chrono::NaiveDate;
use config::shared::{IntoConnectOptions, PgConnectionConfig};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::prelude::FromRow;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::schema::WarehouseTable;

/// Upper bound of pooled connections; a run issues its statements one after another.
const MAX_WAREHOUSE_CONNECTIONS: u32 = 2;

/// A row of the `dim_datetime` table, including its generated identifier.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DimDatetimeRow {
    pub id: i64,
    pub date: NaiveDate,
    pub year: i64,
    pub month: i64,
    pub weekday: i64,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
}

/// Connects to the warehouse database with a small connection pool.
pub async fn connect_to_warehouse(config: &PgConnectionConfig) -> Result<PgPool, sqlx::Error> {
    let options: PgConnectOptions = config.with_db();

    let pool = PgPoolOptions::new()
        .max_connections(MAX_WAREHOUSE_CONNECTIONS)
        .min_connections(1)
        .connect_with(options)
        .await?;

    debug!(host = %config.host, database = %config.name, "connected to warehouse");

    Ok(pool)
}

/// Runs a trivial statement to make sure the warehouse answers.
pub async fn ping(pool: &PgPool) -> sqlx::Result<()> {
    sqlx::query("select 1").execute(pool).await?;

    Ok(())
}

/// Counts the rows currently stored in `table`.
pub async fn count_rows(pool: &PgPool, table: WarehouseTable) -> sqlx::Result<i64> {
    let query = format!("select count(*) from {}", table.quoted());
    let count: i64 = sqlx::query_scalar(&query).fetch_one(pool).await?;

    Ok(count)
}

/// Fetches the most recently inserted `dim_datetime` row.
///
/// Rows are ordered by their generated identifier rather than by the timestamp they describe,
/// so clock skew between runs never changes which row is considered the latest.
pub async fn fetch_latest_datetime_row(pool: &PgPool) -> sqlx::Result<Option<DimDatetimeRow>> {
    let row = sqlx::query_as::<_, DimDatetimeRow>(
        r#"
        select id::int8 as id, date,
            year::int8 as year, month::int8 as month, weekday::int8 as weekday,
            day::int8 as day, hour::int8 as hour, minute::int8 as minute,
            second::int8 as second
        from dim_datetime
        order by id desc
        limit 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Opens a transaction in which a batch of inserts is committed atomically.
pub async fn begin_append(pool: &PgPool) -> sqlx::Result<Transaction<'static, Postgres>> {
    pool.begin().await
}

/// Builds the `insert into ... (...) ` prefix for `table`, with quoted identifiers.
pub fn insert_statement_prefix(table: WarehouseTable) -> String {
    let columns = table
        .column_names()
        .iter()
        .map(|column| pg_escape::quote_identifier(column).into_owned())
        .collect::<Vec<_>>()
        .join(", ");

    format!("insert into {} ({columns}) ", table.quoted())
}
