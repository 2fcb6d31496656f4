use config::shared::{IntoConnectOptions, PgConnectionConfig, TlsConfig};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use crate::schema::WarehouseTable;

/// Builds a connection config for a fresh, uniquely named test database.
///
/// The server is read from the environment:
/// - `TESTS_DATABASE_HOST`: Postgres server hostname (required)
/// - `TESTS_DATABASE_PORT`: Postgres server port (required)
/// - `TESTS_DATABASE_USERNAME`: Database user (required)
/// - `TESTS_DATABASE_PASSWORD`: Database password (optional)
pub fn local_pg_connection_config() -> PgConnectionConfig {
    PgConnectionConfig {
        host: std::env::var("TESTS_DATABASE_HOST").expect("TESTS_DATABASE_HOST must be set"),
        port: std::env::var("TESTS_DATABASE_PORT")
            .expect("TESTS_DATABASE_PORT must be set")
            .parse()
            .expect("TESTS_DATABASE_PORT must be a valid port number"),
        name: format!("hiring_warehouse_{}", Uuid::new_v4().simple()),
        username: std::env::var("TESTS_DATABASE_USERNAME")
            .expect("TESTS_DATABASE_USERNAME must be set"),
        password: std::env::var("TESTS_DATABASE_PASSWORD")
            .ok()
            .map(Into::into),
        tls: TlsConfig {
            trusted_root_certs: String::new(),
            enabled: false,
        },
    }
}

/// Creates the database named in `config` and returns a pool connected to it.
///
/// # Panics
/// Panics if connection or database creation fails.
pub async fn create_pg_database(config: &PgConnectionConfig) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"create database "{}";"#, config.name))
        .await
        .expect("Failed to create database");

    PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres")
}

/// Creates every warehouse table in the database behind `pool`.
///
/// # Panics
/// Panics if a table cannot be created.
pub async fn create_warehouse_tables(pool: &PgPool) {
    for table in WarehouseTable::ALL {
        pool.execute(&*create_table_statement(table))
            .await
            .unwrap_or_else(|err| panic!("Failed to create table {table}: {err}"));
    }
}

/// Terminates the connections to the database named in `config` and drops it.
///
/// Never panics, so cleanup cannot fail a test that already passed.
pub async fn drop_pg_database(config: &PgConnectionConfig) {
    let mut connection = match PgConnection::connect_with(&config.without_db()).await {
        Ok(connection) => connection,
        Err(err) => {
            eprintln!("warning: failed to connect to Postgres for cleanup: {err}");
            return;
        }
    };

    if let Err(err) = connection
        .execute(&*format!(
            r#"
            select pg_terminate_backend(pg_stat_activity.pid)
            from pg_stat_activity
            where pg_stat_activity.datname = '{}'
            and pid <> pg_backend_pid();"#,
            config.name
        ))
        .await
    {
        eprintln!(
            "warning: failed to terminate connections for database {}: {err}",
            config.name
        );
    }

    if let Err(err) = connection
        .execute(&*format!(r#"drop database if exists "{}";"#, config.name))
        .await
    {
        eprintln!("warning: failed to drop database {}: {err}", config.name);
    }
}

fn create_table_statement(table: WarehouseTable) -> String {
    let columns = match table {
        WarehouseTable::DimDatetime => {
            "id int8 generated always as identity primary key, date date, year int8, \
             month int8, weekday int8, day int8, hour int8, minute int8, second int8"
        }
        WarehouseTable::DimDepartment => "db_id int8, name text, description text",
        WarehouseTable::DimUser => "db_id int8, name text, occupation text",
        WarehouseTable::DimProcess => {
            "db_id int8, title text, initial_date timestamp, finish_date timestamp, \
             status text, dim_usr_id int8, description text, dim_department_id int8"
        }
        WarehouseTable::DimVacancy => {
            "db_id int8, title text, num_positions int8, status text, location text, \
             dim_usr_id int8, opening_date timestamp, closing_date timestamp"
        }
        WarehouseTable::HiringProcessCandidate => {
            "db_id int8, name text, email text, phone text, score float8, \
             apply_date timestamp, status text, updated_at timestamp, \
             fact_hiring_process_id int8"
        }
        WarehouseTable::FactHiringProcess => {
            "met_total_candidates_applied int8, met_total_candidates_interviewed int8, \
             met_total_candidates_hired int8, met_sum_duration_hiring_proces int8, \
             met_sum_salary_initial int8, met_total_feedback_positive int8, \
             met_total_neutral int8, met_total_negative int8, dim_process_id int8, \
             dim_vacancy_id int8, dim_user_id int8, dim_date_id int8"
        }
    };

    format!("create table {} ({columns});", table.quoted())
}
