use secret_probe_core::contract::QueryRows;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Row, TypeInfo, ValueRef};
use tracing::{debug, warn};

use super::database::{ConnectTarget, DatabaseConnector, DatabaseSession};
use super::run_blocking;

/// Opens one unpooled PostgreSQL connection per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl DatabaseConnector for PgConnector {
    fn connect(&self, target: &ConnectTarget<'_>) -> Result<Box<dyn DatabaseSession>, String> {
        let mut options = PgConnectOptions::new()
            .host(target.host)
            .port(target.port);
        if let Some(user) = target.user {
            options = options.username(user);
        }
        if let Some(password) = target.password {
            options = options.password(password);
        }

        let connection = run_blocking(PgConnection::connect_with(&options)).map_err(|error| {
            format!(
                "failed to connect to {}:{}: {error}",
                target.host, target.port
            )
        })?;

        Ok(Box::new(PgSession { connection }))
    }
}

pub struct PgSession {
    connection: PgConnection,
}

impl DatabaseSession for PgSession {
    fn fetch_all(&mut self, sql: &str) -> Result<QueryRows, String> {
        let rows = run_blocking(sqlx::query(sql).fetch_all(&mut self.connection))
            .map_err(|error| error.to_string())?;

        rows.iter().map(decode_row).collect()
    }

    fn close(self: Box<Self>) {
        if let Err(error) = run_blocking(self.connection.close()) {
            warn!(
                component = "postgres",
                event = "close_failed",
                error = %error,
            );
        }
    }
}

fn decode_row(row: &PgRow) -> Result<Vec<Value>, String> {
    row.columns()
        .iter()
        .map(|column| decode_column(row, column.ordinal(), column.type_info().name()))
        .collect()
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value, String> {
    let raw = row.try_get_raw(index).map_err(|error| error.to_string())?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let decoded = match type_name {
        "INT2" => row.try_get::<i16, _>(index).map(Value::from),
        "INT4" => row.try_get::<i32, _>(index).map(Value::from),
        "INT8" => row.try_get::<i64, _>(index).map(Value::from),
        "FLOAT4" => row
            .try_get::<f32, _>(index)
            .map(|value| Value::from(f64::from(value))),
        "FLOAT8" => row.try_get::<f64, _>(index).map(Value::from),
        "BOOL" => row.try_get::<bool, _>(index).map(Value::from),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row.try_get::<String, _>(index).map(Value::from),
        other => {
            debug!(
                component = "postgres",
                event = "unsupported_column_type",
                column = index,
                type_name = other,
            );
            Ok(Value::Null)
        }
    };

    decoded.map_err(|error| format!("failed to decode column {index} ({type_name}): {error}"))
}
