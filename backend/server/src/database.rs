//! # MySQL
//!
//! Backing store holding the tracking-event records every question is answered from.
//!
//! The server treats it as read-only. All questions read from one table, `Edx.EdxTrackEvent`.
//!
//! ## Requirements
//!
//! - Every statement is prepared with positional `?` parameters, user input is never spliced into SQL
//! - One shared connection pool, each request borrows a connection for the length of one query
//! - No timeouts, a hung query holds its request until MySQL answers
//!
//! ## Rows
//!
//! - A row is an ordered list of nullable scalars
//! - `DATETIME`/`TIMESTAMP` columns become [`chrono::NaiveDateTime`]
//! - Text and blob columns are decoded as lossy UTF-8
use std::fmt;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use mysql_async::{
    OptsBuilder, Params, Pool, Row as MySqlRow, Value as MySqlValue, prelude::Queryable,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Value::Int(n) => u64::try_from(*n).ok(),
            Value::UInt(n) => Some(*n),
            // COUNT arrives as text over the plain-text protocol
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(n) => write!(f, "{n}"),
            Value::UInt(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Text(s) => f.write_str(s),
            Value::DateTime(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<MySqlValue> for Value {
    fn from(value: MySqlValue) -> Self {
        match value {
            MySqlValue::NULL => Value::Null,
            MySqlValue::Int(n) => Value::Int(n),
            MySqlValue::UInt(n) => Value::UInt(n),
            MySqlValue::Float(x) => Value::Float(f64::from(x)),
            MySqlValue::Double(x) => Value::Float(x),
            MySqlValue::Bytes(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
            MySqlValue::Date(year, month, day, hour, minute, second, micros) => {
                NaiveDate::from_ymd_opt(year.into(), month.into(), day.into())
                    .and_then(|date| {
                        date.and_hms_micro_opt(hour.into(), minute.into(), second.into(), micros)
                    })
                    .map(Value::DateTime)
                    // zero dates such as 0000-00-00 have no chrono equivalent
                    .unwrap_or_else(|| {
                        Value::Text(format!(
                            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                        ))
                    })
            }
            MySqlValue::Time(negative, days, hours, minutes, seconds, _) => {
                let sign = if negative { "-" } else { "" };
                let hours = days * 24 + u32::from(hours);
                Value::Text(format!("{sign}{hours:02}:{minutes:02}:{seconds:02}"))
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    #[error("Backing store unavailable: {0}")]
    Unavailable(String),
}

/// Runs one read-only statement against the backing store.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, ExecutorError>;

    async fn close(&self) {}
}

pub struct MySqlExecutor {
    pool: Pool,
}

impl MySqlExecutor {
    pub fn new(config: &Config) -> Self {
        let options = OptsBuilder::default()
            .ip_or_hostname(config.mysql_host.clone())
            .tcp_port(config.mysql_port)
            .user(Some(config.mysql_user.clone()))
            .pass(Some(config.mysql_password.clone()))
            .db_name(config.mysql_db.clone());

        info!(
            host = %config.mysql_host,
            port = config.mysql_port,
            user = %config.mysql_user,
            "Creating MySQL connection pool"
        );

        Self {
            pool: Pool::new(options),
        }
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, ExecutorError> {
        let mut conn = self.pool.get_conn().await?;

        let bound = params
            .iter()
            .map(|p| MySqlValue::Bytes(p.as_bytes().to_vec()))
            .collect();
        let rows: Vec<MySqlRow> = conn.exec(sql, Params::Positional(bound)).await?;

        debug!(rows = rows.len(), "Query finished");

        // Row::unwrap hands back the row's raw column values
        Ok(rows
            .into_iter()
            .map(|row| row.unwrap().into_iter().map(Value::from).collect())
            .collect())
    }

    async fn close(&self) {
        if let Err(e) = self.pool.clone().disconnect().await {
            warn!("Failed to disconnect MySQL pool: {e}");
        }
    }
}
