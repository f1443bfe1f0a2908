//! 客户端时间戳解析
//!
//! 支持 RFC 3339、`YYYY-MM-DD HH:MM:SS[.fff]`（按 UTC 解释）以及毫秒整数。

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::errors::{EvalBookError, Result};
use crate::models::evaluations::requests::ClientTimestamp;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// 解析客户端时间戳，结果截断到毫秒
pub fn parse_client_timestamp(raw: &ClientTimestamp) -> Result<DateTime<Utc>> {
    match raw {
        ClientTimestamp::Millis(millis) => from_millis(*millis),
        ClientTimestamp::Text(text) => parse_text(text.trim()),
    }
}

/// 空字符串视为未提供
pub fn is_blank(raw: &ClientTimestamp) -> bool {
    matches!(raw, ClientTimestamp::Text(text) if text.trim().is_empty())
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    if millis <= 0 {
        return Err(EvalBookError::date_parse(format!(
            "session_timestamp must be positive, got {millis}"
        )));
    }
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        EvalBookError::date_parse(format!("session_timestamp out of range: {millis}"))
    })
}

fn parse_text(text: &str) -> Result<DateTime<Utc>> {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        let millis = text.parse::<i64>().map_err(|e| {
            EvalBookError::date_parse(format!("Invalid session_timestamp {text}: {e}"))
        })?;
        return from_millis(millis);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(truncate(parsed.with_timezone(&Utc)));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(truncate(naive.and_utc()));
        }
    }

    Err(EvalBookError::date_parse(format!(
        "Unrecognized session_timestamp: {text}"
    )))
}

fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}
