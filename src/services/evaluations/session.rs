//! 会话身份解析
//!
//! 从提交内容中提取会话键，时间戳由客户端生成，
//! 同一逻辑提交的重试会携带相同的键。

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::EvaluationConfig;
use crate::errors::{EvalBookError, Result};
use crate::models::evaluations::{
    entities::{EvaluationBatch, EvaluationItem, SessionKey},
    requests::SubmitEvaluationRequest,
};
use crate::utils::time::{is_blank, parse_client_timestamp};

/// 学号、工号为自由文本，只限制长度
const MAX_ID_LEN: usize = 64;

/// 会话解析策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    /// 缺少时间戳时拒绝，而不是使用服务器时间
    pub require_session_timestamp: bool,
}

impl From<&EvaluationConfig> for SessionPolicy {
    fn from(config: &EvaluationConfig) -> Self {
        Self {
            require_session_timestamp: config.require_session_timestamp,
        }
    }
}

fn required_id(value: Option<&str>, field: &str) -> Result<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(EvalBookError::validation(format!("{field} is required")));
    }
    if value.chars().count() > MAX_ID_LEN {
        return Err(EvalBookError::validation(format!(
            "{field} must be at most {MAX_ID_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

/// 解析提交批次，任何存储访问之前完成全部校验
pub fn resolve_session(
    req: &SubmitEvaluationRequest,
    policy: &SessionPolicy,
    now: DateTime<Utc>,
) -> Result<EvaluationBatch> {
    let assessment_id = req
        .assessment_id
        .filter(|id| *id > 0)
        .ok_or_else(|| EvalBookError::validation("assessment_id is required"))?;
    let student_id = required_id(req.student_id.as_deref(), "student_id")?;
    let evaluator_id = required_id(req.evaluator_id.as_deref(), "evaluator_id")?;

    let mut seen = HashSet::with_capacity(req.rows.len());
    let mut items = Vec::with_capacity(req.rows.len());
    for (index, row) in req.rows.iter().enumerate() {
        let category_id = row
            .category_id
            .filter(|id| *id > 0)
            .ok_or_else(|| EvalBookError::validation(format!("rows[{index}].category_id is required")))?;
        if !seen.insert(category_id) {
            return Err(EvalBookError::validation(format!(
                "category {category_id} appears more than once in the batch"
            )));
        }
        if !row.marks.is_finite() {
            return Err(EvalBookError::validation(format!(
                "rows[{index}].marks must be a number"
            )));
        }
        items.push(EvaluationItem {
            category_id,
            marks: row.marks,
            comment: row.comment.as_ref().map(|c| c.trim().to_string()),
            is_comment: row.is_comment,
        });
    }

    let supplied = req
        .session_timestamp
        .as_ref()
        .filter(|raw| !is_blank(raw));

    let (session_timestamp, timestamp_supplied) = match supplied {
        Some(raw) => {
            let parsed = parse_client_timestamp(raw)
                .map_err(|e| EvalBookError::validation(e.message()))?;
            (parsed, true)
        }
        None if policy.require_session_timestamp => {
            return Err(EvalBookError::validation("session_timestamp is required"));
        }
        None => {
            warn!(
                "Submission for assessment {} student {} has no session_timestamp, using server time; retries will not be deduplicated",
                assessment_id, student_id
            );
            (now, false)
        }
    };

    Ok(EvaluationBatch {
        key: SessionKey::new(assessment_id, student_id, session_timestamp),
        evaluator_id,
        items,
        timestamp_supplied,
    })
}
