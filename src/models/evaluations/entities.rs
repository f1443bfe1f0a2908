use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 会话键
///
/// 评价会话没有独立的表，同一测评、同一学生、同一客户端时间戳的
/// 所有评价行共同构成一次会话。时间戳统一截断到毫秒，与存储精度一致。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub assessment_id: i64,
    pub student_id: String,
    pub session_timestamp: DateTime<Utc>,
}

impl SessionKey {
    pub fn new(
        assessment_id: i64,
        student_id: impl Into<String>,
        session_timestamp: DateTime<Utc>,
    ) -> Self {
        let truncated = DateTime::<Utc>::from_timestamp_millis(session_timestamp.timestamp_millis())
            .unwrap_or(session_timestamp);
        Self {
            assessment_id,
            student_id: student_id.into(),
            session_timestamp: truncated,
        }
    }

    /// 从存储的毫秒时间戳还原
    pub fn from_stored(assessment_id: i64, student_id: impl Into<String>, created_at: i64) -> Self {
        Self {
            assessment_id,
            student_id: student_id.into(),
            session_timestamp: DateTime::<Utc>::from_timestamp_millis(created_at)
                .unwrap_or_default(),
        }
    }

    /// 存储使用的毫秒时间戳
    pub fn timestamp_millis(&self) -> i64 {
        self.session_timestamp.timestamp_millis()
    }
}

/// 一条待写入的分类评价
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationItem {
    pub category_id: i64,
    pub marks: f64,
    pub comment: Option<String>,
    pub is_comment: bool,
}

/// 解析后的提交批次
#[derive(Debug, Clone)]
pub struct EvaluationBatch {
    pub key: SessionKey,
    pub evaluator_id: String,
    pub items: Vec<EvaluationItem>,
    /// 时间戳是否由客户端提供（服务器兜底生成的会话无法去重）
    pub timestamp_supplied: bool,
}

/// 会话引用，足以在之后重新定位整个会话
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRef {
    pub assessment_id: i64,
    pub student_id: String,
    pub evaluator_id: String,
    pub session_timestamp: DateTime<Utc>,
    pub first_row_id: Option<i64>,
    pub row_count: u64,
}

impl SessionRef {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(
            self.assessment_id,
            self.student_id.clone(),
            self.session_timestamp,
        )
    }
}

/// 批次写入结果
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// 新会话已写入
    Committed(SessionRef),
    /// 会话已存在，未重复写入
    Replayed(SessionRef),
}

/// 已持久化的评价行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRow {
    pub id: i64,
    pub assessment_id: i64,
    pub category_id: i64,
    pub marks: f64,
    pub comment: Option<String>,
    pub evaluator_id: String,
    pub student_id: String,
    pub session_timestamp: DateTime<Utc>,
}

/// 报告定位方式
#[derive(Debug, Clone, PartialEq)]
pub enum ReportTarget {
    /// 指定评价行，直接取其所属会话
    Row(i64),
    /// 指定学生在某测评下的最新会话
    Latest { assessment_id: i64, student_id: String },
    /// 指定会话
    Session(SessionKey),
}

/// 报告头：定位到的会话
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHeader {
    pub anchor_row_id: i64,
    pub key: SessionKey,
    pub evaluator_id: String,
    pub assessment_title: Option<String>,
}

/// 会话内一行评价及其分类（分类可能已不存在）
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub row_id: i64,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub max_marks: Option<f64>,
    pub is_comment: bool,
    pub marks: f64,
    pub comment: Option<String>,
}

/// 历史查询视角
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    /// 按被评价学生匹配
    #[default]
    Student,
    /// 按评价人匹配（忽略首尾空白），并包含本人创建的测评
    Teacher,
}

impl std::fmt::Display for HistoryRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryRole::Student => write!(f, "student"),
            HistoryRole::Teacher => write!(f, "teacher"),
        }
    }
}
