use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 测评
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// 测评分类（评分项或评语项）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub assessment_id: i64,
    pub name: String,
    pub max_marks: f64,
    pub is_comment: bool,
}

/// 校验后的待创建测评
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssessment {
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub created_by: String,
    pub categories: Vec<NewCategory>,
}

/// 校验后的待创建分类
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub max_marks: f64,
    pub is_comment: bool,
}
