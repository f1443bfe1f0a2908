use serde::Serialize;

use super::entities::{Assessment, Category};
use crate::models::evaluations::responses::{ReportCategory, SessionSummary};

/// 测评创建结果：新建或命中已有测评
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentCreationStatus {
    Created,
    Recovered,
}

/// 创建测评响应
#[derive(Debug, Clone, Serialize)]
pub struct CreateAssessmentResponse {
    pub status: AssessmentCreationStatus,
    pub assessment: Assessment,
    pub categories: Vec<Category>,
}

/// 测评列表项（附带教师姓名）
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentListItem {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub teacher_name: Option<String>,
}

/// 测评列表响应
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentListResponse {
    pub items: Vec<AssessmentListItem>,
}

/// 分类列表响应
#[derive(Debug, Clone, Serialize)]
pub struct CategoryListResponse {
    pub assessment_id: i64,
    pub items: Vec<Category>,
}

/// 单次评价会话及其分类明细
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentSession {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub details: Vec<ReportCategory>,
}

/// 测评下所有评价会话
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentSessionsResponse {
    pub assessment: Assessment,
    pub categories: Vec<Category>,
    pub sessions: Vec<AssessmentSession>,
}
