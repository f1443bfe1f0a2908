use serde::Deserialize;

use crate::models::common::lenient::{deserialize_bool, deserialize_f64, deserialize_optional_id};

/// 创建测评请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssessmentRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default, alias = "ucode")]
    pub code: String,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub categories: Vec<CreateCategoryRequest>,
}

/// 测评分类定义
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default, alias = "category")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_f64")]
    pub marks: f64,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub is_comment: bool,
}

/// 测评列表查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentListParams {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub teacher_id: Option<String>,
}
