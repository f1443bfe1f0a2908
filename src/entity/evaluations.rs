//! 评价记录实体
//!
//! 每个会话每个分类一行，会话由 (assessment_id, evaluation_of, created_at) 确定。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evaluations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assessment_id: i64,
    pub category_id: i64,
    pub marks: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    /// 评价人
    pub evaluated_by: String,
    /// 被评价学生
    pub evaluation_of: String,
    /// 客户端会话时间戳（毫秒）
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assessments::Entity",
        from = "Column::AssessmentId",
        to = "super::assessments::Column::Id"
    )]
    Assessment,
    #[sea_orm(
        belongs_to = "super::assessment_details::Entity",
        from = "Column::CategoryId",
        to = "super::assessment_details::Column::Id"
    )]
    Category,
}

impl Related<super::assessments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assessment.def()
    }
}

impl Related<super::assessment_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_evaluation_row(self) -> crate::models::evaluations::entities::EvaluationRow {
        use crate::models::evaluations::entities::EvaluationRow;
        use chrono::{DateTime, Utc};

        EvaluationRow {
            id: self.id,
            assessment_id: self.assessment_id,
            category_id: self.category_id,
            marks: self.marks,
            comment: self.comment,
            evaluator_id: self.evaluated_by,
            student_id: self.evaluation_of,
            session_timestamp: DateTime::<Utc>::from_timestamp_millis(self.created_at)
                .unwrap_or_default(),
        }
    }

    /// 与分类一起转换为报告行，分类缺失时只保留原始数据
    pub fn into_report_line(
        self,
        category: Option<super::assessment_details::Model>,
    ) -> crate::models::evaluations::entities::ReportLine {
        use crate::models::evaluations::entities::ReportLine;

        let (category_name, max_marks, is_comment) = match category {
            Some(c) => (Some(c.category), Some(c.marks), c.is_comment),
            None => (None, None, self.comment.is_some()),
        };

        ReportLine {
            row_id: self.id,
            category_id: self.category_id,
            category_name,
            max_marks,
            is_comment,
            marks: self.marks,
            comment: self.comment,
        }
    }
}
