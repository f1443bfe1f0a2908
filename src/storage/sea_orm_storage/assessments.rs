//! 测评存储操作

use super::{SeaOrmStorage, is_unique_violation};
use crate::entity::assessment_details::{
    ActiveModel as DetailActiveModel, Column as DetailColumn, Entity as AssessmentDetails,
};
use crate::entity::assessments::{ActiveModel, Column, Entity as Assessments, Model};
use crate::errors::{EvalBookError, Result};
use crate::models::assessments::{
    entities::{Assessment, Category, NewAssessment},
    responses::{AssessmentCreationStatus, CreateAssessmentResponse},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::{error, info};

/// 按 (code, created_by) 查找测评
async fn find_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    created_by: &str,
) -> std::result::Result<Option<Model>, DbErr> {
    Assessments::find()
        .filter(Column::Code.eq(code))
        .filter(Column::CreatedBy.eq(created_by))
        .one(conn)
        .await
}

async fn categories_of<C: ConnectionTrait>(
    conn: &C,
    assessment_id: i64,
) -> std::result::Result<Vec<Category>, DbErr> {
    let details = AssessmentDetails::find()
        .filter(DetailColumn::AssessmentId.eq(assessment_id))
        .order_by_asc(DetailColumn::Id)
        .all(conn)
        .await?;
    Ok(details.into_iter().map(|d| d.into_category()).collect())
}

fn recovered(model: Model, categories: Vec<Category>) -> CreateAssessmentResponse {
    CreateAssessmentResponse {
        status: AssessmentCreationStatus::Recovered,
        assessment: model.into_assessment(),
        categories,
    }
}

impl SeaOrmStorage {
    /// 创建测评，同一教师重复提交同一编码时返回已有测评
    pub async fn create_assessment_impl(
        &self,
        new: NewAssessment,
    ) -> Result<CreateAssessmentResponse> {
        match self.create_assessment_in_tx(&new).await {
            Ok(response) => Ok(response),
            Err(e) if is_unique_violation(&e) => {
                // 并发创建，以先提交者为准
                let existing = find_by_code(&self.db, &new.code, &new.created_by)
                    .await
                    .map_err(|e| EvalBookError::database_operation(format!("查询测评失败: {e}")))?;
                match existing {
                    Some(model) => {
                        let categories = categories_of(&self.db, model.id).await.map_err(|e| {
                            EvalBookError::database_operation(format!("查询测评分类失败: {e}"))
                        })?;
                        info!(
                            "Assessment {} recovered after concurrent insert (code={})",
                            model.id, new.code
                        );
                        Ok(recovered(model, categories))
                    }
                    None => Err(EvalBookError::persistence(format!("创建测评失败: {e}"))),
                }
            }
            Err(e) => {
                error!("Failed to create assessment {}: {}", new.code, e);
                Err(EvalBookError::persistence(format!("创建测评失败: {e}")))
            }
        }
    }

    async fn create_assessment_in_tx(
        &self,
        new: &NewAssessment,
    ) -> std::result::Result<CreateAssessmentResponse, DbErr> {
        let txn = self.db.begin().await?;

        if let Some(model) = find_by_code(&txn, &new.code, &new.created_by).await? {
            let categories = categories_of(&txn, model.id).await?;
            txn.commit().await?;
            return Ok(recovered(model, categories));
        }

        let assessment = ActiveModel {
            title: Set(new.title.clone()),
            description: Set(new.description.clone()),
            code: Set(new.code.clone()),
            created_by: Set(new.created_by.clone()),
            created_at: Set(chrono::Utc::now().timestamp_millis()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut categories = Vec::with_capacity(new.categories.len());
        for category in &new.categories {
            let detail = DetailActiveModel {
                assessment_id: Set(assessment.id),
                category: Set(category.name.clone()),
                marks: Set(if category.is_comment {
                    0.0
                } else {
                    category.max_marks
                }),
                is_comment: Set(category.is_comment),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            categories.push(detail.into_category());
        }

        txn.commit().await?;

        Ok(CreateAssessmentResponse {
            status: AssessmentCreationStatus::Created,
            assessment: assessment.into_assessment(),
            categories,
        })
    }

    /// 通过 ID 获取测评
    pub async fn get_assessment_by_id_impl(&self, assessment_id: i64) -> Result<Option<Assessment>> {
        let result = Assessments::find_by_id(assessment_id)
            .one(&self.db)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("查询测评失败: {e}")))?;

        Ok(result.map(|m| m.into_assessment()))
    }

    /// 批量获取测评
    pub async fn get_assessments_by_ids_impl(
        &self,
        assessment_ids: &[i64],
    ) -> Result<Vec<Assessment>> {
        if assessment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = Assessments::find()
            .filter(Column::Id.is_in(assessment_ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("批量查询测评失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_assessment()).collect())
    }

    /// 列出测评（按 ID 倒序），教师 ID 比较时忽略首尾空白
    pub async fn list_assessments_impl(&self, teacher_id: Option<&str>) -> Result<Vec<Assessment>> {
        let mut select = Assessments::find();

        if let Some(teacher_id) = teacher_id.map(str::trim).filter(|t| !t.is_empty()) {
            select = select.filter(Expr::cust_with_values(
                "TRIM(created_by) = ?",
                [teacher_id.to_string()],
            ));
        }

        let results = select
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("查询测评列表失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_assessment()).collect())
    }

    /// 列出测评分类（按 ID 升序）
    pub async fn list_categories_impl(&self, assessment_id: i64) -> Result<Vec<Category>> {
        categories_of(&self.db, assessment_id)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("查询测评分类失败: {e}")))
    }
}
