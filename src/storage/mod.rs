use std::sync::Arc;

use crate::models::{
    assessments::{
        entities::{Assessment, Category, NewAssessment},
        responses::CreateAssessmentResponse,
    },
    evaluations::entities::{
        CommitOutcome, EvaluationBatch, EvaluationRow, HistoryRole, ReportLine, ReportTarget,
        SessionHeader, SessionKey, SessionRef,
    },
    users::entities::User,
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 测评管理方法
    // 创建测评（按 code + created_by 幂等）
    async fn create_assessment(&self, assessment: NewAssessment)
    -> Result<CreateAssessmentResponse>;
    // 通过ID获取测评
    async fn get_assessment_by_id(&self, assessment_id: i64) -> Result<Option<Assessment>>;
    // 批量获取测评
    async fn get_assessments_by_ids(&self, assessment_ids: &[i64]) -> Result<Vec<Assessment>>;
    // 列出测评，可按教师过滤
    async fn list_assessments(&self, teacher_id: Option<&str>) -> Result<Vec<Assessment>>;
    // 列出测评分类
    async fn list_categories(&self, assessment_id: i64) -> Result<Vec<Category>>;

    /// 评价会话方法
    // 查找已存在的会话
    async fn find_existing_session(&self, key: &SessionKey) -> Result<Option<SessionRef>>;
    // 原子写入一个提交批次
    async fn commit_evaluation_batch(&self, batch: &EvaluationBatch) -> Result<CommitOutcome>;
    // 定位报告所属会话
    async fn resolve_report_session(
        &self,
        target: &ReportTarget,
    ) -> Result<Option<SessionHeader>>;
    // 列出会话内所有评价行及其分类
    async fn list_session_lines(&self, key: &SessionKey) -> Result<Vec<ReportLine>>;
    // 列出某主体相关的所有评价行
    async fn list_history_rows(
        &self,
        subject_id: &str,
        role: HistoryRole,
    ) -> Result<Vec<EvaluationRow>>;
    // 列出测评下所有评价行
    async fn list_assessment_rows(&self, assessment_id: i64) -> Result<Vec<EvaluationRow>>;

    /// 用户目录方法
    // 批量获取用户
    async fn list_users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
