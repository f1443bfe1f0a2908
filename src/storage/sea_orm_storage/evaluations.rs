//! 评价存储操作
//!
//! 会话没有独立的表，所有查询都围绕 (assessment_id, evaluation_of, created_at)
//! 这一组合键展开。

use std::collections::HashMap;

use super::{SeaOrmStorage, is_lock_contention};
use crate::entity::assessment_details::{Column as DetailColumn, Entity as AssessmentDetails};
use crate::entity::assessments::{Column as AssessmentColumn, Entity as Assessments};
use crate::entity::evaluations::{ActiveModel, Column, Entity as Evaluations, Model};
use crate::errors::{EvalBookError, Result};
use crate::models::evaluations::entities::{
    CommitOutcome, EvaluationBatch, EvaluationRow, HistoryRole, ReportLine, ReportTarget,
    SessionHeader, SessionKey, SessionRef,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use tracing::{debug, error, warn};

/// 批次写入失败原因
enum BatchError {
    Db(DbErr),
    /// 分类不存在或不属于该测评
    Category(i64),
}

impl From<DbErr> for BatchError {
    fn from(err: DbErr) -> Self {
        BatchError::Db(err)
    }
}

/// 写锁竞争时的最大尝试次数
const MAX_COMMIT_ATTEMPTS: u32 = 3;

fn session_rows(key: &SessionKey) -> Select<Evaluations> {
    Evaluations::find()
        .filter(Column::AssessmentId.eq(key.assessment_id))
        .filter(Column::EvaluationOf.eq(key.student_id.as_str()))
        .filter(Column::CreatedAt.eq(key.timestamp_millis()))
}

/// 幂等检查：在给定连接（或事务）上查找已存在的会话
async fn find_session_on<C: ConnectionTrait>(
    conn: &C,
    key: &SessionKey,
) -> std::result::Result<Option<SessionRef>, DbErr> {
    let rows = session_rows(key)
        .order_by_asc(Column::Id)
        .all(conn)
        .await?;

    let Some(first) = rows.first() else {
        return Ok(None);
    };

    Ok(Some(SessionRef {
        assessment_id: key.assessment_id,
        student_id: key.student_id.clone(),
        evaluator_id: first.evaluated_by.clone(),
        session_timestamp: key.session_timestamp,
        first_row_id: Some(first.id),
        row_count: rows.len() as u64,
    }))
}

fn header_from(model: Model) -> SessionHeader {
    SessionHeader {
        anchor_row_id: model.id,
        key: SessionKey::from_stored(model.assessment_id, model.evaluation_of, model.created_at),
        evaluator_id: model.evaluated_by,
        assessment_title: None,
    }
}

impl SeaOrmStorage {
    /// 查找已存在的会话
    pub async fn find_existing_session_impl(&self, key: &SessionKey) -> Result<Option<SessionRef>> {
        find_session_on(&self.db, key)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("查询评价会话失败: {e}")))
    }

    /// 原子写入一个批次：全部写入或全部不写
    ///
    /// 写入失败时重新检查会话：并发重复提交中落败的一方返回已提交的会话。
    /// SQLite 写锁竞争且会话仍不存在时重试整个事务。
    pub async fn commit_evaluation_batch_impl(
        &self,
        batch: &EvaluationBatch,
    ) -> Result<CommitOutcome> {
        let mut attempt = 1;
        loop {
            let e = match self.write_batch(batch).await {
                Ok(outcome) => return Ok(outcome),
                Err(BatchError::Category(category_id)) => {
                    error!(
                        "Category {} does not belong to assessment {}, batch discarded",
                        category_id, batch.key.assessment_id
                    );
                    return Err(EvalBookError::persistence(format!(
                        "分类 {category_id} 不属于测评 {}",
                        batch.key.assessment_id
                    )));
                }
                Err(BatchError::Db(e)) => e,
            };

            if let Some(existing) = self.find_existing_session_impl(&batch.key).await? {
                debug!(
                    "Concurrent duplicate for assessment {} student {} resolved as replay: {}",
                    batch.key.assessment_id, batch.key.student_id, e
                );
                return Ok(CommitOutcome::Replayed(existing));
            }

            if is_lock_contention(&e) && attempt < MAX_COMMIT_ATTEMPTS {
                warn!(
                    "Evaluation batch for assessment {} student {} hit lock contention, retrying ({}/{})",
                    batch.key.assessment_id, batch.key.student_id, attempt, MAX_COMMIT_ATTEMPTS
                );
                attempt += 1;
                continue;
            }

            error!(
                "Failed to persist evaluation batch for assessment {} student {}: {}",
                batch.key.assessment_id, batch.key.student_id, e
            );
            return Err(EvalBookError::persistence(format!("写入评价失败: {e}")));
        }
    }

    async fn write_batch(
        &self,
        batch: &EvaluationBatch,
    ) -> std::result::Result<CommitOutcome, BatchError> {
        let txn = self.db.begin().await?;

        // 未提交的事务在离开作用域时自动回滚
        if let Some(existing) = find_session_on(&txn, &batch.key).await? {
            return Ok(CommitOutcome::Replayed(existing));
        }

        let category_ids: Vec<i64> = batch.items.iter().map(|item| item.category_id).collect();
        let categories: HashMap<i64, _> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            AssessmentDetails::find()
                .filter(DetailColumn::Id.is_in(category_ids))
                .all(&txn)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };

        let created_at = batch.key.timestamp_millis();
        let mut first_row_id = None;

        for item in &batch.items {
            let category = categories
                .get(&item.category_id)
                .filter(|c| c.assessment_id == batch.key.assessment_id)
                .ok_or(BatchError::Category(item.category_id))?;

            // 评语项只保留文本，评分项只保留分数
            let (marks, comment) = if category.is_comment {
                (0.0, Some(item.comment.clone().unwrap_or_default()))
            } else {
                (item.marks, None)
            };

            let row = ActiveModel {
                assessment_id: Set(batch.key.assessment_id),
                category_id: Set(item.category_id),
                marks: Set(marks),
                comment: Set(comment),
                evaluated_by: Set(batch.evaluator_id.clone()),
                evaluation_of: Set(batch.key.student_id.clone()),
                created_at: Set(created_at),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            first_row_id.get_or_insert(row.id);
        }

        txn.commit().await?;

        Ok(CommitOutcome::Committed(SessionRef {
            assessment_id: batch.key.assessment_id,
            student_id: batch.key.student_id.clone(),
            evaluator_id: batch.evaluator_id.clone(),
            session_timestamp: batch.key.session_timestamp,
            first_row_id,
            row_count: batch.items.len() as u64,
        }))
    }

    /// 定位报告所属会话
    pub async fn resolve_report_session_impl(
        &self,
        target: &ReportTarget,
    ) -> Result<Option<SessionHeader>> {
        let anchor = match target {
            ReportTarget::Row(row_id) => Evaluations::find_by_id(*row_id).one(&self.db).await,
            ReportTarget::Latest {
                assessment_id,
                student_id,
            } => {
                Evaluations::find()
                    .filter(Column::AssessmentId.eq(*assessment_id))
                    .filter(Column::EvaluationOf.eq(student_id.as_str()))
                    .order_by_desc(Column::CreatedAt)
                    .order_by_desc(Column::Id)
                    .one(&self.db)
                    .await
            }
            ReportTarget::Session(key) => {
                session_rows(key)
                    .order_by_asc(Column::Id)
                    .one(&self.db)
                    .await
            }
        }
        .map_err(|e| EvalBookError::database_operation(format!("查询评价记录失败: {e}")))?;

        let Some(anchor) = anchor else {
            return Ok(None);
        };

        let mut header = header_from(anchor);
        header.assessment_title = Assessments::find_by_id(header.key.assessment_id)
            .select_only()
            .column(AssessmentColumn::Title)
            .into_tuple::<String>()
            .one(&self.db)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("查询测评失败: {e}")))?;

        Ok(Some(header))
    }

    /// 会话内所有评价行，LEFT JOIN 分类（分类缺失时保留原始数据）
    pub async fn list_session_lines_impl(&self, key: &SessionKey) -> Result<Vec<ReportLine>> {
        let results = session_rows(key)
            .order_by_asc(Column::Id)
            .find_also_related(AssessmentDetails)
            .all(&self.db)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("查询会话明细失败: {e}")))?;

        Ok(results
            .into_iter()
            .map(|(row, category)| row.into_report_line(category))
            .collect())
    }

    /// 历史评价行（按行 ID 倒序）
    ///
    /// 学生视角按被评价人匹配；教师视角按评价人（忽略首尾空白）匹配，
    /// 并包含本人创建的测评下的所有评价。
    pub async fn list_history_rows_impl(
        &self,
        subject_id: &str,
        role: HistoryRole,
    ) -> Result<Vec<EvaluationRow>> {
        let subject_id = subject_id.trim();

        let condition = match role {
            HistoryRole::Student => Condition::all().add(Column::EvaluationOf.eq(subject_id)),
            HistoryRole::Teacher => {
                let owned: Vec<i64> = Assessments::find()
                    .filter(Expr::cust_with_values(
                        "TRIM(created_by) = ?",
                        [subject_id.to_string()],
                    ))
                    .select_only()
                    .column(AssessmentColumn::Id)
                    .into_tuple::<i64>()
                    .all(&self.db)
                    .await
                    .map_err(|e| {
                        EvalBookError::database_operation(format!("查询教师测评失败: {e}"))
                    })?;

                let mut any = Condition::any().add(Expr::cust_with_values(
                    "TRIM(evaluated_by) = ?",
                    [subject_id.to_string()],
                ));
                if !owned.is_empty() {
                    any = any.add(Column::AssessmentId.is_in(owned));
                }
                any
            }
        };

        let results = Evaluations::find()
            .filter(condition)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("查询评价历史失败: {e}")))?;

        debug!(
            "Loaded {} evaluation rows for {} {}",
            results.len(),
            role,
            subject_id
        );

        Ok(results.into_iter().map(|m| m.into_evaluation_row()).collect())
    }

    /// 测评下所有评价行（按行 ID 倒序）
    pub async fn list_assessment_rows_impl(&self, assessment_id: i64) -> Result<Vec<EvaluationRow>> {
        let results = Evaluations::find()
            .filter(Column::AssessmentId.eq(assessment_id))
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("查询测评评价失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_evaluation_row()).collect())
    }
}
