#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rust_evalbook::config::DatabaseConfig;
use rust_evalbook::errors::{EvalBookError, Result};
use rust_evalbook::models::assessments::entities::{Category, NewAssessment, NewCategory};
use rust_evalbook::models::evaluations::requests::{
    ClientTimestamp, EvaluationRowInput, SubmitEvaluationRequest,
};
use rust_evalbook::services::notifications::{
    NotificationMessage, NotificationReceipt, Notifier,
};
use rust_evalbook::storage::Storage;
use rust_evalbook::storage::sea_orm_storage::SeaOrmStorage;
use tempfile::TempDir;

/// 临时 SQLite 数据库，TempDir 在测试结束时删除
pub struct TestDb {
    pub storage: SeaOrmStorage,
    _dir: TempDir,
}

impl TestDb {
    pub fn shared(&self) -> Arc<dyn Storage> {
        Arc::new(self.storage.clone())
    }
}

pub async fn open_db() -> TestDb {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = dir.path().join("evalbook.db").to_string_lossy().to_string();
    let storage = SeaOrmStorage::connect(&DatabaseConfig {
        url,
        pool_size: 4,
        timeout: 5,
    })
    .await
    .expect("open storage");
    TestDb { storage, _dir: dir }
}

/// 创建测评：两个评分项 (10, 5) 和一个评语项
pub async fn seed_assessment(storage: &dyn Storage, code: &str, owner: &str) -> (i64, Vec<Category>) {
    let resp = storage
        .create_assessment(NewAssessment {
            title: format!("Assessment {code}"),
            description: None,
            code: code.to_string(),
            created_by: owner.to_string(),
            categories: vec![
                NewCategory {
                    name: "Logic".into(),
                    max_marks: 10.0,
                    is_comment: false,
                },
                NewCategory {
                    name: "Style".into(),
                    max_marks: 5.0,
                    is_comment: false,
                },
                NewCategory {
                    name: "Remarks".into(),
                    max_marks: 0.0,
                    is_comment: true,
                },
            ],
        })
        .await
        .expect("seed assessment");
    (resp.assessment.id, resp.categories)
}

pub fn scored(category_id: i64, marks: f64) -> EvaluationRowInput {
    EvaluationRowInput {
        category_id: Some(category_id),
        marks,
        comment: None,
        is_comment: false,
    }
}

pub fn remark(category_id: i64, text: &str) -> EvaluationRowInput {
    EvaluationRowInput {
        category_id: Some(category_id),
        marks: 0.0,
        comment: Some(text.to_string()),
        is_comment: true,
    }
}

pub fn submission(
    assessment_id: i64,
    student_id: &str,
    evaluator_id: &str,
    timestamp: &str,
    rows: Vec<EvaluationRowInput>,
) -> SubmitEvaluationRequest {
    SubmitEvaluationRequest {
        assessment_id: Some(assessment_id),
        student_id: Some(student_id.to_string()),
        evaluator_id: Some(evaluator_id.to_string()),
        session_timestamp: Some(ClientTimestamp::Text(timestamp.to_string())),
        rows,
        device_id: None,
    }
}

/// 记录所有消息的推送实现
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<NotificationMessage>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &NotificationMessage) -> Result<NotificationReceipt> {
        self.sent.lock().expect("lock").push(message.clone());
        Ok(NotificationReceipt {
            id: Some("test".into()),
            recipients: 1,
        })
    }
}

/// 总是失败的推送实现
#[derive(Default)]
pub struct FailingNotifier {
    pub attempts: Mutex<usize>,
}

#[async_trait::async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _message: &NotificationMessage) -> Result<NotificationReceipt> {
        *self.attempts.lock().expect("lock") += 1;
        Err(EvalBookError::notification("provider unavailable"))
    }
}
