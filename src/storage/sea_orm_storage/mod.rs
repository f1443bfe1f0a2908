//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod assessments;
mod evaluations;
mod users;

use crate::config::{AppConfig, DatabaseConfig};
use crate::errors::{EvalBookError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例（使用全局配置）
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        Self::connect(&config.database).await
    }

    /// 按指定数据库配置连接并运行迁移
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db_url = Self::build_database_url(&config.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// 底层连接（用于运维脚本与测试数据准备）
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| EvalBookError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size.max(1))
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| EvalBookError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.pool_size)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.timeout))
            .acquire_timeout(Duration::from_secs(config.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| EvalBookError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(EvalBookError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

/// 唯一索引冲突（并发重复写入）
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// SQLite 写锁竞争（事务升级为写事务失败）
pub(crate) fn is_lock_contention(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("database is locked") || message.contains("database table is locked")
}

// Storage trait 实现
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
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 测评模块
    async fn create_assessment(
        &self,
        assessment: NewAssessment,
    ) -> Result<CreateAssessmentResponse> {
        self.create_assessment_impl(assessment).await
    }

    async fn get_assessment_by_id(&self, assessment_id: i64) -> Result<Option<Assessment>> {
        self.get_assessment_by_id_impl(assessment_id).await
    }

    async fn get_assessments_by_ids(&self, assessment_ids: &[i64]) -> Result<Vec<Assessment>> {
        self.get_assessments_by_ids_impl(assessment_ids).await
    }

    async fn list_assessments(&self, teacher_id: Option<&str>) -> Result<Vec<Assessment>> {
        self.list_assessments_impl(teacher_id).await
    }

    async fn list_categories(&self, assessment_id: i64) -> Result<Vec<Category>> {
        self.list_categories_impl(assessment_id).await
    }

    // 评价模块
    async fn find_existing_session(&self, key: &SessionKey) -> Result<Option<SessionRef>> {
        self.find_existing_session_impl(key).await
    }

    async fn commit_evaluation_batch(&self, batch: &EvaluationBatch) -> Result<CommitOutcome> {
        self.commit_evaluation_batch_impl(batch).await
    }

    async fn resolve_report_session(
        &self,
        target: &ReportTarget,
    ) -> Result<Option<SessionHeader>> {
        self.resolve_report_session_impl(target).await
    }

    async fn list_session_lines(&self, key: &SessionKey) -> Result<Vec<ReportLine>> {
        self.list_session_lines_impl(key).await
    }

    async fn list_history_rows(
        &self,
        subject_id: &str,
        role: HistoryRole,
    ) -> Result<Vec<EvaluationRow>> {
        self.list_history_rows_impl(subject_id, role).await
    }

    async fn list_assessment_rows(&self, assessment_id: i64) -> Result<Vec<EvaluationRow>> {
        self.list_assessment_rows_impl(assessment_id).await
    }

    // 用户模块
    async fn list_users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>> {
        self.list_users_by_ids_impl(user_ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_database_url() {
        assert_eq!(
            SeaOrmStorage::build_database_url("evalbook.db").unwrap(),
            "sqlite://evalbook.db?mode=rwc"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url("postgres://u:p@localhost/evalbook").unwrap(),
            "postgres://u:p@localhost/evalbook"
        );
        assert!(SeaOrmStorage::build_database_url("ftp://nowhere").is_err());
    }

    #[test]
    fn test_non_sql_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&DbErr::Custom("boom".into())));
    }

    #[test]
    fn test_lock_contention_detection() {
        assert!(is_lock_contention(&DbErr::Custom(
            "error returned from database: (code: 5) database is locked".into()
        )));
        assert!(!is_lock_contention(&DbErr::Custom("no such table".into())));
    }
}
