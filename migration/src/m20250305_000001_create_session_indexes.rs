use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ==================== 会话键索引 ====================
        // 会话由 (assessment_id, evaluation_of, created_at) 唯一确定，
        // 同一会话内每个分类最多一行，并发重复提交会在这里被拦下。
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_evaluations_session_category")
                    .table(Evaluations::Table)
                    .col(Evaluations::AssessmentId)
                    .col(Evaluations::EvaluationOf)
                    .col(Evaluations::CreatedAt)
                    .col(Evaluations::CategoryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 学生历史查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_evaluations_evaluation_of")
                    .table(Evaluations::Table)
                    .col(Evaluations::EvaluationOf)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_evaluations_evaluation_of")
                    .table(Evaluations::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("uq_evaluations_session_category")
                    .table(Evaluations::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Evaluations {
    #[sea_orm(iden = "evaluations")]
    Table,
    AssessmentId,
    CategoryId,
    EvaluationOf,
    CreatedAt,
}
