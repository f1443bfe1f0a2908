//! 用户目录存储操作

use super::SeaOrmStorage;
use crate::entity::users::{Column, Entity as Users};
use crate::errors::{EvalBookError, Result};
use crate::models::users::entities::User;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

impl SeaOrmStorage {
    /// 批量获取用户（ID 忽略首尾空白）
    pub async fn list_users_by_ids_impl(&self, user_ids: &[String]) -> Result<Vec<User>> {
        let ids: Vec<String> = user_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = Users::find()
            .filter(Column::BgnuId.is_in(ids))
            .all(&self.db)
            .await
            .map_err(|e| EvalBookError::database_operation(format!("批量查询用户失败: {e}")))?;

        Ok(results.into_iter().map(|m| m.into_user()).collect())
    }
}
