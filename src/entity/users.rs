//! 用户目录实体
//!
//! 表由外部系统维护，这里只读取姓名用于展示。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub bgnu_id: String,
    pub full_name: String,
    pub designation: String,
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_user(self) -> crate::models::users::entities::User {
        crate::models::users::entities::User {
            bgnu_id: self.bgnu_id,
            full_name: self.full_name,
            designation: self.designation,
        }
    }
}
