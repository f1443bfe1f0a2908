use serde::{Deserialize, Serialize};

/// 用户目录中的身份信息（认证由外部系统负责，这里只读）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub bgnu_id: String,
    pub full_name: String,
    pub designation: String,
}

