use serde::Serialize;

use crate::errors::EvalBookError;

// 业务错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误 1xxx
    BadRequest = 1000,
    ValidationFailed = 1001,
    NotFound = 1004,
    RateLimitExceeded = 1029,
    InternalServerError = 1500,

    // 测评相关 2xxx
    AssessmentNotFound = 2004,
    AssessmentCreationFailed = 2005,

    // 评价相关 3xxx
    EvaluationSubmitFailed = 3001,
    ReportNotFound = 3004,
}

impl ErrorCode {
    /// 根据内部错误推断错误码
    ///
    /// `not_found` 用于资源不存在，`failure` 用于存储层失败
    pub fn from_error(err: &EvalBookError, not_found: ErrorCode, failure: ErrorCode) -> Self {
        match err {
            EvalBookError::Validation(_) | EvalBookError::DateParse(_) => {
                ErrorCode::ValidationFailed
            }
            EvalBookError::NotFound(_) => not_found,
            _ => failure,
        }
    }
}
