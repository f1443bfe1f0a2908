//! 预导入模块，方便使用

pub use super::assessment_details::{
    ActiveModel as AssessmentDetailActiveModel, Entity as AssessmentDetails,
    Model as AssessmentDetailModel,
};
pub use super::assessments::{
    ActiveModel as AssessmentActiveModel, Entity as Assessments, Model as AssessmentModel,
};
pub use super::evaluations::{
    ActiveModel as EvaluationActiveModel, Entity as Evaluations, Model as EvaluationModel,
};
pub use super::users::{Entity as Users, Model as UserModel};
