use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::RateLimit;
use crate::models::assessments::requests::{AssessmentListParams, CreateAssessmentRequest};
use crate::services::AssessmentService;

// 懒加载的全局 AssessmentService 实例
static ASSESSMENT_SERVICE: Lazy<AssessmentService> = Lazy::new(AssessmentService::new_lazy);

// 列出测评
pub async fn list_assessments(
    req: HttpRequest,
    query: web::Query<AssessmentListParams>,
) -> ActixResult<HttpResponse> {
    ASSESSMENT_SERVICE
        .list_assessments(&req, query.into_inner())
        .await
}

// 创建测评
pub async fn create_assessment(
    req: HttpRequest,
    body: web::Json<CreateAssessmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSESSMENT_SERVICE
        .create_assessment(&req, body.into_inner())
        .await
}

// 获取测评分类
pub async fn list_categories(req: HttpRequest, path: web::Path<i64>) -> ActixResult<HttpResponse> {
    ASSESSMENT_SERVICE
        .list_categories(&req, path.into_inner())
        .await
}

// 获取测评下的评价会话
pub async fn list_sessions(req: HttpRequest, path: web::Path<i64>) -> ActixResult<HttpResponse> {
    ASSESSMENT_SERVICE
        .list_sessions(&req, path.into_inner())
        .await
}

// 配置路由
pub fn configure_assessments_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/assessments")
            .service(
                web::resource("")
                    .route(web::get().to(list_assessments))
                    // 创建测评 - 限流
                    .route(
                        web::post()
                            .to(create_assessment)
                            .wrap(RateLimit::assessment_create()),
                    ),
            )
            .service(web::resource("/{id}/categories").route(web::get().to(list_categories)))
            .service(web::resource("/{id}/sessions").route(web::get().to(list_sessions))),
    );
}
