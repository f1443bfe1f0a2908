use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::config::AppConfig;
use crate::middlewares::RateLimit;
use crate::models::evaluations::requests::{HistoryQuery, ReportQuery, SubmitEvaluationRequest};
use crate::services::EvaluationService;

// 懒加载的全局 EvaluationService 实例
static EVALUATION_SERVICE: Lazy<EvaluationService> = Lazy::new(EvaluationService::new_lazy);

// 提交评价
pub async fn submit_evaluation(
    req: HttpRequest,
    body: web::Json<SubmitEvaluationRequest>,
) -> ActixResult<HttpResponse> {
    EVALUATION_SERVICE
        .submit_evaluation(&req, body.into_inner())
        .await
}

// 获取报告（查询字符串）
pub async fn get_report(
    req: HttpRequest,
    query: web::Query<ReportQuery>,
) -> ActixResult<HttpResponse> {
    EVALUATION_SERVICE.get_report(&req, query.into_inner()).await
}

// 获取报告（JSON 请求体，兼容旧客户端）
pub async fn post_report(
    req: HttpRequest,
    body: web::Json<ReportQuery>,
) -> ActixResult<HttpResponse> {
    EVALUATION_SERVICE.get_report(&req, body.into_inner()).await
}

// 获取历史（查询字符串）
pub async fn get_history(
    req: HttpRequest,
    query: web::Query<HistoryQuery>,
) -> ActixResult<HttpResponse> {
    EVALUATION_SERVICE.get_history(&req, query.into_inner()).await
}

// 获取历史（JSON 请求体）
pub async fn post_history(
    req: HttpRequest,
    body: web::Json<HistoryQuery>,
) -> ActixResult<HttpResponse> {
    EVALUATION_SERVICE.get_history(&req, body.into_inner()).await
}

// 配置路由
pub fn configure_evaluations_routes(cfg: &mut web::ServiceConfig) {
    let submit_limit = AppConfig::get().evaluation.submit_rate_limit;

    cfg.service(
        web::scope("/api/v1/evaluations")
            .service(
                web::resource("")
                    // 提交评价 - 按设备/IP 限流，防止离线队列重试风暴
                    .wrap(RateLimit::evaluation_submit(submit_limit))
                    .route(web::post().to(submit_evaluation)),
            )
            .service(
                web::resource("/report")
                    .route(web::get().to(get_report))
                    .route(web::post().to(post_report)),
            )
            .service(
                web::resource("/history")
                    .route(web::get().to(get_history))
                    .route(web::post().to(post_history)),
            ),
    );
}
