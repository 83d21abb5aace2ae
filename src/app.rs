//! HTTP 应用装配：路由、文档与全局中间件。
use axum::{Router, http::Uri, routing::get};
use tower_http::compression::CompressionLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::cors::build_cors_layer;
use crate::error::AppError;
use crate::features::{auth, base, health};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    SizeAbove::default()
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE)
        .and(NotForContentType::const_new("application/octet-stream"))
}

async fn fallback(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// 业务路由（不含前缀）
pub fn api_router() -> Router<AppState> {
    Router::<AppState>::new()
        .merge(auth::create_auth_router())
        .merge(base::create_base_router())
}

/// 组装完整应用：`/health`、`{api.prefix}/*` 业务接口、`/docs` 文档，外加 request_id、CORS 与压缩中间件。
pub fn build_app(state: AppState, config: &AppConfig) -> Router {
    let prefix = config.api.prefix.trim_end_matches('/');
    let routes = Router::<AppState>::new().route("/health", get(health::health_check));
    // axum 不允许在根路径 nest
    let routes = if prefix.is_empty() {
        routes.merge(api_router())
    } else {
        routes.nest(prefix, api_router())
    };

    let mut app = routes
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(fallback)
        .with_state(state)
        .layer(axum::middleware::from_fn(request_id_middleware));

    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }

    app.layer(CompressionLayer::new().compress_when(compression_predicate()))
}
