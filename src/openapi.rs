use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::{Modify, OpenApi};

/// 注入 Bearer（JWT）安全定义，供需要登录的接口引用。
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// 为 Swagger UI 提供正确的“业务接口前缀”Servers 配置。
///
/// - 业务接口默认前缀为 `/api/v1`（对应 `config.api.prefix` / `APP_API__PREFIX`）。
/// - `/health` 不带前缀，因此额外提供 `/` 作为备用 server。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api/v1）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api/v1")
                    .description(Some("业务接口前缀：对应 config.api.prefix")),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（用于 /health 等不带前缀接口）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::auth::handler::post_register,
        crate::features::auth::handler::post_login,
        crate::features::base::handler::post_load_base,
    ),
    components(schemas(
        crate::error::ProblemDetails,
        crate::error::ProblemFieldError,
        crate::features::auth::models::FilteredUser,
        crate::features::base::models::Save,
    )),
    modifiers(&BearerSecurity, &ApiServers),
    tags(
        (name = "Auth", description = "账号：注册与登录（签发 Bearer 令牌）。"),
        (
            name = "Base",
            description = "基地：加载自己的存档（自动创建默认存档）或访问他人基地。"
        ),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Base Backend API",
        version = env!("CARGO_PKG_VERSION"),
        description = "后端服务 API（Axum + utoipa）。除 /health 外，业务接口实际挂载在 `config.api.prefix`（默认 /api/v1）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;
