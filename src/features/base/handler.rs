use axum::{Router, extract::State, http::StatusCode, response::Json, routing::post};

use crate::error::AppError;
use crate::features::auth::AuthUser;
use crate::http::AppJson;
use crate::state::AppState;

use super::models::{LoadBaseRequest, LoadBaseResponse};
use super::resolver::{SaveStore, resolve_base_save};

#[utoipa::path(
    post,
    path = "/base/load",
    summary = "加载基地存档",
    description = "baseid 为 \"default\" 或等于自有存档 ID 时返回自己的存档（应用奖励平衡）；否则按 baseid 返回他人存档（原样）。用户尚无存档时自动创建默认存档。",
    request_body = LoadBaseRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "成功", body = LoadBaseResponse),
        (status = 401, description = "未认证", body = crate::error::ProblemDetails, content_type = "application/problem+json"),
        (status = 404, description = "目标存档不存在", body = crate::error::ProblemDetails, content_type = "application/problem+json"),
        (status = 422, description = "baseid 非法", body = crate::error::ProblemDetails, content_type = "application/problem+json")
    ),
    tag = "Base"
)]
pub async fn post_load_base(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<LoadBaseRequest>,
) -> Result<(StatusCode, Json<LoadBaseResponse>), AppError> {
    let user = state
        .storage
        .load_user_with_save(auth.userid)
        .await?
        .ok_or_else(|| AppError::Unauthorized("令牌对应的用户不存在".into()))?;

    let baseid = payload.baseid.into_text();
    tracing::debug!(
        "Base load | user: {} | baseid: {} | token jti: {}",
        auth.userid,
        baseid,
        auth.claims.jti
    );
    let resolved = resolve_base_save(&*state.storage, &*state.balancer, user, &baseid).await?;

    Ok((
        StatusCode::OK,
        Json(LoadBaseResponse {
            save: resolved.save,
            own: resolved.own,
        }),
    ))
}

pub fn create_base_router() -> Router<AppState> {
    Router::<AppState>::new().route("/base/load", post(post_load_base))
}
