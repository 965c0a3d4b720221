//! `/api/professional`: routes for the `professional` role.
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use service::dashboard::{self, ProfessionalDashboard};
use service::requests::{self, ProfessionalQueue};
use service::users::{self, ProfileUpdate};
use service::views::{request_detail, request_details, RequestDetail, UserView};

use super::auth::{CurrentUser, ServerState};
use super::customer::StatusQuery;
use crate::errors::ApiResult;

#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteBody {
    pub final_price: Option<f64>,
}

#[utoipa::path(get, path = "/api/professional/dashboard", tag = "professional", security(("bearer" = [])), responses((status = 200, description = "Dashboard", body = ProfessionalDashboard)))]
pub async fn dashboard(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> ApiResult<Json<ProfessionalDashboard>> {
    Ok(Json(dashboard::professional_dashboard(&state.db, &me).await?))
}

/// `status` defaults to `pending`; `status=open` lists unclaimed requests for offered services.
#[utoipa::path(get, path = "/api/professional/requests", tag = "professional", security(("bearer" = [])), params(StatusQuery), responses((status = 200, description = "Requests", body = [RequestDetail]), (status = 400, description = "Invalid status")))]
pub async fn list_requests(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Query(q): Query<StatusQuery>,
) -> ApiResult<Json<Vec<RequestDetail>>> {
    let queue = ProfessionalQueue::parse(q.status.as_deref())?;
    let rows = requests::list_for_professional(&state.db, &me, queue).await?;
    Ok(Json(request_details(&state.db, rows).await?))
}

#[utoipa::path(post, path = "/api/professional/requests/{id}/accept", tag = "professional", security(("bearer" = [])), params(("id" = i32, Path, description = "Request id")), responses((status = 200, description = "Accepted", body = RequestDetail), (status = 400, description = "Not pending"), (status = 403, description = "Not approved or assigned elsewhere")))]
pub async fn accept(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> ApiResult<Json<RequestDetail>> {
    let accepted = requests::accept(&state.db, &me, id).await?;
    Ok(Json(request_detail(&state.db, accepted).await?))
}

#[utoipa::path(post, path = "/api/professional/requests/{id}/reject", tag = "professional", security(("bearer" = [])), params(("id" = i32, Path, description = "Request id")), responses((status = 200, description = "Rejected", body = RequestDetail), (status = 400, description = "Not pending"), (status = 403, description = "Assigned elsewhere")))]
pub async fn reject(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    body: Option<Json<RejectBody>>,
) -> ApiResult<Json<RequestDetail>> {
    let reason = body.and_then(|Json(b)| b.reason);
    let rejected = requests::reject(&state.db, &me, id, reason).await?;
    state.dashboard.invalidate().await;
    Ok(Json(request_detail(&state.db, rejected).await?))
}

#[utoipa::path(post, path = "/api/professional/requests/{id}/complete", tag = "professional", security(("bearer" = [])), params(("id" = i32, Path, description = "Request id")), responses((status = 200, description = "Completed", body = RequestDetail), (status = 400, description = "Not accepted"), (status = 403, description = "Not assigned to caller")))]
pub async fn complete(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    body: Option<Json<CompleteBody>>,
) -> ApiResult<Json<RequestDetail>> {
    let final_price = body.and_then(|Json(b)| b.final_price);
    let completed = requests::complete(&state.db, &me, id, final_price).await?;
    state.dashboard.invalidate().await;
    Ok(Json(request_detail(&state.db, completed).await?))
}

#[utoipa::path(get, path = "/api/professional/profile", tag = "professional", security(("bearer" = [])), responses((status = 200, description = "Profile", body = UserView)))]
pub async fn profile(Extension(CurrentUser(me)): Extension<CurrentUser>) -> Json<UserView> {
    Json(UserView::from(&me))
}

#[utoipa::path(put, path = "/api/professional/profile", tag = "professional", security(("bearer" = [])), request_body = crate::openapi::ProfileUpdateRequest, responses((status = 200, description = "Updated", body = UserView)))]
pub async fn update_profile(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<UserView>> {
    let updated = users::update_profile(&state.db, me.id, update).await?;
    Ok(Json(UserView::from(&updated)))
}
