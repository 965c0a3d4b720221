use axum::{extract::State, Extension, Json};

use service::views::{request_details, ProfessionalPublic, RequestDetail};
use service::{requests, users};

use super::auth::{CurrentUser, ServerState};
use crate::errors::ApiResult;

#[utoipa::path(get, path = "/api/professionals", tag = "public", responses((status = 200, description = "Approved professionals", body = [ProfessionalPublic])))]
pub async fn professionals(State(state): State<ServerState>) -> ApiResult<Json<Vec<ProfessionalPublic>>> {
    let pros = users::approved_professionals(&state.db).await?;
    Ok(Json(pros.iter().map(ProfessionalPublic::from).collect()))
}

/// Customers get their own requests, professionals the ones assigned to them.
#[utoipa::path(get, path = "/api/service-requests", tag = "public", security(("bearer" = [])), responses((status = 200, description = "Caller's requests", body = [RequestDetail]), (status = 400, description = "Admin caller")))]
pub async fn service_requests(
    State(state): State<ServerState>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<RequestDetail>>> {
    let rows = requests::list_for_user(&state.db, &me).await?;
    Ok(Json(request_details(&state.db, rows).await?))
}
