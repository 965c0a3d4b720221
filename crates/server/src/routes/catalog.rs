//! Public service catalog.
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use service::catalog;
use service::views::ServiceView;

use super::auth::ServerState;
use crate::errors::ApiResult;

#[derive(Debug, Deserialize, IntoParams)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[utoipa::path(get, path = "/api/services", tag = "catalog", responses((status = 200, description = "Active services", body = [ServiceView])))]
pub async fn list(State(state): State<ServerState>) -> ApiResult<Json<Vec<ServiceView>>> {
    Ok(Json(catalog::list_active(&state.db).await?))
}

#[utoipa::path(get, path = "/api/services/search", tag = "catalog", params(CategoryQuery), responses((status = 200, description = "Active services in the category", body = [ServiceView])))]
pub async fn search(
    State(state): State<ServerState>,
    Query(q): Query<CategoryQuery>,
) -> ApiResult<Json<Vec<ServiceView>>> {
    Ok(Json(catalog::search(&state.db, q.category.as_deref()).await?))
}

#[utoipa::path(get, path = "/api/services/categories", tag = "catalog", responses((status = 200, description = "Sorted distinct categories", body = [String])))]
pub async fn categories(State(state): State<ServerState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(catalog::categories(&state.db).await?))
}

#[utoipa::path(get, path = "/api/services/{id}", tag = "catalog", params(("id" = i32, Path, description = "Service id")), responses((status = 200, description = "Service", body = ServiceView), (status = 404, description = "Missing or inactive")))]
pub async fn get(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Json<ServiceView>> {
    Ok(Json(catalog::get_active(&state.db, id).await?))
}
