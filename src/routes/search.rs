use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::catalog::SearchResults, error::AppResult, response::ApiResponse,
    routes::params::SearchQuery, services::product_service, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search))
}

#[utoipa::path(
    get,
    path = "/api/search",
    params(("q" = Option<String>, Query, description = "Search term")),
    responses(
        (status = 200, description = "Up to 10 products and 5 categories", body = ApiResponse<SearchResults>)
    ),
    tag = "Products"
)]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<SearchResults>>> {
    let resp = product_service::search(&state, query.q.as_deref()).await?;
    Ok(Json(resp))
}
