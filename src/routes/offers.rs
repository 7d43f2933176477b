use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::offers::OfferList, error::AppResult, response::ApiResponse, services::offer_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_active_offers))
}

#[utoipa::path(
    get,
    path = "/api/offers",
    responses(
        (status = 200, description = "Offers running right now", body = ApiResponse<OfferList>)
    ),
    tag = "Offers"
)]
pub async fn list_active_offers(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<OfferList>>> {
    let resp = offer_service::list_active_offers(&state).await?;
    Ok(Json(resp))
}
