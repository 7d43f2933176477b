use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod coupons;
pub mod doc;
pub mod health;
pub mod offers;
pub mod orders;
pub mod params;
pub mod products;
pub mod reviews;
pub mod search;
pub mod wishlist;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/reviews", reviews::router())
        .nest("/categories", categories::router())
        .nest("/search", search::router())
        .nest("/orders", orders::router())
        .nest("/wishlist", wishlist::router())
        .nest("/offers", offers::router())
        .nest("/coupons", coupons::router())
        .nest("/admin", admin::router())
}
