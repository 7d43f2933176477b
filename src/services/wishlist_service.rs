use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use uuid::Uuid;

use crate::{
    dto::wishlist::{WishlistEntry, WishlistProductList},
    entity::{
        Products, WishlistItems,
        wishlist_items::{ActiveModel as WishlistActive, Column as WishlistCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_wishlist(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<WishlistProductList>> {
    let items = WishlistItems::find()
        .filter(WishlistCol::UserId.eq(user.user_id))
        .order_by_desc(WishlistCol::CreatedAt)
        .find_also_related(Products)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(entry, product)| {
            let product = product.filter(|p| p.is_active)?;
            Some(WishlistEntry {
                id: product.id,
                name: product.name,
                price: product.price,
                original_price: product.original_price,
                images: product.images,
                in_stock: product.in_stock,
                rating: product.rating,
                review_count: product.review_count,
                added_at: entry.created_at.with_timezone(&Utc),
            })
        })
        .collect();

    Ok(ApiResponse::success(
        "Wishlist",
        WishlistProductList { items },
        None,
    ))
}

/// Adding an entry that already exists is a no-op.
pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::NotFound)?;

    let entry = WishlistActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(product_id),
        created_at: NotSet,
    };
    WishlistItems::insert(entry)
        .on_conflict(
            OnConflict::columns([WishlistCol::UserId, WishlistCol::ProductId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&state.orm)
        .await?;

    tracing::debug!(user_id = %user.user_id, %product_id, "wishlist add");
    Ok(ApiResponse::success(
        "Added to wishlist",
        serde_json::json!({ "productId": product_id }),
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    WishlistItems::delete_many()
        .filter(WishlistCol::UserId.eq(user.user_id))
        .filter(WishlistCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Removed from wishlist",
        serde_json::json!({ "productId": product_id }),
        Some(Meta::empty()),
    ))
}
