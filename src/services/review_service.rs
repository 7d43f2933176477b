use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::reviews::{CreateReviewRequest, ReviewList},
    entity::{
        OrderItems, Products, Reviews, Users,
        order_items::{Column as OrderItemCol, Relation as OrderItemRel},
        orders::Column as OrderCol,
        products::ActiveModel as ProductActive,
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol},
        sea_orm_active_enums::OrderStatus,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Review, review_from_entity},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Average rating (two decimals) and count for a set of review scores.
pub fn rating_summary(ratings: &[i16]) -> (f64, i32) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let avg = sum as f64 / ratings.len() as f64;
    ((avg * 100.0).round() / 100.0, ratings.len() as i32)
}

/// Refresh `rating` and `review_count` on the product row, which must already be locked.
async fn refresh_product_rating<C: ConnectionTrait>(db: &C, product_id: Uuid) -> AppResult<()> {
    let product = Products::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;

    let ratings: Vec<i16> = Reviews::find()
        .select_only()
        .column(ReviewCol::Rating)
        .filter(ReviewCol::ProductId.eq(product_id))
        .into_tuple()
        .all(db)
        .await?;
    let (rating, review_count) = rating_summary(&ratings);

    let mut active: ProductActive = product.into();
    active.rating = Set(rating);
    active.review_count = Set(review_count);
    active.update(db).await?;
    Ok(())
}

async fn has_purchased<C: ConnectionTrait>(db: &C, user_id: Uuid, product_id: Uuid) -> AppResult<bool> {
    let count = OrderItems::find()
        .join(sea_orm::JoinType::InnerJoin, OrderItemRel::Orders.def())
        .filter(OrderItemCol::ProductId.eq(product_id))
        .filter(OrderCol::UserId.eq(user_id))
        .filter(OrderCol::Status.ne(OrderStatus::Cancelled))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn list_reviews(state: &AppState, product_id: Uuid) -> AppResult<ApiResponse<ReviewList>> {
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::NotFound)?;

    let items = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .order_by_desc(ReviewCol::CreatedAt)
        .find_also_related(Users)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(review, author)| review_from_entity(review, author))
        .collect();

    Ok(ApiResponse::success("Reviews", ReviewList { items }, None))
}

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }

    let txn = state.orm.begin().await?;
    Products::find_by_id(product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::NotFound)?;

    let is_verified = has_purchased(&txn, user.user_id, product_id).await?;
    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(user.user_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())),
        images: Set(payload.images),
        is_verified: Set(is_verified),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    refresh_product_rating(&txn, product_id).await?;
    let author = Users::find_by_id(user.user_id).one(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review added",
        review_from_entity(review, author),
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let review = Reviews::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if review.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let txn = state.orm.begin().await?;
    Products::find_by_id(review.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    Reviews::delete_by_id(review.id).exec(&txn).await?;
    refresh_product_rating(&txn, review.product_id).await?;
    txn.commit().await?;

    tracing::debug!(review_id = %id, "review deleted");
    audit::record(
        &state.pool,
        user.user_id,
        "review_delete",
        "reviews",
        serde_json::json!({ "review_id": id, "product_id": review.product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::rating_summary;

    #[test]
    fn summary_of_no_reviews_is_zero() {
        assert_eq!(rating_summary(&[]), (0.0, 0));
    }

    #[test]
    fn summary_averages_and_rounds() {
        assert_eq!(rating_summary(&[5, 4, 4]), (4.33, 3));
        assert_eq!(rating_summary(&[5]), (5.0, 1));
    }
}
