use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::offers::{CreateOfferRequest, OfferList},
    entity::{
        Offers,
        offers::{ActiveModel as OfferActive, Column as OfferCol, Model as OfferModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Offer, offer_from_entity},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Active and `start <= now <= end`.
pub fn is_live(offer: &OfferModel, now: DateTime<Utc>) -> bool {
    offer.is_active
        && offer.start_date.with_timezone(&Utc) <= now
        && now <= offer.end_date.with_timezone(&Utc)
}

fn validate_offer(payload: &CreateOfferRequest) -> AppResult<()> {
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    if payload.end_date <= payload.start_date {
        return Err(AppError::BadRequest("endDate must be after startDate".into()));
    }
    if let Some(pct) = payload.discount_percentage {
        if pct.is_sign_negative() || pct > Decimal::ONE_HUNDRED {
            return Err(AppError::BadRequest(
                "discountPercentage must be between 0 and 100".into(),
            ));
        }
    }
    Ok(())
}

pub async fn list_active_offers(state: &AppState) -> AppResult<ApiResponse<OfferList>> {
    let now = Utc::now();
    let items = Offers::find()
        .filter(
            Condition::all()
                .add(OfferCol::IsActive.eq(true))
                .add(OfferCol::StartDate.lte(now))
                .add(OfferCol::EndDate.gte(now)),
        )
        .order_by_asc(OfferCol::EndDate)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter(|offer| is_live(offer, now))
        .map(offer_from_entity)
        .collect();

    Ok(ApiResponse::success("Offers", OfferList { items }, None))
}

pub async fn list_offers(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OfferList>> {
    ensure_admin(user)?;
    let items = Offers::find()
        .order_by_desc(OfferCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(offer_from_entity)
        .collect();
    Ok(ApiResponse::success("Offers", OfferList { items }, None))
}

pub async fn create_offer(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOfferRequest,
) -> AppResult<ApiResponse<Offer>> {
    ensure_admin(user)?;
    validate_offer(&payload)?;

    let offer = OfferActive {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        image_url: Set(payload.image_url),
        discount_percentage: Set(payload.discount_percentage.map(|d| d.round_dp(2))),
        start_date: Set(payload.start_date.into()),
        end_date: Set(payload.end_date.into()),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "offer_create",
        "offers",
        serde_json::json!({ "offer_id": offer.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Offer created",
        offer_from_entity(offer),
        Some(Meta::empty()),
    ))
}

pub async fn deactivate_offer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Offer>> {
    ensure_admin(user)?;
    let offer = Offers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: OfferActive = offer.into();
    active.is_active = Set(false);
    let offer = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "offer_deactivate",
        "offers",
        serde_json::json!({ "offer_id": offer.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Offer deactivated",
        offer_from_entity(offer),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn offer(start_offset_days: i64, end_offset_days: i64, now: DateTime<Utc>) -> OfferModel {
        OfferModel {
            id: Uuid::new_v4(),
            title: "Winter sparkle".into(),
            description: None,
            image_url: None,
            discount_percentage: Some(Decimal::new(20, 0)),
            start_date: (now + Duration::days(start_offset_days)).into(),
            end_date: (now + Duration::days(end_offset_days)).into(),
            is_active: true,
            created_at: now.into(),
        }
    }

    #[test]
    fn running_offer_is_live() {
        let now = Utc::now();
        assert!(is_live(&offer(-1, 1, now), now));
    }

    #[test]
    fn ended_or_future_offers_are_not_live() {
        let now = Utc::now();
        assert!(!is_live(&offer(-3, -1, now), now));
        assert!(!is_live(&offer(1, 3, now), now));
    }

    #[test]
    fn deactivated_offer_is_not_live() {
        let now = Utc::now();
        let mut o = offer(-1, 1, now);
        o.is_active = false;
        assert!(!is_live(&o, now));
    }

    #[test]
    fn offer_window_and_discount_are_validated() {
        let now = Utc::now();
        let mut req = CreateOfferRequest {
            title: "Sale".into(),
            description: None,
            image_url: None,
            discount_percentage: Some(Decimal::new(120, 0)),
            start_date: now,
            end_date: now + Duration::days(1),
        };
        assert!(validate_offer(&req).is_err());

        req.discount_percentage = Some(Decimal::new(25, 0));
        assert!(validate_offer(&req).is_ok());

        req.end_date = now - Duration::days(1);
        assert!(validate_offer(&req).is_err());
    }
}
