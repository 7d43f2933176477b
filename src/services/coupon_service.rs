use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::coupons::{CouponList, CouponQuote, CreateCouponRequest, ValidateCouponRequest},
    entity::{
        Coupons,
        coupons::{ActiveModel as CouponActive, Column as CouponCol, Model as CouponModel},
        sea_orm_active_enums::CouponKind,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Coupon, coupon_from_entity},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Discount the coupon grants on `subtotal`, capped by `max_discount` and by the subtotal itself.
pub fn coupon_discount(coupon: &CouponModel, subtotal: Decimal) -> Decimal {
    let raw = match coupon.kind {
        CouponKind::Percentage => subtotal * coupon.value / Decimal::ONE_HUNDRED,
        CouponKind::Fixed => coupon.value,
    };
    let capped = match coupon.max_discount {
        Some(max) => raw.min(max),
        None => raw,
    };
    capped.min(subtotal).max(Decimal::ZERO).round_dp(2)
}

pub fn ensure_redeemable(
    coupon: &CouponModel,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !coupon.is_active {
        return Err(AppError::BadRequest("Coupon is not active".into()));
    }
    if let Some(expires_at) = coupon.expires_at {
        if expires_at.with_timezone(&Utc) <= now {
            return Err(AppError::BadRequest("Coupon has expired".into()));
        }
    }
    if let Some(limit) = coupon.usage_limit {
        if coupon.used_count >= limit {
            return Err(AppError::BadRequest("Coupon usage limit reached".into()));
        }
    }
    if let Some(min) = coupon.min_order_value {
        if subtotal < min {
            return Err(AppError::BadRequest(format!(
                "Coupon requires a minimum order of {min}"
            )));
        }
    }
    Ok(())
}

/// Lock the coupon inside `txn`, check the claimed discount and count one use.
/// Returns the stored code.
pub async fn redeem<C: ConnectionTrait>(
    txn: &C,
    code: &str,
    subtotal: Decimal,
    claimed_discount: Decimal,
) -> AppResult<String> {
    let coupon = Coupons::find()
        .filter(CouponCol::Code.eq(normalize_code(code)))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;

    ensure_redeemable(&coupon, subtotal, Utc::now())?;

    let allowed = coupon_discount(&coupon, subtotal);
    if claimed_discount.round_dp(2) > allowed {
        return Err(AppError::BadRequest(format!(
            "Discount exceeds what coupon {} allows ({allowed})",
            coupon.code
        )));
    }

    let code = coupon.code.clone();
    let used_count = coupon.used_count + 1;
    let mut active: CouponActive = coupon.into();
    active.used_count = Set(used_count);
    active.update(txn).await?;

    Ok(code)
}

/// Give back one use of `code` when the order that redeemed it is cancelled.
/// A coupon that has since been removed is ignored.
pub async fn release<C: ConnectionTrait>(txn: &C, code: &str) -> AppResult<()> {
    let Some(coupon) = Coupons::find()
        .filter(CouponCol::Code.eq(normalize_code(code)))
        .lock(LockType::Update)
        .one(txn)
        .await?
    else {
        tracing::warn!(code, "cancelled order references an unknown coupon");
        return Ok(());
    };

    let used_count = (coupon.used_count - 1).max(0);
    let mut active: CouponActive = coupon.into();
    active.used_count = Set(used_count);
    active.update(txn).await?;
    Ok(())
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;

    let code = normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("code is required".into()));
    }
    if payload.value <= Decimal::ZERO {
        return Err(AppError::BadRequest("value must be positive".into()));
    }
    if payload.kind == CouponKind::Percentage && payload.value > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(
            "percentage coupons cannot exceed 100".into(),
        ));
    }
    if payload.usage_limit.is_some_and(|limit| limit <= 0) {
        return Err(AppError::BadRequest("usageLimit must be positive".into()));
    }

    let coupon = CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        description: Set(payload.description),
        kind: Set(payload.kind),
        value: Set(payload.value.round_dp(2)),
        min_order_value: Set(payload.min_order_value),
        max_discount: Set(payload.max_discount),
        usage_limit: Set(payload.usage_limit),
        used_count: Set(0),
        is_active: Set(true),
        expires_at: Set(payload.expires_at.map(Into::into)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "coupon_create",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id, "code": coupon.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Coupon created",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn list_coupons(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CouponList>> {
    ensure_admin(user)?;
    let items = Coupons::find()
        .order_by_desc(CouponCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(coupon_from_entity)
        .collect();
    Ok(ApiResponse::success("Coupons", CouponList { items }, None))
}

pub async fn deactivate_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let coupon = Coupons::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: CouponActive = coupon.into();
    active.is_active = Set(false);
    let coupon = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "coupon_deactivate",
        "coupons",
        serde_json::json!({ "coupon_id": coupon.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Coupon deactivated",
        coupon_from_entity(coupon),
        Some(Meta::empty()),
    ))
}

pub async fn validate_coupon(
    state: &AppState,
    payload: ValidateCouponRequest,
) -> AppResult<ApiResponse<CouponQuote>> {
    if payload.subtotal.is_sign_negative() {
        return Err(AppError::BadRequest("subtotal must not be negative".into()));
    }
    let coupon = Coupons::find()
        .filter(CouponCol::Code.eq(normalize_code(&payload.code)))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    ensure_redeemable(&coupon, payload.subtotal, Utc::now())?;
    let discount = coupon_discount(&coupon, payload.subtotal);

    Ok(ApiResponse::success(
        "Coupon is valid",
        CouponQuote {
            code: coupon.code,
            discount,
        },
        None,
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon(kind: CouponKind, value: i64) -> CouponModel {
        CouponModel {
            id: Uuid::new_v4(),
            code: "SPARKLE".into(),
            description: None,
            kind,
            value: Decimal::new(value, 0),
            min_order_value: None,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            is_active: true,
            expires_at: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn percentage_discount_is_rounded() {
        let c = coupon(CouponKind::Percentage, 15);
        assert_eq!(coupon_discount(&c, Decimal::new(9999, 2)), Decimal::new(1500, 2));
    }

    #[test]
    fn discount_respects_caps() {
        let mut c = coupon(CouponKind::Percentage, 50);
        c.max_discount = Some(Decimal::new(20, 0));
        assert_eq!(coupon_discount(&c, Decimal::new(100, 0)), Decimal::new(20, 0));

        let fixed = coupon(CouponKind::Fixed, 30);
        assert_eq!(coupon_discount(&fixed, Decimal::new(12, 0)), Decimal::new(12, 0));
    }

    #[test]
    fn redeemability_rules() {
        let now = Utc::now();
        let subtotal = Decimal::new(100, 0);

        let mut c = coupon(CouponKind::Fixed, 5);
        assert!(ensure_redeemable(&c, subtotal, now).is_ok());

        c.expires_at = Some((now - Duration::hours(1)).into());
        assert!(ensure_redeemable(&c, subtotal, now).is_err());

        let mut c = coupon(CouponKind::Fixed, 5);
        c.usage_limit = Some(2);
        c.used_count = 2;
        assert!(ensure_redeemable(&c, subtotal, now).is_err());

        let mut c = coupon(CouponKind::Fixed, 5);
        c.min_order_value = Some(Decimal::new(150, 0));
        assert!(ensure_redeemable(&c, subtotal, now).is_err());

        let mut c = coupon(CouponKind::Fixed, 5);
        c.is_active = false;
        assert!(ensure_redeemable(&c, subtotal, now).is_err());
    }

    #[test]
    fn codes_are_case_insensitive() {
        assert_eq!(normalize_code("  sparkle10 "), "SPARKLE10");
    }
}
