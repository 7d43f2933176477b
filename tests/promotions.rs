mod common;

use chrono::{Duration, Utc};
use common::{create_user, dec, unique};
use jewelry_store_api::{
    dto::{
        coupons::{CreateCouponRequest, ValidateCouponRequest},
        offers::CreateOfferRequest,
    },
    entity::sea_orm_active_enums::{CouponKind, Role},
    error::AppError,
    services::{coupon_service, offer_service},
};

fn offer(title: &str, starts_in: Duration, ends_in: Duration) -> CreateOfferRequest {
    let now = Utc::now();
    CreateOfferRequest {
        title: title.to_string(),
        description: None,
        image_url: None,
        discount_percentage: Some(dec("15")),
        start_date: now + starts_in,
        end_date: now + ends_in,
    }
}

#[tokio::test]
async fn only_live_offers_are_listed() -> anyhow::Result<()> {
    let Some(state) = common::setup().await else {
        return Ok(());
    };
    let admin = create_user(&state, Role::Admin).await;

    let live = offer_service::create_offer(
        &state,
        &admin,
        offer(&unique("Live"), Duration::hours(-1), Duration::days(3)),
    )
    .await?
    .data
    .unwrap();
    let ended = offer_service::create_offer(
        &state,
        &admin,
        offer(&unique("Ended"), Duration::days(-10), Duration::days(-1)),
    )
    .await?
    .data
    .unwrap();
    let upcoming = offer_service::create_offer(
        &state,
        &admin,
        offer(&unique("Upcoming"), Duration::days(1), Duration::days(5)),
    )
    .await?
    .data
    .unwrap();

    let listed: Vec<_> = offer_service::list_active_offers(&state)
        .await?
        .data
        .unwrap()
        .items
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert!(listed.contains(&live.id));
    assert!(!listed.contains(&ended.id));
    assert!(!listed.contains(&upcoming.id));

    offer_service::deactivate_offer(&state, &admin, live.id).await?;
    let listed = offer_service::list_active_offers(&state).await?.data.unwrap().items;
    assert!(listed.iter().all(|o| o.id != live.id));

    let backwards = offer_service::create_offer(
        &state,
        &admin,
        offer("Backwards", Duration::days(2), Duration::days(1)),
    )
    .await;
    assert!(matches!(backwards, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn coupon_quotes_respect_caps_and_minimums() -> anyhow::Result<()> {
    let Some(state) = common::setup().await else {
        return Ok(());
    };
    let admin = create_user(&state, Role::Admin).await;
    let customer = create_user(&state, Role::Customer).await;
    let code = unique("gem").replace('-', "");

    let forbidden = coupon_service::list_coupons(&state, &customer).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    let coupon = coupon_service::create_coupon(
        &state,
        &admin,
        CreateCouponRequest {
            code: format!("  {code} "),
            description: Some("Quarter off, capped".into()),
            kind: CouponKind::Percentage,
            value: dec("25"),
            min_order_value: Some(dec("50")),
            max_discount: Some(dec("30")),
            usage_limit: None,
            expires_at: Some(Utc::now() + Duration::days(7)),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(coupon.code, code.to_uppercase());

    let quote = coupon_service::validate_coupon(
        &state,
        ValidateCouponRequest {
            code: code.clone(),
            subtotal: dec("80.00"),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(quote.discount, dec("20.00"));

    let capped = coupon_service::validate_coupon(
        &state,
        ValidateCouponRequest {
            code: code.clone(),
            subtotal: dec("400.00"),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(capped.discount, dec("30.00"));

    let too_small = coupon_service::validate_coupon(
        &state,
        ValidateCouponRequest {
            code: code.clone(),
            subtotal: dec("20.00"),
        },
    )
    .await;
    assert!(matches!(too_small, Err(AppError::BadRequest(_))));

    coupon_service::deactivate_coupon(&state, &admin, coupon.id).await?;
    let inactive = coupon_service::validate_coupon(
        &state,
        ValidateCouponRequest {
            code,
            subtotal: dec("80.00"),
        },
    )
    .await;
    assert!(matches!(inactive, Err(AppError::BadRequest(_))));

    let unknown = coupon_service::validate_coupon(
        &state,
        ValidateCouponRequest {
            code: unique("nope"),
            subtotal: dec("80.00"),
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::NotFound)));
    Ok(())
}
