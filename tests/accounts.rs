mod common;

use common::{ProductFixture, create_category, create_product, create_user, unique};
use jewelry_store_api::{
    dto::{
        auth::{LoginRequest, RegisterRequest},
        orders::{CartLine, PlaceOrderRequest},
        reviews::CreateReviewRequest,
    },
    entity::{WishlistItems, sea_orm_active_enums::Role, wishlist_items::Column as WishlistCol},
    error::AppError,
    middleware::auth::verify_token,
    services::{auth_service, order_service, product_service, review_service, wishlist_service},
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "correct horse battery".into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        phone: Some("  ".into()),
    }
}

fn review(rating: i16) -> CreateReviewRequest {
    CreateReviewRequest {
        rating,
        comment: Some("Lovely finish".into()),
        images: Vec::new(),
    }
}

#[tokio::test]
async fn register_then_login() -> anyhow::Result<()> {
    let Some(state) = common::setup().await else {
        return Ok(());
    };
    let email = format!("{}@Example.com", unique("Ada"));

    let registered = auth_service::register(&state, registration(&email))
        .await?
        .data
        .unwrap();
    assert_eq!(registered.user.email, email.to_lowercase());
    assert_eq!(registered.user.role, Role::Customer);
    assert_eq!(registered.user.phone, None);
    let claims = verify_token(&state.config, &registered.access_token)?;
    assert_eq!(claims.user_id, registered.user.id);

    let logged_in = auth_service::login(
        &state,
        LoginRequest {
            email: email.to_uppercase(),
            password: "correct horse battery".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(logged_in.user.id, registered.user.id);

    let wrong_password = auth_service::login(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "incorrect".into(),
        },
    )
    .await;
    assert!(matches!(wrong_password, Err(AppError::Unauthorized)));

    let unknown = auth_service::login(
        &state,
        LoginRequest {
            email: format!("{}@example.com", unique("ghost")),
            password: "whatever".into(),
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::Unauthorized)));

    let duplicate = auth_service::register(&state, registration(&email.to_lowercase())).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn wishlist_is_idempotent() -> anyhow::Result<()> {
    let Some(state) = common::setup().await else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await;
    let admin = create_user(&state, Role::Admin).await;
    let category = create_category(&state).await;
    let cuff = create_product(
        &state,
        &category,
        ProductFixture { name: "Silver Cuff", price: "70.00", stock: 2, pre_order: false },
    )
    .await;

    wishlist_service::add_to_wishlist(&state, &customer, cuff.id).await?;
    wishlist_service::add_to_wishlist(&state, &customer, cuff.id).await?;
    let listed = wishlist_service::list_wishlist(&state, &customer)
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, cuff.id);

    let missing = wishlist_service::add_to_wishlist(&state, &customer, uuid::Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    product_service::delete_product(&state, &admin, cuff.id).await?;
    let hidden = wishlist_service::list_wishlist(&state, &customer)
        .await?
        .data
        .unwrap()
        .items;
    assert!(hidden.is_empty());

    let stored = || {
        WishlistItems::find()
            .filter(WishlistCol::UserId.eq(customer.user_id))
            .filter(WishlistCol::ProductId.eq(cuff.id))
            .count(&state.orm)
    };
    assert_eq!(stored().await?, 1);

    wishlist_service::remove_from_wishlist(&state, &customer, cuff.id).await?;
    assert_eq!(stored().await?, 0);
    wishlist_service::remove_from_wishlist(&state, &customer, cuff.id).await?;
    assert_eq!(stored().await?, 0);
    Ok(())
}

#[tokio::test]
async fn reviews_update_product_rating() -> anyhow::Result<()> {
    let Some(state) = common::setup().await else {
        return Ok(());
    };
    let buyer = create_user(&state, Role::Customer).await;
    let browser = create_user(&state, Role::Customer).await;
    let category = create_category(&state).await;
    let locket = create_product(
        &state,
        &category,
        ProductFixture { name: "Oval Locket", price: "40.00", stock: 5, pre_order: false },
    )
    .await;

    order_service::place_order(
        &state,
        &buyer,
        PlaceOrderRequest {
            items: vec![CartLine {
                product_id: locket.id,
                quantity: 1,
                selected_size: None,
                selected_color: None,
                customization: Some("A.L.".into()),
            }],
            subtotal: common::dec("40.00"),
            shipping: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: common::dec("40.00"),
            shipping_address: serde_json::json!({ "city": "London" }),
            billing_address: None,
            payment_method: None,
            coupon_code: None,
            notes: None,
        },
    )
    .await?;

    let verified = review_service::create_review(&state, &buyer, locket.id, review(5))
        .await?
        .data
        .unwrap();
    assert!(verified.is_verified);
    assert_eq!(verified.user_name.as_deref(), Some("Test Shopper"));

    let unverified = review_service::create_review(&state, &browser, locket.id, review(4))
        .await?
        .data
        .unwrap();
    assert!(!unverified.is_verified);

    let out_of_range = review_service::create_review(&state, &browser, locket.id, review(6)).await;
    assert!(matches!(out_of_range, Err(AppError::BadRequest(_))));

    let product = product_service::get_product(&state, None, locket.id)
        .await?
        .data
        .unwrap();
    assert_eq!(product.review_count, 2);
    assert_eq!(product.rating, 4.5);

    let listed = review_service::list_reviews(&state, locket.id)
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(listed.len(), 2);

    let not_yours = review_service::delete_review(&state, &browser, verified.id).await;
    assert!(matches!(not_yours, Err(AppError::Forbidden)));

    review_service::delete_review(&state, &buyer, verified.id).await?;
    let product = product_service::get_product(&state, None, locket.id)
        .await?
        .data
        .unwrap();
    assert_eq!(product.review_count, 1);
    assert_eq!(product.rating, 4.0);
    Ok(())
}
