use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    categories, coupons, offers, order_items, orders, products, reviews,
    sea_orm_active_enums::{CouponKind, OrderStatus, PaymentStatus, Role},
    users,
};

/// Public view of a user. The password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub product_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category_id: Uuid,
    pub category: Option<String>,
    pub images: Vec<String>,
    pub in_stock: bool,
    pub stock_quantity: i32,
    pub pre_order: bool,
    pub estimated_dispatch: Option<NaiveDate>,
    pub materials: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub tags: Vec<String>,
    pub rating: f64,
    pub review_count: i32,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    #[schema(value_type = Object)]
    pub shipping_address: Value,
    #[schema(value_type = Object)]
    pub billing_address: Value,
    pub coupon_code: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
    pub customization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub rating: i16,
    pub comment: Option<String>,
    pub images: Vec<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub discount_percentage: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

pub fn user_from_entity(model: users::Model) -> User {
    User {
        id: model.id,
        email: model.email,
        first_name: model.first_name,
        last_name: model.last_name,
        role: model.role,
        phone: model.phone,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn category_from_entity(model: categories::Model, product_count: Option<i64>) -> Category {
    Category {
        id: model.id,
        name: model.name,
        description: model.description,
        image_url: model.image_url,
        is_active: model.is_active,
        product_count,
    }
}

pub fn product_from_entity(model: products::Model, category: Option<categories::Model>) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        original_price: model.original_price,
        category_id: model.category_id,
        category: category.map(|c| c.name),
        images: model.images,
        in_stock: model.in_stock,
        stock_quantity: model.stock_quantity,
        pre_order: model.pre_order,
        estimated_dispatch: model.estimated_dispatch,
        materials: model.materials,
        sizes: model.sizes,
        colors: model.colors,
        tags: model.tags,
        rating: model.rating,
        review_count: model.review_count,
        is_featured: model.is_featured,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_from_entity(model: orders::Model) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        order_number: model.order_number,
        status: model.status,
        payment_status: model.payment_status,
        payment_method: model.payment_method,
        subtotal: model.subtotal,
        shipping: model.shipping,
        tax: model.tax,
        discount: model.discount,
        total: model.total,
        shipping_address: model.shipping_address,
        billing_address: model.billing_address,
        coupon_code: model.coupon_code,
        tracking_number: model.tracking_number,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_from_entity(
    model: order_items::Model,
    product: Option<products::Model>,
) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: product.map(|p| p.name),
        quantity: model.quantity,
        price: model.price,
        selected_size: model.selected_size,
        selected_color: model.selected_color,
        customization: model.customization,
    }
}

pub fn review_from_entity(model: reviews::Model, author: Option<users::Model>) -> Review {
    Review {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        user_name: author.map(|u| u.full_name()),
        rating: model.rating,
        comment: model.comment,
        images: model.images,
        is_verified: model.is_verified,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn coupon_from_entity(model: coupons::Model) -> Coupon {
    Coupon {
        id: model.id,
        code: model.code,
        description: model.description,
        kind: model.kind,
        value: model.value,
        min_order_value: model.min_order_value,
        max_discount: model.max_discount,
        usage_limit: model.usage_limit,
        used_count: model.used_count,
        is_active: model.is_active,
        expires_at: model.expires_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn offer_from_entity(model: offers::Model) -> Offer {
    Offer {
        id: model.id,
        title: model.title,
        description: model.description,
        image_url: model.image_url,
        discount_percentage: model.discount_percentage,
        start_date: model.start_date.with_timezone(&Utc),
        end_date: model.end_date.with_timezone(&Utc),
        is_active: model.is_active,
    }
}
