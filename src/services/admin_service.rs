use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        dashboard::{Dashboard, DashboardStats, RecentOrder, TopProduct},
        orders::{OrderWithItems, UpdateOrderStatusRequest},
    },
    entity::{
        OrderItems, Orders, Products, Users,
        order_items::Column as OrderItemCol,
        orders::{ActiveModel as OrderActive, Column as OrderCol},
        products::{ActiveModel as ProductActive, Column as ProdCol},
        sea_orm_active_enums::OrderStatus,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    services::{coupon_service, order_service::with_details},
    state::AppState,
};

const RECENT_ORDERS: u64 = 5;
const TOP_PRODUCTS: u64 = 5;

pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Dashboard>> {
    ensure_admin(user)?;

    let (total_products,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE is_active")
            .fetch_one(&state.pool)
            .await?;
    let (total_orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    let (total_customers,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'customer'")
            .fetch_one(&state.pool)
            .await?;
    let (total_revenue,): (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total), 0)::NUMERIC(14, 2) FROM orders WHERE payment_status = 'paid'",
    )
    .fetch_one(&state.pool)
    .await?;

    let recent_orders = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .limit(RECENT_ORDERS)
        .find_also_related(Users)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(order, customer)| RecentOrder {
            id: order.id,
            order_number: order.order_number,
            customer_name: customer.map(|c| c.full_name()).unwrap_or_default(),
            total: order.total,
            status: order.status,
            created_at: order.created_at.with_timezone(&Utc),
        })
        .collect();

    let top_products = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .order_by_desc(ProdCol::ReviewCount)
        .order_by_desc(ProdCol::Rating)
        .limit(TOP_PRODUCTS)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| TopProduct {
            id: p.id,
            name: p.name,
            price: p.price,
            review_count: p.review_count,
            images: p.images,
        })
        .collect();

    let data = Dashboard {
        stats: DashboardStats {
            total_products,
            total_orders,
            total_customers,
            total_revenue,
        },
        recent_orders,
        top_products,
    };
    Ok(ApiResponse::success("Dashboard", data, None))
}

/// Stock after returning `quantity` units and whether the product is purchasable again.
pub fn restocked(stock: i32, quantity: i32) -> (i32, bool) {
    let stock = stock.saturating_add(quantity);
    (stock, stock > 0)
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let previous = existing.status;
    if previous == OrderStatus::Cancelled && payload.status != OrderStatus::Cancelled {
        return Err(AppError::BadRequest(
            "A cancelled order cannot be reopened".into(),
        ));
    }

    if payload.status == OrderStatus::Cancelled && previous != OrderStatus::Cancelled {
        let mut returned: BTreeMap<Uuid, i32> = BTreeMap::new();
        for item in OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(existing.id))
            .filter(OrderItemCol::StockReserved.eq(true))
            .all(&txn)
            .await?
        {
            *returned.entry(item.product_id).or_insert(0) += item.quantity;
        }

        let now = Utc::now();
        let products = Products::find()
            .filter(ProdCol::Id.is_in(returned.keys().copied().collect::<Vec<_>>()))
            .order_by_asc(ProdCol::Id)
            .lock(LockType::Update)
            .all(&txn)
            .await?;
        for product in products {
            let quantity = returned.get(&product.id).copied().unwrap_or(0);
            let (stock, in_stock) = restocked(product.stock_quantity, quantity);
            let mut active: ProductActive = product.into();
            active.stock_quantity = Set(stock);
            active.in_stock = Set(in_stock);
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
        }

        if let Some(code) = existing.coupon_code.as_deref() {
            coupon_service::release(&txn, code).await?;
        }
    }

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    if let Some(payment_status) = payload.payment_status {
        active.payment_status = Set(payment_status);
    }
    if let Some(tracking) = payload.tracking_number {
        active.tracking_number = Set(Some(tracking.trim().to_string()).filter(|t| !t.is_empty()));
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let detailed = with_details(&txn, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    txn.commit().await?;

    tracing::info!(order_id = %id, from = ?previous, to = ?detailed.order.status, "order status updated");
    audit::record(
        &state.pool,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({
            "order_id": id,
            "from": previous,
            "to": detailed.order.status,
            "payment_status": detailed.order.payment_status,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        detailed,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::restocked;

    #[test]
    fn restocking_a_sold_out_product_puts_it_back_on_sale() {
        assert_eq!(restocked(0, 2), (2, true));
        assert_eq!(restocked(3, 1), (4, true));
    }

    #[test]
    fn restocking_nothing_keeps_zero_stock_unavailable() {
        assert_eq!(restocked(0, 0), (0, false));
    }
}
