use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CartLine, OrderList, OrderPlaced, OrderWithItems, PlaceOrderRequest},
    entity::{
        OrderItems, Orders, Products, Users,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
        products::{ActiveModel as ProductActive, Column as ProdCol, Model as ProductModel},
        sea_orm_active_enums::{OrderStatus, PaymentStatus},
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{order_from_entity, order_item_from_entity},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::coupon_service,
    state::AppState,
};

const DEFAULT_PAYMENT_METHOD: &str = "card";

/// `ORD` + UTC date + 8 uppercase hex characters.
pub fn generate_order_number(now: DateTime<Utc>, seed: Uuid) -> String {
    let suffix: String = seed.simple().to_string().chars().take(8).collect();
    format!("ORD{}{}", now.format("%Y%m%d"), suffix.to_ascii_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    fn from_request(payload: &PlaceOrderRequest) -> Self {
        Self {
            subtotal: payload.subtotal,
            shipping: payload.shipping,
            tax: payload.tax,
            discount: payload.discount,
            total: payload.total,
        }
    }

    fn rounded(self) -> Self {
        Self {
            subtotal: self.subtotal.round_dp(2),
            shipping: self.shipping.round_dp(2),
            tax: self.tax.round_dp(2),
            discount: self.discount.round_dp(2),
            total: self.total.round_dp(2),
        }
    }
}

pub fn cart_subtotal(lines: &[(Decimal, i32)]) -> Decimal {
    lines
        .iter()
        .map(|(price, quantity)| *price * Decimal::from(*quantity))
        .sum::<Decimal>()
        .round_dp(2)
}

/// The submitted subtotal must match live prices and the total must add up.
pub fn verify_totals(submitted: OrderTotals, computed_subtotal: Decimal) -> AppResult<()> {
    let t = submitted.rounded();
    if t.subtotal != computed_subtotal.round_dp(2) {
        return Err(AppError::BadRequest(format!(
            "Subtotal mismatch: expected {}, got {}",
            computed_subtotal.round_dp(2),
            t.subtotal
        )));
    }
    let expected_total = t.subtotal + t.shipping + t.tax - t.discount;
    if expected_total.is_sign_negative() {
        return Err(AppError::BadRequest("Discount exceeds order value".into()));
    }
    if t.total != expected_total {
        return Err(AppError::BadRequest(format!(
            "Total mismatch: expected {expected_total}, got {}",
            t.total
        )));
    }
    Ok(())
}

/// Stock left after taking `requested` units, or a validation error when there is not enough.
pub fn remaining_stock(name: &str, stock: i32, requested: i64) -> AppResult<i32> {
    let left = i64::from(stock) - requested;
    if left < 0 {
        return Err(AppError::BadRequest(format!(
            "Insufficient stock for {name}: {stock} available, {requested} requested"
        )));
    }
    i32::try_from(left).map_err(|_| AppError::BadRequest("Quantity out of range".into()))
}

fn validate_cart(payload: &PlaceOrderRequest) -> AppResult<()> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order must contain at least one item".into()));
    }
    if payload.items.iter().any(|line| line.quantity <= 0) {
        return Err(AppError::BadRequest("Item quantity must be positive".into()));
    }
    let money = [
        payload.subtotal,
        payload.shipping,
        payload.tax,
        payload.discount,
        payload.total,
    ];
    if money.iter().any(Decimal::is_sign_negative) {
        return Err(AppError::BadRequest("Amounts must not be negative".into()));
    }
    let has_coupon = payload
        .coupon_code
        .as_deref()
        .is_some_and(|code| !code.trim().is_empty());
    if !has_coupon && !payload.discount.round_dp(2).is_zero() {
        return Err(AppError::BadRequest(
            "A discount requires a coupon code".into(),
        ));
    }
    if !payload.shipping_address.is_object() {
        return Err(AppError::BadRequest("shippingAddress must be an object".into()));
    }
    if payload
        .billing_address
        .as_ref()
        .is_some_and(|addr| !addr.is_object())
    {
        return Err(AppError::BadRequest("billingAddress must be an object".into()));
    }
    Ok(())
}

/// Requested quantity per product, ordered by id so rows are locked in a stable order.
fn requested_quantities(lines: &[CartLine]) -> BTreeMap<Uuid, i64> {
    let mut requested = BTreeMap::new();
    for line in lines {
        *requested.entry(line.product_id).or_insert(0) += i64::from(line.quantity);
    }
    requested
}

async fn lock_products(
    txn: &DatabaseTransaction,
    ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, ProductModel>> {
    let expected = ids.len();
    let rows: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(txn)
        .await?
        .into_iter()
        .filter(|p| p.is_active)
        .map(|p| (p.id, p))
        .collect();

    if rows.len() != expected {
        return Err(AppError::NotFound);
    }
    Ok(rows)
}

struct NewOrder {
    user_id: Uuid,
    totals: OrderTotals,
    shipping_address: Value,
    billing_address: Value,
    payment_method: String,
    coupon_code: Option<String>,
    notes: Option<String>,
}

impl NewOrder {
    fn active_model(&self, order_number: String) -> OrderActive {
        OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(self.user_id),
            order_number: Set(order_number),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            payment_method: Set(self.payment_method.clone()),
            subtotal: Set(self.totals.subtotal),
            shipping: Set(self.totals.shipping),
            tax: Set(self.totals.tax),
            discount: Set(self.totals.discount),
            total: Set(self.totals.total),
            shipping_address: Set(self.shipping_address.clone()),
            billing_address: Set(self.billing_address.clone()),
            coupon_code: Set(self.coupon_code.clone()),
            tracking_number: Set(None),
            notes: Set(self.notes.clone()),
            created_at: NotSet,
            updated_at: NotSet,
        }
    }
}

/// Insert under a savepoint so a duplicate order number can be retried once.
async fn insert_order(txn: &DatabaseTransaction, order: &NewOrder) -> AppResult<OrderModel> {
    let mut retried = false;
    loop {
        let order_number = generate_order_number(Utc::now(), Uuid::new_v4());
        let savepoint = txn.begin().await?;
        match order.active_model(order_number).insert(&savepoint).await {
            Ok(model) => {
                savepoint.commit().await?;
                return Ok(model);
            }
            Err(err) => {
                savepoint.rollback().await?;
                match AppError::from(err) {
                    AppError::Conflict(_) if !retried => {
                        tracing::warn!("order number collision, regenerating");
                        retried = true;
                    }
                    AppError::Conflict(_) => {
                        return Err(AppError::Conflict(
                            "Could not allocate an order number".into(),
                        ));
                    }
                    other => return Err(other),
                }
            }
        }
    }
}

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderPlaced>> {
    validate_cart(&payload)?;
    let requested = requested_quantities(&payload.items);

    let txn = state.orm.begin().await?;
    let products = lock_products(&txn, requested.keys().copied().collect()).await?;

    let mut remaining = Vec::new();
    for (product_id, quantity) in &requested {
        let product = products.get(product_id).ok_or(AppError::NotFound)?;
        if !product.pre_order {
            let left = remaining_stock(&product.name, product.stock_quantity, *quantity)?;
            remaining.push((product.clone(), left));
        }
    }

    let mut priced_lines = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let product = products.get(&line.product_id).ok_or(AppError::NotFound)?;
        priced_lines.push((product.price, line.quantity));
    }
    let computed_subtotal = cart_subtotal(&priced_lines);
    let totals = OrderTotals::from_request(&payload).rounded();
    verify_totals(totals, computed_subtotal)?;

    let coupon_code = match payload
        .coupon_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        Some(code) => {
            Some(coupon_service::redeem(&txn, code, computed_subtotal, totals.discount).await?)
        }
        None => None,
    };

    let billing_address = payload
        .billing_address
        .clone()
        .unwrap_or_else(|| payload.shipping_address.clone());
    let new_order = NewOrder {
        user_id: user.user_id,
        totals,
        shipping_address: payload.shipping_address.clone(),
        billing_address,
        payment_method: payload
            .payment_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD)
            .to_string(),
        coupon_code,
        notes: payload.notes.clone(),
    };
    let order = insert_order(&txn, &new_order).await?;

    let items: Vec<OrderItemActive> = payload
        .items
        .iter()
        .map(|line| {
            let product = products.get(&line.product_id);
            let price = product.map(|p| p.price).unwrap_or_default();
            let stock_reserved = product.is_some_and(|p| !p.pre_order);
            OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                price: Set(price),
                selected_size: Set(line.selected_size.clone()),
                selected_color: Set(line.selected_color.clone()),
                customization: Set(line.customization.clone()),
                stock_reserved: Set(stock_reserved),
                created_at: NotSet,
            }
        })
        .collect();
    let item_count = items.len();
    OrderItems::insert_many(items).exec(&txn).await?;

    let now = Utc::now();
    for (product, left) in remaining {
        let mut active: ProductActive = product.into();
        active.stock_quantity = Set(left);
        if left <= 0 {
            active.in_stock = Set(false);
        }
        active.updated_at = Set(now.into());
        active.update(&txn).await?;
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        items = item_count,
        total = %order.total,
        "order placed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "order_number": order.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed successfully",
        OrderPlaced {
            order_id: order.id,
            order_number: order.order_number,
        },
        Some(Meta::empty()),
    ))
}

/// Attach line items and customer details to each order.
pub async fn with_details<C: ConnectionTrait>(
    db: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let user_ids: Vec<Uuid> = orders
        .iter()
        .map(|o| o.user_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let mut items_by_order: HashMap<Uuid, Vec<_>> = HashMap::new();
    for (item, product) in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::CreatedAt)
        .find_also_related(Products)
        .all(db)
        .await?
    {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(order_item_from_entity(item, product));
    }

    let customers: HashMap<Uuid, _> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            let customer = customers.get(&order.user_id);
            OrderWithItems {
                item_count: items.len(),
                items,
                customer_name: customer.map(|c| c.full_name()),
                customer_email: customer.map(|c| c.email.clone()),
                order: order_from_entity(order),
            }
        })
        .collect())
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if !user.is_admin() {
        condition = condition.add(OrderCol::UserId.eq(user.user_id));
    }
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_details(&state.orm, orders).await?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|o| user.is_admin() || o.user_id == user.user_id)
        .ok_or(AppError::NotFound)?;

    let detailed = with_details(&state.orm, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Order", detailed, Some(Meta::empty())))
}
