use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        catalog::{
            CategoryList, CreateCategoryRequest, ProductList, SearchCategoryHit, SearchProductHit,
            SearchResults,
        },
        coupons::{CouponList, CouponQuote, CreateCouponRequest, ValidateCouponRequest},
        dashboard::{Dashboard, DashboardStats, RecentOrder, TopProduct},
        offers::{CreateOfferRequest, OfferList},
        orders::{
            CartLine, OrderList, OrderPlaced, OrderWithItems, PlaceOrderRequest,
            UpdateOrderStatusRequest,
        },
        products::ProductForm,
        reviews::{CreateReviewRequest, ReviewList},
        wishlist::{WishlistEntry, WishlistProductList},
    },
    entity::sea_orm_active_enums::{CouponKind, OrderStatus, PaymentStatus, Role},
    models::{Category, Coupon, Offer, Order, OrderItem, Product, Review, User},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, categories, coupons, health, offers, orders, params, products, reviews,
        search, wishlist,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::get_product,
        reviews::list_reviews,
        reviews::create_review,
        reviews::delete_review,
        categories::list_categories,
        search::search,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        offers::list_active_offers,
        coupons::validate_coupon,
        admin::dashboard,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::create_category,
        admin::update_order_status,
        admin::list_offers,
        admin::create_offer,
        admin::deactivate_offer,
        admin::list_coupons,
        admin::create_coupon,
        admin::deactivate_coupon
    ),
    components(
        schemas(
            User,
            Role,
            Category,
            Product,
            Order,
            OrderItem,
            OrderStatus,
            PaymentStatus,
            Review,
            Coupon,
            CouponKind,
            Offer,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            ProductForm,
            ProductList,
            CategoryList,
            CreateCategoryRequest,
            SearchProductHit,
            SearchCategoryHit,
            SearchResults,
            CartLine,
            PlaceOrderRequest,
            OrderPlaced,
            OrderWithItems,
            OrderList,
            UpdateOrderStatusRequest,
            WishlistEntry,
            WishlistProductList,
            CreateReviewRequest,
            ReviewList,
            CreateCouponRequest,
            ValidateCouponRequest,
            CouponQuote,
            CouponList,
            CreateOfferRequest,
            OfferList,
            DashboardStats,
            RecentOrder,
            TopProduct,
            Dashboard,
            params::Pagination,
            params::SortOrder,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<AuthResponse>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Products", description = "Catalog, categories and search"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Orders", description = "Order placement and history"),
        (name = "Wishlist", description = "Saved products"),
        (name = "Offers", description = "Promotional offers"),
        (name = "Coupons", description = "Coupon validation"),
        (name = "Admin", description = "Store administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/orders",
            "/api/products/{id}/reviews",
            "/api/admin/orders/{id}/status",
            "/api/wishlist/{product_id}",
            "/api/coupons/validate",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
