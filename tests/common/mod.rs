#![allow(dead_code)]

use std::path::PathBuf;

use jewelry_store_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        categories::{ActiveModel as CategoryActive, Model as CategoryModel},
        products::{ActiveModel as ProductActive, Model as ProductModel},
        sea_orm_active_enums::Role,
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

/// Connect and migrate, or `None` when no database is configured.
pub async fn setup() -> Option<AppState> {
    let Some(database_url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
        return None;
    };

    let orm = create_orm_conn(&database_url)
        .await
        .expect("connect to test database");
    MIGRATED
        .get_or_init(|| async {
            run_migrations(&orm).await.expect("run migrations");
        })
        .await;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "integration-test-secret".into(),
        jwt_ttl_hours: 1,
        upload_dir: std::env::temp_dir().join("jewelry-store-api-tests"),
        max_body_bytes: 1024 * 1024,
    };
    Some(AppState::new(orm, config))
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

pub async fn create_user(state: &AppState, role: Role) -> AuthUser {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{}@example.com", unique("user"))),
        password_hash: Set("not-a-real-hash".into()),
        first_name: Set("Test".into()),
        last_name: Set("Shopper".into()),
        role: Set(role),
        phone: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .expect("insert user");

    AuthUser {
        user_id: user.id,
        role: user.role,
    }
}

pub async fn create_category(state: &AppState) -> CategoryModel {
    CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(unique("Category")),
        description: Set(None),
        image_url: Set(None),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .expect("insert category")
}

pub struct ProductFixture<'a> {
    pub name: &'a str,
    pub price: &'a str,
    pub stock: i32,
    pub pre_order: bool,
}

pub async fn create_product(
    state: &AppState,
    category: &CategoryModel,
    fixture: ProductFixture<'_>,
) -> ProductModel {
    ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(fixture.name.to_string()),
        description: Set(format!("{} for tests", fixture.name)),
        price: Set(dec(fixture.price)),
        original_price: Set(None),
        category_id: Set(category.id),
        images: Set(vec![]),
        in_stock: Set(fixture.stock > 0 || fixture.pre_order),
        stock_quantity: Set(fixture.stock),
        pre_order: Set(fixture.pre_order),
        estimated_dispatch: Set(None),
        materials: Set(vec![]),
        sizes: Set(vec![]),
        colors: Set(vec![]),
        tags: Set(vec![]),
        rating: Set(0.0),
        review_count: Set(0),
        is_featured: Set(false),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .expect("insert product")
}
