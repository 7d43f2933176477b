use jewelry_store_api::{
    audit::{self, AuditEntry},
    config::AppConfig,
    db::{DbPool, create_orm_conn, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

const ADMIN_EMAIL: &str = "admin@jewelry.com";
const ADMIN_PASSWORD: &str = "admin123";
const CATEGORIES: [&str; 6] = ["Necklaces", "Bracelets", "Earrings", "Rings", "Watches", "Sets"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = orm.get_postgres_connection_pool().clone();

    let admin_id = ensure_admin(&pool).await?;
    let created = seed_categories(&pool).await?;

    audit::insert(
        &pool,
        &AuditEntry::system(
            "seed",
            "users",
            serde_json::json!({ "admin_id": admin_id, "categories_created": created }),
        ),
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    tracing::info!(%admin_id, categories_created = created, "seed completed");
    Ok(())
}

/// Create the admin account, or promote an existing user with that email.
async fn ensure_admin(pool: &DbPool) -> anyhow::Result<Uuid> {
    let password_hash =
        hash_password(ADMIN_PASSWORD).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role)
        VALUES ($1, $2, $3, 'Admin', 'User', 'admin')
        ON CONFLICT (email) DO UPDATE SET role = 'admin'
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(ADMIN_EMAIL)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    tracing::info!(email = ADMIN_EMAIL, "admin account ready");
    Ok(id)
}

async fn seed_categories(pool: &DbPool) -> anyhow::Result<u64> {
    let mut created = 0;
    for name in CATEGORIES {
        let inserted = sqlx::query(
            r#"
            INSERT INTO categories (id, name, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(format!("Beautiful {} collection", name.to_lowercase()))
        .execute(pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            tracing::info!(category = name, "category created");
            created += inserted;
        }
    }
    Ok(created)
}
