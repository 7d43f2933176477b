use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Alias, Expr, Func, OnConflict};
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        catalog::{
            CategoryList, CreateCategoryRequest, ProductList, SearchCategoryHit, SearchProductHit,
            SearchResults,
        },
        products::{NewProduct, ProductForm},
    },
    entity::{
        Categories, Products,
        categories::{ActiveModel as CategoryActive, Column as CatCol, Model as CategoryModel},
        products::{ActiveModel as ProductActive, Column as ProdCol},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product, category_from_entity, product_from_entity},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder, like_pattern},
    state::AppState,
    uploads::{self, ImageUpload},
};

const DEFAULT_PER_PAGE: i64 = 12;
const SEARCH_PRODUCT_LIMIT: u64 = 10;
const SEARCH_CATEGORY_LIMIT: u64 = 5;

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Case-insensitive substring match on name, description and tags.
fn product_text_match(pattern: &str) -> Condition {
    Condition::any()
        .add(Expr::col((Products, ProdCol::Name)).ilike(pattern))
        .add(Expr::col((Products, ProdCol::Description)).ilike(pattern))
        .add(
            Expr::expr(
                Func::cust(Alias::new("array_to_string"))
                    .arg(Expr::col((Products, ProdCol::Tags)))
                    .arg(Expr::val(" ")),
            )
            .ilike(pattern),
        )
}

fn sort_column(sort_by: ProductSortBy) -> ProdCol {
    match sort_by {
        ProductSortBy::CreatedAt => ProdCol::CreatedAt,
        ProductSortBy::UpdatedAt => ProdCol::UpdatedAt,
        ProductSortBy::Price => ProdCol::Price,
        ProductSortBy::Name => ProdCol::Name,
        ProductSortBy::Rating => ProdCol::Rating,
        ProductSortBy::ReviewCount => ProdCol::ReviewCount,
    }
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize_with_default(DEFAULT_PER_PAGE);
    let sort_col = sort_column(query.sort_by()?);
    let mut condition = Condition::all().add(ProdCol::IsActive.eq(true));

    if let Some(name) = non_blank(query.category.as_deref()) {
        let category = Categories::find()
            .filter(CatCol::Name.eq(name))
            .one(&state.orm)
            .await?;
        match category {
            Some(category) => condition = condition.add(ProdCol::CategoryId.eq(category.id)),
            None => {
                return Ok(ApiResponse::success(
                    "Products",
                    ProductList { items: Vec::new() },
                    Some(Meta::new(page, limit, 0)),
                ));
            }
        }
    }

    if let Some(search) = non_blank(query.search.as_deref()) {
        condition = condition.add(product_text_match(&like_pattern(search)));
    }

    let mut finder = Products::find().filter(condition);
    finder = match query.order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    finder = finder.order_by_asc(ProdCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .find_also_related(Categories)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(product, category)| product_from_entity(product, category))
        .collect();

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_product(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    let (product, category) = Products::find_by_id(id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let is_admin = viewer.is_some_and(AuthUser::is_admin);
    if !product.is_active && !is_admin {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product, category),
        None,
    ))
}

pub async fn search(state: &AppState, q: Option<&str>) -> AppResult<ApiResponse<SearchResults>> {
    let Some(term) = non_blank(q) else {
        return Ok(ApiResponse::success(
            "Search results",
            SearchResults {
                products: Vec::new(),
                categories: Vec::new(),
            },
            None,
        ));
    };
    let pattern = like_pattern(term);

    let products = Products::find()
        .filter(
            Condition::all()
                .add(ProdCol::IsActive.eq(true))
                .add(product_text_match(&pattern)),
        )
        .order_by_desc(ProdCol::ReviewCount)
        .order_by_asc(ProdCol::Name)
        .limit(SEARCH_PRODUCT_LIMIT)
        .find_also_related(Categories)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(p, category)| SearchProductHit {
            id: p.id,
            name: p.name,
            price: p.price,
            images: p.images,
            category: category.map(|c| c.name),
        })
        .collect();

    let categories = Categories::find()
        .filter(
            Condition::all()
                .add(CatCol::IsActive.eq(true))
                .add(Expr::col((Categories, CatCol::Name)).ilike(&pattern)),
        )
        .order_by_asc(CatCol::Name)
        .limit(SEARCH_CATEGORY_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|c| SearchCategoryHit {
            id: c.id,
            name: c.name,
        })
        .collect();

    Ok(ApiResponse::success(
        "Search results",
        SearchResults {
            products,
            categories,
        },
        None,
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let counts: HashMap<Uuid, i64> = Products::find()
        .select_only()
        .column(ProdCol::CategoryId)
        .column_as(Expr::col((Products, ProdCol::Id)).count(), "product_count")
        .filter(ProdCol::IsActive.eq(true))
        .group_by(ProdCol::CategoryId)
        .into_tuple::<(Uuid, i64)>()
        .all(&state.orm)
        .await?
        .into_iter()
        .collect();

    let items = Categories::find()
        .filter(CatCol::IsActive.eq(true))
        .order_by_asc(CatCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|c| {
            let count = counts.get(&c.id).copied().unwrap_or(0);
            category_from_entity(c, Some(count))
        })
        .collect();

    Ok(ApiResponse::success("Categories", CategoryList { items }, None))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let name = non_blank(Some(&payload.name))
        .ok_or_else(|| AppError::BadRequest("name is required".into()))?
        .to_string();

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(payload.description),
        image_url: Set(payload.image_url),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id, "name": category.name }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category, Some(0)),
        Some(Meta::empty()),
    ))
}

/// Look a category up by name, creating it when it does not exist yet.
async fn find_or_create_category<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> AppResult<CategoryModel> {
    let candidate = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        image_url: Set(None),
        is_active: Set(true),
        created_at: NotSet,
    };
    Categories::insert(candidate)
        .on_conflict(OnConflict::column(CatCol::Name).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;

    Categories::find()
        .filter(CatCol::Name.eq(name))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

async fn store_images(state: &AppState, images: Vec<ImageUpload>) -> AppResult<Vec<String>> {
    let mut urls = Vec::with_capacity(images.len());
    for image in images {
        urls.push(uploads::store_product_image(&state.config.upload_dir, image).await?);
    }
    Ok(urls)
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    form: ProductForm,
    images: Vec<ImageUpload>,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let NewProduct {
        name,
        description,
        price,
        original_price,
        category,
        in_stock,
        stock_quantity,
        pre_order,
        estimated_dispatch,
        materials,
        sizes,
        colors,
        tags,
        is_featured,
    } = form.into_new_product()?;

    let image_urls = store_images(state, images).await?;

    let txn = state.orm.begin().await?;
    let category = find_or_create_category(&txn, &category).await?;
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(description),
        price: Set(price),
        original_price: Set(original_price),
        category_id: Set(category.id),
        images: Set(image_urls),
        in_stock: Set(in_stock),
        stock_quantity: Set(stock_quantity),
        pre_order: Set(pre_order),
        estimated_dispatch: Set(estimated_dispatch),
        materials: Set(materials),
        sizes: Set(sizes),
        colors: Set(colors),
        tags: Set(tags),
        rating: Set(0.0),
        review_count: Set(0),
        is_featured: Set(is_featured),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created successfully",
        product_from_entity(product, Some(category)),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    form: ProductForm,
    images: Vec<ImageUpload>,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let patch = form.into_patch()?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_images = store_images(state, images).await?;

    let txn = state.orm.begin().await?;
    let category = match patch.category.as_deref() {
        Some(name) => Some(find_or_create_category(&txn, name).await?),
        None => None,
    };

    let mut all_images = existing.images.clone();
    all_images.extend(new_images);

    let mut active: ProductActive = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(name);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(price) = patch.price {
        active.price = Set(price);
    }
    if let Some(original_price) = patch.original_price {
        active.original_price = Set(Some(original_price));
    }
    if let Some(category) = &category {
        active.category_id = Set(category.id);
    }
    if let Some(in_stock) = patch.in_stock {
        active.in_stock = Set(in_stock);
    }
    if let Some(stock_quantity) = patch.stock_quantity {
        active.stock_quantity = Set(stock_quantity);
    }
    if let Some(pre_order) = patch.pre_order {
        active.pre_order = Set(pre_order);
    }
    if let Some(date) = patch.estimated_dispatch {
        active.estimated_dispatch = Set(Some(date));
    }
    if let Some(materials) = patch.materials {
        active.materials = Set(materials);
    }
    if let Some(sizes) = patch.sizes {
        active.sizes = Set(sizes);
    }
    if let Some(colors) = patch.colors {
        active.colors = Set(colors);
    }
    if let Some(tags) = patch.tags {
        active.tags = Set(tags);
    }
    if let Some(is_featured) = patch.is_featured {
        active.is_featured = Set(is_featured);
    }
    active.images = Set(all_images);
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&txn).await?;

    let category = match category {
        Some(category) => Some(category),
        None => Categories::find_by_id(product.category_id).one(&txn).await?,
    };
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product updated successfully",
        product_from_entity(product, category),
        Some(Meta::empty()),
    ))
}

/// Soft delete: historical order items keep pointing at the row.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ProductActive = existing.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted successfully",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}
