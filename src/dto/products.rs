use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Text fields of the multipart product form. Every value arrives as a string;
/// list fields are comma separated. File fields named `image*` are handled separately.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub category: Option<String>,
    pub in_stock: Option<String>,
    pub stock_quantity: Option<String>,
    pub pre_order: Option<String>,
    /// `YYYY-MM-DD`
    pub estimated_dispatch: Option<String>,
    pub materials: Option<String>,
    pub sizes: Option<String>,
    pub colors: Option<String>,
    pub tags: Option<String>,
    pub is_featured: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category: String,
    pub in_stock: bool,
    pub stock_quantity: i32,
    pub pre_order: bool,
    pub estimated_dispatch: Option<NaiveDate>,
    pub materials: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub tags: Vec<String>,
    pub is_featured: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub original_price: Option<Decimal>,
    pub category: Option<String>,
    pub in_stock: Option<bool>,
    pub stock_quantity: Option<i32>,
    pub pre_order: Option<bool>,
    pub estimated_dispatch: Option<NaiveDate>,
    pub materials: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub is_featured: Option<bool>,
}

impl ProductForm {
    /// Store a text field by its form name. Returns `false` for names the form does not know.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "name" => &mut self.name,
            "description" => &mut self.description,
            "price" => &mut self.price,
            "originalPrice" => &mut self.original_price,
            "category" => &mut self.category,
            "inStock" => &mut self.in_stock,
            "stockQuantity" => &mut self.stock_quantity,
            "preOrder" => &mut self.pre_order,
            "estimatedDispatch" => &mut self.estimated_dispatch,
            "materials" => &mut self.materials,
            "sizes" => &mut self.sizes,
            "colors" => &mut self.colors,
            "tags" => &mut self.tags,
            "isFeatured" => &mut self.is_featured,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    pub fn into_new_product(self) -> AppResult<NewProduct> {
        let name = required(self.name, "name")?;
        let description = required(self.description, "description")?;
        let category = required(self.category, "category")?;
        let price = parse_money(&required(self.price, "price")?, "price")?;

        Ok(NewProduct {
            name,
            description,
            price,
            original_price: parse_original_price(self.original_price.as_deref())?,
            category,
            in_stock: parse_flag(self.in_stock.as_deref(), "inStock")?.unwrap_or(true),
            stock_quantity: parse_stock(self.stock_quantity.as_deref())?.unwrap_or(0),
            pre_order: parse_flag(self.pre_order.as_deref(), "preOrder")?.unwrap_or(false),
            estimated_dispatch: parse_date(self.estimated_dispatch.as_deref())?,
            materials: self.materials.as_deref().map(split_list).unwrap_or_default(),
            sizes: self.sizes.as_deref().map(split_list).unwrap_or_default(),
            colors: self.colors.as_deref().map(split_list).unwrap_or_default(),
            tags: self.tags.as_deref().map(split_list).unwrap_or_default(),
            is_featured: parse_flag(self.is_featured.as_deref(), "isFeatured")?.unwrap_or(false),
        })
    }

    /// Blank values leave the stored field untouched.
    pub fn into_patch(self) -> AppResult<ProductPatch> {
        let price = match non_blank(self.price.as_deref()) {
            Some(raw) => Some(parse_money(raw, "price")?),
            None => None,
        };

        Ok(ProductPatch {
            name: non_blank(self.name.as_deref()).map(str::to_string),
            description: non_blank(self.description.as_deref()).map(str::to_string),
            price,
            original_price: parse_original_price(self.original_price.as_deref())?,
            category: non_blank(self.category.as_deref()).map(str::to_string),
            in_stock: parse_flag(self.in_stock.as_deref(), "inStock")?,
            stock_quantity: parse_stock(self.stock_quantity.as_deref())?,
            pre_order: parse_flag(self.pre_order.as_deref(), "preOrder")?,
            estimated_dispatch: parse_date(self.estimated_dispatch.as_deref())?,
            materials: non_blank(self.materials.as_deref()).map(split_list),
            sizes: non_blank(self.sizes.as_deref()).map(split_list),
            colors: non_blank(self.colors.as_deref()).map(split_list),
            tags: non_blank(self.tags.as_deref()).map(split_list),
            is_featured: parse_flag(self.is_featured.as_deref(), "isFeatured")?,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    non_blank(value.as_deref())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

fn parse_money(raw: &str, field: &str) -> AppResult<Decimal> {
    let value: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{field} must be a number")))?;
    if value.is_sign_negative() {
        return Err(AppError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(value.round_dp(2))
}

/// Zero means "no original price".
fn parse_original_price(raw: Option<&str>) -> AppResult<Option<Decimal>> {
    match non_blank(raw) {
        Some(raw) => {
            let value = parse_money(raw, "originalPrice")?;
            Ok((!value.is_zero()).then_some(value))
        }
        None => Ok(None),
    }
}

fn parse_flag(raw: Option<&str>, field: &str) -> AppResult<Option<bool>> {
    match non_blank(raw).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(None),
        Some("true" | "1" | "on" | "yes") => Ok(Some(true)),
        Some("false" | "0" | "off" | "no") => Ok(Some(false)),
        Some(_) => Err(AppError::BadRequest(format!("{field} must be true or false"))),
    }
}

fn parse_stock(raw: Option<&str>) -> AppResult<Option<i32>> {
    match non_blank(raw) {
        Some(raw) => {
            let value: i32 = raw
                .parse()
                .map_err(|_| AppError::BadRequest("stockQuantity must be an integer".into()))?;
            if value < 0 {
                return Err(AppError::BadRequest("stockQuantity must not be negative".into()));
            }
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn parse_date(raw: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match non_blank(raw) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::BadRequest("estimatedDispatch must be YYYY-MM-DD".into())),
        None => Ok(None),
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> ProductForm {
        let mut form = ProductForm::default();
        for (name, value) in fields {
            assert!(form.set_field(name, value.to_string()), "unknown field {name}");
        }
        form
    }

    #[test]
    fn new_product_from_full_form() {
        let product = form(&[
            ("name", "Pearl Drop Necklace"),
            ("description", "Freshwater pearls"),
            ("price", "129.5"),
            ("originalPrice", "150"),
            ("category", "Necklaces"),
            ("stockQuantity", "7"),
            ("preOrder", "false"),
            ("estimatedDispatch", "2026-11-02"),
            ("materials", "Sterling Silver, Pearl"),
            ("sizes", "16in,18in"),
            ("tags", "pearl,,gift"),
            ("isFeatured", "TRUE"),
        ])
        .into_new_product()
        .unwrap();

        assert_eq!(product.price, Decimal::new(12950, 2));
        assert_eq!(product.original_price, Some(Decimal::new(150, 0)));
        assert_eq!(product.stock_quantity, 7);
        assert!(product.in_stock);
        assert!(product.is_featured);
        assert_eq!(product.materials, vec!["Sterling Silver", "Pearl"]);
        assert_eq!(product.tags, vec!["pearl", "gift"]);
        assert!(product.colors.is_empty());
        assert_eq!(product.estimated_dispatch, NaiveDate::from_ymd_opt(2026, 11, 2));
    }

    #[test]
    fn new_product_requires_core_fields() {
        let err = form(&[("name", "Ring"), ("price", "10")])
            .into_new_product()
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("description")));
    }

    #[test]
    fn rejects_negative_and_malformed_values() {
        let base = [("name", "Ring"), ("description", "d"), ("category", "Rings")];

        let mut fields = base.to_vec();
        fields.push(("price", "-1"));
        assert!(form(&fields).into_new_product().is_err());

        let mut fields = base.to_vec();
        fields.extend([("price", "10"), ("stockQuantity", "-3")]);
        assert!(form(&fields).into_new_product().is_err());

        let mut fields = base.to_vec();
        fields.extend([("price", "10"), ("estimatedDispatch", "02/11/2026")]);
        assert!(form(&fields).into_new_product().is_err());

        let mut fields = base.to_vec();
        fields.extend([("price", "10"), ("inStock", "maybe")]);
        assert!(form(&fields).into_new_product().is_err());
    }

    #[test]
    fn zero_original_price_means_none() {
        let product = form(&[
            ("name", "Ring"),
            ("description", "d"),
            ("category", "Rings"),
            ("price", "10"),
            ("originalPrice", "0"),
        ])
        .into_new_product()
        .unwrap();
        assert_eq!(product.original_price, None);
    }

    #[test]
    fn patch_only_carries_provided_fields() {
        let patch = form(&[("price", "42.00"), ("sizes", "S,M"), ("name", "  ")])
            .into_patch()
            .unwrap();
        assert_eq!(patch.price, Some(Decimal::new(42, 0)));
        assert_eq!(patch.sizes, Some(vec!["S".to_string(), "M".to_string()]));
        assert_eq!(patch.name, None);
        assert_eq!(patch.in_stock, None);
        assert_eq!(patch.materials, None);
    }

    #[test]
    fn unknown_fields_are_reported() {
        let mut form = ProductForm::default();
        assert!(!form.set_field("discountCode", "x".into()));
    }
}
