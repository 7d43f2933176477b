pub mod categories;
pub mod coupons;
pub mod offers;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod sea_orm_active_enums;
pub mod users;
pub mod wishlist_items;

pub use categories::Entity as Categories;
pub use coupons::Entity as Coupons;
pub use offers::Entity as Offers;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;
pub use wishlist_items::Entity as WishlistItems;
