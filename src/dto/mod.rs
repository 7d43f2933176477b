pub mod auth;
pub mod catalog;
pub mod coupons;
pub mod dashboard;
pub mod offers;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod wishlist;
