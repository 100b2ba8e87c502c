pub mod health;
pub mod offices;
