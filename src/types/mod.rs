pub mod alert;
pub mod item;
pub mod user;
