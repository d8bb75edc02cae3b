pub mod image_generation;
pub mod password_hasher;
pub mod profile_store;
pub mod reservation_store;
pub mod user_store;
