pub mod profile_store_postgres;
pub mod reservation_store_postgres;
pub mod user_store_postgres;
pub mod utils;
