pub mod generation_reqwest;
pub mod memory_dashmap;
pub mod passwords;
pub mod postgres_sqlx;
