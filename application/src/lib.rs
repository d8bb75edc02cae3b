#[cfg(any(
    feature = "adapters",
    feature = "axum",
    feature = "sqlx",
    feature = "reqwest"
))]
compile_error!("application must not depend on adapters/framework crates");

pub mod auth;
pub mod config;
pub mod credits;
pub mod error;
pub mod generation;
pub mod infrastructure_config;
pub mod ports;
pub mod reservations;

#[cfg(test)]
pub(crate) mod testing;
