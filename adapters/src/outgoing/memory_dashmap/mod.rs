pub mod ledger_memory;
pub mod user_store_memory;
