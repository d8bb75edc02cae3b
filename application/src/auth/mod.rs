pub mod password_validator;
pub mod service;
