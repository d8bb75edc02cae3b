pub mod echo_generator;
pub mod http_generator;
