pub mod error_code;
pub mod lenient;
pub mod response;
