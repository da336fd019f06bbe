pub mod crypto;
pub mod json;
pub mod jwt;
pub mod qr_code;
pub mod time;
pub mod validation;
