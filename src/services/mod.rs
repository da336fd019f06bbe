pub mod admin_service;
pub mod user_service;
pub mod visit_service;
