pub mod admin_dto;
pub mod auth_dto;
pub mod common;
pub mod super_admin_dto;
pub mod visitor_dto;
