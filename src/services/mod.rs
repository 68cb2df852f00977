pub mod auth_service;
pub mod field_service;
pub mod plant_service;
pub mod sheets_service;
