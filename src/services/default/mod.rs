pub mod jwt_service;
pub mod logger;
