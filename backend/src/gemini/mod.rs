pub mod gemini_service;
pub mod models;
