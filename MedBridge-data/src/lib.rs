// MedBridge Data
// Storage for intakes, extracted medications and share tokens

// Database connection management
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
