// MedBridge Domain
// Business logic of the intake workflow: validation, document extraction,
// share tokens and the patient-facing history views.

// Runtime configuration
pub mod config;

// Domain entities
pub mod entities;

// Medication extraction through a hosted model
pub mod extraction;

// Services that implement business logic
pub mod services;

// Audit trail of share-token activity
pub mod audit;

// Health checks and system status
pub mod health;

// Re-export the database module from the data crate for convenience
pub use medbridge_data::database;

// Testing utilities - available to dependants with the mock feature
#[cfg(any(test, feature = "mock"))]
pub mod testing;
