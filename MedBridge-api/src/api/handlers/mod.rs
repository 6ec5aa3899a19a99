pub mod adherence;
pub mod health;
pub mod hospitals;
pub mod intakes;
pub mod notifications;
pub mod prescriptions;
pub mod tokens;
