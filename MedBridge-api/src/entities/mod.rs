pub mod common;
pub mod intake;

pub use common::{DeviceQuery, ErrorResponse, HospitalQuery, SuccessResponse};
pub use intake::{intake_request_from_fields, IntakeForm, DOCUMENTS_FIELD};
