pub mod api;
pub mod entities;
pub mod openapi;
