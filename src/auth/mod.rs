use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod memory;
pub mod password;
pub mod repo;
pub mod service;
pub mod session;

pub use service::AuthService;

pub fn router() -> Router<AppState> {
    handlers::router()
}
