//! Foundry Gateway - WebSocket campaign stream and REST endpoints

pub mod server;
pub mod ws;

pub use server::{build_router, start_gateway, ApiError, AppState};
