//! # fm-gateway
//!
//! An authenticated-and-audited HTTP gateway for a face-match API,
//! featuring:
//!
//! - **Two auth schemes**: shared admin key for provisioning, caller key +
//!   short-lived JWT for business routes
//! - **Audit trail**: every `/api/v1` exchange recorded asynchronously,
//!   rejections included, without blocking the caller
//! - **Deterministic pipeline**: one explicit ordered middleware chain,
//!   request-scoped state in extensions, nothing global
//! - **Observability**: request IDs, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → Audit → Body Cache →      │
//! │              Admin Guard → Caller Guard)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, tokens, accounts, face-match, webhook)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Services (TokenService, AccountService, AuditWriter)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Storage traits + vendor seam (in-memory / sandbox impls)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fm_gateway::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config).await?;
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! The JWT secret is mandatory; admin routes stay closed without a key:
//! ```bash
//! JWT_SECRET=a-32-byte-minimum-signing-secret.. ADMIN_API_KEY=ADMIN9999AAAA000 cargo run
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod paths;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
pub mod token;
pub mod utils;
pub mod validation;
pub mod vendor;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use state::AppState;
