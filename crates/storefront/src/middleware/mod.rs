//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Rate limiting (governor), on cart mutations and checkout only
//!
//! Extractors: [`RequireAuth`] reads the logged-in user,
//! [`CartIdentity`] resolves the cart owner (user or guest).

pub mod auth;
pub mod identity;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{RequireAuth, set_current_user};
pub use identity::CartIdentity;
pub use rate_limit::cart_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use session::{create_session_layer, session_layer};
