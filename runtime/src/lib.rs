//! # Fulfillment Runtime
//!
//! Imperative shell for the fulfillment core: executes commands against
//! persisted aggregates with optimistic concurrency, moves money through
//! the payment gateway capability, and publishes domain events.
//!
//! ## Execution Model
//!
//! ```text
//! ┌──────────────┐
//! │   Command    │
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌───────────────────────────┐
//! │ 1. Load aggregate snapshot │◄── order + returns, one version
//! └──────┬────────────────────┘
//!        │
//!        ▼
//! ┌───────────────────────────┐
//! │ 2. Validate + transition   │◄── pure core (fulfillment-core)
//! └──────┬────────────────────┘
//!        │
//!        ▼
//! ┌───────────────────────────┐
//! │ 3. Reconcile payout        │◄── gateway motions when status changes
//! └──────┬────────────────────┘
//!        │
//!        ▼
//! ┌───────────────────────────┐
//! │ 4. Commit (CAS on version) │──► conflict: re-read and retry (bounded)
//! └──────┬────────────────────┘
//!        │
//!        ▼
//! ┌───────────────────────────┐
//! │ 5. Publish events          │◄── best-effort, never rolls back
//! └───────────────────────────┘
//! ```
//!
//! Handlers are stateless and short-lived; concurrency comes solely from
//! multiple commands targeting the same order, which the version CAS
//! serializes.

pub mod config;
pub mod metrics;
pub mod retry;
pub mod service;

pub use config::ServiceConfig;
pub use retry::RetryPolicy;
pub use service::FulfillmentService;
