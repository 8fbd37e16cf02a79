//! # Fulfillment Testing
//!
//! Deterministic test doubles for the fulfillment core and runtime:
//!
//! - [`FixedClock`] / [`AdjustableClock`]: reproducible time, including
//!   walking through payout hold windows and return expiry deadlines
//! - [`InMemoryRepository`]: `HashMap`-backed aggregate store with the same
//!   version compare-and-swap contract as a production database
//! - [`RecordingEventBus`]: captures publications for assertions
//! - [`StubPaymentGateway`]: records money motions and can be scripted to
//!   fail
//! - [`fixtures`]: ready-made orders, policies, and return inputs
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use fulfillment_testing::{
//!     fixtures, test_clock, InMemoryRepository, RecordingEventBus, StubPaymentGateway,
//! };
//!
//! let repository = Arc::new(InMemoryRepository::new());
//! let bus = Arc::new(RecordingEventBus::new());
//! let gateway = Arc::new(StubPaymentGateway::new());
//! let clock = Arc::new(test_clock());
//! // hand these to FulfillmentService::new(...)
//! # let _ = (repository, bus, gateway, clock);
//! ```

pub mod clock;
pub mod event_bus;
pub mod fixtures;
pub mod gateway;
pub mod repository;

pub use clock::{AdjustableClock, FixedClock, test_clock, test_epoch};
pub use event_bus::RecordingEventBus;
pub use gateway::{GatewayCall, StubPaymentGateway};
pub use repository::InMemoryRepository;
