//! Local, in-memory emulator of the Firestore v1 gRPC API and the
//! Identity Toolkit (Firebase Auth) REST surface, for tests and local
//! development against `FIRESTORE_EMULATOR_HOST` /
//! `FIREBASE_AUTH_EMULATOR_HOST`.
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use firestore_emulator::{config::Config, store::Store};
//! use std::sync::Arc;
//!
//! let _config = Arc::new(Config::from_env());
//! let _store = Arc::new(Store::new());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth_emulator;
pub mod config;
pub mod document;
pub mod error;
pub mod geo_point;
pub mod id;
pub mod path;
pub mod pb;
pub mod query;
pub mod service;
pub mod store;
pub mod timestamp;
pub mod value;

pub use error::EmulatorError;
pub use service::FirestoreService;
