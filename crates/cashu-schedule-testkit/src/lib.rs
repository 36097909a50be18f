//! # Cashu Schedule Testkit
//!
//! Testing utilities for Cashu Schedule.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: fixed inputs with known key encodings, event ids
//!   and NIP-44 payloads
//! - **Generators**: proptest strategies for tokens, delays and identities
//! - **Fixtures**: sender, recipient and scheduler identities plus in-memory
//!   relays
//!
//! ## Golden Vectors
//!
//! ```rust
//! use cashu_schedule_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, actual) in verify_all_vectors() {
//!     assert!(ok, "{name}: got {actual}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cashu_schedule_testkit::generators::{valid_token, valid_delay};
//!
//! proptest! {
//!     #[test]
//!     fn accepts_any_valid_token(token in valid_token(), delay in valid_delay()) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use cashu_schedule_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let request = fixture.request(60).unwrap();
//! assert_eq!(request.delay().minutes(), 60);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{relay_pool, TestFixture, SAMPLE_TOKEN};
pub use generators::{valid_delay, valid_token};
pub use vectors::{verify_all_vectors, EventIdVector, KeyVector, Nip19Vector, Nip44Vector};
