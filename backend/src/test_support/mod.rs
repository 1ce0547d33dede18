//! Test utilities shared by unit tests (in `src/`) and integration tests
//! (in `tests/`). Compiled for tests and the `test-support` feature only.

pub mod clock;
pub mod fixtures;

pub use clock::MutableClock;
pub use fixtures::{GrantBuilder, UserBuilder, at_hour};
