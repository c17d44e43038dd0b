//! Metashift SQL - Statement execution surface and result model.
//!
//! Every Metashift component that talks to the data platform does so
//! through the [`SqlBackend`] trait defined here. Results come back as
//! [`Row`]s of named [`Value`]s, and failures are classified by
//! [`SqlError`]. The [`mock`] module provides a recording backend for
//! tests.

pub mod backend;
pub mod error;
pub mod mock;
pub mod row;

pub use backend::SqlBackend;
pub use error::SqlError;
pub use mock::MockBackend;
pub use row::{Row, Value};
