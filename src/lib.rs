//! devdb: subset a production database into a small, referentially
//! consistent and anonymized development copy, then replay it.
//!
//! The pipeline is [`spec`] → [`subset`] → [`dump`] → [`restore`], with
//! [`anonymize`] applied to every cell as it is serialized. Stores are
//! reached only through the traits in [`store`].

pub mod anonymize;
pub mod dialect;
pub mod dump;
pub mod error;
pub mod generate;
pub mod json_schema;
pub mod logging;
pub mod plan;
pub mod restore;
pub mod spec;
pub mod store;
pub mod subset;

pub use error::{Error, Result};
