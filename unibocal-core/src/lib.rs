//! Unibocal Core Library
//!
//! Turns Università di Bologna course timetables and exam records into
//! iCalendar documents: upstream providers, caching, subject filtering
//! and ICS synthesis.

pub mod aggregator;
pub mod cache;
pub mod course;
pub mod error;
pub mod event;
pub mod filter;
pub mod ics;
pub mod identity;
pub mod providers;
pub mod resolver;
pub mod service;
pub mod types;

// Re-export core types and error handling
pub use error::{Error, ErrorKind, Result};
pub use types::*;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        cache::*, course::*, filter::*, ics::*, providers::*, service::*, types::*,
    };
}
