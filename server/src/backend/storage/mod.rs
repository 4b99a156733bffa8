//! # Storage Module
//!
//! Persistence for birthday records. The domain layer only sees the
//! [`BirthdayStorage`] trait; the CSV backend is the shipped implementation.

pub mod csv;
pub mod traits;

pub use self::csv::{BirthdayRepository, CsvConnection};
pub use traits::BirthdayStorage;
