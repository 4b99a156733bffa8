//! # CSV Storage Module
//!
//! File-based storage for birthday records. All records live in a single
//! `birthdays.csv` under the data directory, rewritten atomically (temp file
//! plus rename) on every change.
//!
//! ## File Format
//!
//! ```csv
//! id,name,date,is_lunar,reminder_days_before,enabled,relationship,notes,sort_order,created_at
//! 1,Alice,1990-03-14,false,1,true,sister,,0,2024-01-15T10:30:00+00:00
//! ```
//!
//! Rows that fail to parse are hidden from reads but written back unchanged.
//! Ids are handed out from the counter in `next_id.txt` and never reused.

pub mod birthday_repository;
pub mod connection;

#[cfg(test)]
pub mod test_utils;

pub use birthday_repository::BirthdayRepository;
pub use connection::CsvConnection;
