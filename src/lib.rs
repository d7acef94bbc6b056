//! Synchronization engine for an academic timetable held in three places
//! at once: the relational store the admin application edits, a blob
//! store of canonical CSV documents, and the data directory of files the
//! external solving process reads and writes. The engine exports
//! relational state to CSV, imports CSV back (destructively or in
//! place), detects double bookings in a timetable document and keeps
//! named snapshots of the solver artifact.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod render;
pub mod services;
pub mod state;
pub mod tabular;

pub use error::AppError;
pub use state::AppState;
