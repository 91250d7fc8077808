//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweep: removes physically expired keys from the in-memory backend

mod sweeper;

pub use sweeper::spawn_sweeper_task;
