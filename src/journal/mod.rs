//! Durable append-only log of prompt/response entries.
//!
//! The log is a secondary record. Losing an entry is acceptable; blocking
//! publication or the sender's acknowledgment because of it is not.

pub mod appender;
pub mod entry;

pub use appender::LogAppender;
pub use entry::{LogEntry, header_markdown};
