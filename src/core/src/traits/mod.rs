//! Shared traits for permission dispatch

pub mod dispatch;

// Re-export commonly used traits
pub use dispatch::DispatchCheck;
