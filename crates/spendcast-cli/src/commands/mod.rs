//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Config command and shared input loading
//! - `forecast` - Spending forecast
//! - `classify` - Transaction classification listing

pub mod classify;
pub mod core;
pub mod forecast;

// Re-export command functions for main.rs
pub use classify::*;
pub use core::*;
pub use forecast::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
