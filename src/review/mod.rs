//! Breakpoint review.
//!
//! A process pauses at a breakpoint and hands a [`BreakpointRequest`] to a
//! [`Reviewer`]. The run resumes once the reviewer returns a
//! [`ReviewDecision`]; decisions are recorded but advisory.

mod auto;
mod channel;
mod console;
mod types;

// Re-export key components
pub use auto::AutoReviewer;
pub use channel::ChannelReviewer;
pub use console::ConsoleReviewer;
pub use types::{BreakpointContext, BreakpointRequest, ReviewDecision, ReviewRecord, Reviewer};
