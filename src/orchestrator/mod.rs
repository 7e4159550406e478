//! Run orchestration.
//!
//! [`Conductor`](conductor::Conductor) ties the command builder, the
//! process runner, and the session store together for one invocation.

pub mod conductor;

pub use conductor::{Conductor, Prepared};
