//! Engine output stream handling.
//!
//! - `codec`: [`JsonLinesCodec`](codec::JsonLinesCodec), the incremental
//!   JSON-Lines framing for child stdout.
//! - `normalizer`: maps engine-specific events onto
//!   [`StreamEvent`](crate::models::StreamEvent) and mines session ids.

pub mod codec;
pub mod normalizer;

pub use codec::{JsonLinesCodec, DEFAULT_MAX_FRAME_BYTES};
pub use normalizer::{extract_session_id, mine_session_id, normalize};
