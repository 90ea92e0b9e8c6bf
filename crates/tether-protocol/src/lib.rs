//! Wire types shared by the bridge host and the client connector.
//!
//! Both ends of a tether connection exchange UTF-8 JSON values framed one
//! per line. The client sends [`CommandEnvelope`] frames and receives
//! [`ResponseEnvelope`] frames; the host does the reverse. The
//! [`framing`] module owns the delimiter handling so neither side needs
//! to reason about partial reads or pipelined frames.

mod catalog;
mod envelope;
mod framing;

pub use catalog::{CommandCatalog, CommandInfo};
pub use envelope::{CommandEnvelope, EnvelopeError, Params, ResponseEnvelope};
pub use framing::{FrameBuffer, FrameError, MAX_FRAME_BYTES, write_frame};
