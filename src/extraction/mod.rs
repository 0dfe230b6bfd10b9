//! Pure functions mapping `(title, aspects, description)` to domain attributes.
//! Every extractor here is deterministic and side-effect free — no I/O, no shared state.

pub mod constants;
pub mod gemstone;
pub mod html;
pub mod jewelry;
pub mod watch;
