//! Core types
//!
//! Canonical conversation representation (`ChatTurn`, `ContentPart`), the
//! caller-facing input shapes accepted by a session, and the option structs
//! passed to `create`/`prompt`/`clone`.

mod content;
mod input;
mod options;
mod request;

pub use content::*;
pub use input::*;
pub use options::*;
pub use request::*;
