// ABOUTME: Library half of the weft CLI.
// ABOUTME: Replay driver and plain-text transcript rendering shared by the binary and tests.

//! # weft-cli
//!
//! ```text
//! weft
//! ├── replay <FILE>   # Feed recorded envelopes through a session
//! ├── init            # Write the default config file
//! └── version         # Show version info
//! ```

pub mod render;
pub mod replay;

pub use render::Transcript;
pub use replay::{replay, ReplayOptions, ReplayOutcome};
