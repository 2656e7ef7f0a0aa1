// ABOUTME: Wire layer for the weft turn reducer
// ABOUTME: Decodes inbound envelopes into canonical events and models outbound commands

mod command;
mod decode;
mod envelope;
mod error;
mod event;

pub use command::{Consent, InputMetadata, OutboundCommand};
pub use decode::decode;
pub use envelope::Envelope;
pub use error::ProtoError;
pub use event::{ActivityKind, Event, EventKind, Metadata, MetadataStatus, ToolOutcome, TurnId};
