//! # What is it for?
//!
//! The pipeline module is the seam between a front end and the engine. The
//! host posts `Request` messages on a crossbeam channel and receives one
//! `Response` per request on another, in order. The engine task runs the
//! requested stage to completion and yields between messages so a host can
//! keep progress indicators moving; there is no pre-emption and no shared
//! state. Dropping the request sender shuts the engine task down, and a new
//! `run` starts from a clean store.

mod runner;
pub use self::runner::*;

/// One pipeline stage invocation.
#[derive(Clone, Debug)]
pub enum Request {
    /// Parse a config dump and build the object listings.
    MakeList { config: String },
    /// Render the normalized (unflattened) policy rows.
    Normalize,
    /// Rewrite the rows under the flatten toggles and cache them for
    /// lookup.
    Flatten { addresses: bool, services: bool },
    /// Run a lookup list against the cached flattened rows.
    Lookup {
        list: String,
        fqdn_geo_match_all: bool,
    },
}

/// The stage output paired to each `Request`.
#[derive(Clone, Debug)]
pub enum Response {
    MadeList { addresses: String, services: String },
    Normalized { text: String },
    Flattened { text: String },
    LookedUp {
        all: String,
        without_ineffectual: String,
    },
}

/// Runner is the user-facing entry point for driving an engine over
/// channels. Implementations own all engine state for the duration of the
/// run; the host keeps only the channel endpoints.
pub trait Runner {
    type Input;
    type Output;

    fn run(
        input_channel: crossbeam::Receiver<Self::Input>,
        output_channel: crossbeam::Sender<Self::Output>,
    );
}
