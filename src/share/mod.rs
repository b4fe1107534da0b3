//! Visitor-side share and download flow.
//!
//! A visit lands with a scan token and a hydrated campaign, lets the visitor
//! pick images and edit the caption locally, then shares or downloads. Every
//! action reports an analytics event without waiting for it.

mod flow;
mod runtime;
mod target;
mod visit;

pub use self::flow::{DownloadOutcome, FlowError, ShareFlow, ShareOutcome, ThankYou, OFFLINE_BANNER};
pub use self::runtime::{RuntimeError, SharePayload, SharedFile, ShareRuntime};
pub use self::target::{ShareLink, ShareTarget};
pub use self::visit::{Selection, Visit, VisitState, COPIED_CONFIRMATION};
