//! Detection history.
//!
//! A [`History`] record captures one completed detection: the submitted
//! image, the annotated image returned by the external detector, and the
//! faces it reported. Records are created by the detect endpoint, listed per
//! user, and deleted only by their owner.
//!
//! # Components
//!
//! - [`HistoryService`]: create / list / delete over a [`crate::store::HistoryStore`]
//! - [`can_delete`]: ownership rule applied before deletion
//! - [`ListPolicy`]: who may list another user's history

mod policy;
mod record;
mod service;

pub use policy::{can_delete, ListPolicy};
pub use record::{FaceBox, History, NewDetection, DEFAULT_DETECTION_METHOD, HISTORY_LIMIT};
pub use service::HistoryService;
