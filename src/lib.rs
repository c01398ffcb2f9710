// Reframe Manager - Library Entry Point

pub mod constants;
pub mod error;
pub mod hash;
pub mod fsops;
pub mod catalog;
pub mod reframe;
pub mod handoff;
pub mod cascade;
pub mod settings;

pub use catalog::{Catalog, CatalogEvent, FileKind, FileRecord, ReframeRecord, VideoAsset, VideoQuality};
pub use cascade::{rename_video, CascadeJournal};
pub use error::{ReframeError, Result};
pub use handoff::{EditHandoffCoordinator, EditorLauncher, HandoffSession, HandoffState, SystemLauncher};
pub use settings::Settings;
