//! Object Forge SDK.
//!
//! [`Workspace`] is the entry point for hosts: it owns one metadata/sprite
//! pair, keeps thing references valid across sprite removal, moves single
//! things in and out as exchange containers, and runs the store-wide
//! passes (merge, optimize, frame group conversion). Hosts poll
//! [`Notification`]s instead of registering listeners.

pub mod config;
pub mod error;
pub mod notify;
pub mod otfi;
pub mod workspace;

pub use config::WorkspaceConfig;
pub use error::{SdkError, SdkResult};
pub use notify::{Change, Notification, Notifications};
pub use otfi::OtfiFile;
pub use workspace::{ObdExport, ObdImport, ReferenceWarning, SpriteRemoval, Workspace};

// Re-export key types
pub use forge_convert::{ConversionReport, ConvertOptions, Direction};
pub use forge_merge::MergeReport;
pub use forge_obd::ObdVersion;
pub use forge_optimize::{DurationBounds, DurationMode, DurationReport, DurationSettings, SpriteOptions, SpriteReport};
pub use forge_store::{Canvas, SpriteStore, ThingStore};
pub use forge_types::{
    ClientVersion, FormatFeatures, FrameGroup, FrameGroupType, ProgressEvent, ProgressKind,
    PropertyFilter, PropertyKind, SpriteId, SpriteRef, Thing, ThingCategory, ThingId,
    ThingProperty, VersionTable,
};
