//! The object model and scene services of a virtual-world region.
//!
//! A region holds [`ObjectGroup`]s of [`ObjectPart`]s, a parcel map and a
//! terrain heightmap. The [`Scene`] ties them together and answers every
//! authorization question through its `can_*` checks.
//!
//! # Concurrency
//!
//! State is shared behind `parking_lot` locks, fine-grained per object:
//! a part's scalar state, its shape and its localizations are locked
//! separately, and an [`ObjectUpdateInfo`] guards its kill flag on its own.
//! Nothing spans two objects. Locks are always taken in the order
//! update info, localizations, part state, shape, and are never held while
//! observers run.
//!
//! Observers and listeners are plain `Arc` handles in [`ObserverList`]s.
//! Dispatch walks a snapshot and a panicking observer is logged and skipped.

pub mod config;
mod error;
mod group;
mod localization;
mod observer;
pub mod parcel;
pub mod part;
pub mod permissions;
pub mod scene;
pub mod terrain;
mod types;
mod update;
mod xml;

pub use config::RegionConfig;
pub use error::{Error, Result};
pub use group::{GroupState, ObjectGroup, SaleType};
pub use localization::{
    CultureSelector, LocalizedProperty, LocalizedView, Localizations, ObjectPartLocalizedInfo,
    SoundParams, TextParams, UpdateBufferCache, UpdateKind,
};
pub use observer::{ObserverId, ObserverList};
pub use part::{ObjectPart, XmlOwnerMode};
pub use scene::Scene;
pub use types::{
    ChangedFlags, InventoryPermissionsMask, PermissionMasks, PrimitiveFlags, Ugi, Ugui,
};
pub use update::{ObjectUpdateInfo, PendingUpdate, UpdateQueue, UpdateScheduler};
pub use xml::{XmlNode, XmlOut};
