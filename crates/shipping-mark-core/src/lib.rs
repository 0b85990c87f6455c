//! Shipping Mark Core Library
//!
//! Generates shipping-mark labels by stamping per-box overlays onto template
//! PDFs:
//! - Country profiles with layout defaults and optional fields
//! - Page replication of 1- and 2-page templates
//! - Overlay compositing (page numbers, erase-and-redraw text, images)
//! - Batch orchestration against a total box budget

pub mod config;
pub mod error;
pub mod generator;
pub mod params;
pub mod pdf;
pub mod profile;
pub mod store;
pub mod util;

pub use config::{AppConfig, Color};
pub use error::{Error, Result};
pub use generator::{
    Batch, GeneratedDocument, GenerationJob, LabelGenerator, ProgressCallback, RunState,
};
pub use params::{EffectiveParams, ParameterOverlay, Rect};
pub use pdf::{ImageAsset, LabelCompositor, OverlayOptions, combine_pdfs};
pub use profile::{
    AddressMode, ExtraField, FieldValue, PageSize, Profile, ProfileTable, SKIP_ADDRESS,
    SelectableAddress,
};
pub use store::{DirectoryStore, MemoryStore, TemplateStore};
