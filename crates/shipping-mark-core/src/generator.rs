//! Batch orchestration: validation, the running box counter and the
//! combined output.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::params::{EffectiveParams, ParameterOverlay};
use crate::pdf::{
    ImageAsset, LabelCompositor, OverlayOptions, combine_pdfs, first_page, replicate_pages,
};
use crate::profile::{Profile, ProfileTable};
use crate::store::{DirectoryStore, TemplateStore};
use crate::util::output_file_name;

/// Progress callback: `(batches_done, batch_count)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send>;

// =============================================================================
// Job Description
// =============================================================================

/// One template plus copy count within a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Template file name in the template store
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_copies")]
    pub copies: u32,
    /// Batch address for selectable-address profiles (`__SKIP__` to skip)
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
}

const fn default_copies() -> u32 {
    1
}

impl Batch {
    pub fn new(file: impl Into<String>, copies: u32) -> Self {
        Self {
            file: Some(file.into()),
            copies,
            address: None,
            batch_number: None,
        }
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn with_batch_number(mut self, number: impl Into<String>) -> Self {
        self.batch_number = Some(number.into());
        self
    }
}

/// A full generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Profile key
    pub profile: String,
    pub total_boxes: u32,
    #[serde(default, rename = "batch")]
    pub batches: Vec<Batch>,
    /// Overrides shared by every batch
    #[serde(default)]
    pub params: ParameterOverlay,
}

impl GenerationJob {
    pub fn new(profile: impl Into<String>, total_boxes: u32) -> Self {
        Self {
            profile: profile.into(),
            total_boxes,
            batches: Vec::new(),
            params: ParameterOverlay::default(),
        }
    }

    #[must_use]
    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.batches.push(batch);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: ParameterOverlay) -> Self {
        self.params = params;
        self
    }

    /// Load a job description from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read job file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigLoad(format!("Failed to parse job: {e}")))
    }
}

// =============================================================================
// Run State
// =============================================================================

/// Box counter of one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    /// Number printed on the next page
    next_box: u32,
    total_boxes: u32,
}

impl RunState {
    pub const fn new(total_boxes: u32) -> Self {
        Self {
            next_box: 1,
            total_boxes,
        }
    }

    pub const fn next_box(&self) -> u32 {
        self.next_box
    }

    pub const fn total_boxes(&self) -> u32 {
        self.total_boxes
    }

    /// Boxes not yet numbered.
    pub const fn remaining(&self) -> u32 {
        self.total_boxes.saturating_add(1).saturating_sub(self.next_box)
    }

    /// Check a batch's copy count against the budget. `batch` is 1-based.
    pub fn reserve(&self, batch: usize, copies: u32) -> Result<NonZeroUsize> {
        let remaining = self.remaining();
        if copies > remaining {
            return Err(Error::BoxBudgetExceeded {
                batch,
                requested: copies,
                remaining,
            });
        }
        usize::try_from(copies)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(Error::InvalidCopyCount { batch, copies })
    }

    /// Move the counter past `pages` numbered pages.
    pub fn advance(&mut self, pages: usize) -> Result<()> {
        let pages = u32::try_from(pages)
            .map_err(|_| Error::InvalidBoxCount(format!("page count {pages} out of range")))?;
        self.next_box = self.next_box.saturating_add(pages);
        Ok(())
    }
}

// =============================================================================
// Generator
// =============================================================================

/// A rendered label document.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub pdf_bytes: Vec<u8>,
    pub page_count: usize,
    /// Suggested download name
    pub file_name: String,
}

/// High-level label generator over a profile table and a template store.
#[derive(Clone)]
pub struct LabelGenerator {
    profiles: Arc<ProfileTable>,
    store: Arc<dyn TemplateStore>,
    config: AppConfig,
}

impl LabelGenerator {
    /// Generator reading templates from `config.template_dir`, with the
    /// profile table from `config.profiles_file` or the built-in one.
    pub fn new(config: AppConfig) -> Result<Self> {
        let profiles = match &config.profiles_file {
            Some(path) => ProfileTable::from_file(path)?,
            None => ProfileTable::builtin()?,
        };
        let store: Arc<dyn TemplateStore> = Arc::new(DirectoryStore::new(&config.template_dir));
        debug!(
            "Loaded {} profiles, templates from {}",
            profiles.len(),
            config.template_dir.display()
        );

        Ok(Self {
            profiles: Arc::new(profiles),
            store,
            config,
        })
    }

    /// Replace the template store
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TemplateStore>) -> Self {
        self.store = store;
        self
    }

    pub fn profiles(&self) -> &ProfileTable {
        &self.profiles
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Template names available to batches.
    pub fn templates(&self) -> Result<Vec<String>> {
        self.store.list()
    }

    /// Generate the combined label document for a job.
    pub fn generate(&self, job: &GenerationJob) -> Result<GeneratedDocument> {
        self.generate_with_progress(job, None)
    }

    /// Generate, reporting progress after every batch.
    ///
    /// Any error aborts the whole run; nothing is returned for the batches
    /// that were already composed.
    pub fn generate_with_progress(
        &self,
        job: &GenerationJob,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<GeneratedDocument> {
        let profile = self.profiles.get(&job.profile)?;
        if job.total_boxes < 1 {
            return Err(Error::InvalidBoxCount(
                "total boxes must be at least 1".to_string(),
            ));
        }
        if job.batches.is_empty() {
            return Err(Error::InvalidBoxCount(
                "at least one batch is required".to_string(),
            ));
        }

        info!(
            "Generating {} labels for {} in {} batches",
            job.total_boxes,
            profile.name,
            job.batches.len()
        );

        let compositor = self.compositor_for(profile);
        let mut state = RunState::new(job.total_boxes);
        let mut documents = Vec::with_capacity(job.batches.len());
        let mut page_count = 0;

        for (i, batch) in job.batches.iter().enumerate() {
            let index = i + 1;
            let template = self.template(index, batch)?;
            let params = EffectiveParams::resolve(
                profile,
                &job.params,
                batch.address.as_deref(),
                batch.batch_number.as_deref(),
            );
            let copies = state.reserve(index, batch.copies)?;

            let replicated = replicate_pages(&template, copies)?;
            let composed =
                compositor.compose(&replicated, &params, state.next_box(), state.total_boxes())?;

            debug!(
                "Batch {}: {} pages starting at box {}",
                index,
                composed.page_count,
                state.next_box()
            );
            state.advance(composed.page_count)?;
            page_count += composed.page_count;
            documents.push(composed.pdf_bytes);

            if let Some(ref callback) = progress_callback {
                callback(index, job.batches.len());
            }
        }

        let pdf_bytes = combine_pdfs(&documents)?;
        if state.remaining() > 0 {
            info!(
                "{} of {} boxes left unnumbered",
                state.remaining(),
                job.total_boxes
            );
        }

        Ok(GeneratedDocument {
            pdf_bytes,
            page_count,
            file_name: output_file_name(&profile.name, &chrono::Local::now()),
        })
    }

    /// Render the first page of the job's first batch, numbered
    /// `1` of `total_boxes`.
    pub fn preview(&self, job: &GenerationJob) -> Result<GeneratedDocument> {
        let profile = self.profiles.get(&job.profile)?;
        if job.total_boxes < 1 {
            return Err(Error::InvalidBoxCount(
                "total boxes must be at least 1".to_string(),
            ));
        }
        let batch = job
            .batches
            .first()
            .ok_or(Error::MissingBatchFile { batch: 1 })?;

        let template = self.template(1, batch)?;
        let params = EffectiveParams::resolve(
            profile,
            &job.params,
            batch.address.as_deref(),
            batch.batch_number.as_deref(),
        );

        let single = first_page(&template)?;
        let composed = self
            .compositor_for(profile)
            .compose(&single, &params, 1, job.total_boxes)?;

        Ok(GeneratedDocument {
            pdf_bytes: composed.pdf_bytes,
            page_count: composed.page_count,
            file_name: "preview.pdf".to_string(),
        })
    }

    /// Template bytes of a batch. `index` is 1-based.
    fn template(&self, index: usize, batch: &Batch) -> Result<Vec<u8>> {
        let name = batch
            .file
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or(Error::MissingBatchFile { batch: index })?;

        self.store.read(name)?.ok_or_else(|| Error::FileNotFound {
            batch: index,
            name: name.to_string(),
        })
    }

    /// Compositor for a profile, with its image asset if one is enabled.
    ///
    /// An unusable image is logged and left out.
    fn compositor_for(&self, profile: &Profile) -> LabelCompositor {
        let image = profile.barcode_asset().and_then(|name| {
            match ImageAsset::load(&self.config.asset_dir.join(name)) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("{}; labels are produced without the image", e);
                    None
                }
            }
        });
        LabelCompositor::new(OverlayOptions::from(&self.config)).with_image(image)
    }
}

impl std::fmt::Debug for LabelGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelGenerator")
            .field("profiles", &self.profiles.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
