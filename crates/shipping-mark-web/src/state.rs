use anyhow::{Context, Result};
use shipping_mark_core::{AppConfig, LabelGenerator};
use tracing::info;

/// Global application state
pub struct AppState {
    generator: LabelGenerator,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let generator =
            LabelGenerator::new(config).context("Failed to load the profile table")?;

        info!(
            "Serving {} profiles, templates from {}",
            generator.profiles().len(),
            generator.config().template_dir.display()
        );

        Ok(Self::from_generator(generator))
    }

    pub const fn from_generator(generator: LabelGenerator) -> Self {
        Self { generator }
    }

    pub const fn generator(&self) -> &LabelGenerator {
        &self.generator
    }
}
