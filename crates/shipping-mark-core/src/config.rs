use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fill color used for overlay text and erase rectangles
///
/// Config files give either a name (`"blue"`) or an `{ r, g, b }` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorSpec")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn white() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    pub const fn dark_red() -> Self {
        Self::new(0.8, 0.0, 0.0)
    }

    pub const fn blue() -> Self {
        Self::new(0.0, 0.0, 0.8)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "black" => Some(Self::black()),
            "white" => Some(Self::white()),
            "darkred" | "dark_red" | "dark-red" => Some(Self::dark_red()),
            "blue" => Some(Self::blue()),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorSpec {
    Name(String),
    Rgb { r: f32, g: f32, b: f32 },
}

impl TryFrom<ColorSpec> for Color {
    type Error = String;

    fn try_from(spec: ColorSpec) -> Result<Self, Self::Error> {
        match spec {
            ColorSpec::Name(name) => {
                Self::from_name(&name).ok_or_else(|| format!("unknown color name '{name}'"))
            }
            ColorSpec::Rgb { r, g, b } => {
                if [r, g, b].iter().all(|c| (0.0..=1.0).contains(c)) {
                    Ok(Self::new(r, g, b))
                } else {
                    Err(format!("color components must be within 0..=1, got ({r}, {g}, {b})"))
                }
            }
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the template PDFs
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Directory holding image assets (barcodes)
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,

    /// Replacement profile table (built-in table when unset)
    #[serde(default)]
    pub profiles_file: Option<PathBuf>,

    /// Overlay font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Overlay text color
    #[serde(default = "default_text_color")]
    pub text_color: Color,

    /// Fill color of the erase rectangles
    #[serde(default = "default_erase_color")]
    pub erase_color: Color,
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("pdf")
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("pic")
}

const fn default_font_size() -> f32 {
    12.0
}

const fn default_text_color() -> Color {
    Color::black()
}

const fn default_erase_color() -> Color {
    Color::white()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
            asset_dir: default_asset_dir(),
            profiles_file: None,
            font_size: default_font_size(),
            text_color: default_text_color(),
            erase_color: default_erase_color(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::error::Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            crate::error::Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::Error::ConfigLoad(format!("Failed to parse config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/shipping-mark/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("shipping-mark").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    fn validate(&self) -> Result<(), crate::error::Error> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(crate::error::Error::ConfigInvalid {
                field: "font_size".to_string(),
                reason: format!("must be a positive number, got {}", self.font_size),
            });
        }
        Ok(())
    }
}
