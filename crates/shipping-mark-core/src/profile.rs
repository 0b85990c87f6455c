//! Country profiles: per-country layout defaults and enabled extra fields.
//!
//! A profile table is configuration input. The built-in table is embedded
//! from `assets/profiles.toml`; a replacement file with the same schema can
//! be loaded with [`ProfileTable::from_file`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Built-in profile table.
const BUILTIN_PROFILES: &str = include_str!("../assets/profiles.toml");

/// Address value meaning "leave the template address untouched".
pub const SKIP_ADDRESS: &str = "__SKIP__";

/// Image asset used by profiles that enable `barcode` without naming one.
pub const DEFAULT_BARCODE_IMAGE: &str = "boostin.png";

// =============================================================================
// Field Keys
// =============================================================================

pub const PAGE_NUM_X: &str = "page_num_x";
pub const PAGE_NUM_Y: &str = "page_num_y";
pub const PAGE_NUM_GAP: &str = "page_num_gap";

pub const ADDRESS_RECT_KEYS: [&str; 4] = [
    "address_rect_x",
    "address_rect_y",
    "address_rect_w",
    "address_rect_h",
];
pub const ADDRESS_TEXT_KEYS: [&str; 2] = ["address_text_x", "address_text_y"];

/// Keys every profile must define.
const REQUIRED_KEYS: [&str; 9] = [
    PAGE_NUM_X,
    PAGE_NUM_Y,
    PAGE_NUM_GAP,
    ADDRESS_RECT_KEYS[0],
    ADDRESS_RECT_KEYS[1],
    ADDRESS_RECT_KEYS[2],
    ADDRESS_RECT_KEYS[3],
    ADDRESS_TEXT_KEYS[0],
    ADDRESS_TEXT_KEYS[1],
];

/// Replacement-text keys of the erase-and-redraw extra fields.
pub const TEXT_VALUE_KEYS: [&str; 4] = ["consignee_name", "reg_text", "product_name", "box_text"];

// =============================================================================
// Profile Types
// =============================================================================

/// Page size class of a profile's templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    Letter,
    LandscapeLetter,
}

impl PageSize {
    /// Width and height in points.
    pub const fn dimensions(self) -> (f32, f32) {
        match self {
            Self::Letter => (612.0, 792.0),
            Self::LandscapeLetter => (792.0, 612.0),
        }
    }
}

/// How a profile chooses the printed address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    /// Operator picks an address per batch from the selectable list
    Selectable,
    /// The profile's fixed address is printed on every batch
    Fixed,
}

/// Optional country-specific overlay element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraField {
    Consignee,
    Registration,
    ProductName,
    BoxText,
    BatchNumber,
    Barcode,
}

impl ExtraField {
    pub const ALL: [Self; 6] = [
        Self::Consignee,
        Self::Registration,
        Self::ProductName,
        Self::BoxText,
        Self::BatchNumber,
        Self::Barcode,
    ];

    pub const fn tag(self) -> &'static str {
        match self {
            Self::Consignee => "consignee",
            Self::Registration => "registration",
            Self::ProductName => "product_name",
            Self::BoxText => "box_text",
            Self::BatchNumber => "batch_number",
            Self::Barcode => "barcode",
        }
    }

    /// Rectangle keys `(x, y, w, h)`: the erase area, or the image box for barcodes.
    pub const fn rect_keys(self) -> Option<[&'static str; 4]> {
        match self {
            Self::Consignee => Some([
                "consignee_hide_rect_x",
                "consignee_hide_rect_y",
                "consignee_hide_rect_w",
                "consignee_hide_rect_h",
            ]),
            Self::Registration => Some(["reg_rect_x", "reg_rect_y", "reg_rect_w", "reg_rect_h"]),
            Self::ProductName => Some([
                "product_hide_rect_x",
                "product_hide_rect_y",
                "product_hide_rect_w",
                "product_hide_rect_h",
            ]),
            Self::BoxText => Some([
                "box_text_hide_rect_x",
                "box_text_hide_rect_y",
                "box_text_hide_rect_w",
                "box_text_hide_rect_h",
            ]),
            Self::BatchNumber => None,
            Self::Barcode => Some(["barcode_x", "barcode_y", "barcode_w", "barcode_h"]),
        }
    }

    /// Text position keys `(x, y)`.
    pub const fn text_keys(self) -> Option<[&'static str; 2]> {
        match self {
            Self::Consignee => Some(["consignee_text_x", "consignee_text_y"]),
            Self::Registration => Some(["reg_text_x", "reg_text_y"]),
            Self::ProductName => Some(["product_text_x", "product_text_y"]),
            Self::BoxText => Some(["box_text_x", "box_text_y"]),
            Self::BatchNumber => Some(["batch_text_x", "batch_text_y"]),
            Self::Barcode => None,
        }
    }

    /// Key of the replacement text for erase-and-redraw fields.
    pub const fn value_key(self) -> Option<&'static str> {
        match self {
            Self::Consignee => Some("consignee_name"),
            Self::Registration => Some("reg_text"),
            Self::ProductName => Some("product_name"),
            Self::BoxText => Some("box_text"),
            Self::BatchNumber | Self::Barcode => None,
        }
    }
}

impl fmt::Display for ExtraField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A default or override value for one field key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric interpretation; text is parsed after trimming.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f).filter(|f| f.is_finite()),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        }
    }

    /// Non-negative integer interpretation (e.g. a count of spaces).
    pub fn as_count(&self) -> Option<usize> {
        match self {
            Self::Integer(i) => usize::try_from(*i).ok(),
            Self::Float(_) => None,
            Self::Text(s) => s.trim().parse::<usize>().ok(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// Static per-country label configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Display name (also embedded in download file names)
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub page_size: PageSize,
    pub address_mode: AddressMode,
    #[serde(default)]
    pub fixed_address: Option<String>,
    pub defaults: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub extra_fields: BTreeSet<ExtraField>,
    /// Image asset file name for the `barcode` field
    #[serde(default)]
    pub barcode_image: Option<String>,
}

impl Profile {
    pub fn has_field(&self, field: ExtraField) -> bool {
        self.extra_fields.contains(&field)
    }

    pub fn default_value(&self, key: &str) -> Option<&FieldValue> {
        self.defaults.get(key)
    }

    /// Image asset to stamp for the `barcode` field, if enabled.
    pub fn barcode_asset(&self) -> Option<&str> {
        self.has_field(ExtraField::Barcode)
            .then(|| self.barcode_image.as_deref().unwrap_or(DEFAULT_BARCODE_IMAGE))
    }

    /// Check that every key the enabled fields draw from has a default.
    fn validate(&self, key: &str) -> Result<()> {
        let numeric = |field: &str| -> Result<()> {
            match self.defaults.get(field) {
                Some(value) if value.as_number().is_some() => Ok(()),
                Some(value) => Err(Error::ConfigInvalid {
                    field: format!("{key}.defaults.{field}"),
                    reason: format!("expected a number, got '{}'", value.as_text()),
                }),
                None => Err(Error::ConfigInvalid {
                    field: format!("{key}.defaults.{field}"),
                    reason: "missing default".to_string(),
                }),
            }
        };

        for field in REQUIRED_KEYS {
            numeric(field)?;
        }
        if self.defaults.get(PAGE_NUM_GAP).and_then(FieldValue::as_count).is_none() {
            return Err(Error::ConfigInvalid {
                field: format!("{key}.defaults.{PAGE_NUM_GAP}"),
                reason: "expected a non-negative integer".to_string(),
            });
        }

        for extra in &self.extra_fields {
            for field in extra.rect_keys().into_iter().flatten() {
                numeric(field)?;
            }
            for field in extra.text_keys().into_iter().flatten() {
                numeric(field)?;
            }
        }

        if self.address_mode == AddressMode::Fixed && self.fixed_address.is_none() {
            tracing::debug!("Fixed-address profile {} has no fixed_address", key);
        }

        Ok(())
    }
}

/// Entry of the selectable address list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectableAddress {
    pub label: String,
    pub value: String,
}

impl SelectableAddress {
    pub fn is_skip(&self) -> bool {
        self.value == SKIP_ADDRESS
    }
}

#[derive(Deserialize)]
struct ProfileFile {
    #[serde(default)]
    address: Vec<SelectableAddress>,
    #[serde(default)]
    profile: BTreeMap<String, Profile>,
}

// =============================================================================
// Profile Table
// =============================================================================

/// Immutable lookup of profiles by country key, plus the address list.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: BTreeMap<String, Profile>,
    addresses: Vec<SelectableAddress>,
}

impl ProfileTable {
    /// The embedded default table.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_PROFILES)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read profile table {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ProfileFile = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse profile table: {e}")))?;

        if file.profile.is_empty() {
            return Err(Error::ConfigInvalid {
                field: "profile".to_string(),
                reason: "profile table is empty".to_string(),
            });
        }
        for (key, profile) in &file.profile {
            profile.validate(key)?;
        }

        Ok(Self {
            profiles: file.profile,
            addresses: file.address,
        })
    }

    /// Look up a profile by country key.
    pub fn get(&self, key: &str) -> Result<&Profile> {
        self.profiles
            .get(key)
            .ok_or_else(|| Error::UnknownProfile(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.profiles.iter().map(|(k, p)| (k.as_str(), p))
    }

    /// The profiles as a map, for serialization.
    pub const fn profiles(&self) -> &BTreeMap<String, Profile> {
        &self.profiles
    }

    pub fn addresses(&self) -> &[SelectableAddress] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_valid() {
        let table = ProfileTable::builtin().unwrap();
        assert_eq!(table.len(), 7);
        assert!(table.addresses().iter().any(SelectableAddress::is_skip));
    }

    #[test]
    fn test_unknown_profile() {
        let table = ProfileTable::builtin().unwrap();
        assert!(matches!(table.get("atlantis"), Err(Error::UnknownProfile(k)) if k == "atlantis"));
    }

    #[test]
    fn test_brazil_profile() {
        let table = ProfileTable::builtin().unwrap();
        let brazil = table.get("brazil").unwrap();
        assert_eq!(brazil.address_mode, AddressMode::Fixed);
        assert!(brazil.has_field(ExtraField::Barcode));
        assert!(brazil.has_field(ExtraField::BatchNumber));
        assert!(!brazil.has_field(ExtraField::Registration));
        assert_eq!(brazil.barcode_asset(), Some("boostin.png"));
        assert_eq!(
            brazil.default_value("box_text"),
            Some(&FieldValue::Text("900 Syringe / Carton".to_string()))
        );
    }

    #[test]
    fn test_every_enabled_field_has_coordinates() {
        let table = ProfileTable::builtin().unwrap();
        for (key, profile) in table.iter() {
            for field in &profile.extra_fields {
                let keys: Vec<&str> = field
                    .rect_keys()
                    .into_iter()
                    .flatten()
                    .chain(field.text_keys().into_iter().flatten())
                    .collect();
                for k in keys {
                    assert!(
                        profile.default_value(k).is_some(),
                        "profile {key} enables {field} but lacks {k}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_missing_extra_field_key_rejected() {
        let toml = r#"
            [profile.test]
            name = "Test"
            page_size = "letter"
            address_mode = "selectable"
            extra_fields = ["registration"]

            [profile.test.defaults]
            page_num_x = 1
            page_num_y = 1
            page_num_gap = 1
            address_rect_x = 1
            address_rect_y = 1
            address_rect_w = 1
            address_rect_h = 1
            address_text_x = 1
            address_text_y = 1
            reg_rect_x = 1
            reg_rect_y = 1
            reg_rect_w = 1
        "#;
        let err = ProfileTable::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("reg_rect_h"), "got: {err}");
    }

    #[test]
    fn test_field_value_coercion() {
        assert_eq!(FieldValue::from("  24 ").as_number(), Some(24.0));
        assert_eq!(FieldValue::from("abc").as_number(), None);
        assert_eq!(FieldValue::from(3_i64).as_count(), Some(3));
        assert_eq!(FieldValue::from(-1_i64).as_count(), None);
        assert_eq!(FieldValue::from("2.5").as_count(), None);
    }

    #[test]
    fn test_profiles_serialize_with_integer_defaults() {
        let table = ProfileTable::builtin().unwrap();
        let json = serde_json::to_value(table.profiles()).unwrap();
        assert_eq!(json["oman"]["defaults"]["page_num_gap"], 25);
        assert_eq!(json["oman"]["page_size"], "landscape_letter");
        assert_eq!(json["oman"]["extra_fields"][0], "consignee");
    }
}
