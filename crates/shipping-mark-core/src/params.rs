//! Caller overrides and their merge with profile defaults.
//!
//! `effective(key) = override[key] if present else profile.defaults[key]`,
//! applied per field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::profile::{AddressMode, FieldValue, Profile, SKIP_ADDRESS};

/// Per-request overrides shared by every batch of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterOverlay {
    /// Field key -> value replacing the profile default
    #[serde(default)]
    pub overrides: BTreeMap<String, FieldValue>,
    /// Address text; for fixed-address profiles this replaces the fixed address
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub skip_address: bool,
    #[serde(default)]
    pub batch_number: Option<String>,
}

impl ParameterOverlay {
    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Axis-aligned rectangle in PDF points, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

/// Parameters of one batch after merging overrides, batch fields and defaults.
#[derive(Debug, Clone)]
pub struct EffectiveParams<'a> {
    profile: &'a Profile,
    overrides: &'a BTreeMap<String, FieldValue>,
    address: String,
    skip_address: bool,
    batch_number: String,
}

impl<'a> EffectiveParams<'a> {
    /// Resolve the parameters for one batch.
    ///
    /// Selectable-address profiles take the batch address when one is given
    /// (the skip sentinel turns the address off); fixed-address profiles print
    /// the shared address override, else the profile's fixed address, on every
    /// batch. A non-empty batch number replaces the shared one.
    pub fn resolve(
        profile: &'a Profile,
        shared: &'a ParameterOverlay,
        batch_address: Option<&str>,
        batch_number: Option<&str>,
    ) -> Self {
        let (address, skip_address) = match profile.address_mode {
            AddressMode::Selectable => match batch_address {
                Some(SKIP_ADDRESS) => (String::new(), true),
                Some(address) => (address.to_string(), false),
                None => (shared.address.clone().unwrap_or_default(), shared.skip_address),
            },
            AddressMode::Fixed => (
                shared
                    .address
                    .clone()
                    .or_else(|| profile.fixed_address.clone())
                    .unwrap_or_default(),
                shared.skip_address,
            ),
        };

        let batch_number = batch_number
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| shared.batch_number.clone())
            .unwrap_or_default();

        Self {
            profile,
            overrides: &shared.overrides,
            address,
            skip_address,
            batch_number,
        }
    }

    pub const fn profile(&self) -> &'a Profile {
        self.profile
    }

    /// Override if present, else the profile default.
    pub fn effective(&self, key: &str) -> Option<&'a FieldValue> {
        self.overrides
            .get(key)
            .or_else(|| self.profile.default_value(key))
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn number(&self, key: &str) -> Result<f32> {
        let value = self.require(key)?;
        value
            .as_number()
            .map(|n| n as f32)
            .ok_or_else(|| Error::InvalidParameter {
                key: key.to_string(),
                value: value.as_text(),
            })
    }

    pub fn count(&self, key: &str) -> Result<usize> {
        let value = self.require(key)?;
        value.as_count().ok_or_else(|| Error::InvalidParameter {
            key: key.to_string(),
            value: value.as_text(),
        })
    }

    /// Text value; empty when neither an override nor a default exists.
    pub fn text(&self, key: &str) -> String {
        self.effective(key).map(FieldValue::as_text).unwrap_or_default()
    }

    pub fn point(&self, keys: [&str; 2]) -> Result<(f32, f32)> {
        Ok((self.number(keys[0])?, self.number(keys[1])?))
    }

    pub fn rect(&self, keys: [&str; 4]) -> Result<Rect> {
        Ok(Rect {
            x: self.number(keys[0])?,
            y: self.number(keys[1])?,
            w: self.number(keys[2])?,
            h: self.number(keys[3])?,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the address region is masked and redrawn.
    pub fn address_enabled(&self) -> bool {
        !self.skip_address && self.address != SKIP_ADDRESS && !self.address.is_empty()
    }

    pub fn batch_number(&self) -> &str {
        &self.batch_number
    }

    fn require(&self, key: &str) -> Result<&'a FieldValue> {
        self.effective(key).ok_or_else(|| Error::ConfigInvalid {
            field: format!("defaults.{key}"),
            reason: format!("profile '{}' has no value", self.profile.name),
        })
    }
}
