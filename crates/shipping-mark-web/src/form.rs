//! Conversion of the label form fields into generation jobs.
//!
//! Batch fields are indexed from 0 (`pdf_0`, `copies_0`, ...); errors name
//! batches from 1. Batches are read in order and the first one without a
//! template stops parsing.

use std::collections::HashMap;

use shipping_mark_core::profile::TEXT_VALUE_KEYS;
use shipping_mark_core::{
    AddressMode, Batch, Error, FieldValue, GenerationJob, ParameterOverlay, Profile, ProfileTable,
    Result,
};

/// Raw form fields.
pub type FormFields = HashMap<String, String>;

/// Job for `POST /api/generate`.
pub fn generation_job(profiles: &ProfileTable, form: &FormFields) -> Result<GenerationJob> {
    let (key, profile) = lookup_profile(profiles, form)?;

    let total_boxes = positive(form, "total_boxes", 0)?
        .ok_or_else(|| Error::InvalidBoxCount("total boxes must be at least 1".to_string()))?;
    let batch_count = positive(form, "batch_count", 0)?
        .ok_or_else(|| Error::InvalidBoxCount("at least one batch is required".to_string()))?;
    // Every batch takes at least one box
    if batch_count > total_boxes {
        return Err(Error::InvalidBoxCount(format!(
            "{batch_count} batches do not fit in {total_boxes} boxes"
        )));
    }

    let batches = (0..batch_count)
        .zip(1..)
        .map(|(b, number)| batch(profile, form, b, number))
        .collect::<Result<Vec<_>>>()?;

    Ok(GenerationJob {
        profile: key.to_string(),
        total_boxes,
        batches,
        params: shared_params(profile, form),
    })
}

/// Job for `POST /api/preview`: the first batch only, `total_boxes` defaulting to 1.
pub fn preview_job(profiles: &ProfileTable, form: &FormFields) -> Result<GenerationJob> {
    let (key, profile) = lookup_profile(profiles, form)?;

    let total_boxes = positive(form, "total_boxes", 1)?
        .ok_or_else(|| Error::InvalidBoxCount("total boxes must be at least 1".to_string()))?;

    Ok(GenerationJob {
        profile: key.to_string(),
        total_boxes,
        batches: vec![batch(profile, form, 0, 1)?],
        params: shared_params(profile, form),
    })
}

fn lookup_profile<'a>(
    profiles: &'a ProfileTable,
    form: &'a FormFields,
) -> Result<(&'a str, &'a Profile)> {
    let key = form.get("profile").map_or("", String::as_str);
    Ok((key, profiles.get(key)?))
}

/// Overrides shared by every batch.
///
/// Layout keys are taken only when non-empty; the replacement text keys are
/// taken even when empty, so a field can be cleared.
fn shared_params(profile: &Profile, form: &FormFields) -> ParameterOverlay {
    let mut params = ParameterOverlay::default();

    for key in profile.defaults.keys() {
        if TEXT_VALUE_KEYS.contains(&key.as_str()) {
            continue;
        }
        if let Some(value) = form.get(key).filter(|v| !v.is_empty()) {
            params
                .overrides
                .insert(key.clone(), FieldValue::Text(value.clone()));
        }
    }
    for key in TEXT_VALUE_KEYS {
        if let Some(value) = form.get(key) {
            params
                .overrides
                .insert(key.to_string(), FieldValue::Text(value.clone()));
        }
    }

    if profile.address_mode == AddressMode::Fixed {
        params.address = form.get("address").cloned();
    }
    params.skip_address = form.get("skip_address").is_some_and(|v| v == "true");
    params
}

/// Fields of batch `b`; `number` is its 1-based name in errors.
fn batch(profile: &Profile, form: &FormFields, b: u32, number: usize) -> Result<Batch> {
    let file = form
        .get(&format!("pdf_{b}"))
        .filter(|f| !f.is_empty())
        .cloned()
        .ok_or(Error::MissingBatchFile { batch: number })?;

    let copies_key = format!("copies_{b}");
    let copies = match form.get(&copies_key).map(|v| v.trim()) {
        None | Some("") => 1,
        Some(value) => value.parse::<u32>().map_err(|_| Error::InvalidParameter {
            key: copies_key.clone(),
            value: value.to_string(),
        })?,
    };

    // Selectable profiles always take the batch value; absent means empty
    let address = match profile.address_mode {
        AddressMode::Selectable => Some(
            form.get(&format!("address_{b}"))
                .cloned()
                .unwrap_or_default(),
        ),
        AddressMode::Fixed => None,
    };

    Ok(Batch {
        file: Some(file),
        copies,
        address,
        batch_number: form
            .get(&format!("batch_number_{b}"))
            .filter(|n| !n.is_empty())
            .cloned(),
    })
}

/// Parse a count that must be at least 1; `None` when it is below 1.
fn positive(form: &FormFields, key: &str, default: i64) -> Result<Option<u32>> {
    let invalid = |value: &str| Error::InvalidParameter {
        key: key.to_string(),
        value: value.to_string(),
    };

    let value = match form.get(key).map(|v| v.trim()) {
        None | Some("") => default,
        Some(raw) => raw.parse::<i64>().map_err(|_| invalid(raw))?,
    };
    if value < 1 {
        return Ok(None);
    }
    u32::try_from(value)
        .map(Some)
        .map_err(|_| invalid(&value.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use shipping_mark_core::SKIP_ADDRESS;

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_generation_job_from_form() {
        let profiles = ProfileTable::builtin().unwrap();
        let form = fields(&[
            ("profile", "mexico"),
            ("total_boxes", "10"),
            ("batch_count", "2"),
            ("pdf_0", "a.pdf"),
            ("copies_0", "6"),
            ("address_0", "Lima"),
            ("pdf_1", "b.pdf"),
            ("address_1", SKIP_ADDRESS),
            ("page_num_gap", "3"),
            ("page_num_x", ""),
        ]);

        let job = generation_job(&profiles, &form).unwrap();
        assert_eq!(job.total_boxes, 10);
        assert_eq!(job.batches.len(), 2);
        assert_eq!(job.batches[0].copies, 6);
        assert_eq!(job.batches[0].address.as_deref(), Some("Lima"));
        assert_eq!(job.batches[1].copies, 1);
        assert_eq!(job.batches[1].address.as_deref(), Some(SKIP_ADDRESS));
        assert_eq!(
            job.params.overrides.get("page_num_gap"),
            Some(&FieldValue::Text("3".to_string()))
        );
        assert!(!job.params.overrides.contains_key("page_num_x"));
    }

    #[test]
    fn test_unknown_profile() {
        let profiles = ProfileTable::builtin().unwrap();
        let form = fields(&[("profile", "atlantis"), ("total_boxes", "1")]);
        assert!(matches!(
            generation_job(&profiles, &form),
            Err(Error::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_counts_must_be_positive() {
        let profiles = ProfileTable::builtin().unwrap();

        let form = fields(&[("profile", "uzbek"), ("total_boxes", "0"), ("batch_count", "1")]);
        assert!(matches!(
            generation_job(&profiles, &form),
            Err(Error::InvalidBoxCount(_))
        ));

        let form = fields(&[("profile", "uzbek"), ("total_boxes", "4")]);
        assert!(matches!(
            generation_job(&profiles, &form),
            Err(Error::InvalidBoxCount(_))
        ));

        let form = fields(&[("profile", "uzbek"), ("total_boxes", "four"), ("batch_count", "1")]);
        let err = generation_job(&profiles, &form).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_text_keys_kept_when_empty() {
        let profiles = ProfileTable::builtin().unwrap();
        let form = fields(&[
            ("profile", "oman"),
            ("total_boxes", "1"),
            ("batch_count", "1"),
            ("pdf_0", "a.pdf"),
            ("consignee_name", ""),
            ("address", "Muscat"),
            ("skip_address", "true"),
        ]);

        let job = generation_job(&profiles, &form).unwrap();
        assert_eq!(
            job.params.overrides.get("consignee_name"),
            Some(&FieldValue::Text(String::new()))
        );
        assert_eq!(job.params.address.as_deref(), Some("Muscat"));
        assert!(job.params.skip_address);
        // Fixed profiles ignore per-batch addresses
        assert_eq!(job.batches[0].address, None);
    }

    #[test]
    fn test_first_batch_without_file_stops_parsing() {
        let profiles = ProfileTable::builtin().unwrap();
        let form = fields(&[
            ("profile", "uzbek"),
            ("total_boxes", "5"),
            ("batch_count", "3"),
            ("pdf_0", "a.pdf"),
            ("pdf_2", "c.pdf"),
        ]);
        let err = generation_job(&profiles, &form).unwrap_err();
        assert!(matches!(err, Error::MissingBatchFile { batch: 2 }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_batch_count_capped_by_total_boxes() {
        let profiles = ProfileTable::builtin().unwrap();
        let form = fields(&[
            ("profile", "uzbek"),
            ("total_boxes", "3"),
            ("batch_count", "4294967295"),
        ]);
        assert!(matches!(
            generation_job(&profiles, &form),
            Err(Error::InvalidBoxCount(_))
        ));

        // Huge but within budget: rejected at the first missing file
        let form = fields(&[
            ("profile", "uzbek"),
            ("total_boxes", "4294967295"),
            ("batch_count", "4294967295"),
            ("pdf_0", "a.pdf"),
        ]);
        assert!(matches!(
            generation_job(&profiles, &form),
            Err(Error::MissingBatchFile { batch: 2 })
        ));
    }

    #[test]
    fn test_invalid_copies_named() {
        let profiles = ProfileTable::builtin().unwrap();
        let form = fields(&[
            ("profile", "uzbek"),
            ("total_boxes", "3"),
            ("batch_count", "1"),
            ("pdf_0", "a.pdf"),
            ("copies_0", "-2"),
        ]);
        let err = generation_job(&profiles, &form).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref key, .. } if key == "copies_0"));
    }

    #[test]
    fn test_preview_defaults_to_one_box() {
        let profiles = ProfileTable::builtin().unwrap();
        let form = fields(&[
            ("profile", "brazil"),
            ("pdf_0", "a.pdf"),
            ("batch_number_0", "L9"),
        ]);
        let job = preview_job(&profiles, &form).unwrap();
        assert_eq!(job.total_boxes, 1);
        assert_eq!(job.batches.len(), 1);
        assert_eq!(job.batches[0].batch_number.as_deref(), Some("L9"));
    }
}
