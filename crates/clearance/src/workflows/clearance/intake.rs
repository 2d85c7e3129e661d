use super::domain::{normalize_name, CoverageWindow, PersonnelInput};

/// Validation errors raised before a personnel batch reaches the duplicate check.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IntakeError {
    #[error("a clearance form needs at least one personnel entry")]
    NoPersonnel,
    #[error("personnel entry {index} is missing a registered name")]
    BlankName { index: usize },
    #[error("{name} is listed more than once in this form")]
    RepeatedName { name: String },
    #[error("{name} has an invalid {field} ({value})")]
    InvalidFee {
        name: String,
        field: &'static str,
        value: f64,
    },
    #[error("a new clearance form cannot start as {0}")]
    InitialStatus(&'static str),
    #[error("coverage starts on {from} but ends on {to}")]
    InvertedCoverage {
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },
}

const DAILY_FIELDS: [&str; 7] = [
    "monday fee",
    "tuesday fee",
    "wednesday fee",
    "thursday fee",
    "friday fee",
    "saturday fee",
    "sunday fee",
];

pub(crate) fn validate_coverage(coverage: &CoverageWindow) -> Result<(), IntakeError> {
    if coverage.from > coverage.to {
        return Err(IntakeError::InvertedCoverage {
            from: coverage.from,
            to: coverage.to,
        });
    }
    Ok(())
}

/// Trims names and remarks and rejects batches the checker should never see.
pub(crate) fn normalize_personnel(
    personnel: Vec<PersonnelInput>,
) -> Result<Vec<PersonnelInput>, IntakeError> {
    if personnel.is_empty() {
        return Err(IntakeError::NoPersonnel);
    }

    let mut seen: Vec<String> = Vec::with_capacity(personnel.len());
    let mut normalized = Vec::with_capacity(personnel.len());

    for (index, mut entry) in personnel.into_iter().enumerate() {
        entry.registered_name = entry.registered_name.trim().to_string();
        if entry.registered_name.is_empty() {
            return Err(IntakeError::BlankName { index });
        }

        let key = normalize_name(&entry.registered_name);
        if seen.contains(&key) {
            return Err(IntakeError::RepeatedName {
                name: entry.registered_name,
            });
        }
        seen.push(key);

        check_fee(&entry.registered_name, "packaged fee", entry.packaged_fee)?;
        for (field, value) in DAILY_FIELDS.iter().zip(entry.daily_fees.values()) {
            check_fee(&entry.registered_name, field, value)?;
        }

        entry.remarks = trim_optional(entry.remarks);
        entry.duplicate_remark = trim_optional(entry.duplicate_remark);
        normalized.push(entry);
    }

    Ok(normalized)
}

fn check_fee(name: &str, field: &'static str, value: f64) -> Result<(), IntakeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(IntakeError::InvalidFee {
            name: name.to_string(),
            field,
            value,
        })
    }
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
