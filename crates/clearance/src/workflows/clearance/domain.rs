use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for stored clearance forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormId(pub String);

/// Identifier wrapper for projects referenced by clearance forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Project record as far as clearance tracking is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

impl Project {
    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Display fields returned alongside overlapping forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
}

/// Inclusive date range the personnel fees of a form apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl CoverageWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Closed-interval overlap: shared boundary days count.
    pub fn overlaps(&self, other: &CoverageWindow) -> bool {
        self.from <= other.to && self.to >= other.from
    }
}

/// Lifecycle of a clearance form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClearanceStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl ClearanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ClearanceStatus::Draft => "DRAFT",
            ClearanceStatus::Submitted => "SUBMITTED",
            ClearanceStatus::UnderReview => "UNDER_REVIEW",
            ClearanceStatus::Approved => "APPROVED",
            ClearanceStatus::Rejected => "REJECTED",
        }
    }

    /// Forms in these states count as existing registrations during duplicate checks.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            ClearanceStatus::Submitted | ClearanceStatus::UnderReview | ClearanceStatus::Approved
        )
    }

    pub const fn is_editable(self) -> bool {
        matches!(
            self,
            ClearanceStatus::Draft | ClearanceStatus::Submitted | ClearanceStatus::Rejected
        )
    }

    pub const fn can_transition_to(self, next: ClearanceStatus) -> bool {
        matches!(
            (self, next),
            (ClearanceStatus::Draft, ClearanceStatus::Submitted)
                | (ClearanceStatus::Submitted, ClearanceStatus::UnderReview)
                | (ClearanceStatus::Submitted, ClearanceStatus::Rejected)
                | (ClearanceStatus::UnderReview, ClearanceStatus::Approved)
                | (ClearanceStatus::UnderReview, ClearanceStatus::Rejected)
                | (ClearanceStatus::Rejected, ClearanceStatus::Submitted)
        )
    }
}

/// Per-weekday rates used when no packaged fee applies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyFees {
    #[serde(default)]
    pub monday: f64,
    #[serde(default)]
    pub tuesday: f64,
    #[serde(default)]
    pub wednesday: f64,
    #[serde(default)]
    pub thursday: f64,
    #[serde(default)]
    pub friday: f64,
    #[serde(default)]
    pub saturday: f64,
    #[serde(default)]
    pub sunday: f64,
}

impl DailyFees {
    pub fn values(&self) -> [f64; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }
}

/// How a personnel entry is paid. Derived on every check, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    Packaged,
    Daily,
}

impl FeeType {
    pub fn classify(packaged_fee: f64) -> Self {
        if packaged_fee > 0.0 {
            FeeType::Packaged
        } else {
            FeeType::Daily
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FeeType::Packaged => "packaged",
            FeeType::Daily => "daily",
        }
    }
}

/// One named individual's fee record inside a clearance form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonnelEntry {
    pub registered_name: String,
    pub packaged_fee: f64,
    pub daily_fees: DailyFees,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl PersonnelEntry {
    pub fn fee_type(&self) -> FeeType {
        FeeType::classify(self.packaged_fee)
    }

    pub fn has_remark(&self) -> bool {
        has_text(self.remarks.as_deref())
    }
}

/// Stored clearance form. Personnel entries are owned by the form and go with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearanceForm {
    pub id: FormId,
    pub reference_number: String,
    pub project_id: ProjectId,
    pub coverage: CoverageWindow,
    pub status: ClearanceStatus,
    pub personnel: Vec<PersonnelEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClearanceForm {
    pub fn find_personnel(&self, name: &str) -> Option<&PersonnelEntry> {
        self.personnel
            .iter()
            .find(|entry| names_match(&entry.registered_name, name))
    }
}

/// Personnel line as submitted by a caller, before intake normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonnelInput {
    pub registered_name: String,
    #[serde(default)]
    pub packaged_fee: f64,
    #[serde(default)]
    pub daily_fees: DailyFees,
    #[serde(default)]
    pub remarks: Option<String>,
    /// Justification acknowledging a known overlap with another form.
    #[serde(default)]
    pub duplicate_remark: Option<String>,
}

impl PersonnelInput {
    pub fn fee_type(&self) -> FeeType {
        FeeType::classify(self.packaged_fee)
    }

    pub fn has_override_remark(&self) -> bool {
        has_text(self.duplicate_remark.as_deref())
    }

    /// Remark persisted on the stored entry; an override remark takes precedence.
    pub fn stored_remark(&self) -> Option<String> {
        [self.duplicate_remark.as_deref(), self.remarks.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(str::to_string)
    }

    pub fn into_entry(self) -> PersonnelEntry {
        let remarks = self.stored_remark();
        PersonnelEntry {
            registered_name: self.registered_name,
            packaged_fee: self.packaged_fee,
            daily_fees: self.daily_fees,
            remarks,
        }
    }
}

/// Payload for creating a clearance form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearanceSubmission {
    pub project_id: ProjectId,
    pub coverage_from_date: NaiveDate,
    pub coverage_to_date: NaiveDate,
    pub personnel: Vec<PersonnelInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClearanceStatus>,
}

impl ClearanceSubmission {
    pub fn coverage(&self) -> CoverageWindow {
        CoverageWindow::new(self.coverage_from_date, self.coverage_to_date)
    }
}

/// Payload for editing an existing clearance form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearanceAmendment {
    pub coverage_from_date: NaiveDate,
    pub coverage_to_date: NaiveDate,
    pub personnel: Vec<PersonnelInput>,
}

impl ClearanceAmendment {
    pub fn coverage(&self) -> CoverageWindow {
        CoverageWindow::new(self.coverage_from_date, self.coverage_to_date)
    }
}

/// Payload for a dry-run duplicate check. Supplying `exclude_form_id` checks as an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckRequest {
    pub project_id: ProjectId,
    pub coverage_from_date: NaiveDate,
    pub coverage_to_date: NaiveDate,
    pub personnel: Vec<PersonnelInput>,
    #[serde(default)]
    pub exclude_form_id: Option<FormId>,
}

impl DuplicateCheckRequest {
    pub fn coverage(&self) -> CoverageWindow {
        CoverageWindow::new(self.coverage_from_date, self.coverage_to_date)
    }
}

impl From<&PersonnelEntry> for PersonnelInput {
    /// Stored remarks were accepted as acknowledgements when the entry was saved.
    fn from(entry: &PersonnelEntry) -> Self {
        Self {
            registered_name: entry.registered_name.clone(),
            packaged_fee: entry.packaged_fee,
            daily_fees: entry.daily_fees,
            remarks: entry.remarks.clone(),
            duplicate_remark: entry.remarks.clone(),
        }
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn names_match(left: &str, right: &str) -> bool {
    normalize_name(left) == normalize_name(right)
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|text| !text.trim().is_empty())
}
