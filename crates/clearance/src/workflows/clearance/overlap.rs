//! Duplicate personnel detection for clearance forms.
//!
//! A candidate conflicts with an existing registration when both sit on the same project,
//! the existing form is active, the names match case-insensitively, and the coverage
//! windows overlap. Fee types only annotate the reason; every combination conflicts.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{CoverageWindow, FeeType, FormId, PersonnelInput, ProjectId};
use super::repository::{ClearanceRepository, OverlapQuery, RepositoryError};

/// Whether a remark on either side may acknowledge and bypass a detected overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemarkOverride {
    #[default]
    Allowed,
    Disallowed,
}

impl RemarkOverride {
    pub fn from_flag(allowed: bool) -> Self {
        if allowed {
            RemarkOverride::Allowed
        } else {
            RemarkOverride::Disallowed
        }
    }
}

/// Fee-type pairing that triggered a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReason {
    pub candidate: FeeType,
    pub existing: FeeType,
}

impl ConflictReason {
    /// Compatibility table over (candidate, existing). No pairing is currently compatible.
    pub fn between(candidate: FeeType, existing: FeeType) -> Option<Self> {
        Some(Self {
            candidate,
            existing,
        })
    }

    pub const fn describe(self) -> &'static str {
        match (self.candidate, self.existing) {
            (FeeType::Packaged, FeeType::Packaged) => {
                "same project with overlapping packaged fee coverage dates"
            }
            (FeeType::Daily, FeeType::Daily) => {
                "same project with overlapping daily fee coverage dates"
            }
            (FeeType::Packaged, FeeType::Daily) => {
                "same project with overlapping coverage dates (packaged fee against an existing daily fee)"
            }
            (FeeType::Daily, FeeType::Packaged) => {
                "same project with overlapping coverage dates (daily fee against an existing packaged fee)"
            }
        }
    }
}

/// Existing form a candidate collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingForm {
    pub form_id: FormId,
    pub reference_number: String,
    pub project_name: String,
    pub reason: String,
    pub candidate_fee_type: FeeType,
    pub existing_fee_type: FeeType,
}

/// All conflicts for one submitted personnel name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonnelConflict {
    pub personnel_name: String,
    pub conflicts: Vec<ConflictingForm>,
}

/// Outcome of a duplicate check. Empty means the batch may be stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub personnel: Vec<PersonnelConflict>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.personnel.is_empty()
    }

    pub fn conflict_count(&self) -> usize {
        self.personnel
            .iter()
            .map(|entry| entry.conflicts.len())
            .sum()
    }

    /// Reference numbers of every conflicting form, first occurrence order.
    pub fn reference_numbers(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for conflict in self.personnel.iter().flat_map(|entry| &entry.conflicts) {
            if !seen.contains(&conflict.reference_number) {
                seen.push(conflict.reference_number.clone());
            }
        }
        seen
    }

    pub fn message(&self) -> String {
        if self.is_empty() {
            return "no duplicate personnel found".to_string();
        }

        let details: Vec<String> = self
            .personnel
            .iter()
            .map(|entry| {
                let forms: Vec<String> = entry
                    .conflicts
                    .iter()
                    .map(|conflict| {
                        format!(
                            "{} on {} ({})",
                            conflict.reference_number, conflict.project_name, conflict.reason
                        )
                    })
                    .collect();
                format!(
                    "{} is already registered in {}",
                    entry.personnel_name,
                    forms.join(", ")
                )
            })
            .collect();

        format!("duplicate personnel detected: {}", details.join("; "))
    }
}

/// Inputs for one duplicate check.
#[derive(Debug, Clone, Copy)]
pub struct OverlapRequest<'a> {
    pub project_id: &'a ProjectId,
    pub coverage: CoverageWindow,
    pub personnel: &'a [PersonnelInput],
    pub exclude: Option<&'a FormId>,
    pub remark_override: RemarkOverride,
}

/// Read-only checker over a clearance repository. Performs no writes.
pub struct OverlapChecker<'r, R: ?Sized> {
    repository: &'r R,
}

impl<'r, R> OverlapChecker<'r, R>
where
    R: ClearanceRepository + ?Sized,
{
    pub fn new(repository: &'r R) -> Self {
        Self { repository }
    }

    pub fn check(&self, request: &OverlapRequest<'_>) -> Result<DuplicateReport, RepositoryError> {
        let mut report = DuplicateReport::default();

        for candidate in request.personnel {
            let candidate_fee = candidate.fee_type();
            let query = OverlapQuery {
                project_id: request.project_id,
                personnel_name: &candidate.registered_name,
                coverage: request.coverage,
                exclude: request.exclude,
            };

            let mut conflicts = Vec::new();
            for existing in self.repository.find_overlapping(&query)? {
                let Some(entry) = existing.find_personnel(&candidate.registered_name) else {
                    continue;
                };
                let existing_fee = entry.fee_type();
                let Some(reason) = ConflictReason::between(candidate_fee, existing_fee) else {
                    continue;
                };

                if request.remark_override == RemarkOverride::Allowed
                    && (candidate.has_override_remark() || entry.has_remark())
                {
                    debug!(
                        personnel = %candidate.registered_name,
                        reference = %existing.reference_number,
                        "overlap acknowledged by remark"
                    );
                    continue;
                }

                conflicts.push(ConflictingForm {
                    form_id: existing.id.clone(),
                    reference_number: existing.reference_number.clone(),
                    project_name: existing.project.name.clone(),
                    reason: reason.describe().to_string(),
                    candidate_fee_type: candidate_fee,
                    existing_fee_type: existing_fee,
                });
            }

            if !conflicts.is_empty() {
                report.personnel.push(PersonnelConflict {
                    personnel_name: candidate.registered_name.clone(),
                    conflicts,
                });
            }
        }

        Ok(report)
    }
}
