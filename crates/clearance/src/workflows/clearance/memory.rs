use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::domain::{ClearanceForm, FormId, Project, ProjectId, ProjectSummary};
use super::repository::{ClearanceRepository, ExistingForm, OverlapQuery, RepositoryError};

/// In-process backing store. Used by tests and the demo server in place of a database.
#[derive(Debug, Default, Clone)]
pub struct MemoryClearanceRepository {
    forms: Arc<Mutex<BTreeMap<FormId, ClearanceForm>>>,
    projects: Arc<Mutex<HashMap<ProjectId, Project>>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryClearanceRepository {
    pub fn with_projects<I>(projects: I) -> Self
    where
        I: IntoIterator<Item = Project>,
    {
        let repository = Self::default();
        if let Ok(mut guard) = repository.projects.lock() {
            guard.extend(projects.into_iter().map(|project| (project.id.clone(), project)));
        }
        repository
    }

    pub fn register_project(&self, project: Project) -> Result<(), RepositoryError> {
        lock(&self.projects)?.insert(project.id.clone(), project);
        Ok(())
    }

    /// Number of stored forms. A poisoned lock still reports the data it guards.
    pub fn len(&self) -> usize {
        self.forms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn project_summary(&self, id: &ProjectId) -> Result<ProjectSummary, RepositoryError> {
        let projects = lock(&self.projects)?;
        Ok(projects
            .get(id)
            .map(Project::summary)
            .unwrap_or_else(|| ProjectSummary {
                id: id.clone(),
                name: id.0.clone(),
            }))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("memory store poisoned".to_string()))
}

impl ClearanceRepository for MemoryClearanceRepository {
    fn insert(&self, form: ClearanceForm) -> Result<ClearanceForm, RepositoryError> {
        let mut guard = lock(&self.forms)?;
        let duplicate_reference = guard
            .values()
            .any(|existing| existing.reference_number == form.reference_number);
        if guard.contains_key(&form.id) || duplicate_reference {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(form.id.clone(), form.clone());
        Ok(form)
    }

    fn update(&self, form: ClearanceForm) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.forms)?;
        match guard.get_mut(&form.id) {
            Some(slot) => {
                *slot = form;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &FormId) -> Result<Option<ClearanceForm>, RepositoryError> {
        Ok(lock(&self.forms)?.get(id).cloned())
    }

    fn delete(&self, id: &FormId) -> Result<Option<ClearanceForm>, RepositoryError> {
        Ok(lock(&self.forms)?.remove(id))
    }

    fn list_by_project(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ClearanceForm>, RepositoryError> {
        let guard = lock(&self.forms)?;
        let mut forms: Vec<ClearanceForm> = guard
            .values()
            .filter(|form| &form.project_id == project_id)
            .cloned()
            .collect();
        forms.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.reference_number.cmp(&b.reference_number))
        });
        Ok(forms)
    }

    fn project(&self, id: &ProjectId) -> Result<Option<Project>, RepositoryError> {
        Ok(lock(&self.projects)?.get(id).cloned())
    }

    fn next_sequence(&self) -> Result<u64, RepositoryError> {
        Ok(self.sequence.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn find_overlapping(
        &self,
        query: &OverlapQuery<'_>,
    ) -> Result<Vec<ExistingForm>, RepositoryError> {
        let project = self.project_summary(query.project_id)?;
        let guard = lock(&self.forms)?;
        Ok(guard
            .values()
            .filter(|form| query.matches(form))
            .map(|form| ExistingForm::from_form(form, project.clone(), query.personnel_name))
            .collect())
    }
}
