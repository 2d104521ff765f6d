//! Per-category procedure registry keyed by deployment

use super::deployment::DeploymentId;
use super::model::Category;
use super::procedure::SharedProcedure;
use crate::error::RegistrationError;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// A procedure together with the deployment that owns it.
#[derive(Clone)]
pub struct RegisteredProcedure {
    pub deployment: DeploymentId,
    pub procedure: SharedProcedure,
}

impl std::fmt::Debug for RegisteredProcedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProcedure")
            .field("deployment", &self.deployment)
            .field("procedure", &self.procedure.name())
            .finish()
    }
}

struct DeploymentEntry {
    deployment: DeploymentId,
    procedures: Vec<SharedProcedure>,
}

/// Lock-protected contents of a registry. Deployments keep the order of their
/// first registration and procedures keep insertion order; an entry never
/// holds an empty procedure list.
#[derive(Default)]
pub(crate) struct RegistryEntries {
    deployments: Vec<DeploymentEntry>,
}

impl RegistryEntries {
    /// Returns true when an existing procedure with the same name was replaced.
    pub(crate) fn upsert(&mut self, deployment: &DeploymentId, procedure: SharedProcedure) -> bool {
        match self.deployments.iter_mut().find(|entry| &entry.deployment == deployment) {
            Some(entry) => {
                match entry
                    .procedures
                    .iter_mut()
                    .find(|existing| existing.name() == procedure.name())
                {
                    Some(slot) => {
                        *slot = procedure;
                        true
                    }
                    None => {
                        entry.procedures.push(procedure);
                        false
                    }
                }
            }
            None => {
                self.deployments.push(DeploymentEntry {
                    deployment: deployment.clone(),
                    procedures: vec![procedure],
                });
                false
            }
        }
    }

    pub(crate) fn remove_matching<F>(&mut self, deployment: &DeploymentId, mut predicate: F) -> usize
    where
        F: FnMut(&SharedProcedure) -> bool,
    {
        let Some(index) = self.position(deployment) else {
            return 0;
        };

        let entry = &mut self.deployments[index];
        let before = entry.procedures.len();
        entry.procedures.retain(|procedure| !predicate(procedure));
        let removed = before - entry.procedures.len();

        if entry.procedures.is_empty() {
            self.deployments.remove(index);
        }
        removed
    }

    pub(crate) fn remove_deployment(&mut self, deployment: &DeploymentId) -> usize {
        match self.position(deployment) {
            Some(index) => self.deployments.remove(index).procedures.len(),
            None => 0,
        }
    }

    pub(crate) fn count_for(&self, deployment: &DeploymentId) -> usize {
        self.position(deployment)
            .map(|index| self.deployments[index].procedures.len())
            .unwrap_or(0)
    }

    pub(crate) fn contains(&self, deployment: &DeploymentId, name: &str) -> bool {
        self.position(deployment)
            .map(|index| {
                self.deployments[index]
                    .procedures
                    .iter()
                    .any(|procedure| procedure.name() == name)
            })
            .unwrap_or(false)
    }

    pub(crate) fn extend_snapshot(&self, out: &mut Vec<RegisteredProcedure>) {
        for entry in &self.deployments {
            out.extend(entry.procedures.iter().map(|procedure| RegisteredProcedure {
                deployment: entry.deployment.clone(),
                procedure: procedure.clone(),
            }));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.deployments.iter().map(|entry| entry.procedures.len()).sum()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.len();
        self.deployments.clear();
        removed
    }

    fn position(&self, deployment: &DeploymentId) -> Option<usize> {
        self.deployments.iter().position(|entry| &entry.deployment == deployment)
    }
}

/// Registry for one category.
///
/// Mutations take the write lock; `snapshot` copies the `Arc`s out under the
/// read lock so callers invoke procedures with no lock held.
pub struct CategoryRegistry {
    category: Category,
    entries: RwLock<RegistryEntries>,
}

impl CategoryRegistry {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            entries: RwLock::new(RegistryEntries::default()),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Inserts or replaces the procedure with the same name for `deployment`.
    pub fn register(
        &self,
        deployment: &DeploymentId,
        procedure: SharedProcedure,
    ) -> Result<(), RegistrationError> {
        self.validate(deployment, &procedure)?;

        let name = procedure.name().to_string();
        let replaced = self.entries.write().upsert(deployment, procedure);

        debug!(
            category = %self.category,
            deployment = %deployment,
            procedure = %name,
            replaced,
            "procedure registered"
        );
        Ok(())
    }

    pub fn unregister(&self, deployment: &DeploymentId, name: &str) -> bool {
        let removed = self
            .entries
            .write()
            .remove_matching(deployment, |procedure| procedure.name() == name);
        removed > 0
    }

    pub fn unregister_by_deployment(&self, deployment: &DeploymentId) -> usize {
        self.entries.write().remove_deployment(deployment)
    }

    pub fn snapshot(&self) -> Vec<RegisteredProcedure> {
        let mut out = Vec::new();
        self.entries.read().extend_snapshot(&mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_for(&self, deployment: &DeploymentId) -> usize {
        self.entries.read().count_for(deployment)
    }

    pub fn contains(&self, deployment: &DeploymentId, name: &str) -> bool {
        self.entries.read().contains(deployment, name)
    }

    pub fn deployments(&self) -> Vec<DeploymentId> {
        self.entries
            .read()
            .deployments
            .iter()
            .map(|entry| entry.deployment.clone())
            .collect()
    }

    pub fn clear(&self) -> usize {
        self.entries.write().clear()
    }

    pub(crate) fn validate(
        &self,
        deployment: &DeploymentId,
        procedure: &SharedProcedure,
    ) -> Result<(), RegistrationError> {
        if procedure.name().trim().is_empty() {
            return Err(RegistrationError::EmptyName {
                category: self.category,
                deployment: deployment.name().to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, RegistryEntries> {
        self.entries.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RegistryEntries> {
        self.entries.write()
    }
}
