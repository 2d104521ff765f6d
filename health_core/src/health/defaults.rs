//! Fallback readiness procedures for deployments that declare none

use super::deployment::DeploymentId;
use super::model::Category;
use super::procedure::{DefaultReadinessProcedure, SharedProcedure};
use super::registry::{CategoryRegistry, RegistryEntries};
use std::sync::Arc;
use tracing::{debug, info};

/// Supplies the synthetic always-UP readiness procedure.
///
/// A deployment without readiness procedures would otherwise make no
/// statement at all, which must not read as "not ready".
#[derive(Debug, Default, Clone)]
pub struct DefaultProcedureSupplier;

impl DefaultProcedureSupplier {
    pub fn new() -> Self {
        Self
    }

    pub fn procedure_for(&self, deployment: &DeploymentId) -> SharedProcedure {
        Arc::new(DefaultReadinessProcedure::new(deployment))
    }

    /// Installs the default procedure if `deployment` has no readiness
    /// procedures. The emptiness check and the insert share one write lock.
    ///
    /// Returns the installed procedure's name.
    pub fn maybe_install_default(
        &self,
        readiness: &CategoryRegistry,
        deployment: &DeploymentId,
    ) -> Option<String> {
        debug_assert_eq!(readiness.category(), Category::Readiness);

        let installed = self.install_into(&mut readiness.write(), deployment);
        if let Some(name) = &installed {
            info!("Installed default readiness procedure '{}' for deployment '{}'", name, deployment);
        }
        installed
    }

    pub(crate) fn install_into(
        &self,
        readiness: &mut RegistryEntries,
        deployment: &DeploymentId,
    ) -> Option<String> {
        let existing = readiness.count_for(deployment);
        if existing > 0 {
            debug!(
                deployment = %deployment,
                existing,
                "deployment declares readiness procedures, no default installed"
            );
            return None;
        }

        let procedure = self.procedure_for(deployment);
        let name = procedure.name().to_string();
        readiness.upsert(deployment, procedure);
        Some(name)
    }

    /// Removes the synthetic procedure of `deployment`, if any.
    pub fn remove_default(&self, readiness: &CategoryRegistry, deployment: &DeploymentId) -> bool {
        let removed = readiness
            .write()
            .remove_matching(deployment, |procedure| procedure.is_default());
        removed > 0
    }
}
