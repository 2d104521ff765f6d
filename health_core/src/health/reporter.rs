//! Health reporter: owns the category registries and computes aggregates

use super::defaults::DefaultProcedureSupplier;
use super::deployment::DeploymentId;
use super::lifecycle::DeploymentRegistration;
use super::model::{AggregateReport, Category, CheckResult, HealthStatus};
use super::procedure::{panic_message, SharedProcedure};
use super::registry::{CategoryRegistry, RegisteredProcedure};
use crate::config::HealthConfig;
use crate::error::RegistrationError;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Result name used when a procedure cannot report its own name.
pub const UNNAMED_PROCEDURE: &str = "unnamed";

/// Process-wide registry of deployment health procedures.
///
/// Registration, removal and aggregation may all run concurrently. Procedures
/// are always invoked with no registry lock held.
pub struct HealthReporter {
    general: CategoryRegistry,
    liveness: CategoryRegistry,
    readiness: CategoryRegistry,
    defaults: DefaultProcedureSupplier,
    check_timeout: Option<Duration>,
}

impl HealthReporter {
    pub fn new() -> Self {
        Self {
            general: CategoryRegistry::new(Category::General),
            liveness: CategoryRegistry::new(Category::Liveness),
            readiness: CategoryRegistry::new(Category::Readiness),
            defaults: DefaultProcedureSupplier::new(),
            check_timeout: None,
        }
    }

    pub fn from_config(config: &HealthConfig) -> Self {
        let reporter = Self::new();
        match config.check_timeout() {
            Some(timeout) => reporter.with_check_timeout(timeout),
            None => reporter,
        }
    }

    /// Bounds every single procedure invocation; an overrun reports DOWN.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    pub fn check_timeout(&self) -> Option<Duration> {
        self.check_timeout
    }

    pub fn registry(&self, category: Category) -> &CategoryRegistry {
        match category {
            Category::General => &self.general,
            Category::Liveness => &self.liveness,
            Category::Readiness => &self.readiness,
        }
    }

    pub fn add(
        &self,
        category: Category,
        deployment: &DeploymentId,
        procedure: SharedProcedure,
    ) -> Result<(), RegistrationError> {
        self.registry(category).register(deployment, procedure)
    }

    pub fn add_check(&self, deployment: &DeploymentId, procedure: SharedProcedure) -> Result<(), RegistrationError> {
        self.add(Category::General, deployment, procedure)
    }

    pub fn add_liveness_check(&self, deployment: &DeploymentId, procedure: SharedProcedure) -> Result<(), RegistrationError> {
        self.add(Category::Liveness, deployment, procedure)
    }

    pub fn add_readiness_check(&self, deployment: &DeploymentId, procedure: SharedProcedure) -> Result<(), RegistrationError> {
        self.add(Category::Readiness, deployment, procedure)
    }

    pub fn remove(&self, category: Category, deployment: &DeploymentId, name: &str) -> bool {
        self.registry(category).unregister(deployment, name)
    }

    pub fn remove_check(&self, deployment: &DeploymentId, name: &str) -> bool {
        self.remove(Category::General, deployment, name)
    }

    pub fn remove_liveness_check(&self, deployment: &DeploymentId, name: &str) -> bool {
        self.remove(Category::Liveness, deployment, name)
    }

    pub fn remove_readiness_check(&self, deployment: &DeploymentId, name: &str) -> bool {
        self.remove(Category::Readiness, deployment, name)
    }

    /// Registers all of a deployment's procedures under the three write locks
    /// at once, so a concurrent aggregate sees none or all of them. Rejected
    /// procedures are reported without affecting their siblings. The default
    /// readiness procedure, when requested, is evaluated last.
    pub fn register_deployment(
        &self,
        deployment: &DeploymentId,
        procedures: Vec<(Category, SharedProcedure)>,
        install_default: bool,
    ) -> DeploymentRegistration {
        let mut registration = DeploymentRegistration::new(deployment.clone());
        let mut accepted = Vec::with_capacity(procedures.len());

        for (category, procedure) in procedures {
            match self.registry(category).validate(deployment, &procedure) {
                Ok(()) => accepted.push((category, procedure)),
                Err(e) => {
                    warn!("Rejected health procedure: {}", e);
                    registration.rejected.push(e);
                }
            }
        }

        {
            let mut general = self.general.write();
            let mut liveness = self.liveness.write();
            let mut readiness = self.readiness.write();

            for (category, procedure) in accepted {
                let entries = match category {
                    Category::General => &mut *general,
                    Category::Liveness => &mut *liveness,
                    Category::Readiness => &mut *readiness,
                };
                if !entries.upsert(deployment, procedure) {
                    registration.record(category);
                }
            }

            if install_default {
                registration.default_procedure = self.defaults.install_into(&mut readiness, deployment);
            }
        }

        registration
    }

    /// Removes every procedure of `deployment`, default included, from all
    /// categories at once. Returns the number of procedures removed.
    pub fn remove_by_deployment(&self, deployment: &DeploymentId) -> usize {
        let removed = {
            let mut general = self.general.write();
            let mut liveness = self.liveness.write();
            let mut readiness = self.readiness.write();

            general.remove_deployment(deployment)
                + liveness.remove_deployment(deployment)
                + readiness.remove_deployment(deployment)
        };

        if removed > 0 {
            info!("Removed {} health procedures of deployment '{}'", removed, deployment);
        } else {
            debug!(deployment = %deployment, "no health procedures to remove");
        }
        removed
    }

    pub fn install_default_readiness(&self, deployment: &DeploymentId) -> Option<String> {
        self.defaults.maybe_install_default(&self.readiness, deployment)
    }

    pub fn remove_default_readiness(&self, deployment: &DeploymentId) -> bool {
        self.defaults.remove_default(&self.readiness, deployment)
    }

    pub fn registered_count(&self, category: Category) -> usize {
        self.registry(category).len()
    }

    /// Invokes every procedure of `category` in registration order.
    pub async fn get_health(&self, category: Category) -> AggregateReport {
        let snapshot = self.registry(category).snapshot();
        self.aggregate(category.as_str(), snapshot).await
    }

    /// Aggregates all three categories from one consistent snapshot.
    pub async fn get_overall_health(&self) -> AggregateReport {
        let snapshot = self.overall_snapshot();
        self.aggregate("overall", snapshot).await
    }

    /// Clears every registry. Called once at server stop.
    pub fn shutdown(&self) -> usize {
        let removed = {
            let mut general = self.general.write();
            let mut liveness = self.liveness.write();
            let mut readiness = self.readiness.write();
            general.clear() + liveness.clear() + readiness.clear()
        };
        info!("Health reporter shut down, {} procedures discarded", removed);
        removed
    }

    fn overall_snapshot(&self) -> Vec<RegisteredProcedure> {
        let general = self.general.read();
        let liveness = self.liveness.read();
        let readiness = self.readiness.read();

        let mut snapshot = Vec::with_capacity(general.len() + liveness.len() + readiness.len());
        general.extend_snapshot(&mut snapshot);
        liveness.extend_snapshot(&mut snapshot);
        readiness.extend_snapshot(&mut snapshot);
        snapshot
    }

    async fn aggregate(&self, scope: &str, snapshot: Vec<RegisteredProcedure>) -> AggregateReport {
        let start = Instant::now();
        let mut report = AggregateReport::new();

        for entry in &snapshot {
            report.add_check(self.invoke(entry).await);
        }

        info!(
            scope,
            status = %report.status,
            checks = report.checks.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "health aggregate completed"
        );
        report
    }

    async fn invoke(&self, entry: &RegisteredProcedure) -> CheckResult {
        let name = match std::panic::catch_unwind(AssertUnwindSafe(|| entry.procedure.name().to_string())) {
            Ok(name) => name,
            Err(payload) => {
                error!(
                    "Health procedure of deployment '{}' panicked while naming itself: {}",
                    entry.deployment,
                    panic_message(&*payload)
                );
                UNNAMED_PROCEDURE.to_string()
            }
        };
        let start = Instant::now();
        // `call` itself may panic before returning a future.
        let call = AssertUnwindSafe(async { entry.procedure.call().await }).catch_unwind();

        let outcome = match self.check_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(
                        "Health check '{}' of deployment '{}' timed out after {:?}",
                        name, entry.deployment, limit
                    );
                    return CheckResult::down(name)
                        .with_data("error", format!("check timed out after {}ms", limit.as_millis()));
                }
            },
            None => call.await,
        };
        let elapsed = start.elapsed();

        match outcome {
            Ok(Ok(result)) => {
                match result.status {
                    HealthStatus::Up => {
                        debug!("Health check '{}' passed in {:?}", result.name, elapsed);
                    }
                    HealthStatus::Down => {
                        warn!(
                            "Health check '{}' of deployment '{}' reported DOWN in {:?}",
                            result.name, entry.deployment, elapsed
                        );
                    }
                }
                result
            }
            Ok(Err(e)) => {
                error!(
                    "Health check '{}' of deployment '{}' failed in {:?}: {:#}",
                    name, entry.deployment, elapsed, e
                );
                CheckResult::down(name).with_data("error", format!("{:#}", e))
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                error!(
                    "Health check '{}' of deployment '{}' panicked: {}",
                    name, entry.deployment, message
                );
                CheckResult::down(name).with_data("error", format!("check panicked: {}", message))
            }
        }
    }
}

impl Default for HealthReporter {
    fn default() -> Self {
        Self::new()
    }
}
