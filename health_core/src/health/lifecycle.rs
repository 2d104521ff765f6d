//! Deployment lifecycle adapter: registers a deployment's procedures when it
//! comes up and removes them when it goes away.

use super::deployment::DeploymentId;
use super::model::Category;
use super::procedure::SharedProcedure;
use super::reporter::HealthReporter;
use crate::config::HealthConfig;
use crate::error::RegistrationError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Deployment property that suppresses the default readiness procedure.
pub const DISABLE_DEFAULT_PROCEDURES: &str = "mp.health.disable-default-procedures";

/// Locates the procedures a deployment provides for a category.
pub trait ProcedureDiscovery: Send + Sync {
    fn discover(&self, category: Category) -> Vec<SharedProcedure>;
}

/// Discovery backed by procedures handed over up front.
#[derive(Default, Clone)]
pub struct StaticDiscovery {
    general: Vec<SharedProcedure>,
    liveness: Vec<SharedProcedure>,
    readiness: Vec<SharedProcedure>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: Category, procedure: SharedProcedure) -> Self {
        match category {
            Category::General => self.general.push(procedure),
            Category::Liveness => self.liveness.push(procedure),
            Category::Readiness => self.readiness.push(procedure),
        }
        self
    }

    pub fn with_check(self, procedure: SharedProcedure) -> Self {
        self.with(Category::General, procedure)
    }

    pub fn with_liveness_check(self, procedure: SharedProcedure) -> Self {
        self.with(Category::Liveness, procedure)
    }

    pub fn with_readiness_check(self, procedure: SharedProcedure) -> Self {
        self.with(Category::Readiness, procedure)
    }
}

impl ProcedureDiscovery for StaticDiscovery {
    fn discover(&self, category: Category) -> Vec<SharedProcedure> {
        match category {
            Category::General => self.general.clone(),
            Category::Liveness => self.liveness.clone(),
            Category::Readiness => self.readiness.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentDescriptor {
    pub id: DeploymentId,
    pub properties: HashMap<String, String>,
}

impl DeploymentDescriptor {
    pub fn new(id: DeploymentId) -> Self {
        Self {
            id,
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The deployment's own setting, if it declares a valid one.
    pub fn disable_default_procedures(&self) -> Option<bool> {
        let raw = self.properties.get(DISABLE_DEFAULT_PROCEDURES)?;

        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => {
                warn!(
                    "Ignoring invalid value '{}' for '{}' in deployment '{}'",
                    raw, DISABLE_DEFAULT_PROCEDURES, self.id
                );
                None
            }
        }
    }
}

/// Outcome of registering one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRegistration {
    pub deployment: DeploymentId,
    pub general: usize,
    pub liveness: usize,
    pub readiness: usize,
    pub default_procedure: Option<String>,
    pub rejected: Vec<RegistrationError>,
}

impl DeploymentRegistration {
    pub fn new(deployment: DeploymentId) -> Self {
        Self {
            deployment,
            general: 0,
            liveness: 0,
            readiness: 0,
            default_procedure: None,
            rejected: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, category: Category) {
        match category {
            Category::General => self.general += 1,
            Category::Liveness => self.liveness += 1,
            Category::Readiness => self.readiness += 1,
        }
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::General => self.general,
            Category::Liveness => self.liveness,
            Category::Readiness => self.readiness,
        }
    }

    pub fn registered(&self) -> usize {
        self.general + self.liveness + self.readiness
    }
}

/// Bridges deployment lifecycle events to the reporter.
#[derive(Clone)]
pub struct LifecycleAdapter {
    reporter: Arc<HealthReporter>,
    disable_default_procedures: bool,
}

impl LifecycleAdapter {
    pub fn new(reporter: Arc<HealthReporter>) -> Self {
        Self {
            reporter,
            disable_default_procedures: false,
        }
    }

    pub fn from_config(reporter: Arc<HealthReporter>, config: &HealthConfig) -> Self {
        Self::new(reporter).with_default_procedures_disabled(config.disable_default_procedures)
    }

    /// Server-wide fallback when a deployment does not set the property.
    pub fn with_default_procedures_disabled(mut self, disabled: bool) -> Self {
        self.disable_default_procedures = disabled;
        self
    }

    pub fn reporter(&self) -> &Arc<HealthReporter> {
        &self.reporter
    }

    pub fn on_deployed(
        &self,
        descriptor: &DeploymentDescriptor,
        discovery: &dyn ProcedureDiscovery,
    ) -> DeploymentRegistration {
        let procedures: Vec<(Category, SharedProcedure)> = Category::ALL
            .iter()
            .flat_map(|&category| {
                discovery
                    .discover(category)
                    .into_iter()
                    .map(move |procedure| (category, procedure))
            })
            .collect();

        let disabled = descriptor
            .disable_default_procedures()
            .unwrap_or(self.disable_default_procedures);

        let registration = self
            .reporter
            .register_deployment(&descriptor.id, procedures, !disabled);

        info!(
            "Deployment '{}' registered {} health procedures ({} general, {} liveness, {} readiness), default readiness: {}",
            descriptor.id,
            registration.registered(),
            registration.general,
            registration.liveness,
            registration.readiness,
            registration.default_procedure.as_deref().unwrap_or("none")
        );
        registration
    }

    pub fn on_undeployed(&self, deployment: &DeploymentId) -> usize {
        info!("Deployment '{}' undeployed, removing its health procedures", deployment);
        self.reporter.remove_by_deployment(deployment)
    }
}
