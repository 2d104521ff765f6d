//! Deployment identity used to group and bulk-remove procedures

use uuid::Uuid;

/// Opaque token identifying one deployed application instance.
///
/// Two deployments sharing a name (for example a redeploy racing with the
/// undeploy of its predecessor) stay distinct through their context handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentId {
    name: String,
    handle: Uuid,
}

impl DeploymentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_handle(name, Uuid::new_v4())
    }

    pub fn with_handle(name: impl Into<String>, handle: Uuid) -> Self {
        Self {
            name: name.into(),
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> Uuid {
        self.handle
    }
}

impl std::fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
