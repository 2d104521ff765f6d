//! Health procedures: the invokable units deployments register

use super::deployment::DeploymentId;
use super::model::CheckResult;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const DEFAULT_READINESS_PREFIX: &str = "ready-";

/// A named unit of deployment-supplied health logic.
///
/// Implementations may block or perform I/O. An `Err` (or a panic) is treated
/// as an unexpected failure and reported as DOWN by the reporter.
#[async_trait::async_trait]
pub trait HealthProcedure: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self) -> anyhow::Result<CheckResult>;

    /// True only for procedures synthesized by the server itself.
    fn is_default(&self) -> bool {
        false
    }
}

pub type SharedProcedure = Arc<dyn HealthProcedure>;

type CheckFn = dyn Fn() -> anyhow::Result<CheckResult> + Send + Sync;

/// Wraps a synchronous closure. The closure runs on the blocking pool so a
/// slow check never stalls the async workers.
///
/// At most one invocation of the closure runs at a time. Later calls wait for
/// it to finish, so a hung closure pins a single blocking thread no matter how
/// often it is invoked.
pub struct FnProcedure {
    name: String,
    check_fn: Arc<CheckFn>,
    in_flight: Arc<Semaphore>,
}

impl FnProcedure {
    pub fn new<F>(name: impl Into<String>, check_fn: F) -> Self
    where
        F: Fn() -> anyhow::Result<CheckResult> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check_fn: Arc::new(check_fn),
            in_flight: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn shared<F>(name: impl Into<String>, check_fn: F) -> SharedProcedure
    where
        F: Fn() -> anyhow::Result<CheckResult> + Send + Sync + 'static,
    {
        Arc::new(Self::new(name, check_fn))
    }
}

#[async_trait::async_trait]
impl HealthProcedure for FnProcedure {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self) -> anyhow::Result<CheckResult> {
        let permit = Arc::clone(&self.in_flight)
            .acquire_owned()
            .await
            .map_err(|e| anyhow::anyhow!("check is unavailable: {}", e))?;
        let check_fn = Arc::clone(&self.check_fn);

        // The permit lives until the closure returns, not until the caller gives up.
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            check_fn()
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                Err(anyhow::anyhow!("check panicked: {}", panic_message(&*e.into_panic())))
            }
            Err(e) => Err(anyhow::anyhow!("check was cancelled: {}", e)),
        }
    }
}

/// Always-UP readiness procedure for deployments that declare none.
pub struct DefaultReadinessProcedure {
    name: String,
}

impl DefaultReadinessProcedure {
    pub fn new(deployment: &DeploymentId) -> Self {
        Self {
            name: default_readiness_name(deployment),
        }
    }
}

#[async_trait::async_trait]
impl HealthProcedure for DefaultReadinessProcedure {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self) -> anyhow::Result<CheckResult> {
        Ok(CheckResult::up(self.name.clone()))
    }

    fn is_default(&self) -> bool {
        true
    }
}

pub fn default_readiness_name(deployment: &DeploymentId) -> String {
    format!("{}{}", DEFAULT_READINESS_PREFIX, deployment.name())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
