pub mod defaults;
pub mod deployment;
pub mod lifecycle;
pub mod model;
pub mod procedure;
pub mod registry;
pub mod reporter;


pub use defaults::DefaultProcedureSupplier;
pub use deployment::DeploymentId;
pub use lifecycle::{
    DeploymentDescriptor, DeploymentRegistration, LifecycleAdapter, ProcedureDiscovery, StaticDiscovery,
    DISABLE_DEFAULT_PROCEDURES,
};
pub use model::{AggregateReport, Category, CheckResult, DataValue, HealthStatus, UnknownCategory};
pub use procedure::{default_readiness_name, DefaultReadinessProcedure, FnProcedure, HealthProcedure, SharedProcedure};
pub use registry::{CategoryRegistry, RegisteredProcedure};
pub use reporter::{HealthReporter, UNNAMED_PROCEDURE};
