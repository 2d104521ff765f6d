use health_core::{
    Category, CheckResult, DeploymentDescriptor, DeploymentId, FnProcedure, HealthReporter, LifecycleAdapter,
    SharedProcedure, StaticDiscovery,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

fn up(name: &str) -> SharedProcedure {
    let result_name = name.to_string();
    FnProcedure::shared(name, move || Ok(CheckResult::up(result_name.clone())))
}

fn discovery_with_readiness(prefix: &str, count: usize) -> StaticDiscovery {
    (0..count).fold(StaticDiscovery::new(), |discovery, i| {
        discovery.with_readiness_check(up(&format!("{}-{}", prefix, i)))
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_undeploy_is_atomic_for_concurrent_probes() {
    let reporter = Arc::new(HealthReporter::new());
    let lifecycle = LifecycleAdapter::new(reporter.clone());
    let stop = Arc::new(AtomicBool::new(false));

    let mut probes = Vec::new();
    for _ in 0..4 {
        let reporter = reporter.clone();
        let stop = stop.clone();
        probes.push(tokio::spawn(async move {
            let mut observed = 0usize;
            while !stop.load(Ordering::SeqCst) {
                let report = reporter.get_health(Category::Readiness).await;
                let cycling = report
                    .checks
                    .iter()
                    .filter(|check| check.name.starts_with("cycling-"))
                    .count();
                assert!(cycling == 0 || cycling == 5, "observed partial deployment: {}", cycling);
                observed += 1;
                tokio::task::yield_now().await;
            }
            observed
        }));
    }

    for round in 0..50 {
        let descriptor = DeploymentDescriptor::new(DeploymentId::new(format!("cycling-{}.war", round)));
        let registration = lifecycle.on_deployed(&descriptor, &discovery_with_readiness("cycling", 5));
        assert_eq!(registration.readiness, 5);
        assert_eq!(registration.default_procedure, None);

        tokio::task::yield_now().await;
        assert_eq!(lifecycle.on_undeployed(&descriptor.id), 5);
    }

    stop.store(true, Ordering::SeqCst);
    for probe in probes {
        assert!(probe.await.unwrap() > 0);
    }
    assert_eq!(reporter.registered_count(Category::Readiness), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deployments_stay_isolated() {
    let reporter = Arc::new(HealthReporter::new());
    let lifecycle = LifecycleAdapter::new(reporter.clone());

    let mut deployers = Vec::new();
    for i in 0..16 {
        let lifecycle = lifecycle.clone();
        deployers.push(tokio::spawn(async move {
            let descriptor = DeploymentDescriptor::new(DeploymentId::new(format!("app-{}.war", i)));
            let discovery = StaticDiscovery::new()
                .with_liveness_check(up(&format!("live-{}", i)))
                .with_check(up(&format!("general-{}", i)));
            lifecycle.on_deployed(&descriptor, &discovery);
            descriptor
        }));
    }

    let mut descriptors = Vec::new();
    for deployer in deployers {
        descriptors.push(deployer.await.unwrap());
    }

    assert_eq!(reporter.registered_count(Category::General), 16);
    assert_eq!(reporter.registered_count(Category::Liveness), 16);
    assert_eq!(reporter.registered_count(Category::Readiness), 16);
    assert!(reporter.get_overall_health().await.is_up());

    let mut undeployers = Vec::new();
    for descriptor in descriptors.iter().step_by(2).cloned() {
        let lifecycle = lifecycle.clone();
        undeployers.push(tokio::spawn(async move { lifecycle.on_undeployed(&descriptor.id) }));
    }
    for undeployer in undeployers {
        assert_eq!(undeployer.await.unwrap(), 3);
    }

    let readiness = reporter.get_health(Category::Readiness).await;
    assert_eq!(readiness.checks.len(), 8);
    for (i, descriptor) in descriptors.iter().enumerate() {
        let default_name = format!("ready-{}", descriptor.id.name());
        assert_eq!(readiness.find(&default_name).is_some(), i % 2 == 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_hanging_check_does_not_block_registrations() {
    let reporter = Arc::new(HealthReporter::new());
    let stuck = DeploymentId::new("stuck.war");

    let gate = Arc::new((Mutex::new(false), Condvar::new()));
    let entered = Arc::new(Notify::new());

    let procedure = {
        let gate = gate.clone();
        let entered = entered.clone();
        FnProcedure::shared("stuck", move || {
            entered.notify_one();
            let (lock, released) = &*gate;
            let mut open = lock.lock().unwrap();
            while !*open {
                open = released.wait(open).unwrap();
            }
            Ok(CheckResult::up("stuck"))
        })
    };
    reporter.add_liveness_check(&stuck, procedure).unwrap();

    let probe = {
        let reporter = reporter.clone();
        tokio::spawn(async move { reporter.get_health(Category::Liveness).await })
    };
    entered.notified().await;

    let other = DeploymentId::new("other.war");
    reporter.add_liveness_check(&other, up("other-live")).unwrap();
    assert_eq!(reporter.remove_by_deployment(&other), 1);
    assert!(reporter.get_health(Category::General).await.is_up());

    {
        let (lock, released) = &*gate;
        *lock.lock().unwrap() = true;
        released.notify_all();
    }

    let report = tokio::time::timeout(Duration::from_secs(5), probe)
        .await
        .expect("probe should finish once released")
        .unwrap();
    assert!(report.is_up());
    assert_eq!(report.checks.len(), 1);
}

#[tokio::test]
async fn test_undeploy_during_probe_keeps_collected_results() {
    let reporter = Arc::new(HealthReporter::new());
    let lifecycle = LifecycleAdapter::new(reporter.clone());
    let leaving = DeploymentDescriptor::new(DeploymentId::new("leaving.war"));

    let undeploy_hook = {
        let lifecycle = lifecycle.clone();
        let id = leaving.id.clone();
        FnProcedure::shared("trigger", move || {
            lifecycle.on_undeployed(&id);
            Ok(CheckResult::up("trigger"))
        })
    };
    let discovery = StaticDiscovery::new()
        .with_readiness_check(undeploy_hook)
        .with_readiness_check(up("after-trigger"));
    lifecycle.on_deployed(&leaving, &discovery);

    let report = reporter.get_health(Category::Readiness).await;
    assert_eq!(report.checks.len(), 2);
    assert!(report.is_up());

    assert!(reporter.get_health(Category::Readiness).await.checks.is_empty());
}
