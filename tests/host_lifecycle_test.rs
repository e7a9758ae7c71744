use knight_scene::{
    MountStatus, SceneConfig, SceneHost,
    camera::PerspectiveCamera,
    config::CameraConfig,
    container::{Container, Rect},
    context::Context,
    data_structures::{material::MaterialFactory, scene_graph::Scene},
    device::{
        RenderDevice, SurfaceSize,
        headless::{HeadlessDevice, HeadlessFactory},
    },
    driver::{Driver, DriverState},
    knight::build_knight,
    resources::ResourceTracker,
};

use crate::common::test_utils::{ManualTicker, TestContainer, env_map, host, mounted_host};

mod common;

#[test]
fn mount_attaches_one_surface_and_starts_the_driver() {
    let (host, ticker, factory) = mounted_host(400.0, 300.0);

    assert_eq!(host.container().surface_count(), 1);
    assert_eq!(host.container().listener_count(), 2);
    assert_eq!(host.driver_state(), Some(DriverState::Running));
    assert_eq!(factory.created().len(), 1);
    assert_eq!(ticker.starts(), 1);
    assert_eq!(ticker.requests(), 1);

    let surface = host.context().unwrap().surface();
    assert!(host.container().contains_surface(surface));
}

#[test]
fn unmount_runs_every_teardown_step() {
    let (mut host, ticker, factory) = mounted_host(400.0, 300.0);

    let report = host.unmount().expect("was mounted");

    assert!(report.frame_cancelled);
    assert_eq!(report.listeners_removed, 2);
    assert!(report.model.detached);
    assert_eq!(report.model.meshes, 13);
    assert_eq!(report.model.geometries_disposed, 12);
    assert_eq!(report.model.materials_disposed, 12);
    assert!(report.surface_detached);
    assert!(report.device_disposed);

    assert!(!host.is_mounted());
    assert_eq!(host.container().surface_count(), 0);
    assert_eq!(host.container().listener_count(), 0);
    assert!(factory.last().unwrap().is_disposed());
    assert!(!ticker.is_running());
    assert_eq!(ticker.stops(), 1);
}

#[test]
fn second_unmount_is_a_no_op() {
    let (mut host, ticker, factory) = mounted_host(400.0, 300.0);

    assert!(host.unmount().is_some());
    assert!(host.unmount().is_none());

    assert_eq!(ticker.stops(), 1);
    assert_eq!(factory.last().unwrap().snapshot().dispose_calls, 1);
    assert_eq!(host.container().surface_count(), 0);
}

#[test]
fn unmount_without_pending_frame_reports_nothing_cancelled() {
    let (mut host, ticker, _factory) = mounted_host(400.0, 300.0);
    assert!(ticker.fire());

    let report = host.unmount().unwrap();
    assert!(!report.frame_cancelled);
    assert!(report.device_disposed);
}

#[test]
fn repeated_mount_cycles_leave_no_surfaces_behind() {
    let (mut host, ticker) = host(640.0, 480.0);
    let mut factory = HeadlessFactory::new();
    let env_map = env_map();

    for cycle in 1..=5 {
        assert_eq!(host.mount(env_map.clone(), &mut factory), MountStatus::Mounted);
        assert_eq!(host.container().surface_count(), 1);
        for _ in 0..3 {
            if ticker.fire() {
                host.frame(1.0 / 60.0);
            }
        }

        let report = host.unmount().unwrap();
        assert!(report.surface_detached);
        assert!(report.device_disposed);
        assert_eq!(host.container().surface_count(), 0);
        assert_eq!(host.container().listener_count(), 0);
        assert_eq!(factory.created().len(), cycle);
        assert!(host.tracker().counts().is_balanced());
    }

    assert!(factory.created().iter().all(|stats| stats.is_disposed()));
    assert_eq!(host.tracker().counts().geometries_created, 5 * 12);
}

#[test]
fn mounting_twice_keeps_the_first_scene() {
    let (mut host, _ticker, mut factory) = mounted_host(400.0, 300.0);
    let root = host.model().unwrap().root();

    assert_eq!(host.mount(env_map(), &mut factory), MountStatus::AlreadyMounted);
    assert_eq!(factory.created().len(), 1);
    assert_eq!(host.container().surface_count(), 1);
    assert_eq!(host.model().unwrap().root(), root);
}

#[test]
fn mount_defers_until_the_container_is_measurable() {
    let ticker = ManualTicker::new();
    let mut host = SceneHost::new(TestContainer::detached(), SceneConfig::default(), ticker.clone());
    let mut factory = HeadlessFactory::new();

    assert_eq!(host.mount(env_map(), &mut factory), MountStatus::Deferred);
    host.container_mut().set_rect(Some(Rect::from_size(0.0, 300.0)));
    assert_eq!(host.mount(env_map(), &mut factory), MountStatus::Deferred);

    assert!(factory.created().is_empty());
    assert_eq!(host.container().surface_count(), 0);
    assert_eq!(host.container().listener_count(), 0);
    assert_eq!(host.tracker().counts().geometries_created, 0);
    assert_eq!(ticker.starts(), 0);
    assert!(host.unmount().is_none());

    host.container_mut().set_size(400.0, 300.0);
    assert_eq!(host.mount(env_map(), &mut factory), MountStatus::Mounted);
    assert_eq!(host.container().surface_count(), 1);
}

#[test]
fn mount_defers_when_no_device_can_be_created() {
    let (mut host, ticker) = host(400.0, 300.0);
    let mut factory = HeadlessFactory::new();
    factory.fail_with = Some("no adapter".to_string());

    assert_eq!(host.mount(env_map(), &mut factory), MountStatus::Deferred);
    assert_eq!(host.container().surface_count(), 0);
    assert_eq!(ticker.starts(), 0);

    factory.fail_with = None;
    assert_eq!(host.mount(env_map(), &mut factory), MountStatus::Mounted);
}

#[test]
fn mount_with_a_prebuilt_context_skips_the_bootstrapper() {
    let (mut host, ticker) = host(400.0, 300.0);
    let device = HeadlessDevice::new(SurfaceSize::new(400, 300, 1.0));
    let stats = device.stats();
    let context = Context::from_parts(
        Scene::new(),
        PerspectiveCamera::new(&CameraConfig::default(), 400.0, 300.0),
        Box::new(device),
    );
    let surface = context.surface();

    assert_eq!(host.mount_with(context, env_map()), MountStatus::Mounted);
    assert!(host.container().contains_surface(surface));
    assert_eq!(ticker.starts(), 1);

    let report = host.unmount().unwrap();
    assert!(report.surface_detached);
    assert!(stats.is_disposed());
    assert!(!host.container().contains_surface(surface));
}

#[test]
fn frames_render_until_unmount() {
    let (mut host, ticker, factory) = mounted_host(400.0, 300.0);
    let stats = factory.last().unwrap().clone();

    for _ in 0..10 {
        assert!(ticker.fire());
        assert!(host.frame(1.0 / 60.0));
    }
    assert_eq!(stats.frames(), 10);
    assert_eq!(stats.snapshot().meshes_last_frame, 13);

    host.unmount();
    assert!(!ticker.fire());
    assert!(!host.frame(1.0 / 60.0));
    assert_eq!(stats.frames(), 10);
}

#[test]
fn input_is_ignored_after_unmount() {
    let (mut host, _ticker, _factory) = mounted_host(400.0, 300.0);
    host.unmount();

    host.pointer_moved(10.0, 10.0);
    assert!(!host.resize());
    assert!(host.driver().is_none());
}

#[test]
fn dropping_a_mounted_host_tears_it_down() {
    let (host, ticker, factory) = mounted_host(400.0, 300.0);
    let tracker = host.tracker().clone();

    drop(host);

    assert!(factory.last().unwrap().is_disposed());
    assert!(!ticker.is_running());
    assert!(tracker.counts().is_balanced());
}

fn standalone_context() -> Context {
    Context::from_parts(
        Scene::new(),
        PerspectiveCamera::new(&CameraConfig::default(), 400.0, 300.0),
        Box::new(HeadlessDevice::new(SurfaceSize::new(400, 300, 1.0))),
    )
}

#[test]
fn driver_stays_idle_without_a_placed_model() {
    let tracker = ResourceTracker::new();
    let mut elsewhere = Scene::new();
    let model = build_knight(&mut elsewhere, &MaterialFactory::new(&tracker));
    let context = standalone_context();
    let ticker = ManualTicker::new();

    let mut driver = Driver::new(&Default::default(), Box::new(ticker.clone()));
    assert!(!driver.attach(&context, &model));
    assert_eq!(driver.state(), DriverState::Idle);
    assert_eq!(ticker.starts(), 0);
}

#[test]
fn driver_stays_idle_on_a_disposed_device() {
    let tracker = ResourceTracker::new();
    let mut context = standalone_context();
    let model = build_knight(&mut context.scene, &MaterialFactory::new(&tracker));
    context.device.dispose();

    let mut driver = Driver::new(&Default::default(), Box::new(ManualTicker::new()));
    assert!(!driver.attach(&context, &model));
    assert_eq!(driver.state(), DriverState::Idle);
}

#[test]
fn driver_state_machine() {
    let tracker = ResourceTracker::new();
    let mut context = standalone_context();
    let model = build_knight(&mut context.scene, &MaterialFactory::new(&tracker));
    let ticker = ManualTicker::new();
    let mut driver = Driver::new(&Default::default(), Box::new(ticker.clone()));

    assert!(!driver.frame(0.016, &mut context, &model));

    assert!(driver.attach(&context, &model));
    assert!(driver.attach(&context, &model));
    assert_eq!(driver.state(), DriverState::Running);
    assert_eq!(ticker.starts(), 1);

    assert!(driver.frame(0.016, &mut context, &model));

    assert!(driver.stop());
    assert_eq!(driver.state(), DriverState::Stopped);
    assert!(!driver.stop());
    assert_eq!(ticker.stops(), 1);

    assert!(!driver.attach(&context, &model));
    assert!(!driver.frame(0.016, &mut context, &model));
}
