use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use assetpipe::events::AssetEventSink;
use assetpipe::pipeline::{BuildWorker, WorkerOptions};
use assetpipe::store::ProjectId;
use assetpipe_test_utils::builders::{ProjectFixture, StoreFixture};
use assetpipe_test_utils::fakes::{
    FixedRulesFactory, RecordingDelegate, RecordingSink, TestRule,
};
use assetpipe_test_utils::{init_tracing, wait_until};

const TIMEOUT: Duration = Duration::from_secs(10);

struct PipelineHarness {
    fixture: ProjectFixture,
    store_fixture: StoreFixture,
    sink: Arc<RecordingSink>,
    project: ProjectId,
}

impl PipelineHarness {
    fn new() -> Self {
        init_tracing();
        let fixture = ProjectFixture::new();
        let store_fixture = StoreFixture::new();
        let project = {
            let mut store = store_fixture.open();
            store.add_project("Proj", &fixture.root().to_string_lossy())
        };
        Self {
            fixture,
            store_fixture,
            sink: Arc::new(RecordingSink::default()),
            project,
        }
    }

    fn spawn_worker(&self, rules: Vec<TestRule>) -> BuildWorker {
        BuildWorker::spawn(WorkerOptions {
            db_path: self.store_fixture.db_path(),
            engine_factory: Box::new(FixedRulesFactory::new(rules)),
            events: Arc::clone(&self.sink) as Arc<dyn AssetEventSink>,
        })
    }
}

#[test]
fn whole_project_build_then_file_change_recompiles_dependents() {
    let harness = PipelineHarness::new();
    harness.fixture.write("src/tex.png", b"pixels");

    let rule = TestRule::new("png", "dat").copying();
    let worker = harness.spawn_worker(vec![rule.clone()]);
    let mut delegate = RecordingDelegate::default();

    worker.compile_project(harness.project);
    assert!(wait_until(TIMEOUT, || {
        worker.dispatch_events(&mut delegate);
        !delegate.builds.is_empty()
    }));

    assert_eq!(delegate.builds[0].project, harness.project);
    assert_eq!(delegate.builds[0].succeeded, 1);
    assert_eq!(delegate.builds[0].failed, 0);
    assert_eq!(delegate.assets_compiled, 1);

    // The dependency edge maps the output back to its input.
    let store = harness.store_fixture.open();
    assert_eq!(
        store.dependents(harness.project, "src/tex.png"),
        vec!["data/tex.dat"]
    );
    drop(store);

    // A change to the input recompiles exactly its dependents.
    worker.file_changed(harness.fixture.path("src/tex.png"));
    assert!(wait_until(TIMEOUT, || {
        worker.dispatch_events(&mut delegate);
        !delegate.recompiles.is_empty()
    }));

    assert_eq!(delegate.recompiles[0].path, "src/tex.png");
    assert!(delegate.recompiles[0].succeeded);
    assert_eq!(rule.compiled(), vec!["src/tex.png", "src/tex.png"]);

    // Both compiles announced the output, relative to the data dir.
    assert_eq!(harness.sink.notified(), vec!["tex.dat", "tex.dat"]);
}

#[test]
fn file_change_recompiles_only_dependent_outputs() {
    let harness = PipelineHarness::new();
    harness.fixture.write("src/a.png", b"a");
    harness.fixture.write("src/b.png", b"b");

    let rule = TestRule::new("png", "dat").copying();
    let worker = harness.spawn_worker(vec![rule.clone()]);
    let mut delegate = RecordingDelegate::default();

    worker.compile_project(harness.project);
    assert!(wait_until(TIMEOUT, || {
        worker.dispatch_events(&mut delegate);
        !delegate.builds.is_empty()
    }));
    assert_eq!(delegate.builds[0].succeeded, 2);

    worker.file_changed(harness.fixture.path("src/a.png"));
    assert!(wait_until(TIMEOUT, || {
        worker.dispatch_events(&mut delegate);
        !delegate.recompiles.is_empty()
    }));

    // Only a.png's output was rebuilt, not the whole asset set.
    assert_eq!(
        rule.compiled(),
        vec!["src/a.png", "src/b.png", "src/a.png"]
    );
}

#[test]
fn second_build_of_an_up_to_date_project_compiles_nothing() {
    let harness = PipelineHarness::new();
    harness.fixture.write("src/tex.png", b"pixels");

    let rule = TestRule::new("png", "dat").copying();
    let worker = harness.spawn_worker(vec![rule.clone()]);
    let mut delegate = RecordingDelegate::default();

    worker.compile_project(harness.project);
    assert!(wait_until(TIMEOUT, || {
        worker.dispatch_events(&mut delegate);
        !delegate.builds.is_empty()
    }));
    assert_eq!(delegate.builds[0].succeeded, 1);

    worker.compile_project(harness.project);
    assert!(wait_until(TIMEOUT, || {
        worker.dispatch_events(&mut delegate);
        delegate.builds.len() == 2
    }));

    // Outputs are newer than inputs; the second pass had nothing to do.
    assert_eq!(delegate.builds[1].succeeded, 0);
    assert_eq!(delegate.builds[1].failed, 0);
    assert_eq!(rule.compiled().len(), 1);
}

#[test]
fn failed_assets_are_counted_and_reported_with_detail() {
    let harness = PipelineHarness::new();
    harness.fixture.write("src/good.png", b"good");
    harness.fixture.write("src/bad.png", b"bad");

    let rule = TestRule::new("png", "dat").copying().failing_on("src/bad.png");
    let worker = harness.spawn_worker(vec![rule]);
    let mut delegate = RecordingDelegate::default();

    worker.compile_project(harness.project);
    assert!(wait_until(TIMEOUT, || {
        worker.dispatch_events(&mut delegate);
        !delegate.builds.is_empty()
    }));

    assert_eq!(delegate.builds[0].succeeded, 1);
    assert_eq!(delegate.builds[0].failed, 1);
    assert_eq!(delegate.failures.len(), 1);
    assert_eq!(delegate.failures[0].input_paths, vec!["src/bad.png"]);
    assert_eq!(delegate.failures[0].output_paths, vec!["data/bad.dat"]);

    // The failure is also persisted for later inspection.
    let store = harness.store_fixture.open();
    let ids = store.error_ids(harness.project);
    assert_eq!(ids.len(), 1);
    assert_eq!(
        store.error_message(ids[0]),
        "synthetic failure for src/bad.png"
    );
}

#[test]
fn file_change_before_any_build_is_ignored() {
    let harness = PipelineHarness::new();
    harness.fixture.write("src/tex.png", b"pixels");

    let worker = harness.spawn_worker(vec![TestRule::new("png", "dat")]);
    let mut delegate = RecordingDelegate::default();

    worker.file_changed(harness.fixture.path("src/tex.png"));
    std::thread::sleep(Duration::from_millis(200));
    worker.dispatch_events(&mut delegate);

    assert!(delegate.builds.is_empty());
    assert!(delegate.recompiles.is_empty());
}

#[test]
fn cancellation_takes_effect_within_one_asset() {
    let harness = PipelineHarness::new();
    for i in 0..12 {
        harness.fixture.write(&format!("src/tex{i:02}.png"), b"pixels");
    }

    let (permits, gate) = mpsc::channel();
    let rule = TestRule::new("png", "dat").copying().gated_by(gate);
    let worker = harness.spawn_worker(vec![rule.clone()]);
    let mut delegate = RecordingDelegate::default();

    worker.compile_project(harness.project);

    // Let exactly three assets through, then cancel mid-pass.
    for _ in 0..3 {
        permits.send(()).unwrap();
    }
    assert!(wait_until(TIMEOUT, || {
        worker.dispatch_events(&mut delegate);
        delegate.assets_compiled >= 3
    }));
    worker.cancel();

    // Unblock the asset that may already be in flight; the cancel must
    // stop the pass before any further asset starts.
    permits.send(()).unwrap();

    assert!(wait_until(TIMEOUT, || {
        worker.dispatch_events(&mut delegate);
        !delegate.builds.is_empty()
    }));

    let summary = &delegate.builds[0];
    assert_eq!(summary.failed, 0);
    // At most the in-flight asset completed after the cancel.
    assert!(summary.succeeded >= 3 && summary.succeeded <= 4);
    assert!(summary.succeeded < 12);
    // The summary reflects exactly the assets that actually compiled.
    assert_eq!(rule.compiled().len() as u32, summary.succeeded);
}
