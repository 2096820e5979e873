use assetpipe_test_utils::builders::StoreFixture;

#[test]
fn projects_get_distinct_ids_and_round_trip() {
    let fixture = StoreFixture::new();
    let mut store = fixture.open();

    assert_eq!(store.num_projects(), 0);
    let a = store.add_project("First", "/proj/a");
    let b = store.add_project("Second", "/proj/b");
    assert_ne!(a, b);

    assert_eq!(store.num_projects(), 2);
    assert_eq!(store.project_ids(), vec![a, b]);
    assert_eq!(store.project_name(a), "First");
    assert_eq!(store.project_directory(b), "/proj/b");
}

#[test]
fn duplicate_names_and_directories_are_permitted() {
    let fixture = StoreFixture::new();
    let mut store = fixture.open();

    let a = store.add_project("Same", "/proj");
    let b = store.add_project("Same", "/proj");
    assert_ne!(a, b);
    assert_eq!(store.num_projects(), 2);
}

#[test]
fn active_project_is_nullable_and_persisted() {
    let fixture = StoreFixture::new();
    let id = {
        let mut store = fixture.open();
        assert_eq!(store.active_project(), None);
        let id = store.add_project("Proj", "/proj");
        store.set_active_project(Some(id));
        assert_eq!(store.active_project(), Some(id));
        id
    };

    // Selection survives reopening.
    let mut store = fixture.open();
    assert_eq!(store.active_project(), Some(id));
    store.set_active_project(None);
    assert_eq!(store.active_project(), None);
}

#[test]
fn recorded_dependencies_are_queryable_by_input() {
    let fixture = StoreFixture::new();
    let mut store = fixture.open();
    let project = store.add_project("Proj", "/proj");

    store.record_dependency(project, "data/atlas.dat", "src/a.png");
    store.record_dependency(project, "data/atlas.dat", "src/b.png");
    store.record_dependency(project, "data/b.dat", "src/b.png");

    assert_eq!(store.dependents(project, "src/a.png"), vec!["data/atlas.dat"]);
    assert_eq!(
        store.dependents(project, "src/b.png"),
        vec!["data/atlas.dat", "data/b.dat"]
    );
    assert!(store.dependents(project, "src/unknown.png").is_empty());
}

#[test]
fn clearing_then_recording_replaces_the_edge_set() {
    let fixture = StoreFixture::new();
    let mut store = fixture.open();
    let project = store.add_project("Proj", "/proj");

    store.clear_dependencies(project, "data/out.dat");
    store.record_dependency(project, "data/out.dat", "src/old1.png");
    store.record_dependency(project, "data/out.dat", "src/old2.png");

    // Replace: clear first, then record the fresh set.
    store.clear_dependencies(project, "data/out.dat");
    store.record_dependency(project, "data/out.dat", "src/new1.png");
    store.record_dependency(project, "data/out.dat", "src/new2.png");

    assert_eq!(store.dependents(project, "src/new1.png"), vec!["data/out.dat"]);
    assert_eq!(store.dependents(project, "src/new2.png"), vec!["data/out.dat"]);
    // No stale edges from the previous set.
    assert!(store.dependents(project, "src/old1.png").is_empty());
    assert!(store.dependents(project, "src/old2.png").is_empty());
}

#[test]
fn dependencies_are_scoped_by_project() {
    let fixture = StoreFixture::new();
    let mut store = fixture.open();
    let a = store.add_project("A", "/a");
    let b = store.add_project("B", "/b");

    store.record_dependency(a, "data/out.dat", "src/in.png");

    assert_eq!(store.dependents(a, "src/in.png"), vec!["data/out.dat"]);
    assert!(store.dependents(b, "src/in.png").is_empty());
}
