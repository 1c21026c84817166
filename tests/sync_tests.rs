//! Integration tests for the sync engine.
//!
//! Every test runs against an isolated `.minecraft` directory with an
//! in-memory catalog, fetcher and loader installer.


use packsmith::resolver::SkipReason;
use packsmith::sync::{load_pack, RemovePackOutcome};
use packsmith::{
    add_content, available_runtime_versions, change_runtime_version, create_custom, export_pack,
    install_from_archive, install_from_catalog, install_from_staging, pack_directory,
    remove_artifact, remove_pack, update_pack, CatalogProject, Error, FileEntry, Manifest,
    ProfileRegistry, ProjectType, INDEX_FILE_NAME,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use test_utils::{
    catalog_file, catalog_version, mod_entry, mod_jar, FakeCatalog, FakeFetcher, FakeLoader,
    TestLayout, LOADER, RUNTIME,
};

fn project(slug: &str, project_type: ProjectType) -> CatalogProject {
    CatalogProject {
        project_id: slug.to_string(),
        slug: slug.to_string(),
        title: slug.to_string(),
        project_type,
    }
}

/// Write a staged pack (manifest plus one override) into `dir`
fn stage_pack(dir: &Path, name: &str, files: Vec<FileEntry>) -> PathBuf {
    let mut manifest = Manifest::new(name, RUNTIME, LOADER);
    manifest.files = files;
    manifest.save(dir).unwrap();

    let config = dir.join("overrides").join("config");
    fs::create_dir_all(&config).unwrap();
    fs::write(config.join("foo.toml"), "enabled = true\n").unwrap();
    dir.to_path_buf()
}

fn zip_names(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn test_update_replaces_and_second_run_is_idempotent() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("foo", "foo-1.2.jar")]);

    let new_file = catalog_file("foo", "foo-1.3.jar", b"foo 1.3");
    let catalog = FakeCatalog::new().with_version("foo", catalog_version("foo", &[RUNTIME], new_file.clone()));
    let fetcher = FakeFetcher::new().with_file(&new_file, b"foo 1.3".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let report = update_pack(&ctx, "Cozy").unwrap();
    assert_eq!(
        report.replaced,
        vec![("mods/foo-1.2.jar".to_string(), "mods/foo-1.3.jar".to_string())]
    );
    assert_eq!(env.mods("Cozy"), vec!["foo-1.3.jar"]);

    let manifest = env.load_manifest("Cozy");
    assert_eq!(manifest.files.len(), 1);
    assert_eq!(manifest.files[0].path, "mods/foo-1.3.jar");
    assert_eq!(manifest.files[0].project_id.as_deref(), Some("foo"));

    let first = env.read_manifest("Cozy");
    let again = update_pack(&ctx, "Cozy").unwrap();
    assert!(!again.has_changes());
    assert_eq!(again.unchanged, vec!["mods/foo-1.3.jar"]);
    assert_eq!(env.read_manifest("Cozy"), first);
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_update_drops_entries_without_a_compatible_release() {
    let env = TestLayout::new();
    env.install_pack(
        "Cozy",
        RUNTIME,
        vec![
            mod_entry("a", "a-1.0.jar"),
            mod_entry("b", "b-2.0.jar"),
            mod_entry("c", "c-3.0.jar"),
        ],
    );

    let catalog = FakeCatalog::new()
        .with_version("a", catalog_version("a", &["1.19.2"], catalog_file("a", "a-1.1.jar", b"a")))
        .with_version("b", catalog_version("b", &[RUNTIME], catalog_file("b", "b-2.0.jar", b"b")))
        .with_unavailable("c");
    let fetcher = FakeFetcher::new();
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let report = update_pack(&ctx, "Cozy").unwrap();

    let dropped: Vec<&str> = report.dropped.iter().map(|(path, _)| path.as_str()).collect();
    assert_eq!(dropped, vec!["mods/a-1.0.jar", "mods/c-3.0.jar"]);
    assert_eq!(report.unchanged, vec!["mods/b-2.0.jar"]);

    let manifest = env.load_manifest("Cozy");
    let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["mods/b-2.0.jar"]);
    assert_eq!(env.mods("Cozy"), vec!["b-2.0.jar"]);
}

#[test]
fn test_update_evicts_untracked_older_release() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("foo", "foo-1.2.jar")]);
    env.write_file("Cozy", "mods/foo-1.1.jar", b"leftover");
    env.write_file("Cozy", "mods/foobar-1.0.jar", b"another mod");

    let new_file = catalog_file("foo", "foo-1.3.jar", b"foo 1.3");
    let catalog = FakeCatalog::new().with_version("foo", catalog_version("foo", &[RUNTIME], new_file.clone()));
    let fetcher = FakeFetcher::new().with_file(&new_file, b"foo 1.3".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let report = update_pack(&ctx, "Cozy").unwrap();

    assert_eq!(report.evicted, vec!["foo-1.1.jar"]);
    assert_eq!(env.mods("Cozy"), vec!["foo-1.3.jar", "foobar-1.0.jar"]);
    assert_eq!(env.load_manifest("Cozy").files.len(), 1);
}

#[test]
fn test_update_fetch_failure_leaves_pack_untouched() {
    let env = TestLayout::new();
    env.install_pack(
        "Cozy",
        RUNTIME,
        vec![
            mod_entry("a", "a-1.0.jar"),
            mod_entry("b", "b-1.0.jar"),
            mod_entry("c", "c-1.0.jar"),
        ],
    );
    let before = env.read_manifest("Cozy");

    let mut catalog = FakeCatalog::new();
    let mut fetcher = FakeFetcher::new().failing_on(3);
    for id in ["a", "b", "c"] {
        let file = catalog_file(id, &format!("{}-1.1.jar", id), id.as_bytes());
        fetcher = fetcher.with_file(&file, id.as_bytes().to_vec());
        catalog = catalog.with_version(id, catalog_version(id, &[RUNTIME], file));
    }
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = update_pack(&ctx, "Cozy").unwrap_err();
    assert!(matches!(err, Error::CatalogUnavailable(_)));

    assert_eq!(env.read_manifest("Cozy"), before);
    assert_eq!(env.mods("Cozy"), vec!["a-1.0.jar", "b-1.0.jar", "c-1.0.jar"]);
    assert!(!env.layout.instance_staging_dir("Cozy").join("update").exists());
}

#[test]
fn test_update_folds_entries_of_one_project_into_the_new_file() {
    let env = TestLayout::new();
    env.install_pack(
        "Cozy",
        RUNTIME,
        vec![mod_entry("foo", "foo-1.1.jar"), mod_entry("foo", "foo-1.2.jar")],
    );

    let new_file = catalog_file("foo", "foo-1.3.jar", b"foo 1.3");
    let catalog = FakeCatalog::new().with_version("foo", catalog_version("foo", &[RUNTIME], new_file.clone()));
    let fetcher = FakeFetcher::new().with_file(&new_file, b"foo 1.3".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let report = update_pack(&ctx, "Cozy").unwrap();

    assert_eq!(
        report.replaced,
        vec![
            ("mods/foo-1.1.jar".to_string(), "mods/foo-1.3.jar".to_string()),
            ("mods/foo-1.2.jar".to_string(), "mods/foo-1.3.jar".to_string()),
        ]
    );
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(env.mods("Cozy"), vec!["foo-1.3.jar"]);
    let manifest = env.load_manifest("Cozy");
    let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["mods/foo-1.3.jar"]);
    assert!(!env.layout.instance_staging_dir("Cozy").exists());

    let again = update_pack(&ctx, "Cozy").unwrap();
    assert!(!again.has_changes());
}

#[test]
fn test_update_entry_superseded_by_current_entry() {
    let env = TestLayout::new();
    env.install_pack(
        "Cozy",
        RUNTIME,
        vec![mod_entry("foo", "foo-1.2.jar"), mod_entry("foo", "foo-1.3.jar")],
    );

    let current = catalog_file("foo", "foo-1.3.jar", b"foo 1.3");
    let catalog = FakeCatalog::new().with_version("foo", catalog_version("foo", &[RUNTIME], current));
    let fetcher = FakeFetcher::new();
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let report = update_pack(&ctx, "Cozy").unwrap();

    assert_eq!(report.unchanged, vec!["mods/foo-1.3.jar"]);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(env.mods("Cozy"), vec!["foo-1.3.jar"]);
    assert_eq!(env.load_manifest("Cozy").files.len(), 1);
}

#[test]
fn test_update_drops_entry_with_unsafe_catalog_file_name() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("foo", "foo-1.2.jar")]);

    let escaping = catalog_file("foo", "../escape-1.3.jar", b"escape");
    let catalog = FakeCatalog::new().with_version("foo", catalog_version("foo", &[RUNTIME], escaping.clone()));
    let fetcher = FakeFetcher::new().with_file(&escaping, b"escape".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let report = update_pack(&ctx, "Cozy").unwrap();

    assert!(report.replaced.is_empty());
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].0, "mods/foo-1.2.jar");
    assert!(report.dropped[0].1.contains("not a plain file name"));
    assert_eq!(fetcher.calls(), 0);
    assert!(!env.has_file("Cozy", "escape-1.3.jar"));
    assert!(env.load_manifest("Cozy").files.is_empty());
}

#[test]
fn test_update_failed_save_restores_mods() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("foo", "foo-1.2.jar")]);
    env.write_file("Cozy", "mods/foo-1.3.jar", b"placed by hand");

    // The manifest becomes unwritable once the new file is fetched
    let index = env.layout.manifest_dir("Cozy").join(INDEX_FILE_NAME);
    let new_file = catalog_file("foo", "foo-1.3.jar", b"foo 1.3");
    let catalog = FakeCatalog::new().with_version("foo", catalog_version("foo", &[RUNTIME], new_file.clone()));
    let fetcher = FakeFetcher::new()
        .with_file(&new_file, b"foo 1.3".to_vec())
        .after_each(move || {
            fs::remove_file(&index).unwrap();
            fs::create_dir_all(index.join("occupied")).unwrap();
        });
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = update_pack(&ctx, "Cozy").unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert_eq!(env.mods("Cozy"), vec!["foo-1.2.jar", "foo-1.3.jar"]);
    let restored = env.layout.instance_dir("Cozy").join("mods/foo-1.3.jar");
    assert_eq!(fs::read_to_string(restored).unwrap(), "placed by hand");
    assert!(!env.layout.instance_staging_dir("Cozy").exists());
}

#[test]
fn test_update_missing_pack() {
    let env = TestLayout::new();
    let catalog = FakeCatalog::new();
    let fetcher = FakeFetcher::new();
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = update_pack(&ctx, "Nope").unwrap_err();
    assert!(matches!(err, Error::FilesystemConflict(_)));
}

// ============================================================================
// Remove
// ============================================================================

#[test]
fn test_remove_artifact_is_scoped_to_the_file() {
    let env = TestLayout::new();
    env.install_pack(
        "Cozy",
        RUNTIME,
        vec![mod_entry("foo", "foo.jar"), mod_entry("foobar", "foobar.jar")],
    );

    let removed = remove_artifact(&env.layout, "Cozy", "foo.jar").unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].path, "mods/foo.jar");
    assert_eq!(env.mods("Cozy"), vec!["foobar.jar"]);
    let manifest = env.load_manifest("Cozy");
    let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["mods/foobar.jar"]);
}

#[test]
fn test_remove_artifact_leaves_other_directories_alone() {
    let env = TestLayout::new();
    let texture = FileEntry::from_catalog_file("resourcepacks", &catalog_file("pretty", "foo.jar", b"x"), "pretty");
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("foo", "foo.jar"), texture]);

    let removed = remove_artifact(&env.layout, "Cozy", "foo.jar").unwrap();

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].path, "mods/foo.jar");
    assert!(env.has_file("Cozy", "resourcepacks/foo.jar"));
    let manifest = env.load_manifest("Cozy");
    let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["resourcepacks/foo.jar"]);
}

#[test]
fn test_remove_untracked_artifact() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("foo", "foo.jar")]);
    env.write_file("Cozy", "mods/manual.jar", b"dropped in by hand");
    let before = env.read_manifest("Cozy");

    let removed = remove_artifact(&env.layout, "Cozy", "manual.jar").unwrap();

    assert!(removed.is_empty());
    assert_eq!(env.mods("Cozy"), vec!["foo.jar"]);
    assert_eq!(env.read_manifest("Cozy"), before);
}

#[test]
fn test_remove_unknown_artifact_fails() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("foo", "foo.jar")]);

    let err = remove_artifact(&env.layout, "Cozy", "ghost.jar").unwrap_err();
    assert!(matches!(err, Error::FilesystemConflict(_)));

    let err = remove_artifact(&env.layout, "Cozy", "../foo.jar").unwrap_err();
    assert!(matches!(err, Error::AmbiguousSelection(_)));
}

#[test]
fn test_remove_pack_without_profile_registry() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("foo", "foo.jar")]);
    fs::create_dir_all(env.layout.version_dir("Cozy")).unwrap();

    let outcome = remove_pack(&env.layout, "Cozy").unwrap();

    assert_eq!(
        outcome,
        RemovePackOutcome {
            profiles_removed: 0,
            instance_removed: true,
            version_removed: true,
        }
    );
    assert!(!env.layout.instance_dir("Cozy").exists());
    assert!(!env.layout.version_dir("Cozy").exists());

    // Nothing left to remove is still a success
    let outcome = remove_pack(&env.layout, "Cozy").unwrap();
    assert_eq!(outcome, RemovePackOutcome::default());
}

#[test]
fn test_remove_pack_only_removes_its_profiles() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![]);

    let mut registry = ProfileRegistry::load_or_new(&env.layout.profiles_file).unwrap();
    registry.add("Cozy", &env.layout.instance_dir("Cozy"));
    let other = registry.add("Other", &env.layout.instance_dir("Other"));
    registry.save().unwrap();

    let outcome = remove_pack(&env.layout, "Cozy").unwrap();
    assert_eq!(outcome.profiles_removed, 1);

    let registry = ProfileRegistry::load(&env.layout.profiles_file).unwrap();
    assert!(registry.ids_named("Cozy").is_empty());
    assert_eq!(registry.ids_named("Other"), vec![other]);
}

// ============================================================================
// Install
// ============================================================================

#[test]
fn test_install_from_archive() {
    let env = TestLayout::new();
    let work = TempDir::new().unwrap();

    let file = catalog_file("foo", "foo-1.0.jar", b"foo");
    let staged = stage_pack(
        &work.path().join("staged"),
        "Cozy",
        vec![FileEntry::from_catalog_file("mods", &file, "foo")],
    );
    let archive = work.path().join("Cozy.mrpack");
    pack_directory(&staged, &archive).unwrap();

    let catalog = FakeCatalog::new();
    let fetcher = FakeFetcher::new().with_file(&file, b"foo".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let outcome = install_from_archive(&ctx, &archive).unwrap();

    assert_eq!(outcome.name, "Cozy");
    assert_eq!(outcome.files_fetched, 1);
    assert_eq!(outcome.instance_dir, env.layout.instance_dir("Cozy"));
    assert_eq!(env.mods("Cozy"), vec!["foo-1.0.jar"]);
    assert!(env.has_file("Cozy", "config/foo.toml"));
    assert!(env.has_file("Cozy", "mrpack/modrinth.index.json"));
    assert!(!env.layout.staging_dir.exists());

    assert_eq!(loader.installs(), vec![(RUNTIME.to_string(), LOADER.to_string())]);
    let descriptor = env.layout.version_dir("Cozy").join("Cozy.json");
    let data: serde_json::Value = serde_json::from_str(&fs::read_to_string(descriptor).unwrap()).unwrap();
    assert_eq!(data["id"], "Cozy");

    let registry = ProfileRegistry::load(&env.layout.profiles_file).unwrap();
    assert_eq!(registry.ids_named("Cozy"), vec![outcome.profile_id]);
}

#[test]
fn test_install_failure_rolls_back_new_instance() {
    let env = TestLayout::new();
    let work = TempDir::new().unwrap();

    let served = catalog_file("foo", "foo-1.0.jar", b"foo");
    let missing = catalog_file("bar", "bar-1.0.jar", b"bar");
    let staged = stage_pack(
        work.path(),
        "Cozy",
        vec![
            FileEntry::from_catalog_file("mods", &served, "foo"),
            FileEntry::from_catalog_file("mods", &missing, "bar"),
        ],
    );

    let catalog = FakeCatalog::new();
    let fetcher = FakeFetcher::new().with_file(&served, b"foo".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = install_from_staging(&ctx, &staged).unwrap_err();
    assert!(matches!(err, Error::CatalogUnavailable(_)));

    assert!(!env.layout.instance_dir("Cozy").exists());
    assert!(!env.layout.version_dir("Cozy").exists());
    let registry = ProfileRegistry::load_or_new(&env.layout.profiles_file).unwrap();
    assert!(registry.ids_named("Cozy").is_empty());
}

#[test]
fn test_install_failure_keeps_existing_instance_files() {
    let env = TestLayout::new();
    let work = TempDir::new().unwrap();
    env.write_file("Cozy", "saves/world/level.dat", b"precious");

    let served = catalog_file("foo", "foo-1.0.jar", b"foo");
    let bad_hash = catalog_file("bar", "bar-1.0.jar", b"expected");
    let staged = stage_pack(
        work.path(),
        "Cozy",
        vec![
            FileEntry::from_catalog_file("mods", &served, "foo"),
            FileEntry::from_catalog_file("mods", &bad_hash, "bar"),
        ],
    );

    let catalog = FakeCatalog::new();
    let fetcher = FakeFetcher::new()
        .with_file(&served, b"foo".to_vec())
        .with_file(&bad_hash, b"tampered".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = install_from_staging(&ctx, &staged).unwrap_err();
    assert!(matches!(err, Error::HashMismatch { .. }));

    assert!(env.has_file("Cozy", "saves/world/level.dat"));
    assert!(env.mods("Cozy").is_empty());
}

#[test]
fn test_install_loader_failure_registers_nothing() {
    let env = TestLayout::new();
    let work = TempDir::new().unwrap();
    let staged = stage_pack(work.path(), "Cozy", vec![]);

    let catalog = FakeCatalog::new();
    let fetcher = FakeFetcher::new();
    let loader = FakeLoader::failing();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = install_from_staging(&ctx, &staged).unwrap_err();
    assert!(matches!(err, Error::LoaderInstall(_)));
    assert!(!env.layout.instance_dir("Cozy").exists());
    assert!(!env.layout.profiles_file.exists());
}

#[test]
fn test_install_reuses_existing_profile() {
    let env = TestLayout::new();
    let work = TempDir::new().unwrap();
    let staged = stage_pack(work.path(), "Cozy", vec![]);

    let mut registry = ProfileRegistry::load_or_new(&env.layout.profiles_file).unwrap();
    let existing = registry.add("Cozy", &env.layout.instance_dir("Cozy"));
    registry.save().unwrap();

    let catalog = FakeCatalog::new();
    let fetcher = FakeFetcher::new();
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let outcome = install_from_staging(&ctx, &staged).unwrap();

    assert_eq!(outcome.profile_id, existing);
    let registry = ProfileRegistry::load(&env.layout.profiles_file).unwrap();
    assert_eq!(registry.ids_named("Cozy").len(), 1);
}

#[test]
fn test_install_from_catalog() {
    let env = TestLayout::new();
    let work = TempDir::new().unwrap();

    let mod_file = catalog_file("foo", "foo-1.0.jar", b"foo");
    let staged = stage_pack(
        &work.path().join("staged"),
        "Cozy",
        vec![FileEntry::from_catalog_file("mods", &mod_file, "foo")],
    );
    let archive = work.path().join("cozy.mrpack");
    pack_directory(&staged, &archive).unwrap();
    let archive_bytes = fs::read(&archive).unwrap();

    let pack_file = catalog_file("cozy-pack", "cozy-pack-1.0.mrpack", &archive_bytes);
    let catalog = FakeCatalog::new()
        .with_version("cozy-pack", catalog_version("cozy-pack", &["1.21"], catalog_file("cozy-pack", "cozy-pack-2.0.mrpack", b"newer")))
        .with_version("cozy-pack", catalog_version("cozy-pack", &[RUNTIME], pack_file.clone()));
    let fetcher = FakeFetcher::new()
        .with_file(&pack_file, archive_bytes)
        .with_file(&mod_file, b"foo".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let outcome = install_from_catalog(&ctx, &project("cozy-pack", ProjectType::Modpack), Some(RUNTIME)).unwrap();

    assert_eq!(outcome.name, "Cozy");
    assert_eq!(env.mods("Cozy"), vec!["foo-1.0.jar"]);
    assert!(!env.layout.staging_dir.exists());
}

#[test]
fn test_available_runtime_versions_for_configured_loader() {
    let env = TestLayout::new();
    let mut forge_only = catalog_version("cozy", &["1.21.1"], catalog_file("cozy", "cozy-forge.mrpack", b"f"));
    forge_only.loaders = vec!["forge".to_string()];
    let catalog = FakeCatalog::new()
        .with_version("cozy", forge_only)
        .with_version("cozy", catalog_version("cozy", &["1.21", "1.20.4"], catalog_file("cozy", "cozy-2.mrpack", b"2")))
        .with_version("cozy", catalog_version("cozy", &["1.20.4", RUNTIME], catalog_file("cozy", "cozy-1.mrpack", b"1")));
    let fetcher = FakeFetcher::new();
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let versions = available_runtime_versions(&ctx, &project("cozy", ProjectType::Modpack)).unwrap();
    assert_eq!(versions, vec!["1.21", "1.20.4", RUNTIME]);

    assert!(available_runtime_versions(&ctx, &project("cozy", ProjectType::Mod)).is_err());
}

#[test]
fn test_install_from_catalog_rejects_non_modpacks_and_missing_versions() {
    let env = TestLayout::new();
    let catalog = FakeCatalog::new();
    let fetcher = FakeFetcher::new();
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = install_from_catalog(&ctx, &project("sodium", ProjectType::Mod), None).unwrap_err();
    assert!(matches!(err, Error::Other(_)));

    let err = install_from_catalog(&ctx, &project("cozy-pack", ProjectType::Modpack), Some(RUNTIME)).unwrap_err();
    assert!(matches!(err, Error::NoCompatibleVersion { .. }));
}

// ============================================================================
// Add
// ============================================================================

#[test]
fn test_add_mod_queries_only_non_implicit_dependencies() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![]);

    let main_jar = mod_jar("mainmod", &["minecraft", "fabricloader", "fabric-api", "somelib"]);
    let lib_jar = mod_jar("somelib", &[]);
    let main_file = catalog_file("mainmod", "mainmod-1.0.jar", &main_jar);
    let lib_file = catalog_file("somelib", "somelib-2.0.jar", &lib_jar);

    let catalog = FakeCatalog::new()
        .with_project("somelib", ProjectType::Mod)
        .with_version("mainmod", catalog_version("mainmod", &[RUNTIME], main_file.clone()))
        .with_version("somelib", catalog_version("somelib", &[RUNTIME], lib_file.clone()));
    let fetcher = FakeFetcher::new()
        .with_file(&main_file, main_jar)
        .with_file(&lib_file, lib_jar);
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let outcome = add_content(&ctx, "Cozy", &project("mainmod", ProjectType::Mod)).unwrap();

    assert_eq!(catalog.searches(), vec!["somelib"]);
    assert_eq!(outcome.entry.path, "mods/mainmod-1.0.jar");
    let deps: Vec<&str> = outcome.dependencies.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(deps, vec!["mods/somelib-2.0.jar"]);
    assert!(outcome.skipped.is_empty());

    assert_eq!(env.mods("Cozy"), vec!["mainmod-1.0.jar", "somelib-2.0.jar"]);
    let manifest = env.load_manifest("Cozy");
    let ids: Vec<Option<&str>> = manifest.files.iter().map(|f| f.project_id.as_deref()).collect();
    assert_eq!(ids, vec![Some("mainmod"), Some("somelib")]);
    assert!(!env.layout.instance_staging_dir("Cozy").exists());
}

#[test]
fn test_add_mod_evicts_older_release() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("mainmod", "mainmod-0.9.jar")]);

    let jar = mod_jar("mainmod", &["minecraft"]);
    let file = catalog_file("mainmod", "mainmod-1.0.jar", &jar);
    let catalog = FakeCatalog::new().with_version("mainmod", catalog_version("mainmod", &[RUNTIME], file.clone()));
    let fetcher = FakeFetcher::new().with_file(&file, jar);
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let outcome = add_content(&ctx, "Cozy", &project("mainmod", ProjectType::Mod)).unwrap();

    assert_eq!(outcome.evicted, vec!["mainmod-0.9.jar"]);
    assert_eq!(env.mods("Cozy"), vec!["mainmod-1.0.jar"]);
    let manifest = env.load_manifest("Cozy");
    assert_eq!(manifest.files.len(), 1);
    assert_eq!(manifest.files[0].path, "mods/mainmod-1.0.jar");
}

#[test]
fn test_add_resource_pack_ignores_loader() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![]);

    let file = catalog_file("faithful", "faithful-1.0.zip", b"textures");
    let mut version = catalog_version("faithful", &[RUNTIME], file.clone());
    version.loaders = vec!["minecraft".to_string()];
    let catalog = FakeCatalog::new().with_version("faithful", version);
    let fetcher = FakeFetcher::new().with_file(&file, b"textures".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let outcome = add_content(&ctx, "Cozy", &project("faithful", ProjectType::ResourcePack)).unwrap();

    assert_eq!(outcome.entry.path, "resourcepacks/faithful-1.0.zip");
    assert!(outcome.dependencies.is_empty());
    assert!(env.has_file("Cozy", "resourcepacks/faithful-1.0.zip"));
    assert!(catalog.searches().is_empty());
}

#[test]
fn test_add_rejects_unsafe_catalog_file_name() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![]);
    let before = env.read_manifest("Cozy");

    let file = catalog_file("mainmod", "../mainmod-1.0.jar", b"x");
    let catalog = FakeCatalog::new().with_version("mainmod", catalog_version("mainmod", &[RUNTIME], file.clone()));
    let fetcher = FakeFetcher::new().with_file(&file, b"x".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = add_content(&ctx, "Cozy", &project("mainmod", ProjectType::Mod)).unwrap_err();

    assert!(matches!(err, Error::FilesystemConflict(_)));
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(env.read_manifest("Cozy"), before);
    assert!(!env.has_file("Cozy", "mainmod-1.0.jar"));
}

#[test]
fn test_add_skips_dependency_with_unsafe_file_name() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![]);

    let main_jar = mod_jar("mainmod", &["somelib"]);
    let main_file = catalog_file("mainmod", "mainmod-1.0.jar", &main_jar);
    let lib_file = catalog_file("somelib", "../somelib-2.0.jar", b"lib");

    let catalog = FakeCatalog::new()
        .with_project("somelib", ProjectType::Mod)
        .with_version("mainmod", catalog_version("mainmod", &[RUNTIME], main_file.clone()))
        .with_version("somelib", catalog_version("somelib", &[RUNTIME], lib_file.clone()));
    let fetcher = FakeFetcher::new()
        .with_file(&main_file, main_jar)
        .with_file(&lib_file, b"lib".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let outcome = add_content(&ctx, "Cozy", &project("mainmod", ProjectType::Mod)).unwrap();

    assert!(outcome.dependencies.is_empty());
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(
        outcome.skipped[0].reason,
        SkipReason::UnsafeFileName("../somelib-2.0.jar".to_string())
    );
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(env.mods("Cozy"), vec!["mainmod-1.0.jar"]);
    assert!(!env.has_file("Cozy", "somelib-2.0.jar"));
}

#[test]
fn test_add_without_compatible_version() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![]);
    let before = env.read_manifest("Cozy");

    let catalog = FakeCatalog::new()
        .with_version("mainmod", catalog_version("mainmod", &["1.19.2"], catalog_file("mainmod", "mainmod-1.0.jar", b"x")));
    let fetcher = FakeFetcher::new();
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = add_content(&ctx, "Cozy", &project("mainmod", ProjectType::Mod)).unwrap_err();
    assert!(matches!(err, Error::NoCompatibleVersion { .. }));
    assert_eq!(env.read_manifest("Cozy"), before);
    assert_eq!(fetcher.calls(), 0);
}

// ============================================================================
// Create, change version, export
// ============================================================================

#[test]
fn test_create_custom_pack() {
    let env = TestLayout::new();
    let catalog = FakeCatalog::new();
    let fetcher = FakeFetcher::new();
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let outcome = create_custom(&ctx, "Fresh", RUNTIME, None).unwrap();

    assert_eq!(outcome.files_fetched, 0);
    assert!(env.layout.instance_dir("Fresh").join("config").is_dir());
    let manifest = load_pack(&env.layout, "Fresh").unwrap();
    assert_eq!(manifest.runtime_version(), RUNTIME);
    assert_eq!(manifest.loader_version(), LOADER);
    assert_eq!(manifest.version_id, "1.0");
    assert!(env.layout.version_dir("Fresh").join("Fresh.json").exists());

    let err = create_custom(&ctx, "Fresh", RUNTIME, None).unwrap_err();
    assert!(matches!(err, Error::FilesystemConflict(_)));

    assert!(create_custom(&ctx, "../escape", RUNTIME, None).is_err());
    assert!(create_custom(&ctx, "Blank", "", None).is_err());
}

#[test]
fn test_change_runtime_version() {
    let env = TestLayout::new();
    env.install_pack(
        "Cozy",
        RUNTIME,
        vec![mod_entry("foo", "foo-1.2.jar"), mod_entry("bar", "bar-1.0.jar")],
    );

    let foo_new = catalog_file("foo", "foo-1.3.jar", b"foo for 1.21");
    let catalog = FakeCatalog::new()
        .with_version("foo", catalog_version("foo", &["1.21"], foo_new.clone()))
        .with_version("foo", catalog_version("foo", &[RUNTIME], catalog_file("foo", "foo-1.2.jar", b"x")))
        .with_version("bar", catalog_version("bar", &[RUNTIME], catalog_file("bar", "bar-1.0.jar", b"y")));
    let fetcher = FakeFetcher::new().with_file(&foo_new, b"foo for 1.21".to_vec());
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let report = change_runtime_version(&ctx, "Cozy", "1.21", None).unwrap();

    assert_eq!(report.replaced.len(), 1);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].0, "mods/bar-1.0.jar");
    assert_eq!(env.mods("Cozy"), vec!["foo-1.3.jar"]);

    let manifest = env.load_manifest("Cozy");
    assert_eq!(manifest.runtime_version(), "1.21");
    assert_eq!(manifest.loader_version(), LOADER);
    assert_eq!(loader.installs(), vec![("1.21".to_string(), LOADER.to_string())]);
    assert!(env.layout.version_dir("Cozy").join("Cozy.json").exists());
}

#[test]
fn test_change_runtime_version_fetch_failure_changes_nothing() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("a", "a-1.0.jar")]);
    let before = env.read_manifest("Cozy");

    let new_file = catalog_file("a", "a-1.1.jar", b"a for 1.21");
    let catalog = FakeCatalog::new().with_version("a", catalog_version("a", &["1.21"], new_file.clone()));
    let fetcher = FakeFetcher::new()
        .with_file(&new_file, b"a for 1.21".to_vec())
        .failing_on(1);
    let loader = FakeLoader::new();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = change_runtime_version(&ctx, "Cozy", "1.21", None).unwrap_err();

    assert!(matches!(err, Error::CatalogUnavailable(_)));
    assert_eq!(env.read_manifest("Cozy"), before);
    assert_eq!(env.mods("Cozy"), vec!["a-1.0.jar"]);
    assert!(loader.installs().is_empty());
    assert!(!env.layout.version_dir("Cozy").exists());
}

#[test]
fn test_change_runtime_version_loader_failure_changes_nothing() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("a", "a-1.0.jar")]);
    let before = env.read_manifest("Cozy");

    let new_file = catalog_file("a", "a-1.1.jar", b"a for 1.21");
    let catalog = FakeCatalog::new().with_version("a", catalog_version("a", &["1.21"], new_file.clone()));
    let fetcher = FakeFetcher::new().with_file(&new_file, b"a for 1.21".to_vec());
    let loader = FakeLoader::failing();
    let ctx = env.context(&catalog, &fetcher, &loader);

    let err = change_runtime_version(&ctx, "Cozy", "1.21", Some(LOADER)).unwrap_err();

    assert!(matches!(err, Error::LoaderInstall(_)));
    assert_eq!(env.read_manifest("Cozy"), before);
    assert_eq!(env.mods("Cozy"), vec!["a-1.0.jar"]);
    assert!(!env.layout.instance_staging_dir("Cozy").join("update").exists());
}

#[test]
fn test_export_with_and_without_bundled_packs() {
    let env = TestLayout::new();
    env.install_pack("Cozy", RUNTIME, vec![mod_entry("foo", "foo-1.0.jar")]);
    env.write_file("Cozy", "resourcepacks/pretty.zip", b"textures");
    let out = TempDir::new().unwrap();

    let archive = export_pack(&env.layout, "Cozy", false, out.path()).unwrap();
    assert_eq!(archive, out.path().join("Cozy.mrpack"));
    let names = zip_names(&archive);
    assert!(names.iter().any(|n| n == "modrinth.index.json"));
    assert!(!names.iter().any(|n| n.starts_with("overrides/resourcepacks")));

    let archive = export_pack(&env.layout, "Cozy", true, out.path()).unwrap();
    let names = zip_names(&archive);
    assert!(names.iter().any(|n| n == "overrides/resourcepacks/pretty.zip"));

    let mut zip = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
    let mut index = String::new();
    zip.by_name("modrinth.index.json")
        .unwrap()
        .read_to_string(&mut index)
        .unwrap();
    let exported: Manifest = serde_json::from_str(&index).unwrap();
    assert_eq!(exported.files.len(), 1);
}

#[test]
fn test_export_missing_pack() {
    let env = TestLayout::new();
    let out = TempDir::new().unwrap();

    let err = export_pack(&env.layout, "Nope", false, out.path()).unwrap_err();
    assert!(matches!(err, Error::FilesystemConflict(_)));
}
