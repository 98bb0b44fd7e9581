//! Record-replay round-trip integration test.
//!
//! 1. Run a sync against a memory directory through the recording adapter.
//! 2. Replay the cassette with `ServiceContext::replaying()`.
//! 3. Assert the replayed run reports the same actions.
//! 4. Assert a run that diverges from the recording fails.

use std::path::Path;
use std::sync::Arc;

use amsync::adapters::live::filesystem::LiveFileSystem;
use amsync::adapters::memory::{CountingClock, MemoryDirectory};
use amsync::adapters::recording::RecordingDirectory;
use amsync::cassette::format::Cassette;
use amsync::cassette::session::RecordingSession;
use amsync::config::Settings;
use amsync::context::ServiceContext;
use amsync::error::Error;
use amsync::sync::{Reconciler, SyncReport};

const ROOT: &str = "ou=automount,dc=example,dc=org";

fn write_maps(dir: &Path) {
    std::fs::write(dir.join("auto.master"), "/data\tauto.data\t-rw\n").unwrap();
    std::fs::write(dir.join("auto.data"), "a -rw x.example.org:/a\nb y.example.org:/b\n").unwrap();
}

fn record(settings: &Settings, cassette: &Path) -> SyncReport {
    let memory = Arc::new(MemoryDirectory::new().with_object(ROOT, &[("ou", &["automount"])]));
    let session = RecordingSession::new(cassette, ROOT);
    let ctx = ServiceContext::new(
        settings.clone(),
        Box::new(LiveFileSystem),
        Box::new(RecordingDirectory::new(Box::new(memory), Arc::clone(&session.directory))),
        Box::new(CountingClock::new()),
    );
    let report = Reconciler::new(&ctx, false).run(&[]).unwrap();
    drop(ctx);
    session.finish().unwrap();
    report
}

#[test]
fn record_then_replay_produces_identical_reports() {
    let tmp = tempfile::tempdir().unwrap();
    let maps = tmp.path().join("maps");
    std::fs::create_dir(&maps).unwrap();
    write_maps(&maps);
    let settings = Settings::new(ROOT, &maps);
    let cassette = tmp.path().join("sync.cassette.yaml");

    let recorded = record(&settings, &cassette);
    assert!(!recorded.is_empty());

    let loaded = Cassette::load(&cassette).unwrap();
    assert_eq!(loaded.container, ROOT);
    assert!(loaded.interactions.iter().any(|i| i.method == "add"));

    let ctx = ServiceContext::replaying(settings.clone(), &cassette).unwrap();
    let first = Reconciler::new(&ctx, false).run(&[]).unwrap();
    assert_eq!(first, recorded);

    let ctx = ServiceContext::replaying(settings, &cassette).unwrap();
    let second = Reconciler::new(&ctx, false).run(&[]).unwrap();
    assert_eq!(first, second, "determinism: replays differ");
}

#[test]
fn diverging_run_fails_on_replay() {
    let tmp = tempfile::tempdir().unwrap();
    let maps = tmp.path().join("maps");
    std::fs::create_dir(&maps).unwrap();
    write_maps(&maps);
    let settings = Settings::new(ROOT, &maps);
    let cassette = tmp.path().join("sync.cassette.yaml");
    record(&settings, &cassette);

    std::fs::write(maps.join("auto.data"), "a -ro x.example.org:/a\nb y.example.org:/b\n").unwrap();
    let ctx = ServiceContext::replaying(settings, &cassette).unwrap();
    let err = Reconciler::new(&ctx, false).run(&[]).unwrap_err();
    assert!(matches!(err, Error::Directory { .. }), "unexpected error: {err}");
    assert!(err.to_string().contains("mismatch"));
}
