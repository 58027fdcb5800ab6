use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use fanout_core::{FileEvent, Stabilization, WatchConfig};
use fanout_sync::{
    Action, EventOutcome, Level, MemorySink, OutcomeCounts, PropagationError, Propagator,
    ReadinessDetector, Sleeper, SAMPLE_INTERVAL,
};
use tempfile::TempDir;

/// Records requested sleeps without sleeping; can grow a file at each sample gap.
#[derive(Default, Clone)]
struct FakeClock {
    slept: Arc<Mutex<Vec<Duration>>>,
    grow: Option<PathBuf>,
}

impl Sleeper for FakeClock {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
        if duration == SAMPLE_INTERVAL {
            if let Some(path) = &self.grow {
                let mut f = fs::OpenOptions::new().append(true).open(path).unwrap();
                f.write_all(&[0u8; 16]).unwrap();
            }
        }
    }
}

struct Mirror {
    _root: TempDir,
    src: PathBuf,
    dests: Vec<PathBuf>,
    sink: Arc<MemorySink>,
}

impl Mirror {
    fn new(destinations: usize) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = TempDir::new().expect("root");
        let src = root.path().join("src");
        fs::create_dir_all(&src).expect("src");
        let dests = (1..=destinations)
            .map(|i| {
                let d = root.path().join(format!("d{i}"));
                fs::create_dir_all(&d).expect("dest");
                d
            })
            .collect();
        Self {
            _root: root,
            src,
            dests,
            sink: Arc::new(MemorySink::new()),
        }
    }

    fn propagator(&self, clock: FakeClock) -> Propagator<FakeClock> {
        let stabilization = Stabilization {
            delay: Duration::from_secs(5),
            max_attempts: 3,
        };
        let config = Arc::new(WatchConfig::new(
            &self.src,
            self.dests.clone(),
            stabilization,
        ));
        Propagator::with_detector(
            config,
            ReadinessDetector::with_sleeper(stabilization, clock),
            self.sink.clone(),
        )
    }

    fn write_source(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = self.src.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }
}

fn mtime(path: &Path) -> FileTime {
    FileTime::from_last_modification_time(&fs::metadata(path).unwrap())
}

#[test]
fn stable_file_reaches_both_destinations_with_same_mtime() {
    let mirror = Mirror::new(2);
    let file = mirror.write_source("a/b.txt", &[7u8; 1024]);
    let old = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(3600));
    set_file_mtime(&file, old).unwrap();

    let clock = FakeClock::default();
    let outcome = mirror
        .propagator(clock.clone())
        .handle(&FileEvent::created(&file));

    assert_eq!(
        clock.slept.lock().unwrap().as_slice(),
        &[Duration::from_secs(5), SAMPLE_INTERVAL],
        "copy happens after the configured delay and one sample gap",
    );
    for dest in &mirror.dests {
        let copy = dest.join("a").join("b.txt");
        assert_eq!(fs::metadata(&copy).unwrap().len(), 1024);
        assert_eq!(mtime(&copy), old);
    }
    assert_eq!(mirror.sink.count(Level::Info, "copied a/b.txt to"), 2);
    assert_eq!(outcome.counts().succeeded, 2);
}

#[test]
fn blocked_destination_fails_alone() {
    let mirror = Mirror::new(2);
    // A plain file where d2 needs a directory makes every write under d2/a fail,
    // regardless of the uid running the tests.
    fs::write(mirror.dests[1].join("a"), b"in the way").unwrap();
    let file = mirror.write_source("a/b.txt", &[1u8; 1024]);

    let outcome = mirror
        .propagator(FakeClock::default())
        .handle(&FileEvent::created(&file));

    assert!(mirror.dests[0].join("a/b.txt").exists());
    let results = outcome.results();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(!results[1].is_ok());
    assert_eq!(results[1].destination, mirror.dests[1]);
    assert_eq!(mirror.sink.count(Level::Error, "error copying a/b.txt"), 1);
    assert_eq!(mirror.sink.count(Level::Info, "copied a/b.txt"), 1);
}

#[test]
fn every_destination_gets_one_copy_attempt() {
    for n in 1..=5 {
        let mirror = Mirror::new(n);
        let file = mirror.write_source("f.bin", b"data");
        let outcome = mirror
            .propagator(FakeClock::default())
            .handle(&FileEvent::created(&file));
        assert_eq!(outcome.results().len(), n);
        assert_eq!(
            mirror.sink.count(Level::Info, "copied f.bin") + mirror.sink.count(Level::Error, "f.bin"),
            n
        );
    }
}

#[test]
fn unstable_file_is_retried_then_dropped() {
    let mirror = Mirror::new(2);
    let file = mirror.write_source("busy.log", b"first chunk");

    let clock = FakeClock {
        grow: Some(file.clone()),
        ..Default::default()
    };
    let outcome = mirror
        .propagator(clock.clone())
        .handle(&FileEvent::created(&file));

    assert!(matches!(outcome, EventOutcome::NotReady { .. }));
    assert_eq!(outcome.counts(), OutcomeCounts::default());
    let samples = clock
        .slept
        .lock()
        .unwrap()
        .iter()
        .filter(|d| **d == SAMPLE_INTERVAL)
        .count();
    assert_eq!(samples, 3, "one size comparison per attempt");
    for dest in &mirror.dests {
        assert!(!dest.join("busy.log").exists());
    }
    assert_eq!(mirror.sink.texts().len(), 1, "only the not-ready line");
}

#[test]
fn replaying_created_event_rewrites_identical_bytes() {
    let mirror = Mirror::new(1);
    let file = mirror.write_source("same.txt", b"unchanged");
    let propagator = mirror.propagator(FakeClock::default());

    propagator.handle(&FileEvent::created(&file));
    let second = propagator.handle(&FileEvent::created(&file));

    assert!(matches!(
        second.results()[0].result,
        Ok(Action::Copied { bytes: 9, .. })
    ));
    assert_eq!(fs::read(mirror.dests[0].join("same.txt")).unwrap(), b"unchanged");
    assert_eq!(mirror.sink.count(Level::Info, "copied same.txt"), 2);
}

#[test]
fn delete_only_touches_destinations_that_have_the_path() {
    let mirror = Mirror::new(3);
    fs::create_dir_all(mirror.dests[0].join("docs")).unwrap();
    fs::write(mirror.dests[0].join("docs/r.md"), b"r").unwrap();
    fs::create_dir_all(mirror.dests[2].join("docs")).unwrap();
    fs::write(mirror.dests[2].join("docs/r.md"), b"r").unwrap();

    let outcome = mirror
        .propagator(FakeClock::default())
        .handle(&FileEvent::deleted(mirror.src.join("docs/r.md")));

    assert_eq!(
        outcome.counts(),
        OutcomeCounts {
            succeeded: 2,
            failed: 0,
            skipped: 1
        }
    );
    assert!(!mirror.dests[0].join("docs/r.md").exists());
    assert!(!mirror.dests[2].join("docs/r.md").exists());
    assert!(
        fs::read_dir(&mirror.dests[1]).unwrap().next().is_none(),
        "absent path must not mutate d2"
    );
}

#[test]
fn move_without_counterpart_is_not_synthesized() {
    let mirror = Mirror::new(1);
    let to = mirror.write_source("renamed.txt", b"late");

    let outcome = mirror
        .propagator(FakeClock::default())
        .handle(&FileEvent::moved(mirror.src.join("never_copied.txt"), &to));

    assert!(matches!(
        outcome.results()[0].result,
        Ok(Action::NothingToRename { .. })
    ));
    assert!(!mirror.dests[0].join("renamed.txt").exists());
}

#[test]
fn failed_delete_in_one_destination_leaves_the_other_deleted() {
    let mirror = Mirror::new(2);
    // d1/sub is a plain file, so d1/sub/x.txt cannot even be looked up.
    fs::write(mirror.dests[0].join("sub"), b"in the way").unwrap();
    fs::create_dir_all(mirror.dests[1].join("sub")).unwrap();
    fs::write(mirror.dests[1].join("sub/x.txt"), b"x").unwrap();

    let outcome = mirror
        .propagator(FakeClock::default())
        .handle(&FileEvent::deleted(mirror.src.join("sub/x.txt")));

    let results = outcome.results();
    assert!(matches!(
        &results[0].result,
        Err(PropagationError::Io { path, .. }) if path == &mirror.dests[0].join("sub/x.txt")
    ));
    assert!(matches!(results[1].result, Ok(Action::Deleted { .. })));
    assert!(!mirror.dests[1].join("sub/x.txt").exists());
    assert_eq!(
        outcome.counts(),
        OutcomeCounts {
            succeeded: 1,
            failed: 1,
            skipped: 0
        }
    );
    assert_eq!(mirror.sink.count(Level::Error, "error deleting sub/x.txt"), 1);
    assert_eq!(mirror.sink.count(Level::Info, "deleted sub/x.txt"), 1);
}

#[test]
fn failed_rename_in_one_destination_leaves_the_other_renamed() {
    let mirror = Mirror::new(2);
    for dest in &mirror.dests {
        fs::write(dest.join("a.txt"), b"a").unwrap();
    }
    // d1/moved is a plain file, so the target directory cannot be created there.
    fs::write(mirror.dests[0].join("moved"), b"in the way").unwrap();
    let to = mirror.write_source("moved/a.txt", b"a");

    let outcome = mirror
        .propagator(FakeClock::default())
        .handle(&FileEvent::moved(mirror.src.join("a.txt"), &to));

    let results = outcome.results();
    assert!(matches!(results[0].result, Err(PropagationError::Io { .. })));
    assert!(matches!(results[1].result, Ok(Action::Renamed { .. })));
    assert!(mirror.dests[0].join("a.txt").exists(), "d1 keeps the old name");
    assert!(mirror.dests[1].join("moved/a.txt").exists());
    assert!(!mirror.dests[1].join("a.txt").exists());
    assert_eq!(
        outcome.counts(),
        OutcomeCounts {
            succeeded: 1,
            failed: 1,
            skipped: 0
        }
    );
    assert_eq!(mirror.sink.count(Level::Error, "error renaming a.txt"), 1);
    assert_eq!(mirror.sink.count(Level::Info, "renamed a.txt to moved/a.txt"), 1);
}
