// tests/runtime_settle_timing.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep};

use peertube_monitor::config::WatchTarget;
use peertube_monitor::engine::{CoreRuntime, Runtime, RuntimeEvent};
use peertube_monitor::fs::mock::MockFileSystem;
use peertube_monitor::upload::RetryLedger;
use peertube_monitor::watch::{ExtensionFilter, FileEvent, FileEventKind};
use peertube_monitor_test_utils::fake_backend::FakeDispositionBackend;
use peertube_monitor_test_utils::{init_tracing, with_timeout_secs};

type Dispatched = Arc<Mutex<Vec<(PathBuf, Instant)>>>;

struct Harness {
    fs: MockFileSystem,
    tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Dispatched,
    runtime: JoinHandle<peertube_monitor::errors::Result<()>>,
    started: Instant,
}

impl Harness {
    fn start(settle_secs: u64) -> Self {
        init_tracing();
        let fs = MockFileSystem::new();
        fs.add_dir("/in");

        let target = WatchTarget {
            path: PathBuf::from("/in"),
            extensions: ExtensionFilter::new([".mp4", ".mkv"]),
            settle_duration: Duration::from_secs(settle_secs),
            max_retries: 3,
        };

        let (tx, rx) = mpsc::channel(64);
        let dispatched: Dispatched = Arc::new(Mutex::new(Vec::new()));
        let backend = FakeDispositionBackend::new(tx.clone(), Arc::clone(&dispatched));
        let core = CoreRuntime::new(target, Arc::new(fs.clone()), RetryLedger::new());
        let runtime = Runtime::new(core, &tx, rx, backend);

        Self {
            fs,
            tx,
            dispatched,
            runtime: tokio::spawn(runtime.run()),
            started: Instant::now(),
        }
    }

    async fn send(&self, kind: FileEventKind, path: &str) {
        self.tx
            .send(RuntimeEvent::File(FileEvent::new(kind, path)))
            .await
            .unwrap();
    }

    fn dispatched(&self) -> Vec<(PathBuf, Duration)> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|(p, at)| (p.clone(), at.duration_since(self.started)))
            .collect()
    }

    async fn shutdown(self) {
        self.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
        with_timeout_secs(60, self.runtime).await.unwrap().unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn write_burst_is_uploaded_once_after_quiet_period() {
    let h = Harness::start(5);

    h.fs.add_file("/in/rec.mp4", b"a".to_vec());
    h.send(FileEventKind::Created, "/in/rec.mp4").await;
    for _ in 0..3 {
        sleep(Duration::from_secs(2)).await;
        h.fs.append("/in/rec.mp4", b"more");
        h.send(FileEventKind::Written, "/in/rec.mp4").await;
    }

    // Last write at t=6s, so the upload starts at t=11s.
    sleep(Duration::from_secs(10)).await;

    let dispatched = h.dispatched();
    assert_eq!(dispatched.len(), 1, "expected one upload, got {dispatched:?}");
    assert_eq!(dispatched[0].0, PathBuf::from("/in/rec.mp4"));
    assert!(dispatched[0].1 >= Duration::from_secs(11));
    assert!(dispatched[0].1 < Duration::from_secs(12));

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unnotified_growth_postpones_upload() {
    let h = Harness::start(5);

    h.fs.add_file("/in/rec.mkv", b"a".to_vec());
    h.send(FileEventKind::Created, "/in/rec.mkv").await;

    sleep(Duration::from_secs(3)).await;
    h.fs.append("/in/rec.mkv", b"b");

    sleep(Duration::from_secs(4)).await;
    assert!(h.dispatched().is_empty(), "file changed during quiet period");

    sleep(Duration::from_secs(5)).await;
    let dispatched = h.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert!(dispatched[0].1 >= Duration::from_secs(10));

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn removed_file_is_never_uploaded() {
    let h = Harness::start(5);

    h.fs.add_file("/in/rec.mp4", b"a".to_vec());
    h.send(FileEventKind::Created, "/in/rec.mp4").await;
    sleep(Duration::from_secs(1)).await;
    h.fs.remove("/in/rec.mp4");
    h.send(FileEventKind::Removed, "/in/rec.mp4").await;

    sleep(Duration::from_secs(30)).await;
    assert!(h.dispatched().is_empty());

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn ineligible_files_are_ignored() {
    let h = Harness::start(1);

    h.fs.add_file("/in/notes.txt", b"a".to_vec());
    h.fs.add_file("/in/noext", b"a".to_vec());
    h.send(FileEventKind::Created, "/in/notes.txt").await;
    h.send(FileEventKind::Created, "/in/noext").await;

    sleep(Duration::from_secs(10)).await;
    assert!(h.dispatched().is_empty());

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn independent_files_settle_independently() {
    let h = Harness::start(5);

    h.fs.add_file("/in/a.mp4", b"a".to_vec());
    h.send(FileEventKind::Created, "/in/a.mp4").await;
    sleep(Duration::from_secs(2)).await;
    h.fs.add_file("/in/b.mp4", b"b".to_vec());
    h.send(FileEventKind::Created, "/in/b.mp4").await;

    sleep(Duration::from_secs(10)).await;
    let mut paths: Vec<_> = h.dispatched().into_iter().map(|(p, _)| p).collect();
    paths.sort();
    assert_eq!(paths, vec![PathBuf::from("/in/a.mp4"), PathBuf::from("/in/b.mp4")]);

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn file_can_be_picked_up_again_after_processing() {
    let h = Harness::start(2);

    h.fs.add_file("/in/rec.mp4", b"a".to_vec());
    h.send(FileEventKind::Created, "/in/rec.mp4").await;
    sleep(Duration::from_secs(5)).await;

    h.fs.append("/in/rec.mp4", b"again");
    h.send(FileEventKind::Written, "/in/rec.mp4").await;
    sleep(Duration::from_secs(5)).await;

    assert_eq!(h.dispatched().len(), 2);

    h.shutdown().await;
}
