// tests/end_to_end_scenarios.rs
//
// Runtime + real Disposer + task backend, over the in-memory filesystem and a
// scripted upload client. Time is virtual.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

use peertube_monitor::config::{VideoDefaults, WatchTarget};
use peertube_monitor::engine::{CoreRuntime, Runtime, RuntimeEvent};
use peertube_monitor::fs::mock::MockFileSystem;
use peertube_monitor::upload::{
    DispositionPolicy, Disposer, RetryLedger, TaskDispositionBackend,
};
use peertube_monitor::watch::{ExtensionFilter, FileEvent, FileEventKind};
use peertube_monitor_test_utils::fake_upload::FakeUploadClient;
use peertube_monitor_test_utils::{init_tracing, with_timeout_secs};

struct Service {
    fs: MockFileSystem,
    client: FakeUploadClient,
    ledger: RetryLedger,
    tx: mpsc::Sender<RuntimeEvent>,
    runtime: JoinHandle<peertube_monitor::errors::Result<()>>,
}

impl Service {
    fn start(client: FakeUploadClient, done: Option<&str>, failed: Option<&str>) -> Self {
        init_tracing();
        let fs = MockFileSystem::new();
        fs.add_dir("/in");
        for dir in done.iter().chain(failed.iter()) {
            fs.add_dir(dir);
        }

        let ledger = RetryLedger::new();
        let disposer = Arc::new(Disposer::new(
            Arc::new(client.clone()),
            Arc::new(fs.clone()),
            DispositionPolicy {
                done_dir: done.map(PathBuf::from),
                failed_dir: failed.map(PathBuf::from),
                max_retries: 3,
            },
            VideoDefaults::default(),
            ledger.clone(),
        ));

        let (tx, rx) = mpsc::channel(64);
        let backend = TaskDispositionBackend::new(disposer, tx.clone());
        let target = WatchTarget {
            path: PathBuf::from("/in"),
            extensions: ExtensionFilter::new([".mp4"]),
            settle_duration: Duration::from_secs(5),
            max_retries: 3,
        };
        let core = CoreRuntime::new(target, Arc::new(fs.clone()), ledger.clone());
        let runtime = tokio::spawn(Runtime::new(core, &tx, rx, backend).run());

        Self {
            fs,
            client,
            ledger,
            tx,
            runtime,
        }
    }

    async fn notify(&self, kind: FileEventKind, path: &str) {
        self.tx
            .send(RuntimeEvent::File(FileEvent::new(kind, path)))
            .await
            .unwrap();
    }

    async fn shutdown(self) {
        self.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
        with_timeout_secs(60, self.runtime).await.unwrap().unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn clip_is_failed_in_place_after_three_attempts() {
    let svc = Service::start(FakeUploadClient::failing(3, "server unavailable"), None, None);
    let clip = Path::new("/in/clip.mp4");

    svc.fs.add_file(clip, b"part".to_vec());
    svc.notify(FileEventKind::Created, "/in/clip.mp4").await;
    sleep(Duration::from_secs(1)).await;
    svc.fs.append(clip, b"rest");
    svc.notify(FileEventKind::Written, "/in/clip.mp4").await;

    // Settles at t=6s; first attempt fails and the file stays put.
    sleep(Duration::from_secs(4)).await;
    assert_eq!(svc.client.upload_count(), 0);
    sleep(Duration::from_secs(2)).await;
    assert_eq!(svc.client.upload_count(), 1);
    assert_eq!(svc.ledger.count(clip), 1);
    assert!(svc.fs.contents(clip).is_some());

    // Each later touch re-triggers one more attempt.
    for attempt in 2..=3 {
        svc.fs.touch(clip);
        svc.notify(FileEventKind::Written, "/in/clip.mp4").await;
        sleep(Duration::from_secs(6)).await;
        assert_eq!(svc.client.upload_count(), attempt);
    }

    assert_eq!(svc.fs.files(), vec![PathBuf::from("/in/clip.mp4.failed")]);
    assert_eq!(svc.ledger.count(clip), 0);

    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn success_after_retries_lands_in_done() {
    let svc = Service::start(FakeUploadClient::failing(2, "timeout"), Some("/done"), Some("/failed"));
    let clip = Path::new("/in/talk.mp4");

    svc.fs.add_file(clip, b"talk".to_vec());
    svc.notify(FileEventKind::Created, "/in/talk.mp4").await;
    sleep(Duration::from_secs(6)).await;

    for _ in 0..2 {
        svc.fs.touch(clip);
        svc.notify(FileEventKind::Written, "/in/talk.mp4").await;
        sleep(Duration::from_secs(6)).await;
    }

    assert_eq!(svc.client.upload_count(), 3);
    assert_eq!(svc.fs.files(), vec![PathBuf::from("/done/talk.mp4")]);
    assert!(svc.ledger.is_empty());

    svc.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn deleting_a_failed_file_forgets_its_attempts() {
    let svc = Service::start(FakeUploadClient::failing(1, "nope"), None, None);
    let clip = Path::new("/in/gone.mp4");

    svc.fs.add_file(clip, b"x".to_vec());
    svc.notify(FileEventKind::Created, "/in/gone.mp4").await;
    sleep(Duration::from_secs(6)).await;
    assert_eq!(svc.ledger.count(clip), 1);

    svc.fs.remove(clip);
    svc.notify(FileEventKind::Removed, "/in/gone.mp4").await;
    sleep(Duration::from_secs(1)).await;
    assert_eq!(svc.ledger.count(clip), 0);

    svc.shutdown().await;
}
