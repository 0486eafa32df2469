//! End-to-end tests of the heartbeat-file rendezvous between two in-process
//! instances sharing one temporary directory.

use std::sync::Arc;
use std::time::Duration;

use curvesync_agent::application::state_store::StateStore;
use curvesync_agent::application::sync_service::SyncService;
use curvesync_agent::infrastructure::transport::heartbeat::HeartbeatTransport;
use curvesync_agent::infrastructure::ui_bridge::{spawn_ui_thread, UiHost};
use curvesync_core::{CurveDescriptor, Point};

const WINDOW: Duration = Duration::from_secs(2);

struct TestHost {
    selected: Vec<String>,
    curves: Vec<CurveDescriptor>,
}

impl TestHost {
    fn seeded(name: &str) -> Self {
        Self {
            selected: vec![name.to_string()],
            curves: vec![CurveDescriptor::from_points(
                name,
                vec![Point::new(0.0, 1.0), Point::new(1.0, 2.0)],
                2.0,
            )],
        }
    }
}

impl UiHost for TestHost {
    fn selected_curve_names(&mut self) -> Vec<String> {
        self.selected.clone()
    }
    fn all_curves(&mut self) -> Vec<CurveDescriptor> {
        self.curves.clone()
    }
    fn merge_discovered_names(&mut self, names: Vec<String>) {
        for name in names {
            if !self.selected.contains(&name) {
                self.selected.push(name);
            }
        }
    }
    fn merge_discovered_curves(&mut self, curves: Vec<CurveDescriptor>) {
        for curve in curves {
            if !self.curves.iter().any(|c| c.name == curve.name) {
                self.curves.push(curve);
            }
        }
    }
}

fn service_in(
    dir: &std::path::Path,
    host_name: &str,
) -> (SyncService, std::thread::JoinHandle<TestHost>) {
    let store = StateStore::new();
    let transport = HeartbeatTransport::new(dir.to_path_buf(), WINDOW, store.clone());
    let (bridge, thread) = spawn_ui_thread(TestHost::seeded(host_name));
    let service = SyncService::new(
        Arc::new(transport),
        bridge,
        store,
        Duration::from_millis(50),
    );
    (service, thread)
}

#[tokio::test]
async fn test_two_services_exchange_names_and_curves_via_files() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let (service_a, _thread_a) = service_in(dir.path(), "from-a");
    let (service_b, thread_b) = service_in(dir.path(), "from-b");
    service_a.start().await.unwrap();
    service_b.start().await.unwrap();

    // Act: wait for both publish loops to drop a descriptor, then pull.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(service_b.has_running_sibling().await);
    let names = service_b.fetch_selected_from_peers().await;
    let curves = service_b.fetch_curves_from_peers().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    service_a.stop().await;
    service_b.stop().await;
    drop(service_b);
    let host_b = thread_b.join().unwrap();

    // Assert
    assert_eq!(names, vec!["from-a".to_string()]);
    assert_eq!(curves.len(), 1);
    assert_eq!(curves[0].name, "from-a");
    assert_eq!(curves[0].point_count(), 2);
    assert!(host_b.selected.contains(&"from-a".to_string()));
    assert!(host_b.curves.iter().any(|c| c.name == "from-a"));
}

#[tokio::test]
async fn test_stopped_service_disappears_from_discovery() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let (service_a, _thread_a) = service_in(dir.path(), "from-a");
    let (service_b, _thread_b) = service_in(dir.path(), "from-b");
    service_a.start().await.unwrap();
    service_b.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(service_b.has_running_sibling().await);

    // Act: orderly stop removes A's descriptor immediately, no window wait.
    service_a.stop().await;

    // Assert
    assert!(!service_b.has_running_sibling().await);
    service_b.stop().await;
}

#[tokio::test]
async fn test_single_service_sees_no_siblings() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let (service, _thread) = service_in(dir.path(), "lonely");
    service.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Act / Assert: the own descriptor exists but is never reported.
    assert!(!service.has_running_sibling().await);
    assert!(service.fetch_selected_from_peers().await.is_empty());
    service.stop().await;
}

#[tokio::test]
async fn test_missing_shared_directory_yields_empty_scans_not_errors() {
    // Arrange: a long publish period, so nothing rewrites the directory
    // after it is removed.
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new();
    let transport =
        HeartbeatTransport::new(dir.path().to_path_buf(), WINDOW, store.clone());
    let (bridge, _thread) = spawn_ui_thread(TestHost::seeded("orphan"));
    let service = SyncService::new(Arc::new(transport), bridge, store, Duration::from_secs(3600));
    service.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let path = dir.path().to_path_buf();
    drop(dir);
    assert!(!path.exists());

    // Act / Assert: scans degrade to empty, nothing panics.
    assert!(!service.has_running_sibling().await);
    assert!(service.fetch_selected_from_peers().await.is_empty());
    service.stop().await;
}
