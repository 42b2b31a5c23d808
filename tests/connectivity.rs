use std::time::Duration;

use mockito::Server;
use tokio_util::sync::CancellationToken;
use tripsync_lib::connectivity::{check_reachable, watch_reachability, ConnectivityMonitor};

#[tokio::test]
async fn any_response_counts_as_reachable() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/generate_204")
        .with_status(204)
        .create_async()
        .await;
    let http = reqwest::Client::new();

    let url = format!("{}/generate_204", server.url());
    assert!(check_reachable(&http, &url, Duration::from_secs(1)).await);
    assert!(!check_reachable(&http, "http://127.0.0.1:9/", Duration::from_secs(1)).await);
}

#[tokio::test]
async fn reachability_loop_marks_monitor_online() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/generate_204")
        .with_status(204)
        .create_async()
        .await;
    let url = format!("{}/generate_204", server.url());

    let monitor = ConnectivityMonitor::new(false);
    let mut state = monitor.subscribe();
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(watch_reachability(
        monitor.clone(),
        reqwest::Client::new(),
        url,
        Duration::from_millis(50),
        Duration::from_secs(1),
        cancel.clone(),
    ));

    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|online| *online))
        .await
        .expect("monitor went online in time")
        .unwrap();
    assert!(monitor.current_state());

    cancel.cancel();
    watcher.await.unwrap();
}
