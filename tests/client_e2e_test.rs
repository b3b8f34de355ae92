use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};

use idle_miner::core::{ClientView, Phase};
use idle_miner::transport::memory::{MemoryConnector, MemoryPeer, MemoryServer};
use idle_miner::transport::{Client, ClientConfig, TransportError};
use idle_miner::types::ConnectionState;

fn config() -> ClientConfig {
    ClientConfig {
        server_url: "mem://game".to_string(),
        ..ClientConfig::default()
    }
}

fn status_frame(level: u32, copper: u64) -> serde_json::Value {
    json!({
        "type": "status",
        "data": {
            "skill_type": "mining",
            "level": level,
            "xp": 0,
            "xp_in_level": 0,
            "xp_needed": 83,
            "current_action": null,
            "action_started": null,
            "available_ores": [
                {"id": "copper", "name": "Copper Ore", "level_required": 1, "xp": 10,
                 "mining_time": 2.0, "ascii": "[Cu]", "color": "#B87333",
                 "description": "A common ore.", "quantity": copper, "unlocked": true},
                {"id": "iron", "name": "Iron Ore", "level_required": 15, "xp": 35,
                 "mining_time": 4.0, "ascii": "[Fe]", "color": "#A19D94",
                 "description": "Sturdy.", "quantity": 0, "unlocked": false}
            ],
            "inventory": {"copper": copper, "iron": 0}
        }
    })
}

async fn wait_for<F>(views: &mut watch::Receiver<ClientView>, mut pred: F) -> ClientView
where
    F: FnMut(&ClientView) -> bool,
{
    loop {
        {
            let view = views.borrow_and_update();
            if pred(&view) {
                return view.clone();
            }
        }
        timeout(Duration::from_secs(600), views.changed())
            .await
            .expect("timed out waiting for view")
            .expect("view channel closed");
    }
}

async fn connected_client() -> (Client, MemoryServer, MemoryPeer, watch::Receiver<ClientView>) {
    let (connector, mut server) = MemoryConnector::new();
    let client = Client::start(connector, &config());
    let mut views = client.subscribe();

    let peer = timeout(Duration::from_secs(5), server.accept())
        .await
        .expect("client never dialed")
        .unwrap();
    assert_eq!(peer.endpoint(), "mem://game/ws/12345");

    let view = wait_for(&mut views, |v| v.connection == ConnectionState::Connected).await;
    assert_eq!(view.phase(), Phase::Loading);
    (client, server, peer, views)
}

#[tokio::test(start_paused = true)]
async fn copper_session_end_to_end() {
    let (client, _server, mut peer, mut views) = connected_client().await;

    peer.send_json(&status_frame(1, 0));
    let view = wait_for(&mut views, |v| v.game.is_some()).await;
    assert_eq!(view.phase(), Phase::Ready);
    assert_eq!(view.current_activity(), None);

    client.start_activity("copper").unwrap();
    assert_eq!(
        peer.recv_text().await.as_deref(),
        Some(r#"{"action":"start_mining","ore":"copper"}"#)
    );
    // Nothing changes until the server confirms.
    assert_eq!(client.view().current_activity(), None);

    peer.send_json(&json!({
        "type": "mining_started", "ore_id": "copper",
        "ore_name": "Copper Ore", "message": "Started mining Copper Ore"
    }));
    wait_for(&mut views, |v| v.current_activity() == Some("copper")).await;

    peer.send_json(&json!({"type": "mining_tick", "progress": 0.5, "ore_id": "copper"}));
    wait_for(&mut views, |v| v.mining_progress == 0.5).await;

    peer.send_json(&json!({
        "type": "ore_mined", "ore_id": "copper", "ore_name": "Copper Ore",
        "xp_gained": 10, "total_xp": 10, "level": 1, "ore_quantity": 1,
        "xp_in_level": 10, "xp_needed": 83, "message": "You mined Copper Ore!"
    }));
    let view = wait_for(&mut views, |v| v.notification.is_some()).await;
    let mined_at = Instant::now();

    let game = view.game.as_ref().unwrap();
    assert_eq!(game.quantity("copper"), 1);
    assert_eq!(game.total_xp, 10);
    assert_eq!(view.mining_progress, 0.0);
    assert!(view.notification.as_deref().unwrap().contains("Copper Ore"));

    tokio::time::sleep(Duration::from_millis(1999)).await;
    assert!(client.view().notification.is_some());

    let view = wait_for(&mut views, |v| v.notification.is_none()).await;
    let lived = mined_at.elapsed();
    assert!(lived >= Duration::from_millis(2000), "cleared early: {lived:?}");
    assert!(lived < Duration::from_millis(2050), "cleared late: {lived:?}");
    assert_eq!(view.game.as_ref().unwrap().quantity("copper"), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn start_while_disconnected_sends_nothing() {
    let (connector, mut server) = MemoryConnector::new();
    server.refuse_next(1);
    let client = Client::start(connector, &config());
    let mut views = client.subscribe();

    let err = client.start_activity("copper").unwrap_err();
    assert!(matches!(err, TransportError::NotConnected(_)));
    assert_eq!(client.view().current_activity(), None);

    // The refused dial is retried after the delay.
    let mut peer = timeout(Duration::from_secs(60), server.accept())
        .await
        .unwrap()
        .unwrap();
    wait_for(&mut views, |v| v.connection == ConnectionState::Connected).await;

    tokio::task::yield_now().await;
    assert_eq!(peer.try_recv_text(), None);
    assert_eq!(server.attempts().len(), 2);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn snapshot_survives_a_reconnect() {
    let (client, mut server, peer, mut views) = connected_client().await;

    peer.send_json(&status_frame(4, 7));
    wait_for(&mut views, |v| v.game.is_some()).await;

    peer.close();
    let view = wait_for(&mut views, |v| v.connection == ConnectionState::Disconnected).await;
    let dropped_at = Instant::now();
    assert_eq!(view.phase(), Phase::Ready);
    assert_eq!(view.game.as_ref().unwrap().level, 4);
    assert!(client.stop_activity().is_err());

    let fresh = timeout(Duration::from_secs(60), server.accept())
        .await
        .unwrap()
        .unwrap();
    assert!(dropped_at.elapsed() >= Duration::from_millis(3000));

    let view = wait_for(&mut views, |v| v.connection == ConnectionState::Connected).await;
    assert_eq!(view.game.as_ref().unwrap().quantity("copper"), 7);

    // The fresh status is a full resync.
    fresh.send_json(&status_frame(5, 9));
    let view = wait_for(&mut views, |v| v.game.as_ref().map(|g| g.level) == Some(5)).await;
    assert_eq!(view.game.as_ref().unwrap().quantity("copper"), 9);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_injection_leaves_view_unchanged() {
    let (client, _server, peer, mut views) = connected_client().await;

    peer.send_json(&status_frame(2, 3));
    let before = wait_for(&mut views, |v| v.game.is_some()).await;

    peer.send_text("{garbage");
    peer.send_text(r#"{"type":"ore_mined","ore_id":"copper"}"#);
    peer.send_text(r#"{"type":"level_up"}"#);
    peer.send_text(r#"{"type":"treasure_found","ore":"gold"}"#);
    peer.send_json(&json!({"type": "mining_tick", "progress": 0.3}));

    let after = wait_for(&mut views, |v| v.mining_progress == 0.3).await;

    let mut expected = before;
    expected.mining_progress = 0.3;
    assert_eq!(after, expected);
    assert_eq!(after.notification, None);
    assert!(!after.level_up);
    assert_eq!(client.connection_state(), ConnectionState::Connected);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn second_level_up_extends_the_flag() {
    let (client, _server, peer, mut views) = connected_client().await;

    peer.send_json(&json!({"type": "level_up", "skill": "mining", "new_level": 2}));
    wait_for(&mut views, |v| v.level_up).await;
    let first_at = Instant::now();

    tokio::time::sleep(Duration::from_millis(2000)).await;
    peer.send_json(&json!({"type": "level_up", "skill": "mining", "new_level": 3}));
    wait_for(&mut views, |v| {
        v.notification.as_deref() == Some("LEVEL UP! Mining Level 3!")
    })
    .await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(client.view().level_up, "first timer cleared the newer flag");

    wait_for(&mut views, |v| !v.level_up).await;
    assert!(first_at.elapsed() >= Duration::from_millis(5000));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn error_message_is_transient() {
    let (client, _server, peer, mut views) = connected_client().await;

    peer.send_json(&status_frame(1, 0));
    let before = wait_for(&mut views, |v| v.game.is_some()).await;

    peer.send_json(&json!({
        "type": "error",
        "message": "You need Mining level 15 to mine Iron Ore."
    }));
    let view = wait_for(&mut views, |v| v.notification.is_some()).await;
    assert_eq!(view.game, before.game);

    let shown_at = Instant::now();
    wait_for(&mut views, |v| v.notification.is_none()).await;
    assert!(shown_at.elapsed() >= Duration::from_millis(3000));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_everything() {
    let (client, mut server, mut peer, _views) = connected_client().await;

    client.shutdown().await;
    assert_eq!(peer.recv_text().await, None);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(server.attempts().len(), 1);
    assert!(server.try_accept().is_none());
}

#[test]
#[should_panic]
fn start_requires_a_runtime() {
    let (connector, _server) = MemoryConnector::new();
    let _client = Client::start(connector, &config());
}
