//! End-to-end pipeline tests: scripted feed server → live feed client →
//! coalescer → fleet map.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::sleep;

use transit_engine::Session;
use transit_sources::{Auth, FeedSite, LiveFeed, RetryPolicy};

fn feed_for(addr: String) -> LiveFeed {
    LiveFeed::new(&FeedSite {
        base_url: addr,
        auth: Some(Auth::Token {
            token: "t0ken".into(),
        }),
    })
    .with_policy(RetryPolicy {
        initial: Duration::from_millis(10),
        ceiling: Duration::from_millis(40),
        max_attempts: 3,
    })
}

/// Serve the given event lines to the first client, then hold the
/// connection open.
async fn scripted_server(lines_out: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        let (sock, _) = listener.accept().await.unwrap();
        let (rd, mut wr) = sock.into_split();
        let mut lines = BufReader::new(rd).lines();
        let _ = lines.next_line().await.unwrap();

        for line in lines_out {
            wr.write_all(line.as_bytes()).await.unwrap();
            wr.write_all(b"\n").await.unwrap();
        }
        sleep(Duration::from_secs(30)).await;
    });
    addr
}

#[tokio::test]
async fn test_two_updates_one_flush_last_wins() {
    let addr = scripted_server(vec![
        r#"{"event":"location","entityId":"7","latitude":10.0,"longitude":76.0}"#.into(),
        r#"{"event":"location","entityId":"7","latitude":10.001,"longitude":76.001}"#.into(),
    ])
    .await;

    let session = Session::with_interval(
        &feed_for(addr),
        &BTreeMap::new(),
        Duration::from_millis(100),
    );

    // Both events land within one interval; after the flush the snapshot
    // carries only the second one.
    sleep(Duration::from_millis(400)).await;

    let snap = session.snapshot();
    assert_eq!(1, snap.len());
    assert_eq!("7", snap[0].id);
    let pos = snap[0].last_position.unwrap();
    assert_eq!(10.001, pos.lat);
    assert_eq!(76.001, pos.lon);
    assert!(snap[0].online);

    session.stop().await;
}

#[tokio::test]
async fn test_updates_wait_for_the_flush_tick() {
    let addr = scripted_server(vec![
        r#"{"event":"location","entityId":"7","latitude":10.0,"longitude":76.0}"#.into(),
    ])
    .await;

    let session = Session::with_interval(
        &feed_for(addr),
        &BTreeMap::new(),
        Duration::from_millis(500),
    );

    // Well before the first tick: buffered, not applied.
    sleep(Duration::from_millis(150)).await;
    assert!(session.snapshot().is_empty());

    // Past the first tick: applied.
    sleep(Duration::from_millis(600)).await;
    let snap = session.snapshot();
    assert_eq!(1, snap.len());
    assert!(snap[0].online);

    session.stop().await;
}

#[tokio::test]
async fn test_sign_off_removes_the_vehicle() {
    let addr = scripted_server(vec![
        r#"{"event":"location","entityId":"7","latitude":10.0,"longitude":76.0}"#.into(),
        r#"{"event":"location","entityId":"8","latitude":11.0,"longitude":77.0}"#.into(),
        r#"{"event":"entity-disconnected","entityId":"7"}"#.into(),
    ])
    .await;

    let session = Session::with_interval(
        &feed_for(addr),
        &BTreeMap::new(),
        Duration::from_millis(100),
    );
    sleep(Duration::from_millis(400)).await;

    // "7" was removed before it could ever flush; "8" survived.
    let snap = session.snapshot();
    let ids: Vec<&str> = snap.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(vec!["8"], ids);

    session.stop().await;
}

#[tokio::test]
async fn test_seeded_fleet_appears_offline() {
    let addr = scripted_server(vec![]).await;

    let names: BTreeMap<String, String> = [
        ("101".to_string(), "College Bus 101".to_string()),
        ("102".to_string(), "College Bus 102".to_string()),
    ]
    .into();

    let session =
        Session::with_interval(&feed_for(addr), &names, Duration::from_millis(100));
    sleep(Duration::from_millis(200)).await;

    let snap = session.snapshot();
    assert_eq!(2, snap.len());
    assert!(snap.iter().all(|v| !v.online && v.last_position.is_none()));

    session.stop().await;
}
