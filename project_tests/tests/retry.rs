//! Per-source retry scheduling and stale commit rejection, on paused time.

use std::time::Duration;

use lib_feeds::cache::{CacheEntry, CommitOutcome};
use project_tests::{Harness, chess_table, grid, source, spotify_table};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn failed_source_is_retried_on_its_own_schedule() {
    let h = Harness::new(vec![source("chess", "chess"), source("spotify", "spotify")]);
    h.sheets.fail("chess");
    h.sheets.serve("spotify", spotify_table());

    h.orchestrator.refresh_all().await;
    let unit = h.orchestrator.unit("chess").expect("chess unit");
    assert!(unit.retry_pending());
    assert!(!h.orchestrator.unit("spotify").expect("spotify unit").retry_pending());

    tokio::time::sleep(Duration::from_secs(299)).await;
    assert_eq!(h.sheets.calls("chess"), 1);

    h.sheets.serve("chess", chess_table());
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(h.sheets.calls("chess"), 2);
    assert_eq!(h.sheets.calls("spotify"), 1);
    assert_eq!(h.error("chess"), Some(false));
    assert!(!unit.retry_pending());
}

#[tokio::test(start_paused = true)]
async fn retries_continue_until_success_then_stop() {
    let h = Harness::new(vec![source("chess", "chess")]);
    h.sheets.fail("chess");

    h.orchestrator.refresh_all().await;
    tokio::time::sleep(Duration::from_secs(3 * 300 + 1)).await;
    assert_eq!(h.sheets.calls("chess"), 4);
    assert_eq!(h.cache.get("chess"), Some(CacheEntry::placeholder()));

    h.sheets.serve("chess", chess_table());
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.sheets.calls("chess"), 5);

    tokio::time::sleep(Duration::from_secs(3 * 300)).await;
    assert_eq!(h.sheets.calls("chess"), 5);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_pending_retries() {
    let h = Harness::new(vec![source("chess", "chess")]);
    h.sheets.fail("chess");

    h.orchestrator.refresh_all().await;
    h.shutdown.cancel();
    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(h.sheets.calls("chess"), 1);
    assert!(!h.orchestrator.unit("chess").expect("chess unit").retry_pending());
}

#[tokio::test]
async fn slow_older_attempt_cannot_overwrite_newer_success() {
    let h = Harness::new(vec![source("spotify", "spotify")]);
    let old_table = grid(&[&["Date", "Value"], &["01/03/2024", "5"]]);
    let gate = h.sheets.gate("spotify", old_table);
    let unit = h.orchestrator.unit("spotify").expect("spotify unit").clone();

    let slow = {
        let unit = unit.clone();
        tokio::spawn(async move { unit.refresh().await })
    };
    while h.sheets.calls("spotify") == 0 {
        tokio::task::yield_now().await;
    }

    h.sheets.serve("spotify", spotify_table());
    assert_eq!(unit.refresh().await.expect("fresh fetch"), CommitOutcome::Applied);
    let fresh = h.data("spotify").expect("fresh summary");

    gate.notify_one();
    let outcome = slow.await.expect("slow task").expect("slow fetch");

    assert_eq!(outcome, CommitOutcome::Stale);
    assert_eq!(h.data("spotify"), Some(fresh.clone()));
    assert_eq!(fresh["byDay"]["labels"], json!(["Wed", "Thu"]));
}
