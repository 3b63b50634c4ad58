// tests/board_refresh.rs
//
// Overlapping refreshes: only the most recently issued one may update the board.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use techinvest_ai::config::Locale;
use techinvest_ai::error::FetchError;
use techinvest_ai::news::NewsItem;
use techinvest_ai::{BoardState, FallbackOrchestrator, NewsBoard, NewsStrategy};

struct Delayed {
    delay: Duration,
    id: &'static str,
}

#[async_trait]
impl NewsStrategy for Delayed {
    fn name(&self) -> &'static str {
        "delayed"
    }
    async fn fetch(&self) -> Result<Vec<NewsItem>, FetchError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![NewsItem {
            id: self.id.into(),
            ..Default::default()
        }])
    }
}

fn orch(delay_ms: u64, id: &'static str) -> Arc<FallbackOrchestrator> {
    let strategies: Vec<Box<dyn NewsStrategy>> = vec![Box::new(Delayed {
        delay: Duration::from_millis(delay_ms),
        id,
    })];
    Arc::new(FallbackOrchestrator::new(strategies, Locale::Ja))
}

#[tokio::test]
async fn slow_older_refresh_cannot_overwrite_newer_one() {
    let board = Arc::new(NewsBoard::new(Locale::Ja));
    let slow = orch(150, "old");
    let fast = orch(10, "new");

    let b1 = board.clone();
    let first = tokio::spawn(async move { b1.refresh(&slow).await });
    // Make sure the slow refresh has taken its ticket first.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let b2 = board.clone();
    let second = tokio::spawn(async move { b2.refresh(&fast).await });

    assert!(second.await.unwrap(), "newest refresh must be applied");
    assert!(!first.await.unwrap(), "stale refresh must be discarded");

    match board.snapshot() {
        BoardState::Ready { items, generation, .. } => {
            assert_eq!(items[0].id, "new");
            assert_eq!(generation, 2);
        }
        other => panic!("unexpected state {other:?}"),
    }
    assert!(!board.in_flight());
}

#[tokio::test]
async fn failed_refresh_replaces_previous_batch() {
    struct Failing;
    #[async_trait]
    impl NewsStrategy for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn fetch(&self) -> Result<Vec<NewsItem>, FetchError> {
            Err(FetchError::Transport("down".into()))
        }
    }

    let board = NewsBoard::new(Locale::Ja);
    assert!(board.refresh(&orch(0, "first")).await);
    assert_eq!(board.snapshot().items().len(), 1);

    let strategies: Vec<Box<dyn NewsStrategy>> = vec![Box::new(Failing)];
    let failing = FallbackOrchestrator::new(strategies, Locale::Ja);
    assert!(board.refresh(&failing).await);

    match board.snapshot() {
        BoardState::Failed { message, .. } => assert_eq!(message, "通信エラーが発生しました。"),
        other => panic!("unexpected state {other:?}"),
    }
    assert!(board.snapshot().items().is_empty());
}
