//! Leaderboard query view: a ranked or chronological window over the score
//! feed for a fixed audience of rows.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    config::AppConfig,
    feed::{DocumentStore, FeedSlot, QueryKey, SortDirection, SubscriptionManager},
    projection::{ScoreRecord, project_score},
};

/// Binary presentation mode of the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMode {
    /// Best scores first.
    HighScores,
    /// Most recent games first.
    Recent,
}

impl LeaderboardMode {
    fn order_by(self) -> &'static str {
        match self {
            LeaderboardMode::HighScores => "score",
            LeaderboardMode::Recent => "date",
        }
    }
}

/// Display state of the leaderboard. `loading` clears only after the active
/// feed's first delivery, so an empty board is distinguishable from one that
/// has not loaded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardSnapshot {
    /// Whether the active feed has delivered yet.
    pub loading: bool,
    /// Mode the rows are ordered by.
    pub mode: LeaderboardMode,
    /// Projected rows, in feed order.
    pub rows: Vec<ScoreRecord>,
    /// Message of the last feed error, cleared on re-subscribe.
    pub error: Option<String>,
}

/// Live view over the score collection, re-subscribing through the
/// subscription manager whenever the mode toggles.
pub struct LeaderboardView {
    subscriptions: Arc<SubscriptionManager>,
    snapshot: watch::Sender<LeaderboardSnapshot>,
    scores_collection: String,
    limit: usize,
}

impl LeaderboardView {
    /// Open the view in [`LeaderboardMode::HighScores`].
    pub fn open(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        let view = Self {
            subscriptions: Arc::new(SubscriptionManager::new(store)),
            snapshot: watch::channel(LeaderboardSnapshot {
                loading: true,
                mode: LeaderboardMode::HighScores,
                rows: Vec::new(),
                error: None,
            })
            .0,
            scores_collection: config.scores_collection.clone(),
            limit: config.leaderboard_limit,
        };
        view.set_mode(LeaderboardMode::HighScores);
        view
    }

    /// Switch the ordering mode, tearing down the previous feed first. A
    /// delivery still in flight for the previous mode is discarded.
    pub fn set_mode(&self, mode: LeaderboardMode) {
        self.snapshot.send_modify(|snapshot| {
            snapshot.loading = true;
            snapshot.mode = mode;
            snapshot.error = None;
        });

        let key = QueryKey {
            collection: self.scores_collection.clone(),
            order_by: mode.order_by().to_string(),
            direction: SortDirection::Descending,
            limit: self.limit,
        };

        let subscriptions = Arc::clone(&self.subscriptions);
        let sink = self.snapshot.clone();
        let on_data = move |generation, documents: Vec<crate::feed::DocumentSnapshot>| {
            if !subscriptions.is_current(FeedSlot::Leaderboard, generation) {
                return;
            }

            let rows: Vec<ScoreRecord> = documents
                .iter()
                .filter_map(|document| document.data.as_ref())
                .filter_map(|raw| match project_score(raw) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        debug!(error = %err, "skipping unprojectable score document");
                        None
                    }
                })
                .collect();

            sink.send_modify(|snapshot| {
                if snapshot.mode == mode {
                    snapshot.loading = false;
                    snapshot.rows = rows;
                    snapshot.error = None;
                }
            });
        };

        let subscriptions = Arc::clone(&self.subscriptions);
        let sink = self.snapshot.clone();
        let on_error = move |generation, error: crate::error::ProviderError| {
            if !subscriptions.is_current(FeedSlot::Leaderboard, generation) {
                return;
            }
            sink.send_modify(|snapshot| {
                if snapshot.mode == mode {
                    snapshot.loading = false;
                    snapshot.error = Some(error.message.clone());
                }
            });
        };

        self.subscriptions
            .subscribe_query(FeedSlot::Leaderboard, &key, on_data, on_error);
    }

    /// Observe leaderboard snapshots.
    pub fn watcher(&self) -> watch::Receiver<LeaderboardSnapshot> {
        self.snapshot.subscribe()
    }

    /// Latest published snapshot.
    pub fn current(&self) -> LeaderboardSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Tear down the feed. Also happens when the view is dropped.
    pub fn close(&self) {
        self.subscriptions.unsubscribe_all();
    }
}

impl Drop for LeaderboardView {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{error::ProviderError, feed::memory::MemoryStore};

    fn score(score: i64, date: i64, first: &str) -> serde_json::Value {
        json!({ "score": score, "date": date, "firstName": first, "lastName": "Doe" })
    }

    async fn wait_for(
        watcher: &mut watch::Receiver<LeaderboardSnapshot>,
        predicate: impl Fn(&LeaderboardSnapshot) -> bool,
    ) -> LeaderboardSnapshot {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                {
                    let snapshot = watcher.borrow();
                    if predicate(&snapshot) {
                        return snapshot.clone();
                    }
                }
                watcher.changed().await.expect("leaderboard channel closed");
            }
        })
        .await
        .expect("leaderboard never matched predicate")
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.upsert("game-scores", "a", score(10, 3_000, "Ada"));
        store.upsert("game-scores", "b", score(30, 1_000, "Bob"));
        store.upsert("game-scores", "c", score(20, 2_000, "Cyd"));
        store
    }

    #[tokio::test]
    async fn high_scores_mode_orders_by_score() {
        let view = LeaderboardView::open(seeded_store(), &AppConfig::default());
        let mut watcher = view.watcher();

        let snapshot = wait_for(&mut watcher, |s| !s.loading).await;
        let scores: Vec<i64> = snapshot.rows.iter().map(|row| row.score).collect();
        assert_eq!(scores, [30, 20, 10]);
        assert_eq!(snapshot.rows[0].full_name, "Bob Doe");
        assert_eq!(snapshot.rows[0].initials, "BD");
    }

    #[tokio::test]
    async fn toggling_to_recent_reorders_by_date() {
        let view = LeaderboardView::open(seeded_store(), &AppConfig::default());
        let mut watcher = view.watcher();
        wait_for(&mut watcher, |s| !s.loading).await;

        view.set_mode(LeaderboardMode::Recent);

        let snapshot =
            wait_for(&mut watcher, |s| !s.loading && s.mode == LeaderboardMode::Recent).await;
        let scores: Vec<i64> = snapshot.rows.iter().map(|row| row.score).collect();
        assert_eq!(scores, [10, 20, 30]);
    }

    #[tokio::test]
    async fn empty_board_is_distinguishable_from_loading() {
        let view = LeaderboardView::open(Arc::new(MemoryStore::new()), &AppConfig::default());
        let mut watcher = view.watcher();

        assert!(view.current().loading);
        let snapshot = wait_for(&mut watcher, |s| !s.loading).await;
        assert!(snapshot.rows.is_empty());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn limit_caps_the_row_count() {
        let store = Arc::new(MemoryStore::new());
        for index in 0..40 {
            store.upsert(
                "game-scores",
                &format!("doc{index}"),
                score(index, index, "Ada"),
            );
        }

        let view = LeaderboardView::open(store, &AppConfig::default());
        let mut watcher = view.watcher();

        let snapshot = wait_for(&mut watcher, |s| !s.loading).await;
        assert_eq!(snapshot.rows.len(), 25);
        assert_eq!(snapshot.rows[0].score, 39);
    }

    #[tokio::test]
    async fn unprojectable_documents_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.upsert("game-scores", "ok", score(10, 1_000, "Ada"));
        store.upsert("game-scores", "bad", json!({ "note": "no score here" }));

        let view = LeaderboardView::open(store, &AppConfig::default());
        let mut watcher = view.watcher();

        let snapshot = wait_for(&mut watcher, |s| !s.loading).await;
        assert_eq!(snapshot.rows.len(), 1);
        assert_eq!(snapshot.rows[0].score, 10);
    }

    #[tokio::test]
    async fn feed_error_clears_loading_and_records_message() {
        let store = Arc::new(MemoryStore::new());
        let view = LeaderboardView::open(store.clone(), &AppConfig::default());
        let mut watcher = view.watcher();
        wait_for(&mut watcher, |s| !s.loading).await;

        store.emit_error("game-scores", ProviderError::new("unavailable", "feed down"));

        let snapshot = wait_for(&mut watcher, |s| s.error.is_some()).await;
        assert_eq!(snapshot.error.as_deref(), Some("feed down"));
        assert!(!snapshot.loading);
    }
}
