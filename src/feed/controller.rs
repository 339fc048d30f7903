//! Topic-driven paginated feed.
//!
//! The controller owns the page counter, the accumulated items and the
//! active topic selection. Fetches run as background tasks and report back
//! through the event channel; the UI loop feeds those events into
//! [`TopicFeed::handle`]. Every page fetch is stamped with the generation it
//! was issued under, and a reset bumps the generation, so results from an
//! older session are dropped instead of being appended to the new one.

use futures::stream::{self, Stream, StreamExt};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::detail::{ReadmeState, RepoDetail};
use crate::github::{RepoSearch, Repository, SearchError};
use crate::route::{decode_repository, HandoffError};
use crate::storage::{ActiveTopics, SelectionMode, SettingsStore, StoreError, Topic, TopicError};

// ============================================================================
// Events
// ============================================================================

/// Which background task an event or panic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTask {
    Page { generation: u64 },
    Readme { generation: u64 },
    Watcher,
}

impl FeedTask {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Page { .. } => "page_fetch",
            Self::Readme { .. } => "readme_fetch",
            Self::Watcher => "topic_watcher",
        }
    }
}

/// Completions and store notifications delivered to the UI loop.
#[derive(Debug)]
pub enum FeedEvent {
    PageLoaded {
        generation: u64,
        page: u32,
        result: Result<Vec<Repository>, SearchError>,
    },
    ReadmeLoaded {
        generation: u64,
        full_name: String,
        result: Result<String, SearchError>,
    },
    SavedTopicsChanged(Vec<Topic>),
    ActiveTopicsChanged(Option<ActiveTopics>),
    TaskPanicked {
        task: FeedTask,
        error: String,
    },
}

// ============================================================================
// State
// ============================================================================

/// Pagination state for the current session.
#[derive(Debug, Clone)]
pub struct FeedState {
    /// 1-based page most recently requested.
    pub page: u32,
    /// Items in arrival order. Shared with the renderer.
    pub items: Arc<Vec<Repository>>,
    pub loading: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            page: 1,
            items: Arc::default(),
            loading: false,
        }
    }
}

pub struct TopicFeed<S: RepoSearch> {
    search: Arc<S>,
    store: Arc<SettingsStore>,
    mode: SelectionMode,
    events: mpsc::Sender<FeedEvent>,

    state: FeedState,
    saved: Vec<Topic>,
    active: Option<ActiveTopics>,

    generation: u64,
    in_flight: usize,
    page_tasks: Vec<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,

    detail: Option<RepoDetail>,
    readme_generation: u64,
    readme_task: Option<JoinHandle<()>>,
}

impl<S: RepoSearch> TopicFeed<S> {
    pub fn new(
        search: Arc<S>,
        store: Arc<SettingsStore>,
        mode: SelectionMode,
        events: mpsc::Sender<FeedEvent>,
    ) -> Self {
        let saved = store.snapshot().topic_list;
        Self {
            search,
            store,
            mode,
            events,
            state: FeedState::default(),
            saved,
            active: None,
            generation: 0,
            in_flight: 0,
            page_tasks: Vec::new(),
            watcher: None,
            detail: None,
            readme_generation: 0,
            readme_task: None,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn items(&self) -> &Arc<Vec<Repository>> {
        &self.state.items
    }

    pub fn saved_topics(&self) -> &[Topic] {
        &self.saved
    }

    pub fn active(&self) -> Option<&ActiveTopics> {
        self.active.as_ref()
    }

    pub fn detail(&self) -> Option<&RepoDetail> {
        self.detail.as_ref()
    }

    /// Generation stamped on page fetches issued now.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ------------------------------------------------------------------------
    // Topic streams
    // ------------------------------------------------------------------------

    /// Saved topic list: current value first, then each distinct change.
    pub fn observe_saved_topics(&self) -> impl Stream<Item = Vec<Topic>> + Send + 'static {
        self.store.saved_topics()
    }

    /// Active selection: current value first, then each distinct change.
    pub fn observe_active_topics(
        &self,
    ) -> impl Stream<Item = Option<ActiveTopics>> + Send + 'static {
        self.store.active_topics(self.mode)
    }

    /// Forward both topic streams into the event channel.
    ///
    /// The first active value triggers the initial load once the UI loop
    /// applies it. Calling this twice replaces the previous watcher.
    pub fn start(&mut self) {
        if let Some(old) = self.watcher.take() {
            old.abort();
        }

        let saved = self
            .observe_saved_topics()
            .map(FeedEvent::SavedTopicsChanged);
        let active = self
            .observe_active_topics()
            .map(FeedEvent::ActiveTopicsChanged);
        let tx = self.events.clone();

        self.watcher = Some(tokio::spawn(async move {
            let tx_panic = tx.clone();
            let forward = async move {
                let mut merged = std::pin::pin!(stream::select(saved, active));
                while let Some(event) = merged.next().await {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            };
            if let Err(error) = catch_task_panic(forward).await {
                let _ = tx_panic
                    .send(FeedEvent::TaskPanicked {
                        task: FeedTask::Watcher,
                        error,
                    })
                    .await;
            }
        }));
    }

    /// Apply one event from the channel.
    ///
    /// Returns a message for the status line when the user should hear
    /// about it.
    pub fn handle(&mut self, event: FeedEvent) -> Option<String> {
        match event {
            FeedEvent::PageLoaded {
                generation,
                page,
                result,
            } => {
                self.apply_page(generation, page, result);
                None
            }
            FeedEvent::ReadmeLoaded {
                generation,
                full_name,
                result,
            } => {
                self.apply_readme(generation, &full_name, result);
                None
            }
            FeedEvent::SavedTopicsChanged(saved) => {
                self.saved = saved;
                None
            }
            FeedEvent::ActiveTopicsChanged(active) => {
                self.apply_active(active);
                None
            }
            FeedEvent::TaskPanicked { task, error } => {
                tracing::error!(task = task.name(), error = %error, "Background task panicked");
                match task {
                    FeedTask::Page { generation } if generation == self.generation => {
                        self.settle_page();
                    }
                    FeedTask::Readme { generation } if generation == self.readme_generation => {
                        if let Some(detail) = &mut self.detail {
                            detail.readme = ReadmeState::Failed(error.clone());
                            detail.show_error = true;
                        }
                    }
                    _ => {}
                }
                Some(format!("Background task failed: {error}"))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------------

    /// React to a new active selection. Equal values are ignored.
    pub fn apply_active(&mut self, active: Option<ActiveTopics>) {
        if active == self.active {
            return;
        }
        self.active = active;

        match self.active.as_ref().map(ActiveTopics::label) {
            Some(label) => {
                tracing::info!(topics = %label, "Active topics changed");
                self.refresh();
            }
            None => {
                tracing::info!("Active topic selection cleared");
                self.cancel_pages();
                self.generation += 1;
            }
        }
    }

    /// Drop accumulated items and reload page 1 of the active selection.
    pub fn refresh(&mut self) {
        self.cancel_pages();
        self.generation += 1;
        self.state = FeedState::default();
        self.spawn_page(1);
    }

    /// Request the next page. Not blocked by a load already in flight.
    pub fn load_more(&mut self) {
        if self.active.is_none() {
            tracing::debug!("No active topics, ignoring load more");
            return;
        }
        self.state.page += 1;
        let page = self.state.page;
        self.spawn_page(page);
    }

    /// Apply a finished page fetch issued under `generation`.
    pub fn apply_page(
        &mut self,
        generation: u64,
        page: u32,
        result: Result<Vec<Repository>, SearchError>,
    ) {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                page,
                "Ignoring stale page (generation mismatch)"
            );
            return;
        }
        self.settle_page();

        match result {
            Ok(items) => {
                tracing::debug!(page, count = items.len(), "Page loaded");
                Arc::make_mut(&mut self.state.items).extend(items);
            }
            Err(e) => {
                tracing::warn!(page, error = %e, "Page fetch failed");
            }
        }
    }

    fn spawn_page(&mut self, page: u32) {
        let Some((tags, label)) = self
            .active
            .as_ref()
            .map(|a| (a.tags().to_vec(), a.label()))
        else {
            return;
        };

        let generation = self.generation;
        let search = Arc::clone(&self.search);
        tracing::debug!(page, generation, topics = %label, "Fetching page");

        self.page_tasks.retain(|h| !h.is_finished());
        self.in_flight += 1;
        self.state.loading = true;

        let handle = spawn_reporting(
            self.events.clone(),
            FeedTask::Page { generation },
            async move {
                let result = search.fetch_page(page, &tags).await;
                FeedEvent::PageLoaded {
                    generation,
                    page,
                    result,
                }
            },
        );
        self.page_tasks.push(handle);
    }

    fn settle_page(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.state.loading = self.in_flight > 0;
    }

    fn cancel_pages(&mut self) {
        for handle in self.page_tasks.drain(..) {
            handle.abort();
        }
        self.in_flight = 0;
        self.state.loading = false;
    }

    // ------------------------------------------------------------------------
    // Topic edits
    // ------------------------------------------------------------------------

    /// Save a new topic at the end of the list.
    ///
    /// # Errors
    ///
    /// `TopicError::Empty` for blank input, `TopicError::Invalid` for text
    /// that is not a single tag, `TopicError::Duplicate` if the topic is
    /// already saved.
    pub async fn add_topic(&self, raw: &str) -> Result<Topic, TopicError> {
        let topic = Topic::parse(raw)?;
        let topic = self
            .store
            .update(move |s| {
                if s.topic_list.contains(&topic) {
                    Err(TopicError::Duplicate(topic.to_string()))
                } else {
                    s.topic_list.push(topic.clone());
                    Ok(topic)
                }
            })
            .await??;
        tracing::info!(topic = %topic, "Topic saved");
        Ok(topic)
    }

    /// Remove a saved topic. The active selection is left as it is.
    ///
    /// Returns whether the topic was present.
    pub async fn remove_topic(&self, topic: &Topic) -> Result<bool, StoreError> {
        let removed = self
            .store
            .update(|s| {
                let before = s.topic_list.len();
                s.topic_list.retain(|t| t != topic);
                s.topic_list.len() != before
            })
            .await?;
        if removed {
            tracing::info!(topic = %topic, "Topic removed");
        }
        Ok(removed)
    }

    /// Make `topic` the only active topic.
    pub async fn select_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        self.store
            .update(|s| s.current_topics = vec![topic.clone()])
            .await
    }

    /// Flip `topic` in or out of the active set. In single mode this selects it.
    pub async fn toggle_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        if self.mode == SelectionMode::Single {
            return self.select_topic(topic).await;
        }
        self.store
            .update(|s| {
                if s.current_topics.contains(topic) {
                    s.current_topics.retain(|t| t != topic);
                } else {
                    s.current_topics.push(topic.clone());
                }
            })
            .await
    }

    // ------------------------------------------------------------------------
    // Detail view
    // ------------------------------------------------------------------------

    /// Decode a hand-off token, show the repository and start its README fetch.
    pub fn open_detail(&mut self, encoded: &str) -> Result<(), HandoffError> {
        let repo = decode_repository(encoded)?;
        self.cancel_readme();
        self.readme_generation += 1;

        let generation = self.readme_generation;
        let full_name = repo.full_name.clone();
        let search = Arc::clone(&self.search);
        tracing::debug!(repo = %full_name, "Opening repository detail");

        self.detail = Some(RepoDetail::new(repo));
        self.readme_task = Some(spawn_reporting(
            self.events.clone(),
            FeedTask::Readme { generation },
            async move {
                let result = search.fetch_readme(&full_name).await;
                FeedEvent::ReadmeLoaded {
                    generation,
                    full_name,
                    result,
                }
            },
        ));
        Ok(())
    }

    pub fn close_detail(&mut self) {
        self.cancel_readme();
        self.readme_generation += 1;
        self.detail = None;
    }

    /// Hide the README error dialog.
    pub fn dismiss_error(&mut self) {
        if let Some(detail) = &mut self.detail {
            detail.show_error = false;
        }
    }

    pub fn apply_readme(
        &mut self,
        generation: u64,
        full_name: &str,
        result: Result<String, SearchError>,
    ) {
        if generation != self.readme_generation {
            tracing::debug!(repo = %full_name, "Ignoring stale README (generation mismatch)");
            return;
        }
        let Some(detail) = &mut self.detail else {
            return;
        };

        match result {
            Ok(text) => detail.readme = ReadmeState::Loaded(text),
            Err(e) => {
                tracing::warn!(repo = %full_name, error = %e, "README fetch failed");
                detail.readme = ReadmeState::Failed(e.to_string());
                detail.show_error = true;
            }
        }
    }

    fn cancel_readme(&mut self) {
        if let Some(handle) = self.readme_task.take() {
            handle.abort();
        }
    }

    /// Abort every background task. Late completions are discarded.
    pub fn shutdown(&mut self) {
        self.cancel_pages();
        self.cancel_readme();
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.generation += 1;
        self.readme_generation += 1;
    }
}

impl<S: RepoSearch> Drop for TopicFeed<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Task helpers
// ============================================================================

/// Run `work` on the runtime and send its event, or a panic report.
fn spawn_reporting<F>(events: mpsc::Sender<FeedEvent>, task: FeedTask, work: F) -> JoinHandle<()>
where
    F: Future<Output = FeedEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let event = match catch_task_panic(work).await {
            Ok(event) => event,
            Err(error) => FeedEvent::TaskPanicked { task, error },
        };
        // Receiver gone means the UI has shut down
        let _ = events.send(event).await;
    })
}

/// Catch a panic in `future` and turn its payload into a message.
async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future).catch_unwind().await.map_err(|panic| {
        if let Some(s) = panic.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::encode_repository;
    use crate::storage::Database;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    fn topic(s: &str) -> Topic {
        Topic::parse(s).unwrap()
    }

    fn repo(n: usize) -> Repository {
        serde_json::from_value(serde_json::json!({
            "html_url": format!("https://github.com/o/r{n}"),
            "name": format!("r{n}"),
            "full_name": format!("o/r{n}"),
        }))
        .unwrap()
    }

    fn repos(range: std::ops::Range<usize>) -> Vec<Repository> {
        range.map(repo).collect()
    }

    // ------------------------------------------------------------------------
    // Stub search
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct StubSearch {
        pages: StdMutex<HashMap<u32, Result<Vec<Repository>, u16>>>,
        readme: StdMutex<Option<Result<String, u16>>>,
        calls: StdMutex<Vec<(u32, Vec<Topic>)>>,
        gate: Option<Arc<Semaphore>>,
        panic_on_page: Option<u32>,
    }

    impl StubSearch {
        fn with_page(self, page: u32, result: Result<Vec<Repository>, u16>) -> Self {
            self.pages.lock().unwrap().insert(page, result);
            self
        }

        fn with_readme(self, result: Result<String, u16>) -> Self {
            *self.readme.lock().unwrap() = Some(result);
            self
        }

        fn gated(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn calls(&self) -> Vec<(u32, Vec<Topic>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RepoSearch for StubSearch {
        async fn fetch_page(
            &self,
            page: u32,
            topics: &[Topic],
        ) -> Result<Vec<Repository>, SearchError> {
            self.calls.lock().unwrap().push((page, topics.to_vec()));
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.panic_on_page == Some(page) {
                panic!("stub exploded on page {page}");
            }
            let canned = self.pages.lock().unwrap().get(&page).cloned();
            match canned {
                Some(Ok(items)) => Ok(items),
                Some(Err(status)) => Err(SearchError::HttpStatus(status)),
                None => Ok(Vec::new()),
            }
        }

        async fn fetch_readme(&self, _full_name: &str) -> Result<String, SearchError> {
            let canned = self.readme.lock().unwrap().clone();
            match canned {
                Some(Ok(text)) => Ok(text),
                Some(Err(status)) => Err(SearchError::HttpStatus(status)),
                None => Ok(String::new()),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Harness
    // ------------------------------------------------------------------------

    struct Harness {
        feed: TopicFeed<StubSearch>,
        rx: mpsc::Receiver<FeedEvent>,
        search: Arc<StubSearch>,
        store: Arc<SettingsStore>,
    }

    async fn harness(search: StubSearch, mode: SelectionMode) -> Harness {
        let db = Database::open(":memory:").await.unwrap();
        let store = Arc::new(SettingsStore::open(db).await.unwrap());
        let search = Arc::new(search);
        let (tx, rx) = mpsc::channel(32);
        let feed = TopicFeed::new(search.clone(), store.clone(), mode, tx);
        Harness {
            feed,
            rx,
            search,
            store,
        }
    }

    /// Harness whose store already has `saved` with `active` selected.
    async fn seeded(search: StubSearch, mode: SelectionMode, saved: &[&str], active: &[&str]) -> Harness {
        let h = harness(search, mode).await;
        let saved: Vec<Topic> = saved.iter().map(|t| topic(t)).collect();
        let active: Vec<Topic> = active.iter().map(|t| topic(t)).collect();
        h.store
            .update(move |s| {
                s.topic_list = saved;
                s.current_topics = active;
            })
            .await
            .unwrap();
        h
    }

    impl Harness {
        async fn step(&mut self) -> Option<String> {
            let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
                .await
                .expect("timed out waiting for feed event")
                .expect("event channel closed");
            self.feed.handle(event)
        }

        async fn step_until(&mut self, done: impl Fn(&TopicFeed<StubSearch>) -> bool) {
            while !done(&self.feed) {
                self.step().await;
            }
        }

        /// Apply events until no fetch is in flight.
        async fn settle(&mut self) {
            while self.feed.state().loading {
                self.step().await;
            }
        }

        /// True if no event arrives within a short window.
        async fn quiet(&mut self) -> bool {
            tokio::time::timeout(Duration::from_millis(100), self.rx.recv())
                .await
                .is_err()
        }

        /// Start the watcher and apply its two initial emissions.
        async fn start(&mut self) {
            self.feed.start();
            self.step().await;
            self.step().await;
        }

        async fn start_and_load(&mut self) {
            self.start().await;
            self.settle().await;
        }
    }

    fn names(items: &[Repository]) -> Vec<String> {
        items.iter().map(|r| r.full_name.clone()).collect()
    }

    // ------------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_two_pages_accumulate_in_order() {
        let search = StubSearch::default()
            .with_page(1, Ok(repos(0..30)))
            .with_page(2, Ok(repos(30..60)));
        let mut h = seeded(search, SelectionMode::Multi, &["rust"], &["rust"]).await;

        h.start_and_load().await;
        assert_eq!(h.feed.state().page, 1);
        assert_eq!(h.feed.items().len(), 30);

        h.feed.load_more();
        h.settle().await;

        assert_eq!(h.feed.state().page, 2);
        assert_eq!(h.feed.items().len(), 60);
        assert_eq!(names(&h.feed.items()[..30]), names(&repos(0..30)));
        assert_eq!(names(&h.feed.items()[30..]), names(&repos(30..60)));
        assert_eq!(
            h.search.calls(),
            vec![(1, vec![topic("rust")]), (2, vec![topic("rust")])]
        );
    }

    #[tokio::test]
    async fn test_first_page_failure_leaves_empty_feed() {
        let search = StubSearch::default().with_page(1, Err(500));
        let mut h = seeded(search, SelectionMode::Multi, &["rust"], &["rust"]).await;

        h.start_and_load().await;

        assert_eq!(h.feed.state().page, 1);
        assert!(h.feed.items().is_empty());
        assert!(!h.feed.state().loading);
    }

    #[tokio::test]
    async fn test_failed_load_more_keeps_items_and_page() {
        let search = StubSearch::default()
            .with_page(1, Ok(repos(0..3)))
            .with_page(2, Err(502));
        let mut h = seeded(search, SelectionMode::Multi, &["rust"], &["rust"]).await;
        h.start_and_load().await;

        h.feed.load_more();
        h.settle().await;

        assert_eq!(h.feed.state().page, 2);
        assert_eq!(names(h.feed.items()), names(&repos(0..3)));
    }

    #[tokio::test]
    async fn test_refresh_resets_to_first_page() {
        let search = StubSearch::default()
            .with_page(1, Ok(repos(0..5)))
            .with_page(2, Ok(repos(5..10)));
        let mut h = seeded(search, SelectionMode::Multi, &["rust"], &["rust"]).await;
        h.start_and_load().await;
        h.feed.load_more();
        h.settle().await;
        assert_eq!(h.feed.items().len(), 10);

        h.feed.refresh();
        assert!(h.feed.items().is_empty());
        assert!(h.feed.state().loading);
        h.settle().await;

        assert_eq!(h.feed.state().page, 1);
        assert_eq!(names(h.feed.items()), names(&repos(0..5)));
    }

    #[tokio::test]
    async fn test_load_more_during_load_is_not_blocked() {
        let gate = Arc::new(Semaphore::new(0));
        let search = StubSearch::default()
            .with_page(1, Ok(repos(0..2)))
            .with_page(2, Ok(repos(2..4)))
            .gated(gate.clone());
        let mut h = seeded(search, SelectionMode::Multi, &["rust"], &["rust"]).await;
        h.start().await;

        h.feed.load_more();
        assert_eq!(h.feed.state().page, 2);
        assert!(h.feed.state().loading);

        gate.add_permits(2);
        h.settle().await;
        assert_eq!(h.feed.items().len(), 4);
        assert!(!h.feed.state().loading);
    }

    #[tokio::test]
    async fn test_stale_load_more_discarded_after_refresh() {
        let gate = Arc::new(Semaphore::new(0));
        let search = StubSearch::default()
            .with_page(1, Ok(repos(0..2)))
            .with_page(2, Ok(repos(100..102)))
            .gated(gate.clone());
        let mut h = seeded(search, SelectionMode::Multi, &["rust"], &["rust"]).await;
        h.start().await;
        gate.add_permits(1);
        h.settle().await;

        // Page 2 is requested but still blocked when the refresh happens
        h.feed.load_more();
        let stale_generation = h.feed.generation;
        h.feed.refresh();

        gate.add_permits(2);
        h.settle().await;
        assert_eq!(names(h.feed.items()), names(&repos(0..2)));

        // A late result from before the refresh is ignored outright
        h.feed
            .apply_page(stale_generation, 2, Ok(repos(100..102)));
        assert_eq!(h.feed.state().page, 1);
        assert_eq!(names(h.feed.items()), names(&repos(0..2)));
    }

    #[tokio::test]
    async fn test_load_more_without_active_topics_is_noop() {
        let mut h = harness(StubSearch::default(), SelectionMode::Multi).await;
        h.feed.load_more();
        assert_eq!(h.feed.state().page, 1);
        assert!(h.search.calls().is_empty());
    }

    #[tokio::test]
    async fn test_page_task_panic_is_reported() {
        let search = StubSearch {
            panic_on_page: Some(1),
            ..Default::default()
        };
        let mut h = seeded(search, SelectionMode::Multi, &["rust"], &["rust"]).await;
        h.start().await;

        let notice = h.step().await;
        assert!(notice.unwrap().contains("stub exploded"));
        assert!(!h.feed.state().loading);
    }

    // ------------------------------------------------------------------------
    // Active topic changes
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_one_refresh_per_distinct_active_change() {
        let mut h = seeded(StubSearch::default(), SelectionMode::Multi, &["rust", "cli"], &[]).await;
        h.start().await;
        assert!(h.feed.active().is_none());
        assert!(h.quiet().await);
        assert!(h.search.calls().is_empty());

        h.feed.select_topic(&topic("rust")).await.unwrap();
        h.step_until(|f| f.active().is_some()).await;
        h.settle().await;
        assert_eq!(h.search.calls().len(), 1);

        // Same selection again: nothing is written, nothing is fetched
        h.feed.select_topic(&topic("rust")).await.unwrap();
        assert!(h.quiet().await);
        assert_eq!(h.search.calls().len(), 1);

        h.feed.toggle_topic(&topic("cli")).await.unwrap();
        h.step_until(|f| f.active().is_some_and(|a| a.tags().len() == 2))
            .await;
        h.settle().await;
        assert_eq!(
            h.search.calls().last().unwrap(),
            &(1, vec![topic("rust"), topic("cli")])
        );
        assert_eq!(h.search.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_equal_active_value_does_not_refresh() {
        let mut h = harness(StubSearch::default(), SelectionMode::Multi).await;
        let active = Some(ActiveTopics::Multi(vec![topic("rust")]));

        h.feed.apply_active(active.clone());
        h.feed.apply_active(active);
        h.settle().await;

        assert_eq!(h.search.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_saved_list_change_does_not_refresh() {
        let mut h = seeded(StubSearch::default(), SelectionMode::Multi, &["rust"], &["rust"]).await;
        h.start_and_load().await;

        h.feed.add_topic("go").await.unwrap();
        h.step_until(|f| f.saved_topics().len() == 2).await;

        assert!(h.quiet().await);
        assert_eq!(h.search.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_selection_does_not_fetch() {
        let search = StubSearch::default().with_page(1, Ok(repos(0..3)));
        let mut h = seeded(search, SelectionMode::Multi, &["rust"], &["rust"]).await;
        h.start_and_load().await;

        h.feed.toggle_topic(&topic("rust")).await.unwrap();
        h.step_until(|f| f.active().is_none()).await;

        assert!(h.quiet().await);
        assert_eq!(h.search.calls().len(), 1);
        assert_eq!(h.feed.items().len(), 3);
    }

    #[tokio::test]
    async fn test_single_mode_toggle_selects() {
        let mut h = seeded(StubSearch::default(), SelectionMode::Single, &["rust", "cli"], &["rust"]).await;
        h.start_and_load().await;

        h.feed.toggle_topic(&topic("cli")).await.unwrap();
        h.step_until(|f| f.active() == Some(&ActiveTopics::Single(topic("cli"))))
            .await;
        h.settle().await;

        assert_eq!(h.store.snapshot().current_topics, vec![topic("cli")]);
        assert_eq!(h.search.calls().last().unwrap().1, vec![topic("cli")]);
    }

    // ------------------------------------------------------------------------
    // Topic edits
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_add_topic_rejections() {
        let h = harness(StubSearch::default(), SelectionMode::Multi).await;
        assert_eq!(h.feed.add_topic(" rust ").await.unwrap(), topic("rust"));
        assert!(matches!(h.feed.add_topic("   ").await, Err(TopicError::Empty)));
        assert!(matches!(
            h.feed.add_topic("rust").await,
            Err(TopicError::Duplicate(t)) if t == "rust"
        ));
        assert!(matches!(
            h.feed.add_topic("rust sort:stars-asc").await,
            Err(TopicError::Invalid(_))
        ));
        assert_eq!(h.store.snapshot().topic_list, vec![topic("rust")]);
    }

    #[tokio::test]
    async fn test_remove_then_add_round_trips() {
        let h = seeded(StubSearch::default(), SelectionMode::Multi, &["rust", "cli"], &[]).await;

        assert!(h.feed.remove_topic(&topic("rust")).await.unwrap());
        assert_eq!(h.store.snapshot().topic_list, vec![topic("cli")]);

        h.feed.add_topic("rust").await.unwrap();
        assert!(h.store.snapshot().topic_list.contains(&topic("rust")));
    }

    #[tokio::test]
    async fn test_remove_active_topic_keeps_selection() {
        let h = seeded(StubSearch::default(), SelectionMode::Multi, &["rust"], &["rust"]).await;

        h.feed.remove_topic(&topic("rust")).await.unwrap();

        let settings = h.store.snapshot();
        assert!(settings.topic_list.is_empty());
        assert_eq!(settings.current_topics, vec![topic("rust")]);
    }

    #[tokio::test]
    async fn test_remove_missing_topic_reports_false() {
        let h = harness(StubSearch::default(), SelectionMode::Multi).await;
        assert!(!h.feed.remove_topic(&topic("nope")).await.unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_add_topic_keeps_ordered_set(inputs in prop::collection::vec("[ ab]{0,3}", 0..12)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let h = harness(StubSearch::default(), SelectionMode::Multi).await;
                let mut model: Vec<String> = Vec::new();

                for raw in &inputs {
                    let result = h.feed.add_topic(raw).await;
                    let trimmed = raw.trim();
                    if trimmed.is_empty() {
                        assert!(matches!(result, Err(TopicError::Empty)));
                    } else if model.iter().any(|t| t == trimmed) {
                        assert!(matches!(result, Err(TopicError::Duplicate(_))));
                    } else {
                        assert_eq!(result.unwrap().as_str(), trimmed);
                        model.push(trimmed.to_string());
                    }
                }

                let saved: Vec<String> = h
                    .store
                    .snapshot()
                    .topic_list
                    .iter()
                    .map(Topic::to_string)
                    .collect();
                assert_eq!(saved, model);
            });
        }
    }

    // ------------------------------------------------------------------------
    // Detail
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_open_detail_loads_readme() {
        let search = StubSearch::default().with_readme(Ok("# Hello".to_string()));
        let mut h = harness(search, SelectionMode::Multi).await;

        let token = encode_repository(&repo(7)).unwrap();
        h.feed.open_detail(&token).unwrap();
        assert!(h.feed.detail().unwrap().is_loading());

        h.step().await;
        let detail = h.feed.detail().unwrap();
        assert_eq!(detail.repo.full_name, "o/r7");
        assert_eq!(detail.readme, ReadmeState::Loaded("# Hello".to_string()));
        assert!(!detail.show_error);
    }

    #[tokio::test]
    async fn test_readme_failure_is_dismissible() {
        let search = StubSearch::default().with_readme(Err(404));
        let mut h = harness(search, SelectionMode::Multi).await;

        h.feed
            .open_detail(&encode_repository(&repo(1)).unwrap())
            .unwrap();
        h.step().await;

        let detail = h.feed.detail().unwrap();
        assert!(matches!(detail.readme, ReadmeState::Failed(_)));
        assert!(detail.show_error);

        h.feed.dismiss_error();
        assert!(!h.feed.detail().unwrap().show_error);
    }

    #[tokio::test]
    async fn test_stale_readme_ignored() {
        let mut h = harness(StubSearch::default(), SelectionMode::Multi).await;
        h.feed
            .open_detail(&encode_repository(&repo(1)).unwrap())
            .unwrap();
        let stale = h.feed.readme_generation;
        h.feed
            .open_detail(&encode_repository(&repo(2)).unwrap())
            .unwrap();

        h.feed.apply_readme(stale, "o/r1", Ok("old".to_string()));
        let detail = h.feed.detail().unwrap();
        assert_eq!(detail.repo.full_name, "o/r2");
        assert!(detail.is_loading());
    }

    #[tokio::test]
    async fn test_close_detail() {
        let mut h = harness(StubSearch::default(), SelectionMode::Multi).await;
        h.feed
            .open_detail(&encode_repository(&repo(1)).unwrap())
            .unwrap();
        h.feed.close_detail();
        assert!(h.feed.detail().is_none());
    }

    #[tokio::test]
    async fn test_open_detail_rejects_bad_token() {
        let mut h = harness(StubSearch::default(), SelectionMode::Multi).await;
        assert!(h.feed.open_detail("%%%").is_err());
        assert!(h.feed.detail().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_discards_late_pages() {
        let gate = Arc::new(Semaphore::new(0));
        let search = StubSearch::default()
            .with_page(1, Ok(repos(0..2)))
            .gated(gate.clone());
        let mut h = harness(search, SelectionMode::Multi).await;
        h.feed
            .apply_active(Some(ActiveTopics::Multi(vec![topic("rust")])));
        let generation = h.feed.generation;

        h.feed.shutdown();
        assert!(!h.feed.state().loading);

        h.feed.apply_page(generation, 1, Ok(repos(0..2)));
        assert!(h.feed.items().is_empty());
    }
}
