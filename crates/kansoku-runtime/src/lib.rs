//! Drives the player monitor and session engine from host input.
//!
//! The host owns the page mirror and feeds [`HostInput`]s in; the runtime
//! binds to the player and reduces everything into [`ActivityEvent`]s on the
//! output channel. Catalog configuration is requested alongside, and
//! enrichment starts once it arrives.

use std::sync::Arc;

use kansoku_api::{CatalogClient, CatalogService, PageConfiguration, Transport};
use kansoku_core::{
    enrich, shared_activity_log, ActivityEvent, AppConfig, KansokuError, MediaEvent, MediaItem,
    MonitorEvent, PageContext, PlayerMonitor, SessionEngine, SessionState, SharedActivityLog,
};
use kansoku_dom::{lock, wait_for_selector, Dom, DomError, SharedDom};
use kansoku_parse::PageIdentifier;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Capacity of the channel spawned enrichments report back on.
const ENRICHMENT_CHANNEL_SIZE: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Kansoku(#[from] KansokuError),
    #[error("host stopped receiving events")]
    OutputClosed,
}

/// What the host tells the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum HostInput {
    /// The host applied edits to the shared page; its mutation records are
    /// ready to be taken.
    DomChanged,
    Media(MediaEvent),
    Navigated(String),
    /// The user clicked play on a title outside the player.
    PlayClicked(PageIdentifier),
    Shutdown,
}

type Connect<C> = Box<dyn Fn(PageConfiguration) -> C + Send + Sync>;
type EnrichmentResult = (u64, Result<MediaItem, KansokuError>);

pub struct Runtime<D, T, C = CatalogClient> {
    config: AppConfig,
    dom: SharedDom<D>,
    transport: T,
    connect: Connect<C>,
    log: SharedActivityLog,
}

impl<D, T> Runtime<D, T, CatalogClient>
where
    D: Dom + Send + 'static,
    T: Transport,
{
    /// A runtime that enriches through the HTTP catalog client.
    pub fn new(config: AppConfig, dom: SharedDom<D>, transport: T) -> Self {
        let base_url = config.catalog.base_url.clone();
        Self::with_catalog(config, dom, transport, move |configuration| {
            CatalogClient::new(base_url.clone(), configuration)
        })
    }
}

impl<D, T, C> Runtime<D, T, C>
where
    D: Dom + Send + 'static,
    T: Transport,
    C: CatalogService + 'static,
{
    /// A runtime whose catalog is built by `connect` once the page
    /// configuration is known.
    pub fn with_catalog(
        config: AppConfig,
        dom: SharedDom<D>,
        transport: T,
        connect: impl Fn(PageConfiguration) -> C + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            dom,
            transport,
            connect: Box::new(connect),
            log: shared_activity_log(),
        }
    }

    /// Handle to the log of emitted events.
    pub fn activity_log(&self) -> SharedActivityLog {
        Arc::clone(&self.log)
    }

    /// Run until cancelled, shut down, or the input channel closes.
    ///
    /// Fails if the player never appears within the bind policy, or if the
    /// host drops the output channel.
    #[tracing::instrument(name = "runtime", skip_all)]
    pub async fn run(
        self,
        mut inputs: mpsc::Receiver<HostInput>,
        events: mpsc::Sender<ActivityEvent>,
        cancel: CancellationToken,
    ) -> Result<(), RuntimeError> {
        let (enrich_tx, mut enrich_rx) = mpsc::channel(ENRICHMENT_CHANNEL_SIZE);
        let mut driver = Driver {
            dom: Arc::clone(&self.dom),
            monitor: PlayerMonitor::new(&self.config.selectors, &self.config.monitor)?,
            engine: SessionEngine::new(self.config.session, self.config.page.pattern_set()),
            page: PageContext::default(),
            catalog: None,
            enrich_tx,
            events,
            log: Arc::clone(&self.log),
        };

        let bound = wait_for_selector(
            &self.dom,
            &self.config.selectors.player,
            &self.config.monitor.bind,
            &cancel,
        )
        .await;
        match bound {
            Ok(player) => tracing::info!(?player, "Bound to player"),
            Err(DomError::Cancelled { .. }) => {
                tracing::debug!("Cancelled before the player appeared");
                return Ok(());
            }
            Err(e) => {
                let e = KansokuError::from(e);
                tracing::error!(error = %e, "Unable to bind to the player");
                return Err(e.into());
            }
        }

        driver.bind(Instant::now()).await?;

        let connecting = self.connect_catalog();
        tokio::pin!(connecting);
        let mut connected = false;

        loop {
            let deadline = driver.deadline();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                input = inputs.recv() => match input {
                    Some(HostInput::Shutdown) | None => break,
                    Some(input) => driver.handle_input(input).await?,
                },
                Some((key, result)) = enrich_rx.recv() => {
                    driver.finish_enrichment(key, result).await?;
                }
                catalog = &mut connecting, if !connected => {
                    connected = true;
                    driver.connected(catalog);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() => {
                    driver.poll(Instant::now()).await?;
                }
            }
        }

        tracing::info!("Runtime stopped");
        Ok(())
    }

    /// Ask the page for catalog configuration. Any failure disables
    /// enrichment until the next page load.
    async fn connect_catalog(&self) -> Option<Arc<C>> {
        if !self.config.catalog.enabled {
            tracing::debug!("Catalog disabled");
            return None;
        }

        let timeout = self.config.transport.timeout();
        let result =
            match tokio::time::timeout(timeout, self.transport.request_configuration()).await {
                Ok(Ok(configuration)) => Ok(configuration),
                Ok(Err(e)) => Err(KansokuError::from(e)),
                Err(_) => Err(KansokuError::TransportTimeout(timeout)),
            };

        match result {
            Ok(configuration) => {
                tracing::debug!(
                    marketplace = %configuration.marketplace_id,
                    "Page configuration received"
                );
                Some(Arc::new((self.connect)(configuration)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Enrichment disabled for this page");
                None
            }
        }
    }
}

/// Everything the event loop mutates.
struct Driver<D, C> {
    dom: SharedDom<D>,
    monitor: PlayerMonitor,
    engine: SessionEngine,
    page: PageContext,
    catalog: Option<Arc<C>>,
    enrich_tx: mpsc::Sender<EnrichmentResult>,
    events: mpsc::Sender<ActivityEvent>,
    log: SharedActivityLog,
}

impl<D, C> Driver<D, C>
where
    D: Dom + Send + 'static,
    C: CatalogService + 'static,
{
    fn deadline(&self) -> Option<Instant> {
        [self.monitor.deadline(), self.engine.deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Install the catalog and enrich the session created while waiting.
    fn connected(&mut self, catalog: Option<Arc<C>>) {
        self.catalog = catalog;
        if let Some(session) = self.engine.session().filter(|s| s.state.is_active()) {
            self.spawn_enrichment(session.key, session.item.clone());
        }
    }

    /// Match the whole page once, dropping records made before the bind.
    async fn bind(&mut self, now: Instant) -> Result<(), RuntimeError> {
        let changes = {
            let mut page = lock(&self.dom);
            page.take_records();
            self.page.url = page.url();
            self.monitor.refresh(&*page, now)
        };
        self.dispatch(changes, now).await
    }

    async fn handle_input(&mut self, input: HostInput) -> Result<(), RuntimeError> {
        let now = Instant::now();
        let changes = match input {
            HostInput::DomChanged => {
                let mut page = lock(&self.dom);
                let records = page.take_records();
                if records.is_empty() {
                    return Ok(());
                }
                self.monitor.handle_mutations(&*page, &records, now)
            }
            HostInput::Media(event) => {
                let page = lock(&self.dom);
                self.monitor.handle_media(&*page, &event)
            }
            HostInput::Navigated(url) => {
                tracing::debug!(%url, "Navigated");
                self.page.url = url;
                return Ok(());
            }
            HostInput::PlayClicked(id) => {
                tracing::debug!(%id, "Play clicked");
                self.page.last_clicked = Some(id);
                return Ok(());
            }
            HostInput::Shutdown => return Ok(()),
        };
        self.dispatch(changes, now).await
    }

    /// Fire whichever component deadlines have passed.
    async fn poll(&mut self, now: Instant) -> Result<(), RuntimeError> {
        let changes = {
            let page = lock(&self.dom);
            self.monitor.poll(&*page, now)
        };
        self.dispatch(changes, now).await?;

        for activity in self.engine.poll(now) {
            self.emit(activity).await?;
        }
        Ok(())
    }

    async fn dispatch(
        &mut self,
        changes: Vec<MonitorEvent>,
        now: Instant,
    ) -> Result<(), RuntimeError> {
        for change in changes {
            for activity in self.engine.handle(change, &self.page, now) {
                self.emit(activity).await?;
            }
            if let Some(session) = self.engine.session() {
                if session.state == SessionState::Ended {
                    self.monitor.release(&session.identity);
                }
            }
        }
        Ok(())
    }

    async fn finish_enrichment(
        &mut self,
        key: u64,
        result: Result<MediaItem, KansokuError>,
    ) -> Result<(), RuntimeError> {
        match result {
            Ok(item) => {
                if let Some(activity) = self.engine.apply_enrichment(key, &item) {
                    self.emit(activity).await?;
                }
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Enrichment failed, keeping the page's item");
            }
        }
        Ok(())
    }

    async fn emit(&mut self, activity: ActivityEvent) -> Result<(), RuntimeError> {
        if let ActivityEvent::Created(snapshot) = &activity {
            self.spawn_enrichment(snapshot.key, snapshot.item.clone());
        }

        tracing::trace!(event = activity.name(), "Emitting");
        self.log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(activity.clone());
        self.events
            .send(activity)
            .await
            .map_err(|_| RuntimeError::OutputClosed)
    }

    fn spawn_enrichment(&self, key: u64, item: MediaItem) {
        let Some(catalog) = &self.catalog else {
            tracing::trace!(key, "Enrichment disabled");
            return;
        };
        let catalog = Arc::clone(catalog);
        let tx = self.enrich_tx.clone();

        tokio::spawn(async move {
            let result = enrich(catalog.as_ref(), &item).await;
            if tx.send((key, result)).await.is_err() {
                tracing::trace!(key, "Runtime gone, dropping enrichment");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use kansoku_api::{CatalogTitle, ContentType, Runtime as TitleRuntime, TransportError};
    use kansoku_core::MediaEventKind;
    use kansoku_dom::{Document, NodeId};

    use super::*;

    enum StubTransport {
        Ready,
        /// Answers after the given delay.
        Slow(Duration),
        Silent,
    }

    fn configuration() -> PageConfiguration {
        PageConfiguration {
            device_id: "device".into(),
            device_type_id: PageConfiguration::HTML5_DEVICE_TYPE.into(),
            firmware: 1,
            marketplace_id: "ATVPDKIKX0DER".into(),
            customer_id: "customer".into(),
            token: "token".into(),
        }
    }

    impl Transport for StubTransport {
        async fn request_configuration(&self) -> Result<PageConfiguration, TransportError> {
            match self {
                Self::Ready => Ok(configuration()),
                Self::Slow(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(configuration())
                }
                Self::Silent => std::future::pending().await,
            }
        }
    }

    /// Catalog that knows one movie, or nothing at all.
    struct StubCatalog {
        movie: Option<CatalogTitle>,
    }

    impl StubCatalog {
        fn offline() -> Self {
            Self { movie: None }
        }

        fn manchester() -> Self {
            Self {
                movie: Some(CatalogTitle {
                    title_id: "B0MOVIE001".into(),
                    title: "Manchester by the Sea".into(),
                    number: None,
                    content_type: ContentType::Movie,
                    runtime: Some(TitleRuntime {
                        value_millis: 8_220_000,
                    }),
                    release_or_first_airing_date: None,
                    ancestor_titles: Vec::new(),
                }),
            }
        }
    }

    impl CatalogService for StubCatalog {
        type Error = TransportError;

        async fn get_titles(&self, _ids: &[String]) -> Result<Vec<CatalogTitle>, TransportError> {
            match &self.movie {
                Some(movie) => Ok(vec![movie.clone()]),
                None => Err(TransportError::Unavailable("offline".into())),
            }
        }

        async fn get_show_seasons(&self, _id: &str) -> Result<Vec<CatalogTitle>, TransportError> {
            Ok(Vec::new())
        }

        async fn get_season_episodes(
            &self,
            _id: &str,
        ) -> Result<Vec<CatalogTitle>, TransportError> {
            Ok(Vec::new())
        }
    }

    /// A fullscreen player showing `title`, with a ready video element.
    fn player_page(
        url: &str,
        title: &str,
        subtitle: Option<&str>,
    ) -> (SharedDom<Document>, NodeId) {
        let mut doc = Document::new(url);
        let body = doc.body();
        let player = doc
            .append_element(
                body,
                "div",
                &[("id", "dv-web-player"), ("class", "dv-player-fullscreen")],
            )
            .unwrap();
        let web = doc
            .append_element(player, "div", &[("class", "webPlayerContainer")])
            .unwrap();
        let element = doc
            .append_element(web, "div", &[("class", "webPlayerElement")])
            .unwrap();
        let container = doc
            .append_element(element, "div", &[("class", "cascadesContainer")])
            .unwrap();
        let controls = doc
            .append_element(container, "div", &[("class", "controlsOverlay")])
            .unwrap();
        let info = doc
            .append_element(controls, "div", &[("class", "contentTitlePanel")])
            .unwrap();
        let heading = doc.append_element(info, "h1", &[("class", "title")]).unwrap();
        doc.set_text(heading, title).unwrap();
        if let Some(subtitle) = subtitle {
            let node = doc
                .append_element(info, "h2", &[("class", "subtitle")])
                .unwrap();
            doc.set_text(node, subtitle).unwrap();
        }
        let renderer = doc
            .append_element(container, "div", &[("class", "rendererContainer")])
            .unwrap();
        let video = doc.append_element(renderer, "video", &[]).unwrap();
        doc.media_mut(video).unwrap().ready_state = 4;

        (Arc::new(Mutex::new(doc)), video)
    }

    fn grand_tour_page() -> (SharedDom<Document>, NodeId) {
        player_page(
            "https://www.amazon.com/dp/B00ABCDEF1",
            "The Grand Tour",
            Some("Season 1, Ep. 1 The Holy Trinity"),
        )
    }

    struct Host {
        inputs: mpsc::Sender<HostInput>,
        events: mpsc::Receiver<ActivityEvent>,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<Result<(), RuntimeError>>,
    }

    impl Host {
        fn start<T: Transport + 'static>(runtime: Runtime<Document, T, StubCatalog>) -> Self {
            let (inputs, input_rx) = mpsc::channel(16);
            let (event_tx, events) = mpsc::channel(64);
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(runtime.run(input_rx, event_tx, cancel.clone()));
            Self {
                inputs,
                events,
                cancel,
                handle,
            }
        }

        async fn next(&mut self) -> ActivityEvent {
            self.events.recv().await.unwrap()
        }

        async fn stop(self) -> Result<(), RuntimeError> {
            self.cancel.cancel();
            self.handle.await.unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_episode_session_end_to_end() {
        let (dom, video) = grand_tour_page();
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Ready,
            |_| StubCatalog::offline(),
        );
        let log = runtime.activity_log();
        let mut host = Host::start(runtime);

        assert_eq!(host.next().await, ActivityEvent::Opened(None));

        let ActivityEvent::Created(created) = host.next().await else {
            panic!("expected created");
        };
        assert_eq!(created.key, 0);
        let MediaItem::Episode(episode) = &created.item else {
            panic!("expected episode");
        };
        assert_eq!(episode.title, "The Holy Trinity");
        assert_eq!(episode.number, 1);
        assert_eq!(episode.season.number, 1);
        assert_eq!(episode.season.show.title, "The Grand Tour");
        assert_eq!(
            episode.season.keys.page_id.as_ref().map(|id| id.as_str()),
            Some("B00ABCDEF1")
        );

        host.inputs
            .send(HostInput::Media(MediaEvent {
                node: video,
                kind: MediaEventKind::Playing,
            }))
            .await
            .unwrap();
        let ActivityEvent::Started(started) = host.next().await else {
            panic!("expected started");
        };
        assert_eq!(started.state, SessionState::Playing);
        // The catalog failed; the item is what the page said.
        assert_eq!(started.item, created.item);

        assert_eq!(log.lock().unwrap().len(), 3);
        assert!(host.stop().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrichment_refines_session() {
        let (dom, _) = player_page(
            "https://www.amazon.com/dp/B00ABCDEF1",
            "Manchester By The Sea",
            None,
        );
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Ready,
            |_| StubCatalog::manchester(),
        );
        let mut host = Host::start(runtime);

        assert_eq!(host.next().await.name(), "opened");
        assert_eq!(host.next().await.name(), "created");

        let ActivityEvent::Enriched(enriched) = host.next().await else {
            panic!("expected enriched");
        };
        let MediaItem::Movie(movie) = &enriched.item else {
            panic!("expected movie");
        };
        assert_eq!(movie.keys.catalog_id.as_deref(), Some("B0MOVIE001"));
        assert_eq!(movie.title, "Manchester by the Sea");
        assert_eq!(enriched.duration_ms, Some(8_220_000));
        assert_eq!(enriched.state, SessionState::Loading);

        host.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_timeout_disables_enrichment() {
        let (dom, _) = grand_tour_page();
        let connects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connects);
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Silent,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                StubCatalog::manchester()
            },
        );
        let start = Instant::now();
        let mut host = Host::start(runtime);

        // Tracking doesn't wait on the transport.
        assert_eq!(host.next().await.name(), "opened");
        assert_eq!(host.next().await.name(), "created");
        assert!(start.elapsed() < Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(connects.load(Ordering::SeqCst), 0);
        assert!(host.events.try_recv().is_err());

        host.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_configuration_enriches_current_session() {
        let (dom, _) = player_page(
            "https://www.amazon.com/dp/B00ABCDEF1",
            "Manchester By The Sea",
            None,
        );
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Slow(Duration::from_secs(6)),
            |_| StubCatalog::manchester(),
        );
        let start = Instant::now();
        let mut host = Host::start(runtime);

        assert_eq!(host.next().await.name(), "opened");
        let ActivityEvent::Created(created) = host.next().await else {
            panic!("expected created");
        };
        assert!(start.elapsed() < Duration::from_secs(6));

        let ActivityEvent::Enriched(enriched) = host.next().await else {
            panic!("expected enriched");
        };
        assert!(start.elapsed() >= Duration::from_secs(6));
        assert_eq!(enriched.key, created.key);
        let MediaItem::Movie(movie) = &enriched.item else {
            panic!("expected movie");
        };
        assert_eq!(movie.keys.catalog_id.as_deref(), Some("B0MOVIE001"));

        host.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_after_end_creates_new_session() {
        let (dom, video) = player_page(
            "https://www.amazon.com/dp/B00ABCDEF1",
            "Manchester by the Sea",
            None,
        );
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Ready,
            |_| StubCatalog::offline(),
        );
        let log = runtime.activity_log();
        let mut host = Host::start(runtime);
        assert_eq!(host.next().await.name(), "opened");
        assert_eq!(host.next().await.name(), "created");

        let kinds = [
            MediaEventKind::Playing,
            MediaEventKind::Ended,
            MediaEventKind::LoadStart,
            MediaEventKind::LoadedMetadata,
            MediaEventKind::Playing,
        ];
        for kind in kinds {
            host.inputs
                .send(HostInput::Media(MediaEvent { node: video, kind }))
                .await
                .unwrap();
        }

        let mut names = Vec::new();
        let mut last = None;
        for _ in 0..4 {
            let event = host.next().await;
            names.push(event.name());
            last = event.snapshot().cloned();
        }
        assert_eq!(names, vec!["started", "ended", "created", "started"]);
        let last = last.unwrap();
        assert_eq!(last.key, 1);
        assert_eq!(last.state, SessionState::Playing);
        assert_eq!(log.lock().unwrap().len(), 6);

        host.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_click_supplies_identifier() {
        let (dom, _) = player_page(
            "https://www.amazon.com/gp/video/storefront",
            "Manchester by the Sea",
            None,
        );
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Ready,
            |_| StubCatalog::offline(),
        );
        let mut host = Host::start(runtime);
        host.inputs
            .send(HostInput::PlayClicked(PageIdentifier::new("B0CLICKED1").unwrap()))
            .await
            .unwrap();

        assert_eq!(host.next().await.name(), "opened");
        let ActivityEvent::Created(created) = host.next().await else {
            panic!("expected created");
        };
        assert_eq!(created.item.page_id().map(|id| id.as_str()), Some("B0CLICKED1"));

        host.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_player_fails_bind() {
        let dom = Arc::new(Mutex::new(Document::new(
            "https://www.amazon.com/dp/B00ABCDEF1",
        )));
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Ready,
            |_| StubCatalog::offline(),
        );
        let (_inputs, input_rx) = mpsc::channel(1);
        let (event_tx, _events) = mpsc::channel(1);

        let err = runtime
            .run(input_rx, event_tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Kansoku(KansokuError::NotFound { ref selector, .. })
                if selector == "#dv-web-player"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_bind() {
        let dom = Arc::new(Mutex::new(Document::new("https://www.amazon.com/")));
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Ready,
            |_| StubCatalog::offline(),
        );
        let (_inputs, input_rx) = mpsc::channel(1);
        let (event_tx, _events) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(runtime.run(input_rx, event_tx, cancel).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_input_stops() {
        let (dom, _) = grand_tour_page();
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Ready,
            |_| StubCatalog::offline(),
        );
        let mut host = Host::start(runtime);
        assert_eq!(host.next().await.name(), "opened");

        host.inputs.send(HostInput::Shutdown).await.unwrap();
        assert!(host.handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_output_is_an_error() {
        let (dom, _) = grand_tour_page();
        let runtime = Runtime::with_catalog(
            AppConfig::default(),
            dom,
            StubTransport::Ready,
            |_| StubCatalog::offline(),
        );
        let (_inputs, input_rx) = mpsc::channel(1);
        let (event_tx, events) = mpsc::channel(1);
        drop(events);

        let err = runtime
            .run(input_rx, event_tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::OutputClosed));
    }

    #[test]
    fn test_host_input_json() {
        let input: HostInput =
            serde_json::from_str(r#"{"type":"media","data":{"node":7,"kind":"timeupdate"}}"#)
                .unwrap();
        assert_eq!(
            input,
            HostInput::Media(MediaEvent {
                node: NodeId(7),
                kind: MediaEventKind::TimeUpdate,
            })
        );

        let input: HostInput = serde_json::from_str(r#"{"type":"dom_changed"}"#).unwrap();
        assert_eq!(input, HostInput::DomChanged);
    }
}
