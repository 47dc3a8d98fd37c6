use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use restock_core::{ProductCatalog, ProductInfo, Proxy};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::Instant;

use super::*;
use crate::alert::WebhookMessage;
use crate::error::{AuthError, FetchError, NotifyError};

const SKU: &str = "42004";
const FOUND: &str = "Restock monitor found an item in stock!";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Open(String),
    Fetch(u32),
}

/// Replays scripted session and fetch outcomes. Once the fetch script runs
/// out it requests shutdown so `run` returns.
struct FakeStorefront {
    opens: Mutex<VecDeque<Result<(), AuthError>>>,
    fetches: Mutex<VecDeque<Result<StockSnapshot, FetchError>>>,
    log: Mutex<Vec<(Instant, Event)>>,
    sessions: Mutex<u32>,
    shutdown: watch::Sender<bool>,
}

impl FakeStorefront {
    fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
    }

    fn fetch_times(&self) -> Vec<Instant> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e)| matches!(e, Event::Fetch(_)))
            .map(|(t, _)| *t)
            .collect()
    }

    fn open_times(&self) -> Vec<Instant> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e)| matches!(e, Event::Open(_)))
            .map(|(t, _)| *t)
            .collect()
    }

    fn open_count(&self) -> usize {
        self.open_times().len()
    }
}

impl Storefront for FakeStorefront {
    type Session = u32;

    async fn open_session(&self, proxy: Proxy) -> Result<u32, AuthError> {
        self.log
            .lock()
            .unwrap()
            .push((Instant::now(), Event::Open(proxy.host)));
        let outcome = self.opens.lock().unwrap().pop_front().unwrap_or(Ok(()));
        outcome.map(|()| {
            let mut sessions = self.sessions.lock().unwrap();
            *sessions += 1;
            *sessions
        })
    }

    async fn fetch_availability(
        &self,
        session: &u32,
        sku: &str,
    ) -> Result<StockSnapshot, FetchError> {
        self.log
            .lock()
            .unwrap()
            .push((Instant::now(), Event::Fetch(*session)));
        let next = self.fetches.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            self.shutdown.send_replace(true);
            Err(FetchError::UnexpectedStatus {
                sku: sku.to_owned(),
                status: 599,
            })
        })
    }
}

#[derive(Default)]
struct FakeNotifier {
    responses: Mutex<VecDeque<Result<Duration, NotifyError>>>,
    sent: Mutex<Vec<WebhookMessage>>,
}

impl FakeNotifier {
    fn responding(responses: Vec<Result<Duration, NotifyError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            sent: Mutex::default(),
        }
    }

    fn sent(&self) -> Vec<WebhookMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for FakeNotifier {
    async fn send(&self, message: &WebhookMessage) -> Result<Duration, NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Duration::ZERO))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn snapshot(in_stock: bool) -> StockSnapshot {
    StockSnapshot {
        sku: SKU.to_owned(),
        in_stock,
        price: Decimal::from_str("59.99").unwrap(),
        stock_count: if in_stock { 4 } else { 0 },
    }
}

fn available() -> Result<StockSnapshot, FetchError> {
    Ok(snapshot(true))
}

fn unavailable() -> Result<StockSnapshot, FetchError> {
    Ok(snapshot(false))
}

fn session_rejected() -> Result<StockSnapshot, FetchError> {
    Err(FetchError::TransientParse {
        sku: SKU.to_owned(),
        reason: "HTTP 403".to_owned(),
    })
}

fn missing_cookie() -> Result<(), AuthError> {
    Err(AuthError::MissingCookie {
        url: "https://shop.example.com/".to_owned(),
    })
}

fn catalog() -> ProductCatalog {
    std::iter::once(ProductInfo {
        sku: SKU.to_owned(),
        display_name: "Darkness Ablaze Booster Box".to_owned(),
        link: "https://shop.example.com/darkness-ablaze".to_owned(),
        thumbnail_url: "https://cdn.example.com/42004.jpg".to_owned(),
    })
    .collect()
}

fn pool(n: usize) -> ProxyPool {
    let proxies = (0..n)
        .map(|i| Proxy::new(format!("10.0.0.{i}:8080"), "user", "pw"))
        .collect();
    ProxyPool::new(proxies).unwrap()
}

struct Harness {
    storefront: Arc<FakeStorefront>,
    notifier: Arc<FakeNotifier>,
    worker: MonitorWorker<FakeStorefront, FakeNotifier>,
    shutdown: watch::Receiver<bool>,
}

fn harness_with(
    settings: WorkerSettings,
    proxies: usize,
    opens: Vec<Result<(), AuthError>>,
    fetches: Vec<Result<StockSnapshot, FetchError>>,
    notifier: FakeNotifier,
) -> Harness {
    let (tx, rx) = watch::channel(false);
    let storefront = Arc::new(FakeStorefront {
        opens: Mutex::new(opens.into()),
        fetches: Mutex::new(fetches.into()),
        log: Mutex::default(),
        sessions: Mutex::new(0),
        shutdown: tx,
    });
    let notifier = Arc::new(notifier);
    let ctx = MonitorContext {
        storefront: Arc::clone(&storefront),
        notifier: Arc::clone(&notifier),
        pool: Arc::new(pool(proxies)),
        catalog: Arc::new(catalog()),
        settings,
    };
    Harness {
        storefront,
        notifier,
        worker: MonitorWorker::new(SKU, ctx),
        shutdown: rx,
    }
}

fn harness(fetches: Vec<Result<StockSnapshot, FetchError>>) -> Harness {
    harness_with(
        WorkerSettings::default(),
        2,
        vec![],
        fetches,
        FakeNotifier::default(),
    )
}

/// Whole seconds between consecutive instants.
fn gaps(times: &[Instant]) -> Vec<u64> {
    times.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect()
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

// ---------------------------------------------------------------------------
// WorkerState
// ---------------------------------------------------------------------------

#[test]
fn unavailable_snapshot_resets_any_hit_count() {
    for prior in 0..=2 {
        let mut state = WorkerState::new(SKU, secs(300));
        for _ in 0..prior {
            state.observe(&snapshot(true), 3);
        }
        assert_eq!(state.consecutive_hits(), prior);
        assert_eq!(state.observe(&snapshot(false), 3), Observation::Unavailable);
        assert_eq!(state.consecutive_hits(), 0, "after {prior} hits");
    }
}

#[test]
fn available_snapshots_count_up_to_cooldown() {
    let mut state = WorkerState::new(SKU, secs(300));
    assert_eq!(
        state.observe(&snapshot(true), 3),
        Observation::Available { hits: 1, cooldown: false }
    );
    assert_eq!(
        state.observe(&snapshot(true), 3),
        Observation::Available { hits: 2, cooldown: false }
    );
    assert_eq!(
        state.observe(&snapshot(true), 3),
        Observation::Available { hits: 3, cooldown: true }
    );
    state.finish_cooldown();
    assert_eq!(state.consecutive_hits(), 0);
}

#[test]
fn threshold_of_one_cools_down_on_first_hit() {
    let mut state = WorkerState::new(SKU, secs(300));
    assert_eq!(
        state.observe(&snapshot(true), 1),
        Observation::Available { hits: 1, cooldown: true }
    );
}

#[test]
fn retry_after_only_ever_lengthens_the_interval() {
    let mut state = WorkerState::new(SKU, secs(300));
    assert!(!state.apply_retry_after(Duration::ZERO));
    assert!(!state.apply_retry_after(secs(300)));
    assert_eq!(state.poll_interval(), secs(300));
    assert!(state.apply_retry_after(secs(600)));
    assert_eq!(state.poll_interval(), secs(600));
    assert!(!state.apply_retry_after(secs(450)));
    assert_eq!(state.poll_interval(), secs(600));

    state.reset_poll_interval(secs(300));
    assert_eq!(state.poll_interval(), secs(300));
}

// ---------------------------------------------------------------------------
// sleep_or_shutdown
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn sleep_completes_without_shutdown() {
    let (_tx, mut rx) = watch::channel(false);
    let start = Instant::now();
    assert!(!sleep_or_shutdown(secs(30), &mut rx).await);
    assert_eq!(start.elapsed().as_secs(), 30);
}

#[tokio::test(start_paused = true)]
async fn sleep_returns_immediately_when_already_shut_down() {
    let (_tx, mut rx) = watch::channel(true);
    let start = Instant::now();
    assert!(sleep_or_shutdown(secs(30), &mut rx).await);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn sleep_is_interrupted_by_shutdown() {
    let (tx, mut rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(secs(5)).await;
        tx.send_replace(true);
    });
    let start = Instant::now();
    assert!(sleep_or_shutdown(secs(3600), &mut rx).await);
    assert!(start.elapsed() < secs(3600));
}

#[tokio::test(start_paused = true)]
async fn dropped_sender_counts_as_shutdown() {
    let (tx, mut rx) = watch::channel(false);
    drop(tx);
    assert!(sleep_or_shutdown(secs(3600), &mut rx).await);
}

// ---------------------------------------------------------------------------
// MonitorWorker::run
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn alerts_once_after_product_becomes_available() {
    let mut h = harness(vec![unavailable(), unavailable(), available()]);
    h.worker.run(&mut h.shutdown).await;

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, FOUND);
    let description = &sent[0].embeds[0].description;
    assert!(description.contains("SKU: 42004"), "{description}");
    assert!(description.contains("$59.99"), "{description}");
    assert!(description.contains("Stock: 4"), "{description}");
    assert_eq!(h.worker.state().consecutive_hits(), 1);
    assert_eq!(h.storefront.open_count(), 1, "no cooldown expected");
    assert_eq!(
        gaps(&h.storefront.fetch_times())[..2],
        [300, 300]
    );
}

#[tokio::test(start_paused = true)]
async fn unavailable_poll_breaks_the_hit_streak() {
    let mut h = harness(vec![available(), available(), unavailable(), available()]);
    h.worker.run(&mut h.shutdown).await;

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|m| m.content == FOUND));
    assert_eq!(h.worker.state().consecutive_hits(), 1);
}

#[tokio::test(start_paused = true)]
async fn threshold_hits_trigger_cooldown_and_new_session() {
    let mut h = harness(vec![available(), available(), available(), available()]);
    h.worker.run(&mut h.shutdown).await;

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 4);
    assert!(sent[2].content.contains("going to sleep for 2 hours"));
    // Counter was reset by the cooldown, so the next sighting is hit one.
    assert_eq!(sent[3].content, FOUND);
    assert_eq!(h.worker.state().consecutive_hits(), 1);

    let fetch_gaps = gaps(&h.storefront.fetch_times());
    assert_eq!(fetch_gaps[0], 300);
    assert_eq!(fetch_gaps[1], 300);
    assert!(fetch_gaps[2] >= 7200, "cooldown gap {}", fetch_gaps[2]);

    let events = h.storefront.events();
    assert_eq!(events[0], Event::Open("10.0.0.0:8080".to_owned()));
    assert_eq!(events[4], Event::Open("10.0.0.1:8080".to_owned()));
    assert_eq!(events[5], Event::Fetch(2));
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_cooldown() {
    let mut h = harness(vec![available(), available(), available()]);
    let storefront = Arc::clone(&h.storefront);
    tokio::spawn(async move {
        tokio::time::sleep(secs(3600)).await;
        storefront.shutdown.send_replace(true);
    });

    let start = Instant::now();
    h.worker.run(&mut h.shutdown).await;

    assert!(start.elapsed() < secs(600 + 7200));
    assert_eq!(h.notifier.sent().len(), 3);
    assert_eq!(h.storefront.open_count(), 1);
    assert_eq!(h.storefront.fetch_times().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn longer_retry_after_slows_polling_for_the_session() {
    let mut h = harness_with(
        WorkerSettings::default(),
        2,
        vec![],
        vec![available(), unavailable(), unavailable()],
        FakeNotifier::responding(vec![Ok(secs(600))]),
    );
    h.worker.run(&mut h.shutdown).await;

    let fetch_gaps = gaps(&h.storefront.fetch_times());
    assert_eq!(fetch_gaps[..3], [600, 600, 600]);
    assert_eq!(h.worker.state().poll_interval(), secs(600));
}

#[tokio::test(start_paused = true)]
async fn shorter_retry_after_is_ignored() {
    let mut h = harness_with(
        WorkerSettings::default(),
        2,
        vec![],
        vec![available(), unavailable()],
        FakeNotifier::responding(vec![Ok(secs(10))]),
    );
    h.worker.run(&mut h.shutdown).await;

    assert_eq!(gaps(&h.storefront.fetch_times())[0], 300);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_alert_still_slows_polling() {
    let mut h = harness_with(
        WorkerSettings::default(),
        2,
        vec![],
        vec![available(), unavailable()],
        FakeNotifier::responding(vec![Err(NotifyError::RateLimited {
            retry_after: secs(900),
        })]),
    );
    h.worker.run(&mut h.shutdown).await;

    assert_eq!(gaps(&h.storefront.fetch_times())[0], 900);
}

#[tokio::test(start_paused = true)]
async fn failed_alert_does_not_stop_polling() {
    let mut h = harness_with(
        WorkerSettings::default(),
        2,
        vec![],
        vec![available(), unavailable(), unavailable()],
        FakeNotifier::responding(vec![Err(NotifyError::UnexpectedStatus { status: 500 })]),
    );
    h.worker.run(&mut h.shutdown).await;

    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.storefront.fetch_times().len(), 4);
    assert_eq!(h.storefront.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_session_is_replaced_exactly_once() {
    let mut h = harness(vec![unavailable(), session_rejected(), unavailable()]);
    h.worker.run(&mut h.shutdown).await;

    let events = h.storefront.events();
    assert_eq!(
        events[..5],
        [
            Event::Open("10.0.0.0:8080".to_owned()),
            Event::Fetch(1),
            Event::Fetch(1),
            Event::Open("10.0.0.1:8080".to_owned()),
            Event::Fetch(2),
        ]
    );
    assert_eq!(h.storefront.open_count(), 2);

    let fetch_gaps = gaps(&h.storefront.fetch_times());
    assert_eq!(fetch_gaps[1], 10, "error delay before new session");
}

#[tokio::test(start_paused = true)]
async fn new_session_restores_default_poll_interval() {
    let mut h = harness_with(
        WorkerSettings::default(),
        2,
        vec![],
        vec![available(), session_rejected(), unavailable(), unavailable()],
        FakeNotifier::responding(vec![Ok(secs(600))]),
    );
    h.worker.run(&mut h.shutdown).await;

    let fetch_gaps = gaps(&h.storefront.fetch_times());
    assert_eq!(fetch_gaps[0], 600);
    assert_eq!(fetch_gaps[2], 300);
}

#[tokio::test(start_paused = true)]
async fn fatal_fetch_error_backs_off_and_recovers() {
    let mut h = harness(vec![
        Err(FetchError::UnexpectedStatus {
            sku: SKU.to_owned(),
            status: 500,
        }),
        available(),
    ]);
    h.worker.run(&mut h.shutdown).await;

    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.storefront.open_count(), 2);
    assert_eq!(gaps(&h.storefront.fetch_times())[0], 10);
}

#[tokio::test(start_paused = true)]
async fn session_failures_rotate_proxies_with_growing_backoff() {
    let mut h = harness_with(
        WorkerSettings::default(),
        2,
        vec![missing_cookie(), missing_cookie(), missing_cookie()],
        vec![unavailable()],
        FakeNotifier::default(),
    );
    h.worker.run(&mut h.shutdown).await;

    let opened: Vec<Event> = h
        .storefront
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Open(_)))
        .collect();
    assert_eq!(
        opened[..4],
        [
            Event::Open("10.0.0.0:8080".to_owned()),
            Event::Open("10.0.0.1:8080".to_owned()),
            Event::Open("10.0.0.0:8080".to_owned()),
            Event::Open("10.0.0.1:8080".to_owned()),
        ]
    );
    assert_eq!(
        gaps(&h.storefront.open_times())[..3],
        [10, 20, 40]
    );
}

#[tokio::test(start_paused = true)]
async fn error_backoff_is_capped() {
    let settings = WorkerSettings {
        max_error_delay: secs(15),
        ..WorkerSettings::default()
    };
    let mut h = harness_with(
        settings,
        1,
        vec![missing_cookie(), missing_cookie(), missing_cookie()],
        vec![unavailable()],
        FakeNotifier::default(),
    );
    h.worker.run(&mut h.shutdown).await;

    assert_eq!(
        gaps(&h.storefront.open_times())[..3],
        [10, 15, 15]
    );
}

#[tokio::test(start_paused = true)]
async fn successful_fetch_resets_backoff() {
    let mut h = harness_with(
        WorkerSettings::default(),
        2,
        vec![missing_cookie(), missing_cookie()],
        vec![unavailable(), session_rejected(), unavailable()],
        FakeNotifier::default(),
    );
    h.worker.run(&mut h.shutdown).await;

    // Session rejection after a success backs off from the base delay.
    assert_eq!(gaps(&h.storefront.fetch_times())[1], 10);
}

#[tokio::test(start_paused = true)]
async fn failed_opens_do_not_inflate_later_fetch_backoff() {
    let mut h = harness_with(
        WorkerSettings::default(),
        2,
        (0..5).map(|_| missing_cookie()).collect(),
        vec![session_rejected(), unavailable()],
        FakeNotifier::default(),
    );
    h.worker.run(&mut h.shutdown).await;

    assert_eq!(h.storefront.open_count(), 7);
    assert_eq!(gaps(&h.storefront.fetch_times())[0], 10);
}

#[tokio::test(start_paused = true)]
async fn repeated_fetch_failures_keep_growing_across_sessions() {
    let server_error = || {
        Err(FetchError::UnexpectedStatus {
            sku: SKU.to_owned(),
            status: 500,
        })
    };
    let mut h = harness(vec![server_error(), server_error(), server_error(), unavailable()]);
    h.worker.run(&mut h.shutdown).await;

    assert_eq!(h.storefront.open_count(), 4);
    assert_eq!(gaps(&h.storefront.fetch_times())[..3], [10, 20, 40]);
}

#[tokio::test(start_paused = true)]
async fn worker_exits_promptly_when_already_shut_down() {
    let mut h = harness(vec![available()]);
    h.storefront.shutdown.send_replace(true);
    h.worker.run(&mut h.shutdown).await;

    assert!(h.storefront.events().is_empty());
    assert!(h.notifier.sent().is_empty());
}
