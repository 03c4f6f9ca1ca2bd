use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::model::DetectedSubscription;

/// Quiet window after the last page event before a scan fires. Bursts of
/// mutations inside the window collapse into one scan.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    #[default]
    Idle,
    Scanning,
    Detected,
    Saved,
    Dismissed,
}

/// External happenings on the page under watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    Loaded,
    Mutated,
    Saved,
    Dismissed,
}

/// Per-view scan state. One prompt per view: once `Detected`, further
/// mutations never trigger another scan until the user settles the prompt.
#[derive(Debug, Default)]
pub struct ScanState {
    phase: ScanPhase,
    last_result: Option<DetectedSubscription>,
    popup_shown: bool,
}

impl ScanState {
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn last_result(&self) -> Option<&DetectedSubscription> {
        self.last_result.as_ref()
    }

    pub fn popup_shown(&self) -> bool {
        self.popup_shown
    }

    /// Idle → Scanning. Any other phase refuses; in particular a settled or
    /// pending prompt blocks new scans.
    fn begin_scan(&mut self) -> bool {
        if self.phase != ScanPhase::Idle {
            return false;
        }
        self.phase = ScanPhase::Scanning;
        true
    }

    /// Scanning → Detected (hit) or back to Idle (miss). A miss leaves the
    /// view armed for the next mutation burst.
    fn finish_scan(&mut self, result: Option<DetectedSubscription>) {
        debug_assert_eq!(self.phase, ScanPhase::Scanning);
        match result {
            Some(sub) => {
                self.last_result = Some(sub);
                self.popup_shown = true;
                self.phase = ScanPhase::Detected;
            }
            None => self.phase = ScanPhase::Idle,
        }
    }

    /// Detected → Saved. The record moves to storage; the view is settled.
    fn save(&mut self) -> Option<DetectedSubscription> {
        if self.phase != ScanPhase::Detected {
            return None;
        }
        self.phase = ScanPhase::Saved;
        self.last_result.take()
    }

    /// Detected → Dismissed. The record is dropped; the view is settled.
    fn dismiss(&mut self) {
        if self.phase == ScanPhase::Detected {
            self.phase = ScanPhase::Dismissed;
            self.last_result = None;
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self.phase, ScanPhase::Saved | ScanPhase::Dismissed)
    }
}

/// Drives the scan lifecycle for one page view: debounces events, runs the
/// scan closure at quiet points, and enforces one prompt per view. The scan
/// itself is synchronous so page handles never cross an await.
pub struct ScanController<S> {
    state: ScanState,
    scan: S,
}

impl<S> ScanController<S>
where
    S: FnMut() -> anyhow::Result<Option<DetectedSubscription>>,
{
    pub fn new(scan: S) -> Self {
        Self {
            state: ScanState::default(),
            scan,
        }
    }

    /// One guarded scan pass. A scan error is logged and treated as a miss so
    /// the view stays usable.
    fn run_scan(&mut self) -> Option<DetectedSubscription> {
        if !self.state.begin_scan() {
            return None;
        }
        let result = match (self.scan)() {
            Ok(found) => found,
            Err(e) => {
                warn!("scan failed, treating as no detection: {:#}", e);
                None
            }
        };
        self.state.finish_scan(result.clone());
        result
    }

    /// Event loop for one view. Returns the final state when the view settles
    /// (saved or dismissed) or the event source closes.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<PageEvent>,
        mut on_detected: impl FnMut(&DetectedSubscription),
    ) -> ScanState {
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    debug!(?event, phase = ?self.state.phase(), "page event");
                    match event {
                        PageEvent::Loaded => {
                            deadline = Some(Instant::now() + DEBOUNCE_WINDOW);
                        }
                        PageEvent::Mutated => {
                            // Mutations only matter while the view is armed.
                            if self.state.phase() == ScanPhase::Idle {
                                deadline = Some(Instant::now() + DEBOUNCE_WINDOW);
                            }
                        }
                        PageEvent::Saved => {
                            self.state.save();
                        }
                        PageEvent::Dismissed => {
                            self.state.dismiss();
                        }
                    }
                    if self.state.is_terminal() {
                        break;
                    }
                }
                _ = async { sleep_until(deadline.unwrap()).await }, if deadline.is_some() => {
                    deadline = None;
                    if let Some(found) = self.run_scan() {
                        on_detected(&found);
                    }
                }
            }
        }

        self.state
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BillingCycle, Category};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{advance, Duration};

    fn sample() -> DetectedSubscription {
        DetectedSubscription {
            service_name: "Netflix".to_string(),
            price: 15.49,
            billing_cycle: BillingCycle::Monthly,
            category: Category::Streaming,
            url: "https://netflix.com/account".to_string(),
            is_trial: false,
            trial_duration: None,
            trial_start_date: None,
            trial_end_date: None,
        }
    }

    fn counting_scan(
        counter: Arc<AtomicUsize>,
        result: Option<DetectedSubscription>,
    ) -> impl FnMut() -> anyhow::Result<Option<DetectedSubscription>> {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(result.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_burst_collapses_to_one_scan() {
        let scans = Arc::new(AtomicUsize::new(0));
        let controller = ScanController::new(counting_scan(scans.clone(), None));
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(controller.run(rx, |_| {}));

        tx.send(PageEvent::Loaded).await.unwrap();
        for _ in 0..5 {
            advance(Duration::from_millis(100)).await;
            tx.send(PageEvent::Mutated).await.unwrap();
        }
        advance(DEBOUNCE_WINDOW + Duration::from_millis(100)).await;
        drop(tx);

        let state = handle.await.unwrap();
        assert_eq!(scans.load(Ordering::SeqCst), 1);
        assert_eq!(state.phase(), ScanPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn one_prompt_per_view() {
        let scans = Arc::new(AtomicUsize::new(0));
        let controller = ScanController::new(counting_scan(scans.clone(), Some(sample())));
        let (tx, rx) = mpsc::channel(16);
        let prompts = Arc::new(AtomicUsize::new(0));
        let prompt_count = prompts.clone();

        let handle = tokio::spawn(controller.run(rx, move |_| {
            prompt_count.fetch_add(1, Ordering::SeqCst);
        }));

        tx.send(PageEvent::Loaded).await.unwrap();
        advance(DEBOUNCE_WINDOW + Duration::from_millis(100)).await;

        // Mutations after detection must not rearm the scanner.
        for _ in 0..3 {
            tx.send(PageEvent::Mutated).await.unwrap();
            advance(DEBOUNCE_WINDOW + Duration::from_millis(100)).await;
        }
        tx.send(PageEvent::Saved).await.unwrap();

        let state = handle.await.unwrap();
        assert_eq!(scans.load(Ordering::SeqCst), 1);
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
        assert_eq!(state.phase(), ScanPhase::Saved);
        assert!(state.popup_shown());
    }

    #[tokio::test(start_paused = true)]
    async fn miss_rearms_for_the_next_burst() {
        let scans = Arc::new(AtomicUsize::new(0));
        let controller = ScanController::new(counting_scan(scans.clone(), None));
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(controller.run(rx, |_| {}));

        tx.send(PageEvent::Loaded).await.unwrap();
        advance(DEBOUNCE_WINDOW + Duration::from_millis(100)).await;
        tx.send(PageEvent::Mutated).await.unwrap();
        advance(DEBOUNCE_WINDOW + Duration::from_millis(100)).await;
        drop(tx);

        let state = handle.await.unwrap();
        assert_eq!(scans.load(Ordering::SeqCst), 2);
        assert_eq!(state.phase(), ScanPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn scan_error_is_a_miss() {
        let controller = ScanController::new(|| anyhow::bail!("renderer crashed"));
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(controller.run(rx, |_| {}));

        tx.send(PageEvent::Loaded).await.unwrap();
        advance(DEBOUNCE_WINDOW + Duration::from_millis(100)).await;
        drop(tx);

        let state = handle.await.unwrap();
        assert_eq!(state.phase(), ScanPhase::Idle);
        assert!(state.last_result().is_none());
    }

    #[test]
    fn dismiss_clears_the_record() {
        let mut state = ScanState::default();
        assert!(state.begin_scan());
        state.finish_scan(Some(sample()));
        assert_eq!(state.phase(), ScanPhase::Detected);

        state.dismiss();
        assert_eq!(state.phase(), ScanPhase::Dismissed);
        assert!(state.last_result().is_none());
        assert!(state.is_terminal());
    }

    #[test]
    fn save_hands_back_the_record() {
        let mut state = ScanState::default();
        assert!(state.begin_scan());
        state.finish_scan(Some(sample()));

        let saved = state.save().unwrap();
        assert_eq!(saved.service_name, "Netflix");
        assert_eq!(state.phase(), ScanPhase::Saved);
    }

    #[test]
    fn scans_refused_outside_idle() {
        let mut state = ScanState::default();
        assert!(state.begin_scan());
        assert!(!state.begin_scan());
        state.finish_scan(Some(sample()));
        assert!(!state.begin_scan());
    }
}
