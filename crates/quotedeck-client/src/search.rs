use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::sleep;

/// Quiet period after the last keystroke before a search fires.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// What the debouncer asks the listing layer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// Run a search for this trimmed, non-empty text.
    Query(String),
    /// The input went blank; return to the browse view.
    Cleared,
}

/// Trailing-edge debouncer for a search input.
///
/// Each keystroke arms a timer and invalidates the previous one; only the
/// timer still current when the window elapses emits its query. Clearing the
/// input and explicit submission skip the window entirely. Must be used
/// inside a tokio runtime.
pub struct SearchDebouncer {
    window: Duration,
    seq: Arc<AtomicU64>,
    preparing: Arc<AtomicBool>,
    tx: UnboundedSender<SearchEvent>,
}

impl SearchDebouncer {
    pub fn new(tx: UnboundedSender<SearchEvent>) -> Self {
        Self::with_window(SEARCH_DEBOUNCE, tx)
    }

    pub fn with_window(window: Duration, tx: UnboundedSender<SearchEvent>) -> Self {
        Self {
            window,
            seq: Arc::new(AtomicU64::new(0)),
            preparing: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// Record a keystroke. Blank input clears immediately; anything else
    /// fires after the quiet window unless a newer keystroke supersedes it.
    pub fn on_input(&self, text: &str) {
        let my_seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.preparing.store(false, Ordering::SeqCst);
            let _ = self.tx.send(SearchEvent::Cleared);
            return;
        }

        self.preparing.store(true, Ordering::SeqCst);
        let seq = Arc::clone(&self.seq);
        let preparing = Arc::clone(&self.preparing);
        let tx = self.tx.clone();
        let window = self.window;
        let query = trimmed.to_string();
        tokio::spawn(async move {
            sleep(window).await;
            if seq.load(Ordering::SeqCst) != my_seq {
                return; // superseded by a newer keystroke
            }
            preparing.store(false, Ordering::SeqCst);
            let _ = tx.send(SearchEvent::Query(query));
        });
    }

    /// Explicit submit: fires now and disarms any pending timer.
    pub fn submit(&self, text: &str) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        self.preparing.store(false, Ordering::SeqCst);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            let _ = self.tx.send(SearchEvent::Cleared);
        } else {
            let _ = self.tx.send(SearchEvent::Query(trimmed.to_string()));
        }
    }

    /// True between a recorded keystroke and its (not yet fired) search, so
    /// a caller can show a "search pending" hint.
    pub fn is_preparing(&self) -> bool {
        self.preparing.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
    use tokio::time::timeout;

    fn debouncer(window_ms: u64) -> (SearchDebouncer, UnboundedReceiver<SearchEvent>) {
        let (tx, rx) = unbounded_channel();
        (SearchDebouncer::with_window(Duration::from_millis(window_ms), tx), rx)
    }

    #[tokio::test]
    async fn rapid_keystrokes_collapse_into_one_query() {
        let (debouncer, mut rx) = debouncer(150);

        debouncer.on_input("l");
        sleep(Duration::from_millis(40)).await;
        debouncer.on_input("li");
        sleep(Duration::from_millis(40)).await;
        debouncer.on_input("life");

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("debounced query should fire")
            .unwrap();
        assert_eq!(event, SearchEvent::Query("life".to_string()));

        // The superseded timers must stay silent.
        sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn preparing_flag_tracks_pending_search() {
        let (debouncer, mut rx) = debouncer(100);

        assert!(!debouncer.is_preparing());
        debouncer.on_input("hello");
        assert!(debouncer.is_preparing(), "set on the keystroke itself");

        let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event, SearchEvent::Query("hello".to_string()));
        assert!(!debouncer.is_preparing(), "cleared once the search fires");
    }

    #[tokio::test]
    async fn submit_bypasses_the_window() {
        let (debouncer, mut rx) = debouncer(200);

        debouncer.on_input("hel");
        debouncer.submit("hello");

        // Far sooner than the window could have elapsed.
        let event = timeout(Duration::from_millis(50), rx.recv())
            .await
            .expect("submit should fire immediately")
            .unwrap();
        assert_eq!(event, SearchEvent::Query("hello".to_string()));
        assert!(!debouncer.is_preparing());

        // The pending keystroke timer was disarmed.
        sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn blank_input_clears_immediately() {
        let (debouncer, mut rx) = debouncer(200);

        debouncer.on_input("word");
        debouncer.on_input("   ");

        let event = timeout(Duration::from_millis(50), rx.recv())
            .await
            .expect("clear should not wait for the window")
            .unwrap();
        assert_eq!(event, SearchEvent::Cleared);
        assert!(!debouncer.is_preparing());

        sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err(), "the armed search must not fire after a clear");
    }

    #[tokio::test]
    async fn queries_are_trimmed() {
        let (debouncer, mut rx) = debouncer(50);

        debouncer.on_input("  carpe diem  ");
        let event = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event, SearchEvent::Query("carpe diem".to_string()));
    }
}
