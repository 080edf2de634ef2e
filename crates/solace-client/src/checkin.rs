//! QR check-in screen: camera permission gating plus the driver that runs
//! the [`guard`](crate::guard) and carries out its effects.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use solace_gateway::Backend;
use solace_types::api::Navigation;
use solace_types::models::{ScannedSession, collections, to_fields};

use crate::guard::{Effect, GuardContext, GuardState, Identity, ScanEvent, transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraPermission {
    #[default]
    Undetermined,
    Granted,
    Denied,
}

/// What the screen shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerView {
    Scanner,
    /// In-view request to grant camera access. Not an alert.
    PermissionPrompt,
}

impl CameraPermission {
    pub fn view(self) -> ScannerView {
        match self {
            Self::Granted => ScannerView::Scanner,
            Self::Undetermined | Self::Denied => ScannerView::PermissionPrompt,
        }
    }
}

#[derive(Debug, Default)]
struct ScreenState {
    guard: GuardState,
    message: Option<String>,
    permission: CameraPermission,
    identity: Identity,
    /// Last attempt id handed to the guard.
    attempts: u64,
}

pub struct CheckInController<B: Backend> {
    inner: Arc<Inner<B>>,
}

struct Inner<B> {
    backend: Arc<B>,
    home_delay: Duration,
    screen: Mutex<ScreenState>,
    /// Bumped on every focus; a pending redirect from an older visit is dropped.
    visit: AtomicU64,
    nav_tx: mpsc::UnboundedSender<Navigation>,
}

impl<B: Backend> Clone for CheckInController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Backend> CheckInController<B> {
    /// Returns the controller and the receiver for its navigation requests.
    pub fn new(
        backend: Arc<B>,
        identity: Identity,
        home_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Navigation>) {
        let (nav_tx, nav_rx) = mpsc::unbounded_channel();
        let controller = Self {
            inner: Arc::new(Inner {
                backend,
                home_delay,
                screen: Mutex::new(ScreenState {
                    identity,
                    ..Default::default()
                }),
                visit: AtomicU64::new(0),
                nav_tx,
            }),
        };
        (controller, nav_rx)
    }

    pub fn set_identity(&self, identity: Identity) {
        self.with_screen(|s| s.identity = identity);
    }

    pub fn set_permission(&self, permission: CameraPermission) {
        self.with_screen(|s| s.permission = permission);
    }

    pub fn view(&self) -> ScannerView {
        self.with_screen(|s| s.permission.view())
    }

    pub fn state(&self) -> GuardState {
        self.with_screen(|s| s.guard)
    }

    pub fn message(&self) -> Option<String> {
        self.with_screen(|s| s.message.clone())
    }

    /// A code was detected by the camera. Ignored unless the camera is
    /// granted; otherwise handed to the guard.
    pub async fn on_scan(&self, payload: &str) -> GuardState {
        if self.view() != ScannerView::Scanner {
            debug!("scan without camera permission ignored");
            return self.state();
        }
        self.dispatch(ScanEvent::ScanDetected(payload.to_string())).await;
        self.state()
    }

    /// The screen became visible: re-arm and clear messages.
    pub async fn on_focus(&self) {
        self.inner.visit.fetch_add(1, Ordering::SeqCst);
        self.dispatch(ScanEvent::Focused).await;
    }

    pub async fn on_blur(&self) {
        self.dispatch(ScanEvent::Blurred).await;
    }

    /// Feed `event` to the guard and carry out the effects, including any
    /// follow-up events they produce. The screen lock is never held across
    /// an await.
    async fn dispatch(&self, event: ScanEvent) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            for effect in self.apply(event) {
                if let Some((attempt, session)) = self.perform(effect) {
                    pending.push_back(self.submit(attempt, session).await);
                }
            }
        }
    }

    /// Carry out an effect that needs no I/O. A submit is handed back.
    fn perform(&self, effect: Effect) -> Option<(u64, ScannedSession)> {
        match effect {
            Effect::Submit { attempt, session } => return Some((attempt, session)),
            Effect::ShowMessage(text) => self.with_screen(|s| s.message = Some(text)),
            Effect::ClearMessages => self.with_screen(|s| s.message = None),
            Effect::ScheduleNavigateHome(delay) => self.schedule_home(delay),
            Effect::NavigateHome => {
                let _ = self.inner.nav_tx.send(Navigation::Home);
            }
        }
        None
    }

    fn apply(&self, event: ScanEvent) -> Vec<Effect> {
        let now = Utc::now();
        let home_delay = self.inner.home_delay;

        self.with_screen(|s| {
            s.attempts += 1;
            let ctx = GuardContext {
                identity: &s.identity,
                now,
                home_delay,
                attempt: s.attempts,
            };
            let (next, effects) = transition(s.guard, event, &ctx);
            if next != s.guard {
                debug!(from = ?s.guard, to = ?next, "check-in guard");
            }
            s.guard = next;
            effects
        })
    }

    async fn submit(&self, attempt: u64, session: ScannedSession) -> ScanEvent {
        let fields = match to_fields(&session) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(error = %e, "could not encode check-in");
                return ScanEvent::WriteFailed(attempt);
            }
        };

        match self.inner.backend.add(collections::SCANNED_SESSIONS, fields).await {
            Ok(id) => {
                info!(user = %session.user_id, id = %id, attempt, "check-in recorded");
                ScanEvent::WriteSucceeded(attempt)
            }
            Err(e) => {
                warn!(user = %session.user_id, attempt, error = %e, "check-in write failed");
                ScanEvent::WriteFailed(attempt)
            }
        }
    }

    fn schedule_home(&self, delay: Duration) {
        let controller = self.clone();
        let visit = self.inner.visit.load(Ordering::SeqCst);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if controller.inner.visit.load(Ordering::SeqCst) != visit {
                return;
            }
            for effect in controller.apply(ScanEvent::NavigationDelayElapsed) {
                controller.perform(effect);
            }
        });
    }

    fn with_screen<T>(&self, f: impl FnOnce(&mut ScreenState) -> T) -> T {
        let mut screen = self.inner.screen.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut screen)
    }
}
