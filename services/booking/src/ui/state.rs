//! services/booking/src/ui/state.rs
//!
//! Defines the application's shared state and the per-run browse state
//! that drives the selection funnel against the marketplace ports.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info};
use tutorboard_core::domain::{BookingConfirmation, CreditBalance, Teacher};
use tutorboard_core::funnel::{EntryMode, SelectionFunnel};
use tutorboard_core::ports::MarketplaceService;
use uuid::Uuid;

use crate::config::Config;

//=========================================================================================
// AppState (Shared Across the Whole Run)
//=========================================================================================

/// The shared application state, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub marketplace: Arc<dyn MarketplaceService>,
    pub config: Arc<Config>,
}

//=========================================================================================
// BrowseState (Specific to One Browse-and-Book Run)
//=========================================================================================

/// The state for a single browse-and-book run.
///
/// Owned by exactly one task. Every mutation is a direct response to a user
/// action, so there is nothing to coordinate; loads are last-write-wins,
/// which is acceptable for idempotent read data.
pub struct BrowseState {
    marketplace: Arc<dyn MarketplaceService>,
    pub funnel: SelectionFunnel,
    pub teachers: Vec<Teacher>,
    pub balance: Option<CreditBalance>,
    /// The inline error banner. Kept separate from empty-result
    /// placeholders, which are not errors.
    pub last_error: Option<String>,
    /// The most recent successful booking, for the confirmation view.
    pub last_confirmation: Option<BookingConfirmation>,
    window_days: i64,
}

impl BrowseState {
    /// Creates an empty browse run in one entry mode.
    pub fn new(app_state: &AppState, mode: EntryMode) -> Self {
        Self {
            marketplace: app_state.marketplace.clone(),
            funnel: SelectionFunnel::new(mode, app_state.config.viewer_offset),
            teachers: Vec::new(),
            balance: None,
            last_error: None,
            last_confirmation: None,
            window_days: app_state.config.booking_window_days,
        }
    }

    /// Loads the teacher roster, the open sessions for the forward window,
    /// and the credit balance.
    pub async fn refresh(&mut self) {
        self.last_error = None;
        self.refresh_teachers().await;
        self.refresh_sessions().await;
        self.refresh_balance().await;
    }

    /// Replaces the teacher roster. On failure the previous roster is kept.
    pub async fn refresh_teachers(&mut self) {
        match self.marketplace.list_teachers().await {
            Ok(teachers) => self.teachers = teachers,
            Err(e) => {
                error!("Failed to load teachers: {:?}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Loads the open sessions from now through the configured window and
    /// swaps them into the funnel (which re-applies the open filter and
    /// revalidates any picks).
    ///
    /// On failure the previous list stays visible, the error is surfaced
    /// inline, and nothing retries until the user asks again.
    pub async fn refresh_sessions(&mut self) -> bool {
        let now = Utc::now();
        let window_end = now + Duration::days(self.window_days);
        let teacher_filter = match self.funnel.mode() {
            EntryMode::TeacherFirst => self.funnel.selected_teacher(),
            EntryMode::DateFirst => None,
        };

        match self
            .marketplace
            .list_open_sessions(now, window_end, teacher_filter)
            .await
        {
            Ok(sessions) => {
                info!("Loaded {} sessions in the booking window", sessions.len());
                self.funnel.replace_sessions(sessions);
                true
            }
            Err(e) => {
                error!("Failed to load open sessions: {:?}", e);
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// Fetches the credit balance. Display only; the server re-checks
    /// affordability when the booking is submitted.
    pub async fn refresh_balance(&mut self) {
        match self.marketplace.credit_balance().await {
            Ok(balance) => self.balance = Some(balance),
            Err(e) => {
                error!("Failed to load credit balance: {:?}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Teacher-first entry: pins the teacher and reloads the window
    /// narrowed to them on the server side.
    pub async fn pin_teacher(&mut self, teacher_id: Uuid) -> bool {
        if !self.funnel.select_teacher(teacher_id) {
            return false;
        }
        self.refresh_sessions().await
    }

    /// Submits the resolved selection as a booking.
    ///
    /// On success the funnel resets, the confirmation (with any meeting
    /// link) is kept for display, and the session list and balance are
    /// re-fetched. On refusal the picks stay put and the server's message
    /// is shown word for word; nothing is retried automatically.
    pub async fn confirm_booking(&mut self) -> bool {
        let session_id = match self.funnel.resolve_selection() {
            Some(session) => session.id,
            // Unreachable from the prompts, but a stale view must not panic.
            None => return false,
        };
        if !self.funnel.begin_booking() {
            return false;
        }

        info!("Submitting booking for session {}", session_id);
        match self.marketplace.create_booking(session_id).await {
            Ok(confirmation) => {
                self.funnel.complete_booking();
                self.last_confirmation = Some(confirmation);
                self.last_error = None;
                self.refresh_sessions().await;
                self.refresh_balance().await;
                true
            }
            Err(e) => {
                error!("Booking was not created: {:?}", e);
                self.funnel.fail_booking();
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// The teacher profile behind an id, when the roster has it.
    pub fn teacher_by_id(&self, teacher_id: Uuid) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id == teacher_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tutorboard_core::domain::{Session, SessionStatus};
    use tutorboard_core::funnel::FunnelStage;
    use tutorboard_core::ports::{PortError, PortResult};

    struct FakeMarketplace {
        sessions: Mutex<Vec<Session>>,
        fail_loads: AtomicBool,
        booking_refusal: Mutex<Option<String>>,
        session_list_calls: AtomicUsize,
        last_teacher_filter: Mutex<Option<Uuid>>,
        balance: Mutex<i64>,
    }

    impl FakeMarketplace {
        fn with_sessions(sessions: Vec<Session>) -> Arc<Self> {
            Arc::new(Self {
                sessions: Mutex::new(sessions),
                fail_loads: AtomicBool::new(false),
                booking_refusal: Mutex::new(None),
                session_list_calls: AtomicUsize::new(0),
                last_teacher_filter: Mutex::new(None),
                balance: Mutex::new(40),
            })
        }
    }

    #[async_trait]
    impl MarketplaceService for FakeMarketplace {
        async fn list_teachers(&self) -> PortResult<Vec<Teacher>> {
            Ok(Vec::new())
        }

        async fn list_open_sessions(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
            teacher_id: Option<Uuid>,
        ) -> PortResult<Vec<Session>> {
            self.session_list_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_teacher_filter.lock().unwrap() = teacher_id;
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(PortError::Unexpected("connection refused".to_string()));
            }
            let sessions = self.sessions.lock().unwrap().clone();
            Ok(match teacher_id {
                Some(id) => sessions.into_iter().filter(|s| s.teacher_id == id).collect(),
                None => sessions,
            })
        }

        async fn credit_balance(&self) -> PortResult<CreditBalance> {
            Ok(CreditBalance {
                balance: *self.balance.lock().unwrap(),
            })
        }

        async fn create_booking(&self, session_id: Uuid) -> PortResult<BookingConfirmation> {
            if let Some(message) = self.booking_refusal.lock().unwrap().clone() {
                return Err(PortError::Rejected(message));
            }
            let mut sessions = self.sessions.lock().unwrap();
            let position = sessions
                .iter()
                .position(|s| s.id == session_id)
                .ok_or_else(|| PortError::NotFound(format!("session {}", session_id)))?;
            let mut session = sessions.remove(position);
            session.status = SessionStatus::Booked;
            session.meeting_link = Some("https://meet.example/room".to_string());
            *self.balance.lock().unwrap() -= i64::from(session.price_credits);
            Ok(BookingConfirmation {
                booking_id: Uuid::from_u128(900),
                session,
            })
        }
    }

    fn session(id: u128, teacher: u128, start: &str, status: SessionStatus) -> Session {
        let start_at = start.parse::<DateTime<Utc>>().unwrap();
        Session {
            id: Uuid::from_u128(id),
            teacher_id: Uuid::from_u128(teacher),
            start_at,
            end_at: start_at + Duration::minutes(50),
            status,
            price_credits: 10,
            meeting_link: None,
        }
    }

    /// A session starting tomorrow at 14:00 UTC, inside any load window.
    fn tomorrow_at_fourteen(id: u128, teacher: u128) -> Session {
        let date = (Utc::now() + Duration::days(1)).date_naive();
        let start = format!("{}T14:00:00Z", date);
        session(id, teacher, &start, SessionStatus::Open)
    }

    fn browse_state(marketplace: Arc<FakeMarketplace>, mode: EntryMode) -> BrowseState {
        let config = Arc::new(Config {
            api_base_url: "http://marketplace.test".to_string(),
            api_token: Some("token".to_string()),
            log_level: tracing::Level::INFO,
            booking_window_days: 30,
            viewer_offset: FixedOffset::east_opt(0).unwrap(),
        });
        let app_state = AppState {
            marketplace,
            config,
        };
        BrowseState::new(&app_state, mode)
    }

    fn tomorrow() -> NaiveDate {
        (Utc::now() + Duration::days(1)).date_naive()
    }

    fn fourteen() -> NaiveTime {
        NaiveTime::from_hms_opt(14, 0, 0).unwrap()
    }

    async fn select_tomorrow_slot(state: &mut BrowseState, teacher: u128) {
        state.refresh().await;
        assert!(state.funnel.select_date(tomorrow()));
        assert!(state.funnel.select_time(fourteen()));
        assert!(state.funnel.select_teacher(Uuid::from_u128(teacher)));
    }

    #[tokio::test]
    async fn load_discards_sessions_the_server_should_not_have_sent() {
        let mut not_open = tomorrow_at_fourteen(2, 2);
        not_open.status = SessionStatus::Booked;
        let fake = FakeMarketplace::with_sessions(vec![tomorrow_at_fourteen(1, 1), not_open]);
        let mut state = browse_state(fake, EntryMode::DateFirst);

        state.refresh().await;

        assert_eq!(state.funnel.sessions().len(), 1);
        assert_eq!(state.funnel.sessions()[0].id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn load_failure_retains_the_previous_list() {
        let fake = FakeMarketplace::with_sessions(vec![tomorrow_at_fourteen(1, 1)]);
        let mut state = browse_state(fake.clone(), EntryMode::DateFirst);
        state.refresh().await;
        assert_eq!(state.funnel.sessions().len(), 1);

        fake.fail_loads.store(true, Ordering::SeqCst);
        assert!(!state.refresh_sessions().await);

        assert_eq!(state.funnel.sessions().len(), 1);
        let banner = state.last_error.as_deref().unwrap();
        assert!(banner.contains("connection refused"), "got: {banner}");
    }

    #[tokio::test]
    async fn refused_booking_keeps_the_selection_and_does_not_reload() {
        let fake = FakeMarketplace::with_sessions(vec![
            tomorrow_at_fourteen(1, 1),
            tomorrow_at_fourteen(2, 2),
        ]);
        let mut state = browse_state(fake.clone(), EntryMode::DateFirst);
        select_tomorrow_slot(&mut state, 1).await;
        *fake.booking_refusal.lock().unwrap() = Some("insufficient credits".to_string());
        let loads_before = fake.session_list_calls.load(Ordering::SeqCst);

        assert!(!state.confirm_booking().await);

        assert_eq!(state.last_error.as_deref(), Some("insufficient credits"));
        assert_eq!(state.funnel.stage(), FunnelStage::Failed);
        assert_eq!(state.funnel.selected_date(), Some(tomorrow()));
        assert_eq!(state.funnel.selected_time(), Some(fourteen()));
        assert_eq!(state.funnel.selected_teacher(), Some(Uuid::from_u128(1)));
        assert_eq!(fake.session_list_calls.load(Ordering::SeqCst), loads_before);
    }

    #[tokio::test]
    async fn successful_booking_resets_refreshes_and_drops_the_slot() {
        let fake = FakeMarketplace::with_sessions(vec![
            tomorrow_at_fourteen(1, 1),
            tomorrow_at_fourteen(2, 2),
        ]);
        let mut state = browse_state(fake.clone(), EntryMode::DateFirst);
        select_tomorrow_slot(&mut state, 1).await;

        assert!(state.confirm_booking().await);

        assert_eq!(state.funnel.selected_date(), None);
        assert_eq!(state.funnel.selected_time(), None);
        assert_eq!(state.funnel.selected_teacher(), None);
        assert!(state
            .funnel
            .sessions()
            .iter()
            .all(|s| s.id != Uuid::from_u128(1)));

        let confirmation = state.last_confirmation.as_ref().unwrap();
        assert_eq!(
            confirmation.session.meeting_link.as_deref(),
            Some("https://meet.example/room")
        );
        // 40 credits minus the 10-credit session, re-fetched after booking.
        assert_eq!(state.balance.unwrap().balance, 30);
    }

    #[tokio::test]
    async fn pinning_a_teacher_narrows_the_server_query() {
        let fake = FakeMarketplace::with_sessions(vec![
            tomorrow_at_fourteen(1, 1),
            tomorrow_at_fourteen(2, 2),
        ]);
        let mut state = browse_state(fake.clone(), EntryMode::TeacherFirst);

        assert!(state.pin_teacher(Uuid::from_u128(2)).await);

        assert_eq!(
            *fake.last_teacher_filter.lock().unwrap(),
            Some(Uuid::from_u128(2))
        );
        assert!(state
            .funnel
            .sessions()
            .iter()
            .all(|s| s.teacher_id == Uuid::from_u128(2)));
    }

    #[tokio::test]
    async fn confirm_without_a_full_selection_is_a_no_op() {
        let fake = FakeMarketplace::with_sessions(vec![tomorrow_at_fourteen(1, 1)]);
        let mut state = browse_state(fake, EntryMode::DateFirst);
        state.refresh().await;
        state.funnel.select_date(tomorrow());

        assert!(!state.confirm_booking().await);
        assert_eq!(state.funnel.selected_date(), Some(tomorrow()));
    }
}
