use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;
use tokio::sync::mpsc;

use super::gesture::{
    CardInteraction, Direction, Effect, GestureConfig, InteractionEvent, InteractionState,
};
use super::pointer::PointerTracker;
use super::transform::CardTransform;
use crate::{
    error::AppResult,
    models::{DecisionRecord, Movie},
    services::card_buffer::{BufferStatus, CardBuffer},
};

/// Cards rendered at once; only the front one takes input
pub const VISIBLE_CARDS: usize = 3;
pub const EXIT_DURATION: Duration = Duration::from_millis(200);
pub const FLIP_DURATION: Duration = Duration::from_millis(400);
/// Exit rotation is drawn from `-EXIT_MAX_ROTATION..=EXIT_MAX_ROTATION` degrees
pub const EXIT_MAX_ROTATION: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum AnimationKind {
    Exit(Direction),
    Flip,
    Unflip,
}

/// A timed transition; its completion effect is applied by `advance`
#[derive(Debug, Clone, Copy)]
struct Animation {
    kind: AnimationKind,
    from: CardTransform,
    to: CardTransform,
    started_at: Instant,
    duration: Duration,
}

impl Animation {
    fn deadline(&self) -> Instant {
        self.started_at + self.duration
    }

    fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    fn transform_at(&self, now: Instant) -> CardTransform {
        self.from.lerp(&self.to, self.progress(now))
    }
}

/// Which face of the top card currently accepts input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Front,
    /// The review form
    Back,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisibleCard {
    pub movie: Movie,
    /// 0 is the front slot
    pub slot: usize,
    pub z_index: i32,
    pub transform: CardTransform,
    pub interactive: bool,
}

/// What the stack renders
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum StackView {
    Cards {
        cards: Vec<VisibleCard>,
        /// Replenishment in flight behind the visible cards
        loading_more: bool,
        /// Last replenishment error, shown alongside the cards with a retry action
        error: Option<String>,
    },
    Loading,
    Empty,
    Failed {
        message: String,
    },
}

/// Visible window over the card buffer
///
/// Routes input to the top card's interaction state, drives exit and flip
/// animations, and pops the buffer once an exit finishes. Animation
/// completions are scheduled: callers either poll [`CardStack::advance`] with
/// the current time or await [`CardStack::settle`].
pub struct CardStack {
    buffer: CardBuffer,
    config: GestureConfig,
    interaction: CardInteraction,
    pointer: PointerTracker,
    animation: Option<Animation>,
    decisions: Option<mpsc::UnboundedSender<DecisionRecord>>,
}

impl CardStack {
    pub fn new(buffer: CardBuffer, config: GestureConfig) -> Self {
        Self {
            buffer,
            config,
            interaction: CardInteraction::new(),
            pointer: PointerTracker::new(),
            animation: None,
            decisions: None,
        }
    }

    /// Forwards every emitted decision to `sink`
    pub fn with_decision_sink(mut self, sink: mpsc::UnboundedSender<DecisionRecord>) -> Self {
        self.decisions = Some(sink);
        self
    }

    pub fn buffer(&self) -> &CardBuffer {
        &self.buffer
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn interaction_state(&self) -> &InteractionState {
        &self.interaction.state
    }

    /// An exit animation is in flight; new input is ignored until it completes
    pub fn is_exiting(&self) -> bool {
        matches!(
            self.animation,
            Some(Animation {
                kind: AnimationKind::Exit(_),
                ..
            })
        )
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, now: Instant) {
        self.advance(now);
        if self.is_exiting() || self.buffer.is_empty() {
            return;
        }
        self.pointer.down(x, y, now);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, now: Instant) -> Option<DecisionRecord> {
        let event = self.pointer.moved(x, y, now)?;
        self.dispatch(event, now)
    }

    pub fn pointer_up(&mut self, x: f64, y: f64, now: Instant) -> Option<DecisionRecord> {
        let event = self.pointer.up(x, y, now, &self.config)?;
        self.dispatch(event, now)
    }

    pub fn pointer_cancel(&mut self, now: Instant) -> Option<DecisionRecord> {
        let event = self.pointer.cancel()?;
        self.dispatch(event, now)
    }

    /// Watch-later button on the front face
    pub fn watch_later(&mut self, now: Instant) -> Option<DecisionRecord> {
        if self.face(now) != Some(Face::Front) {
            return None;
        }
        self.dispatch(InteractionEvent::WatchLater, now)
    }

    pub fn set_rating(&mut self, rating: u8, now: Instant) {
        self.review_input(InteractionEvent::SetRating(rating), now);
    }

    pub fn edit_review(&mut self, text: impl Into<String>, now: Instant) {
        self.review_input(InteractionEvent::EditReview(text.into()), now);
    }

    pub fn submit_review(&mut self, now: Instant) -> Option<DecisionRecord> {
        self.review_input(InteractionEvent::SubmitReview, now)
    }

    pub fn cancel_review(&mut self, now: Instant) {
        self.review_input(InteractionEvent::CancelReview, now);
    }

    /// Whether the review form's submit button is enabled
    pub fn can_submit_review(&self) -> bool {
        match &self.interaction.state {
            InteractionState::ReviewEditing(draft) => draft.can_submit(),
            _ => false,
        }
    }

    fn review_input(&mut self, event: InteractionEvent, now: Instant) -> Option<DecisionRecord> {
        if self.face(now) != Some(Face::Back) {
            return None;
        }
        self.dispatch(event, now)
    }

    /// Feeds one event to the top card's state machine
    ///
    /// Returns the decision the event produced, if any. The decision is also
    /// forwarded to the decision sink before the card leaves the buffer.
    pub fn dispatch(&mut self, event: InteractionEvent, now: Instant) -> Option<DecisionRecord> {
        self.advance(now);
        if self.is_exiting() {
            tracing::trace!(event = ?event, "Ignoring input during exit");
            return None;
        }
        let movie = self.buffer.front()?;

        let current = self.top_transform(now);
        let (decision, effect) = self.interaction.apply(event, &self.config);

        match effect {
            Some(Effect::StartExit(direction)) => {
                let rotation =
                    rand::thread_rng().gen_range(-EXIT_MAX_ROTATION..=EXIT_MAX_ROTATION);
                self.animation = Some(Animation {
                    kind: AnimationKind::Exit(direction),
                    from: current,
                    to: CardTransform::exit_target(direction, rotation, &self.config),
                    started_at: now,
                    duration: EXIT_DURATION,
                });
            }
            Some(Effect::Flip) => {
                self.animation = Some(Animation {
                    kind: AnimationKind::Flip,
                    from: current,
                    to: CardTransform::flipped(),
                    started_at: now,
                    duration: FLIP_DURATION,
                });
            }
            Some(Effect::Unflip) => {
                self.animation = Some(Animation {
                    kind: AnimationKind::Unflip,
                    from: current,
                    to: CardTransform::default(),
                    started_at: now,
                    duration: FLIP_DURATION,
                });
            }
            Some(Effect::SnapBack) | None => {}
        }

        let record = DecisionRecord::new(movie, decision?);
        tracing::info!(
            movie_id = %record.movie.id,
            decision = ?record.decision,
            "Card decision"
        );

        if let Some(sink) = &self.decisions {
            if sink.send(record.clone()).is_err() {
                tracing::warn!(movie_id = %record.movie.id, "Decision sink closed");
            }
        }

        Some(record)
    }

    /// Applies the completion of an animation whose deadline has passed
    ///
    /// Returns `true` when a completion was applied. A finished exit pops the
    /// buffer and resets the interaction for the new top card.
    pub fn advance(&mut self, now: Instant) -> bool {
        let Some(animation) = self.animation else {
            return false;
        };
        if now < animation.deadline() {
            return false;
        }

        self.animation = None;
        if let AnimationKind::Exit(direction) = animation.kind {
            let popped = self.buffer.pop_front();
            self.interaction
                .apply(InteractionEvent::ExitCompleted, &self.config);
            self.pointer = PointerTracker::new();
            tracing::debug!(
                movie_id = ?popped.map(|m| m.id),
                direction = ?direction,
                remaining = self.buffer.len(),
                "Exit completed"
            );
        }
        true
    }

    /// When the pending animation completes, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.animation.map(|a| a.deadline())
    }

    /// Waits out pending animations, applying each completion
    pub async fn settle(&mut self) {
        while let Some(deadline) = self.next_deadline() {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            self.advance(Instant::now());
        }
    }

    /// Transform of the front card at `now`
    pub fn top_transform(&self, now: Instant) -> CardTransform {
        match &self.animation {
            Some(animation) => animation.transform_at(now),
            None => CardTransform::resting(&self.interaction.state, &self.config),
        }
    }

    /// Face of the top card that accepts input at `now`
    ///
    /// Never both: the back face takes over only once a flip is past its
    /// halfway point. `None` while exiting or when there is no card.
    pub fn face(&self, now: Instant) -> Option<Face> {
        if self.is_exiting() || self.buffer.is_empty() {
            return None;
        }
        if self.top_transform(now).shows_back() {
            Some(Face::Back)
        } else {
            Some(Face::Front)
        }
    }

    pub fn visible_cards(&self, now: Instant) -> Vec<VisibleCard> {
        let exiting = self.is_exiting();
        self.buffer
            .peek(VISIBLE_CARDS)
            .into_iter()
            .enumerate()
            .map(|(slot, movie)| VisibleCard {
                movie,
                slot,
                z_index: (VISIBLE_CARDS - slot) as i32,
                transform: if slot == 0 {
                    self.top_transform(now)
                } else {
                    CardTransform::default()
                },
                interactive: slot == 0 && !exiting,
            })
            .collect()
    }

    pub fn view(&self, now: Instant) -> StackView {
        let cards = self.visible_cards(now);
        let status = self.buffer.status();

        if cards.is_empty() {
            return match status {
                BufferStatus::Failed(message) => StackView::Failed { message },
                BufferStatus::Loading => StackView::Loading,
                BufferStatus::Ready | BufferStatus::Empty => StackView::Empty,
            };
        }

        StackView::Cards {
            cards,
            loading_more: self.buffer.is_loading(),
            error: self.buffer.error(),
        }
    }

    /// Retry action of the error view
    pub async fn retry(&self) -> AppResult<usize> {
        self.buffer.retry().await
    }

    /// Tears the stack down; replenishments still in flight are discarded
    pub fn close(&self) {
        self.buffer.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Decision, MovieDetails, MovieId, MoviePage, Review};
    use crate::services::catalog::CatalogProvider;
    use chrono::NaiveDate;
    use std::sync::Arc;

    struct FixedCatalog {
        movies: Vec<Movie>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl CatalogProvider for FixedCatalog {
        async fn fetch_page(&self, _page: u32, _query: Option<&str>) -> AppResult<MoviePage> {
            unreachable!()
        }

        async fn fetch_details(&self, movie_id: MovieId) -> AppResult<MovieDetails> {
            Err(AppError::NotFound(movie_id.to_string()))
        }

        async fn fetch_random_batch(&self) -> AppResult<Vec<Movie>> {
            if self.fail {
                return Err(AppError::Network("status 502".to_string()));
            }
            Ok(self.movies.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn movie(id: u64) -> Movie {
        Movie {
            id: MovieId(id),
            title: format!("Movie {}", id),
            poster_path: format!("/{}.jpg", id),
            backdrop_path: None,
            rating: 7.7,
            release_date: NaiveDate::from_ymd_opt(2014, 11, 5).unwrap(),
            overview: String::new(),
            genre_ids: vec![],
            original_language: None,
        }
    }

    async fn stocked_stack(count: u64) -> CardStack {
        let catalog = Arc::new(FixedCatalog {
            movies: (1..=count).map(movie).collect(),
            fail: false,
        });
        let buffer = CardBuffer::new(catalog);
        buffer.ensure_stocked().await.unwrap();
        CardStack::new(buffer, GestureConfig::with_viewport(1000.0, 800.0))
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Slow horizontal drag from x=0 to `dx`, released at `t0 + hold`
    fn drag(stack: &mut CardStack, dx: f64, t0: Instant, hold: Duration) -> Option<DecisionRecord> {
        stack.pointer_down(0.0, 0.0, t0);
        stack.pointer_move(dx, 0.0, t0 + hold);
        stack.pointer_up(dx, 0.0, t0 + hold)
    }

    fn tap(stack: &mut CardStack, at: Instant) {
        stack.pointer_down(10.0, 10.0, at);
        assert_eq!(stack.pointer_up(10.0, 10.0, at + ms(10)), None);
    }

    #[tokio::test]
    async fn test_swipe_right_emits_watched_then_pops_after_exit() {
        let mut stack = stocked_stack(12).await;
        let t0 = Instant::now();

        // 251px over 2s: well under the velocity threshold
        let record = drag(&mut stack, 251.0, t0, ms(2000)).unwrap();
        assert_eq!(record.decision, Decision::Watched);
        assert_eq!(record.movie.id, MovieId(1));
        assert!(stack.is_exiting());
        assert_eq!(stack.buffer().len(), 12);

        let released = t0 + ms(2000);
        assert!(!stack.advance(released + ms(199)));
        assert!(stack.advance(released + EXIT_DURATION));

        assert!(!stack.is_exiting());
        assert_eq!(stack.buffer().front().unwrap().id, MovieId(2));
        assert_eq!(stack.interaction_state(), &InteractionState::Idle);
        assert_eq!(stack.top_transform(released + ms(300)), CardTransform::default());
    }

    #[tokio::test]
    async fn test_short_slow_drag_snaps_back() {
        let mut stack = stocked_stack(12).await;
        let t0 = Instant::now();

        // 249px at 0.1 px/ms
        assert_eq!(drag(&mut stack, 249.0, t0, ms(2490)), None);
        assert!(!stack.is_exiting());
        assert_eq!(stack.interaction_state(), &InteractionState::Idle);
        assert_eq!(stack.top_transform(t0 + ms(2500)), CardTransform::default());
        assert_eq!(stack.buffer().len(), 12);
    }

    #[tokio::test]
    async fn test_drag_feedback_follows_pointer() {
        let mut stack = stocked_stack(12).await;
        let t0 = Instant::now();

        stack.pointer_down(0.0, 0.0, t0);
        stack.pointer_move(-80.0, 0.0, t0 + ms(400));

        let transform = stack.top_transform(t0 + ms(400));
        assert_eq!(transform.x, -80.0);
        assert!((transform.rotate_z + 12.0).abs() < 1e-9);
        assert_eq!(transform.scale, 1.1);
    }

    #[tokio::test]
    async fn test_input_during_exit_is_ignored() {
        let mut stack = stocked_stack(12).await;
        let t0 = Instant::now();

        assert!(drag(&mut stack, -400.0, t0, ms(2000)).is_some());
        let during = t0 + ms(2050);
        assert_eq!(drag(&mut stack, 400.0, during, ms(10)), None);
        assert_eq!(stack.watch_later(during), None);

        let cards = stack.visible_cards(during);
        assert!(!cards[0].interactive);

        stack.advance(t0 + ms(2300));
        assert_eq!(stack.buffer().len(), 11);
        assert_eq!(stack.buffer().front().unwrap().id, MovieId(2));
    }

    #[tokio::test]
    async fn test_double_tap_flips_and_review_waits_for_back_face() {
        let mut stack = stocked_stack(12).await;
        let t0 = Instant::now();

        tap(&mut stack, t0);
        tap(&mut stack, t0 + ms(150));
        assert_eq!(stack.interaction_state(), &InteractionState::Flipped);

        // flip started when the second tap was released
        let flip_start = t0 + ms(160);
        assert_eq!(stack.face(flip_start + ms(100)), Some(Face::Front));
        stack.set_rating(4, flip_start + ms(100));
        assert_eq!(stack.interaction_state(), &InteractionState::Flipped);

        assert_eq!(stack.face(flip_start + ms(250)), Some(Face::Back));
        stack.set_rating(4, flip_start + ms(250));
        assert!(matches!(
            stack.interaction_state(),
            InteractionState::ReviewEditing(_)
        ));
    }

    #[tokio::test]
    async fn test_slow_taps_do_not_flip() {
        let mut stack = stocked_stack(12).await;
        let t0 = Instant::now();

        tap(&mut stack, t0);
        tap(&mut stack, t0 + ms(500));
        assert_eq!(stack.interaction_state(), &InteractionState::Idle);
        assert_eq!(stack.face(t0 + ms(600)), Some(Face::Front));
    }

    #[tokio::test]
    async fn test_review_flow_emits_one_reviewed_decision() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut stack = stocked_stack(12).await.with_decision_sink(tx);
        let t0 = Instant::now();

        tap(&mut stack, t0);
        tap(&mut stack, t0 + ms(100));
        let ready = t0 + ms(1000);
        assert!(stack.advance(ready));

        stack.edit_review("Great film", ready);
        assert!(!stack.can_submit_review());
        assert_eq!(stack.submit_review(ready), None);
        assert!(!stack.is_exiting());

        stack.set_rating(3, ready);
        assert!(stack.can_submit_review());
        let record = stack.submit_review(ready).unwrap();
        assert_eq!(
            record.decision,
            Decision::Reviewed(Review {
                rating: 3,
                text: "Great film".to_string()
            })
        );
        assert!(stack.is_exiting());
        assert_eq!(stack.top_transform(ready + EXIT_DURATION).x, 1000.0);
        assert_eq!(stack.submit_review(ready + ms(10)), None);

        let forwarded = rx.try_recv().unwrap();
        assert_eq!(forwarded.decision, record.decision);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_review_unflips() {
        let mut stack = stocked_stack(12).await;
        let t0 = Instant::now();

        tap(&mut stack, t0);
        tap(&mut stack, t0 + ms(100));
        let ready = t0 + ms(1000);

        stack.set_rating(5, ready);
        stack.cancel_review(ready);
        assert_eq!(stack.interaction_state(), &InteractionState::Idle);
        assert_eq!(stack.face(ready + ms(100)), Some(Face::Back));
        assert_eq!(stack.face(ready + FLIP_DURATION), Some(Face::Front));
        assert_eq!(stack.buffer().len(), 12);
    }

    #[tokio::test]
    async fn test_watch_later_exits_up() {
        let mut stack = stocked_stack(12).await;
        let t0 = Instant::now();

        let record = stack.watch_later(t0).unwrap();
        assert_eq!(record.decision, Decision::WatchLater);

        let end = stack.top_transform(t0 + EXIT_DURATION);
        assert_eq!((end.x, end.y), (0.0, -800.0));
    }

    #[tokio::test]
    async fn test_settle_applies_exit_completion() {
        let mut stack = stocked_stack(12).await;

        let now = Instant::now();
        stack.watch_later(now).unwrap();
        stack.settle().await;

        assert_eq!(stack.next_deadline(), None);
        assert_eq!(stack.buffer().front().unwrap().id, MovieId(2));
    }

    #[tokio::test]
    async fn test_visible_window_z_order() {
        let stack = stocked_stack(12).await;
        let cards = stack.visible_cards(Instant::now());

        assert_eq!(cards.len(), VISIBLE_CARDS);
        assert_eq!(
            cards.iter().map(|c| c.z_index).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );
        assert!(cards[0].interactive);
        assert!(!cards[1].interactive && !cards[2].interactive);
    }

    #[tokio::test]
    async fn test_empty_and_failed_views() {
        let empty = CardStack::new(
            CardBuffer::new(Arc::new(FixedCatalog {
                movies: vec![],
                fail: false,
            })),
            GestureConfig::with_viewport(1000.0, 800.0),
        );
        assert!(matches!(empty.view(Instant::now()), StackView::Empty));

        let failing = CardStack::new(
            CardBuffer::new(Arc::new(FixedCatalog {
                movies: vec![],
                fail: true,
            })),
            GestureConfig::with_viewport(1000.0, 800.0),
        );
        assert!(failing.retry().await.is_err());
        assert!(matches!(
            failing.view(Instant::now()),
            StackView::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_input_on_empty_stack_is_ignored() {
        let mut stack = CardStack::new(
            CardBuffer::new(Arc::new(FixedCatalog {
                movies: vec![],
                fail: false,
            })),
            GestureConfig::with_viewport(1000.0, 800.0),
        );
        let t0 = Instant::now();
        assert_eq!(drag(&mut stack, 600.0, t0, ms(100)), None);
        assert_eq!(stack.face(t0), None);
    }
}
