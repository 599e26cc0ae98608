//! Windowed pagination state machine.
//!
//! Keeps a three-page window (previous, current, next) over a page-numbered
//! collection and merges settled pages into a [`PageSlots`] arena.
//!
//! # Design Principles / 设计原则
//!
//! - **Pure**: `(state, event) -> (new_state, actions[])`, no I/O
//! - **Tagged fetches**: every request carries the [`WindowTag`] of the window
//!   position it was issued for; results with any other tag are dropped
//! - **Join barrier**: slots are written only after every issued request of the
//!   live position has settled
//!
//! ```text
//!            FilterChanged / Reset
//!   Idle ─────────────────────────▶ AwaitingWindow(tag)
//!                                     │  ▲        │
//!                          all settled│  │Visible │PageSettled (partial)
//!                                     ▼  │        ▼
//!                                   Merged(tag)  AwaitingWindow(tag)
//! ```

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::FetchError;
use super::model::{FilterParams, PageNumber, PageQuery, PageResult, Paginator};
use super::slots::PageSlots;
use super::snapshot::FeedSnapshot;
use super::status::FeedStatus;

/// Identifies the window position a request was issued for.
///
/// Tags increase strictly for the lifetime of a state, resets included, so a
/// tag also pins the filter generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowTag(u64);

impl WindowTag {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Position of a request inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowSlot {
    Previous,
    Current,
    Next,
}

impl WindowSlot {
    /// Page this slot covers when the window is centred on `current`.
    pub fn page_for(self, current: PageNumber) -> Option<PageNumber> {
        match self {
            Self::Previous => current.checked_sub(1).filter(|page| *page >= 1),
            Self::Current => Some(current),
            Self::Next => current.checked_add(1),
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Previous => 0,
            Self::Current => 1,
            Self::Next => 2,
        }
    }
}

/// Fetch issued for one slot of one window position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub tag: WindowTag,
    pub slot: WindowSlot,
    pub query: PageQuery,
}

/// Mirror of the latest trusted current-page paginator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageBounds {
    pub has_previous: bool,
    pub has_next: bool,
    pub total_items: u64,
    pub total_pages: u32,
}

impl Default for PageBounds {
    fn default() -> Self {
        Self {
            has_previous: false,
            has_next: false,
            total_items: 0,
            total_pages: 1,
        }
    }
}

impl From<&Paginator> for PageBounds {
    fn from(paginator: &Paginator) -> Self {
        Self {
            has_previous: paginator.has_previous,
            has_next: paginator.has_next,
            total_items: paginator.total_items,
            total_pages: paginator.total_pages,
        }
    }
}

pub type SlotOutcome<T> = Result<PageResult<T>, FetchError>;

/// Outcomes collected for one window position.
///
/// Slots that were skipped count as settled.
#[derive(Debug, Clone)]
pub struct WindowRound<T> {
    issued: [bool; 3],
    outcomes: [Option<SlotOutcome<T>>; 3],
}

impl<T> WindowRound<T> {
    fn new(slots: &[WindowSlot]) -> Self {
        let mut issued = [false; 3];
        for slot in slots {
            issued[slot.index()] = true;
        }
        Self {
            issued,
            outcomes: [None, None, None],
        }
    }

    pub fn is_issued(&self, slot: WindowSlot) -> bool {
        self.issued[slot.index()]
    }

    pub fn outcome(&self, slot: WindowSlot) -> Option<&SlotOutcome<T>> {
        self.outcomes[slot.index()].as_ref()
    }

    pub fn is_settled(&self) -> bool {
        self.issued
            .iter()
            .zip(self.outcomes.iter())
            .all(|(issued, outcome)| !issued || outcome.is_some())
    }

    /// First failure in current, previous, next order.
    pub fn first_failure(&self) -> Option<&FetchError> {
        [WindowSlot::Current, WindowSlot::Previous, WindowSlot::Next]
            .into_iter()
            .find_map(|slot| match self.outcome(slot) {
                Some(Err(err)) => Some(err),
                _ => None,
            })
    }

    fn success(&self, slot: WindowSlot) -> Option<&PageResult<T>> {
        match self.outcome(slot) {
            Some(Ok(page)) => Some(page),
            _ => None,
        }
    }

    fn record(&mut self, slot: WindowSlot, outcome: SlotOutcome<T>) -> bool {
        let index = slot.index();
        if !self.issued[index] || self.outcomes[index].is_some() {
            return false;
        }
        self.outcomes[index] = Some(outcome);
        true
    }
}

#[derive(Debug, Clone)]
pub enum WindowPhase<T> {
    /// No filter yet; nothing is fetched.
    Idle,
    /// Requests for the position `tag` are in flight.
    AwaitingWindow { tag: WindowTag, round: WindowRound<T> },
    /// Every request for `tag` settled and was merged.
    Merged { tag: WindowTag },
}

/// Inputs of the state machine.
///
/// 驱动窗口状态机的事件。
#[derive(Debug, Clone)]
pub enum WindowEvent<T> {
    /// The collection selector changed (or became available).
    FilterChanged(Option<FilterParams>),
    /// Explicit reset signal; keeps the filter.
    Reset,
    /// The container of `page` crossed the viewport midpoint.
    Visible { page: PageNumber },
    /// A request settled.
    PageSettled {
        tag: WindowTag,
        slot: WindowSlot,
        page: PageNumber,
        outcome: SlotOutcome<T>,
    },
    /// Re-issue the window for the current position.
    Retry,
}

/// Side-effects produced by transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowAction {
    FetchPage(PageRequest),
    /// Observable state (exposed pages, bounds or status) changed.
    Publish,
}

/// Live state of one feed.
#[derive(Debug, Clone)]
pub struct WindowState<T> {
    phase: WindowPhase<T>,
    filter: Option<FilterParams>,
    page_size: u32,
    current_page: PageNumber,
    bounds: PageBounds,
    slots: PageSlots<T>,
    transitioned_since_reset: bool,
    last_tag: u64,
    revision: u64,
    stale_discards: u64,
    status: FeedStatus,
}

impl<T> WindowState<T> {
    pub fn new(page_size: u32) -> Self {
        Self {
            phase: WindowPhase::Idle,
            filter: None,
            page_size: page_size.max(1),
            current_page: 1,
            bounds: PageBounds::default(),
            slots: PageSlots::new(),
            transitioned_since_reset: false,
            last_tag: 0,
            revision: 0,
            stale_discards: 0,
            status: FeedStatus::Loading,
        }
    }

    pub fn phase(&self) -> &WindowPhase<T> {
        &self.phase
    }

    pub fn filter(&self) -> Option<&FilterParams> {
        self.filter.as_ref()
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn current_page(&self) -> PageNumber {
        self.current_page
    }

    pub fn bounds(&self) -> PageBounds {
        self.bounds
    }

    pub fn slots(&self) -> &PageSlots<T> {
        &self.slots
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Results dropped because their tag no longer matched.
    pub fn stale_discards(&self) -> u64 {
        self.stale_discards
    }

    pub fn active_tag(&self) -> Option<WindowTag> {
        match &self.phase {
            WindowPhase::Idle => None,
            WindowPhase::AwaitingWindow { tag, .. } | WindowPhase::Merged { tag } => Some(*tag),
        }
    }

    pub fn exposed_items(&self) -> impl Iterator<Item = &T> {
        self.slots.contiguous_items()
    }

    pub fn snapshot(&self) -> FeedSnapshot<T> {
        FeedSnapshot::from(self)
    }

    fn next_tag(&mut self) -> WindowTag {
        self.last_tag += 1;
        WindowTag(self.last_tag)
    }

    /// Slots to request for the current position, current first.
    fn window_slots(&self) -> Vec<WindowSlot> {
        let mut slots = vec![WindowSlot::Current];
        if self.bounds.has_previous && self.current_page > 1 {
            slots.push(WindowSlot::Previous);
        }
        if self.bounds.has_next && self.current_page < self.bounds.total_pages {
            slots.push(WindowSlot::Next);
        }
        slots
    }
}

#[derive(Default)]
struct Effects {
    actions: Vec<WindowAction>,
    changed: bool,
}

/// Pure windowed pagination state machine.
///
/// 纯状态机：不包含副作用。
pub struct WindowStateMachine;

impl WindowStateMachine {
    pub fn transition<T: PartialEq>(
        mut state: WindowState<T>,
        event: WindowEvent<T>,
    ) -> (WindowState<T>, Vec<WindowAction>) {
        let mut fx = Effects::default();

        match event {
            WindowEvent::FilterChanged(filter) => {
                if state.filter != filter {
                    state.filter = filter;
                    Self::reset(&mut state, &mut fx);
                }
            }
            WindowEvent::Reset => Self::reset(&mut state, &mut fx),
            WindowEvent::Visible { page } => Self::visible(&mut state, page, &mut fx),
            WindowEvent::PageSettled {
                tag,
                slot,
                page,
                outcome,
            } => Self::settle(&mut state, tag, slot, page, outcome, &mut fx),
            WindowEvent::Retry => {
                if state.filter.is_some() {
                    Self::open_round(&mut state, &mut fx);
                }
            }
        }

        if fx.changed {
            state.revision += 1;
            fx.actions.push(WindowAction::Publish);
        }
        (state, fx.actions)
    }

    fn reset<T>(state: &mut WindowState<T>, fx: &mut Effects) {
        state.slots.clear();
        state.current_page = 1;
        state.bounds = PageBounds::default();
        state.transitioned_since_reset = false;
        state.phase = WindowPhase::Idle;
        state.status = FeedStatus::Loading;
        fx.changed = true;

        if state.filter.is_some() {
            Self::open_round(state, fx);
        }
    }

    fn visible<T>(state: &mut WindowState<T>, page: PageNumber, fx: &mut Effects) {
        if matches!(state.phase, WindowPhase::Idle) {
            return;
        }
        if page == 0 || page == state.current_page || page > state.bounds.total_pages {
            debug!(
                page,
                current = state.current_page,
                total_pages = state.bounds.total_pages,
                "visibility ignored"
            );
            return;
        }

        // The first move after a reset keeps the bootstrap bounds; later moves
        // wait for the new current page before prefetching neighbours.
        if state.transitioned_since_reset {
            state.bounds.has_previous = false;
            state.bounds.has_next = false;
        } else {
            state.transitioned_since_reset = true;
        }

        debug!(from = state.current_page, to = page, "window moved");
        state.current_page = page;
        fx.changed = true;
        Self::open_round(state, fx);
    }

    fn open_round<T>(state: &mut WindowState<T>, fx: &mut Effects) {
        let Some(filter) = state.filter.clone() else {
            state.phase = WindowPhase::Idle;
            return;
        };

        let tag = state.next_tag();
        let slots = state.window_slots();
        for slot in &slots {
            if let Some(page) = slot.page_for(state.current_page) {
                fx.actions.push(WindowAction::FetchPage(PageRequest {
                    tag,
                    slot: *slot,
                    query: PageQuery::new(filter.clone(), page, state.page_size),
                }));
            }
        }

        debug!(%tag, page = state.current_page, ?slots, "window round opened");
        state.phase = WindowPhase::AwaitingWindow {
            tag,
            round: WindowRound::new(&slots),
        };
        Self::set_status(state, FeedStatus::Loading, fx);
    }

    fn settle<T: PartialEq>(
        state: &mut WindowState<T>,
        tag: WindowTag,
        slot: WindowSlot,
        page: PageNumber,
        outcome: SlotOutcome<T>,
        fx: &mut Effects,
    ) {
        let current_page = state.current_page;
        let accepted = match &mut state.phase {
            WindowPhase::AwaitingWindow { tag: live, round }
                if *live == tag && slot.page_for(current_page) == Some(page) =>
            {
                round.record(slot, outcome)
            }
            _ => false,
        };

        if !accepted {
            state.stale_discards += 1;
            debug!(%tag, ?slot, page, "stale page result discarded");
            return;
        }

        let status = match &state.phase {
            WindowPhase::AwaitingWindow { round, .. } => {
                if let Some(Err(err)) = round.outcome(slot) {
                    warn!(%tag, ?slot, page, error = %err, "page fetch failed");
                }
                if round.is_settled() {
                    None
                } else {
                    Some(derive_status(round, true))
                }
            }
            _ => return,
        };

        if let Some(status) = status {
            Self::set_status(state, status, fx);
            return;
        }

        let WindowPhase::AwaitingWindow { tag, round } =
            std::mem::replace(&mut state.phase, WindowPhase::Idle)
        else {
            return;
        };
        Self::merge(state, tag, round, fx);
    }

    fn merge<T: PartialEq>(
        state: &mut WindowState<T>,
        tag: WindowTag,
        round: WindowRound<T>,
        fx: &mut Effects,
    ) {
        let current_page = state.current_page;
        let status = derive_status(&round, false);
        let issued = round.issued;
        let [previous, current, next] = round.outcomes;

        let mut trusted = false;
        if let Some(Ok(current)) = current {
            if current.paginator.page == current_page {
                trusted = true;
                let paginator = current.paginator;
                fx.changed |= state.slots.insert(current_page, current.items);

                if paginator.has_previous {
                    if let Some(Ok(previous)) = previous {
                        if previous.paginator.page + 1 == current_page {
                            fx.changed |= state.slots.insert(current_page - 1, previous.items);
                        }
                    }
                }
                if paginator.has_next {
                    if let Some(Ok(next)) = next {
                        if next.paginator.page == current_page + 1 {
                            fx.changed |= state.slots.insert(current_page + 1, next.items);
                        }
                    }
                }

                let bounds = PageBounds::from(&paginator);
                if state.bounds != bounds {
                    state.bounds = bounds;
                    fx.changed = true;
                }
            } else {
                warn!(
                    %tag,
                    expected = current_page,
                    got = current.paginator.page,
                    "current page result reports another page, not merged"
                );
            }
        }

        info!(
            %tag,
            page = current_page,
            exposed_pages = state.slots.contiguous_len(),
            "window merged"
        );

        // Fresh bounds can reveal a neighbour that was skipped for this round.
        if trusted
            && state
                .window_slots()
                .iter()
                .any(|slot| !issued[slot.index()])
        {
            Self::open_round(state, fx);
            return;
        }

        state.phase = WindowPhase::Merged { tag };
        Self::set_status(state, status, fx);
    }

    fn set_status<T>(state: &mut WindowState<T>, status: FeedStatus, fx: &mut Effects) {
        if state.status != status {
            state.status = status;
            fx.changed = true;
        }
    }
}

/// Status for a round, from whatever has settled so far.
///
/// Empty and end-of-list messages win over failures, failures win over pending
/// requests. The current page's end message is checked before the next page's.
fn derive_status<T>(round: &WindowRound<T>, pending: bool) -> FeedStatus {
    if let Some(current) = round.success(WindowSlot::Current) {
        let paginator = &current.paginator;
        if paginator.total_items == 0 {
            if let Some(message) = &current.message {
                return FeedStatus::empty(message.clone());
            }
        }

        if paginator.total_items > 0 && !paginator.has_next && current.message.is_some() {
            if let Some(message) = &current.message {
                return FeedStatus::end(message.clone());
            }
        } else if paginator.total_items > 0 {
            if let Some(next) = round.success(WindowSlot::Next) {
                if !next.paginator.has_next {
                    if let Some(message) = &next.message {
                        return FeedStatus::end(message.clone());
                    }
                }
            }
        }
    }

    if let Some(err) = round.first_failure() {
        return FeedStatus::error(err.user_message());
    }

    if pending {
        FeedStatus::Loading
    } else {
        FeedStatus::ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::StatusIcon;

    const END: &str = "There are no more polls.";
    const EMPTY: &str = "Polls not found.";

    /// Server-side view of a numbered collection: item `n` is the integer `n`.
    struct Collection {
        total: u64,
        page_size: u32,
    }

    impl Collection {
        fn new(total: u64, page_size: u32) -> Self {
            Self { total, page_size }
        }

        fn page(&self, page: PageNumber) -> PageResult<u64> {
            let paginator = Paginator::for_page(page, self.total, self.page_size);
            let start = u64::from(paginator.page - 1) * u64::from(self.page_size) + 1;
            let end = (start + u64::from(self.page_size) - 1).min(self.total);
            let items = (start..=end).collect();
            let result = PageResult::new(items, paginator);
            if self.total == 0 {
                result.with_message(EMPTY)
            } else if !paginator.has_next {
                result.with_message(END)
            } else {
                result
            }
        }
    }

    fn filter() -> FilterParams {
        FilterParams::new().with("user", "7")
    }

    fn requests(actions: &[WindowAction]) -> Vec<PageRequest> {
        actions
            .iter()
            .filter_map(|action| match action {
                WindowAction::FetchPage(request) => Some(request.clone()),
                WindowAction::Publish => None,
            })
            .collect()
    }

    fn pages(requests: &[PageRequest]) -> Vec<(WindowSlot, PageNumber)> {
        requests
            .iter()
            .map(|request| (request.slot, request.query.page))
            .collect()
    }

    fn settled(request: &PageRequest, outcome: SlotOutcome<u64>) -> WindowEvent<u64> {
        WindowEvent::PageSettled {
            tag: request.tag,
            slot: request.slot,
            page: request.query.page,
            outcome,
        }
    }

    /// Resolves every issued request (and any follow-up round) from `collection`.
    fn drain(
        mut state: WindowState<u64>,
        mut pending: Vec<PageRequest>,
        collection: &Collection,
    ) -> (WindowState<u64>, Vec<Vec<(WindowSlot, PageNumber)>>) {
        let mut rounds = Vec::new();
        while !pending.is_empty() {
            rounds.push(pages(&pending));
            let mut next_round = Vec::new();
            for request in pending {
                let outcome = Ok(collection.page(request.query.page));
                let (next, actions) =
                    WindowStateMachine::transition(state, settled(&request, outcome));
                state = next;
                next_round.extend(requests(&actions));
            }
            pending = next_round;
        }
        (state, rounds)
    }

    fn start(collection: &Collection) -> WindowState<u64> {
        let state = WindowState::new(collection.page_size);
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::FilterChanged(Some(filter())));
        drain(state, requests(&actions), collection).0
    }

    fn visit(
        state: WindowState<u64>,
        page: PageNumber,
        collection: &Collection,
    ) -> (WindowState<u64>, Vec<Vec<(WindowSlot, PageNumber)>>) {
        let (state, actions) = WindowStateMachine::transition(state, WindowEvent::Visible { page });
        drain(state, requests(&actions), collection)
    }

    fn exposed(state: &WindowState<u64>) -> Vec<u64> {
        state.exposed_items().copied().collect()
    }

    #[test]
    fn window_state_machine_idle_until_filter_arrives() {
        let state: WindowState<u64> = WindowState::new(4);
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 2 });
        assert!(actions.is_empty());
        assert!(matches!(state.phase(), WindowPhase::Idle));
        assert!(state.status().is_loading());

        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::FilterChanged(Some(filter())));
        assert_eq!(pages(&requests(&actions)), vec![(WindowSlot::Current, 1)]);
        assert!(actions.contains(&WindowAction::Publish));
        assert!(matches!(state.phase(), WindowPhase::AwaitingWindow { .. }));
    }

    #[test]
    fn window_state_machine_bootstrap_prefetches_second_page() {
        let collection = Collection::new(10, 4);
        let state = WindowState::new(4);
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::FilterChanged(Some(filter())));
        let (state, rounds) = drain(state, requests(&actions), &collection);

        assert_eq!(
            rounds,
            vec![
                vec![(WindowSlot::Current, 1)],
                vec![(WindowSlot::Current, 1), (WindowSlot::Next, 2)],
            ]
        );
        assert_eq!(exposed(&state), (1..=8).collect::<Vec<_>>());
        assert_eq!(state.status(), &FeedStatus::ready());
        assert!(matches!(state.phase(), WindowPhase::Merged { .. }));
    }

    #[test]
    fn window_state_machine_ten_items_in_pages_of_four_reach_end() {
        let collection = Collection::new(10, 4);
        let state = start(&collection);

        let (state, _) = visit(state, 2, &collection);
        assert_eq!(exposed(&state), (1..=10).collect::<Vec<_>>());

        let (state, rounds) = visit(state, 3, &collection);
        assert!(rounds
            .iter()
            .flatten()
            .all(|(slot, _)| *slot != WindowSlot::Next));
        assert!(!state.bounds().has_next);
        assert_eq!(state.bounds().total_pages, 3);
        assert_eq!(exposed(&state), (1..=10).collect::<Vec<_>>());
        assert_eq!(state.status(), &FeedStatus::end(END));
        assert_eq!(state.status().icon(), Some(StatusIcon::End));
    }

    #[test]
    fn window_state_machine_monotonic_scroll_exposes_each_item_once() {
        let collection = Collection::new(23, 5);
        let mut state = start(&collection);
        for page in 2..=5 {
            state = visit(state, page, &collection).0;
        }
        assert_eq!(exposed(&state), (1..=23).collect::<Vec<_>>());
        assert!(state.status().is_terminal());
    }

    #[test]
    fn window_state_machine_first_move_keeps_bounds_later_moves_clear_them() {
        let collection = Collection::new(40, 4);
        let state = start(&collection);

        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 2 });
        assert_eq!(
            pages(&requests(&actions)),
            vec![(WindowSlot::Current, 2), (WindowSlot::Next, 3)]
        );
        let (state, _) = drain(state, requests(&actions), &collection);

        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 3 });
        assert_eq!(pages(&requests(&actions)), vec![(WindowSlot::Current, 3)]);
        assert!(!state.bounds().has_previous);
        assert!(!state.bounds().has_next);

        let (state, rounds) = drain(state, requests(&actions), &collection);
        assert_eq!(
            rounds[1],
            vec![
                (WindowSlot::Current, 3),
                (WindowSlot::Previous, 2),
                (WindowSlot::Next, 4)
            ]
        );
        assert_eq!(exposed(&state), (1..=16).collect::<Vec<_>>());
    }

    #[test]
    fn window_state_machine_discards_results_of_abandoned_position() {
        let collection = Collection::new(40, 4);
        let state = start(&collection);
        let state = visit(state, 2, &collection).0;

        let (state, to_three) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 3 });
        let stale = requests(&to_three);
        let (mut state, to_two) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 2 });
        let live = requests(&to_two);
        let before = exposed(&state);

        // Late answers for position 3 carry content that must never land.
        for request in &stale {
            let mut bogus = collection.page(request.query.page);
            bogus.items = vec![999];
            let (next, actions) =
                WindowStateMachine::transition(state, settled(request, Ok(bogus)));
            state = next;
            assert!(actions.is_empty());
        }
        assert_eq!(state.stale_discards(), stale.len() as u64);
        assert_eq!(exposed(&state), before);

        let (state, _) = drain(state, live, &collection);
        assert_eq!(state.current_page(), 2);
        assert!(!exposed(&state).contains(&999));
        assert_eq!(exposed(&state), (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn window_state_machine_failed_middle_page_keeps_later_page_hidden() {
        let collection = Collection::new(12, 4);
        let state = start(&collection);
        assert_eq!(exposed(&state), (1..=8).collect::<Vec<_>>());

        let state = {
            // Drop page 2 so the failure leaves a real gap.
            let mut fresh = WindowState::new(4);
            fresh.filter = state.filter.clone();
            fresh.phase = WindowPhase::Merged {
                tag: state.active_tag().unwrap(),
            };
            fresh.last_tag = state.last_tag;
            fresh.bounds = state.bounds();
            fresh.slots.insert(1, collection.page(1).items);
            fresh.status = FeedStatus::ready();
            fresh
        };

        let (mut state, actions) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 2 });
        for request in requests(&actions) {
            let outcome = if request.query.page == 2 {
                Err(FetchError::Server {
                    status: 500,
                    message: "Something went wrong.".into(),
                })
            } else {
                Ok(collection.page(request.query.page))
            };
            state = WindowStateMachine::transition(state, settled(&request, outcome)).0;
        }

        assert_eq!(exposed(&state), (1..=4).collect::<Vec<_>>());
        assert!(!state.slots().contains(3));
        assert_eq!(state.status(), &FeedStatus::error("Something went wrong."));
        assert!(matches!(state.phase(), WindowPhase::Merged { .. }));
    }

    #[test]
    fn window_state_machine_failure_surfaces_before_round_settles() {
        let collection = Collection::new(40, 4);
        let state = start(&collection);
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 2 });
        let issued = requests(&actions);
        let next = issued
            .iter()
            .find(|request| request.slot == WindowSlot::Next)
            .unwrap();

        let (state, actions) = WindowStateMachine::transition(
            state,
            settled(next, Err(FetchError::Transport("connection reset".into()))),
        );
        assert!(actions.contains(&WindowAction::Publish));
        assert_eq!(
            state.status(),
            &FeedStatus::error("transport error: connection reset")
        );
        assert!(matches!(state.phase(), WindowPhase::AwaitingWindow { .. }));
    }

    #[test]
    fn window_state_machine_empty_collection_is_ready_with_empty_message() {
        let collection = Collection::new(0, 10);
        let state = start(&collection);

        assert_eq!(state.status(), &FeedStatus::empty(EMPTY));
        assert_eq!(state.status().icon(), Some(StatusIcon::Empty));
        assert_eq!(state.exposed_items().count(), 0);
        assert!(matches!(state.phase(), WindowPhase::Merged { .. }));
    }

    #[test]
    fn window_state_machine_ignores_visibility_beyond_last_page() {
        let collection = Collection::new(10, 4);
        let state = start(&collection);
        let revision = state.revision();

        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 4 });
        assert!(actions.is_empty());
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 1 });
        assert!(actions.is_empty());
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 0 });
        assert!(actions.is_empty());
        assert_eq!(state.revision(), revision);
    }

    #[test]
    fn window_state_machine_duplicate_settle_is_ignored() {
        let collection = Collection::new(10, 4);
        let state = WindowState::new(4);
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::FilterChanged(Some(filter())));
        let request = requests(&actions).remove(0);

        let (state, _) = WindowStateMachine::transition(
            state,
            settled(&request, Ok(collection.page(1))),
        );
        let revision = state.revision();
        let (state, actions) = WindowStateMachine::transition(
            state,
            settled(&request, Ok(collection.page(1))),
        );
        assert!(actions.is_empty());
        assert_eq!(state.revision(), revision);
        assert_eq!(state.stale_discards(), 1);
    }

    #[test]
    fn window_state_machine_remerging_same_pages_keeps_sequence() {
        let collection = Collection::new(10, 4);
        let state = start(&collection);
        let before = exposed(&state);

        let (state, actions) = WindowStateMachine::transition(state, WindowEvent::Retry);
        let (state, _) = drain(state, requests(&actions), &collection);
        assert_eq!(exposed(&state), before);
        assert_eq!(state.slots().len(), 2);
    }

    #[test]
    fn window_state_machine_reset_drops_in_flight_results() {
        let collection = Collection::new(10, 4);
        let state = start(&collection);
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::Visible { page: 2 });
        let in_flight = requests(&actions);

        let other = FilterParams::new().with("category", "sports");
        let (mut state, actions) =
            WindowStateMachine::transition(state, WindowEvent::FilterChanged(Some(other)));
        assert_eq!(pages(&requests(&actions)), vec![(WindowSlot::Current, 1)]);
        assert_eq!(state.current_page(), 1);
        assert!(state.slots().is_empty());

        for request in &in_flight {
            let outcome = Ok(collection.page(request.query.page));
            state = WindowStateMachine::transition(state, settled(request, outcome)).0;
        }
        assert!(state.slots().is_empty());
        assert!(state.status().is_loading());
    }

    #[test]
    fn window_state_machine_reset_is_idempotent() {
        let collection = Collection::new(10, 4);
        let state = start(&collection);

        let (state, first) = WindowStateMachine::transition(state, WindowEvent::Reset);
        let (state, second) = WindowStateMachine::transition(state, WindowEvent::Reset);
        assert_eq!(pages(&requests(&first)), pages(&requests(&second)));
        assert!(state.slots().is_empty());
        assert_eq!(state.current_page(), 1);
        assert_eq!(state.bounds(), PageBounds::default());
        assert!(state.status().is_loading());
    }

    #[test]
    fn window_state_machine_same_filter_is_no_op() {
        let collection = Collection::new(10, 4);
        let state = start(&collection);
        let revision = state.revision();
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::FilterChanged(Some(filter())));
        assert!(actions.is_empty());
        assert_eq!(state.revision(), revision);
    }

    #[test]
    fn window_state_machine_clearing_filter_returns_to_idle() {
        let collection = Collection::new(10, 4);
        let state = start(&collection);
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::FilterChanged(None));
        assert!(requests(&actions).is_empty());
        assert!(matches!(state.phase(), WindowPhase::Idle));
        assert!(state.slots().is_empty());
    }

    #[test]
    fn window_state_machine_next_page_end_message_applies_mid_window() {
        let collection = Collection::new(10, 4);
        let state = start(&collection);
        let (state, _) = visit(state, 2, &collection);

        // Page 2 still has a next page, but page 3 is the tail and carries the message.
        assert!(state.bounds().has_next);
        assert_eq!(state.status(), &FeedStatus::end(END));
    }

    #[test]
    fn window_state_machine_retry_reissues_after_failure() {
        let collection = Collection::new(10, 4);
        let state = WindowState::new(4);
        let (state, actions) =
            WindowStateMachine::transition(state, WindowEvent::FilterChanged(Some(filter())));
        let request = requests(&actions).remove(0);
        let (state, _) = WindowStateMachine::transition(
            state,
            settled(&request, Err(FetchError::Transport("offline".into()))),
        );
        assert!(matches!(state.status(), FeedStatus::Error { .. }));

        let (state, actions) = WindowStateMachine::transition(state, WindowEvent::Retry);
        let retried = requests(&actions);
        assert_eq!(pages(&retried), vec![(WindowSlot::Current, 1)]);
        assert_ne!(retried[0].tag, request.tag);

        let (state, _) = drain(state, retried, &collection);
        assert_eq!(exposed(&state), (1..=8).collect::<Vec<_>>());
        assert_eq!(state.status(), &FeedStatus::ready());
    }
}
