//! Page-flip sequencer.
//!
//! A turn has two observable edges: [`Renderer::begin_transition`] when it
//! starts and [`Renderer::end_transition`] once its full duration has elapsed
//! on the caller's clock. The position and the content underneath change at
//! the start; the animation in between is purely cosmetic. Requests arriving
//! while a transition is in flight are dropped.

use inkfolio_core::{Direction, LayoutMode, Page, Settings};

/// Page indices visible at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct View {
    pub position: usize,
    pub left: Option<usize>,
    pub right: Option<usize>,
    /// Four-slot layout only: previous spread's right page.
    pub under_left: Option<usize>,
    /// Four-slot layout only: next spread's left page.
    pub under_right: Option<usize>,
}

impl View {
    pub fn at(layout: LayoutMode, position: usize, page_count: usize) -> Self {
        let page = |index: usize| (index < page_count).then_some(index);
        match layout {
            LayoutMode::Single => Self {
                position,
                right: page(position),
                ..Self::default()
            },
            LayoutMode::Spread => Self {
                position,
                left: page(position * 2),
                right: page(position * 2 + 1),
                ..Self::default()
            },
            LayoutMode::FourSlot => Self {
                position,
                left: page(position * 2),
                right: page(position * 2 + 1),
                under_left: position.checked_sub(1).and_then(|prev| page(prev * 2 + 1)),
                under_right: page(position * 2 + 2),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Turn,
    Jump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub direction: Direction,
    pub from: View,
    pub to: View,
    pub started_at_ms: u64,
    pub duration_ms: u64,
}

impl Transition {
    pub fn ends_at_ms(&self) -> u64 {
        self.started_at_ms.saturating_add(self.duration_ms)
    }

    pub fn is_complete(&self, now_ms: u64) -> bool {
        now_ms >= self.ends_at_ms()
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now_ms: u64) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms.saturating_sub(self.started_at_ms);
        (elapsed as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
    }

    pub fn eased_progress(&self, now_ms: u64) -> f32 {
        ease_in_out(self.progress(now_ms))
    }
}

pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipState {
    Idle,
    Turning(Transition),
}

/// Presentation side of the sequencer. Each call is one batch of drawing
/// work; the sequencer never calls more than one per operation.
pub trait Renderer {
    fn present(&mut self, view: &View, pages: &[Page]);
    fn begin_transition(&mut self, transition: &Transition, pages: &[Page]);
    fn end_transition(&mut self, view: &View, pages: &[Page]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipTiming {
    pub flip_ms: u64,
    pub jump_ms: u64,
}

impl Default for FlipTiming {
    fn default() -> Self {
        Self {
            flip_ms: 800,
            jump_ms: 400,
        }
    }
}

impl FlipTiming {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            flip_ms: settings.flip_ms,
            jump_ms: settings.jump_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlipSequencer {
    pages: Vec<Page>,
    layout: LayoutMode,
    timing: FlipTiming,
    position: usize,
    state: FlipState,
}

impl FlipSequencer {
    pub fn new(pages: Vec<Page>, layout: LayoutMode, timing: FlipTiming) -> Self {
        Self {
            pages,
            layout,
            timing,
            position: 0,
            state: FlipState::Idle,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn timing(&self) -> FlipTiming {
        self.timing
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn last_position(&self) -> usize {
        self.layout
            .position_count(self.pages.len())
            .saturating_sub(1)
    }

    pub fn state(&self) -> &FlipState {
        &self.state
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state, FlipState::Turning(_))
    }

    pub fn transition(&self) -> Option<&Transition> {
        match &self.state {
            FlipState::Turning(transition) => Some(transition),
            FlipState::Idle => None,
        }
    }

    pub fn view(&self) -> View {
        View::at(self.layout, self.position, self.pages.len())
    }

    pub fn start<R: Renderer>(&self, renderer: &mut R) {
        renderer.present(&self.view(), &self.pages);
    }

    pub fn can_turn(&self, direction: Direction) -> bool {
        if self.is_animating() {
            return false;
        }
        match direction {
            Direction::Backward => self.position > 0,
            Direction::Forward => self.position < self.last_position(),
        }
    }

    /// Turns by one page or spread. Returns `false` when the request is
    /// dropped: mid-transition or at the matching boundary.
    pub fn turn<R: Renderer>(
        &mut self,
        direction: Direction,
        now_ms: u64,
        renderer: &mut R,
    ) -> bool {
        if !self.can_turn(direction) {
            log::trace!("turn {direction} ignored at position {}", self.position);
            return false;
        }
        let target = match direction {
            Direction::Forward => self.position + 1,
            Direction::Backward => self.position - 1,
        };
        let duration_ms = self.timing.flip_ms;
        self.begin(TransitionKind::Turn, direction, target, duration_ms, now_ms, renderer);
        true
    }

    /// Moves straight to `target` as one accelerated transition.
    pub fn jump_to<R: Renderer>(&mut self, target: usize, now_ms: u64, renderer: &mut R) -> bool {
        if self.is_animating() || target == self.position || target > self.last_position() {
            log::trace!("jump to {target} ignored at position {}", self.position);
            return false;
        }
        let direction = if target > self.position {
            Direction::Forward
        } else {
            Direction::Backward
        };
        let duration_ms = self.timing.jump_ms;
        self.begin(TransitionKind::Jump, direction, target, duration_ms, now_ms, renderer);
        true
    }

    /// Completes the in-flight transition once its duration has elapsed.
    /// Returns `true` when it did.
    pub fn tick<R: Renderer>(&mut self, now_ms: u64, renderer: &mut R) -> bool {
        let FlipState::Turning(transition) = self.state else {
            return false;
        };
        if !transition.is_complete(now_ms) {
            return false;
        }
        self.state = FlipState::Idle;
        renderer.end_transition(&transition.to, &self.pages);
        true
    }

    /// Switches layout while idle, keeping the first visible page on screen.
    pub fn relayout<R: Renderer>(&mut self, layout: LayoutMode, renderer: &mut R) -> bool {
        if self.is_animating() || layout == self.layout {
            return false;
        }
        let first_page = self.position * self.layout.pages_per_position();
        self.layout = layout;
        self.position = (first_page / layout.pages_per_position()).min(self.last_position());
        log::debug!("relayout to {layout} at position {}", self.position);
        renderer.present(&self.view(), &self.pages);
        true
    }

    /// Position at which `page_index` is on screen.
    pub fn page_position(&self, page_index: usize) -> Option<usize> {
        (page_index < self.pages.len()).then(|| page_index / self.layout.pages_per_position())
    }

    /// Footer text for the current position. In single layout the cover and
    /// the index page facing it both read "Cover".
    pub fn label(&self) -> String {
        let cover_positions = match self.layout {
            LayoutMode::Single => 2,
            LayoutMode::Spread | LayoutMode::FourSlot => 1,
        };
        if self.position < cover_positions {
            return "Cover".to_string();
        }
        let view = self.view();
        match (view.left, view.right) {
            (Some(left), Some(right)) => format!("Pages {}-{}", left + 1, right + 1),
            (Some(page), None) | (None, Some(page)) if self.layout == LayoutMode::Single => {
                format!("Page {} of {}", page + 1, self.pages.len())
            }
            (Some(page), None) | (None, Some(page)) => format!("Page {}", page + 1),
            (None, None) => String::new(),
        }
    }

    fn begin<R: Renderer>(
        &mut self,
        kind: TransitionKind,
        direction: Direction,
        target: usize,
        duration_ms: u64,
        now_ms: u64,
        renderer: &mut R,
    ) {
        let from = self.view();
        self.position = target;
        let transition = Transition {
            kind,
            direction,
            from,
            to: self.view(),
            started_at_ms: now_ms,
            duration_ms,
        };
        log::debug!("{kind:?} {direction} from {} to {target}", from.position);
        self.state = FlipState::Turning(transition);
        renderer.begin_transition(&transition, &self.pages);
    }
}
