//! ratatui-based flipbook viewer.

use std::io::{self, Stdout};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use inkfolio_application::{AppContext, FlipSequencer, HoverDwell, View, swipe_direction};
use inkfolio_core::{Direction, ImageDescriptor, ImageSource, LayoutMode, Page, PageKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Layout, Margin, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

mod canvas;
mod image_protocol;

use canvas::{ACCENT, BookCanvas, BookGeometry, HitMap, INK, PAPER};
use image_protocol::{ImageCache, LoadResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
    Reload,
}

#[derive(Debug, Clone)]
pub struct UiOutcome {
    pub ctx: AppContext,
    pub exit: UiExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Turn(Direction),
    First,
    Last,
    Goto,
    Expand,
    Close,
    Reload,
    Quit,
}

fn key_action(key: &KeyEvent) -> Option<Action> {
    let action = match key.code {
        KeyCode::Left | KeyCode::PageUp | KeyCode::Char('h') => Action::Turn(Direction::Backward),
        KeyCode::Right | KeyCode::PageDown | KeyCode::Char(' ') | KeyCode::Char('l') => {
            Action::Turn(Direction::Forward)
        }
        KeyCode::Home => Action::First,
        KeyCode::End => Action::Last,
        KeyCode::Char('g') => Action::Goto,
        KeyCode::Enter => Action::Expand,
        KeyCode::Esc => Action::Close,
        KeyCode::Char('r') => Action::Reload,
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        _ => return None,
    };
    Some(action)
}

/// Validates go-to input against a book of `total` pages. Returns the
/// zero-based page index.
fn parse_goto(input: &str, total: usize) -> Result<usize, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("Enter a page number".to_string());
    }
    let page = match input.parse::<usize>() {
        Ok(p) if p >= 1 => p,
        _ => return Err("Invalid page number".to_string()),
    };
    if page > total {
        return Err(format!("Page out of range (1..={total})"));
    }
    Ok(page - 1)
}

/// Gallery page to open in the full-size overlay: the right page first,
/// then the left.
fn expand_target(view: &View, pages: &[Page]) -> Option<usize> {
    [view.right, view.left].into_iter().flatten().find(|&index| {
        pages
            .get(index)
            .is_some_and(|page| page.kind == PageKind::Gallery && page.content.image.is_some())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Expanded {
    page: usize,
    /// Opened by resting the pointer on the image; moving off closes it.
    by_hover: bool,
}

#[derive(Debug, Clone, Default)]
struct GotoPanel {
    open: bool,
    input: String,
    error: Option<String>,
}

pub struct Ui<'a> {
    ctx: AppContext,
    source: &'a dyn ImageSource,
    sequencer: FlipSequencer,
    canvas: BookCanvas,
    dwell: HoverDwell,
    image_dwell: HoverDwell<usize>,
    goto_panel: GotoPanel,
    expanded: Option<Expanded>,
    overlay: Option<Rect>,
    pending_layout: Option<LayoutMode>,
    drag_start: Option<u16>,
    hover_zone: Option<Direction>,
    geometry: Option<BookGeometry>,
    hits: HitMap,
    images: ImageCache,
    notice: Option<String>,
    clock: Instant,
}

impl<'a> Ui<'a> {
    pub fn new(ctx: AppContext, source: &'a dyn ImageSource) -> Self {
        let width = terminal::size().map(|(width, _)| width).unwrap_or(120);
        let layout = ctx
            .settings
            .layout
            .resolve(width, ctx.settings.single_page_max_width);
        let sequencer = ctx.sequencer(layout);
        let dwell = ctx.dwell();
        let image_dwell = ctx.dwell();
        let notice = ctx
            .gallery
            .degraded
            .then(|| "Showing the offline gallery".to_string());
        Self {
            ctx,
            source,
            sequencer,
            canvas: BookCanvas::default(),
            dwell,
            image_dwell,
            goto_panel: GotoPanel::default(),
            expanded: None,
            overlay: None,
            pending_layout: None,
            drag_start: None,
            hover_zone: None,
            geometry: None,
            hits: HitMap::default(),
            images: ImageCache::new(ratatui_image::picker::Picker::halfblocks()),
            notice,
            clock: Instant::now(),
        }
    }

    /// Runs the viewer until the user quits or asks for a reload. Images are
    /// loaded and decoded on a scoped worker thread meanwhile.
    pub fn run(&mut self) -> anyhow::Result<UiOutcome> {
        let source = self.source;
        std::thread::scope(|scope| {
            let (requests, request_rx) = mpsc::channel();
            let (result_tx, results) = mpsc::channel();
            scope.spawn(move || image_protocol::load_images(source, request_rx, result_tx));
            let outcome = self.run_terminal(requests, results);
            self.images.disconnect();
            outcome
        })
    }

    fn run_terminal(
        &mut self,
        requests: Sender<ImageDescriptor>,
        results: Receiver<LoadResult>,
    ) -> anyhow::Result<UiOutcome> {
        let mut terminal = setup_terminal()?;
        self.images = ImageCache::new(image_protocol::detect_picker());
        self.images.connect(requests, results);
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(outcome)), Ok(())) => Ok(outcome),
            (Ok(Err(err)), Ok(())) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<UiOutcome> {
        let idle_tick = Duration::from_millis(250);
        let frame_tick = Duration::from_millis(16);
        let mut needs_redraw = true;

        self.sequencer.start(&mut self.canvas);

        loop {
            let now = self.now_ms();
            if self.advance(now) {
                needs_redraw = true;
            }
            let animating = self.sequencer.is_animating()
                || self.dwell.is_pending()
                || self.image_dwell.is_pending()
                || self.images.is_loading();

            if needs_redraw || animating {
                self.prefetch();
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            let tick_rate = if animating { frame_tick } else { idle_tick };
            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(width, _) => {
                    self.on_resize(width);
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    let exit = if self.goto_panel.open {
                        self.handle_goto_panel_key(key);
                        None
                    } else {
                        self.handle_key(key, self.now_ms())
                    };
                    if let Some(exit) = exit {
                        return Ok(UiOutcome {
                            ctx: self.ctx.clone(),
                            exit,
                        });
                    }
                }
                Event::Mouse(mouse) => {
                    if !self.goto_panel.open {
                        self.handle_mouse(mouse, self.now_ms());
                        needs_redraw = true;
                    }
                }
                _ => {}
            }
        }
    }

    /// Time-driven updates for one pass of the loop. Returns whether the
    /// frame changed.
    fn advance(&mut self, now: u64) -> bool {
        let mut changed = self.images.poll();
        if self.sequencer.tick(now, &mut self.canvas) {
            self.apply_pending_layout();
            changed = true;
        }
        if self.expanded.is_some() {
            return changed;
        }
        if let Some(direction) = self.dwell.poll(now) {
            log::debug!("hover dwell fired {direction}");
            self.turn(direction, now);
            changed = true;
        }
        if let Some(page) = self.image_dwell.poll(now)
            && !self.sequencer.is_animating()
        {
            log::debug!("hover expands page {page}");
            self.expand(page, true);
            changed = true;
        }
        changed
    }

    /// Queues the images of the current and neighbouring positions.
    fn prefetch(&mut self) {
        let pages = self.sequencer.pages();
        let layout = self.sequencer.layout();
        let last = self.sequencer.last_position();
        let position = self.sequencer.position();
        for at in position.saturating_sub(1)..=(position + 1).min(last) {
            let view = View::at(layout, at, pages.len());
            for index in [view.left, view.right, view.under_left, view.under_right]
                .into_iter()
                .flatten()
            {
                let image = pages.get(index).and_then(|page| page.content.image.as_ref());
                if let Some(image) = image {
                    self.images.request(image);
                }
            }
        }
    }

    fn expand(&mut self, page: usize, by_hover: bool) {
        self.expanded = Some(Expanded { page, by_hover });
        self.dwell.leave();
        self.image_dwell.leave();
        self.hover_zone = None;
    }

    fn handle_key(&mut self, key: KeyEvent, now: u64) -> Option<UiExit> {
        match key_action(&key)? {
            Action::Quit => return Some(UiExit::Quit),
            Action::Reload => return Some(UiExit::Reload),
            Action::Close => {
                if self.expanded.take().is_none() {
                    return Some(UiExit::Quit);
                }
            }
            Action::Turn(direction) => self.turn(direction, now),
            Action::First => self.jump(0, now),
            Action::Last => self.jump(self.sequencer.last_position(), now),
            Action::Goto => {
                let first_page = self
                    .sequencer
                    .view()
                    .left
                    .or(self.sequencer.view().right)
                    .unwrap_or(0);
                self.goto_panel.open = true;
                self.goto_panel.error = None;
                self.goto_panel.input = (first_page + 1).to_string();
                self.expanded = None;
            }
            Action::Expand => {
                if self.expanded.take().is_none()
                    && !self.sequencer.is_animating()
                    && let Some(page) =
                        expand_target(&self.sequencer.view(), self.sequencer.pages())
                {
                    self.expand(page, false);
                }
            }
        }
        None
    }

    fn handle_goto_panel_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.goto_panel = GotoPanel::default();
            }
            KeyCode::Enter => {
                let index = match parse_goto(&self.goto_panel.input, self.sequencer.pages().len()) {
                    Ok(index) => index,
                    Err(err) => {
                        self.goto_panel.error = Some(err);
                        return;
                    }
                };
                let Some(target) = self.sequencer.page_position(index) else {
                    return;
                };
                if target == self.sequencer.position() {
                    self.notice = Some(format!("Page {} is already open", index + 1));
                } else {
                    let now = self.now_ms();
                    self.jump(target, now);
                }
                self.goto_panel = GotoPanel::default();
            }
            KeyCode::Backspace => {
                self.goto_panel.input.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.goto_panel.input.clear();
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                self.goto_panel.input.push(ch);
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, now: u64) {
        let position = Position::new(mouse.column, mouse.row);
        if let Some(expanded) = self.expanded {
            let outside = !self.overlay.is_some_and(|overlay| overlay.contains(position));
            match mouse.kind {
                MouseEventKind::Down(_) => self.expanded = None,
                MouseEventKind::Moved if expanded.by_hover && outside => self.expanded = None,
                _ => {}
            }
            return;
        }

        let zone = self
            .geometry
            .as_ref()
            .and_then(|geometry| geometry.zone_at(mouse.column, mouse.row));

        match mouse.kind {
            MouseEventKind::Moved => {
                if zone != self.hover_zone {
                    self.hover_zone = zone;
                    match zone {
                        Some(direction) => self.dwell.enter(direction, now),
                        None => self.dwell.leave(),
                    }
                }
                match self.hits.image_at(position) {
                    Some(page) if zone.is_none() => self.image_dwell.hover(page, now),
                    _ => self.image_dwell.leave(),
                }
            }
            MouseEventKind::Down(MouseButton::Left) => match zone {
                Some(direction) => {
                    self.dwell.leave();
                    self.turn(direction, now);
                }
                None => match self.hits.link_at(position) {
                    Some(page) => self.open_page(page, now),
                    None => self.drag_start = Some(mouse.column),
                },
            },
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(start) = self.drag_start.take()
                    && let Some(direction) = swipe_direction(
                        i32::from(start),
                        i32::from(mouse.column),
                        u32::from(self.ctx.settings.swipe_threshold),
                    )
                {
                    self.turn(direction, now);
                }
            }
            MouseEventKind::ScrollDown => self.turn(Direction::Forward, now),
            MouseEventKind::ScrollUp => self.turn(Direction::Backward, now),
            _ => {}
        }
    }

    /// Jumps to the position showing `page`, as the index page links do.
    fn open_page(&mut self, page: usize, now: u64) {
        if let Some(target) = self.sequencer.page_position(page)
            && target != self.sequencer.position()
        {
            self.jump(target, now);
        }
    }

    fn turn(&mut self, direction: Direction, now_ms: u64) {
        self.expanded = None;
        if self.sequencer.turn(direction, now_ms, &mut self.canvas) {
            self.leave_pages();
        }
    }

    fn jump(&mut self, target: usize, now_ms: u64) {
        self.expanded = None;
        if self.sequencer.jump_to(target, now_ms, &mut self.canvas) {
            self.leave_pages();
        }
    }

    /// The pages under the pointer changed: old hit areas and image hover
    /// no longer apply.
    fn leave_pages(&mut self) {
        self.notice = None;
        self.hits = HitMap::default();
        self.image_dwell.leave();
    }

    fn on_resize(&mut self, width: u16) {
        let layout = self
            .ctx
            .settings
            .layout
            .resolve(width, self.ctx.settings.single_page_max_width);
        if layout == self.sequencer.layout() {
            self.pending_layout = None;
            return;
        }
        if self.sequencer.is_animating() {
            self.pending_layout = Some(layout);
        } else {
            self.sequencer.relayout(layout, &mut self.canvas);
        }
        self.dwell.leave();
        self.image_dwell.leave();
        self.hover_zone = None;
        self.hits = HitMap::default();
        self.images.clear_protocols();
    }

    fn apply_pending_layout(&mut self) {
        if let Some(layout) = self.pending_layout.take() {
            self.sequencer.relayout(layout, &mut self.canvas);
        }
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        let chunks = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(area);
        let now = self.now_ms();

        self.draw_header(chunks[0], frame);

        let book_area = chunks[1].inner(Margin {
            horizontal: 1,
            vertical: 0,
        });
        let geometry = BookGeometry::new(book_area, self.sequencer.layout());
        self.geometry = Some(geometry);
        self.hits = self.canvas.draw(
            frame,
            &geometry,
            self.sequencer.layout(),
            self.sequencer.pages(),
            now,
            &mut self.images,
        );
        if let Some(zone) = self.dwell.pending_zone()
            && self.sequencer.can_turn(zone)
        {
            canvas::draw_dwell(frame, geometry.zone(zone), zone, self.dwell.charge(now));
        }

        self.draw_footer(chunks[2], frame);

        self.overlay = None;
        if let Some(expanded) = self.expanded {
            self.draw_expanded(expanded.page, chunks[1], frame);
        }
        if self.goto_panel.open {
            self.draw_goto_panel(area, frame);
        }
    }

    fn draw_header(&self, area: Rect, frame: &mut ratatui::Frame) {
        let book = &self.ctx.settings.book;
        let mut source = self.ctx.source.clone();
        if self.ctx.gallery.degraded {
            source.push_str(" (offline gallery)");
        }
        let lines = vec![
            Line::from(vec![
                Span::styled(
                    book.title.clone(),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(
                    book.subtitle.clone(),
                    Style::default().add_modifier(Modifier::ITALIC),
                ),
            ]),
            Line::from(Span::styled(
                source,
                Style::default().add_modifier(Modifier::DIM),
            )),
        ];
        let header = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, area);
    }

    fn draw_footer(&self, area: Rect, frame: &mut ratatui::Frame) {
        let message = self.notice.clone().unwrap_or_else(|| {
            "←/→ turn  hover edges  g go to  Enter zoom  r reload  q quit".to_string()
        });
        let line = Line::from(vec![
            Span::styled(
                self.sequencer.label(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(message, Style::default().add_modifier(Modifier::DIM)),
            Span::raw("  "),
            Span::styled(
                format!("[{}]", self.images.protocol_label()),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]);
        let footer = Paragraph::new(line).block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, area);
    }

    fn draw_expanded(&mut self, index: usize, area: Rect, frame: &mut ratatui::Frame) {
        let Some(page) = self.sequencer.pages().get(index) else {
            return;
        };
        let Some(image) = page.content.image.clone() else {
            return;
        };
        let popup_area = centered_rect(90, 94, area);
        self.overlay = Some(popup_area);
        frame.render_widget(Clear, popup_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(INK).bg(PAPER))
            .title(Span::styled(
                format!(" {} ", image.display_name),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::from(" Esc or click to close ").centered());
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);
        self.images.draw(frame, inner, &image);
    }

    fn draw_goto_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(48, 28, area);
        frame.render_widget(Clear, popup_area);

        let total = self.sequencer.pages().len();
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            format!("Go to page (1..={total})"),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(block.clone(), popup_area);

        let inner = block.inner(popup_area);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Page: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.goto_panel.input.clone()),
            ]),
            Line::raw(""),
            Line::raw("Enter jumps, Esc cancels, Ctrl+u clears."),
        ];

        if let Some(err) = &self.goto_panel.error {
            lines.push(Line::raw(""));
            lines.push(Line::from(Span::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }

        let paragraph = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Left);
        frame.render_widget(paragraph, inner);
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}
