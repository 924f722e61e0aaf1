//! Terminal book: page slots, edge zones and the turning leaf.

use inkfolio_application::{Renderer, Transition, View};
use inkfolio_core::{Direction, LayoutMode, Page, PageKind};
use ratatui::layout::{Alignment, Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::image_protocol::ImageCache;

pub(crate) const PAPER: Color = Color::Rgb(253, 253, 248);
pub(crate) const PAPER_BACK: Color = Color::Rgb(240, 240, 232);
pub(crate) const INK: Color = Color::Rgb(40, 36, 40);
pub(crate) const ACCENT: Color = Color::Rgb(214, 2, 112);
const ACCENT_SOFT: Color = Color::Rgb(155, 79, 150);

/// Screen areas of the book for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BookGeometry {
    /// One slot in single layout, left and right otherwise.
    pub left: Option<Rect>,
    pub right: Rect,
    pub left_zone: Rect,
    pub right_zone: Rect,
    /// Four-slot layout: strips showing the pages underneath.
    pub under_tabs: Option<(Rect, Rect)>,
}

impl BookGeometry {
    pub fn new(area: Rect, layout: LayoutMode) -> Self {
        let (under_tabs, body) = match layout {
            LayoutMode::FourSlot if area.width > 12 => {
                let cols = Layout::horizontal([
                    Constraint::Length(3),
                    Constraint::Min(0),
                    Constraint::Length(3),
                ])
                .split(area);
                (Some((cols[0], cols[2])), cols[1])
            }
            _ => (None, area),
        };

        let (left, right) = match layout {
            LayoutMode::Single => (None, body),
            LayoutMode::Spread | LayoutMode::FourSlot => {
                let halves =
                    Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                        .split(body);
                (Some(halves[0]), halves[1])
            }
        };

        let zone_width = (body.width / 8).max(2).min(body.width);
        let left_zone = Rect::new(body.x, body.y, zone_width, body.height);
        let right_zone = Rect::new(
            body.right().saturating_sub(zone_width),
            body.y,
            zone_width,
            body.height,
        );

        Self {
            left,
            right,
            left_zone,
            right_zone,
            under_tabs,
        }
    }

    pub fn zone_at(&self, column: u16, row: u16) -> Option<Direction> {
        let position = Position::new(column, row);
        if self.left_zone.contains(position) {
            Some(Direction::Backward)
        } else if self.right_zone.contains(position) {
            Some(Direction::Forward)
        } else {
            None
        }
    }

    pub fn zone(&self, direction: Direction) -> Rect {
        match direction {
            Direction::Backward => self.left_zone,
            Direction::Forward => self.right_zone,
        }
    }
}

/// Clickable and hoverable areas of the settled book from the last frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct HitMap {
    /// Index page entries and the page each one opens.
    pub links: Vec<(Rect, usize)>,
    /// Gallery images and the page they sit on.
    pub images: Vec<(Rect, usize)>,
}

impl HitMap {
    pub fn link_at(&self, position: Position) -> Option<usize> {
        hit(&self.links, position)
    }

    pub fn image_at(&self, position: Position) -> Option<usize> {
        hit(&self.images, position)
    }
}

fn hit(areas: &[(Rect, usize)], position: Position) -> Option<usize> {
    areas
        .iter()
        .find(|(rect, _)| rect.contains(position))
        .map(|&(_, page)| page)
}

/// The page in motion during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Leaf {
    pub rect: Rect,
    pub page: Option<usize>,
    /// Showing the reverse side of the sheet.
    pub back: bool,
}

fn scale(width: u16, fraction: f32) -> u16 {
    (f32::from(width) * fraction.clamp(0.0, 1.0)).round() as u16
}

/// Leaf for a two-page layout. The sheet folds towards the spine during the
/// first half and opens on the other side during the second.
pub(crate) fn spread_leaf(
    left: Rect,
    right: Rect,
    transition: &Transition,
    p: f32,
) -> Option<Leaf> {
    let first_half = p < 0.5;
    let (rect, page, back) = match (transition.direction, first_half) {
        (Direction::Forward, true) => {
            let width = scale(right.width, 1.0 - 2.0 * p);
            (Rect { width, ..right }, transition.from.right, false)
        }
        (Direction::Forward, false) => {
            let width = scale(left.width, 2.0 * p - 1.0);
            let x = left.right().saturating_sub(width);
            (Rect { x, width, ..left }, transition.to.left, true)
        }
        (Direction::Backward, true) => {
            let width = scale(left.width, 1.0 - 2.0 * p);
            let x = left.right().saturating_sub(width);
            (Rect { x, width, ..left }, transition.from.left, false)
        }
        (Direction::Backward, false) => {
            let width = scale(right.width, 2.0 * p - 1.0);
            (Rect { width, ..right }, transition.to.right, true)
        }
    };
    (rect.width > 0).then_some(Leaf { rect, page, back })
}

/// Leaf for the single-page layout: the old page slides off to the left
/// going forward; going backward the previous page slides back in.
pub(crate) fn single_leaf(slot: Rect, transition: &Transition, p: f32) -> Option<Leaf> {
    let (width, page) = match transition.direction {
        Direction::Forward => (scale(slot.width, 1.0 - p), transition.from.right),
        Direction::Backward => (scale(slot.width, p), transition.to.right),
    };
    (width > 0).then_some(Leaf {
        rect: Rect { width, ..slot },
        page,
        back: false,
    })
}

/// Pages lying under the leaf at progress `p`, as `(left, right)`.
pub(crate) fn underlay(
    layout: LayoutMode,
    transition: &Transition,
    p: f32,
) -> (Option<usize>, Option<usize>) {
    let (from, to) = (&transition.from, &transition.to);
    match (layout, transition.direction) {
        (LayoutMode::Single, Direction::Forward) => (None, to.right),
        (LayoutMode::Single, Direction::Backward) => (None, from.right),
        (_, Direction::Forward) => (if p < 0.5 { from.left } else { to.left }, to.right),
        (_, Direction::Backward) => (to.left, if p < 0.5 { from.right } else { to.right }),
    }
}

/// [`Renderer`] for the terminal. Records what the sequencer asks for; the
/// next frame paints it.
#[derive(Debug, Clone, Default)]
pub(crate) struct BookCanvas {
    settled: View,
    transition: Option<Transition>,
}

impl Renderer for BookCanvas {
    fn present(&mut self, view: &View, _pages: &[Page]) {
        self.settled = *view;
        self.transition = None;
    }

    fn begin_transition(&mut self, transition: &Transition, _pages: &[Page]) {
        self.transition = Some(*transition);
    }

    fn end_transition(&mut self, view: &View, _pages: &[Page]) {
        self.settled = *view;
        self.transition = None;
    }
}

impl BookCanvas {
    /// Paints the book. Returns the hit areas of the settled view; nothing is
    /// clickable while a leaf is turning.
    pub fn draw(
        &self,
        frame: &mut ratatui::Frame,
        geometry: &BookGeometry,
        layout: LayoutMode,
        pages: &[Page],
        now_ms: u64,
        images: &mut ImageCache,
    ) -> HitMap {
        let page = |index: Option<usize>| index.and_then(|i| pages.get(i));
        let mut hits = HitMap::default();

        let Some(transition) = self.transition else {
            let settled = self.settled;
            if let Some(left) = geometry.left {
                let left_page = page(settled.left);
                draw_page(frame, left, left_page, false, Some(&mut *images), &mut hits);
            }
            let right_page = page(settled.right);
            draw_page(frame, geometry.right, right_page, false, Some(images), &mut hits);
            draw_under_tabs(frame, geometry, &settled, pages);
            return hits;
        };

        let p = transition.eased_progress(now_ms);
        let (under_left, under_right) = underlay(layout, &transition, p);
        if let Some(left) = geometry.left {
            let left_page = page(under_left);
            draw_page(frame, left, left_page, false, Some(&mut *images), &mut hits);
        }
        let right_page = page(under_right);
        draw_page(frame, geometry.right, right_page, false, Some(images), &mut hits);
        draw_under_tabs(frame, geometry, &transition.to, pages);

        let leaf = match geometry.left {
            Some(left) => spread_leaf(left, geometry.right, &transition, p),
            None => single_leaf(geometry.right, &transition, p),
        };
        if let Some(leaf) = leaf {
            draw_page(frame, leaf.rect, page(leaf.page), leaf.back, None, &mut hits);
        }
        HitMap::default()
    }
}

/// Four-slot layout: headings of the pages underneath, one character per row.
fn draw_under_tabs(
    frame: &mut ratatui::Frame,
    geometry: &BookGeometry,
    view: &View,
    pages: &[Page],
) {
    let Some((left_tab, right_tab)) = geometry.under_tabs else {
        return;
    };
    for (tab, index) in [(left_tab, view.under_left), (right_tab, view.under_right)] {
        let Some(page) = index.and_then(|i| pages.get(i)) else {
            continue;
        };
        let lines: Vec<Line> = page
            .content
            .heading
            .chars()
            .take(usize::from(tab.height))
            .map(|ch| Line::from(Span::raw(ch.to_string())))
            .collect();
        let tab_widget = Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .style(Style::default().fg(INK).bg(PAPER_BACK))
            .block(Block::default().borders(Borders::LEFT | Borders::RIGHT));
        frame.render_widget(tab_widget, tab);
    }
}

/// Tints the zone whose dwell timer is charging, bottom up.
pub(crate) fn draw_dwell(frame: &mut ratatui::Frame, zone: Rect, direction: Direction, charge: f32) {
    let height = scale(zone.height, charge);
    if height == 0 {
        return;
    }
    let rect = Rect {
        y: zone.bottom().saturating_sub(height),
        height,
        ..zone
    };
    let color = match direction {
        Direction::Backward => ACCENT,
        Direction::Forward => ACCENT_SOFT,
    };
    frame.render_widget(Block::default().style(Style::default().bg(color)), rect);
}

fn draw_page(
    frame: &mut ratatui::Frame,
    area: Rect,
    page: Option<&Page>,
    back: bool,
    images: Option<&mut ImageCache>,
    hits: &mut HitMap,
) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let paper = if back { PAPER_BACK } else { PAPER };
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Rgb(200, 196, 188)))
        .style(Style::default().fg(INK).bg(paper));
    if let Some(page) = page
        && !page.is_blank()
        && area.width > 8
    {
        block = block.title_bottom(Line::from(format!(" {} ", page.index + 1)).centered());
    }
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(page) = page else {
        return;
    };
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    match page.kind {
        PageKind::Blank => {}
        PageKind::Gallery => draw_gallery_page(frame, inner, page, images, hits),
        PageKind::Index => draw_index_page(frame, inner, page, images, hits),
        PageKind::Cover | PageKind::Contact => {
            let heading_style = if page.kind == PageKind::Cover {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            let max_width = usize::from(inner.width.saturating_sub(2)).max(1);
            let mut lines = Vec::new();
            for row in wrap_text(&page.content.heading, max_width) {
                lines.push(Line::from(Span::styled(row, heading_style)));
            }
            lines.push(Line::raw(""));
            for body in &page.content.body {
                for row in wrap_text(body, max_width) {
                    lines.push(Line::raw(row));
                }
            }
            let top = inner.height.saturating_sub(lines.len() as u16) / 2;
            let text_area = Rect {
                y: inner.y + top,
                height: inner.height - top,
                ..inner
            };
            frame.render_widget(
                Paragraph::new(Text::from(lines)).alignment(Alignment::Center),
                text_area,
            );
        }
    }
}

fn draw_gallery_page(
    frame: &mut ratatui::Frame,
    inner: Rect,
    page: &Page,
    images: Option<&mut ImageCache>,
    hits: &mut HitMap,
) {
    let rows = Layout::vertical([Constraint::Min(1), Constraint::Length(2)]).split(inner);
    let caption = Paragraph::new(Line::from(Span::styled(
        page.content.heading.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(caption, rows[1]);

    let (Some(image), Some(cache)) = (&page.content.image, images) else {
        return;
    };
    cache.draw(frame, rows[0], image);
    hits.images.push((rows[0], page.index));
}

/// Rows of the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexLayout {
    pub heading: Rect,
    pub showpiece: Rect,
    pub caption: Rect,
    pub collection: Rect,
    /// One row per visible link; links that do not fit are dropped.
    pub links: Vec<Rect>,
}

pub(crate) fn index_layout(inner: Rect, link_count: usize) -> IndexLayout {
    let rows = Layout::vertical([
        Constraint::Length(2),
        Constraint::Percentage(45),
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Min(0),
    ])
    .split(inner);
    let list = rows[4];
    let links = (0..list.height)
        .take(link_count)
        .map(|offset| Rect {
            y: list.y + offset,
            height: 1,
            ..list
        })
        .collect();
    IndexLayout {
        heading: rows[0],
        showpiece: rows[1],
        caption: rows[2],
        collection: rows[3],
        links,
    }
}

/// Newest piece on top, then one clickable row per gallery page.
fn draw_index_page(
    frame: &mut ratatui::Frame,
    inner: Rect,
    page: &Page,
    images: Option<&mut ImageCache>,
    hits: &mut HitMap,
) {
    let content = &page.content;
    let layout = index_layout(inner, content.links.len());

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            content.heading.to_uppercase(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center),
        layout.heading,
    );
    if let (Some(image), Some(cache)) = (&content.image, images) {
        cache.draw(frame, layout.showpiece, image);
    }

    let mut body = content.body.iter();
    if let Some(caption) = body.next() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                caption.clone(),
                Style::default().add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center),
            layout.caption,
        );
    }
    if let Some(collection) = body.next() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                collection.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP)),
            layout.collection,
        );
    }

    for (row, link) in layout.links.iter().zip(&content.links) {
        let entry = Line::from(vec![
            Span::styled(
                format!("{:>3} ", link.page + 1),
                Style::default().add_modifier(Modifier::DIM),
            ),
            Span::styled(link.label.clone(), Style::default().fg(ACCENT_SOFT)),
        ]);
        frame.render_widget(Paragraph::new(entry), *row);
        hits.links.push((*row, link.page));
    }
}

pub(crate) fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = UnicodeWidthStr::width(word);
        let sep_width = usize::from(!current.is_empty());

        if current_width + sep_width + word_width <= max_width {
            if !current.is_empty() {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        current.push_str(word);
        current_width = word_width;
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
