//! Caption viewer
//!
//! Shows the title and explanation of cached entries in the terminal. One
//! renderer serves every layout: a single pane, a side-by-side split, and a
//! loop that cycles through the whole cache.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::cache::CacheEntry;

/// How long an entry stays on screen in the loop layout
pub const LOOP_INTERVAL: Duration = Duration::from_secs(15);

/// Title shown when an entry has none
const FALLBACK_TITLE: &str = "CosmoWall";

/// Arrangement of the caption on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Title on top, explanation along the bottom
    Single,
    /// Text column on the left, picture details on the right
    SideBySide,
    /// Single layout, cycling through every cached entry
    Loop,
}

/// State of the caption viewer
#[derive(Debug)]
pub struct Viewer {
    /// Entries that can be shown, oldest first
    entries: Vec<(String, CacheEntry)>,
    /// Index of the entry on screen
    pub index: usize,
    /// Current layout
    pub layout: LayoutMode,
    /// Whether borders and the footer are hidden
    pub fullscreen: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Flag indicating the viewer should close
    pub should_quit: bool,
    /// When the loop layout last moved on
    last_advance: Instant,
}

impl Viewer {
    /// Creates a viewer showing `entries[index]`
    pub fn new(
        entries: Vec<(String, CacheEntry)>,
        index: usize,
        layout: LayoutMode,
        fullscreen: bool,
    ) -> Self {
        let index = index.min(entries.len().saturating_sub(1));
        Self {
            entries,
            index,
            layout,
            fullscreen,
            show_help: false,
            should_quit: false,
            last_advance: Instant::now(),
        }
    }

    /// The date and entry on screen
    pub fn current(&self) -> Option<(&str, &CacheEntry)> {
        self.entries
            .get(self.index)
            .map(|(date, entry)| (date.as_str(), entry))
    }

    /// Number of entries the viewer can show
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is nothing to show
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves to the next entry, wrapping around
    pub fn next(&mut self) {
        if !self.entries.is_empty() {
            self.index = (self.index + 1) % self.entries.len();
        }
        self.last_advance = Instant::now();
    }

    /// Moves to the previous entry, wrapping around
    pub fn previous(&mut self) {
        if !self.entries.is_empty() {
            self.index = (self.index + self.entries.len() - 1) % self.entries.len();
        }
        self.last_advance = Instant::now();
    }

    /// Advances the loop layout once `LOOP_INTERVAL` has passed
    pub fn tick(&mut self, now: Instant) {
        if self.layout == LayoutMode::Loop && now.duration_since(self.last_advance) >= LOOP_INTERVAL
        {
            self.next();
            self.last_advance = now;
        }
    }

    /// Handles a key press
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        // Help overlay intercepts all keys when shown
        if self.show_help {
            if matches!(
                key_event.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
            ) {
                self.show_help = false;
            }
            return;
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('f') => self.fullscreen = !self.fullscreen,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('n')
                if self.layout == LayoutMode::Loop =>
            {
                self.next()
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('p')
                if self.layout == LayoutMode::Loop =>
            {
                self.previous()
            }
            // Any other key dismisses the single-entry layouts
            _ if self.layout != LayoutMode::Loop => self.should_quit = true,
            _ => {}
        }
    }
}

/// Renders the viewer
pub fn render(frame: &mut Frame, viewer: &Viewer) {
    let area = frame.area();

    let Some((date, entry)) = viewer.current() else {
        let empty = Paragraph::new("No cached APODs found.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    };

    let (body, footer) = if viewer.fullscreen {
        (area, None)
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    };

    match viewer.layout {
        LayoutMode::Single | LayoutMode::Loop => render_single(frame, body, viewer, date, entry),
        LayoutMode::SideBySide => render_side_by_side(frame, body, viewer, date, entry),
    }

    if let Some(footer) = footer {
        render_footer(frame, footer, viewer);
    }

    if viewer.show_help {
        super::render_help_overlay(frame);
    }
}

/// Title centred at the top, details in the middle, explanation at the bottom
fn render_single(frame: &mut Frame, area: Rect, viewer: &Viewer, date: &str, entry: &CacheEntry) {
    let explanation_height = (area.height / 2).max(3);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(explanation_height),
        ])
        .split(area);

    let title = Paragraph::new(title_line(entry))
        .alignment(Alignment::Center)
        .block(block(viewer, ""));
    frame.render_widget(title, chunks[0]);

    let details = Paragraph::new(detail_lines(date, entry))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(details, chunks[1]);

    let explanation = Paragraph::new(entry.explanation.as_str())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block(viewer, " Explanation "));
    frame.render_widget(explanation, chunks[2]);
}

/// Text column on the left, details on the right
fn render_side_by_side(
    frame: &mut Frame,
    area: Rect,
    viewer: &Viewer,
    date: &str,
    entry: &CacheEntry,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let mut text = vec![title_line(entry), Line::from("")];
    text.push(Line::from(Span::styled(
        entry.explanation.clone(),
        Style::default().fg(Color::Gray),
    )));

    let left = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block(viewer, ""));
    frame.render_widget(left, columns[0]);

    let right = Paragraph::new(detail_lines(date, entry))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true })
        .block(block(viewer, " Picture "));
    frame.render_widget(right, columns[1]);
}

/// Key hints and, in the loop layout, the position in the cache
fn render_footer(frame: &mut Frame, area: Rect, viewer: &Viewer) {
    let mut spans = Vec::new();
    if viewer.layout == LayoutMode::Loop {
        spans.push(Span::styled(
            format!(" {}/{} ", viewer.index + 1, viewer.len()),
            Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::raw(" ←/→ step "));
    }
    spans.push(Span::raw(" f fullscreen  ? help  q quit"));

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, area);
}

/// Bordered block unless fullscreen
fn block<'a>(viewer: &Viewer, title: &'a str) -> Block<'a> {
    if viewer.fullscreen {
        Block::default()
    } else {
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
    }
}

fn title_line(entry: &CacheEntry) -> Line<'static> {
    let title = if entry.title.trim().is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        entry.title.clone()
    };
    Line::from(Span::styled(
        title,
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ))
}

fn detail_lines(date: &str, entry: &CacheEntry) -> Vec<Line<'static>> {
    let file_name = Path::new(&entry.img)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut lines = vec![
        detail_line("Date", date.to_string()),
        detail_line("File", file_name),
        detail_line("Path", entry.img.clone()),
        detail_line("Source", entry.url.clone()),
    ];
    if let Some(mp3) = &entry.mp3 {
        lines.push(detail_line("Narration", mp3.clone()));
    }
    lines
}

fn detail_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<10}", label), Style::default().fg(Color::Yellow)),
        Span::raw(value),
    ])
}
