use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{Component, DataResource, EventKind, HandlerResponse};
use tui_dispatch_components::style::BorderStyle;
use tui_dispatch_components::{
    BaseStyle, Padding, StatusBar, StatusBarHint, StatusBarItem, StatusBarProps,
    StatusBarSection, StatusBarStyle,
};

use crate::action::Action;
use crate::catalog::Page;
use crate::config::CatalogConfig;
use crate::stat_bar::{self, StatBar};
use crate::state::{AppState, DetailRecord, LoadPhase, StatEntry};

const BG_BASE: Color = Color::Rgb(12, 18, 28);
const BG_PANEL: Color = Color::Rgb(20, 32, 46);
const BG_HIGHLIGHT: Color = Color::Rgb(28, 92, 110);
const TEXT_MAIN: Color = Color::Rgb(232, 242, 244);
const TEXT_DIM: Color = Color::Rgb(176, 195, 207);
const TEXT_MUTED: Color = Color::Rgb(96, 112, 128);
const ACCENT_TEAL: Color = Color::Rgb(72, 204, 184);
const ACCENT_GOLD: Color = Color::Rgb(228, 176, 88);
const ACCENT_RED: Color = Color::Rgb(232, 96, 88);

const SEARCH_PLACEHOLDER: &str = "Catch 'em all by searching here...";
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Screen regions, shared with the binary so it can register component areas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppLayout {
    pub header: Rect,
    pub grid: Rect,
    pub stats: Rect,
    pub footer: Rect,
}

pub fn layout(area: Rect) -> AppLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(area);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
        .split(rows[1]);
    AppLayout {
        header: rows[0],
        grid: body[0],
        stats: body[1],
        footer: rows[2],
    }
}

pub struct CatalogUi {
    status_bar: StatusBar,
}

impl Default for CatalogUi {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogUi {
    pub fn new() -> Self {
        Self {
            status_bar: StatusBar::new(),
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
        render_app(frame, area, state, &mut self.status_bar);
    }
}

pub fn render_app(frame: &mut Frame, area: Rect, state: &AppState, status_bar: &mut StatusBar) {
    let base = Block::default().style(Style::default().bg(BG_BASE));
    frame.render_widget(base, area);

    let regions = layout(area);
    let page = state.current_page();
    render_header(frame, regions.header, state);
    render_grid(frame, regions.grid, state, &page);
    render_stats_panel(frame, regions.stats, state);
    render_footer(frame, regions.footer, state, &page, status_bar);
}

pub fn handle_grid_event(event: &EventKind, _state: &AppState) -> HandlerResponse<Action> {
    let actions = match event {
        EventKind::Key(key) => match key.code {
            KeyCode::Char('j') | KeyCode::Down => vec![Action::SelectionMove(1)],
            KeyCode::Char('k') | KeyCode::Up => vec![Action::SelectionMove(-1)],
            KeyCode::Char('h') | KeyCode::Left => vec![Action::PagePrev],
            KeyCode::Char('l') | KeyCode::Right => vec![Action::PageNext],
            KeyCode::Char('[') => vec![Action::FacetCursorPrev],
            KeyCode::Char(']') => vec![Action::FacetCursorNext],
            KeyCode::Char(' ') => vec![Action::FacetToggle],
            KeyCode::Char('c') => vec![Action::FacetClear],
            KeyCode::Char('r') => vec![Action::CatalogReload],
            KeyCode::Char('/') => vec![Action::SearchStart],
            KeyCode::Char(ch @ '1'..='9') => vec![Action::CardSelect(ch as usize - '1' as usize)],
            _ => vec![],
        },
        _ => vec![],
    };
    handler_response(actions)
}

pub fn handle_search_event(event: &EventKind, _state: &AppState) -> HandlerResponse<Action> {
    let actions = match event {
        EventKind::Key(key) => match key.code {
            KeyCode::Esc => vec![Action::SearchCancel],
            KeyCode::Enter => vec![Action::SearchSubmit],
            KeyCode::Backspace => vec![Action::SearchBackspace],
            KeyCode::Char(ch) => vec![Action::SearchInput(ch)],
            _ => vec![],
        },
        _ => vec![],
    };
    handler_response(actions)
}

fn handler_response(actions: Vec<Action>) -> HandlerResponse<Action> {
    if actions.is_empty() {
        HandlerResponse::ignored()
    } else {
        HandlerResponse {
            actions,
            consumed: true,
            needs_render: false,
        }
    }
}

/// Status line text for the current load, if any.
pub fn status_text(state: &AppState) -> Option<String> {
    let spinner = SPINNER[(state.tick % SPINNER.len() as u64) as usize];
    match &state.phase {
        LoadPhase::Listing => Some(format!("{spinner} Loading catalog…")),
        LoadPhase::Enriching { total } => {
            Some(format!("{spinner} Loading details… ({total} entries)"))
        }
        LoadPhase::Failed(error) => Some(format!("{error} (press r to retry)")),
        LoadPhase::Ready if !state.failed_entries.is_empty() => {
            Some(partial_failure_notice(state.failed_entries.len()))
        }
        LoadPhase::Ready | LoadPhase::Idle => state.message.clone(),
    }
}

pub fn partial_failure_notice(count: usize) -> String {
    if count == 1 {
        "1 entry could not be loaded".to_string()
    } else {
        format!("{count} entries could not be loaded")
    }
}

pub fn page_label<T>(page: &Page<T>) -> String {
    format!("Page {} of {}", page.page, page.total_pages)
}

pub fn type_color(type_name: &str) -> Color {
    match type_name {
        "normal" => Color::Rgb(168, 167, 122),
        "fire" => Color::Rgb(238, 129, 48),
        "water" => Color::Rgb(99, 144, 240),
        "electric" => Color::Rgb(247, 208, 44),
        "grass" => Color::Rgb(122, 199, 76),
        "ice" => Color::Rgb(150, 217, 214),
        "fighting" => Color::Rgb(194, 46, 40),
        "poison" => Color::Rgb(163, 62, 161),
        "ground" => Color::Rgb(226, 191, 101),
        "flying" => Color::Rgb(169, 143, 243),
        "psychic" => Color::Rgb(249, 85, 135),
        "bug" => Color::Rgb(166, 185, 26),
        "rock" => Color::Rgb(182, 161, 54),
        "ghost" => Color::Rgb(115, 87, 151),
        "dragon" => Color::Rgb(111, 53, 252),
        "dark" => Color::Rgb(112, 87, 70),
        "steel" => Color::Rgb(183, 183, 206),
        "fairy" => Color::Rgb(214, 133, 173),
        _ => ACCENT_TEAL,
    }
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let search_line = if state.search_active {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format!("/{}_", state.filter.search),
                Style::default().fg(ACCENT_TEAL).add_modifier(Modifier::BOLD),
            ),
        ])
    } else if state.filter.search.is_empty() {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(TEXT_DIM)),
            Span::styled(SEARCH_PLACEHOLDER, Style::default().fg(TEXT_MUTED)),
        ])
    } else {
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(TEXT_DIM)),
            Span::styled(
                format!("/{}", state.filter.search),
                Style::default().fg(ACCENT_TEAL),
            ),
        ])
    };

    let mut facet_spans = vec![Span::styled("Types: ", Style::default().fg(TEXT_DIM))];
    let facets = state.facets();
    if facets.is_empty() {
        facet_spans.push(Span::styled("-", Style::default().fg(TEXT_MUTED)));
    }
    for (index, facet) in facets.iter().enumerate() {
        let mut style = if state.filter.is_selected(facet) {
            Style::default()
                .fg(BG_BASE)
                .bg(type_color(facet))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(type_color(facet))
        };
        if index == state.facet_cursor {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        facet_spans.push(Span::styled(format!(" {facet} "), style));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title("DEXGRID")
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN))
        .border_style(if state.search_active {
            Style::default().fg(ACCENT_TEAL).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_DIM)
        });
    let paragraph = Paragraph::new(Text::from(vec![search_line, Line::from(facet_spans)]))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_grid(frame: &mut Frame, area: Rect, state: &AppState, page: &Page<&DetailRecord>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("CATALOG")
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some((notice, color)) = grid_notice(state, page) {
        let paragraph = Paragraph::new(notice)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(color));
        frame.render_widget(paragraph, inner);
        return;
    }

    let columns = if inner.width >= 48 { 2 } else { 1 };
    let rows = page.items.len().div_ceil(columns).max(1);
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(inner);
    for (index, record) in page.items.iter().enumerate() {
        let Some(row) = row_areas.get(index / columns) else {
            break;
        };
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(*row);
        if let Some(cell) = cells.get(index % columns) {
            render_card(frame, *cell, record, index == state.selected);
        }
    }
}

fn grid_notice(state: &AppState, page: &Page<&DetailRecord>) -> Option<(String, Color)> {
    match &state.phase {
        LoadPhase::Idle => Some((String::new(), TEXT_DIM)),
        LoadPhase::Listing => Some(("Loading catalog…".to_string(), TEXT_DIM)),
        LoadPhase::Enriching { .. } => Some(("Loading details…".to_string(), TEXT_DIM)),
        LoadPhase::Failed(error) => Some((format!("{error}\n\npress r to retry"), ACCENT_RED)),
        LoadPhase::Ready if page.items.is_empty() => {
            Some(("No creatures match.".to_string(), TEXT_DIM))
        }
        LoadPhase::Ready => None,
    }
}

fn render_card(frame: &mut Frame, area: Rect, record: &DetailRecord, selected: bool) {
    let color = type_color(record.primary_type());
    let (border_type, border_style) = if selected {
        (
            BorderType::Thick,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )
    } else {
        (BorderType::Plain, Style::default().fg(TEXT_DIM))
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .style(Style::default().bg(if selected { BG_HIGHLIGHT } else { BG_PANEL }))
        .title(Span::styled(
            format!(" #{:03} ", record.id),
            Style::default().fg(color),
        ));

    let mut type_spans = Vec::new();
    for (index, type_name) in record.types.iter().enumerate() {
        if index > 0 {
            type_spans.push(Span::styled(" / ", Style::default().fg(TEXT_MUTED)));
        }
        type_spans.push(Span::styled(
            type_name.clone(),
            Style::default().fg(type_color(type_name)),
        ));
    }

    let text = Text::from(vec![
        Line::from(Span::styled(
            stat_bar::capitalize(&record.name),
            Style::default().fg(TEXT_MAIN).add_modifier(Modifier::BOLD),
        )),
        Line::from(type_spans),
        Line::from(Span::styled(
            format!("{:.1} m  {:.1} kg", record.height_m(), record.weight_kg()),
            Style::default().fg(TEXT_DIM),
        )),
    ]);
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_stats_panel(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("STATS")
        .style(Style::default().bg(BG_PANEL).fg(TEXT_MAIN));
    frame.render_widget(
        Paragraph::new(stats_text(state))
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn stats_text(state: &AppState) -> Text<'static> {
    let Some(record) = state.selected_record() else {
        return Text::from(Span::styled(
            "No creature selected.",
            Style::default().fg(TEXT_DIM),
        ));
    };
    let color = type_color(record.primary_type());
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} #{:03}", stat_bar::capitalize(&record.name), record.id),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    match state.stats.get(record.id) {
        Some(DataResource::Loaded(stats)) => {
            lines.extend(
                stats
                    .iter()
                    .map(|stat| stat_line(stat, &state.config, color)),
            );
        }
        Some(DataResource::Failed(error)) => lines.push(Line::from(Span::styled(
            format!("Stats unavailable: {error}"),
            Style::default().fg(ACCENT_RED),
        ))),
        Some(DataResource::Loading) => lines.push(Line::from(Span::styled(
            "Loading stats…",
            Style::default().fg(TEXT_DIM),
        ))),
        Some(DataResource::Empty) | None => lines.push(Line::from(Span::styled(
            "No stats loaded.",
            Style::default().fg(TEXT_DIM),
        ))),
    }
    Text::from(lines)
}

pub fn stat_line(stat: &StatEntry, config: &CatalogConfig, color: Color) -> Line<'static> {
    let (filled, empty) =
        StatBar::encode(stat.base_value, config.stat_slots, config.stat_scale).render();
    Line::from(vec![
        Span::styled(
            format!("{:<8}", stat_bar::stat_label(&stat.name)),
            Style::default().fg(TEXT_DIM),
        ),
        Span::styled(
            format!("{:>3} ", stat.base_value),
            Style::default().fg(TEXT_MAIN),
        ),
        Span::styled(filled, Style::default().fg(color)),
        Span::styled(empty, Style::default().fg(TEXT_MUTED)),
    ])
}

fn render_footer(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    page: &Page<&DetailRecord>,
    status_bar: &mut StatusBar,
) {
    let left_hints = status_hints(state);
    let enabled = Style::default().fg(ACCENT_TEAL).add_modifier(Modifier::BOLD);
    let disabled = Style::default().fg(TEXT_MUTED);
    let page_items = [
        StatusBarItem::span(Span::styled(
            "< Previous",
            if page.has_prev() { enabled } else { disabled },
        )),
        StatusBarItem::span(Span::styled(
            page_label(page),
            Style::default().fg(TEXT_MAIN),
        )),
        StatusBarItem::span(Span::styled(
            "Next >",
            if page.has_next() { enabled } else { disabled },
        )),
    ];

    let status = status_text(state).unwrap_or_default();
    let status_color = match state.phase {
        LoadPhase::Failed(_) => ACCENT_RED,
        _ => ACCENT_GOLD,
    };
    let status_items = [StatusBarItem::span(Span::styled(
        status,
        Style::default().fg(status_color),
    ))];

    let style = StatusBarStyle {
        base: BaseStyle {
            border: Some(BorderStyle {
                borders: Borders::ALL,
                style: Style::default().fg(TEXT_DIM),
                focused_style: Some(Style::default().fg(ACCENT_TEAL)),
            }),
            padding: Padding::xy(1, 0),
            bg: Some(BG_PANEL),
            fg: Some(TEXT_MAIN),
        },
        text: Style::default().fg(TEXT_DIM),
        hint_key: Style::default()
            .fg(ACCENT_TEAL)
            .add_modifier(Modifier::BOLD),
        hint_label: Style::default().fg(TEXT_DIM),
        separator: Style::default().fg(TEXT_DIM),
    };

    let props = StatusBarProps {
        left: StatusBarSection::hints(&left_hints).with_separator("  "),
        center: StatusBarSection::items(&page_items).with_separator("  "),
        right: StatusBarSection::items(&status_items).with_separator("  "),
        style,
        is_focused: false,
    };
    Component::<Action>::render(status_bar, frame, area, props);
}

fn status_hints(state: &AppState) -> Vec<StatusBarHint<'static>> {
    if state.search_active {
        return vec![
            StatusBarHint::new("Enter", "Apply"),
            StatusBarHint::new("Esc", "Clear"),
            StatusBarHint::new("Bksp", "Delete"),
        ];
    }
    vec![
        StatusBarHint::new("/", "Search"),
        StatusBarHint::new("[ ]", "Type"),
        StatusBarHint::new("Space", "Toggle"),
        StatusBarHint::new("j/k", "Move"),
        StatusBarHint::new("h/l", "Page"),
        StatusBarHint::new("r", "Reload"),
        StatusBarHint::new("q", "Quit"),
    ]
}
