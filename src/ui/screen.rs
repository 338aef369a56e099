//! Main screen
//!
//! Search box on top, the loading/error line under it, shows and episodes
//! side by side, and the resolved stream at the bottom.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use super::Theme;
use crate::app::{App, InputMode, ListState, Pane};
use crate::models::Video;

/// Render the whole screen
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(Theme::text()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Loading / error
            Constraint::Min(3),    // Lists
            Constraint::Length(4), // Now playing
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    render_notice(frame, chunks[1], app);
    render_lists(frame, chunks[2], app);
    render_now_playing(frame, chunks[3], app);
    render_status_bar(frame, chunks[4], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(16), Constraint::Min(1)])
        .split(area);

    let logo = Paragraph::new(Line::from(vec![
        Span::styled("Alchemy", Theme::title()),
        Span::styled("Watch", Theme::text()),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Theme::border()),
    );
    frame.render_widget(logo, header_chunks[0]);

    let editing = app.input_mode == InputMode::Editing;
    let search_text = if editing {
        let (before, after) = app.search.split_at_cursor();
        format!("⌕ {}│{}", before, after)
    } else if app.search.query.is_empty() {
        "⌕ Type / to search...".to_string()
    } else {
        format!("⌕ {}", app.search.query)
    };

    let search_box = Paragraph::new(search_text).style(Theme::text()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if editing {
                Theme::border_focused()
            } else {
                Theme::border()
            })
            .title(Span::styled(" Search ", Theme::title())),
    );
    frame.render_widget(search_box, header_chunks[1]);
}

fn render_notice(frame: &mut Frame, area: Rect, app: &App) {
    let catalog = app.catalog();
    let mut spans = Vec::new();
    if catalog.is_loading() {
        spans.push(Span::styled("⟳ Loading...", Theme::loading()));
    }
    if catalog.is_error() {
        if !spans.is_empty() {
            spans.push(Span::raw("   "));
        }
        spans.push(Span::styled(
            "✗ Something went wrong. Try another search.",
            Theme::error(),
        ));
    }
    let line = Line::from(spans);
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn render_lists(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let catalog = app.catalog();

    let shows_empty = if catalog.no_shows_found() {
        "No shows found."
    } else {
        ""
    };
    render_list(
        frame,
        columns[0],
        &format!(" Shows ({}) ", catalog.shows().len()),
        catalog.shows(),
        &app.shows_list,
        app.focus == Pane::Shows && app.input_mode == InputMode::Normal,
        shows_empty,
    );

    let episodes_empty = if catalog.no_episodes_available() {
        "No episodes are available."
    } else {
        ""
    };
    render_list(
        frame,
        columns[1],
        &format!(" Episodes ({}) ", catalog.episodes().len()),
        catalog.episodes(),
        &app.episodes_list,
        app.focus == Pane::Episodes && app.input_mode == InputMode::Normal,
        episodes_empty,
    );
}

fn render_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    items: &[Video],
    list: &ListState,
    focused: bool,
    empty_text: &str,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if focused {
            Theme::border_focused()
        } else {
            Theme::border()
        })
        .title(Span::styled(title.to_string(), Theme::title()));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if items.is_empty() {
        let empty = Paragraph::new(empty_text)
            .style(Theme::dimmed())
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let height = inner.height as usize;
    let offset = if height > 0 && list.selected >= height {
        list.selected + 1 - height
    } else {
        0
    };

    let rows: Vec<ListItem> = items
        .iter()
        .enumerate()
        .skip(offset)
        .take(height.max(1))
        .map(|(i, item)| {
            let is_selected = i == list.selected;
            let marker = if is_selected { "▸ " } else { "  " };
            let style = match (is_selected, focused) {
                (true, true) => Theme::highlighted(),
                (true, false) => Theme::selected(),
                _ => Theme::text(),
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Theme::dimmed()),
                Span::styled(item.title.clone(), style),
            ]))
        })
        .collect();

    frame.render_widget(List::new(rows).style(Theme::text()), inner);
}

fn render_now_playing(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border())
        .title(Span::styled(" ▶ Now Playing ", Theme::success()));

    let lines = match app.catalog().server_info() {
        Some(info) => vec![
            Line::from(Span::styled(info.title.clone(), Theme::title())),
            Line::from(Span::styled(
                info.primary_url().unwrap_or("no stream URL").to_string(),
                Theme::dimmed(),
            )),
        ],
        None => vec![Line::from(Span::styled(
            "Pick an episode to resolve its stream",
            Theme::dimmed(),
        ))],
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mode = match app.input_mode {
        InputMode::Normal => Span::styled(" NORMAL ", Theme::keybind()),
        InputMode::Editing => Span::styled(" INSERT ", Theme::highlighted()),
    };
    let phase = Span::styled(
        format!(" {:?} ", app.catalog().phase()).to_uppercase(),
        Theme::dimmed(),
    );
    let help = Span::styled(
        " /:search  tab:switch  ↵:select  p:play  q:quit ",
        Theme::dimmed(),
    );

    let status = Paragraph::new(Line::from(vec![mode, phase, Span::raw("│"), help]))
        .style(Theme::status_bar());
    frame.render_widget(status, area);
}
