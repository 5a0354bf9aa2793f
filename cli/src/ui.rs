use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use searchbar_core::{Phase, View};

use crate::input::Input;

const HIGHLIGHT: &str = "> ";

pub fn draw(frame: &mut Frame, input: &mut Input, view: &View) {
    let [query_area, list_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let query_block = Block::default().borders(Borders::ALL).title(" Search ");
    let text_area = query_block.inner(query_area);
    frame.render_widget(Paragraph::new(input.text()).block(query_block), query_area);

    let typed = u16::try_from(Span::raw(input.text()).width()).unwrap_or(u16::MAX);
    let cursor_x = text_area.x.saturating_add(typed);
    frame.set_cursor_position(Position::new(
        cursor_x.min(text_area.right().saturating_sub(1)),
        text_area.y,
    ));

    if view.visible {
        draw_results(frame, input, view, list_area);
    } else {
        input.list_rows = Rect::default();
        input.list_offset = 0;
    }

    frame.render_widget(Paragraph::new(status_line(view)), status_area);
}

fn draw_results(frame: &mut Frame, input: &mut Input, view: &View, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let rows = block.inner(area);

    let items: Vec<ListItem> = view
        .results
        .iter()
        .map(|item| ListItem::new(item.name.as_str()))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol(HIGHLIGHT);

    let mut state = ListState::default()
        .with_selected(view.selected)
        .with_offset(input.list_offset);
    frame.render_stateful_widget(list, area, &mut state);

    input.list_rows = Rect {
        height: rows
            .height
            .min(view.results.len().saturating_sub(state.offset()) as u16),
        ..rows
    };
    input.list_offset = state.offset();
}

fn status_line(view: &View) -> Line<'static> {
    let dim = Style::default().fg(Color::DarkGray);
    let text = match view.phase {
        Phase::Idle => "type to search".to_string(),
        Phase::PendingFetch => "...".to_string(),
        Phase::Fetching => format!("searching for {:?}", view.query),
        Phase::Ready if view.results.is_empty() => "no results".to_string(),
        Phase::Ready => format!("{} results", view.results.len()),
        Phase::Failed => {
            return Line::from(Span::styled(
                "search failed, keep typing to retry",
                Style::default().fg(Color::Red),
            ))
        }
    };
    Line::from(Span::styled(text, dim))
}
