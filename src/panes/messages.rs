use anyhow::Result;
use ratatui::{
    layout::{Constraint, Rect},
    prelude::*,
    widgets::{Block, BorderType, Borders, HighlightSpacing, List, ListItem, ListState},
};

use crate::action::Action;
use crate::panes::{Pane, PaneState};
use crate::theme::tui_palette as tp;
use crate::tui::Frame;

/// Scrollable activity log: saves, pulls, load failures.
pub struct MessagesPane {
    focused: bool,
    focused_border_style: Style,
    scroll_offset: usize,
}

impl MessagesPane {
    pub fn new(focused: bool, focused_border_style: Style) -> Self {
        Self {
            focused,
            focused_border_style,
            scroll_offset: 0,
        }
    }

    fn block(&self, total: usize) -> Block<'static> {
        let (border_style, border_type) = if self.focused {
            (self.focused_border_style, BorderType::Thick)
        } else {
            (Style::default().fg(tp::MUTED), BorderType::Plain)
        };
        let position = format!(" {}/{total} ", (self.scroll_offset + 1).min(total));
        Block::default()
            .title(" Activity ")
            .title_bottom(Line::from(position).right_aligned())
            .borders(Borders::ALL)
            .border_style(border_style)
            .border_type(border_type)
    }
}

fn line_style(message: &str) -> Style {
    match message.chars().next() {
        Some('✗') => Style::default().fg(tp::ERROR),
        Some('✓') => Style::default().fg(tp::SUCCESS),
        _ => Style::default().fg(tp::TEXT),
    }
}

impl Pane for MessagesPane {
    fn height_constraint(&self) -> Constraint {
        Constraint::Fill(3)
    }

    fn update(&mut self, action: Action, state: &mut PaneState<'_>) -> Result<Option<Action>> {
        match action {
            Action::Focus => {
                self.focused = true;
                let status = "[j/k → scroll] [s → settings] [r → reload]";
                return Ok(Some(Action::TimedStatusLine(status.into(), 3)));
            }
            Action::UnFocus => {
                self.focused = false;
            }
            Action::Down => {
                if self.scroll_offset + 1 < state.messages.len() {
                    self.scroll_offset += 1;
                }
            }
            Action::Up => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
            Action::Update => {
                self.scroll_offset = state.messages.len().saturating_sub(1);
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, state: &PaneState<'_>) -> Result<()> {
        let items: Vec<ListItem> = state
            .messages
            .iter()
            .map(|m| ListItem::new(Span::styled(m.as_str(), line_style(m))))
            .collect();

        let list = List::new(items)
            .block(self.block(state.messages.len()))
            .highlight_symbol("› ")
            .highlight_spacing(HighlightSpacing::Always)
            .highlight_style(Style::default().add_modifier(Modifier::BOLD));

        let mut list_state = ListState::default().with_selected(Some(self.scroll_offset));
        frame.render_stateful_widget(list, area, &mut list_state);
        Ok(())
    }
}
