use anyhow::Result;
use ratatui::{
    layout::{Constraint, Rect},
    prelude::*,
    widgets::{Block, BorderType, Borders, List, ListItem},
};

use crate::action::Action;
use crate::panes::{Pane, PaneState};
use crate::theme::tui_palette as tp;
use crate::tui::Frame;

/// Read-only view of the configuration the backend currently uses.
pub struct SummaryPane {
    focused: bool,
    focused_border_style: Style,
}

impl SummaryPane {
    pub fn new(focused: bool, focused_border_style: Style) -> Self {
        Self {
            focused,
            focused_border_style,
        }
    }

    fn border_style(&self) -> Style {
        if self.focused {
            self.focused_border_style
        } else {
            Style::default()
        }
    }

    fn border_type(&self) -> BorderType {
        if self.focused {
            BorderType::Thick
        } else {
            BorderType::Plain
        }
    }

    fn lines(state: &PaneState<'_>) -> Vec<Line<'static>> {
        let label = |text: &str| Span::styled(format!("{text:<10}"), Style::default().fg(tp::MUTED));
        let panel = state.panel;

        if !panel.is_mounted() {
            return vec![Line::from(Span::styled(
                "Waiting for the terminal…",
                Style::default().fg(tp::TEXT_DIM),
            ))];
        }
        let Some(current) = panel.current_config() else {
            return vec![Line::from(Span::styled(
                "Loading settings…",
                Style::default().fg(tp::TEXT_DIM),
            ))];
        };

        let provider = panel.catalog().display_name(&current.provider).to_string();
        let (status, status_style) = if current.configured {
            ("configured", Style::default().fg(tp::SUCCESS))
        } else {
            ("not configured", Style::default().fg(tp::WARN))
        };
        let key = match (current.api_key_set, panel.has_cached_key()) {
            (true, true) => "stored (available this session)",
            (true, false) => "stored",
            (false, _) => "none",
        };

        let mut lines = vec![
            Line::from(vec![label("Status"), Span::styled(status, status_style)]),
            Line::from(vec![label("Provider"), Span::raw(provider)]),
            Line::from(vec![
                label("Model"),
                Span::raw(if current.model_name.is_empty() {
                    "—".to_string()
                } else {
                    current.model_name.clone()
                }),
            ]),
            Line::from(vec![label("API key"), Span::raw(key)]),
        ];
        if let Some(host) = &current.host {
            let endpoint = match current.port {
                Some(port) => format!("{host}:{port}"),
                None => host.clone(),
            };
            lines.push(Line::from(vec![label("Host"), Span::raw(endpoint)]));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("{} providers available", panel.catalog().len()),
            Style::default().fg(tp::TEXT_DIM),
        )));
        lines
    }
}

impl Pane for SummaryPane {
    fn height_constraint(&self) -> Constraint {
        match self.focused {
            true => Constraint::Fill(3),
            false => Constraint::Fill(1),
        }
    }

    fn update(&mut self, action: Action, _state: &mut PaneState<'_>) -> Result<Option<Action>> {
        match action {
            Action::Focus => {
                self.focused = true;
                return Ok(Some(Action::TimedStatusLine(
                    "[s → change AI settings]".into(),
                    3,
                )));
            }
            Action::UnFocus => {
                self.focused = false;
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, state: &PaneState<'_>) -> Result<()> {
        let items: Vec<ListItem> = Self::lines(state).into_iter().map(ListItem::new).collect();

        let summary = List::new(items).block(
            Block::default()
                .title("AI Provider")
                .borders(Borders::ALL)
                .border_style(self.border_style())
                .border_type(self.border_type()),
        );

        frame.render_widget(summary, area);
        Ok(())
    }
}
