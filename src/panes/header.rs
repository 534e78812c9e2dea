use anyhow::Result;
use ratatui::{
    layout::{Constraint, Rect},
    prelude::*,
};

use crate::panes::{Pane, PaneState};
use crate::theme::tui_palette as tp;
use crate::tui::Frame;

#[derive(Default)]
pub struct HeaderPane {}

impl HeaderPane {
    pub fn new() -> Self {
        Self {}
    }
}

impl Pane for HeaderPane {
    fn height_constraint(&self) -> Constraint {
        Constraint::Max(1)
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, state: &PaneState<'_>) -> Result<()> {
        let backend = state.config.backend_url.trim_end_matches('/');
        let (dot, dot_style) = if state.panel.catalog().is_empty() {
            ("○", Style::default().fg(tp::MUTED))
        } else {
            ("●", Style::default().fg(tp::SUCCESS))
        };

        frame.render_widget(
            Line::from(vec![
                Span::styled(format!("{dot} "), dot_style),
                Span::styled(backend.to_string(), Style::default().fg(tp::TEXT_DIM)),
                Span::styled("  [ Matcher Settings ", Style::default().fg(tp::ACCENT)),
                Span::styled(
                    format!("{} ", symbols::DOT),
                    Style::default().fg(tp::MUTED),
                ),
                Span::styled(
                    format!("v{} ", env!("CARGO_PKG_VERSION")),
                    Style::default().fg(tp::ACCENT_BRIGHT),
                ),
                Span::styled("]", Style::default().fg(tp::ACCENT)),
            ])
            .right_aligned(),
            area,
        );

        Ok(())
    }
}
