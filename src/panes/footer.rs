use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::{
    layout::{Constraint, Rect},
    prelude::*,
};

use crate::action::Action;
use crate::panes::{Pane, PaneState};
use crate::theme::tui_palette as tp;
use crate::tui::Frame;

const KEY_HINTS: &str = "s settings · r reload · Tab focus · q quit";

/// Key hints plus a status line that disappears after a few seconds.
#[derive(Default)]
pub struct FooterPane {
    status: Option<(String, Instant)>,
}

impl FooterPane {
    pub fn new() -> Self {
        Self::default()
    }

    fn active_status(&self) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, until)| Instant::now() < *until)
            .map(|(text, _)| text.as_str())
    }
}

impl Pane for FooterPane {
    fn height_constraint(&self) -> Constraint {
        Constraint::Max(1)
    }

    fn update(&mut self, action: Action, _state: &mut PaneState<'_>) -> Result<Option<Action>> {
        match action {
            Action::TimedStatusLine(text, secs) => {
                self.status = Some((text, Instant::now() + Duration::from_secs(secs)));
            }
            Action::Tick => {
                if self.active_status().is_none() {
                    self.status = None;
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, state: &PaneState<'_>) -> Result<()> {
        let status = self
            .active_status()
            .map(str::to_string)
            .or_else(|| state.status_line.clone());

        let mut spans = vec![Span::styled(KEY_HINTS, Style::default().fg(tp::MUTED))];
        if let Some(status) = status {
            spans.push(Span::raw("   "));
            spans.push(Span::styled(status, Style::default().fg(tp::ACCENT)));
        }
        frame.render_widget(Line::from(spans), area);
        Ok(())
    }
}
