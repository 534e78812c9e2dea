use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use tokio::sync::mpsc::UnboundedSender;

use crate::action::Action;
use crate::pages::Page;
use crate::panes::{Pane, PaneState, messages::MessagesPane, summary::SummaryPane};
use crate::theme::tui_palette as tp;
use crate::tui::{EventResponse, Frame};

pub struct Home {
    command_tx: Option<UnboundedSender<Action>>,
    panes: Vec<Box<dyn Pane>>,
    focused_pane_index: usize,
}

impl Home {
    pub fn new() -> Result<Self> {
        let focused_border_style = tp::focused_border();

        Ok(Self {
            command_tx: None,
            panes: vec![
                Box::new(MessagesPane::new(true, focused_border_style)),
                Box::new(SummaryPane::new(false, focused_border_style)),
            ],
            focused_pane_index: 0,
        })
    }
}

impl Page for Home {
    fn register_action_handler(&mut self, tx: UnboundedSender<Action>) -> Result<()> {
        self.command_tx = Some(tx);
        Ok(())
    }

    fn init(&mut self, state: &PaneState<'_>) -> Result<()> {
        for pane in &mut self.panes {
            pane.init(state)?;
        }
        Ok(())
    }

    fn handle_key_events(
        &mut self,
        key: KeyEvent,
        _state: &mut PaneState<'_>,
    ) -> Result<Option<EventResponse<Action>>> {
        let action = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('s') | KeyCode::Enter => Action::OpenSettings,
            KeyCode::Char('r') => Action::ReloadSettings,
            KeyCode::Tab => Action::FocusNext,
            KeyCode::BackTab => Action::FocusPrev,
            KeyCode::Char('j') | KeyCode::Down => Action::Down,
            KeyCode::Char('k') | KeyCode::Up => Action::Up,
            _ => return Ok(None),
        };
        Ok(Some(EventResponse::Stop(action)))
    }

    fn update(&mut self, action: Action, state: &mut PaneState<'_>) -> Result<Option<Action>> {
        match action {
            Action::FocusNext => {
                self.panes[self.focused_pane_index].update(Action::UnFocus, state)?;
                self.focused_pane_index = (self.focused_pane_index + 1) % self.panes.len();
                return self.panes[self.focused_pane_index].update(Action::Focus, state);
            }
            Action::FocusPrev => {
                self.panes[self.focused_pane_index].update(Action::UnFocus, state)?;
                self.focused_pane_index = self
                    .focused_pane_index
                    .checked_sub(1)
                    .unwrap_or(self.panes.len() - 1);
                return self.panes[self.focused_pane_index].update(Action::Focus, state);
            }
            // The activity log follows new entries whichever pane has focus.
            Action::Update => {
                for pane in &mut self.panes {
                    pane.update(Action::Update, state)?;
                }
            }
            _ => {
                if let Some(result) = self.panes[self.focused_pane_index].update(action, state)? {
                    return Ok(Some(result));
                }
            }
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, state: &PaneState<'_>) -> Result<()> {
        let outer = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Fill(3), Constraint::Fill(2)])
            .split(area);

        self.panes[0].draw(frame, outer[0], state)?;
        self.panes[1].draw(frame, outer[1], state)?;
        Ok(())
    }
}
