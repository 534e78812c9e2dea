pub mod footer;
pub mod header;
pub mod messages;
pub mod summary;

use anyhow::Result;
use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::{Constraint, Rect};

use crate::action::Action;
use crate::config::Config;
use crate::panel::SettingsPanel;
use crate::tui::{Event, EventResponse, Frame};

/// Everything a pane may read (or, for the activity log, append to) while
/// handling an event or drawing.
pub struct PaneState<'a> {
    pub config: &'a Config,
    pub panel: &'a SettingsPanel,
    pub messages: &'a mut Vec<String>,
    /// Transient hint shown in the footer.
    pub status_line: Option<String>,
}

pub trait Pane {
    fn init(&mut self, _state: &PaneState<'_>) -> Result<()> {
        Ok(())
    }

    fn height_constraint(&self) -> Constraint;

    fn handle_events(
        &mut self,
        event: Event,
        state: &mut PaneState<'_>,
    ) -> Result<Option<EventResponse<Action>>> {
        match event {
            Event::Key(key_event) => self.handle_key_events(key_event, state),
            Event::Mouse(mouse_event) => self.handle_mouse_events(mouse_event, state),
            _ => Ok(None),
        }
    }

    fn handle_key_events(
        &mut self,
        _key: KeyEvent,
        _state: &mut PaneState<'_>,
    ) -> Result<Option<EventResponse<Action>>> {
        Ok(None)
    }

    fn handle_mouse_events(
        &mut self,
        _mouse: MouseEvent,
        _state: &mut PaneState<'_>,
    ) -> Result<Option<EventResponse<Action>>> {
        Ok(None)
    }

    fn update(&mut self, _action: Action, _state: &mut PaneState<'_>) -> Result<Option<Action>> {
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, state: &PaneState<'_>) -> Result<()>;
}
