use strum::Display;

use crate::panel::PanelEvent;

/// Actions that drive the application, inspired by openapi-tui.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum Action {
    Tick,
    Render,
    Resize(u16, u16),
    Quit,
    Error(String),
    FocusNext,
    FocusPrev,
    Focus,
    UnFocus,
    Up,
    Down,
    Update,
    TimedStatusLine(String, u64),
    /// Show the AI settings dialog
    OpenSettings,
    /// Hide the AI settings dialog (Esc, backdrop click, Cancel)
    CloseSettings,
    /// Re-fetch the provider catalog and the active configuration
    ReloadSettings,
    /// A background settings request finished
    Panel(PanelEvent),
    Noop,
}
