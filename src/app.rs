use std::sync::Arc;

use anyhow::Result;
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::action::Action;
use crate::api::{HttpBackend, SettingsBackend};
use crate::config::Config;
use crate::dialogs::settings::SettingsDialog;
use crate::pages::Page;
use crate::pages::home::Home;
use crate::panel::{NoticeLevel, PanelOptions, SettingsPanel};
use crate::panes::footer::FooterPane;
use crate::panes::header::HeaderPane;
use crate::panes::{Pane, PaneState};
use crate::tui::{Event, EventResponse, Tui};

/// Shared state that is separate from the UI components so we can borrow both
/// independently.
struct SharedState {
    config: Config,
    panel: SettingsPanel,
    messages: Vec<String>,
    status_line: Option<String>,
}

impl SharedState {
    fn pane_state(&mut self) -> PaneState<'_> {
        PaneState {
            config: &self.config,
            panel: &self.panel,
            messages: &mut self.messages,
            status_line: self.status_line.clone(),
        }
    }
}

pub struct App {
    state: SharedState,
    pages: Vec<Box<dyn Page>>,
    active_page: usize,
    header: HeaderPane,
    footer: FooterPane,
    dialog: SettingsDialog,
    should_quit: bool,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let backend = HttpBackend::new(&config.backend_url, config.request_timeout())?;
        Self::with_backend(config, Arc::new(backend))
    }

    /// Build the app around any backend implementation.
    pub fn with_backend(config: Config, backend: Arc<dyn SettingsBackend>) -> Result<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let panel = SettingsPanel::new(
            backend,
            action_tx.clone(),
            PanelOptions::from_config(&config),
        );

        let mut home = Home::new()?;
        home.register_action_handler(action_tx.clone())?;
        let pages: Vec<Box<dyn Page>> = vec![Box::new(home)];

        let state = SharedState {
            messages: vec![format!(
                "Backend: {}  ·  press s to open AI settings",
                config.backend_url
            )],
            config,
            panel,
            status_line: None,
        };

        Ok(Self {
            state,
            pages,
            active_page: 0,
            header: HeaderPane::new(),
            footer: FooterPane::new(),
            dialog: SettingsDialog::new(),
            should_quit: false,
            action_rx,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;

        {
            let ps = self.state.pane_state();
            for page in &mut self.pages {
                page.init(&ps)?;
            }
        }
        self.pages[self.active_page].focus()?;

        // The panel asks to be mounted right away; it only loads once the
        // terminal reports ready with Event::Init.
        self.state.panel.initialize();

        loop {
            if let Some(event) = tui.next().await {
                let mut action = match &event {
                    Event::Init => {
                        self.host_ready();
                        Some(Action::Update)
                    }
                    Event::Render => None,
                    Event::Tick => Some(Action::Tick),
                    Event::Resize(w, h) => Some(Action::Resize(*w, *h)),
                    Event::Quit | Event::Closed => Some(Action::Quit),
                    Event::Key(key) if self.state.panel.is_open() => {
                        Some(self.dialog.handle_key(&mut self.state.panel, *key))
                    }
                    Event::Mouse(mouse) if self.state.panel.is_open() => {
                        Some(self.dialog.handle_mouse(&mut self.state.panel, *mouse))
                    }
                    Event::Paste(text) if self.state.panel.is_open() => {
                        self.dialog.handle_paste(&mut self.state.panel, text);
                        None
                    }
                    _ => {
                        let mut ps = self.state.pane_state();
                        match self.pages[self.active_page].handle_events(event.clone(), &mut ps)? {
                            Some(EventResponse::Stop(a)) => Some(a),
                            Some(EventResponse::Continue(_)) | None => None,
                        }
                    }
                };

                // Process the action (and any chained follow-up actions)
                while let Some(act) = action {
                    action = self.dispatch_action(act)?;
                }

                // Drain the mpsc channel (background requests report here)
                while let Ok(act) = self.action_rx.try_recv() {
                    let mut a = Some(act);
                    while let Some(act) = a {
                        a = self.dispatch_action(act)?;
                    }
                }

                if self.collect_notices() {
                    let mut a = Some(Action::Update);
                    while let Some(act) = a {
                        a = self.dispatch_action(act)?;
                    }
                }

                if matches!(event, Event::Render) {
                    self.draw(&mut tui)?;
                }

                if self.should_quit {
                    tui.stop()?;
                    break;
                }
            }
        }

        tui.exit()?;
        Ok(())
    }

    fn host_ready(&mut self) {
        let panel = &mut self.state.panel;
        panel.host_ready();
        if self.state.config.open_on_start {
            panel.open();
        }
    }

    /// Move panel notices into the activity log.  Errors also flash in the
    /// footer.  Returns `true` when anything was added.
    fn collect_notices(&mut self) -> bool {
        let notices = self.state.panel.drain_notices();
        if notices.is_empty() {
            return false;
        }
        for notice in notices {
            match notice.level {
                NoticeLevel::Info => self.state.messages.push(format!("✓ {}", notice.text)),
                NoticeLevel::Error => {
                    self.state.messages.push(format!("✗ {}", notice.text));
                    self.state.status_line = Some(notice.text);
                }
            }
        }
        true
    }

    /// Dispatch a single action to the panel, header, footer and the active
    /// page.  Returns an optional follow-up action.
    fn dispatch_action(&mut self, action: Action) -> Result<Option<Action>> {
        match &action {
            Action::Quit => {
                info!("quit requested");
                self.should_quit = true;
                return Ok(None);
            }
            Action::Noop | Action::Render => return Ok(None),
            Action::OpenSettings => {
                if !self.state.panel.open() {
                    return Ok(Some(Action::TimedStatusLine(
                        "Settings are still loading…".into(),
                        3,
                    )));
                }
                self.state.status_line = None;
                return Ok(None);
            }
            Action::CloseSettings => {
                self.state.panel.close();
                return Ok(None);
            }
            Action::ReloadSettings => {
                if self.state.panel.is_mounted() {
                    self.state.panel.load_providers_and_config();
                    self.state.messages.push("Reloading AI settings…".to_string());
                    return Ok(Some(Action::Update));
                }
                return Ok(None);
            }
            Action::Panel(event) => {
                self.state.panel.handle_event(event.clone());
                return Ok(None);
            }
            Action::Error(message) => {
                warn!(error = %message, "ui error");
                self.state.messages.push(format!("✗ {message}"));
                return Ok(Some(Action::Update));
            }
            _ => {}
        }

        let mut ps = self.state.pane_state();
        let mut follow_up = self.header.update(action.clone(), &mut ps)?;
        if let Some(a) = self.footer.update(action.clone(), &mut ps)? {
            follow_up = Some(a);
        }
        if let Some(a) = self.pages[self.active_page].update(action, &mut ps)? {
            follow_up = Some(a);
        }
        Ok(follow_up)
    }

    fn draw(&mut self, tui: &mut Tui) -> Result<()> {
        tui.draw(|frame| {
            let area = frame.area();

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![
                    Constraint::Length(1),
                    Constraint::Min(1),
                    Constraint::Length(1),
                ])
                .split(area);

            let ps = PaneState {
                config: &self.state.config,
                panel: &self.state.panel,
                messages: &mut self.state.messages,
                status_line: self.state.status_line.clone(),
            };

            let _ = self.header.draw(frame, chunks[0], &ps);
            let _ = self.pages[self.active_page].draw(frame, chunks[1], &ps);
            let _ = self.footer.draw(frame, chunks[2], &ps);

            if self.state.panel.is_open() {
                self.dialog.draw(frame, area, &self.state.panel);
            }
        })?;
        Ok(())
    }
}
