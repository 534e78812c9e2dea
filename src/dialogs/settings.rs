//! The AI settings dialog overlay.
//!
//! Rendering and input translation only: every state change goes through
//! [`SettingsPanel`].

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Layout, Position, Rect},
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use tracing::debug;
use tui_input::{Input, InputRequest};

use crate::action::Action;
use crate::dialogs::centered_rect;
use crate::panel::{ConnectionBanner, Field, KeyField, SettingsPanel};
use crate::theme::tui_palette as tp;
use crate::tui::Frame;

const DIALOG_WIDTH: u16 = 68;
const LABEL_WIDTH: u16 = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Provider,
    Description,
    Key,
    KeyHint,
    Model,
    PullTitle,
    PullModel,
    PullEndpoint,
    PullButton,
    Banner,
    Spacer,
    Buttons,
}

impl Row {
    fn height(self) -> u16 {
        match self {
            Row::Description => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct SettingsDialog {
    /// Where the dialog was drawn last; clicks outside it close the dialog.
    area: Option<Rect>,
    hit_boxes: Vec<(Field, Rect)>,
    cursor: Option<Position>,
}

impl SettingsDialog {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn area(&self) -> Option<Rect> {
        self.area
    }

    // ── Input ───────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, panel: &mut SettingsPanel, key: KeyEvent) -> Action {
        let focus = panel.form().focus;
        match key.code {
            KeyCode::Esc => return Action::CloseSettings,
            KeyCode::Tab | KeyCode::Down => panel.form_mut().move_focus(1),
            KeyCode::BackTab | KeyCode::Up => panel.form_mut().move_focus(-1),
            KeyCode::Enter => return self.activate(panel, focus),
            KeyCode::Left | KeyCode::Right if !focus.is_text_input() => {
                let offset = if key.code == KeyCode::Left { -1 } else { 1 };
                return Self::step(panel, focus, offset);
            }
            _ => {
                if let Some(input) = panel.form_mut().focused_input() {
                    edit_input(input, key);
                }
            }
        }
        Action::Noop
    }

    pub fn handle_mouse(&mut self, panel: &mut SettingsPanel, mouse: MouseEvent) -> Action {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return Action::Noop;
        }
        let position = Position::new(mouse.column, mouse.row);
        match self.area {
            Some(area) if !area.contains(position) => return Action::CloseSettings,
            None => return Action::Noop,
            _ => {}
        }

        let Some(field) = self
            .hit_boxes
            .iter()
            .find(|(_, rect)| rect.contains(position))
            .map(|(field, _)| *field)
        else {
            return Action::Noop;
        };
        panel.form_mut().focus = field;
        match field {
            Field::ChangeKey | Field::PullButton | Field::Test | Field::Cancel | Field::Save => {
                self.activate(panel, field)
            }
            _ => Action::Noop,
        }
    }

    /// Bracketed paste into the focused text input.
    pub fn handle_paste(&mut self, panel: &mut SettingsPanel, text: &str) {
        if let Some(input) = panel.form_mut().focused_input() {
            for c in text.chars().filter(|c| !c.is_control()) {
                input.handle(InputRequest::InsertChar(c));
            }
        }
    }

    fn activate(&mut self, panel: &mut SettingsPanel, field: Field) -> Action {
        debug!(?field, "activate");
        match field {
            Field::ChangeKey => {
                panel.enable_key_edit();
            }
            Field::PullModel | Field::PullButton => {
                // Validation problems are reported as notices.
                let _ = panel.pull_model();
            }
            Field::Test => {
                let _ = panel.test_connection();
            }
            Field::Save => {
                let _ = panel.save();
            }
            Field::Cancel => return Action::CloseSettings,
            Field::Provider | Field::Model | Field::ApiKey | Field::PullHost | Field::PullPort => {
                panel.form_mut().move_focus(1)
            }
        }
        Action::Update
    }

    fn step(panel: &mut SettingsPanel, field: Field, offset: isize) -> Action {
        match field {
            Field::Provider => {
                if let Err(err) = panel.cycle_provider(offset) {
                    return Action::Error(err.to_string());
                }
            }
            Field::Model => panel.cycle_model(offset),
            _ => panel.form_mut().move_focus(offset),
        }
        Action::Noop
    }

    // ── Drawing ─────────────────────────────────────────────────────────────

    fn rows(panel: &SettingsPanel) -> Vec<Row> {
        let form = panel.form();
        let mut rows = vec![Row::Provider, Row::Description];
        if form.key.is_visible() {
            rows.extend([Row::Key, Row::KeyHint]);
        }
        rows.push(Row::Model);
        if form.pull.is_some() {
            rows.extend([
                Row::PullTitle,
                Row::PullModel,
                Row::PullEndpoint,
                Row::PullButton,
            ]);
        }
        rows.extend([Row::Spacer, Row::Banner, Row::Spacer, Row::Buttons]);
        rows
    }

    pub fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, panel: &SettingsPanel) {
        self.hit_boxes.clear();
        self.cursor = None;

        let rows = if panel.catalog().is_empty() {
            Vec::new()
        } else {
            Self::rows(panel)
        };
        let body_height = rows.iter().map(|r| r.height()).sum::<u16>().max(1);
        let dialog_area = centered_rect(DIALOG_WIDTH, body_height + 2, area);
        self.area = Some(dialog_area);

        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .title(Span::styled(" AI Settings ", tp::title_focused()))
            .title_bottom(
                Line::from(Span::styled(
                    " Tab move · ←/→ change · Enter select · Esc close ",
                    Style::default().fg(tp::MUTED),
                ))
                .right_aligned(),
            )
            .borders(Borders::ALL)
            .border_style(tp::focused_border())
            .border_type(BorderType::Rounded);
        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        if rows.is_empty() {
            frame.render_widget(
                Paragraph::new(" Loading settings…").style(Style::default().fg(tp::TEXT_DIM)),
                inner,
            );
            return;
        }

        let areas = Layout::vertical(rows.iter().map(|r| Constraint::Length(r.height()))).split(inner);
        for (row, rect) in rows.iter().zip(areas.iter()) {
            self.draw_row(frame, *row, *rect, panel);
        }

        if let Some(position) = self.cursor {
            frame.set_cursor_position(position);
        }
    }

    fn draw_row(&mut self, frame: &mut Frame<'_>, row: Row, rect: Rect, panel: &SettingsPanel) {
        let form = panel.form();
        let [label_area, field_area] =
            Layout::horizontal([Constraint::Length(LABEL_WIDTH), Constraint::Fill(1)]).areas(rect);
        let label = |frame: &mut Frame<'_>, text: &str| {
            frame.render_widget(
                Paragraph::new(format!(" {text}")).style(Style::default().fg(tp::TEXT_DIM)),
                label_area,
            );
        };

        match row {
            Row::Provider => {
                label(frame, "Provider");
                let name = panel.catalog().display_name(&form.provider);
                let focused = form.focus == Field::Provider;
                frame.render_widget(Paragraph::new(selector(name, focused)), field_area);
                self.hit_boxes.push((Field::Provider, field_area));
            }
            Row::Description => {
                frame.render_widget(
                    Paragraph::new(form.description.as_str())
                        .style(Style::default().fg(tp::MUTED))
                        .wrap(Wrap { trim: true }),
                    field_area,
                );
            }
            Row::Key => {
                label(frame, "API key");
                let [input_area, button_area] =
                    Layout::horizontal([Constraint::Fill(1), Constraint::Length(12)]).areas(field_area);
                match &form.key {
                    KeyField::Stored => {
                        frame.render_widget(
                            Paragraph::new(form.key.display_value()).style(tp::disabled()),
                            input_area,
                        );
                        frame.render_widget(
                            Paragraph::new(button("Change", form.focus == Field::ChangeKey, true)),
                            button_area,
                        );
                        self.hit_boxes.push((Field::ChangeKey, button_area));
                    }
                    KeyField::Editable { input, .. } => {
                        self.draw_input(
                            frame,
                            field_area,
                            input,
                            true,
                            form.key.placeholder(),
                            form.focus == Field::ApiKey,
                        );
                        self.hit_boxes.push((Field::ApiKey, field_area));
                    }
                    KeyField::Hidden => {}
                }
            }
            Row::KeyHint => {
                frame.render_widget(
                    Paragraph::new(form.key.hint()).style(Style::default().fg(tp::MUTED)),
                    field_area,
                );
            }
            Row::Model => {
                label(frame, "Model");
                let focused = form.focus == Field::Model;
                let line = match form.models.selected() {
                    Some(model) => {
                        let mut line = selector(model, focused);
                        let count = form.models.models().len();
                        if count > 1 {
                            line.push_span(Span::styled(
                                format!("  ({count} models)"),
                                Style::default().fg(tp::MUTED),
                            ));
                        }
                        line
                    }
                    None => {
                        let style = if focused { tp::selected() } else { tp::disabled() };
                        Line::from(Span::styled(form.models.placeholder(), style))
                    }
                };
                frame.render_widget(Paragraph::new(line), field_area);
                self.hit_boxes.push((Field::Model, field_area));
            }
            Row::PullTitle => {
                frame.render_widget(
                    Paragraph::new(" ── Pull a model ─────────────────────")
                        .style(Style::default().fg(tp::MUTED)),
                    rect,
                );
            }
            Row::PullModel => {
                let Some(pull) = &form.pull else { return };
                label(frame, "Name");
                self.draw_input(
                    frame,
                    field_area,
                    &pull.model_name,
                    false,
                    "e.g. llama3",
                    form.focus == Field::PullModel,
                );
                self.hit_boxes.push((Field::PullModel, field_area));
            }
            Row::PullEndpoint => {
                let Some(pull) = &form.pull else { return };
                label(frame, "Host");
                let [host_area, port_label, port_area] = Layout::horizontal([
                    Constraint::Fill(1),
                    Constraint::Length(7),
                    Constraint::Length(8),
                ])
                .areas(field_area);
                self.draw_input(
                    frame,
                    host_area,
                    &pull.host,
                    false,
                    "localhost",
                    form.focus == Field::PullHost,
                );
                frame.render_widget(
                    Paragraph::new("  Port ").style(Style::default().fg(tp::TEXT_DIM)),
                    port_label,
                );
                self.draw_input(
                    frame,
                    port_area,
                    &pull.port,
                    false,
                    "11434",
                    form.focus == Field::PullPort,
                );
                self.hit_boxes.push((Field::PullHost, host_area));
                self.hit_boxes.push((Field::PullPort, port_area));
            }
            Row::PullButton => {
                let Some(pull) = &form.pull else { return };
                let span = if pull.in_flight {
                    button("Pulling…", false, false)
                } else {
                    button("Pull model", form.focus == Field::PullButton, true)
                };
                frame.render_widget(Paragraph::new(span), field_area);
                if !pull.in_flight {
                    self.hit_boxes.push((Field::PullButton, field_area));
                }
            }
            Row::Banner => {
                let style = match &form.banner {
                    ConnectionBanner::Connected => Style::default().fg(tp::SUCCESS),
                    ConnectionBanner::Failed(_) => Style::default().fg(tp::ERROR),
                    _ => Style::default().fg(tp::ACCENT),
                };
                if let Some(text) = form.banner.text() {
                    frame.render_widget(
                        Paragraph::new(format!(" {text}")).style(style),
                        rect,
                    );
                }
            }
            Row::Spacer => {}
            Row::Buttons => {
                let [test_area, _, cancel_area, _, save_area] = Layout::horizontal([
                    Constraint::Length(21),
                    Constraint::Fill(1),
                    Constraint::Length(10),
                    Constraint::Length(1),
                    Constraint::Length(8),
                ])
                .areas(rect);
                let pending = form.banner == ConnectionBanner::Pending;
                frame.render_widget(
                    Paragraph::new(button(
                        "Test connection",
                        form.focus == Field::Test,
                        !pending,
                    )),
                    test_area,
                );
                frame.render_widget(
                    Paragraph::new(button("Cancel", form.focus == Field::Cancel, true)),
                    cancel_area,
                );
                frame.render_widget(
                    Paragraph::new(button("Save", form.focus == Field::Save, true)),
                    save_area,
                );
                self.hit_boxes.push((Field::Test, test_area));
                self.hit_boxes.push((Field::Cancel, cancel_area));
                self.hit_boxes.push((Field::Save, save_area));
            }
        }
    }

    /// Single-line text input.  `masked` inputs show one bullet per char.
    fn draw_input(
        &mut self,
        frame: &mut Frame<'_>,
        area: Rect,
        input: &Input,
        masked: bool,
        placeholder: &str,
        focused: bool,
    ) {
        let width = area.width.saturating_sub(1) as usize;
        let style = if focused {
            Style::default().fg(tp::TEXT).add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default().fg(tp::TEXT_DIM).add_modifier(Modifier::UNDERLINED)
        };

        if input.value().is_empty() {
            frame.render_widget(
                Paragraph::new(placeholder.to_string())
                    .style(Style::default().fg(tp::MUTED).add_modifier(Modifier::ITALIC)),
                area,
            );
            if focused {
                self.cursor = Some(Position::new(area.x, area.y));
            }
            return;
        }

        let shown: String = if masked {
            "•".repeat(input.value().chars().count())
        } else {
            input.value().to_string()
        };
        let cursor = if masked {
            input.cursor()
        } else {
            input.visual_cursor()
        };
        let scroll = cursor.saturating_sub(width.saturating_sub(1));
        let visible: String = shown.chars().skip(scroll).take(width).collect();
        frame.render_widget(Paragraph::new(visible).style(style), area);

        if focused {
            let offset = (cursor - scroll).min(width) as u16;
            self.cursor = Some(Position::new(area.x + offset, area.y));
        }
    }
}

fn selector(value: &str, focused: bool) -> Line<'static> {
    let arrow = Style::default().fg(if focused { tp::ACCENT_BRIGHT } else { tp::MUTED });
    let value_style = if focused {
        tp::selected()
    } else {
        Style::default().fg(tp::TEXT)
    };
    Line::from(vec![
        Span::styled("◀ ", arrow),
        Span::styled(value.to_string(), value_style),
        Span::styled(" ▶", arrow),
    ])
}

fn button(label: &str, focused: bool, enabled: bool) -> Line<'static> {
    let style = if !enabled {
        tp::disabled()
    } else if focused {
        tp::selected()
    } else {
        Style::default().fg(tp::ACCENT)
    };
    Line::from(Span::styled(format!("[ {label} ]"), style))
}

fn edit_input(input: &mut Input, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let request = match key.code {
        KeyCode::Char('u') if ctrl => InputRequest::DeleteLine,
        KeyCode::Char('w') if ctrl => InputRequest::DeletePrevWord,
        KeyCode::Char('a') if ctrl => InputRequest::GoToStart,
        KeyCode::Char('e') if ctrl => InputRequest::GoToEnd,
        KeyCode::Char(c) if !ctrl => InputRequest::InsertChar(c),
        KeyCode::Backspace => InputRequest::DeletePrevChar,
        KeyCode::Delete => InputRequest::DeleteNextChar,
        KeyCode::Left => InputRequest::GoToPrevChar,
        KeyCode::Right => InputRequest::GoToNextChar,
        KeyCode::Home => InputRequest::GoToStart,
        KeyCode::End => InputRequest::GoToEnd,
        _ => return false,
    };
    input.handle(request);
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use ratatui::{Terminal, backend::TestBackend};
    use tokio::sync::mpsc;

    use super::*;
    use crate::api::{
        CurrentSettings, ProviderDescriptor, PullRequest, SaveRequest, SettingsBackend,
        TestRequest, TestResponse,
    };
    use crate::panel::{PanelEvent, PanelOptions};

    struct StubBackend;

    #[async_trait]
    impl SettingsBackend for StubBackend {
        async fn providers(&self) -> crate::error::Result<Vec<ProviderDescriptor>> {
            Ok(catalog())
        }
        async fn current_settings(&self) -> crate::error::Result<CurrentSettings> {
            Ok(CurrentSettings::default())
        }
        async fn save_settings(&self, _request: &SaveRequest) -> crate::error::Result<()> {
            Ok(())
        }
        async fn models(&self, _provider: &str) -> crate::error::Result<Vec<String>> {
            Ok(vec!["model-a".into(), "model-b".into()])
        }
        async fn pull_model(&self, _request: &PullRequest) -> crate::error::Result<()> {
            Ok(())
        }
        async fn test_connection(&self, _request: &TestRequest) -> crate::error::Result<TestResponse> {
            Ok(TestResponse {
                connected: true,
                message: None,
            })
        }
    }

    fn catalog() -> Vec<ProviderDescriptor> {
        vec![
            ProviderDescriptor {
                id: "gemini".into(),
                name: "Google Gemini".into(),
                description: "Hosted models".into(),
                requires_api_key: true,
                requires_host: false,
            },
            ProviderDescriptor {
                id: "ollama".into(),
                name: "Ollama".into(),
                description: "Local models".into(),
                requires_api_key: false,
                requires_host: true,
            },
        ]
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    /// A mounted panel with the stub catalog applied and the models loaded.
    async fn loaded_panel(
        settings: CurrentSettings,
    ) -> (SettingsPanel, mpsc::UnboundedReceiver<Action>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut panel = SettingsPanel::new(Arc::new(StubBackend), tx, PanelOptions::default());
        panel.host_ready();
        panel.initialize();
        // Replace whatever the stub returns with the settings under test.
        while let Ok(Some(action)) = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
            if let Action::Panel(event) = action {
                let event = match event {
                    PanelEvent::Loaded(_) => PanelEvent::Loaded(Ok((catalog(), settings.clone()))),
                    other => other,
                };
                panel.handle_event(event);
            }
        }
        (panel, rx)
    }

    fn render(dialog: &mut SettingsDialog, panel: &SettingsPanel) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 30)).unwrap();
        terminal
            .draw(|frame| dialog.draw(frame, frame.area(), panel))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn esc_closes() {
        let (mut panel, _rx) = loaded_panel(CurrentSettings::default()).await;
        let mut dialog = SettingsDialog::new();
        assert_eq!(dialog.handle_key(&mut panel, key(KeyCode::Esc)), Action::CloseSettings);
    }

    #[tokio::test]
    async fn click_outside_closes_and_inside_does_not() {
        let (mut panel, _rx) = loaded_panel(CurrentSettings::default()).await;
        let mut dialog = SettingsDialog::new();
        render(&mut dialog, &panel);
        let area = dialog.area().unwrap();

        assert_eq!(dialog.handle_mouse(&mut panel, click(0, 0)), Action::CloseSettings);
        assert_eq!(
            dialog.handle_mouse(&mut panel, click(area.x + 1, area.y + 1)),
            Action::Noop
        );
    }

    #[tokio::test]
    async fn typing_goes_into_the_focused_key_input() {
        let (mut panel, _rx) = loaded_panel(CurrentSettings::default()).await;
        let mut dialog = SettingsDialog::new();
        dialog.handle_key(&mut panel, key(KeyCode::Tab));
        assert_eq!(panel.form().focus, Field::ApiKey);

        for c in "sk-1".chars() {
            dialog.handle_key(&mut panel, key(KeyCode::Char(c)));
        }
        dialog.handle_key(&mut panel, key(KeyCode::Backspace));
        assert_eq!(panel.key_field().value(), Some("sk-"));

        let screen = render(&mut dialog, &panel);
        assert!(!screen.contains("sk-"));
        assert!(screen.contains("•••"));
    }

    #[tokio::test]
    async fn arrows_on_provider_switch_the_form() {
        let (mut panel, _rx) = loaded_panel(CurrentSettings::default()).await;
        let mut dialog = SettingsDialog::new();
        assert_eq!(panel.form().focus, Field::Provider);

        dialog.handle_key(&mut panel, key(KeyCode::Right));
        assert_eq!(panel.selected_provider(), "ollama");
        assert!(!panel.key_field().is_visible());
        assert!(panel.form().pull.is_some());

        let screen = render(&mut dialog, &panel);
        assert!(screen.contains("Ollama"));
        assert!(screen.contains("Pull model"));
        assert!(!screen.contains("API key"));
    }

    #[tokio::test]
    async fn stored_key_shows_change_button() {
        let settings = CurrentSettings {
            provider: "gemini".into(),
            model_name: "model-b".into(),
            api_key_set: true,
            configured: true,
            ..Default::default()
        };
        let (mut panel, _rx) = loaded_panel(settings).await;
        let mut dialog = SettingsDialog::new();

        let screen = render(&mut dialog, &panel);
        assert!(screen.contains("[ Change ]"));
        assert!(screen.contains("model-b"));

        dialog.handle_key(&mut panel, key(KeyCode::Tab));
        assert_eq!(panel.form().focus, Field::ChangeKey);
        dialog.handle_key(&mut panel, key(KeyCode::Enter));
        assert!(panel.key_field().is_enabled());
        assert_eq!(panel.form().focus, Field::ApiKey);
    }

    #[tokio::test]
    async fn paste_inserts_into_pull_model_name() {
        let (mut panel, _rx) = loaded_panel(CurrentSettings::default()).await;
        let mut dialog = SettingsDialog::new();
        panel.select_provider("ollama").unwrap();
        panel.form_mut().focus = Field::PullModel;

        dialog.handle_paste(&mut panel, "llama3\n");
        let pull = panel.form().pull.as_ref().unwrap();
        assert_eq!(pull.model_name.value(), "llama3");
    }
}
