//! Form state of the settings dialog.

use tui_input::Input;

/// Placeholder shown in the key input when a key is already on file.
pub const MASKED_KEY: &str = "••••••••••••••••••••••••••";

/// State of the API-key input.
///
/// "Input enabled" and "Change button visible" are both derived from this
/// one value, so they can never disagree.
#[derive(Debug, Clone, Default)]
pub enum KeyField {
    /// The selected provider takes no key.
    #[default]
    Hidden,
    /// A key is stored for the selected provider: disabled, masked input
    /// with a Change button next to it.
    Stored,
    /// Editable input.  `replacing` is set when the user pressed Change.
    Editable { input: Input, replacing: bool },
}

impl KeyField {
    pub fn editable() -> Self {
        Self::Editable {
            input: Input::default(),
            replacing: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Editable { .. })
    }

    pub fn change_visible(&self) -> bool {
        matches!(self, Self::Stored)
    }

    /// Literal input value, only while the input is enabled.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Editable { input, .. } => Some(input.value()),
            _ => None,
        }
    }

    pub fn input_mut(&mut self) -> Option<&mut Input> {
        match self {
            Self::Editable { input, .. } => Some(input),
            _ => None,
        }
    }

    /// What the input shows on screen.
    pub fn display_value(&self) -> String {
        match self {
            Self::Hidden => String::new(),
            Self::Stored => MASKED_KEY.to_string(),
            Self::Editable { input, .. } => "•".repeat(input.value().chars().count()),
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Editable { replacing: true, .. } => "Enter the new API key…",
            Self::Editable { .. } => "Enter API key…",
            _ => "",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::Stored => "API key saved",
            Self::Editable { .. } => "Get an API key from the provider's website",
            Self::Hidden => "",
        }
    }
}

/// Contents of the model selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModelChoices {
    #[default]
    Loading,
    Loaded { models: Vec<String>, selected: usize },
    /// The backend returned an empty list.
    Empty,
    /// The model request failed.
    Failed,
}

impl ModelChoices {
    pub fn selected(&self) -> Option<&str> {
        match self {
            Self::Loaded { models, selected } => models.get(*selected).map(String::as_str),
            _ => None,
        }
    }

    pub fn models(&self) -> &[String] {
        match self {
            Self::Loaded { models, .. } => models,
            _ => &[],
        }
    }

    /// Placeholder label when there is nothing to choose.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Loading => "Loading…",
            Self::Empty => "No models available",
            Self::Failed => "Error loading models",
            Self::Loaded { .. } => "",
        }
    }

    /// Select `model` if it is in the list.
    pub fn select(&mut self, model: &str) -> bool {
        if let Self::Loaded { models, selected } = self {
            if let Some(index) = models.iter().position(|m| m == model) {
                *selected = index;
                return true;
            }
        }
        false
    }

    /// Move the selection by `offset`, wrapping around.
    pub fn step(&mut self, offset: isize) {
        if let Self::Loaded { models, selected } = self {
            if models.is_empty() {
                return;
            }
            let len = models.len() as isize;
            *selected = (*selected as isize + offset).rem_euclid(len) as usize;
        }
    }
}

/// Inline connection-test banner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionBanner {
    #[default]
    Hidden,
    Pending,
    Connected,
    Failed(String),
}

impl ConnectionBanner {
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Hidden => None,
            Self::Pending => Some("Testing connection…".to_string()),
            Self::Connected => Some("Connection successful!".to_string()),
            Self::Failed(message) => Some(format!("Error: {message}")),
        }
    }
}

/// Host, port and model name for pulling a model onto a local provider.
#[derive(Debug, Clone, Default)]
pub struct PullForm {
    pub model_name: Input,
    pub host: Input,
    pub port: Input,
    /// A pull request is in flight; the button is disabled meanwhile.
    pub in_flight: bool,
}

impl PullForm {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            model_name: Input::default(),
            host: Input::new(host.to_string()),
            port: Input::new(port.to_string()),
            in_flight: false,
        }
    }

    pub fn host(&self) -> &str {
        self.host.value().trim()
    }

    /// Parsed port, `None` when the field is not a valid port number.
    pub fn port(&self) -> Option<u16> {
        self.port.value().trim().parse().ok().filter(|port| *port != 0)
    }
}

/// Focusable elements of the dialog, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Provider,
    ApiKey,
    ChangeKey,
    Model,
    PullModel,
    PullHost,
    PullPort,
    PullButton,
    Test,
    Cancel,
    Save,
}

impl Field {
    pub fn is_text_input(self) -> bool {
        matches!(
            self,
            Self::ApiKey | Self::PullModel | Self::PullHost | Self::PullPort
        )
    }
}

/// Everything the dialog shows below the provider selector.
#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub provider: String,
    pub description: String,
    pub key: KeyField,
    pub models: ModelChoices,
    pub pull: Option<PullForm>,
    pub banner: ConnectionBanner,
    pub focus: Field,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self {
            provider: String::new(),
            description: String::new(),
            key: KeyField::Hidden,
            models: ModelChoices::Loading,
            pull: None,
            banner: ConnectionBanner::Hidden,
            focus: Field::Provider,
        }
    }
}

impl SettingsForm {
    /// Fields that can currently take focus, in tab order.
    pub fn focus_order(&self) -> Vec<Field> {
        let mut fields = vec![Field::Provider];
        match self.key {
            KeyField::Hidden => {}
            KeyField::Stored => fields.push(Field::ChangeKey),
            KeyField::Editable { .. } => fields.push(Field::ApiKey),
        }
        fields.push(Field::Model);
        if let Some(pull) = &self.pull {
            fields.extend([Field::PullModel, Field::PullHost, Field::PullPort]);
            if !pull.in_flight {
                fields.push(Field::PullButton);
            }
        }
        fields.extend([Field::Test, Field::Cancel, Field::Save]);
        fields
    }

    /// Move focus `offset` steps through [`Self::focus_order`].
    pub fn move_focus(&mut self, offset: isize) {
        let order = self.focus_order();
        let len = order.len() as isize;
        let current = order
            .iter()
            .position(|f| *f == self.focus)
            .map_or(0, |i| i as isize);
        self.focus = order[(current + offset).rem_euclid(len) as usize];
    }

    /// Pull focus back onto a visible field after the form was rebuilt.
    pub fn clamp_focus(&mut self) {
        if !self.focus_order().contains(&self.focus) {
            self.focus = Field::Provider;
        }
    }

    /// Text input behind the focused field, if any.
    pub fn focused_input(&mut self) -> Option<&mut Input> {
        match self.focus {
            Field::ApiKey => self.key.input_mut(),
            Field::PullModel => self.pull.as_mut().map(|p| &mut p.model_name),
            Field::PullHost => self.pull.as_mut().map(|p| &mut p.host),
            Field::PullPort => self.pull.as_mut().map(|p| &mut p.port),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_field_enabled_and_change_are_exclusive() {
        for field in [KeyField::Hidden, KeyField::Stored, KeyField::editable()] {
            assert!(!(field.is_enabled() && field.change_visible()));
        }
        assert!(KeyField::Stored.change_visible());
        assert!(!KeyField::Stored.is_enabled());
        assert!(KeyField::editable().is_enabled());
        assert!(!KeyField::Hidden.is_visible());
    }

    #[test]
    fn stored_key_is_masked_and_has_no_value() {
        let field = KeyField::Stored;
        assert_eq!(field.display_value(), MASKED_KEY);
        assert_eq!(field.value(), None);
    }

    #[test]
    fn editable_key_masks_what_was_typed() {
        let field = KeyField::Editable {
            input: Input::new("abc".into()),
            replacing: true,
        };
        assert_eq!(field.value(), Some("abc"));
        assert_eq!(field.display_value(), "•••");
        assert_eq!(field.placeholder(), "Enter the new API key…");
    }

    #[test]
    fn model_choices_step_and_select() {
        let mut choices = ModelChoices::Loaded {
            models: vec!["a".into(), "b".into(), "c".into()],
            selected: 0,
        };
        choices.step(-1);
        assert_eq!(choices.selected(), Some("c"));
        choices.step(2);
        assert_eq!(choices.selected(), Some("b"));
        assert!(choices.select("a"));
        assert!(!choices.select("z"));
        assert_eq!(choices.selected(), Some("a"));
    }

    #[test]
    fn placeholders_have_no_selection() {
        for choices in [ModelChoices::Loading, ModelChoices::Empty, ModelChoices::Failed] {
            assert_eq!(choices.selected(), None);
            assert!(!choices.placeholder().is_empty());
        }
    }

    #[test]
    fn focus_order_follows_visible_fields() {
        let mut form = SettingsForm {
            key: KeyField::Stored,
            ..Default::default()
        };
        assert_eq!(
            form.focus_order(),
            vec![
                Field::Provider,
                Field::ChangeKey,
                Field::Model,
                Field::Test,
                Field::Cancel,
                Field::Save
            ]
        );

        form.key = KeyField::Hidden;
        form.pull = Some(PullForm::new("localhost", 11434));
        assert!(form.focus_order().contains(&Field::PullButton));

        form.pull.as_mut().unwrap().in_flight = true;
        assert!(!form.focus_order().contains(&Field::PullButton));
    }

    #[test]
    fn move_focus_wraps() {
        let mut form = SettingsForm::default();
        form.move_focus(-1);
        assert_eq!(form.focus, Field::Save);
        form.move_focus(1);
        assert_eq!(form.focus, Field::Provider);
    }

    #[test]
    fn pull_form_parses_port() {
        let mut pull = PullForm::new("ollama", 11434);
        assert_eq!(pull.port(), Some(11434));
        pull.port = Input::new("eleven".into());
        assert_eq!(pull.port(), None);
    }
}
