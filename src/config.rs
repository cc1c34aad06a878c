use super::*;

pub(crate) const DEFAULT_HIGHLIGHT_COLOR: &str = "rgb(246, 186, 130)";
pub(crate) const DEFAULT_CURRENT_COLOR: &str = "rgb(246, 137, 31)";
pub(crate) const DEFAULT_CLASS_PREFIX: &str = "search-box";

/// Colors and class-name prefix used when a session registers its styles.
///
/// ```
/// use search_highlight::HighlightConfig;
///
/// let config = HighlightConfig::default()
///     .highlight_color("#ffe08a")
///     .class_prefix("find");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    pub(crate) highlight_color: String,
    pub(crate) current_color: String,
    pub(crate) class_prefix: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            highlight_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
            current_color: DEFAULT_CURRENT_COLOR.to_string(),
            class_prefix: DEFAULT_CLASS_PREFIX.to_string(),
        }
    }
}

impl HighlightConfig {
    pub fn highlight_color(mut self, color: impl Into<String>) -> Self {
        self.highlight_color = color.into();
        self
    }

    pub fn current_color(mut self, color: impl Into<String>) -> Self {
        self.current_color = color.into();
        self
    }

    pub fn class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    /// Checks that the values can be spliced into a stylesheet unchanged.
    pub fn validate(&self) -> Result<()> {
        validate_css_value("highlight_color", &self.highlight_color)?;
        validate_css_value("current_color", &self.current_color)?;
        validate_css_value("class_prefix", &self.class_prefix)?;

        let mut chars = self.class_prefix.chars();
        let starts_ok = match (chars.next(), chars.next()) {
            (Some('-'), Some(second)) => second.is_ascii_alphabetic() || second == '_',
            (Some(first), _) => first.is_ascii_alphabetic() || first == '_',
            (None, _) => false,
        };
        if !starts_ok
            || !self
                .class_prefix
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            return Err(Error::InvalidConfig(format!(
                "class_prefix is not a CSS identifier: {}",
                self.class_prefix
            )));
        }
        Ok(())
    }
}

fn validate_css_value(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidConfig(format!("{name} must not be empty")));
    }
    if let Some(ch) = value.chars().find(|ch| matches!(ch, '{' | '}' | ';' | '<')) {
        return Err(Error::InvalidConfig(format!(
            "{name} contains forbidden character {ch:?}"
        )));
    }
    Ok(())
}
