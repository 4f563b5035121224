use crate::identity::LaunchContext;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeParams {
    pub bg_color: String,
    pub text_color: String,
    pub hint_color: String,
    pub link_color: String,
    pub button_color: String,
    pub button_text_color: String,
    pub secondary_bg_color: String,
}

impl Default for ThemeParams {
    fn default() -> Self {
        Self {
            bg_color: "#ffffff".into(),
            text_color: "#000000".into(),
            hint_color: "#999999".into(),
            link_color: "#2481cc".into(),
            button_color: "#50a8eb".into(),
            button_text_color: "#ffffff".into(),
            secondary_bg_color: "#f4f4f5".into(),
        }
    }
}

impl ThemeParams {
    /// Launch parameters take precedence over the host object. Unknown keys
    /// are ignored and bad values keep the default.
    pub fn from_context(ctx: &LaunchContext) -> Self {
        let mut theme = Self::default();
        if let Some(params) = ctx.host.as_ref().and_then(|h| h.theme_params.as_ref()) {
            theme.apply(params);
        }
        if let Some(params) = ctx
            .launch_params
            .as_ref()
            .and_then(|lp| lp.theme_params.as_ref())
        {
            theme.apply(params);
        }
        theme
    }

    fn apply(&mut self, params: &BTreeMap<String, String>) {
        for (key, value) in params {
            if !is_hex_color(value) {
                continue;
            }
            let slot = match key.as_str() {
                "bg_color" => &mut self.bg_color,
                "text_color" => &mut self.text_color,
                "hint_color" => &mut self.hint_color,
                "link_color" => &mut self.link_color,
                "button_color" => &mut self.button_color,
                "button_text_color" => &mut self.button_text_color,
                "secondary_bg_color" => &mut self.secondary_bg_color,
                _ => continue,
            };
            *slot = value.to_ascii_lowercase();
        }
    }
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
