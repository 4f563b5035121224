//! Resolves the current user from what the host runtime handed the page.
//!
//! The host delivers its user record in different places depending on the
//! client version, so resolution walks a ranked list of strategies and the
//! first one that yields a user wins. Everything here is a pure function of
//! the [`LaunchContext`] the page posted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User record as the host serializes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostUser {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitData {
    pub user: Option<HostUser>,
    pub start_param: Option<String>,
}

/// Launch parameters read from the page URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchParams {
    #[serde(rename = "tgWebAppData")]
    pub web_app_data: Option<InitData>,
    #[serde(rename = "tgWebAppInitDataUnsafe")]
    pub init_data_unsafe: Option<InitData>,
    #[serde(rename = "tgWebAppThemeParams")]
    pub theme_params: Option<BTreeMap<String, String>>,
    #[serde(rename = "tgWebAppStartParam")]
    pub start_param: Option<String>,
    #[serde(rename = "tgWebAppPlatform")]
    pub platform: Option<String>,
}

/// Snapshot of the live host object (`window.Telegram.WebApp`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostWebApp {
    #[serde(rename = "initDataUnsafe")]
    pub init_data_unsafe: Option<InitData>,
    #[serde(rename = "themeParams")]
    pub theme_params: Option<BTreeMap<String, String>>,
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchContext {
    pub launch_params: Option<LaunchParams>,
    pub host: Option<HostWebApp>,
}

impl LaunchContext {
    pub fn platform(&self) -> Option<&str> {
        self.launch_params
            .as_ref()
            .and_then(|lp| lp.platform.as_deref())
            .or_else(|| self.host.as_ref().and_then(|h| h.platform.as_deref()))
    }

    /// `ios` for Apple platforms, `base` otherwise.
    pub fn appearance(&self) -> &'static str {
        match self.platform() {
            Some("ios") | Some("macos") => "ios",
            _ => "base",
        }
    }

    pub fn start_param(&self) -> Option<&str> {
        let from_params = self.launch_params.as_ref().and_then(|lp| {
            lp.start_param.as_deref().or_else(|| {
                lp.web_app_data
                    .as_ref()
                    .and_then(|data| data.start_param.as_deref())
            })
        });
        from_params.or_else(|| {
            self.host
                .as_ref()
                .and_then(|h| h.init_data_unsafe.as_ref())
                .and_then(|data| data.start_param.as_deref())
        })
    }

    pub fn debug_requested(&self) -> bool {
        self.start_param().is_some_and(|p| p.contains("debug"))
    }

    /// Host object used for local development outside the host runtime.
    pub fn with_mock_host(mut self) -> Self {
        if self.host.is_none() {
            self.host = Some(HostWebApp {
                init_data_unsafe: Some(InitData {
                    user: Some(HostUser {
                        id: 123_456_789,
                        first_name: "Test".into(),
                        last_name: Some("User".into()),
                        username: Some("testuser".into()),
                        photo_url: None,
                        language_code: Some("en".into()),
                    }),
                    start_param: None,
                }),
                theme_params: None,
                platform: Some("web".into()),
            });
        }
        self
    }
}

/// The current user for this session. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
}

impl Identity {
    /// Key used for the `profiles` table.
    pub fn user_id(&self) -> String {
        self.id.to_string()
    }
}

impl From<&HostUser> for Identity {
    fn from(user: &HostUser) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: non_empty(&user.last_name),
            username: non_empty(&user.username),
            photo_url: non_empty(&user.photo_url),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

pub trait IdentitySource: Send + Sync {
    fn name(&self) -> &'static str;
    fn lookup<'a>(&self, ctx: &'a LaunchContext) -> Option<&'a HostUser>;
}

/// `tgWebAppData.user`
pub struct LaunchData;

/// `tgWebAppInitDataUnsafe.user`
pub struct LegacyInitData;

/// `window.Telegram.WebApp.initDataUnsafe.user`
pub struct HostObject;

impl IdentitySource for LaunchData {
    fn name(&self) -> &'static str {
        "launch_data"
    }

    fn lookup<'a>(&self, ctx: &'a LaunchContext) -> Option<&'a HostUser> {
        ctx.launch_params
            .as_ref()?
            .web_app_data
            .as_ref()?
            .user
            .as_ref()
    }
}

impl IdentitySource for LegacyInitData {
    fn name(&self) -> &'static str {
        "legacy_init_data"
    }

    fn lookup<'a>(&self, ctx: &'a LaunchContext) -> Option<&'a HostUser> {
        ctx.launch_params
            .as_ref()?
            .init_data_unsafe
            .as_ref()?
            .user
            .as_ref()
    }
}

impl IdentitySource for HostObject {
    fn name(&self) -> &'static str {
        "host_object"
    }

    fn lookup<'a>(&self, ctx: &'a LaunchContext) -> Option<&'a HostUser> {
        ctx.host.as_ref()?.init_data_unsafe.as_ref()?.user.as_ref()
    }
}

pub fn default_sources() -> [&'static dyn IdentitySource; 3] {
    [&LaunchData, &LegacyInitData, &HostObject]
}

pub fn resolve_with(sources: &[&dyn IdentitySource], ctx: &LaunchContext) -> Option<Identity> {
    sources.iter().find_map(|source| {
        let user = source.lookup(ctx).filter(|user| user.id != 0)?;
        tracing::debug!(source = source.name(), user_id = user.id, "identity resolved");
        Some(Identity::from(user))
    })
}

pub fn resolve_identity(ctx: &LaunchContext) -> Option<Identity> {
    resolve_with(&default_sources(), ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(id: i64, name: &str) -> HostUser {
        HostUser {
            id,
            first_name: name.into(),
            ..HostUser::default()
        }
    }

    fn init(user: HostUser) -> Option<InitData> {
        Some(InitData {
            user: Some(user),
            start_param: None,
        })
    }

    #[test]
    fn primary_field_wins_over_fallbacks() {
        let ctx = LaunchContext {
            launch_params: Some(LaunchParams {
                web_app_data: init(user(1, "Primary")),
                init_data_unsafe: init(user(2, "Legacy")),
                ..LaunchParams::default()
            }),
            host: Some(HostWebApp {
                init_data_unsafe: init(user(3, "Host")),
                ..HostWebApp::default()
            }),
        };

        let identity = resolve_identity(&ctx).expect("identity");
        assert_eq!(identity.id, 1);
        assert_eq!(identity.first_name, "Primary");
    }

    #[test]
    fn falls_back_to_legacy_then_host() {
        let mut ctx = LaunchContext {
            launch_params: Some(LaunchParams {
                init_data_unsafe: init(user(2, "Legacy")),
                ..LaunchParams::default()
            }),
            host: Some(HostWebApp {
                init_data_unsafe: init(user(3, "Host")),
                ..HostWebApp::default()
            }),
        };
        assert_eq!(resolve_identity(&ctx).map(|i| i.id), Some(2));

        ctx.launch_params = None;
        assert_eq!(resolve_identity(&ctx).map(|i| i.id), Some(3));
    }

    #[test]
    fn zero_id_is_not_a_match() {
        let ctx = LaunchContext {
            launch_params: Some(LaunchParams {
                web_app_data: init(user(0, "")),
                ..LaunchParams::default()
            }),
            host: Some(HostWebApp {
                init_data_unsafe: init(user(9, "Host")),
                ..HostWebApp::default()
            }),
        };
        assert_eq!(resolve_identity(&ctx).map(|i| i.id), Some(9));
    }

    #[test]
    fn empty_context_resolves_nothing() {
        assert!(resolve_identity(&LaunchContext::default()).is_none());
    }

    #[test]
    fn parses_host_payload_shape() {
        let ctx: LaunchContext = serde_json::from_value(json!({
            "launch_params": {
                "tgWebAppPlatform": "macos",
                "tgWebAppStartParam": "platformer_debug",
                "tgWebAppData": {
                    "user": { "id": 42, "first_name": "Ada", "username": "", "photo_url": "https://x/y.png" }
                }
            }
        }))
        .unwrap();

        let identity = resolve_identity(&ctx).unwrap();
        assert_eq!(identity.user_id(), "42");
        assert_eq!(identity.username, None);
        assert_eq!(identity.photo_url.as_deref(), Some("https://x/y.png"));
        assert_eq!(ctx.appearance(), "ios");
        assert!(ctx.debug_requested());
    }

    #[test]
    fn mock_host_only_fills_missing_host() {
        let ctx = LaunchContext::default().with_mock_host();
        assert_eq!(resolve_identity(&ctx).map(|i| i.id), Some(123_456_789));

        let real = LaunchContext {
            launch_params: None,
            host: Some(HostWebApp::default()),
        }
        .with_mock_host();
        assert!(resolve_identity(&real).is_none());
    }
}
