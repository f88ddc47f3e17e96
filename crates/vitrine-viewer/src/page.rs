//! Page URL parameters and the optional remote config

use std::sync::{Arc, Mutex};

use anyhow::Context;
use bevy::prelude::*;
use vitrine_core::ViewerConfig;
use vitrine_scene::ViewportCommand;
use tracing::{error, info};

/// Settings read from the page URL (`?model=`, `?config=`, `?autoplay=`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Resource)]
pub struct PageParams {
    pub model: Option<String>,
    pub config_url: Option<String>,
    pub autoplay: bool,
}

impl PageParams {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "model" if !value.is_empty() => params.model = Some(value.to_string()),
                "config" if !value.is_empty() => params.config_url = Some(value.to_string()),
                "autoplay" => params.autoplay = is_truthy(value),
                _ => {}
            }
        }
        params
    }

    /// Read the parameters of the current page
    #[cfg(target_arch = "wasm32")]
    pub fn from_location() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let Ok(location) = window.location().href() else {
            return Self::default();
        };
        let Ok(url) = web_sys::Url::new(&location) else {
            return Self::default();
        };
        let search = url.search_params();
        let pairs = ["model", "config", "autoplay"]
            .into_iter()
            .filter_map(|key| search.get(key).map(|value| (key, value)));
        Self::from_pairs(pairs)
    }

    /// Native builds take `key=value` command line arguments instead
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_location() -> Self {
        let pairs: Vec<(String, String)> = std::env::args()
            .skip(1)
            .filter_map(|arg| {
                let (key, value) = arg.split_once('=')?;
                Some((key.trim_start_matches("--").to_string(), value.to_string()))
            })
            .collect();
        Self::from_pairs(pairs)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Result slot for the `?config=` fetch
#[derive(Resource, Default)]
pub struct PendingConfig {
    pub result: Arc<Mutex<Option<Result<String, String>>>>,
}

/// Parse a fetched config body into a validated configuration
pub fn parse_fetched_config(url: &str, fetched: Result<String, String>) -> anyhow::Result<ViewerConfig> {
    let body = fetched
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to fetch viewer config from {}", url))?;
    let config = ViewerConfig::from_toml_str(&body)
        .with_context(|| format!("Invalid viewer config at {}", url))?;
    Ok(config)
}

pub struct PagePlugin {
    pub params: PageParams,
}

impl Plugin for PagePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.params.clone())
            .init_resource::<PendingConfig>()
            .add_systems(Startup, start_page_requests)
            .add_systems(PreUpdate, apply_fetched_config);
    }
}

/// Read a config file for native runs (`config=<path>`)
pub fn load_local_config(path: &str) -> anyhow::Result<ViewerConfig> {
    let config = vitrine_core::load_config(std::path::Path::new(path))
        .with_context(|| format!("Failed to load viewer config from {}", path))?;
    Ok(config)
}

/// Kick off the config fetch and queue the autoplay render
fn start_page_requests(
    params: Res<PageParams>,
    pending: Res<PendingConfig>,
    mut commands: MessageWriter<ViewportCommand>,
) {
    let Some(url) = &params.config_url else {
        if params.autoplay {
            commands.write(ViewportCommand::TriggerRender);
        }
        return;
    };

    if cfg!(target_arch = "wasm32") {
        // The render waits in apply_fetched_config until the config has landed
        info!("Fetching viewer config from {}", url);
        fetch_config_from_url(url.clone(), pending.result.clone());
        return;
    }

    match load_local_config(url) {
        Ok(config) => {
            commands.write(ViewportCommand::Reconfigure(config));
        }
        Err(err) => error!("{:#}", err),
    }
    if params.autoplay {
        commands.write(ViewportCommand::TriggerRender);
    }
}

fn apply_fetched_config(
    params: Res<PageParams>,
    pending: Res<PendingConfig>,
    mut commands: MessageWriter<ViewportCommand>,
) {
    let fetched = match pending.result.try_lock() {
        Ok(mut slot) => slot.take(),
        Err(_) => None,
    };
    let Some(fetched) = fetched else {
        return;
    };
    let url = params.config_url.as_deref().unwrap_or_default();
    match parse_fetched_config(url, fetched) {
        Ok(config) => {
            info!("Loaded viewer config from {}", url);
            commands.write(ViewportCommand::Reconfigure(config));
        }
        Err(err) => {
            // Keep the built-in defaults
            error!("{:#}", err);
        }
    }
    if params.autoplay {
        commands.write(ViewportCommand::TriggerRender);
    }
}

/// Fetch a text document from URL (WASM only)
#[cfg(target_arch = "wasm32")]
fn fetch_config_from_url(url: String, pending_result: Arc<Mutex<Option<Result<String, String>>>>) {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    wasm_bindgen_futures::spawn_local(async move {
        let result = async {
            let window = web_sys::window().ok_or("No window")?;
            let resp_value = JsFuture::from(window.fetch_with_str(&url))
                .await
                .map_err(|e| format!("Fetch failed: {:?}", e))?;
            let resp: web_sys::Response = resp_value
                .dyn_into()
                .map_err(|_| "Response is not a Response object")?;

            if !resp.ok() {
                return Err(format!("HTTP {}: {}", resp.status(), resp.status_text()));
            }

            let text = JsFuture::from(resp.text().map_err(|e| format!("No text: {:?}", e))?)
                .await
                .map_err(|e| format!("Failed to read body: {:?}", e))?;
            text.as_string().ok_or_else(|| "Body is not a string".to_string())
        }
        .await;

        if let Ok(mut pending) = pending_result.lock() {
            *pending = Some(result);
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_config_from_url(url: String, pending_result: Arc<Mutex<Option<Result<String, String>>>>) {
    let result = Err(format!("Fetching {} is not supported on native", url));
    if let Ok(mut pending) = pending_result.lock() {
        *pending = Some(result);
    }
}
