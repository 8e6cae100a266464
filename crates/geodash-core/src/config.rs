use crate::error::{GeodashError, Result};
use crate::models::LngLat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Set programmatically by the host application
    Override,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Override => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Map defaults
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub center: LngLat,
    pub zoom: f64,
    /// Zoom applied when a search result is focused
    pub search_zoom: f64,
}

/// Customer label markers
#[derive(Debug, Clone, PartialEq)]
pub struct LabelConfig {
    /// Labels are hidden below this zoom
    pub min_zoom: f64,
    /// Maximum number of labels displayed at once
    pub limit: usize,
    /// Marker cache soft bound as a multiple of `limit`
    pub cache_factor: usize,
}

impl LabelConfig {
    pub fn cache_bound(&self) -> usize {
        self.limit.saturating_mul(self.cache_factor)
    }
}

/// Density layer fed with the filtered view
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapConfig {
    /// Demand value rendered at full intensity
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub debounce: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    pub max_waypoints: usize,
}

/// Deep-link navigation
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationConfig {
    /// How long the app launch gets before the web fallback opens
    pub timeout: Duration,
    /// Minimum interval between two accepted navigation requests
    pub debounce: Duration,
    pub source_app: String,
    pub app_scheme: String,
    pub web_host: String,
    pub mode: String,
}

/// Web-service adapters (IP location, driving routes)
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub key: Option<String>,
    pub timeout: Duration,
}

/// Fully resolved dashboard configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub map: MapConfig,
    pub labels: LabelConfig,
    pub heatmap: HeatmapConfig,
    pub search: SearchConfig,
    pub route: RouteConfig,
    pub navigation: NavigationConfig,
    pub services: ServiceConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        // Defaults always validate
        LayeredConfig::with_defaults().build()
    }
}

impl DashboardConfig {
    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.labels.limit == 0 {
            return Err(invalid("labels.limit", "must be greater than zero"));
        }
        if self.labels.cache_factor == 0 {
            return Err(invalid("labels.cache_factor", "must be greater than zero"));
        }
        if !(self.heatmap.max.is_finite() && self.heatmap.max > 0.0) {
            return Err(invalid("heatmap.max", "must be a positive number"));
        }
        if self.route.max_waypoints == 0 {
            return Err(invalid("route.max_waypoints", "must be greater than zero"));
        }
        if self.navigation.timeout.is_zero() {
            return Err(invalid("navigation.timeout_ms", "must be greater than zero"));
        }
        if self.services.timeout.is_zero() {
            return Err(invalid("services.timeout_secs", "must be greater than zero"));
        }
        if self.navigation.app_scheme.trim().is_empty() {
            return Err(invalid("navigation.app_scheme", "cannot be empty"));
        }
        if self.navigation.web_host.trim().is_empty() {
            return Err(invalid("navigation.web_host", "cannot be empty"));
        }
        Ok(())
    }
}

/// Layered configuration for geodash
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub map_center: ConfigValue<LngLat>,
    pub map_zoom: ConfigValue<f64>,
    pub search_zoom: ConfigValue<f64>,
    pub label_min_zoom: ConfigValue<f64>,
    pub label_limit: ConfigValue<usize>,
    pub label_cache_factor: ConfigValue<usize>,
    pub heatmap_max: ConfigValue<f64>,
    pub search_debounce_ms: ConfigValue<u64>,
    pub max_waypoints: ConfigValue<usize>,
    pub nav_timeout_ms: ConfigValue<u64>,
    pub nav_debounce_ms: ConfigValue<u64>,
    pub source_app: ConfigValue<String>,
    pub app_scheme: ConfigValue<String>,
    pub web_host: ConfigValue<String>,
    pub nav_mode: ConfigValue<String>,
    pub service_url: ConfigValue<String>,
    pub service_key: ConfigValue<Option<String>>,
    pub service_timeout_secs: ConfigValue<u64>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        let d = ConfigSource::Default;
        Self {
            map_center: ConfigValue::new(LngLat::DEFAULT_CENTER, d),
            map_zoom: ConfigValue::new(10.0, d),
            search_zoom: ConfigValue::new(16.0, d),
            label_min_zoom: ConfigValue::new(14.0, d),
            label_limit: ConfigValue::new(100, d),
            label_cache_factor: ConfigValue::new(3, d),
            heatmap_max: ConfigValue::new(100.0, d),
            search_debounce_ms: ConfigValue::new(300, d),
            max_waypoints: ConfigValue::new(16, d),
            nav_timeout_ms: ConfigValue::new(500, d),
            nav_debounce_ms: ConfigValue::new(1500, d),
            source_app: ConfigValue::new("geodash".to_string(), d),
            app_scheme: ConfigValue::new("androidamap".to_string(), d),
            web_host: ConfigValue::new("uri.amap.com".to_string(), d),
            nav_mode: ConfigValue::new("car".to_string(), d),
            service_url: ConfigValue::new("https://restapi.amap.com".to_string(), d),
            service_key: ConfigValue::new(None, d),
            service_timeout_secs: ConfigValue::new(10, d),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeodashError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeodashError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        let f = ConfigSource::File;

        if let Some(map) = file_config.map {
            if let Some([lng, lat]) = map.center {
                let center = LngLat::new(lng, lat).map_err(|e| invalid("map.center", e))?;
                self.map_center.update(center, f);
            }
            if let Some(zoom) = map.zoom {
                self.map_zoom.update(zoom, f);
            }
            if let Some(search_zoom) = map.search_zoom {
                self.search_zoom.update(search_zoom, f);
            }
        }

        if let Some(labels) = file_config.labels {
            if let Some(min_zoom) = labels.min_zoom {
                self.label_min_zoom.update(min_zoom, f);
            }
            if let Some(limit) = labels.limit {
                self.label_limit.update(limit, f);
            }
            if let Some(cache_factor) = labels.cache_factor {
                self.label_cache_factor.update(cache_factor, f);
            }
        }

        if let Some(max) = file_config.heatmap.and_then(|h| h.max) {
            self.heatmap_max.update(max, f);
        }

        if let Some(debounce_ms) = file_config.search.and_then(|s| s.debounce_ms) {
            self.search_debounce_ms.update(debounce_ms, f);
        }

        if let Some(max_waypoints) = file_config.route.and_then(|r| r.max_waypoints) {
            self.max_waypoints.update(max_waypoints, f);
        }

        if let Some(nav) = file_config.navigation {
            if let Some(timeout_ms) = nav.timeout_ms {
                self.nav_timeout_ms.update(timeout_ms, f);
            }
            if let Some(debounce_ms) = nav.debounce_ms {
                self.nav_debounce_ms.update(debounce_ms, f);
            }
            if let Some(source_app) = nav.source_app {
                self.source_app.update(source_app, f);
            }
            if let Some(app_scheme) = nav.app_scheme {
                self.app_scheme.update(app_scheme, f);
            }
            if let Some(web_host) = nav.web_host {
                self.web_host.update(web_host, f);
            }
            if let Some(mode) = nav.mode {
                self.nav_mode.update(mode, f);
            }
        }

        if let Some(services) = file_config.services {
            if let Some(base_url) = services.base_url {
                self.service_url.update(base_url, f);
            }
            if let Some(key) = services.key {
                self.service_key.update(Some(key), f);
            }
            if let Some(timeout_secs) = services.timeout_secs {
                self.service_timeout_secs.update(timeout_secs, f);
            }
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        let e = ConfigSource::Environment;

        // GEODASH_MAP_CENTER
        if let Ok(center_str) = env::var("GEODASH_MAP_CENTER") {
            match parse_center(&center_str) {
                Ok(center) => self.map_center.update(center, e),
                Err(_) => tracing::warn!(
                    "Invalid GEODASH_MAP_CENTER value '{}': expected 'lng,lat'",
                    center_str
                ),
            }
        }

        // GEODASH_SEARCH_ZOOM
        if let Ok(zoom_str) = env::var("GEODASH_SEARCH_ZOOM") {
            match zoom_str.trim().parse::<f64>() {
                Ok(zoom) => self.search_zoom.update(zoom, e),
                Err(_) => {
                    tracing::warn!(
                        "Invalid GEODASH_SEARCH_ZOOM value '{}': expected number",
                        zoom_str
                    )
                }
            }
        }

        // GEODASH_LABEL_MIN_ZOOM
        if let Ok(zoom_str) = env::var("GEODASH_LABEL_MIN_ZOOM") {
            match zoom_str.trim().parse::<f64>() {
                Ok(zoom) => self.label_min_zoom.update(zoom, e),
                Err(_) => tracing::warn!(
                    "Invalid GEODASH_LABEL_MIN_ZOOM value '{}': expected number",
                    zoom_str
                ),
            }
        }

        // GEODASH_LABEL_LIMIT
        if let Ok(limit_str) = env::var("GEODASH_LABEL_LIMIT") {
            match limit_str.trim().parse::<usize>() {
                Ok(limit) => self.label_limit.update(limit, e),
                Err(_) => tracing::warn!(
                    "Invalid GEODASH_LABEL_LIMIT value '{}': expected positive integer",
                    limit_str
                ),
            }
        }

        // GEODASH_SOURCE_APP
        if let Ok(source_app) = env::var("GEODASH_SOURCE_APP") {
            self.source_app.update(source_app, e);
        }

        // GEODASH_SERVICE_URL
        if let Ok(url) = env::var("GEODASH_SERVICE_URL") {
            self.service_url.update(url, e);
        }

        // GEODASH_SERVICE_KEY
        if let Ok(key) = env::var("GEODASH_SERVICE_KEY") {
            if key.trim().is_empty() {
                tracing::warn!("Ignoring empty GEODASH_SERVICE_KEY");
            } else {
                self.service_key.update(Some(key), e);
            }
        }

        self
    }

    /// Apply programmatic overrides from the host application
    pub fn update_from_overrides(&mut self, overrides: ConfigOverrides) {
        let o = ConfigSource::Override;

        if let Some(center) = overrides.map_center {
            self.map_center.update(center, o);
        }

        if let Some(limit) = overrides.label_limit {
            self.label_limit.update(limit, o);
        }

        if let Some(source_app) = overrides.source_app {
            self.source_app.update(source_app, o);
        }

        if let Some(key) = overrides.service_key {
            self.service_key.update(Some(key), o);
        }
    }

    /// Collapse the layers into a validated configuration
    pub fn resolve(&self) -> Result<DashboardConfig> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }

    fn build(&self) -> DashboardConfig {
        DashboardConfig {
            map: MapConfig {
                center: self.map_center.value,
                zoom: self.map_zoom.value,
                search_zoom: self.search_zoom.value,
            },
            labels: LabelConfig {
                min_zoom: self.label_min_zoom.value,
                limit: self.label_limit.value,
                cache_factor: self.label_cache_factor.value,
            },
            heatmap: HeatmapConfig { max: self.heatmap_max.value },
            search: SearchConfig {
                debounce: Duration::from_millis(self.search_debounce_ms.value),
            },
            route: RouteConfig { max_waypoints: self.max_waypoints.value },
            navigation: NavigationConfig {
                timeout: Duration::from_millis(self.nav_timeout_ms.value),
                debounce: Duration::from_millis(self.nav_debounce_ms.value),
                source_app: self.source_app.value.clone(),
                app_scheme: self.app_scheme.value.clone(),
                web_host: self.web_host.value.clone(),
                mode: self.nav_mode.value.clone(),
            },
            services: ServiceConfig {
                base_url: self.service_url.value.clone(),
                key: self.service_key.value.clone(),
                timeout: Duration::from_secs(self.service_timeout_secs.value),
            },
        }
    }

    /// Get the user-facing configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "map.center".to_string(),
            (self.map_center.value.to_string(), self.map_center.source),
        );
        map.insert(
            "labels.min_zoom".to_string(),
            (self.label_min_zoom.value.to_string(), self.label_min_zoom.source),
        );
        map.insert(
            "labels.limit".to_string(),
            (self.label_limit.value.to_string(), self.label_limit.source),
        );
        map.insert(
            "navigation.source_app".to_string(),
            (self.source_app.value.clone(), self.source_app.source),
        );
        map.insert(
            "services.base_url".to_string(),
            (self.service_url.value.clone(), self.service_url.source),
        );
        // Never echo the key itself
        let key_state = if self.service_key.value.is_some() { "set" } else { "unset" };
        map.insert("services.key".to_string(), (key_state.to_string(), self.service_key.source));

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Default, Deserialize, Serialize)]
struct FileConfig {
    map: Option<FileMap>,
    labels: Option<FileLabels>,
    heatmap: Option<FileHeatmap>,
    search: Option<FileSearch>,
    route: Option<FileRoute>,
    navigation: Option<FileNavigation>,
    services: Option<FileServices>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct FileMap {
    center: Option<[f64; 2]>,
    zoom: Option<f64>,
    search_zoom: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct FileLabels {
    min_zoom: Option<f64>,
    limit: Option<usize>,
    cache_factor: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct FileHeatmap {
    max: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct FileSearch {
    debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct FileRoute {
    max_waypoints: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct FileNavigation {
    timeout_ms: Option<u64>,
    debounce_ms: Option<u64>,
    source_app: Option<String>,
    app_scheme: Option<String>,
    web_host: Option<String>,
    mode: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct FileServices {
    base_url: Option<String>,
    key: Option<String>,
    timeout_secs: Option<u64>,
}

/// Programmatic overrides
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub map_center: Option<LngLat>,
    pub label_limit: Option<usize>,
    pub source_app: Option<String>,
    pub service_key: Option<String>,
}

/// Parse a `lng,lat` pair
pub fn parse_center(s: &str) -> Result<LngLat> {
    let parsed = s.split_once(',').and_then(|(lng, lat)| {
        Some((lng.trim().parse::<f64>().ok()?, lat.trim().parse::<f64>().ok()?))
    });

    match parsed {
        Some((lng, lat)) => LngLat::new(lng, lat).map_err(|e| invalid("map.center", e)),
        None => Err(invalid("map.center", format!("Invalid center: {}. Use 'lng,lat'", s))),
    }
}

fn invalid(key: &str, reason: impl ToString) -> GeodashError {
    GeodashError::ConfigInvalid { key: key.to_string(), reason: reason.to_string() }
}
