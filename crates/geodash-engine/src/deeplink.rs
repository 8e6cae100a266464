//! Navigation deep links and the app-launch race.
//!
//! `navigate` tries the navigation app through its URI scheme and waits for
//! the page to be hidden. If nothing hides the page before the timeout, the
//! web navigation page is opened instead. The pending race is a value that
//! is consumed exactly once, so the timer and the page-event subscription
//! are released together whichever trigger settles it.

use crate::lock;
use geodash_core::config::NavigationConfig;
use geodash_core::models::{CustomerPoint, LngLat};
use geodash_core::ports::{NavigationHost, Notifier, PageEvent};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, Sleep};

const DEFAULT_POI_NAME: &str = "Destination";

/// Where to navigate to
#[derive(Debug, Clone, PartialEq)]
pub enum NavTarget {
    Position { position: LngLat, name: String },
    /// Only a postal address is known
    Address(String),
}

impl NavTarget {
    /// Target for a customer: its position when valid, else its address
    pub fn for_point(point: &CustomerPoint) -> Option<Self> {
        match point.position {
            Some(position) => Some(NavTarget::Position { position, name: point.name.clone() }),
            None => {
                let address = point.address.trim();
                (!address.is_empty()).then(|| NavTarget::Address(address.to_string()))
            }
        }
    }
}

/// Everything the web navigation page can be told
#[derive(Debug, Clone, PartialEq)]
pub struct WebNavigation {
    pub to: NavTarget,
    /// Origin position and its label
    pub from: Option<(LngLat, String)>,
    /// Ordered via points
    pub via: Vec<LngLat>,
}

impl WebNavigation {
    pub fn direct(to: NavTarget) -> Self {
        Self { to, from: None, via: Vec::new() }
    }
}

/// Builds app URIs and web fallback URLs
#[derive(Debug, Clone, PartialEq)]
pub struct DeepLinkBuilder {
    source_app: String,
    app_scheme: String,
    web_host: String,
    mode: String,
}

impl DeepLinkBuilder {
    pub fn new(config: &NavigationConfig) -> Self {
        Self {
            source_app: config.source_app.clone(),
            app_scheme: config.app_scheme.clone(),
            web_host: config.web_host.clone(),
            mode: config.mode.clone(),
        }
    }

    /// `scheme://navi?sourceApplication=..&poiname=..&lat=..&lon=..&dev=0&style=0`
    pub fn app_uri(&self, position: LngLat, name: &str) -> String {
        let name = if name.trim().is_empty() { DEFAULT_POI_NAME } else { name };
        format!(
            "{}://navi?sourceApplication={}&poiname={}&lat={}&lon={}&dev=0&style=0",
            self.app_scheme,
            encode(&self.source_app),
            encode(name),
            position.lat(),
            position.lng()
        )
    }

    pub fn web_url(&self, navigation: &WebNavigation) -> String {
        let mut url = format!(
            "https://{}/navigation?mode={}&callnative=1&src={}",
            self.web_host,
            encode(&self.mode),
            encode(&self.source_app)
        );

        match &navigation.to {
            NavTarget::Position { position, name } => {
                url.push_str("&coordinate=gaode&to=");
                url.push_str(&labelled(*position, name));
            }
            NavTarget::Address(address) => {
                url.push_str("&to=");
                url.push_str(&encode(address.trim()));
            }
        }

        if let Some((origin, label)) = &navigation.from {
            url.push_str("&from=");
            url.push_str(&labelled(*origin, label));
        }

        if !navigation.via.is_empty() {
            let via: Vec<String> =
                navigation.via.iter().map(|p| format!("{},{}", p.lng(), p.lat())).collect();
            url.push_str("&via=");
            url.push_str(&via.join(";"));
        }

        url
    }
}

/// `lng,lat[,name]` with commas in the name replaced by spaces
fn labelled(position: LngLat, name: &str) -> String {
    let safe = name.replace(',', " ");
    let safe = safe.trim();
    if safe.is_empty() {
        format!("{},{}", position.lng(), position.lat())
    } else {
        format!("{},{},{}", position.lng(), position.lat(), encode(safe))
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// What settled the launch race
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupTrigger {
    Timeout,
    PageHidden,
    PageHide,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// Within the debounce interval of the previous accepted call
    Debounced,
    /// Neither a position nor an address is known
    Rejected,
    /// The page was hidden before the timeout; assumed the app took over
    AppLaunched { trigger: CleanupTrigger },
    WebFallback { url: String, new_context: bool },
}

/// Pending app launch. Consumed by [`LaunchRace::settle`], which drops the
/// timer and the page-event subscription in one place.
struct LaunchRace {
    timer: Pin<Box<Sleep>>,
    events: broadcast::Receiver<PageEvent>,
}

impl LaunchRace {
    fn start(timeout: Duration, events: broadcast::Receiver<PageEvent>) -> Self {
        Self { timer: Box::pin(tokio::time::sleep(timeout)), events }
    }

    async fn settle(mut self) -> CleanupTrigger {
        let mut listening = true;
        loop {
            tokio::select! {
                _ = &mut self.timer => return CleanupTrigger::Timeout,
                event = self.events.recv(), if listening => match event {
                    Ok(PageEvent::Hidden) => return CleanupTrigger::PageHidden,
                    Ok(PageEvent::PageHide) => return CleanupTrigger::PageHide,
                    Ok(PageEvent::Visible) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => listening = false,
                },
            }
        }
    }
}

/// Opens a customer in the external navigation app, falling back to the web
pub struct DeepLinkNavigator {
    host: Arc<dyn NavigationHost>,
    notifier: Arc<dyn Notifier>,
    links: DeepLinkBuilder,
    timeout: Duration,
    debounce: Duration,
    last_accepted: Mutex<Option<Instant>>,
    page_events: broadcast::Sender<PageEvent>,
}

impl DeepLinkNavigator {
    pub fn new(
        host: Arc<dyn NavigationHost>,
        notifier: Arc<dyn Notifier>,
        config: &NavigationConfig,
    ) -> Self {
        let (page_events, _) = broadcast::channel(16);
        Self {
            host,
            notifier,
            links: DeepLinkBuilder::new(config),
            timeout: config.timeout,
            debounce: config.debounce,
            last_accepted: Mutex::new(None),
            page_events,
        }
    }

    pub fn links(&self) -> &DeepLinkBuilder {
        &self.links
    }

    /// Feed a page lifecycle signal into any pending launch race
    pub fn page_event(&self, event: PageEvent) {
        // No receivers simply means no race is pending
        let _ = self.page_events.send(event);
    }

    /// Navigate to a customer
    pub async fn navigate(&self, point: &CustomerPoint) -> NavigationOutcome {
        if !self.accept() {
            return NavigationOutcome::Debounced;
        }
        match NavTarget::for_point(point) {
            Some(target) => self.run(WebNavigation::direct(target)).await,
            None => self.reject(),
        }
    }

    /// Navigate with a full route context; the web fallback carries `from` and `via`
    pub async fn navigate_route(&self, navigation: WebNavigation) -> NavigationOutcome {
        if !self.accept() {
            return NavigationOutcome::Debounced;
        }
        self.run(navigation).await
    }

    fn accept(&self) -> bool {
        let now = Instant::now();
        let mut last = lock(&self.last_accepted);
        if let Some(previous) = *last {
            if now.duration_since(previous) < self.debounce {
                tracing::debug!("Navigation ignored within debounce interval");
                return false;
            }
        }
        *last = Some(now);
        true
    }

    fn reject(&self) -> NavigationOutcome {
        tracing::warn!("Navigation target has neither position nor address");
        self.notifier.notify("Customer location is unavailable");
        NavigationOutcome::Rejected
    }

    async fn run(&self, navigation: WebNavigation) -> NavigationOutcome {
        let (position, name) = match &navigation.to {
            NavTarget::Position { position, name } => (*position, name.clone()),
            NavTarget::Address(_) => return self.fall_back(&navigation),
        };

        // Subscribe before launching so a hide caused by the launch is not missed
        let race = LaunchRace::start(self.timeout, self.page_events.subscribe());

        let uri = self.links.app_uri(position, &name);
        if let Err(e) = self.host.launch_app(&uri) {
            tracing::warn!(error = %e, "App launch failed, waiting for web fallback");
        }

        match race.settle().await {
            CleanupTrigger::Timeout => self.fall_back(&navigation),
            trigger => {
                tracing::info!(?trigger, "Navigation app took over");
                NavigationOutcome::AppLaunched { trigger }
            }
        }
    }

    fn fall_back(&self, navigation: &WebNavigation) -> NavigationOutcome {
        let url = self.links.web_url(navigation);
        let new_context = self.host.open_new_context(&url);
        if !new_context {
            self.host.navigate_current(&url);
        }
        tracing::info!(%url, new_context, "Opened web navigation");
        NavigationOutcome::WebFallback { url, new_context }
    }
}
