use crate::error::Result;

/// Page lifecycle signal relevant to the app-launch race
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// Visibility changed to hidden
    Hidden,
    /// Visibility changed to visible
    Visible,
    /// The page is being unloaded
    PageHide,
}

/// Port for leaving the dashboard towards a navigation app or web page
pub trait NavigationHost: Send + Sync {
    /// Attempt to open a custom-scheme URI
    fn launch_app(&self, uri: &str) -> Result<()>;

    /// Open `url` in a new browsing context; `false` when blocked
    fn open_new_context(&self, url: &str) -> bool;

    /// Navigate the current browsing context to `url`
    fn navigate_current(&self, url: &str);
}
