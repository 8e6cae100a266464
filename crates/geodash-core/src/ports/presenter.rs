use crate::models::{CustomerPoint, RouteCandidate, RouteStatus};
use crate::search::SearchPosition;
use crate::stats::DatasetStats;

/// Detail card for a single customer
pub trait DetailPresenter: Send + Sync {
    fn open(&self, point: &CustomerPoint);

    fn close(&self);
}

/// Route preview panel and its map overlay
pub trait RoutePanel: Send + Sync {
    fn show_status(&self, status: &RouteStatus);

    fn draw_route(&self, route: &RouteCandidate);

    fn clear_route(&self);
}

/// Dashboard chrome fed from the store
pub trait DashboardView: Send + Sync {
    fn show_stats(&self, stats: &DatasetStats);

    /// `None` hides the search counter
    fn show_search_position(&self, position: Option<SearchPosition>);
}

/// Toast-style user messages
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}
