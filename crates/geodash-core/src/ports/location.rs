use crate::error::Result;
use crate::models::PositionFix;
use async_trait::async_trait;

/// Port for one geolocation tier (device positioning or IP city lookup)
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Acquire a position. The fix is validated by the caller.
    async fn locate(&self) -> Result<PositionFix>;

    /// Short identifier used in logs
    fn name(&self) -> &str;
}
