use crate::api;
use crate::router::{RouteError, Router};
use crate::state::AppState;

/// The route table together with the state its handlers run against.
/// Built once at startup and shared read-only by every connection.
pub struct App {
    pub router: Router,
    pub state: AppState,
}

impl App {
    pub fn new(state: AppState) -> Result<Self, RouteError> {
        let mut router = Router::new();
        api::register(&mut router)?;
        tracing::debug!(routes = router.len(), "Route table registered");
        Ok(Self { router, state })
    }
}
