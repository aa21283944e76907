use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use scribe_db::{Database, Deadline, Stores};

use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub stores: Stores,
    pub jwt_secret: String,
    pub request_timeout: Duration,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, jwt_secret: String, request_timeout: Duration) -> AppState {
        Arc::new(Self {
            stores: Stores::new(db),
            jwt_secret,
            request_timeout,
        })
    }

    /// Run blocking store work off the async runtime, bounded by a fresh
    /// request deadline. If the request future is dropped the deadline is
    /// cancelled and any statement still running is interrupted.
    pub async fn run_db<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Stores, &Deadline) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let deadline = Deadline::after(self.request_timeout);
        let _cancel = deadline.cancel_on_drop();
        let stores = self.stores.clone();

        tokio::task::spawn_blocking(move || f(&stores, &deadline))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.to_string())
            })?
    }
}
