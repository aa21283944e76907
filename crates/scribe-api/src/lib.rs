pub mod articles;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod engagement;
pub mod error;
pub mod follows;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod tags;
pub mod users;
pub mod validation;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::{AppState, AppStateInner};
