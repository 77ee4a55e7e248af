pub mod actions;
pub mod auth;
pub mod error;
pub mod ledger;
pub mod middleware;
pub mod password;
pub mod routes;
pub mod state;
pub mod users;

mod convert;

pub use routes::router;
pub use state::{AppState, AppStateInner};
