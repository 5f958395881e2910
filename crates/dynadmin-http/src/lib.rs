//! Admin JSON API for the dynadmin table browser.
//!
//! - **Router**: maps method and path to an [`AdminRoute`]
//! - **Handler trait**: the boundary between HTTP and the browse provider
//! - **Service**: hyper `Service` with body limits and request ids
//! - **Response helpers**: JSON, redirect and error responses
#![allow(missing_docs)]

pub mod body;
pub mod dispatch;
pub mod error;
pub mod response;
pub mod router;
pub mod service;

pub use body::AdminResponseBody;
pub use dispatch::{AdminHandler, ProviderHandler};
pub use error::ApiError;
pub use router::AdminRoute;
pub use service::{AdminHttpConfig, AdminHttpService};
