mod client;
mod error;
mod http_client;
mod key_api;

pub use client::PortalClient;
pub use error::ApiError;
pub use http_client::{Envelope, Refusal};
pub use key_api::KeyApi;
