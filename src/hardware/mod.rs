//! OMBEA hardware-control API.
//!
//! `VotingHardware` is the seam the session coordinator depends on; `OmbeaClient`
//! talks to the local HTTP service that drives the response links.

pub mod client;
pub mod errors;
pub mod token;
pub mod types;

use async_trait::async_trait;

use crate::question::Question;

pub use client::{ClientCredentials, OmbeaClient};
pub use errors::HardwareError;
pub use token::AccessToken;
pub use types::{ConnectionState, Poll, PollRequest, ResponseLink};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VotingHardware: Send + Sync {
    /// `Authorization` header value for the current bearer token
    async fn get_access_token(&self) -> Result<String, HardwareError>;

    async fn clear_access_token(&self);

    async fn get_response_links(
        &self,
        only_connected: bool,
    ) -> Result<Vec<ResponseLink>, HardwareError>;

    async fn start_poll(&self, link_id: &str, question: &Question) -> Result<Poll, HardwareError>;

    async fn stop_poll(&self, link_id: &str, poll_id: &str) -> Result<(), HardwareError>;
}
