//! Shared HTTP client.
//!
//! One client is built per run and cloned into every component that talks
//! to the network, so connections to the feed host and the hosting API are
//! pooled.

use std::time::Duration;

use reqwest::Client;

use crate::error::Result;

pub const USER_AGENT: &str = concat!("iocscan/", env!("CARGO_PKG_VERSION"));

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Builds the client used for the IOC feed and every hosting API call.
pub fn create_client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(10)
        .build()?;

    Ok(client)
}
