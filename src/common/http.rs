use std::time::Duration;

use reqwest::{Client, Error};

const USER_AGENT: &str = concat!("nexlink/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient;

impl HttpClient {
    pub fn user_agent() -> String {
        USER_AGENT.to_string()
    }

    /// REST client for one node. `timeout` bounds every request.
    pub fn new(timeout: Duration) -> Result<Client, Error> {
        Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
    }
}
