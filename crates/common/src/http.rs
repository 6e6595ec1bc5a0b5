use reqwest::Client;
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP client shared by every stage: browser user agent and a hard timeout
/// so no call can block the run indefinitely.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}
