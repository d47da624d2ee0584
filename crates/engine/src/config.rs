//! Tunables shared by the command console and refresh driver.

use std::time::Duration;

use devrelay_types::COMMAND_FETCH_LIMIT;
use devrelay_util::RetryPolicy;

/// Console timing and fetch configuration.
#[derive(Clone, Copy, Debug)]
pub struct ConsoleConfig {
    /// Commands fetched per refresh cycle, newest first.
    pub fetch_limit: usize,
    /// Delay before the post-dispatch re-fetch that lets the remote copy
    /// appear and retire the optimistic entry.
    pub post_dispatch_refresh_delay: Duration,
    /// Delay before the second fetch of a manual refresh, catching the
    /// agent's response to the output request.
    pub manual_refresh_followup_delay: Duration,
    /// Minimum time the "is refreshing" flag stays raised.
    pub min_refresh_visible: Duration,
    /// Window the agent is given to push fresh output.
    pub output_request_timeout_secs: u32,
    pub retry: RetryPolicy,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            fetch_limit: COMMAND_FETCH_LIMIT,
            post_dispatch_refresh_delay: Duration::from_millis(1500),
            manual_refresh_followup_delay: Duration::from_millis(2000),
            min_refresh_visible: Duration::from_millis(500),
            output_request_timeout_secs: 60,
            retry: RetryPolicy::default(),
        }
    }
}
