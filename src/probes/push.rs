//! Push driver (§4.2 step 1 special case, §4.5) — a push monitor never makes
//! an outbound call; the tick just asserts that an external agent posted a
//! heartbeat for `token` recently enough. Grounded in the teacher's push
//! monitor handling in `checker.rs`, which treats "no push since last
//! window" as DOWN rather than erroring.

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::{ProbeContext, ProbeDriver, ProbeOutcome};
use crate::error::{CoreError, CoreResult};
use crate::model::{Monitor, ProbeConfig};

pub struct PushDriver;

#[async_trait]
impl ProbeDriver for PushDriver {
    async fn probe(&self, monitor: &Monitor, ctx: &ProbeContext) -> CoreResult<ProbeOutcome> {
        let ProbeConfig::Push(config) = &monitor.probe else {
            return Err(CoreError::Config("monitor is not a push probe".into()));
        };

        let grace = Duration::milliseconds(ctx.env.push_buffer_ms as i64);
        let window = Duration::seconds(monitor.interval_secs as i64) + grace;
        let since = Utc::now() - window;

        match ctx.repository.latest_push_heartbeat(&config.token, since).await? {
            Some(beat) => Ok(ProbeOutcome::up(beat.msg).with_ping(beat.ping.unwrap_or(0))),
            None => Ok(ProbeOutcome::down(format!("No push received within {} seconds", window.num_seconds()))),
        }
    }
}
