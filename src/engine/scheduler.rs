//! Fixed-period scheduler driving [`DecodeEngine::tick`]

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use super::{DecodeEngine, DecodeStats};
use crate::serial::port_trait::ByteSource;
use crate::telemetry::{MeasurementSink, OperatorChannel};

/// Number of ticks between status log messages
pub const STATUS_LOG_INTERVAL_TICKS: u64 = 600;

/// Call `engine.tick` every `tick_interval` until `shutdown` completes
///
/// Ticks that fall behind are skipped rather than bunched up, so a slow
/// sink never makes the engine read several sentences back to back.
///
/// # Returns
///
/// * `DecodeStats` - Counters at the time of shutdown
pub async fn run<S, K, O, F>(
    engine: &mut DecodeEngine,
    source: &mut S,
    sink: &mut K,
    operator: &mut O,
    tick_interval: Duration,
    shutdown: F,
) -> DecodeStats
where
    S: ByteSource + ?Sized,
    K: MeasurementSink + ?Sized,
    O: OperatorChannel + ?Sized,
    F: Future<Output = ()>,
{
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(
        "Decoding {:?} sentences every {:?} (disconnect after {} empty ticks)",
        engine.sensor(),
        tick_interval,
        engine.ticks_to_fail()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.tick(source, sink, operator);

                let stats = engine.stats();
                if stats.ticks % STATUS_LOG_INTERVAL_TICKS == 0 {
                    info!(
                        "{} ticks: {} logged, {} ignored, {} errors, link {:?}",
                        stats.ticks,
                        stats.logged,
                        stats.not_useful,
                        stats.errors(),
                        engine.link_state()
                    );
                }
            }

            _ = &mut shutdown => {
                info!("Scheduler stopping after {} ticks", engine.stats().ticks);
                break;
            }
        }
    }

    engine.stats().clone()
}
