//! # Decode Engine
//!
//! Runs one decode step per scheduler tick:
//!
//! ```text
//! ByteSource ─▶ FrameReader ─▶ verify_frame ─▶ dispatch ─▶ checksum ─▶ fields ─▶ sink
//!      │
//!      └─ nothing available ─▶ DisconnectMonitor
//! ```
//!
//! Every failure is recovered inside the tick that saw it: a sentinel record
//! goes to the measurement sink, the operator is notified, and the tick
//! returns. All mutable decoding state lives in [`DecodeEngine`], so one
//! engine per serial link can run side by side.

pub mod disconnect;
pub mod scheduler;

use tracing::{debug, info, warn};

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::nmea::decoder::{decode_sentence, dispatch, Decoded, SensorReading};
use crate::nmea::frame::{verify_frame, FrameRead, FrameReader};
use crate::nmea::protocol::{Dispatch, MessageSchema, SentenceKind};
use crate::serial::port_trait::ByteSource;
use crate::telemetry::{write_error_record, MeasurementSink, OperatorChannel, Priority};
use disconnect::{DisconnectMonitor, LinkState};

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No bytes available, disconnect threshold not reported this tick
    Waiting { loops_since_data: u32 },

    /// Bytes read but no complete sentence yet
    Pending,

    /// Sentence decoded and written to the sink
    Logged(SensorReading),

    /// Valid sentence of a type we do not log
    NotUseful,

    /// Error record written and operator notified
    Failed(DecodeError),
}

/// Running counters over tick outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub ticks: u64,
    pub logged: u64,
    pub not_useful: u64,
    pub pending: u64,
    pub empty: u64,
    pub no_data: u64,
    pub invalid_frame: u64,
    pub checksum_fail: u64,
    pub parsing_fail: u64,
}

impl DecodeStats {
    pub fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;

        match outcome {
            TickOutcome::Waiting { .. } => self.empty += 1,
            TickOutcome::Pending => self.pending += 1,
            TickOutcome::Logged(_) => self.logged += 1,
            TickOutcome::NotUseful => self.not_useful += 1,
            TickOutcome::Failed(DecodeError::NoData { .. }) => {
                self.empty += 1;
                self.no_data += 1;
            }
            TickOutcome::Failed(DecodeError::InvalidFrame(_)) => self.invalid_frame += 1,
            TickOutcome::Failed(DecodeError::ChecksumFail(_)) => self.checksum_fail += 1,
            TickOutcome::Failed(DecodeError::ParsingFail(_)) => self.parsing_fail += 1,
        }
    }

    /// Total decode failures of any kind
    pub fn errors(&self) -> u64 {
        self.no_data + self.invalid_frame + self.checksum_fail + self.parsing_fail
    }
}

/// Decoding state for one serial link
#[derive(Debug)]
pub struct DecodeEngine {
    reader: FrameReader,
    monitor: DisconnectMonitor,
    /// Sensor expected on this link; its schema carries errors that happen
    /// before a header is known
    sensor: SentenceKind,
    stats: DecodeStats,
}

impl DecodeEngine {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            reader: FrameReader::new(config.strategy, config.max_message_length, config.max_bytes_per_tick),
            monitor: DisconnectMonitor::from_intervals(
                config.tick_interval_ms,
                config.message_interval_ms,
                config.no_data_policy,
            ),
            sensor: config.sensor,
            stats: DecodeStats::default(),
        }
    }

    /// Run one decode step
    ///
    /// Never blocks and never fails: the outcome says what happened, and any
    /// error has already been logged and reported by the time this returns.
    pub fn tick<S, K, O>(&mut self, source: &mut S, sink: &mut K, operator: &mut O) -> TickOutcome
    where
        S: ByteSource + ?Sized,
        K: MeasurementSink + ?Sized,
        O: OperatorChannel + ?Sized,
    {
        let available = source.available().unwrap_or_else(|e| {
            warn!("Failed to query sensor port: {}", e);
            0
        });

        let outcome = if available == 0 {
            let report = self.monitor.record_empty();
            if self.monitor.state() == LinkState::Disconnected {
                self.drop_partial_frame(operator);
            }

            match report {
                Some(error) => self.fail(error, self.sensor.schema(), sink, operator),
                None => TickOutcome::Waiting {
                    loops_since_data: self.monitor.loops_since_data(),
                },
            }
        } else {
            if self.monitor.state() == LinkState::Disconnected {
                info!("Sensor link restored after {} silent ticks", self.monitor.loops_since_data());
                operator.notify(Priority::INFO, &format!("{}: link restored", self.sensor.schema().section));
            }
            self.monitor.record_data();
            self.read_and_decode(source, sink, operator)
        };

        self.stats.record(&outcome);
        outcome
    }

    pub fn link_state(&self) -> LinkState {
        self.monitor.state()
    }

    pub fn loops_since_data(&self) -> u32 {
        self.monitor.loops_since_data()
    }

    pub fn ticks_to_fail(&self) -> u32 {
        self.monitor.ticks_to_fail()
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    pub fn sensor(&self) -> SentenceKind {
        self.sensor
    }

    fn read_and_decode<S, K, O>(&mut self, source: &mut S, sink: &mut K, operator: &mut O) -> TickOutcome
    where
        S: ByteSource + ?Sized,
        K: MeasurementSink + ?Sized,
        O: OperatorChannel + ?Sized,
    {
        let frame = match self.reader.poll(source) {
            Ok(FrameRead::Frame(frame)) => frame,
            Ok(FrameRead::Pending) => return TickOutcome::Pending,
            Ok(FrameRead::Overflow) => {
                self.resync(source);
                let error = DecodeError::InvalidFrame("no terminator within maximum message length".to_string());
                return self.fail(error, self.sensor.schema(), sink, operator);
            }
            Err(e) => {
                warn!("Failed to read sensor port: {}", e);
                return TickOutcome::Pending;
            }
        };

        if !verify_frame(frame.as_bytes()) {
            self.resync(source);
            let error = DecodeError::InvalidFrame(frame.to_string());
            return self.fail(error, self.sensor.schema(), sink, operator);
        }

        match decode_sentence(frame.as_bytes(), sink) {
            Ok(Decoded::Logged(reading)) => TickOutcome::Logged(reading),
            Ok(Decoded::NotUseful) => {
                debug!("Ignoring sentence: {}", frame);
                TickOutcome::NotUseful
            }
            Err(error) => {
                let schema = match dispatch(frame.as_bytes()) {
                    Dispatch::Known(schema) => schema,
                    Dispatch::Unrecognized => self.sensor.schema(),
                };
                self.fail(error, schema, sink, operator)
            }
        }
    }

    /// Drop queued bytes so the next read starts at a fresh sentence
    fn resync<S: ByteSource + ?Sized>(&mut self, source: &mut S) {
        if let Err(e) = self.reader.resync(source) {
            warn!("Failed to drain sensor port: {}", e);
        }
    }

    /// A sentence cut off by a disconnect never completes; discard it so it
    /// is not glued onto the first sentence after reconnect
    fn drop_partial_frame<O: OperatorChannel + ?Sized>(&mut self, operator: &mut O) {
        let dropped = self.reader.reset();
        if dropped > 0 {
            warn!("Discarded {} bytes of a partial sentence on disconnect", dropped);
            operator.notify(
                Priority::WARNING,
                &format!("{}: discarded {} bytes of a partial sentence", self.sensor.schema().section, dropped),
            );
        }
    }

    fn fail<K, O>(&self, error: DecodeError, schema: &MessageSchema, sink: &mut K, operator: &mut O) -> TickOutcome
    where
        K: MeasurementSink + ?Sized,
        O: OperatorChannel + ?Sized,
    {
        write_error_record(sink, schema, &error);
        operator.notify(Priority::ERROR, &format!("{}: {}", schema.section, error));
        TickOutcome::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::engine::disconnect::NoDataPolicy;
    use crate::nmea::decoder::WindReading;
    use crate::nmea::encoder::encode_sentence;
    use crate::nmea::frame::FrameStrategy;
    use crate::serial::port_trait::mocks::MockByteSource;
    use crate::telemetry::mocks::RecordingSink;
    use crate::telemetry::MockOperatorChannel;
    use std::io;

    const WIND: &[u8] = b"$IIMWV,179.0,R,000.3,M,A*32\r\n";

    struct Harness {
        engine: DecodeEngine,
        source: MockByteSource,
        sink: RecordingSink,
        operator: MockOperatorChannel,
    }

    impl Harness {
        fn new(config: DecoderConfig) -> Self {
            let mut operator = MockOperatorChannel::new();
            operator.expect_notify().returning(|_, _| ());

            Self {
                engine: DecodeEngine::new(&config),
                source: MockByteSource::new(),
                sink: RecordingSink::new(),
                operator,
            }
        }

        fn tick(&mut self) -> TickOutcome {
            self.engine.tick(&mut self.source, &mut self.sink, &mut self.operator)
        }
    }

    fn wind_config(strategy: FrameStrategy) -> DecoderConfig {
        DecoderConfig {
            strategy,
            ..DecoderConfig::default()
        }
    }

    #[test]
    fn test_round_trip_wind_sentence() {
        for strategy in [FrameStrategy::Terminator, FrameStrategy::Fixed] {
            let mut h = Harness::new(wind_config(strategy));
            h.source.push(WIND);

            let outcome = h.tick();
            assert_eq!(
                outcome,
                TickOutcome::Logged(SensorReading::Wind(WindReading {
                    angle: "179.0".to_string(),
                    speed: "000.3".to_string(),
                }))
            );
            assert_eq!(h.sink.records[0].values, vec!["179.0", "000.3", "Normal"]);
        }
    }

    #[test]
    fn test_corrupted_checksum_writes_error_record() {
        let mut operator = MockOperatorChannel::new();
        operator
            .expect_notify()
            .withf(|priority, text| *priority == Priority::ERROR && text.starts_with("WIND: checksum"))
            .times(1)
            .returning(|_, _| ());

        let mut engine = DecodeEngine::new(&DecoderConfig::default());
        let mut source = MockByteSource::with_data(b"$IIMWV,179.0,R,000.3,M,A*33\r\n");
        let mut sink = RecordingSink::new();

        let outcome = engine.tick(&mut source, &mut sink, &mut operator);

        assert!(matches!(outcome, TickOutcome::Failed(DecodeError::ChecksumFail(_))));
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].section, "WIND");
        assert_eq!(sink.records[0].values, vec!["0", "0", "Checksum fail"]);
    }

    #[test]
    fn test_unknown_header_is_silent() {
        let mut operator = MockOperatorChannel::new();
        operator.expect_notify().times(0);

        let mut engine = DecodeEngine::new(&DecoderConfig::default());
        let mut source = MockByteSource::with_data(b"$GPGGA,1,2,3*00\r\n");
        let mut sink = RecordingSink::new();

        assert_eq!(engine.tick(&mut source, &mut sink, &mut operator), TickOutcome::NotUseful);
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_disconnect_after_threshold_and_reset() {
        let config = DecoderConfig {
            tick_interval_ms: 100,
            message_interval_ms: 1000,
            ..DecoderConfig::default()
        };
        let mut h = Harness::new(config);
        assert_eq!(h.engine.ticks_to_fail(), 11);

        for i in 1..=10 {
            assert_eq!(h.tick(), TickOutcome::Waiting { loops_since_data: i });
        }
        assert_eq!(h.tick(), TickOutcome::Failed(DecodeError::NoData { ticks: 11 }));
        assert_eq!(h.engine.link_state(), LinkState::Disconnected);
        assert_eq!(h.sink.last_status(), Some("No data"));

        // Once policy: no repeat while still silent
        assert_eq!(h.tick(), TickOutcome::Waiting { loops_since_data: 12 });
        assert_eq!(h.sink.records.len(), 1);

        h.source.push(b"$");
        assert_eq!(h.tick(), TickOutcome::Pending);
        assert_eq!(h.engine.loops_since_data(), 0);
        assert_eq!(h.engine.link_state(), LinkState::Idle);
    }

    #[test]
    fn test_disconnect_every_tick_policy() {
        let config = DecoderConfig {
            tick_interval_ms: 500,
            message_interval_ms: 1000,
            no_data_policy: NoDataPolicy::EveryTick,
            ..DecoderConfig::default()
        };
        let mut h = Harness::new(config);

        let outcomes: Vec<TickOutcome> = (0..5).map(|_| h.tick()).collect();
        let reports = outcomes
            .iter()
            .filter(|o| matches!(o, TickOutcome::Failed(DecodeError::NoData { .. })))
            .count();

        // Threshold 3: ticks 3, 4 and 5 report
        assert_eq!(reports, 3);
        assert_eq!(h.sink.records.len(), 3);
    }

    #[test]
    fn test_partial_sentence_dropped_on_disconnect() {
        let mut operator = MockOperatorChannel::new();
        operator
            .expect_notify()
            .withf(|priority, text| *priority == Priority::ERROR && text.starts_with("WIND: no data"))
            .times(1)
            .returning(|_, _| ());
        operator
            .expect_notify()
            .withf(|priority, text| *priority == Priority::WARNING && text == "WIND: discarded 14 bytes of a partial sentence")
            .times(1)
            .returning(|_, _| ());
        operator
            .expect_notify()
            .withf(|priority, text| *priority == Priority::INFO && text == "WIND: link restored")
            .times(1)
            .returning(|_, _| ());

        let mut engine = DecodeEngine::new(&DecoderConfig::default());
        let mut source = MockByteSource::with_data(b"$IIMWV,179.0,R");
        let mut sink = RecordingSink::new();

        assert_eq!(engine.tick(&mut source, &mut sink, &mut operator), TickOutcome::Pending);
        for _ in 0..11 {
            engine.tick(&mut source, &mut sink, &mut operator);
        }
        assert_eq!(engine.link_state(), LinkState::Disconnected);

        source.push(WIND);
        assert!(matches!(
            engine.tick(&mut source, &mut sink, &mut operator),
            TickOutcome::Logged(_)
        ));
        assert_eq!(sink.records.len(), 2);
        assert_eq!(sink.last_status(), Some("Normal"));
        assert_eq!(engine.stats().checksum_fail, 0);
    }

    #[test]
    fn test_partial_sentence_kept_while_waiting() {
        let mut h = Harness::new(DecoderConfig::default());
        h.source.push(b"$IIMWV,179.0,R");
        assert_eq!(h.tick(), TickOutcome::Pending);

        // A short gap below the threshold keeps the partial sentence
        for _ in 0..5 {
            h.tick();
        }
        h.source.push(b",000.3,M,A*32\r\n");
        assert!(matches!(h.tick(), TickOutcome::Logged(_)));
    }

    #[test]
    fn test_misaligned_stream_resyncs() {
        for strategy in [FrameStrategy::Terminator, FrameStrategy::Fixed] {
            let mut h = Harness::new(wind_config(strategy));

            // Tail of a previous sentence followed by a complete one
            h.source.push(b"0.3,M,A*32\r\n");
            h.source.push(WIND);

            let outcome = h.tick();
            assert!(
                matches!(outcome, TickOutcome::Failed(DecodeError::InvalidFrame(_))),
                "{:?}: {:?}",
                strategy,
                outcome
            );
            assert_eq!(h.source.remaining(), 0, "{:?} should drain", strategy);
            assert_eq!(h.sink.last_status(), Some("Invalid frame"));

            // Next sentence on the wire decodes cleanly
            h.source.push(WIND);
            assert!(matches!(h.tick(), TickOutcome::Logged(_)), "{:?}", strategy);
        }
    }

    #[test]
    fn test_terminator_partial_frame_spans_ticks() {
        let mut h = Harness::new(wind_config(FrameStrategy::Terminator));

        h.source.push(&WIND[..15]);
        assert_eq!(h.tick(), TickOutcome::Pending);

        h.source.push(&WIND[15..]);
        assert!(matches!(h.tick(), TickOutcome::Logged(_)));
    }

    #[test]
    fn test_fixed_partial_frame_rejected() {
        let mut h = Harness::new(wind_config(FrameStrategy::Fixed));

        h.source.push(&WIND[..15]);
        assert!(matches!(h.tick(), TickOutcome::Failed(DecodeError::InvalidFrame(_))));
    }

    #[test]
    fn test_line_noise_overflow() {
        let config = DecoderConfig {
            max_message_length: 20,
            ..DecoderConfig::default()
        };
        let mut h = Harness::new(config);
        h.source.push(&[0xAA; 64]);

        assert!(matches!(h.tick(), TickOutcome::Failed(DecodeError::InvalidFrame(_))));
        assert_eq!(h.source.remaining(), 0);
    }

    #[test]
    fn test_parsing_fail_uses_sentence_schema() {
        // Link expects wind, but a malformed PTH sentence arrives
        let mut h = Harness::new(DecoderConfig::default());
        h.source.push(&encode_sentence("PTHS", &["1013.2", "21.4", "21.6", "45.0"]));

        assert!(matches!(h.tick(), TickOutcome::Failed(DecodeError::ParsingFail(_))));
        assert_eq!(h.sink.records[0].section, "PTHS");
        assert_eq!(h.sink.last_status(), Some("Parsing fail"));
    }

    #[test]
    fn test_port_error_counts_as_empty_tick() {
        let mut h = Harness::new(DecoderConfig::default());
        h.source.set_read_error(io::ErrorKind::BrokenPipe);

        assert_eq!(h.tick(), TickOutcome::Waiting { loops_since_data: 1 });
    }

    #[test]
    fn test_one_frame_per_tick() {
        let mut h = Harness::new(DecoderConfig::default());
        h.source.push(WIND);
        h.source.push(WIND);

        assert!(matches!(h.tick(), TickOutcome::Logged(_)));
        assert_eq!(h.sink.records.len(), 1);
        assert!(matches!(h.tick(), TickOutcome::Logged(_)));
        assert_eq!(h.sink.records.len(), 2);
    }

    #[test]
    fn test_stats() {
        let mut h = Harness::new(DecoderConfig::default());
        h.source.push(WIND);
        h.tick();
        h.source.push(b"$GPGGA,1,2,3*00\r\n");
        h.tick();
        h.source.push(b"$IIMWV,179.0,R,000.3,M,A*33\r\n");
        h.tick();
        h.tick();

        let stats = h.engine.stats();
        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.logged, 1);
        assert_eq!(stats.not_useful, 1);
        assert_eq!(stats.checksum_fail, 1);
        assert_eq!(stats.empty, 1);
        assert_eq!(stats.errors(), 1);
    }
}
