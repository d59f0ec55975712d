//! MicrotonalOutput builder.

use std::sync::Arc;

use polybend_midi::{Clock, EqualTemperament, PitchResolver, SystemClock};
use tracing::debug;

use super::{MicrotonalOutput, OutputConfig, OutputPort};
use crate::error::Result;
use crate::log::LogSink;
use crate::voice::VoiceAllocator;

#[derive(Default)]
pub struct MicrotonalOutputBuilder {
    port: Option<Box<dyn OutputPort>>,
    config: OutputConfig,
    resolver: Option<Arc<dyn PitchResolver>>,
    clock: Option<Arc<dyn Clock>>,
    log: LogSink,
}

impl MicrotonalOutputBuilder {
    /// Without a port the output is a dummy that accepts and drops notes.
    pub fn port(mut self, port: impl OutputPort + 'static) -> Self {
        self.port = Some(Box::new(port));
        self
    }

    /// 1-based channels, in voice pool order.
    pub fn channels(mut self, channels: impl IntoIterator<Item = u8>) -> Self {
        self.config.channels = channels.into_iter().collect();
        self
    }

    pub fn bend_range(mut self, semitones: u8) -> Self {
        self.config.bend_range_semitones = semitones;
        self
    }

    /// Replaces channels and bend range.
    pub fn config(mut self, config: OutputConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to 12-TET at A4 = 440 Hz.
    pub fn resolver(mut self, resolver: impl PitchResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Defaults to a [`SystemClock`] started at build time.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn log(mut self, log: LogSink) -> Self {
        self.log = log;
        self
    }

    /// Validates the configuration and, when a port is present, sends the
    /// pitch-bend range to every channel.
    pub fn build(self) -> Result<MicrotonalOutput> {
        let channels = self.config.validate()?;
        let allocator = VoiceAllocator::new(channels).with_log(self.log.clone());

        let mut output = MicrotonalOutput {
            port: self.port,
            allocator,
            bend_range: self.config.bend_range_semitones,
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(EqualTemperament::default())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            log: self.log,
            last_time: f64::NEG_INFINITY,
        };
        output.configure_bend_range()?;

        debug!(
            "Microtonal output ready: {} channel(s), bend range {} semitones{}",
            output.allocator.len(),
            output.bend_range,
            if output.is_dummy() { " (dummy)" } else { "" }
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::output::RecordingPort;
    use polybend_midi::ResolvedPitch;

    #[test]
    fn test_default_build_is_dummy() {
        let output = MicrotonalOutputBuilder::default().build().unwrap();
        assert!(output.is_dummy());
        assert_eq!(output.bend_range(), 2);
        assert_eq!(output.channels().count(), 0);
        assert_eq!(output.last_event_time(), None);
    }

    #[test]
    fn test_build_rejects_invalid_channels() {
        let result = MicrotonalOutput::builder().channels([1, 20]).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_build_from_config() {
        let config = OutputConfig::new([5, 6, 7]).with_bend_range(24);
        let output = MicrotonalOutput::builder()
            .port(RecordingPort::new())
            .config(config)
            .build()
            .unwrap();
        assert!(!output.is_dummy());
        assert_eq!(output.bend_range(), 24);
        let channels: Vec<u8> = output.channels().map(|c| c.get()).collect();
        assert_eq!(channels, vec![5, 6, 7]);
    }

    #[test]
    fn test_custom_resolver() {
        // Every frequency lands on middle C, a quarter tone sharp.
        let resolver = |_hz: f64| ResolvedPitch {
            note: 60,
            cents: 50.0,
        };
        let mut output = MicrotonalOutput::builder()
            .port(RecordingPort::new())
            .channels([1])
            .resolver(resolver)
            .build()
            .unwrap();
        let mut handle = output.note_on(123.0, None, 0.0).unwrap();
        assert_eq!(handle.note(), Some(60));
        assert_eq!(output.allocator().voices()[0].cents_offset(), Some(50.0));
        output.note_off(&mut handle, None, 1.0).unwrap();
    }
}
