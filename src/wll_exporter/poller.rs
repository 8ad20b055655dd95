// wll_exporter - Poller and Prometheus metrics exporter for Davis WeatherLink Live
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::client::{ClientError, ConditionsSource};
use crate::config::{ConfigProblem, StationConfig};
use crate::packet::{PacketError, PacketNormalizer};
use crate::record::MeasurementRecord;
use std::error;
use std::fmt;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{Instrument, Level};

/// Delay before trying again after the station couldn't be reached.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Transport,
    Payload,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Payload => "payload",
        }
    }
}

#[derive(Debug)]
pub enum PollError {
    Transport(ClientError),
    Payload(PacketError),
}

impl PollError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::Payload(_) => FailureKind::Payload,
        }
    }
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "unable to fetch conditions: {}", e),
            Self::Payload(e) => write!(f, "unable to parse conditions: {}", e),
        }
    }
}

impl error::Error for PollError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Payload(e) => Some(e),
        }
    }
}

/// Destination for measurement records produced by a `Poller`.
pub trait RecordSink {
    fn emit(&mut self, record: &MeasurementRecord) -> io::Result<()>;

    /// Called when a poll fails. Most sinks don't care.
    fn failure(&mut self, _kind: FailureKind) {}
}

impl<A: RecordSink, B: RecordSink> RecordSink for (A, B) {
    fn emit(&mut self, record: &MeasurementRecord) -> io::Result<()> {
        let first = self.0.emit(record);
        let second = self.1.emit(record);
        first.and(second)
    }

    fn failure(&mut self, kind: FailureKind) {
        self.0.failure(kind);
        self.1.failure(kind);
    }
}

/// Write each record as a single line of JSON.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &MeasurementRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Fetch conditions from a station, normalize them, and hand the results to a sink.
#[derive(Debug)]
pub struct Poller<C> {
    source: C,
    normalizer: PacketNormalizer,
    poll_interval: Duration,
}

impl<C> Poller<C>
where
    C: ConditionsSource,
{
    pub fn new(source: C, normalizer: PacketNormalizer, poll_interval: Duration) -> Self {
        Poller {
            source,
            normalizer,
            poll_interval,
        }
    }

    /// Create a poller from station settings, logging any problems with them. Problems
    /// never prevent the poller from being created.
    pub fn from_config(source: C, config: &StationConfig) -> Self {
        for problem in config.problems() {
            match problem {
                ConfigProblem::MissingHost => {
                    tracing::error!(message = "invalid station configuration", problem = %problem);
                }
                _ => {
                    tracing::warn!(message = "invalid station configuration", problem = %problem);
                }
            }
        }

        Self::new(
            source,
            PacketNormalizer::new(config.assignments()),
            config.effective_poll_interval(),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn normalizer(&self) -> &PacketNormalizer {
        &self.normalizer
    }

    /// Fetch and normalize a single response.
    pub async fn poll_once(&mut self) -> Result<MeasurementRecord, PollError> {
        let body = self
            .source
            .current_conditions()
            .await
            .map_err(PollError::Transport)?;
        self.normalizer.parse_body(&body).map_err(PollError::Payload)
    }

    /// Poll forever, emitting a record to the sink after each successful poll.
    ///
    /// Failures are logged and reported to the sink. If the station can't be reached the
    /// next attempt is made after `RETRY_DELAY`, otherwise polls are `poll_interval` apart.
    pub async fn run<S: RecordSink>(&mut self, sink: &mut S) {
        loop {
            match self.poll_once().instrument(tracing::span!(Level::DEBUG, "wll_poll")).await {
                Ok(record) => {
                    tracing::debug!(
                        message = "fetched new conditions",
                        date_time = record.date_time,
                        metrics = record.len(),
                    );

                    if let Err(e) = sink.emit(&record) {
                        tracing::error!(message = "failed to emit record", error = %e);
                    }
                }
                Err(e @ PollError::Transport(_)) => {
                    tracing::error!(message = "error connecting to the WeatherLink Live", error = %e);
                    sink.failure(e.kind());
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
                Err(e) => {
                    tracing::error!(message = "error parsing the WeatherLink Live response", error = %e);
                    sink.failure(e.kind());
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
