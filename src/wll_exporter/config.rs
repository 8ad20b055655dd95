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

use crate::sensors::{TransmitterAssignments, TransmitterId};
use std::fmt;
use std::time::Duration;

/// The station can't answer requests more often than this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_WEATHER_TRANSMITTER: u8 = 1;
pub const DEFAULT_SOIL_TRANSMITTER: u8 = 2;

/// Problem with a `StationConfig` that doesn't prevent polling from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigProblem {
    MissingHost,
    PollIntervalTooShort(Duration),
    TransmitterOutOfRange(&'static str, u8),
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHost => write!(f, "the WeatherLink Live hostname or IP address is required"),
            Self::PollIntervalTooShort(d) => write!(
                f,
                "poll interval must be {} seconds or greater (found {})",
                MIN_POLL_INTERVAL.as_secs(),
                d.as_secs_f64()
            ),
            Self::TransmitterOutOfRange(name, id) => write!(f, "{} must be between 1 and 8 (found {})", name, id),
        }
    }
}

/// Settings for polling a single WeatherLink Live.
#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    pub host: Option<String>,
    pub poll_interval: Duration,
    pub weather_transmitter_id: u8,
    pub soil_transmitter_id: u8,
    pub mappings: Option<String>,
    pub hardware: Option<String>,
}

impl StationConfig {
    /// Everything wrong with this configuration. Polling can start anyway: a missing host
    /// results in failed requests and a short interval is raised to `MIN_POLL_INTERVAL`.
    pub fn problems(&self) -> Vec<ConfigProblem> {
        let mut out = Vec::new();
        if self.host.as_deref().map(str::trim).unwrap_or("").is_empty() {
            out.push(ConfigProblem::MissingHost);
        }

        if self.poll_interval < MIN_POLL_INTERVAL {
            out.push(ConfigProblem::PollIntervalTooShort(self.poll_interval));
        }

        for (name, id) in [
            ("weather_transmitter_id", self.weather_transmitter_id),
            ("soil_transmitter_id", self.soil_transmitter_id),
        ] {
            if TransmitterId::numbered(i64::from(id)).is_none() {
                out.push(ConfigProblem::TransmitterOutOfRange(name, id));
            }
        }

        out
    }

    /// Configured poll interval, but never less than `MIN_POLL_INTERVAL`.
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }

    /// URL of the current conditions endpoint of the station.
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:80/v1/current_conditions",
            self.host.as_deref().map(str::trim).unwrap_or("")
        )
    }

    /// Transmitter assignments from the default transmitters and any mappings.
    pub fn assignments(&self) -> TransmitterAssignments {
        TransmitterAssignments::new(
            TransmitterId::Numbered(self.weather_transmitter_id),
            TransmitterId::Numbered(self.soil_transmitter_id),
            self.mappings.as_deref(),
        )
    }

    /// Label for the station hardware, if one was configured.
    pub fn hardware_name(&self) -> Option<&str> {
        self.hardware.as_deref()
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            host: None,
            poll_interval: MIN_POLL_INTERVAL,
            weather_transmitter_id: DEFAULT_WEATHER_TRANSMITTER,
            soil_transmitter_id: DEFAULT_SOIL_TRANSMITTER,
            mappings: None,
            hardware: None,
        }
    }
}
