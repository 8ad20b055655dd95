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

//! Poller and Prometheus metrics exporter for Davis WeatherLink Live
//!
//! ## Features
//!
//! `wll_exporter` polls the [local API] of a Davis WeatherLink Live (WLL) on your network and turns
//! each response into a single flat measurement record. A WLL can receive from up to eight wireless
//! transmitters plus its own barometer and indoor sensors, and several of them may report the same
//! kind of reading. `wll_exporter` picks one value for each metric based on which transmitter is
//! assigned to it, falling back to the lowest numbered transmitter that reports it.
//!
//! Each record is written to standard output as a line of JSON, for example:
//!
//! ```text
//! {"dateTime":1634925911,"usUnits":1,"UV":1.8,"barometer":30.074,"dewpoint":57.2,"heatindex":58.7, ...}
//! ```
//!
//! Values are in US customary units. `rain` is the amount of rain, in inches, since the previous
//! record. The most recent values are also exposed as Prometheus metrics.
//!
//! * `wll_measurement{metric=$METRIC}` - Most recent value of each metric in a record.
//! * `wll_observation_timestamp_seconds` - Station timestamp of the most recent record.
//! * `wll_records_total` - Number of records produced.
//! * `wll_poll_failures_total{kind=$KIND}` - Failed polls, `transport` or `payload`.
//!
//! [local API]: https://weatherlink.github.io/weatherlink-live-local-api/
//!
//! ## Build
//!
//! `wll_exporter` is a Rust program and must be built from source using a [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ### Transmitters
//!
//! By default weather readings are taken from transmitter 1 and soil readings from transmitter 2.
//! Use `--weather-transmitter-id` and `--soil-transmitter-id` to change this. Individual groups of
//! metrics can be assigned to other transmitters with `--mappings`, a whitespace separated list
//! of `group:id` pairs. The groups are `temp` (including humidity), `wind`, `rain`, `uv`, `solar`,
//! `battery`, `soil1` to `soil4`, and `moist1` to `moist4`.
//!
//! ```text
//! ./wll_exporter --host 10.0.0.1 --weather-transmitter-id 5 --mappings 'rain:1 soil1:3'
//! ```
//!
//! ### Prometheus
//!
//! Prometheus metrics are exposed on port `9783` at `/metrics`. Add the host running
//! `wll_exporter` as a target under the Prometheus `scrape_configs` section.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: wll_exporter
//!   static_configs:
//!   - targets: ['example:9783']
//! ```
//!

pub mod client;
pub mod config;
pub mod http;
pub mod metrics;
pub mod packet;
pub mod poller;
pub mod record;
pub mod sensors;

#[cfg(test)]
mod fixtures;
