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

use crate::poller::{FailureKind, RecordSink};
use crate::record::MeasurementRecord;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::io;
use std::sync::atomic::AtomicU64;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct MetricLabels {
    metric: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct FailureLabels {
    kind: String,
}

/// Holder for metrics that are set from a `MeasurementRecord`.
///
/// All metrics are created and registered upon call to `WeatherMetrics::new()`. Metrics
/// all share the prefix "wll_" and measurements use a "metric" label set to the name of
/// the metric in the record (e.g. `wll_measurement{metric="outTemp"}`).
#[derive(Debug, Clone)]
pub struct WeatherMetrics {
    measurements: Family<MetricLabels, Gauge<f64, AtomicU64>>,
    timestamp: Gauge,
    records: Counter,
    failures: Family<FailureLabels, Counter>,
}

impl WeatherMetrics {
    /// Create a new `WeatherMetrics` and register each metric with the provided `Registry`.
    pub fn new(reg: &mut Registry) -> Self {
        let measurements = Family::<MetricLabels, Gauge<f64, AtomicU64>>::default();
        let timestamp: Gauge = Gauge::default();
        let records: Counter = Counter::default();
        let failures = Family::<FailureLabels, Counter>::default();

        reg.register(
            "measurement",
            "Most recent value of each measurement reported by the station",
            measurements.clone(),
        );
        reg.register(
            "observation_timestamp_seconds",
            "Station timestamp of the most recent measurements",
            timestamp.clone(),
        );
        reg.register("records", "Measurement records produced", records.clone());
        reg.register(
            "poll_failures",
            "Polls that failed, by kind of failure",
            failures.clone(),
        );

        Self {
            measurements,
            timestamp,
            records,
            failures,
        }
    }

    /// Set gauges from every value in the record. Metrics missing from the record keep
    /// their previous values.
    pub fn observe(&self, record: &MeasurementRecord) {
        for (metric, value) in record.values.iter() {
            self.measurements
                .get_or_create(&MetricLabels {
                    metric: (*metric).to_owned(),
                })
                .set(*value);
        }

        self.timestamp.set(record.date_time);
        self.records.inc();
    }

    pub fn failed(&self, kind: FailureKind) {
        self.failures
            .get_or_create(&FailureLabels {
                kind: kind.as_str().to_owned(),
            })
            .inc();
    }
}

impl RecordSink for WeatherMetrics {
    fn emit(&mut self, record: &MeasurementRecord) -> io::Result<()> {
        self.observe(record);
        Ok(())
    }

    fn failure(&mut self, kind: FailureKind) {
        self.failed(kind);
    }
}
