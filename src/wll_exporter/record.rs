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

use serde::Serialize;
use std::collections::BTreeMap;

/// Unit system tags understood by consumers of measurement records.
pub mod unit_systems {
    pub const US: i32 = 1;
    pub const METRIC: i32 = 16;
    pub const METRICWX: i32 = 17;
}

/// One flattened set of measurements from a single poll of the station.
///
/// Serializes to a flat JSON object, e.g. `{"dateTime":1634925911,"usUnits":1,"outTemp":57.9}`.
/// Metrics that no transmitter reported are absent rather than null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    #[serde(rename = "dateTime")]
    pub date_time: i64,
    #[serde(rename = "usUnits")]
    pub us_units: i32,
    #[serde(flatten)]
    pub values: BTreeMap<&'static str, f64>,
}

impl MeasurementRecord {
    pub fn new(date_time: i64, us_units: i32) -> Self {
        MeasurementRecord {
            date_time,
            us_units,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, metric: &'static str, value: f64) {
        self.values.insert(metric, value);
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.values.contains_key(metric)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
