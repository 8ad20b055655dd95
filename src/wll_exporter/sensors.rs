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

use std::collections::HashMap;
use std::fmt;

const MM_TO_INCH: f64 = 0.0393701;

/// Collector size assumed until a station reports otherwise.
pub const DEFAULT_RAIN_COLLECTOR: i64 = 1;

/// Raw field carrying the rain collector size of a transmitter.
pub const RAIN_SIZE_FIELD: &str = "rain_size";

/// Raw field of the `rain` metric. The transmitter assigned to it is the one whose
/// `rain_size` sets the calibration factor.
pub const RAIN_TOTAL_FIELD: &str = "rainfall_year";

/// Source of a set of readings: one of the eight numbered wireless transmitters or
/// one of the sensors built into the WeatherLink Live itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransmitterId {
    Numbered(u8),
    Barometric,
    Indoor,
}

impl TransmitterId {
    /// Order in which transmitters are searched when the assigned transmitter does
    /// not report a field.
    pub const FALLBACK_ORDER: [TransmitterId; 10] = [
        TransmitterId::Numbered(1),
        TransmitterId::Numbered(2),
        TransmitterId::Numbered(3),
        TransmitterId::Numbered(4),
        TransmitterId::Numbered(5),
        TransmitterId::Numbered(6),
        TransmitterId::Numbered(7),
        TransmitterId::Numbered(8),
        TransmitterId::Barometric,
        TransmitterId::Indoor,
    ];

    /// Numbered transmitter for `id` if it is in the range the station supports (1-8).
    pub fn numbered(id: i64) -> Option<Self> {
        if (1..=8).contains(&id) {
            Some(TransmitterId::Numbered(id as u8))
        } else {
            None
        }
    }
}

impl fmt::Display for TransmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numbered(id) => write!(f, "{}", id),
            Self::Barometric => write!(f, "B"),
            Self::Indoor => write!(f, "I"),
        }
    }
}

/// Class of transmitter that reports a metric by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitterClass {
    Weather,
    Soil,
    Barometric,
    Indoor,
}

/// Extra step applied to a metric after its scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// Value is used as-is.
    None,
    /// Value is multiplied by the rain collector calibration factor.
    RateScale,
    /// Value is a running total, calibrated and then turned into the amount since
    /// the previous observation.
    CumulativeDelta,
}

/// Static description of one logical metric of a measurement record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDescriptor {
    pub metric: &'static str,
    pub field: &'static str,
    pub factor: f64,
    pub group: &'static str,
    pub class: TransmitterClass,
    pub derivation: Derivation,
}

const fn descriptor(
    metric: &'static str,
    field: &'static str,
    group: &'static str,
    class: TransmitterClass,
) -> MetricDescriptor {
    MetricDescriptor {
        metric,
        field,
        factor: 1.0,
        group,
        class,
        derivation: Derivation::None,
    }
}

const fn derived(
    metric: &'static str,
    field: &'static str,
    group: &'static str,
    derivation: Derivation,
) -> MetricDescriptor {
    MetricDescriptor {
        metric,
        field,
        factor: 1.0,
        group,
        class: TransmitterClass::Weather,
        derivation,
    }
}

use TransmitterClass::{Barometric, Indoor, Soil, Weather};

/// Every metric a measurement record may contain, in record order.
pub const DESCRIPTORS: &[MetricDescriptor] = &[
    descriptor("outTemp", "temp", "temp", Weather),
    descriptor("outHumidity", "hum", "temp", Weather),
    descriptor("dewpoint", "dew_point", "temp", Weather),
    descriptor("heatindex", "heat_index", "temp", Weather),
    descriptor("windchill", "wind_chill", "wind", Weather),
    descriptor("windSpeed", "wind_speed_last", "wind", Weather),
    descriptor("windDir", "wind_dir_last", "wind", Weather),
    descriptor("windGust", "wind_speed_hi_last_10_min", "wind", Weather),
    descriptor("windGustDir", "wind_dir_scalar_avg_last_10_min", "wind", Weather),
    derived("rain", RAIN_TOTAL_FIELD, "rain", Derivation::CumulativeDelta),
    derived("rainRate", "rain_rate_last", "rain", Derivation::RateScale),
    descriptor("radiation", "solar_rad", "solar", Weather),
    descriptor("UV", "uv_index", "uv", Weather),
    descriptor("txBatteryStatus", "trans_battery_flag", "battery", Weather),
    descriptor("soilTemp1", "temp_1", "soil1", Soil),
    descriptor("soilTemp2", "temp_2", "soil2", Soil),
    descriptor("soilTemp3", "temp_3", "soil3", Soil),
    descriptor("soilTemp4", "temp_4", "soil4", Soil),
    descriptor("soilMoist1", "moist_soil_1", "moist1", Soil),
    descriptor("soilMoist2", "moist_soil_2", "moist2", Soil),
    descriptor("soilMoist3", "moist_soil_3", "moist3", Soil),
    descriptor("soilMoist4", "moist_soil_4", "moist4", Soil),
    descriptor("barometer", "bar_sea_level", "bar", Barometric),
    descriptor("pressure", "bar_absolute", "bar", Barometric),
    descriptor("inTemp", "temp_in", "indoor", Indoor),
    descriptor("inHumidity", "hum_in", "indoor", Indoor),
    descriptor("inDewpoint", "dew_point_in", "indoor", Indoor),
];

/// Inches of rain represented by one tick of a collector of the given size, if the
/// size is one the station documents.
pub fn rain_collector_scale(size: i64) -> Option<f64> {
    match size {
        1 => Some(0.01),
        2 => Some(0.2 * MM_TO_INCH),
        3 => Some(0.1 * MM_TO_INCH),
        4 => Some(0.001),
        _ => None,
    }
}

/// Transmitter each raw field should be read from.
///
/// Every field named by a `MetricDescriptor` has an entry once the table is built.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmitterAssignments {
    by_field: HashMap<&'static str, TransmitterId>,
}

impl TransmitterAssignments {
    /// Assign weather and soil fields to the given default transmitters, then apply
    /// overrides from a whitespace separated list of `group:id` tokens, e.g.
    /// `"rain:1 temp:2 soil1:3"`. Tokens that can't be parsed or that use an id outside
    /// of 1-8 are skipped.
    pub fn new(weather: TransmitterId, soil: TransmitterId, mappings: Option<&str>) -> Self {
        let mut by_field = HashMap::with_capacity(DESCRIPTORS.len());
        for d in DESCRIPTORS {
            let id = match d.class {
                TransmitterClass::Weather => weather,
                TransmitterClass::Soil => soil,
                TransmitterClass::Barometric => TransmitterId::Barometric,
                TransmitterClass::Indoor => TransmitterId::Indoor,
            };
            by_field.insert(d.field, id);
        }

        let mut assignments = TransmitterAssignments { by_field };
        if let Some(m) = mappings {
            assignments.apply_mappings(m);
        }

        assignments
    }

    fn apply_mappings(&mut self, mappings: &str) {
        for token in mappings.to_lowercase().split_whitespace() {
            let parsed = token
                .split_once(':')
                .and_then(|(group, id)| id.parse::<i64>().ok().map(|id| (group, id)))
                .and_then(|(group, id)| TransmitterId::numbered(id).map(|id| (group, id)));

            match parsed {
                Some((group, id)) => {
                    for d in DESCRIPTORS.iter().filter(|d| d.group == group) {
                        self.by_field.insert(d.field, id);
                    }
                }
                None => {
                    tracing::debug!(message = "skipping invalid transmitter mapping", mapping = token);
                }
            }
        }
    }

    /// Transmitter assigned to the raw field, if the field belongs to a known metric.
    pub fn get(&self, field: &str) -> Option<TransmitterId> {
        self.by_field.get(field).copied()
    }

    /// Transmitter whose rain collector size calibrates rain metrics.
    pub fn rain_transmitter(&self) -> Option<TransmitterId> {
        self.get(RAIN_TOTAL_FIELD)
    }
}

impl Default for TransmitterAssignments {
    fn default() -> Self {
        Self::new(TransmitterId::Numbered(1), TransmitterId::Numbered(2), None)
    }
}
