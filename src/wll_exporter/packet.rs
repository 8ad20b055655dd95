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

use crate::record::{unit_systems, MeasurementRecord};
use crate::sensors::{
    rain_collector_scale, Derivation, TransmitterAssignments, TransmitterId, DESCRIPTORS, RAIN_SIZE_FIELD,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::error;
use std::fmt;

#[derive(Debug)]
pub enum PacketError {
    Malformed(serde_json::Error),
    Station(String),
    MissingData,
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed conditions payload: {}", e),
            Self::Station(msg) => write!(f, "station returned error: {}", msg),
            Self::MissingData => write!(f, "conditions payload contained no data"),
        }
    }
}

impl error::Error for PacketError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

/// Body of a `/v1/current_conditions` response.
#[derive(Deserialize, Debug)]
pub struct ConditionsResponse {
    pub data: Option<ConditionsData>,
    pub error: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct ConditionsData {
    pub did: Option<String>,
    pub ts: i64,
    pub conditions: Vec<ConditionBlock>,
}

/// Readings from one transmitter or built-in sensor of the station.
#[derive(Deserialize, Debug)]
pub struct ConditionBlock {
    pub data_structure_type: i64,
    pub txid: Option<i64>,
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

impl ConditionBlock {
    /// Transmitter that produced this block or `None` if the record type isn't one we
    /// know how to attribute.
    pub fn transmitter(&self) -> Option<TransmitterId> {
        match self.data_structure_type {
            1 | 2 => self.txid.and_then(TransmitterId::numbered),
            3 => Some(TransmitterId::Barometric),
            4 => Some(TransmitterId::Indoor),
            _ => None,
        }
    }
}

/// Numeric readings from a single response, keyed by transmitter and raw field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationFrame {
    values: HashMap<TransmitterId, HashMap<String, f64>>,
}

impl ObservationFrame {
    pub fn insert<S: Into<String>>(&mut self, transmitter: TransmitterId, field: S, value: f64) {
        self.values.entry(transmitter).or_default().insert(field.into(), value);
    }

    pub fn get(&self, transmitter: TransmitterId, field: &str) -> Option<f64> {
        self.values.get(&transmitter).and_then(|f| f.get(field)).copied()
    }
}

/// Find the value of a raw field, preferring the transmitter assigned to it and otherwise
/// taking the first transmitter in `TransmitterId::FALLBACK_ORDER` that reports it.
pub fn resolve(frame: &ObservationFrame, assignments: &TransmitterAssignments, field: &str) -> Option<f64> {
    assignments
        .get(field)
        .and_then(|tx| frame.get(tx, field))
        .or_else(|| {
            TransmitterId::FALLBACK_ORDER
                .iter()
                .find_map(|tx| frame.get(*tx, field))
        })
}

/// Rain gauge state carried from one poll to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    rain_total: Option<f64>,
    rain_scale: f64,
}

impl SessionState {
    /// Current calibration factor, inches per collector tick.
    pub fn rain_scale(&self) -> f64 {
        self.rain_scale
    }

    /// Last calibrated yearly rain total seen, if any.
    pub fn rain_total(&self) -> Option<f64> {
        self.rain_total
    }

    /// Switch to the calibration factor of the given collector size. Returns `false`
    /// and keeps the current factor if the size isn't recognized.
    pub fn set_rain_collector(&mut self, size: i64) -> bool {
        match rain_collector_scale(size) {
            Some(scale) => {
                self.rain_scale = scale;
                true
            }
            None => false,
        }
    }

    /// Rain since the previous call given a yearly total in collector ticks.
    ///
    /// The first call only establishes a baseline and returns zero. A total lower than
    /// the previous one means the yearly counter was reset, so the whole new total is
    /// returned.
    pub fn rain_since_last(&mut self, ticks: f64) -> f64 {
        let total = ticks * self.rain_scale;
        let baseline = match self.rain_total {
            None => total,
            Some(prev) if total < prev => 0.0,
            Some(prev) => prev,
        };

        self.rain_total = Some(total);
        total - baseline
    }

    pub fn derive(&mut self, derivation: Derivation, value: f64) -> f64 {
        match derivation {
            Derivation::None => value,
            Derivation::RateScale => value * self.rain_scale,
            Derivation::CumulativeDelta => self.rain_since_last(value),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            rain_total: None,
            // Collector size 1, 0.01in per tick
            rain_scale: 0.01,
        }
    }
}

/// Turns station responses into measurement records.
///
/// Each normalizer tracks rain totals between calls, so a single instance should be used
/// for all polls of a station.
#[derive(Debug, Clone)]
pub struct PacketNormalizer {
    assignments: TransmitterAssignments,
    state: SessionState,
}

impl PacketNormalizer {
    pub fn new(assignments: TransmitterAssignments) -> Self {
        PacketNormalizer {
            assignments,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Decode a raw response body and build a record from it.
    pub fn parse_body(&mut self, body: &str) -> Result<MeasurementRecord, PacketError> {
        let res: ConditionsResponse = serde_json::from_str(body).map_err(PacketError::Malformed)?;
        match (res.data, res.error) {
            (Some(data), _) => Ok(self.parse(&data)),
            (None, Some(e)) => Err(PacketError::Station(e.to_string())),
            (None, None) => Err(PacketError::MissingData),
        }
    }

    /// Build a record from decoded conditions, updating rain state along the way.
    pub fn parse(&mut self, data: &ConditionsData) -> MeasurementRecord {
        tracing::debug!(message = "parsing conditions", device = ?data.did, ts = data.ts);

        let frame = self.frame(data);
        let mut record = MeasurementRecord::new(data.ts, unit_systems::US);

        for d in DESCRIPTORS {
            if let Some(v) = resolve(&frame, &self.assignments, d.field) {
                record.insert(d.metric, self.state.derive(d.derivation, v * d.factor));
            }
        }

        record
    }

    fn frame(&mut self, data: &ConditionsData) -> ObservationFrame {
        let rain_tx = self.assignments.rain_transmitter();
        let mut frame = ObservationFrame::default();

        for block in data.conditions.iter() {
            let tx = match block.transmitter() {
                Some(tx) => tx,
                None => {
                    tracing::debug!(
                        message = "skipping condition block",
                        data_structure_type = block.data_structure_type,
                        txid = ?block.txid,
                    );
                    continue;
                }
            };

            for (key, value) in block.fields.iter() {
                if key == RAIN_SIZE_FIELD && Some(tx) == rain_tx {
                    if let Some(size) = value.as_i64() {
                        if !self.state.set_rain_collector(size) {
                            tracing::warn!(message = "unknown rain collector size", size = size, transmitter = %tx);
                        }
                    }
                    continue;
                }

                if let Some(v) = value.as_f64() {
                    frame.insert(tx, key.as_str(), v);
                }
            }
        }

        frame
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve, ObservationFrame, PacketError, PacketNormalizer, SessionState};
    use crate::fixtures::{rain_block, response, FIRST_RESPONSE, SECOND_RESPONSE};
    use crate::record::unit_systems;
    use crate::sensors::{Derivation, TransmitterAssignments, TransmitterId, DESCRIPTORS};
    use serde_json::json;

    const EPSILON: f64 = 1e-6;

    fn normalizer(weather: u8, mappings: Option<&str>) -> PacketNormalizer {
        PacketNormalizer::new(TransmitterAssignments::new(
            TransmitterId::Numbered(weather),
            TransmitterId::Numbered(2),
            mappings,
        ))
    }

    fn assert_close(expected: f64, actual: Option<f64>) {
        let actual = actual.expect("expected metric to be present");
        assert!(
            (expected - actual).abs() < EPSILON,
            "expected {} got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_parse_sample_responses() {
        let mut n = normalizer(1, Some("rain:1 temp:2"));

        let first = n.parse_body(FIRST_RESPONSE).unwrap();
        assert_eq!(1634925911, first.date_time);
        assert_eq!(unit_systems::US, first.us_units);
        assert_eq!(Some(57.9), first.get("outTemp"));
        assert_eq!(Some(97.6), first.get("outHumidity"));
        assert_eq!(Some(360.0), first.get("windDir"));
        assert_eq!(Some(4.0), first.get("windGust"));
        assert_eq!(Some(378.0), first.get("radiation"));
        assert_eq!(Some(1.8), first.get("UV"));
        assert_eq!(Some(0.0), first.get("txBatteryStatus"));
        assert_eq!(Some(30.074), first.get("barometer"));
        assert_eq!(Some(29.755), first.get("pressure"));
        assert_eq!(Some(70.9), first.get("inTemp"));
        assert_eq!(Some(55.1), first.get("inDewpoint"));
        assert_eq!(Some(0.0), first.get("rain"));
        assert_eq!(Some(0.0), first.get("rainRate"));

        let second = n.parse_body(SECOND_RESPONSE).unwrap();
        assert_eq!(1634926765, second.date_time);
        assert_eq!(Some(57.7), second.get("outTemp"));
        assert_eq!(Some(30.076), second.get("barometer"));
        assert_close(0.01, second.get("rain"));
    }

    #[test]
    fn test_unreported_metrics_omitted() {
        let mut n = normalizer(1, None);
        let record = n.parse_body(FIRST_RESPONSE).unwrap();

        for metric in ["soilTemp1", "soilTemp4", "soilMoist1", "soilMoist4"] {
            assert!(!record.contains(metric), "unexpected {}", metric);
        }

        // Every weather, barometric, and indoor metric
        assert_eq!(DESCRIPTORS.len() - 8, record.len());
    }

    #[test]
    fn test_rain_delta_collector_type_one() {
        let mut n = normalizer(1, None);
        let mut ticks = 200;
        n.parse_body(&response(1, vec![rain_block(1, 1, ticks, 0)])).unwrap();

        for (i, delta) in [0, 1, 7, 25, 3].into_iter().enumerate() {
            ticks += delta;
            let record = n
                .parse_body(&response(2 + i as i64, vec![rain_block(1, 1, ticks, 0)]))
                .unwrap();
            assert_close(delta as f64 * 0.01, record.get("rain"));
        }
    }

    #[test]
    fn test_rain_year_rollover() {
        let mut n = normalizer(1, None);
        n.parse_body(&response(1, vec![rain_block(1, 1, 986, 0)])).unwrap();
        n.parse_body(&response(2, vec![rain_block(1, 1, 990, 0)])).unwrap();

        let record = n.parse_body(&response(3, vec![rain_block(1, 1, 12, 0)])).unwrap();
        assert_close(0.12, record.get("rain"));
        assert!(record.get("rain").unwrap() >= 0.0);

        let record = n.parse_body(&response(4, vec![rain_block(1, 1, 15, 0)])).unwrap();
        assert_close(0.03, record.get("rain"));
    }

    #[test]
    fn test_rain_rate_uses_calibration() {
        let mut n = normalizer(5, None);
        let record = n.parse_body(&response(1, vec![rain_block(5, 2, 100, 4)])).unwrap();

        assert_close(0.2 * 0.0393701, Some(n.state().rain_scale()));
        assert_close(4.0 * 0.2 * 0.0393701, record.get("rainRate"));
    }

    #[test]
    fn test_rain_size_only_from_rain_transmitter() {
        // Rain is assigned to transmitter 1 but the only gauge is on transmitter 5
        let mut n = normalizer(1, None);
        let record = n.parse_body(&response(1, vec![rain_block(5, 2, 100, 4)])).unwrap();

        assert_close(0.01, Some(n.state().rain_scale()));
        assert_close(0.04, record.get("rainRate"));
    }

    #[test]
    fn test_rain_size_not_stored() {
        let mut n = normalizer(5, None);
        let body = response(1, vec![rain_block(5, 3, 100, 0), rain_block(6, 4, 100, 0)]);
        let res: super::ConditionsResponse = serde_json::from_str(&body).unwrap();
        let frame = n.frame(&res.data.unwrap());

        assert_eq!(None, frame.get(TransmitterId::Numbered(5), "rain_size"));
        assert_eq!(Some(4.0), frame.get(TransmitterId::Numbered(6), "rain_size"));
        assert_eq!(Some(100.0), frame.get(TransmitterId::Numbered(5), "rainfall_year"));
        assert_close(0.1 * 0.0393701, Some(n.state().rain_scale()));
    }

    #[test]
    fn test_unknown_rain_size_keeps_factor() {
        let mut n = normalizer(1, None);
        n.parse_body(&response(1, vec![rain_block(1, 4, 100, 0)])).unwrap();
        n.parse_body(&response(2, vec![rain_block(1, 9, 100, 0)])).unwrap();

        assert_eq!(0.001, n.state().rain_scale());
    }

    #[test]
    fn test_assigned_transmitter_preferred() {
        let blocks = vec![
            json!({"data_structure_type": 1, "txid": 1, "temp": 50.0, "wind_speed_last": 3.0}),
            json!({"data_structure_type": 1, "txid": 3, "temp": 60.0, "wind_speed_last": 6.0}),
        ];
        let body = response(1, blocks);

        let record = normalizer(1, None).parse_body(&body).unwrap();
        assert_eq!(Some(50.0), record.get("outTemp"));
        assert_eq!(Some(3.0), record.get("windSpeed"));

        let record = normalizer(1, Some("temp:3")).parse_body(&body).unwrap();
        assert_eq!(Some(60.0), record.get("outTemp"));
        assert_eq!(Some(3.0), record.get("windSpeed"));

        // Nothing on transmitter 4, lowest numbered transmitter wins
        let record = normalizer(4, None).parse_body(&body).unwrap();
        assert_eq!(Some(50.0), record.get("outTemp"));
    }

    #[test]
    fn test_null_values_fall_back() {
        let blocks = vec![
            json!({"data_structure_type": 1, "txid": 1, "temp": null, "solar_rad": null}),
            json!({"data_structure_type": 1, "txid": 2, "temp": 61.5}),
        ];

        let record = normalizer(1, None).parse_body(&response(1, blocks)).unwrap();
        assert_eq!(Some(61.5), record.get("outTemp"));
        assert!(!record.contains("radiation"));
    }

    #[test]
    fn test_unattributed_blocks_skipped() {
        let blocks = vec![
            json!({"data_structure_type": 6, "temp": 80.0, "hum": 20.0}),
            json!({"data_structure_type": 1, "temp": 81.0}),
            json!({"data_structure_type": 2, "txid": 12, "temp_1": 55.0}),
            json!({"data_structure_type": 2, "txid": 3, "temp_1": 56.0, "moist_soil_1": 12}),
        ];

        let record = normalizer(1, None).parse_body(&response(1, blocks)).unwrap();
        assert!(!record.contains("outTemp"));
        assert!(!record.contains("outHumidity"));
        assert_eq!(Some(56.0), record.get("soilTemp1"));
        assert_eq!(Some(12.0), record.get("soilMoist1"));
    }

    #[test]
    fn test_parse_body_missing_conditions() {
        let mut n = normalizer(1, None);
        let res = n.parse_body(r#"{"data": {"did": "001D0A71262A", "ts": 1634925911}, "error": null}"#);
        assert!(matches!(res, Err(PacketError::Malformed(_))));
    }

    #[test]
    fn test_parse_body_missing_timestamp() {
        let mut n = normalizer(1, None);
        let res = n.parse_body(r#"{"data": {"conditions": []}, "error": null}"#);
        assert!(matches!(res, Err(PacketError::Malformed(_))));
    }

    #[test]
    fn test_parse_body_not_json() {
        let mut n = normalizer(1, None);
        assert!(matches!(n.parse_body("<html></html>"), Err(PacketError::Malformed(_))));
    }

    #[test]
    fn test_parse_body_station_error() {
        let mut n = normalizer(1, None);
        let res = n.parse_body(r#"{"data": null, "error": {"code": 409, "message": "busy"}}"#);
        match res {
            Err(PacketError::Station(msg)) => assert!(msg.contains("busy")),
            other => panic!("unexpected result {:?}", other),
        }

        assert!(matches!(n.parse_body("{}"), Err(PacketError::MissingData)));
    }

    #[test]
    fn test_malformed_payload_keeps_state() {
        let mut n = normalizer(1, None);
        n.parse_body(&response(1, vec![rain_block(1, 1, 986, 0)])).unwrap();
        assert!(n.parse_body(r#"{"data": {"ts": 2}}"#).is_err());

        let record = n.parse_body(&response(3, vec![rain_block(1, 1, 987, 0)])).unwrap();
        assert_close(0.01, record.get("rain"));
    }

    #[test]
    fn test_resolve() {
        let assignments = TransmitterAssignments::default();
        let mut frame = ObservationFrame::default();
        frame.insert(TransmitterId::Indoor, "temp", 70.0);
        frame.insert(TransmitterId::Barometric, "temp", 71.0);
        frame.insert(TransmitterId::Numbered(7), "temp", 72.0);
        frame.insert(TransmitterId::Numbered(1), "hum", 40.0);

        assert_eq!(Some(40.0), resolve(&frame, &assignments, "hum"));
        assert_eq!(Some(72.0), resolve(&frame, &assignments, "temp"));
        assert_eq!(None, resolve(&frame, &assignments, "dew_point"));

        frame.insert(TransmitterId::Numbered(1), "temp", 73.0);
        assert_eq!(Some(73.0), resolve(&frame, &assignments, "temp"));

        // Fields without an assignment still use the fallback scan
        frame.insert(TransmitterId::Indoor, "heat_index_in", 69.0);
        assert_eq!(Some(69.0), resolve(&frame, &assignments, "heat_index_in"));
    }

    #[test]
    fn test_session_state_derive() {
        let mut state = SessionState::default();
        assert_eq!(None, state.rain_total());
        assert_eq!(12.5, state.derive(Derivation::None, 12.5));
        assert_close(0.05, Some(state.derive(Derivation::RateScale, 5.0)));
        assert_eq!(0.0, state.derive(Derivation::CumulativeDelta, 300.0));
        assert_close(3.0, state.rain_total());
        assert_close(0.02, Some(state.derive(Derivation::CumulativeDelta, 302.0)));
    }
}
