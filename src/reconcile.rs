//! Channel priority for period fuel totals.

use std::fmt;

/// A fuel measurement source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Tank-level probe.
    Sensor,
    /// Vehicle CAN bus.
    Can,
    /// Inline flow meter.
    Flow,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Sensor, Channel::Can, Channel::Flow];

    /// Order in which refuel/drain totals are trusted.
    pub const PRIORITY: [Channel; 3] = [Channel::Sensor, Channel::Flow, Channel::Can];

    /// Key used by the vendor API for this channel, both as the `data_source`
    /// parameter and as the object key in responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sensor => "sensor",
            Channel::Can => "can",
            Channel::Flow => "flow",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Period totals reported by one channel. Every field is independently optional.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FuelSourceReading {
    pub refueled: Option<f64>,
    pub drained: Option<f64>,
    pub consumed: Option<f64>,
    pub avg_consumption: Option<f64>,
}

impl FuelSourceReading {
    pub fn is_empty(&self) -> bool {
        self.refueled.is_none()
            && self.drained.is_none()
            && self.consumed.is_none()
            && self.avg_consumption.is_none()
    }

    pub fn metric(&self, metric: SummaryMetric) -> Option<f64> {
        match metric {
            SummaryMetric::Refueled => self.refueled,
            SummaryMetric::Drained => self.drained,
        }
    }
}

/// Per-channel period summary for one vehicle. A channel the vendor did not
/// report is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FuelSummary {
    pub sensor: Option<FuelSourceReading>,
    pub can: Option<FuelSourceReading>,
    pub flow: Option<FuelSourceReading>,
}

impl FuelSummary {
    pub fn channel(&self, channel: Channel) -> Option<&FuelSourceReading> {
        match channel {
            Channel::Sensor => self.sensor.as_ref(),
            Channel::Can => self.can.as_ref(),
            Channel::Flow => self.flow.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Channel::ALL.iter().all(|c| self.channel(*c).is_none())
    }
}

/// Metrics that are merged across channels. Consumption figures are kept per
/// channel and never pass through [`reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMetric {
    Refueled,
    Drained,
}

impl fmt::Display for SummaryMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryMetric::Refueled => f.write_str("refueled"),
            SummaryMetric::Drained => f.write_str("drained"),
        }
    }
}

/// Returns the first channel in [`Channel::PRIORITY`] that has `metric`,
/// together with the value.
pub fn reconcile_with_source(
    summary: &FuelSummary,
    metric: SummaryMetric,
) -> Option<(Channel, f64)> {
    Channel::PRIORITY.iter().find_map(|&channel| {
        summary
            .channel(channel)
            .and_then(|reading| reading.metric(metric))
            .map(|value| (channel, value))
    })
}

/// Value-only form of [`reconcile_with_source`].
pub fn reconcile(summary: &FuelSummary, metric: SummaryMetric) -> Option<f64> {
    reconcile_with_source(summary, metric).map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refueled(value: f64) -> Option<FuelSourceReading> {
        Some(FuelSourceReading {
            refueled: Some(value),
            ..Default::default()
        })
    }

    #[test]
    fn test_sensor_beats_can() {
        let summary = FuelSummary {
            sensor: refueled(5.0),
            can: refueled(7.0),
            flow: None,
        };
        assert_eq!(reconcile(&summary, SummaryMetric::Refueled), Some(5.0));
    }

    #[test]
    fn test_can_used_alone() {
        let summary = FuelSummary {
            can: refueled(7.0),
            ..Default::default()
        };
        assert_eq!(reconcile(&summary, SummaryMetric::Refueled), Some(7.0));
    }

    #[test]
    fn test_nothing_reported_is_absent() {
        assert_eq!(reconcile(&FuelSummary::default(), SummaryMetric::Refueled), None);
    }

    #[test]
    fn test_flow_beats_can() {
        let summary = FuelSummary {
            sensor: None,
            can: refueled(7.0),
            flow: refueled(6.0),
        };
        assert_eq!(
            reconcile_with_source(&summary, SummaryMetric::Refueled),
            Some((Channel::Flow, 6.0))
        );
    }

    #[test]
    fn test_priority_is_applied_per_metric() {
        // Sensor reports a refuel but no drain, so drain comes from CAN.
        let summary = FuelSummary {
            sensor: refueled(50.0),
            can: Some(FuelSourceReading {
                refueled: Some(48.0),
                drained: Some(3.0),
                ..Default::default()
            }),
            flow: None,
        };
        assert_eq!(
            reconcile_with_source(&summary, SummaryMetric::Refueled),
            Some((Channel::Sensor, 50.0))
        );
        assert_eq!(
            reconcile_with_source(&summary, SummaryMetric::Drained),
            Some((Channel::Can, 3.0))
        );
    }

    #[test]
    fn test_zero_is_a_present_value() {
        let summary = FuelSummary {
            sensor: refueled(0.0),
            can: refueled(7.0),
            flow: None,
        };
        assert_eq!(reconcile(&summary, SummaryMetric::Refueled), Some(0.0));
    }

    #[test]
    fn test_empty_reading_detection() {
        assert!(FuelSourceReading::default().is_empty());
        assert!(!refueled(1.0).unwrap().is_empty());
        assert!(FuelSummary::default().is_empty());
    }
}
