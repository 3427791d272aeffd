//! Booking feature vectors
//!
//! One feature vector is built per booking at risk-evaluation time and lives
//! for exactly one detection call. Fields are named and defaulted at
//! construction rather than at read time.

use serde::{Deserialize, Serialize};

/// Number of features fed to the anomaly model.
pub const FEATURE_DIM: usize = 7;

/// Features describing one booking against its historical context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingFeatures {
    /// Quoted price of the booking.
    pub price: f64,

    /// Lifetime booking counts for both parties.
    pub customer_total_bookings: u32,
    pub provider_total_bookings: u32,

    /// Cancellation rates as fractions in [0, 1].
    pub customer_cancellation_rate: f64,
    pub provider_cancellation_rate: f64,

    /// Hours between booking creation and the scheduled slot.
    pub time_to_booking_hours: f64,

    /// Price deviation from the market average, in standard-deviation units.
    pub price_deviation_from_avg: f64,
}

impl Default for BookingFeatures {
    fn default() -> Self {
        Self {
            price: 0.0,
            customer_total_bookings: 0,
            provider_total_bookings: 0,
            customer_cancellation_rate: 0.0,
            provider_cancellation_rate: 0.0,
            time_to_booking_hours: 24.0,
            price_deviation_from_avg: 0.0,
        }
    }
}

impl BookingFeatures {
    /// Flatten into the fixed-order vector the model was trained on.
    pub fn to_vector(&self) -> [f64; FEATURE_DIM] {
        [
            self.price,
            f64::from(self.customer_total_bookings),
            f64::from(self.provider_total_bookings),
            self.customer_cancellation_rate,
            self.provider_cancellation_rate,
            self.time_to_booking_hours,
            self.price_deviation_from_avg,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_neutral() {
        let features = BookingFeatures::default();
        assert_eq!(features.time_to_booking_hours, 24.0);
        assert_eq!(features.price_deviation_from_avg, 0.0);
        assert_eq!(features.customer_cancellation_rate, 0.0);
    }

    #[test]
    fn test_vector_ordering() {
        let features = BookingFeatures {
            price: 120.0,
            customer_total_bookings: 3,
            provider_total_bookings: 7,
            customer_cancellation_rate: 0.1,
            provider_cancellation_rate: 0.2,
            time_to_booking_hours: 48.0,
            price_deviation_from_avg: 1.5,
        };
        assert_eq!(
            features.to_vector(),
            [120.0, 3.0, 7.0, 0.1, 0.2, 48.0, 1.5]
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let features: BookingFeatures =
            serde_json::from_str(r#"{"price": 90.0, "price_deviation_from_avg": 3.5}"#).unwrap();
        assert_eq!(features.price, 90.0);
        assert_eq!(features.price_deviation_from_avg, 3.5);
        assert_eq!(features.time_to_booking_hours, 24.0);
    }
}
