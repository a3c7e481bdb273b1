//! RSSI to approximate-distance conversion.
//!
//! Path-loss model calibrated against a reference strength at one meter.
//! The output is only an estimate — multipath and body shadowing swamp the
//! model indoors — but it is deterministic, which is what the pipeline and
//! the conformance tests need.

/// Calibrated signal strength at one meter, in dBm.
pub const REFERENCE_POWER_DBM: f64 = -59.0;

/// Path-loss exponent for free-space propagation.
pub const PATH_LOSS_EXPONENT: f64 = 2.0;

/// Sentinel returned when the distance cannot be determined.
pub const UNDETERMINABLE_DISTANCE: f64 = -1.0;

/// Estimate distance in meters from a signal strength in dBm.
///
/// A strength of exactly 0 is undeterminable and yields
/// [`UNDETERMINABLE_DISTANCE`]. Otherwise the ratio of the measured strength
/// to [`REFERENCE_POWER_DBM`] selects one of two fitted curves; the branch
/// boundary at ratio 1.0 belongs to the far curve. Results are rounded to
/// two decimal places.
pub fn estimate_distance(rssi: i32) -> f64 {
    if rssi == 0 {
        return UNDETERMINABLE_DISTANCE;
    }

    let ratio = f64::from(rssi) / REFERENCE_POWER_DBM;
    let meters = if ratio < 1.0 {
        ratio.powi(10)
    } else {
        0.89976 * ratio.powf(7.7095) + 0.111
    };

    (meters * 100.0).round() / 100.0
}
