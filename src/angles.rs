use std::f64::consts::{PI, TAU};

/// Wrap an angle into (-π, π].
///
/// Angles already inside the interval are returned untouched, so the
/// function is exactly idempotent.
pub fn wrap_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }

    // rem_euclid lands in [0, 2π]; shift back to [-π, π]
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}
