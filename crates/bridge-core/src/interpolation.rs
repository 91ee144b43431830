use crate::rule::Interpolation;

const BISECTION_TOLERANCE: f64 = 1e-6;
const BISECTION_MAX_ITERATIONS: u32 = 20;

/// Normalize `v` into `[0,1]` against `[min,max]`. A zero-width range maps
/// to the midpoint, `0.5`, per spec (the caller then scales that straight
/// back to `min`).
pub fn normalize(v: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        0.5
    } else {
        ((v - min) / (max - min)).clamp(0.0, 1.0)
    }
}

fn scale(t: f64, min: f64, max: f64) -> f64 {
    (min + t * (max - min)).clamp(min, max)
}

/// Apply a rule's interpolation curve to a value already clamped into
/// `[min,max]`. Never fails: a malformed Bezier curve (non-monotonic
/// control points) falls back to the direct clamp of `v` and reports
/// `fallback = true` so the caller can bump a counter.
pub fn apply(v: f64, min: f64, max: f64, interpolation: Option<&Interpolation>) -> (f64, bool) {
    let t = normalize(v, min, max);
    match interpolation {
        None | Some(Interpolation::Linear) => (scale(t, min, max), false),
        Some(Interpolation::Bezier { control_points }) => {
            match bezier_eval(control_points, t) {
                Some(t_prime) => (scale(t_prime.clamp(0.0, 1.0), min, max), false),
                None => (v.clamp(min, max), true),
            }
        }
    }
}

/// Evaluate a Bezier curve defined by `control_points` (each coordinate in
/// `[0,1]`) at normalized input `t`, by solving `x(u) = t` via bisection
/// and returning `y(u)`.
///
/// Requires `x(u)` to be monotonically non-decreasing over `u in [0,1]`
/// (true of any control-point set whose x-coordinates are themselves
/// non-decreasing); returns `None` if `x(0)` and `x(1)` don't bracket `t`.
pub fn bezier_eval(control_points: &[(f64, f64)], t: f64) -> Option<f64> {
    if control_points.len() < 2 {
        return None;
    }

    let x_at = |u: f64| de_casteljau(control_points, u).0;
    let y_at = |u: f64| de_casteljau(control_points, u).1;

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    let x_lo = x_at(lo);
    let x_hi = x_at(hi);
    if t < x_lo.min(x_hi) - BISECTION_TOLERANCE || t > x_lo.max(x_hi) + BISECTION_TOLERANCE {
        return None;
    }

    let increasing = x_hi >= x_lo;
    let mut mid = (lo + hi) / 2.0;
    for _ in 0..BISECTION_MAX_ITERATIONS {
        mid = (lo + hi) / 2.0;
        let x_mid = x_at(mid);
        if (x_mid - t).abs() <= BISECTION_TOLERANCE {
            break;
        }
        let below = x_mid < t;
        if below == increasing {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Some(y_at(mid))
}

/// De Casteljau's algorithm: evaluate the Bezier curve through
/// `control_points` at parameter `u`.
fn de_casteljau(control_points: &[(f64, f64)], u: f64) -> (f64, f64) {
    let mut pts: Vec<(f64, f64)> = control_points.to_vec();
    while pts.len() > 1 {
        pts = pts
            .windows(2)
            .map(|w| {
                let (x0, y0) = w[0];
                let (x1, y1) = w[1];
                (x0 + (x1 - x0) * u, y0 + (y1 - y0) * u)
            })
            .collect();
    }
    pts[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_identity_round_trip() {
        assert_eq!(apply(15.0, -30.0, 30.0, None), (15.0, false));
        assert_eq!(
            apply(15.0, -30.0, 30.0, Some(&Interpolation::Linear)),
            (15.0, false)
        );
    }

    #[test]
    fn clamps_out_of_range_input() {
        assert_eq!(apply(90.0, -30.0, 30.0, None), (30.0, false));
        assert_eq!(apply(-90.0, -30.0, 30.0, None), (-30.0, false));
    }

    #[test]
    fn zero_range_returns_min() {
        assert_eq!(apply(123.0, 5.0, 5.0, None), (5.0, false));
    }

    #[test]
    fn bezier_pulls_midpoint_up() {
        let interp = Interpolation::Bezier {
            control_points: vec![(0.0, 0.0), (0.5, 0.8), (1.0, 1.0)],
        };
        let (value, fallback) = apply(0.5, 0.0, 1.0, Some(&interp));
        assert!(!fallback);
        assert!(value > 0.5 && value < 1.0, "got {value}");
    }

    #[test]
    fn bezier_endpoints_are_exact() {
        let pts = vec![(0.0, 0.0), (0.5, 0.8), (1.0, 1.0)];
        assert!((bezier_eval(&pts, 0.0).unwrap() - 0.0).abs() < 1e-6);
        assert!((bezier_eval(&pts, 1.0).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn bezier_matches_reference_value_within_tolerance() {
        // De Casteljau at u=0.5 for these control points is exactly (0.5, 0.65).
        let pts = vec![(0.0, 0.0), (0.5, 0.8), (1.0, 1.0)];
        let y = bezier_eval(&pts, 0.5).unwrap();
        assert!((y - 0.65).abs() < 1e-6, "got {y}");
    }

    #[test]
    fn malformed_bezier_falls_back_to_clamp() {
        // normalized input clamps to 1.0, but x(u) never exceeds 0.2 here.
        let interp = Interpolation::Bezier {
            control_points: vec![(0.0, 0.0), (0.2, 1.0)],
        };
        let (value, fallback) = apply(90.0, 0.0, 1.0, Some(&interp));
        assert!(fallback);
        assert_eq!(value, 1.0);
    }
}
