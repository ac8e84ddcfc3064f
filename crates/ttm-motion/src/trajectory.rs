//! Trajectory resampling.

use ttm_models::Point;

/// How to map a trajectory with at least as many points as frames.
///
/// Shorter trajectories are always stretched by linear interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrajectoryPolicy {
    /// Keep the first `frame_count` points verbatim
    #[default]
    Truncate,
    /// Interpolate over the whole path so the final point is reached
    Resample,
}

impl TrajectoryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrajectoryPolicy::Truncate => "truncate",
            TrajectoryPolicy::Resample => "resample",
        }
    }

    /// Parse from a config string; unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "truncate" => Some(TrajectoryPolicy::Truncate),
            "resample" => Some(TrajectoryPolicy::Resample),
            _ => None,
        }
    }
}

/// Map `trajectory` onto exactly `frame_count` points.
///
/// `trajectory` must be non-empty and `frame_count` at least 2.
pub fn resample(trajectory: &[Point], frame_count: usize, policy: TrajectoryPolicy) -> Vec<Point> {
    if trajectory.len() >= frame_count && policy == TrajectoryPolicy::Truncate {
        return trajectory[..frame_count].to_vec();
    }

    let last = trajectory.len() - 1;
    (0..frame_count)
        .map(|i| {
            let t = i as f64 / (frame_count - 1) as f64 * last as f64;
            let idx = t.floor() as usize;
            if idx < last {
                let frac = t - idx as f64;
                let a = trajectory[idx];
                let b = trajectory[idx + 1];
                Point::new(a.x * (1.0 - frac) + b.x * frac, a.y * (1.0 - frac) + b.y * frac)
            } else {
                trajectory[last]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_interpolates_short_path() {
        let path = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.5)];
        let points = resample(&path, 5, TrajectoryPolicy::Truncate);

        assert_eq!(points.len(), 5);
        assert!(approx(points[0], Point::new(0.0, 0.0)));
        assert!(approx(points[2], Point::new(0.5, 0.25)));
        assert!(approx(points[4], Point::new(1.0, 0.5)));
    }

    #[test]
    fn test_single_point_is_held() {
        let path = vec![Point::new(0.3, 0.7)];
        let points = resample(&path, 4, TrajectoryPolicy::Truncate);
        assert!(points.iter().all(|p| approx(*p, Point::new(0.3, 0.7))));
    }

    #[test]
    fn test_truncate_long_path() {
        let path: Vec<Point> = (0..10).map(|i| Point::new(i as f64 / 10.0, 0.0)).collect();
        let points = resample(&path, 4, TrajectoryPolicy::Truncate);
        assert_eq!(points, path[..4].to_vec());
    }

    #[test]
    fn test_resample_long_path_reaches_end() {
        let path: Vec<Point> = (0..10).map(|i| Point::new(i as f64 / 9.0, 0.0)).collect();
        let points = resample(&path, 4, TrajectoryPolicy::Resample);

        assert_eq!(points.len(), 4);
        assert!(approx(points[0], path[0]));
        assert!(approx(points[3], path[9]));
        assert!(approx(points[1], Point::new(1.0 / 3.0, 0.0)));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(TrajectoryPolicy::parse("Resample"), Some(TrajectoryPolicy::Resample));
        assert_eq!(TrajectoryPolicy::parse("bogus"), None);
    }
}
