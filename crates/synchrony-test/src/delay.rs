//! One-way message delay models

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;

use synchrony_core::SynchronyBound;

/// Delay distribution for simulated messages
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DelayModel {
    /// Every message takes exactly this long
    Fixed(Duration),
    /// Uniform over `[min, max]`
    Uniform { min: Duration, max: Duration },
}

impl DelayModel {
    /// Any delay up to and including Δ
    pub fn within_bound(bound: SynchronyBound) -> Self {
        DelayModel::Uniform {
            min: Duration::ZERO,
            max: bound.as_duration(),
        }
    }

    /// Delays strictly above Δ, up to 2Δ
    pub fn violating(bound: SynchronyBound) -> Self {
        let delta = bound.as_duration();
        DelayModel::Uniform {
            min: delta + Duration::from_nanos(1),
            max: delta * 2,
        }
    }

    /// Sample a delay
    pub fn sample(&self, rng: &mut StdRng) -> Duration {
        match self {
            DelayModel::Fixed(delay) => *delay,
            DelayModel::Uniform { min, max } => {
                if min >= max {
                    return *min;
                }
                let lo = duration_nanos(*min);
                let hi = duration_nanos(*max);
                Duration::from_nanos(rng.gen_range(lo..=hi))
            }
        }
    }

    pub fn max_delay(&self) -> Duration {
        match self {
            DelayModel::Fixed(delay) => *delay,
            DelayModel::Uniform { min, max } => (*min).max(*max),
        }
    }

    /// Whether every sample respects the synchrony bound
    pub fn respects(&self, bound: SynchronyBound) -> bool {
        self.max_delay() <= bound.as_duration()
    }
}

fn duration_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_uniform_samples_in_range() {
        let bound = SynchronyBound::new(Duration::from_secs(2)).unwrap();
        let model = DelayModel::within_bound(bound);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let d = model.sample(&mut rng);
            assert!(d <= Duration::from_secs(2));
        }
        assert!(model.respects(bound));
    }

    #[test]
    fn test_violating_model() {
        let bound = SynchronyBound::new(Duration::from_secs(2)).unwrap();
        let model = DelayModel::violating(bound);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let d = model.sample(&mut rng);
            assert!(d > Duration::from_secs(2) && d <= Duration::from_secs(4));
        }
        assert!(!model.respects(bound));
    }

    #[test]
    fn test_degenerate_uniform() {
        let model = DelayModel::Uniform {
            min: Duration::from_millis(30),
            max: Duration::from_millis(10),
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(model.sample(&mut rng), Duration::from_millis(30));
        assert_eq!(model.max_delay(), Duration::from_millis(30));
    }
}
