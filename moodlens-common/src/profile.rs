//! The 6-axis emotion profile
//!
//! Every analyzed item resolves to a profile over six fixed axes, each a
//! bounded real value in [0.0, 1.0]:
//! - valence (sad ↔ happy)
//! - energy (calm ↔ intense)
//! - tension (relaxed ↔ suspenseful)
//! - warmth (cold ↔ affectionate)
//! - power (intimate ↔ epic)
//! - complexity (simple ↔ intricate)

use serde::{Deserialize, Serialize};

/// A 6-axis emotion profile with all components in [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisProfile {
    pub valence: f64,
    pub energy: f64,
    pub tension: f64,
    pub warmth: f64,
    pub power: f64,
    pub complexity: f64,
}

impl AxisProfile {
    /// Neutral default profile used when upstream analysis is unavailable
    pub const NEUTRAL: AxisProfile = AxisProfile {
        valence: 0.5,
        energy: 0.5,
        tension: 0.5,
        warmth: 0.5,
        power: 0.5,
        complexity: 0.5,
    };

    /// Construct a profile with every axis clamped into [0.0, 1.0]
    pub fn clamped(
        valence: f64,
        energy: f64,
        tension: f64,
        warmth: f64,
        power: f64,
        complexity: f64,
    ) -> Self {
        Self {
            valence: valence.clamp(0.0, 1.0),
            energy: energy.clamp(0.0, 1.0),
            tension: tension.clamp(0.0, 1.0),
            warmth: warmth.clamp(0.0, 1.0),
            power: power.clamp(0.0, 1.0),
            complexity: complexity.clamp(0.0, 1.0),
        }
    }

    /// True if every axis lies within [0.0, 1.0]
    pub fn is_bounded(&self) -> bool {
        [
            self.valence,
            self.energy,
            self.tension,
            self.warmth,
            self.power,
            self.complexity,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }

    /// Per-axis arithmetic mean over a set of profiles
    ///
    /// Returns None for an empty input so that "no aggregate" stays
    /// distinguishable from a computed all-zero profile.
    pub fn mean_of(profiles: &[AxisProfile]) -> Option<AxisProfile> {
        if profiles.is_empty() {
            return None;
        }

        let n = profiles.len() as f64;
        let mut sum = AxisProfile {
            valence: 0.0,
            energy: 0.0,
            tension: 0.0,
            warmth: 0.0,
            power: 0.0,
            complexity: 0.0,
        };

        for p in profiles {
            sum.valence += p.valence;
            sum.energy += p.energy;
            sum.tension += p.tension;
            sum.warmth += p.warmth;
            sum.power += p.power;
            sum.complexity += p.complexity;
        }

        Some(AxisProfile {
            valence: sum.valence / n,
            energy: sum.energy / n,
            tension: sum.tension / n,
            warmth: sum.warmth / n,
            power: sum.power / n,
            complexity: sum.complexity / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_bounds_all_axes() {
        let p = AxisProfile::clamped(-0.5, 1.5, 0.3, 0.7, 2.0, -1.0);
        assert!(p.is_bounded());
        assert_eq!(p.valence, 0.0);
        assert_eq!(p.energy, 1.0);
        assert_eq!(p.tension, 0.3);
        assert_eq!(p.power, 1.0);
        assert_eq!(p.complexity, 0.0);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert!(AxisProfile::mean_of(&[]).is_none());
    }

    #[test]
    fn mean_of_averages_per_axis() {
        let a = AxisProfile::clamped(0.2, 0.4, 0.6, 0.8, 1.0, 0.0);
        let b = AxisProfile::clamped(0.4, 0.6, 0.8, 1.0, 0.0, 0.2);
        let mean = AxisProfile::mean_of(&[a, b]).unwrap();

        assert!((mean.valence - 0.3).abs() < 1e-9);
        assert!((mean.energy - 0.5).abs() < 1e-9);
        assert!((mean.tension - 0.7).abs() < 1e-9);
        assert!((mean.warmth - 0.9).abs() < 1e-9);
        assert!((mean.power - 0.5).abs() < 1e-9);
        assert!((mean.complexity - 0.1).abs() < 1e-9);
    }

    #[test]
    fn mean_distinguishable_from_zero() {
        let zero = AxisProfile::clamped(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let mean = AxisProfile::mean_of(&[zero]).unwrap();
        assert_eq!(mean, zero);
        // Absence is None, not an all-zero profile
        assert_ne!(AxisProfile::mean_of(&[]), Some(zero));
    }

    #[test]
    fn neutral_is_all_half() {
        let n = AxisProfile::NEUTRAL;
        assert_eq!(n.valence, 0.5);
        assert_eq!(n.complexity, 0.5);
        assert!(n.is_bounded());
    }
}
