// Score-ramped weighted choice of power-up kinds.

use crate::domain::PowerKind;
use rand::Rng;

fn base_weight(kind: PowerKind) -> f64 {
    match kind {
        PowerKind::Heal => 2.2,
        PowerKind::Shield => 1.6,
        PowerKind::Rapid => 1.2,
        PowerKind::Multishot => 1.0,
        PowerKind::Bigshot => 0.9,
        PowerKind::Slowmo => 0.9,
        PowerKind::Magnet => 1.0,
    }
}

/// Weight of `kind` at the given best score.
///
/// Early on, defensive kinds dominate; offensive kinds ramp in between
/// scores 5 and 15 and get a small boost after that.
pub fn weight(kind: PowerKind, score: u32) -> f64 {
    let base = base_weight(kind);
    let score = f64::from(score);

    let factor = if score < 5.0 {
        match kind {
            PowerKind::Multishot | PowerKind::Bigshot => 0.3,
            PowerKind::Slowmo => 0.4,
            PowerKind::Magnet => 0.5,
            PowerKind::Heal => 1.3,
            PowerKind::Shield => 1.2,
            PowerKind::Rapid => 1.0,
        }
    } else if score < 15.0 {
        let t = (score - 5.0) / 10.0;
        match kind {
            PowerKind::Multishot | PowerKind::Bigshot => 0.3 + 0.7 * t,
            PowerKind::Slowmo => 0.4 + 0.6 * t,
            PowerKind::Magnet => 0.5 + 0.5 * t,
            _ => 1.0,
        }
    } else {
        match kind {
            PowerKind::Rapid => 1.1,
            PowerKind::Multishot => 1.15,
            PowerKind::Bigshot => 1.1,
            _ => 1.0,
        }
    };

    base * factor
}

/// Picks a kind with probability proportional to its weight at `score`.
pub fn pick_power_kind<R: Rng + ?Sized>(rng: &mut R, score: u32) -> PowerKind {
    let total: f64 = PowerKind::ALL.iter().map(|kind| weight(*kind, score)).sum();
    let mut roll = rng.random_range(0.0..total);
    for kind in PowerKind::ALL {
        let w = weight(kind, score);
        if roll < w {
            return kind;
        }
        roll -= w;
    }
    PowerKind::Heal
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    #[test]
    fn when_score_is_low_then_heal_is_favoured_over_offense() {
        assert!(weight(PowerKind::Heal, 0) > 2.0 * weight(PowerKind::Multishot, 0));
        assert!((weight(PowerKind::Heal, 0) - 2.86).abs() < 1e-9);
        assert!((weight(PowerKind::Bigshot, 0) - 0.27).abs() < 1e-9);
    }

    #[test]
    fn when_score_ramps_then_offensive_weight_grows() {
        let w5 = weight(PowerKind::Multishot, 5);
        let w10 = weight(PowerKind::Multishot, 10);
        let w14 = weight(PowerKind::Multishot, 14);
        assert!(w5 < w10 && w10 < w14);
        assert!((w10 - 0.65).abs() < 1e-9);
    }

    #[test]
    fn when_score_is_high_then_rapid_gets_boost() {
        assert!((weight(PowerKind::Rapid, 20) - 1.32).abs() < 1e-9);
        assert_eq!(weight(PowerKind::Heal, 20), 2.2);
    }

    #[test]
    fn when_many_kinds_are_drawn_then_every_kind_appears() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen: HashMap<PowerKind, usize> = HashMap::new();
        for _ in 0..2_000 {
            *seen.entry(pick_power_kind(&mut rng, 20)).or_default() += 1;
        }
        assert_eq!(seen.len(), PowerKind::ALL.len());
        assert!(seen[&PowerKind::Heal] > seen[&PowerKind::Slowmo]);
    }
}
