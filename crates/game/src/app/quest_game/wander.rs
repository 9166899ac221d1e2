use engine::Vec2;
use rand::Rng;

/// Random-walk parameters. Probabilities apply once per decision, not once per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WanderTuning {
    pub decisions_per_second: f32,
    /// Chance a decision leaves the NPC without a direction.
    pub idle_chance: f64,
    /// Chance a decision turns the chosen direction into a velocity change.
    pub move_chance: f64,
    pub speed: f32,
}

impl Default for WanderTuning {
    fn default() -> Self {
        Self {
            decisions_per_second: 60.0,
            idle_chance: 65.0 / 101.0,
            move_chance: 1.0 / 151.0,
            speed: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum MovingDirection {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl MovingDirection {
    const ALL: [MovingDirection; 4] = [
        MovingDirection::Up,
        MovingDirection::Down,
        MovingDirection::Left,
        MovingDirection::Right,
    ];

    fn velocity(self, speed: f32) -> Vec2 {
        match self {
            MovingDirection::None => Vec2::ZERO,
            MovingDirection::Up => Vec2::new(0.0, -speed),
            MovingDirection::Down => Vec2::new(0.0, speed),
            MovingDirection::Left => Vec2::new(-speed, 0.0),
            MovingDirection::Right => Vec2::new(speed, 0.0),
        }
    }
}

/// Time-accumulated wander state for one NPC.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Wander {
    direction: MovingDirection,
    pending_seconds: f32,
}

impl Wander {
    #[cfg(test)]
    pub(crate) fn direction(&self) -> MovingDirection {
        self.direction
    }

    /// Runs one decision per whole decision interval contained in the accumulated time.
    /// Velocity only changes on a move decision, which stops the NPC when it has no direction.
    /// Returns the number of decisions taken.
    pub(crate) fn advance<R: Rng>(
        &mut self,
        dt: f32,
        tuning: &WanderTuning,
        rng: &mut R,
        velocity: &mut Vec2,
    ) -> u32 {
        let valid = dt.is_finite() && dt > 0.0 && tuning.decisions_per_second > 0.0;
        if !valid {
            return 0;
        }
        let interval = 1.0 / tuning.decisions_per_second;
        self.pending_seconds += dt;

        let mut decisions = 0;
        while self.pending_seconds >= interval {
            self.pending_seconds -= interval;
            self.decide(tuning, rng, velocity);
            decisions += 1;
        }
        decisions
    }

    fn decide<R: Rng>(&mut self, tuning: &WanderTuning, rng: &mut R, velocity: &mut Vec2) {
        self.direction = if rng.random_bool(tuning.idle_chance.clamp(0.0, 1.0)) {
            MovingDirection::None
        } else {
            MovingDirection::ALL[rng.random_range(0..MovingDirection::ALL.len())]
        };

        if rng.random_bool(tuning.move_chance.clamp(0.0, 1.0)) {
            *velocity = self.direction.velocity(tuning.speed);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn decisions_follow_elapsed_time_not_call_count() {
        let tuning = WanderTuning::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut velocity = Vec2::ZERO;

        let mut coarse = Wander::default();
        let coarse_count = coarse.advance(0.5, &tuning, &mut rng, &mut velocity);

        let mut fine = Wander::default();
        let fine_count: u32 = (0..120)
            .map(|_| fine.advance(1.0 / 240.0, &tuning, &mut rng, &mut velocity))
            .sum();

        assert!((29..=30).contains(&coarse_count), "got {coarse_count}");
        assert!((29..=30).contains(&fine_count), "got {fine_count}");
    }

    #[test]
    fn certain_move_sets_axis_aligned_velocity() {
        let tuning = WanderTuning {
            idle_chance: 0.0,
            move_chance: 1.0,
            ..WanderTuning::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut wander = Wander::default();
        let mut velocity = Vec2::ZERO;

        for _ in 0..20 {
            wander.advance(1.0 / 60.0, &tuning, &mut rng, &mut velocity);
            assert_ne!(wander.direction(), MovingDirection::None);
            let speed = velocity.x.abs() + velocity.y.abs();
            assert_eq!(speed, 200.0);
            assert!(velocity.x == 0.0 || velocity.y == 0.0);
        }
    }

    #[test]
    fn idle_move_decision_stops_the_npc() {
        let tuning = WanderTuning {
            idle_chance: 1.0,
            move_chance: 1.0,
            ..WanderTuning::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let mut wander = Wander::default();
        let mut velocity = Vec2::new(0.0, 200.0);

        wander.advance(1.0, &tuning, &mut rng, &mut velocity);
        assert_eq!(wander.direction(), MovingDirection::None);
        assert_eq!(velocity, Vec2::ZERO);
    }

    #[test]
    fn velocity_persists_between_move_decisions() {
        let tuning = WanderTuning {
            move_chance: 0.0,
            ..WanderTuning::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut wander = Wander::default();
        let mut velocity = Vec2::new(-200.0, 0.0);

        wander.advance(2.0, &tuning, &mut rng, &mut velocity);
        assert_eq!(velocity, Vec2::new(-200.0, 0.0));
    }

    #[test]
    fn zero_or_invalid_dt_takes_no_decision() {
        let tuning = WanderTuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut wander = Wander::default();
        let mut velocity = Vec2::ZERO;
        assert_eq!(wander.advance(0.0, &tuning, &mut rng, &mut velocity), 0);
        assert_eq!(wander.advance(f32::NAN, &tuning, &mut rng, &mut velocity), 0);
        assert_eq!(wander.advance(-1.0, &tuning, &mut rng, &mut velocity), 0);
    }
}
