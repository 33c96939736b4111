/*
 * Flock Module
 *
 * This module defines the Flock struct, the simulation orchestrator. It
 * owns the boid array, the spatial grid and the master RNG, and advances
 * the whole flock one tick at a time:
 *
 * 1. Rebuild the spatial grid from current positions
 * 2. Discover neighbors (parallel pair evaluation, sequential scatter)
 * 3. Update every boid from the pre-update snapshot (parallel)
 * 4. Optionally repaint one boid's neighborhood for debugging display
 *
 * Optimized and kept deterministic by:
 * - Evaluating each candidate pair exactly once (index_a < index_b), from
 *   both viewpoints, since the cone test is directional
 * - Reading all neighbor influence from a snapshot taken before the update
 *   phase, so a tick's result is independent of thread scheduling
 * - Deriving one jitter RNG stream per boid per tick from a single seed,
 *   so even the noise does not depend on how rayon carves up the range
 */

use glam::{Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::boid::{Boid, Role, Snapshot, DEFAULT_HEADING};
use crate::params::{ConfigError, SimulationParams};
use crate::spatial_grid::SpatialGrid;
use crate::stats::TickStats;
use crate::VERTICAL_EXTENT;

// Spawned boids never start slower than this
const MIN_SPAWN_SPEED: f32 = 0.2;
// A spawn color channel above this would read as a near-pure primary
const DOMINANT_CHANNEL: f32 = 0.8;
// Mixed into per-boid jitter stream seeds to decorrelate adjacent boids
const STREAM_PRIME: u64 = 0x9e37_79b9_7f4a_7c15;

// Highlight palette for the friend-visualization pass
const HIGHLIGHT_SELF: Vec3 = Vec3::new(1.0, 0.0, 0.0);
const HIGHLIGHT_FRIEND: Vec3 = Vec3::new(0.0, 0.0, 1.0);
const HIGHLIGHT_REJECTED: Vec3 = Vec3::new(0.2, 0.2, 0.2);

// Outcome of evaluating one in-range candidate pair from both viewpoints
struct PairVerdict {
    a: usize,
    b: usize,
    a_sees_b: bool,
    b_sees_a: bool,
    a_fears_b: bool,
    b_fears_a: bool,
}

pub struct Flock {
    boids: Vec<Boid>,
    grid: SpatialGrid,
    // Horizontal half-extent of the domain; vertical extent is fixed
    aspect: f32,
    rng: SmallRng,
    stats: TickStats,
}

impl Flock {
    // Create a flock of `count` prey scattered uniformly over the domain
    pub fn new(count: usize, aspect: f32, seed: u64) -> Result<Self, ConfigError> {
        let defaults = SimulationParams::default();

        let mut flock = Self {
            boids: Vec::with_capacity(count),
            grid: SpatialGrid::new(defaults.fov_radius)?,
            aspect,
            rng: SmallRng::seed_from_u64(seed),
            stats: TickStats::default(),
        };

        for _ in 0..count {
            let position = Vec2::new(
                flock.rng.gen_range(-aspect..=aspect),
                flock.rng.gen_range(-VERTICAL_EXTENT..=VERTICAL_EXTENT),
            );
            flock.spawn(position, false);
        }

        Ok(flock)
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    // Mutable view for the embedding layer (and tests) between ticks. A
    // slice, not the Vec: the backing array must never be resized while
    // neighbor indices are live, and growth goes through `spawn`.
    pub fn boids_mut(&mut self) -> &mut [Boid] {
        &mut self.boids
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    // Append a new boid with a randomized heading and identity color.
    // Callers can only reach this between ticks (&mut self), so the boid
    // array never grows while a tick's neighbor indices are live.
    pub fn spawn(&mut self, position: Vec2, is_predator: bool) {
        let mut velocity = Vec2::new(
            self.rng.gen_range(-0.3..=0.3),
            self.rng.gen_range(-0.3..=0.3),
        );
        if velocity.length() < MIN_SPAWN_SPEED {
            velocity = velocity.normalize_or(DEFAULT_HEADING) * MIN_SPAWN_SPEED;
        }

        let mut color = Vec3::new(
            self.rng.gen_range(0.5..=1.0),
            self.rng.gen_range(0.5..=1.0),
            self.rng.gen_range(0.5..=1.0),
        );
        // A dominant channel gets the other two redrawn into a muted range
        if color.x > DOMINANT_CHANNEL {
            color.y = self.rng.gen_range(0.0..=0.5);
            color.z = self.rng.gen_range(0.0..=0.5);
        }
        if color.y > DOMINANT_CHANNEL {
            color.x = self.rng.gen_range(0.0..=0.5);
            color.z = self.rng.gen_range(0.0..=0.5);
        }
        if color.z > DOMINANT_CHANNEL {
            color.x = self.rng.gen_range(0.0..=0.5);
            color.y = self.rng.gen_range(0.0..=0.5);
        }

        let role = if is_predator {
            Role::Predator
        } else {
            Role::Prey
        };
        self.boids.push(Boid::new(position, velocity, color, role));
    }

    // Change the horizontal half-extent of the domain. Positions are left
    // alone; the boundary policy pulls strays back in on subsequent ticks.
    pub fn resize_bounds(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    // Advance the whole flock by one tick of `dt` seconds
    pub fn step(&mut self, dt: f32, params: &SimulationParams) -> Result<(), ConfigError> {
        params.validate()?;

        // A 3x3 cell scan only covers the full query disk while the cell
        // size matches the sensing radius; resize the grid when it drifts
        if (self.grid.cell_size() - params.fov_radius).abs() > f32::EPSILON {
            self.grid = SpatialGrid::new(params.fov_radius)?;
        }

        self.rebuild_grid();
        self.discover_neighbors(params);
        self.grid.clear();
        self.update_boids(dt, params);

        if params.show_friend_highlight {
            self.highlight_neighborhood(params);
        }

        self.stats.tick += 1;
        Ok(())
    }

    fn rebuild_grid(&mut self) {
        self.grid.clear();
        for (index, boid) in self.boids.iter().enumerate() {
            self.grid.insert(boid.position, index);
        }
    }

    // Neighbor discovery. Pair evaluation runs in parallel and writes
    // nothing shared; the verdicts are then applied to both members' lists
    // in a single sequential scatter, which makes observation symmetric
    // and the list contents identical regardless of worker count.
    //
    // Friendship is role-homogeneous: prey befriend prey, predators
    // befriend predators. Prey additionally record any predator within
    // radius, regardless of the cone, since a threat from behind is still
    // a threat. Prey never enter a predator's lists at all.
    fn discover_neighbors(&mut self, params: &SimulationParams) {
        for boid in &mut self.boids {
            boid.friends.clear();
            boid.predators.clear();
        }

        let radius_sq = params.fov_radius * params.fov_radius;
        let cos_half_fov = params.cos_half_fov();
        let boids = &self.boids;
        let grid = &self.grid;

        let verdicts: Vec<Vec<PairVerdict>> = (0..boids.len())
            .into_par_iter()
            .map(|a| {
                let mut local = Vec::new();

                for b in grid.nearby(boids[a].position) {
                    // Each unordered pair is evaluated exactly once, and
                    // this also drops the querying boid's own index
                    if b <= a {
                        continue;
                    }

                    let offset = boids[b].position - boids[a].position;
                    if offset.length_squared() >= radius_sq {
                        continue;
                    }

                    local.push(PairVerdict {
                        a,
                        b,
                        a_sees_b: boids[a].sees(offset, cos_half_fov),
                        b_sees_a: boids[b].sees(-offset, cos_half_fov),
                        a_fears_b: boids[a].role == Role::Prey
                            && boids[b].role == Role::Predator,
                        b_fears_a: boids[b].role == Role::Prey
                            && boids[a].role == Role::Predator,
                    });
                }

                local
            })
            .collect();

        let mut pairs_in_range = 0;
        let mut friend_links = 0;
        let mut predator_sightings = 0;

        for verdict in verdicts.into_iter().flatten() {
            pairs_in_range += 1;

            if verdict.a_fears_b {
                self.boids[verdict.a].predators.push(verdict.b);
                predator_sightings += 1;
            } else if verdict.b_fears_a {
                self.boids[verdict.b].predators.push(verdict.a);
                predator_sightings += 1;
            } else {
                // Same role on both sides; friendship goes by the cone
                if verdict.a_sees_b {
                    self.boids[verdict.a].friends.push(verdict.b);
                    friend_links += 1;
                }
                if verdict.b_sees_a {
                    self.boids[verdict.b].friends.push(verdict.a);
                    friend_links += 1;
                }
            }
        }

        self.stats.pairs_in_range = pairs_in_range;
        self.stats.friend_links = friend_links;
        self.stats.predator_sightings = predator_sightings;
    }

    // Per-boid force integration. Each boid reads only its own neighbor
    // lists and the flock-wide snapshot, and writes only itself.
    fn update_boids(&mut self, dt: f32, params: &SimulationParams) {
        let snapshot: Vec<Snapshot> = self.boids.iter().map(Boid::snapshot).collect();

        // One tick seed from the master stream; every boid derives its own
        // jitter stream from it, keyed by index
        let tick_seed: u64 = self.rng.gen();
        let aspect = self.aspect;

        self.boids
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, boid)| {
                let stream = tick_seed.wrapping_add((index as u64).wrapping_mul(STREAM_PRIME));
                let mut rng = SmallRng::seed_from_u64(stream);
                boid.update(&snapshot, params, aspect, dt, &mut rng);
            });
    }

    // Debug repaint of the designated boid's neighborhood (boid 0): itself
    // red, accepted friends blue, everything else dim gray. Runs the
    // pairwise filter read-only and touches display colors exclusively, so
    // it can never feed back into the dynamics.
    fn highlight_neighborhood(&mut self, params: &SimulationParams) {
        let Some((designated, others)) = self.boids.split_first_mut() else {
            return;
        };

        let radius_sq = params.fov_radius * params.fov_radius;
        let cos_half_fov = params.cos_half_fov();

        for other in others.iter_mut() {
            let offset = other.position - designated.position;
            let accepted = offset.length_squared() < radius_sq
                && other.role == designated.role
                && designated.sees(offset, cos_half_fov);

            other.display_color = if accepted {
                HIGHLIGHT_FRIEND
            } else {
                HIGHLIGHT_REJECTED
            };
        }

        designated.display_color = HIGHLIGHT_SELF;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;

    #[test]
    fn new_scatters_prey_over_the_domain() {
        let flock = Flock::new(100, 1.5, 7).unwrap();
        assert_eq!(flock.boids().len(), 100);

        for boid in flock.boids() {
            assert!(boid.position.x.abs() <= 1.5);
            assert!(boid.position.y.abs() <= 1.0);
            assert_eq!(boid.role, Role::Prey);
        }
    }

    #[test]
    fn spawn_floor_clamps_the_initial_speed() {
        let mut flock = Flock::new(0, 1.0, 11).unwrap();
        for _ in 0..200 {
            flock.spawn(Vec2::ZERO, false);
        }

        for boid in flock.boids() {
            assert!(boid.velocity.length() >= MIN_SPAWN_SPEED - 1e-6);
        }
    }

    #[test]
    fn spawn_never_produces_a_near_pure_primary() {
        let mut flock = Flock::new(0, 1.0, 13).unwrap();
        for _ in 0..500 {
            flock.spawn(Vec2::ZERO, false);
        }

        for boid in flock.boids() {
            let c = boid.base_color;
            for (dominant, rest) in [
                (c.x, [c.y, c.z]),
                (c.y, [c.x, c.z]),
                (c.z, [c.x, c.y]),
            ] {
                if dominant > DOMINANT_CHANNEL {
                    assert!(rest.iter().all(|&v| v <= 0.5));
                }
            }
        }
    }

    #[test]
    fn spawn_assigns_the_requested_role() {
        let mut flock = Flock::new(0, 1.0, 17).unwrap();
        flock.spawn(Vec2::ZERO, true);
        flock.spawn(Vec2::ZERO, false);

        assert_eq!(flock.boids()[0].role, Role::Predator);
        assert_eq!(flock.boids()[1].role, Role::Prey);
    }

    #[test]
    fn step_rejects_invalid_config_before_touching_state() {
        let mut flock = Flock::new(5, 1.0, 19).unwrap();
        let positions: Vec<Vec2> = flock.boids().iter().map(|b| b.position).collect();

        let bad = SimulationParams {
            min_speed: 1.0,
            max_speed: 0.1,
            ..Default::default()
        };
        assert!(flock.step(0.016, &bad).is_err());

        let after: Vec<Vec2> = flock.boids().iter().map(|b| b.position).collect();
        assert_eq!(positions, after);
        assert_eq!(flock.stats().tick, 0);
    }

    #[test]
    fn grid_cell_size_tracks_the_sensing_radius() {
        let mut flock = Flock::new(10, 1.0, 23).unwrap();

        let params = SimulationParams {
            fov_radius: 0.12,
            ..Default::default()
        };
        flock.step(0.016, &params).unwrap();
        assert_eq!(flock.grid.cell_size(), 0.12);
    }

    #[test]
    fn predators_never_record_prey() {
        let mut flock = Flock::new(0, 1.0, 29).unwrap();
        flock.spawn(vec2(0.0, 0.0), true);
        flock.spawn(vec2(0.05, 0.0), false);

        let params = SimulationParams {
            fov: std::f32::consts::TAU,
            jitter_strength: 0.0,
            ..Default::default()
        };
        flock.step(0.016, &params).unwrap();

        let predator = &flock.boids()[0];
        assert!(predator.friends.is_empty());
        assert!(predator.predators.is_empty());

        // The prey saw the predator, omnidirectionally
        let prey = &flock.boids()[1];
        assert_eq!(prey.predators, vec![0]);
        assert!(prey.friends.is_empty());
    }

    #[test]
    fn predators_flock_with_each_other() {
        let mut flock = Flock::new(0, 1.0, 31).unwrap();
        flock.spawn(vec2(0.0, 0.0), true);
        flock.spawn(vec2(0.05, 0.0), true);

        let params = SimulationParams {
            fov: std::f32::consts::TAU,
            jitter_strength: 0.0,
            ..Default::default()
        };
        flock.step(0.016, &params).unwrap();

        assert_eq!(flock.boids()[0].friends, vec![1]);
        assert_eq!(flock.boids()[1].friends, vec![0]);
    }

    #[test]
    fn highlight_paints_display_colors_only() {
        let mut flock = Flock::new(0, 1.0, 37).unwrap();
        flock.spawn(vec2(0.0, 0.0), false);
        flock.spawn(vec2(0.05, 0.0), false);
        flock.spawn(vec2(0.9, 0.9), false);

        let base_colors: Vec<_> = flock.boids().iter().map(|b| b.base_color).collect();

        let params = SimulationParams {
            fov: std::f32::consts::TAU,
            show_friend_highlight: true,
            speed_based_color: false,
            jitter_strength: 0.0,
            ..Default::default()
        };
        flock.step(0.016, &params).unwrap();

        assert_eq!(flock.boids()[0].display_color, HIGHLIGHT_SELF);
        assert_eq!(flock.boids()[1].display_color, HIGHLIGHT_FRIEND);
        assert_eq!(flock.boids()[2].display_color, HIGHLIGHT_REJECTED);

        // Identity colors drift only through the normal blend, which the
        // highlight pass must not add to; boid 2 is isolated so its base
        // color is untouched entirely
        assert_eq!(flock.boids()[2].base_color, base_colors[2]);
    }

    #[test]
    fn stats_reflect_the_last_tick() {
        let mut flock = Flock::new(0, 1.0, 41).unwrap();
        flock.spawn(vec2(0.0, 0.0), false);
        flock.spawn(vec2(0.05, 0.0), false);
        flock.spawn(vec2(0.9, -0.9), false);

        let params = SimulationParams {
            fov: std::f32::consts::TAU,
            jitter_strength: 0.0,
            ..Default::default()
        };
        flock.step(0.016, &params).unwrap();

        let stats = flock.stats();
        assert_eq!(stats.tick, 1);
        assert_eq!(stats.pairs_in_range, 1);
        assert_eq!(stats.friend_links, 2);
        assert_eq!(stats.predator_sightings, 0);
    }
}
