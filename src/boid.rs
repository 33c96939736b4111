/*
 * Boid Module
 *
 * This module defines the Boid struct and its per-tick behavior.
 * Each boid follows three main rules:
 * 1. Separation: Avoid crowding neighbors
 * 2. Alignment: Steer towards the average heading of neighbors
 * 3. Cohesion: Steer towards the average position of neighbors
 *
 * Prey additionally flee any predator sighted within sensing radius, and
 * every boid gets a small random velocity jitter each tick so flocks never
 * settle into a perfectly static equilibrium.
 */

use glam::{Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::Rng;

use crate::params::SimulationParams;
use crate::{VERTICAL_EXTENT, WRAP_MARGIN};

// Avoidance pressure predators exert on prey; internal, not caller-tunable
const PREDATOR_AVOIDANCE_STRENGTH: f32 = 0.1;
// Softening added to distances before taking a reciprocal
const DIST_EPSILON: f32 = 1e-6;
// Magnitude of the attraction/repulsion point force
const POINT_FORCE_STRENGTH: f32 = 5.3;
// Below this distance a point force has no usable direction
const POINT_FORCE_DEADZONE: f32 = 0.01;
// Fraction of the neighbor-average color folded into the base color per tick
const COLOR_BLEND_FACTOR: f32 = 0.05;
// Substitute heading for a velocity that degenerated to zero length
pub(crate) const DEFAULT_HEADING: Vec2 = Vec2::new(1.0, 0.0);

// Gradient endpoints for speed-based coloring
const SLOW_COLOR: Vec3 = Vec3::new(0.25, 0.15, 0.60);
const FAST_COLOR: Vec3 = Vec3::new(0.60, 0.60, 1.70);
const PREDATOR_COLOR: Vec3 = Vec3::ONE;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    Prey,
    Predator,
}

// Pre-update state of one boid, captured once per tick so the parallel
// update phase never reads a neighbor's half-updated values.
#[derive(Clone, Copy)]
pub struct Snapshot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: Vec3,
}

#[derive(Clone, Debug)]
pub struct Boid {
    pub position: Vec2,
    pub velocity: Vec2,
    // Identity color, slowly pulled toward the neighborhood average
    pub base_color: Vec3,
    // What the renderer shows; derived, never feeds back into dynamics
    pub display_color: Vec3,
    pub role: Role,
    // Indices into the flock's boid array, rebuilt by the discovery pass
    // every tick; never valid across ticks
    pub friends: Vec<usize>,
    pub predators: Vec<usize>,
}

impl Boid {
    pub fn new(position: Vec2, velocity: Vec2, color: Vec3, role: Role) -> Self {
        Self {
            position,
            velocity,
            base_color: color,
            display_color: color,
            role,
            friends: Vec::new(),
            predators: Vec::new(),
        }
    }

    pub fn is_predator(&self) -> bool {
        self.role == Role::Predator
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            position: self.position,
            velocity: self.velocity,
            color: self.base_color,
        }
    }

    // Screen-space heading angle with inverted Y, for instanced rendering
    pub fn rotation(&self) -> f32 {
        let heading = self.velocity.normalize_or(DEFAULT_HEADING);
        (-heading.y).atan2(heading.x)
    }

    // Directional half of the neighbor filter: is a candidate at `to_other`
    // (relative to this boid) inside the forward field-of-view cone? The
    // cone passes at high cosine; coincident positions have no bearing and
    // never pass.
    pub fn sees(&self, to_other: Vec2, cos_half_fov: f32) -> bool {
        let heading = self.velocity.normalize_or(DEFAULT_HEADING);
        match to_other.try_normalize() {
            Some(bearing) => heading.dot(bearing) >= cos_half_fov,
            None => false,
        }
    }

    // Advance this boid by one tick. Neighbor influence is read exclusively
    // from `snapshot`, the flock-wide pre-update state. Stage order matters:
    // flocking forces, predator avoidance, color, jitter, speed clamp,
    // point forces, integration, boundaries.
    pub fn update(
        &mut self,
        snapshot: &[Snapshot],
        params: &SimulationParams,
        aspect: f32,
        dt: f32,
        rng: &mut SmallRng,
    ) {
        let had_neighbors = !self.friends.is_empty() || !self.predators.is_empty();
        let mut blended_color = Vec3::ZERO;

        if !self.friends.is_empty() {
            let mut alignment = Vec2::ZERO;
            let mut cohesion = Vec2::ZERO;
            let mut separation = Vec2::ZERO;

            for &friend in &self.friends {
                let other = &snapshot[friend];

                alignment += other.velocity.normalize_or(DEFAULT_HEADING);

                cohesion += other.position;

                // Unit vector away from the neighbor, weighted by 1/distance
                let diff = self.position - other.position;
                separation += diff.normalize_or_zero() / (diff.length() + DIST_EPSILON);

                blended_color += other.color;
            }

            let count = self.friends.len() as f32;
            blended_color /= count;

            alignment /= count;
            self.velocity += alignment * params.alignment_strength * dt;

            let mut cohesion = cohesion / count - self.position;
            // Predators converge on their pack mates harder, chasing as a group
            if self.is_predator() {
                cohesion *= 2.0;
            }
            self.velocity += cohesion * params.cohesion_strength * dt;

            self.velocity += separation * params.separation_strength * dt;
        }

        if !self.predators.is_empty() && !self.is_predator() {
            let mut run_away = Vec2::ZERO;

            for &predator in &self.predators {
                let to_predator = snapshot[predator].position - self.position;
                let strength =
                    PREDATOR_AVOIDANCE_STRENGTH / (to_predator.length_squared() + 0.01);
                run_away -= to_predator.normalize_or_zero() * strength;
            }

            self.velocity += run_away * dt;
        }

        match self.role {
            Role::Predator => self.display_color = PREDATOR_COLOR,
            Role::Prey if params.speed_based_color => {
                self.display_color =
                    speed_color(self.velocity.length(), params.min_speed, params.max_speed);
            }
            Role::Prey => {
                if !self.friends.is_empty() {
                    self.base_color = self.base_color.lerp(blended_color, COLOR_BLEND_FACTOR);
                }
                self.display_color = self.base_color;
            }
        }

        // Once per tick, deliberately not scaled by dt
        if params.jitter_strength > 0.0 {
            let jitter = Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
            self.velocity += jitter * params.jitter_strength;
        }

        // An isolated boid is exempt from the clamp; it only ever coasts
        // under external forces and boundary handling
        if had_neighbors {
            self.limit_speed(params.min_speed, params.max_speed);
        }

        if params.attract {
            self.add_point_force(POINT_FORCE_STRENGTH, params.attract_point, dt);
        }
        if params.repel {
            self.add_point_force(-POINT_FORCE_STRENGTH, params.repel_point, dt);
        }

        self.position += self.velocity * dt;

        if params.bounce {
            self.bounce_boundaries(aspect);
        }
        self.wrap_boundaries(aspect);
    }

    // Clamp speed into [min_speed, max_speed]. A zero-length velocity cannot
    // be rescaled; it gets the default heading instead.
    pub fn limit_speed(&mut self, min_speed: f32, max_speed: f32) {
        let current_speed = self.velocity.length();

        if current_speed > max_speed {
            self.velocity = self.velocity.normalize_or(DEFAULT_HEADING) * max_speed;
        } else if current_speed < min_speed {
            self.velocity = self.velocity.normalize_or(DEFAULT_HEADING) * min_speed;
        }
    }

    // Impulse toward (positive strength) or away from (negative strength) a
    // point, decaying exponentially with distance. Skipped when the point
    // sits on top of the boid, where the direction is singular.
    pub fn add_point_force(&mut self, strength: f32, point: Vec2, dt: f32) {
        let to_point = point - self.position;
        let distance = to_point.length();

        if distance > POINT_FORCE_DEADZONE {
            let force = strength * (-distance * 2.0).exp();
            self.velocity += to_point / distance * force * dt;
        }
    }

    // Reflect off the hard edges: clamp to the edge and flip the crossed
    // velocity component
    pub fn bounce_boundaries(&mut self, aspect: f32) {
        if self.position.x >= aspect {
            self.position.x = aspect;
            self.velocity.x *= -1.0;
        } else if self.position.x <= -aspect {
            self.position.x = -aspect;
            self.velocity.x *= -1.0;
        }

        if self.position.y >= VERTICAL_EXTENT {
            self.position.y = VERTICAL_EXTENT;
            self.velocity.y *= -1.0;
        } else if self.position.y <= -VERTICAL_EXTENT {
            self.position.y = -VERTICAL_EXTENT;
            self.velocity.y *= -1.0;
        }
    }

    // Teleport across the domain once a boid passes the wrap margin. Always
    // runs, even with bouncing on, as a safety net for edge literals.
    pub fn wrap_boundaries(&mut self, aspect: f32) {
        if self.position.x > aspect + WRAP_MARGIN {
            self.position.x = -aspect - WRAP_MARGIN;
        } else if self.position.x < -aspect - WRAP_MARGIN {
            self.position.x = aspect + WRAP_MARGIN;
        }

        if self.position.y > VERTICAL_EXTENT + WRAP_MARGIN {
            self.position.y = -VERTICAL_EXTENT - WRAP_MARGIN;
        } else if self.position.y < -VERTICAL_EXTENT - WRAP_MARGIN {
            self.position.y = VERTICAL_EXTENT + WRAP_MARGIN;
        }
    }
}

// Two-point gradient from the slow to the fast color over the usable part
// of the speed range
pub fn speed_color(speed: f32, min_speed: f32, max_speed: f32) -> Vec3 {
    let normalized =
        ((speed - min_speed * 1.5) / (max_speed - min_speed * 1.5)).clamp(0.0, 1.0);
    SLOW_COLOR.lerp(FAST_COLOR, normalized)
}
