/*
 * Boid Flocking Engine - Module Definitions
 *
 * This file defines the module structure for the flocking engine. The crate
 * is headless: it owns the agents, the spatial grid and the per-tick update
 * rule, while rendering, input handling and GUI live in the embedding layer,
 * which reads positions/rotations/colors between ticks and feeds tunable
 * parameters back in.
 */

// Re-export key components for easier access
pub use boid::{Boid, Role};
pub use flock::Flock;
pub use params::{ConfigError, SimulationParams};
pub use spatial_grid::SpatialGrid;
pub use stats::TickStats;

// Define modules
pub mod boid;
pub mod flock;
pub mod params;
pub mod spatial_grid;
pub mod stats;

// Constants
//
// The simulated domain is [-aspect, aspect] horizontally, where aspect is
// supplied by the caller and may change at runtime, and a fixed vertical
// extent of +/-1.
pub const VERTICAL_EXTENT: f32 = 1.0;
// Boids wrapping across an edge reappear this far beyond the opposite one.
pub const WRAP_MARGIN: f32 = 0.1;
