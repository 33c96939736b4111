/*
 * Tick Statistics Module
 *
 * This module defines the TickStats struct with diagnostic counters the
 * flock refreshes on every tick, for display by the embedding layer.
 * Purely observational; nothing in the engine reads these back.
 */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    // Ticks completed since the flock was created
    pub tick: u64,
    // Candidate pairs that survived the radius test this tick
    pub pairs_in_range: usize,
    // Directed friend links recorded across all boids this tick
    pub friend_links: usize,
    // Predator entries recorded in prey lists this tick
    pub predator_sightings: usize,
}
