/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that contains all the
 * adjustable parameters for one tick of the simulation, supplied by the
 * embedding layer (typically a GUI) on every call to `Flock::step`. It also
 * defines the configuration errors reported when a caller hands the engine
 * values the update rule cannot correct for.
 */

use glam::Vec2;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid cell size must be positive, got {0}")]
    InvalidCellSize(f32),
    #[error("field-of-view radius must be positive, got {0}")]
    InvalidFovRadius(f32),
    #[error("max speed {max} must not be below min speed {min}")]
    InvertedSpeedBounds { min: f32, max: f32 },
    #[error("min speed must be non-negative, got {0}")]
    NegativeMinSpeed(f32),
    #[error("jitter strength must be non-negative, got {0}")]
    NegativeJitter(f32),
}

// Parameters for the simulation that can be adjusted via the embedding UI
#[derive(Clone, Debug)]
pub struct SimulationParams {
    pub alignment_strength: f32,
    pub cohesion_strength: f32,
    pub separation_strength: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    // Full viewing angle in radians; the cone test uses cos(fov / 2)
    pub fov: f32,
    // Sensing radius; the spatial grid's cell size tracks this value
    pub fov_radius: f32,
    // Per-axis amplitude of the once-per-tick velocity noise
    pub jitter_strength: f32,
    // Reflect off hard edges before the margin wrap runs
    pub bounce: bool,
    pub speed_based_color: bool,
    pub attract: bool,
    pub attract_point: Vec2,
    pub repel: bool,
    pub repel_point: Vec2,
    // Repaint one designated boid's neighborhood for debugging display
    pub show_friend_highlight: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            alignment_strength: 2.0,
            cohesion_strength: 3.0,
            separation_strength: 1.0,
            min_speed: 0.2,
            max_speed: 0.5,
            fov: 3.65, // wide forward cone, a bit over 200 degrees
            fov_radius: 0.3,
            jitter_strength: 0.03,
            bounce: true,
            speed_based_color: false,
            attract: false,
            attract_point: Vec2::ZERO,
            repel: false,
            repel_point: Vec2::ZERO,
            show_friend_highlight: false,
        }
    }
}

impl SimulationParams {
    // Reject values the update rule cannot correct for; called on every
    // entry into `Flock::step` before any state is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_radius > 0.0) {
            return Err(ConfigError::InvalidFovRadius(self.fov_radius));
        }
        if self.min_speed < 0.0 {
            return Err(ConfigError::NegativeMinSpeed(self.min_speed));
        }
        if self.max_speed < self.min_speed {
            return Err(ConfigError::InvertedSpeedBounds {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        if self.jitter_strength < 0.0 {
            return Err(ConfigError::NegativeJitter(self.jitter_strength));
        }
        Ok(())
    }

    // Cosine of the half-angle of the field of view; candidates whose
    // bearing scores at or above this pass the cone test
    pub fn cos_half_fov(&self) -> f32 {
        (self.fov * 0.5).cos()
    }

    // Get parameter ranges for UI sliders
    pub fn get_strength_range() -> std::ops::RangeInclusive<f32> {
        0.0..=10.0
    }

    pub fn get_speed_range() -> std::ops::RangeInclusive<f32> {
        0.0..=2.0
    }

    pub fn get_fov_range() -> std::ops::RangeInclusive<f32> {
        0.0..=std::f32::consts::TAU
    }

    pub fn get_fov_radius_range() -> std::ops::RangeInclusive<f32> {
        0.01..=1.0
    }
}
