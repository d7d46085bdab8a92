//! Simulation configuration, read once when the physics world is created.

use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

use super::proxy::Interaction;

/// What the pipeline does with a pair whose bounding spheres touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PairKind {
    /// Never tested.
    Ignore,
    /// Contacts are generated and solved.
    Physics,
    /// Contacts are generated and reported but never solved.
    Trigger,
}

/// Symmetric lookup table keyed by the interaction of both proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InteractionMatrix {
    table: [[PairKind; 3]; 3],
}

impl InteractionMatrix {
    /// Matrix that ignores every pair.
    pub fn ignore_all() -> Self {
        Self {
            table: [[PairKind::Ignore; 3]; 3],
        }
    }

    /// Classify a pair. Argument order does not matter.
    #[inline]
    pub fn classify(&self, a: Interaction, b: Interaction) -> PairKind {
        self.table[a.index()][b.index()]
    }

    /// Set the response for a pair in both orders.
    pub fn set(&mut self, a: Interaction, b: Interaction, kind: PairKind) {
        self.table[a.index()][b.index()] = kind;
        self.table[b.index()][a.index()] = kind;
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, a: Interaction, b: Interaction, kind: PairKind) -> Self {
        self.set(a, b, kind);
        self
    }

    fn is_symmetric(&self) -> bool {
        (0..3).all(|i| (0..3).all(|j| self.table[i][j] == self.table[j][i]))
    }
}

impl Default for InteractionMatrix {
    fn default() -> Self {
        Self::ignore_all()
            .with(Interaction::Solid, Interaction::Solid, PairKind::Physics)
            .with(Interaction::Solid, Interaction::Trigger, PairKind::Trigger)
    }
}

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 4.
    pub max_substeps: u32,
    /// Number of sequential-impulse passes. Default: 5.
    pub solver_iterations: u32,
    /// Linear plus angular speed below which a body counts as resting. Default: 0.05.
    pub sleep_epsilon: f32,
    /// Consecutive resting steps before a body sleeps; 0 disables sleeping. Default: 60.
    pub sleep_frames: u32,
    /// Seed constraints with last step's impulses. Default: true.
    pub warm_start: bool,
    /// Scale applied to warm-start impulses. Default: 0.75.
    pub warm_start_factor: f32,
    /// Baumgarte stabilization factor. Default: 0.3.
    pub baumgarte: f32,
    /// Penetration allowed before the bias kicks in. Default: 0.005.
    pub penetration_slop: f32,
    /// EPA iteration cap. Default: 32.
    pub epa_max_iterations: u32,
    /// EPA convergence tolerance. Default: 1e-5.
    pub epa_tolerance: f32,
    /// Meshes a static partition leaf holds before splitting. Default: 3.
    pub partition_leaf_capacity: usize,
    /// Maximum static partition node count. Default: 15.
    pub partition_max_nodes: usize,
    /// Linear speed clamp applied at integration. Default: 100.
    pub max_linear_speed: f32,
    /// Skip broad-phase pairs without an awake movable body. Default: true.
    pub skip_inactive_pairs: bool,
    /// Pair classification table.
    pub interactions: InteractionMatrix,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            solver_iterations: 5,
            sleep_epsilon: 0.05,
            sleep_frames: 60,
            warm_start: true,
            warm_start_factor: 0.75,
            baumgarte: 0.3,
            penetration_slop: 0.005,
            epa_max_iterations: 32,
            epa_tolerance: 1e-5,
            partition_leaf_capacity: 3,
            partition_max_nodes: 15,
            max_linear_speed: 100.0,
            skip_inactive_pairs: true,
            interactions: InteractionMatrix::default(),
        }
    }
}

impl PhysicsConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let invalid = |msg: &str| Err(PhysicsError::InvalidConfig(msg.to_string()));

        if !self.gravity.is_finite() {
            return invalid("gravity must be finite");
        }
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return invalid("fixed_timestep must be positive");
        }
        if self.max_substeps == 0 {
            return invalid("max_substeps must be at least 1");
        }
        if self.solver_iterations == 0 {
            return invalid("solver_iterations must be at least 1");
        }
        if !(self.sleep_epsilon >= 0.0) {
            return invalid("sleep_epsilon must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.warm_start_factor) {
            return invalid("warm_start_factor must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.baumgarte) {
            return invalid("baumgarte must be within [0, 1]");
        }
        if !(self.penetration_slop >= 0.0) {
            return invalid("penetration_slop must be non-negative");
        }
        if self.epa_max_iterations == 0 {
            return invalid("epa_max_iterations must be at least 1");
        }
        if !(self.epa_tolerance > 0.0) {
            return invalid("epa_tolerance must be positive");
        }
        if self.partition_leaf_capacity == 0 {
            return invalid("partition_leaf_capacity must be at least 1");
        }
        if self.partition_max_nodes == 0 || self.partition_max_nodes % 2 == 0 {
            return invalid("partition_max_nodes must be odd (root plus child pairs)");
        }
        if !(self.max_linear_speed > 0.0) {
            return invalid("max_linear_speed must be positive");
        }
        if !self.interactions.is_symmetric() {
            return invalid("interaction matrix must be symmetric");
        }
        Ok(())
    }

    /// Parse a TOML document. Missing keys fall back to their defaults.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let config: Self = toml::from_str(source).context("Failed to parse physics config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        tracing::info!("Loading physics config from {:?}", path);

        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read physics config {:?}", path))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("Failed to load physics config from {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_config_default() {
        let config = PhysicsConfig::default();
        assert_eq!(config.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert!((config.fixed_timestep - 1.0 / 60.0).abs() < 1e-10);
        assert_eq!(config.max_substeps, 4);
        assert_eq!(config.solver_iterations, 5);
        assert_eq!(config.epa_max_iterations, 32);
        assert_eq!(config.partition_leaf_capacity, 3);
        assert_eq!(config.partition_max_nodes, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_interaction_matrix() {
        let m = InteractionMatrix::default();
        assert_eq!(m.classify(Interaction::Solid, Interaction::Solid), PairKind::Physics);
        assert_eq!(m.classify(Interaction::Solid, Interaction::Trigger), PairKind::Trigger);
        assert_eq!(m.classify(Interaction::Trigger, Interaction::Solid), PairKind::Trigger);
        assert_eq!(m.classify(Interaction::Trigger, Interaction::Trigger), PairKind::Ignore);
        assert_eq!(m.classify(Interaction::None, Interaction::Solid), PairKind::Ignore);
        assert_eq!(m.classify(Interaction::None, Interaction::None), PairKind::Ignore);
    }

    #[test]
    fn test_matrix_set_is_symmetric() {
        let m = InteractionMatrix::ignore_all().with(
            Interaction::Trigger,
            Interaction::None,
            PairKind::Trigger,
        );
        assert_eq!(m.classify(Interaction::None, Interaction::Trigger), PairKind::Trigger);
        assert!(m.is_symmetric());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = PhysicsConfig {
            solver_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PhysicsError::InvalidConfig(_))));

        let config = PhysicsConfig {
            warm_start_factor: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PhysicsConfig {
            partition_max_nodes: 14,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_toml_str_partial() {
        let config = PhysicsConfig::from_toml_str(
            r#"
            gravity = [0.0, -1.62, 0.0]
            solver_iterations = 10
            warm_start = false
            "#,
        )
        .unwrap();
        assert!((config.gravity.y + 1.62).abs() < 1e-6);
        assert_eq!(config.solver_iterations, 10);
        assert!(!config.warm_start);
        assert_eq!(config.sleep_frames, 60);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_toml_str_rejects_invalid() {
        assert!(PhysicsConfig::from_toml_str("max_substeps = 0").is_err());
        assert!(PhysicsConfig::from_toml_str("gravity = \"down\"").is_err());
    }
}
