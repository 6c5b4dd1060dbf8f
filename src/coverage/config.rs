use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{CoverageError, CoverageResult};

pub const CONFIG_PATH: &str = "assets/coverage_config.ron";

/// Which primary assignment rule runs each tick.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AssignmentAlgorithm {
    /// Nearest claimant always wins; may flip-flop as positions jitter.
    Greedy,
    /// Holders only change when the newcomer is closer by more than
    /// `reassign_threshold`.
    #[default]
    AntiThrash,
}

/// Parameters for turning a floor-plan raster into a wall layout.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct VectorizeConfig {
    /// Sub-samples per cell axis when averaging brightness.
    pub samples_per_axis: usize,
    /// Lower bound on the Otsu threshold (0..=255).
    pub min_threshold: u8,
    /// Shortest wall run kept when tracing rows/columns.
    pub min_run_cells: usize,
    /// Overlap fraction needed to join runs on neighbouring lines into a band.
    pub band_overlap: f32,
    /// Narrowest opening on a band's centre line that becomes a door.
    pub min_door_cells: usize,
    /// Widest gap bridged when joining collinear bands.
    pub max_door_cells: usize,
}

impl Default for VectorizeConfig {
    fn default() -> Self {
        Self {
            samples_per_axis: 3,
            min_threshold: 48,
            min_run_cells: 4,
            band_overlap: 0.4,
            min_door_cells: 2,
            max_door_cells: 16,
        }
    }
}

/// Engine configuration, loaded once at startup.
///
/// Changing the grid fields mid-run only takes effect on the next layout
/// rebuild; the assignment fields apply from the next tick.
#[derive(Resource, Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct CoverageConfig {
    // Assignment
    pub reassign_threshold: f32,
    pub algorithm: AssignmentAlgorithm,
    pub tertiary_enabled: bool,
    pub stale_target_ttl: f64,
    pub history_len: usize,

    // Grid
    pub cell_size: f32,
    pub map_width: f32,
    pub map_height: f32,
    /// In cells, measured from each end of a door segment.
    pub door_edge_buffer: f32,

    // Search
    /// Extra cost per change of heading, as a fraction of one cell.
    pub turn_penalty: f32,
    pub snap_radius: usize,
    pub max_expansions: usize,
    pub potential_cache_capacity: usize,

    pub vectorize: VectorizeConfig,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            reassign_threshold: 2.5,
            algorithm: AssignmentAlgorithm::AntiThrash,
            tertiary_enabled: true,
            stale_target_ttl: 5.0,
            history_len: 32,
            cell_size: 0.25,
            map_width: 12.0,
            map_height: 10.0,
            door_edge_buffer: 1.0,
            turn_penalty: 0.05,
            snap_radius: 6,
            max_expansions: 200_000,
            potential_cache_capacity: 64,
            vectorize: VectorizeConfig::default(),
        }
    }
}

impl CoverageConfig {
    pub fn from_ron_str(contents: &str) -> CoverageResult<Self> {
        let config = ron::from_str::<CoverageConfig>(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would size the grid absurdly or silently change
    /// semantics (a NaN threshold disables hysteresis).
    pub fn validate(&self) -> CoverageResult<()> {
        let positive = [
            ("cell_size", self.cell_size),
            ("map_width", self.map_width),
            ("map_height", self.map_height),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoverageError::InvalidConfig {
                    field,
                    reason: "must be finite and positive",
                });
            }
        }

        let non_negative = [
            ("reassign_threshold", self.reassign_threshold),
            ("door_edge_buffer", self.door_edge_buffer),
            ("turn_penalty", self.turn_penalty),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CoverageError::InvalidConfig {
                    field,
                    reason: "must be finite and non-negative",
                });
            }
        }

        // Infinity is allowed: targets never go stale.
        if self.stale_target_ttl.is_nan() || self.stale_target_ttl <= 0.0 {
            return Err(CoverageError::InvalidConfig {
                field: "stale_target_ttl",
                reason: "must be positive",
            });
        }
        if !(0.0..=1.0).contains(&self.vectorize.band_overlap) {
            return Err(CoverageError::InvalidConfig {
                field: "vectorize.band_overlap",
                reason: "must lie in [0, 1]",
            });
        }
        if self.vectorize.samples_per_axis == 0 {
            return Err(CoverageError::InvalidConfig {
                field: "vectorize.samples_per_axis",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    pub fn from_file(path: impl AsRef<Path>) -> CoverageResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CoverageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&contents)
    }

    /// Threshold actually applied by the tier resolver.
    pub fn effective_threshold(&self) -> Option<f32> {
        match self.algorithm {
            AssignmentAlgorithm::Greedy => None,
            AssignmentAlgorithm::AntiThrash => Some(self.reassign_threshold),
        }
    }
}

pub struct CoverageConfigPlugin;

impl Plugin for CoverageConfigPlugin {
    fn build(&self, app: &mut App) {
        // Tests and embedders may insert their own config before the plugin.
        if !app.world().contains_resource::<CoverageConfig>() {
            app.add_systems(PreStartup, load_coverage_config);
        }
    }
}

/// Load configuration synchronously before any tick runs.
fn load_coverage_config(mut commands: Commands) {
    match CoverageConfig::from_file(CONFIG_PATH) {
        Ok(config) => {
            info!("Loaded coverage config from {}", CONFIG_PATH);
            commands.insert_resource(config);
        }
        Err(e) => {
            error!("Failed to load coverage config: {}", e);
            error!("Using default CoverageConfig");
            commands.insert_resource(CoverageConfig::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_falls_back_to_defaults() {
        let config = CoverageConfig::from_ron_str("(reassign_threshold: 1.5, algorithm: Greedy)").unwrap();
        assert_eq!(config.reassign_threshold, 1.5);
        assert_eq!(config.algorithm, AssignmentAlgorithm::Greedy);
        assert_eq!(config.effective_threshold(), None);
        assert_eq!(config.snap_radius, CoverageConfig::default().snap_radius);
    }

    #[test]
    fn malformed_ron_is_an_error() {
        assert!(matches!(
            CoverageConfig::from_ron_str("(reassign_threshold: \"far\")"),
            Err(CoverageError::Config(_))
        ));
    }

    #[test]
    fn degenerate_values_are_rejected() {
        for text in [
            "(cell_size: 0.0)",
            "(cell_size: -1.0)",
            "(map_width: inf)",
            "(reassign_threshold: NaN)",
            "(turn_penalty: -0.1)",
            "(stale_target_ttl: 0.0)",
            "(vectorize: (band_overlap: 1.5))",
        ] {
            assert!(
                matches!(CoverageConfig::from_ron_str(text), Err(CoverageError::InvalidConfig { .. })),
                "{text} should be rejected"
            );
        }
        assert!(CoverageConfig::default().validate().is_ok());
        assert!(CoverageConfig::from_ron_str("(stale_target_ttl: inf)").is_ok());
    }

    #[test]
    fn shipped_config_file_parses() {
        let config = CoverageConfig::from_file(CONFIG_PATH).unwrap();
        assert_eq!(config.algorithm, AssignmentAlgorithm::AntiThrash);
        assert_eq!(config.vectorize.min_threshold, 48);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = CoverageConfig::from_file("assets/does_not_exist.ron").unwrap_err();
        assert!(err.to_string().contains("does_not_exist.ron"));
    }
}
