use serde::{Deserialize, Serialize};
use std::path::Path;

/// Node placement tunables (force relaxation, snapping, alignment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Target rest length of the spring between connected nodes.
    pub link_distance: f32,
    /// Many-body repulsion strength (inverse-square falloff).
    pub repulsion_strength: f32,
    /// Pull of every node toward the viewport center.
    pub center_strength: f32,
    /// Extra centroid attraction per unit of node degree.
    pub degree_attraction: f32,
    /// Hard cap on relaxation iterations.
    pub max_iterations: usize,
    /// Relaxation stops early once the largest per-node displacement in an
    /// iteration falls below this.
    pub convergence_eps: f32,
    /// Initial step scale; decays geometrically each iteration.
    pub initial_step: f32,
    /// Per-iteration decay applied to the step scale.
    pub step_decay: f32,
    /// Coordinates are quantized to multiples of this after relaxation.
    pub snap_unit: f32,
    /// Coordinates closer than this on one axis collapse to a shared
    /// row/column.
    pub align_tolerance: f32,
    /// Rest-length multiplier applied to a crowded node pair per relief pass.
    pub crowding_growth: f32,
    /// Maximum placement/routing re-runs triggered by crowding relief.
    pub max_relief_passes: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            link_distance: 110.0,
            repulsion_strength: 5200.0,
            center_strength: 0.02,
            degree_attraction: 0.012,
            max_iterations: 300,
            convergence_eps: 0.05,
            initial_step: 0.85,
            step_decay: 0.99,
            snap_unit: 20.0,
            align_tolerance: 12.0,
            crowding_growth: 1.35,
            max_relief_passes: 2,
        }
    }
}

/// Edge routing tunables (candidate arcs and penalty weights).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Perpendicular offset of the low-arc Bezier control points.
    pub low_arc_height: f32,
    /// Perpendicular offset of the high-arc Bezier control points.
    pub high_arc_height: f32,
    /// Flat cost per intersection with another node or routed edge.
    pub intersection_penalty: f32,
    /// Clearance below which the proximity penalty starts accruing.
    pub clearance_threshold: f32,
    /// Weight of the proximity penalty at zero clearance.
    pub proximity_penalty: f32,
    /// Flat cost added to every non-straight candidate.
    pub curvature_penalty: f32,
    /// Subtracted when a candidate mirrors its partner edge's chosen path.
    pub symmetry_bonus: f32,
    /// Scores above this are routed anyway but reported via diagnostics.
    pub acceptable_score: f32,
    /// Radius used when testing edge paths against node discs.
    pub node_clearance_radius: f32,
    /// Samples per Bezier when flattening a curve for intersection tests.
    pub curve_samples: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            low_arc_height: 28.0,
            high_arc_height: 56.0,
            intersection_penalty: 40.0,
            clearance_threshold: 18.0,
            proximity_penalty: 14.0,
            curvature_penalty: 6.0,
            symmetry_bonus: 8.0,
            acceptable_score: 80.0,
            node_clearance_radius: 14.0,
            curve_samples: 16,
        }
    }
}

/// Label placement tunables (box estimation and candidate offsets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Estimated glyph advance; label box width = chars × this.
    pub char_width: f32,
    /// Estimated label box height.
    pub line_height: f32,
    /// Radius of the disc reserved around each node center.
    pub node_radius: f32,
    /// Side of the square reserved around an edge's label anchor.
    pub edge_box_size: f32,
    /// Gap between a label box and its owning element.
    pub offset: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            char_width: 7.2,
            line_height: 14.0,
            node_radius: 6.0,
            edge_box_size: 24.0,
            offset: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Target viewport the finished layout is centered in.
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Margin added around the content bounding box in the output extents.
    pub viewport_margin: f32,
    pub placement: PlacementConfig,
    pub routing: RoutingConfig,
    pub label: LabelConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800.0,
            viewport_height: 600.0,
            viewport_margin: 40.0,
            placement: PlacementConfig::default(),
            routing: RoutingConfig::default(),
            label: LabelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    viewport_width: Option<f32>,
    viewport_height: Option<f32>,
    viewport_margin: Option<f32>,
    placement: Option<PlacementConfigFile>,
    routing: Option<RoutingConfigFile>,
    label: Option<LabelConfigFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacementConfigFile {
    link_distance: Option<f32>,
    repulsion_strength: Option<f32>,
    center_strength: Option<f32>,
    degree_attraction: Option<f32>,
    max_iterations: Option<usize>,
    convergence_eps: Option<f32>,
    initial_step: Option<f32>,
    step_decay: Option<f32>,
    snap_unit: Option<f32>,
    align_tolerance: Option<f32>,
    crowding_growth: Option<f32>,
    max_relief_passes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    low_arc_height: Option<f32>,
    high_arc_height: Option<f32>,
    intersection_penalty: Option<f32>,
    clearance_threshold: Option<f32>,
    proximity_penalty: Option<f32>,
    curvature_penalty: Option<f32>,
    symmetry_bonus: Option<f32>,
    acceptable_score: Option<f32>,
    node_clearance_radius: Option<f32>,
    curve_samples: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelConfigFile {
    char_width: Option<f32>,
    line_height: Option<f32>,
    node_radius: Option<f32>,
    edge_box_size: Option<f32>,
    offset: Option<f32>,
}

macro_rules! apply {
    ($target:expr, $source:expr, [$($field:ident),+ $(,)?]) => {
        $(if let Some(value) = $source.$field {
            $target.$field = value;
        })+
    };
}

/// Load a [`LayoutConfig`] with optional JSON overrides.
///
/// `None` yields the defaults; a path yields the defaults with every field
/// present in the file replaced.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let mut config = LayoutConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    apply_overrides(&mut config, parsed);
    Ok(config)
}

fn apply_overrides(config: &mut LayoutConfig, parsed: ConfigFile) {
    apply!(config, parsed, [viewport_width, viewport_height, viewport_margin]);
    if let Some(placement) = parsed.placement {
        apply!(
            config.placement,
            placement,
            [
                link_distance,
                repulsion_strength,
                center_strength,
                degree_attraction,
                max_iterations,
                convergence_eps,
                initial_step,
                step_decay,
                snap_unit,
                align_tolerance,
                crowding_growth,
                max_relief_passes,
            ]
        );
    }
    if let Some(routing) = parsed.routing {
        apply!(
            config.routing,
            routing,
            [
                low_arc_height,
                high_arc_height,
                intersection_penalty,
                clearance_threshold,
                proximity_penalty,
                curvature_penalty,
                symmetry_bonus,
                acceptable_score,
                node_clearance_radius,
                curve_samples,
            ]
        );
    }
    if let Some(label) = parsed.label {
        apply!(
            config.label,
            label,
            [char_width, line_height, node_radius, edge_box_size, offset]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config.placement.max_iterations, 300);
        assert_eq!(config.routing.curve_samples, 16);
    }

    #[test]
    fn overrides_replace_only_named_fields() {
        let parsed: ConfigFile =
            serde_json::from_str(r#"{"placement": {"snapUnit": 10.0}}"#).unwrap();
        let mut config = LayoutConfig::default();
        apply_overrides(&mut config, parsed);
        assert_eq!(config.placement.snap_unit, 10.0);
        assert_eq!(config.placement.link_distance, 110.0);
    }

    #[test]
    fn every_relaxation_and_routing_tunable_is_overridable() {
        let parsed: ConfigFile = serde_json::from_str(
            r#"{
                "placement": {"initialStep": 0.5, "stepDecay": 0.9},
                "routing": {"nodeClearanceRadius": 20.0, "curveSamples": 8}
            }"#,
        )
        .unwrap();
        let mut config = LayoutConfig::default();
        apply_overrides(&mut config, parsed);
        assert_eq!(config.placement.initial_step, 0.5);
        assert_eq!(config.placement.step_decay, 0.9);
        assert_eq!(config.routing.node_clearance_radius, 20.0);
        assert_eq!(config.routing.curve_samples, 8);
    }
}
