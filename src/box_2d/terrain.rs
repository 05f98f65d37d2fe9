//! Procedural ground profiles with a landing platform.

use std::f32::consts::PI;

use super::physics::{Body, BodyTag, PhysicsWorld};
use super::{EnvRng, H, W};
use crate::error::LanderError;

const GROUND_FRICTION: f32 = 0.1;

/// The platform spans roughly `1 / PLATFORM_WIDTH_DIVISOR` of the nodes.
pub const PLATFORM_WIDTH_DIVISOR: usize = 6;
/// Largest platform tilt, in radians, either way.
pub const MAX_PLATFORM_TILT: f32 = PI / 6.0;

/// Inputs a terrain strategy is asked to honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainParams {
    pub nodes: usize,
    pub flat_platform: bool,
}

/// The landing target carved into the terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Platform {
    pub center_index: usize,
    pub half_width: usize,
    /// Horizontal bounds of the platform.
    pub x1: f32,
    pub x2: f32,
    /// Elevation at the platform center.
    pub y: f32,
    /// Tilt in radians; zero for a flat platform.
    pub angle: f32,
}

impl Platform {
    pub fn left_index(&self) -> usize {
        self.center_index - self.half_width
    }

    pub fn right_index(&self) -> usize {
        self.center_index + self.half_width
    }
}

/// A piecewise-linear ground profile. Fixed for the duration of an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Terrain {
    xs: Vec<f32>,
    heights: Vec<f32>,
    platform: Platform,
}

impl Terrain {
    pub fn xs(&self) -> &[f32] {
        &self.xs
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn platform_heights(&self) -> &[f32] {
        &self.heights[self.platform.left_index()..=self.platform.right_index()]
    }

    /// Segments joining consecutive nodes; these are the collision edges.
    pub fn edges(&self) -> Vec<((f32, f32), (f32, f32))> {
        self.xs
            .windows(2)
            .zip(self.heights.windows(2))
            .map(|(x, y)| ((x[0], y[0]), (x[1], y[1])))
            .collect()
    }

    /// Each edge closed off against the top of the viewport, for drawing the sky.
    pub fn sky_polys(&self) -> Vec<[(f32, f32); 4]> {
        self.edges()
            .into_iter()
            .map(|(p1, p2)| [p1, p2, (p2.0, H), (p1.0, H)])
            .collect()
    }

    /// Creates the static ground body: a floor edge plus every terrain edge.
    pub fn build_ground(&self, world: &mut PhysicsWorld) -> Body {
        let mut segments = vec![((0.0, 0.0), (W, 0.0))];
        segments.extend(self.edges());
        world.create_static_edges(BodyTag::Ground, &segments, GROUND_FRICTION)
    }
}

/// Strategy producing a fresh terrain every reset.
pub trait TerrainGenerator {
    fn generate(&self, params: &TerrainParams, rng: &mut EnvRng) -> Result<Terrain, LanderError>;
}

/// Evenly spaced x coordinates spanning the viewport.
fn node_xs(nodes: usize) -> Vec<f32> {
    (0..nodes)
        .map(|i| W / (nodes - 1) as f32 * i as f32)
        .collect()
}

/// Three-point moving average. `raw` carries one extra sample past the last
/// node; the first node wraps around to it for its left neighbour.
fn smooth(raw: &[f32], nodes: usize) -> Vec<f32> {
    (0..nodes)
        .map(|i| {
            let left = if i == 0 { raw[raw.len() - 1] } else { raw[i - 1] };
            0.33 * (left + raw[i] + raw[i + 1])
        })
        .collect()
}

fn random_heights(nodes: usize, rng: &mut EnvRng) -> Vec<f32> {
    (0..=nodes).map(|_| rng.random_range(0.0..H / 2.0)).collect()
}

/// Rolling terrain with an elevated boat platform in the middle that is
/// either level or tilted by up to 30 degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformTerrain;

impl PlatformTerrain {
    pub fn half_width(nodes: usize) -> usize {
        (nodes / PLATFORM_WIDTH_DIVISOR).saturating_sub(1) / 2
    }

    /// Smallest node count that leaves a platform of nonzero width.
    pub fn min_nodes() -> usize {
        3 * PLATFORM_WIDTH_DIVISOR
    }
}

impl TerrainGenerator for PlatformTerrain {
    fn generate(&self, params: &TerrainParams, rng: &mut EnvRng) -> Result<Terrain, LanderError> {
        let nodes = params.nodes;
        let half_width = Self::half_width(nodes);
        if half_width == 0 {
            return Err(LanderError::DegenerateTerrain {
                nodes,
                min: Self::min_nodes(),
            });
        }

        let raw = random_heights(nodes, rng);
        let xs = node_xs(nodes);
        let mut heights = smooth(&raw, nodes);

        let center = nodes / 2;
        let platform_y = rng.random_range(H / 2.0..H * 3.0 / 5.0);
        heights[center] = platform_y;

        let angle = if params.flat_platform {
            0.0
        } else {
            rng.random_range(-MAX_PLATFORM_TILT..MAX_PLATFORM_TILT)
        };

        let step = angle.tan() * W / (nodes - 1) as f32;
        for i in 1..=half_width {
            heights[center - i] = platform_y - step * i as f32;
            heights[center + i] = platform_y + step * i as f32;
        }

        let platform = Platform {
            center_index: center,
            half_width,
            x1: xs[center - half_width],
            x2: xs[center + half_width],
            y: platform_y,
            angle,
        };
        Ok(Terrain {
            xs,
            heights,
            platform,
        })
    }
}

/// The classic lunar-lander ground: a level helipad at a quarter of the
/// viewport height, blended into the surrounding hills by the smoothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelipadTerrain;

impl HelipadTerrain {
    pub const MIN_NODES: usize = 5;
}

impl TerrainGenerator for HelipadTerrain {
    fn generate(&self, params: &TerrainParams, rng: &mut EnvRng) -> Result<Terrain, LanderError> {
        let nodes = params.nodes;
        if nodes < Self::MIN_NODES {
            return Err(LanderError::DegenerateTerrain {
                nodes,
                min: Self::MIN_NODES,
            });
        }

        let mut raw = random_heights(nodes, rng);
        let xs = node_xs(nodes);
        let center = nodes / 2;
        let helipad_y = H / 4.0;
        for h in &mut raw[center - 2..=center + 2] {
            *h = helipad_y;
        }
        let heights = smooth(&raw, nodes);

        let platform = Platform {
            center_index: center,
            half_width: 1,
            x1: xs[center - 1],
            x2: xs[center + 1],
            y: helipad_y,
            angle: 0.0,
        };
        Ok(Terrain {
            xs,
            heights,
            platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(nodes: usize, flat_platform: bool, seed: u64) -> Terrain {
        let mut rng = EnvRng::from_seed(seed);
        PlatformTerrain
            .generate(
                &TerrainParams {
                    nodes,
                    flat_platform,
                },
                &mut rng,
            )
            .expect("terrain should generate")
    }

    #[test]
    fn nodes_are_evenly_spaced() {
        for nodes in [18, 30, 90, 200] {
            let terrain = generate(nodes, false, 1);
            let xs = terrain.xs();
            assert_eq!(xs.len(), nodes);
            assert_eq!(xs[0], 0.0);
            assert!((xs[nodes - 1] - W).abs() < 1e-4);
            let spacing = W / (nodes - 1) as f32;
            for pair in xs.windows(2) {
                assert!(pair[1] > pair[0]);
                assert!((pair[1] - pair[0] - spacing).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn platform_elevation_in_range() {
        for seed in 0..50 {
            let terrain = generate(90, seed % 2 == 0, seed);
            let y = terrain.platform().y;
            assert!((H / 2.0..=H * 3.0 / 5.0).contains(&y), "platform at {}", y);
            assert_eq!(terrain.heights()[45], y);
        }
    }

    #[test]
    fn flat_platform_is_level() {
        let terrain = generate(30, true, 42);
        let platform = *terrain.platform();
        assert_eq!(platform.angle, 0.0);
        assert_eq!(platform.half_width, 2);
        assert_eq!(platform.left_index(), 13);
        assert_eq!(platform.right_index(), 17);
        assert!(terrain.platform_heights().iter().all(|&h| h == platform.y));
        assert_eq!(platform.x1, terrain.xs()[13]);
        assert_eq!(platform.x2, terrain.xs()[17]);
    }

    #[test]
    fn tilted_platform_is_a_straight_line() {
        let terrain = generate(30, false, 42);
        let platform = *terrain.platform();
        assert!(platform.angle != 0.0);
        assert!(platform.angle.abs() <= MAX_PLATFORM_TILT);

        let spacing = W / 29.0;
        let delta = platform.angle.tan() * spacing;
        assert!(delta.abs() <= MAX_PLATFORM_TILT.tan() * spacing + 1e-6);

        let heights = terrain.platform_heights();
        for pair in heights.windows(2) {
            let rise = pair[1] - pair[0];
            assert!((rise - delta).abs() < 1e-4);
            if delta > 0.0 {
                assert!(pair[1] > pair[0]);
            } else {
                assert!(pair[1] < pair[0]);
            }
        }
    }

    #[test]
    fn smoothing_averages_neighbours_outside_the_platform() {
        let mut rng = EnvRng::from_seed(7);
        let raw = random_heights(30, &mut rng);
        let smoothed = smooth(&raw, 30);
        assert_eq!(smoothed.len(), 30);
        assert!((smoothed[0] - 0.33 * (raw[30] + raw[0] + raw[1])).abs() < 1e-6);
        assert!((smoothed[5] - 0.33 * (raw[4] + raw[5] + raw[6])).abs() < 1e-6);
        assert!((smoothed[29] - 0.33 * (raw[28] + raw[29] + raw[30])).abs() < 1e-6);
    }

    #[test]
    fn too_few_nodes_is_rejected() {
        let mut rng = EnvRng::from_seed(0);
        for nodes in [2, 5, 11, 17] {
            let result = PlatformTerrain.generate(
                &TerrainParams {
                    nodes,
                    flat_platform: true,
                },
                &mut rng,
            );
            assert!(matches!(
                result,
                Err(LanderError::DegenerateTerrain { min: 18, .. })
            ));
        }
        assert_eq!(PlatformTerrain::half_width(18), 1);
    }

    #[test]
    fn same_seed_same_terrain() {
        assert_eq!(generate(90, false, 3), generate(90, false, 3));
        assert_ne!(generate(90, false, 3), generate(90, false, 4));
    }

    #[test]
    fn edges_and_sky_follow_nodes() {
        let terrain = generate(30, false, 9);
        let edges = terrain.edges();
        assert_eq!(edges.len(), 29);
        assert_eq!(edges[0].0, (terrain.xs()[0], terrain.heights()[0]));
        assert_eq!(edges[28].1, (terrain.xs()[29], terrain.heights()[29]));

        let sky = terrain.sky_polys();
        assert_eq!(sky.len(), 29);
        assert_eq!(sky[3][2].1, H);
        assert_eq!(sky[3][3].0, edges[3].0.0);
    }

    #[test]
    fn helipad_is_flat_at_quarter_height() {
        let mut rng = EnvRng::from_seed(11);
        let terrain = HelipadTerrain
            .generate(
                &TerrainParams {
                    nodes: 11,
                    flat_platform: false,
                },
                &mut rng,
            )
            .unwrap();
        let platform = *terrain.platform();
        assert_eq!(platform.y, H / 4.0);
        assert_eq!(platform.angle, 0.0);
        assert_eq!(platform.x1, terrain.xs()[4]);
        assert_eq!(platform.x2, terrain.xs()[6]);
        for &h in terrain.platform_heights() {
            assert!((h - 0.99 * H / 4.0).abs() < 1e-5);
        }
    }
}
