//! Ray-cast volume estimation and hierarchy coverage

use crate::bvh::Hierarchy;
use crate::intersection::triangle_intersects_segment;
use meshkit_core::{Aabb, BoundingVolume, Point3f, Segment, TriangleMesh, Vector3f};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Default number of grid divisions along the largest extent
pub const DEFAULT_DIVISIONS: usize = 50;

/// Grid spacing below which estimation is skipped
pub const MIN_SPACING: f32 = 1e-6;

/// Ray direction shared by all samples. All components positive and
/// mutually irrational-looking so rays rarely graze edges or vertices of
/// axis-aligned geometry.
const RAY_DIRECTION: [f32; 3] = [0.7730, 0.5698, 0.2791];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Grid divisions along the largest extent of the root box
    pub divisions: usize,
    /// Run estimation on mesh construction
    pub enabled: bool,
    /// Subtract pairwise sphere overlap when computing sphere coverage
    pub subtract_sphere_overlap: bool,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            divisions: DEFAULT_DIVISIONS,
            enabled: true,
            subtract_sphere_overlap: true,
        }
    }
}

impl VolumeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_divisions(mut self, divisions: usize) -> Self {
        self.divisions = divisions;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_sphere_overlap(mut self, subtract: bool) -> Self {
        self.subtract_sphere_overlap = subtract;
        self
    }
}

/// Result of one estimation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeEstimate {
    pub volume: f32,
    /// Samples classified inside
    pub inside: usize,
    pub samples: usize,
    /// Edge length of a grid cell
    pub spacing: f32,
    /// One cube per inside sample
    pub voxels: Vec<Aabb>,
}

/// Regular-grid parity estimator
#[derive(Debug, Clone, Default)]
pub struct VolumeEstimator {
    pub config: VolumeConfig,
}

impl VolumeEstimator {
    pub fn new(config: VolumeConfig) -> Self {
        Self { config }
    }

    /// Estimate the enclosed volume of `mesh`, using the deepest level of
    /// `hierarchy` to cull triangles per ray.
    ///
    /// The grid is cubic: the spacing is the largest extent over the
    /// division count, so no axis gets more than `divisions` cells. Each
    /// axis gets as many cells as needed to cover the box, centered on it.
    /// A sample is inside when its ray crosses an odd number of triangles.
    /// Returns `None` for an empty or flat mesh, or a spacing below
    /// [`MIN_SPACING`].
    pub fn estimate<V: BoundingVolume>(
        &self,
        mesh: &TriangleMesh,
        hierarchy: &Hierarchy<V>,
    ) -> Option<VolumeEstimate> {
        let bounds = mesh.bounding_box()?;
        let divisions = self.config.divisions.max(1);
        let spacing = bounds.max_size() / divisions as f32;
        if spacing < MIN_SPACING {
            log::debug!("volume estimation skipped: grid spacing {} too small", spacing);
            return None;
        }
        if bounds.volume() <= 0.0 {
            log::debug!("volume estimation skipped: flat bounding box");
            return None;
        }

        let cells = |size: f32| ((size / spacing - 1e-3).ceil() as usize).clamp(1, divisions);
        let (nx, ny, nz) = (cells(bounds.x_size()), cells(bounds.y_size()), cells(bounds.z_size()));
        // grid overhang split evenly on both sides of each axis
        let origin = bounds.min
            - Vector3f::new(
                nx as f32 * spacing - bounds.x_size(),
                ny as f32 * spacing - bounds.y_size(),
                nz as f32 * spacing - bounds.z_size(),
            ) * 0.5;
        let reach = Vector3f::from(RAY_DIRECTION).normalize() * (2.0 * bounds.diagonal() + spacing);
        let leaves: Vec<_> = hierarchy.leaves().iter().filter(|n| !n.is_empty()).collect();

        let start = Instant::now();
        let slabs: Vec<(usize, Vec<Aabb>)> = (0..nx)
            .into_par_iter()
            .map_init(
                || vec![usize::MAX; mesh.triangles.len()],
                |stamps, ix| {
                    let mut inside = 0;
                    let mut voxels = Vec::new();
                    for iy in 0..ny {
                        for iz in 0..nz {
                            let sample = Point3f::new(
                                origin.x + spacing * (ix as f32 + 0.5),
                                origin.y + spacing * (iy as f32 + 0.5),
                                origin.z + spacing * (iz as f32 + 0.5),
                            );
                            let ray = Segment::new(sample, sample + reach);
                            let stamp = (ix * ny + iy) * nz + iz;

                            let mut crossings = 0usize;
                            for leaf in leaves.iter().filter(|n| n.volume.may_cross(&ray)) {
                                for &ti in &leaf.triangles {
                                    if stamps[ti] == stamp {
                                        continue;
                                    }
                                    stamps[ti] = stamp;
                                    if triangle_intersects_segment(&mesh.vertices, &mesh.triangles[ti], &ray) {
                                        crossings += 1;
                                    }
                                }
                            }

                            if crossings % 2 == 1 {
                                inside += 1;
                                let half = Vector3f::repeat(spacing * 0.5);
                                voxels.push(Aabb::new(sample - half, sample + half));
                            }
                        }
                    }
                    (inside, voxels)
                },
            )
            .collect();

        let samples = nx * ny * nz;
        let mut inside = 0;
        let mut voxels = Vec::new();
        for (count, slab) in slabs {
            inside += count;
            voxels.extend(slab);
        }
        let volume = inside as f32 * spacing.powi(3);

        log::info!(
            "volume estimate {:.6} from {}/{} samples in {:.2?}",
            volume,
            inside,
            samples,
            start.elapsed()
        );

        Some(VolumeEstimate {
            volume,
            inside,
            samples,
            spacing,
            voxels,
        })
    }
}

/// Fraction of a level's bounding volume filled by the mesh.
///
/// `None` when the level's measure is not positive, in which case callers
/// keep their previous value.
pub fn level_coverage<V: BoundingVolume>(
    hierarchy: &Hierarchy<V>,
    level: usize,
    mesh_volume: f32,
    subtract_overlap: bool,
) -> Option<f32> {
    let measure = hierarchy.level_measure(level, subtract_overlap);
    (measure > 0.0).then(|| mesh_volume / measure)
}

/// Coverage of every level, root first
pub fn coverage<V: BoundingVolume>(
    hierarchy: &Hierarchy<V>,
    mesh_volume: f32,
    subtract_overlap: bool,
) -> Vec<Option<f32>> {
    (0..=hierarchy.depth())
        .map(|level| level_coverage(hierarchy, level, mesh_volume, subtract_overlap))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::{BoxHierarchy, HierarchyConfig, SphereHierarchy};
    use approx::assert_relative_eq;

    fn box_mesh(size: Vector3f) -> TriangleMesh {
        let (x, y, z) = (size.x, size.y, size.z);
        let vertices = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(x, 0.0, 0.0),
            Point3f::new(x, y, 0.0),
            Point3f::new(0.0, y, 0.0),
            Point3f::new(0.0, 0.0, z),
            Point3f::new(x, 0.0, z),
            Point3f::new(x, y, z),
            Point3f::new(0.0, y, z),
        ];
        let faces = vec![
            [0, 2, 1], [0, 3, 2],
            [4, 5, 6], [4, 6, 7],
            [0, 1, 5], [0, 5, 4],
            [3, 7, 6], [3, 6, 2],
            [0, 4, 7], [0, 7, 3],
            [1, 2, 6], [1, 6, 5],
        ];
        TriangleMesh::from_vertices_and_faces(vertices, faces).unwrap()
    }

    #[test]
    fn test_unit_cube_volume() {
        let mesh = box_mesh(Vector3f::new(1.0, 1.0, 1.0));
        let hierarchy = BoxHierarchy::build(&mesh, &HierarchyConfig::default()).unwrap();
        let estimator = VolumeEstimator::new(VolumeConfig::new().with_divisions(20));
        let estimate = estimator.estimate(&mesh, &hierarchy).unwrap();

        assert_eq!(estimate.samples, 20 * 20 * 20);
        assert_relative_eq!(estimate.spacing, 0.05, epsilon = 1e-6);
        assert!((estimate.volume - 1.0).abs() < 0.05, "volume {}", estimate.volume);
        assert_eq!(estimate.voxels.len(), estimate.inside);
    }

    #[test]
    fn test_box_volume_uses_cubic_cells() {
        let mesh = box_mesh(Vector3f::new(2.0, 1.0, 0.5));
        let hierarchy = BoxHierarchy::build(&mesh, &HierarchyConfig::default()).unwrap();
        let estimator = VolumeEstimator::new(VolumeConfig::new().with_divisions(20));
        let estimate = estimator.estimate(&mesh, &hierarchy).unwrap();

        assert_eq!(estimate.samples, 20 * 10 * 5);
        assert!((estimate.volume - 1.0).abs() < 0.05, "volume {}", estimate.volume);
    }

    #[test]
    fn test_sphere_hierarchy_gives_same_estimate() {
        let mesh = box_mesh(Vector3f::new(1.0, 1.0, 1.0));
        let boxes = BoxHierarchy::build(&mesh, &HierarchyConfig::default()).unwrap();
        let spheres = SphereHierarchy::build(&mesh, &HierarchyConfig::default()).unwrap();
        let estimator = VolumeEstimator::new(VolumeConfig::new().with_divisions(10));
        let a = estimator.estimate(&mesh, &boxes).unwrap();
        let b = estimator.estimate(&mesh, &spheres).unwrap();
        assert_eq!(a.inside, b.inside);
    }

    #[test]
    fn test_thin_mesh_keeps_grid_bounded() {
        let mesh = box_mesh(Vector3f::new(0.002, 1.0, 1.0));
        let hierarchy = BoxHierarchy::build(&mesh, &HierarchyConfig::default()).unwrap();

        let coarse = VolumeEstimator::new(VolumeConfig::new().with_divisions(2))
            .estimate(&mesh, &hierarchy)
            .unwrap();
        assert_eq!(coarse.samples, 2 * 2);
        assert!(coarse.voxels.len() <= 8);
        assert_relative_eq!(coarse.spacing, 0.5, epsilon = 1e-6);

        let fine = VolumeEstimator::default().estimate(&mesh, &hierarchy).unwrap();
        assert!(fine.samples <= DEFAULT_DIVISIONS.pow(3));
        assert_eq!(fine.samples, DEFAULT_DIVISIONS * DEFAULT_DIVISIONS);
        // the single X layer sits in the middle of the slab
        assert_eq!(fine.inside, fine.samples);
    }

    #[test]
    fn test_tall_mesh_uses_largest_extent() {
        let mesh = box_mesh(Vector3f::new(0.5, 1.0, 2.0));
        let hierarchy = BoxHierarchy::build(&mesh, &HierarchyConfig::default()).unwrap();
        let estimate = VolumeEstimator::new(VolumeConfig::new().with_divisions(20))
            .estimate(&mesh, &hierarchy)
            .unwrap();

        assert_eq!(estimate.samples, 5 * 10 * 20);
        assert!((estimate.volume - 1.0).abs() < 0.05, "volume {}", estimate.volume);
    }

    #[test]
    fn test_flat_mesh_is_skipped() {
        // zero X extent gives a flat box
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let hierarchy = BoxHierarchy::build(&mesh, &HierarchyConfig::default()).unwrap();
        assert!(VolumeEstimator::default().estimate(&mesh, &hierarchy).is_none());
    }

    #[test]
    fn test_box_coverage_bounded() {
        let mesh = box_mesh(Vector3f::new(1.0, 1.0, 1.0));
        let hierarchy = BoxHierarchy::build(&mesh, &HierarchyConfig::default()).unwrap();
        let estimator = VolumeEstimator::new(VolumeConfig::new().with_divisions(20));
        let volume = estimator.estimate(&mesh, &hierarchy).unwrap().volume;

        let table = coverage(&hierarchy, volume, false);
        assert_eq!(table.len(), hierarchy.depth() + 1);
        for value in table {
            let value = value.unwrap();
            assert!(value > 0.0 && value <= 1.0 + 1e-3, "coverage {}", value);
        }
    }

    #[test]
    fn test_zero_measure_level_has_no_coverage() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let hierarchy = BoxHierarchy::build(&mesh, &HierarchyConfig::default()).unwrap();
        assert!(level_coverage(&hierarchy, 0, 1.0, false).is_none());
    }
}
