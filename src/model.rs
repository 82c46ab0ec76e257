//! The `Mesh` aggregate
//!
//! A [`Mesh`] owns its geometry and everything derived from it: the box and
//! sphere hierarchies, the voxel list and per-level coverage of the last
//! volume estimate, plus a draw-time placement.
//!
//! Hard transforms (`set_max_size`, `corner_align`, `center_align`,
//! `hard_translate`) move the vertices and every derived structure in
//! lockstep. Soft transforms (`move_by`, `rotate_by`, `set_position`,
//! `set_rotation`) only touch the placement.

use meshkit_algorithms::{
    coverage, extract_collisions, BoxHierarchy, CollisionMode, HierarchyConfig, SphereHierarchy,
    VolumeConfig, VolumeEstimator,
};
use meshkit_core::{
    Aabb, Bounded, Error, Placement, Point3f, Result, Transform3D, Transformable, TriangleMesh, Vector3f,
};
use meshkit_io::{ObjOptions, ObjReader};
use meshkit_simplification::{EdgeCollapseSimplifier, MeshSimplifier, SimplifyOutcome};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Construction parameters of a [`Mesh`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    pub hierarchy: HierarchyConfig,
    pub volume: VolumeConfig,
    /// Also build the sphere hierarchy
    pub build_spheres: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            hierarchy: HierarchyConfig::default(),
            volume: VolumeConfig::default(),
            build_spheres: true,
        }
    }
}

impl MeshConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hierarchy(mut self, hierarchy: HierarchyConfig) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn with_volume(mut self, volume: VolumeConfig) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_spheres(mut self, build_spheres: bool) -> Self {
        self.build_spheres = build_spheres;
        self
    }
}

/// How the mesh was obtained from its file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    /// The file was missing or malformed; the mesh is empty
    LoadFailed(String),
}

/// Which hierarchy a coverage value refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageKind {
    Box,
    Sphere,
}

/// A triangle mesh with its derived spatial data and draw-time placement.
///
/// `clone` deep-copies the vertex arena and all derived structures; the
/// copy's triangles index its own vertex buffer.
#[derive(Debug, Clone)]
pub struct Mesh {
    geometry: TriangleMesh,
    boxes: Option<BoxHierarchy>,
    spheres: Option<SphereHierarchy>,
    voxels: Vec<Aabb>,
    box_coverage: Vec<f32>,
    sphere_coverage: Vec<f32>,
    volume: Option<f32>,
    placement: Placement,
    config: MeshConfig,
    status: LoadStatus,
}

impl Mesh {
    /// Wrap `geometry` and build every derived structure
    pub fn from_triangle_mesh(geometry: TriangleMesh, config: MeshConfig) -> Self {
        let levels = config.hierarchy.depth + 1;
        let mut mesh = Self {
            geometry,
            boxes: None,
            spheres: None,
            voxels: Vec::new(),
            box_coverage: vec![0.0; levels],
            sphere_coverage: vec![0.0; levels],
            volume: None,
            placement: Placement::default(),
            config,
            status: LoadStatus::Loaded,
        };
        mesh.rebuild_derived();
        mesh
    }

    /// Load a mesh with the default configuration.
    ///
    /// Never fails: a missing or malformed file yields an empty mesh whose
    /// [`Mesh::status`] is [`LoadStatus::LoadFailed`].
    pub fn from_file<P: AsRef<Path>>(path: P, counter_clockwise: bool) -> Self {
        Self::from_file_with_config(path, counter_clockwise, MeshConfig::default())
    }

    pub fn from_file_with_config<P: AsRef<Path>>(path: P, counter_clockwise: bool, config: MeshConfig) -> Self {
        let path = path.as_ref();
        match Self::try_from_file(path, counter_clockwise, config.clone()) {
            Ok(mesh) => mesh,
            Err(e) => {
                log::warn!("failed to load {}: {}", path.display(), e);
                let mut mesh = Self::from_triangle_mesh(TriangleMesh::new(), config);
                mesh.status = LoadStatus::LoadFailed(e.to_string());
                mesh
            }
        }
    }

    /// Load a mesh, propagating read and parse errors
    pub fn try_from_file<P: AsRef<Path>>(path: P, counter_clockwise: bool, config: MeshConfig) -> Result<Self> {
        let path = path.as_ref();
        let start = Instant::now();
        let options = ObjOptions::new().with_counter_clockwise(counter_clockwise);
        let geometry = ObjReader::new(options).read_path(path)?;
        let mesh = Self::from_triangle_mesh(geometry, config);
        log::info!(
            "loaded {} in {:.2?}: {} triangles",
            path.display(),
            start.elapsed(),
            mesh.face_count()
        );
        Ok(mesh)
    }

    /// Triangles of `a` (and of `b` with [`CollisionMode::Both`]) touching
    /// the other mesh, both taken with their placements applied.
    ///
    /// The result lives in world coordinates with an identity placement and
    /// `a`'s configuration. It is empty when the meshes do not overlap.
    pub fn from_intersection(a: &Mesh, b: &Mesh, mode: CollisionMode) -> Self {
        let start = Instant::now();
        let world_a = a.world_geometry();
        let world_b = b.world_geometry();
        let geometry = match BoxHierarchy::build(&world_b, &a.config.hierarchy) {
            Some(b_hierarchy) => extract_collisions(&world_a, &world_b, &b_hierarchy, mode),
            None => TriangleMesh::new(),
        };
        let mesh = Self::from_triangle_mesh(geometry, a.config.clone());
        log::info!(
            "collision took {:.2?}: {} triangles",
            start.elapsed(),
            mesh.face_count()
        );
        mesh
    }

    /// Rebuild hierarchies, volume estimate, voxels and coverage from the
    /// current geometry. Geometry caches must already be current.
    fn rebuild_derived(&mut self) {
        self.boxes = BoxHierarchy::build(&self.geometry, &self.config.hierarchy);
        self.spheres = if self.config.build_spheres {
            SphereHierarchy::build(&self.geometry, &self.config.hierarchy)
        } else {
            None
        };

        let levels = self.config.hierarchy.depth + 1;
        self.box_coverage.resize(levels, 0.0);
        self.sphere_coverage.resize(levels, 0.0);

        if !self.config.volume.enabled {
            return;
        }
        let estimator = VolumeEstimator::new(self.config.volume.clone());
        let estimate = match (&self.boxes, &self.spheres) {
            (Some(boxes), _) => estimator.estimate(&self.geometry, boxes),
            (None, Some(spheres)) => estimator.estimate(&self.geometry, spheres),
            (None, None) => None,
        };
        if let Some(estimate) = estimate {
            self.volume = Some(estimate.volume);
            self.voxels = estimate.voxels;
        }
        self.update_coverage();
    }

    /// Recompute coverage from the current volume. Levels without a
    /// positive bounding measure keep their previous value.
    fn update_coverage(&mut self) {
        let Some(volume) = self.volume else {
            return;
        };
        if let Some(boxes) = &self.boxes {
            for (slot, value) in self.box_coverage.iter_mut().zip(coverage(boxes, volume, false)) {
                if let Some(value) = value {
                    *slot = value;
                }
            }
        }
        if let Some(spheres) = &self.spheres {
            let subtract = self.config.volume.subtract_sphere_overlap;
            for (slot, value) in self.sphere_coverage.iter_mut().zip(coverage(spheres, volume, subtract)) {
                if let Some(value) = value {
                    *slot = value;
                }
            }
        }
    }

    // ---- Hard transforms ----

    /// Move every vertex and all derived data by `offset`
    pub fn hard_translate(&mut self, offset: Vector3f) {
        self.geometry.translate(&offset);
        if let Some(boxes) = self.boxes.as_mut() {
            boxes.translate(&offset);
        }
        if let Some(spheres) = self.spheres.as_mut() {
            spheres.translate(&offset);
        }
        for voxel in self.voxels.iter_mut() {
            voxel.translate(&offset);
        }
    }

    fn hard_scale(&mut self, factor: f32) {
        self.geometry.scale(factor);
        self.geometry.compute_vertex_normals();
        if let Some(boxes) = self.boxes.as_mut() {
            boxes.scale(factor);
        }
        if let Some(spheres) = self.spheres.as_mut() {
            spheres.scale(factor);
        }
        for voxel in self.voxels.iter_mut() {
            voxel.scale(factor);
        }
        if let Some(volume) = self.volume.as_mut() {
            *volume *= factor.abs().powi(3);
        }
    }

    /// Scale about the origin so the largest bounding box extent becomes
    /// `size`. A mesh without triangles is left untouched.
    pub fn set_max_size(&mut self, size: f32) -> Result<()> {
        if size.is_nan() || size <= 0.0 {
            return Err(Error::InvalidData(format!("Target size must be positive, got {}", size)));
        }
        let Some(bounds) = self.bounding_box() else {
            return Ok(());
        };
        let current = bounds.max_size();
        if current <= 0.0 {
            return Err(Error::InvalidData("Cannot scale a mesh of zero extent".to_string()));
        }
        self.hard_scale(size / current);
        Ok(())
    }

    /// Translate so the bounding box minimum sits at the origin
    pub fn corner_align(&mut self) {
        if let Some(bounds) = self.bounding_box() {
            self.hard_translate(-bounds.min.coords);
        }
    }

    /// Translate so the bounding box center sits at the origin
    pub fn center_align(&mut self) {
        if let Some(center) = self.geometry.center() {
            self.hard_translate(-center.coords);
        }
    }

    // ---- Soft transforms ----

    pub fn move_by(&mut self, offset: Vector3f) {
        self.placement.position += offset;
    }

    /// Add per-axis rotation angles, in degrees
    pub fn rotate_by(&mut self, angles: Vector3f) {
        self.placement.rotation += angles;
    }

    pub fn set_position(&mut self, position: Vector3f) {
        self.placement.position = position;
    }

    /// Replace the per-axis rotation angles, in degrees
    pub fn set_rotation(&mut self, angles: Vector3f) {
        self.placement.rotation = angles;
    }

    // ---- Simplification ----

    /// Edge-collapse simplification keeping about `retain_percent` percent
    /// of the triangles, followed by a full rebuild of the derived data
    pub fn simplify(&mut self, retain_percent: f32) -> Result<SimplifyOutcome> {
        self.simplify_with(&EdgeCollapseSimplifier::default(), retain_percent)
    }

    pub fn simplify_with(&mut self, simplifier: &dyn MeshSimplifier, retain_percent: f32) -> Result<SimplifyOutcome> {
        let outcome = simplifier.simplify(&mut self.geometry, retain_percent)?;
        if outcome != SimplifyOutcome::AlreadyMinimal {
            self.rebuild_derived();
        }
        Ok(outcome)
    }

    // ---- Accessors ----

    /// Local-space bounding box of the live triangles
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.geometry.bounding_box()
    }

    pub fn position(&self) -> Vector3f {
        self.placement.position
    }

    /// Per-axis rotation angles, in degrees
    pub fn local_rotation(&self) -> Vector3f {
        self.placement.rotation
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn world_transform(&self) -> Transform3D {
        self.placement.to_transform()
    }

    /// Coverage of hierarchy `level`; zero until a volume estimate exists
    pub fn coverage(&self, kind: CoverageKind, level: usize) -> Option<f32> {
        match kind {
            CoverageKind::Box => self.box_coverage.get(level).copied(),
            CoverageKind::Sphere => self.sphere_coverage.get(level).copied(),
        }
    }

    /// Latest volume estimate
    pub fn volume(&self) -> Option<f32> {
        self.volume
    }

    /// Cubes of the inside samples of the latest volume estimate
    pub fn voxels(&self) -> &[Aabb] {
        &self.voxels
    }

    pub fn box_hierarchy(&self) -> Option<&BoxHierarchy> {
        self.boxes.as_ref()
    }

    pub fn sphere_hierarchy(&self) -> Option<&SphereHierarchy> {
        self.spheres.as_ref()
    }

    pub fn geometry(&self) -> &TriangleMesh {
        &self.geometry
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn face_count(&self) -> usize {
        self.geometry.face_count()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Copy of the geometry with the placement applied
    pub fn world_geometry(&self) -> TriangleMesh {
        if self.placement.is_identity() {
            self.geometry.clone()
        } else {
            self.geometry.transformed(&self.world_transform())
        }
    }

    /// Corners of every live triangle in world coordinates
    pub fn world_triangles(&self) -> Vec<[Point3f; 3]> {
        let transform = self.world_transform();
        self.geometry
            .live_triangles()
            .map(|(ti, _)| self.geometry.corners(ti).map(|p| transform.transform_point(&p)))
            .collect()
    }
}
