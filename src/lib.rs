//! Hierarchical radiosity solver for diffuse global illumination.
//!
//! The solver builds, for a triangulated scene, a forest of quadtrees whose
//! leaves are surface patches at an adaptive resolution, installs gather-links
//! annotated with form factors between quadtree nodes of different root
//! triangles, and iterates a gather / push-pull solver against those links,
//! refining them until every link carries less than a bounded amount of
//! unresolved radiant power.

#[macro_use]
extern crate log;

pub mod accelerators;
pub mod cameras;
pub mod core;
pub mod integrators;
pub mod mesh;
