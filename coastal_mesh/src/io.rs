//! File input and output: mesh JSON, GeoJSON boundaries, and checkpoint
//! persistence.

use std::path::{Path, PathBuf};

use geojson::GeoJson;

use crate::error::{MeshError, Result};
use crate::geometry::Point;
use crate::mesh::Mesh;

/// Saves a mesh to a pretty-printed JSON file.
pub fn save_mesh(mesh: &Mesh, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(mesh)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Loads a mesh from a JSON file written by [`save_mesh`].
pub fn load_mesh(path: &str) -> Result<Mesh> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn ring_points(ring: &[Vec<f64>]) -> Result<Vec<Point>> {
    let mut pts = Vec::with_capacity(ring.len());
    for pos in ring {
        if pos.len() < 2 {
            return Err(MeshError::Boundary(
                "ring position with fewer than 2 coordinates".to_string(),
            ));
        }
        pts.push(Point::new(pos[0], pos[1]));
    }
    // GeoJSON rings repeat the first position at the end.
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    Ok(pts)
}

fn polygon_rings(value: &geojson::Value) -> Option<&Vec<Vec<Vec<f64>>>> {
    match value {
        geojson::Value::Polygon(rings) => Some(rings),
        geojson::Value::MultiPolygon(polys) => polys.first(),
        _ => None,
    }
}

/// Reads the first polygon found in a GeoJSON file and returns its outer
/// ring and hole rings as (outer, islands).
pub fn read_boundary_geojson(path: &str) -> Result<(Vec<Point>, Vec<Vec<Point>>)> {
    let data = std::fs::read_to_string(path)?;
    let geojson: GeoJson = data
        .parse()
        .map_err(|e: geojson::Error| MeshError::Boundary(e.to_string()))?;

    let rings = match &geojson {
        GeoJson::Geometry(g) => polygon_rings(&g.value),
        GeoJson::Feature(f) => f.geometry.as_ref().and_then(|g| polygon_rings(&g.value)),
        GeoJson::FeatureCollection(fc) => fc
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .find_map(|g| polygon_rings(&g.value)),
    }
    .ok_or_else(|| MeshError::Boundary("no polygon geometry found".to_string()))?;

    if rings.is_empty() {
        return Err(MeshError::Boundary("polygon has no rings".to_string()));
    }
    let outer = ring_points(&rings[0])?;
    let islands = rings[1..]
        .iter()
        .map(|r| ring_points(r))
        .collect::<Result<Vec<_>>>()?;
    Ok((outer, islands))
}

/// Periodic persistence of the relaxation state, keyed by iteration.
pub trait CheckpointSink {
    fn save(&self, iteration: usize, mesh: &Mesh) -> Result<()>;
}

/// On-disk checkpoint record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Checkpoint {
    pub iteration: usize,
    pub mesh: Mesh,
}

/// Writes one JSON checkpoint file per report interval into a directory.
pub struct JsonCheckpointWriter {
    pub directory: PathBuf,
}

impl JsonCheckpointWriter {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }
}

impl CheckpointSink for JsonCheckpointWriter {
    fn save(&self, iteration: usize, mesh: &Mesh) -> Result<()> {
        std::fs::create_dir_all(&self.directory)?;
        let record = Checkpoint {
            iteration,
            mesh: mesh.clone(),
        };
        let path = self.directory.join(format!("checkpoint_{iteration:05}.json"));
        std::fs::write(path, serde_json::to_string(&record)?)?;
        Ok(())
    }
}

/// Loads a checkpoint written by [`JsonCheckpointWriter`].
pub fn load_checkpoint(path: &str) -> Result<Checkpoint> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
