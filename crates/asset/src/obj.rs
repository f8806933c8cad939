//! Wavefront OBJ reader for `v`/`vt`/`vn`/`f` records.
//!
//! Faces are fan-triangulated, identical `v/vt/vn` triples share one vertex,
//! and tangents are generated once the whole file has been read.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};

use crate::mesh::{MeshData, MeshVertex};

const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<MeshData> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    let mesh = load_obj_from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse OBJ file: {}", path.display()))?;
    log::info!(
        "Loaded mesh {}: {} vertices, {} triangles",
        path.display(),
        mesh.vertices.len(),
        mesh.indices.len() / 3
    );
    Ok(mesh)
}

pub fn load_obj_from_reader<R: BufRead>(reader: R) -> Result<MeshData> {
    let mut builder = ObjBuilder::default();
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_no))?;
        builder
            .record(line.trim())
            .with_context(|| format!("line {}", line_no))?;
    }
    builder.finish()
}

pub fn load_obj_from_str(contents: &str) -> Result<MeshData> {
    load_obj_from_reader(io::Cursor::new(contents))
}

/// Reference to one corner of a face: position, optional uv, optional normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Corner {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

#[derive(Default)]
struct ObjBuilder {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    seen: HashMap<Corner, u32>,
    mesh: MeshData,
}

impl ObjBuilder {
    fn record(&mut self, line: &str) -> Result<()> {
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        let mut fields = line.split_whitespace();
        let Some(tag) = fields.next() else {
            return Ok(());
        };
        match tag {
            "v" => self.positions.push(floats::<3>(fields)?),
            "vt" => self.uvs.push(floats::<2>(fields)?),
            "vn" => self.normals.push(floats::<3>(fields)?),
            "f" => self.face(fields)?,
            // o, g, s, usemtl, mtllib: grouping and materials are not tracked.
            _ => {}
        }
        Ok(())
    }

    fn face<'a>(&mut self, fields: impl Iterator<Item = &'a str>) -> Result<()> {
        let mut ring = Vec::new();
        for token in fields {
            let corner = self.corner(token)?;
            ring.push(self.vertex_for(corner)?);
        }
        if ring.len() < 3 {
            log::warn!("Ignoring face with {} corners", ring.len());
            return Ok(());
        }
        for k in 1..ring.len() - 1 {
            self.mesh
                .indices
                .extend_from_slice(&[ring[0], ring[k], ring[k + 1]]);
        }
        Ok(())
    }

    fn corner(&self, token: &str) -> Result<Corner> {
        let mut parts = token.split('/');
        let position = match parts.next() {
            Some(p) if !p.is_empty() => resolve(p, self.positions.len())?,
            _ => bail!("Face element '{}' has no position", token),
        };
        let uv = match parts.next() {
            Some(t) if !t.is_empty() => Some(resolve(t, self.uvs.len())?),
            _ => None,
        };
        let normal = match parts.next() {
            Some(n) if !n.is_empty() => Some(resolve(n, self.normals.len())?),
            _ => None,
        };
        Ok(Corner {
            position,
            uv,
            normal,
        })
    }

    fn vertex_for(&mut self, corner: Corner) -> Result<u32> {
        if let Some(&index) = self.seen.get(&corner) {
            return Ok(index);
        }
        let index = u32::try_from(self.mesh.vertices.len())
            .map_err(|_| anyhow!("Too many vertices in OBJ (>{})", u32::MAX))?;
        let uv = corner.uv.map_or([0.0, 0.0], |i| self.uvs[i]);
        let normal = corner.normal.map_or(DEFAULT_NORMAL, |i| self.normals[i]);
        self.mesh
            .vertices
            .push(MeshVertex::new(self.positions[corner.position], normal, uv));
        self.seen.insert(corner, index);
        Ok(index)
    }

    fn finish(mut self) -> Result<MeshData> {
        if !self.mesh.is_valid() {
            bail!("OBJ contained no triangles");
        }
        self.mesh.compute_tangents();
        Ok(self.mesh)
    }
}

fn floats<'a, const N: usize>(mut fields: impl Iterator<Item = &'a str>) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let token = fields
            .next()
            .ok_or_else(|| anyhow!("Expected {} components, found {}", N, i))?;
        *slot = token
            .parse()
            .with_context(|| format!("Invalid number '{}'", token))?;
    }
    Ok(out)
}

/// OBJ indices are 1-based; negatives count back from the current end.
fn resolve(token: &str, len: usize) -> Result<usize> {
    let raw: i64 = token
        .parse()
        .with_context(|| format!("Invalid index '{}'", token))?;
    let index = match raw {
        0 => bail!("OBJ indices are 1-based; found 0"),
        r if r > 0 => r - 1,
        r => len as i64 + r,
    };
    if index < 0 || index as usize >= len {
        bail!("OBJ index {} out of bounds (len={})", raw, len);
    }
    Ok(index as usize)
}
