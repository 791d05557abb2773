//! Mesh codec: [`DMesh`] to and from an attribute-tree struct.
//!
//! Two topology storage modes:
//! - [`StorageMode::EdgeRefCounts`] writes the raw vertex, triangle and edge
//!   buffers plus edge refcounts, and restores with identical ids.
//! - [`StorageMode::Minimal`] writes vertices and live triangles only and
//!   restores by ordered insertion; ids may be renumbered.
//!
//! Every buffer is a little-endian byte array (see [`crate::core::packing`])
//! under an `xb` key. In the
//! `MeshCompressed` struct each buffer is additionally a zlib stream.

use tracing::{debug, warn};

use super::{DMesh, MeshBuffers, MeshComponents, VertexInfo};
use crate::core::constants::*;
use crate::core::packing::{pack_f32, pack_f64, pack_i16, pack_i32};
use crate::core::{compress, decompress, packing, AttributeTree, AttributeValue, CompressionLevel};
use crate::util::{DVec3, Error, Result, Vec2, Vec3};

/// Topology storage mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageMode {
    /// Full fidelity: ids and adjacency restored exactly.
    #[default]
    EdgeRefCounts,
    /// Compact: geometry and connectivity only.
    Minimal,
}

impl StorageMode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::EdgeRefCounts => 0,
            Self::Minimal => 1,
        }
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::EdgeRefCounts),
            1 => Some(Self::Minimal),
            _ => None,
        }
    }
}

/// How a mesh is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshEncoding {
    pub mode: StorageMode,
    pub compress: bool,
    pub fast_compression: bool,
}

impl Default for MeshEncoding {
    fn default() -> Self {
        Self { mode: StorageMode::EdgeRefCounts, compress: true, fast_compression: false }
    }
}

impl MeshEncoding {
    /// Struct name the encoded mesh is stored under.
    pub fn struct_name(&self) -> &'static str {
        if self.compress { STRUCT_MESH_COMPRESSED } else { STRUCT_MESH_BINARY }
    }
}

// ============================================================================
// Byte packing
// ============================================================================

fn stride_error(key: &str, bytes: &[u8], size: usize) -> Error {
    Error::invalid_mesh(format!("{key}: {} bytes is not a multiple of {size}", bytes.len()))
}

fn unpack_f64(key: &str, bytes: &[u8]) -> Result<Vec<f64>> {
    packing::unpack_f64(bytes).ok_or_else(|| stride_error(key, bytes, 8))
}

fn unpack_f32(key: &str, bytes: &[u8]) -> Result<Vec<f32>> {
    packing::unpack_f32(bytes).ok_or_else(|| stride_error(key, bytes, 4))
}

fn unpack_i32(key: &str, bytes: &[u8]) -> Result<Vec<i32>> {
    packing::unpack_i32(bytes).ok_or_else(|| stride_error(key, bytes, 4))
}

fn unpack_i16(key: &str, bytes: &[u8]) -> Result<Vec<i16>> {
    packing::unpack_i16(bytes).ok_or_else(|| stride_error(key, bytes, 2))
}

/// Vertex and triangle buffers hold whole xyz / abc triples.
fn check_triples(key: &str, len: usize) -> Result<usize> {
    if len % 3 != 0 {
        return Err(Error::invalid_mesh(format!("{key}: {len} values is not a multiple of 3")));
    }
    Ok(len / 3)
}

// ============================================================================
// Buffer access with optional compression
// ============================================================================

struct BufferSink {
    tree: AttributeTree,
    level: Option<CompressionLevel>,
}

impl BufferSink {
    fn put(&mut self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let data = match self.level {
            Some(level) => compress(&bytes, level)?,
            None => bytes,
        };
        self.tree.insert(key, AttributeValue::Bytes(data));
        Ok(())
    }
}

struct BufferSource<'a> {
    tree: &'a AttributeTree,
    compressed: bool,
}

impl BufferSource<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.tree.get_bytes(key) {
            None => Ok(None),
            Some(bytes) if self.compressed => decompress(bytes).map(Some),
            Some(bytes) => Ok(Some(bytes.to_vec())),
        }
    }

    /// Optional buffer declared by `flag`; dropped with a warning when it is
    /// absent or its length does not match `expected`.
    fn optional<T>(
        &self,
        flag: &str,
        key: &str,
        expected: usize,
        unpack: fn(&str, &[u8]) -> Result<Vec<T>>,
    ) -> Result<Option<Vec<T>>> {
        if !self.tree.get_bool(flag).unwrap_or(false) {
            return Ok(None);
        }
        let Some(bytes) = self.get(key)? else {
            warn!("{flag} is set but {key} is missing; dropping it");
            return Ok(None);
        };
        let values = unpack(key, &bytes)?;
        if values.len() != expected {
            warn!("{key} has {} values, expected {expected}; dropping it", values.len());
            return Ok(None);
        }
        Ok(Some(values))
    }
}

// ============================================================================
// Encode
// ============================================================================

/// Encode a mesh. Returns the struct name and its attribute tree.
pub fn encode_mesh(mesh: &DMesh, encoding: &MeshEncoding) -> Result<(&'static str, AttributeTree)> {
    let mut sink = BufferSink {
        tree: AttributeTree::new(),
        level: encoding.compress.then(|| CompressionLevel::from_fast_flag(encoding.fast_compression)),
    };

    let compacted;
    let mesh = match encoding.mode {
        StorageMode::Minimal if !mesh.is_compact() => {
            debug!("compacting mesh before minimal encoding");
            compacted = mesh.compact_copy()?;
            &compacted
        }
        _ => mesh,
    };

    let components = mesh.components();
    sink.tree.insert(ATTR_STORAGE_MODE, encoding.mode.as_i32());
    sink.tree.insert(ATTR_HAS_NORMALS, components.normals);
    sink.tree.insert(ATTR_HAS_COLORS, components.colors);
    sink.tree.insert(ATTR_HAS_UVS, components.uvs);
    sink.tree.insert(ATTR_HAS_GROUPS, components.groups);

    sink.put(ATTR_MESH_VERTICES, pack_f64(mesh.vertex_buffer()))?;
    if let Some(n) = mesh.normal_buffer() {
        sink.put(ATTR_MESH_NORMALS, pack_f32(n))?;
    }
    if let Some(c) = mesh.color_buffer() {
        sink.put(ATTR_MESH_COLORS, pack_f32(c))?;
    }
    if let Some(uv) = mesh.uv_buffer() {
        sink.put(ATTR_MESH_UVS, pack_f32(uv))?;
    }

    match encoding.mode {
        StorageMode::EdgeRefCounts => {
            sink.put(ATTR_MESH_TRIANGLES, pack_i32(mesh.triangle_buffer()))?;
            if let Some(g) = mesh.group_buffer() {
                sink.put(ATTR_MESH_GROUPS, pack_i32(g))?;
            }
            sink.put(ATTR_MESH_EDGES, pack_i32(mesh.edge_buffer()))?;
            sink.put(ATTR_MESH_EDGE_REFCOUNTS, pack_i16(&mesh.edge_ref_counts()))?;
        }
        StorageMode::Minimal => {
            let mut triangles = Vec::with_capacity(3 * mesh.triangle_count());
            let mut groups = Vec::with_capacity(mesh.triangle_count());
            for tid in mesh.triangle_indices() {
                triangles.extend_from_slice(&mesh.triangle(tid));
                groups.push(mesh.triangle_group(tid));
            }
            sink.put(ATTR_MESH_TRIANGLES, pack_i32(&triangles))?;
            if components.groups {
                sink.put(ATTR_MESH_GROUPS, pack_i32(&groups))?;
            }
        }
    }

    Ok((encoding.struct_name(), sink.tree))
}

// ============================================================================
// Decode
// ============================================================================

/// Locate the mesh payload struct inside an object's tree.
pub fn find_mesh_struct(tree: &AttributeTree) -> Option<(&'static str, &AttributeTree)> {
    [STRUCT_MESH_COMPRESSED, STRUCT_MESH_BINARY]
        .into_iter()
        .find_map(|name| tree.get_struct(name, None).map(|t| (name, t)))
}

/// Decode a mesh payload struct.
///
/// Returns `Ok(None)` when the vertex or triangle buffer is missing.
pub fn decode_mesh(struct_name: &str, tree: &AttributeTree) -> Result<Option<DMesh>> {
    let source = BufferSource { tree, compressed: struct_name == STRUCT_MESH_COMPRESSED };

    let vertices = source.get(ATTR_MESH_VERTICES)?;
    let triangles = source.get(ATTR_MESH_TRIANGLES)?;
    let (Some(vertices), Some(triangles)) = (vertices, triangles) else {
        warn!("mesh struct {struct_name} lacks vertex or triangle buffer");
        return Ok(None);
    };
    let vertices = unpack_f64(ATTR_MESH_VERTICES, &vertices)?;
    let triangles = unpack_i32(ATTR_MESH_TRIANGLES, &triangles)?;
    let nv = check_triples(ATTR_MESH_VERTICES, vertices.len())?;
    let nt = check_triples(ATTR_MESH_TRIANGLES, triangles.len())?;

    let normals = source.optional(ATTR_HAS_NORMALS, ATTR_MESH_NORMALS, 3 * nv, unpack_f32)?;
    let colors = source.optional(ATTR_HAS_COLORS, ATTR_MESH_COLORS, 3 * nv, unpack_f32)?;
    let uvs = source.optional(ATTR_HAS_UVS, ATTR_MESH_UVS, 2 * nv, unpack_f32)?;
    let groups = source.optional(ATTR_HAS_GROUPS, ATTR_MESH_GROUPS, nt, unpack_i32)?;

    let mode = match tree.get_int(ATTR_STORAGE_MODE) {
        Some(v) => StorageMode::from_i32(v)
            .ok_or_else(|| Error::invalid_mesh(format!("unknown storage mode {v}")))?,
        None if tree.contains(ATTR_MESH_EDGES) => StorageMode::EdgeRefCounts,
        None => StorageMode::Minimal,
    };

    let mesh = match mode {
        StorageMode::EdgeRefCounts => {
            let edges = source
                .get(ATTR_MESH_EDGES)?
                .ok_or_else(|| Error::invalid_mesh("edge buffer missing"))?;
            let refcounts = source
                .get(ATTR_MESH_EDGE_REFCOUNTS)?
                .ok_or_else(|| Error::invalid_mesh("edge refcount buffer missing"))?;
            DMesh::from_edge_refcounts(MeshBuffers {
                vertices,
                normals,
                colors,
                uvs,
                triangles,
                groups,
                edges: unpack_i32(ATTR_MESH_EDGES, &edges)?,
                edge_ref_counts: unpack_i16(ATTR_MESH_EDGE_REFCOUNTS, &refcounts)?,
            })?
        }
        StorageMode::Minimal => {
            let components = MeshComponents {
                normals: normals.is_some(),
                colors: colors.is_some(),
                uvs: uvs.is_some(),
                groups: groups.is_some(),
            };
            let mut mesh = DMesh::new(components);
            for i in 0..nv {
                let mut info = VertexInfo::new(DVec3::from_slice(&vertices[3 * i..3 * i + 3]));
                if let Some(n) = &normals {
                    info.normal = Vec3::from_slice(&n[3 * i..3 * i + 3]);
                }
                if let Some(c) = &colors {
                    info.color = Vec3::from_slice(&c[3 * i..3 * i + 3]);
                }
                if let Some(uv) = &uvs {
                    info.uv = Vec2::from_slice(&uv[2 * i..2 * i + 2]);
                }
                mesh.append_vertex(&info);
            }
            for t in 0..nt {
                let tri = [triangles[3 * t], triangles[3 * t + 1], triangles[3 * t + 2]];
                let gid = groups.as_ref().map(|g| g[t]).unwrap_or(0);
                mesh.append_triangle(tri, gid)?;
            }
            mesh
        }
    };

    debug!(
        "decoded {:?} mesh: {} vertices, {} triangles, {} edges",
        mode,
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.edge_count()
    );
    Ok(Some(mesh))
}
