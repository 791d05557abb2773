//! Dynamic triangle mesh with explicit edge topology.
//!
//! [`DMesh`] stores vertices, triangles and edges in flat buffers indexed by
//! integer ids. Ids are allocated through [`RefCountVector`]s, so removing
//! elements leaves holes that later appends reuse. Every live edge records
//! its two endpoint vertices and up to two incident triangles; every vertex
//! keeps the list of its edges.
//!
//! Reference counts:
//! - vertex: `1 + number of incident triangles`
//! - triangle: `1`
//! - edge: `1`
//!
//! The [`codec`] submodule persists meshes into attribute trees.

pub mod codec;
mod refcount;

pub use codec::{decode_mesh, encode_mesh, find_mesh_struct, MeshEncoding, StorageMode};
pub use refcount::{RefCountVector, FREE};

use smallvec::SmallVec;

use crate::util::{DVec3, Error, Result, Vec2, Vec3};

/// Id value meaning "none".
pub const INVALID_ID: i32 = -1;

/// Optional per-vertex and per-triangle attributes of a mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshComponents {
    pub normals: bool,
    pub colors: bool,
    pub uvs: bool,
    pub groups: bool,
}

impl MeshComponents {
    pub const NONE: Self = Self { normals: false, colors: false, uvs: false, groups: false };
    pub const ALL: Self = Self { normals: true, colors: true, uvs: true, groups: true };
}

/// Data for one appended vertex. Attributes the mesh does not carry are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VertexInfo {
    pub position: DVec3,
    pub normal: Vec3,
    pub color: Vec3,
    pub uv: Vec2,
}

impl VertexInfo {
    pub fn new(position: DVec3) -> Self {
        Self { position, ..Default::default() }
    }
}

/// Raw buffers a full-topology mesh is rebuilt from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    pub vertices: Vec<f64>,
    pub normals: Option<Vec<f32>>,
    pub colors: Option<Vec<f32>>,
    pub uvs: Option<Vec<f32>>,
    pub triangles: Vec<i32>,
    pub groups: Option<Vec<i32>>,
    /// Four ids per edge: `va, vb, t0, t1`.
    pub edges: Vec<i32>,
    pub edge_ref_counts: Vec<i16>,
}

/// Triangle mesh with refcounted ids and edge adjacency.
#[derive(Clone, Debug, Default)]
pub struct DMesh {
    vertices: Vec<f64>,
    normals: Option<Vec<f32>>,
    colors: Option<Vec<f32>>,
    uvs: Option<Vec<f32>>,
    vertices_refcount: RefCountVector,
    vertex_edges: Vec<SmallVec<[i32; 8]>>,

    triangles: Vec<i32>,
    triangle_edges: Vec<i32>,
    triangles_refcount: RefCountVector,
    groups: Option<Vec<i32>>,

    edges: Vec<i32>,
    edges_refcount: RefCountVector,
}

/// Write `values` into slot `index` of a strided buffer, growing it if the
/// slot is one past the end.
fn write_slot<T: Copy>(buf: &mut Vec<T>, index: usize, values: &[T]) {
    let start = index * values.len();
    if start >= buf.len() {
        buf.extend_from_slice(values);
    } else {
        buf[start..start + values.len()].copy_from_slice(values);
    }
}

#[inline]
fn same_pair(a: i32, b: i32, c: i32, d: i32) -> bool {
    (a == c && b == d) || (a == d && b == c)
}

impl DMesh {
    /// Create an empty mesh carrying the given optional attributes.
    pub fn new(components: MeshComponents) -> Self {
        Self {
            normals: components.normals.then(Vec::new),
            colors: components.colors.then(Vec::new),
            uvs: components.uvs.then(Vec::new),
            groups: components.groups.then(Vec::new),
            ..Default::default()
        }
    }

    /// Build a mesh from indexed triangles, appending in order.
    pub fn from_triangles(
        positions: &[DVec3],
        triangles: &[[i32; 3]],
        groups: Option<&[i32]>,
    ) -> Result<Self> {
        let mut components = MeshComponents::NONE;
        components.groups = groups.is_some();
        let mut mesh = Self::new(components);

        for &p in positions {
            mesh.append_vertex(&VertexInfo::new(p));
        }
        for (i, &tri) in triangles.iter().enumerate() {
            let gid = groups.and_then(|g| g.get(i).copied()).unwrap_or(0);
            mesh.append_triangle(tri, gid)?;
        }
        Ok(mesh)
    }

    /// Optional attributes this mesh carries.
    pub fn components(&self) -> MeshComponents {
        MeshComponents {
            normals: self.normals.is_some(),
            colors: self.colors.is_some(),
            uvs: self.uvs.is_some(),
            groups: self.groups.is_some(),
        }
    }

    // ========================================================================
    // Counts and id queries
    // ========================================================================

    pub fn vertex_count(&self) -> usize {
        self.vertices_refcount.count()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles_refcount.count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges_refcount.count()
    }

    /// One past the largest vertex id.
    pub fn max_vertex_id(&self) -> usize {
        self.vertices_refcount.max_index()
    }

    /// One past the largest triangle id.
    pub fn max_triangle_id(&self) -> usize {
        self.triangles_refcount.max_index()
    }

    /// One past the largest edge id.
    pub fn max_edge_id(&self) -> usize {
        self.edges_refcount.max_index()
    }

    #[inline]
    pub fn is_vertex(&self, vid: i32) -> bool {
        self.vertices_refcount.is_valid(vid)
    }

    #[inline]
    pub fn is_triangle(&self, tid: i32) -> bool {
        self.triangles_refcount.is_valid(tid)
    }

    #[inline]
    pub fn is_edge(&self, eid: i32) -> bool {
        self.edges_refcount.is_valid(eid)
    }

    /// No holes in the vertex and triangle id ranges.
    pub fn is_compact(&self) -> bool {
        self.vertices_refcount.is_dense() && self.triangles_refcount.is_dense()
    }

    pub fn vertex_indices(&self) -> impl Iterator<Item = i32> + '_ {
        self.vertices_refcount.indices()
    }

    pub fn triangle_indices(&self) -> impl Iterator<Item = i32> + '_ {
        self.triangles_refcount.indices()
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = i32> + '_ {
        self.edges_refcount.indices()
    }

    // ========================================================================
    // Element access
    // ========================================================================

    pub fn vertex(&self, vid: i32) -> DVec3 {
        let i = 3 * vid as usize;
        DVec3::new(self.vertices[i], self.vertices[i + 1], self.vertices[i + 2])
    }

    pub fn set_vertex(&mut self, vid: i32, position: DVec3) {
        let i = 3 * vid as usize;
        self.vertices[i..i + 3].copy_from_slice(&position.to_array());
    }

    pub fn vertex_normal(&self, vid: i32) -> Option<Vec3> {
        let n = self.normals.as_ref()?;
        let i = 3 * vid as usize;
        Some(Vec3::new(n[i], n[i + 1], n[i + 2]))
    }

    pub fn vertex_color(&self, vid: i32) -> Option<Vec3> {
        let c = self.colors.as_ref()?;
        let i = 3 * vid as usize;
        Some(Vec3::new(c[i], c[i + 1], c[i + 2]))
    }

    pub fn vertex_uv(&self, vid: i32) -> Option<Vec2> {
        let uv = self.uvs.as_ref()?;
        let i = 2 * vid as usize;
        Some(Vec2::new(uv[i], uv[i + 1]))
    }

    /// All stored data of one vertex.
    pub fn vertex_info(&self, vid: i32) -> VertexInfo {
        VertexInfo {
            position: self.vertex(vid),
            normal: self.vertex_normal(vid).unwrap_or(Vec3::Y),
            color: self.vertex_color(vid).unwrap_or(Vec3::ONE),
            uv: self.vertex_uv(vid).unwrap_or(Vec2::ZERO),
        }
    }

    /// Number of live triangles using this vertex.
    pub fn vertex_triangle_count(&self, vid: i32) -> usize {
        (self.vertices_refcount.ref_count(vid) as usize).saturating_sub(1)
    }

    /// Edges incident to a vertex.
    pub fn vertex_edges(&self, vid: i32) -> &[i32] {
        &self.vertex_edges[vid as usize]
    }

    pub fn triangle(&self, tid: i32) -> [i32; 3] {
        let i = 3 * tid as usize;
        [self.triangles[i], self.triangles[i + 1], self.triangles[i + 2]]
    }

    /// Edge ids of a triangle; edge `j` joins corners `j` and `j + 1`.
    pub fn triangle_edges(&self, tid: i32) -> [i32; 3] {
        let i = 3 * tid as usize;
        [self.triangle_edges[i], self.triangle_edges[i + 1], self.triangle_edges[i + 2]]
    }

    /// Group id of a triangle, 0 when the mesh carries no groups.
    pub fn triangle_group(&self, tid: i32) -> i32 {
        self.groups.as_ref().map(|g| g[tid as usize]).unwrap_or(0)
    }

    /// `[va, vb, t0, t1]` of an edge, `t1` is [`INVALID_ID`] on boundaries.
    pub fn edge(&self, eid: i32) -> [i32; 4] {
        let i = 4 * eid as usize;
        [self.edges[i], self.edges[i + 1], self.edges[i + 2], self.edges[i + 3]]
    }

    pub fn edge_ref_count(&self, eid: i32) -> i32 {
        self.edges_refcount.ref_count(eid)
    }

    pub fn is_boundary_edge(&self, eid: i32) -> bool {
        self.edges[4 * eid as usize + 3] == INVALID_ID
    }

    /// Find the edge joining two vertices.
    pub fn find_edge(&self, a: i32, b: i32) -> Option<i32> {
        if !self.is_vertex(a) || !self.is_vertex(b) {
            return None;
        }
        // Scan the shorter of the two edge lists; fan centers can be huge.
        let (la, lb) = (&self.vertex_edges[a as usize], &self.vertex_edges[b as usize]);
        let list = if la.len() <= lb.len() { la } else { lb };
        list.iter().copied().find(|&eid| {
            let e = 4 * eid as usize;
            same_pair(self.edges[e], self.edges[e + 1], a, b)
        })
    }

    // ========================================================================
    // Raw buffers
    // ========================================================================

    pub fn vertex_buffer(&self) -> &[f64] {
        &self.vertices
    }

    pub fn normal_buffer(&self) -> Option<&[f32]> {
        self.normals.as_deref()
    }

    pub fn color_buffer(&self) -> Option<&[f32]> {
        self.colors.as_deref()
    }

    pub fn uv_buffer(&self) -> Option<&[f32]> {
        self.uvs.as_deref()
    }

    pub fn triangle_buffer(&self) -> &[i32] {
        &self.triangles
    }

    pub fn group_buffer(&self) -> Option<&[i32]> {
        self.groups.as_deref()
    }

    pub fn edge_buffer(&self) -> &[i32] {
        &self.edges
    }

    /// Edge refcounts in their stored width. Live edges always count 1.
    pub fn edge_ref_counts(&self) -> Vec<i16> {
        self.edges_refcount.raw().iter().map(|&c| if c > 0 { 1 } else { FREE as i16 }).collect()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Append a vertex and return its id.
    pub fn append_vertex(&mut self, info: &VertexInfo) -> i32 {
        let vid = self.vertices_refcount.allocate();
        let i = vid as usize;

        write_slot(&mut self.vertices, i, &info.position.to_array());
        if let Some(n) = &mut self.normals {
            write_slot(n, i, &info.normal.to_array());
        }
        if let Some(c) = &mut self.colors {
            write_slot(c, i, &info.color.to_array());
        }
        if let Some(uv) = &mut self.uvs {
            write_slot(uv, i, &info.uv.to_array());
        }

        if i < self.vertex_edges.len() {
            self.vertex_edges[i].clear();
        } else {
            self.vertex_edges.push(SmallVec::new());
        }
        vid
    }

    /// Append a triangle and return its id.
    ///
    /// Fails on missing or repeated vertices, and when an edge already has
    /// two incident triangles.
    pub fn append_triangle(&mut self, tri: [i32; 3], group: i32) -> Result<i32> {
        if let Some(&v) = tri.iter().find(|&&v| !self.is_vertex(v)) {
            return Err(Error::invalid_mesh(format!("triangle references missing vertex {v}")));
        }
        if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
            return Err(Error::invalid_mesh(format!("degenerate triangle {tri:?}")));
        }

        let mut existing = [None; 3];
        for j in 0..3 {
            let (a, b) = (tri[j], tri[(j + 1) % 3]);
            if let Some(eid) = self.find_edge(a, b) {
                if !self.is_boundary_edge(eid) {
                    return Err(Error::NonManifold(a, b));
                }
                existing[j] = Some(eid);
            }
        }

        let tid = self.triangles_refcount.allocate();
        write_slot(&mut self.triangles, tid as usize, &tri);
        if let Some(g) = &mut self.groups {
            write_slot(g, tid as usize, &[group]);
        }
        for &v in &tri {
            self.vertices_refcount.increment(v);
        }

        let mut tri_edges = [INVALID_ID; 3];
        for j in 0..3 {
            tri_edges[j] = match existing[j] {
                Some(eid) => {
                    self.edges[4 * eid as usize + 3] = tid;
                    eid
                }
                None => self.add_edge(tri[j], tri[(j + 1) % 3], tid),
            };
        }
        write_slot(&mut self.triangle_edges, tid as usize, &tri_edges);
        Ok(tid)
    }

    fn add_edge(&mut self, a: i32, b: i32, tid: i32) -> i32 {
        let (a, b) = if a < b { (a, b) } else { (b, a) };
        let eid = self.edges_refcount.allocate();
        write_slot(&mut self.edges, eid as usize, &[a, b, tid, INVALID_ID]);
        self.vertex_edges[a as usize].push(eid);
        self.vertex_edges[b as usize].push(eid);
        eid
    }

    /// Remove a triangle, dropping edges left without triangles.
    ///
    /// With `remove_isolated_vertices`, vertices left without triangles are
    /// freed as well.
    pub fn remove_triangle(&mut self, tid: i32, remove_isolated_vertices: bool) -> Result<()> {
        if !self.is_triangle(tid) {
            return Err(Error::invalid_mesh(format!("triangle {tid} does not exist")));
        }
        let tri = self.triangle(tid);

        for eid in self.triangle_edges(tid) {
            let e = 4 * eid as usize;
            if self.edges[e + 2] == tid {
                self.edges[e + 2] = self.edges[e + 3];
                self.edges[e + 3] = INVALID_ID;
            } else if self.edges[e + 3] == tid {
                self.edges[e + 3] = INVALID_ID;
            }

            if self.edges[e + 2] == INVALID_ID {
                let (a, b) = (self.edges[e], self.edges[e + 1]);
                self.vertex_edges[a as usize].retain(|x| *x != eid);
                self.vertex_edges[b as usize].retain(|x| *x != eid);
                self.edges_refcount.decrement(eid);
            }
        }

        self.triangles_refcount.decrement(tid);
        for v in tri {
            self.vertices_refcount.decrement(v);
            if remove_isolated_vertices && self.vertices_refcount.ref_count(v) == 1 {
                self.vertices_refcount.decrement(v);
                self.vertex_edges[v as usize].clear();
            }
        }
        Ok(())
    }

    /// Copy with vertex and triangle ids renumbered densely, in id order.
    pub fn compact_copy(&self) -> Result<DMesh> {
        let mut out = DMesh::new(self.components());
        let mut map = vec![INVALID_ID; self.max_vertex_id()];

        for vid in self.vertex_indices() {
            map[vid as usize] = out.append_vertex(&self.vertex_info(vid));
        }
        for tid in self.triangle_indices() {
            let [a, b, c] = self.triangle(tid);
            out.append_triangle(
                [map[a as usize], map[b as usize], map[c as usize]],
                self.triangle_group(tid),
            )?;
        }
        Ok(out)
    }

    /// Rebuild a mesh from raw buffers and edge refcounts, keeping every id.
    ///
    /// Live edges come from `edge_ref_counts`; live triangles and vertices are
    /// the ones those edges reference. Vertices with no live edge are
    /// treated as free slots.
    pub fn from_edge_refcounts(buffers: MeshBuffers) -> Result<DMesh> {
        let MeshBuffers { vertices, normals, colors, uvs, triangles, groups, edges, edge_ref_counts } = buffers;

        if vertices.len() % 3 != 0 || triangles.len() % 3 != 0 || edges.len() % 4 != 0 {
            return Err(Error::invalid_mesh("buffer length is not a multiple of its stride"));
        }
        let nv = vertices.len() / 3;
        let nt = triangles.len() / 3;
        if edge_ref_counts.len() != edges.len() / 4 {
            return Err(Error::invalid_mesh(format!(
                "{} edge refcounts for {} edges",
                edge_ref_counts.len(),
                edges.len() / 4
            )));
        }
        let check_len = |name: &str, buf: Option<&Vec<f32>>, expected: usize| -> Result<()> {
            match buf {
                Some(b) if b.len() != expected => Err(Error::invalid_mesh(format!(
                    "{name} buffer has {} values, expected {expected}",
                    b.len()
                ))),
                _ => Ok(()),
            }
        };
        check_len("normal", normals.as_ref(), 3 * nv)?;
        check_len("color", colors.as_ref(), 3 * nv)?;
        check_len("uv", uvs.as_ref(), 2 * nv)?;
        if groups.as_ref().is_some_and(|g| g.len() != nt) {
            return Err(Error::invalid_mesh("group buffer does not match triangle count"));
        }

        let edges_refcount = RefCountVector::from_raw(edge_ref_counts.into_iter().map(i32::from));
        let mut vertex_edges: Vec<SmallVec<[i32; 8]>> = vec![SmallVec::new(); nv];
        let mut vertex_alive = vec![false; nv];
        let mut triangle_alive = vec![false; nt];
        let mut triangle_edges = vec![INVALID_ID; 3 * nt];

        for eid in edges_refcount.indices() {
            let e = 4 * eid as usize;
            let (a, b) = (edges[e], edges[e + 1]);
            if a < 0 || b < 0 || a as usize >= nv || b as usize >= nv {
                return Err(Error::invalid_mesh(format!("edge {eid} references missing vertex")));
            }
            vertex_edges[a as usize].push(eid);
            vertex_edges[b as usize].push(eid);
            vertex_alive[a as usize] = true;
            vertex_alive[b as usize] = true;

            for t in [edges[e + 2], edges[e + 3]] {
                if t == INVALID_ID {
                    continue;
                }
                if t < 0 || t as usize >= nt {
                    return Err(Error::invalid_mesh(format!("edge {eid} references missing triangle {t}")));
                }
                let i = 3 * t as usize;
                let tri = &triangles[i..i + 3];
                let j = (0..3)
                    .find(|&j| same_pair(tri[j], tri[(j + 1) % 3], a, b))
                    .ok_or_else(|| Error::invalid_mesh(format!("edge {eid} is not a side of triangle {t}")))?;
                triangle_edges[i + j] = eid;
                triangle_alive[t as usize] = true;
            }
        }

        let mut vertex_counts = vec![FREE; nv];
        for (v, alive) in vertex_alive.iter().enumerate() {
            if *alive {
                vertex_counts[v] = 1;
            }
        }
        let mut triangle_counts = vec![FREE; nt];
        for t in (0..nt).filter(|&t| triangle_alive[t]) {
            if triangle_edges[3 * t..3 * t + 3].contains(&INVALID_ID) {
                return Err(Error::invalid_mesh(format!("triangle {t} has a side without an edge")));
            }
            triangle_counts[t] = 1;
            for &v in &triangles[3 * t..3 * t + 3] {
                vertex_counts[v as usize] += 1;
            }
        }

        Ok(DMesh {
            vertices,
            normals,
            colors,
            uvs,
            vertices_refcount: RefCountVector::from_raw(vertex_counts),
            vertex_edges,
            triangles,
            triangle_edges,
            triangles_refcount: RefCountVector::from_raw(triangle_counts),
            groups,
            edges,
            edges_refcount,
        })
    }

    /// Check internal consistency of refcounts and adjacency.
    pub fn check_validity(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::invalid_mesh(msg));
        let mut tri_uses = vec![0usize; self.max_vertex_id()];

        for tid in self.triangle_indices() {
            let tri = self.triangle(tid);
            for (j, eid) in self.triangle_edges(tid).into_iter().enumerate() {
                if !self.is_vertex(tri[j]) {
                    return fail(format!("triangle {tid} uses dead vertex {}", tri[j]));
                }
                if !self.is_edge(eid) {
                    return fail(format!("triangle {tid} uses dead edge {eid}"));
                }
                let [a, b, t0, t1] = self.edge(eid);
                if !same_pair(a, b, tri[j], tri[(j + 1) % 3]) || (t0 != tid && t1 != tid) {
                    return fail(format!("edge {eid} does not match triangle {tid}"));
                }
                tri_uses[tri[j] as usize] += 1;
            }
        }

        for eid in self.edge_indices() {
            let [a, b, t0, t1] = self.edge(eid);
            if !self.is_triangle(t0) || (t1 != INVALID_ID && !self.is_triangle(t1)) {
                return fail(format!("edge {eid} references a dead triangle"));
            }
            if !self.vertex_edges(a).contains(&eid) || !self.vertex_edges(b).contains(&eid) {
                return fail(format!("edge {eid} missing from vertex edge lists"));
            }
        }

        for vid in self.vertex_indices() {
            if self.vertex_triangle_count(vid) != tri_uses[vid as usize] {
                return fail(format!("vertex {vid} refcount does not match its triangles"));
            }
        }
        Ok(())
    }
}
