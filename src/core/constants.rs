//! Reserved identifiers of the scene format.
//!
//! Changing any of these breaks compatibility with previously written scenes.

/// Version tag written once per scene.
pub const SCENE_VERSION: &str = "1.0";

// ============================================================================
// Type identifiers
// ============================================================================

pub const TYPE_BOX: &str = "box";
pub const TYPE_SPHERE: &str = "sphere";
pub const TYPE_CYLINDER: &str = "cylinder";
pub const TYPE_PIVOT: &str = "pivot";
pub const TYPE_POLYCURVE: &str = "polycurve";
pub const TYPE_POLYTUBE: &str = "polytube";
pub const TYPE_MESH_REFERENCE: &str = "mesh_reference";
pub const TYPE_DMESH: &str = "dmesh";

// ============================================================================
// Struct names
// ============================================================================

pub const STRUCT_TRANSFORM: &str = "Transform";
pub const STRUCT_MATERIAL: &str = "Material";
pub const STRUCT_MESH_BINARY: &str = "MeshBinary";
pub const STRUCT_MESH_COMPRESSED: &str = "MeshCompressed";
pub const STRUCT_KEYFRAME_LIST: &str = "KeyframeList";
pub const STRUCT_KEYFRAME: &str = "Keyframe";

// ============================================================================
// Attribute keys
// ============================================================================

// Object header
pub const ATTR_TYPE: &str = "sType";
pub const ATTR_NAME: &str = "sName";
pub const ATTR_UUID: &str = "sUUID";

// Transform struct
pub const ATTR_POSITION: &str = "vPosition";
pub const ATTR_ORIENTATION: &str = "qOrientation";
pub const ATTR_SCALE: &str = "vScale";

// Material struct
pub const ATTR_MATERIAL_TYPE: &str = "sMaterialType";
pub const ATTR_MATERIAL_NAME: &str = "sName";
pub const ATTR_MATERIAL_COLOR: &str = "cColor";

// Keyframe struct
pub const ATTR_TIME: &str = "fTime";

// Primitives
pub const ATTR_WIDTH: &str = "fWidth";
pub const ATTR_HEIGHT: &str = "fHeight";
pub const ATTR_DEPTH: &str = "fDepth";
pub const ATTR_DIAMETER: &str = "fDiameter";
pub const ATTR_RADIUS: &str = "fRadius";

// Curves and tubes
pub const ATTR_CLOSED: &str = "bClosed";
pub const ATTR_VERTICES_TEXT: &str = "zd3Vertices";
pub const ATTR_VERTICES_BINARY: &str = "xd3Vertices";
pub const ATTR_POLYGON_TEXT: &str = "zd2Polygon";
pub const ATTR_POLYGON_BINARY: &str = "xd2Polygon";

// Mesh references
pub const ATTR_RELATIVE_PATH: &str = "sRelativePath";
pub const ATTR_ABSOLUTE_PATH: &str = "sAbsolutePath";

// Mesh buffers
pub const ATTR_STORAGE_MODE: &str = "iStorageMode";
pub const ATTR_HAS_NORMALS: &str = "bHasNormals";
pub const ATTR_HAS_COLORS: &str = "bHasColors";
pub const ATTR_HAS_UVS: &str = "bHasUVs";
pub const ATTR_HAS_GROUPS: &str = "bHasGroups";
pub const ATTR_MESH_VERTICES: &str = "xbVertices";
pub const ATTR_MESH_NORMALS: &str = "xbNormals";
pub const ATTR_MESH_COLORS: &str = "xbColors";
pub const ATTR_MESH_UVS: &str = "xbUVs";
pub const ATTR_MESH_TRIANGLES: &str = "xbTriangles";
pub const ATTR_MESH_GROUPS: &str = "xbGroups";
pub const ATTR_MESH_EDGES: &str = "xbEdges";
pub const ATTR_MESH_EDGE_REFCOUNTS: &str = "xbEdgeRefCounts";
