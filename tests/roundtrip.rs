//! Integration tests for scene store/restore round-trips.

use sceneio::core::constants::*;
use sceneio::mesh::{DMesh, StorageMode};
use sceneio::prelude::*;
use sceneio::serializer::write_tree;
use sceneio::util::{DVec2, DVec3, Quat, Vec3, Vec4};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn roundtrip_with(serializer: &SceneSerializer, registry: &TypeRegistry, scene: &MemoryScene) -> (MemoryScene, RestoreReport) {
    let mut log = EventLog::new();
    serializer.store(scene, &mut log, registry).expect("store failed");
    let mut restored = MemoryScene::new();
    let report = serializer.restore(&mut log, &mut restored, registry).expect("restore failed");
    (restored, report)
}

fn roundtrip(scene: &MemoryScene) -> (MemoryScene, RestoreReport) {
    roundtrip_with(&SceneSerializer::default(), &TypeRegistry::new(), scene)
}

/// n x n grid of quads, two triangles each.
fn grid(n: i32) -> DMesh {
    let mut positions = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            positions.push(DVec3::new(i as f64, j as f64, (i * j) as f64 * 0.25));
        }
    }
    let mut triangles = Vec::new();
    let mut groups = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + n + 1;
            let v11 = v01 + 1;
            triangles.push([v00, v10, v11]);
            triangles.push([v00, v11, v01]);
            groups.extend([i % 3, i % 3]);
        }
    }
    DMesh::from_triangles(&positions, &triangles, Some(&groups)).unwrap()
}

fn transform() -> Transform {
    Transform {
        position: Vec3::new(1.0, -2.0, 3.5),
        rotation: Quat::from_rotation_y(0.75),
        scale: Vec3::new(2.0, 2.0, 0.5),
    }
}

#[test]
fn test_roundtrip_builtin_types() {
    init_tracing();

    let red = Material::new(MaterialKind::Flat, "red", Vec4::new(1.0, 0.0, 0.0, 0.5));
    let keys = vec![
        Keyframe { time: 0.0, transform: Transform::IDENTITY },
        Keyframe { time: 1.5, transform: transform() },
    ];

    let mut scene = MemoryScene::new();
    scene.add_object(
        SceneObject::new("box", ObjectKind::Box(BoxShape { width: 2.0, height: 3.0, depth: 4.0 }))
            .with_transform(transform())
            .with_material(red.clone())
            .with_keyframes(keys.clone()),
    );
    scene.add_object(SceneObject::new("sphere", ObjectKind::Sphere(Sphere { diameter: 2.5 })));
    scene.add_object(SceneObject::new("cyl", ObjectKind::Cylinder(Cylinder { radius: 0.25, height: 7.0 })));
    scene.add_object(SceneObject::new("pivot", ObjectKind::Pivot).with_transform(transform()));
    scene.add_object(SceneObject::new(
        "curve",
        ObjectKind::PolyCurve(PolyCurve {
            vertices: vec![DVec3::ZERO, DVec3::new(1.0, 0.1, -0.3), DVec3::new(2.0, 0.0, 1.0 / 3.0)],
            closed: true,
        }),
    ));
    scene.add_object(SceneObject::new(
        "tube",
        ObjectKind::PolyTube(PolyTube {
            vertices: vec![DVec3::ZERO, DVec3::Y],
            closed: false,
            polygon: vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0), DVec2::new(0.0, 1.0)],
        }),
    ));
    scene.add_object(SceneObject::new("helper", ObjectKind::Pivot).transient());

    let (restored, report) = roundtrip(&scene);
    assert_eq!(report.restored, 6);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.warnings().count(), 0, "{:?}", report.diagnostics);
    assert!(restored.find("helper").is_none());

    // Names, uuids and types survive for every stored object.
    for original in scene.as_slice().iter().filter(|o| !o.transient) {
        let copy = restored.find(&original.name).expect("object missing");
        assert_eq!(copy.uuid, original.uuid);
        assert_eq!(copy.type_id(), original.type_id());
        assert!(copy.transform.abs_diff_eq(&original.transform, 1e-6));
    }

    let b = restored.find("box").unwrap();
    assert_eq!(b.material, Some(red));
    assert_eq!(b.keyframes.len(), 2);
    assert_eq!(b.keyframes[1].time, 1.5);
    assert!(b.keyframes[1].transform.abs_diff_eq(&keys[1].transform, 1e-6));
    match &b.kind {
        ObjectKind::Box(shape) => assert_eq!(*shape, BoxShape { width: 2.0, height: 3.0, depth: 4.0 }),
        other => panic!("unexpected kind {other:?}"),
    }

    match &restored.find("cyl").unwrap().kind {
        ObjectKind::Cylinder(c) => assert_eq!(*c, Cylinder { radius: 0.25, height: 7.0 }),
        other => panic!("unexpected kind {other:?}"),
    }

    match &restored.find("curve").unwrap().kind {
        ObjectKind::PolyCurve(c) => {
            assert!(c.closed);
            assert_eq!(c.vertices.len(), 3);
            assert!((c.vertices[2] - DVec3::new(2.0, 0.0, 1.0 / 3.0)).length() < 1e-12);
        }
        other => panic!("unexpected kind {other:?}"),
    }

    match &restored.find("tube").unwrap().kind {
        ObjectKind::PolyTube(t) => {
            assert_eq!(t.vertices, vec![DVec3::ZERO, DVec3::Y]);
            assert_eq!(t.polygon.len(), 3);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn test_roundtrip_binary_arrays() {
    let vertices: Vec<DVec3> = (0..50).map(|i| DVec3::new(i as f64 * 0.1, (i as f64).sin(), -1e-9)).collect();
    let mut scene = MemoryScene::new();
    scene.add_object(SceneObject::new(
        "curve",
        ObjectKind::PolyCurve(PolyCurve { vertices: vertices.clone(), closed: false }),
    ));

    let serializer = SceneSerializer::new(SerializerOptions::default().with_binary_arrays(true));
    let (restored, _) = roundtrip_with(&serializer, &TypeRegistry::new(), &scene);
    match &restored.find("curve").unwrap().kind {
        // base64 arrays are bit-exact
        ObjectKind::PolyCurve(c) => assert_eq!(c.vertices, vertices),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn test_mesh_edge_refcounts_fidelity() {
    init_tracing();

    let mut mesh = grid(4);
    let removed = 2 * 4 + 2;
    mesh.remove_triangle(removed, false).unwrap();
    assert!(!mesh.is_compact());

    for compress in [true, false] {
        let mut scene = MemoryScene::new();
        scene.add_object(SceneObject::new("mesh", ObjectKind::Mesh(mesh.clone())));

        let options = SerializerOptions::default()
            .with_mesh_storage(StorageMode::EdgeRefCounts)
            .with_compression(compress, false);
        let (restored, report) = roundtrip_with(&SceneSerializer::new(options), &TypeRegistry::new(), &scene);
        assert_eq!(report.restored, 1);

        let copy = restored.find("mesh").unwrap().mesh().unwrap();
        copy.check_validity().unwrap();
        assert_eq!(copy.vertex_count(), mesh.vertex_count());
        assert_eq!(copy.triangle_count(), mesh.triangle_count());
        assert_eq!(copy.edge_count(), mesh.edge_count());
        assert!(!copy.is_triangle(removed));
        assert_eq!(copy.vertex_buffer(), mesh.vertex_buffer());
        assert_eq!(copy.edge_buffer(), mesh.edge_buffer());
        assert_eq!(copy.edge_ref_counts(), mesh.edge_ref_counts());
        for tid in mesh.triangle_indices() {
            assert_eq!(copy.triangle(tid), mesh.triangle(tid));
            assert_eq!(copy.triangle_group(tid), mesh.triangle_group(tid));
        }
    }
}

#[test]
fn test_mesh_minimal_compacts() {
    let mut mesh = grid(3);
    mesh.remove_triangle(0, true).unwrap();
    mesh.remove_triangle(5, true).unwrap();
    let live: Vec<[DVec3; 3]> = mesh
        .triangle_indices()
        .map(|tid| mesh.triangle(tid).map(|v| mesh.vertex(v)))
        .collect();

    for fast in [true, false] {
        let mut scene = MemoryScene::new();
        scene.add_object(SceneObject::new("mesh", ObjectKind::Mesh(mesh.clone())));

        let options = SerializerOptions::default()
            .with_mesh_storage(StorageMode::Minimal)
            .with_compression(true, fast);
        let (restored, _) = roundtrip_with(&SceneSerializer::new(options), &TypeRegistry::new(), &scene);

        let copy = restored.find("mesh").unwrap().mesh().unwrap();
        copy.check_validity().unwrap();
        assert!(copy.is_compact());
        assert_eq!(copy.triangle_count(), mesh.triangle_count());
        assert_eq!(copy.vertex_count(), mesh.vertex_count());

        // Live triangles keep their order and corner positions.
        let restored_live: Vec<[DVec3; 3]> = copy
            .triangle_indices()
            .map(|tid| copy.triangle(tid).map(|v| copy.vertex(v)))
            .collect();
        assert_eq!(restored_live, live);
    }
}

#[test]
fn test_mesh_struct_name_follows_compression() {
    let mut scene = MemoryScene::new();
    scene.add_object(SceneObject::new("mesh", ObjectKind::Mesh(grid(1))));

    for (compress, expected) in [(true, STRUCT_MESH_COMPRESSED), (false, STRUCT_MESH_BINARY)] {
        let serializer = SceneSerializer::new(SerializerOptions::default().with_compression(compress, false));
        let mut log = EventLog::new();
        serializer.store(&scene, &mut log, &TypeRegistry::new()).unwrap();
        assert!(log.events().iter().any(|e| matches!(
            e,
            StreamEvent::BeginStruct { type_name, .. } if type_name == expected
        )));
    }
}

fn stray_attribute() -> StreamEvent {
    StreamEvent::Attribute { name: ATTR_NAME.into(), value: "orphan".into(), inline: true }
}

fn assert_protocol_error_leaves_scene(events: Vec<StreamEvent>) {
    let mut scene = MemoryScene::new();
    scene.add_object(SceneObject::new("existing", ObjectKind::Pivot));

    let mut log = EventLog::from_events(events);
    let err = SceneSerializer::default()
        .restore(&mut log, &mut scene, &TypeRegistry::new())
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }), "{err}");
    assert_eq!(scene.len(), 1);
    assert!(scene.find("existing").is_some());
}

#[test]
fn test_attribute_before_object_inserts_nothing() {
    assert_protocol_error_leaves_scene(vec![
        StreamEvent::BeginScene { version: SCENE_VERSION.into() },
        stray_attribute(),
        StreamEvent::BeginSceneObject,
        StreamEvent::Attribute { name: ATTR_TYPE.into(), value: TYPE_PIVOT.into(), inline: true },
        StreamEvent::BeginStruct { type_name: STRUCT_TRANSFORM.into(), identifier: None },
        StreamEvent::EndStruct,
        StreamEvent::EndSceneObject,
        StreamEvent::EndScene,
    ]);
}

#[test]
fn test_attribute_before_scene_inserts_nothing() {
    assert_protocol_error_leaves_scene(vec![
        stray_attribute(),
        StreamEvent::BeginScene { version: SCENE_VERSION.into() },
        StreamEvent::EndScene,
    ]);
}

#[test]
fn test_attribute_between_objects_inserts_nothing() {
    assert_protocol_error_leaves_scene(vec![
        StreamEvent::BeginScene { version: SCENE_VERSION.into() },
        StreamEvent::BeginSceneObject,
        StreamEvent::Attribute { name: ATTR_TYPE.into(), value: TYPE_PIVOT.into(), inline: true },
        StreamEvent::BeginStruct { type_name: STRUCT_TRANSFORM.into(), identifier: None },
        StreamEvent::EndStruct,
        StreamEvent::EndSceneObject,
        stray_attribute(),
        StreamEvent::EndScene,
    ]);
}

#[test]
fn test_missing_optional_attributes_use_defaults() {
    let mut log = EventLog::from_events(vec![
        StreamEvent::BeginScene { version: SCENE_VERSION.into() },
        StreamEvent::BeginSceneObject,
        StreamEvent::Attribute { name: ATTR_TYPE.into(), value: TYPE_BOX.into(), inline: true },
        StreamEvent::Attribute { name: ATTR_NAME.into(), value: "plain".into(), inline: true },
        StreamEvent::BeginStruct { type_name: STRUCT_TRANSFORM.into(), identifier: None },
        StreamEvent::EndStruct,
        StreamEvent::EndSceneObject,
        StreamEvent::EndScene,
    ]);

    let fallback = Material::new(MaterialKind::Standard, "fallback", Vec4::new(0.5, 0.5, 0.5, 1.0));
    let mut scene = MemoryScene::new().with_default_material(fallback.clone());
    let report = SceneSerializer::default()
        .restore(&mut log, &mut scene, &TypeRegistry::new())
        .unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.warnings().count(), 0);
    assert!(report.diagnostics.iter().any(|d| d.severity == Severity::Info));

    let obj = scene.find("plain").unwrap();
    assert_eq!(obj.transform, Transform::IDENTITY);
    assert_eq!(obj.material, Some(fallback));
    assert!(!obj.uuid.is_empty());
    match &obj.kind {
        ObjectKind::Box(b) => assert_eq!(*b, BoxShape::default()),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn test_unknown_type_dropped_others_restored() {
    let mut scene = MemoryScene::new();
    scene.add_object(SceneObject::new("a", ObjectKind::Pivot));
    scene.add_object(SceneObject::new(
        "lamp",
        ObjectKind::Custom(CustomObject { type_id: "light".into(), attributes: AttributeTree::new() }),
    ));
    scene.add_object(SceneObject::new("b", ObjectKind::Sphere(Sphere::default())));

    let (restored, report) = roundtrip(&scene);
    assert_eq!(report.restored, 2);
    assert_eq!(report.skipped, 1);
    assert!(report.warnings().any(|d| d.object.as_deref() == Some("lamp")));
    assert!(restored.find("a").is_some());
    assert!(restored.find("b").is_some());
    assert!(restored.find("lamp").is_none());
}

#[test]
fn test_object_without_transform_is_skipped() {
    let mut log = EventLog::from_events(vec![
        StreamEvent::BeginScene { version: SCENE_VERSION.into() },
        StreamEvent::BeginSceneObject,
        StreamEvent::Attribute { name: ATTR_TYPE.into(), value: TYPE_SPHERE.into(), inline: true },
        StreamEvent::Attribute { name: ATTR_NAME.into(), value: "loose".into(), inline: true },
        StreamEvent::EndSceneObject,
        StreamEvent::EndScene,
    ]);
    let mut scene = MemoryScene::new();
    let report = SceneSerializer::default()
        .restore(&mut log, &mut scene, &TypeRegistry::new())
        .unwrap();
    assert_eq!((report.restored, report.skipped), (0, 1));
    assert!(scene.is_empty());
}

#[test]
fn test_custom_type_registry() {
    const LIGHT: &str = "light";

    let mut registry = TypeRegistry::new();
    registry.register_emitter(LIGHT, |serializer, writer, object| {
        let ObjectKind::Custom(custom) = &object.kind else {
            return Ok(false);
        };
        serializer.write_common(writer, &custom.type_id, object)?;
        write_tree(writer, &custom.attributes)?;
        Ok(true)
    });
    registry.register_builder(LIGHT, |factory, scene, tree| {
        let mut attributes = AttributeTree::new();
        attributes.insert("fIntensity", factory.float_or(tree, "fIntensity", 1.0));
        attributes.insert("iSamples", factory.int_or(tree, "iSamples", 16));
        attributes.insert("cTint", AttributeValue::Color(factory.color_or(tree, "cTint", Vec4::ONE)));
        let kind = ObjectKind::Custom(CustomObject { type_id: LIGHT.into(), attributes });
        factory.build_object(scene, LIGHT, tree, kind).map(Some)
    });

    let mut attributes = AttributeTree::new();
    attributes.insert("fIntensity", 3.5f32);
    attributes.insert("iSamples", 4);
    attributes.insert("cTint", AttributeValue::Color(Vec4::new(1.0, 0.9, 0.8, 1.0)));
    let mut scene = MemoryScene::new();
    scene.add_object(
        SceneObject::new("lamp", ObjectKind::Custom(CustomObject { type_id: LIGHT.into(), attributes: attributes.clone() }))
            .with_transform(transform()),
    );
    scene.add_object(SceneObject::new("pivot", ObjectKind::Pivot));

    let (restored, report) = roundtrip_with(&SceneSerializer::default(), &registry, &scene);
    assert_eq!(report.restored, 2);

    let lamp = restored.find("lamp").unwrap();
    assert!(lamp.transform.abs_diff_eq(&transform(), 1e-6));
    match &lamp.kind {
        ObjectKind::Custom(c) => {
            assert_eq!(c.type_id, LIGHT);
            assert_eq!(c.attributes, attributes);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn test_custom_builder_defaults_missing_int() {
    const LIGHT: &str = "light";

    let mut registry = TypeRegistry::new();
    registry.register_builder(LIGHT, |factory, scene, tree| {
        let mut attributes = AttributeTree::new();
        attributes.insert("iSamples", factory.int_or(tree, "iSamples", 16));
        let kind = ObjectKind::Custom(CustomObject { type_id: LIGHT.into(), attributes });
        factory.build_object(scene, LIGHT, tree, kind).map(Some)
    });

    let mut scene = MemoryScene::new();
    scene.add_object(SceneObject::new(
        "lamp",
        ObjectKind::Custom(CustomObject { type_id: LIGHT.into(), attributes: AttributeTree::new() }),
    ));

    let (restored, report) = roundtrip_with(&SceneSerializer::default(), &registry, &scene);
    assert_eq!(report.restored, 1);
    match &restored.find("lamp").unwrap().kind {
        ObjectKind::Custom(c) => assert_eq!(c.attributes.get_int("iSamples"), Some(16)),
        other => panic!("unexpected kind {other:?}"),
    }
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Info && d.message.contains("iSamples")));
}
