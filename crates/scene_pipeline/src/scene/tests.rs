use approx::assert_relative_eq;
use super::*;
use crate::core::{DebugChecks, PipelineConfig};
use crate::foundation::math::{translation_of, Mat4, Vec3};
use crate::render::gpu::RecordedCall;
use crate::render::{
    BufferKind, GpuAllocator, GraphicsComponent, HostAllocator, HostBindings, MeshLibrary, ParameterBlock,
    RecordingDrawRecorder, RenderError, RendererType,
};

fn config() -> PipelineConfig {
    PipelineConfig::new().with_debug_checks(DebugChecks::Always)
}

fn scene() -> Scene {
    Scene::new(config()).unwrap()
}

fn add_renderable(
    scene: &mut Scene,
    name: &str,
    graphics: GraphicsComponent,
    position: Vec3,
    parent: Option<EntityId>,
) -> EntityId {
    let entity = scene
        .create_entity(name)
        .with_transform(Transform::from_position(position))
        .with_graphics(graphics);
    let id = entity.id();
    scene.add_entity(entity, parent, None);
    id
}

fn add_plain(scene: &mut Scene, name: &str, parent: Option<EntityId>) -> EntityId {
    let entity = scene.create_entity(name);
    let id = entity.id();
    scene.add_entity(entity, parent, None);
    id
}

fn slot_of(scene: &Scene, id: EntityId) -> u32 {
    let graphics = scene.entity(id).unwrap().graphics.as_ref().unwrap();
    let storage = scene.storage(graphics.renderer).unwrap();
    storage.instance_slot(graphics.instance().unwrap()).unwrap()
}

fn read_matrix(bytes: &[u8], offset: usize) -> Mat4 {
    let values: [f32; 16] = bytemuck::pod_read_unaligned(&bytes[offset..offset + 64]);
    Mat4::from_column_slice(&values)
}

fn read_floats(bytes: &[u8], offset: usize, count: usize) -> Vec<f32> {
    bytes[offset..offset + count * 4]
        .chunks_exact(4)
        .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[test]
fn test_remove_with_reparent_moves_children_to_parent() {
    let mut scene = scene();
    let e1 = add_plain(&mut scene, "e1", None);
    let e2 = add_plain(&mut scene, "e2", Some(e1));

    let removed = scene.remove_entity(e1, true, None);

    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id(), e1);
    assert!(scene.find_entity_node(e1).is_none());
    let e2_node = scene.find_entity_node(e2).unwrap();
    assert_eq!(scene.graph().node(e2_node).unwrap().parent(), Some(scene.graph().root()));
    assert!(scene.graph().validate());
}

#[test]
fn test_parent_hint_skips_search() {
    let mut scene = scene();
    let parent = add_plain(&mut scene, "parent", None);
    let parent_node = scene.find_entity_node(parent).unwrap();

    let child = scene.create_entity("child");
    let child_id = child.id();
    let node = scene.add_entity(child, Some(parent), Some(parent_node));

    assert_eq!(scene.graph().node(node).unwrap().parent(), Some(parent_node));
    assert_eq!(scene.find_entity_node(child_id), Some(node));
}

#[test]
#[should_panic(expected = "is not in the scene")]
fn test_unknown_parent_panics() {
    let mut scene = scene();
    add_plain(&mut scene, "orphan", Some(EntityId(42)));
}

#[test]
#[should_panic(expected = "already in the scene")]
fn test_duplicate_entity_panics() {
    let mut scene = scene();
    scene.add_entity(Entity::new(EntityId(7), "first"), None, None);
    scene.add_entity(Entity::new(EntityId(7), "second"), None, None);
}

#[test]
#[should_panic(expected = "does not refer to entity")]
fn test_wrong_parent_hint_panics() {
    let mut scene = scene();
    let a = add_plain(&mut scene, "a", None);
    let b = add_plain(&mut scene, "b", None);
    let b_node = scene.find_entity_node(b).unwrap();
    let child = scene.create_entity("child");
    scene.add_entity(child, Some(a), Some(b_node));
}

#[test]
#[should_panic(expected = "after the graphics layout was built")]
fn test_renderable_after_build_panics() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    add_renderable(&mut scene, "first", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    scene.build_graphics(&mut library).unwrap();

    add_renderable(&mut scene, "late", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
}

#[test]
fn test_plain_entities_can_join_after_build() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    scene.build_graphics(&mut library).unwrap();

    let id = add_plain(&mut scene, "marker", None);
    assert!(scene.entity(id).is_some());
    assert!(scene.prepare_frame(0.0).is_ok());
}

#[test]
fn test_frame_before_build_fails() {
    let mut scene = scene();
    let mut allocator = HostAllocator::new();
    assert!(matches!(scene.prepare_frame(0.0), Err(SceneError::LayoutNotBuilt)));
    assert!(matches!(scene.render_frame(0, 0.0, &mut allocator), Err(SceneError::LayoutNotBuilt)));
}

#[test]
fn test_flush_before_allocation_fails() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let mut allocator = HostAllocator::new();
    add_renderable(&mut scene, "cube", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    scene.build_graphics(&mut library).unwrap();

    assert!(matches!(
        scene.render_frame(0, 0.0, &mut allocator),
        Err(SceneError::GpuBuffersNotAllocated)
    ));
}

#[test]
fn test_unknown_shared_parameters_fail_build() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let graphics = GraphicsComponent::new(RendererType::StaticMesh, "cube").with_shared_parameters("missing");
    add_renderable(&mut scene, "cube", graphics, Vec3::zeros(), None);

    assert!(matches!(
        scene.build_graphics(&mut library),
        Err(SceneError::UnknownParameterSet(id)) if id == "missing"
    ));
}

#[test]
fn test_shared_key_renderables_share_a_batch() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    scene.parameters_mut().insert("metal", ParameterBlock::from_floats(&[0.5, 0.5, 0.5, 1.0]));
    for index in 0..2 {
        let graphics = GraphicsComponent::new(RendererType::StaticMesh, "cube").with_shared_parameters("metal");
        add_renderable(&mut scene, &format!("crate{index}"), graphics, Vec3::new(index as f32, 0.0, 0.0), None);
    }
    scene.build_graphics(&mut library).unwrap();
    scene.prepare_frame(0.0).unwrap();

    let storage = scene.storage(RendererType::StaticMesh).unwrap();
    assert_eq!(storage.batch_count(), 1);
    assert_eq!(storage.batches()[0].instance_count, 2);
    assert_eq!(storage.batches()[0].first_instance, 0);
    let list = scene.draw_list(RendererType::StaticMesh).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.commands()[0].instance_count, 2);
    assert_eq!(scene.write_count(RendererType::StaticMesh), 2);
}

#[test]
fn test_unchanged_frames_are_identical() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let material = scene.materials_mut().register("stone", 3);
    let ground = add_renderable(
        &mut scene,
        "ground",
        GraphicsComponent::new(RendererType::Terrain, "quad"),
        Vec3::new(0.0, -1.0, 0.0),
        None,
    );
    add_renderable(
        &mut scene,
        "rock",
        GraphicsComponent::new(RendererType::StaticMesh, "cube").with_material(material),
        Vec3::new(1.0, 0.0, 0.0),
        Some(ground),
    );
    add_renderable(&mut scene, "pond", GraphicsComponent::new(RendererType::Water, "quad"), Vec3::zeros(), None);
    scene.build_graphics(&mut library).unwrap();

    let first_stats = scene.prepare_frame(1.0).unwrap();
    let first_lists: Vec<DrawList> = RendererType::RENDERABLE
        .iter()
        .map(|renderer| scene.draw_list(*renderer).unwrap().clone())
        .collect();
    let first_staging = scene.staging().clone();

    let second_stats = scene.prepare_frame(1.0).unwrap();
    let second_lists: Vec<DrawList> = RendererType::RENDERABLE
        .iter()
        .map(|renderer| scene.draw_list(*renderer).unwrap().clone())
        .collect();

    assert_eq!(first_stats, second_stats);
    assert_eq!(first_stats.instances_written, 3);
    assert_eq!(first_lists, second_lists);
    assert_eq!(&first_staging, scene.staging());
}

#[test]
fn test_transforms_written_per_camera() {
    let mut scene = Scene::new(config().with_camera_count(2)).unwrap();
    let mut library = MeshLibrary::with_builtin_meshes();
    scene.set_camera(1, Camera::perspective(Vec3::new(10.0, 0.0, 0.0), 45.0, 1.0, 0.1, 100.0));
    add_renderable(&mut scene, "anchor", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    let id = add_renderable(
        &mut scene,
        "probe",
        GraphicsComponent::new(RendererType::StaticMesh, "cube"),
        Vec3::new(1.0, 2.0, 3.0),
        None,
    );
    scene.build_graphics(&mut library).unwrap();
    scene.prepare_frame(0.0).unwrap();

    let info = scene.graphics_info().unwrap();
    let base = info.offsets(RendererType::StaticMesh).transform.unwrap();
    let offset = (base + slot_of(&scene, id)) as usize * 64;
    let world = *scene.entity(id).unwrap().world_matrix();
    assert_eq!(scene.staging().transforms.len(), 2);
    for (camera, region) in scene.cameras().iter().zip(&scene.staging().transforms) {
        let expected = camera.view_projection() * world;
        assert_relative_eq!(read_matrix(region.as_bytes(), offset), expected, epsilon = 1e-6);
    }
}

#[test]
fn test_parameters_embed_world_matrix() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    scene.parameters_mut().insert("tint", ParameterBlock::from_floats(&[0.1, 0.2, 0.3, 0.4]));
    let own = add_renderable(
        &mut scene,
        "own",
        GraphicsComponent::new(RendererType::StaticMesh, "cube")
            .with_instance_parameters(ParameterBlock::from_floats(&[1.0, 2.0, 3.0, 4.0])),
        Vec3::new(5.0, 0.0, 0.0),
        None,
    );
    let shared = add_renderable(
        &mut scene,
        "shared",
        GraphicsComponent::new(RendererType::StaticMesh, "quad").with_shared_parameters("tint"),
        Vec3::new(0.0, 5.0, 0.0),
        None,
    );
    scene.build_graphics(&mut library).unwrap();
    scene.prepare_frame(0.0).unwrap();

    let stride = RendererType::StaticMesh.info().parameter_size as usize;
    let base = scene.graphics_info().unwrap().offsets(RendererType::StaticMesh).parameter.unwrap();
    let bytes = scene.staging().parameters.as_bytes();

    let start = (base + slot_of(&scene, own)) as usize * stride;
    assert_relative_eq!(translation_of(&read_matrix(bytes, start)), Vec3::new(5.0, 0.0, 0.0));
    assert_eq!(read_floats(bytes, start + 64, 4), vec![1.0, 2.0, 3.0, 4.0]);

    let start = (base + slot_of(&scene, shared)) as usize * stride;
    assert_relative_eq!(translation_of(&read_matrix(bytes, start)), Vec3::new(0.0, 5.0, 0.0));
    assert_eq!(read_floats(bytes, start + 64, 4), vec![0.1, 0.2, 0.3, 0.4]);
}

#[test]
fn test_oversized_parameter_block_fails_the_frame() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    add_renderable(
        &mut scene,
        "bloated",
        GraphicsComponent::new(RendererType::StaticMesh, "cube")
            .with_instance_parameters(ParameterBlock::from_floats(&[0.0; 5])),
        Vec3::zeros(),
        None,
    );
    scene.build_graphics(&mut library).unwrap();

    assert!(matches!(
        scene.prepare_frame(0.0),
        Err(SceneError::Render(RenderError::ParameterBlockTooLarge { len: 20, available: 16, .. }))
    ));
}

#[test]
fn test_failed_frame_is_not_flushed() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let mut allocator = HostAllocator::new();
    add_renderable(&mut scene, "first", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    let second = add_renderable(
        &mut scene,
        "second",
        GraphicsComponent::new(RendererType::StaticMesh, "cube"),
        Vec3::new(2.0, 0.0, 0.0),
        None,
    );
    scene.build_graphics(&mut library).unwrap();
    let gpu = scene.allocate_gpu_buffers(&mut allocator).unwrap();

    assert!(matches!(scene.flush(0, &mut allocator), Err(SceneError::FrameNotPrepared)));

    scene.render_frame(0, 0.0, &mut allocator).unwrap();
    let before = allocator.contents(gpu.transform).unwrap().to_vec();

    let entity = scene.entity_mut(second).unwrap();
    entity.transform.position = Vec3::new(-4.0, 1.0, 0.0);
    entity.graphics.as_mut().unwrap().instance_parameters = Some(ParameterBlock::from_floats(&[0.0; 5]));
    assert!(scene.prepare_frame(0.0).is_err());

    assert!(matches!(scene.flush(0, &mut allocator), Err(SceneError::FrameNotPrepared)));
    assert!(matches!(scene.render_frame(0, 0.0, &mut allocator), Err(SceneError::Render(_))));
    assert_eq!(allocator.contents(gpu.transform).unwrap(), before.as_slice());

    scene.entity_mut(second).unwrap().graphics.as_mut().unwrap().instance_parameters = None;
    scene.prepare_frame(0.0).unwrap();
    assert_eq!(scene.flush(0, &mut allocator).unwrap(), 0);
    assert_ne!(allocator.contents(gpu.transform).unwrap(), before.as_slice());
}

#[test]
fn test_material_element_written() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    scene.materials_mut().register("unused", 0);
    let glass = scene.materials_mut().register("glass", 0b101);
    let id = add_renderable(
        &mut scene,
        "window",
        GraphicsComponent::new(RendererType::StaticMesh, "quad").with_material(glass),
        Vec3::zeros(),
        None,
    );
    scene.build_graphics(&mut library).unwrap();
    scene.prepare_frame(0.0).unwrap();

    let base = scene.graphics_info().unwrap().offsets(RendererType::StaticMesh).material.unwrap();
    let start = (base + slot_of(&scene, id)) as usize * 16;
    let element: [u32; 4] = bytemuck::pod_read_unaligned(&scene.staging().materials.as_bytes()[start..start + 16]);
    assert_eq!(element, [1, 0b101, 0, 0]);
}

#[test]
fn test_water_is_drawn_back_to_front() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    for (name, z) in [("near", 0.0), ("far", -20.0), ("nearest", 5.0)] {
        add_renderable(&mut scene, name, GraphicsComponent::new(RendererType::Water, "quad"), Vec3::new(0.0, 0.0, z), None);
    }
    scene.build_graphics(&mut library).unwrap();
    scene.prepare_frame(0.0).unwrap();

    let list = scene.draw_list(RendererType::Water).unwrap();
    assert_eq!(list.len(), 3);
    let distances = list.distances();
    assert_relative_eq!(distances[0], 30.0, epsilon = 1e-4);
    assert_relative_eq!(distances[1], 10.0, epsilon = 1e-4);
    assert_relative_eq!(distances[2], 5.0, epsilon = 1e-4);
    let order: Vec<u32> = list.commands().iter().map(|command| command.first_instance).collect();
    assert_eq!(order, vec![1, 0, 2]);
}

#[test]
fn test_behaviors_move_children_with_parents() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let mover = scene.create_entity("mover").with_behavior_fn(|transform, context| {
        transform.position.x = context.elapsed;
    });
    let mover_id = mover.id();
    scene.add_entity(mover, None, None);
    let child = add_renderable(
        &mut scene,
        "rider",
        GraphicsComponent::new(RendererType::Light, "cube"),
        Vec3::new(0.0, 1.0, 0.0),
        Some(mover_id),
    );
    scene.build_graphics(&mut library).unwrap();

    scene.prepare_frame(2.0).unwrap();
    assert_relative_eq!(translation_of(scene.entity(child).unwrap().world_matrix()), Vec3::new(2.0, 1.0, 0.0));

    scene.prepare_frame(3.5).unwrap();
    assert_relative_eq!(translation_of(scene.entity(child).unwrap().world_matrix()), Vec3::new(3.5, 1.0, 0.0));
}

#[test]
fn test_removed_renderables_leave_the_draw_lists() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let parent = add_renderable(&mut scene, "parent", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    add_renderable(&mut scene, "child", GraphicsComponent::new(RendererType::StaticMesh, "quad"), Vec3::zeros(), Some(parent));
    let keep = add_renderable(&mut scene, "keep", GraphicsComponent::new(RendererType::StaticMesh, "quad"), Vec3::zeros(), None);
    scene.build_graphics(&mut library).unwrap();

    let removed = scene.remove_entity(parent, false, None);
    assert_eq!(removed.len(), 2);
    assert!(removed.iter().all(|entity| entity.graphics.as_ref().unwrap().instance().is_none()));

    let stats = scene.prepare_frame(0.0).unwrap();
    let storage = scene.storage(RendererType::StaticMesh).unwrap();
    assert_eq!(storage.instance_count(), 1);
    assert_eq!(storage.instances(), &[keep]);
    assert_eq!(stats.instances_written, 1);
    assert_eq!(scene.draw_list(RendererType::StaticMesh).unwrap().instance_count(), 1);
    assert_eq!(slot_of(&scene, keep), 0);
}

#[test]
fn test_flush_targets_frame_slot() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let mut allocator = HostAllocator::new();
    add_renderable(&mut scene, "cube", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::new(0.0, 0.0, -5.0), None);
    scene.build_graphics(&mut library).unwrap();
    let gpu = scene.allocate_gpu_buffers(&mut allocator).unwrap();

    let stats = scene.render_frame(3, 0.0, &mut allocator).unwrap();
    assert_eq!(stats.instances_written, 1);

    let info = scene.graphics_info().unwrap();
    assert_eq!(info.frame_slot(3), 1);
    for kind in BufferKind::ALL {
        let size = info.layout(kind).total_size() as usize;
        let contents = allocator.contents(gpu.buffer(kind)).unwrap();
        let written = info.slice_offset(kind, 1, 0) as usize;
        let staged = scene.staging().region(kind, 0).unwrap().as_bytes();
        assert_eq!(&contents[written..written + size], staged);
        assert!(contents[..size].iter().all(|byte| *byte == 0));
    }
}

#[test]
fn test_buffers_are_sized_for_every_frame_slot() {
    let mut scene = Scene::new(config().with_frames_in_flight(3).with_shadow_replica(true)).unwrap();
    let mut library = MeshLibrary::with_builtin_meshes();
    let mut allocator = HostAllocator::new();
    add_renderable(&mut scene, "cube", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    scene.build_graphics(&mut library).unwrap();
    let gpu = scene.allocate_gpu_buffers(&mut allocator).unwrap();

    let info = scene.graphics_info().unwrap();
    assert_eq!(info.num_frame_indices(), 4);
    for kind in BufferKind::ALL {
        assert_eq!(allocator.buffer_size(gpu.buffer(kind)), Some(info.buffer_size(kind)));
    }
}

#[test]
fn test_changing_frame_indices_reallocates() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let mut allocator = HostAllocator::new();
    add_renderable(&mut scene, "cube", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    scene.build_graphics(&mut library).unwrap();
    scene.allocate_gpu_buffers(&mut allocator).unwrap();
    let live = allocator.live_buffers();

    scene.set_num_frame_indices(5, &mut allocator).unwrap();

    let gpu = scene.gpu_buffers().unwrap();
    let info = scene.graphics_info().unwrap();
    assert_eq!(allocator.live_buffers(), live);
    assert_eq!(allocator.buffer_size(gpu.transform), Some(info.buffer_size(BufferKind::Transform)));
    assert_eq!(info.buffer_size(BufferKind::Transform), 5 * info.frame_size(BufferKind::Transform));
    assert!(scene.render_frame(9, 0.0, &mut allocator).is_ok());
}

#[test]
fn test_dynamic_vertices_follow_frame_slot() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let mut allocator = HostAllocator::new();
    add_renderable(&mut scene, "sparks", GraphicsComponent::new(RendererType::Particle, "quad"), Vec3::zeros(), None);
    scene.build_graphics(&mut library).unwrap();
    scene.allocate_gpu_buffers(&mut allocator).unwrap();

    let storage = scene.storage_mut(RendererType::Particle).unwrap();
    storage.element_buffer_mut().dynamic_vertices_mut().unwrap()[0..4].copy_from_slice(&9.0f32.to_ne_bytes());
    scene.render_frame(1, 0.0, &mut allocator).unwrap();

    let buffer = scene.storage(RendererType::Particle).unwrap().element_buffer();
    let gpu = *buffer.gpu_buffers().unwrap();
    let contents = allocator.contents(gpu.vertices).unwrap();
    let slot_one = buffer.vertex_offset(1) as usize;
    assert_eq!(read_floats(contents, slot_one, 1), vec![9.0]);
    assert_ne!(read_floats(contents, 0, 1), vec![9.0]);
}

#[test]
fn test_bindings_cover_one_frame_slice() {
    let mut scene = scene();
    let mut library = MeshLibrary::with_builtin_meshes();
    let mut allocator = HostAllocator::new();
    let mut bindings = HostBindings::new();
    add_renderable(&mut scene, "cube", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    scene.build_graphics(&mut library).unwrap();

    assert!(matches!(scene.create_bindings(&mut bindings), Err(SceneError::GpuBuffersNotAllocated)));
    let gpu = scene.allocate_gpu_buffers(&mut allocator).unwrap();
    let set = scene.create_bindings(&mut bindings).unwrap();

    let info = scene.graphics_info().unwrap();
    for kind in BufferKind::ALL {
        let range = bindings.bound_range(set, kind.binding()).unwrap();
        assert_eq!(range.buffer, gpu.buffer(kind));
        assert_eq!(range.offset, 0);
        assert_eq!(range.size, info.layout(kind).total_size());
    }
}

#[test]
fn test_record_draws_binds_slot_offsets() {
    let mut scene = Scene::new(config().with_camera_count(2)).unwrap();
    let mut library = MeshLibrary::with_builtin_meshes();
    let mut allocator = HostAllocator::new();
    let mut bindings = HostBindings::new();
    add_renderable(&mut scene, "a", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    add_renderable(&mut scene, "b", GraphicsComponent::new(RendererType::StaticMesh, "cube"), Vec3::zeros(), None);
    add_renderable(&mut scene, "c", GraphicsComponent::new(RendererType::StaticMesh, "quad"), Vec3::zeros(), None);
    add_renderable(&mut scene, "sun", GraphicsComponent::new(RendererType::Light, "quad"), Vec3::zeros(), None);
    scene.build_graphics(&mut library).unwrap();
    scene.allocate_gpu_buffers(&mut allocator).unwrap();
    let set = scene.create_bindings(&mut bindings).unwrap();
    scene.render_frame(5, 0.0, &mut allocator).unwrap();

    let mut recorder = RecordingDrawRecorder::new();
    let recorded = record_draws(&scene, RendererType::StaticMesh, 5, 1, set, &mut recorder).unwrap();

    let info = scene.graphics_info().unwrap();
    let expected_offsets: Vec<u32> = BufferKind::ALL
        .iter()
        .map(|kind| info.slice_offset(*kind, 1, 1) as u32)
        .collect();
    assert_eq!(recorded, 2);
    assert_eq!(recorder.calls[0], RecordedCall::Bind { set, offsets: expected_offsets });
    assert_eq!(
        recorder.calls[1],
        RecordedCall::ElementOffsets(info.offsets(RendererType::StaticMesh).as_push_constants())
    );
    let instances: Vec<u32> = recorder.draws().map(|command| command.instance_count).collect();
    assert_eq!(instances, vec![2, 1]);
}
