//! Frame pipeline scenarios against the recording device

use std::time::Duration;

use approx::assert_relative_eq;
use tempfile::TempDir;

use super::*;
use crate::assets::test_fixtures::*;
use crate::assets::{AssetCache, MeshHandle, MeshVersionPolicy, ShaderHandle, TextureHandle};
use crate::core::{PassToggles, RendererSettings};
use crate::foundation::math::{to_column_major, Mat4, Mat4Ext, Vec3};
use crate::gpu::{ClearFlags, DeviceCommand, RecordingDevice, RenderTarget, TextureId, UniformValue, Viewport};
use crate::physics::{BodyRecord, KinematicWorld, PhysicsWorld, RigidBodyId};
use crate::scene::{DrawList, Drawable, TransformSource};

struct Fixture {
    _dir: TempDir,
    device: RecordingDevice,
    cache: AssetCache,
    pipeline: FramePipeline,
    mesh: MeshHandle,
    shader: ShaderHandle,
    texture: TextureHandle,
}

impl Fixture {
    fn new(toggles: PassToggles) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let plain = write_shader(dir.path(), "plain.shader");
        let blur = write_shader(dir.path(), "blur.shader");
        let lit = write_shader(dir.path(), "lit.shader");
        let mesh_path = write_mesh(dir.path(), "quad.mesh", 32);
        let png = write_png(dir.path(), "dirt.png");

        let mut device = RecordingDevice::new();
        let mut cache = AssetCache::new(MeshVersionPolicy::default());
        let settings = RendererSettings::default().with_toggles(toggles);
        let pipeline = FramePipeline::new(&mut device, &mut cache, settings, plain, blur).unwrap();

        let mesh = cache.acquire_mesh(&mut device, mesh_path).unwrap();
        let shader = cache.acquire_shader(&mut device, lit).unwrap();
        let texture = cache.acquire_texture(&mut device, png).unwrap();
        device.clear_commands();

        Self { _dir: dir, device, cache, pipeline, mesh, shader, texture }
    }

    fn drawable(&self, name: &str, at: Vec3) -> Drawable {
        let mut drawable = Drawable::new(name, TransformSource::Static(Mat4::new_translation(&at)));
        drawable.mesh = Some(self.mesh);
        drawable.shader = Some(self.shader);
        drawable.textures[0] = Some(self.texture);
        drawable
    }

    fn body_drawable(&self, name: &str, body: RigidBodyId) -> Drawable {
        let mut drawable = Drawable::new(name, TransformSource::RigidBody(body));
        drawable.mesh = Some(self.mesh);
        drawable.shader = Some(self.shader);
        drawable
    }

    fn render(&mut self, list: &DrawList, physics: Option<&dyn PhysicsWorld>, input: FrameInput) -> FrameStats {
        self.pipeline
            .render_frame(&mut self.device, &self.cache, list, physics, input)
            .unwrap()
    }

    fn finish(mut self) {
        self.pipeline.release(&mut self.device);
        self.cache.release_all(&mut self.device);
        assert_eq!(self.device.live_object_count(), 0);
        assert_eq!(self.device.invalid_deletes(), 0);
    }
}

fn view_from(eye: Vec3) -> Mat4 {
    Mat4::look_at(eye, Vec3::zeros(), Vec3::y())
}

fn input() -> FrameInput {
    FrameInput { view: view_from(Vec3::new(0.0, 0.0, 10.0)), focus: Vec3::zeros() }
}

fn find(commands: &[DeviceCommand], from: usize, pred: impl Fn(&DeviceCommand) -> bool) -> usize {
    commands[from..]
        .iter()
        .position(pred)
        .map(|i| i + from)
        .expect("expected command not recorded")
}

fn uniform<'a>(commands: &'a [DeviceCommand], wanted: &str) -> Vec<&'a UniformValue> {
    commands
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::SetUniform(_, name, value) if name == wanted => Some(value),
            _ => None,
        })
        .collect()
}

// Texture bound on `unit` after replaying `commands`
fn bound_on(commands: &[DeviceCommand], unit: u32) -> Option<TextureId> {
    commands.iter().rev().find_map(|c| match c {
        DeviceCommand::BindTexture(u, texture) if *u == unit => Some(*texture),
        _ => None,
    })?
}

#[test]
fn test_shadow_map_is_written_before_main_pass_samples_it() {
    let mut f = Fixture::new(PassToggles::default());
    let list: DrawList = [f.drawable("car", Vec3::zeros())].into_iter().collect();

    let stats = f.render(&list, None, input());

    let shadow = f.pipeline.targets().unwrap().shadow;
    let cmds = f.device.commands();
    let bind_shadow = find(cmds, 0, |c| {
        *c == DeviceCommand::BindRenderTarget(shadow.render_target(), shadow.viewport())
    });
    let shadow_draw = find(cmds, bind_shadow, |c| matches!(c, DeviceCommand::DrawIndexed(..)));
    let bind_main = find(cmds, shadow_draw, |c| {
        matches!(c, DeviceCommand::BindRenderTarget(RenderTarget::Default, _))
    });
    let bind_depth = find(cmds, bind_main, |c| {
        *c == DeviceCommand::BindTexture(SHADOW_MAP_UNIT, Some(shadow.depth_texture()))
    });
    let main_draw = find(cmds, bind_depth, |c| matches!(c, DeviceCommand::DrawIndexed(..)));
    assert!(main_draw > bind_depth);

    // depth-only, untextured shadow pass
    let shadow_pass = &cmds[bind_shadow..shadow_draw];
    assert!(shadow_pass.contains(&DeviceCommand::SetColorMask(false)));
    assert!(shadow_pass.contains(&DeviceCommand::Clear(ClearFlags::DEPTH)));
    assert!(!shadow_pass.iter().any(|c| matches!(c, DeviceCommand::BindTexture(..))));
    assert!(cmds[bind_main..].contains(&DeviceCommand::Clear(ClearFlags::COLOR | ClearFlags::DEPTH)));

    assert_eq!(stats.objects_drawn, 1);
    assert_eq!(stats.shadow_casters, 1);
    assert_eq!(stats.passes, 2);
    f.finish();
}

#[test]
fn test_main_pass_uniform_contract() {
    let mut f = Fixture::new(PassToggles::default());
    let at = Vec3::new(1.0, 2.0, 0.0);
    let list: DrawList = [f.drawable("rock", at)].into_iter().collect();
    let frame = input();

    f.render(&list, None, frame);

    let cmds = f.device.commands();
    assert_eq!(uniform(cmds, "depth"), vec![&UniformValue::Int(SHADOW_MAP_UNIT as i32)]);
    assert_eq!(uniform(cmds, "texture4"), vec![&UniformValue::Int(4)]);

    let expected_dir = Vec3::new(0.0, 1.0, 3.0).normalize();
    match uniform(cmds, "light_dir").as_slice() {
        [UniformValue::Vec3(dir)] => assert_relative_eq!(Vec3::from(*dir), expected_dir, epsilon = 1e-6),
        other => panic!("unexpected light_dir uniforms {:?}", other),
    }

    let model = Mat4::new_translation(&at);
    let main_model_view = UniformValue::Mat4(to_column_major(&(frame.view * model)));
    assert!(uniform(cmds, "modelView").contains(&&main_model_view));
    assert_eq!(
        uniform(cmds, "bias"),
        vec![&UniformValue::Mat4(to_column_major(&Mat4::shadow_bias()))]
    );
    f.finish();
}

#[test]
fn test_shadow_toggle_off_clears_map_once_and_still_binds_it() {
    let mut f = Fixture::new(PassToggles { shadows: false, ..PassToggles::default() });
    let list: DrawList = [f.drawable("car", Vec3::zeros())].into_iter().collect();
    let shadow = f.pipeline.targets().unwrap().shadow;
    let binds_shadow = |c: &DeviceCommand| {
        matches!(c, DeviceCommand::BindRenderTarget(target, _) if *target == shadow.render_target())
    };

    let first = f.render(&list, None, input());
    f.render(&list, None, input());
    assert_eq!(f.device.commands().iter().filter(|c| binds_shadow(c)).count(), 1);
    assert_eq!(first.shadow_casters, 0);
    assert_eq!(first.passes, 1);

    let depth_binds = f
        .device
        .commands()
        .iter()
        .filter(|c| **c == DeviceCommand::BindTexture(SHADOW_MAP_UNIT, Some(shadow.depth_texture())))
        .count();
    assert_eq!(depth_binds, 2);

    // re-enabling renders the pass; disabling again clears once more
    f.device.clear_commands();
    f.pipeline.toggles_mut().shadows = true;
    f.render(&list, None, input());
    f.pipeline.toggles_mut().shadows = false;
    f.render(&list, None, input());
    f.render(&list, None, input());
    assert_eq!(f.device.commands().iter().filter(|c| binds_shadow(c)).count(), 2);
    f.finish();
}

#[test]
fn test_blur_composites_offscreen_target_with_previous_view() {
    let mut f = Fixture::new(PassToggles { blur: true, ..PassToggles::default() });
    let list: DrawList = [f.drawable("car", Vec3::zeros())].into_iter().collect();
    let offscreen = f.pipeline.targets().unwrap().offscreen;

    let first_view = view_from(Vec3::new(0.0, 0.0, 10.0));
    f.render(&list, None, FrameInput { view: first_view, focus: Vec3::zeros() });
    f.device.clear_commands();
    let stats = f.render(&list, None, FrameInput { view: view_from(Vec3::new(1.0, 0.0, 10.0)), focus: Vec3::zeros() });

    let cmds = f.device.commands();
    let bind_offscreen = find(cmds, 0, |c| {
        *c == DeviceCommand::BindRenderTarget(offscreen.render_target(), offscreen.viewport())
    });
    let main_draw = find(cmds, bind_offscreen, |c| matches!(c, DeviceCommand::DrawIndexed(..)));
    let bind_window = find(cmds, main_draw, |c| {
        matches!(c, DeviceCommand::BindRenderTarget(RenderTarget::Default, _))
    });
    let quad = find(cmds, bind_window, |c| *c == DeviceCommand::DrawFullscreenQuad);

    let composite = &cmds[bind_window..quad];
    assert!(composite.contains(&DeviceCommand::SetDepthTest(false)));
    assert!(composite.contains(&DeviceCommand::BindTexture(0, Some(offscreen.color_texture()))));
    assert!(composite.contains(&DeviceCommand::BindTexture(1, Some(offscreen.depth_texture()))));
    assert_eq!(
        uniform(cmds, "previousModelView"),
        vec![&UniformValue::Mat4(to_column_major(&first_view))]
    );
    assert_eq!(stats.passes, 3);
    f.finish();
}

#[test]
fn test_composite_inputs_are_unbound_before_next_frame_renders_into_them() {
    let mut f = Fixture::new(PassToggles { blur: true, ..PassToggles::default() });
    let mut bare = f.drawable("fence", Vec3::zeros());
    bare.textures[0] = None;
    let list: DrawList = [bare].into_iter().collect();
    let (shadow, offscreen) = {
        let targets = f.pipeline.targets().unwrap();
        (targets.shadow, targets.offscreen)
    };

    f.render(&list, None, input());
    f.render(&list, None, input());

    let cmds = f.device.commands();
    let binds_shadow = |c: &DeviceCommand| {
        matches!(c, DeviceCommand::BindRenderTarget(t, _) if *t == shadow.render_target())
    };
    let second_shadow = cmds
        .iter()
        .enumerate()
        .filter(|(_, c)| binds_shadow(c))
        .nth(1)
        .map(|(i, _)| i)
        .expect("second shadow pass");
    let shadow_draw = find(cmds, second_shadow, |c| matches!(c, DeviceCommand::DrawIndexed(..)));
    let bind_offscreen = find(cmds, shadow_draw, |c| {
        *c == DeviceCommand::BindRenderTarget(offscreen.render_target(), offscreen.viewport())
    });
    let main_draw = find(cmds, bind_offscreen, |c| matches!(c, DeviceCommand::DrawIndexed(..)));

    // writing the shadow map while it is still a sampler input
    assert_eq!(bound_on(&cmds[..shadow_draw], SHADOW_MAP_UNIT), None);
    // writing the off-screen target while it is still a sampler input
    assert_eq!(bound_on(&cmds[..main_draw], 0), None);
    assert_eq!(bound_on(&cmds[..main_draw], 1), None);
    assert_eq!(
        bound_on(&cmds[..main_draw], SHADOW_MAP_UNIT),
        Some(shadow.depth_texture())
    );

    // and nothing stays bound once the frame is over
    for unit in 0..8 {
        assert_eq!(bound_on(cmds, unit), None, "unit {} left bound", unit);
    }
    f.finish();
}

#[test]
fn test_frustum_culling_skips_box_beyond_far_plane() {
    let mut f = Fixture::new(PassToggles::default());
    let list: DrawList = [
        f.drawable("near", Vec3::zeros()),
        f.drawable("far", Vec3::new(0.0, 0.0, -10_000.0)),
    ]
    .into_iter()
    .collect();

    let stats = f.render(&list, None, input());
    assert_eq!(stats.objects_drawn, 1);
    assert_eq!(stats.objects_culled, 1);
    assert_eq!(stats.shadow_casters, 2);

    f.pipeline.toggles_mut().frustum_culling = false;
    let stats = f.render(&list, None, input());
    assert_eq!(stats.objects_drawn, 2);
    assert_eq!(stats.objects_culled, 0);
    f.finish();
}

#[test]
fn test_incomplete_and_unplaced_drawables_are_skipped() {
    let mut f = Fixture::new(PassToggles::default());
    let mut shader_only = Drawable::new("sign", TransformSource::Static(Mat4::identity()));
    shader_only.shader = Some(f.shader);
    let body_driven = f.body_drawable("car", RigidBodyId(0));
    let list: DrawList = [f.drawable("rock", Vec3::zeros()), shader_only, body_driven]
        .into_iter()
        .collect();

    let stats = f.render(&list, None, input());

    assert_eq!(stats.objects_drawn, 1);
    assert_eq!(stats.shadow_casters, 1);
    assert_eq!(stats.incomplete_skipped, 1);
    assert_eq!(stats.unplaced_skipped, 1);
    f.finish();
}

#[test]
fn test_shared_shader_is_bound_once_in_main_pass() {
    let mut f = Fixture::new(PassToggles { shadows: false, ..PassToggles::default() });
    let list: DrawList = (0..4)
        .map(|i| f.drawable(&format!("tree{}", i), Vec3::new(i as f32, 0.0, 0.0)))
        .collect();

    let stats = f.render(&list, None, input());

    let program_binds = f
        .device
        .commands()
        .iter()
        .filter(|c| matches!(c, DeviceCommand::UseProgram(Some(_))))
        .count();
    assert_eq!(program_binds, 1);
    assert_eq!(uniform(f.device.commands(), "proj").len(), 1);
    assert_eq!(stats.objects_drawn, 4);
    f.finish();
}

#[test]
fn test_body_transform_and_debug_overlay() {
    let mut f = Fixture::new(PassToggles { debug_draw: true, ..PassToggles::default() });
    let mut world = KinematicWorld::new();
    let body = world.add_body(BodyRecord {
        name: "car".to_string(),
        position: [0.0, 0.0, 1.0],
        velocity: [1.0, 0.0, 0.0],
        ..BodyRecord::default()
    });
    let list: DrawList = [f.body_drawable("car", body)].into_iter().collect();

    // 77 ms of real time is 0.11 s simulated: six fixed 1/60 s steps
    let substeps = f.pipeline.advance(&mut world, Duration::from_millis(77));
    assert_eq!(substeps, 6);

    let frame = input();
    let stats = f.render(&list, Some(&world as &dyn PhysicsWorld), frame);

    let model = Mat4::new_translation(&Vec3::new(0.1, 0.0, 1.0));
    let model_view = to_column_major(&(frame.view * model));
    let recorded = uniform(f.device.commands(), "model");
    match recorded.as_slice() {
        [UniformValue::Mat4(m)] => {
            assert_relative_eq!(m[12], 0.1, epsilon = 1e-4);
            assert_relative_eq!(m[14], 1.0, epsilon = 1e-6);
        }
        other => panic!("unexpected model uniforms {:?}", other),
    }
    assert!(uniform(f.device.commands(), "modelView").iter().any(|v| match v {
        UniformValue::Mat4(m) => m.iter().zip(model_view.iter()).all(|(a, b)| (a - b).abs() < 1e-3),
        _ => false,
    }));

    assert_eq!(stats.objects_drawn, 1);
    assert_eq!(stats.debug_lines, 12);
    assert_eq!(stats.passes, 3);
    assert!(f.device.commands().contains(&DeviceCommand::DrawLines(12)));
    f.finish();
}

#[test]
fn test_resize_keeps_offscreen_targets() {
    let mut f = Fixture::new(PassToggles::default());
    let list: DrawList = [f.drawable("car", Vec3::zeros())].into_iter().collect();

    f.pipeline.resize(1280, 720);
    f.render(&list, None, input());

    let cmds = f.device.commands();
    assert!(!cmds.iter().any(|c| matches!(c, DeviceCommand::CreateTexture(..))));
    assert!(cmds.contains(&DeviceCommand::BindRenderTarget(RenderTarget::Default, Viewport::sized(1280, 720))));
    let shadow = f.pipeline.targets().unwrap().shadow;
    assert_eq!(shadow.viewport(), Viewport::sized(1024, 1024));
    assert_eq!(f.pipeline.camera(Vec3::zeros()).aspect, 1280.0 / 720.0);
    f.finish();
}

#[test]
fn test_missing_builtin_shader_fails_pipeline_creation() {
    let dir = tempfile::tempdir().unwrap();
    let plain = write_shader(dir.path(), "plain.shader");
    let mut device = RecordingDevice::new();
    let mut cache = AssetCache::new(MeshVersionPolicy::default());

    let err = FramePipeline::new(
        &mut device,
        &mut cache,
        RendererSettings::default(),
        plain,
        dir.path().join("blur.shader"),
    )
    .unwrap_err();

    assert!(matches!(err, RenderError::Asset(crate::assets::AssetError::NotFound { .. })));
    cache.release_all(&mut device);
    assert_eq!(device.live_object_count(), 0);
}
