//! Shader program construction
//!
//! Compiles the vertex stage, then the fragment stage, attaches both, binds
//! the declared attribute locations and links. Any device object created on
//! the way is deleted again when a later step fails.

use std::path::Path;

use super::resources::ShaderProgram;
use super::shader_desc::ShaderDescription;
use super::{AssetError, AssetResult};
use crate::gpu::{GraphicsDevice, ShaderStage, ShaderStageId};

/// Build a linked program from a parsed description
pub fn build_program(
    device: &mut dyn GraphicsDevice,
    desc: &ShaderDescription,
    path: &Path,
) -> AssetResult<ShaderProgram> {
    let vertex = compile_stage(device, ShaderStage::Vertex, &desc.vertex_source, path)?;
    let fragment = match compile_stage(device, ShaderStage::Fragment, &desc.fragment_source, path) {
        Ok(stage) => stage,
        Err(e) => {
            device.delete_shader_stage(vertex);
            return Err(e);
        }
    };

    let program = match device.create_program() {
        Ok(program) => program,
        Err(e) => {
            device.delete_shader_stage(vertex);
            device.delete_shader_stage(fragment);
            return Err(e.into());
        }
    };

    device.attach_shader_stage(program, vertex);
    device.attach_shader_stage(program, fragment);
    for binding in &desc.attributes {
        device.bind_attribute_location(program, binding.unit, &binding.name);
    }

    if let Err(log) = device.link_program(program) {
        log::error!("Failed to link shader {}:\n{}", path.display(), log);
        device.delete_program(program);
        device.delete_shader_stage(vertex);
        device.delete_shader_stage(fragment);
        return Err(AssetError::LinkFailure {
            path: path.to_path_buf(),
            log,
        });
    }

    Ok(ShaderProgram {
        vertex,
        fragment,
        program,
        attributes: desc.attributes.clone(),
    })
}

fn compile_stage(
    device: &mut dyn GraphicsDevice,
    stage: ShaderStage,
    source: &str,
    path: &Path,
) -> AssetResult<ShaderStageId> {
    let id = device.create_shader_stage(stage, source)?;
    match device.compile_shader_stage(id) {
        Ok(()) => Ok(id),
        Err(log) => {
            log::error!("Failed to compile {} shader {}:\n{}", stage, path.display(), log);
            device.delete_shader_stage(id);
            Err(AssetError::CompileFailure {
                path: path.to_path_buf(),
                stage,
                log,
            })
        }
    }
}
