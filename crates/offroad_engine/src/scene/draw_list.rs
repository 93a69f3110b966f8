//! Draw list with shader batching
//!
//! Drawables are kept sorted so that opaque objects come first and objects
//! sharing a shader are adjacent, which lets a pass bind each program once.
//! Ordering is stable, so objects keep their scene order within a batch.

use super::drawable::Drawable;
use crate::assets::ShaderHandle;

/// A run of complete drawables sharing one shader
#[derive(Debug)]
pub struct ShaderBatch<'a> {
    /// Shader used by all drawables in this batch
    pub shader: ShaderHandle,

    /// Drawables in this batch
    pub drawables: Vec<&'a Drawable>,
}

impl ShaderBatch<'_> {
    /// Get the number of drawables in this batch
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// True for an empty batch
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}

/// Ordered collection of drawables consumed once per pass
#[derive(Debug, Default)]
pub struct DrawList {
    drawables: Vec<Drawable>,
}

impl DrawList {
    /// Create an empty draw list
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a drawable, keeping the batch ordering
    pub fn push(&mut self, drawable: Drawable) {
        let key = sort_key(&drawable);
        let at = self.drawables.partition_point(|d| sort_key(d) <= key);
        self.drawables.insert(at, drawable);
    }

    /// Number of drawables, complete or not
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// True when the list holds nothing
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// All drawables in draw order
    pub fn iter(&self) -> impl Iterator<Item = &Drawable> {
        self.drawables.iter()
    }

    /// Look a drawable up by name
    pub fn find(&self, name: &str) -> Option<&Drawable> {
        self.drawables.iter().find(|d| d.name == name)
    }

    /// Number of drawables missing a mesh or shader
    pub fn incomplete_count(&self) -> usize {
        self.drawables.iter().filter(|d| !d.is_complete()).count()
    }

    /// Complete drawables grouped by shader, opaque batches first
    pub fn shader_batches(&self) -> Vec<ShaderBatch<'_>> {
        let mut batches: Vec<ShaderBatch<'_>> = Vec::new();
        for drawable in self.drawables.iter().filter(|d| d.is_complete()) {
            let Some(shader) = drawable.shader else { continue };
            match batches.last_mut() {
                Some(batch) if batch.shader == shader
                    && batch.drawables.last().map(|d| d.transparent) == Some(drawable.transparent) =>
                {
                    batch.drawables.push(drawable);
                }
                _ => batches.push(ShaderBatch {
                    shader,
                    drawables: vec![drawable],
                }),
            }
        }
        batches
    }
}

impl FromIterator<Drawable> for DrawList {
    fn from_iter<I: IntoIterator<Item = Drawable>>(iter: I) -> Self {
        let mut list = DrawList::new();
        for drawable in iter {
            list.push(drawable);
        }
        list
    }
}

fn sort_key(drawable: &Drawable) -> (bool, Option<ShaderHandle>) {
    (drawable.transparent, drawable.shader)
}
