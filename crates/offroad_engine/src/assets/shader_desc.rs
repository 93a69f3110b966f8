//! XML shader description parser
//!
//! ```xml
//! <shaders>
//!   <shader type="vertex"><![CDATA[ ... ]]></shader>
//!   <shader type="pixel"><![CDATA[ ... ]]></shader>
//!   <attribute unit="0" name="position"/>
//! </shaders>
//! ```
//!
//! `type` is `vertex`, `pixel` or `fragment`. When a stage appears twice the
//! later block replaces the earlier one. An `attribute` without a usable
//! `unit` or `name` is skipped with a warning.

use super::MalformedKind;
use crate::gpu::ShaderStage;
use std::path::Path;

/// Explicit attribute-location binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeBinding {
    /// Attribute location
    pub unit: u32,
    /// Identifier in the vertex source
    pub name: String,
}

/// Parsed shader description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDescription {
    /// Vertex stage source
    pub vertex_source: String,
    /// Fragment stage source
    pub fragment_source: String,
    /// Well-formed attribute bindings, in document order
    pub attributes: Vec<AttributeBinding>,
    /// Number of `attribute` elements that were ignored
    pub skipped_attributes: usize,
}

impl ShaderDescription {
    /// Parse a description; `origin` is only used in log messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, MalformedKind> {
        let doc = roxmltree::Document::parse(text)
            .map_err(|e| MalformedKind::Structure(format!("invalid shader XML: {}", e)))?;

        let mut vertex_source = None;
        let mut fragment_source = None;
        let mut attributes = Vec::new();
        let mut skipped_attributes = 0;

        for node in doc.descendants().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "shader" => {
                    let slot = match node.attribute("type") {
                        Some("vertex") => &mut vertex_source,
                        Some("pixel") | Some("fragment") => &mut fragment_source,
                        other => {
                            log::warn!(
                                "{}: ignoring shader block with type {:?}",
                                origin.display(),
                                other
                            );
                            continue;
                        }
                    };
                    *slot = Some(element_text(node));
                }
                "attribute" => {
                    let unit = node.attribute("unit").and_then(|u| u.trim().parse::<u32>().ok());
                    match (unit, node.attribute("name")) {
                        (Some(unit), Some(name)) if !name.trim().is_empty() => {
                            attributes.push(AttributeBinding {
                                unit,
                                name: name.trim().to_owned(),
                            });
                        }
                        _ => {
                            log::warn!(
                                "{}: attribute incorrectly specified, skipping",
                                origin.display()
                            );
                            skipped_attributes += 1;
                        }
                    }
                }
                _ => {}
            }
        }

        let vertex_source = vertex_source
            .filter(|s| !s.trim().is_empty())
            .ok_or(MalformedKind::MissingStage(ShaderStage::Vertex))?;
        let fragment_source = fragment_source
            .filter(|s| !s.trim().is_empty())
            .ok_or(MalformedKind::MissingStage(ShaderStage::Fragment))?;

        Ok(Self {
            vertex_source,
            fragment_source,
            attributes,
            skipped_attributes,
        })
    }
}

// Text and CDATA children joined into one source string
fn element_text(node: roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
