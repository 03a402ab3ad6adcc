//! Finite-value checks run before a document is rendered.
//!
//! `serde_json` writes NaN and infinities as `null`, so these have to be caught
//! before rendering rather than after.

use crate::document::{BaseColor, Bone, CustomProperty, Document, ScalarInput, ScalarProperty};
use crate::error::SerializationError;

/// Ensure every float in `doc` is finite.
///
/// Returns the location of the first offending value.
pub fn ensure_finite(doc: &Document) -> Result<(), SerializationError> {
    for (i, bone) in doc.inverse_bind_poses.iter().enumerate() {
        check_bone(bone, || format!("inverse_bind_poses[{i}]"))?;
    }

    for (action, data) in &doc.bone_space_actions {
        for (joint, keyframes) in &data.bone_keyframes.keyframes {
            for kf in keyframes {
                check_bone(&kf.bone, || {
                    format!(
                        "bone_space_actions.{action}.keyframes.{joint} (frame {})",
                        kf.frame
                    )
                })?;
            }
        }
    }

    if let Some(bb) = &doc.bounding_box {
        check_slice(&bb.min_corner, || "bounding_box.min_corner".to_string())?;
        check_slice(&bb.max_corner, || "bounding_box.max_corner".to_string())?;
    }

    for material in &doc.materials {
        if let BaseColor::Uniform(rgb) = &material.base_color {
            check_slice(rgb, || format!("materials.{}.base_color", material.name))?;
        }
        for (field, input) in [("roughness", &material.roughness), ("metallic", &material.metallic)]
        {
            if let ScalarInput::Uniform(v) = input {
                check_slice(&[*v], || format!("materials.{}.{field}", material.name))?;
            }
        }
    }

    for (key, prop) in &doc.custom_properties {
        let values: Vec<f32> = match prop {
            CustomProperty::Float(v) => vec![*v],
            CustomProperty::Vec(items) => items
                .iter()
                .filter_map(|item| match item {
                    ScalarProperty::Float(v) => Some(*v),
                    _ => None,
                })
                .collect(),
            CustomProperty::Int(_) | CustomProperty::String(_) => Vec::new(),
        };
        check_slice(&values, || format!("custom_properties.{key}"))?;
    }

    if let Some(attribs) = &doc.attribs {
        check_slice(&attribs.positions.attribute.data, || {
            "attribs.positions.attribute.data".to_string()
        })?;
        check_slice(&attribs.normals.attribute.data, || {
            "attribs.normals.attribute.data".to_string()
        })?;
        if let Some(uvs) = &attribs.uvs {
            check_slice(&uvs.attribute.data, || "attribs.uvs.attribute.data".to_string())?;
        }
        if let Some(influences) = &attribs.bone_influences {
            check_slice(&influences.bone_weights, || {
                "attribs.bone_influences.bone_weights".to_string()
            })?;
        }
    }

    Ok(())
}

fn check_bone(bone: &Bone, location: impl Fn() -> String) -> Result<(), SerializationError> {
    check_slice(bone.values(), location)
}

fn check_slice(values: &[f32], location: impl Fn() -> String) -> Result<(), SerializationError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(SerializationError::NonFiniteValue {
            location: format!("{}[{i}]", location()),
        }),
        None => Ok(()),
    }
}
