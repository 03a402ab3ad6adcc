//! Document assembly
//!
//! Merges a skeleton, its converted actions and an optional packed mesh into
//! one interchange [`Document`].

use rigport_shared::{BoneSpaceAction, Document};
use std::collections::BTreeMap;

use crate::mesh::PackedMesh;
use crate::skeleton::Skeleton;

/// Builder for an interchange document
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            doc: Document::named(name),
        }
    }

    /// Add the skeleton's joints, parents, inverse binds and groups
    pub fn skeleton(mut self, skeleton: &Skeleton) -> Self {
        self.doc.armature_name = Some(skeleton.name().to_string());
        self.doc.joint_indices = skeleton.joint_indices();
        self.doc.bone_child_to_parent = skeleton.parents().clone();
        self.doc.inverse_bind_poses = skeleton.inverse_bind_poses();
        self.doc.bone_groups = skeleton.groups().clone();
        self
    }

    pub fn actions(mut self, actions: BTreeMap<String, BoneSpaceAction>) -> Self {
        self.doc.bone_space_actions.extend(actions);
        self
    }

    /// Add mesh attributes, bounding box, materials and custom properties
    pub fn mesh(mut self, mesh: PackedMesh) -> Self {
        if mesh.armature_name.is_some() {
            self.doc.armature_name = mesh.armature_name;
        }
        self.doc.attribs = Some(mesh.attribs);
        self.doc.bounding_box = mesh.bounding_box;
        self.doc.materials = mesh.materials;
        self.doc.custom_properties = mesh.custom_properties;
        self
    }

    pub fn build(self) -> Document {
        self.doc
    }
}
