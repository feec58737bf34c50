//! Binding of spawned VRM scenes to humanoid rigs, and the [`RigHandle`] seam
//! used by the live rigger and the face smoother.

use std::sync::atomic::{AtomicU64, Ordering};

use bevy::prelude::*;
use bevy::utils::HashMap;
use bevy_clip_retarget::prelude::TargetSkeleton;
use serde::{Deserialize, Serialize};

use crate::face::{ExpressionPreset, ExpressionWeights, LookAt};
use crate::humanoid::{HumanoidBone, NodeMatch};

/// Identity of one bound rig. Rebinding a scene always yields a new id.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RigId(u64);

impl RigId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Serialize, Deserialize, Reflect, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrmVersion {
    #[default]
    #[serde(rename = "0")]
    V0,
    #[serde(rename = "1")]
    V1,
}

impl VrmVersion {
    /// Sign applied to the x and z euler axes before rotating a bone.
    ///
    /// VRM 1.0 rigs face the opposite direction, which mirrors pitch and roll.
    pub fn axis_sign(self) -> f32 {
        match self {
            VrmVersion::V0 => 1.0,
            VrmVersion::V1 => -1.0,
        }
    }
}

/// A rig the live rigger and face smoother can write to.
pub trait RigHandle {
    fn rig_id(&self) -> RigId;

    fn version(&self) -> VrmVersion;

    /// `None` when the rig has no such bone.
    fn bone_rotation(&self, bone: HumanoidBone) -> Option<Quat>;

    fn set_bone_rotation(&mut self, bone: HumanoidBone, rotation: Quat);

    fn bone_position(&self, bone: HumanoidBone) -> Option<Vec3>;

    fn set_bone_position(&mut self, bone: HumanoidBone, position: Vec3);

    fn expression(&self, preset: ExpressionPreset) -> f32;

    fn set_expression(&mut self, preset: ExpressionPreset, weight: f32);

    fn apply_yaw_pitch(&mut self, yaw: f32, pitch: f32);
}

/// Marks a freshly spawned VRM scene root whose bones are not bound yet.
#[derive(Component, Reflect, Default, Debug, Clone, Copy)]
pub struct PendingRig {
    pub version: VrmVersion,
}

/// Humanoid bones and named nodes found under a VRM scene root.
#[derive(Component, Debug, Clone)]
pub struct HumanoidRig {
    id: RigId,
    version: VrmVersion,
    bones: HashMap<HumanoidBone, Entity>,
    nodes: HashMap<String, Entity>,
}

impl HumanoidRig {
    pub fn new(
        version: VrmVersion,
        bones: HashMap<HumanoidBone, Entity>,
        nodes: HashMap<String, Entity>,
    ) -> Self {
        Self {
            id: RigId::next(),
            version,
            bones,
            nodes,
        }
    }

    pub fn id(&self) -> RigId {
        self.id
    }

    pub fn version(&self) -> VrmVersion {
        self.version
    }

    pub fn bone(&self, bone: HumanoidBone) -> Option<Entity> {
        self.bones.get(&bone).copied()
    }

    pub fn bones(&self) -> impl Iterator<Item = (HumanoidBone, Entity)> + '_ {
        self.bones.iter().map(|(bone, entity)| (*bone, *entity))
    }

    /// Any named node under the rig, looked up by its scene name.
    pub fn node(&self, name: &str) -> Option<Entity> {
        self.nodes.get(name).copied()
    }
}

impl TargetSkeleton for HumanoidRig {
    fn contains_bone(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }
}

pub(crate) fn bind_humanoid_rigs(
    mut commands: Commands,
    q_pending: Query<(Entity, &PendingRig)>,
    q_children: Query<&Children>,
    q_names: Query<&Name>,
) {
    for (entity, pending) in q_pending.iter() {
        let mut bones = HashMap::default();
        let mut nodes = HashMap::default();

        for descendant in q_children.iter_descendants(entity) {
            let Ok(name) = q_names.get(descendant) else {
                continue;
            };
            nodes.insert(name.to_string(), descendant);

            match HumanoidBone::from_node_name(name.as_str()) {
                Some(NodeMatch::Normalized(bone)) => {
                    bones.insert(bone, descendant);
                }
                Some(NodeMatch::Vroid(bone)) => {
                    bones.entry(bone).or_insert(descendant);
                }
                None => {}
            }
        }

        // Scene children show up a frame after the scene itself.
        if bones.is_empty() {
            continue;
        }

        let rig = HumanoidRig::new(pending.version, bones, nodes);
        info!(
            "Bound rig {:?} ({:?}) with {} humanoid bones and {} nodes.",
            rig.id(),
            rig.version(),
            rig.bones.len(),
            rig.nodes.len()
        );

        commands
            .entity(entity)
            .remove::<PendingRig>()
            .insert((rig, ExpressionWeights::default(), LookAt::default()));
    }
}

/// [`RigHandle`] over a bound rig's bone transforms and expression components.
pub struct EcsRig<'a, 'w, 's, 't> {
    pub rig: &'a HumanoidRig,
    pub transforms: &'a mut Query<'w, 's, &'t mut Transform>,
    pub expressions: &'a mut ExpressionWeights,
    pub look_at: &'a mut LookAt,
}

impl RigHandle for EcsRig<'_, '_, '_, '_> {
    fn rig_id(&self) -> RigId {
        self.rig.id()
    }

    fn version(&self) -> VrmVersion {
        self.rig.version()
    }

    fn bone_rotation(&self, bone: HumanoidBone) -> Option<Quat> {
        let entity = self.rig.bone(bone)?;
        self.transforms.get(entity).ok().map(|t| t.rotation)
    }

    fn set_bone_rotation(&mut self, bone: HumanoidBone, rotation: Quat) {
        let Some(entity) = self.rig.bone(bone) else {
            return;
        };
        if let Ok(mut transform) = self.transforms.get_mut(entity) {
            transform.rotation = rotation;
        }
    }

    fn bone_position(&self, bone: HumanoidBone) -> Option<Vec3> {
        let entity = self.rig.bone(bone)?;
        self.transforms.get(entity).ok().map(|t| t.translation)
    }

    fn set_bone_position(&mut self, bone: HumanoidBone, position: Vec3) {
        let Some(entity) = self.rig.bone(bone) else {
            return;
        };
        if let Ok(mut transform) = self.transforms.get_mut(entity) {
            transform.translation = position;
        }
    }

    fn expression(&self, preset: ExpressionPreset) -> f32 {
        self.expressions.get(preset)
    }

    fn set_expression(&mut self, preset: ExpressionPreset, weight: f32) {
        self.expressions.set(preset, weight);
    }

    fn apply_yaw_pitch(&mut self, yaw: f32, pitch: f32) {
        self.look_at.yaw = yaw;
        self.look_at.pitch = pitch;
    }
}
