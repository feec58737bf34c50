use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Maps a bone name from the source skeleton to the target humanoid skeleton.
///
/// The mapping is deliberately allowed to be asymmetric (a source left leg may drive
/// a target right leg to undo a mirrored capture), entries are kept exactly as given.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct BoneMapping(HashMap<String, String>);

impl BoneMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target bone for a source bone, [`None`] if the source bone is intentionally unmapped.
    #[inline]
    pub fn resolve(&self, source_bone: &str) -> Option<&str> {
        self.0.get(source_bone).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for BoneMapping {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(s, t)| (s.into(), t.into()))
                .collect(),
        )
    }
}

/// Target bones whose quaternion x component has to be negated after mapping.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct InversionSet(HashSet<String>);

impl InversionSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn requires_inversion(&self, target_bone: &str) -> bool {
        self.0.contains(target_bone)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for InversionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_bone_resolves_to_none() {
        let mapping = BoneMapping::from_iter([("srcHip", "tgtHips")]);

        assert_eq!(mapping.resolve("srcHip"), Some("tgtHips"));
        assert_eq!(mapping.resolve("m_avg_L_Hand_end"), None);
        assert_eq!(mapping.resolve(""), None);
    }

    #[test]
    fn asymmetric_entries_are_preserved() {
        let mapping = BoneMapping::from_iter([
            ("m_avg_L_Hip", "J_Bip_R_UpperLeg"),
            ("m_avg_R_Hip", "J_Bip_L_UpperLeg"),
        ]);

        assert_eq!(mapping.resolve("m_avg_L_Hip"), Some("J_Bip_R_UpperLeg"));
        assert_eq!(mapping.resolve("m_avg_R_Hip"), Some("J_Bip_L_UpperLeg"));
    }

    #[test]
    fn deserializes_from_plain_json_objects() {
        let mapping: BoneMapping =
            serde_json::from_str(r#"{ "srcKnee": "tgtKnee" }"#).unwrap();
        let inversion: InversionSet = serde_json::from_str(r#"["tgtKnee"]"#).unwrap();

        assert_eq!(mapping.resolve("srcKnee"), Some("tgtKnee"));
        assert!(inversion.requires_inversion("tgtKnee"));
        assert!(inversion.requires_inversion("tgtHips") == false);
    }
}
