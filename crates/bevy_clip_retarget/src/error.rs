use thiserror::Error;

/// A single track that cannot be interpreted.
///
/// Only the offending track is rejected, the rest of the clip keeps going.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedTrackError {
    /// Track name does not follow the `bone.channel` convention.
    #[error("Track name `{0}` is not in the form `bone.channel`")]
    ChannelName(String),
    /// Value count is not a multiple of the channel's component count.
    #[error("Track has {len} values which is not a multiple of {arity}")]
    Arity { len: usize, arity: usize },
}

/// Possible errors that can be produced by the JSON asset loaders.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum JsonAssetLoaderError {
    #[error("Could not load json file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not deserialize using serde: {0}")]
    Serde(#[from] serde_json::Error),
}
