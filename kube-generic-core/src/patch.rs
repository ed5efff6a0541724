//! Patches computed from the current state of an object.
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// The kind of patch sent to the API server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatchType {
    /// [JSON patch](https://kubernetes.io/docs/tasks/run-application/update-api-object-kubectl-patch/#use-a-json-merge-patch-to-update-a-deployment) (RFC 6902)
    Json,
    /// [JSON Merge patch](https://kubernetes.io/docs/tasks/run-application/update-api-object-kubectl-patch/#use-a-json-merge-patch-to-update-a-deployment) (RFC 7386)
    Merge,
    /// [Strategic JSON Merge patch](https://kubernetes.io/docs/tasks/run-application/update-api-object-kubectl-patch/#use-a-strategic-merge-patch-to-update-a-deployment)
    StrategicMerge,
    /// [Server side apply](https://kubernetes.io/docs/reference/using-api/api-concepts/#server-side-apply)
    Apply,
}

impl PatchType {
    /// The `Content-Type` header value for this patch type
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json-patch+json",
            Self::Merge => "application/merge-patch+json",
            Self::StrategicMerge => "application/strategic-merge-patch+json",
            Self::Apply => "application/apply-patch+yaml",
        }
    }
}

/// Failure producing the wire payload of a patch
#[derive(Debug, Error)]
pub enum PatchError {
    /// The original snapshot could not be serialized
    #[error("failed to serialize original object: {0}")]
    SerializeOriginal(#[source] serde_json::Error),

    /// The current object could not be serialized
    #[error("failed to serialize current object: {0}")]
    SerializeCurrent(#[source] serde_json::Error),

    /// The computed patch could not be serialized
    #[error("failed to serialize patch: {0}")]
    SerializePatch(#[source] serde_json::Error),
}

/// A patch for objects of type `K`
///
/// The payload is computed from the object state at the time of the call,
/// before any response is decoded back into it.
pub trait Patch<K> {
    /// The patch type discriminator
    fn patch_type(&self) -> PatchType;

    /// Produce the wire payload from the current object
    fn data(&self, obj: &K) -> Result<Vec<u8>, PatchError>;
}

/// A precomputed patch payload of a fixed type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPatch {
    patch_type: PatchType,
    data: Vec<u8>,
}

impl RawPatch {
    /// Wrap raw patch bytes
    pub fn new(patch_type: PatchType, data: impl Into<Vec<u8>>) -> Self {
        Self {
            patch_type,
            data: data.into(),
        }
    }

    /// Serialize any value as a merge patch
    pub fn merge<P: Serialize>(patch: &P) -> Result<Self, PatchError> {
        let data = serde_json::to_vec(patch).map_err(PatchError::SerializePatch)?;
        Ok(Self::new(PatchType::Merge, data))
    }
}

impl<K> Patch<K> for RawPatch {
    fn patch_type(&self) -> PatchType {
        self.patch_type
    }

    fn data(&self, _obj: &K) -> Result<Vec<u8>, PatchError> {
        Ok(self.data.clone())
    }
}

/// A merge patch from an original snapshot to the object passed at call time
///
/// Keys absent from the current object are sent as `null`, arrays are replaced whole.
#[derive(Clone, Debug)]
pub struct MergeFrom<K> {
    original: K,
}

impl<K: Serialize> MergeFrom<K> {
    /// Snapshot the object before mutating it
    pub fn new(original: K) -> Self {
        Self { original }
    }
}

impl<K: Serialize> Patch<K> for MergeFrom<K> {
    fn patch_type(&self) -> PatchType {
        PatchType::Merge
    }

    fn data(&self, obj: &K) -> Result<Vec<u8>, PatchError> {
        let original = serde_json::to_value(&self.original).map_err(PatchError::SerializeOriginal)?;
        let current = serde_json::to_value(obj).map_err(PatchError::SerializeCurrent)?;
        serde_json::to_vec(&merge_diff(&original, &current)).map_err(PatchError::SerializePatch)
    }
}

/// A JSON patch (list of operations) from an original snapshot to the object passed at call time
#[derive(Clone, Debug)]
pub struct JsonPatchFrom<K> {
    original: K,
}

impl<K: Serialize> JsonPatchFrom<K> {
    /// Snapshot the object before mutating it
    pub fn new(original: K) -> Self {
        Self { original }
    }
}

impl<K: Serialize> Patch<K> for JsonPatchFrom<K> {
    fn patch_type(&self) -> PatchType {
        PatchType::Json
    }

    fn data(&self, obj: &K) -> Result<Vec<u8>, PatchError> {
        let original = serde_json::to_value(&self.original).map_err(PatchError::SerializeOriginal)?;
        let current = serde_json::to_value(obj).map_err(PatchError::SerializeCurrent)?;
        serde_json::to_vec(&json_patch::diff(&original, &current)).map_err(PatchError::SerializePatch)
    }
}

/// Server-side apply of the full current object
///
/// Requires a field manager in the patch options.
#[derive(Clone, Copy, Debug, Default)]
pub struct Apply;

impl<K: Serialize> Patch<K> for Apply {
    fn patch_type(&self) -> PatchType {
        PatchType::Apply
    }

    fn data(&self, obj: &K) -> Result<Vec<u8>, PatchError> {
        serde_json::to_vec(obj).map_err(PatchError::SerializeCurrent)
    }
}

fn merge_diff(original: &Value, current: &Value) -> Value {
    match (original, current) {
        (Value::Object(orig), Value::Object(cur)) => {
            let mut patch = Map::new();
            for (key, ov) in orig {
                match cur.get(key) {
                    None => {
                        patch.insert(key.clone(), Value::Null);
                    }
                    Some(cv) if cv != ov => {
                        patch.insert(key.clone(), merge_diff(ov, cv));
                    }
                    Some(_) => {}
                }
            }
            for (key, cv) in cur {
                if !orig.contains_key(key) {
                    patch.insert(key.clone(), cv.clone());
                }
            }
            Value::Object(patch)
        }
        (_, cur) => cur.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use serde_json::json;

    fn cm(data: Value) -> ConfigMap {
        serde_json::from_value(json!({"metadata": {"name": "cfg"}, "data": data})).unwrap()
    }

    #[test]
    fn merge_from_only_sends_changes() {
        let original = cm(json!({"a": "1", "b": "2"}));
        let current = cm(json!({"a": "1", "b": "3", "c": "4"}));
        let patch = MergeFrom::new(original);
        assert_eq!(Patch::<ConfigMap>::patch_type(&patch), PatchType::Merge);
        let data: Value = serde_json::from_slice(&patch.data(&current).unwrap()).unwrap();
        assert_eq!(data, json!({"data": {"b": "3", "c": "4"}}));
    }

    #[test]
    fn merge_from_nulls_removed_keys() {
        let original = cm(json!({"a": "1", "b": "2"}));
        let current = cm(json!({"a": "1"}));
        let data: Value = serde_json::from_slice(&MergeFrom::new(original).data(&current).unwrap()).unwrap();
        assert_eq!(data, json!({"data": {"b": null}}));
    }

    #[test]
    fn merge_from_unchanged_is_empty() {
        let original = cm(json!({"a": "1"}));
        let data = MergeFrom::new(original.clone()).data(&original).unwrap();
        assert_eq!(data, b"{}");
    }

    #[test]
    fn json_patch_from_lists_operations() {
        let original = cm(json!({"a": "1"}));
        let current = cm(json!({"a": "2"}));
        let patch = JsonPatchFrom::new(original);
        let data: Value = serde_json::from_slice(&patch.data(&current).unwrap()).unwrap();
        assert_eq!(data, json!([{"op": "replace", "path": "/data/a", "value": "2"}]));
    }

    #[test]
    fn raw_and_apply_patches() {
        let raw = RawPatch::merge(&json!({"data": {"x": "y"}})).unwrap();
        let obj = cm(json!({}));
        assert_eq!(raw.data(&obj).unwrap(), br#"{"data":{"x":"y"}}"#);
        assert_eq!(Patch::<ConfigMap>::patch_type(&raw).content_type(), "application/merge-patch+json");

        let applied: Value = serde_json::from_slice(&Apply.data(&obj).unwrap()).unwrap();
        assert_eq!(applied["metadata"]["name"], "cfg");
        assert_eq!(Patch::<ConfigMap>::patch_type(&Apply), PatchType::Apply);
    }
}
