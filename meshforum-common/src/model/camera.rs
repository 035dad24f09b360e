//! Camera references: `@camera(label)` mentions in answer text that point at
//! a saved 3D-viewport camera state.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

pub const CAMERA_LABEL_MAX_LEN: usize = 32;

static CAMERA_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@camera\(([A-Za-z0-9_-]{1,32})\)").expect("camera mention pattern is valid")
});

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum CameraReferenceError {
    #[error("Camera {0:?} is mentioned but no state was supplied for it")]
    UnknownLabel(String),
    #[error("Camera {0:?} was supplied more than once")]
    DuplicateLabel(String),
    #[error("Camera {0:?} has an invalid label or non-finite state")]
    InvalidCamera(String),
}

#[derive(Copy, Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct CameraState {
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub fov: f64,
}

// States are only compared after validation, which rules out NaN.
impl Eq for CameraState {}

impl std::hash::Hash for CameraState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for value in self.position.iter().chain(&self.target).chain([&self.fov]) {
            value.to_bits().hash(state);
        }
    }
}

impl CameraState {
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position
            .iter()
            .chain(&self.target)
            .chain([&self.fov])
            .all(|value| value.is_finite())
            && self.fov > 0.0
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct CameraReference {
    pub label: String,
    #[serde(flatten)]
    pub state: CameraState,
}

/// Distinct labels mentioned in `text`, in order of first mention.
#[must_use]
pub fn mentioned_labels(text: &str) -> Vec<&str> {
    let mut labels: Vec<&str> = Vec::new();
    for captures in CAMERA_MENTION.captures_iter(text) {
        let label = captures.get(1).map_or("", |label| label.as_str());
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// Pairs every mention in `text` with its supplied camera. Cameras that are
/// never mentioned are dropped.
pub fn resolve_references(
    text: &str,
    cameras: &[CameraReference],
) -> Result<Vec<CameraReference>, CameraReferenceError> {
    for (index, camera) in cameras.iter().enumerate() {
        let label_ok = !camera.label.is_empty()
            && camera.label.len() <= CAMERA_LABEL_MAX_LEN
            && camera
                .label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
        if !label_ok || !camera.state.is_finite() {
            return Err(CameraReferenceError::InvalidCamera(camera.label.clone()));
        }
        if cameras[..index].iter().any(|other| other.label == camera.label) {
            return Err(CameraReferenceError::DuplicateLabel(camera.label.clone()));
        }
    }

    mentioned_labels(text)
        .into_iter()
        .map(|label| {
            cameras
                .iter()
                .find(|camera| camera.label == label)
                .cloned()
                .ok_or_else(|| CameraReferenceError::UnknownLabel(label.to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::model::camera::{
        CameraReference, CameraReferenceError, CameraState, mentioned_labels, resolve_references,
    };

    fn camera(label: &str) -> CameraReference {
        CameraReference {
            label: label.to_owned(),
            state: CameraState {
                position: [0.0, 1.5, 4.0],
                target: [0.0, 1.0, 0.0],
                fov: 50.0,
            },
        }
    }

    #[test]
    fn mentions_are_found_in_order() {
        let text = "Look at @camera(side) then @camera(top-down), and @camera(side) again. \
                    @camera() and @camera(bad label) are not mentions.";
        assert_eq!(mentioned_labels(text), ["side", "top-down"]);
    }

    #[test]
    fn references_resolve_against_supplied_cameras() {
        let cameras = [camera("top"), camera("side"), camera("unused")];
        let resolved = resolve_references("@camera(side) vs @camera(top)", &cameras).unwrap();

        let labels: Vec<_> = resolved.iter().map(|camera| camera.label.as_str()).collect();
        assert_eq!(labels, ["side", "top"]);
    }

    #[test]
    fn unknown_and_duplicate_cameras_are_rejected() {
        assert_eq!(
            resolve_references("@camera(front)", &[camera("side")]),
            Err(CameraReferenceError::UnknownLabel("front".to_owned()))
        );
        assert_eq!(
            resolve_references("@camera(side)", &[camera("side"), camera("side")]),
            Err(CameraReferenceError::DuplicateLabel("side".to_owned()))
        );

        let mut broken = camera("side");
        broken.state.fov = f64::NAN;
        assert_eq!(
            resolve_references("@camera(side)", &[broken]),
            Err(CameraReferenceError::InvalidCamera("side".to_owned()))
        );
    }
}
