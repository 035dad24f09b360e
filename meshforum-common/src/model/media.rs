use serde::{Deserialize, Serialize};

/// Reference to an uploaded asset.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub filepath_location: String,
}

impl Media {
    #[must_use]
    pub fn new(filepath_location: impl Into<String>) -> Self {
        Self {
            filepath_location: filepath_location.into(),
        }
    }

    /// Lowercased extension of the last path segment, ignoring any query
    /// string or fragment.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let path = self
            .filepath_location
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let file_name = path.rsplit('/').next().unwrap_or_default();
        let (stem, extension) = file_name.rsplit_once('.')?;

        (!stem.is_empty() && !extension.is_empty()).then(|| extension.to_ascii_lowercase())
    }
}

/// What a client shows before downloading a comment attachment.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadPrompt {
    pub media_path: String,
    pub media_size: Option<String>,
    pub extension: Option<String>,
    pub confirmation: String,
}

impl DownloadPrompt {
    #[must_use]
    pub fn new(media: &Media, media_size: Option<&str>) -> Self {
        let extension = media.extension();

        let size = media_size.unwrap_or("of unknown size");
        let confirmation = match &extension {
            Some(extension) => format!(
                "This file is {size} and has the extension .{extension}. Do you want to download it?"
            ),
            None => format!("This file is {size} and has no extension. Do you want to download it?"),
        };

        Self {
            media_path: media.filepath_location.clone(),
            media_size: media_size.map(str::to_owned),
            extension,
            confirmation,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::media::{DownloadPrompt, Media};

    #[test]
    fn extensions() {
        assert_eq!(Media::new("a.glb").extension().as_deref(), Some("glb"));
        assert_eq!(
            Media::new("/uploads/x/scene.v2.GLTF?token=1").extension().as_deref(),
            Some("gltf")
        );
        assert_eq!(Media::new("/uploads/.hidden").extension(), None);
        assert_eq!(Media::new("/uploads.d/model").extension(), None);
        assert_eq!(Media::new("trailing.").extension(), None);
    }

    #[test]
    fn confirmation_embeds_size_and_extension() {
        let prompt = DownloadPrompt::new(&Media::new("/media/a.glb"), Some("5MB"));

        assert!(prompt.confirmation.contains("5MB"));
        assert!(prompt.confirmation.contains(".glb"));
        assert_eq!(prompt.extension.as_deref(), Some("glb"));
        assert_eq!(prompt.media_path, "/media/a.glb");
    }
}
