// ABOUTME: Structured editing of a kustomize overlay's images list.
// ABOUTME: Rewrites one entry's newName and newTag and leaves every other key alone.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

const IMAGES: &str = "images";
const NAME: &str = "name";
const NEW_NAME: &str = "newName";
const NEW_TAG: &str = "newTag";

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("failed to read overlay {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write overlay {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("overlay {path} is not valid YAML: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("overlay {0} is not a YAML mapping")]
    NotAMapping(PathBuf),

    #[error("overlay {0} has an `images` key that is not a list")]
    InvalidImages(PathBuf),
}

/// The image pin an overlay carries for one name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePin {
    pub new_name: Option<String>,
    pub new_tag: Option<String>,
}

/// A loaded overlay document.
#[derive(Debug, Clone)]
pub struct Overlay {
    path: PathBuf,
    document: Mapping,
}

impl Overlay {
    pub fn load(path: &Path) -> Result<Self, OverlayError> {
        let content = std::fs::read_to_string(path).map_err(|source| OverlayError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, OverlayError> {
        let value: Value = serde_yaml::from_str(content).map_err(|source| OverlayError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let document = match value {
            Value::Mapping(mapping) => mapping,
            // An empty file parses as null.
            Value::Null => Mapping::new(),
            _ => return Err(OverlayError::NotAMapping(path.to_path_buf())),
        };

        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current pin for `name`, if the overlay lists it.
    pub fn image(&self, name: &str) -> Option<ImagePin> {
        let images = self.document.get(IMAGES)?.as_sequence()?;
        images
            .iter()
            .filter_map(Value::as_mapping)
            .find(|entry| entry.get(NAME).and_then(Value::as_str) == Some(name))
            .map(|entry| ImagePin {
                new_name: entry.get(NEW_NAME).and_then(Value::as_str).map(String::from),
                new_tag: entry.get(NEW_TAG).and_then(Value::as_str).map(String::from),
            })
    }

    /// Pin `name` to `new_name:new_tag`, adding the entry if absent.
    ///
    /// Returns whether the document changed.
    pub fn set_image(
        &mut self,
        name: &str,
        new_name: &str,
        new_tag: &str,
    ) -> Result<bool, OverlayError> {
        let wanted = ImagePin {
            new_name: Some(new_name.to_string()),
            new_tag: Some(new_tag.to_string()),
        };
        if self.image(name).as_ref() == Some(&wanted) {
            return Ok(false);
        }

        let images = self
            .document
            .entry(Value::from(IMAGES))
            .or_insert_with(|| Value::Sequence(Vec::new()));
        let Value::Sequence(images) = images else {
            return Err(OverlayError::InvalidImages(self.path.clone()));
        };

        let position = images.iter().position(|entry| {
            entry
                .as_mapping()
                .and_then(|m| m.get(NAME))
                .and_then(Value::as_str)
                == Some(name)
        });

        match position {
            Some(i) => {
                if let Value::Mapping(entry) = &mut images[i] {
                    entry.insert(Value::from(NEW_NAME), Value::from(new_name));
                    entry.insert(Value::from(NEW_TAG), Value::from(new_tag));
                }
            }
            None => {
                let mut entry = Mapping::new();
                entry.insert(Value::from(NAME), Value::from(name));
                entry.insert(Value::from(NEW_NAME), Value::from(new_name));
                entry.insert(Value::from(NEW_TAG), Value::from(new_tag));
                images.push(Value::Mapping(entry));
            }
        }

        Ok(true)
    }

    pub fn to_yaml(&self) -> Result<String, OverlayError> {
        serde_yaml::to_string(&self.document).map_err(|source| OverlayError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self) -> Result<(), OverlayError> {
        let yaml = self.to_yaml()?;
        std::fs::write(&self.path, yaml).map_err(|source| OverlayError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERLAY: &str = r#"
apiVersion: kustomize.config.k8s.io/v1beta1
kind: Kustomization
namespace: prod
resources:
  - ../../base
images:
  - name: team/app
    newName: registry.example.com/team/app
    newTag: old1234-1
  - name: nginx
    newTag: "1.27"
"#;

    fn overlay() -> Overlay {
        Overlay::parse(Path::new("kustomization.yaml"), OVERLAY).unwrap()
    }

    #[test]
    fn reads_existing_pin() {
        let pin = overlay().image("team/app").unwrap();
        assert_eq!(pin.new_name.as_deref(), Some("registry.example.com/team/app"));
        assert_eq!(pin.new_tag.as_deref(), Some("old1234-1"));
        assert!(overlay().image("missing").is_none());
    }

    #[test]
    fn set_image_rewrites_only_the_matching_entry() {
        let mut overlay = overlay();
        let changed = overlay
            .set_image("team/app", "registry.example.com/team/app", "abc1234-42")
            .unwrap();
        assert!(changed);

        let reparsed = Overlay::parse(overlay.path(), &overlay.to_yaml().unwrap()).unwrap();
        assert_eq!(
            reparsed.image("team/app").unwrap().new_tag.as_deref(),
            Some("abc1234-42")
        );
        assert_eq!(reparsed.image("nginx").unwrap().new_tag.as_deref(), Some("1.27"));
        assert_eq!(
            reparsed.document.get("namespace").and_then(Value::as_str),
            Some("prod")
        );
        assert_eq!(
            reparsed.document.get("resources"),
            overlay.document.get("resources")
        );
    }

    #[test]
    fn set_image_to_current_pin_is_unchanged() {
        let mut overlay = overlay();
        let changed = overlay
            .set_image("team/app", "registry.example.com/team/app", "old1234-1")
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn set_image_appends_missing_entry() {
        let mut overlay = Overlay::parse(Path::new("k.yaml"), "kind: Kustomization\n").unwrap();
        assert!(overlay.set_image("team/app", "reg.io/team/app", "abc1234-1").unwrap());

        let pin = overlay.image("team/app").unwrap();
        assert_eq!(pin.new_name.as_deref(), Some("reg.io/team/app"));
    }

    #[test]
    fn rejects_non_mapping_documents() {
        let err = Overlay::parse(Path::new("k.yaml"), "- a\n- b\n").unwrap_err();
        assert!(matches!(err, OverlayError::NotAMapping(_)));

        let mut overlay = Overlay::parse(Path::new("k.yaml"), "images: nope\n").unwrap();
        let err = overlay.set_image("a", "b", "c").unwrap_err();
        assert!(matches!(err, OverlayError::InvalidImages(_)));
    }
}
