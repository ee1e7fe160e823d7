use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::ClassName;
use crate::error::HarvestError;
use crate::identity::FileIdentity;

/// On-disk dataset layout: `root/<class>/<digest>.<ext>`. File presence is the
/// only durable state; nothing else is written.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: Utf8PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn class_dir(&self, class: &ClassName) -> Utf8PathBuf {
        self.root.join(class.as_str())
    }

    pub fn image_path(&self, class: &ClassName, identity: &FileIdentity) -> Utf8PathBuf {
        self.class_dir(class).join(identity.file_name())
    }

    pub fn ensure_root(&self) -> Result<(), HarvestError> {
        fs::create_dir_all(self.root.as_std_path()).map_err(|err| {
            HarvestError::Filesystem(format!("create {}: {err}", self.root))
        })
    }

    pub fn ensure_class_dir(&self, class: &ClassName) -> Result<Utf8PathBuf, HarvestError> {
        let dir = self.class_dir(class);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| HarvestError::Filesystem(format!("create {dir}: {err}")))?;
        Ok(dir)
    }

    pub fn contains(&self, class: &ClassName, identity: &FileIdentity) -> bool {
        self.image_path(class, identity).as_std_path().exists()
    }
}
