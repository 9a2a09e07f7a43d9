use std::fs;
use std::path::{Component, Path, PathBuf};

use formweave_engine::{ElementPlugin, Plugin, PluginError, RequestContext, decode};
use formweave_model::{
    BoundForm, ElementEntry, FieldDefinition, FormSchema, PluginData, PluginDescriptor,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::{BaseConfig, base_fields, check_name};

/// Plugin data key of the directory uploads are stored in, relative to the
/// media root.
pub const UPLOAD_DIR: &str = "upload_dir";

#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(flatten)]
    base: BaseConfig,
    #[serde(default)]
    upload_dir: Option<String>,
}

/// A file upload. Each entry gets its own upload directory under the media
/// root; submitted files are written there and the cleaned value becomes the
/// stored path relative to the media root. Deleting the entry removes the
/// directory.
pub struct FileElement {
    descriptor: PluginDescriptor,
    media_root: PathBuf,
}

impl FileElement {
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            descriptor: PluginDescriptor::new("file", "File").in_group("Other"),
            media_root: media_root.into(),
        }
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    fn upload_dir(&self, relative: &str) -> Result<PathBuf, PluginError> {
        let path = Path::new(relative);
        let contained = path.components().all(|c| matches!(c, Component::Normal(_)));
        if relative.is_empty() || !contained {
            return Err(PluginError::InvalidData(format!(
                "upload directory '{relative}' escapes the media root"
            )));
        }
        Ok(self.media_root.join(path))
    }
}

/// Keeps the final path segment of an uploaded name, replacing anything
/// outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

impl Plugin for FileElement {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn configuration_form(&self) -> Option<FormSchema> {
        Some(FormSchema::new(base_fields()))
    }

    fn validate(&self, form: &mut BoundForm, siblings: &[ElementEntry]) {
        check_name(form, siblings);
    }

    /// Keeps the entry's upload directory across edits.
    fn serialize(&self, form: &BoundForm) -> Result<PluginData, PluginError> {
        let mut data = form.cleaned_data().cloned().unwrap_or_default();
        let upload_dir = form
            .initial()
            .get(UPLOAD_DIR)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| format!("files/{}", Uuid::now_v7().simple()));
        data.insert(UPLOAD_DIR.into(), Value::String(upload_dir));
        Ok(data)
    }

    fn on_delete(&self, data: &PluginData) -> Result<(), PluginError> {
        let config: FileConfig = decode(data)?;
        let Some(relative) = config.upload_dir else {
            return Ok(());
        };
        let dir = self.upload_dir(&relative)?;
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            info!(field = %config.base.name, dir = %dir.display(), "Removed uploaded files");
        }
        Ok(())
    }
}

impl ElementPlugin for FileElement {
    fn to_field(
        &self,
        data: &PluginData,
        _position: i32,
        _request: &RequestContext,
    ) -> Result<FieldDefinition, PluginError> {
        let config: FileConfig = decode(data)?;
        let base = &config.base;
        Ok(base.apply(FieldDefinition::file(&base.name, base.label())))
    }

    fn submit_form_data(
        &self,
        data: &PluginData,
        form: &mut BoundForm,
        _request: &RequestContext,
    ) -> Result<(), PluginError> {
        let config: FileConfig = decode(data)?;
        let name = config.base.name;
        let Some(file) = form.file(&name).cloned() else {
            return Ok(());
        };
        let relative_dir = config
            .upload_dir
            .ok_or_else(|| PluginError::InvalidData(format!("file '{name}' has no upload directory")))?;
        let dir = self.upload_dir(&relative_dir)?;
        fs::create_dir_all(&dir)?;

        let stored = format!(
            "{}-{}",
            Uuid::now_v7().simple(),
            sanitize_file_name(&file.file_name)
        );
        fs::write(dir.join(&stored), &file.content)?;
        let relative = format!("{relative_dir}/{stored}");
        debug!(field = %name, path = %relative, size = file.content.len(), "Stored upload");

        if let Some(cleaned) = form.cleaned_data_mut() {
            cleaned.insert(name, Value::String(relative));
        }
        Ok(())
    }
}
