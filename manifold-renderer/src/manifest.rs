//! Static manifests: a fixed object list that ignores values.

use std::any::Any;
use std::path::Path;

use manifold_core::{PostRenderer, RenderContext, ResourceObject, SourceName, Values};

use crate::documents::parse_documents;
use crate::error::{io_err, SourceError};
use crate::source::{Source, SourceVariant, TypedSource};

/// Pre-built objects, emitted as-is on every render.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    pub name: SourceName,
    pub objects: Vec<ResourceObject>,
    pub post_renderers: Vec<PostRenderer>,
    values: Values,
}

impl ManifestSource {
    pub fn new(name: impl Into<SourceName>, objects: Vec<ResourceObject>) -> Self {
        Self {
            name: name.into(),
            objects,
            post_renderers: Vec::new(),
            values: Values::new(),
        }
    }

    /// Parse a multi-document YAML string.
    pub fn from_yaml_str(name: impl Into<SourceName>, text: &str) -> Result<Self, SourceError> {
        let name = name.into();
        let objects = parse_documents(text, name.as_str())?;
        Ok(Self::new(name, objects))
    }

    /// Read a multi-document YAML file.
    pub fn from_file(name: impl Into<SourceName>, path: &Path) -> Result<Self, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let objects = parse_documents(&text, &path.display().to_string())?;
        Ok(Self::new(name, objects))
    }

    pub fn with_post_renderer(mut self, post_renderer: PostRenderer) -> Self {
        self.post_renderers.push(post_renderer);
        self
    }
}

impl Source for ManifestSource {
    fn name(&self) -> &SourceName {
        &self.name
    }

    fn variant(&self) -> SourceVariant {
        Self::VARIANT
    }

    /// Always empty.
    fn values(&self) -> &Values {
        &self.values
    }

    fn post_renderers(&self) -> &[PostRenderer] {
        &self.post_renderers
    }

    fn render(
        &self,
        ctx: &RenderContext,
        _values: &Values,
    ) -> Result<Vec<ResourceObject>, SourceError> {
        ctx.check()?;
        Ok(self.objects.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl TypedSource for ManifestSource {
    const VARIANT: SourceVariant = SourceVariant::new("manifest");
}
