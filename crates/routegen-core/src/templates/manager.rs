//! Loads the built-in templates and optional user overrides

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tera::{Context, Tera};

use super::ArtifactKind;
use crate::Error;

/// Renders generated files through tera
#[derive(Debug, Clone)]
pub struct TemplateManager {
    /// Cached Tera template engine instance
    tera: Arc<Tera>,
    /// Directory user templates were loaded from, if any
    template_dir: Option<PathBuf>,
}

impl TemplateManager {
    /// Manager holding only the templates compiled into the crate
    pub fn builtin() -> crate::Result<Self> {
        Ok(Self {
            tera: Arc::new(builtin_tera()?),
            template_dir: None,
        })
    }

    /// Load `*.tera` files from `template_dir` on top of the built-ins.
    ///
    /// A user template named like a built-in one (`router.go.tera`)
    /// replaces it; built-ins fill in whatever the directory lacks.
    pub async fn new(template_dir: Option<PathBuf>) -> crate::Result<Self> {
        let Some(dir) = template_dir else {
            return Self::builtin();
        };

        let meta = tokio::fs::metadata(&dir).await.map_err(|e| {
            Error::template(format!(
                "Template directory {} is not accessible: {}",
                dir.display(),
                e
            ))
        })?;
        if !meta.is_dir() {
            return Err(Error::template(format!(
                "Template path {} is not a directory",
                dir.display()
            )));
        }

        let dir_str = dir.to_str().ok_or_else(|| {
            Error::template(format!(
                "Template path contains invalid UTF-8: {}",
                dir.display()
            ))
        })?;

        let mut tera = Tera::new(&format!("{}/**/*.tera", dir_str))?;
        tera.autoescape_on(vec![]);
        tera.extend(&builtin_tera()?)?;

        log::debug!(
            "loaded templates from {}: {:?}",
            dir.display(),
            tera.get_template_names().collect::<Vec<_>>()
        );

        Ok(Self {
            tera: Arc::new(tera),
            template_dir: Some(dir),
        })
    }

    /// Directory user templates were loaded from
    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }

    /// Render one artifact from its serializable context
    pub fn render<C: Serialize>(&self, kind: ArtifactKind, context: &C) -> crate::Result<String> {
        let context = Context::from_serialize(context)?;
        self.tera
            .render(kind.template_name(), &context)
            .map_err(|e| {
                Error::template(format!(
                    "Failed to render {}: {}",
                    kind.template_name(),
                    render_chain(&e)
                ))
            })
    }
}

fn builtin_tera() -> crate::Result<Tera> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_templates(ArtifactKind::all().map(|k| (k.template_name(), k.builtin_source())))?;
    Ok(tera)
}

// tera puts the useful part of a render failure in the source chain
fn render_chain(err: &tera::Error) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    msg
}
