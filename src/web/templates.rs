// src/web/templates.rs

use anyhow::{Context, Result};
use minijinja::{context, Environment as TemplateEnv};
use rust_embed::RustEmbed;

/// Template holding the Swagger UI shell
const SWAGGER_TEMPLATE: &str = "swagger.html";

#[derive(RustEmbed)]
#[folder = "web/templates/"]
struct TemplateAssets;

/// Pages rendered by the docs routes
///
/// Every embedded template is loaded once at startup; a template that fails
/// to parse stops the service from building its router.
#[derive(Clone)]
pub struct Templates {
    env: TemplateEnv<'static>,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut env = TemplateEnv::new();

        for file_path in TemplateAssets::iter() {
            let Some(template_file) = TemplateAssets::get(&file_path) else {
                continue;
            };
            let source = std::str::from_utf8(&template_file.data)
                .with_context(|| format!("Template {} is not UTF-8", file_path))?;
            env.add_template_owned(file_path.to_string(), source.to_string())
                .with_context(|| format!("Failed to parse template {}", file_path))?;
        }

        // The docs routes cannot work without it
        env.get_template(SWAGGER_TEMPLATE)
            .with_context(|| format!("Missing embedded template {}", SWAGGER_TEMPLATE))?;

        Ok(Self { env })
    }

    /// Render the Swagger UI page pointing at the OpenAPI document
    pub fn swagger_page(&self, title: &str, spec_url: &str) -> Result<String> {
        let rendered = self.env.get_template(SWAGGER_TEMPLATE)?.render(context! {
            title => title,
            spec_url => spec_url,
            version => env!("CARGO_PKG_VERSION"),
        })?;
        Ok(rendered)
    }
}
