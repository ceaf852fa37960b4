#![allow(clippy::needless_for_each)]

use anyhow::Result;
use serde_json::to_string_pretty;
use std::path::PathBuf;
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::{ServerBuilder, ServerVariableBuilder};

use crate::handlers;

pub struct ServerAddon;

impl Modify for ServerAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let version_variable = ServerVariableBuilder::new()
            .default_value("v1")
            .enum_values(Some(vec!["v1"]))
            .build();
        openapi.servers = Some(vec![
            ServerBuilder::new()
                .url("/{version}")
                .parameter("version", version_variable)
                .build(),
        ]);
    }
}

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "admin_token",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::pools::list::list_pools,
        handlers::pools::get::get_pool,
        handlers::simulation::simulate,
        handlers::live::live_feed,
        handlers::admin::trigger_ingest,
        handlers::admin::ingest_status,
    ),
    modifiers(&ServerAddon, &SecurityAddon),
    tags(
        (name = "yieldlens", description = "Lending pool analytics"),
        (name = "Pools", description = "Pool leaderboard, detail and live feed"),
        (name = "Autopilot", description = "Allocation simulation"),
        (name = "Admin", description = "Ingestion control")
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn generate_openapi_json(output_path: PathBuf) -> Result<()> {
        let openapi = Self::openapi();
        let json = to_string_pretty(&openapi)?;

        let file_path = output_path.join("openapi.json");

        tracing::info!("Saving OpenAPI specs to {}...", file_path.display());

        std::fs::write(&file_path, json)?;
        tracing::info!("OpenAPI specs saved!");
        Ok(())
    }
}
