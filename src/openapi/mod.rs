use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Part Master API",
        version = "0.1.0",
        description = r#"
# Part Master & BOM Registry

Registers parts under a derived **electronic code** and stores bill-of-materials
lines that link those codes as parent and child.

## Electronic codes

`{division}-{industryCode}-{partGroup}-{sequenceNo:05}{revision}`, for example
`A-E-A00-00001A`. The code is recomputed whenever one of its inputs changes and
is never accepted from clients.

## Authentication

Disabled by default. When enabled, send an HS256 bearer token whose
`permissions` claim contains the route group's permission
(`items:read`, `items:write`, `items:bulk`, `boms:read`, `boms:write`,
`boms:bulk`) or whose `roles` claim contains `admin`:

```
Authorization: Bearer <token>
```

## Concurrency

`PUT` bodies accept an optional `expectedVersion`. A stale version yields
`409 Conflict`; without it the last write wins.

## Bulk operations

Bulk create, delete and import are best effort. The response lists the ids
that succeeded and, per failing row, its index and the error.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "items", description = "Part master (code registry)"),
        (name = "boms", description = "BOM lines")
    ),
    paths(
        crate::handlers::items::list_items,
        crate::handlers::items::create_item,
        crate::handlers::items::last_no,
        crate::handlers::items::last_code,
        crate::handlers::items::export_items,
        crate::handlers::items::import_items,
        crate::handlers::items::bulk_create_items,
        crate::handlers::items::bulk_delete_items,
        crate::handlers::items::get_item,
        crate::handlers::items::update_item,
        crate::handlers::items::delete_item,

        crate::handlers::bom::list_lines,
        crate::handlers::bom::create_line,
        crate::handlers::bom::bulk_create_lines,
        crate::handlers::bom::export_lines,
        crate::handlers::bom::import_lines,
        crate::handlers::bom::bulk_delete_lines,
        crate::handlers::bom::get_line,
        crate::handlers::bom::update_line,
        crate::handlers::bom::delete_line,
        crate::handlers::bom::select_code,
        crate::handlers::bom::set_parent,
    ),
    components(
        schemas(
            crate::entities::item::Model,
            crate::entities::bom_line::Model,
            crate::services::code_generator::ItemDraft,
            crate::services::code_generator::ItemPatch,
            crate::services::bom::BomLineDraft,
            crate::services::bom::BomLinePatch,
            crate::services::bom::SelectCodeRequest,
            crate::services::bom::SetParentRequest,
            crate::services::BulkResult,
            crate::services::BulkFailure,
            crate::handlers::common::IdList,
            crate::handlers::items::LastNoResponse,
            crate::handlers::items::LastCodeResponse,
            crate::models::SortOrder,
            crate::models::Division,
            crate::models::IndustryCode,
            crate::models::PartGroup,
            crate::models::ItemType,
            crate::models::ItemStatus,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
