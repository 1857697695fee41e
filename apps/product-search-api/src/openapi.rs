//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for Product Search API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Product Search API",
        version = "0.1.0",
        description = "Image and text similarity search over the product catalogue",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api/products", api = domain_product_search::ApiDoc)
    ),
    tags(
        (name = "Products", description = "Product embedding ingestion and similarity search")
    )
)]
pub struct ApiDoc;
