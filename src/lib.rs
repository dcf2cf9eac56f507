//! # cert-forge – event certificates and attendance reports as PDF
//!
//! An HTTP service that fills HTML templates with validated request data
//! and renders the result to PDF. The rendering pipeline stages are:
//!
//! 1. **Parse** – HTML string → DOM tree ([`dom`])
//! 2. **Style** – apply `<style>` rules and inline styles ([`style`])
//! 3. **Layout** – compute block/flex/table layout with Taffy ([`layout`])
//! 4. **Paginate** – split into pages, honouring `@page` ([`pagination`])
//! 5. **Render** – emit PDF bytes via printpdf ([`render`])
//!
//! The service side validates payloads ([`validate`], [`models`]), binds
//! them to Tera templates ([`templates`]) and serves the documents over
//! actix-web ([`server`]).

pub mod attachment;
pub mod config;
pub mod dom;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod layout_config;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod style;
pub mod templates;
pub mod validate;

// Re-exports for convenience
pub use error::{RenderError, ServiceError, TemplateError, ValidationError};
pub use pipeline::{generate_pdf, ForgeRenderer, PageOrientation, PdfRenderer, PipelineConfig};
pub use server::{configure_routes, AppState};
pub use templates::TemplateStore;
