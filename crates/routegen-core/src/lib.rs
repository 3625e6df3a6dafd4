//! Routegen Core Library
//!
//! This library generates gin route registration code from OpenAPI
//! specifications: per-package `InitPublicRouter`/`InitPrivateRouter`
//! functions, a route manifest for tooling and an optional route table.

pub mod aggregate;
pub mod builders;
pub mod config;
pub mod error;
pub mod generate;
pub mod handlers;
pub mod openapi;
pub mod resolver;
pub mod routes;
pub mod security;
pub mod templates;
pub mod utils;
pub mod writer;

pub use crate::{
    aggregate::{Destination, GroupingKey, RouteGroup, RouteTable},
    config::GenConfig,
    error::{Error, Result},
    generate::{generate, route_table, GenerationReport},
    handlers::{HandlerIndex, HandlerLocation},
    openapi::OpenApiContext,
    resolver::{CachedResolver, GoListResolver, ModuleRootResolver, PackageResolver},
    routes::{HttpMethod, RouteDescriptor},
    security::{AuthChain, SecurityPolicy, SecurityPreset},
    templates::{ArtifactKind, TemplateManager},
};
