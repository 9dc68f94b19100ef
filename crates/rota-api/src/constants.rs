//! API constants

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

/// Current API version segment
pub const API_VERSION: &str = "v0";

/// Versioned prefix for every JSON endpoint except `/health` and `/join`
pub const API_PREFIX: &str = "/api/v0";

/// Where the served OpenAPI document lives
pub const OPENAPI_PATH: &str = "/api/openapi.json";
