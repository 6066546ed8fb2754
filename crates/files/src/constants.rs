/// Records fetched per page when no page size is given.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Adapter name used for the local filesystem adapter.
pub const DEFAULT_ADAPTER_NAME: &str = "Local";
