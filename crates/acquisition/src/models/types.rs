use std::borrow::Cow;

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// Source tag used for outcomes served from the cache
pub const CACHE_SOURCE: &str = "cache";
