use std::time::Duration;

pub const DEFAULT_HOST_ADDRESS: &str = "127.0.0.1:3000";

pub const DEFAULT_TIMEZONE: &str = "Asia/Kuala_Lumpur";

/// How long n8n gets to answer before the request fails
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_REVALIDATE_INTERVAL: Duration = Duration::from_secs(15);

/// Extra attempts after a failed revalidation fetch
pub const REVALIDATE_RETRIES: u32 = 2;

pub const DEFAULT_MOCK_DIR: &str = "mock";

pub const DEFAULT_STORE_PATH: &str = "e-leave-store.json";

/// Widest range `GET /api/workdays` will count, a little over ten years
pub const MAX_COUNT_SPAN_DAYS: i64 = 3660;
