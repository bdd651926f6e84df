use std::time::Duration;

/// Maximum time to wait when acquiring the aggregate state lock.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(1);

/// Port the aggregator listens on when none is configured.
pub const DEFAULT_PORT: u16 = 3000;

/// Number of replicas expected to report when none is configured.
pub const DEFAULT_EXPECTED_REPLICAS: u64 = 1;
