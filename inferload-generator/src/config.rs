use std::time::Duration;

/// Model every request targets unless overridden.
pub const MODEL_NAME: &str = "vitpose_ensemble";

/// Name of the single input tensor.
pub const INPUT_NAME: &str = "input";

/// KServe datatype tag for 32-bit floats.
pub const INPUT_DATATYPE: &str = "FP32";

pub const BATCH_SIZE: usize = 4;
pub const CHANNELS: usize = 3;
pub const IMAGE_HEIGHT: usize = 256;
pub const IMAGE_WIDTH: usize = 192;

/// Wall-clock length of one generator run.
pub const TEST_DURATION: Duration = Duration::from_secs(20);

/// Pause between the end of one request and the start of the next.
pub const REQUEST_INTERVAL: Duration = Duration::from_secs(1);
