use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{BATCH_SIZE, CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH, INPUT_DATATYPE, INPUT_NAME, MODEL_NAME};

/// One input tensor in KServe v2 JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferInput {
    pub name: String,
    pub shape: Vec<i64>,
    pub datatype: String,
    pub data: Vec<f32>,
}

/// A single inference request. Model name and version travel in the URL, not the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferRequest {
    #[serde(skip)]
    pub model_name: String,
    #[serde(skip)]
    pub model_version: Option<String>,
    pub inputs: Vec<InferInput>,
}

/// Shape of the synthetic workload: `[batch_size, 3, height, width]` FP32 in `[0, 1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSpec {
    pub model_name: String,
    pub model_version: Option<String>,
    pub batch_size: usize,
    pub height: usize,
    pub width: usize,
}

impl Default for PayloadSpec {
    fn default() -> Self {
        Self {
            model_name: MODEL_NAME.to_string(),
            model_version: None,
            batch_size: BATCH_SIZE,
            height: IMAGE_HEIGHT,
            width: IMAGE_WIDTH,
        }
    }
}

impl PayloadSpec {
    pub fn shape(&self) -> [usize; 4] {
        [self.batch_size, CHANNELS, self.height, self.width]
    }

    /// Number of scalar values in one tensor.
    pub fn element_count(&self) -> usize {
        self.shape().iter().product()
    }

    /// Build a fresh request with newly drawn tensor contents.
    pub fn build<R: Rng>(&self, rng: &mut R) -> InferRequest {
        let data: Vec<f32> = (0..self.element_count()).map(|_| rng.gen::<f32>()).collect();
        InferRequest {
            model_name: self.model_name.clone(),
            model_version: self.model_version.clone(),
            inputs: vec![InferInput {
                name: INPUT_NAME.to_string(),
                shape: self.shape().iter().map(|&d| d as i64).collect(),
                datatype: INPUT_DATATYPE.to_string(),
                data,
            }],
        }
    }
}
