use serde::{Deserialize, Serialize};

pub const DEFAULT_INPUT_PER_1M: f64 = 0.25;
pub const DEFAULT_OUTPUT_PER_1M: f64 = 1.25;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PricingConfig {
    #[serde(default)]
    pub input_per_1k: Option<f64>,
    #[serde(default)]
    pub output_per_1k: Option<f64>,
    #[serde(default)]
    pub input_per_1m: Option<f64>,
    #[serde(default)]
    pub output_per_1m: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricingRate {
    pub input_per_1m: f64,
    pub output_per_1m: f64,
}

impl Default for PricingRate {
    fn default() -> Self {
        Self {
            input_per_1m: DEFAULT_INPUT_PER_1M,
            output_per_1m: DEFAULT_OUTPUT_PER_1M,
        }
    }
}

impl PricingConfig {
    pub fn normalized(&self) -> PricingRate {
        let defaults = PricingRate::default();
        let input = self
            .input_per_1k
            .map(|value| value * 1000.0)
            .or(self.input_per_1m)
            .unwrap_or(defaults.input_per_1m);
        let output = self
            .output_per_1k
            .map(|value| value * 1000.0)
            .or(self.output_per_1m)
            .unwrap_or(defaults.output_per_1m);
        PricingRate {
            input_per_1m: input,
            output_per_1m: output,
        }
    }
}

impl PricingRate {
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1_000_000.0 * self.input_per_1m
            + output_tokens as f64 / 1_000_000.0 * self.output_per_1m
    }
}
