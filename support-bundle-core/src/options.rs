//! Parameters attached to a support bundle creation request.

use serde_json::{Map, Value};

use crate::contract::OptionsProvider;

/// Free-form bundle parameters, serialized as the `parameters` JSON object.
pub type BundleParameters = Map<String, Value>;

/// Lets the server pick its own defaults by sending no parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOptions;

impl OptionsProvider for DefaultOptions {
    fn parameters(&self) -> BundleParameters {
        BundleParameters::new()
    }
}

/// Parameters collected before the run starts, e.g. from an interactive prompt.
#[derive(Debug, Default, Clone)]
pub struct FixedOptions(BundleParameters);

impl FixedOptions {
    pub fn new(parameters: BundleParameters) -> Self {
        Self(parameters)
    }
}

impl OptionsProvider for FixedOptions {
    fn parameters(&self) -> BundleParameters {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_options_are_empty() {
        assert!(DefaultOptions.parameters().is_empty());
    }

    #[test]
    fn fixed_options_return_the_same_parameters_every_time() {
        let mut params = BundleParameters::new();
        params.insert("system".into(), json!(false));
        let options = FixedOptions::new(params.clone());
        assert_eq!(options.parameters(), params);
        assert_eq!(options.parameters(), params);
    }
}
