//! Stack of configuration sources; the first layer defining a key wins.

use crate::ports::config_port::ConfigPort;

#[derive(Default)]
pub struct LayeredConfig {
    layers: Vec<Box<dyn ConfigPort>>,
}

impl LayeredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer below the ones already present.
    pub fn with_layer(mut self, layer: Box<dyn ConfigPort>) -> Self {
        self.layers.push(layer);
        self
    }
}

impl ConfigPort for LayeredConfig {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.layers
            .iter()
            .find_map(|layer| layer.get_string(section, key))
    }
}
