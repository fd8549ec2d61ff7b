use crate::DebugParams;

/// Host-side owner of the layer being shown.
///
/// The layer sampler never validates its `layer` parameter, so every change
/// goes through here and stays inside `0..layer_count`.
#[derive(Debug, Clone)]
pub struct LayerView {
    layer: u32,
    layer_count: u32,
    /// Seconds each layer stays on screen while cycling.
    cycle: Option<f32>,
    elapsed: f32,
    /// Layer last handed out by `params_dirty`, used to skip redundant
    /// uniform uploads.
    last_uploaded: Option<u32>,
}

impl LayerView {
    pub fn new(layer_count: u32) -> Self {
        Self {
            layer: 0,
            layer_count: layer_count.max(1),
            cycle: None,
            elapsed: 0.0,
            last_uploaded: None,
        }
    }

    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    pub fn cycle(&self) -> Option<f32> {
        self.cycle
    }

    pub fn next(&mut self) {
        self.layer = (self.layer + 1) % self.layer_count;
    }

    pub fn prev(&mut self) {
        self.layer = (self.layer + self.layer_count - 1) % self.layer_count;
    }

    pub fn first(&mut self) {
        self.layer = 0;
    }

    pub fn last(&mut self) {
        self.layer = self.layer_count - 1;
    }

    /// Select `index`, clamped to the last layer.
    pub fn select(&mut self, index: u32) {
        self.layer = index.min(self.layer_count - 1);
    }

    /// Enable or disable automatic cycling. Non-positive periods disable it.
    pub fn set_cycle(&mut self, seconds_per_layer: Option<f32>) {
        self.cycle = seconds_per_layer.filter(|s| *s > 0.0);
        self.elapsed = 0.0;
    }

    /// Advance time by `dt` seconds, stepping layers while cycling.
    pub fn tick(&mut self, dt: f32) {
        let Some(period) = self.cycle else {
            return;
        };
        self.elapsed += dt.max(0.0);
        if self.elapsed < period {
            return;
        }
        // Step in one go: `period` may be far below the precision of `elapsed`.
        let steps = (self.elapsed / period).floor() as u64;
        self.elapsed %= period;
        let advance = (steps % u64::from(self.layer_count)) as u32;
        self.layer = (self.layer + advance) % self.layer_count;
    }

    pub fn params(&self) -> DebugParams {
        DebugParams::for_layer(self.layer)
    }

    /// Returns true if the layer changed since the last call, i.e. the
    /// uniform buffer must be rewritten before the next draw.
    pub fn params_dirty(&mut self) -> bool {
        let dirty = self.last_uploaded != Some(self.layer);
        if dirty {
            self.last_uploaded = Some(self.layer);
        }
        dirty
    }
}
