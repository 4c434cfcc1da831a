//! Rolling volatility window.
//!
//! Fixed-capacity ring over recent volatility index samples. Storage is
//! allocated up front at construction; the window is never resized and is
//! valid to read before it fills.

/// Bollinger bands over the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub mean: f64,
    pub upper: f64,
    pub lower: f64,
}

impl BollingerBands {
    /// Whether a sample lies within the bands, bounds inclusive.
    pub fn contains(&self, sample: f64) -> bool {
        self.lower <= sample && sample <= self.upper
    }
}

/// Fixed-capacity ring buffer of volatility samples.
#[derive(Debug, Clone)]
pub struct VolatilityWindow {
    samples: Vec<f64>,
    head: usize,
    count: usize,
}

impl VolatilityWindow {
    /// Create a window holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            head: 0,
            count: 0,
        }
    }

    /// Append a sample, evicting the oldest once full.
    pub fn push(&mut self, value: f64) {
        if self.samples.is_empty() {
            return;
        }
        self.samples[self.head] = value;
        self.head = (self.head + 1) % self.samples.len();
        self.count = (self.count + 1).min(self.samples.len());
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn is_full(&self) -> bool {
        !self.samples.is_empty() && self.count == self.samples.len()
    }

    /// Mean over the filled portion; 0.0 when empty.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.filled().iter().sum::<f64>() / self.count as f64
    }

    /// Population standard deviation over the filled portion.
    ///
    /// Returns 0.0 with fewer than 3 samples; a dispersion estimate from one
    /// or two points is noise.
    pub fn stddev(&self) -> f64 {
        if self.count < 3 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .filled()
            .iter()
            .map(|v| {
                let d = v - mean;
                d * d
            })
            .sum::<f64>()
            / self.count as f64;
        var.sqrt()
    }

    /// Bollinger bands `mean ± num_std * stddev` over the filled portion.
    ///
    /// `None` until at least `period` samples have been observed.
    pub fn bollinger_bands(&self, period: usize, num_std: f64) -> Option<BollingerBands> {
        if period == 0 || self.count < period {
            return None;
        }
        let mean = self.mean();
        let band = num_std * self.stddev();
        Some(BollingerBands {
            mean,
            upper: mean + band,
            lower: mean - band,
        })
    }

    /// The written slice. Order is irrelevant to every consumer here, so the
    /// wrap point is not reconstructed.
    fn filled(&self) -> &[f64] {
        &self.samples[..self.count]
    }
}
