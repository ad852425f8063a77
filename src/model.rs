use std::collections::HashMap;

/// Always-on feature added to every feature list
pub const BIAS: &str = "**BIAS**";

/// Maps a feature list to one score per action class.
pub trait Scorer {
  fn num_classes(&self) -> usize;
  fn scores(&self, features: &[String]) -> Vec<f64>;
}

/// A scorer that can be updated online.
pub trait TrainableScorer: Scorer {
  /// Adds `delta` to the weight of every feature in `features` for `class`.
  fn add(&mut self, features: &[String], class: usize, delta: f64);
  /// Marks the start of a new training example.
  fn tick(&mut self);
}

fn dot(weights: &HashMap<String, Vec<f64>>, features: &[String], nclasses: usize) -> Vec<f64> {
  let mut scores = vec![0.0; nclasses];
  let bias = std::iter::once(BIAS);
  for f in bias.chain(features.iter().map(String::as_str)) {
    if let Some(w) = weights.get(f) {
      for (s, w) in scores.iter_mut().zip(w.iter()) {
        *s += w;
      }
    }
  }
  scores
}

/// Plain multiclass linear model, used for inference once training is done.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearModel {
  nclasses: usize,
  weights: HashMap<String, Vec<f64>>,
}

impl LinearModel {
  pub fn new(nclasses: usize) -> Self {
    Self {
      nclasses,
      weights: HashMap::new(),
    }
  }

  pub fn set(&mut self, feature: &str, class: usize, weight: f64) {
    let n = self.nclasses;
    if let Some(w) = self
      .weights
      .entry(feature.to_string())
      .or_insert_with(|| vec![0.0; n])
      .get_mut(class)
    {
      *w = weight;
    }
  }

  pub fn weight(&self, feature: &str, class: usize) -> f64 {
    self
      .weights
      .get(feature)
      .and_then(|w| w.get(class))
      .copied()
      .unwrap_or(0.0)
  }

  /// Number of features with a weight vector
  pub fn len(&self) -> usize {
    self.weights.len()
  }

  pub fn is_empty(&self) -> bool {
    self.weights.is_empty()
  }
}

impl Scorer for LinearModel {
  fn num_classes(&self) -> usize {
    self.nclasses
  }

  fn scores(&self, features: &[String]) -> Vec<f64> {
    dot(&self.weights, features, self.nclasses)
  }
}

/// Multiclass averaged perceptron.
///
/// Averaging is lazy: each weight remembers the step it was last changed at, and
/// its running total is only brought up to date when it changes again (or when
/// `average` is called). A step is one `tick`.
#[derive(Debug, Clone, Default)]
pub struct Perceptron {
  nclasses: usize,
  step: usize,
  weights: HashMap<String, Vec<f64>>,
  totals: HashMap<String, Vec<f64>>,
  stamps: HashMap<String, Vec<usize>>,
}

impl Perceptron {
  pub fn new(nclasses: usize) -> Self {
    Self {
      nclasses,
      ..Default::default()
    }
  }

  pub fn steps(&self) -> usize {
    self.step
  }

  fn update(&mut self, feature: &str, class: usize, delta: f64) {
    let n = self.nclasses;
    let w = self
      .weights
      .entry(feature.to_string())
      .or_insert_with(|| vec![0.0; n]);
    let total = self
      .totals
      .entry(feature.to_string())
      .or_insert_with(|| vec![0.0; n]);
    let stamp = self
      .stamps
      .entry(feature.to_string())
      .or_insert_with(|| vec![0; n]);

    let now = self.step.max(1);
    total[class] += (now - stamp[class]) as f64 * w[class];
    stamp[class] = now;
    w[class] += delta;
  }

  /// Averaged weights over every step so far, counting the current one. An
  /// update made during a step is in effect for that whole step.
  pub fn average(&self) -> LinearModel {
    let now = self.step.max(1);
    let mut model = LinearModel::new(self.nclasses);
    for (feature, w) in self.weights.iter() {
      let (Some(total), Some(stamp)) = (self.totals.get(feature), self.stamps.get(feature)) else {
        continue;
      };
      let averaged = (0..self.nclasses)
        .map(|c| {
          let live = if stamp[c] == 0 { 0 } else { now - stamp[c] + 1 };
          (total[c] + live as f64 * w[c]) / now as f64
        })
        .collect();
      model.weights.insert(feature.clone(), averaged);
    }
    model
  }
}

impl Scorer for Perceptron {
  fn num_classes(&self) -> usize {
    self.nclasses
  }

  fn scores(&self, features: &[String]) -> Vec<f64> {
    dot(&self.weights, features, self.nclasses)
  }
}

impl TrainableScorer for Perceptron {
  fn add(&mut self, features: &[String], class: usize, delta: f64) {
    if class >= self.nclasses {
      return;
    }
    self.update(BIAS, class, delta);
    for f in features {
      self.update(f, class, delta);
    }
  }

  fn tick(&mut self) {
    self.step += 1;
  }
}
