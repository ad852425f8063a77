use rand::prelude::*;

/// Decides when training follows the model's own (possibly wrong) choice
/// instead of an oracle-approved one.
///
/// From iteration `first_iter` on, each wrong choice is followed with
/// probability `rate`.
#[derive(Debug, Clone)]
pub struct ExplorePolicy {
  pub first_iter: usize,
  pub rate: f64,
  rng: StdRng,
}

impl ExplorePolicy {
  pub fn new(first_iter: usize, rate: f64, seed: u64) -> Self {
    Self {
      first_iter,
      rate,
      rng: StdRng::seed_from_u64(seed),
    }
  }

  /// Never explore: plain dynamic-oracle training.
  pub fn none(seed: u64) -> Self {
    Self::new(0, 0.0, seed)
  }

  pub fn coling2012(seed: u64) -> Self {
    Self::new(2, 0.9, seed)
  }

  pub fn always(seed: u64) -> Self {
    Self::new(0, 1.0, seed)
  }

  /// Looks up one of the named presets.
  pub fn from_name(name: &str, seed: u64) -> Option<Self> {
    match name {
      "none" => Some(Self::none(seed)),
      "coling2012" => Some(Self::coling2012(seed)),
      "always" => Some(Self::always(seed)),
      _ => None,
    }
  }

  pub fn should_explore(&mut self, iter: usize) -> bool {
    iter >= self.first_iter && self.rng.r#gen::<f64>() < self.rate
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_presets() {
    let mut never = ExplorePolicy::none(1);
    let mut always = ExplorePolicy::always(1);
    for iter in 0..50 {
      assert!(!never.should_explore(iter));
      assert!(always.should_explore(iter));
    }

    let mut late = ExplorePolicy::coling2012(1);
    assert!(!late.should_explore(0));
    assert!(!late.should_explore(1));
    assert!(ExplorePolicy::from_name("bogus", 1).is_none());
  }

  #[test]
  fn test_seeded_is_reproducible() {
    let mut a = ExplorePolicy::new(0, 0.5, 7);
    let mut b = ExplorePolicy::new(0, 0.5, 7);
    let xs: Vec<bool> = (0..32).map(|i| a.should_explore(i)).collect();
    let ys: Vec<bool> = (0..32).map(|i| b.should_explore(i)).collect();
    assert_eq!(xs, ys);
    assert!(xs.iter().any(|&x| x) && xs.iter().any(|&x| !x));
  }
}
