use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Token-level Levenshtein distance, with unit cost for insertion, deletion and
/// substitution.
///
/// ```
/// let hyp = ["he", "go", "to", "school"];
/// let gold = ["he", "goes", "to", "the", "school"];
///
/// assert_eq!(easyfirst::utils::edit_distance(&hyp, &gold), 2);
/// assert_eq!(easyfirst::utils::edit_distance(&gold, &gold), 0);
/// ```
pub fn edit_distance<T, U>(hyp: &[T], gold: &[U]) -> usize
where
  T: AsRef<str>,
  U: AsRef<str>,
{
  if hyp.is_empty() {
    return gold.len();
  }

  // single rolling row over `hyp`, one pass per gold token
  let mut row: Vec<usize> = (0..=hyp.len()).collect();
  for (i, g) in gold.iter().enumerate() {
    let mut diag = row[0];
    row[0] = i + 1;
    for (j, h) in hyp.iter().enumerate() {
      let sub = if h.as_ref() == g.as_ref() { diag } else { diag + 1 };
      let best = sub.min(row[j] + 1).min(row[j + 1] + 1);
      diag = row[j + 1];
      row[j + 1] = best;
    }
  }

  row[hyp.len()]
}

/// Space-joins surface forms into the sentence string handed to a language model.
/// The ROOT pseudo-token at index 0 is never part of it.
pub fn lm_sentence<T: AsRef<str>>(forms: &[T]) -> String {
  forms
    .iter()
    .skip(1)
    .map(|f| f.as_ref())
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_edit_distance_basic() {
    assert_eq!(edit_distance::<&str, &str>(&[], &[]), 0);
    assert_eq!(edit_distance(&["a"], &[] as &[&str]), 1);
    assert_eq!(edit_distance(&[] as &[&str], &["a", "b"]), 2);
    assert_eq!(edit_distance(&["a", "b", "c"], &["a", "c"]), 1);
    assert_eq!(edit_distance(&["a", "c"], &["a", "b", "c"]), 1);
    assert_eq!(edit_distance(&["a", "x", "c"], &["a", "b", "c"]), 1);
    assert_eq!(edit_distance(&["x", "y"], &["a", "b", "c"]), 3);
  }

  #[test]
  fn test_lm_sentence_skips_root() {
    let forms = vec!["_ROOT_".to_string(), "the".into(), "dog".into()];
    assert_eq!(lm_sentence(&forms), "the dog");
  }
}
