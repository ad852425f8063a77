use std::fmt;

pub const ROOT_FORM: &str = "_ROOT_";
pub const ROOT_TAG: &str = "ROOT";

/// Whether an edit action has touched a token. Once `Edited`, a token is never
/// the target of another substitution or deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EditState {
  #[default]
  Original,
  Edited,
}

/// One word of a sentence. `id` is the current 1-based position (0 is ROOT) and
/// moves whenever an insertion or deletion happens to its left.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Token {
  pub id: usize,
  pub form: String,
  pub lemma: String,
  pub ctag: String,
  pub tag: String,
  /// Raw morphology column, kept for output
  pub feats: String,
  /// Gold head, when known
  pub parent: Option<usize>,
  pub prel: String,
  /// Predicted head, filled in by `DependencyGraph::annotate`
  pub pparent: Option<usize>,
  pub pprel: Option<String>,
  pub edit: EditState,
  /// Bounded span this token must first be attached inside of
  pub span_id: Option<usize>,
  pub extra: String,
}

impl Token {
  pub fn new(id: usize, form: impl Into<String>, tag: impl Into<String>) -> Self {
    let tag = tag.into();
    Self {
      id,
      form: form.into(),
      lemma: "_".to_string(),
      ctag: tag.clone(),
      tag,
      feats: "_".to_string(),
      prel: "_".to_string(),
      extra: "_".to_string(),
      ..Default::default()
    }
  }

  pub fn with_parent(mut self, parent: usize) -> Self {
    self.parent = Some(parent);
    self
  }

  pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
    self.lemma = lemma.into();
    self
  }

  /// The ROOT pseudo-token prepended to every sentence.
  pub fn root() -> Self {
    let mut root = Self::new(0, ROOT_FORM, ROOT_TAG);
    root.prel = "--".to_string();
    root
  }

  /// A token materialized by an insert action. Its gold head is a placeholder
  /// pointing at its right neighbour.
  pub fn inserted(id: usize, form: impl Into<String>, tag: impl Into<String>) -> Self {
    let mut tok = Self::new(id, form, tag);
    tok.lemma = String::new();
    tok.parent = Some(id + 1);
    tok.prel = "DEP".to_string();
    tok.edit = EditState::Edited;
    tok
  }

  pub fn is_root(&self) -> bool {
    self.id == 0
  }

  pub fn is_edited(&self) -> bool {
    self.edit == EditState::Edited
  }

  /// Copy of this token renumbered for an insertion at `bound`: every position
  /// at or after it moves one to the right.
  pub fn shifted_up(&self, bound: usize) -> Self {
    let up = |i: usize| if i >= bound { i + 1 } else { i };
    Self {
      id: up(self.id),
      parent: self.parent.map(up),
      pparent: self.pparent.map(up),
      ..self.clone()
    }
  }

  /// Copy of this token renumbered for a deletion at `bound`: every position
  /// after it moves one to the left.
  pub fn shifted_down(&self, bound: usize) -> Self {
    let down = |i: usize| if i > bound { i - 1 } else { i };
    Self {
      id: down(self.id),
      parent: self.parent.map(down),
      pparent: self.pparent.map(down),
      ..self.clone()
    }
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}/{}", self.id, self.form, self.tag)
  }
}

/// Prepends ROOT and renumbers so that `sent[k].id == k`.
pub fn with_root(sent: &[Token]) -> Vec<Token> {
  std::iter::once(Token::root())
    .chain(sent.iter().cloned())
    .enumerate()
    .map(|(idx, mut tok)| {
      tok.id = idx;
      tok
    })
    .collect()
}

pub fn forms(sent: &[Token]) -> Vec<String> {
  sent.iter().map(|t| t.form.clone()).collect()
}
