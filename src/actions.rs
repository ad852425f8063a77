use std::fmt;
use std::rc::Rc;

use crate::error::ParseError;
use crate::graph::DependencyGraph;
use crate::token::Token;

pub const DETERMINERS: [&str; 3] = ["a", "an", "the"];
/// Order matters: the first best-scoring substitute wins.
pub const SUBSTITUTE_DETERMINERS: [&str; 3] = ["a", "the", "an"];
pub const PREPOSITIONS: [&str; 10] = [
  "on", "about", "from", "for", "of", "to", "at", "in", "with", "by",
];
/// Tags before which a missing preposition may be inserted
pub const PREP_CONTEXT_TAGS: [&str; 9] = [
  "NN", "NNS", "DT", "CD", "JJ", "JJR", "JJS", "NNP", "NNPS",
];
/// Tags before which a missing determiner may be inserted
pub const DET_CONTEXT_TAGS: [&str; 5] = ["NN", "NNS", "JJ", "JJR", "JJS"];

/// Number of scores a scorer must return per pair when edits are enabled.
pub const NUM_CLASSES: usize = 10;
/// Number of scores needed by attach-only parsing.
pub const NUM_ATTACH_CLASSES: usize = 2;

/// Every action the parser can take on an adjacent pair `(tok1, tok2)`.
/// The discriminant is the index into the scorer's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
  /// tok1 becomes a child of tok2
  AttachLeft = 0,
  /// tok2 becomes a child of tok1
  AttachRight = 1,
  SubstituteNoun = 2,
  DeleteDet = 3,
  InsertDet = 4,
  SubstituteVerbForm = 5,
  SubstitutePrep = 6,
  DeletePrep = 7,
  InsertPrep = 8,
  SubstituteDet = 9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
  Attach,
  Substitute,
  Insert,
  Delete,
}

impl ActionClass {
  pub const ALL: [ActionClass; NUM_CLASSES] = [
    Self::AttachLeft,
    Self::AttachRight,
    Self::SubstituteNoun,
    Self::DeleteDet,
    Self::InsertDet,
    Self::SubstituteVerbForm,
    Self::SubstitutePrep,
    Self::DeletePrep,
    Self::InsertPrep,
    Self::SubstituteDet,
  ];

  pub fn index(self) -> usize {
    self as usize
  }

  pub fn from_index(idx: usize) -> Result<Self, ParseError> {
    Self::ALL
      .get(idx)
      .copied()
      .ok_or(ParseError::UnknownActionClass(idx))
  }

  pub fn kind(self) -> ActionKind {
    match self {
      Self::AttachLeft | Self::AttachRight => ActionKind::Attach,
      Self::SubstituteNoun
      | Self::SubstituteVerbForm
      | Self::SubstitutePrep
      | Self::SubstituteDet => ActionKind::Substitute,
      Self::InsertDet | Self::InsertPrep => ActionKind::Insert,
      Self::DeleteDet | Self::DeletePrep => ActionKind::Delete,
    }
  }

  pub fn is_attach(self) -> bool {
    self.kind() == ActionKind::Attach
  }

  pub fn is_edit(self) -> bool {
    !self.is_attach()
  }
}

impl fmt::Display for ActionClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::AttachLeft => "attach-left",
      Self::AttachRight => "attach-right",
      Self::SubstituteNoun => "substitute-noun",
      Self::DeleteDet => "delete-det",
      Self::InsertDet => "insert-det",
      Self::SubstituteVerbForm => "substitute-vform",
      Self::SubstitutePrep => "substitute-prep",
      Self::DeletePrep => "delete-prep",
      Self::InsertPrep => "insert-prep",
      Self::SubstituteDet => "substitute-det",
    };
    write!(f, "{}", name)
  }
}

/// One scored action on the current step. `parent` and `child` index into the
/// working sequence; for edits `parent` is the token being edited.
#[derive(Debug, Clone)]
pub struct Candidate {
  pub score: f64,
  pub action: ActionClass,
  pub features: Rc<[String]>,
  pub parent: usize,
  pub child: usize,
}

impl Candidate {
  /// Position in the working sequence the action is applied at
  pub fn position(&self) -> usize {
    self.parent
  }
}

fn is_noun(tok: &Token) -> bool {
  tok.tag == "NN" || tok.tag == "NNS"
}

fn is_determiner(tok: &Token) -> bool {
  DETERMINERS.contains(&tok.form.as_str())
}

fn is_target_prep(tok: &Token) -> bool {
  tok.tag == "IN" && PREPOSITIONS.contains(&tok.form.as_str())
}

fn is_capitalized(tok: &Token) -> bool {
  tok.form.chars().next().is_some_and(char::is_uppercase)
}

/// Attach actions legal on the pair at `i`. ROOT may only take its single
/// dependent once it and one other token are all that remain, and then it must.
pub fn attach_actions(parsed: &[Token], i: usize) -> Vec<(ActionClass, usize, usize)> {
  let tok1 = &parsed[i];
  if tok1.is_root() {
    if parsed.len() == 2 {
      vec![(ActionClass::AttachRight, i, i + 1)]
    } else {
      Vec::new()
    }
  } else {
    vec![
      (ActionClass::AttachLeft, i + 1, i),
      (ActionClass::AttachRight, i, i + 1),
    ]
  }
}

/// Edit actions legal on the pair at `i`, all targeting `tok2`. Gating looks at
/// the tags and forms of the pair, whether `tok2` has already been edited, and
/// whether it already has dependents. `sent_len` includes ROOT.
pub fn edit_actions(
  parsed: &[Token],
  graph: &DependencyGraph,
  i: usize,
  sent_len: usize,
) -> Vec<(ActionClass, usize, usize)> {
  let (tok1, tok2) = (&parsed[i], &parsed[i + 1]);
  let untouched = !tok2.is_edited();
  let childless = graph.num_children(tok2) == 0;

  let mut out = Vec::new();
  let mut push = |action| out.push((action, i + 1, i));

  if is_noun(tok2) && untouched {
    push(ActionClass::SubstituteNoun);
  }
  if is_determiner(tok2) && untouched && childless {
    push(ActionClass::DeleteDet);
  }
  if DET_CONTEXT_TAGS.contains(&tok2.tag.as_str()) && !is_capitalized(tok2) && tok1.tag != "DT" {
    push(ActionClass::InsertDet);
  }
  if tok2.tag.starts_with("VB") && untouched {
    push(ActionClass::SubstituteVerbForm);
  }
  if is_target_prep(tok2) && untouched {
    push(ActionClass::SubstitutePrep);
    if childless {
      push(ActionClass::DeletePrep);
    }
  }
  if PREP_CONTEXT_TAGS.contains(&tok2.tag.as_str()) && tok1.tag != "IN" {
    push(ActionClass::InsertPrep);
  }
  if is_determiner(tok2) && tok2.tag == "DT" && tok2.id < sent_len && untouched && childless {
    push(ActionClass::SubstituteDet);
  }

  out
}
