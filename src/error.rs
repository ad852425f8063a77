use crate::actions::ActionClass;

/// Contract violations and malformed input. Everything here aborts the sentence
/// being processed.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
  #[error("token {child} already has a parent, can't attach it to {parent}")]
  DuplicateAttachment { parent: usize, child: usize },

  #[error("no parent recorded for token {0}")]
  MissingParent(usize),

  #[error("no legal action with {remaining} tokens remaining")]
  NoCandidates { remaining: usize },

  #[error("unknown action class {0}")]
  UnknownActionClass(usize),

  #[error("{action} can't target token {id}: already edited")]
  EditedTarget { action: ActionClass, id: usize },

  #[error("{action} can't target token {id}: {reason}")]
  InvalidTarget {
    action: ActionClass,
    id: usize,
    reason: String,
  },

  #[error("empty candidate set for {0}")]
  EmptyCandidates(ActionClass),

  #[error("scorer returned {got} scores, needed {needed}")]
  ScoreArity { needed: usize, got: usize },

  #[error("incomplete derivation: {edges} edges but highest child id is {max_child}")]
  IncompleteDerivation { edges: usize, max_child: usize },

  #[error("line {line}: {msg}")]
  Conll { line: usize, msg: String },
}
