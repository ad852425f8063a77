use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::error::ParseError;
use crate::token::Token;

/// Partial dependency tree built up by the parser, indexed by token id.
///
/// Besides the raw `(parent, child)` relation the graph keeps the derived
/// indexes feature extraction asks for on every step: the outermost and
/// second-outermost child on each side of a head, and child counts per side.
/// All of these refer to ids directly, so when an edit changes the length of
/// the sentence the whole structure is renumbered with `increment` or
/// `decrement`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
  edges: BTreeSet<(usize, usize)>,
  /// Snapshot of every token taking part in an edge
  tokens: HashMap<usize, Token>,
  parents: HashMap<usize, usize>,
  labels: HashMap<usize, String>,
  /// Children per head, sorted by id
  children: HashMap<usize, Vec<usize>>,
  left_child: HashMap<usize, usize>,
  right_child: HashMap<usize, usize>,
  left_child2: HashMap<usize, usize>,
  right_child2: HashMap<usize, usize>,
  num_left: HashMap<usize, usize>,
  num_right: HashMap<usize, usize>,
}

impl DependencyGraph {
  pub fn new() -> Self {
    Default::default()
  }

  /// Number of recorded edges
  pub fn len(&self) -> usize {
    self.edges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn edges(&self) -> &BTreeSet<(usize, usize)> {
    &self.edges
  }

  pub fn token(&self, id: usize) -> Option<&Token> {
    self.tokens.get(&id)
  }

  pub fn has_parent(&self, tok: &Token) -> bool {
    self.parents.contains_key(&tok.id)
  }

  /// Highest child id in the relation, if any
  pub fn max_child(&self) -> Option<usize> {
    self.edges.iter().map(|&(_, c)| c).max()
  }

  /// Records `parent -> child`. A child can only be attached once.
  pub fn add(&mut self, parent: &Token, child: &Token, label: &str) -> Result<(), ParseError> {
    if self.parents.contains_key(&child.id) {
      return Err(ParseError::DuplicateAttachment {
        parent: parent.id,
        child: child.id,
      });
    }

    self.edges.insert((parent.id, child.id));
    self.parents.insert(child.id, parent.id);
    self.labels.insert(child.id, label.to_string());

    let mut child = child.clone();
    child.pprel = Some(label.to_string());
    self.tokens.insert(child.id, child.clone());
    self.tokens.insert(parent.id, parent.clone());

    let siblings = self.children.entry(parent.id).or_default();
    let pos = siblings.partition_point(|&c| c < child.id);
    siblings.insert(pos, child.id);
    self.reindex(parent.id);

    Ok(())
  }

  /// Inverse of `add`.
  pub fn remove(&mut self, parent: &Token, child: &Token) -> Result<(), ParseError> {
    if !self.edges.remove(&(parent.id, child.id)) {
      return Err(ParseError::MissingParent(child.id));
    }

    self.parents.remove(&child.id);
    self.labels.remove(&child.id);
    if let Some(siblings) = self.children.get_mut(&parent.id) {
      siblings.retain(|&c| c != child.id);
      if siblings.is_empty() {
        self.children.remove(&parent.id);
      }
    }
    self.reindex(parent.id);

    Ok(())
  }

  /// Replaces the stored snapshot of `tok` after its surface form changed,
  /// keeping the predicted label.
  pub fn refresh(&mut self, tok: &Token) {
    if let Some(stored) = self.tokens.get_mut(&tok.id) {
      let pprel = stored.pprel.take();
      *stored = tok.clone();
      stored.pprel = pprel;
    }
  }

  /// Rebuilds the outermost-child indexes and side counts of one head from its
  /// child list.
  fn reindex(&mut self, pid: usize) {
    let kids = self.children.get(&pid).cloned().unwrap_or_default();
    let left: Vec<usize> = kids.iter().copied().filter(|&c| c < pid).collect();
    let right: Vec<usize> = kids.iter().copied().filter(|&c| c > pid).collect();

    fn set(map: &mut HashMap<usize, usize>, k: usize, v: Option<usize>) {
      match v {
        Some(v) => map.insert(k, v),
        None => map.remove(&k),
      };
    }

    set(&mut self.left_child, pid, left.first().copied());
    set(&mut self.left_child2, pid, left.get(1).copied());
    set(&mut self.right_child, pid, right.last().copied());
    set(&mut self.right_child2, pid, right.iter().rev().nth(1).copied());
    set(&mut self.num_left, pid, Some(left.len()).filter(|&n| n > 0));
    set(&mut self.num_right, pid, Some(right.len()).filter(|&n| n > 0));
  }

  pub fn parent(&self, tok: &Token) -> Option<&Token> {
    self.parents.get(&tok.id).and_then(|p| self.tokens.get(p))
  }

  pub fn children(&self, tok: &Token) -> Vec<&Token> {
    self
      .children
      .get(&tok.id)
      .map(|kids| kids.iter().filter_map(|c| self.tokens.get(c)).collect())
      .unwrap_or_default()
  }

  pub fn num_children(&self, tok: &Token) -> usize {
    self.children.get(&tok.id).map_or(0, Vec::len)
  }

  pub fn left_child(&self, tok: &Token) -> Option<&Token> {
    self.left_child.get(&tok.id).and_then(|c| self.tokens.get(c))
  }

  pub fn right_child(&self, tok: &Token) -> Option<&Token> {
    self.right_child.get(&tok.id).and_then(|c| self.tokens.get(c))
  }

  pub fn left_child2(&self, tok: &Token) -> Option<&Token> {
    self.left_child2.get(&tok.id).and_then(|c| self.tokens.get(c))
  }

  pub fn right_child2(&self, tok: &Token) -> Option<&Token> {
    self.right_child2.get(&tok.id).and_then(|c| self.tokens.get(c))
  }

  pub fn num_left_children(&self, tok: &Token) -> usize {
    self.num_left.get(&tok.id).copied().unwrap_or(0)
  }

  pub fn num_right_children(&self, tok: &Token) -> usize {
    self.num_right.get(&tok.id).copied().unwrap_or(0)
  }

  pub fn label_for(&self, tok: &Token) -> Option<&str> {
    self.labels.get(&tok.id).map(String::as_str)
  }

  fn side_labels(&self, tok: &Token, left: bool) -> String {
    self
      .children(tok)
      .into_iter()
      .filter(|c| (c.id < tok.id) == left)
      .filter_map(|c| self.label_for(c))
      .collect::<Vec<_>>()
      .join("-")
  }

  /// Labels of the children left of `tok`, hyphen-joined in id order
  pub fn left_labels(&self, tok: &Token) -> String {
    self.side_labels(tok, true)
  }

  /// Labels of the children right of `tok`, hyphen-joined in id order
  pub fn right_labels(&self, tok: &Token) -> String {
    self.side_labels(tok, false)
  }

  /// The sibling `offset` places away from `tok` in id order, if `tok` has a
  /// parent and that position exists.
  pub fn sibling(&self, tok: &Token, offset: isize) -> Option<&Token> {
    let parent = self.parents.get(&tok.id)?;
    let siblings = self.children.get(parent)?;
    let idx = siblings.iter().position(|&c| c == tok.id)?;
    let target = idx.checked_add_signed(offset)?;
    siblings.get(target).and_then(|c| self.tokens.get(c))
  }

  pub fn left_border(&self, tok: &Token) -> usize {
    match self.left_child(tok) {
      Some(l) => self.left_border(l),
      None => tok.id,
    }
  }

  pub fn right_border(&self, tok: &Token) -> usize {
    match self.right_child(tok) {
      Some(r) => self.right_border(r),
      None => tok.id,
    }
  }

  /// Width of the subtree under `tok`: rightmost descendant id minus leftmost
  pub fn span(&self, tok: &Token) -> usize {
    self.right_border(tok) - self.left_border(tok)
  }

  /// Longest path from `tok` down to a leaf, counting nodes. Leaves are 1.
  pub fn get_depth(&self, tok: &Token) -> usize {
    self
      .children(tok)
      .into_iter()
      .map(|c| self.get_depth(c))
      .max()
      .map_or(1, |d| d + 1)
  }

  /// Renumbers for a token inserted at `bound`: every id >= bound moves up one.
  pub fn increment(&mut self, bound: usize) {
    debug!(bound, edges = self.edges.len(), "incrementing graph");
    let up = |i: usize| Some(if i >= bound { i + 1 } else { i });
    self.shift(up, |t| t.shifted_up(bound));
  }

  /// Renumbers for the token at `bound` being deleted: its own entries are
  /// dropped and every id > bound moves down one.
  pub fn decrement(&mut self, bound: usize) {
    debug!(bound, edges = self.edges.len(), "decrementing graph");
    let orphaned_head = self.parents.get(&bound).copied();
    let down = |i: usize| match i.cmp(&bound) {
      std::cmp::Ordering::Less => Some(i),
      std::cmp::Ordering::Equal => None,
      std::cmp::Ordering::Greater => Some(i - 1),
    };
    self.shift(down, |t| t.shifted_down(bound));

    if let Some(head) = orphaned_head.and_then(down) {
      self.reindex(head);
    }
  }

  /// Applies an id mapping to every index. Ids mapped to `None` are dropped,
  /// along with every entry that references them.
  fn shift<F, G>(&mut self, f: F, shift_token: G)
  where
    F: Fn(usize) -> Option<usize>,
    G: Fn(&Token) -> Token,
  {
    fn remap_keys<V, F>(map: &mut HashMap<usize, V>, f: &F, mut g: impl FnMut(V) -> Option<V>)
    where
      F: Fn(usize) -> Option<usize>,
    {
      *map = std::mem::take(map)
        .into_iter()
        .filter_map(|(k, v)| Some((f(k)?, g(v)?)))
        .collect();
    }

    self.edges = std::mem::take(&mut self.edges)
      .into_iter()
      .filter_map(|(p, c)| Some((f(p)?, f(c)?)))
      .collect();

    self.tokens = std::mem::take(&mut self.tokens)
      .into_iter()
      .filter_map(|(k, tok)| Some((f(k)?, shift_token(&tok))))
      .collect();

    remap_keys(&mut self.parents, &f, |v| f(v));
    remap_keys(&mut self.labels, &f, Some);
    remap_keys(&mut self.children, &f, |kids: Vec<usize>| {
      let kids: Vec<usize> = kids.into_iter().filter_map(&f).collect();
      if kids.is_empty() { None } else { Some(kids) }
    });
    for map in [
      &mut self.left_child,
      &mut self.right_child,
      &mut self.left_child2,
      &mut self.right_child2,
    ] {
      remap_keys(map, &f, |v| f(v));
    }
    remap_keys(&mut self.num_left, &f, Some);
    remap_keys(&mut self.num_right, &f, Some);
  }

  /// Writes predicted heads and labels back onto `sent` (ROOT excluded).
  /// Tokens that never got a head are attached to ROOT after a warning; the
  /// number of such tokens is returned.
  pub fn annotate(&self, sent: &mut [Token]) -> usize {
    let mut defaulted = 0;
    for tok in sent.iter_mut() {
      match self.parents.get(&tok.id) {
        Some(&p) => {
          tok.pparent = Some(p);
          tok.pprel = self.labels.get(&tok.id).cloned();
        }
        None => {
          warn!(id = tok.id, form = %tok.form, "no parent recorded, defaulting to root-parent");
          tok.pparent = Some(0);
          tok.pprel = None;
          defaulted += 1;
        }
      }
    }
    defaulted
  }

  /// Checks that every derived index agrees with the edge set.
  pub fn is_consistent(&self) -> bool {
    let mut rebuilt = Self::new();
    for &(p, c) in self.edges.iter() {
      let parent = self.tokens.get(&p).cloned().unwrap_or_else(|| Token::new(p, "", ""));
      let mut child = self.tokens.get(&c).cloned().unwrap_or_else(|| Token::new(c, "", ""));
      child.id = c;
      let label = self.labels.get(&c).cloned().unwrap_or_default();
      if rebuilt.add(&parent, &child, &label).is_err() {
        return false;
      }
    }

    rebuilt.parents == self.parents
      && rebuilt.children == self.children
      && rebuilt.left_child == self.left_child
      && rebuilt.right_child == self.right_child
      && rebuilt.left_child2 == self.left_child2
      && rebuilt.right_child2 == self.right_child2
      && rebuilt.num_left == self.num_left
      && rebuilt.num_right == self.num_right
      && self.tokens.iter().all(|(&k, t)| k == t.id)
  }
}
