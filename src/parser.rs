use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::actions::{
  attach_actions, edit_actions, ActionClass, ActionKind, Candidate, DETERMINERS, NUM_ATTACH_CLASSES,
  NUM_CLASSES, PREPOSITIONS, SUBSTITUTE_DETERMINERS,
};
use crate::error::ParseError;
use crate::explore::ExplorePolicy;
use crate::features::{BaselineFeatures, FeatureExtractor};
use crate::graph::DependencyGraph;
use crate::lexicon::Lexicon;
use crate::model::{Scorer, TrainableScorer};
use crate::oracle::CostOracle;
use crate::token::{forms, with_root, EditState, Token};

/// Label recorded on every attachment; parsing is unlabeled.
pub const UNLABELED: &str = "_";

#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
  /// Wrong choices tolerated on one training sentence before it is abandoned
  pub max_updates: usize,
  /// Positions either side of an attachment whose cached scores are dropped
  pub cache_window: usize,
  /// Disables every edit action
  pub attach_only: bool,
  /// Insertions cost nothing only inside a noun-phrase chunk
  pub chunk_gated_insertion: bool,
}

impl Default for ParserConfig {
  fn default() -> Self {
    Self {
      max_updates: 200,
      cache_window: 4,
      attach_only: false,
      chunk_gated_insertion: false,
    }
  }
}

/// One applied step of a derivation. Ids are those current when the step was
/// taken. For edits `parent` is the edited (or newly inserted) token and
/// `form` its new surface form.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
  pub action: ActionClass,
  pub parent: usize,
  pub child: usize,
  pub form: Option<String>,
}

impl fmt::Display for Transition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.form {
      Some(form) => write!(f, "{}({} -> {})", self.action, self.parent, form),
      None => write!(f, "{}({} <- {})", self.action, self.parent, self.child),
    }
  }
}

#[derive(Debug, Clone)]
pub struct ParseOutput {
  pub graph: DependencyGraph,
  /// The final, possibly corrected, sentence without ROOT
  pub sentence: Vec<Token>,
  pub actions: Vec<Transition>,
}

impl ParseOutput {
  /// The sentence with predicted heads written onto it.
  pub fn annotated(&self) -> Vec<Token> {
    let mut sent = self.sentence.clone();
    self.graph.annotate(&mut sent);
    sent
  }

  pub fn forms(&self) -> Vec<String> {
    forms(&self.sentence)
  }

  pub fn num_edits(&self) -> usize {
    self.actions.iter().filter(|t| t.action.is_edit()).count()
  }
}

/// What one training pass over a sentence did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainOutcome {
  /// Summed oracle cost of every top-ranked action
  pub cost: u32,
  pub updates: usize,
  /// The sentence ran past the update budget and was abandoned
  pub skipped: bool,
}

/// Working state of one derivation. `sent` always satisfies `sent[k].id == k`;
/// `parsed` holds the tokens still waiting for a head, in sentence order.
struct Derivation {
  sent: Vec<Token>,
  parsed: Vec<Token>,
  graph: DependencyGraph,
  num_edits: usize,
  max_edits: usize,
  features: HashMap<usize, Rc<[String]>>,
  scores: HashMap<usize, Vec<f64>>,
  actions: Vec<Transition>,
}

impl Derivation {
  fn new(sent: &[Token]) -> Self {
    let sent = with_root(sent);
    let max_edits = sent.len();
    Self {
      parsed: sent.clone(),
      sent,
      graph: DependencyGraph::new(),
      num_edits: 0,
      max_edits,
      features: HashMap::new(),
      scores: HashMap::new(),
      actions: Vec::new(),
    }
  }

  fn edits_allowed(&self) -> bool {
    self.num_edits <= self.max_edits && self.parsed.len() > 2
  }

  fn clear_caches(&mut self) {
    self.features.clear();
    self.scores.clear();
  }

  /// Forgets cached entries for the pairs starting within `window` of `pos`.
  fn invalidate_around(&mut self, pos: usize, window: usize) {
    let from = pos.saturating_sub(window);
    let to = (pos + window).min(self.parsed.len().saturating_sub(1));
    for tok in self.parsed.get(from..to).unwrap_or_default() {
      self.features.remove(&tok.id);
      self.scores.remove(&tok.id);
    }
  }

  /// Scores every legal action over every adjacent pair, in pair order.
  /// `allow` filters pairs before anything is extracted for them.
  fn candidates<S, F>(
    &mut self,
    scorer: &S,
    fx: &F,
    edits: bool,
    allow: impl Fn(&Token, &Token) -> bool,
  ) -> Result<Vec<Candidate>, ParseError>
  where
    S: Scorer + ?Sized,
    F: FeatureExtractor + ?Sized,
  {
    let needed = if edits { NUM_CLASSES } else { NUM_ATTACH_CLASSES };
    let edits = edits && self.edits_allowed();

    let mut out = Vec::new();
    for i in 0..self.parsed.len().saturating_sub(1) {
      if !allow(&self.parsed[i], &self.parsed[i + 1]) {
        continue;
      }

      let tid = self.parsed[i].id;
      let feats = match self.features.get(&tid) {
        Some(f) => f.clone(),
        None => {
          let f: Rc<[String]> = fx.extract(&self.parsed, &self.graph, i, &self.sent).into();
          self.features.insert(tid, f.clone());
          f
        }
      };
      if !self.scores.contains_key(&tid) {
        let s = scorer.scores(&feats);
        if s.len() < needed {
          return Err(ParseError::ScoreArity { needed, got: s.len() });
        }
        self.scores.insert(tid, s);
      }
      let scores = &self.scores[&tid];

      let mut legal = attach_actions(&self.parsed, i);
      if edits {
        legal.extend(edit_actions(&self.parsed, &self.graph, i, self.sent.len()));
      }
      out.extend(legal.into_iter().map(|(action, parent, child)| Candidate {
        score: scores[action.index()],
        action,
        features: feats.clone(),
        parent,
        child,
      }));
    }

    Ok(out)
  }

  /// Applies `cand` to the graph and both token sequences.
  fn apply(&mut self, cand: &Candidate, lexicon: &Lexicon) -> Result<(), ParseError> {
    let pos = cand.position();
    let parent = self.parsed[pos].clone();
    let child = self.parsed[cand.child].clone();
    debug!(action = %cand.action, parent = parent.id, child = child.id, "applying transition");

    let transition = match cand.action.kind() {
      ActionKind::Attach => {
        self.graph.add(&parent, &child, UNLABELED)?;
        self.parsed.remove(cand.child);
        Transition {
          action: cand.action,
          parent: parent.id,
          child: child.id,
          form: None,
        }
      }
      ActionKind::Substitute => {
        let form = self.substitute(cand.action, pos, lexicon)?;
        Transition {
          action: cand.action,
          parent: parent.id,
          child: child.id,
          form: Some(form),
        }
      }
      ActionKind::Delete => {
        self.delete(cand.action, pos)?;
        Transition {
          action: cand.action,
          parent: parent.id,
          child: child.id,
          form: Some(String::new()),
        }
      }
      ActionKind::Insert => {
        let (id, form) = self.insert(cand.action, pos, lexicon)?;
        Transition {
          action: cand.action,
          parent: id,
          child: child.id,
          form: Some(form),
        }
      }
    };

    if cand.action.is_edit() {
      self.num_edits += 1;
    }
    self.actions.push(transition);
    Ok(())
  }

  fn substitute(
    &mut self,
    action: ActionClass,
    pos: usize,
    lexicon: &Lexicon,
  ) -> Result<String, ParseError> {
    let target = &self.parsed[pos];
    let id = target.id;
    if target.is_edited() {
      return Err(ParseError::EditedTarget { action, id });
    }

    let current = forms(&self.sent);
    let (form, tag) = match action {
      ActionClass::SubstituteDet => (
        lexicon.best_substitute(action, &current, id, &SUBSTITUTE_DETERMINERS)?,
        target.tag.clone(),
      ),
      ActionClass::SubstitutePrep => (
        lexicon.best_substitute(action, &current, id, &PREPOSITIONS)?,
        target.tag.clone(),
      ),
      ActionClass::SubstituteNoun => {
        let (form, tag) = lexicon.flip_number(target)?;
        (form, tag.to_string())
      }
      ActionClass::SubstituteVerbForm => {
        if !target.tag.starts_with("VB") {
          return Err(ParseError::InvalidTarget {
            action,
            id,
            reason: format!("tag {} is not a verb tag", target.tag),
          });
        }
        let (form, tag) = lexicon.best_verb_form(&current, id)?;
        (form, tag.to_string())
      }
      other => return Err(ParseError::UnknownActionClass(other.index())),
    };

    for tok in [&mut self.parsed[pos], &mut self.sent[id]] {
      tok.form = form.clone();
      tok.tag = tag.clone();
      tok.edit = EditState::Edited;
    }
    self.graph.refresh(&self.parsed[pos]);
    Ok(form)
  }

  fn delete(&mut self, action: ActionClass, pos: usize) -> Result<(), ParseError> {
    let target = &self.parsed[pos];
    let id = target.id;
    if target.is_edited() {
      return Err(ParseError::EditedTarget { action, id });
    }

    self.graph.decrement(id);
    self.parsed.remove(pos);
    self.sent.remove(id);
    for tok in self.parsed.iter_mut().chain(self.sent.iter_mut()) {
      *tok = tok.shifted_down(id);
    }
    Ok(())
  }

  /// Materializes a determiner or preposition in front of the subtree headed
  /// by `parsed[pos]`. Returns the new token's id and form.
  fn insert(
    &mut self,
    action: ActionClass,
    pos: usize,
    lexicon: &Lexicon,
  ) -> Result<(usize, String), ParseError> {
    let (candidates, tag): (&[&str], &str) = match action {
      ActionClass::InsertDet => (&DETERMINERS, "DT"),
      ActionClass::InsertPrep => (&PREPOSITIONS, "IN"),
      other => return Err(ParseError::UnknownActionClass(other.index())),
    };

    let bound = self.graph.left_border(&self.parsed[pos]);
    let form = lexicon.best_insertion(action, &forms(&self.sent), bound, candidates)?;

    self.graph.increment(bound);
    for tok in self.parsed.iter_mut().chain(self.sent.iter_mut()) {
      *tok = tok.shifted_up(bound);
    }

    let token = Token::inserted(bound, form.clone(), tag);
    self.parsed.insert(pos, token.clone());
    self.sent.insert(bound, token);
    Ok((bound, form))
  }

  /// Checks that every non-root token got exactly one head.
  fn finish(self) -> Result<ParseOutput, ParseError> {
    let edges = self.graph.len();
    let max_child = self.graph.max_child().unwrap_or(0);
    if edges != max_child {
      return Err(ParseError::IncompleteDerivation { edges, max_child });
    }

    Ok(ParseOutput {
      graph: self.graph,
      sentence: self.sent.into_iter().skip(1).collect(),
      actions: self.actions,
    })
  }
}

/// First maximal candidate in encounter order.
fn best(candidates: &[Candidate]) -> Option<&Candidate> {
  candidates.iter().fold(None, |best: Option<&Candidate>, c| match best {
    Some(b) if b.score >= c.score => Some(b),
    _ => Some(c),
  })
}

/// Greedy easy-first parser with optional error-correcting edit actions.
pub struct Parser<S, F = BaselineFeatures> {
  pub scorer: S,
  features: F,
  lexicon: Lexicon,
  oracle: CostOracle,
  config: ParserConfig,
}

impl<S: Scorer> Parser<S, BaselineFeatures> {
  /// A parser with the baseline feature set and no language model.
  pub fn with_scorer(scorer: S) -> Self {
    Self::new(scorer, BaselineFeatures, Lexicon::default(), ParserConfig::default())
  }
}

impl<S: Scorer, F: FeatureExtractor> Parser<S, F> {
  pub fn new(scorer: S, features: F, lexicon: Lexicon, config: ParserConfig) -> Self {
    let oracle = CostOracle::new(config.chunk_gated_insertion);
    Self {
      scorer,
      features,
      lexicon,
      oracle,
      config,
    }
  }

  pub fn config(&self) -> &ParserConfig {
    &self.config
  }

  pub fn lexicon(&self) -> &Lexicon {
    &self.lexicon
  }

  pub fn into_scorer(self) -> S {
    self.scorer
  }

  /// The same parser around a different scorer, e.g. the averaged weights of
  /// a trained perceptron.
  pub fn map_scorer<T: Scorer>(self, f: impl FnOnce(S) -> T) -> Parser<T, F> {
    Parser {
      scorer: f(self.scorer),
      features: self.features,
      lexicon: self.lexicon,
      oracle: self.oracle,
      config: self.config,
    }
  }

  /// Parses (and, unless attach-only, corrects) one sentence. `sent` is given
  /// without ROOT.
  pub fn parse(&self, sent: &[Token]) -> Result<ParseOutput, ParseError> {
    let edits = !self.config.attach_only;
    let mut d = Derivation::new(sent);

    while d.parsed.len() > 1 {
      let candidates = d.candidates(&self.scorer, &self.features, edits, |_, _| true)?;
      let cand = best(&candidates).ok_or(ParseError::NoCandidates {
        remaining: d.parsed.len(),
      })?;

      d.apply(cand, &self.lexicon)?;
      if cand.action.is_attach() {
        d.invalidate_around(cand.position(), self.config.cache_window);
      } else {
        d.clear_caches();
      }
    }

    d.finish()
  }

  /// Attach-only parsing where each span `(s, e)` of sentence positions (ROOT
  /// is position 0) must be resolved internally before any of its tokens
  /// attaches across the span boundary. ROOT never joins a span, so a span
  /// starting at 0 covers only the words from 1 to `e`. Spans reaching past
  /// the sentence are ignored; spans must not overlap.
  pub fn parse_with_span_constraints(
    &self,
    sent: &[Token],
    spans: &[(usize, usize)],
  ) -> Result<ParseOutput, ParseError> {
    let mut d = Derivation::new(sent);
    let mut remaining: HashMap<usize, usize> = HashMap::new();

    for (sid, &(s, e)) in spans.iter().enumerate() {
      let s = s.max(1);
      if e >= d.sent.len() || s > e {
        continue;
      }
      remaining.insert(sid, e - s);
      for tok in d.sent[s..=e].iter_mut().chain(d.parsed[s..=e].iter_mut()) {
        tok.span_id = Some(sid);
      }
    }

    while d.parsed.len() > 1 {
      let open = |t: &Token| {
        t.span_id
          .and_then(|sid| remaining.get(&sid))
          .is_some_and(|&n| n > 0)
      };
      let candidates = d.candidates(&self.scorer, &self.features, false, |a, b| {
        a.span_id == b.span_id || !(open(a) || open(b))
      })?;
      let cand = best(&candidates).ok_or(ParseError::NoCandidates {
        remaining: d.parsed.len(),
      })?;

      let span = d.parsed[cand.child].span_id;
      d.apply(cand, &self.lexicon)?;
      d.invalidate_around(cand.position(), self.config.cache_window);
      if let Some(n) = span.and_then(|sid| remaining.get_mut(&sid)) {
        *n = n.saturating_sub(1);
      }
    }

    d.finish()
  }
}

impl<S: TrainableScorer, F: FeatureExtractor> Parser<S, F> {
  /// One dynamic-oracle training pass over `sent` (carrying gold heads)
  /// against the corrected `gold` sentence. `iter` is the 1-based epoch,
  /// consulted by the exploration policy.
  pub fn train(
    &mut self,
    sent: &[Token],
    gold: &[Token],
    iter: usize,
    mut explore: Option<&mut ExplorePolicy>,
  ) -> Result<TrainOutcome, ParseError> {
    let edits = !self.config.attach_only;
    let gold_forms = forms(&with_root(gold));
    let mut d = Derivation::new(sent);
    let mut outcome = TrainOutcome::default();

    self.scorer.tick();

    while d.parsed.len() > 1 {
      let mut scored = d.candidates(&self.scorer, &self.features, edits, |_, _| true)?;
      if scored.is_empty() {
        return Err(ParseError::NoCandidates {
          remaining: d.parsed.len(),
        });
      }
      scored.sort_by(|a, b| b.score.total_cmp(&a.score));

      let current = forms(&d.sent);
      let cost_of = |c: &Candidate| {
        self.oracle.action_cost(
          &d.parsed,
          &d.graph,
          &d.parsed[c.parent],
          &d.parsed[c.child],
          c.action,
          &current,
          &gold_forms,
          &self.lexicon,
        )
      };

      let top = &scored[0];
      let cost = cost_of(top)?;
      outcome.cost += cost;
      let correct = cost == 0;

      if !correct {
        d.scores.clear();

        // prefer a zero-cost edit over a zero-cost attachment
        let mut good = None;
        for c in scored[1..].iter().filter(|c| c.action.is_edit()) {
          if cost_of(c)? == 0 {
            good = Some(c);
            break;
          }
        }
        if good.is_none() {
          for c in scored[1..].iter() {
            if cost_of(c)? == 0 {
              good = Some(c);
              break;
            }
          }
        }

        if let Some(good) = good {
          self.scorer.add(&good.features, good.action.index(), 1.0);
        }
        self.scorer.add(&top.features, top.action.index(), -1.0);
        outcome.updates += 1;

        if outcome.updates > self.config.max_updates {
          warn!(
            before = %forms(sent).join(" "),
            after = %forms(&d.parsed[1..]).join(" "),
            "too many updates, probably an incomplete feature set; skipping sentence"
          );
          outcome.skipped = true;
          return Ok(outcome);
        }
      }

      let follow = correct || explore.as_deref_mut().is_some_and(|p| p.should_explore(iter));
      if follow {
        let top = top.clone();
        d.apply(&top, &self.lexicon)?;
        d.clear_caches();
      }
    }

    d.finish()?;
    Ok(outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexicon::EnglishInflector;
  use crate::model::{LinearModel, Perceptron};

  /// Scores one fixed action class highest for every pair whose left token
  /// has the given form.
  fn rigged(
    rules: &[(&'static str, ActionClass, f64)],
  ) -> impl Fn(&[Token], &DependencyGraph, usize, &[Token]) -> Vec<String> {
    let rules: Vec<(&'static str, ActionClass, f64)> = rules.to_vec();
    move |parsed: &[Token], _: &DependencyGraph, i: usize, _: &[Token]| {
      rules
        .iter()
        .filter(|(form, _, _)| parsed[i].form == *form)
        .map(|(form, class, _)| format!("{}:{}", form, class.index()))
        .collect()
    }
  }

  fn rigged_model(rules: &[(&'static str, ActionClass, f64)]) -> LinearModel {
    let mut m = LinearModel::new(NUM_CLASSES);
    for (form, class, w) in rules {
      m.set(&format!("{}:{}", form, class.index()), class.index(), *w);
    }
    m
  }

  fn toks(words: &[(&str, &str)]) -> Vec<Token> {
    words
      .iter()
      .enumerate()
      .map(|(i, (w, t))| Token::new(i + 1, *w, *t))
      .collect()
  }

  #[test]
  fn test_window_invalidation() {
    let sent = toks(&[("a", "DT"), ("b", "NN"), ("c", "VB"), ("d", "IN"), ("e", "NN")]);
    let mut d = Derivation::new(&sent);
    for tok in d.parsed.iter() {
      d.scores.insert(tok.id, vec![0.0]);
    }
    d.invalidate_around(2, 1);
    let mut kept: Vec<usize> = d.scores.keys().copied().collect();
    kept.sort();
    assert_eq!(kept, vec![0, 3, 4, 5]);
  }

  #[test]
  fn test_rigged_attachments() {
    // the <- dog <- barks <- ROOT
    let rules = [
      ("the", ActionClass::AttachLeft, 3.0),
      ("dog", ActionClass::AttachLeft, 2.0),
    ];
    let parser = Parser::new(
      rigged_model(&rules),
      rigged(&rules),
      Lexicon::default(),
      ParserConfig {
        attach_only: true,
        ..Default::default()
      },
    );
    let out = parser
      .parse(&toks(&[("the", "DT"), ("dog", "NN"), ("barks", "VBZ")]))
      .unwrap();
    let edges: Vec<_> = out.graph.edges().iter().copied().collect();
    assert_eq!(edges, vec![(0, 3), (2, 1), (3, 2)]);
    assert_eq!(out.actions.len(), 3);
    assert_eq!(out.actions[0].to_string(), "attach-left(2 <- 1)");
  }

  #[test]
  fn test_span_constraints_keep_span_together() {
    // without spans "b" would attach right to "c" first
    let rules = [("b", ActionClass::AttachRight, 5.0), ("a", ActionClass::AttachRight, 1.0)];
    let parser = Parser::new(
      rigged_model(&rules),
      rigged(&rules),
      Lexicon::default(),
      ParserConfig::default(),
    );
    let sent = toks(&[("a", "NN"), ("b", "NN"), ("c", "NN")]);

    let free = parser.parse_with_span_constraints(&sent, &[]).unwrap();
    assert_eq!(free.actions[0].child, 3);

    // span over "a b": "b" must be absorbed by "a" before "c" can join
    let out = parser.parse_with_span_constraints(&sent, &[(1, 2)]).unwrap();
    assert_eq!(out.actions[0].parent, 1);
    assert_eq!(out.actions[0].child, 2);
    assert_eq!(out.graph.len(), 3);
    assert!(out.sentence[0].span_id == Some(0) && out.sentence[2].span_id.is_none());

    // a span past the end is ignored
    let out = parser.parse_with_span_constraints(&sent, &[(2, 7)]).unwrap();
    assert_eq!(out.actions[0].child, 3);
  }

  #[test]
  fn test_span_from_root_covers_words_only() {
    let rules = [("b", ActionClass::AttachRight, 5.0), ("a", ActionClass::AttachRight, 1.0)];
    let parser = Parser::new(
      rigged_model(&rules),
      rigged(&rules),
      Lexicon::default(),
      ParserConfig::default(),
    );
    let sent = toks(&[("a", "NN"), ("b", "NN"), ("c", "NN")]);

    // only "a" is left inside, so nothing is held back
    let out = parser.parse_with_span_constraints(&sent, &[(0, 1)]).unwrap();
    assert_eq!(out.graph.len(), 3);
    assert_eq!(out.actions[0].child, 3);
    assert_eq!(out.sentence[0].span_id, Some(0));
    assert!(out.graph.is_consistent());

    // same as a span over "a b"
    let out = parser.parse_with_span_constraints(&sent, &[(0, 2)]).unwrap();
    assert_eq!((out.actions[0].parent, out.actions[0].child), (1, 2));
    assert_eq!(out.graph.len(), 3);

    // a span of ROOT alone is dropped
    let out = parser.parse_with_span_constraints(&sent, &[(0, 0)]).unwrap();
    assert_eq!(out.actions[0].child, 3);
    assert!(out.sentence.iter().all(|t| t.span_id.is_none()));
  }

  #[test]
  fn test_substitution_refreshes_graph() {
    let lm = |s: &str| if s.contains("goes") { 0.0 } else { -1.0 };
    let lexicon = Lexicon::new(lm, EnglishInflector);
    let mut d = Derivation::new(&toks(&[("he", "PRP"), ("go", "VBP"), ("home", "NN")]));

    // home hangs off go before go is re-inflected
    let (go, home) = (d.parsed[2].clone(), d.parsed[3].clone());
    d.graph.add(&go, &home, UNLABELED).unwrap();
    d.parsed.remove(3);

    let form = d.substitute(ActionClass::SubstituteVerbForm, 2, &lexicon).unwrap();
    assert_eq!(form, "goes");
    assert_eq!(d.parsed[2].form, "goes");
    assert_eq!(d.parsed[2].tag, "VBZ");
    assert!(d.parsed[2].is_edited());
    assert_eq!(d.sent[2].form, "goes");
    assert!(d.sent[2].is_edited());

    let stored = d.graph.token(2).unwrap();
    assert_eq!((stored.form.as_str(), stored.tag.as_str()), ("goes", "VBZ"));
    assert!(stored.is_edited());
    assert_eq!(d.graph.token(3).map(|t| t.form.as_str()), Some("home"));

    // a second edit of the same token is refused
    assert!(matches!(
      d.substitute(ActionClass::SubstituteVerbForm, 2, &lexicon),
      Err(ParseError::EditedTarget { id: 2, .. })
    ));
  }

  fn he_go_home() -> Vec<Token> {
    toks(&[("he", "PRP"), ("go", "VBP"), ("home", "NN")])
      .into_iter()
      .zip([2, 0, 2])
      .map(|(t, p)| t.with_parent(p))
      .collect()
  }

  /// Perceptron that ranks attach-right first everywhere.
  fn right_leaning() -> Perceptron {
    let mut p = Perceptron::new(NUM_CLASSES);
    p.tick();
    p.add(&[], ActionClass::AttachRight.index(), 5.0);
    p
  }

  #[test]
  fn test_training_rewards_zero_cost_edit_first() {
    let sent = he_go_home();
    let gold = toks(&[("he", "PRP"), ("goes", "VBZ"), ("home", "NN")]);
    let lm = |s: &str| if s.contains("goes") { 0.0 } else { -1.0 };
    let mut parser = Parser::new(
      right_leaning(),
      BaselineFeatures,
      Lexicon::new(lm, EnglishInflector),
      ParserConfig {
        max_updates: 0,
        ..Default::default()
      },
    );

    // he -> go is wrong; go -> home and re-inflecting go are both free, and
    // the edit gets the credit
    let outcome = parser.train(&sent, &gold, 1, None).unwrap();
    assert!(outcome.skipped);
    assert_eq!(outcome.updates, 1);
    assert_eq!(outcome.cost, 3);

    let bias = parser.scorer.scores(&[]);
    assert_eq!(bias[ActionClass::AttachRight.index()], 4.0);
    assert_eq!(bias[ActionClass::SubstituteVerbForm.index()], 1.0);
    assert_eq!(bias[ActionClass::AttachLeft.index()], 0.0);
  }

  #[test]
  fn test_exploring_training_with_edits() {
    let sent = he_go_home();
    let gold = toks(&[("he", "PRP"), ("goes", "VBZ"), ("home", "NN")]);
    let lm = |s: &str| if s.contains("goes") { 0.0 } else { -1.0 };
    let mut parser = Parser::new(
      right_leaning(),
      BaselineFeatures,
      Lexicon::new(lm, EnglishInflector),
      ParserConfig::default(),
    );
    let mut policy = ExplorePolicy::always(1);

    // every step is taken, mistakes included, so the pass ends well inside
    // the update budget
    for iter in 1..=3 {
      let outcome = parser.train(&sent, &gold, iter, Some(&mut policy)).unwrap();
      assert!(!outcome.skipped);
      if iter == 1 {
        assert!(outcome.updates >= 1);
        assert!(outcome.cost >= 3);
      }
    }

    let out = parser.parse(&sent).unwrap();
    assert_eq!(out.graph.len(), out.sentence.len());
    assert!(out.graph.is_consistent());
  }

  #[test]
  fn test_short_scores_fail() {
    let parser = Parser::new(
      LinearModel::new(2),
      BaselineFeatures,
      Lexicon::default(),
      ParserConfig::default(),
    );
    let err = parser.parse(&toks(&[("dogs", "NNS"), ("bark", "VBP")])).unwrap_err();
    assert!(matches!(err, ParseError::ScoreArity { needed: 10, got: 2 }));
  }

  #[test]
  fn test_training_converges_on_one_sentence() {
    // dogs <- bark -> loudly
    let sent: Vec<Token> = toks(&[("dogs", "NNS"), ("bark", "VBP"), ("loudly", "RB")])
      .into_iter()
      .zip([2, 0, 2])
      .map(|(t, p)| t.with_parent(p))
      .collect();
    let mut parser = Parser::new(
      Perceptron::new(NUM_CLASSES),
      BaselineFeatures,
      Lexicon::new(crate::lexicon::UniformModel, EnglishInflector),
      ParserConfig {
        attach_only: true,
        ..Default::default()
      },
    );

    let first = parser.train(&sent, &sent, 1, None).unwrap();
    assert!(first.updates > 0);
    assert!(first.cost > 0);

    let mut converged = false;
    for iter in 2..=20 {
      let outcome = parser.train(&sent, &sent, iter, None).unwrap();
      assert!(!outcome.skipped);
      if outcome.updates == 0 {
        converged = true;
        break;
      }
    }
    assert!(converged);

    let out = parser.parse(&sent).unwrap();
    let heads: Vec<_> = out.annotated().iter().map(|t| t.pparent).collect();
    assert_eq!(heads, vec![Some(2), Some(0), Some(2)]);
  }

  #[test]
  fn test_update_budget_skips_sentence() {
    let sent: Vec<Token> = toks(&[("dogs", "NNS"), ("bark", "VBP"), ("loudly", "RB")])
      .into_iter()
      .zip([2, 0, 2])
      .map(|(t, p)| t.with_parent(p))
      .collect();
    let mut parser = Parser::new(
      Perceptron::new(NUM_CLASSES),
      BaselineFeatures,
      Lexicon::default(),
      ParserConfig {
        attach_only: true,
        max_updates: 0,
        ..Default::default()
      },
    );
    let outcome = parser.train(&sent, &sent, 1, None).unwrap();
    assert!(outcome.skipped);
    assert_eq!(outcome.updates, 1);
  }
}
