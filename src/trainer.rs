use rand::prelude::*;
use tracing::{debug, info};

use crate::actions::NUM_CLASSES;
use crate::error::ParseError;
use crate::explore::ExplorePolicy;
use crate::features::{BaselineFeatures, FeatureExtractor};
use crate::lexicon::Lexicon;
use crate::model::{LinearModel, Perceptron, Scorer};
use crate::parser::{Parser, ParserConfig};
use crate::token::Token;

#[derive(Debug, Clone)]
pub struct TrainerConfig {
  pub iterations: usize,
  /// Reshuffle the training pairs before every epoch
  pub shuffle: bool,
  pub seed: u64,
  /// Drop pairs whose gold tree is non-projective
  pub projective_only: bool,
  pub explore: Option<ExplorePolicy>,
}

impl Default for TrainerConfig {
  fn default() -> Self {
    Self {
      iterations: 20,
      shuffle: true,
      seed: 1,
      projective_only: true,
      explore: None,
    }
  }
}

/// Summary of one pass over the training data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpochStats {
  pub iteration: usize,
  pub sentences: usize,
  pub cost: u64,
  pub updates: usize,
  pub skipped: usize,
}

/// No two arcs of the tree cross. Heads are read from `Token::parent`; a
/// missing head counts as ROOT.
pub fn is_projective(sent: &[Token]) -> bool {
  let mut arcs: Vec<(usize, usize)> = sent
    .iter()
    .map(|t| {
      let p = t.parent.unwrap_or(0);
      (t.id.min(p), t.id.max(p))
    })
    .collect();
  arcs.sort();
  arcs.dedup();

  arcs.iter().all(|&(l, h)| {
    arcs
      .iter()
      .all(|&(l1, h1)| (l, h) == (l1, h1) || !(l < l1 && l1 < h && h1 > h))
  })
}

/// Trains a perceptron-scored parser over aligned (input, gold) sentence
/// pairs. The input side carries gold heads; the gold side supplies the
/// corrected surface forms and decides projectivity filtering.
pub struct Trainer<F = BaselineFeatures> {
  parser: Parser<Perceptron, F>,
  config: TrainerConfig,
  rng: StdRng,
}

impl Trainer<BaselineFeatures> {
  pub fn new(lexicon: Lexicon, parser_config: ParserConfig, config: TrainerConfig) -> Self {
    Self::with_features(BaselineFeatures, lexicon, parser_config, config)
  }
}

impl<F: FeatureExtractor> Trainer<F> {
  pub fn with_features(
    features: F,
    lexicon: Lexicon,
    parser_config: ParserConfig,
    config: TrainerConfig,
  ) -> Self {
    let parser = Parser::new(Perceptron::new(NUM_CLASSES), features, lexicon, parser_config);
    let rng = StdRng::seed_from_u64(config.seed);
    Self { parser, config, rng }
  }

  pub fn parser(&self) -> &Parser<Perceptron, F> {
    &self.parser
  }

  /// Runs every configured epoch, returning per-epoch statistics. A contract
  /// violation on any sentence aborts training.
  pub fn train(
    &mut self,
    pairs: &[(Vec<Token>, Vec<Token>)],
  ) -> Result<Vec<EpochStats>, ParseError> {
    let mut order: Vec<usize> = (0..pairs.len())
      .filter(|&i| !self.config.projective_only || is_projective(&pairs[i].1))
      .collect();
    if order.len() < pairs.len() {
      info!(
        dropped = pairs.len() - order.len(),
        "dropped training pairs with a non-projective gold tree"
      );
    }

    let mut stats = Vec::with_capacity(self.config.iterations);
    for iter in 1..=self.config.iterations {
      if self.config.shuffle {
        order.shuffle(&mut self.rng);
      }
      stats.push(self.epoch(iter, &order, pairs)?);
    }
    Ok(stats)
  }

  fn epoch(
    &mut self,
    iter: usize,
    order: &[usize],
    pairs: &[(Vec<Token>, Vec<Token>)],
  ) -> Result<EpochStats, ParseError> {
    let mut stats = EpochStats {
      iteration: iter,
      ..Default::default()
    };

    for (n, &i) in order.iter().enumerate() {
      let (sent, gold) = &pairs[i];
      let outcome = self
        .parser
        .train(sent, gold, iter, self.config.explore.as_mut())?;

      stats.sentences += 1;
      stats.cost += outcome.cost as u64;
      stats.updates += outcome.updates;
      stats.skipped += outcome.skipped as usize;
      if n % 100 == 0 {
        debug!(iter, sentence = n, cost = stats.cost, "training progress");
      }
    }

    info!(
      iter,
      sentences = stats.sentences,
      cost = stats.cost,
      updates = stats.updates,
      skipped = stats.skipped,
      "finished epoch"
    );
    Ok(stats)
  }

  /// The trained parser, scoring with the averaged weights.
  pub fn into_parser(self) -> Parser<LinearModel, F> {
    self.parser.map_scorer(|p| p.average())
  }
}

/// Unlabeled attachment accuracy
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accuracy {
  /// Correct heads over all scored tokens
  pub micro: f64,
  /// Mean of per-sentence accuracies
  pub macro_avg: f64,
  /// Share of sentences with every head correct
  pub complete: f64,
  pub sentences: usize,
}

fn is_punct(tok: &Token) -> bool {
  tok.form.starts_with(|c: char| "'`,.-;:!?{}".contains(c))
}

/// Parses every sentence in `gold` (which carries gold heads) and compares
/// the predicted heads with them.
pub fn evaluate<S: Scorer, F: FeatureExtractor>(
  parser: &Parser<S, F>,
  gold: &[Vec<Token>],
  ignore_punct: bool,
) -> Result<Accuracy, ParseError> {
  let (mut good, mut total, mut complete) = (0usize, 0usize, 0usize);
  let mut per_sentence = Vec::with_capacity(gold.len());

  for sent in gold {
    let out = parser.parse(sent)?.annotated();
    let scored: Vec<&Token> = out.iter().filter(|t| !(ignore_punct && is_punct(t))).collect();
    let hits = scored.iter().filter(|t| t.parent == t.pparent).count();

    good += hits;
    total += scored.len();
    if hits == scored.len() {
      complete += 1;
    }
    if !scored.is_empty() {
      per_sentence.push(hits as f64 / scored.len() as f64);
    }
  }

  let ratio = |a: usize, b: usize| if b == 0 { 0.0 } else { a as f64 / b as f64 };
  Ok(Accuracy {
    micro: ratio(good, total),
    macro_avg: if per_sentence.is_empty() {
      0.0
    } else {
      per_sentence.iter().sum::<f64>() / per_sentence.len() as f64
    },
    complete: ratio(complete, gold.len()),
    sentences: gold.len(),
  })
}
