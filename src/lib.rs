#[macro_use]
extern crate lazy_static;

pub mod actions;
pub mod conll;
pub mod error;
pub mod explore;
pub mod features;
pub mod graph;
pub mod lexicon;
pub mod model;
pub mod oracle;
pub mod parser;
pub mod token;
pub mod trainer;
pub mod utils;

pub use crate::actions::ActionClass;
pub use crate::error::ParseError;
pub use crate::explore::ExplorePolicy;
pub use crate::features::{BaselineFeatures, FeatureExtractor};
pub use crate::graph::DependencyGraph;
pub use crate::lexicon::{
  BigramModel, EnglishInflector, Inflector, LanguageModel, Lexicon, UniformModel,
};
pub use crate::model::{LinearModel, Perceptron, Scorer, TrainableScorer};
pub use crate::oracle::CostOracle;
pub use crate::parser::{ParseOutput, Parser, ParserConfig, TrainOutcome, Transition};
pub use crate::token::Token;
pub use crate::trainer::{evaluate, Accuracy, EpochStats, Trainer, TrainerConfig};
pub use crate::utils::Err;

#[cfg(test)]
use crate::actions::NUM_CLASSES;

/// Feature extractor for the scenario tests: every pair fires "any" plus
/// "{id}:{form}" of its left token.
#[cfg(test)]
fn keyed_features(parsed: &[Token], _: &DependencyGraph, i: usize, _: &[Token]) -> Vec<String> {
  vec!["any".to_string(), format!("{}:{}", parsed[i].id, parsed[i].form)]
}

/// Attachments score 0, edits -10, plus the given per-pair bonuses.
#[cfg(test)]
fn keyed_model(rules: &[(&str, ActionClass, f64)]) -> LinearModel {
  let mut m = LinearModel::new(NUM_CLASSES);
  for class in ActionClass::ALL.iter().filter(|c| c.is_edit()) {
    m.set("any", class.index(), -10.0);
  }
  for (feature, class, w) in rules {
    m.set(feature, class.index(), *w);
  }
  m
}

#[cfg(test)]
fn sentence(words: &[(&str, &str)]) -> Vec<Token> {
  words
    .iter()
    .enumerate()
    .map(|(i, (w, t))| Token::new(i + 1, *w, *t))
    .collect()
}

#[test]
fn test_the_dog_barks() {
  let parser = Parser::new(
    keyed_model(&[
      ("1:the", ActionClass::AttachLeft, 3.0),
      ("2:dog", ActionClass::AttachLeft, 2.0),
    ]),
    keyed_features,
    Lexicon::default(),
    ParserConfig::default(),
  );
  let out = parser
    .parse(&sentence(&[("the", "DT"), ("dog", "NN"), ("barks", "VBZ")]))
    .unwrap();

  assert_eq!(out.graph.len(), 3);
  assert_eq!(out.num_edits(), 0);
  let root_children: Vec<usize> = out.graph.children(&Token::root()).iter().map(|t| t.id).collect();
  assert_eq!(root_children, vec![3]);

  let heads: Vec<_> = out.annotated().iter().map(|t| t.pparent).collect();
  assert_eq!(heads, vec![Some(2), Some(3), Some(0)]);
}

#[test]
fn test_delete_renumbers_everything() {
  // the#4 <- dog first, then the duplicate the#3 goes
  let parser = Parser::new(
    keyed_model(&[
      ("4:the", ActionClass::AttachLeft, 30.0),
      ("2:saw", ActionClass::DeleteDet, 20.0),
    ]),
    keyed_features,
    Lexicon::default(),
    ParserConfig::default(),
  );
  let out = parser
    .parse(&sentence(&[("he", "PRP"), ("saw", "VBD"), ("the", "DT"), ("the", "DT"), ("dog", "NN")]))
    .unwrap();

  assert_eq!(out.forms(), vec!["he", "saw", "the", "dog"]);
  assert_eq!(out.sentence.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
  assert_eq!(
    out.actions[1],
    Transition {
      action: ActionClass::DeleteDet,
      parent: 3,
      child: 2,
      form: Some(String::new()),
    }
  );
  assert_eq!(out.num_edits(), 1);

  // the edge made before the deletion followed its tokens down
  assert!(out.graph.edges().contains(&(4, 3)));
  assert!(out.graph.edges().iter().all(|&(p, c)| p <= 4 && c <= 4));
  assert_eq!(out.graph.token(3).map(|t| t.form.as_str()), Some("the"));
  assert_eq!(out.graph.token(4).map(|t| t.form.as_str()), Some("dog"));
  assert_eq!(out.graph.len(), 4);
  assert!(out.graph.is_consistent());
}

#[test]
fn test_insert_renumbers_everything() {
  let lm = |s: &str| if s.contains("saw the") { 0.0 } else { -1.0 };
  let parser = Parser::new(
    keyed_model(&[
      ("3:big", ActionClass::AttachLeft, 30.0),
      ("2:saw", ActionClass::InsertDet, 20.0),
    ]),
    keyed_features,
    Lexicon::new(lm, EnglishInflector),
    ParserConfig::default(),
  );
  let out = parser
    .parse(&sentence(&[("he", "PRP"), ("saw", "VBD"), ("big", "JJ"), ("dog", "NN")]))
    .unwrap();

  // inserted in front of the whole "big dog" subtree
  assert_eq!(out.forms(), vec!["he", "saw", "the", "big", "dog"]);
  assert_eq!(out.sentence.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
  assert!(out.sentence[2].is_edited());
  assert_eq!(out.sentence[2].tag, "DT");
  assert_eq!(out.actions[1].to_string(), "insert-det(3 -> the)");

  assert!(out.graph.edges().contains(&(5, 4)));
  assert_eq!(out.graph.token(4).map(|t| t.form.as_str()), Some("big"));
  assert_eq!(out.graph.len(), 5);
  assert!(out.graph.is_consistent());
}

#[test]
fn test_parsing_is_deterministic() {
  let mut model = LinearModel::new(NUM_CLASSES);
  model.set(crate::model::BIAS, ActionClass::AttachRight.index(), 1.0);
  model.set("s0w_dog", ActionClass::SubstituteNoun.index(), 0.5);
  let parser = Parser::with_scorer(model);
  let sent = sentence(&[
    ("a", "DT"),
    ("dog", "NN"),
    ("bark", "VBP"),
    ("at", "IN"),
    ("cats", "NNS"),
  ]);

  let first = parser.parse(&sent).unwrap();
  let second = parser.parse(&sent).unwrap();
  assert_eq!(first.actions, second.actions);
  assert_eq!(first.graph.edges(), second.graph.edges());
  assert_eq!(first.forms(), second.forms());
}

#[test]
fn test_every_substitution_class() {
  // corrected right to left, so each rule still sees its untouched left word
  let lm = |s: &str| s.split(' ').filter(|w| ["goes", "to", "the"].contains(w)).count() as f64;
  let parser = Parser::new(
    keyed_model(&[
      ("4:a", ActionClass::SubstituteNoun, 50.0),
      ("3:in", ActionClass::SubstituteDet, 45.0),
      ("2:go", ActionClass::SubstitutePrep, 42.0),
      ("1:he", ActionClass::SubstituteVerbForm, 40.0),
    ]),
    keyed_features,
    Lexicon::new(lm, EnglishInflector),
    ParserConfig::default(),
  );
  let out = parser
    .parse(&sentence(&[
      ("he", "PRP"),
      ("go", "VBP"),
      ("in", "IN"),
      ("a", "DT"),
      ("schools", "NNS"),
    ]))
    .unwrap();

  assert_eq!(out.forms(), vec!["he", "goes", "to", "the", "school"]);
  let tags: Vec<&str> = out.sentence.iter().map(|t| t.tag.as_str()).collect();
  assert_eq!(tags, vec!["PRP", "VBZ", "IN", "DT", "NN"]);
  let edited: Vec<bool> = out.sentence.iter().map(|t| t.is_edited()).collect();
  assert_eq!(edited, vec![false, true, true, true, true]);

  assert_eq!(out.num_edits(), 4);
  let steps: Vec<String> = out.actions[..4].iter().map(|t| t.to_string()).collect();
  assert_eq!(
    steps,
    vec![
      "substitute-noun(5 -> school)",
      "substitute-det(4 -> the)",
      "substitute-prep(3 -> to)",
      "substitute-vform(2 -> goes)",
    ]
  );

  // the graph holds the corrected tokens
  assert_eq!(out.graph.len(), 5);
  assert!(out.graph.is_consistent());
  for tok in out.sentence.iter() {
    let stored = out.graph.token(tok.id).unwrap();
    assert_eq!((stored.form.as_str(), stored.tag.as_str()), (tok.form.as_str(), tok.tag.as_str()));
  }
}

#[test]
fn test_non_ascii_verb_is_reinflected() {
  let parser = Parser::new(
    keyed_model(&[("1:he", ActionClass::SubstituteVerbForm, 20.0)]),
    keyed_features,
    Lexicon::default(),
    ParserConfig::default(),
  );
  let out = parser
    .parse(&sentence(&[("he", "PRP"), ("paßßed", "VBD"), ("it", "PRP")]))
    .unwrap();

  assert_eq!(out.forms(), vec!["he", "paß", "it"]);
  assert_eq!(out.sentence[1].tag, "VB");
  assert_eq!(out.actions[0].to_string(), "substitute-vform(2 -> paß)");
  assert!(out.graph.is_consistent());
}

#[test]
fn test_every_parse_completes() {
  // every edit outscores every attachment, so edits run until the budget
  // or the gating stops them
  let mut model = LinearModel::new(NUM_CLASSES);
  for class in ActionClass::ALL.iter().filter(|c| c.is_edit()) {
    model.set(crate::model::BIAS, class.index(), 1.0);
  }
  let parser = Parser::with_scorer(model);
  let sents = [
    sentence(&[("dogs", "NNS")]),
    sentence(&[("dog", "NN"), ("bark", "VBP")]),
    sentence(&[("he", "PRP"), ("go", "VBP"), ("to", "TO"), ("school", "NN")]),
    sentence(&[("the", "DT"), ("an", "DT"), ("apple", "NN"), ("in", "IN"), ("box", "NN")]),
  ];

  for sent in sents.iter() {
    let out = parser.parse(sent).unwrap();
    assert_eq!(out.graph.len(), out.sentence.len());
    assert!(out.graph.is_consistent());
    if sent.len() > 1 {
      assert!(out.num_edits() > 0);
    } else {
      assert_eq!(out.num_edits(), 0);
    }
    assert!(out.num_edits() <= sent.len() + 2);
    let ids: Vec<usize> = out.sentence.iter().map(|t| t.id).collect();
    assert_eq!(ids, (1..=out.sentence.len()).collect::<Vec<_>>());
    assert!(out.actions.iter().filter(|t| t.action.is_edit()).all(|t| t.form.is_some()));
  }
}
