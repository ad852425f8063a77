use crate::actions::{ActionClass, ActionKind, DETERMINERS, PREPOSITIONS, SUBSTITUTE_DETERMINERS};
use crate::error::ParseError;
use crate::graph::DependencyGraph;
use crate::lexicon::Lexicon;
use crate::token::Token;
use crate::utils::edit_distance;

/// Chunk tag a token must carry for insertion to be free when
/// `chunk_gated_insertion` is on.
pub const INSIDE_NP: &str = "I-NP";

/// Dynamic oracle: cost of taking an action from the current (possibly already
/// wrong) state, relative to the gold tree and the gold surface sentence.
///
/// Attachments are costed structurally. Edits are costed by token-level edit
/// distance to the gold forms, before and after applying the edit the parser
/// would actually make.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostOracle {
  pub chunk_gated_insertion: bool,
}

impl CostOracle {
  pub fn new(chunk_gated_insertion: bool) -> Self {
    Self {
      chunk_gated_insertion,
    }
  }

  /// `roots` is the working sequence. `forms` and `gold` are the current and
  /// gold surface sentences with ROOT at index 0. For edits, `parent` is the
  /// token being edited.
  #[allow(clippy::too_many_arguments)]
  pub fn action_cost(
    &self,
    roots: &[Token],
    graph: &DependencyGraph,
    parent: &Token,
    child: &Token,
    action: ActionClass,
    forms: &[String],
    gold: &[String],
    lexicon: &Lexicon,
  ) -> Result<u32, ParseError> {
    match action.kind() {
      ActionKind::Attach => Ok(attach_cost(roots, parent, child)),
      ActionKind::Substitute | ActionKind::Delete => {
        if parent.is_edited() {
          return Err(ParseError::EditedTarget {
            action,
            id: parent.id,
          });
        }
        check_target(action, parent, forms)?;
        self.edit_cost(graph, parent, action, forms, gold, lexicon)
      }
      ActionKind::Insert => {
        check_target(action, parent, forms)?;
        if self.chunk_gated_insertion && parent.lemma != INSIDE_NP {
          return Ok(1);
        }
        self.edit_cost(graph, parent, action, forms, gold, lexicon)
      }
    }
  }

  fn edit_cost(
    &self,
    graph: &DependencyGraph,
    target: &Token,
    action: ActionClass,
    forms: &[String],
    gold: &[String],
    lexicon: &Lexicon,
  ) -> Result<u32, ParseError> {
    let pos = target.id;
    let before = edit_distance(forms, gold);

    let mut edited = forms.to_vec();
    match action {
      ActionClass::SubstituteDet => {
        edited[pos] = lexicon.best_substitute(action, forms, pos, &SUBSTITUTE_DETERMINERS)?;
      }
      ActionClass::SubstituteNoun => {
        edited[pos] = lexicon.flip_number(target)?.0;
      }
      ActionClass::SubstituteVerbForm => {
        edited[pos] = lexicon.best_verb_form(forms, pos)?.0;
      }
      ActionClass::SubstitutePrep => {
        edited[pos] = lexicon.best_substitute(action, forms, pos, &PREPOSITIONS)?;
      }
      ActionClass::DeleteDet | ActionClass::DeletePrep => {
        edited.remove(pos);
      }
      ActionClass::InsertDet | ActionClass::InsertPrep => {
        let at = graph.left_border(target);
        let candidates: &[&str] = if action == ActionClass::InsertDet {
          &DETERMINERS
        } else {
          &PREPOSITIONS
        };
        let form = lexicon.best_insertion(action, forms, at, candidates)?;
        edited.insert(at, form);
      }
      ActionClass::AttachLeft | ActionClass::AttachRight => {
        return Err(ParseError::UnknownActionClass(action.index()));
      }
    }
    let after = edit_distance(&edited, gold);

    // noun and verb re-inflection and preposition choice may be neutral;
    // everything else has to make progress
    let strict = matches!(
      action,
      ActionClass::SubstituteNoun | ActionClass::SubstituteVerbForm | ActionClass::SubstitutePrep
    );
    let worse = if strict { before < after } else { before <= after };
    Ok(worse as u32)
  }
}

/// Attaching `child` to `parent` is wrong if some remaining token still needs
/// `child` as its head, or if `child` belongs under another remaining token.
/// Touching ROOT while more than two tokens remain costs one more.
fn attach_cost(roots: &[Token], parent: &Token, child: &Token) -> u32 {
  let mut cost = 0;
  for tok in roots {
    if tok.parent == Some(child.id) {
      cost += 1;
    }
    if child.parent == Some(tok.id) && tok.id != parent.id {
      cost += 1;
    }
  }
  if roots.len() > 2 && (parent.is_root() || child.is_root()) {
    cost += 1;
  }
  cost
}

/// Edit targets must exist in the sentence and carry the tag the action is for.
fn check_target(action: ActionClass, target: &Token, forms: &[String]) -> Result<(), ParseError> {
  let invalid = |reason: String| {
    Err(ParseError::InvalidTarget {
      action,
      id: target.id,
      reason,
    })
  };

  if target.is_root() || target.id >= forms.len() {
    return invalid(format!("no such position in a sentence of {} tokens", forms.len()));
  }

  let tag = target.tag.as_str();
  match action {
    ActionClass::SubstituteDet if !(tag == "DT" && DETERMINERS.contains(&target.form.as_str())) => {
      invalid(format!("{} is not a determiner", target.form))
    }
    ActionClass::SubstituteNoun if tag != "NN" && tag != "NNS" => {
      invalid(format!("tag {} is not a noun tag", tag))
    }
    ActionClass::SubstituteVerbForm if !tag.starts_with("VB") => {
      invalid(format!("tag {} is not a verb tag", tag))
    }
    ActionClass::SubstitutePrep if !tag.starts_with("IN") => {
      invalid(format!("tag {} is not a preposition tag", tag))
    }
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexicon::{EnglishInflector, UniformModel};
  use crate::token::{forms, with_root};

  fn sent(words: &[(&str, &str, usize)]) -> Vec<Token> {
    with_root(
      &words
        .iter()
        .map(|(w, t, p)| Token::new(0, *w, *t).with_parent(*p))
        .collect::<Vec<_>>(),
    )
  }

  fn gold(words: &[&str]) -> Vec<String> {
    std::iter::once("_ROOT_")
      .chain(words.iter().copied())
      .map(String::from)
      .collect()
  }

  #[test]
  fn test_attach_costs() {
    // the dog barks: the <- dog <- barks <- ROOT
    let s = sent(&[("the", "DT", 2), ("dog", "NN", 3), ("barks", "VBZ", 0)]);
    let o = CostOracle::default();
    let g = DependencyGraph::new();
    let lex = Lexicon::default();
    let f = forms(&s);
    let cost = |p: usize, c: usize, a| {
      o.action_cost(&s, &g, &s[p], &s[c], a, &f, &f, &lex)
        .unwrap()
    };

    assert_eq!(cost(2, 1, ActionClass::AttachLeft), 0);
    // dog still needs its determiner
    assert_eq!(cost(3, 2, ActionClass::AttachLeft), 1);
    // the belongs to dog, not barks; and dog needs it
    assert_eq!(cost(1, 2, ActionClass::AttachRight), 2);
    // premature ROOT attachment: barks still heads dog, and ROOT can't take it yet
    assert_eq!(cost(0, 3, ActionClass::AttachRight), 2);
  }

  #[test]
  fn test_gold_path_is_free() {
    // he saw the big dog: he <- saw -> dog, the <- dog, big <- dog
    let s = sent(&[
      ("he", "PRP", 2),
      ("saw", "VBD", 0),
      ("the", "DT", 5),
      ("big", "JJ", 5),
      ("dog", "NN", 2),
    ]);
    let f = forms(&s);
    let o = CostOracle::default();
    let lex = Lexicon::default();
    let mut g = DependencyGraph::new();
    let mut roots = s.clone();

    let path = [
      (5, 4, ActionClass::AttachLeft),
      (5, 3, ActionClass::AttachLeft),
      (2, 1, ActionClass::AttachLeft),
      (2, 5, ActionClass::AttachRight),
      (0, 2, ActionClass::AttachRight),
    ];
    for (p, c, action) in path {
      let cost = o.action_cost(&roots, &g, &s[p], &s[c], action, &f, &f, &lex).unwrap();
      assert_eq!(cost, 0, "{} {} -> {}", action, p, c);
      g.add(&s[p], &s[c], "_").unwrap();
      roots.retain(|t| t.id != c);
    }
    assert_eq!(roots.len(), 1);
  }

  #[test]
  fn test_deletion_cost() {
    let s = sent(&[("I", "PRP", 2), ("like", "VBP", 0), ("the", "DT", 4), ("music", "NN", 2)]);
    let f = forms(&s);
    let o = CostOracle::default();
    let g = DependencyGraph::new();
    let lex = Lexicon::default();

    let gold_without = gold(&["I", "like", "music"]);
    let c = o
      .action_cost(&s, &g, &s[3], &s[2], ActionClass::DeleteDet, &f, &gold_without, &lex)
      .unwrap();
    assert_eq!(c, 0);

    // deleting a correct determiner never helps
    let c = o
      .action_cost(&s, &g, &s[3], &s[2], ActionClass::DeleteDet, &f, &f, &lex)
      .unwrap();
    assert_eq!(c, 1);
  }

  #[test]
  fn test_insertion_cost_and_chunk_gate() {
    let mut s = sent(&[("I", "PRP", 2), ("read", "VBD", 0), ("book", "NN", 2)]);
    s[3].lemma = "B-NP".to_string();
    let f = forms(&s);
    let g = DependencyGraph::new();
    let lm = |sent: &str| if sent.contains(" the ") { 0.0 } else { -1.0 };
    let lex = Lexicon::new(lm, EnglishInflector);
    let gold_with = gold(&["I", "read", "the", "book"]);

    let o = CostOracle::default();
    let c = o
      .action_cost(&s, &g, &s[3], &s[2], ActionClass::InsertDet, &f, &gold_with, &lex)
      .unwrap();
    assert_eq!(c, 0);

    let gated = CostOracle::new(true);
    let c = gated
      .action_cost(&s, &g, &s[3], &s[2], ActionClass::InsertDet, &f, &gold_with, &lex)
      .unwrap();
    assert_eq!(c, 1);
  }

  #[test]
  fn test_insertion_uses_subtree_border() {
    // "the book" already attached: inserting for "book" goes before "the"
    let s = sent(&[("read", "VBD", 0), ("the", "DT", 3), ("book", "NN", 1)]);
    let mut g = DependencyGraph::new();
    g.add(&s[3], &s[2], "_").unwrap();
    let parsed = vec![s[0].clone(), s[1].clone(), s[3].clone()];
    let f = forms(&s);
    let lm = |sent: &str| if sent.starts_with("read on the") { 0.0 } else { -1.0 };
    let lex = Lexicon::new(lm, EnglishInflector);
    let o = CostOracle::default();

    let target = gold(&["read", "on", "the", "book"]);
    let c = o
      .action_cost(&parsed, &g, &s[3], &s[1], ActionClass::InsertPrep, &f, &target, &lex)
      .unwrap();
    assert_eq!(c, 0);
  }

  #[test]
  fn test_substitution_costs() {
    let s = sent(&[("he", "PRP", 2), ("go", "VBP", 0), ("in", "IN", 2), ("school", "NN", 3)]);
    let f = forms(&s);
    let g = DependencyGraph::new();
    let o = CostOracle::default();
    let lm = |sent: &str| match sent {
      "he goes in school" | "he go to school" => 0.0,
      _ => -3.0,
    };
    let lex = Lexicon::new(lm, EnglishInflector);
    let g_forms = gold(&["he", "goes", "to", "school"]);

    let c = |p: usize, a| o.action_cost(&s, &g, &s[p], &s[p - 1], a, &f, &g_forms, &lex).unwrap();
    assert_eq!(c(2, ActionClass::SubstituteVerbForm), 0);
    assert_eq!(c(3, ActionClass::SubstitutePrep), 0);
    // school -> schools moves away from gold
    assert_eq!(c(4, ActionClass::SubstituteNoun), 1);
  }

  #[test]
  fn test_neutral_substitution_is_free() {
    let s = sent(&[("dogs", "NNS", 0)]);
    let f = forms(&s);
    let o = CostOracle::default();
    let lex = Lexicon::new(UniformModel, EnglishInflector);
    let g = DependencyGraph::new();
    // dogs -> dog: distance to a gold that matches neither stays the same
    let c = o
      .action_cost(&s, &g, &s[1], &s[0], ActionClass::SubstituteNoun, &f, &gold(&["cats"]), &lex)
      .unwrap();
    assert_eq!(c, 0);
  }

  #[test]
  fn test_contract_violations() {
    let mut s = sent(&[("go", "VB", 0), ("the", "DT", 0)]);
    let f = forms(&s);
    let o = CostOracle::default();
    let g = DependencyGraph::new();
    let lex = Lexicon::default();

    assert!(matches!(
      o.action_cost(&s, &g, &s[1], &s[0], ActionClass::SubstituteDet, &f, &f, &lex),
      Err(ParseError::InvalidTarget { id: 1, .. })
    ));

    s[2].edit = crate::token::EditState::Edited;
    assert!(matches!(
      o.action_cost(&s, &g, &s[2], &s[1], ActionClass::DeleteDet, &f, &f, &lex),
      Err(ParseError::EditedTarget { id: 2, .. })
    ));
  }
}
