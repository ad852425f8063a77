use std::collections::HashMap;

use crate::actions::ActionClass;
use crate::error::ParseError;
use crate::token::Token;
use crate::utils::lm_sentence;

/// Scores a whole sentence; higher is more fluent. Only ever used to rank
/// lexical choices for edit actions, never to choose attachments.
pub trait LanguageModel {
  fn score(&self, sentence: &str) -> f64;
}

impl<F> LanguageModel for F
where
  F: Fn(&str) -> f64,
{
  fn score(&self, sentence: &str) -> f64 {
    self(sentence)
  }
}

/// Scores every sentence the same, so the first candidate always wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformModel;

impl LanguageModel for UniformModel {
  fn score(&self, _sentence: &str) -> f64 {
    0.0
  }
}

const BOS: &str = "<s>";
const EOS: &str = "</s>";

/// Add-one smoothed bigram model over surface forms, with sentence boundary
/// markers. Returns natural-log probabilities.
#[derive(Debug, Clone, Default)]
pub struct BigramModel {
  unigrams: HashMap<String, usize>,
  bigrams: HashMap<(String, String), usize>,
}

impl BigramModel {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn observe<S: AsRef<str>>(&mut self, words: &[S]) {
    let padded = std::iter::once(BOS)
      .chain(words.iter().map(|w| w.as_ref()))
      .chain(std::iter::once(EOS))
      .collect::<Vec<_>>();

    for w in padded.iter() {
      *self.unigrams.entry(w.to_string()).or_insert(0) += 1;
    }
    for pair in padded.windows(2) {
      *self
        .bigrams
        .entry((pair[0].to_string(), pair[1].to_string()))
        .or_insert(0) += 1;
    }
  }

  pub fn vocab_size(&self) -> usize {
    self.unigrams.len()
  }
}

impl LanguageModel for BigramModel {
  fn score(&self, sentence: &str) -> f64 {
    let v = self.vocab_size().max(1) as f64;
    let words = std::iter::once(BOS)
      .chain(sentence.split_whitespace())
      .chain(std::iter::once(EOS))
      .collect::<Vec<_>>();

    words
      .windows(2)
      .map(|pair| {
        let context = self.unigrams.get(pair[0]).copied().unwrap_or(0) as f64;
        let joint = self
          .bigrams
          .get(&(pair[0].to_string(), pair[1].to_string()))
          .copied()
          .unwrap_or(0) as f64;
        ((joint + 1.0) / (context + v)).ln()
      })
      .sum()
  }
}

/// Tense/aspect slots, paired one-to-one with the verb tags they produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenseAspect {
  Infinitive,
  FirstSingular,
  ThirdSingular,
  Participle,
  Past,
  PastParticiple,
}

impl TenseAspect {
  pub const ALL: [TenseAspect; 6] = [
    Self::Infinitive,
    Self::FirstSingular,
    Self::ThirdSingular,
    Self::Participle,
    Self::Past,
    Self::PastParticiple,
  ];

  pub fn tag(self) -> &'static str {
    match self {
      Self::Infinitive => "VB",
      Self::FirstSingular => "VBP",
      Self::ThirdSingular => "VBZ",
      Self::Participle => "VBG",
      Self::Past => "VBD",
      Self::PastParticiple => "VBN",
    }
  }
}

/// Morphological generation needed by the substitution actions.
pub trait Inflector {
  fn pluralize(&self, noun: &str) -> String;
  fn singularize(&self, noun: &str) -> String;
  /// Base form of a verb
  fn lemma(&self, verb: &str) -> String;
  fn conjugate(&self, lemma: &str, ta: TenseAspect) -> String;
}

const IRREGULAR_NOUNS: [(&str, &str); 8] = [
  ("man", "men"),
  ("woman", "women"),
  ("child", "children"),
  ("person", "people"),
  ("foot", "feet"),
  ("tooth", "teeth"),
  ("mouse", "mice"),
  ("goose", "geese"),
];

/// (lemma, past, past participle)
const IRREGULAR_VERBS: [(&str, &str, &str); 16] = [
  ("be", "was", "been"),
  ("have", "had", "had"),
  ("do", "did", "done"),
  ("go", "went", "gone"),
  ("see", "saw", "seen"),
  ("take", "took", "taken"),
  ("make", "made", "made"),
  ("give", "gave", "given"),
  ("come", "came", "come"),
  ("get", "got", "gotten"),
  ("write", "wrote", "written"),
  ("eat", "ate", "eaten"),
  ("run", "ran", "run"),
  ("say", "said", "said"),
  ("know", "knew", "known"),
  ("think", "thought", "thought"),
];

fn is_vowel(c: char) -> bool {
  matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn sibilant(word: &str) -> bool {
  ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s))
}

fn consonant_y(word: &str) -> bool {
  let mut rev = word.chars().rev();
  rev.next() == Some('y') && rev.next().is_some_and(|c| !is_vowel(c))
}

/// Adds the -s/-es suffix shared by plural nouns and third-person verbs.
fn add_s(word: &str) -> String {
  if consonant_y(word) {
    format!("{}ies", &word[..word.len() - 1])
  } else if sibilant(word) || word.ends_with('o') {
    format!("{}es", word)
  } else {
    format!("{}s", word)
  }
}

fn strip_s(word: &str) -> String {
  if let Some(stem) = word.strip_suffix("ies") {
    format!("{}y", stem)
  } else if let Some(stem) = word
    .strip_suffix("es")
    .filter(|stem| sibilant(stem) || stem.ends_with('o'))
  {
    stem.to_string()
  } else if word.ends_with('s') && !word.ends_with("ss") && word.len() > 1 {
    word[..word.len() - 1].to_string()
  } else {
    word.to_string()
  }
}

/// Suffix-rule English morphology with a small table of irregulars.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishInflector;

impl Inflector for EnglishInflector {
  fn pluralize(&self, noun: &str) -> String {
    if let Some((_, pl)) = IRREGULAR_NOUNS.iter().find(|(sg, _)| *sg == noun) {
      return pl.to_string();
    }
    add_s(noun)
  }

  fn singularize(&self, noun: &str) -> String {
    if let Some((sg, _)) = IRREGULAR_NOUNS.iter().find(|(_, pl)| *pl == noun) {
      return sg.to_string();
    }
    strip_s(noun)
  }

  fn lemma(&self, verb: &str) -> String {
    let verb = verb.to_lowercase();
    match verb.as_str() {
      "am" | "is" | "are" | "was" | "were" | "been" | "being" | "be" => return "be".into(),
      "has" | "had" | "having" => return "have".into(),
      "does" | "did" | "doing" => return "do".into(),
      "goes" | "going" => return "go".into(),
      _ => {}
    }
    if let Some((lemma, _, _)) = IRREGULAR_VERBS
      .iter()
      .find(|(_, past, pp)| *past == verb || *pp == verb)
    {
      return lemma.to_string();
    }

    if let Some(stem) = verb.strip_suffix("ing").filter(|s| s.len() > 1) {
      undouble(stem)
    } else if let Some(stem) = verb.strip_suffix("ied") {
      format!("{}y", stem)
    } else if let Some(stem) = verb.strip_suffix("ed").filter(|s| s.len() > 1) {
      if stem.ends_with('e') {
        stem.to_string()
      } else {
        undouble(stem)
      }
    } else {
      strip_s(&verb)
    }
  }

  fn conjugate(&self, lemma: &str, ta: TenseAspect) -> String {
    let irregular = IRREGULAR_VERBS.iter().find(|(l, _, _)| *l == lemma);
    match ta {
      TenseAspect::Infinitive => lemma.to_string(),
      TenseAspect::FirstSingular => match lemma {
        "be" => "am".into(),
        _ => lemma.to_string(),
      },
      TenseAspect::ThirdSingular => match lemma {
        "be" => "is".into(),
        "have" => "has".into(),
        _ => add_s(lemma),
      },
      TenseAspect::Participle => {
        if let Some(stem) = lemma.strip_suffix("ie") {
          format!("{}ying", stem)
        } else if lemma.ends_with('e') && !lemma.ends_with("ee") && lemma != "be" {
          format!("{}ing", &lemma[..lemma.len() - 1])
        } else {
          format!("{}ing", lemma)
        }
      }
      TenseAspect::Past => match irregular {
        Some((_, past, _)) => past.to_string(),
        None => regular_past(lemma),
      },
      TenseAspect::PastParticiple => match irregular {
        Some((_, _, pp)) => pp.to_string(),
        None => regular_past(lemma),
      },
    }
  }
}

fn regular_past(lemma: &str) -> String {
  if lemma.ends_with('e') {
    format!("{}d", lemma)
  } else if consonant_y(lemma) {
    format!("{}ied", &lemma[..lemma.len() - 1])
  } else {
    format!("{}ed", lemma)
  }
}

/// "runn" -> "run", "stopp" -> "stop"
fn undouble(stem: &str) -> String {
  let mut rev = stem.char_indices().rev();
  match (rev.next(), rev.next()) {
    (Some((last, a)), Some((_, b)))
      if a == b && !is_vowel(a) && !matches!(a, 's' | 'l' | 'z') =>
    {
      stem[..last].to_string()
    }
    _ => stem.to_string(),
  }
}

/// Lexical choice for edit actions: ranks candidate surface forms by the
/// language model score of the whole edited sentence.
///
/// `forms` is always the full current sentence with ROOT at index 0, so a
/// token id indexes it directly.
pub struct Lexicon {
  lm: Box<dyn LanguageModel>,
  inflector: Box<dyn Inflector>,
}

impl Default for Lexicon {
  fn default() -> Self {
    Self::new(UniformModel, EnglishInflector)
  }
}

impl Lexicon {
  pub fn new(lm: impl LanguageModel + 'static, inflector: impl Inflector + 'static) -> Self {
    Self {
      lm: Box::new(lm),
      inflector: Box::new(inflector),
    }
  }

  /// Index of the best candidate. The LM is called once per candidate and the
  /// first of equally scored candidates wins.
  fn rank<F>(
    &self,
    action: ActionClass,
    candidates: &[String],
    edited: F,
  ) -> Result<usize, ParseError>
  where
    F: Fn(&str) -> Vec<String>,
  {
    if candidates.is_empty() {
      return Err(ParseError::EmptyCandidates(action));
    }

    let mut best = (0, f64::NEG_INFINITY);
    for (idx, cand) in candidates.iter().enumerate() {
      let score = self.lm.score(&lm_sentence(&edited(cand)));
      if score > best.1 {
        best = (idx, score);
      }
    }
    Ok(best.0)
  }

  /// Best replacement for the form at `pos`.
  pub fn best_substitute(
    &self,
    action: ActionClass,
    forms: &[String],
    pos: usize,
    candidates: &[&str],
  ) -> Result<String, ParseError> {
    let candidates: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
    let best = self.rank(action, &candidates, |cand| {
      let mut edited = forms.to_vec();
      edited[pos] = cand.to_string();
      edited
    })?;
    Ok(candidates[best].clone())
  }

  /// Best new form to insert in front of `pos`.
  pub fn best_insertion(
    &self,
    action: ActionClass,
    forms: &[String],
    pos: usize,
    candidates: &[&str],
  ) -> Result<String, ParseError> {
    let candidates: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
    let best = self.rank(action, &candidates, |cand| {
      let mut edited = forms.to_vec();
      edited.insert(pos, cand.to_string());
      edited
    })?;
    Ok(candidates[best].clone())
  }

  /// Best re-inflection of the verb at `pos`, with the tag it should now carry.
  pub fn best_verb_form(
    &self,
    forms: &[String],
    pos: usize,
  ) -> Result<(String, &'static str), ParseError> {
    let lemma = self.inflector.lemma(&forms[pos]);
    let options: Vec<(String, &'static str)> = TenseAspect::ALL
      .iter()
      .map(|&ta| (self.inflector.conjugate(&lemma, ta), ta.tag()))
      .collect();
    let candidates: Vec<String> = options.iter().map(|(f, _)| f.clone()).collect();

    let best = self.rank(ActionClass::SubstituteVerbForm, &candidates, |cand| {
      let mut edited = forms.to_vec();
      edited[pos] = cand.to_string();
      edited
    })?;
    Ok(options[best].clone())
  }

  /// Singular noun to plural or back, with the new tag.
  pub fn flip_number(&self, tok: &Token) -> Result<(String, &'static str), ParseError> {
    match tok.tag.as_str() {
      "NN" => Ok((self.inflector.pluralize(&tok.form), "NNS")),
      "NNS" => Ok((self.inflector.singularize(&tok.form), "NN")),
      other => Err(ParseError::InvalidTarget {
        action: ActionClass::SubstituteNoun,
        id: tok.id,
        reason: format!("tag {} is not a noun tag", other),
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  fn forms(words: &[&str]) -> Vec<String> {
    std::iter::once("_ROOT_")
      .chain(words.iter().copied())
      .map(String::from)
      .collect()
  }

  #[test]
  fn test_inflector_nouns() {
    let inf = EnglishInflector;
    assert_eq!(inf.pluralize("dog"), "dogs");
    assert_eq!(inf.pluralize("box"), "boxes");
    assert_eq!(inf.pluralize("city"), "cities");
    assert_eq!(inf.pluralize("child"), "children");
    assert_eq!(inf.singularize("dogs"), "dog");
    assert_eq!(inf.singularize("boxes"), "box");
    assert_eq!(inf.singularize("cities"), "city");
    assert_eq!(inf.singularize("glass"), "glass");
    assert_eq!(inf.singularize("people"), "person");
  }

  #[test]
  fn test_inflector_verbs() {
    let inf = EnglishInflector;
    assert_eq!(inf.lemma("goes"), "go");
    assert_eq!(inf.lemma("running"), "run");
    assert_eq!(inf.lemma("walked"), "walk");
    assert_eq!(inf.lemma("studied"), "study");
    assert_eq!(inf.lemma("barks"), "bark");
    assert_eq!(inf.lemma("was"), "be");
    assert_eq!(inf.lemma("written"), "write");
    assert_eq!(inf.lemma("stopped"), "stop");

    let forms: Vec<String> = TenseAspect::ALL
      .iter()
      .map(|&ta| inf.conjugate("walk", ta))
      .collect();
    assert_eq!(forms, vec!["walk", "walk", "walks", "walking", "walked", "walked"]);

    let forms: Vec<String> = TenseAspect::ALL
      .iter()
      .map(|&ta| inf.conjugate("be", ta))
      .collect();
    assert_eq!(forms, vec!["be", "am", "is", "being", "was", "been"]);

    assert_eq!(inf.conjugate("make", TenseAspect::Participle), "making");
    assert_eq!(inf.conjugate("study", TenseAspect::Past), "studied");
  }

  #[test]
  fn test_bigram_prefers_seen_order() {
    let mut lm = BigramModel::new();
    lm.observe(&["the", "dog", "barks"]);
    lm.observe(&["a", "cat", "sleeps"]);
    assert!(lm.score("the dog barks") > lm.score("dog the barks"));
    assert!(lm.score("a cat sleeps") > lm.score("the cat sleeps"));
  }

  #[test]
  fn test_substitute_calls_lm_once_per_candidate() {
    let calls = std::rc::Rc::new(Cell::new(0));
    let counter = calls.clone();
    let lex = Lexicon::new(
      move |s: &str| {
        counter.set(counter.get() + 1);
        if s.starts_with("an ") { 1.0 } else { 0.0 }
      },
      EnglishInflector,
    );
    let best = lex
      .best_substitute(ActionClass::SubstituteDet, &forms(&["a", "apple"]), 1, &["a", "the", "an"])
      .unwrap();
    assert_eq!(best, "an");
    assert_eq!(calls.get(), 3);
  }

  #[test]
  fn test_rank_counts_and_ties() {
    let calls = std::rc::Rc::new(Cell::new(0));
    let counter = calls.clone();
    let lex = Lexicon::new(
      move |_: &str| {
        counter.set(counter.get() + 1);
        -1.0
      },
      EnglishInflector,
    );
    let preps = &crate::actions::PREPOSITIONS;
    let best = lex
      .best_insertion(ActionClass::InsertPrep, &forms(&["go", "school"]), 2, preps)
      .unwrap();
    // all tied: first candidate wins
    assert_eq!(best, "on");
    assert_eq!(calls.get(), crate::actions::PREPOSITIONS.len());
  }

  #[test]
  fn test_empty_candidates_fail() {
    let lex = Lexicon::default();
    assert!(matches!(
      lex.best_substitute(ActionClass::SubstitutePrep, &forms(&["in"]), 1, &[]),
      Err(ParseError::EmptyCandidates(ActionClass::SubstitutePrep))
    ));
  }

  #[test]
  fn test_verb_form_and_number() {
    let lm = |s: &str| if s == "he goes" { 0.0 } else { -5.0 };
    let lex = Lexicon::new(lm, EnglishInflector);
    let (form, tag) = lex.best_verb_form(&forms(&["he", "go"]), 2).unwrap();
    assert_eq!((form.as_str(), tag), ("goes", "VBZ"));

    let tok = Token::new(1, "dog", "NN");
    assert_eq!(lex.flip_number(&tok).unwrap(), ("dogs".to_string(), "NNS"));
    assert!(lex.flip_number(&Token::new(1, "run", "VB")).is_err());
  }

  #[test]
  fn test_lemma_of_non_ascii_doubled_stem() {
    let inf = EnglishInflector;
    assert_eq!(inf.lemma("paßßed"), "paß");
    assert_eq!(inf.lemma("paßßing"), "paß");
    assert_eq!(inf.lemma("ébbing"), "éb");

    let lex = Lexicon::default();
    let (form, tag) = lex.best_verb_form(&forms(&["he", "paßßed"]), 2).unwrap();
    assert_eq!((form.as_str(), tag), ("paß", "VB"));
  }
}
