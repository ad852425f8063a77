use std::fmt::Write;

use regex::Regex;

use crate::error::ParseError;
use crate::token::Token;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

const NUM_COLUMNS: usize = 10;

fn conll_err(line: usize, msg: impl Into<String>) -> ParseError {
  ParseError::Conll {
    line,
    msg: msg.into(),
  }
}

/// Heads of `_` or below zero mean "not annotated".
fn parse_head(col: &str, line: usize) -> Result<Option<usize>, ParseError> {
  if col == "_" {
    return Ok(None);
  }
  let head: i64 = col
    .parse()
    .map_err(|_| conll_err(line, format!("bad head {:?}", col)))?;
  Ok(usize::try_from(head).ok())
}

/// One 10-column record. Columns are counted from the end past the form, so
/// extra leading columns are tolerated the same way extra spaces are.
fn parse_record(cols: &[&str], line: usize) -> Result<Token, ParseError> {
  if cols.len() < NUM_COLUMNS {
    return Err(conll_err(
      line,
      format!("expected {} columns, found {}", NUM_COLUMNS, cols.len()),
    ));
  }
  let from_end = |k: usize| cols[cols.len() - k];

  let id: usize = cols[0]
    .parse()
    .map_err(|_| conll_err(line, format!("bad id {:?}", cols[0])))?;
  let ctag = cols[3].to_string();
  let tag = if cols[4] == "_" { ctag.clone() } else { cols[4].to_string() };

  Ok(Token {
    id,
    form: cols[1].to_string(),
    lemma: cols[2].to_string(),
    ctag,
    tag,
    feats: from_end(5).to_string(),
    parent: parse_head(from_end(4), line)?,
    prel: from_end(3).to_string(),
    extra: from_end(1).to_string(),
    ..Default::default()
  })
}

/// Reads blank-line separated CoNLL sentences. A sentence whose first line
/// starts with `@` is a marker block and is skipped.
pub fn read_sentences(input: &str) -> Result<Vec<Vec<Token>>, ParseError> {
  regex_static!(SEPARATOR, r"[\t ]+");

  let mut sents = Vec::new();
  let mut current: Vec<Token> = Vec::new();
  let mut skipping = false;

  for (n, line) in input.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() {
      if !current.is_empty() {
        sents.push(std::mem::take(&mut current));
      }
      skipping = false;
      continue;
    }
    if current.is_empty() && line.starts_with('@') {
      skipping = true;
    }
    if skipping {
      continue;
    }

    let cols: Vec<&str> = SEPARATOR.split(line).collect();
    current.push(parse_record(&cols, n + 1)?);
  }
  if !current.is_empty() {
    sents.push(current);
  }

  Ok(sents)
}

/// Reads one sentence per line of space-separated `word_TAG` tokens. The tag is
/// everything after the last underscore.
pub fn read_tagged(input: &str) -> Result<Vec<Vec<Token>>, ParseError> {
  regex_static!(TAGGED, r"^(.+)_([^_]+)$");

  input
    .lines()
    .enumerate()
    .filter(|(_, line)| !line.trim().is_empty())
    .map(|(n, line)| {
      line
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| -> Result<Token, ParseError> {
          let caps = TAGGED
            .captures(word)
            .ok_or_else(|| conll_err(n + 1, format!("untagged token {:?}", word)))?;
          Ok(Token::new(i + 1, &caps[1], &caps[2]))
        })
        .collect()
    })
    .collect()
}

/// Formats a parsed sentence with its predicted heads and labels, one token per
/// line, followed by a blank line.
pub fn to_conll(sent: &[Token]) -> String {
  let mut out = String::new();
  for tok in sent.iter().filter(|t| !t.is_root()) {
    let head = tok.pparent.map_or_else(|| "_".to_string(), |p| p.to_string());
    let rel = tok.pprel.as_deref().unwrap_or("_");
    // writing to a String can't fail
    let _ = writeln!(
      out,
      "{}\t{}\t{}\t{}\t{}\t_\t{}\t{}\t_\t{}",
      tok.id, tok.form, tok.lemma, tok.tag, tok.tag, head, rel, tok.extra
    );
  }
  out.push('\n');
  out
}
