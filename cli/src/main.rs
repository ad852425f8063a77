use std::env;
use std::fs;
use std::io;
use std::io::{Read, Write};
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use easyfirst::conll::{read_sentences, read_tagged, to_conll};
use easyfirst::token::forms;
use easyfirst::{
  BigramModel, EnglishInflector, Err, ExplorePolicy, Lexicon, ParserConfig, Token, Trainer,
  TrainerConfig,
};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} TRAIN_FILE GOLD_FILE [options]

Trains a parser on TRAIN_FILE (CoNLL, erroneous sentences with gold heads)
aligned with GOLD_FILE (CoNLL, corrected sentences), then parses and corrects
sentences read from stdin.

Options:
  -h, --help          Print this message
  -i, --iters N       Training iterations (defaults to 20)
  -e, --explore       Follow the model's own mistakes during training
  -a, --attach-only   Parse without edit actions
  -g, --chunk-gated   Train insertions as free only inside noun-phrase chunks
                      (the CoNLL lemma column must mark them)
  -t, --tagged        Read stdin as word_TAG lines instead of CoNLL",
    prog_name
  )
}

struct Args {
  train_file: String,
  gold_file: String,
  iterations: usize,
  explore: bool,
  attach_only: bool,
  chunk_gated: bool,
  tagged: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let Some(prog_name) = iter.next() else {
      return Err(Self::make_error_message("bad argument vector", "cli"));
    };

    let mut files: Vec<String> = Vec::new();
    let mut iterations = TrainerConfig::default().iterations;
    let mut explore = false;
    let mut attach_only = false;
    let mut chunk_gated = false;
    let mut tagged = false;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-i" || o == "--iters" {
        iterations = match iter.next().map(|n| n.parse()) {
          Some(Ok(n)) => n,
          _ => return Err(Self::make_error_message("--iters needs a number", prog_name)),
        };
      } else if o == "-e" || o == "--explore" {
        explore = true;
      } else if o == "-a" || o == "--attach-only" {
        attach_only = true;
      } else if o == "-g" || o == "--chunk-gated" {
        chunk_gated = true;
      } else if o == "-t" || o == "--tagged" {
        tagged = true;
      } else if o.starts_with('-') {
        return Err(Self::make_error_message(&format!("unknown option {}", o), prog_name));
      } else {
        files.push(o);
      }
    }

    let mut files = files.into_iter();
    match (files.next(), files.next(), files.next()) {
      (Some(train_file), Some(gold_file), None) => Ok(Self {
        train_file,
        gold_file,
        iterations,
        explore,
        attach_only,
        chunk_gated,
        tagged,
      }),
      (_, _, Some(_)) => Err(Self::make_error_message("too many arguments", prog_name)),
      _ => Err(Self::make_error_message("missing training files", prog_name)),
    }
  }
}

fn parser_config(opts: &Args) -> ParserConfig {
  ParserConfig {
    attach_only: opts.attach_only,
    chunk_gated_insertion: opts.chunk_gated,
    ..Default::default()
  }
}

fn read_corpus(path: &str) -> Result<Vec<Vec<Token>>, Err> {
  let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
  Ok(read_sentences(&text)?)
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let train = read_corpus(&opts.train_file)?;
  let gold = read_corpus(&opts.gold_file)?;
  if train.len() != gold.len() {
    return Err(
      format!(
        "{} has {} sentences but {} has {}",
        opts.train_file,
        train.len(),
        opts.gold_file,
        gold.len()
      )
      .into(),
    );
  }

  let mut lm = BigramModel::new();
  for sent in gold.iter() {
    lm.observe(&forms(sent));
  }
  info!(sentences = train.len(), vocab = lm.vocab_size(), "loaded training data");

  let config = TrainerConfig {
    iterations: opts.iterations,
    explore: opts.explore.then(|| ExplorePolicy::coling2012(1)),
    ..Default::default()
  };
  let mut trainer = Trainer::new(Lexicon::new(lm, EnglishInflector), parser_config(&opts), config);
  let pairs: Vec<(Vec<Token>, Vec<Token>)> = train.into_iter().zip(gold).collect();
  trainer.train(&pairs)?;
  let parser = trainer.into_parser();

  let mut input = String::new();
  io::stdin().read_to_string(&mut input)?;
  let sents = if opts.tagged {
    read_tagged(&input)?
  } else {
    read_sentences(&input)?
  };

  let stdout = io::stdout();
  let mut out = stdout.lock();
  for sent in sents.iter() {
    let parsed = parser.parse(sent)?;
    out.write_all(to_conll(&parsed.annotated()).as_bytes())?;
  }
  out.flush()?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(v: &[&str]) -> Result<Args, String> {
    Args::parse(v.iter().map(|s| s.to_string()).collect())
  }

  #[test]
  fn test_chunk_gated_flag() {
    let opts = args(&["cli", "train.conll", "gold.conll", "--chunk-gated"]).unwrap();
    assert!(opts.chunk_gated && !opts.attach_only);
    assert!(parser_config(&opts).chunk_gated_insertion);

    let opts = args(&["cli", "-g", "-a", "train.conll", "gold.conll"]).unwrap();
    let config = parser_config(&opts);
    assert!(config.chunk_gated_insertion && config.attach_only);

    let opts = args(&["cli", "train.conll", "gold.conll"]).unwrap();
    assert!(!parser_config(&opts).chunk_gated_insertion);
  }

  #[test]
  fn test_bad_arguments() {
    assert!(args(&["cli", "-x", "train.conll", "gold.conll"]).is_err());
    assert!(args(&["cli", "train.conll"]).is_err());
    assert!(args(&["cli", "a", "b", "c"]).is_err());
    assert!(args(&["cli", "a", "b", "--iters", "many"]).is_err());
  }
}
