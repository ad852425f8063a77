use crate::graph::DependencyGraph;
use crate::token::Token;

pub const PAD: &str = "__PAD__";
const NONE: &str = "None";

/// Maps the parser state around the pair `(parsed[i], parsed[i + 1])` to a list
/// of feature strings. Must be deterministic: the parser caches the result per
/// token id until the neighbourhood changes.
pub trait FeatureExtractor {
  fn extract(
    &self,
    parsed: &[Token],
    graph: &DependencyGraph,
    i: usize,
    sent: &[Token],
  ) -> Vec<String>;
}

impl<F> FeatureExtractor for F
where
  F: Fn(&[Token], &DependencyGraph, usize, &[Token]) -> Vec<String>,
{
  fn extract(
    &self,
    parsed: &[Token],
    graph: &DependencyGraph,
    i: usize,
    sent: &[Token],
  ) -> Vec<String> {
    self(parsed, graph, i, sent)
  }
}

fn form(t: Option<&Token>) -> &str {
  t.map_or(PAD, |t| t.form.as_str())
}

fn tag(t: Option<&Token>) -> &str {
  t.map_or(PAD, |t| t.tag.as_str())
}

/// The easy-first baseline template set, extended with the edited flag of the
/// right focus token.
///
/// Naming follows the usual stack/buffer convention even though easy-first has
/// neither: `s0` is the left focus token, `n0` the right one, `n1`/`n2` the
/// tokens after it and `p1`/`p2` the tokens before `s0`. ROOT is never used as
/// a `p` context.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineFeatures;

struct Ctx<'a> {
  g: &'a DependencyGraph,
}

impl<'a> Ctx<'a> {
  fn label(&self, t: Option<&Token>) -> &'a str {
    t.and_then(|t| self.g.label_for(t)).unwrap_or(NONE)
  }

  fn left(&self, t: Option<&Token>) -> Option<&'a Token> {
    t.and_then(|t| self.g.left_child(t))
  }

  fn right(&self, t: Option<&Token>) -> Option<&'a Token> {
    t.and_then(|t| self.g.right_child(t))
  }

  fn left2(&self, t: Option<&Token>) -> Option<&'a Token> {
    t.and_then(|t| self.g.left_child2(t))
  }

  fn right2(&self, t: Option<&Token>) -> Option<&'a Token> {
    t.and_then(|t| self.g.right_child2(t))
  }

  /// Tag of a child, `None` when absent
  fn ctag(&self, t: Option<&'a Token>) -> &'a str {
    t.map_or(NONE, |t| t.tag.as_str())
  }
}

impl FeatureExtractor for BaselineFeatures {
  fn extract(
    &self,
    parsed: &[Token],
    graph: &DependencyGraph,
    i: usize,
    _sent: &[Token],
  ) -> Vec<String> {
    let cx = Ctx { g: graph };
    let j = i + 1;

    let s0 = parsed.get(i);
    let n0 = parsed.get(j);
    let n1 = parsed.get(j + 1);
    let n2 = parsed.get(j + 2);
    let p1 = if i > 1 { parsed.get(i - 1) } else { None };
    let p2 = if i > 2 { parsed.get(i - 2) } else { None };

    let (s0l, s0r, s0l2, s0r2) = (cx.left(s0), cx.right(s0), cx.left2(s0), cx.right2(s0));
    let (n0l, n0l2) = (cx.left(n0), cx.left2(n0));

    let d = match (s0, n0) {
      (Some(s), Some(n)) => {
        let d = n.id.saturating_sub(s.id);
        if d >= 10 { "10+".to_string() } else { d.to_string() }
      }
      _ => "NA".to_string(),
    };

    let valence = |t: Option<&Token>, left: bool| {
      t.map_or(0, |t| {
        if left {
          graph.num_left_children(t)
        } else {
          graph.num_right_children(t)
        }
      })
    };
    let (s0vr, s0vl, n0vl) = (valence(s0, false), valence(s0, true), valence(n0, true));

    let (s0w, n0w, n1w, n2w) = (form(s0), form(n0), form(n1), form(n2));
    let (s0p, n0p, n1p, n2p) = (tag(s0), tag(n0), tag(n1), tag(n2));
    let n0e = n0.is_some_and(Token::is_edited) as u8;

    let s0wp = format!("{}:{}", s0w, s0p);
    let n0wp = format!("{}:{}", n0w, n0p);
    let n1wp = format!("{}:{}", n1w, n1p);
    let n2wp = format!("{}:{}", n2w, n2p);

    let labels = |t: Option<&Token>, left: bool| {
      t.map_or(String::new(), |t| {
        if left {
          graph.left_labels(t)
        } else {
          graph.right_labels(t)
        }
      })
    };
    let (s0sr, s0sl, n0sl) = (labels(s0, false), labels(s0, true), labels(n0, true));

    let mut out: Vec<String> = Vec::with_capacity(160);
    let mut f = |s: String| out.push(s);

    // single words
    f(format!("s0wp_{}", s0wp));
    f(format!("s0w_{}", s0w));
    f(format!("s0p_{}", s0p));
    f(format!("n0wp_{}", n0wp));
    f(format!("n0w_{}", n0w));
    f(format!("n0e_{}", n0e));
    f(format!("n0p_{}", n0p));
    f(format!("n1wp_{}", n1wp));
    f(format!("n1w_{}", n1w));
    f(format!("n1p_{}", n1p));
    f(format!("n2wp_{}", n2wp));
    f(format!("n2w_{}", n2w));
    f(format!("n2p_{}", n2p));

    // pairs
    f(format!("s0wp,n0wp_{}_{}", s0wp, n0wp));
    f(format!("s0wp,n0w_{}_{}", s0wp, n0w));
    f(format!("s0w,n0wp_{}_{}", s0w, n0wp));
    f(format!("s0wp,n0p_{}_{}", s0wp, n0p));
    f(format!("s0p,n0wp_{}_{}", s0p, n0wp));
    f(format!("s0w,n0w_{}_{}", s0w, n0w));
    f(format!("s0p,n0p_{}_{}", s0p, n0p));
    f(format!("n0p,n1p_{}_{}", n0p, n1p));

    // tuples
    f(format!("n0p,n1p,n2p_{}_{}_{}", n0p, n1p, n2p));
    f(format!("s0p,n0p,n1p_{}_{}_{}", s0p, n0p, n1p));
    f(format!("s0p,s0lp,n0p_{}_{}_{}", s0p, tag(s0l), n0p));
    f(format!("s0p,s0rp,n0p_{}_{}_{}", s0p, tag(s0r), n0p));
    f(format!("s0p,n0p,n0lp_{}_{}_{}", s0p, n0p, tag(n0l)));

    // distance
    f(format!("s0wd_{}:{}", s0w, d));
    f(format!("s0pd_{}:{}", s0p, d));
    f(format!("n0wd_{}:{}", n0w, d));
    f(format!("n0pd_{}:{}", n0p, d));
    f(format!("s0w,n0w,d_{}:{}:{}", s0w, n0w, d));
    f(format!("s0p,n0p,d_{}:{}:{}", s0p, n0p, d));

    // valence
    f(format!("s0wvr_{}:{}", s0w, s0vr));
    f(format!("s0pvr_{}:{}", s0p, s0vr));
    f(format!("s0wvl_{}:{}", s0w, s0vl));
    f(format!("s0pvl_{}:{}", s0p, s0vl));
    f(format!("n0wvl_{}:{}", n0w, n0vl));
    f(format!("n0pvl_{}:{}", n0p, n0vl));

    // children
    f(format!("s0L_{}", cx.label(s0)));
    let children = [
      ("s0l", s0l),
      ("s0r", s0r),
      ("n0l", n0l),
      ("s0l2", s0l2),
      ("s0r2", s0r2),
      ("n0l2", n0l2),
    ];
    for (name, t) in children {
      f(format!("{}w_{}", name, form(t)));
      f(format!("{}p_{}", name, tag(t)));
      f(format!("{}L_{}", name, cx.label(t)));
    }
    f(format!("s0p,s0lp,s0l2p_{}_{}_{}", s0p, tag(s0l), tag(s0l2)));
    f(format!("s0p,s0rp,s0r2p_{}_{}_{}", s0p, tag(s0r), tag(s0r2)));
    f(format!("n0p,n0lp,n0l2p_{}_{}_{}", n0p, tag(n0l), tag(n0l2)));

    // label sets
    f(format!("s0wsr_{}_{}", s0w, s0sr));
    f(format!("s0psr_{}_{}", s0p, s0sr));
    f(format!("s0wsl_{}_{}", s0w, s0sl));
    f(format!("s0psl_{}_{}", s0p, s0sl));
    f(format!("n0wsl_{}_{}", n0w, n0sl));
    f(format!("n0psl_{}_{}", n0p, n0sl));

    // tag bigrams with the outermost children of each member
    let lc = |t: Option<&Token>| cx.ctag(cx.left(t));
    let rc = |t: Option<&Token>| cx.ctag(cx.right(t));
    // verbs governing an infinitival "to" get their own tag
    let vtag = |t: Option<&Token>| {
      let p = tag(t);
      if p.starts_with('V') && lc(t) == "TO" { format!("{}_TO", p) } else { p.to_string() }
    };
    let (f1t, f2t, p1t) = (vtag(s0), vtag(n0), vtag(p1));
    let (p2t, n1t, n2t) = (vtag(p2), vtag(n1), vtag(n2));
    let pairs = [
      ("f1tf2t", &f1t, &f2t, s0, n0),
      ("p1tf1t", &p1t, &f1t, p1, s0),
      ("p1tf2t", &p1t, &f2t, p1, n0),
      ("f2tn1t", &f2t, &n1t, n0, n1),
      ("f1tn1t", &f1t, &n1t, s0, n1),
    ];
    for (name, a, b, ta, tb) in pairs.iter().copied() {
      f(format!("A{}_{}_{}_{}_{}", name, a, b, lc(ta), lc(tb)));
      f(format!("B{}_{}_{}_{}_{}", name, a, b, lc(ta), rc(tb)));
      f(format!("C{}_{}_{}_{}_{}", name, a, b, rc(ta), lc(tb)));
      f(format!("D{}_{}_{}_{}_{}", name, a, b, rc(ta), rc(tb)));
      f(format!("1rD{}_{}_{}_{}", name, a, b, rc(ta)));
      f(format!("1lD{}_{}_{}_{}", name, a, b, lc(ta)));
      f(format!("2rD{}_{}_{}_{}", name, a, b, rc(tb)));
      f(format!("2lD{}_{}_{}_{}", name, a, b, lc(tb)));
    }

    // tag n-grams around the pair
    f(format!("A1_{}_{}_{}", f2t, rc(n0), n1t));
    f(format!("A2_{}_{}_{}_{}", f1t, f2t, rc(n0), n1t));
    f(format!("A3_{}_{}_{}", f1t, lc(s0), p1t));
    f(format!("A4_{}_{}_{}_{}", f1t, f2t, lc(s0), p1t));
    f(format!("A5_{}_{}_{}_{}", f2t, rc(n0), n1t, n2t));
    f(format!("A6_{}_{}_{}_{}", f1t, lc(s0), p1t, p2t));
    f(format!("A7_{}_{}_{}_{}", p1t, f1t, f2t, n1t));
    f(format!("A8_{}_{}_{}_{}_{}", f1t, f2t, rc(n0), n1t, n2t));
    f(format!("A9_{}_{}_{}_{}_{}", f2t, f1t, lc(s0), p1t, p2t));

    // two children on one side
    let (s0rc2, s0lc2) = (cx.ctag(s0r2), cx.ctag(s0l2));
    let (n0rc2, n0lc2) = (cx.ctag(cx.right2(n0)), cx.ctag(n0l2));
    f(format!("X1_{}_{}_{}", f1t, rc(s0), s0rc2));
    f(format!("X2_{}_{}_{}", f1t, lc(s0), s0lc2));
    f(format!("X3_{}_{}_{}", f2t, rc(n0), n0rc2));
    f(format!("X4_{}_{}_{}", f2t, lc(n0), n0lc2));
    f(format!("X5_{}_{}_{}_{}", f2t, rc(n0), n0rc2, n1t));
    f(format!("X6_{}_{}_{}_{}", f1t, lc(s0), s0lc2, p1t));
    f(format!("X7_{}_{}_{}_{}", f1t, rc(s0), s0rc2, f2t));
    f(format!("X8_{}_{}_{}_{}", f2t, lc(n0), n0lc2, f1t));

    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::token::with_root;

  fn sentence() -> Vec<Token> {
    with_root(&[
      Token::new(0, "the", "DT"),
      Token::new(0, "dog", "NN"),
      Token::new(0, "wants", "VBZ"),
      Token::new(0, "to", "TO"),
      Token::new(0, "eat", "VB"),
    ])
  }

  #[test]
  fn test_focus_and_padding() {
    let s = sentence();
    let g = DependencyGraph::new();
    let feats = BaselineFeatures.extract(&s, &g, 4, &s);
    assert!(feats.contains(&"s0wp_to:TO".to_string()));
    assert!(feats.contains(&"n0w_eat".to_string()));
    assert!(feats.contains(&format!("n1w_{}", PAD)));
    assert!(feats.contains(&"s0p,n0p,d_TO:VB:1".to_string()));
    assert!(feats.contains(&"n0e_0".to_string()));
  }

  #[test]
  fn test_root_is_not_previous_context() {
    let s = sentence();
    let g = DependencyGraph::new();
    let feats = BaselineFeatures.extract(&s, &g, 1, &s);
    assert!(feats.contains(&format!("A7_{}_DT_NN_VBZ", PAD)));
  }

  #[test]
  fn test_children_and_to_verbs() {
    let s = sentence();
    let mut g = DependencyGraph::new();
    g.add(&s[2], &s[1], "det").unwrap();
    g.add(&s[5], &s[4], "aux").unwrap();
    let parsed = vec![s[0].clone(), s[2].clone(), s[3].clone(), s[5].clone()];

    let feats = BaselineFeatures.extract(&parsed, &g, 1, &s);
    assert!(feats.contains(&"s0lw_the".to_string()));
    assert!(feats.contains(&"s0lL_det".to_string()));
    assert!(feats.contains(&"s0psl_NN_det".to_string()));
    assert!(feats.contains(&"n1p_VB".to_string()));
    // "eat" heads "to" now
    assert!(feats.contains(&"Af1tf2t_NN_VBZ_DT_None".to_string()));
    assert!(feats.contains(&"Af2tn1t_VBZ_VB_TO_None_TO".to_string()));
  }

  #[test]
  fn test_second_children() {
    let s = with_root(&[
      Token::new(0, "the", "DT"),
      Token::new(0, "big", "JJ"),
      Token::new(0, "dog", "NN"),
      Token::new(0, "barks", "VBZ"),
    ]);
    let mut g = DependencyGraph::new();
    g.add(&s[3], &s[1], "det").unwrap();
    g.add(&s[3], &s[2], "amod").unwrap();
    let parsed = vec![s[0].clone(), s[3].clone(), s[4].clone()];

    let feats = BaselineFeatures.extract(&parsed, &g, 1, &s);
    assert!(feats.contains(&"s0l2w_big".to_string()));
    assert!(feats.contains(&"s0p,s0lp,s0l2p_NN_DT_JJ".to_string()));
    assert!(feats.contains(&"X2_NN_DT_JJ".to_string()));
    assert!(feats.contains(&"X4_VBZ_None_None".to_string()));
  }

  #[test]
  fn test_deterministic() {
    let s = sentence();
    let g = DependencyGraph::new();
    let first = BaselineFeatures.extract(&s, &g, 2, &s);
    assert_eq!(first, BaselineFeatures.extract(&s, &g, 2, &s));
  }
}
