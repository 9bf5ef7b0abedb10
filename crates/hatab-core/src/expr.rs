//! A small arithmetic expression language for measures and KPI formulas.
//!
//! Expressions are evaluated against a name → value lookup. A name with no
//! value (a missing cell, an unparseable string) makes the whole expression
//! valueless, except where a [`Expr::SafeDiv`] short-circuits on a zero
//! denominator.

use std::ops;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Column(String),
  Const(f64),
  Add(Box<Expr>, Box<Expr>),
  Sub(Box<Expr>, Box<Expr>),
  Mul(Box<Expr>, Box<Expr>),
  /// Division yielding `0` when the denominator is `0`.
  SafeDiv(Box<Expr>, Box<Expr>),
  Min(Box<Expr>, Box<Expr>),
  Max(Box<Expr>, Box<Expr>),
  /// `1` if left ≤ right, else `0`.
  Le(Box<Expr>, Box<Expr>),
  /// `1` if left = right, else `0`.
  Eq(Box<Expr>, Box<Expr>),
  If {
    cond:      Box<Expr>,
    then:      Box<Expr>,
    otherwise: Box<Expr>,
  },
}

/// Reference a column (or, in a KPI formula, a measure).
pub fn col(name: impl Into<String>) -> Expr { Expr::Column(name.into()) }

pub fn lit(value: f64) -> Expr { Expr::Const(value) }

/// `then` where `cond` is non-zero, `otherwise` elsewhere.
pub fn when(cond: Expr, then: Expr, otherwise: Expr) -> Expr {
  Expr::If {
    cond:      Box::new(cond),
    then:      Box::new(then),
    otherwise: Box::new(otherwise),
  }
}

impl Expr {
  pub fn safe_div(self, rhs: Expr) -> Expr { Expr::SafeDiv(Box::new(self), Box::new(rhs)) }

  pub fn min(self, rhs: Expr) -> Expr { Expr::Min(Box::new(self), Box::new(rhs)) }

  pub fn max(self, rhs: Expr) -> Expr { Expr::Max(Box::new(self), Box::new(rhs)) }

  pub fn le(self, rhs: Expr) -> Expr { Expr::Le(Box::new(self), Box::new(rhs)) }

  pub fn equals(self, rhs: Expr) -> Expr { Expr::Eq(Box::new(self), Box::new(rhs)) }

  /// `max(self, 0)`.
  pub fn clip_zero(self) -> Expr { self.max(lit(0.0)) }

  pub fn eval<F>(&self, lookup: &F) -> Option<f64>
  where
    F: Fn(&str) -> Option<f64>,
  {
    let pair = |a: &Expr, b: &Expr| Some((a.eval(lookup)?, b.eval(lookup)?));
    match self {
      Self::Column(name) => lookup(name),
      Self::Const(v) => Some(*v),
      Self::Add(a, b) => pair(a, b).map(|(a, b)| a + b),
      Self::Sub(a, b) => pair(a, b).map(|(a, b)| a - b),
      Self::Mul(a, b) => pair(a, b).map(|(a, b)| a * b),
      Self::SafeDiv(a, b) => match b.eval(lookup)? {
        d if d == 0.0 => Some(0.0),
        d => a.eval(lookup).map(|n| n / d),
      },
      Self::Min(a, b) => pair(a, b).map(|(a, b)| a.min(b)),
      Self::Max(a, b) => pair(a, b).map(|(a, b)| a.max(b)),
      Self::Le(a, b) => pair(a, b).map(|(a, b)| if a <= b { 1.0 } else { 0.0 }),
      Self::Eq(a, b) => pair(a, b).map(|(a, b)| if a == b { 1.0 } else { 0.0 }),
      Self::If { cond, then, otherwise } => {
        if cond.eval(lookup)? != 0.0 {
          then.eval(lookup)
        } else {
          otherwise.eval(lookup)
        }
      }
    }
  }

  /// Every column name referenced by this expression, in first-seen order.
  pub fn columns(&self) -> Vec<&str> {
    let mut out = Vec::new();
    self.collect_columns(&mut out);
    out
  }

  fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
    match self {
      Self::Column(name) => {
        if !out.contains(&name.as_str()) {
          out.push(name);
        }
      }
      Self::Const(_) => {}
      Self::Add(a, b)
      | Self::Sub(a, b)
      | Self::Mul(a, b)
      | Self::SafeDiv(a, b)
      | Self::Min(a, b)
      | Self::Max(a, b)
      | Self::Le(a, b)
      | Self::Eq(a, b) => {
        a.collect_columns(out);
        b.collect_columns(out);
      }
      Self::If { cond, then, otherwise } => {
        cond.collect_columns(out);
        then.collect_columns(out);
        otherwise.collect_columns(out);
      }
    }
  }
}

impl ops::Add for Expr {
  type Output = Expr;

  fn add(self, rhs: Expr) -> Expr { Expr::Add(Box::new(self), Box::new(rhs)) }
}

impl ops::Sub for Expr {
  type Output = Expr;

  fn sub(self, rhs: Expr) -> Expr { Expr::Sub(Box::new(self), Box::new(rhs)) }
}

impl ops::Mul for Expr {
  type Output = Expr;

  fn mul(self, rhs: Expr) -> Expr { Expr::Mul(Box::new(self), Box::new(rhs)) }
}
