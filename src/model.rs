//! Solver-independent representation of a boolean constraint model.
//!
//! Variables are allocated in an arena and referred to by index. Every
//! backend consumes the same [`Model`]: the SAT backend lowers it to CNF,
//! the MIP backend writes it out as linear rows.

use std::collections::HashMap;
use std::ops::Not;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl Var {
    pub fn index(self) -> usize { self.0 as usize }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit {
    var :Var,
    positive :bool,
}

impl Lit {
    pub fn pos(var :Var) -> Lit { Lit { var, positive: true } }
    pub fn neg(var :Var) -> Lit { Lit { var, positive: false } }
    pub fn var(self) -> Var { self.var }
    pub fn is_positive(self) -> bool { self.positive }

    pub fn eval(self, values :&[bool]) -> bool {
        values[self.var.index()] == self.positive
    }
}

impl Not for Lit {
    type Output = Lit;
    fn not(self) -> Lit { Lit { var: self.var, positive: !self.positive } }
}

impl From<Var> for Lit {
    fn from(var :Var) -> Lit { Lit::pos(var) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cmp {
    Le,
    Eq,
    Ge,
}

impl Cmp {
    pub fn holds(self, lhs :u32, rhs :u32) -> bool {
        match self {
            Cmp::Le => lhs <= rhs,
            Cmp::Eq => lhs == rhs,
            Cmp::Ge => lhs >= rhs,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Cmp::Le => "<=",
            Cmp::Eq => "=",
            Cmp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// At least one of the literals holds.
    Clause(Vec<Lit>),
    /// Exactly one of the literals holds.
    ExactlyOne(Vec<Lit>),
    /// The number of true literals compared against a constant.
    Count { lits :Vec<Lit>, cmp :Cmp, rhs :u32 },
}

impl Constraint {
    pub fn holds(&self, values :&[bool]) -> bool {
        match self {
            Constraint::Clause(lits) => lits.iter().any(|l| l.eval(values)),
            Constraint::ExactlyOne(lits) => count_true(lits, values) == 1,
            Constraint::Count { lits, cmp, rhs } => cmp.holds(count_true(lits, values), *rhs),
        }
    }
}

pub fn count_true(lits :&[Lit], values :&[bool]) -> u32 {
    lits.iter().filter(|l| l.eval(values)).count() as u32
}

/// Minimise the number of true literals, which must lie within `lower..=upper`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    pub lits :Vec<Lit>,
    pub lower :u32,
    pub upper :u32,
}

impl Objective {
    pub fn value(&self, values :&[bool]) -> u32 {
        count_true(&self.lits, values)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    names :Vec<String>,
    constraints :Vec<Constraint>,
    objective :Option<Objective>,
}

impl Model {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn new_var(&mut self, name :impl Into<String>) -> Var {
        let var = Var(self.names.len() as u32);
        self.names.push(name.into());
        var
    }

    /// The same variables with no constraints and no objective.
    pub fn variables_only(&self) -> Model {
        Model { names: self.names.clone(), ..Default::default() }
    }

    pub fn num_vars(&self) -> usize { self.names.len() }

    pub fn name(&self, var :Var) -> &str { &self.names[var.index()] }

    pub fn vars(&self) -> impl Iterator<Item = Var> {
        (0..self.names.len() as u32).map(Var)
    }

    pub fn var_by_name(&self) -> HashMap<&str, Var> {
        self.vars().map(|v| (self.name(v), v)).collect()
    }

    pub fn add(&mut self, constraint :Constraint) {
        self.constraints.push(constraint);
    }

    pub fn add_clause(&mut self, lits :impl IntoIterator<Item = Lit>) {
        self.add(Constraint::Clause(lits.into_iter().collect()));
    }

    pub fn add_exactly_one(&mut self, lits :impl IntoIterator<Item = Lit>) {
        self.add(Constraint::ExactlyOne(lits.into_iter().collect()));
    }

    pub fn add_count(&mut self, lits :impl IntoIterator<Item = Lit>, cmp :Cmp, rhs :u32) {
        self.add(Constraint::Count { lits: lits.into_iter().collect(), cmp, rhs });
    }

    pub fn constraints(&self) -> &[Constraint] { &self.constraints }

    pub fn set_objective(&mut self, objective :Objective) {
        self.objective = Some(objective);
    }

    pub fn objective(&self) -> Option<&Objective> { self.objective.as_ref() }

    /// Check a full assignment against every constraint and the objective bounds.
    pub fn holds(&self, values :&[bool]) -> bool {
        assert!(values.len() == self.num_vars());
        self.constraints.iter().all(|c| c.holds(values))
            && self.objective.iter().all(|o| {
                let v = o.value(values);
                o.lower <= v && v <= o.upper
            })
    }
}
