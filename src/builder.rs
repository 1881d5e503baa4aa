//! The sports tournament scheduling model.

use crate::model::{Cmp, Lit, Model, Objective, Var};
use crate::params::*;
use crate::symmetry;
use log::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectiveKind {
    /// Any schedule satisfying the constraints.
    Satisfy,
    /// Minimise the total number of breaks.
    MinimizeBreaks,
}

impl ObjectiveKind {
    pub fn is_optimization(self) -> bool { self == ObjectiveKind::MinimizeBreaks }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelOptions {
    pub objective :ObjectiveKind,
    pub symmetry_breaking :bool,
}

/// Index grids of the decision variables.
///
///  * `opp(w,t,j)`: team `t` plays team `j` in week `w` (`t != j`).
///  * `home(w,t)`: team `t` plays at home in week `w`.
///  * `per(w,t,p)`: team `t` plays in period `p` in week `w`.
///  * `brk(w,t)`: team `t` has the same home status in weeks `w-1` and `w` (`w > 0`).
#[derive(Debug, Clone)]
pub struct Decisions {
    params :TournamentParameters,
    opp :Vec<Var>,
    home :Vec<Var>,
    per :Vec<Var>,
    brk :Vec<Var>,
}

impl Decisions {
    fn alloc(model :&mut Model, params :TournamentParameters) -> Self {
        let (n, p) = (params.teams(), params.periods());
        let mut opp = Vec::with_capacity(params.weeks() * n * (n - 1));
        let mut home = Vec::with_capacity(params.weeks() * n);
        let mut per = Vec::with_capacity(params.weeks() * n * p);
        let mut brk = Vec::with_capacity(params.weeks().saturating_sub(1) * n);

        for w in params.week_ids() {
            for t in params.team_ids() {
                for j in params.team_ids().filter(|j| *j != t) {
                    opp.push(model.new_var(format!("opp_{}_{}_{}", w, t, j)));
                }
                home.push(model.new_var(format!("home_{}_{}", w, t)));
                for period in params.period_ids() {
                    per.push(model.new_var(format!("per_{}_{}_{}", w, t, period)));
                }
            }
        }
        for w in params.week_ids().skip(1) {
            for t in params.team_ids() {
                brk.push(model.new_var(format!("brk_{}_{}", w, t)));
            }
        }

        Decisions { params, opp, home, per, brk }
    }

    pub fn params(&self) -> TournamentParameters { self.params }

    pub fn opp(&self, w :WeekId, t :TeamId, j :TeamId) -> Var {
        let n = self.params.teams();
        assert!(t != j && t < n && j < n && w < self.params.weeks());
        let col = if j < t { j } else { j - 1 };
        self.opp[(w * n + t) * (n - 1) + col]
    }

    pub fn home(&self, w :WeekId, t :TeamId) -> Var {
        assert!(t < self.params.teams() && w < self.params.weeks());
        self.home[w * self.params.teams() + t]
    }

    pub fn per(&self, w :WeekId, t :TeamId, p :PeriodId) -> Var {
        let (n, np) = (self.params.teams(), self.params.periods());
        assert!(t < n && p < np && w < self.params.weeks());
        self.per[(w * n + t) * np + p]
    }

    pub fn brk(&self, w :WeekId, t :TeamId) -> Var {
        assert!(w > 0 && w < self.params.weeks() && t < self.params.teams());
        self.brk[(w - 1) * self.params.teams() + t]
    }

    /// Opponent literals of team `t` in week `w`, in increasing opponent order.
    pub fn opponents(&self, w :WeekId, t :TeamId) -> Vec<Lit> {
        self.params.team_ids().filter(|j| *j != t).map(|j| Lit::pos(self.opp(w, t, j))).collect()
    }

    pub fn breaks(&self) -> Vec<Lit> {
        self.brk.iter().copied().map(Lit::pos).collect()
    }
}

/// A built model together with its decision variable grids.
#[derive(Debug, Clone)]
pub struct StsModel {
    pub params :TournamentParameters,
    pub options :ModelOptions,
    pub model :Model,
    pub decisions :Decisions,
}

pub fn build(params :TournamentParameters, options :ModelOptions) -> StsModel {
    let mut model = Model::new();
    let d = Decisions::alloc(&mut model, params);

    encode_round_robin(&mut model, &d);
    encode_periods(&mut model, &d);
    encode_home_away(&mut model, &d);

    if options.objective == ObjectiveKind::MinimizeBreaks {
        encode_breaks(&mut model, &d);
    }
    if options.symmetry_breaking {
        symmetry::anchor_first_match(&mut model, &d);
        symmetry::order_weeks(&mut model, &d);
    }

    info!("STS model {} ({:?}) has {} vars {} constraints",
          params, options, model.num_vars(), model.constraints().len());

    StsModel { params, options, model, decisions: d }
}

fn encode_round_robin(model :&mut Model, d :&Decisions) {
    let params = d.params();

    // Every team has exactly one opponent each week.
    for w in params.week_ids() {
        for t in params.team_ids() {
            model.add_exactly_one(d.opponents(w, t));
        }
    }

    // The opponent relation is symmetric.
    for w in params.week_ids() {
        for i in params.team_ids() {
            for j in params.team_ids().filter(|j| *j != i) {
                model.add_clause(vec![Lit::neg(d.opp(w, i, j)), Lit::pos(d.opp(w, j, i))]);
            }
        }
    }

    // Every pair meets in exactly one week.
    for i in params.team_ids() {
        for j in params.team_ids().filter(|j| *j > i) {
            model.add_exactly_one(params.week_ids().map(|w| Lit::pos(d.opp(w, i, j))));
        }
    }
}

fn encode_periods(model :&mut Model, d :&Decisions) {
    let params = d.params();

    for w in params.week_ids() {
        for t in params.team_ids() {
            model.add_exactly_one(params.period_ids().map(|p| Lit::pos(d.per(w, t, p))));
        }
        for p in params.period_ids() {
            model.add_count(params.team_ids().map(|t| Lit::pos(d.per(w, t, p))), Cmp::Eq, 2);
        }
    }

    // Opponents share the period of their match.
    for w in params.week_ids() {
        for i in params.team_ids() {
            for j in params.team_ids().filter(|j| *j > i) {
                let m = d.opp(w, i, j);
                for p in params.period_ids() {
                    model.add_clause(vec![Lit::neg(m), Lit::neg(d.per(w, i, p)), Lit::pos(d.per(w, j, p))]);
                    model.add_clause(vec![Lit::neg(m), Lit::neg(d.per(w, j, p)), Lit::pos(d.per(w, i, p))]);
                }
            }
        }
    }

    // At most twice in the same period over the tournament.
    for t in params.team_ids() {
        for p in params.period_ids() {
            model.add_count(params.week_ids().map(|w| Lit::pos(d.per(w, t, p))), Cmp::Le, 2);
        }
    }
}

fn encode_home_away(model :&mut Model, d :&Decisions) {
    let params = d.params();
    for w in params.week_ids() {
        for i in params.team_ids() {
            for j in params.team_ids().filter(|j| *j > i) {
                let m = Lit::neg(d.opp(w, i, j));
                let (hi, hj) = (d.home(w, i), d.home(w, j));
                model.add_clause(vec![m, Lit::pos(hi), Lit::pos(hj)]);
                model.add_clause(vec![m, Lit::neg(hi), Lit::neg(hj)]);
            }
        }
    }
}

fn encode_breaks(model :&mut Model, d :&Decisions) {
    let params = d.params();
    for w in params.week_ids().skip(1) {
        for t in params.team_ids() {
            let b = d.brk(w, t);
            let (h1, h2) = (d.home(w - 1, t), d.home(w, t));
            // b <-> (h1 <-> h2)
            model.add_clause(vec![Lit::neg(b), Lit::neg(h1), Lit::pos(h2)]);
            model.add_clause(vec![Lit::neg(b), Lit::pos(h1), Lit::neg(h2)]);
            model.add_clause(vec![Lit::pos(b), Lit::pos(h1), Lit::pos(h2)]);
            model.add_clause(vec![Lit::pos(b), Lit::neg(h1), Lit::neg(h2)]);
        }
    }

    model.set_objective(Objective {
        lits: d.breaks(),
        lower: params.break_lower_bound(),
        upper: params.break_upper_bound(),
    });
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schedule::tests::schedule6;

    /// Boolean assignment of the model variables that encodes `schedule`.
    pub(crate) fn values_for(sts :&StsModel, grid :&[Vec<(TeamId, TeamId)>]) -> Vec<bool> {
        let d = &sts.decisions;
        let mut values = vec![false; sts.model.num_vars()];
        for (p, row) in grid.iter().enumerate() {
            for (w, (h, a)) in row.iter().copied().enumerate() {
                values[d.opp(w, h, a).index()] = true;
                values[d.opp(w, a, h).index()] = true;
                values[d.home(w, h).index()] = true;
                values[d.per(w, h, p).index()] = true;
                values[d.per(w, a, p).index()] = true;
            }
        }
        if sts.options.objective == ObjectiveKind::MinimizeBreaks {
            for w in sts.params.week_ids().skip(1) {
                for t in sts.params.team_ids() {
                    values[d.brk(w, t).index()] = values[d.home(w, t).index()] == values[d.home(w - 1, t).index()];
                }
            }
        }
        values
    }

    fn options(objective :ObjectiveKind, symmetry_breaking :bool) -> ModelOptions {
        ModelOptions { objective, symmetry_breaking }
    }

    #[test]
    fn grid_indexing_is_a_bijection() {
        let params = TournamentParameters::new(6).unwrap();
        let sts = build(params, options(ObjectiveKind::MinimizeBreaks, false));
        let d = &sts.decisions;
        let mut seen = std::collections::HashSet::new();
        for w in params.week_ids() {
            for t in params.team_ids() {
                for j in params.team_ids().filter(|j| *j != t) {
                    assert!(seen.insert(d.opp(w, t, j)));
                    assert_eq!(sts.model.name(d.opp(w, t, j)), format!("opp_{}_{}_{}", w, t, j));
                }
                assert!(seen.insert(d.home(w, t)));
                for p in params.period_ids() {
                    assert!(seen.insert(d.per(w, t, p)));
                }
                if w > 0 {
                    assert!(seen.insert(d.brk(w, t)));
                }
            }
        }
        assert_eq!(seen.len(), sts.model.num_vars());
    }

    #[test]
    fn known_schedule_satisfies_the_model() {
        let params = TournamentParameters::new(6).unwrap();
        for objective in vec![ObjectiveKind::Satisfy, ObjectiveKind::MinimizeBreaks] {
            let sts = build(params, options(objective, false));
            let values = values_for(&sts, &schedule6());
            assert!(sts.model.holds(&values), "{:?}", objective);
            if let Some(o) = sts.model.objective() {
                assert_eq!(o.value(&values), 4);
            }
        }
    }

    #[test]
    fn violations_are_rejected() {
        let params = TournamentParameters::new(6).unwrap();
        let sts = build(params, options(ObjectiveKind::Satisfy, false));
        let d = &sts.decisions;

        // Flip the home flag of one team.
        let mut values = values_for(&sts, &schedule6());
        let h = d.home(0, 5).index();
        values[h] = !values[h];
        assert!(!sts.model.holds(&values));

        // Move one team to a different period without its opponent.
        let mut values = values_for(&sts, &schedule6());
        values[d.per(0, 5, 0).index()] = false;
        values[d.per(0, 5, 1).index()] = true;
        assert!(!sts.model.holds(&values));
    }

    #[test]
    fn objective_bounds() {
        let params = TournamentParameters::new(8).unwrap();
        let sts = build(params, options(ObjectiveKind::MinimizeBreaks, false));
        let o = sts.model.objective().unwrap();
        assert_eq!(o.lits.len(), 8 * 6);
        assert_eq!(o.lower, 6);
        assert_eq!(o.upper, 42);

        let sts = build(params, options(ObjectiveKind::Satisfy, false));
        assert!(sts.model.objective().is_none());
    }
}
