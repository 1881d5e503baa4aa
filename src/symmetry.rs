//! Symmetry breaking for the tournament model.
//!
//! Team labels, week order, the home/away orientation of every match and
//! period labels can all be permuted without changing whether a schedule is
//! valid or how many breaks it has. Relabel the opponents of team 0 so it
//! meets team `w+1` in week `w`, swap home and away globally so team 0 starts
//! at home, and permute periods so its first match is in period 0: every
//! class of equivalent schedules keeps at least one member.

use crate::builder::Decisions;
use crate::model::{Lit, Model};

/// Week 0 is team 0 at home against team 1, both in period 0.
pub fn anchor_first_match(model :&mut Model, d :&Decisions) {
    if d.params().weeks() == 0 {
        return;
    }
    model.add_clause(vec![Lit::pos(d.opp(0, 0, 1))]);
    model.add_clause(vec![Lit::pos(d.home(0, 0))]);
    model.add_clause(vec![Lit::pos(d.per(0, 0, 0))]);
    model.add_clause(vec![Lit::pos(d.per(0, 1, 0))]);
}

/// The opponents of team 0 are strictly increasing over the weeks.
pub fn order_weeks(model :&mut Model, d :&Decisions) {
    let params = d.params();
    for w in params.week_ids().skip(1) {
        for j in 1..params.teams() {
            // opp(w,0) = j forbids opp(w-1,0) >= j
            for x in j..params.teams() {
                model.add_clause(vec![Lit::neg(d.opp(w, 0, j)), Lit::neg(d.opp(w - 1, 0, x))]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::tests::values_for;
    use crate::builder::*;
    use crate::params::*;

    /// The n=6 reference schedule relabelled into the canonical form.
    fn canonical6() -> Vec<Vec<(TeamId, TeamId)>> {
        vec![
            vec![(0, 1), (2, 0), (4, 2), (5, 3), (1, 4)],
            vec![(5, 2), (3, 1), (1, 5), (4, 0), (3, 2)],
            vec![(4, 3), (5, 4), (0, 3), (2, 1), (0, 5)],
        ]
    }

    #[test]
    fn canonical_schedule_survives_symmetry_breaking() {
        let params = TournamentParameters::new(6).unwrap();
        let sts = build(params, ModelOptions { objective: ObjectiveKind::MinimizeBreaks, symmetry_breaking: true });
        let values = values_for(&sts, &canonical6());
        assert!(sts.model.holds(&values));
    }

    #[test]
    fn week_order_rejects_a_swapped_week() {
        let params = TournamentParameters::new(6).unwrap();
        let sts = build(params, ModelOptions { objective: ObjectiveKind::Satisfy, symmetry_breaking: true });
        let mut grid = canonical6();
        for row in grid.iter_mut() {
            row.swap(1, 2);
        }
        let values = values_for(&sts, &grid);
        assert!(!sts.model.holds(&values));

        let plain = build(params, ModelOptions { objective: ObjectiveKind::Satisfy, symmetry_breaking: false });
        assert!(plain.model.holds(&values_for(&plain, &grid)));
    }
}
