//! Iterative constraint solver.
//!
//! One [`Solver::step`] runs the full sweep:
//! 1. reset every body's accumulators
//! 2. calculate every constraint (parallel when enabled)
//! 3. apply every constraint (serial, so accumulation needs no locking)
//! 4. integrate bodies by their weighted-average corrections
//! 5. report the energy computed in step 2
//!
//! Bodies and constraints can only be changed between steps; both
//! collections are borrowed mutably for the duration of a step.

use std::ops::Range;

use glam::DVec3;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use slur_config::SolverConfig;
use tracing::{debug, trace};

use crate::body::Body;
use crate::constraint::{Constraint, Energy};
use crate::error::DynamicsError;

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Aggregate linear energy measured before the bodies moved
    pub linear: f64,
    /// Aggregate angular energy measured before the bodies moved
    pub angular: f64,
    /// Number of steps taken so far, this one included
    pub iteration: usize,
}

impl StepReport {
    pub fn energy(&self) -> Energy {
        Energy {
            linear: self.linear,
            angular: self.angular,
        }
    }
}

/// Outcome of [`Solver::solve`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub iterations: usize,
    /// Energy of the last step taken
    pub energy: Energy,
    /// Whether the energy reached the tolerance before the iteration cap
    pub converged: bool,
}

#[derive(Debug, Default)]
pub struct Solver {
    bodies: Vec<Body>,
    constraints: Vec<Box<dyn Constraint>>,
    config: SolverConfig,
    iteration: usize,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            bodies: Vec::new(),
            constraints: Vec::new(),
            config,
            iteration: 0,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    /// Steps taken since construction
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    // ========================================================================
    // Bodies
    // ========================================================================

    /// Add a body, returning its index
    pub fn add_body(&mut self, body: impl Into<Body>) -> usize {
        self.bodies.push(body.into());
        self.bodies.len() - 1
    }

    /// Add several bodies, returning their index range
    pub fn add_bodies<B: Into<Body>>(&mut self, bodies: impl IntoIterator<Item = B>) -> Range<usize> {
        let start = self.bodies.len();
        self.bodies.extend(bodies.into_iter().map(Into::into));
        start..self.bodies.len()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    /// Body by index (panics when out of range)
    pub fn body(&self, index: usize) -> &Body {
        &self.bodies[index]
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Current body positions, index-aligned with the bodies
    pub fn positions(&self) -> Vec<DVec3> {
        self.bodies.iter().map(Body::current_position).collect()
    }

    /// Remove every body, and with them every constraint
    pub fn clear_bodies(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    /// Add a constraint after checking its indices against the body count.
    ///
    /// Returns the constraint's position in the list.
    pub fn add_constraint<C: Constraint + 'static>(&mut self, constraint: C) -> Result<usize, DynamicsError> {
        self.add_boxed_constraint(Box::new(constraint))
    }

    pub fn add_boxed_constraint(&mut self, constraint: Box<dyn Constraint>) -> Result<usize, DynamicsError> {
        let count = self.bodies.len();
        if let Some(index) = constraint.indices().into_iter().find(|&i| i >= count) {
            return Err(DynamicsError::BodyOutOfRange { index, count });
        }
        self.constraints.push(constraint);
        Ok(self.constraints.len() - 1)
    }

    pub fn constraints(&self) -> &[Box<dyn Constraint>] {
        &self.constraints
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Remove and return a constraint (panics when out of range)
    pub fn remove_constraint(&mut self, index: usize) -> Box<dyn Constraint> {
        self.constraints.remove(index)
    }

    pub fn retain_constraints(&mut self, mut keep: impl FnMut(&dyn Constraint) -> bool) {
        self.constraints.retain(|c| keep(c.as_ref()));
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    /// Renumber bodies through an old -> new map.
    ///
    /// `map[old]` is the new index of body `old`, or `None` to remove it.
    /// Retained bodies must map onto `0..retained` without collisions.
    /// Constraints are reindexed; those touching a removed body, or that
    /// reject their new indices, are dropped. Returns how many were dropped.
    pub fn remap_body_indices(&mut self, map: &[Option<usize>]) -> usize {
        assert_eq!(
            map.len(),
            self.bodies.len(),
            "body map must be index-aligned with the bodies"
        );

        let retained = map.iter().flatten().count();
        let mut slots: Vec<Option<Body>> = vec![None; retained];
        for (old, body) in self.bodies.drain(..).enumerate() {
            if let Some(new) = map[old] {
                assert!(
                    new < retained,
                    "body {} maps to {}, but only {} bodies are retained",
                    old,
                    new,
                    retained
                );
                assert!(slots[new].is_none(), "two bodies map to index {}", new);
                slots[new] = Some(body);
            }
        }
        self.bodies = slots.into_iter().flatten().collect();

        let before = self.constraints.len();
        self.constraints.retain_mut(|constraint| {
            let remapped: Option<Vec<usize>> =
                constraint.indices().into_iter().map(|i| map[i]).collect();
            match remapped {
                Some(indices) => constraint.set_indices(&indices).is_ok(),
                None => false,
            }
        });

        let dropped = before - self.constraints.len();
        debug!(
            "remap_body_indices: {} bodies retained, {} constraints dropped",
            retained, dropped
        );
        dropped
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Run one Calculate / Apply / Integrate sweep.
    ///
    /// The reported energy is the tension measured by this step's Calculate
    /// phase, before any body moved. Use [`Solver::measure_energy`] to read
    /// the residual afterwards.
    pub fn step(&mut self) -> StepReport {
        let rotate = self.constraints.iter().any(|c| c.affects_rotation());

        for body in &mut self.bodies {
            body.reset_delta();
        }

        self.calculate_all();

        for constraint in &self.constraints {
            constraint.apply(&mut self.bodies);
        }

        self.integrate_all(rotate);

        let energy: Energy = self.constraints.iter().map(|c| c.energy()).sum();
        self.iteration += 1;

        trace!(
            "step {}: linear={:.3e} angular={:.3e}",
            self.iteration, energy.linear, energy.angular
        );

        StepReport {
            linear: energy.linear,
            angular: energy.angular,
            iteration: self.iteration,
        }
    }

    /// Aggregate energy of the current configuration without moving anything
    pub fn measure_energy(&mut self) -> Energy {
        self.calculate_all();
        self.constraints.iter().map(|c| c.energy()).sum()
    }

    /// Step until the energy reaches the configured tolerance or the
    /// iteration cap is hit. Not converging is reported, never an error.
    pub fn solve(&mut self) -> SolveReport {
        self.solve_with_limit(self.config.max_iterations)
    }

    /// [`Solver::solve`] with an explicit iteration cap
    pub fn solve_with_limit(&mut self, max_iterations: usize) -> SolveReport {
        let mut report = SolveReport {
            iterations: 0,
            energy: Energy::ZERO,
            converged: false,
        };

        while report.iterations < max_iterations {
            let step = self.step();
            report.iterations += 1;
            report.energy = step.energy();
            if report.energy.total() <= self.config.tolerance {
                report.converged = true;
                break;
            }
        }

        debug!(
            "solve: {} iterations, energy={:.3e}, converged={}",
            report.iterations,
            report.energy.total(),
            report.converged
        );
        report
    }

    fn calculate_all(&mut self) {
        let bodies = &self.bodies;

        #[cfg(feature = "parallel")]
        {
            if self.config.parallel {
                self.constraints
                    .par_iter_mut()
                    .for_each(|constraint| constraint.calculate(bodies));
                return;
            }
        }

        for constraint in &mut self.constraints {
            constraint.calculate(bodies);
        }
    }

    fn integrate_all(&mut self, rotate: bool) {
        #[cfg(feature = "parallel")]
        {
            if self.config.parallel {
                self.bodies
                    .par_iter_mut()
                    .for_each(|body| body.integrate(rotate));
                return;
            }
        }

        for body in &mut self.bodies {
            body.integrate(rotate);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use glam::DQuat;

    use super::*;
    use crate::constraint::{AlignRotation, Distance, OnPlane, OnTarget};

    fn plane_z(index: usize) -> OnPlane {
        OnPlane::new(index, DVec3::ZERO, DVec3::Z, 1.0).unwrap()
    }

    fn three_body_solver(config: SolverConfig) -> Solver {
        let mut solver = Solver::new(config);
        solver.add_bodies([
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 5.0),
            DVec3::new(2.0, 0.0, -5.0),
        ]);
        for i in 0..3 {
            solver.add_constraint(plane_z(i)).unwrap();
        }
        solver
    }

    #[test]
    fn test_three_bodies_onto_plane() {
        for parallel in [false, true] {
            let mut solver = three_body_solver(SolverConfig::default().with_parallel(parallel));

            let report = solver.step();

            assert_eq!(report.linear, 10.0);
            assert_eq!(report.angular, 0.0);
            assert_eq!(report.iteration, 1);
            assert_eq!(solver.body(0).current_position(), DVec3::ZERO);
            assert_eq!(solver.body(1).current_position(), DVec3::new(1.0, 0.0, 0.0));
            assert_eq!(solver.body(2).current_position(), DVec3::new(2.0, 0.0, 0.0));
            assert_eq!(solver.measure_energy(), Energy::ZERO);
        }
    }

    #[test]
    fn test_weighted_average_not_sum() {
        let mut solver = Solver::new(SolverConfig::default());
        solver.add_body(DVec3::ZERO);
        solver
            .add_constraint(OnTarget::new(0, DVec3::new(2.0, 0.0, 0.0), 1.0).unwrap())
            .unwrap();
        solver
            .add_constraint(OnTarget::new(0, DVec3::new(0.0, 2.0, 0.0), 1.0).unwrap())
            .unwrap();

        solver.step();

        assert!((solver.body(0).current_position() - DVec3::new(1.0, 1.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_untouched_body_stays() {
        let mut solver = Solver::new(SolverConfig::default());
        solver.add_bodies([DVec3::new(0.0, 0.0, 3.0), DVec3::new(5.0, 5.0, 5.0)]);
        solver.add_constraint(plane_z(0)).unwrap();

        solver.step();

        assert_eq!(solver.body(1).current_position(), DVec3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_solve_converges_and_reports() {
        let mut solver = Solver::new(SolverConfig::default().with_tolerance(1e-9));
        solver.add_bodies([DVec3::ZERO, DVec3::new(3.0, 0.0, 0.0)]);
        solver.add_constraint(Distance::new(0, 1, 1.0, 1.0).unwrap()).unwrap();

        let report = solver.solve();

        assert!(report.converged);
        assert!(report.iterations <= 3);
        let p = solver.positions();
        assert!(((p[1] - p[0]).length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_convergence_is_reported() {
        // Two anchors at different points never agree
        let config = SolverConfig::default().with_max_iterations(5);
        let mut solver = Solver::new(config);
        solver.add_body(DVec3::ZERO);
        solver.add_constraint(OnTarget::new(0, DVec3::X, 1.0).unwrap()).unwrap();
        solver.add_constraint(OnTarget::new(0, -DVec3::X, 1.0).unwrap()).unwrap();

        let report = solver.solve();

        assert!(!report.converged);
        assert_eq!(report.iterations, 5);
        assert!((report.energy.linear - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_add_constraint_checks_indices() {
        let mut solver = Solver::new(SolverConfig::default());
        solver.add_body(DVec3::ZERO);

        let err = solver.add_constraint(plane_z(3)).unwrap_err();

        assert_eq!(err, DynamicsError::BodyOutOfRange { index: 3, count: 1 });
        assert_eq!(solver.constraint_count(), 0);
    }

    #[test]
    fn test_rotation_only_integrates_when_needed() {
        let mut solver = Solver::new(SolverConfig::default());
        solver.add_body(Body::with_rotation(DVec3::new(0.0, 0.0, 1.0), DQuat::IDENTITY));
        solver.add_constraint(plane_z(0)).unwrap();
        solver.bodies_mut()[0]
            .rotation
            .as_mut()
            .unwrap()
            .add_delta(DVec3::Z, 1.0);

        // Accumulators are reset at the start of the step
        solver.step();
        assert_eq!(solver.body(0).current_rotation(), DQuat::IDENTITY);

        let target = DQuat::from_rotation_y(FRAC_PI_2);
        solver.add_constraint(AlignRotation::new(0, target, 1.0).unwrap()).unwrap();
        let report = solver.step();

        assert!((report.angular - FRAC_PI_2).abs() < 1e-12);
        assert!(solver.body(0).current_rotation().angle_between(target) < 1e-9);
    }

    #[test]
    fn test_remap_body_indices() {
        let mut solver = three_body_solver(SolverConfig::default());
        solver.add_constraint(Distance::new(0, 2, 1.0, 1.0).unwrap()).unwrap();

        // Drop body 1, swap the others
        let dropped = solver.remap_body_indices(&[Some(1), None, Some(0)]);

        assert_eq!(dropped, 1);
        assert_eq!(solver.body_count(), 2);
        assert_eq!(solver.body(0).current_position(), DVec3::new(2.0, 0.0, -5.0));
        let indices: Vec<Vec<usize>> = solver.constraints().iter().map(|c| c.indices()).collect();
        assert_eq!(indices, vec![vec![1], vec![0], vec![1, 0]]);
    }

    #[test]
    #[should_panic(expected = "only 2 bodies are retained")]
    fn test_remap_rejects_index_past_retained() {
        let mut solver = three_body_solver(SolverConfig::default());
        solver.remap_body_indices(&[Some(0), None, Some(2)]);
    }

    #[test]
    fn test_collection_operations() {
        let mut solver = three_body_solver(SolverConfig::default());

        let removed = solver.remove_constraint(1);
        assert_eq!(removed.indices(), vec![1]);
        solver.retain_constraints(|c| c.indices() != vec![2]);
        assert_eq!(solver.constraint_count(), 1);

        solver.clear_constraints();
        assert_eq!(solver.step().linear, 0.0);

        solver.clear_bodies();
        assert_eq!(solver.body_count(), 0);
    }
}
