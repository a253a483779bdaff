use crate::cli::SelftestArgs;
use crate::error::{CliError, Result};
use nalgebra::{Point3, Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, UnitSphere};
use rnascore::{
    ChainSet, EnsemblePolicy, PointSet, ScoreError, ScoringConfig, score, score_detailed,
    score_ensemble, score_multichain,
};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Mean C1'-C1' distance between consecutive nucleotides.
const STEP_LENGTH: f64 = 5.9;
/// d0 is floored for short structures, so the similarity thresholds are checked at a
/// length where it is not.
const REFERENCE_LENGTH: usize = 100;
const RANDOM_PAIRS: usize = 5;
const RANDOM_CEILING: f64 = 0.3;
const PERTURBATION_SIGMA: f64 = 0.5;
const PERTURBED_FLOOR: f64 = 0.8;
const SHORT_LENGTH: usize = 10;
const TOLERANCE: f64 = 1e-6;

type CheckResult = std::result::Result<String, String>;

struct CheckOutcome {
    name: &'static str,
    result: CheckResult,
}

struct Checker {
    rng: StdRng,
    length: usize,
    config: ScoringConfig,
}

pub fn run(args: SelftestArgs) -> Result<()> {
    if args.length < 3 {
        return Err(CliError::Argument(format!(
            "Self-test length must be at least 3, got {}.",
            args.length
        )));
    }

    println!(
        "Running scoring self-test (seed {}, length {})...",
        args.seed, args.length
    );
    let outcomes = run_checks(args.seed, args.length);

    let mut failed = Vec::new();
    for outcome in &outcomes {
        match &outcome.result {
            Ok(detail) => println!("  ✓ {:<32} {}", outcome.name, detail),
            Err(reason) => {
                println!("  ✗ {:<32} {}", outcome.name, reason);
                failed.push(outcome.name);
            }
        }
    }

    if failed.is_empty() {
        println!("✓ All {} checks passed.", outcomes.len());
        Ok(())
    } else {
        Err(CliError::SelfTest(format!(
            "{} of {} checks failed: {}",
            failed.len(),
            outcomes.len(),
            failed.join(", ")
        )))
    }
}

fn run_checks(seed: u64, length: usize) -> Vec<CheckOutcome> {
    let mut checker = Checker {
        rng: StdRng::seed_from_u64(seed),
        length,
        config: ScoringConfig::default(),
    };

    let checks: [(&'static str, fn(&mut Checker) -> CheckResult); 11] = [
        ("identity", Checker::identity),
        ("translation invariance", Checker::translation),
        ("rotation invariance", Checker::rotation),
        ("rigid motion invariance", Checker::rigid_motion),
        ("unrelated structures score low", Checker::random_pairs),
        ("small perturbation scores high", Checker::perturbation),
        ("length mismatch is rejected", Checker::length_mismatch),
        ("short structures use d0 floor", Checker::short_structure),
        ("mirror image gives a rotation", Checker::planar_mirror),
        ("best-of-5 ignores order", Checker::best_of_five),
        ("extra chains stay unassigned", Checker::multichain),
    ];

    checks
        .into_iter()
        .map(|(name, check)| {
            let result = check(&mut checker);
            debug!(check = name, passed = result.is_ok(), "Self-test check finished.");
            CheckOutcome { name, result }
        })
        .collect()
}

fn expect_close(value: f64, expected: f64) -> CheckResult {
    if (value - expected).abs() < TOLERANCE {
        Ok(format!("TM-score {:.6}", value))
    } else {
        Err(format!("TM-score {:.6}, expected {:.6}", value, expected))
    }
}

fn scored(result: std::result::Result<f64, ScoreError>) -> std::result::Result<f64, String> {
    result.map_err(|e| e.to_string())
}

impl Checker {
    fn random_walk(&mut self, n: usize) -> PointSet {
        let mut current = Point3::origin();
        (0..n)
            .map(|_| {
                let [x, y, z]: [f64; 3] = UnitSphere.sample(&mut self.rng);
                current += Vector3::new(x, y, z) * STEP_LENGTH;
                current
            })
            .collect()
    }

    fn random_rotation(&mut self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(
            self.rng.gen_range(-PI..PI),
            self.rng.gen_range(-PI / 2.0..PI / 2.0),
            self.rng.gen_range(-PI..PI),
        )
    }

    fn random_translation(&mut self) -> Vector3<f64> {
        Vector3::new(
            self.rng.gen_range(-100.0..100.0),
            self.rng.gen_range(-100.0..100.0),
            self.rng.gen_range(-100.0..100.0),
        )
    }

    fn identity(&mut self) -> CheckResult {
        let structure = self.random_walk(self.length);
        expect_close(scored(score(&structure, &structure, &self.config))?, 1.0)
    }

    fn translation(&mut self) -> CheckResult {
        let structure = self.random_walk(self.length);
        let shift = self.random_translation();
        let moved: PointSet = structure.iter().map(|p| p + shift).collect();
        expect_close(scored(score(&moved, &structure, &self.config))?, 1.0)
    }

    fn rotation(&mut self) -> CheckResult {
        let structure = self.random_walk(self.length);
        let rotation = self.random_rotation();
        let turned: PointSet = structure.iter().map(|p| rotation * p).collect();
        expect_close(scored(score(&turned, &structure, &self.config))?, 1.0)
    }

    fn rigid_motion(&mut self) -> CheckResult {
        let structure = self.random_walk(self.length);
        let rotation = self.random_rotation();
        let shift = self.random_translation();
        let moved: PointSet = structure.iter().map(|p| rotation * p + shift).collect();
        expect_close(scored(score(&moved, &structure, &self.config))?, 1.0)
    }

    fn random_pairs(&mut self) -> CheckResult {
        let mut total = 0.0;
        for _ in 0..RANDOM_PAIRS {
            let a = self.random_walk(REFERENCE_LENGTH);
            let b = self.random_walk(REFERENCE_LENGTH);
            total += scored(score(&a, &b, &self.config))?;
        }
        let mean = total / RANDOM_PAIRS as f64;
        if mean < RANDOM_CEILING {
            Ok(format!("mean TM-score {:.4}", mean))
        } else {
            Err(format!(
                "mean TM-score {:.4} is not below {}",
                mean, RANDOM_CEILING
            ))
        }
    }

    fn perturbation(&mut self) -> CheckResult {
        let structure = self.random_walk(REFERENCE_LENGTH);
        let noise = Normal::new(0.0, PERTURBATION_SIGMA).map_err(|e| e.to_string())?;
        let perturbed: PointSet = structure
            .iter()
            .map(|p| {
                p + Vector3::new(
                    noise.sample(&mut self.rng),
                    noise.sample(&mut self.rng),
                    noise.sample(&mut self.rng),
                )
            })
            .collect();
        let tm = scored(score(&perturbed, &structure, &self.config))?;
        if tm > PERTURBED_FLOOR {
            Ok(format!("TM-score {:.4}", tm))
        } else {
            Err(format!("TM-score {:.4} is not above {}", tm, PERTURBED_FLOOR))
        }
    }

    fn length_mismatch(&mut self) -> CheckResult {
        let a = self.random_walk(self.length);
        let b = self.random_walk(self.length - 1);
        match score(&a, &b, &self.config) {
            Err(ScoreError::DimensionMismatch { .. }) => Ok("rejected".to_string()),
            Err(e) => Err(format!("unexpected error: {}", e)),
            Ok(tm) => Err(format!("scored {:.4} instead of failing", tm)),
        }
    }

    fn short_structure(&mut self) -> CheckResult {
        let structure = self.random_walk(SHORT_LENGTH);
        let report =
            score_detailed(&structure, &structure, &self.config).map_err(|e| e.to_string())?;
        if (report.d0 - self.config.d0_floor).abs() > TOLERANCE {
            return Err(format!(
                "d0 {:.4}, expected the floor {}",
                report.d0, self.config.d0_floor
            ));
        }
        expect_close(report.tm_score, 1.0)
    }

    /// A planar structure and its mirror image are related by a proper rotation, so the
    /// fit must be exact without ever producing a reflection.
    fn planar_mirror(&mut self) -> CheckResult {
        let planar: PointSet = self
            .random_walk(self.length)
            .into_iter()
            .map(|p| Point3::new(p.x, p.y, 0.0))
            .collect();
        let mirrored: PointSet = planar.iter().map(|p| Point3::new(p.x, -p.y, 0.0)).collect();

        let report =
            score_detailed(&mirrored, &planar, &self.config).map_err(|e| e.to_string())?;
        let determinant = report.alignment.rotation.matrix().determinant();
        if (determinant - 1.0).abs() > TOLERANCE {
            return Err(format!("rotation determinant {:.6}", determinant));
        }
        expect_close(report.tm_score, 1.0)
    }

    fn best_of_five(&mut self) -> CheckResult {
        let reference = self.random_walk(REFERENCE_LENGTH);
        let mut candidates: Vec<PointSet> =
            (0..4).map(|_| self.random_walk(REFERENCE_LENGTH)).collect();
        candidates.insert(2, reference.clone());

        let forward = score_ensemble(&candidates, &reference, EnsemblePolicy::Best, &self.config)
            .map_err(|e| e.to_string())?;
        candidates.reverse();
        let backward = score_ensemble(&candidates, &reference, EnsemblePolicy::Best, &self.config)
            .map_err(|e| e.to_string())?;

        if (forward.tm_score - backward.tm_score).abs() > TOLERANCE {
            return Err(format!(
                "{:.6} forward, {:.6} reversed",
                forward.tm_score, backward.tm_score
            ));
        }
        expect_close(forward.tm_score, 1.0)
    }

    fn multichain(&mut self) -> CheckResult {
        let a = self.random_walk(self.length);
        let b = self.random_walk(self.length + 5);
        let c = self.random_walk(self.length + 11);

        let reference: ChainSet = [("A", a.clone()), ("B", b.clone())].into_iter().collect();
        let predicted: ChainSet = [("A", a), ("B", b), ("C", c)].into_iter().collect();

        let report =
            score_multichain(&predicted, &reference, &self.config).map_err(|e| e.to_string())?;
        if report.unassigned_predicted != ["C"] || !report.unassigned_reference.is_empty() {
            return Err(format!(
                "unassigned predicted {:?}, reference {:?}",
                report.unassigned_predicted, report.unassigned_reference
            ));
        }
        info!(matched = report.matched.len(), "Multi-chain check matched chains.");
        expect_close(report.tm_score, 1.0)
    }
}
