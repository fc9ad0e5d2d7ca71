//! Video pool subset command.
//!
//! Copies videos from the pool whose sizes form a geometric progression,
//! so consecutive files keep a constant relative size distance. When two
//! successive target sizes resolve to the same pool file it is copied only
//! once.

use std::io::Write;
use std::path::Path;

use measrig_core::VideoCatalog;

use crate::error::CliError;

/// The copy plan derived from the size bounds and step factor
struct SubsetPlan {
    count: usize,
    minsize: f64,
    factor: f64,
}

impl SubsetPlan {
    fn new(minsize: f64, maxsize: f64, factor: f64) -> Result<Self, CliError> {
        if minsize <= 0.0 || maxsize < minsize || factor <= 1.0 {
            return Err(CliError::Pool(format!(
                "need 0 < minsize <= maxsize and factor > 1, got {minsize}, {maxsize}, {factor}"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = ((maxsize / minsize).ln() / factor.ln() + 0.5) as usize;
        Ok(Self {
            count,
            minsize,
            factor,
        })
    }

    /// Target size of the `i`-th video
    fn target(&self, i: usize) -> f64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let exp = i as i32;
        self.minsize * self.factor.powi(exp)
    }

    /// Upper bound of the total copied bytes, assuming exact size matches
    fn total_bytes(&self) -> f64 {
        (0..self.count).map(|i| self.target(i)).sum()
    }
}

/// Subset command handler
pub fn cmd_subset(
    pool: &Path,
    dstdir: &Path,
    minsize: f64,
    maxsize: f64,
    factor: f64,
    yes: bool,
) -> Result<(), CliError> {
    let plan = SubsetPlan::new(minsize, maxsize, factor)?;

    println!(
        "{} videos between {:.0} and {:.0} bytes will be copied; each is {:.2}% bigger than the previous one.",
        plan.count,
        minsize,
        maxsize,
        (factor - 1.0) * 100.0
    );
    println!(
        "Total size approx. {:.3} GiB, located in {}.",
        plan.total_bytes() / f64::from(1 << 30),
        dstdir.display()
    );
    if !yes && !confirm()? {
        return Err(CliError::Aborted);
    }

    std::fs::create_dir_all(dstdir)?;
    let catalog = VideoCatalog::scan(pool).map_err(|e| CliError::Pool(e.to_string()))?;

    let mut previous = None;
    for i in 0..plan.count {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let target = plan.target(i) as u64;
        let entry = catalog.nearest(target);
        if previous.as_ref() == Some(&entry.path) {
            tracing::debug!(target, file = %entry.path.display(), "skipping duplicate");
        } else {
            let name = entry.path.file_name().ok_or_else(|| {
                CliError::Pool(format!("pool file {} has no name", entry.path.display()))
            })?;
            std::fs::copy(&entry.path, dstdir.join(name))?;
        }
        previous = Some(entry.path.clone());
    }
    Ok(())
}

/// Asks for confirmation on stdin; "yes" and "y" continue.
fn confirm() -> std::io::Result<bool> {
    print!("Type 'yes' to continue: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "yes" | "y"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_count_matches_the_log_ratio() {
        // ln(50e6 / 11.5e3) / ln(1.0025) ~= 3355.2
        let plan = SubsetPlan::new(11.5e3, 50e6, 1.0025).unwrap();
        assert_eq!(plan.count, 3355);
    }

    #[test]
    fn test_plan_rejects_degenerate_bounds() {
        assert!(SubsetPlan::new(0.0, 50e6, 1.0025).is_err());
        assert!(SubsetPlan::new(1e6, 1e3, 1.0025).is_err());
        assert!(SubsetPlan::new(1e3, 1e6, 1.0).is_err());
    }

    #[test]
    fn test_duplicate_targets_are_copied_once() {
        let pool = tempfile::tempdir().unwrap();
        for (id, size) in [(1, 10_000u64), (2, 40_000u64)] {
            std::fs::write(pool.path().join(format!("{id}_{size}.flv")), b"x").unwrap();
        }
        let dst = tempfile::tempdir().unwrap();

        // Factor 2 from 10k to 80k: targets 10k, 20k, 40k; the 20k target
        // resolves to the 10k file again and is skipped
        cmd_subset(pool.path(), dst.path(), 10_000.0, 80_000.0, 2.0, true).unwrap();
        let copied = std::fs::read_dir(dst.path()).unwrap().count();
        assert_eq!(copied, 2);
    }
}
