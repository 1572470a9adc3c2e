use std::path::Path;

use crate::error::ValidationError;
use crate::events::{Emit, Listener};
use crate::model::{CleanProcedure, DeleteProcedure, MoveProcedure};
use crate::resolve;

/// Precondition checks for one procedure kind. Runs before any mutation.
pub trait Validator<P> {
    fn validate(&self, name: &str, procedure: &P, listener: &dyn Listener) -> Result<(), ValidationError>;
}

fn existing_directory(path: &Path, missing: fn(std::path::PathBuf) -> ValidationError) -> Result<(), ValidationError> {
    if !path.exists() {
        return Err(missing(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ValidationError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

fn bracket<F>(name: &str, listener: &dyn Listener, check: F) -> Result<(), ValidationError>
where
    F: FnOnce() -> Result<(), ValidationError>,
{
    listener.start(format!("Validating procedure: {name}"));
    check()?;
    listener.end(format!("Procedure {name} is valid."));
    Ok(())
}

/// A move needs an existing source directory and a distinct, existing target directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveValidator;

impl Validator<MoveProcedure> for MoveValidator {
    fn validate(&self, name: &str, procedure: &MoveProcedure, listener: &dyn Listener) -> Result<(), ValidationError> {
        bracket(name, listener, || {
            existing_directory(procedure.source_path(), ValidationError::SourceMissing)?;
            existing_directory(procedure.target_directory(), ValidationError::TargetMissing)?;
            if resolve::same_file(procedure.source_path(), procedure.target_directory()) {
                return Err(ValidationError::SameLocation(procedure.target_directory().to_path_buf()));
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteValidator;

impl Validator<DeleteProcedure> for DeleteValidator {
    fn validate(&self, name: &str, procedure: &DeleteProcedure, listener: &dyn Listener) -> Result<(), ValidationError> {
        bracket(name, listener, || {
            existing_directory(procedure.source_path(), ValidationError::SourceMissing)
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanValidator;

impl Validator<CleanProcedure> for CleanValidator {
    fn validate(&self, name: &str, procedure: &CleanProcedure, listener: &dyn Listener) -> Result<(), ValidationError> {
        bracket(name, listener, || {
            existing_directory(procedure.source_path(), ValidationError::SourceMissing)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::SkipConflict;
    use crate::discover::FlatDiscover;
    use crate::events::{Recorded, Recorder};
    use crate::filter::PatternFilter;
    use crate::placement::FlatMove;
    use std::fs;

    fn move_between(src: &Path, dst: &Path) -> MoveProcedure {
        MoveProcedure::builder()
            .source_path(src)
            .target_directory(dst)
            .discover(FlatDiscover)
            .filter(PatternFilter::accept_all())
            .placement(FlatMove::default())
            .conflict(SkipConflict)
            .build()
            .unwrap()
    }

    #[test]
    fn move_needs_source_and_target_directories() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        let recorder = Recorder::default();

        let err = MoveValidator.validate("m", &move_between(&src, &dst), &recorder).unwrap_err();
        assert!(matches!(err, ValidationError::SourceMissing(_)));

        fs::create_dir(&src)?;
        let err = MoveValidator.validate("m", &move_between(&src, &dst), &recorder).unwrap_err();
        assert!(matches!(err, ValidationError::TargetMissing(_)));

        fs::write(&dst, "not a dir")?;
        let err = MoveValidator.validate("m", &move_between(&src, &dst), &recorder).unwrap_err();
        assert!(matches!(err, ValidationError::NotADirectory(_)));

        fs::remove_file(&dst)?;
        fs::create_dir(&dst)?;
        recorder.take();
        MoveValidator.validate("m", &move_between(&src, &dst), &recorder)?;
        assert_eq!(
            recorder.take(),
            vec![
                Recorded::Start("Validating procedure: m".into()),
                Recorded::End("Procedure m is valid.".into())
            ]
        );
        Ok(())
    }

    // Source and target count as two options only when they differ.
    #[test]
    fn move_into_its_own_source_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let err = MoveValidator
            .validate("m", &move_between(dir.path(), dir.path()), &Recorder::default())
            .unwrap_err();
        assert!(matches!(err, ValidationError::SameLocation(_)));
        Ok(())
    }

    #[test]
    fn clean_needs_existing_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ok = CleanValidator.validate("c", &CleanProcedure::new(dir.path()), &Recorder::default());
        assert!(ok.is_ok());
        let missing = CleanValidator.validate("c", &CleanProcedure::new(dir.path().join("x")), &Recorder::default());
        assert!(matches!(missing, Err(ValidationError::SourceMissing(_))));
        Ok(())
    }
}
