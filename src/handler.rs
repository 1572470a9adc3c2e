use std::fmt;

use crate::error::HandlerError;
use crate::events::Listener;
use crate::executor::{CleanExecutor, DeleteExecutor, Executor, MoveExecutor};
use crate::model::{CleanProcedure, DeleteProcedure, MoveProcedure};
use crate::outcome::Outcome;
use crate::validate::{CleanValidator, DeleteValidator, MoveValidator, Validator};

/// Binds the validator and executor of one procedure kind.
pub struct Handler<P> {
    validator: Box<dyn Validator<P>>,
    executor: Box<dyn Executor<P>>,
}

impl<P> Handler<P> {
    pub fn new(validator: impl Validator<P> + 'static, executor: impl Executor<P> + 'static) -> Self {
        Self {
            validator: Box::new(validator),
            executor: Box::new(executor),
        }
    }

    pub fn validate(&self, name: &str, procedure: &P, listener: &dyn Listener) -> Result<(), HandlerError> {
        Ok(self.validator.validate(name, procedure, listener)?)
    }

    /// Validate, then execute. The executor never runs on a rejected procedure.
    pub fn handle(&self, name: &str, procedure: &P, listener: &dyn Listener) -> Result<Outcome, HandlerError> {
        self.validate(name, procedure, listener)?;
        Ok(self.executor.execute(name, procedure, listener)?)
    }
}

pub type HandlerFactory<P> = Box<dyn Fn() -> Handler<P>>;

/// One factory slot per supported procedure kind.
///
/// Built once by the caller and handed to [`crate::dispatch::Dispatcher`].
/// An empty slot makes the dispatcher report the kind as unmapped.
pub struct HandlerRegistry {
    moves: Option<HandlerFactory<MoveProcedure>>,
    deletes: Option<HandlerFactory<DeleteProcedure>>,
    cleans: Option<HandlerFactory<CleanProcedure>>,
}

impl HandlerRegistry {
    pub fn empty() -> Self {
        Self {
            moves: None,
            deletes: None,
            cleans: None,
        }
    }

    /// Move, delete and clean wired to their stock validators and executors.
    pub fn standard() -> Self {
        Self::empty()
            .with_move(|| Handler::new(MoveValidator, MoveExecutor))
            .with_delete(|| Handler::new(DeleteValidator, DeleteExecutor))
            .with_clean(|| Handler::new(CleanValidator, CleanExecutor))
    }

    pub fn with_move(mut self, factory: impl Fn() -> Handler<MoveProcedure> + 'static) -> Self {
        self.moves = Some(Box::new(factory));
        self
    }

    pub fn with_delete(mut self, factory: impl Fn() -> Handler<DeleteProcedure> + 'static) -> Self {
        self.deletes = Some(Box::new(factory));
        self
    }

    pub fn with_clean(mut self, factory: impl Fn() -> Handler<CleanProcedure> + 'static) -> Self {
        self.cleans = Some(Box::new(factory));
        self
    }

    pub(crate) fn move_handler(&self) -> Option<Handler<MoveProcedure>> {
        self.moves.as_ref().map(|factory| factory())
    }

    pub(crate) fn delete_handler(&self) -> Option<Handler<DeleteProcedure>> {
        self.deletes.as_ref().map(|factory| factory())
    }

    pub(crate) fn clean_handler(&self) -> Option<Handler<CleanProcedure>> {
        self.cleans.as_ref().map(|factory| factory())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("move", &self.moves.is_some())
            .field("delete", &self.deletes.is_some())
            .field("clean", &self.cleans.is_some())
            .finish()
    }
}
