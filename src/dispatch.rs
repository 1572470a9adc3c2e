use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{DispatchError, HandlerError};
use crate::events::{Emit, Listener, ListenerHandle, Listeners};
use crate::handler::{Handler, HandlerRegistry};
use crate::model::{Procedure, ProcedureKind};
use crate::outcome::Outcome;

/// Routes each procedure to the handler registered for its kind.
///
/// Owns the listener aggregate; every registered listener sees the events of
/// every dispatch, in registration order.
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: HandlerRegistry,
    listeners: Listeners,
}

#[derive(Clone, Copy)]
enum Mode {
    Execute,
    ValidateOnly,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            listeners: Listeners::new(),
        }
    }

    pub fn register(&mut self, handle: impl Into<ListenerHandle>, listener: Arc<dyn Listener>) {
        self.listeners.register(handle, listener);
    }

    /// Returns how many listeners were removed.
    pub fn unregister(&mut self, handle: &ListenerHandle) -> usize {
        self.listeners.unregister(handle)
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Validate and run `procedure`.
    pub fn dispatch(&self, procedure: &Procedure) -> Result<Outcome, DispatchError> {
        self.route(procedure, Mode::Execute)
    }

    /// Run only the validator; returns [`Outcome::Validated`] on success.
    pub fn validate(&self, procedure: &Procedure) -> Result<Outcome, DispatchError> {
        self.route(procedure, Mode::ValidateOnly)
    }

    fn route(&self, procedure: &Procedure, mode: Mode) -> Result<Outcome, DispatchError> {
        debug!(id = %procedure.id, kind = %procedure.procedure_type(), "dispatching");
        match &procedure.kind {
            ProcedureKind::Move(payload) => self.invoke(procedure, payload, self.registry.move_handler(), mode),
            ProcedureKind::Delete(payload) => self.invoke(procedure, payload, self.registry.delete_handler(), mode),
            ProcedureKind::Clean(payload) => self.invoke(procedure, payload, self.registry.clean_handler(), mode),
            ProcedureKind::Copy | ProcedureKind::Zip | ProcedureKind::Unzip | ProcedureKind::Rename => {
                Err(self.unmapped(procedure))
            }
        }
    }

    fn unmapped(&self, procedure: &Procedure) -> DispatchError {
        warn!(id = %procedure.id, kind = %procedure.procedure_type(), "no handler registered");
        DispatchError::Unmapped(procedure.procedure_type())
    }

    fn invoke<P>(
        &self,
        procedure: &Procedure,
        payload: &P,
        handler: Option<Handler<P>>,
        mode: Mode,
    ) -> Result<Outcome, DispatchError> {
        let Some(handler) = handler else {
            return Err(self.unmapped(procedure));
        };
        let name = procedure.name.as_str();
        let listener: &dyn Listener = &self.listeners;

        listener.start(format!("Executing procedure: {name}"));
        let result: Result<Outcome, HandlerError> = match mode {
            Mode::Execute => handler.handle(name, payload, listener),
            Mode::ValidateOnly => handler.validate(name, payload, listener).map(|()| Outcome::Validated),
        };
        match result {
            Ok(outcome) => {
                listener.end(format!("Procedure {name} execution finished."));
                Ok(outcome)
            }
            Err(source) => {
                warn!(procedure = name, error = %source, "procedure failed");
                listener.cancel(format!("Error executing procedure {name}: {source}"));
                Err(DispatchError::Failed {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }
}
