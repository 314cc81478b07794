use crate::bridge::task::TaskId;
use crate::error::CallbackFault;

/// Process-level policy for callbacks that fail during dispatch.
///
/// By the time `escalate` runs, the task's state has been released.
pub trait FaultHandler {
    fn escalate(&self, task: TaskId, fault: CallbackFault);
}

/// Log the fault and abort the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortOnFault;

impl FaultHandler for AbortOnFault {
    fn escalate(&self, task: TaskId, fault: CallbackFault) {
        tracing::error!("Fatal callback fault in task {}: {}", task, fault);
        std::process::abort();
    }
}

/// Re-raise the fault as a panic on the calling thread, unwinding out of the
/// completion loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicOnFault;

impl FaultHandler for PanicOnFault {
    fn escalate(&self, task: TaskId, fault: CallbackFault) {
        tracing::error!("Callback fault in task {}: {}", task, fault);
        panic!("callback fault in task {task}: {fault}");
    }
}
