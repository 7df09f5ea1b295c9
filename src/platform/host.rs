//! Interactive host binding

/// The interactive context (window, activity) prompts are shown in
pub trait HostContext: Send {
    fn is_bound(&self) -> bool;
}
